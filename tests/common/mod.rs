#![allow(dead_code)]

use ribograph::AppConfig;
use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalResponse};
use serde_json::{Value, json};
use tempfile::TempDir;

const BOUNDARY: &str = "X-RIBOGRAPH-TEST-BOUNDARY";

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse";

/// A fresh application on its own data directory and SQLite file.
pub struct TestApp {
    pub client: Client,
    pub temp_dir: TempDir, // Keep alive for cleanup
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = AppConfig::with_data_dir(temp_dir.path());
        let rocket = ribograph::build_rocket(config).expect("Failed to build rocket");
        let client = Client::tracked(rocket).expect("valid rocket instance");

        Self { client, temp_dir }
    }

    /// Creates the administrator through first-run setup and returns its
    /// session token.
    pub fn setup_admin(&self) -> String {
        let response = self
            .client
            .post("/api/v1/setup")
            .json(&json!({
                "username": ADMIN_USERNAME,
                "password": ADMIN_PASSWORD,
                "password_confirmation": ADMIN_PASSWORD,
            }))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        json_body(response)["token"]
            .as_str()
            .expect("setup returns a token")
            .to_string()
    }

    pub fn create_project(&self, token: &str, name: &str, public: bool) -> i64 {
        let response = self
            .client
            .post("/api/v1/projects")
            .header(bearer(token))
            .json(&json!({ "name": name, "description": "", "public": public }))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        json_body(response)["id"].as_i64().expect("project id")
    }

    pub fn upload_ribo(&self, token: &str, project_id: i64, content: &[u8]) -> LocalResponse<'_> {
        let (content_type, body) = multipart("ribo_file", "sample.ribo", content);
        self.client
            .post(format!("/api/v1/projects/{project_id}/ribo"))
            .header(bearer(token))
            .header(content_type)
            .body(body)
            .dispatch()
    }

    pub fn confirm_ribo(
        &self,
        token: &str,
        project_id: i64,
        digest: &str,
        names: &[&str],
    ) -> LocalResponse<'_> {
        let experiments: Vec<Value> = names.iter().map(|name| json!({ "name": name })).collect();
        self.client
            .post(format!("/api/v1/projects/{project_id}/ribo/{digest}"))
            .header(bearer(token))
            .json(&json!({ "experiments": experiments }))
            .dispatch()
    }

    /// Uploads the sample bundle and confirms `names`, returning the
    /// created experiments.
    pub fn add_experiments(&self, token: &str, project_id: i64, names: &[&str]) -> Vec<Value> {
        self.add_experiments_from(token, project_id, &sample_bundle_bytes(), names)
    }

    pub fn add_experiments_from(
        &self,
        token: &str,
        project_id: i64,
        bundle: &[u8],
        names: &[&str],
    ) -> Vec<Value> {
        let response = self.upload_ribo(token, project_id, bundle);
        assert_eq!(response.status(), Status::Ok);
        let digest = json_body(response)["digest"]
            .as_str()
            .expect("digest")
            .to_string();

        let response = self.confirm_ribo(token, project_id, &digest, names);
        assert_eq!(response.status(), Status::Ok);
        json_body(response)
            .as_array()
            .expect("list of experiments")
            .clone()
    }

    pub fn upload_reference(&self, token: &str, content: &[u8]) -> LocalResponse<'_> {
        let (content_type, body) = multipart("reference_file", "reference.fa", content);
        self.client
            .post("/api/v1/references/upload")
            .header(bearer(token))
            .header(content_type)
            .body(body)
            .dispatch()
    }

    /// Uploads and records a reference, returning its id.
    pub fn add_reference(&self, token: &str, name: &str, fasta: &str) -> i64 {
        let response = self.upload_reference(token, fasta.as_bytes());
        assert_eq!(response.status(), Status::Ok);
        let digest = json_body(response)["digest"]
            .as_str()
            .expect("digest")
            .to_string();

        let response = self
            .client
            .post(format!("/api/v1/references/{digest}"))
            .header(bearer(token))
            .json(&json!({ "name": name, "organism": "human", "description": "" }))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        json_body(response)["id"].as_i64().expect("reference id")
    }
}

pub fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

pub fn json_body(response: LocalResponse<'_>) -> Value {
    let body = response.into_bytes().expect("response body");
    serde_json::from_slice(&body).expect("valid JSON")
}

/// A single-file `multipart/form-data` body.
pub fn multipart(field: &str, filename: &str, content: &[u8]) -> (ContentType, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let content_type =
        ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY));
    (content_type, body)
}

/// Two transcripts (`tx1` of length 6, `tx2` of length 4), read lengths
/// 28..=29, metagene radius 1 and experiments `WT` and `KO`.
pub fn sample_bundle() -> Value {
    json!({
        "format_version": "0.2",
        "read_lengths": {"min": 28, "max": 29},
        "metagene_radius": 1,
        "transcripts": [
            {"name": "tx1", "length": 6, "regions": {"utr5": [0, 1], "cds": [1, 5], "utr3": [5, 6]}},
            {"name": "tx2", "length": 4, "regions": {"utr5": [0, 1], "cds": [1, 3], "utr3": [3, 4]}}
        ],
        "experiments": [
            {
                "name": "WT",
                "total_reads": 42,
                "region_counts": {
                    "utr5": [[1, 0], [0, 1]],
                    "cds": [[5, 6], [2, 3]],
                    "utr3": [[0, 0], [1, 1]]
                },
                "metagene": {
                    "start": [[1, 2, 3], [4, 5, 6]],
                    "stop": [[0, 0, 1], [1, 0, 0]]
                },
                "coverage": {
                    "tx1": [[0, 1, 2, 3, 0, 0], [0, 0, 1, 1, 1, 0]]
                }
            },
            {
                "name": "KO",
                "total_reads": 17,
                "region_counts": {
                    "utr5": [[0, 0], [0, 0]],
                    "cds": [[1, 1], [4, 4]],
                    "utr3": [[0, 0], [0, 0]]
                },
                "metagene": {
                    "start": [[0, 1, 0], [0, 1, 0]],
                    "stop": [[0, 0, 0], [0, 0, 0]]
                }
            }
        ]
    })
}

pub fn sample_bundle_bytes() -> Vec<u8> {
    serde_json::to_vec(&sample_bundle()).expect("serializable bundle")
}

/// A reference matching the transcripts of [`sample_bundle`].
pub const MATCHING_FASTA: &str = ">tx1 first transcript\nACGTAC\n>tx2\nTTGA\n";

pub const APPRIS_TX1: &str = "ENST01|ENSG01|OTTHUMG01|OTTHUMT01|Gene1-201|Gene1|6|UTR5:1-1|CDS:2-5|";
pub const APPRIS_TX2: &str = "ENST02|ENSG02|OTTHUMG02|OTTHUMT02|Gene2-201|Gene2|4|UTR5:1-1|CDS:2-3|";

/// [`sample_bundle`] with APPRIS style transcript names.
pub fn appris_bundle() -> Value {
    let mut bundle = sample_bundle();
    bundle["transcripts"][0]["name"] = json!(APPRIS_TX1);
    bundle["transcripts"][1]["name"] = json!(APPRIS_TX2);

    let coverage = bundle["experiments"][0]["coverage"]["tx1"].clone();
    bundle["experiments"][0]["coverage"] = json!({ APPRIS_TX1: coverage });
    bundle
}
