use crate::schema::experiments;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = experiments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Experiment {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub project_id: i32,
    #[serde(skip_serializing)]
    pub ribo_file_path: String,
    pub reference_id: Option<i32>,
    pub reference_digest: String,
    pub transcript_regex: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = experiments)]
pub struct NewExperiment {
    pub name: String,
    pub description: String,
    pub project_id: i32,
    pub ribo_file_path: String,
    pub reference_id: Option<i32>,
    pub reference_digest: String,
    pub transcript_regex: String,
    pub created_at: NaiveDateTime,
}

impl NewExperiment {
    pub fn new(
        name: String,
        project_id: i32,
        ribo_file_path: String,
        reference_digest: String,
        transcript_regex: String,
    ) -> Self {
        Self {
            name,
            description: String::new(),
            project_id,
            ribo_file_path,
            reference_id: None,
            reference_digest,
            transcript_regex,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Compact listing entry used by the experiment picker of the coverage view.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ExperimentSummary {
    pub id: i32,
    pub name: String,
    pub project: String,
}

#[derive(Deserialize, Debug)]
pub struct ExperimentSelection {
    pub name: String,
    #[serde(default = "selected_by_default")]
    pub selected: bool,
}

fn selected_by_default() -> bool {
    true
}

#[derive(Deserialize, Debug)]
pub struct ConfirmRiboForm {
    pub experiments: Vec<ExperimentSelection>,
}

#[derive(Deserialize, Debug)]
pub struct ExperimentReferenceForm {
    pub reference_id: Option<i32>,
}

#[derive(Serialize, Debug)]
pub struct RiboUploadResponse {
    pub digest: String,
    pub project_id: i32,
    pub experiments: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct ExperimentDetails {
    pub experiment: Experiment,
    pub project: crate::models::Project,
    pub reference: Option<crate::models::Reference>,
}
