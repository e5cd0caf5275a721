use super::{Region, RegionBoundaries, RiboError, RiboFile, Site};
use flate2::read::MultiGzDecoder;
use log::debug;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Deserialize)]
struct ReadLengthRange {
    min: u32,
    max: u32,
}

#[derive(Debug, Deserialize)]
struct TranscriptRecord {
    name: String,
    length: u64,
    regions: RegionBoundaries,
}

#[derive(Debug, Deserialize)]
struct RegionTable {
    utr5: Vec<Vec<u64>>,
    cds: Vec<Vec<u64>>,
    utr3: Vec<Vec<u64>>,
}

impl RegionTable {
    fn get(&self, region: Region) -> &Vec<Vec<u64>> {
        match region {
            Region::Utr5 => &self.utr5,
            Region::Cds => &self.cds,
            Region::Utr3 => &self.utr3,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetageneTable {
    start: Vec<Vec<u64>>,
    stop: Vec<Vec<u64>>,
}

#[derive(Debug, Deserialize)]
struct ExperimentRecord {
    name: String,
    total_reads: u64,
    region_counts: RegionTable,
    metagene: MetageneTable,
    #[serde(default)]
    coverage: HashMap<String, Vec<Vec<u64>>>,
}

#[derive(Debug, Deserialize)]
struct BundleDocument {
    format_version: String,
    read_lengths: ReadLengthRange,
    metagene_radius: u32,
    transcripts: Vec<TranscriptRecord>,
    experiments: Vec<ExperimentRecord>,
}

/// Ribo data exported as a JSON document, optionally gzip compressed.
#[derive(Debug)]
pub struct RiboBundle {
    format_version: String,
    min_length: u32,
    max_length: u32,
    metagene_radius: u32,
    names: Vec<String>,
    lengths: Vec<u64>,
    boundaries: Vec<RegionBoundaries>,
    experiments: Vec<ExperimentRecord>,
}

impl RiboBundle {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RiboError> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

        let source: Box<dyn Read> = if is_gzip {
            Box::new(MultiGzDecoder::new(reader))
        } else {
            Box::new(reader)
        };

        let document: BundleDocument =
            serde_json::from_reader(source).map_err(|e| RiboError::Invalid(e.to_string()))?;

        let bundle = Self::from_document(document)?;
        debug!(
            "Opened ribo bundle {path:?}: {} transcripts, {} experiments",
            bundle.names.len(),
            bundle.experiments.len()
        );
        Ok(bundle)
    }

    fn from_document(document: BundleDocument) -> Result<Self, RiboError> {
        let BundleDocument {
            format_version,
            read_lengths,
            metagene_radius,
            transcripts,
            experiments,
        } = document;

        if read_lengths.min > read_lengths.max {
            return Err(RiboError::Malformed(format!(
                "minimum read length {} exceeds maximum {}",
                read_lengths.min, read_lengths.max
            )));
        }

        let mut names = Vec::with_capacity(transcripts.len());
        let mut lengths = Vec::with_capacity(transcripts.len());
        let mut boundaries = Vec::with_capacity(transcripts.len());
        for transcript in transcripts {
            names.push(transcript.name);
            lengths.push(transcript.length);
            boundaries.push(transcript.regions);
        }

        let bundle = Self {
            format_version,
            min_length: read_lengths.min,
            max_length: read_lengths.max,
            metagene_radius,
            names,
            lengths,
            boundaries,
            experiments,
        };
        bundle.check_shapes()?;
        Ok(bundle)
    }

    fn length_count(&self) -> usize {
        (self.max_length - self.min_length) as usize + 1
    }

    fn check_shapes(&self) -> Result<(), RiboError> {
        let length_count = self.length_count();
        let window = 2 * self.metagene_radius as usize + 1;

        if let Some(name) = find_duplicate(self.names.iter()) {
            return Err(RiboError::Malformed(format!("duplicate transcript '{name}'")));
        }
        if let Some(name) = find_duplicate(self.experiments.iter().map(|e| &e.name)) {
            return Err(RiboError::Malformed(format!("duplicate experiment '{name}'")));
        }

        for experiment in &self.experiments {
            for region in Region::ALL {
                check_matrix(
                    experiment.region_counts.get(region),
                    self.names.len(),
                    |_| length_count,
                )
                .map_err(|e| {
                    RiboError::Malformed(format!(
                        "{} region counts of '{}': {e}",
                        region, experiment.name
                    ))
                })?;
            }

            for (site, matrix) in [
                ("start", &experiment.metagene.start),
                ("stop", &experiment.metagene.stop),
            ] {
                check_matrix(matrix, length_count, |_| window).map_err(|e| {
                    RiboError::Malformed(format!(
                        "{site} metagene of '{}': {e}",
                        experiment.name
                    ))
                })?;
            }

            for (transcript, matrix) in &experiment.coverage {
                let index = self
                    .names
                    .iter()
                    .position(|name| name == transcript)
                    .ok_or_else(|| {
                        RiboError::Malformed(format!(
                            "coverage of '{}' refers to unknown transcript '{transcript}'",
                            experiment.name
                        ))
                    })?;
                let width = self.lengths[index] as usize;
                check_matrix(matrix, length_count, |_| width).map_err(|e| {
                    RiboError::Malformed(format!(
                        "coverage of '{transcript}' in '{}': {e}",
                        experiment.name
                    ))
                })?;
            }
        }

        Ok(())
    }

    fn experiment(&self, name: &str) -> Result<&ExperimentRecord, RiboError> {
        self.experiments
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| RiboError::UnknownExperiment(name.to_string()))
    }
}

fn find_duplicate<'a>(mut names: impl Iterator<Item = &'a String>) -> Option<&'a String> {
    let mut seen = HashSet::new();
    names.find(|name| !seen.insert(*name))
}

fn check_matrix(
    matrix: &[Vec<u64>],
    rows: usize,
    columns: impl Fn(usize) -> usize,
) -> Result<(), String> {
    if matrix.len() != rows {
        return Err(format!("expected {rows} rows, found {}", matrix.len()));
    }
    for (i, row) in matrix.iter().enumerate() {
        let expected = columns(i);
        if row.len() != expected {
            return Err(format!(
                "row {i} has {} columns, expected {expected}",
                row.len()
            ));
        }
    }
    Ok(())
}

impl RiboFile for RiboBundle {
    fn format_version(&self) -> &str {
        &self.format_version
    }

    fn experiments(&self) -> Vec<String> {
        self.experiments.iter().map(|e| e.name.clone()).collect()
    }

    fn transcript_names(&self) -> &[String] {
        &self.names
    }

    fn transcript_lengths(&self) -> &[u64] {
        &self.lengths
    }

    fn region_boundaries(&self) -> &[RegionBoundaries] {
        &self.boundaries
    }

    fn minimum_length(&self) -> u32 {
        self.min_length
    }

    fn maximum_length(&self) -> u32 {
        self.max_length
    }

    fn metagene_radius(&self) -> u32 {
        self.metagene_radius
    }

    fn total_reads(&self, experiment: &str) -> Result<u64, RiboError> {
        Ok(self.experiment(experiment)?.total_reads)
    }

    fn region_counts(&self, experiment: &str, region: Region) -> Result<Vec<Vec<u64>>, RiboError> {
        Ok(self
            .experiment(experiment)?
            .region_counts
            .get(region)
            .clone())
    }

    fn metagene(&self, experiment: &str, site: Site) -> Result<Vec<Vec<u64>>, RiboError> {
        let record = self.experiment(experiment)?;
        Ok(match site {
            Site::Start => record.metagene.start.clone(),
            Site::Stop => record.metagene.stop.clone(),
        })
    }

    fn coverage(&self, experiment: &str, transcript: usize) -> Result<Vec<Vec<u64>>, RiboError> {
        let record = self.experiment(experiment)?;
        let name = self
            .names
            .get(transcript)
            .ok_or_else(|| RiboError::UnknownTranscript(format!("#{transcript}")))?;

        match record.coverage.get(name) {
            Some(matrix) => Ok(matrix.clone()),
            // Transcripts without any reads are omitted from the export
            None => Ok(vec![
                vec![0; self.lengths[transcript] as usize];
                self.length_count()
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use serde_json::json;
    use std::io::Write;

    fn sample_document() -> serde_json::Value {
        json!({
            "format_version": "0.2",
            "read_lengths": {"min": 28, "max": 29},
            "metagene_radius": 1,
            "transcripts": [
                {"name": "tx1", "length": 6, "regions": {"utr5": [0, 1], "cds": [1, 5], "utr3": [5, 6]}},
                {"name": "tx2", "length": 4, "regions": {"utr5": [0, 1], "cds": [1, 3], "utr3": [3, 4]}}
            ],
            "experiments": [{
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
                    "tx1": [[0, 1, 2, 3, 4, 5], [1, 1, 1, 1, 1, 1]]
                }
            }]
        })
    }

    fn write_json(dir: &Path, name: &str, value: &serde_json::Value) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_open_plain_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), "sample.ribo", &sample_document());

        let bundle = RiboBundle::open(&path).unwrap();
        assert_eq!(bundle.format_version(), "0.2");
        assert_eq!(bundle.experiments(), vec!["WT".to_string()]);
        assert_eq!(bundle.transcript_names(), &["tx1".to_string(), "tx2".to_string()]);
        assert_eq!(bundle.transcript_lengths(), &[6, 4]);
        assert_eq!(bundle.read_lengths(), vec![28, 29]);
        assert_eq!(bundle.total_reads("WT").unwrap(), 42);
        assert_eq!(
            bundle.region_counts("WT", Region::Cds).unwrap(),
            vec![vec![5, 6], vec![2, 3]]
        );
        assert_eq!(bundle.metagene("WT", Site::Stop).unwrap()[1], vec![1, 0, 0]);
    }

    #[test]
    fn test_open_gzip_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.ribo");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&serde_json::to_vec(&sample_document()).unwrap())
            .unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let bundle = RiboBundle::open(&path).unwrap();
        assert_eq!(bundle.minimum_length(), 28);
        assert_eq!(bundle.maximum_length(), 29);
    }

    #[test]
    fn test_missing_coverage_is_zero_filled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), "sample.ribo", &sample_document());
        let bundle = RiboBundle::open(&path).unwrap();

        assert_eq!(bundle.coverage("WT", 0).unwrap()[0], vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(bundle.coverage("WT", 1).unwrap(), vec![vec![0; 4]; 2]);
    }

    #[test]
    fn test_unknown_experiment() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), "sample.ribo", &sample_document());
        let bundle = RiboBundle::open(&path).unwrap();

        assert!(matches!(
            bundle.total_reads("KO"),
            Err(RiboError::UnknownExperiment(name)) if name == "KO"
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.ribo");
        std::fs::write(&path, b"definitely not a ribo file").unwrap();

        assert!(matches!(RiboBundle::open(&path), Err(RiboError::Invalid(_))));
    }

    #[test]
    fn test_rejects_wrong_metagene_width() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = sample_document();
        document["experiments"][0]["metagene"]["start"] = json!([[1, 2], [3, 4]]);
        let path = write_json(dir.path(), "bad.ribo", &document);

        let err = RiboBundle::open(&path).unwrap_err();
        assert!(matches!(err, RiboError::Malformed(_)));
        assert!(err.to_string().contains("start metagene"));
    }

    #[test]
    fn test_rejects_coverage_for_unknown_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = sample_document();
        document["experiments"][0]["coverage"]["tx9"] = json!([[0], [0]]);
        let path = write_json(dir.path(), "bad.ribo", &document);

        assert!(matches!(RiboBundle::open(&path), Err(RiboError::Malformed(_))));
    }

    #[test]
    fn test_rejects_inverted_length_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = sample_document();
        document["read_lengths"] = json!({"min": 30, "max": 28});
        let path = write_json(dir.path(), "bad.ribo", &document);

        assert!(matches!(RiboBundle::open(&path), Err(RiboError::Malformed(_))));
    }

    #[test]
    fn test_rejects_duplicate_transcripts() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = sample_document();
        document["transcripts"][1]["name"] = json!("tx1");
        document["transcripts"][1]["length"] = json!(6);
        let path = write_json(dir.path(), "bad.ribo", &document);

        let err = RiboBundle::open(&path).unwrap_err();
        assert!(matches!(err, RiboError::Malformed(_)));
        assert!(err.to_string().contains("duplicate transcript 'tx1'"));
    }

    #[test]
    fn test_rejects_duplicate_experiments() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = sample_document();
        let copy = document["experiments"][0].clone();
        document["experiments"].as_array_mut().unwrap().push(copy);
        let path = write_json(dir.path(), "bad.ribo", &document);

        let err = RiboBundle::open(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate experiment 'WT'"));
    }
}
