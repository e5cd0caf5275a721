//! Access to ribo data files.
//!
//! The portal never computes read statistics itself: everything comes from
//! a [`RiboFile`] implementation. [`open`] picks the bundle backend, and
//! [`RiboHandle`] layers transcript aliasing and a few summaries on top.

pub mod bundle;
pub mod digest;
pub mod handle;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub use bundle::RiboBundle;
pub use digest::{detect_transcript_regex, digest_reference, digest_ribo};
pub use handle::{RiboHandle, TranscriptAlias};

#[derive(Debug, Error)]
pub enum RiboError {
    #[error("Invalid ribo file: {0}")]
    Invalid(String),
    #[error("Malformed ribo file: {0}")]
    Malformed(String),
    #[error("Experiment '{0}' does not exist in the ribo file")]
    UnknownExperiment(String),
    #[error("Transcript '{0}' does not exist in the ribo file")]
    UnknownTranscript(String),
    #[error("Transcript alias failed: {0}")]
    Alias(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Transcript regions, in 5' to 3' order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Utr5,
    Cds,
    Utr3,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Utr5, Region::Cds, Region::Utr3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Utr5 => "UTR5",
            Region::Cds => "CDS",
            Region::Utr3 => "UTR3",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anchor of a metagene profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    Start,
    Stop,
}

impl Site {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "start" => Some(Site::Start),
            "stop" => Some(Site::Stop),
            _ => None,
        }
    }
}

/// Half-open `[start, end)` ranges of the three regions of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBoundaries {
    pub utr5: [u64; 2],
    pub cds: [u64; 2],
    pub utr3: [u64; 2],
}

impl RegionBoundaries {
    pub fn get(&self, region: Region) -> [u64; 2] {
        match region {
            Region::Utr5 => self.utr5,
            Region::Cds => self.cds,
            Region::Utr3 => self.utr3,
        }
    }
}

/// Read-only view of a ribo file. Transcript names are the raw names stored
/// in the file; every per-transcript slice is parallel to
/// [`RiboFile::transcript_names`], and every per-read-length row follows
/// `minimum_length..=maximum_length`.
pub trait RiboFile: Send + Sync + fmt::Debug {
    fn format_version(&self) -> &str;

    fn experiments(&self) -> Vec<String>;

    fn transcript_names(&self) -> &[String];

    fn transcript_lengths(&self) -> &[u64];

    fn region_boundaries(&self) -> &[RegionBoundaries];

    fn minimum_length(&self) -> u32;

    fn maximum_length(&self) -> u32;

    /// Number of nucleotides on each side of the metagene anchor.
    fn metagene_radius(&self) -> u32;

    fn total_reads(&self, experiment: &str) -> Result<u64, RiboError>;

    /// Counts per transcript (rows) and read length (columns).
    fn region_counts(&self, experiment: &str, region: Region) -> Result<Vec<Vec<u64>>, RiboError>;

    /// Counts per read length (rows) and position relative to the site
    /// (columns, `-radius..=radius`).
    fn metagene(&self, experiment: &str, site: Site) -> Result<Vec<Vec<u64>>, RiboError>;

    /// Counts per read length (rows) and transcript position (columns).
    fn coverage(&self, experiment: &str, transcript: usize) -> Result<Vec<Vec<u64>>, RiboError>;

    fn read_lengths(&self) -> Vec<u32> {
        (self.minimum_length()..=self.maximum_length()).collect()
    }
}

/// Opens a ribo file with the bundle backend.
pub fn open(path: impl AsRef<Path>) -> Result<Arc<dyn RiboFile>, RiboError> {
    let bundle = RiboBundle::open(path)?;
    Ok(Arc::new(bundle))
}
