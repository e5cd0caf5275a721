use super::{Region, RiboError, RiboFile};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Short display names derived from raw transcript names through the first
/// capture group of a regex. Every name must match and aliases must be
/// unique.
#[derive(Debug, Clone)]
pub struct TranscriptAlias {
    pattern: String,
    aliases: Vec<String>,
}

impl TranscriptAlias {
    pub fn new(pattern: &str, names: &[String]) -> Result<Self, RiboError> {
        let regex = Regex::new(pattern).map_err(|e| RiboError::Alias(e.to_string()))?;
        let mut seen = HashSet::with_capacity(names.len());

        let aliases = names
            .iter()
            .map(|name| {
                let alias = regex
                    .captures(name)
                    .and_then(|captures| captures.get(1))
                    .map(|m| m.as_str().to_string())
                    .ok_or_else(|| {
                        RiboError::Alias(format!("'{name}' does not match '{pattern}'"))
                    })?;

                if !seen.insert(alias.clone()) {
                    return Err(RiboError::Alias(format!("alias '{alias}' is not unique")));
                }
                Ok(alias)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            pattern: pattern.to_string(),
            aliases,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// An opened ribo file together with the alias scheme of one experiment.
pub struct RiboHandle {
    file: Arc<dyn RiboFile>,
    alias: Option<TranscriptAlias>,
    lookup: HashMap<String, usize>,
}

impl fmt::Debug for RiboHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiboHandle")
            .field("file", &self.file)
            .field("alias", &self.alias.as_ref().map(|a| a.pattern()))
            .finish()
    }
}

impl RiboHandle {
    /// Wraps `file`, aliasing transcript names when `transcript_regex` is
    /// not empty.
    pub fn new(file: Arc<dyn RiboFile>, transcript_regex: &str) -> Result<Self, RiboError> {
        let alias = if transcript_regex.is_empty() {
            None
        } else {
            Some(TranscriptAlias::new(
                transcript_regex,
                file.transcript_names(),
            )?)
        };

        let mut handle = Self {
            file,
            alias,
            lookup: HashMap::new(),
        };
        handle.lookup = handle
            .display_names()
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
        Ok(handle)
    }

    pub fn file(&self) -> &dyn RiboFile {
        self.file.as_ref()
    }

    pub fn is_aliased(&self) -> bool {
        self.alias.is_some()
    }

    /// Transcript names as shown to users.
    pub fn display_names(&self) -> &[String] {
        match &self.alias {
            Some(alias) => alias.aliases(),
            None => self.file.transcript_names(),
        }
    }

    pub fn transcript_index(&self, display_name: &str) -> Result<usize, RiboError> {
        self.lookup
            .get(display_name)
            .copied()
            .ok_or_else(|| RiboError::UnknownTranscript(display_name.to_string()))
    }

    /// Region counts summed over all transcripts, one value per read length.
    pub fn region_counts_by_length(
        &self,
        experiment: &str,
        region: Region,
    ) -> Result<Vec<u64>, RiboError> {
        let matrix = self.file.region_counts(experiment, region)?;
        let mut totals = vec![0u64; self.file.read_lengths().len()];
        for row in &matrix {
            for (total, count) in totals.iter_mut().zip(row) {
                *total += count;
            }
        }
        Ok(totals)
    }

    /// Region counts summed over read lengths, keyed by display name in
    /// transcript order.
    pub fn region_counts_by_transcript(
        &self,
        experiment: &str,
        region: Region,
    ) -> Result<Vec<(String, u64)>, RiboError> {
        let matrix = self.file.region_counts(experiment, region)?;
        Ok(self
            .display_names()
            .iter()
            .zip(&matrix)
            .map(|(name, row)| (name.clone(), row.iter().sum()))
            .collect())
    }

    /// Half-open CDS range of a transcript given by display name.
    pub fn cds_range(&self, display_name: &str) -> Result<[u64; 2], RiboError> {
        let index = self.transcript_index(display_name)?;
        Ok(self.file.region_boundaries()[index].get(Region::Cds))
    }

    pub fn coverage(&self, experiment: &str, display_name: &str) -> Result<Vec<Vec<u64>>, RiboError> {
        let index = self.transcript_index(display_name)?;
        self.file.coverage(experiment, index)
    }
}
