//! Minimal FASTA reading and writing.
//!
//! [`FastaReader`] pulls one record at a time from any buffered reader, and
//! [`FastaReader::open`] transparently decompresses gzip input. A record's
//! `Display` form is the canonical on-disk layout: a `>` header line
//! followed by the sequence wrapped at 50 characters per line.

use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Number of sequence characters per output line. Files written by other
/// tools depend on this width, so it is fixed.
pub const LINE_WIDTH: usize = 50;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("Invalid character ({character}) in the fasta sequence with header \n{header}")]
    InvalidCharacter { character: char, header: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaEntry {
    pub header: String,
    pub sequence: String,
}

fn complement(base: char) -> Option<char> {
    match base {
        'A' => Some('T'),
        'a' => Some('t'),
        'C' => Some('G'),
        'c' => Some('g'),
        'G' => Some('C'),
        'g' => Some('c'),
        'T' => Some('A'),
        't' => Some('a'),
        'N' => Some('N'),
        'n' => Some('n'),
        _ => None,
    }
}

impl FastaEntry {
    pub fn new(header: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            sequence: sequence.into(),
        }
    }

    /// Replaces the sequence with its reverse complement. The entry is left
    /// untouched when the sequence holds a character outside the table.
    pub fn reverse_complement(&mut self) -> Result<(), FastaError> {
        let reversed = self
            .sequence
            .chars()
            .rev()
            .map(|base| {
                complement(base).ok_or_else(|| FastaError::InvalidCharacter {
                    character: base,
                    header: self.header.clone(),
                })
            })
            .collect::<Result<String, _>>()?;

        self.sequence = reversed;
        Ok(())
    }
}

impl fmt::Display for FastaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ">{}", self.header)?;

        let bases: Vec<char> = self.sequence.chars().collect();
        for line in bases.chunks(LINE_WIDTH) {
            f.write_char('\n')?;
            for base in line {
                f.write_char(*base)?;
            }
        }

        Ok(())
    }
}

/// Pull-style FASTA reader yielding one [`FastaEntry`] per record.
pub struct FastaReader<R> {
    lines: io::Lines<R>,
    current_header: Option<String>,
    current_sequence: String,
}

impl FastaReader<Box<dyn BufRead + Send>> {
    /// Opens a FASTA file, decompressing it when it starts with the gzip
    /// magic bytes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FastaError> {
        let mut reader = BufReader::new(File::open(path)?);
        let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

        let inner: Box<dyn BufRead + Send> = if is_gzip {
            Box::new(BufReader::new(MultiGzDecoder::new(reader)))
        } else {
            Box::new(reader)
        };

        Ok(Self::new(inner))
    }
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            current_header: None,
            current_sequence: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastaEntry, FastaError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw_line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some(Err(e.into())),
                None => {
                    // Trailing header without sequence lines is dropped
                    if self.current_sequence.is_empty() {
                        return None;
                    }
                    let sequence = std::mem::take(&mut self.current_sequence);
                    let header = self.current_header.clone().unwrap_or_default();
                    return Some(Ok(FastaEntry { header, sequence }));
                }
            };

            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            match line.strip_prefix('>') {
                Some(rest) => {
                    let header = rest.split_whitespace().next().unwrap_or_default();
                    match self.current_header.replace(header.to_string()) {
                        Some(previous) => {
                            let sequence = std::mem::take(&mut self.current_sequence);
                            return Some(Ok(FastaEntry {
                                header: previous,
                                sequence,
                            }));
                        }
                        None => self.current_sequence.clear(),
                    }
                }
                None => self.current_sequence.push_str(line),
            }
        }
    }
}

/// Reads every record of a FASTA file into a header -> sequence map.
pub fn read_sequences(path: impl AsRef<Path>) -> Result<HashMap<String, String>, FastaError> {
    FastaReader::open(path)?
        .map(|entry| entry.map(|e| (e.header, e.sequence)))
        .collect()
}

/// Reads every record of a FASTA file into a header -> sequence length map.
pub fn sequence_lengths(path: impl AsRef<Path>) -> Result<HashMap<String, u64>, FastaError> {
    FastaReader::open(path)?
        .map(|entry| entry.map(|e| (e.header, e.sequence.chars().count() as u64)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Write};

    fn parse(text: &str) -> Vec<FastaEntry> {
        FastaReader::new(Cursor::new(text.as_bytes().to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_reads_multiple_records() {
        let entries = parse(">tx1 some description\nACGT\nTTGG\n\n>tx2\nNNNN\n");
        assert_eq!(
            entries,
            vec![FastaEntry::new("tx1", "ACGTTTGG"), FastaEntry::new("tx2", "NNNN")]
        );
    }

    #[test]
    fn test_trims_whitespace_around_lines() {
        let entries = parse("  >tx1\t\n  AC GT  \n\r\n");
        assert_eq!(entries, vec![FastaEntry::new("tx1", "AC GT")]);
    }

    #[test]
    fn test_header_with_empty_sequence_is_yielded_before_next_record() {
        let entries = parse(">empty\n>full\nACGT\n");
        assert_eq!(
            entries,
            vec![FastaEntry::new("empty", ""), FastaEntry::new("full", "ACGT")]
        );
    }

    #[test]
    fn test_trailing_header_without_sequence_is_dropped() {
        let entries = parse(">tx1\nACGT\n>dangling\n");
        assert_eq!(entries, vec![FastaEntry::new("tx1", "ACGT")]);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn test_display_wraps_at_fifty_characters() {
        let sequence = "A".repeat(120);
        let entry = FastaEntry::new("long", sequence);
        let rendered = entry.to_string();
        let lines: Vec<&str> = rendered.split('\n').collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], ">long");
        assert_eq!(lines[1].len(), 50);
        assert_eq!(lines[2].len(), 50);
        assert_eq!(lines[3].len(), 20);
        assert!(!rendered.ends_with('\n'));
    }

    #[test]
    fn test_display_exact_multiple_has_no_empty_line() {
        let entry = FastaEntry::new("exact", "C".repeat(100));
        assert_eq!(entry.to_string().lines().count(), 3);
        assert_eq!(FastaEntry::new("none", "").to_string(), ">none");
    }

    #[test]
    fn test_display_round_trips_through_reader() {
        let entry = FastaEntry::new("tx", "ACGTN".repeat(23));
        let parsed = parse(&entry.to_string());
        assert_eq!(parsed, vec![entry]);
    }

    #[test]
    fn test_reverse_complement_preserves_case() {
        let mut entry = FastaEntry::new("tx", "AACgtN");
        entry.reverse_complement().unwrap();
        assert_eq!(entry.sequence, "NacGTT");
    }

    #[test]
    fn test_reverse_complement_rejects_unknown_base() {
        let mut entry = FastaEntry::new("bad_tx", "ACRT");
        let err = entry.reverse_complement().unwrap_err();

        match &err {
            FastaError::InvalidCharacter { character, header } => {
                assert_eq!(*character, 'R');
                assert_eq!(header, "bad_tx");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("(R)"));
        assert_eq!(entry.sequence, "ACRT");
    }

    #[test]
    fn test_open_reads_gzip_and_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let text = ">tx1\nACGT\n>tx2\nGG\nCC\n";

        let plain_path = dir.path().join("plain.fa");
        std::fs::write(&plain_path, text).unwrap();

        let gz_path = dir.path().join("packed.fa.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        std::fs::write(&gz_path, encoder.finish().unwrap()).unwrap();

        for path in [&plain_path, &gz_path] {
            let lengths = sequence_lengths(path).unwrap();
            assert_eq!(lengths.get("tx1"), Some(&4));
            assert_eq!(lengths.get("tx2"), Some(&4));

            let sequences = read_sequences(path).unwrap();
            assert_eq!(sequences.get("tx2").map(String::as_str), Some("GGCC"));
        }
    }
}
