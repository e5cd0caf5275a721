use super::RiboFile;
use super::handle::TranscriptAlias;
use sha2::{Digest, Sha256};

/// Regex extracting the `GeneName-TranscriptNumber` field of APPRIS style
/// transcript names.
pub const APPRIS_TRANSCRIPT_REGEX: &str = r"^(?:[^|]*\|){4}([^|]*)\|.*$";

/// Names with more separators than this are treated as APPRIS names.
const APPRIS_MIN_SEPARATORS: usize = 8;

/// Hashes the transcript names followed by their lengths. Two ribo files
/// share a digest exactly when their transcript order, names and lengths
/// agree, which is how experiments on the same reference are grouped.
pub fn digest_reference(names: &[String], lengths: &[u64]) -> String {
    let names_string = names.join(",");
    let lengths_string = lengths
        .iter()
        .map(|length| length.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let mut hasher = Sha256::new();
    hasher.update(names_string.as_bytes());
    hasher.update(lengths_string.as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of the transcriptome stored in a ribo file.
pub fn digest_ribo(ribo: &dyn RiboFile) -> String {
    digest_reference(ribo.transcript_names(), ribo.transcript_lengths())
}

/// Returns the alias regex to store for a ribo file, or an empty string when
/// the transcript names should be shown as they are.
pub fn detect_transcript_regex(names: &[String]) -> String {
    let Some(first) = names.first() else {
        return String::new();
    };

    if first.matches('|').count() <= APPRIS_MIN_SEPARATORS {
        return String::new();
    }

    match TranscriptAlias::new(APPRIS_TRANSCRIPT_REGEX, names) {
        Ok(_) => APPRIS_TRANSCRIPT_REGEX.to_string(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_digest_is_stable_and_hex() {
        let a = digest_reference(&names(&["tx1", "tx2"]), &[100, 200]);
        let b = digest_reference(&names(&["tx1", "tx2"]), &[100, 200]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_digest_distinguishes_order_names_and_lengths() {
        let base = digest_reference(&names(&["tx1", "tx2"]), &[100, 200]);
        assert_ne!(base, digest_reference(&names(&["tx2", "tx1"]), &[200, 100]));
        assert_ne!(base, digest_reference(&names(&["tx1", "tx3"]), &[100, 200]));
        assert_ne!(base, digest_reference(&names(&["tx1", "tx2"]), &[100, 201]));
    }

    #[test]
    fn test_digest_matches_concatenated_string() {
        let expected = hex::encode(Sha256::digest(b"tx1,tx2100,200"));
        assert_eq!(
            digest_reference(&names(&["tx1", "tx2"]), &[100, 200]),
            expected
        );
    }

    #[test]
    fn test_detects_appris_names() {
        let appris = names(&[
            "ENSMUST01|ENSMUSG01|OTTMUSG01|OTTMUST01|Rfpl4-201|Rfpl4|1000|UTR5:1-10|CDS:11-900|UTR3:901-1000|",
            "ENSMUST02|ENSMUSG02|OTTMUSG02|OTTMUST02|Gapdh-201|Gapdh|1200|UTR5:1-10|CDS:11-900|UTR3:901-1200|",
        ]);
        assert_eq!(detect_transcript_regex(&appris), APPRIS_TRANSCRIPT_REGEX);
    }

    #[test]
    fn test_plain_names_get_no_regex() {
        assert_eq!(detect_transcript_regex(&names(&["tx1", "tx2"])), "");
        assert_eq!(detect_transcript_regex(&[]), "");
    }

    #[test]
    fn test_duplicate_aliases_get_no_regex() {
        let clashing = names(&[
            "a|b|c|d|Same-201|f|g|h|i|j|",
            "k|l|m|n|Same-201|p|q|r|s|t|",
        ]);
        assert_eq!(detect_transcript_regex(&clashing), "");
    }
}
