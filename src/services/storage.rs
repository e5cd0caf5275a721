use crate::config::AppConfig;
use crate::error::ApiError;
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

const HASH_CHUNK_SIZE: usize = 8192;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Kinds of uploads that go through the staging directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Ribo,
    Reference,
}

impl UploadKind {
    pub fn extension(&self) -> &'static str {
        match self {
            UploadKind::Ribo => "ribo",
            UploadKind::Reference => "gz",
        }
    }
}

/// A staged upload, named after its content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    pub digest: String,
    pub path: PathBuf,
}

/// On-disk layout of staged and permanent files.
#[derive(Debug)]
pub struct StorageService {
    staging_dir: PathBuf,
    ribo_dir: PathBuf,
    reference_dir: PathBuf,
    // Serializes placing shared files with removing orphaned ones
    placement: Mutex<()>,
}

impl StorageService {
    pub fn new(config: &AppConfig) -> Result<Self, io::Error> {
        let service = Self {
            staging_dir: PathBuf::from(&config.staging_dir),
            ribo_dir: PathBuf::from(&config.ribo_dir),
            reference_dir: PathBuf::from(&config.reference_dir),
            placement: Mutex::new(()),
        };

        for dir in [
            &service.staging_dir,
            &service.ribo_dir,
            &service.reference_dir,
        ] {
            fs::create_dir_all(dir)?;
        }
        info!(
            "Storage initialized: staging={:?}, ribo={:?}, references={:?}",
            service.staging_dir, service.ribo_dir, service.reference_dir
        );

        Ok(service)
    }

    /// A fresh path in the staging directory for an incoming multipart file.
    pub fn incoming_path(&self) -> PathBuf {
        self.staging_dir
            .join(format!("upload-{}.part", uuid::Uuid::new_v4()))
    }

    /// Hashes a freshly received file and renames it to `<digest>.<ext>`
    /// inside the staging directory. Reference files are gzip compressed
    /// on the way if they arrived uncompressed.
    pub fn stage(&self, incoming: &Path, kind: UploadKind) -> Result<StagedUpload, io::Error> {
        let digest = hash_file(incoming)?;
        let path = self.staged_path(&digest, kind);

        if kind == UploadKind::Reference && !is_gzip(incoming)? {
            gzip_file(incoming, &path)?;
            fs::remove_file(incoming)?;
        } else {
            move_file(incoming, &path)?;
        }

        debug!("Staged upload {digest} at {path:?}");
        Ok(StagedUpload { digest, path })
    }

    /// Looks up a previously staged upload. Malformed digests and missing
    /// files are both reported as not found.
    pub fn find_staged(&self, digest: &str, kind: UploadKind) -> Result<StagedUpload, ApiError> {
        if !is_valid_digest(digest) {
            return Err(ApiError::NotFound(format!("No staged upload '{digest}'")));
        }

        let path = self.staged_path(digest, kind);
        if !path.is_file() {
            return Err(ApiError::NotFound(format!("No staged upload '{digest}'")));
        }

        Ok(StagedUpload {
            digest: digest.to_string(),
            path,
        })
    }

    pub fn staged_path(&self, digest: &str, kind: UploadKind) -> PathBuf {
        self.staging_dir
            .join(format!("{digest}.{}", kind.extension()))
    }

    pub fn ribo_destination(&self, project_id: i32, digest: &str) -> PathBuf {
        self.ribo_dir
            .join(project_id.to_string())
            .join(format!("{digest}.{}", UploadKind::Ribo.extension()))
    }

    pub fn reference_destination(&self, digest: &str) -> PathBuf {
        self.reference_dir
            .join(format!("{digest}.{}", UploadKind::Reference.extension()))
    }

    /// Held while a permanent file is placed and its records written, and
    /// while records are deleted and their orphaned files removed.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.placement.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves a staged upload to `destination` unless an identical file is
    /// already stored there. Returns whether the stored file was reused; in
    /// that case the staged copy is left for the caller to remove once its
    /// records are committed.
    pub fn place(&self, staged: &StagedUpload, destination: &Path) -> Result<bool, io::Error> {
        if destination.is_file() {
            debug!("Reusing stored file {destination:?} for {}", staged.digest);
            return Ok(true);
        }

        move_file(&staged.path, destination)?;
        Ok(false)
    }

    /// Removes a stored file, tolerating one that is already gone.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<(), io::Error> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed {path:?}");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("File {path:?} was already removed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// SHA-256 of a file, lowercase hex, read in fixed-size chunks.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String, io::Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

pub fn is_valid_digest(digest: &str) -> bool {
    digest.len() == 64
        && digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Renames `from` to `to`, creating parent directories and copying when
/// the two sit on different filesystems. `to` only ever appears complete.
pub fn move_file(from: &Path, to: &Path) -> Result<(), io::Error> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }

    if let Err(e) = fs::rename(from, to) {
        debug!("Rename {from:?} -> {to:?} failed ({e}), copying instead");
        copy_into_place(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

/// Copies `from` next to `to` under a temporary name and renames it into
/// place. A failed copy leaves nothing at `to`.
fn copy_into_place(from: &Path, to: &Path) -> Result<(), io::Error> {
    let file_name = to
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let partial = to.with_file_name(format!(".{file_name}.{}.part", uuid::Uuid::new_v4()));

    let result = fs::copy(from, &partial).and_then(|_| fs::rename(&partial, to));
    if let Err(e) = result {
        match fs::remove_file(&partial) {
            Err(cleanup) if cleanup.kind() != io::ErrorKind::NotFound => {
                warn!("Failed to remove partial copy {partial:?}: {cleanup}");
            }
            _ => {}
        }
        return Err(e);
    }
    Ok(())
}

fn is_gzip(path: &Path) -> Result<bool, io::Error> {
    let mut magic = [0u8; 2];
    let mut file = File::open(path)?;
    let mut read = 0;
    while read < magic.len() {
        match file.read(&mut magic[read..])? {
            0 => return Ok(false),
            n => read += n,
        }
    }
    Ok(magic == GZIP_MAGIC)
}

fn gzip_file(from: &Path, to: &Path) -> Result<(), io::Error> {
    let mut reader = BufReader::new(File::open(from)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(to)?), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::MultiGzDecoder;
    use tempfile::TempDir;

    fn storage(temp_dir: &TempDir) -> StorageService {
        StorageService::new(&AppConfig::with_data_dir(temp_dir.path())).unwrap()
    }

    #[test]
    fn test_hash_file_is_sha256() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();

        assert_eq!(
            hash_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_file_spanning_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("large.bin");
        let content = vec![7u8; HASH_CHUNK_SIZE * 3 + 17];
        fs::write(&path, &content).unwrap();

        let expected = hex::encode(Sha256::digest(&content));
        assert_eq!(hash_file(&path).unwrap(), expected);
    }

    #[test]
    fn test_digest_validation() {
        assert!(is_valid_digest(&"a".repeat(64)));
        assert!(!is_valid_digest(&"A".repeat(64)));
        assert!(!is_valid_digest(&"a".repeat(63)));
        assert!(!is_valid_digest("../../etc/passwd"));
    }

    #[test]
    fn test_stage_ribo_upload_renames_to_digest() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);
        let incoming = storage.incoming_path();
        fs::write(&incoming, b"{}").unwrap();

        let staged = storage.stage(&incoming, UploadKind::Ribo).unwrap();
        assert!(!incoming.exists());
        assert!(staged.path.ends_with(format!("{}.ribo", staged.digest)));

        let found = storage.find_staged(&staged.digest, UploadKind::Ribo).unwrap();
        assert_eq!(found, staged);
        assert!(storage.find_staged(&"0".repeat(64), UploadKind::Ribo).is_err());
    }

    #[test]
    fn test_stage_reference_compresses_plain_fasta() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);
        let incoming = storage.incoming_path();
        fs::write(&incoming, b">tx1\nACGT\n").unwrap();

        let staged = storage.stage(&incoming, UploadKind::Reference).unwrap();
        assert!(is_gzip(&staged.path).unwrap());

        let mut text = String::new();
        MultiGzDecoder::new(File::open(&staged.path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, ">tx1\nACGT\n");
    }

    #[test]
    fn test_move_file_creates_parent_and_remove_tolerates_missing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);
        let from = temp_dir.path().join("source.ribo");
        fs::write(&from, b"data").unwrap();

        let to = storage.ribo_destination(3, &"b".repeat(64));
        move_file(&from, &to).unwrap();
        assert!(to.is_file());
        assert!(to.parent().unwrap().ends_with("3"));

        storage.remove(&to).unwrap();
        storage.remove(&to).unwrap();
        assert!(!to.exists());
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_copy_into_place_writes_complete_file() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("source.ribo");
        fs::write(&from, b"complete contents").unwrap();
        let target_dir = temp_dir.path().join("target");
        fs::create_dir_all(&target_dir).unwrap();
        let to = target_dir.join("stored.ribo");

        copy_into_place(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"complete contents");
        assert_eq!(dir_entries(&target_dir), vec!["stored.ribo".to_string()]);
    }

    #[test]
    fn test_failed_copy_leaves_no_destination() {
        let temp_dir = TempDir::new().unwrap();
        let target_dir = temp_dir.path().join("target");
        fs::create_dir_all(&target_dir).unwrap();
        let to = target_dir.join("stored.ribo");

        let missing = temp_dir.path().join("missing.ribo");
        assert!(copy_into_place(&missing, &to).is_err());
        assert!(!to.exists());
        assert!(dir_entries(&target_dir).is_empty());
    }

    #[test]
    fn test_place_reuses_stored_file_and_keeps_staged_copy() {
        let temp_dir = TempDir::new().unwrap();
        let storage = storage(&temp_dir);

        let incoming = storage.incoming_path();
        fs::write(&incoming, b"{}").unwrap();
        let staged = storage.stage(&incoming, UploadKind::Ribo).unwrap();
        let destination = storage.ribo_destination(1, &staged.digest);

        assert!(!storage.place(&staged, &destination).unwrap());
        assert!(destination.is_file());
        assert!(!staged.path.exists());

        let incoming = storage.incoming_path();
        fs::write(&incoming, b"{}").unwrap();
        let staged = storage.stage(&incoming, UploadKind::Ribo).unwrap();
        assert!(storage.place(&staged, &destination).unwrap());
        assert!(staged.path.exists());
    }
}
