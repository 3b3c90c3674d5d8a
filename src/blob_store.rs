// ABOUTME: On-disk blob store for uploaded files keyed by generated, path-safe names
// ABOUTME: Uploads are staged into temp files and atomically renamed into place on commit

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub const MAX_RESOURCE_BYTES: u64 = 500 * 1024 * 1024;
pub const MAX_PROFILE_PICTURE_BYTES: u64 = 5 * 1024 * 1024;

const PROFILE_DIR: &str = "profile-pictures";
const RESOURCES_DIR: &str = "resources";
const CERTIFICATES_DIR: &str = "certificates";
const STAGING_DIR: &str = ".staging";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    ProfilePicture,
    Resource,
    ActivityCertificate,
    Certificate,
}

impl BlobKind {
    fn prefix(&self) -> &'static str {
        match self {
            BlobKind::ProfilePicture => "profile",
            BlobKind::Resource => "resource",
            BlobKind::ActivityCertificate => "activity",
            BlobKind::Certificate => "certificate",
        }
    }

    fn from_key(key: &str) -> Self {
        let prefix = key.split('_').next().unwrap_or_default();
        match prefix {
            "profile" => BlobKind::ProfilePicture,
            "certificate" => BlobKind::Certificate,
            "activity" => BlobKind::ActivityCertificate,
            _ => BlobKind::Resource,
        }
    }
}

/// An upload that has been written to a temp file but not yet given a key.
/// Dropping it removes the temp file, so abandoned uploads leave nothing behind.
#[derive(Debug)]
pub struct StagedBlob {
    file: NamedTempFile,
    size: u64,
    original_name: String,
    content_type: String,
}

impl StagedBlob {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Extension the committed key would carry, dot included.
    pub fn extension(&self) -> String {
        extension_of(&self.original_name)
    }
}

#[derive(Debug)]
pub struct BlobHandle {
    pub file: tokio::fs::File,
    pub len: u64,
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Opens the store rooted at `root`, creating its directories when missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let store = Self { root };
        for dir in [
            store.dir_for(BlobKind::ProfilePicture),
            store.dir_for(BlobKind::Resource),
            store.dir_for(BlobKind::Certificate),
            store.staging_dir(),
        ] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                tracing::info!("Created upload directory: {}", dir.display());
            }
        }
        Ok(store)
    }

    fn dir_for(&self, kind: BlobKind) -> PathBuf {
        match kind {
            BlobKind::ProfilePicture => self.root.join(PROFILE_DIR),
            BlobKind::Resource | BlobKind::ActivityCertificate => self.root.join(RESOURCES_DIR),
            BlobKind::Certificate => self.root.join(CERTIFICATES_DIR),
        }
    }

    fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// Resolves a key to its on-disk path. The file may not exist.
    pub fn path_of(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir_for(BlobKind::from_key(key)).join(key))
    }

    /// Streams an upload into a temp file, enforcing `limit` as it goes.
    pub async fn stage<S, E>(
        &self,
        original_name: &str,
        content_type: &str,
        mut stream: S,
        limit: u64,
    ) -> Result<StagedBlob>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        validate_original_name(original_name)?;

        let staging = self.staging_dir();
        let temp = tokio::task::spawn_blocking(move || NamedTempFile::new_in(staging)).await??;
        let mut file = tokio::fs::File::from_std(temp.as_file().try_clone()?);

        let mut size: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| AppError::Internal(format!("Upload stream failed: {}", e)))?;
            size += chunk.len() as u64;
            if size > limit {
                return Err(AppError::TooLarge { limit });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;

        if size == 0 {
            return Err(AppError::EmptyFile);
        }

        Ok(StagedBlob {
            file: temp,
            size,
            original_name: original_name.to_string(),
            content_type: content_type.to_string(),
        })
    }

    /// Stages an in-memory upload.
    pub async fn stage_bytes(
        &self,
        original_name: &str,
        content_type: &str,
        bytes: impl Into<Bytes>,
        limit: u64,
    ) -> Result<StagedBlob> {
        let chunk: std::result::Result<Bytes, std::io::Error> = Ok(bytes.into());
        self.stage(original_name, content_type, futures::stream::iter([chunk]), limit)
            .await
    }

    /// Moves a staged upload into place under a freshly generated key.
    pub async fn commit(&self, staged: StagedBlob, kind: BlobKind) -> Result<String> {
        let key = generate_key(kind, &staged.original_name);
        let target = self.dir_for(kind).join(&key);
        persist(staged, target).await?;
        tracing::debug!("Stored blob {}", key);
        Ok(key)
    }

    /// Overwrites the content stored under an existing key.
    pub async fn replace(&self, key: &str, staged: StagedBlob) -> Result<()> {
        let target = self.path_of(key)?;
        persist(staged, target).await
    }

    pub async fn open(&self, key: &str) -> Result<BlobHandle> {
        let path = self.path_of(key)?;
        let file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound(format!("File not found: {}", key)),
            _ => AppError::from(e),
        })?;
        let len = file.metadata().await?.len();
        Ok(BlobHandle { file, len })
    }

    pub async fn exists(&self, key: &str) -> bool {
        match self.path_of(key) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Removes a blob. Deleting a key that is already gone succeeds.
    pub async fn delete(&self, key: &str) -> std::io::Result<()> {
        let path = self
            .path_of(key)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// True when every upload directory exists and accepts writes.
    pub async fn healthy(&self) -> bool {
        let dirs = [
            self.dir_for(BlobKind::ProfilePicture),
            self.dir_for(BlobKind::Resource),
            self.dir_for(BlobKind::Certificate),
        ];
        tokio::task::spawn_blocking(move || {
            dirs.iter()
                .all(|dir| dir.is_dir() && tempfile::tempfile_in(dir).is_ok())
        })
        .await
        .unwrap_or(false)
    }

    pub fn directory_info(&self) -> String {
        format!(
            "Profile Pictures: {}, Resources: {}, Certificates: {}",
            self.dir_for(BlobKind::ProfilePicture).display(),
            self.dir_for(BlobKind::Resource).display(),
            self.dir_for(BlobKind::Certificate).display()
        )
    }
}

async fn persist(staged: StagedBlob, target: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || staged.file.persist(target).map(|_| ()))
        .await?
        .map_err(|e| AppError::from(e.error))
}

/// Replaces every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The sanitized `.ext` suffix of an uploaded name, or an empty string.
pub fn extension_of(original_name: &str) -> String {
    let sanitized = sanitize_filename(original_name);
    match sanitized.rfind('.') {
        Some(idx) if idx + 1 < sanitized.len() => sanitized[idx..].to_string(),
        _ => String::new(),
    }
}

fn generate_key(kind: BlobKind, original_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!(
        "{}_{}_{}{}",
        kind.prefix(),
        millis,
        Uuid::new_v4(),
        extension_of(original_name)
    )
}

fn validate_original_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("file", "File has no name"));
    }
    if name.contains("..") {
        return Err(AppError::validation(
            "file",
            format!("Filename contains invalid path sequence {}", name),
        ));
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<()> {
    let well_formed = !key.is_empty()
        && !key.contains("..")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if well_formed {
        Ok(())
    } else {
        Err(AppError::validation("fileName", "Invalid storage key"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (BlobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("uploads")).unwrap();
        (store, temp_dir)
    }

    fn staged_files(store: &BlobStore) -> usize {
        std::fs::read_dir(store.staging_dir()).unwrap().count()
    }

    #[tokio::test]
    async fn test_commit_open_delete() {
        let (store, _temp_dir) = create_test_store();

        let staged = store
            .stage_bytes("notes.pdf", "application/pdf", &b"%PDF-1.4"[..], MAX_RESOURCE_BYTES)
            .await
            .unwrap();
        let key = store.commit(staged, BlobKind::Resource).await.unwrap();

        assert!(key.starts_with("resource_"));
        assert!(key.ends_with(".pdf"));
        assert!(store.exists(&key).await);

        let handle = store.open(&key).await.unwrap();
        assert_eq!(handle.len, 8);

        store.delete(&key).await.unwrap();
        assert!(store.open(&key).await.unwrap_err().is_not_found());

        // Deleting again is not an error
        store.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_chunked_stream_is_concatenated() {
        let (store, _temp_dir) = create_test_store();

        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let staged = store
            .stage("a.txt", "text/plain", futures::stream::iter(chunks), 64)
            .await
            .unwrap();
        let key = store.commit(staged, BlobKind::Resource).await.unwrap();

        let content = tokio::fs::read(store.path_of(&key).unwrap()).await.unwrap();
        assert_eq!(content, b"hello world");
    }

    #[tokio::test]
    async fn test_size_boundaries() {
        let (store, _temp_dir) = create_test_store();
        let limit = 16u64;

        let empty = store.stage_bytes("a.bin", "application/octet-stream", Vec::new(), limit).await;
        assert!(matches!(empty, Err(AppError::EmptyFile)));

        for size in [1, limit - 1, limit] {
            let staged = store
                .stage_bytes("a.bin", "application/octet-stream", vec![7u8; size as usize], limit)
                .await
                .unwrap();
            assert_eq!(staged.size(), size);
        }

        let over = store
            .stage_bytes("a.bin", "application/octet-stream", vec![7u8; limit as usize + 1], limit)
            .await;
        assert!(matches!(over, Err(AppError::TooLarge { limit: 16 })));

        // Rejected and dropped uploads leave no temp files
        assert_eq!(staged_files(&store), 0);
    }

    #[tokio::test]
    async fn test_failed_stream_removes_temp_file() {
        let (store, _temp_dir) = create_test_store();

        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
        ];
        let result = store
            .stage("a.txt", "text/plain", futures::stream::iter(chunks), 64)
            .await;
        assert!(result.is_err());
        assert_eq!(staged_files(&store), 0);
    }

    #[tokio::test]
    async fn test_rejects_traversal_names_and_keys() {
        let (store, _temp_dir) = create_test_store();

        let result = store.stage_bytes("../../etc/passwd", "text/plain", "x", 64).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        assert!(store.path_of("../secret").is_err());
        assert!(store.path_of("resource_1_x/y.pdf").is_err());
        assert!(store.path_of("").is_err());
        assert!(store.open("..").await.is_err());
    }

    #[tokio::test]
    async fn test_replace_overwrites_existing_key() {
        let (store, _temp_dir) = create_test_store();

        let staged = store.stage_bytes("v1.txt", "text/plain", "first", 64).await.unwrap();
        let key = store.commit(staged, BlobKind::Resource).await.unwrap();

        let staged = store.stage_bytes("v2.txt", "text/plain", "second!", 64).await.unwrap();
        assert_eq!(staged.extension(), ".txt");
        store.replace(&key, staged).await.unwrap();

        let content = tokio::fs::read(store.path_of(&key).unwrap()).await.unwrap();
        assert_eq!(content, b"second!");
        assert_eq!(store.open(&key).await.unwrap().len, 7);
    }

    #[tokio::test]
    async fn test_certificates_live_in_their_own_directory() {
        let (store, _temp_dir) = create_test_store();

        let staged = store.stage_bytes("c.png", "image/png", "png", 64).await.unwrap();
        let key = store.commit(staged, BlobKind::Certificate).await.unwrap();

        let path = store.path_of(&key).unwrap();
        assert!(path.parent().unwrap().ends_with(CERTIFICATES_DIR));
        assert!(path.exists());
    }

    #[test]
    fn test_sanitize_and_extension() {
        assert_eq!(sanitize_filename("my notes (v2).pdf"), "my_notes__v2_.pdf");
        assert_eq!(extension_of("lecture.PPTX"), ".PPTX");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of("weird name.t x t"), ".t_x_t");
    }

    #[tokio::test]
    async fn test_healthy_directories() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.healthy().await);

        std::fs::remove_dir_all(store.dir_for(BlobKind::Certificate)).unwrap();
        assert!(!store.healthy().await);
    }
}
