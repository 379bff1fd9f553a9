//! Object-store adapter.
//!
//! Parses `gs://` URIs, validates buckets and objects, and moves bytes
//! between the store and local files. Downloads land atomically: bytes
//! are written to a sibling temp file and renamed into place.

use crate::clients::Client;
use crate::error::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^gs://(?P<bucket>[a-z0-9][a-z0-9._-]{1,61}[a-z0-9])(?:/(?P<object>.*))?$")
            .unwrap_or_else(|e| panic!("invalid uri regex: {e}"))
    })
}

/// A parsed `gs://bucket/object` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsUri {
    /// Bucket name
    pub bucket: String,
    /// Object path within the bucket, absent for bucket-only URIs
    pub object: Option<String>,
}

impl GcsUri {
    /// Parse a `gs://` URI.
    pub fn parse(uri: &str) -> Result<Self> {
        let captures = uri_regex()
            .captures(uri)
            .ok_or_else(|| Error::Configuration(format!("malformed storage URI: {uri}")))?;
        let bucket = captures["bucket"].to_string();
        let object = captures
            .name("object")
            .map(|m| m.as_str().to_string())
            .filter(|o| !o.is_empty());
        Ok(Self { bucket, object })
    }

    /// Render back to `gs://` form.
    pub fn to_uri(&self) -> String {
        match &self.object {
            Some(object) => format!("gs://{}/{}", self.bucket, object),
            None => format!("gs://{}", self.bucket),
        }
    }
}

impl std::fmt::Display for GcsUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_uri())
    }
}

/// MIME type guessed from a file suffix, for stores that omit metadata.
pub fn mime_from_suffix(name: &str) -> Option<&'static str> {
    let suffix = name.rsplit('.').next()?.to_ascii_lowercase();
    match suffix.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "mp4" => Some("video/mp4"),
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        _ => None,
    }
}

/// Remote object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether the bucket exists and is visible to the caller.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;
    /// Whether the object exists.
    async fn object_exists(&self, bucket: &str, object: &str) -> Result<bool>;
    /// Content type recorded on the object, if any.
    async fn content_type(&self, bucket: &str, object: &str) -> Result<Option<String>>;
    /// Fetch the object's bytes.
    async fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>>;
    /// Write bytes to the object, overwriting any existing content.
    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;
}

/// Validate a URI against a store.
///
/// Checks the bucket, then (when required) the object, then (when
/// required) that the content type resolves to `image/*`, falling back
/// to a suffix guess when the store records no type.
pub async fn validate(
    store: &dyn ObjectStore,
    uri: &GcsUri,
    require_object: bool,
    require_image: bool,
) -> Result<()> {
    if !store.bucket_exists(&uri.bucket).await? {
        return Err(Error::NotFound(format!(
            "bucket {} does not exist or is inaccessible",
            uri.bucket
        )));
    }
    if !require_object && !require_image {
        return Ok(());
    }
    let object = uri.object.as_deref().ok_or_else(|| {
        Error::Configuration(format!("URI {} does not name an object", uri.to_uri()))
    })?;
    if !store.object_exists(&uri.bucket, object).await? {
        return Err(Error::NotFound(format!(
            "object {} not found in bucket {}",
            object, uri.bucket
        )));
    }
    if require_image {
        let content_type = match store.content_type(&uri.bucket, object).await? {
            Some(ct) => Some(ct),
            None => mime_from_suffix(object).map(str::to_string),
        };
        match content_type {
            Some(ct) if ct.starts_with("image/") => {}
            Some(ct) => {
                return Err(Error::Configuration(format!(
                    "object {object} has content type {ct}, expected image/*"
                )))
            }
            None => {
                return Err(Error::Configuration(format!(
                    "could not determine content type of object {object}"
                )))
            }
        }
    }
    Ok(())
}

/// Download an object to a local path.
///
/// The object is written to a temp file in the destination directory
/// and renamed over `local_path`, so readers never see partial bytes.
pub async fn download_to_file(
    store: &dyn ObjectStore,
    uri: &GcsUri,
    local_path: &Path,
) -> Result<()> {
    let object = uri.object.as_deref().ok_or_else(|| {
        Error::Configuration(format!("URI {} does not name an object", uri.to_uri()))
    })?;
    let bytes = store.download(&uri.bucket, object).await?;

    let parent = local_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let staged = parent.join(format!(
        ".{}.part",
        local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download")
    ));
    tokio::fs::write(&staged, &bytes).await.map_err(|e| {
        Error::FileProcessing(format!("failed to stage {}: {e}", staged.display()))
    })?;
    tokio::fs::rename(&staged, local_path).await.map_err(|e| {
        Error::FileProcessing(format!(
            "failed to move download into {}: {e}",
            local_path.display()
        ))
    })?;
    tracing::debug!(uri = %uri.to_uri(), path = %local_path.display(), "downloaded object");
    Ok(())
}

/// Upload a local file to an object URI, overwriting it.
pub async fn upload_file(store: &dyn ObjectStore, local_path: &Path, uri: &GcsUri) -> Result<()> {
    let object = uri.object.as_deref().ok_or_else(|| {
        Error::Configuration(format!("URI {} does not name an object", uri.to_uri()))
    })?;
    let bytes = tokio::fs::read(local_path).await.map_err(|e| {
        Error::FileProcessing(format!("failed to read {}: {e}", local_path.display()))
    })?;
    let content_type = mime_from_suffix(object).unwrap_or("application/octet-stream");
    store
        .upload(&uri.bucket, object, bytes, content_type)
        .await?;
    tracing::debug!(uri = %uri.to_uri(), "uploaded object");
    Ok(())
}

/// Object-store implementation over the storage JSON/media API.
pub struct GcsClient {
    client: std::sync::Arc<Client>,
}

impl GcsClient {
    /// Wrap a client bound to the object-store surface.
    pub fn new(client: std::sync::Arc<Client>) -> Self {
        Self { client }
    }

    fn encode(segment: &str) -> String {
        // Object names go into the path as a single URL-encoded segment.
        url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self
            .client
            .get_json(&format!("storage/v1/b/{bucket}"))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.status == crate::error::RemoteStatus::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn object_exists(&self, bucket: &str, object: &str) -> Result<bool> {
        let path = format!("storage/v1/b/{bucket}/o/{}", Self::encode(object));
        match self.client.get_json(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.status == crate::error::RemoteStatus::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn content_type(&self, bucket: &str, object: &str) -> Result<Option<String>> {
        let path = format!("storage/v1/b/{bucket}/o/{}", Self::encode(object));
        let meta = self.client.get_json(&path).await.map_err(Error::from)?;
        Ok(meta["contentType"].as_str().map(str::to_string))
    }

    async fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>> {
        let path = format!("storage/v1/b/{bucket}/o/{}?alt=media", Self::encode(object));
        self.client.get_bytes(&path).await.map_err(Error::from)
    }

    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let path = format!(
            "upload/storage/v1/b/{bucket}/o?uploadType=media&name={}",
            Self::encode(object)
        );
        self.client
            .post_bytes(&path, content_type, bytes)
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}
