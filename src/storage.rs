use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use base64::Engine;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{ApiError, ApiResult};

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn upload(&self, key: &str, body: Bytes, content_type: &str)
        -> anyhow::Result<StoredPhoto>;
    /// Idempotent: deleting an absent object succeeds.
    async fn delete(&self, public_id: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                cfg.access_key.clone(),
                cfg.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_base: cfg.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<StoredPhoto> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(StoredPhoto {
            url: format!("{}/{}/{}", self.public_base, self.bucket, key),
            public_id: key.to_string(),
        })
    }

    async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}

lazy_static! {
    static ref PUBLIC_ID_RE: Regex = Regex::new(r"upload/(?:v\d+/)?(.+)\.[^.]+$").unwrap();
}

/// Derives a deletable identifier from a bare URL, stripping any version
/// segment and the file extension.
pub fn public_id_from_url(url: &str) -> Option<String> {
    PUBLIC_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// A stored photo reference. New records store the `{url, publicId}` pair;
/// older records hold a bare string that is either a public id or a full
/// URL, and both shapes must stay readable and deletable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PhotoRef {
    Pair {
        url: String,
        #[serde(rename = "publicId")]
        public_id: String,
    },
    Legacy(String),
}

impl PhotoRef {
    pub fn public_id(&self) -> Option<String> {
        match self {
            PhotoRef::Pair { public_id, .. } => Some(public_id.clone()),
            PhotoRef::Legacy(value) => {
                if value.starts_with("http") {
                    public_id_from_url(value)
                } else {
                    Some(value.clone())
                }
            }
        }
    }

    /// Whether a client-supplied identifier (public id or raw legacy value)
    /// refers to this photo.
    pub fn matches(&self, needle: &str) -> bool {
        match self {
            PhotoRef::Pair { url, public_id } => public_id == needle || url == needle,
            PhotoRef::Legacy(value) => {
                value == needle || self.public_id().as_deref() == Some(needle)
            }
        }
    }
}

/// A photo submitted in a request body: base64 data plus an optional MIME
/// type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpload {
    pub data: String,
    pub content_type: Option<String>,
}

impl PhotoUpload {
    pub fn decode(&self) -> ApiResult<(Bytes, String)> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|_| ApiError::BadRequest("Invalid base64 image data".into()))?;
        let content_type = self
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".into());
        Ok((Bytes::from(bytes), content_type))
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Uploads one request photo under `<scope>/<uuid>.<ext>`.
pub async fn upload_photo(
    storage: &dyn StorageClient,
    scope: &str,
    upload: &PhotoUpload,
) -> ApiResult<PhotoRef> {
    let (body, content_type) = upload.decode()?;
    let ext = ext_from_mime(&content_type).unwrap_or("bin");
    let key = format!("{}/{}.{}", scope, Uuid::new_v4(), ext);
    let stored = storage.upload(&key, body, &content_type).await?;
    Ok(PhotoRef::Pair {
        url: stored.url,
        public_id: stored.public_id,
    })
}

pub async fn upload_photos(
    storage: &dyn StorageClient,
    scope: &str,
    uploads: &[PhotoUpload],
) -> ApiResult<Vec<PhotoRef>> {
    let mut refs = Vec::with_capacity(uploads.len());
    for upload in uploads {
        refs.push(upload_photo(storage, scope, upload).await?);
    }
    Ok(refs)
}

/// Deletes every referenced object, failing on the first storage error.
pub async fn delete_photos(storage: &dyn StorageClient, refs: &[PhotoRef]) -> anyhow::Result<()> {
    for r in refs {
        if let Some(id) = r.public_id() {
            storage.delete(&id).await?;
        }
    }
    Ok(())
}

/// Best-effort variant used by cascaded account deletion: storage failures
/// are logged and never block the caller.
pub async fn delete_photos_best_effort(storage: &dyn StorageClient, refs: &[PhotoRef]) {
    for r in refs {
        if let Some(id) = r.public_id() {
            if let Err(e) = storage.delete(&id).await {
                warn!(public_id = %id, error = %e, "failed to delete stored photo");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_id_parses_versioned_and_plain_urls() {
        assert_eq!(
            public_id_from_url("https://cdn.example.com/image/upload/v1712/rooms/abc123.jpg")
                .as_deref(),
            Some("rooms/abc123")
        );
        assert_eq!(
            public_id_from_url("https://cdn.example.com/image/upload/rooms/abc123.png").as_deref(),
            Some("rooms/abc123")
        );
        assert_eq!(public_id_from_url("https://cdn.example.com/nothing-here"), None);
    }

    #[test]
    fn photo_ref_deserializes_both_shapes() {
        let pair: PhotoRef =
            serde_json::from_str(r#"{"url":"https://x/y.jpg","publicId":"rooms/y"}"#).unwrap();
        assert_eq!(pair.public_id().as_deref(), Some("rooms/y"));

        let legacy: PhotoRef = serde_json::from_str(r#""rooms/z""#).unwrap();
        assert_eq!(legacy.public_id().as_deref(), Some("rooms/z"));

        let legacy_url: PhotoRef =
            serde_json::from_str(r#""https://cdn.example.com/upload/v9/rooms/w.jpg""#).unwrap();
        assert_eq!(legacy_url.public_id().as_deref(), Some("rooms/w"));
    }

    #[test]
    fn photo_ref_matches_id_or_url() {
        let pair = PhotoRef::Pair {
            url: "https://x/rooms/y.jpg".into(),
            public_id: "rooms/y".into(),
        };
        assert!(pair.matches("rooms/y"));
        assert!(pair.matches("https://x/rooms/y.jpg"));
        assert!(!pair.matches("rooms/other"));

        let legacy = PhotoRef::Legacy("rooms/z".into());
        assert!(legacy.matches("rooms/z"));
        assert!(!legacy.matches("rooms/y"));
    }

    #[test]
    fn upload_decode_rejects_bad_base64() {
        let upload = PhotoUpload {
            data: "not-base64!!".into(),
            content_type: Some("image/png".into()),
        };
        assert!(upload.decode().is_err());

        let upload = PhotoUpload {
            data: base64::engine::general_purpose::STANDARD.encode(b"fake-bytes"),
            content_type: None,
        };
        let (bytes, ct) = upload.decode().unwrap();
        assert_eq!(&bytes[..], b"fake-bytes");
        assert_eq!(ct, "application/octet-stream");
    }

    #[test]
    fn ext_from_mime_known_and_unknown() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/pdf"), None);
    }
}
