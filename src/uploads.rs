use std::collections::HashMap;

use anyhow::Context;
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
};
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;
pub const PICTURE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const PRESIGN_TTL_SECS: u64 = 30 * 60;

/// A file part of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

impl UploadItem {
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// Text fields and files of a multipart submission.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadItem>,
}

impl FormData {
    pub async fn from_multipart(mut mp: Multipart) -> AppResult<Self> {
        let mut form = FormData::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("Malformed form data: {e}")))?
        {
            let Some(name) = field.name().map(|n| n.trim_end_matches("[]").to_string()) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .map(str::to_string)
                        .unwrap_or_else(|| "application/octet-stream".into());
                    let body = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("Malformed form data: {e}")))?;
                    // Browsers send an empty part when no file is chosen.
                    if file_name.is_empty() && body.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadItem {
                            file_name,
                            content_type,
                            body,
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::validation(format!("Malformed form data: {e}")))?;
                    form.fields.entry(name).or_default().push(value);
                }
            }
        }
        Ok(form)
    }

    pub fn insert_text(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(value.into());
    }

    pub fn insert_file(&mut self, name: &str, item: UploadItem) {
        self.files.insert(name.to_string(), item);
    }

    /// First value of a text field, as submitted.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Trimmed text; `None` when absent or blank.
    pub fn non_empty(&self, name: &str) -> Option<String> {
        self.text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn list(&self, name: &str) -> Vec<String> {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadItem> {
        self.files.remove(name)
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mp = Multipart::from_request(req, state).await?;
        Self::from_multipart(mp).await
    }
}

/// Size cap and extension allow-list for profile pictures.
pub fn check_picture(item: &UploadItem) -> AppResult<()> {
    if item.size() > MAX_PICTURE_BYTES {
        warn!(size = item.size(), "profile picture too large");
        return Err(AppError::validation("Profile picture must be less than 5MB."));
    }
    match item.extension() {
        Some(ext) if PICTURE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        other => {
            warn!(extension = ?other, "invalid profile picture extension");
            Err(AppError::validation(
                "Profile picture must be a JPG, JPEG, PNG, or GIF file.",
            ))
        }
    }
}

pub fn check_pdf(item: &UploadItem, label: &str) -> AppResult<()> {
    if item.extension().as_deref() != Some("pdf") {
        return Err(AppError::validation(format!("{label} must be a PDF file.")));
    }
    Ok(())
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "application/pdf" => Some("pdf"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "video/quicktime" => Some("mov"),
        _ => None,
    }
}

/// Stores `item` under `{prefix}/{owner}/{uuid}.{ext}` and returns the key.
pub async fn store(
    st: &AppState,
    prefix: &str,
    owner: Uuid,
    item: UploadItem,
) -> anyhow::Result<String> {
    let ext = item
        .extension()
        .or_else(|| ext_from_mime(&item.content_type).map(str::to_string))
        .unwrap_or_else(|| "bin".into());
    let key = format!("{}/{}/{}.{}", prefix, owner, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best-effort removal; failures are only logged.
pub async fn discard(st: &AppState, keys: &[String]) {
    for key in keys {
        if let Err(e) = st.storage.delete_object(key).await {
            warn!(error = %e, key = %key, "failed to delete stored object");
        }
    }
}

pub async fn presign(st: &AppState, key: &str) -> anyhow::Result<String> {
    st.storage
        .presign_get(key, PRESIGN_TTL_SECS)
        .await
        .with_context(|| format!("presign url for key {}", key))
}

pub async fn presign_opt(st: &AppState, key: Option<&str>) -> anyhow::Result<Option<String>> {
    match key {
        Some(k) => presign(st, k).await.map(Some),
        None => Ok(None),
    }
}
