//! Stages multipart uploads on local disk before they are forwarded to the media host.
//!
//! Staged files are temp files: they are removed when dropped, so nothing is left
//! behind whether the request succeeds or fails.

use std::{collections::HashMap, path::Path};

use anyhow::Context;
use axum::extract::Multipart;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Upper bound for a multipart request body.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub struct StagedFile {
    file: NamedTempFile,
    content_type: String,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// Text fields and staged files of one multipart request.
#[derive(Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, StagedFile>,
}

impl MultipartForm {
    /// Reads every field. Parts with a filename are staged under `dir`; only the first
    /// non-empty file per field name is kept.
    pub async fn stage(mut mp: Multipart, dir: &Path) -> ApiResult<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create upload dir {}", dir.display()))?;

        let mut form = Self::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if field.file_name().is_some() {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.body_text()))?;
                if data.is_empty() || form.files.contains_key(&name) {
                    continue;
                }

                let file = tempfile::Builder::new()
                    .prefix("upload-")
                    .tempfile_in(dir)
                    .context("create staging file")?;
                tokio::fs::write(file.path(), &data)
                    .await
                    .context("write staging file")?;
                debug!(field = %name, bytes = data.len(), "staged upload");
                form.files.insert(name, StagedFile { file, content_type });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.body_text()))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Takes the file staged under the first of `names` that has one.
    pub fn take_file(&mut self, names: &[&str]) -> Option<StagedFile> {
        names.iter().find_map(|n| self.files.remove(*n))
    }
}
