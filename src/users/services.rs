use lazy_static::lazy_static;
use regex::Regex;
use tracing::error;
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, state::AppState, uploads::StagedFile};

use super::dto::TokenPair;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Returns the value if present and not blank after trimming.
pub(crate) fn required(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_owned)
}

pub(crate) fn sign_pair(keys: &JwtKeys, user_id: Uuid) -> anyhow::Result<TokenPair> {
    Ok(TokenPair {
        access_token: keys.sign_access(user_id)?,
        refresh_token: keys.sign_refresh(user_id)?,
    })
}

/// Pushes a staged file to the media host. Failures are logged and reported as `None`;
/// the caller decides whether a missing URL is fatal.
pub(crate) async fn upload_media(state: &AppState, file: &StagedFile) -> Option<String> {
    match state.media.upload(file.path(), file.content_type()).await {
        Ok(url) => Some(url),
        Err(e) => {
            error!(error = ?e, "media upload failed");
            None
        }
    }
}
