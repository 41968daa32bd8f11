use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookies::{with_session, without_session, REFRESH_COOKIE},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::verify_password,
    },
    error::{ApiError, ApiResult},
    response::{ApiResponse, Empty},
    state::AppState,
    uploads::{MultipartForm, MAX_UPLOAD_BYTES},
};

use super::{
    dto::{
        ChangePasswordRequest, LoginData, LoginRequest, PublicUser, RefreshRequest, TokenPair,
        UpdateAccountRequest,
    },
    repo_types::NewUser,
    services::{is_valid_email, required, sign_pair, upload_media},
};

const STALE_REFRESH: &str = "Invalid refresh token, please login again";
const COVER_FIELDS: &[&str] = &["coverImage", "coverImages"];

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/refresh-token", post(refresh_token))
        .route("/users/change-password", post(change_password))
        .route("/users/current-user", get(current_user))
        .route("/users/update-account", patch(update_account))
        .route("/users/avatar", patch(update_avatar))
        .route("/users/cover-image", patch(update_cover_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    WithRejection(mp, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let mut form = MultipartForm::stage(mp, &state.config.upload_dir).await?;

    let (Some(user_name), Some(email), Some(full_name), Some(password)) = (
        required(form.text("userName")),
        required(form.text("email")),
        required(form.text("fullName")),
        required(form.text("password")),
    ) else {
        warn!("registration with missing fields");
        return Err(ApiError::Validation("All fields are required".into()));
    };
    let user_name = user_name.trim().to_lowercase();
    let email = email.trim().to_lowercase();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    if state
        .users
        .find_by_email_or_username(Some(&email), Some(&user_name))
        .await?
        .is_some()
    {
        warn!(email = %email, user_name = %user_name, "user already exists");
        return Err(ApiError::Conflict(
            "User with email or username already exists".into(),
        ));
    }

    let avatar_file = form
        .take_file(&["avatar"])
        .ok_or_else(|| ApiError::Validation("Avatar file is required".into()))?;
    let cover_file = form.take_file(COVER_FIELDS);

    let avatar = upload_media(&state, &avatar_file)
        .await
        .ok_or_else(|| ApiError::Upstream("Error while uploading avatar".into()))?;
    let cover_image = match &cover_file {
        Some(file) => upload_media(&state, file).await,
        None => None,
    };

    let user = state
        .users
        .create(NewUser {
            user_name,
            email,
            full_name: full_name.trim().to_owned(),
            password,
            avatar,
            cover_image,
        })
        .await?;

    info!(user_id = %user.id, user_name = %user.user_name, "user registered");
    Ok(ApiResponse::created(
        PublicUser::from(&user),
        "User registered successfully",
    ))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<(CookieJar, ApiResponse<LoginData>)> {
    let email = required(payload.email.as_deref()).map(|e| e.trim().to_lowercase());
    let user_name = required(payload.user_name.as_deref()).map(|u| u.trim().to_lowercase());
    if email.is_none() && user_name.is_none() {
        return Err(ApiError::Validation("Username or email is required".into()));
    }
    let password = required(payload.password.as_deref())
        .ok_or_else(|| ApiError::Validation("Password is required".into()))?;

    let user = state
        .users
        .find_by_email_or_username(email.as_deref(), user_name.as_deref())
        .await?
        .ok_or_else(|| {
            warn!(email = ?email, user_name = ?user_name, "login for unknown user");
            ApiError::NotFound("User does not exist".into())
        })?;

    if !verify_password(&password, &user.password_hash).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid user credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let tokens = sign_pair(&keys, user.id)?;
    state
        .users
        .set_refresh_token(user.id, Some(&tokens.refresh_token))
        .await?;

    let jar = with_session(
        jar,
        &keys,
        state.config.cookie_secure,
        &tokens.access_token,
        &tokens.refresh_token,
    );

    info!(user_id = %user.id, "user logged in");
    Ok((
        jar,
        ApiResponse::ok(
            LoginData {
                user: PublicUser::from(&user),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<Empty>)> {
    state.users.set_refresh_token(user.id, None).await?;
    info!(user_id = %user.id, "user logged out");
    Ok((
        without_session(jar),
        ApiResponse::ok(Empty::default(), "User logged out"),
    ))
}

#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> ApiResult<(CookieJar, ApiResponse<TokenPair>)> {
    let incoming = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .and_then(|r| r.refresh_token)
                .filter(|t| !t.is_empty())
        })
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&incoming).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        ApiError::Unauthorized("Invalid refresh token".into())
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        warn!(user_id = %user.id, "superseded refresh token presented");
        return Err(ApiError::Unauthorized(STALE_REFRESH.into()));
    }

    let tokens = sign_pair(&keys, user.id)?;
    if !state
        .users
        .rotate_refresh_token(user.id, &incoming, &tokens.refresh_token)
        .await?
    {
        warn!(user_id = %user.id, "refresh token rotated concurrently");
        return Err(ApiError::Unauthorized(STALE_REFRESH.into()));
    }

    let jar = with_session(
        jar,
        &keys,
        state.config.cookie_secure,
        &tokens.access_token,
        &tokens.refresh_token,
    );

    info!(user_id = %user.id, "tokens refreshed");
    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
}

#[instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(payload), _): WithRejection<Json<ChangePasswordRequest>, ApiError>,
) -> ApiResult<ApiResponse<Empty>> {
    let (Some(old_password), Some(new_password), Some(confirm_password)) = (
        required(payload.old_password.as_deref()),
        required(payload.new_password.as_deref()),
        required(payload.confirm_password.as_deref()),
    ) else {
        return Err(ApiError::Validation("All fields are required".into()));
    };

    if new_password != confirm_password {
        return Err(ApiError::Validation(
            "New password and confirmation do not match".into(),
        ));
    }

    if !verify_password(&old_password, &user.password_hash).await? {
        warn!(user_id = %user.id, "change password with wrong old password");
        return Err(ApiError::Unauthorized("Invalid old password".into()));
    }

    state.users.set_password(user.id, &new_password).await?;

    info!(user_id = %user.id, "password changed");
    Ok(ApiResponse::ok(
        Empty::default(),
        "Password changed successfully",
    ))
}

#[instrument(skip_all)]
pub async fn current_user(AuthUser(user): AuthUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok(
        PublicUser::from(&user),
        "Current user fetched successfully",
    )
}

#[instrument(skip_all)]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateAccountRequest>, ApiError>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let (Some(full_name), Some(email)) = (
        required(payload.full_name.as_deref()),
        required(payload.email.as_deref()),
    ) else {
        return Err(ApiError::Validation("All fields are required".into()));
    };
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }

    let updated = state
        .users
        .update_account(user.id, full_name.trim(), &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;

    info!(user_id = %user.id, "account updated");
    Ok(ApiResponse::ok(
        PublicUser::from(&updated),
        "Account details updated successfully",
    ))
}

#[instrument(skip_all)]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(mp, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let mut form = MultipartForm::stage(mp, &state.config.upload_dir).await?;
    let file = form
        .take_file(&["avatar"])
        .ok_or_else(|| ApiError::Validation("Avatar file is missing".into()))?;

    let url = upload_media(&state, &file)
        .await
        .ok_or_else(|| ApiError::Upstream("Error while uploading avatar".into()))?;

    let updated = state
        .users
        .set_avatar(user.id, &url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;

    info!(user_id = %user.id, "avatar updated");
    Ok(ApiResponse::ok(
        PublicUser::from(&updated),
        "Avatar image updated successfully",
    ))
}

#[instrument(skip_all)]
pub async fn update_cover_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    WithRejection(mp, _): WithRejection<Multipart, ApiError>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let mut form = MultipartForm::stage(mp, &state.config.upload_dir).await?;
    let file = form
        .take_file(COVER_FIELDS)
        .ok_or_else(|| ApiError::Validation("Cover image file is missing".into()))?;

    let url = upload_media(&state, &file)
        .await
        .ok_or_else(|| ApiError::Upstream("Error while uploading cover image".into()))?;

    let updated = state
        .users
        .set_cover_image(user.id, &url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;

    info!(user_id = %user.id, "cover image updated");
    Ok(ApiResponse::ok(
        PublicUser::from(&updated),
        "Cover image updated successfully",
    ))
}
