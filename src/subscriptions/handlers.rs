use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    response::ApiResponse,
    state::AppState,
    users::dto::PublicUser,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionState {
    pub subscribed: bool,
}

pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/c/:channel_id", post(toggle_subscription))
        .route("/users/c/:username", get(channel_profile))
}

#[instrument(skip_all)]
pub async fn toggle_subscription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<ApiResponse<SubscriptionState>> {
    if channel_id == user.id {
        return Err(ApiError::Validation(
            "Cannot subscribe to your own channel".into(),
        ));
    }
    if state.users.find_by_id(channel_id).await?.is_none() {
        return Err(ApiError::NotFound("Channel does not exist".into()));
    }

    let subscribed = state.subscriptions.toggle(user.id, channel_id).await?;
    info!(user_id = %user.id, %channel_id, subscribed, "subscription toggled");

    let message = if subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(SubscriptionState { subscribed }, message))
}

#[instrument(skip_all)]
pub async fn channel_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> ApiResult<ApiResponse<ChannelProfile>> {
    let username = username.trim().to_lowercase();
    let channel = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::NotFound("Channel does not exist".into()))?;

    let profile = ChannelProfile {
        subscribers_count: state.subscriptions.count_subscribers(channel.id).await?,
        channels_subscribed_to_count: state.subscriptions.count_subscribed_to(channel.id).await?,
        is_subscribed: state.subscriptions.is_subscribed(user.id, channel.id).await?,
        user: PublicUser::from(&channel),
    };

    Ok(ApiResponse::ok(profile, "Channel fetched successfully"))
}
