use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::storage::{MediaHost, S3MediaHost};
use crate::subscriptions::repo::SubscriptionStore;
use crate::users::repo::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub media: Arc<dyn MediaHost>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = Arc::new(PgStore::connect(&config.database_url).await?);

        let media = Arc::new(S3MediaHost::new(&config.media).await?) as Arc<dyn MediaHost>;

        Ok(Self::from_parts(
            config,
            store.clone(),
            store,
            media,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        media: Arc<dyn MediaHost>,
    ) -> Self {
        Self {
            config,
            users,
            subscriptions,
            media,
        }
    }
}
