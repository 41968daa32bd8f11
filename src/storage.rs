use std::path::Path;

use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::config::MediaConfig;

/// Remote media host: takes a locally staged file and returns a durable public URL.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, local_path: &Path, content_type: &str) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct S3MediaHost {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3MediaHost {
    pub async fn new(cfg: &MediaConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
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
            public_url: cfg.public_url.clone(),
        })
    }
}

#[async_trait]
impl MediaHost for S3MediaHost {
    async fn upload(&self, local_path: &Path, content_type: &str) -> anyhow::Result<String> {
        let body = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("read staged file {}", local_path.display()))?;
        let key = object_key(content_type);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(Bytes::from(body)))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {}", key))?;

        let url = public_url(&self.public_url, &key);
        info!(%url, "media uploaded");
        Ok(url)
    }
}

fn object_key(content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("media/{}.{}", Uuid::new_v4(), ext)
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        "video/mp4" => Some("mp4"),
        _ => None,
    }
}
