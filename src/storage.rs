//! Object storage for profile images (S3-compatible, e.g. MinIO).

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tracing::{info, warn};

use crate::config::StorageConfig;

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Stores the bytes under `key` and returns the public URL.
    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct S3ImageHost {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3ImageHost {
    pub async fn connect(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(&cfg.access_key, &cfg.secret_key, None, None, "env");
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(creds)
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        // MinIO only speaks path-style addressing.
        let s3 = S3ConfigBuilder::from(&shared).force_path_style(true).build();

        let host = Self {
            client: Client::from_conf(s3),
            bucket: cfg.bucket.clone(),
            public_url: cfg.public_url.trim_end_matches('/').to_string(),
        };
        host.ensure_bucket().await;
        Ok(host)
    }

    /// Best effort; uploads report their own failure if the bucket is still missing.
    async fn ensure_bucket(&self) {
        if self.client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            return;
        }
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => info!(bucket = %self.bucket, "created image bucket"),
            Err(e) => warn!(bucket = %self.bucket, error = %e, "image bucket unavailable"),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket, key)
    }
}

#[async_trait]
impl ImageHost for S3ImageHost {
    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("upload {key}"))?;
        Ok(self.url_for(key))
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("remove {key}"))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    use super::*;

    #[derive(Default)]
    pub struct MemoryImageHost {
        keys: Mutex<Vec<String>>,
        failing: AtomicBool,
    }

    impl MemoryImageHost {
        pub fn keys(&self) -> Vec<String> {
            self.keys.lock().unwrap().clone()
        }

        pub fn fail_uploads(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ImageHost for MemoryImageHost {
        async fn upload(&self, key: &str, _body: Bytes, _ct: &str) -> anyhow::Result<String> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("image host offline");
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(format!("https://images.test/{key}"))
        }

        async fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.keys.lock().unwrap().retain(|k| k != key);
            Ok(())
        }
    }
}
