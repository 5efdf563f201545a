use std::time::Duration;

use anyhow::{anyhow, Result};
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::{Client as S3Client, config::{Builder as S3ConfigBuilder, Credentials, Region}};
use aws_sdk_s3::primitives::ByteStream;

use bazaar_common::{define_module_client, required_env_var, ModuleClient};

const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

pub struct R2Connection {
    pub s3: S3Client,
    pub bucket: String,
}

impl R2Connection {
    pub fn from_env() -> Result<Self> {
        let account_id = required_env_var("R2_ACCOUNT_ID")?;
        let access_key_id = required_env_var("R2_ACCESS_KEY_ID")?;
        let secret_access_key = required_env_var("R2_SECRET_ACCESS_KEY")?;
        let bucket = required_env_var("R2_BUCKET_NAME")?;

        let endpoint_url = format!("https://{}.r2.cloudflarestorage.com", account_id);

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "r2-client"
        );

        let s3_config = S3ConfigBuilder::new()
            .endpoint_url(endpoint_url)
            .credentials_provider(credentials)
            .region(Region::new("auto"))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(OPERATION_TIMEOUT)
                    .build()
            )
            .behavior_version_latest()
            .build();

        Ok(Self {
            s3: S3Client::from_conf(s3_config),
            bucket,
        })
    }
}

/// Bytes fetched back from the bucket along with the content type they were stored with.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

define_module_client! {
    (struct R2Client, "r2")
    client_type: R2Connection,
    env: ["R2_ACCOUNT_ID", "R2_ACCESS_KEY_ID", "R2_SECRET_ACCESS_KEY", "R2_BUCKET_NAME"],
    setup: async { R2Connection::from_env() }
}

impl R2Client {
    pub fn bucket_name(&self) -> &str {
        &self.get_client().bucket
    }

    pub async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.get_client()
            .s3
            .put_object()
            .bucket(self.bucket_name())
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to upload object {} to R2: {}", key, e))?;

        Ok(())
    }

    /// Returns `None` when the key does not exist in the bucket.
    pub async fn get_object(&self, key: &str) -> Result<Option<StoredBlob>> {
        let response = self.get_client()
            .s3
            .get_object()
            .bucket(self.bucket_name())
            .key(key)
            .send()
            .await;

        match response {
            Ok(output) => {
                let content_type = output.content_type().map(str::to_string);
                let data = output.body
                    .collect()
                    .await
                    .map_err(|e| anyhow!("Failed to read object {} from R2: {}", key, e))?
                    .into_bytes()
                    .to_vec();

                Ok(Some(StoredBlob { data, content_type }))
            }
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    return Ok(None);
                }
                Err(anyhow!("Failed to fetch object {} from R2: {}", key, err))
            }
        }
    }

    pub async fn delete_object(&self, key: &str) -> Result<()> {
        self.get_client()
            .s3
            .delete_object()
            .bucket(self.bucket_name())
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to delete object {} from R2: {}", key, e))?;

        Ok(())
    }
}
