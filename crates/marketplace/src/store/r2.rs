use anyhow::Result;
use async_trait::async_trait;

use bazaar_clients::R2Client;

use super::{ObjectStore, StoredObject};

const KEY_PREFIX: &str = "images/listings";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Listing images kept in an R2 bucket under `images/listings/`.
#[derive(Clone)]
pub struct R2ObjectStore {
    client: R2Client,
}

impl R2ObjectStore {
    pub fn new(client: R2Client) -> Self {
        Self { client }
    }

    fn key(id: &str) -> String {
        format!("{}/{}", KEY_PREFIX, id)
    }
}

#[async_trait]
impl ObjectStore for R2ObjectStore {
    async fn put(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        self.client.put_object(&Self::key(name), data, content_type).await?;
        Ok(name.to_string())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredObject>> {
        Ok(self.client.get_object(&Self::key(id)).await?.map(|blob| StoredObject {
            data: blob.data,
            content_type: blob
                .content_type
                .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
        }))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete_object(&Self::key(id)).await
    }
}
