use std::sync::Arc;

use base64::Engine;
use uuid::Uuid;

use bazaar_common::get_current_timestamp_millis;

use crate::error::MarketError;
use crate::store::{ObjectStore, StoredObject};

pub const MIN_IMAGES: usize = 1;
pub const MAX_IMAGES: usize = 5;
pub const MAX_IMAGE_SIZE_MB: usize = 5;
pub const MAX_IMAGE_SIZE_BYTES: usize = MAX_IMAGE_SIZE_MB * 1024 * 1024;

/// Public path under which stored images are served.
pub const IMAGE_URL_PREFIX: &str = "/api/images/";

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

pub fn image_url(object_id: &str) -> String {
    format!("{}{}", IMAGE_URL_PREFIX, object_id)
}

/// Reverses [`image_url`]. `None` for URLs that do not point at the image store.
pub fn object_id_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(IMAGE_URL_PREFIX)
        .filter(|id| is_safe_object_id(id))
}

fn is_safe_object_id(id: &str) -> bool {
    !id.is_empty() && !id.contains('/') && !id.contains("..")
}

/// A decoded `data:image/<subtype>;base64,<payload>` upload.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub media_type: String,
    pub extension: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    fn split(data_url: &str) -> Option<(&str, &str)> {
        let content = data_url.strip_prefix(DATA_URL_PREFIX)?;
        let (media_type, payload) = content.split_once(BASE64_MARKER)?;
        let subtype = media_type.strip_prefix("image/")?;
        if subtype.is_empty() {
            return None;
        }
        Some((media_type, payload))
    }

    /// Decoded size implied by the base64 payload length, without decoding.
    /// `None` when the string is not an inline image at all.
    pub fn estimated_decoded_len(data_url: &str) -> Option<usize> {
        let (_, payload) = Self::split(data_url)?;
        Some(payload.trim_end_matches('=').len() * 3 / 4)
    }

    pub fn size_within_limit(size: usize) -> bool {
        size > 0 && size <= MAX_IMAGE_SIZE_BYTES
    }

    pub fn parse(data_url: &str) -> Result<Self, MarketError> {
        let (media_type, payload) = Self::split(data_url).ok_or_else(|| {
            MarketError::InvalidImage("expected a base64 data URL with an image media type".to_string())
        })?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| MarketError::InvalidImage(format!("failed to decode base64 payload: {}", e)))?;

        if !Self::size_within_limit(data.len()) {
            return Err(MarketError::InvalidImage(format!(
                "image must be non-empty and at most {}MB",
                MAX_IMAGE_SIZE_MB
            )));
        }

        let subtype = &media_type["image/".len()..];
        let extension = match subtype.split('+').next().unwrap_or(subtype) {
            "jpeg" => "jpg",
            other => other,
        }
        .to_string();

        Ok(Self { media_type: media_type.to_string(), extension, data })
    }
}

/// Uploads listing images to the object store as one batch. A batch either
/// lands completely or leaves nothing behind (best effort).
#[derive(Clone)]
pub struct ImageIngestor {
    store: Arc<dyn ObjectStore>,
}

impl ImageIngestor {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Returns the public URLs of the stored images, in input order.
    pub async fn ingest(&self, data_urls: &[String]) -> Result<Vec<String>, MarketError> {
        if data_urls.len() < MIN_IMAGES || data_urls.len() > MAX_IMAGES {
            return Err(MarketError::InvalidImage(format!(
                "between {} and {} images are required, got {}",
                MIN_IMAGES,
                MAX_IMAGES,
                data_urls.len()
            )));
        }

        // Nothing is written until every image in the batch decodes.
        let images = data_urls
            .iter()
            .map(|url| InlineImage::parse(url))
            .collect::<Result<Vec<_>, _>>()?;

        let batch = get_current_timestamp_millis();
        let mut stored: Vec<String> = Vec::with_capacity(images.len());

        for (index, image) in images.into_iter().enumerate() {
            let name = format!("{}_{}_{}.{}", batch, index, Uuid::new_v4().simple(), image.extension);
            match self.store.put(&name, image.data, &image.media_type).await {
                Ok(id) => stored.push(id),
                Err(e) => {
                    tracing::error!("[ImageIngestor::ingest] Failed to upload image {}: {:?}", index, e);
                    self.delete_objects(&stored).await;
                    return Err(MarketError::Dependency(e.context("Failed to upload images")));
                }
            }
        }

        tracing::debug!("[ImageIngestor::ingest] Stored {} images for batch {}", stored.len(), batch);
        Ok(stored.iter().map(|id| image_url(id)).collect())
    }

    /// Best-effort removal of previously ingested images. Returns how many
    /// deletions failed; failures are logged and never propagated.
    pub async fn remove(&self, urls: &[String]) -> usize {
        let ids: Vec<String> = urls
            .iter()
            .filter_map(|url| match object_id_from_url(url) {
                Some(id) => Some(id.to_string()),
                None => {
                    tracing::warn!("[ImageIngestor::remove] Skipping foreign image url {}", url);
                    None
                }
            })
            .collect();

        self.delete_objects(&ids).await
    }

    async fn delete_objects(&self, ids: &[String]) -> usize {
        let mut failed = 0;
        for id in ids {
            if let Err(e) = self.store.delete(id).await {
                failed += 1;
                tracing::warn!("[ImageIngestor] Failed to delete image {}: {:?}", id, e);
            }
        }
        failed
    }

    pub async fn fetch(&self, object_id: &str) -> Result<Option<StoredObject>, MarketError> {
        if !is_safe_object_id(object_id) {
            return Err(MarketError::InvalidId(object_id.to_string()));
        }
        Ok(self.store.get(object_id).await?)
    }
}
