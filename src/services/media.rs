use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};

/// Object storage holding listing images
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `path` and return the public URL
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<String>;

    async fn remove(&self, paths: &[String]) -> AppResult<()>;

    /// Storage path of an object from its public URL
    fn path_from_url(&self, url: &str) -> Option<String>;
}

/// An image sent inline as `data:image/<ext>;base64,<payload>`
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrlImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl DataUrlImage {
    pub fn mime_type(&self) -> String {
        format!("image/{}", self.extension)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Parse an image data URL. Anything else, including bad base64, is `None`.
pub fn parse_data_url(value: &str) -> Option<DataUrlImage> {
    let rest = value.strip_prefix("data:image/")?;
    let (header, payload) = rest.split_once(',')?;

    let extension = header
        .split(';')
        .next()
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("jpeg")
        .to_ascii_lowercase();

    let bytes = STANDARD.decode(payload.trim()).ok()?;
    if bytes.is_empty() {
        return None;
    }

    Some(DataUrlImage { extension, bytes })
}

/// Path inside `bucket` for a public object URL
pub fn storage_path_from_url(url: &str, bucket: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let marker = format!("/{}/", bucket);
    let path = parsed.path();
    let start = path.find(&marker)? + marker.len();

    let object = &path[start..];
    (!object.is_empty()).then(|| object.to_string())
}

pub fn car_folder(car_id: Uuid) -> String {
    format!("cars/{}", car_id)
}

/// Upload every data-URL entry of `images` under the car's folder.
///
/// Entries that are not data URLs are kept only when they are already among
/// the car's `existing` images; anything else is skipped. Uploads are not
/// rolled back if a later one fails.
pub async fn store_images(
    storage: &dyn ObjectStorage,
    car_id: Uuid,
    images: &[String],
    existing: &[String],
) -> AppResult<Vec<String>> {
    let folder = car_folder(car_id);
    let mut urls = Vec::with_capacity(images.len());

    for (index, entry) in images.iter().enumerate() {
        match parse_data_url(entry) {
            Some(image) => {
                let path = format!(
                    "{}/image-{}-{}.{}",
                    folder,
                    Utc::now().timestamp_millis(),
                    index,
                    image.extension
                );
                let content_type = image.mime_type();
                let url = storage.upload(&path, image.bytes, &content_type).await?;
                urls.push(url);
            }
            None if existing.contains(entry) => urls.push(entry.clone()),
            None => tracing::warn!(car_id = %car_id, index, "Skipping image that is neither new data nor one of the car's own"),
        }
    }

    Ok(urls)
}

/// Best-effort removal of stored images; failures are only logged
pub async fn remove_images(storage: &dyn ObjectStorage, urls: &[String]) {
    let paths: Vec<String> = urls.iter().filter_map(|u| storage.path_from_url(u)).collect();
    if paths.is_empty() {
        return;
    }

    if let Err(e) = storage.remove(&paths).await {
        tracing::error!(error = %e, count = paths.len(), "Failed to delete images from storage");
    }
}

/// Supabase Storage over its REST API
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        let endpoint = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to upload image: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Failed to upload image: {} {}",
                status, body
            )));
        }

        tracing::debug!(path = %path, "Image uploaded");
        Ok(self.public_url(path))
    }

    async fn remove(&self, paths: &[String]) -> AppResult<()> {
        let endpoint = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);

        let response = self
            .client
            .delete(&endpoint)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to delete images: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Failed to delete images: {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        storage_path_from_url(url, &self.bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_png_data_url() {
        let image = parse_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(image.extension, "png");
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.bytes, b"hello");
    }

    #[test]
    fn test_missing_extension_defaults_to_jpeg() {
        let image = parse_data_url("data:image/;base64,aGVsbG8=").unwrap();
        assert_eq!(image.extension, "jpeg");
    }

    #[test]
    fn test_non_image_entries_are_rejected() {
        assert!(parse_data_url("https://cdn.example.com/cars/1.png").is_none());
        assert!(parse_data_url("data:text/plain;base64,aGVsbG8=").is_none());
        assert!(parse_data_url("data:image/png;base64,").is_none());
        assert!(parse_data_url("data:image/png;base64,***").is_none());
    }

    #[test]
    fn test_storage_path_from_public_url() {
        let url = "https://abc.supabase.co/storage/v1/object/public/car-listing-image/cars/42/image-1-0.png";
        assert_eq!(
            storage_path_from_url(url, "car-listing-image").as_deref(),
            Some("cars/42/image-1-0.png")
        );
        assert!(storage_path_from_url("https://elsewhere.com/a.png", "car-listing-image").is_none());
        assert!(storage_path_from_url("not a url", "car-listing-image").is_none());
    }
}
