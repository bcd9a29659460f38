use crate::app::ports::ObjectStorePort;
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Local filesystem object store: objects live at `<root>/<bucket>/<key>`.
/// Used for development runs without remote storage configured.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStorePort for FsObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key);
        fs::read(&path).map_err(|e| {
            EtlError::ObjectStore(format!("Failed to read {}/{}: {}", bucket, key, e))
        })
    }
}

/// Remote object store speaking a Supabase-Storage-style REST API.
/// Uploads use `upsert=true` so a re-run overwrites the slot in place.
pub struct HttpObjectStore {
    endpoint: String,
    api_key: String,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.endpoint.trim_end_matches('/'),
            bucket,
            key
        )
    }
}

#[async_trait]
impl ObjectStorePort for HttpObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let client = reqwest::Client::new();
        let resp = client
            .put(self.object_url(bucket, key))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("apikey", self.api_key.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .query(&[("upsert", "true")])
            .body(bytes.to_vec())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EtlError::ObjectStore(format!(
                "Upload of {}/{} failed: {} - {}",
                bucket, key, status, body
            )));
        }
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let client = reqwest::Client::new();
        let resp = client
            .get(self.object_url(bucket, key))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("apikey", self.api_key.clone())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EtlError::ObjectStore(format!(
                "Fetch of {}/{} failed: {}",
                bucket, key, status
            )));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// In-memory object store for tests.
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStorePort for InMemoryObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let mut objects = self.objects.lock().unwrap();
        objects.insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| EtlError::ObjectStore(format!("No object at {}/{}", bucket, key)))
    }
}
