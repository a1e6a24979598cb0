//! Pinata pinning API client.

use std::{path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::info;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::Deserialize;
use serde_json::json;

use super::MetadataStore;

const PIN_FILE_URL: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";
const PIN_JSON_URL: &str = "https://api.pinata.cloud/pinning/pinJSONToIPFS";

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Clone)]
pub struct PinataClient {
    jwt: String,
    gateway: String,
    client: Client,
}

impl PinataClient {
    pub fn new(jwt: String, gateway: String) -> Result<Self> {
        if jwt.is_empty() {
            return Err(anyhow!("pinata JWT is not configured"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("reqwest build failed")?;
        Ok(Self {
            jwt,
            gateway,
            client,
        })
    }

    pub fn gateway_uri(&self, hash: &str) -> String {
        format!("https://{}/ipfs/{hash}", self.gateway.trim_end_matches('/'))
    }

    async fn pinned_hash(res: Response) -> Result<String> {
        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(anyhow!("Pinata HTTP {status}: {err_text}"));
        }
        let pin: PinResponse = res.json().await?;
        Ok(pin.ipfs_hash)
    }
}

#[async_trait]
impl MetadataStore for PinataClient {
    async fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".into());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let res = self
            .client
            .post(PIN_FILE_URL)
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await?;
        let hash = Self::pinned_hash(res).await?;
        info!("[PINATA] pinned {} as {hash}", path.display());
        Ok(self.gateway_uri(&hash))
    }

    async fn upload_json(&self, doc: serde_json::Value) -> Result<String> {
        let res = self
            .client
            .post(PIN_JSON_URL)
            .bearer_auth(&self.jwt)
            .json(&json!({ "pinataContent": doc }))
            .send()
            .await?;
        let hash = Self::pinned_hash(res).await?;
        info!("[PINATA] pinned JSON as {hash}");
        Ok(self.gateway_uri(&hash))
    }
}
