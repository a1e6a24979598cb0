//! Metadata storage boundary: pin the token image and its JSON document and
//! hand back the URI that goes on-chain.

pub mod pinata;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serde::Serialize;
use serde_json::json;

use crate::error::{DashboardError, Result as DashResult};

pub use pinata::PinataClient;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Pin a local file, returning its public URI.
    async fn upload_file(&self, path: &Path) -> Result<String>;

    /// Pin a JSON document, returning its public URI.
    async fn upload_json(&self, doc: serde_json::Value) -> Result<String>;
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct MetadataDraft {
    pub name: String,
    pub symbol: String,
    pub description: String,
}

/// Upload `image`, then the `{name, symbol, description, image}` document
/// pointing at it. Returns the document URI.
pub async fn publish_token_metadata(
    store: &dyn MetadataStore,
    draft: &MetadataDraft,
    image: Option<&Path>,
) -> DashResult<String> {
    let image = image.ok_or_else(|| DashboardError::validation("Image is necessary"))?;
    if draft.name.trim().is_empty() || draft.symbol.trim().is_empty() {
        return Err(DashboardError::validation("Name and symbol are required"));
    }

    let image_uri = store
        .upload_file(image)
        .await
        .map_err(|e| DashboardError::Upload(format!("{e:#}")))?;
    info!("[METADATA] image pinned at {image_uri}");

    let doc = json!({
        "name": draft.name,
        "symbol": draft.symbol,
        "description": draft.description,
        "image": image_uri,
    });
    let uri = store
        .upload_json(doc)
        .await
        .map_err(|e| DashboardError::Upload(format!("{e:#}")))?;
    info!("[METADATA] token document pinned at {uri}");
    Ok(uri)
}
