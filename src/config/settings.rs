//! Runtime configuration loader and common helpers.

use std::{collections::HashMap, fs, path::Path, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use solana_sdk::native_token::LAMPORTS_PER_SOL;

use super::cluster::{websocket_url_for, Cluster};

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";

/// What to do with a holdings fetch that resolves after a newer one started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleFetchPolicy {
    /// Last resolved fetch wins, even when it belongs to an older selection.
    #[default]
    Overwrite,
    /// Results of superseded fetches are dropped.
    Discard,
}

impl FromStr for StaleFetchPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "overwrite" => Ok(Self::Overwrite),
            "discard" => Ok(Self::Discard),
            other => Err(anyhow::anyhow!("unknown stale fetch policy `{other}`")),
        }
    }
}

/// ------------------------------------------------------------------
/// Main Settings object
/// ------------------------------------------------------------------
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /* -------- local state --------------------------- */
    pub workdir: PathBuf,
    pub state_file: String,
    pub keypair_path: Option<String>,

    /* -------- endpoints ----------------------------- */
    pub rpc_urls: HashMap<Cluster, String>,
    pub ws_urls: HashMap<Cluster, String>,

    /* -------- metadata pinning ---------------------- */
    pub pinata_jwt: Option<String>,
    pub pinata_gateway: Option<String>,

    /* -------- behaviour ----------------------------- */
    pub airdrop_sol: f64,
    pub refresh_after_submit: bool,
    pub stale_fetch_policy: StaleFetchPolicy,
    pub confirm_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            state_file: "dashboard_state.json".to_string(),
            keypair_path: None,
            rpc_urls: HashMap::new(),
            ws_urls: HashMap::new(),
            pinata_jwt: None,
            pinata_gateway: None,
            airdrop_sol: 2.0,
            refresh_after_submit: true,
            stale_fetch_policy: StaleFetchPolicy::Overwrite,
            confirm_poll_ms: 500,
        }
    }
}

impl Settings {
    /// --------------------------------------------------------------
    /// Read `settings.json` from disk. Every key is optional.
    /// --------------------------------------------------------------
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading settings file {:?}", path.as_ref()))?;
        let json: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings file {:?}", path.as_ref()))?;
        let defaults = Self::default();

        /* -------- plain strings ---------------------------------- */
        let workdir = json["workdir"]
            .as_str()
            .map(PathBuf::from)
            .unwrap_or(defaults.workdir);
        let state_file = json["state_file"]
            .as_str()
            .unwrap_or(&defaults.state_file)
            .to_string();
        let keypair_path = json["keypair_path"].as_str().map(|s| s.to_string());
        let pinata_jwt = json["pinata_jwt"].as_str().map(|s| s.to_string());
        let pinata_gateway = json["pinata_gateway"].as_str().map(|s| s.to_string());

        /* -------- per-cluster endpoint overrides ------------------ */
        let rpc_urls = parse_cluster_map(&json["rpc_urls"]);
        let ws_urls = parse_cluster_map(&json["ws_urls"]);

        /* -------- numeric / flags -------------------------------- */
        let airdrop_sol = json["airdrop_sol"].as_f64().unwrap_or(defaults.airdrop_sol);
        let refresh_after_submit = json["refresh_after_submit"]
            .as_bool()
            .unwrap_or(defaults.refresh_after_submit);
        let confirm_poll_ms = json["confirm_poll_ms"]
            .as_u64()
            .unwrap_or(defaults.confirm_poll_ms);
        let stale_fetch_policy = match json["stale_fetch_policy"].as_str() {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("[SETTINGS] {e}, using overwrite");
                StaleFetchPolicy::Overwrite
            }),
            None => defaults.stale_fetch_policy,
        };

        Ok(Self {
            workdir,
            state_file,
            keypair_path,
            rpc_urls,
            ws_urls,
            pinata_jwt,
            pinata_gateway,
            airdrop_sol,
            refresh_after_submit,
            stale_fetch_policy,
            confirm_poll_ms,
        })
    }

    /// --------------------------------------------------------------
    /// Load from `path`, falling back to defaults when the file is absent.
    /// --------------------------------------------------------------
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// --------------------------------------------------------------
    /// Load settings from default config/settings.json file.
    /// --------------------------------------------------------------
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_SETTINGS_PATH)
    }

    /// --------------------------------------------------------------
    /// Save settings to a specific file path.
    /// --------------------------------------------------------------
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(&path, json_string)
            .with_context(|| format!("writing settings to {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Where the selection store (and the demo keystore) persist.
    pub fn state_path(&self) -> PathBuf {
        self.workdir.join(&self.state_file)
    }

    pub fn rpc_url(&self, cluster: Cluster) -> String {
        self.rpc_urls
            .get(&cluster)
            .cloned()
            .unwrap_or_else(|| cluster.default_rpc_url().to_string())
    }

    pub fn ws_url(&self, cluster: Cluster) -> Result<String> {
        match self.ws_urls.get(&cluster) {
            Some(url) => Ok(url.clone()),
            None => websocket_url_for(&self.rpc_url(cluster)),
        }
    }

    /// --------------------------------------------------------------
    /// Helper: convert SOL → lamports and round to nearest integer.
    /// --------------------------------------------------------------
    pub fn sol_to_lamports(sol: f64) -> u64 {
        (sol * LAMPORTS_PER_SOL as f64).round() as u64
    }
}

fn parse_cluster_map(value: &serde_json::Value) -> HashMap<Cluster, String> {
    let mut out = HashMap::new();
    if let Some(map) = value.as_object() {
        for (name, url) in map {
            match (Cluster::from_str(name), url.as_str()) {
                (Ok(cluster), Some(url)) => {
                    out.insert(cluster, url.to_string());
                }
                _ => warn!("[SETTINGS] ignoring endpoint override `{name}`"),
            }
        }
    }
    out
}
