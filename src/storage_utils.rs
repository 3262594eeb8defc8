use crate::indicators::IndicatorParams;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

// CONFIGURATION STRUCTS
// `config.json` in the storage directory maps onto these types.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PriceConfig {
    pub period: String,   // e.g., "3mo", "1y"
    pub interval: String, // e.g., "1d", "1h"
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            period: "3mo".to_string(),
            interval: "1d".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub workers: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            min_delay_ms: 200,
            max_delay_ms: 800,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            ],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NewsConfig {
    pub headlines_per_ticker: usize,
    pub workers: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub target_window_days: i64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            headlines_per_ticker: 2,
            workers: 5,
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            target_window_days: 7,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub prices: PriceConfig,
    pub indicators: IndicatorParams,
    pub fetch: FetchConfig,
    pub news: NewsConfig,
}

// STORAGE MANAGER

pub struct AsyncStorageManager {
    // Absolute path of the storage directory (e.g., ".../target/debug/storage")
    pub base_dir: PathBuf,
}

impl AsyncStorageManager {
    /// Storage rooted at `base_dir`, created if missing.
    pub async fn new<P: Into<PathBuf>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.into();
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).await?;
        }
        Ok(Self { base_dir })
    }

    /// Storage directory relative to the running executable.
    pub async fn new_relative<P: AsRef<Path>>(relative_path: P) -> anyhow::Result<Self> {
        let exe_path = std::env::current_exe()?;

        let base_dir = exe_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not find binary directory"))?
            .join(relative_path);

        Self::new(base_dir).await
    }

    /// Serializes `data` to `<filename>.json`.
    /// Writes a `.tmp` file first and renames it, so a crash mid-write
    /// leaves the previous file intact.
    pub async fn save<T: Serialize>(&self, filename: &str, data: &T) -> anyhow::Result<()> {
        let file_name = format!("{}.json", filename);
        let final_path = self.base_dir.join(&file_name);
        let tmp_path = self.base_dir.join(format!("{}.tmp", file_name));

        let json_bytes = serde_json::to_vec_pretty(data)?;

        fs::write(&tmp_path, json_bytes).await?;
        fs::rename(tmp_path, final_path).await?;

        Ok(())
    }

    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> anyhow::Result<T> {
        let path = self.base_dir.join(format!("{}.json", filename));

        // serde_json validates UTF-8 itself, so skip read_to_string.
        let content = fs::read(path).await?;

        let data = serde_json::from_slice(&content)?;
        Ok(data)
    }

    /// Whether `<filename>.json` has been saved before.
    pub async fn exists(&self, filename: &str) -> bool {
        fs::try_exists(self.base_dir.join(format!("{}.json", filename)))
            .await
            .unwrap_or(false)
    }

    /// Loads `config.json`, writing the defaults first if it does not exist.
    pub async fn load_or_init_config(&self) -> anyhow::Result<AppConfig> {
        let path = self.base_dir.join("config.json");
        if !path.exists() {
            let config = AppConfig::default();
            self.save("config", &config).await?;
            info!(path = %path.display(), "Wrote default configuration");
            return Ok(config);
        }
        self.load("config").await
    }

    /// Path of a non-JSON artifact (spreadsheets) inside the storage directory.
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.base_dir.join(file_name)
    }
}
