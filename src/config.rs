use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chat::Pacing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    /// 0 waits for the backend indefinitely.
    #[serde(default)]
    pub request_timeout_secs: u64,
    #[serde(default = "default_typing_delay")]
    pub title_delay_ms: u64,
    #[serde(default = "default_typing_delay")]
    pub message_delay_ms: u64,
    #[serde(default)]
    pub closing_delay_ms: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:5000/".to_string()
}

fn default_theme() -> String {
    "dark".to_string()
}

fn default_typing_delay() -> u64 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            theme: default_theme(),
            request_timeout_secs: 0,
            title_delay_ms: default_typing_delay(),
            message_delay_ms: default_typing_delay(),
            closing_delay_ms: 0,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let cfg: Config = serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            Ok(cfg)
        } else {
            let cfg = Config::default();
            cfg.save_to(path)?;
            Ok(cfg)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            s => Some(Duration::from_secs(s)),
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            title_delay_ms: self.title_delay_ms,
            message_delay_ms: self.message_delay_ms,
            closing_delay_ms: self.closing_delay_ms,
            ..Pacing::default()
        }
    }

    fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("homeval");
        path.push("config.yaml");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("homeval").join("config.yaml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.backend_url, "http://127.0.0.1:5000/");
        assert_eq!(cfg.request_timeout(), None);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "backend_url: http://predict.local/\nrequest_timeout_secs: 20\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.backend_url, "http://predict.local/");
        assert_eq!(cfg.theme, "dark");
        assert_eq!(cfg.request_timeout(), Some(Duration::from_secs(20)));
        let pacing = cfg.pacing();
        assert_eq!(pacing.title_delay_ms, 50);
        assert_eq!(pacing.closing_delay_ms, 0);
    }
}
