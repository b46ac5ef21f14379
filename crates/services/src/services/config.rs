//! Layered settings: built-in defaults, then an optional `lexsite.toml`,
//! then `LEXSITE_*` environment variables (a `.env` file is loaded first).

use std::{path::PathBuf, time::Duration};

use config::{Config as Layers, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "lexsite.toml";
pub const ENV_PREFIX: &str = "LEXSITE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    /// Directory the local object store writes into, served at `/storage`.
    pub storage_root: PathBuf,
    pub public_base_url: String,
    /// Empty disables `POST /api/revalidate`.
    #[serde(default)]
    pub revalidate_secret: String,
    pub frontend_revalidate_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub page_size: usize,
    /// Origins allowed by CORS; empty allows any.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_file(CONFIG_FILE)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Layers::builder()
            .set_default("bind_addr", "127.0.0.1:8080")?
            .set_default("database_url", "sqlite://lexsite.db?mode=rwc")?
            .set_default("storage_root", "storage")?
            .set_default("public_base_url", "http://127.0.0.1:8080/storage")?
            .set_default("revalidate_secret", "")?
            .set_default("cache_ttl_secs", 300)?
            .set_default("page_size", 9)?
            .set_default("cors_origins", Vec::<String>::new())?
            .add_source(
                File::with_name(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_apply_without_file() {
        let config = Config::from_file("does-not-exist.toml").unwrap();
        assert_eq!(config.page_size, 9);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert!(config.frontend_revalidate_url.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "page_size = 12\nrevalidate_secret = \"abc\"\nfrontend_revalidate_url = \"https://example.com/api/revalidate\""
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.page_size, 12);
        assert_eq!(config.revalidate_secret, "abc");
        assert_eq!(
            config.frontend_revalidate_url.as_deref(),
            Some("https://example.com/api/revalidate")
        );
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }
}
