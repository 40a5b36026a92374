use crate::aggregate::ExclusionList;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://goadmin.ifrc.org";
pub const DEFAULT_WORLD_URL: &str = "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_admin_0_countries.geojson";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub map: MapConfig,
    pub exclusions: ExclusionList,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// No timeout unless set; a stalled API stalls the command.
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// Natural Earth admin-0 boundaries, GeoJSON or Shapefile.
    pub world: PathBuf,
    /// Where `download-world` fetches the GeoJSON from.
    pub world_url: String,
    /// Property names match ignoring case.
    pub join_column: String,
    /// Tried in order when the join column is blank or "-99".
    pub fallback_join_columns: Vec<String>,
    pub continent_column: String,
    pub name_column: String,
    pub width: u32,
    pub height: u32,
    pub output: PathBuf,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            world: PathBuf::from("data/ne_110m_admin_0_countries.geojson"),
            world_url: DEFAULT_WORLD_URL.to_string(),
            join_column: "iso_a3".to_string(),
            fallback_join_columns: vec!["iso_a3_eh".to_string(), "adm0_a3".to_string()],
            continent_column: "continent".to_string(),
            name_column: "name".to_string(),
            width: 1500,
            height: 1000,
            output: PathBuf::from("appeals_map.png"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            tracing::info!("Loading config from {:?}", path);
            Self::load_from_file(path)
        } else {
            tracing::info!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_exclude_antarctica() {
        let config = AppConfig::default();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout_secs, None);
        assert_eq!(config.map.join_column, "iso_a3");
        assert_eq!(config.map.fallback_join_columns, vec!["iso_a3_eh", "adm0_a3"]);
        assert_eq!(config.map.world_url, DEFAULT_WORLD_URL);
        assert!(config.exclusions.excludes_iso3("ATA"));
        assert!(config.exclusions.excludes_continent("Antarctica"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "http://localhost:9000"
timeout_secs = 30

[map]
width = 800

[[exclusions]]
iso3 = "GRL"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.api.timeout_secs, Some(30));
        assert_eq!(config.map.width, 800);
        assert_eq!(config.map.height, 1000);
        assert!(config.exclusions.excludes_iso3("GRL"));
        assert!(!config.exclusions.excludes_iso3("ATA"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.map.output, PathBuf::from("appeals_map.png"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nbase_url = ").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }
}
