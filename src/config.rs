// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{DatastoreError, Result};
use crate::models::Frequency;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub stations: StationsConfig,
    pub cache: CacheConfig,
    pub download: DownloadConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    pub root: PathBuf,
    pub raw_dir: String,
    pub formatted_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationsConfig {
    pub station_dbase: PathBuf,
    pub sublocations: PathBuf,
    pub variable_mappings: PathBuf,
    pub config_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub directory: PathBuf,
    pub size_limit_bytes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    pub parallel_workers: usize,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    pub noaa_base_url: String,
    pub cdec_base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReaderConfig {
    pub preferred_freqs: Vec<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            preferred_freqs: ["h", "15min", "6min", "10min", "d"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ReaderConfig {
    pub fn preferred_frequencies(&self) -> Result<Vec<Frequency>> {
        self.preferred_freqs.iter().map(|f| f.parse()).collect()
    }
}

impl RepositoryConfig {
    pub fn raw_path(&self) -> PathBuf {
        self.root.join(&self.raw_dir)
    }

    pub fn formatted_path(&self) -> PathBuf {
        self.root.join(&self.formatted_dir)
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DSTORE")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| DatastoreError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| DatastoreError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            repository: RepositoryConfig {
                root: PathBuf::from("./continuous_station_repo"),
                raw_dir: "raw".to_string(),
                formatted_dir: "formatted".to_string(),
            },
            stations: StationsConfig {
                station_dbase: PathBuf::from("station_dbase.csv"),
                sublocations: PathBuf::from("station_subloc.csv"),
                variable_mappings: PathBuf::from("variable_mappings.csv"),
                config_dir: PathBuf::from("config_data"),
            },
            cache: CacheConfig {
                directory: PathBuf::from("cache"),
                size_limit_bytes: 6_000_000_000,
            },
            download: DownloadConfig {
                parallel_workers: 6,
                max_attempts: 5,
                retry_delay_ms: 1000,
                noaa_base_url: "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter"
                    .to_string(),
                cdec_base_url: "http://cdec.water.ca.gov/dynamicapp/req/CSVDataServletPST"
                    .to_string(),
            },
            reader: ReaderConfig::default(),
        }
    }

    /// Resolves a station table label to a path that exists on disk.
    ///
    /// The configured path is tried as given, then relative to `config_dir`.
    pub fn config_file(&self, label: &str) -> Result<PathBuf> {
        let configured = match label {
            "station_dbase" => &self.stations.station_dbase,
            "sublocations" => &self.stations.sublocations,
            "variable_mappings" => &self.stations.variable_mappings,
            other => {
                return Err(DatastoreError::Config(format!(
                    "Unknown configuration label: {}",
                    other
                )));
            }
        };

        if configured.exists() {
            return Ok(configured.clone());
        }

        let in_config_dir = self.stations.config_dir.join(configured);
        if in_config_dir.exists() {
            return Ok(in_config_dir);
        }

        Err(DatastoreError::Config(format!(
            "File not found {} for label {} either on its own or in directory {}",
            configured.display(),
            label,
            self.stations.config_dir.display()
        )))
    }

    fn validate(&self) -> Result<()> {
        if self.download.parallel_workers == 0 {
            return Err(DatastoreError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.download.max_attempts == 0 {
            return Err(DatastoreError::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.cache.size_limit_bytes == 0 {
            return Err(DatastoreError::Config(
                "size_limit_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
