use altis_offer::UnknownCategory;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub data: DataConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub cities: PathBuf,
    pub airports: PathBuf,
    pub submit: PathBuf,
    pub filled_submit: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub encoders: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub unknown_category: UnknownCategory,
    #[serde(default = "default_rank_column")]
    pub rank_column: String,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            unknown_category: UnknownCategory::default(),
            rank_column: default_rank_column(),
        }
    }
}

fn default_workers() -> usize { 1 }

fn default_rank_column() -> String { "Position ( from 1 to n)".to_string() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `ALTIS_RANKING__WORKERS=4` sets `ranking.workers`
            .add_source(environment())
            .build()?;

        s.try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("ALTIS")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
