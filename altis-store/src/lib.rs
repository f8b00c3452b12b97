pub mod app_config;
pub mod directory_repo;
pub mod model_repo;
pub mod offer_repo;

pub use directory_repo::load_gazetteer;
pub use model_repo::{load_encoders, load_model};
pub use offer_repo::OfferBatch;

use altis_offer::ScoreError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid model: {0}")]
    Model(#[from] ScoreError),
    #[error("Invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
