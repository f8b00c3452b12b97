pub mod aggregator;
pub mod batch;
pub mod decomposer;
pub mod encoding;
pub mod features;
pub mod models;
pub mod ranker;
pub mod scorer;

pub use batch::{group_by_request, BatchOutcome, BatchSummary, RequestGroup};
pub use decomposer::{DecomposeError, Decomposition, ItineraryDecomposer, LegSkip};
pub use encoding::{CategoryEncoder, EncodedRow, EncoderSet, EncodingError, UnknownCategory};
pub use features::{FeatureColumn, LegFeatures};
pub use models::{Leg, LegDirection, Offer};
pub use ranker::{OfferRanker, RankError, RequestRanking};
pub use scorer::{LogisticModel, LogisticScorer, ScoreError, Scorer};
