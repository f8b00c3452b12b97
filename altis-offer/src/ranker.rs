use crate::aggregator;
use crate::decomposer::ItineraryDecomposer;
use crate::encoding::{EncoderSet, EncodingError};
use crate::features::LegFeatures;
use crate::models::Offer;
use crate::scorer::{sanitise, ScoreError, Scorer};
use altis_core::Gazetteer;
use std::sync::Arc;
use tracing::{debug, info};

/// Fatal to the request being ranked, never to the batch.
#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Scoring failed: {0}")]
    Score(#[from] ScoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRanking {
    /// One rank per offer, in input order.
    pub ranks: Vec<u32>,
    /// Legs each offer produced.
    pub leg_counts: Vec<usize>,
    pub legs_skipped: usize,
}

impl RequestRanking {
    pub fn legs_scored(&self) -> usize {
        self.leg_counts.iter().sum()
    }

    pub fn zero_leg_offers(&self) -> usize {
        self.leg_counts.iter().filter(|&&c| c == 0).count()
    }
}

/// Ranks the offers of a customer request with the preference model.
#[derive(Clone)]
pub struct OfferRanker {
    gazetteer: Arc<Gazetteer>,
    encoders: Arc<EncoderSet>,
    scorer: Arc<dyn Scorer>,
}

impl OfferRanker {
    pub fn new(gazetteer: Arc<Gazetteer>, encoders: Arc<EncoderSet>, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            gazetteer,
            encoders,
            scorer,
        }
    }

    /// Rank all offers of one request.
    ///
    /// Offers that yield no legs get the fallback rank and are not scored. The scorer is
    /// called once with every leg row of the request.
    pub fn rank_request(&self, request_id: &str, offers: &[Offer]) -> Result<RequestRanking, RankError> {
        let decomposer = ItineraryDecomposer::new(&self.gazetteer);

        let mut rows = Vec::new();
        let mut leg_counts = Vec::with_capacity(offers.len());
        let mut legs_skipped = 0;

        for offer in offers {
            let decomposition = decomposer.decompose(offer);
            debug_assert!(decomposition.is_prefix_partition());

            legs_skipped += decomposition.skipped.len();
            leg_counts.push(decomposition.legs.len());
            rows.extend(decomposition.legs.iter().map(LegFeatures::extract));
        }

        if rows.is_empty() {
            info!(request_id, offers = offers.len(), "No scorable legs, every offer gets the fallback rank");
            return Ok(RequestRanking {
                ranks: vec![aggregator::FALLBACK_RANK; offers.len()],
                leg_counts,
                legs_skipped,
            });
        }

        let encoded = self.encoders.encode_rows(&rows)?;
        let probabilities = self.scorer.score(&encoded)?;
        if probabilities.len() != encoded.len() {
            return Err(ScoreError::LengthMismatch {
                expected: encoded.len(),
                actual: probabilities.len(),
            }
            .into());
        }
        let probabilities: Vec<f64> = probabilities.into_iter().map(sanitise).collect();

        let collapsed = aggregator::collapse(&probabilities, &leg_counts);
        let ranks = aggregator::rank(&collapsed);
        debug!(request_id, legs = rows.len(), ?ranks, "Request ranked");

        Ok(RequestRanking {
            ranks,
            leg_counts,
            legs_skipped,
        })
    }
}
