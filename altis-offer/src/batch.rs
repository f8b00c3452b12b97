use crate::models::Offer;
use crate::ranker::{OfferRanker, RankError, RequestRanking};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, info};

/// Rows of the batch that belong to one customer request, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestGroup {
    pub request_id: String,
    pub rows: Vec<usize>,
}

/// Group rows by request id, requests ordered by first appearance.
pub fn group_by_request(offers: &[Offer]) -> Vec<RequestGroup> {
    let mut groups: Vec<RequestGroup> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for (row, offer) in offers.iter().enumerate() {
        let slot = *slots.entry(offer.request_id.as_str()).or_insert_with(|| {
            groups.push(RequestGroup {
                request_id: offer.request_id.clone(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }
    groups
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub requests: usize,
    pub offers: usize,
    pub legs_scored: usize,
    pub legs_skipped: usize,
    pub zero_leg_offers: usize,
    pub failed_requests: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests, {} offers, {} legs scored, {} legs skipped, {} zero-leg offers, {} failed requests",
            self.requests,
            self.offers,
            self.legs_scored,
            self.legs_skipped,
            self.zero_leg_offers,
            self.failed_requests
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// One rank per input row; `None` for rows of failed requests.
    pub ranks: Vec<Option<u32>>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    fn new(rows: usize) -> Self {
        Self {
            ranks: vec![None; rows],
            summary: BatchSummary {
                offers: rows,
                ..BatchSummary::default()
            },
        }
    }

    fn record(&mut self, group: &RequestGroup, result: Result<RequestRanking, RankError>) {
        self.summary.requests += 1;
        match result {
            Ok(ranking) => {
                self.summary.legs_scored += ranking.legs_scored();
                self.summary.legs_skipped += ranking.legs_skipped;
                self.summary.zero_leg_offers += ranking.zero_leg_offers();
                for (&row, rank) in group.rows.iter().zip(ranking.ranks) {
                    self.ranks[row] = Some(rank);
                }
            }
            Err(e) => {
                error!(request_id = %group.request_id, error = %e, "Request could not be ranked");
                self.summary.failed_requests += 1;
            }
        }
    }
}

impl OfferRanker {
    /// Rank a whole batch, one request at a time.
    pub fn rank_batch(&self, offers: &[Offer]) -> BatchOutcome {
        let mut outcome = BatchOutcome::new(offers.len());
        for group in group_by_request(offers) {
            let request: Vec<Offer> = group.rows.iter().map(|&i| offers[i].clone()).collect();
            let result = self.rank_request(&group.request_id, &request);
            outcome.record(&group, result);
        }
        info!(summary = %outcome.summary, "Batch ranked");
        outcome
    }

    /// Rank a batch with up to `workers` requests in flight on the blocking pool.
    ///
    /// Results are collected in request order, so the outcome matches [`rank_batch`](Self::rank_batch).
    pub async fn rank_batch_parallel(&self, offers: &[Offer], workers: usize) -> BatchOutcome {
        let groups = group_by_request(offers);
        let tasks = groups.iter().map(|group| {
            let ranker = self.clone();
            let request_id = group.request_id.clone();
            let request: Vec<Offer> = group.rows.iter().map(|&i| offers[i].clone()).collect();
            tokio::task::spawn_blocking(move || ranker.rank_request(&request_id, &request))
        });
        let results: Vec<_> = stream::iter(tasks).buffered(workers.max(1)).collect().await;

        let mut outcome = BatchOutcome::new(offers.len());
        for (group, joined) in groups.iter().zip(results) {
            match joined {
                Ok(result) => outcome.record(group, result),
                Err(e) => {
                    error!(request_id = %group.request_id, error = %e, "Ranking task aborted");
                    outcome.summary.requests += 1;
                    outcome.summary.failed_requests += 1;
                }
            }
        }
        info!(summary = %outcome.summary, workers, "Batch ranked");
        outcome
    }
}
