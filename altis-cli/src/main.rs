use altis_core::Gazetteer;
use altis_offer::{EncoderSet, OfferRanker};
use altis_store::app_config::Config;
use altis_store::{load_encoders, load_gazetteer, load_model, OfferBatch};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "altis-rank",
    about = "Rank travel offers within each customer request by predicted preference"
)]
struct Cli {
    /// City directory CSV (overrides data.cities)
    #[arg(long, value_name = "PATH")]
    cities: Option<PathBuf>,

    /// Airport directory CSV (overrides data.airports)
    #[arg(long, value_name = "PATH")]
    airports: Option<PathBuf>,

    /// Offer batch to rank (overrides data.submit)
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Where to write the ranked batch (overrides data.filled_submit)
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Scoring model JSON (overrides model.path)
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Category dictionaries JSON (overrides model.encoders)
    #[arg(long, value_name = "PATH")]
    encoders: Option<PathBuf>,

    /// Requests ranked concurrently (overrides ranking.workers)
    #[arg(long)]
    workers: Option<usize>,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.cities {
            config.data.cities = path;
        }
        if let Some(path) = self.airports {
            config.data.airports = path;
        }
        if let Some(path) = self.input {
            config.data.submit = path;
        }
        if let Some(path) = self.output {
            config.data.filled_submit = path;
        }
        if let Some(path) = self.model {
            config.model.path = path;
        }
        if let Some(path) = self.encoders {
            config.model.encoders = path;
        }
        if let Some(workers) = self.workers {
            config.ranking.workers = workers;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "altis_rank=info,altis_offer=info,altis_store=info,altis_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load config")?;
    cli.apply(&mut config);

    let gazetteer: Gazetteer = load_gazetteer(&config.data.cities, &config.data.airports)
        .context("Failed to load city and airport directory")?;
    let dictionaries = load_encoders(&config.model.encoders).context("Failed to load encoders")?;
    let encoders = EncoderSet::new(dictionaries).with_unknown_policy(config.ranking.unknown_category);
    let scorer = load_model(&config.model.path).context("Failed to load scoring model")?;

    let batch = OfferBatch::load(&config.data.submit)
        .with_context(|| format!("Failed to read offers from {}", config.data.submit.display()))?;

    let ranker = OfferRanker::new(Arc::new(gazetteer), Arc::new(encoders), Arc::new(scorer));
    tracing::info!(
        rows = batch.row_count(),
        offers = batch.offers.len(),
        workers = config.ranking.workers,
        unknown_category = ?config.ranking.unknown_category,
        "Ranking offers"
    );

    let outcome = if config.ranking.workers > 1 {
        ranker.rank_batch_parallel(&batch.offers, config.ranking.workers).await
    } else {
        ranker.rank_batch(&batch.offers)
    };

    batch
        .save_ranked(&config.data.filled_submit, &config.ranking.rank_column, &outcome.ranks)
        .with_context(|| format!("Failed to write {}", config.data.filled_submit.display()))?;

    if outcome.summary.failed_requests > 0 {
        tracing::warn!(failed = outcome.summary.failed_requests, "Some requests were left unranked");
    }
    tracing::info!(summary = %outcome.summary, "Done");
    Ok(())
}
