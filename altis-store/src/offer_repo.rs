use crate::StoreResult;
use altis_offer::Offer;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// An offer batch as read from disk: the raw rows, kept for write-back, and the parsed offers.
#[derive(Debug, Clone)]
pub struct OfferBatch {
    headers: csv::StringRecord,
    records: Vec<csv::StringRecord>,
    /// Record index of each parsed offer.
    offer_rows: Vec<usize>,
    pub offers: Vec<Offer>,
}

impl OfferBatch {
    /// Parse an offer CSV. Rows that do not deserialize are kept for output but not ranked.
    ///
    /// Cells are trimmed before parsing; the rows written back keep their trimmed text.
    pub fn read<R: Read>(reader: R) -> StoreResult<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut batch = OfferBatch {
            headers,
            records: Vec::new(),
            offer_rows: Vec::new(),
            offers: Vec::new(),
        };

        for result in rdr.records() {
            let record = result?;
            match record.deserialize::<Offer>(Some(&batch.headers)) {
                Ok(offer) => {
                    batch.offer_rows.push(batch.records.len());
                    batch.offers.push(offer);
                }
                Err(e) => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    warn!(line, error = %e, "Unreadable offer row, it will not be ranked");
                }
            }
            batch.records.push(record);
        }
        Ok(batch)
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        let batch = Self::read(File::open(path)?)?;
        info!(
            path = %path.display(),
            rows = batch.row_count(),
            offers = batch.offers.len(),
            "Offer batch loaded"
        );
        Ok(batch)
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Write every input row back with `rank_column` set from `ranks` (one per offer).
    /// The column is appended when the input does not have it; missing ranks are left blank.
    pub fn write_ranked<W: Write>(&self, writer: W, rank_column: &str, ranks: &[Option<u32>]) -> StoreResult<()> {
        let mut row_ranks: Vec<Option<u32>> = vec![None; self.records.len()];
        for (&row, &rank) in self.offer_rows.iter().zip(ranks) {
            row_ranks[row] = rank;
        }

        let column = self.headers.iter().position(|h| h == rank_column);
        let mut wtr = csv::Writer::from_writer(writer);

        let mut headers = self.headers.clone();
        if column.is_none() {
            headers.push_field(rank_column);
        }
        wtr.write_record(&headers)?;

        for (record, rank) in self.records.iter().zip(row_ranks) {
            let rank = rank.map(|r| r.to_string()).unwrap_or_default();
            let mut out = csv::StringRecord::new();
            for (i, field) in record.iter().enumerate() {
                if Some(i) == column {
                    out.push_field(&rank);
                } else {
                    out.push_field(field);
                }
            }
            if column.is_none() {
                out.push_field(&rank);
            }
            wtr.write_record(&out)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn save_ranked(&self, path: &Path, rank_column: &str, ranks: &[Option<u32>]) -> StoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.write_ranked(File::create(path)?, rank_column, ranks)?;
        info!(path = %path.display(), rows = self.records.len(), "Ranked batch written");
        Ok(())
    }
}
