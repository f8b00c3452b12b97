use crate::features::{Cell, FeatureColumn, LegFeatures};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    #[error("Value '{value}' is not a known category of column {column}")]
    UnknownCategory { column: FeatureColumn, value: String },
    #[error("Column {column} holds text '{value}' but has no encoder")]
    Unencoded { column: FeatureColumn, value: String },
}

/// What to do with a value missing from a column's category list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategory {
    /// Fail the whole request.
    #[default]
    Reject,
    /// Map to one past the last known category.
    Bucket,
}

/// Ordinal encoder for one column: a value maps to the index of its first occurrence.
#[derive(Debug, Clone, Default)]
pub struct CategoryEncoder {
    categories: Vec<String>,
    positions: HashMap<String, usize>,
}

impl CategoryEncoder {
    pub fn new(categories: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(categories.len());
        for (index, category) in categories.iter().enumerate() {
            positions.entry(category.clone()).or_insert(index);
        }
        Self { categories, positions }
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.positions.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Encode a whole column of values, failing on the first unknown one.
    pub fn encode_column<S: AsRef<str>>(
        &self,
        column: FeatureColumn,
        values: &[S],
    ) -> Result<Vec<usize>, EncodingError> {
        values
            .iter()
            .map(|v| {
                self.position(v.as_ref()).ok_or_else(|| EncodingError::UnknownCategory {
                    column,
                    value: v.as_ref().to_string(),
                })
            })
            .collect()
    }
}

/// Scorer input: one numeric value per [`FeatureColumn`], in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    values: [f64; FeatureColumn::COUNT],
}

impl EncodedRow {
    pub fn new(values: [f64; FeatureColumn::COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, column: FeatureColumn) -> f64 {
        self.values[column.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// The encoder dictionaries shipped with the scoring model.
#[derive(Debug, Clone, Default)]
pub struct EncoderSet {
    encoders: HashMap<FeatureColumn, CategoryEncoder>,
    unknown: UnknownCategory,
}

impl EncoderSet {
    /// Build from `column name -> ordered categories`. Columns the model does not use are ignored.
    pub fn new(dictionaries: HashMap<String, Vec<String>>) -> Self {
        let mut encoders = HashMap::new();
        for (name, categories) in dictionaries {
            match name.parse::<FeatureColumn>() {
                Ok(column) => {
                    encoders.insert(column, CategoryEncoder::new(categories));
                }
                Err(_) => warn!(column = %name, "Encoder for unknown feature column ignored"),
            }
        }
        Self {
            encoders,
            unknown: UnknownCategory::default(),
        }
    }

    pub fn with_unknown_policy(mut self, unknown: UnknownCategory) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn encoder(&self, column: FeatureColumn) -> Option<&CategoryEncoder> {
        self.encoders.get(&column)
    }

    pub fn encode_row(&self, features: &LegFeatures) -> Result<EncodedRow, EncodingError> {
        let mut values = [0.0; FeatureColumn::COUNT];
        for column in FeatureColumn::ALL {
            values[column.index()] = self.encode_cell(column, features.cell(column))?;
        }
        Ok(EncodedRow { values })
    }

    pub fn encode_rows(&self, rows: &[LegFeatures]) -> Result<Vec<EncodedRow>, EncodingError> {
        rows.iter().map(|r| self.encode_row(r)).collect()
    }

    fn encode_cell(&self, column: FeatureColumn, cell: Cell) -> Result<f64, EncodingError> {
        if let Some(encoder) = self.encoders.get(&column) {
            let value = cell.to_string();
            return match (encoder.position(&value), self.unknown) {
                (Some(index), _) => Ok(index as f64),
                (None, UnknownCategory::Bucket) => Ok(encoder.len() as f64),
                (None, UnknownCategory::Reject) => {
                    Err(EncodingError::UnknownCategory { column, value })
                }
            };
        }

        match cell {
            Cell::Int(v) => Ok(v as f64),
            Cell::Real(v) => Ok(v),
            Cell::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| EncodingError::Unencoded { column, value: text }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use altis_core::CityId;

    fn features() -> LegFeatures {
        LegFeatures {
            client_id: "42".to_string(),
            traveller_grade: "-1".to_string(),
            from: CityId(1),
            to: CityId(2),
            flight_company: "SU".to_string(),
            flight_duration_hours: 1,
            segment_count: 1,
            delta_actual_request: 3600,
            departure_day_of_week: 4,
            arrival_day_of_week: 4,
            amount: 500.0,
            cabin_class: "Economy".to_string(),
            is_baggage: true,
            refund_permitted: false,
            exchange_permitted: false,
            discounted: false,
            in_travel_policy: true,
        }
    }

    fn dictionaries() -> HashMap<String, Vec<String>> {
        let mut d = HashMap::new();
        d.insert("FlightCompany".to_string(), vec!["S7".into(), "SU".into(), "SU".into()]);
        d.insert("class".to_string(), vec!["Business".into(), "Economy".into()]);
        d.insert("TravellerGrade".to_string(), vec!["-1".into(), "1".into()]);
        d.insert("FlightDuration".to_string(), vec!["0".into(), "1".into(), "2".into()]);
        d
    }

    #[test]
    fn test_first_occurrence_index() {
        let encoder = CategoryEncoder::new(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(encoder.position("a"), Some(0));
        assert_eq!(encoder.position("b"), Some(1));
        assert_eq!(
            encoder.encode_column(FeatureColumn::CabinClass, &["b", "a"]),
            Ok(vec![1, 0])
        );
        assert_eq!(
            encoder.encode_column(FeatureColumn::CabinClass, &["c"]),
            Err(EncodingError::UnknownCategory {
                column: FeatureColumn::CabinClass,
                value: "c".to_string()
            })
        );
    }

    #[test]
    fn test_encode_row() {
        let encoders = EncoderSet::new(dictionaries());
        let row = encoders.encode_row(&features()).unwrap();
        assert_eq!(row.get(FeatureColumn::FlightCompany), 1.0);
        assert_eq!(row.get(FeatureColumn::CabinClass), 1.0);
        assert_eq!(row.get(FeatureColumn::TravellerGrade), 0.0);
        assert_eq!(row.get(FeatureColumn::FlightDuration), 1.0);
        // No encoder: numeric text and numbers pass through.
        assert_eq!(row.get(FeatureColumn::ClientId), 42.0);
        assert_eq!(row.get(FeatureColumn::Amount), 500.0);
        assert_eq!(row.get(FeatureColumn::IsBaggage), 1.0);
        assert_eq!(row.as_slice().len(), FeatureColumn::COUNT);
    }

    #[test]
    fn test_unknown_category_rejected_by_default() {
        let encoders = EncoderSet::new(dictionaries());
        let mut f = features();
        f.flight_company = "DP".to_string();
        assert_eq!(
            encoders.encode_row(&f),
            Err(EncodingError::UnknownCategory {
                column: FeatureColumn::FlightCompany,
                value: "DP".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_category_bucket() {
        let encoders = EncoderSet::new(dictionaries()).with_unknown_policy(UnknownCategory::Bucket);
        let mut f = features();
        f.flight_company = "DP".to_string();
        let row = encoders.encode_row(&f).unwrap();
        assert_eq!(row.get(FeatureColumn::FlightCompany), 3.0);
    }

    #[test]
    fn test_text_without_encoder() {
        // Numeric-looking text ("42", "-1") passes; the carrier code does not.
        let encoders = EncoderSet::new(HashMap::new());
        let err = encoders.encode_row(&features()).unwrap_err();
        assert_eq!(
            err,
            EncodingError::Unencoded {
                column: FeatureColumn::FlightCompany,
                value: "SU".to_string()
            }
        );
    }
}
