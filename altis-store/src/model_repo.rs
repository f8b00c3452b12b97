use crate::StoreResult;
use altis_offer::{LogisticModel, LogisticScorer};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// Category text of one dictionary entry, matching how feature cells print.
fn category_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse the category dictionaries: a JSON object of column name to ordered category list.
pub fn read_encoders<R: Read>(reader: R) -> StoreResult<HashMap<String, Vec<String>>> {
    let raw: HashMap<String, Vec<Value>> = serde_json::from_reader(reader)?;
    let mut dictionaries = HashMap::with_capacity(raw.len());
    for (column, values) in raw {
        let total = values.len();
        let categories: Vec<String> = values.iter().filter_map(category_text).collect();
        if categories.len() != total {
            warn!(column = %column, skipped = total - categories.len(), "Dropped non-scalar categories");
        }
        dictionaries.insert(column, categories);
    }
    Ok(dictionaries)
}

pub fn load_encoders(path: &Path) -> StoreResult<HashMap<String, Vec<String>>> {
    let dictionaries = read_encoders(BufReader::new(File::open(path)?))?;
    info!(path = %path.display(), columns = dictionaries.len(), "Encoders loaded");
    Ok(dictionaries)
}

pub fn read_model<R: Read>(reader: R) -> StoreResult<LogisticScorer> {
    let model: LogisticModel = serde_json::from_reader(reader)?;
    Ok(LogisticScorer::try_from(model)?)
}

pub fn load_model(path: &Path) -> StoreResult<LogisticScorer> {
    let scorer = read_model(BufReader::new(File::open(path)?))?;
    info!(path = %path.display(), "Scoring model loaded");
    Ok(scorer)
}
