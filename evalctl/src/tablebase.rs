//! Tablebase answers loaded from a JSON file instead of a live service.
//!
//! The file holds either one response object (applied to the position on the
//! command line) or an object mapping FENs to response objects. Responses use
//! the Lichess tablebase shape.

use std::collections::HashMap;

use anyhow::{bail, Context};
use async_trait::async_trait;
use evaluation::{
    CancellationToken, ProviderError, RawTablebaseResult, TablebaseLookup, TablebaseProvider,
    TablebaseResponse,
};
use serde_json::{Map, Value};

const RESPONSE_FIELDS: [&str; 7] = [
    "category",
    "wdl",
    "dtz",
    "precise_dtz",
    "dtm",
    "checkmate",
    "stalemate",
];

/// Placement and side to move. Counters and castling rights don't change a
/// tablebase verdict.
fn position_key(fen: &str) -> String {
    fen.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

fn looks_like_response(object: &Map<String, Value>) -> bool {
    object.keys().any(|k| RESPONSE_FIELDS.contains(&k.as_str()))
}

fn decode(value: Value) -> anyhow::Result<Option<RawTablebaseResult>> {
    let response: TablebaseResponse =
        serde_json::from_value(value).context("invalid tablebase response")?;
    Ok(response.into_raw())
}

#[derive(Debug, Default)]
pub struct StaticTablebase {
    answers: HashMap<String, RawTablebaseResult>,
}

impl StaticTablebase {
    /// Load answers from `body`. A single response object is keyed on
    /// `default_fen`.
    pub fn from_json(body: &str, default_fen: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(body).context("tablebase file is not JSON")?;
        let Value::Object(object) = value else {
            bail!("tablebase file must contain a JSON object");
        };

        let mut answers = HashMap::new();
        if looks_like_response(&object) {
            if let Some(raw) = decode(Value::Object(object))? {
                answers.insert(position_key(default_fen), raw);
            }
        } else {
            for (fen, value) in object {
                match decode(value).with_context(|| format!("entry for {}", fen))? {
                    Some(raw) => {
                        answers.insert(position_key(&fen), raw);
                    }
                    None => tracing::warn!(fen = %fen, "Tablebase entry has no verdict, ignoring"),
                }
            }
        }

        tracing::info!(positions = answers.len(), "Loaded static tablebase answers");
        Ok(Self { answers })
    }
}

#[async_trait]
impl TablebaseProvider for StaticTablebase {
    async fn lookup(
        &self,
        fen: &str,
        _cancel: &CancellationToken,
    ) -> Result<TablebaseLookup, ProviderError> {
        Ok(self
            .answers
            .get(&position_key(fen))
            .cloned()
            .map(TablebaseLookup::found)
            .unwrap_or_else(TablebaseLookup::unavailable))
    }
}
