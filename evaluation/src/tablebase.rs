//! Validation of tablebase-service responses (Lichess JSON shape) into
//! [`RawTablebaseResult`].
//!
//! Every numeric field is read leniently: numbers, numeric strings and
//! finite floats are accepted, anything else is treated as absent.

use serde::Deserialize;
use serde_json::Value;

use crate::provider::ProviderError;
use crate::raw::{RawTablebaseResult, TablebaseCategory};

/// Loosely-typed response body as returned by the tablebase service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TablebaseResponse {
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub wdl: Option<Value>,
    #[serde(default)]
    pub dtz: Option<Value>,
    #[serde(default)]
    pub precise_dtz: Option<Value>,
    #[serde(default)]
    pub dtm: Option<Value>,
    #[serde(default)]
    pub checkmate: Option<Value>,
    #[serde(default)]
    pub stalemate: Option<Value>,
}

impl TablebaseResponse {
    /// Convert to the typed result. Returns `None` when the body carries no
    /// usable verdict (no category, no wdl, not a terminal position).
    pub fn into_raw(self) -> Option<RawTablebaseResult> {
        if self.checkmate.as_ref().and_then(Value::as_bool) == Some(true) {
            return Some(RawTablebaseResult {
                wdl: -2,
                dtz: Some(0),
                dtm: Some(0),
                category: TablebaseCategory::Loss,
                precise: true,
            });
        }
        if self.stalemate.as_ref().and_then(Value::as_bool) == Some(true) {
            return Some(RawTablebaseResult {
                wdl: 0,
                dtz: Some(0),
                dtm: None,
                category: TablebaseCategory::Draw,
                precise: true,
            });
        }

        let category = self.category.as_ref().and_then(parse_category);
        let wdl = self.wdl.as_ref().and_then(lenient_int).map(|w| w.clamp(-2, 2));

        let (wdl, category) = match (wdl, category) {
            (Some(w), Some(c)) => (w, c),
            (Some(w), None) => (w, TablebaseCategory::from_wdl(w)),
            (None, Some(c)) => (c.wdl(), c),
            (None, None) => return None,
        };

        let precise_dtz = self.precise_dtz.as_ref().and_then(lenient_int);
        let dtz = self.dtz.as_ref().and_then(lenient_int).or(precise_dtz);

        Some(RawTablebaseResult {
            wdl,
            dtz,
            dtm: self.dtm.as_ref().and_then(lenient_int),
            category,
            precise: precise_dtz.is_some(),
        })
    }
}

/// Parse a JSON response body.
pub fn parse_tablebase_response(body: &str) -> Result<Option<RawTablebaseResult>, ProviderError> {
    let response: TablebaseResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    Ok(response.into_raw())
}

fn parse_category(value: &Value) -> Option<TablebaseCategory> {
    let label = value.as_str()?.trim().to_ascii_lowercase();
    // Newer service versions prefix the source ("syzygy-win")
    let label = label.strip_prefix("syzygy-").unwrap_or(&label);
    Some(
        serde_json::from_value(Value::String(label.to_string()))
            .unwrap_or(TablebaseCategory::Unknown),
    )
}

/// Read an integer from a JSON value, tolerating strings and floats.
pub(crate) fn lenient_int(value: &Value) -> Option<i32> {
    let wide = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => float_to_i64(n.as_f64()?)?,
        },
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => float_to_i64(s.parse::<f64>().ok()?)?,
            }
        }
        _ => return None,
    };
    i32::try_from(wide).ok()
}

fn float_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f.round() as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_win_with_dtm() {
        let body = r#"{"category":"win","dtz":13,"precise_dtz":13,"dtm":15,"checkmate":false,"stalemate":false}"#;
        let raw = parse_tablebase_response(body).unwrap().unwrap();
        assert_eq!(raw.wdl, 2);
        assert_eq!(raw.category, TablebaseCategory::Win);
        assert_eq!(raw.dtz, Some(13));
        assert_eq!(raw.dtm, Some(15));
        assert!(raw.precise);
    }

    #[test]
    fn test_parse_cursed_win_without_dtm() {
        let body = r#"{"category":"cursed-win","dtz":101,"precise_dtz":null,"dtm":null}"#;
        let raw = parse_tablebase_response(body).unwrap().unwrap();
        assert_eq!(raw.wdl, 1);
        assert_eq!(raw.dtm, None);
        assert!(!raw.precise);
    }

    #[test]
    fn test_parse_checkmate_and_stalemate() {
        let raw = parse_tablebase_response(r#"{"checkmate":true,"category":"loss"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(raw.wdl, -2);
        assert_eq!(raw.dtm, Some(0));

        let raw = parse_tablebase_response(r#"{"stalemate":true}"#)
            .unwrap()
            .unwrap();
        assert_eq!(raw.wdl, 0);
        assert_eq!(raw.category, TablebaseCategory::Draw);
    }

    #[test]
    fn test_unparsable_numbers_are_absent() {
        let body = r#"{"category":"loss","dtz":"soon","dtm":[1,2]}"#;
        let raw = parse_tablebase_response(body).unwrap().unwrap();
        assert_eq!(raw.wdl, -2);
        assert_eq!(raw.dtz, None);
        assert_eq!(raw.dtm, None);
    }

    #[test]
    fn test_numeric_strings_and_floats_accepted() {
        let body = r#"{"wdl":"1","dtz":"-12","dtm":20.0}"#;
        let raw = parse_tablebase_response(body).unwrap().unwrap();
        assert_eq!(raw.wdl, 1);
        assert_eq!(raw.category, TablebaseCategory::CursedWin);
        assert_eq!(raw.dtz, Some(-12));
        assert_eq!(raw.dtm, Some(20));
    }

    #[test]
    fn test_unknown_category_label() {
        let raw = parse_tablebase_response(r#"{"category":"mystery"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(raw.category, TablebaseCategory::Unknown);
        assert_eq!(raw.wdl, 0);
    }

    #[test]
    fn test_prefixed_category_label() {
        let raw = parse_tablebase_response(r#"{"category":"syzygy-win"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(raw.category, TablebaseCategory::Win);
    }

    #[test]
    fn test_empty_body_has_no_verdict() {
        assert_eq!(parse_tablebase_response("{}").unwrap(), None);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(
            parse_tablebase_response("not json"),
            Err(ProviderError::Malformed(_))
        ));
    }
}
