//! Trade frame decoder
//!
//! Recognizes two payload shapes:
//! - batch: `{"data":[{"s":"SYM","p":1.0}, ...]}`
//! - single: `{"data":{"s":"SYM","p":1.0}}`
//!
//! Anything else decodes to nothing. Within a batch, only the last record
//! per symbol is kept.

use crate::store::TradeUpdate;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::str::FromStr;

/// Decode one raw frame into (symbol, price) updates
///
/// Never fails: unrecognized or malformed frames yield an empty vector.
pub fn decode_frame(payload: &[u8]) -> Vec<TradeUpdate> {
    let frame: Value = match serde_json::from_slice(payload) {
        Ok(frame) => frame,
        Err(_) => return Vec::new(),
    };

    match frame.get("data") {
        Some(Value::Array(records)) if !records.is_empty() => decode_batch(records),
        Some(Value::Object(record)) => decode_record(record).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Coalesce a batch to the last record per symbol, in first-seen order
fn decode_batch(records: &[Value]) -> Vec<TradeUpdate> {
    let mut latest: Vec<(&str, &Map<String, Value>)> = Vec::new();

    for record in records {
        // Every element must be an object or the whole batch is rejected
        let Some(record) = record.as_object() else {
            return Vec::new();
        };
        let Some(symbol) = record.get("s").and_then(Value::as_str) else {
            continue;
        };
        match latest.iter_mut().find(|(s, _)| *s == symbol) {
            Some(slot) => slot.1 = record,
            None => latest.push((symbol, record)),
        }
    }

    latest
        .into_iter()
        .filter_map(|(symbol, record)| {
            let price = record.get("p").and_then(price_from_value)?;
            Some(TradeUpdate::new(symbol, price))
        })
        .collect()
}

fn decode_record(record: &Map<String, Value>) -> Option<TradeUpdate> {
    let symbol = record.get("s")?.as_str()?;
    let price = price_from_value(record.get("p")?)?;
    Some(TradeUpdate::new(symbol, price))
}

/// Convert a JSON number to a price; anything else is not a price
pub(crate) fn price_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => price_from_number(n),
        _ => None,
    }
}

fn price_from_number(n: &Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn decode(s: &str) -> Vec<TradeUpdate> {
        decode_frame(s.as_bytes())
    }

    #[test]
    fn test_single_record() {
        let updates = decode(r#"{"data":{"s":"Y","p":7}}"#);
        assert_eq!(updates, vec![TradeUpdate::new("Y", dec!(7))]);
    }

    #[test]
    fn test_batch_coalesces_to_last_per_symbol() {
        let updates = decode(r#"{"data":[{"s":"X","p":1},{"s":"X","p":2}]}"#);
        assert_eq!(updates, vec![TradeUpdate::new("X", dec!(2))]);
    }

    #[test]
    fn test_batch_keeps_first_seen_symbol_order() {
        let updates = decode(
            r#"{"data":[
                {"s":"BINANCE:ETHUSDT","p":2500.1,"t":1,"v":0.5},
                {"s":"BINANCE:BTCUSDT","p":64000.25,"t":2,"v":0.01},
                {"s":"BINANCE:ETHUSDT","p":2500.3,"t":3,"v":0.2}
            ],"type":"trade"}"#,
        );
        assert_eq!(
            updates,
            vec![
                TradeUpdate::new("BINANCE:ETHUSDT", dec!(2500.3)),
                TradeUpdate::new("BINANCE:BTCUSDT", dec!(64000.25)),
            ]
        );
    }

    #[test]
    fn test_batch_last_record_without_price_drops_symbol() {
        let updates = decode(r#"{"data":[{"s":"X","p":1},{"s":"X"},{"s":"Z","p":3}]}"#);
        assert_eq!(updates, vec![TradeUpdate::new("Z", dec!(3))]);
    }

    #[test]
    fn test_batch_skips_records_without_symbol() {
        let updates = decode(r#"{"data":[{"p":1},{"s":"A","p":4.5}]}"#);
        assert_eq!(updates, vec![TradeUpdate::new("A", dec!(4.5))]);
    }

    #[test]
    fn test_batch_with_non_object_element_is_dropped() {
        assert!(decode(r#"{"data":[{"s":"A","p":1},["B",2]]}"#).is_empty());
    }

    #[test]
    fn test_empty_batch_is_dropped() {
        assert!(decode(r#"{"data":[]}"#).is_empty());
    }

    #[test]
    fn test_missing_data_is_dropped() {
        assert!(decode(r#"{"type":"ping"}"#).is_empty());
    }

    #[test]
    fn test_single_missing_price_is_dropped() {
        assert!(decode(r#"{"data":{"s":"Y"}}"#).is_empty());
    }

    #[test]
    fn test_string_price_is_dropped() {
        assert!(decode(r#"{"data":{"s":"Y","p":"7.5"}}"#).is_empty());
    }

    #[test]
    fn test_non_string_symbol_is_dropped() {
        assert!(decode(r#"{"data":{"s":42,"p":7}}"#).is_empty());
    }

    #[test]
    fn test_invalid_json_is_dropped() {
        assert!(decode("not valid json").is_empty());
        assert!(decode_frame(&[0xff, 0xfe, 0x00]).is_empty());
    }

    #[test]
    fn test_non_object_frame_is_dropped() {
        assert!(decode("[1,2,3]").is_empty());
        assert!(decode(r#"{"data":5}"#).is_empty());
    }

    #[test]
    fn test_scientific_notation_price() {
        let updates = decode(r#"{"data":{"s":"Y","p":1.5e3}}"#);
        assert_eq!(updates, vec![TradeUpdate::new("Y", dec!(1500))]);
    }
}
