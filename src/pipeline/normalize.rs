//! Field normalization: untrusted extraction record → [`NormalizedShipment`].
//!
//! The model's JSON is treated as hostile input. Every field is looked up by
//! its schema key and coerced into its Rust type; anything outside the
//! field's vocabulary is replaced by the safe default and reported as a
//! [`NormalizationWarning`]. Normalization itself never fails.
//!
//! A missing field is not warned (the model is told to omit or blank what it
//! cannot see), except for `zone`, where absence makes the page unpriceable.

use crate::error::NormalizationWarning;
use crate::shipment::{Flag, NormalizedShipment, OverLengthBucket, TimeSpecificKind, Zone};
use serde_json::{Map, Value};
use tracing::debug;

/// Normalize one extraction record.
pub fn normalize_record(record: &Map<String, Value>) -> (NormalizedShipment, Vec<NormalizationWarning>) {
    let mut n = Normalizer {
        record,
        warnings: Vec::new(),
    };

    let shipment = NormalizedShipment {
        job_id: n.text("pro"),
        zone: n.zone("zone"),
        actual_weight: n.number("weight"),
        volume: n.number("volume"),
        liftgate: n.flag("liftgate"),
        inside: n.flag("inside"),
        residential: n.flag("residential"),
        over_length: n.vocabulary("overLength", OverLengthBucket::parse, "97-144, 145-192, 193-240, 241 or more"),
        pallet_count: n.count("palletCount"),
        has_debris_section: n.boolean("hasDebrisSection"),
        is_lakeshore_client: n.boolean("isLakeshore"),
        time_specific: n.vocabulary("timeSpecific", TimeSpecificKind::parse, "AM Special, 2 Hours, 15 Minutes"),
        detention_minutes: n.count("detention"),
    };

    if !n.warnings.is_empty() {
        debug!(
            "Normalized '{}' with {} substitution(s)",
            shipment.job_id,
            n.warnings.len()
        );
    }
    (shipment, n.warnings)
}

struct Normalizer<'a> {
    record: &'a Map<String, Value>,
    warnings: Vec<NormalizationWarning>,
}

impl Normalizer<'_> {
    /// Present and not JSON `null`.
    fn get(&self, field: &str) -> Option<&Value> {
        self.record.get(field).filter(|v| !v.is_null())
    }

    fn warn(&mut self, field: &str, value: &Value, reason: impl Into<String>) {
        self.warnings.push(NormalizationWarning {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        });
    }

    fn text(&mut self, field: &str) -> String {
        match self.get(field).cloned() {
            None => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                self.warn(field, &other, "expected text; left blank");
                String::new()
            }
        }
    }

    fn zone(&mut self, field: &str) -> Option<Zone> {
        let Some(value) = self.get(field).cloned() else {
            self.warn(field, &Value::Null, "zone missing; pricing unavailable");
            return None;
        };
        let zone = value.as_str().and_then(Zone::parse);
        if zone.is_none() {
            self.warn(field, &value, "not a zone letter A-L; pricing unavailable");
        }
        zone
    }

    /// Non-negative number. Accepts JSON numbers and numeric strings with
    /// thousands separators.
    fn number(&mut self, field: &str) -> f64 {
        let Some(value) = self.get(field).cloned() else {
            return 0.0;
        };
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if s.trim().is_empty() => return 0.0,
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            Some(v) if v.is_finite() => {
                self.warn(field, &value, "negative; replaced with 0");
                0.0
            }
            _ => {
                self.warn(field, &value, "not a number; replaced with 0");
                0.0
            }
        }
    }

    /// Non-negative integer; fractions are truncated.
    fn count(&mut self, field: &str) -> u32 {
        let v = self.number(field).trunc();
        if v > u32::MAX as f64 {
            u32::MAX
        } else {
            v as u32
        }
    }

    fn flag(&mut self, field: &str) -> Flag {
        let Some(value) = self.get(field).cloned() else {
            return Flag::Blank;
        };
        match &value {
            Value::Bool(true) => Flag::Yes,
            Value::Bool(false) => Flag::Blank,
            Value::String(s) if s.trim().eq_ignore_ascii_case("yes") => Flag::Yes,
            Value::String(s) if s.trim().is_empty() => Flag::Blank,
            _ => {
                self.warn(field, &value, "expected \"Yes\" or blank; treated as blank");
                Flag::Blank
            }
        }
    }

    fn boolean(&mut self, field: &str) -> bool {
        let Some(value) = self.get(field).cloned() else {
            return false;
        };
        match &value {
            Value::Bool(b) => *b,
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => true,
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") || s.trim().is_empty() => false,
            _ => {
                self.warn(field, &value, "expected true or false; treated as false");
                false
            }
        }
    }

    fn vocabulary<T>(&mut self, field: &str, parse: fn(&str) -> Option<T>, allowed: &str) -> Option<T> {
        let value = self.get(field).cloned()?;
        match &value {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => {
                let parsed = parse(s);
                if parsed.is_none() {
                    self.warn(field, &value, format!("not one of {allowed}; treated as blank"));
                }
                parsed
            }
            _ => {
                self.warn(field, &value, format!("not one of {allowed}; treated as blank"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn clean_record_normalizes_without_warnings() {
        let (s, warnings) = normalize_record(&record(json!({
            "pro": "PRO-123",
            "zone": "h",
            "weight": 1250,
            "volume": 44.44,
            "liftgate": "Yes",
            "inside": "",
            "residential": "yes",
            "overLength": "193-240",
            "palletCount": 5,
            "hasDebrisSection": false,
            "isLakeshore": true,
            "timeSpecific": "AM Special",
            "detention": 45
        })));

        assert!(warnings.is_empty(), "unexpected: {warnings:?}");
        assert_eq!(s.job_id, "PRO-123");
        assert_eq!(s.zone, Some(Zone::H));
        assert_eq!(s.actual_weight, 1250.0);
        assert_eq!(s.volume, 44.44);
        assert_eq!(s.liftgate, Flag::Yes);
        assert_eq!(s.inside, Flag::Blank);
        assert_eq!(s.residential, Flag::Yes);
        assert_eq!(s.over_length, Some(OverLengthBucket::In193To240));
        assert_eq!(s.pallet_count, 5);
        assert!(s.is_lakeshore_client);
        assert_eq!(s.time_specific, Some(TimeSpecificKind::AmSpecial));
        assert_eq!(s.detention_minutes, 45);
    }

    #[test]
    fn missing_fields_default_silently_except_zone() {
        let (s, warnings) = normalize_record(&Map::new());
        assert_eq!(s.job_id, "");
        assert_eq!(s.zone, None);
        assert_eq!(s.actual_weight, 0.0);
        assert_eq!(s.pallet_count, 0);
        assert!(!s.has_debris_section);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "zone");
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let (s, warnings) = normalize_record(&record(json!({
            "zone": "A",
            "weight": "1,250",
            "volume": " 12.5 ",
            "palletCount": "3",
            "detention": 45.9,
            "pro": 98765
        })));
        assert!(warnings.is_empty(), "unexpected: {warnings:?}");
        assert_eq!(s.actual_weight, 1250.0);
        assert_eq!(s.volume, 12.5);
        assert_eq!(s.pallet_count, 3);
        assert_eq!(s.detention_minutes, 45);
        assert_eq!(s.job_id, "98765");
    }

    #[test]
    fn out_of_vocabulary_values_fall_back_with_warnings() {
        let (s, warnings) = normalize_record(&record(json!({
            "zone": "Z",
            "weight": "heavy",
            "volume": -3,
            "liftgate": "maybe",
            "overLength": "300",
            "timeSpecific": "Evening",
            "isLakeshore": "perhaps"
        })));

        assert_eq!(s.zone, None);
        assert_eq!(s.actual_weight, 0.0);
        assert_eq!(s.volume, 0.0);
        assert_eq!(s.liftgate, Flag::Blank);
        assert_eq!(s.over_length, None);
        assert_eq!(s.time_specific, None);
        assert!(!s.is_lakeshore_client);

        let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["zone", "weight", "volume", "liftgate", "overLength", "isLakeshore", "timeSpecific"]
        );
    }

    #[test]
    fn booleans_and_flags_accept_json_bools_and_strings() {
        let (s, warnings) = normalize_record(&record(json!({
            "zone": "C",
            "liftgate": true,
            "inside": null,
            "hasDebrisSection": "TRUE",
            "isLakeshore": "false"
        })));
        assert!(warnings.is_empty());
        assert_eq!(s.liftgate, Flag::Yes);
        assert_eq!(s.inside, Flag::Blank);
        assert!(s.has_debris_section);
        assert!(!s.is_lakeshore_client);
    }

    #[test]
    fn zone_is_trimmed_and_uppercased() {
        let (s, _) = normalize_record(&record(json!({ "zone": "  l " })));
        assert_eq!(s.zone, Some(Zone::L));
    }
}
