//! Typed shipment record and the fixed vocabularies it is built from.
//!
//! Every enumerated field on a bill of lading has a small closed vocabulary.
//! Modelling each one as an enum means the pricing engine never has to
//! re-validate strings: by the time a [`NormalizedShipment`] exists, an
//! out-of-vocabulary value has already been replaced with its safe default
//! by [`crate::pipeline::normalize`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery zone A–L. Determines the freight rate tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Zone {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
}

impl Zone {
    /// All twelve valid zones in tariff order.
    pub const ALL: [Zone; 12] = [
        Zone::A,
        Zone::B,
        Zone::C,
        Zone::D,
        Zone::E,
        Zone::F,
        Zone::G,
        Zone::H,
        Zone::I,
        Zone::J,
        Zone::K,
        Zone::L,
    ];

    /// Parse a zone code. Surrounding whitespace and case are ignored;
    /// anything but a single letter A–L is rejected.
    pub fn parse(s: &str) -> Option<Zone> {
        let s = s.trim();
        let mut chars = s.chars();
        let c = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() {
            return None;
        }
        Zone::ALL.iter().copied().find(|z| z.letter() == c)
    }

    /// The zone's letter.
    pub fn letter(self) -> char {
        (b'A' + self as u8) as char
    }

    /// Early zones (A–D) pay the lower time-specific delivery fee.
    pub fn is_early(self) -> bool {
        matches!(self, Zone::A | Zone::B | Zone::C | Zone::D)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Tri-state accessorial flag: the BOL either asks for the service or is blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "Yes")]
    Yes,
    #[default]
    #[serde(rename = "")]
    Blank,
}

impl Flag {
    pub fn is_yes(self) -> bool {
        self == Flag::Yes
    }

    pub fn label(self) -> &'static str {
        match self {
            Flag::Yes => "Yes",
            Flag::Blank => "",
        }
    }
}

/// Longest-dimension bucket, in inches, for over-length freight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OverLengthBucket {
    #[serde(rename = "97-144")]
    In97To144,
    #[serde(rename = "145-192")]
    In145To192,
    #[serde(rename = "193-240")]
    In193To240,
    #[serde(rename = "241 or more")]
    In241Plus,
}

impl OverLengthBucket {
    pub const ALL: [OverLengthBucket; 4] = [
        OverLengthBucket::In97To144,
        OverLengthBucket::In145To192,
        OverLengthBucket::In193To240,
        OverLengthBucket::In241Plus,
    ];

    /// The literal label used on the BOL and in the extraction reply.
    pub fn label(self) -> &'static str {
        match self {
            OverLengthBucket::In97To144 => "97-144",
            OverLengthBucket::In145To192 => "145-192",
            OverLengthBucket::In193To240 => "193-240",
            OverLengthBucket::In241Plus => "241 or more",
        }
    }

    /// Exact label match (after trimming). Unrecognised labels yield `None`.
    pub fn parse(s: &str) -> Option<OverLengthBucket> {
        let s = s.trim();
        OverLengthBucket::ALL.iter().copied().find(|b| b.label() == s)
    }
}

/// Requested delivery time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeSpecificKind {
    /// M–F 0500–1159.
    #[serde(rename = "AM Special")]
    AmSpecial,
    /// M–F 0500–2000, two-hour window.
    #[serde(rename = "2 Hours")]
    TwoHours,
    /// M–F 0500–2000, fifteen-minute window.
    #[serde(rename = "15 Minutes")]
    FifteenMinutes,
}

impl TimeSpecificKind {
    pub const ALL: [TimeSpecificKind; 3] = [
        TimeSpecificKind::AmSpecial,
        TimeSpecificKind::TwoHours,
        TimeSpecificKind::FifteenMinutes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TimeSpecificKind::AmSpecial => "AM Special",
            TimeSpecificKind::TwoHours => "2 Hours",
            TimeSpecificKind::FifteenMinutes => "15 Minutes",
        }
    }

    pub fn parse(s: &str) -> Option<TimeSpecificKind> {
        let s = s.trim();
        TimeSpecificKind::ALL.iter().copied().find(|k| k.label() == s)
    }
}

/// A validated, well-typed shipment extracted from one BOL page.
///
/// Built only by [`crate::pipeline::normalize::normalize_record`], so every
/// field is already within its domain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedShipment {
    /// PRO number.
    pub job_id: String,
    /// Delivery zone; `None` when the reply held no valid A–L letter.
    pub zone: Option<Zone>,
    /// Pounds, ≥ 0.
    pub actual_weight: f64,
    /// Cubic feet, ≥ 0.
    pub volume: f64,
    pub liftgate: Flag,
    pub inside: Flag,
    pub residential: Flag,
    pub over_length: Option<OverLengthBucket>,
    pub pallet_count: u32,
    pub has_debris_section: bool,
    pub is_lakeshore_client: bool,
    pub time_specific: Option<TimeSpecificKind>,
    pub detention_minutes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_parse_accepts_a_through_l() {
        for (i, c) in ('A'..='L').enumerate() {
            assert_eq!(Zone::parse(&c.to_string()), Some(Zone::ALL[i]));
        }
        assert_eq!(Zone::parse(" h "), Some(Zone::H));
    }

    #[test]
    fn zone_parse_rejects_everything_else() {
        for bad in ["", "M", "Z", "AB", "1", "Zone H"] {
            assert_eq!(Zone::parse(bad), None, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn early_zones_are_a_to_d() {
        let early: Vec<Zone> = Zone::ALL.iter().copied().filter(|z| z.is_early()).collect();
        assert_eq!(early, vec![Zone::A, Zone::B, Zone::C, Zone::D]);
    }

    #[test]
    fn bucket_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&OverLengthBucket::In241Plus).unwrap();
        assert_eq!(json, "\"241 or more\"");
        assert_eq!(OverLengthBucket::parse("193-240"), Some(OverLengthBucket::In193To240));
        assert_eq!(OverLengthBucket::parse("250"), None);
    }

    #[test]
    fn time_specific_labels() {
        assert_eq!(TimeSpecificKind::parse("2 Hours"), Some(TimeSpecificKind::TwoHours));
        assert_eq!(TimeSpecificKind::parse("2 hours"), None);
        assert_eq!(TimeSpecificKind::FifteenMinutes.label(), "15 Minutes");
    }

    #[test]
    fn flag_serialises_as_yes_or_blank() {
        assert_eq!(serde_json::to_string(&Flag::Yes).unwrap(), "\"Yes\"");
        assert_eq!(serde_json::to_string(&Flag::Blank).unwrap(), "\"\"");
    }
}
