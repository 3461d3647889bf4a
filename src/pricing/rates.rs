//! Tariff data: zone rate table and fixed accessorial fee tables.
//!
//! Everything here is plain data. The engine in [`super::engine`] looks
//! values up by key and never branches on literal prices, so a new tariff
//! is a new [`RateConfig`] (or a JSON file) rather than a code change.

use crate::error::BolError;
use crate::shipment::{OverLengthBucket, TimeSpecificKind, Zone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default fuel surcharge ratio (24 %).
pub const DEFAULT_FUEL_SURCHARGE: f64 = 0.24;

/// Dimensional-weight conversion: cubic inches per cubic foot.
pub const CUBIC_INCHES_PER_FOOT: f64 = 1728.0;

/// Dimensional-weight conversion: density divisor (cubic inches per pound).
pub const DIM_DIVISOR: f64 = 115.0;

/// Lower bound (lbs) of each weight tier, heaviest first.
///
/// The last tier also covers shipments below its threshold; there is no
/// dedicated sub-1000 lb rate.
pub const WEIGHT_TIERS: [f64; 4] = [10_000.0, 5_000.0, 2_000.0, 1_000.0];

/// Per-zone freight rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRates {
    /// $/lb for each entry of [`WEIGHT_TIERS`], in the same order.
    pub per_pound: [f64; 4],
    /// Minimum freight charge.
    pub min: f64,
    /// Maximum freight charge.
    pub max: f64,
}

impl ZoneRates {
    pub const fn new(per_pound: [f64; 4], min: f64, max: f64) -> Self {
        Self { per_pound, min, max }
    }

    /// Rate for the given applicable weight: first tier whose threshold the
    /// weight reaches, falling back to the lightest tier.
    pub fn rate_for(&self, weight: f64) -> f64 {
        WEIGHT_TIERS
            .iter()
            .position(|&threshold| weight >= threshold)
            .map(|i| self.per_pound[i])
            .unwrap_or(self.per_pound[WEIGHT_TIERS.len() - 1])
    }
}

/// Early-zone vs other-zone price for a time-specific delivery window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowFee {
    pub early_zone: f64,
    pub other_zone: f64,
}

/// Inside-delivery pricing: per-pound rate clamped to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsideDeliveryRate {
    pub per_pound: f64,
    pub min: f64,
    pub max: f64,
}

/// Detention pricing: free allowance, then an hourly rate prorated by minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetentionRate {
    pub free_minutes: u32,
    pub hourly: f64,
}

/// Fixed accessorial fee tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorialRates {
    /// Per pallet, charged when the BOL has a debris section or the client is Lakeshore.
    pub debris_per_pallet: f64,
    pub liftgate: f64,
    pub residential: f64,
    pub inside_delivery: InsideDeliveryRate,
    pub over_length: BTreeMap<OverLengthBucket, f64>,
    pub time_specific: BTreeMap<TimeSpecificKind, WindowFee>,
    pub detention: DetentionRate,
}

impl Default for AccessorialRates {
    fn default() -> Self {
        Self {
            debris_per_pallet: 3.0,
            liftgate: 20.0,
            residential: 15.0,
            inside_delivery: InsideDeliveryRate {
                per_pound: 0.004,
                min: 10.0,
                max: 80.0,
            },
            over_length: BTreeMap::from([
                (OverLengthBucket::In97To144, 12.0),
                (OverLengthBucket::In145To192, 18.0),
                (OverLengthBucket::In193To240, 24.0),
                (OverLengthBucket::In241Plus, 30.0),
            ]),
            time_specific: BTreeMap::from([
                (
                    TimeSpecificKind::AmSpecial,
                    WindowFee { early_zone: 28.0, other_zone: 38.0 },
                ),
                (
                    TimeSpecificKind::TwoHours,
                    WindowFee { early_zone: 38.0, other_zone: 48.0 },
                ),
                (
                    TimeSpecificKind::FifteenMinutes,
                    WindowFee { early_zone: 53.0, other_zone: 63.0 },
                ),
            ]),
            detention: DetentionRate {
                free_minutes: 30,
                hourly: 36.0,
            },
        }
    }
}

/// The full tariff used to price a batch.
///
/// Snapshotted (behind an `Arc`) at batch start; edits made afterwards only
/// affect later batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateConfig {
    /// Fuel surcharge as a ratio of base freight (0.24 = 24 %).
    pub fuel_surcharge_percent: f64,
    pub zones: BTreeMap<Zone, ZoneRates>,
    #[serde(default)]
    pub accessorials: AccessorialRates,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            fuel_surcharge_percent: DEFAULT_FUEL_SURCHARGE,
            zones: default_zone_table(),
            accessorials: AccessorialRates::default(),
        }
    }
}

impl RateConfig {
    /// Rates for a zone, if the tariff covers it.
    pub fn zone(&self, zone: Zone) -> Option<&ZoneRates> {
        self.zones.get(&zone)
    }

    /// Copy of this tariff with a different fuel surcharge ratio.
    pub fn with_fuel_surcharge(mut self, ratio: f64) -> Self {
        self.fuel_surcharge_percent = ratio;
        self
    }

    /// Check the tariff covers every zone A-L and is internally consistent.
    pub fn validate(&self) -> Result<(), BolError> {
        if !self.fuel_surcharge_percent.is_finite() || self.fuel_surcharge_percent < 0.0 {
            return Err(BolError::InvalidConfig(format!(
                "fuel surcharge must be a non-negative ratio, got {}",
                self.fuel_surcharge_percent
            )));
        }
        let missing: Vec<String> = Zone::ALL
            .iter()
            .filter(|z| !self.zones.contains_key(*z))
            .map(|z| z.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(BolError::InvalidConfig(format!(
                "zone table must cover A-L; missing {}",
                missing.join(", ")
            )));
        }
        for (zone, rates) in &self.zones {
            if rates.min > rates.max {
                return Err(BolError::InvalidConfig(format!(
                    "zone {zone}: minimum {} exceeds maximum {}",
                    rates.min, rates.max
                )));
            }
            if rates.per_pound.iter().any(|r| !r.is_finite() || *r < 0.0) {
                return Err(BolError::InvalidConfig(format!(
                    "zone {zone}: per-pound rates must be non-negative"
                )));
            }
        }
        let inside = &self.accessorials.inside_delivery;
        if inside.min > inside.max {
            return Err(BolError::InvalidConfig(format!(
                "inside delivery minimum {} exceeds maximum {}",
                inside.min, inside.max
            )));
        }
        Ok(())
    }

    /// Load a tariff from a JSON file, validating it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BolError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| BolError::RateTable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let config: RateConfig = serde_json::from_str(&text).map_err(|e| BolError::RateTable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// The published zone tariff.
fn default_zone_table() -> BTreeMap<Zone, ZoneRates> {
    BTreeMap::from([
        (Zone::A, ZoneRates::new([0.0121, 0.0129, 0.0137, 0.0144], 18.0, 160.0)),
        (Zone::B, ZoneRates::new([0.0132, 0.0140, 0.0147, 0.0157], 20.0, 180.0)),
        (Zone::C, ZoneRates::new([0.0143, 0.0150, 0.0160, 0.0169], 22.0, 200.0)),
        (Zone::D, ZoneRates::new([0.0154, 0.0163, 0.0173, 0.0183], 24.0, 220.0)),
        (Zone::E, ZoneRates::new([0.0183, 0.0195, 0.0204, 0.0218], 26.0, 240.0)),
        (Zone::F, ZoneRates::new([0.0198, 0.0209, 0.0221, 0.0235], 28.0, 260.0)),
        (Zone::G, ZoneRates::new([0.0213, 0.0226, 0.0239, 0.0253], 31.0, 290.0)),
        (Zone::H, ZoneRates::new([0.0230, 0.0243, 0.0258, 0.0273], 34.0, 320.0)),
        (Zone::I, ZoneRates::new([0.0249, 0.0262, 0.0279, 0.0295], 37.0, 350.0)),
        (Zone::J, ZoneRates::new([0.0267, 0.0284, 0.0301, 0.0319], 40.0, 380.0)),
        (Zone::K, ZoneRates::new([0.0289, 0.0307, 0.0325, 0.0344], 43.0, 400.0)),
        (Zone::L, ZoneRates::new([0.0313, 0.0332, 0.0352, 0.0371], 46.0, 420.0)),
    ])
}
