//! The charge calculation engine.
//!
//! Every function is pure: same `(NormalizedShipment, RateConfig)` in, same
//! [`BillingLine`] out, bit for bit. Amounts keep full `f64` precision
//! through the additive chain; rounding to cents is a presentation concern
//! handled by [`crate::output::PageData`].

use super::rates::{RateConfig, CUBIC_INCHES_PER_FOOT, DIM_DIVISOR};
use crate::shipment::{Flag, NormalizedShipment, OverLengthBucket, TimeSpecificKind, Zone};
use serde::{Serialize, Serializer};
use std::fmt;

/// Marker text for a charge that could not be priced automatically.
pub const QUOTE_REQUIRED: &str = "Quote Required";

/// A monetary amount, or the pricing-unavailable marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Charge {
    Priced(f64),
    /// The zone is not in the tariff; a human must quote this shipment.
    QuoteRequired,
}

impl Charge {
    pub fn amount(self) -> Option<f64> {
        match self {
            Charge::Priced(v) => Some(v),
            Charge::QuoteRequired => None,
        }
    }

    pub fn is_priced(self) -> bool {
        matches!(self, Charge::Priced(_))
    }

    /// Apply `f` to a priced amount; the marker passes through unchanged.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Charge {
        match self {
            Charge::Priced(v) => Charge::Priced(f(v)),
            Charge::QuoteRequired => Charge::QuoteRequired,
        }
    }
}

impl fmt::Display for Charge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charge::Priced(v) => write!(f, "{v:.2}"),
            Charge::QuoteRequired => f.write_str(QUOTE_REQUIRED),
        }
    }
}

/// Serialises as a JSON number, or the string `"Quote Required"`.
impl Serialize for Charge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Charge::Priced(v) => serializer.serialize_f64(*v),
            Charge::QuoteRequired => serializer.serialize_str(QUOTE_REQUIRED),
        }
    }
}

/// Accessorial fees. Only computed when the base freight is priced.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessorials {
    pub debris_removal: f64,
    pub liftgate: f64,
    pub inside_delivery: f64,
    pub over_length: f64,
    pub residential: f64,
    pub time_specific: f64,
    pub detention: f64,
}

impl Accessorials {
    pub fn sum(&self) -> f64 {
        self.debris_removal
            + self.liftgate
            + self.inside_delivery
            + self.over_length
            + self.residential
            + self.time_specific
            + self.detention
    }
}

/// One priced billing line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingLine {
    /// Dimensional weight from volume.
    pub chargeable_weight: f64,
    /// `max(actual, chargeable)`; drives every weight-based charge.
    pub applicable_weight: f64,
    pub base_freight: Charge,
    pub fuel_surcharge: Charge,
    /// `None` when the base freight needs a quote.
    pub accessorials: Option<Accessorials>,
    pub extras: f64,
    pub total: Charge,
}

/// Dimensional weight (lbs) for a volume in cubic feet.
pub fn chargeable_weight(volume_ft3: f64) -> f64 {
    if volume_ft3 <= 0.0 {
        return 0.0;
    }
    volume_ft3 * CUBIC_INCHES_PER_FOOT / DIM_DIVISOR
}

/// The weight every weight-based charge is computed from.
pub fn applicable_weight(actual: f64, chargeable: f64) -> f64 {
    actual.max(chargeable)
}

/// Tiered freight for a zone, clamped to the zone's min/max.
///
/// `None` (or a zone the tariff lacks) prices as [`Charge::QuoteRequired`].
pub fn base_freight(zone: Option<Zone>, weight: f64, rates: &RateConfig) -> Charge {
    let Some(zone_rates) = zone.and_then(|z| rates.zone(z)) else {
        return Charge::QuoteRequired;
    };
    let raw = zone_rates.rate_for(weight) * weight;
    Charge::Priced(raw.max(zone_rates.min).min(zone_rates.max))
}

pub fn fuel_surcharge(freight: Charge, rates: &RateConfig) -> Charge {
    freight.map(|f| f * rates.fuel_surcharge_percent)
}

/// Per-pallet debris fee, owed when the BOL has a debris section or the
/// client is Lakeshore.
pub fn debris_removal(pallets: u32, has_debris_section: bool, is_lakeshore: bool, rates: &RateConfig) -> f64 {
    if has_debris_section || is_lakeshore {
        f64::from(pallets) * rates.accessorials.debris_per_pallet
    } else {
        0.0
    }
}

pub fn liftgate_fee(flag: Flag, rates: &RateConfig) -> f64 {
    if flag.is_yes() {
        rates.accessorials.liftgate
    } else {
        0.0
    }
}

pub fn inside_delivery_fee(flag: Flag, weight: f64, rates: &RateConfig) -> f64 {
    if !flag.is_yes() {
        return 0.0;
    }
    let inside = &rates.accessorials.inside_delivery;
    (weight * inside.per_pound).max(inside.min).min(inside.max)
}

pub fn over_length_fee(bucket: Option<OverLengthBucket>, rates: &RateConfig) -> f64 {
    bucket
        .and_then(|b| rates.accessorials.over_length.get(&b).copied())
        .unwrap_or(0.0)
}

pub fn residential_fee(flag: Flag, rates: &RateConfig) -> f64 {
    if flag.is_yes() {
        rates.accessorials.residential
    } else {
        0.0
    }
}

/// Time-window fee; early zones (A–D) pay the lower price.
pub fn time_specific_fee(kind: Option<TimeSpecificKind>, zone: Zone, rates: &RateConfig) -> f64 {
    let Some(fee) = kind.and_then(|k| rates.accessorials.time_specific.get(&k)) else {
        return 0.0;
    };
    if zone.is_early() {
        fee.early_zone
    } else {
        fee.other_zone
    }
}

/// First `free_minutes` are free, the rest bill at the hourly rate prorated by minute.
pub fn detention_fee(minutes: u32, rates: &RateConfig) -> f64 {
    let detention = &rates.accessorials.detention;
    if minutes <= detention.free_minutes {
        return 0.0;
    }
    f64::from(minutes - detention.free_minutes) / 60.0 * detention.hourly
}

/// Price a shipment with no manual extras.
pub fn price_shipment(shipment: &NormalizedShipment, rates: &RateConfig) -> BillingLine {
    price_shipment_with_extras(shipment, rates, 0.0)
}

/// Price a shipment, adding `extras` to a priced total.
pub fn price_shipment_with_extras(
    shipment: &NormalizedShipment,
    rates: &RateConfig,
    extras: f64,
) -> BillingLine {
    let chargeable = chargeable_weight(shipment.volume);
    let applicable = applicable_weight(shipment.actual_weight, chargeable);
    let freight = base_freight(shipment.zone, applicable, rates);

    let (Charge::Priced(freight_amount), Some(zone)) = (freight, shipment.zone) else {
        return BillingLine {
            chargeable_weight: chargeable,
            applicable_weight: applicable,
            base_freight: Charge::QuoteRequired,
            fuel_surcharge: Charge::QuoteRequired,
            accessorials: None,
            extras,
            total: Charge::QuoteRequired,
        };
    };

    let fuel = freight_amount * rates.fuel_surcharge_percent;
    let accessorials = Accessorials {
        debris_removal: debris_removal(
            shipment.pallet_count,
            shipment.has_debris_section,
            shipment.is_lakeshore_client,
            rates,
        ),
        liftgate: liftgate_fee(shipment.liftgate, rates),
        inside_delivery: inside_delivery_fee(shipment.inside, applicable, rates),
        over_length: over_length_fee(shipment.over_length, rates),
        residential: residential_fee(shipment.residential, rates),
        time_specific: time_specific_fee(shipment.time_specific, zone, rates),
        detention: detention_fee(shipment.detention_minutes, rates),
    };
    let total = freight_amount + fuel + accessorials.sum() + extras;

    BillingLine {
        chargeable_weight: chargeable,
        applicable_weight: applicable,
        base_freight: freight,
        fuel_surcharge: Charge::Priced(fuel),
        accessorials: Some(accessorials),
        extras,
        total: Charge::Priced(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn chargeable_weight_is_dimensional() {
        assert_eq!(chargeable_weight(0.0), 0.0);
        assert!(close(chargeable_weight(115.0), 1728.0));
        assert!(close(chargeable_weight(44.44), 44.44 * 1728.0 / 115.0));
    }

    #[test]
    fn applicable_weight_takes_the_larger() {
        assert_eq!(applicable_weight(0.0, 0.0), 0.0);
        assert_eq!(applicable_weight(500.0, 200.0), 500.0);
        assert_eq!(applicable_weight(100.0, 667.7), 667.7);
    }

    #[test]
    fn freight_clamps_to_zone_minimum_and_maximum() {
        let rates = RateConfig::default();
        // 500 lb * 0.0144 = 7.20 → zone A minimum 18
        assert_eq!(base_freight(Some(Zone::A), 500.0, &rates), Charge::Priced(18.0));
        // 20000 lb * 0.0121 = 242 → zone A maximum 160
        assert_eq!(base_freight(Some(Zone::A), 20_000.0, &rates), Charge::Priced(160.0));
    }

    #[test]
    fn freight_in_band_is_rate_times_weight() {
        let rates = RateConfig::default();
        let Charge::Priced(v) = base_freight(Some(Zone::H), 2_000.0, &rates) else {
            panic!("zone H must price");
        };
        assert!(close(v, 0.0258 * 2_000.0));
    }

    #[test]
    fn missing_zone_requires_quote() {
        let rates = RateConfig::default();
        assert_eq!(base_freight(None, 1_000.0, &rates), Charge::QuoteRequired);
        assert_eq!(fuel_surcharge(Charge::QuoteRequired, &rates), Charge::QuoteRequired);
    }

    #[test]
    fn tariff_without_a_zone_fails_validation() {
        let mut rates = RateConfig::default();
        rates.zones.remove(&Zone::L);
        assert!(matches!(rates.validate(), Err(crate::error::BolError::InvalidConfig(_))));
    }

    #[test]
    fn fuel_surcharge_uses_ratio() {
        let rates = RateConfig::default();
        let fuel = fuel_surcharge(Charge::Priced(100.0), &rates).amount().unwrap();
        assert!(close(fuel, 24.0));
    }

    #[test]
    fn debris_rule() {
        let rates = RateConfig::default();
        assert_eq!(debris_removal(5, false, true, &rates), 15.0);
        assert_eq!(debris_removal(5, true, false, &rates), 15.0);
        assert_eq!(debris_removal(5, false, false, &rates), 0.0);
        assert_eq!(debris_removal(0, true, true, &rates), 0.0);
    }

    #[test]
    fn inside_delivery_clamps() {
        let rates = RateConfig::default();
        assert_eq!(inside_delivery_fee(Flag::Yes, 0.0, &rates), 10.0);
        assert_eq!(inside_delivery_fee(Flag::Yes, 1e12, &rates), 80.0);
        assert!(close(inside_delivery_fee(Flag::Yes, 5_000.0, &rates), 20.0));
        assert_eq!(inside_delivery_fee(Flag::Blank, 5_000.0, &rates), 0.0);
    }

    #[test]
    fn over_length_table() {
        let rates = RateConfig::default();
        assert_eq!(over_length_fee(Some(OverLengthBucket::In97To144), &rates), 12.0);
        assert_eq!(over_length_fee(Some(OverLengthBucket::In145To192), &rates), 18.0);
        assert_eq!(over_length_fee(Some(OverLengthBucket::In193To240), &rates), 24.0);
        assert_eq!(over_length_fee(Some(OverLengthBucket::In241Plus), &rates), 30.0);
        assert_eq!(over_length_fee(None, &rates), 0.0);
    }

    #[test]
    fn time_specific_early_vs_other() {
        let rates = RateConfig::default();
        let am = Some(TimeSpecificKind::AmSpecial);
        assert_eq!(time_specific_fee(am, Zone::A, &rates), 28.0);
        assert_eq!(time_specific_fee(am, Zone::H, &rates), 38.0);
        assert_eq!(time_specific_fee(Some(TimeSpecificKind::TwoHours), Zone::D, &rates), 38.0);
        assert_eq!(time_specific_fee(Some(TimeSpecificKind::TwoHours), Zone::E, &rates), 48.0);
        assert_eq!(time_specific_fee(Some(TimeSpecificKind::FifteenMinutes), Zone::B, &rates), 53.0);
        assert_eq!(time_specific_fee(Some(TimeSpecificKind::FifteenMinutes), Zone::L, &rates), 63.0);
        assert_eq!(time_specific_fee(None, Zone::A, &rates), 0.0);
    }

    #[test]
    fn detention_first_half_hour_free() {
        let rates = RateConfig::default();
        for m in 0..=30 {
            assert_eq!(detention_fee(m, &rates), 0.0, "minute {m}");
        }
        assert_eq!(detention_fee(45, &rates), 9.0);
        assert_eq!(detention_fee(90, &rates), 36.0);
    }

    #[test]
    fn flat_fees() {
        let rates = RateConfig::default();
        assert_eq!(liftgate_fee(Flag::Yes, &rates), 20.0);
        assert_eq!(liftgate_fee(Flag::Blank, &rates), 0.0);
        assert_eq!(residential_fee(Flag::Yes, &rates), 15.0);
        assert_eq!(residential_fee(Flag::Blank, &rates), 0.0);
    }

    #[test]
    fn charge_display_and_json() {
        assert_eq!(Charge::Priced(12.346).to_string(), "12.35");
        assert_eq!(Charge::QuoteRequired.to_string(), "Quote Required");
        assert_eq!(serde_json::to_string(&Charge::QuoteRequired).unwrap(), "\"Quote Required\"");
        assert_eq!(serde_json::to_string(&Charge::Priced(1.5)).unwrap(), "1.5");
    }
}
