//! Deterministic freight pricing.
//!
//! [`rates`] holds the tariff as keyed lookup tables; [`engine`] turns a
//! [`crate::shipment::NormalizedShipment`] plus a [`RateConfig`] into a
//! [`BillingLine`]. Nothing in this module performs I/O.

pub mod engine;
pub mod rates;

pub use engine::{
    applicable_weight, base_freight, chargeable_weight, debris_removal, detention_fee,
    fuel_surcharge, inside_delivery_fee, liftgate_fee, over_length_fee, price_shipment,
    price_shipment_with_extras, residential_fee, time_specific_fee, Accessorials, BillingLine,
    Charge, QUOTE_REQUIRED,
};
pub use rates::{
    AccessorialRates, DetentionRate, InsideDeliveryRate, RateConfig, WindowFee, ZoneRates,
    DEFAULT_FUEL_SURCHARGE, WEIGHT_TIERS,
};
