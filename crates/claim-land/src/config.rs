//! Claim settings.
//!
//! Values come from a [`SettingsProvider`] as plain strings and are parsed
//! here. Anything missing falls back to its default; anything unparsable
//! falls back too, with a warning.

use std::str::FromStr;
use std::time::Duration;

use hashbrown::{HashMap, HashSet};
use tracing::warn;

/// Named string lookups.
pub trait SettingsProvider {
    fn setting(&self, key: &str) -> Option<String>;
}

/// Settings held in memory.
#[derive(Clone, Debug, Default)]
pub struct MapSettings(HashMap<String, String>);

impl MapSettings {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl SettingsProvider for MapSettings {
    fn setting(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

pub const MIN_LAND_DISTANCE: &str = "MIN_LAND_DISTANCE";
pub const LAND_PRICE: &str = "LAND_PRICE";
pub const LAND_SELL_REFUND_COEFFICIENT: &str = "LAND_SELL_REFUND_COEFFICIENT";
pub const LAND_MIN_SIZE: &str = "LAND_MIN_SIZE";
pub const LAND_MAX_SIZE: &str = "LAND_MAX_SIZE";
pub const PUBLIC_LAND_PROTECTED_ENTITIES: &str = "PUBLIC_LAND_PROTECTED_ENTITIES";
pub const LAND_POLL_INTERVAL_MS: &str = "LAND_POLL_INTERVAL_MS";

#[derive(Clone, Debug, PartialEq)]
pub struct ClaimConfig {
    /// Horizontal gap required between a new land and existing ones.
    pub min_land_distance: i32,
    /// Price per claimed column.
    pub land_price: u64,
    /// Share of the paid amount returned on deletion.
    pub refund_coefficient: f64,
    /// Smallest allowed X or Z side of a purchased land.
    pub min_land_size: i32,
    /// Largest allowed X or Z side of any land created through [`crate::Claims`].
    pub max_land_size: i32,
    /// Entity type ids only administrators may damage on public land.
    pub protected_entities: HashSet<String>,
    /// Period of the boundary poller.
    pub poll_interval: Duration,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            min_land_distance: 0,
            land_price: 100,
            refund_coefficient: 0.9,
            min_land_size: 5,
            max_land_size: 4096,
            protected_entities: HashSet::new(),
            poll_interval: Duration::from_millis(500),
        }
    }
}

fn parse_or<T: FromStr>(settings: &dyn SettingsProvider, key: &str, default: T) -> T {
    let Some(raw) = settings.setting(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("Ignoring unparsable setting {key}={raw:?}, using default");
            default
        }
    }
}

impl ClaimConfig {
    pub fn load(settings: &dyn SettingsProvider) -> Self {
        let defaults = Self::default();

        let mut refund_coefficient =
            parse_or(settings, LAND_SELL_REFUND_COEFFICIENT, defaults.refund_coefficient);
        if !(0.0..=1.0).contains(&refund_coefficient) {
            warn!("{LAND_SELL_REFUND_COEFFICIENT}={refund_coefficient} is outside [0, 1], clamping");
            refund_coefficient = refund_coefficient.clamp(0.0, 1.0);
        }

        let protected_entities = settings
            .setting(PUBLIC_LAND_PROTECTED_ENTITIES)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|ty| !ty.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let min_land_size = parse_or(settings, LAND_MIN_SIZE, defaults.min_land_size).max(1);
        let mut max_land_size = parse_or(settings, LAND_MAX_SIZE, defaults.max_land_size);
        if max_land_size < min_land_size {
            warn!("{LAND_MAX_SIZE}={max_land_size} is below {LAND_MIN_SIZE}={min_land_size}, raising it");
            max_land_size = min_land_size;
        }

        let poll_ms = parse_or(settings, LAND_POLL_INTERVAL_MS, 500_u64).max(1);

        Self {
            min_land_distance: parse_or(settings, MIN_LAND_DISTANCE, defaults.min_land_distance).max(0),
            land_price: parse_or(settings, LAND_PRICE, defaults.land_price),
            refund_coefficient,
            min_land_size,
            max_land_size,
            protected_entities,
            poll_interval: Duration::from_millis(poll_ms),
        }
    }
}
