//! Host-facing entities built from a telemetry snapshot.
//!
//! The host registers the entities it receives, pushes every new snapshot
//! through [`Refreshable::handle_update`] and routes user actions through
//! [`Writable::write`].

mod binary_sensor;
mod climate;
mod number;
mod select;
mod sensor;
mod switch;

use std::future::Future;

use serde_json::Value;
use tracing::trace;

use crate::Result;
use crate::api::Econet300Api;
use crate::mapping::{DeviceClass, StateClass, Unit, code_for};
use crate::types::{DeviceInfo, TelemetrySnapshot};

pub use binary_sensor::{BinarySensor, create_binary_sensors};
pub use climate::{Climate, ClimateCommand, HvacAction, Preset};
pub use number::{NumberEntity, create_numbers};
pub use select::{Select, create_selects};
pub use sensor::{Sensor, create_controller_sensors};
pub use switch::{Switch, create_switches};

pub(crate) use binary_sensor::binary_sensor_from_spec;
pub(crate) use climate::climate_for;
pub(crate) use number::number_from_spec;
pub(crate) use select::select_from_spec;
pub(crate) use sensor::sensor_from_spec;

/// An entity that follows the coordinator's snapshot.
pub trait Refreshable {
    /// Telemetry key driving this entity.
    fn key(&self) -> &str;

    fn sync_state(&mut self, value: &Value, snapshot: &TelemetrySnapshot);

    /// Apply a fresh snapshot. A missing or `null` value keeps the last state.
    fn handle_update(&mut self, snapshot: &TelemetrySnapshot) {
        match snapshot.get(self.key()) {
            Some(value) if !value.is_null() => self.sync_state(value, snapshot),
            _ => trace!(key = self.key(), "no value in snapshot, keeping state"),
        }
    }
}

/// An entity accepting user writes.
///
/// `Ok(false)` means the write was refused or rejected by the device; the
/// entity's state is left unchanged in that case.
pub trait Writable {
    type Value;

    fn write(
        &mut self,
        api: &Econet300Api,
        value: Self::Value,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Metadata shared by every entity domain.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescription {
    /// Raw telemetry key.
    pub key: String,
    /// Semantic parameter name.
    pub name: String,
    pub translation_key: String,
    pub unique_id: String,
    pub unit: Option<Unit>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub precision: Option<u8>,
    pub icon: Option<&'static str>,
    pub visible_default: bool,
    pub device: DeviceInfo,
}

impl EntityDescription {
    pub(crate) fn new(key: &str, name: &str, uid: &str, device: DeviceInfo) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            translation_key: camel_to_snake(name),
            unique_id: format!("{uid}-{key}"),
            unit: None,
            device_class: None,
            state_class: None,
            precision: None,
            icon: None,
            visible_default: true,
            device,
        }
    }
}

/// Raw key under which `name` is present and non-null, trying the
/// semantic name first and then its numeric code.
pub(crate) fn resolve_key(snapshot: &TelemetrySnapshot, name: &str) -> Option<String> {
    if snapshot.is_present(name) {
        return Some(name.to_string());
    }
    code_for(name)
        .filter(|code| snapshot.is_present(code))
        .map(str::to_string)
}

/// `tempCOSet` -> `temp_co_set`, `ecoSterTemp1` -> `eco_ster_temp1`.
pub fn camel_to_snake(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (next_lower && prev != '_') {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snake_case_translation_keys() {
        assert_eq!(camel_to_snake("tempCOSet"), "temp_co_set");
        assert_eq!(camel_to_snake("ecoSterTemp1"), "eco_ster_temp1");
        assert_eq!(camel_to_snake("boilerPowerKW"), "boiler_power_kw");
        assert_eq!(camel_to_snake("CTRL_WEATHER_MIX_1"), "ctrl_weather_mix_1");
        assert_eq!(camel_to_snake("TzCWU"), "tz_cwu");
    }

    #[test]
    fn keys_resolve_by_name_then_code() {
        let snap = TelemetrySnapshot::new(
            json!({"tempCO": 60, "1032": 41.5, "tempCWU": null})
                .as_object()
                .unwrap()
                .clone(),
        );
        assert_eq!(resolve_key(&snap, "tempCO").as_deref(), Some("tempCO"));
        assert_eq!(resolve_key(&snap, "mixerTemp2").as_deref(), Some("1032"));
        assert_eq!(resolve_key(&snap, "tempCWU"), None);
    }
}
