use serde_json::Value;
use tracing::debug;

use super::{EntityDescription, Refreshable, resolve_key};
use crate::api::Econet300Api;
use crate::mapping::{BINARY_SENSOR_TYPES, BinarySensorSpec, coerce_bool};
use crate::types::{DeviceInfo, TelemetrySnapshot};

#[derive(Debug, Clone)]
pub struct BinarySensor {
    pub description: EntityDescription,
    icon_off: Option<&'static str>,
    is_on: Option<bool>,
}

impl BinarySensor {
    pub fn is_on(&self) -> Option<bool> {
        self.is_on
    }

    pub fn icon(&self) -> Option<&'static str> {
        match (self.icon_off, self.is_on) {
            (Some(off), Some(false)) => Some(off),
            _ => self.description.icon,
        }
    }
}

impl Refreshable for BinarySensor {
    fn key(&self) -> &str {
        &self.description.key
    }

    fn sync_state(&mut self, value: &Value, _snapshot: &TelemetrySnapshot) {
        self.is_on = coerce_bool(value);
    }
}

/// Binary sensors are admitted unless the value is exactly `false`.
fn can_add(snapshot: &TelemetrySnapshot, key: &str) -> bool {
    snapshot
        .get(key)
        .is_some_and(|v| !v.is_null() && *v != Value::Bool(false))
}

pub(crate) fn binary_sensor_from_spec(
    name: &str,
    spec: &BinarySensorSpec,
    uid: &str,
    device: DeviceInfo,
    snapshot: &TelemetrySnapshot,
) -> Option<BinarySensor> {
    let key = resolve_key(snapshot, name)?;
    if !can_add(snapshot, &key) {
        debug!(%key, "availability key is false, entity will not be added");
        return None;
    }

    let mut description = EntityDescription::new(&key, name, uid, device);
    description.icon = Some(spec.icon);
    description.device_class = spec.device_class;

    let mut sensor = BinarySensor {
        description,
        icon_off: spec.icon_off,
        is_on: None,
    };
    sensor.handle_update(snapshot);
    Some(sensor)
}

pub fn create_binary_sensors(
    snapshot: &TelemetrySnapshot,
    api: &Econet300Api,
) -> Vec<BinarySensor> {
    BINARY_SENSOR_TYPES
        .iter()
        .filter_map(|spec| {
            let sensor =
                binary_sensor_from_spec(spec.name, spec, api.uid(), api.device_info(), snapshot);
            if sensor.is_none() {
                debug!(name = spec.name, "availability key missing, entity will not be added");
            }
            sensor
        })
        .collect()
}
