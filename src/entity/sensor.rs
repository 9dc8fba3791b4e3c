use serde_json::Value;
use tracing::debug;

use super::{EntityDescription, Refreshable};
use crate::api::Econet300Api;
use crate::mapping::{SensorSpec, ValueProcessor, semantic_name, sensor_spec};
use crate::types::{DeviceInfo, NativeValue, TelemetrySnapshot};

#[derive(Debug, Clone)]
pub struct Sensor {
    pub description: EntityDescription,
    processor: ValueProcessor,
    native_value: Option<NativeValue>,
}

impl Sensor {
    pub fn native_value(&self) -> Option<&NativeValue> {
        self.native_value.as_ref()
    }
}

impl Refreshable for Sensor {
    fn key(&self) -> &str {
        &self.description.key
    }

    fn sync_state(&mut self, value: &Value, _snapshot: &TelemetrySnapshot) {
        self.native_value = self.processor.apply(value);
        debug!(key = %self.description.key, value = ?self.native_value, "sensor updated");
    }
}

pub(crate) fn sensor_from_spec(
    key: &str,
    name: &str,
    spec: &SensorSpec,
    uid: &str,
    device: DeviceInfo,
    snapshot: &TelemetrySnapshot,
) -> Sensor {
    let mut description = EntityDescription::new(key, name, uid, device);
    description.unit = spec.unit;
    description.precision = spec.precision;
    description.device_class = spec.device_class;
    description.state_class = spec.state_class;
    description.visible_default = spec.visible_default;

    let mut sensor = Sensor {
        description,
        processor: spec.processor,
        native_value: None,
    };
    sensor.handle_update(snapshot);
    sensor
}

/// One sensor per snapshot key that maps to a known controller parameter
/// and carries a non-null value.
pub fn create_controller_sensors(snapshot: &TelemetrySnapshot, api: &Econet300Api) -> Vec<Sensor> {
    let mut entities = Vec::new();
    for key in snapshot.keys() {
        let name = semantic_name(key);
        let Some(spec) = sensor_spec(name) else {
            debug!(key, "key is not mapped, entity will not be added");
            continue;
        };
        if !snapshot.is_present(key) {
            debug!(key, "key has no value, entity will not be added");
            continue;
        }
        debug!(key, name, "key mapped, entity will be added");
        entities.push(sensor_from_spec(key, name, spec, api.uid(), api.device_info(), snapshot));
    }
    entities
}
