use serde_json::Value;
use tracing::{debug, warn};

use super::{EntityDescription, Refreshable, Writable, resolve_key};
use crate::Result;
use crate::api::Econet300Api;
use crate::mapping::{NUMBER_TYPES, NumberSpec};
use crate::types::{DeviceInfo, Limits, TelemetrySnapshot, value_as_f64};

/// Editable numeric setpoint with live edit bounds.
#[derive(Debug, Clone)]
pub struct NumberEntity {
    pub description: EntityDescription,
    write_key: String,
    min: f64,
    max: f64,
    step: f64,
    native_value: Option<f64>,
}

impl NumberEntity {
    pub fn native_value(&self) -> Option<f64> {
        self.native_value
    }

    pub fn min_value(&self) -> f64 {
        self.min
    }

    pub fn max_value(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn write_key(&self) -> &str {
        &self.write_key
    }

    /// Reported bounds replace the static defaults; an open bound keeps
    /// the default.
    pub fn apply_limits(&mut self, limits: &Limits) {
        if let Some(min) = limits.min {
            self.min = min;
        }
        if let Some(max) = limits.max {
            self.max = max;
        }
    }

    /// Re-read the bounds from the api (served from its cache after the
    /// first fetch).
    pub async fn refresh_limits(&mut self, api: &Econet300Api) -> Result<()> {
        match api.get_parameter_limits(Some(&self.write_key)).await? {
            Some(limits) => self.apply_limits(&limits),
            None => warn!(key = %self.write_key, "numeric limits for this entity are missing"),
        }
        Ok(())
    }
}

impl Refreshable for NumberEntity {
    fn key(&self) -> &str {
        &self.description.key
    }

    fn sync_state(&mut self, value: &Value, _snapshot: &TelemetrySnapshot) {
        self.native_value = value_as_f64(value);
    }
}

impl Writable for NumberEntity {
    type Value = f64;

    async fn write(&mut self, api: &Econet300Api, value: f64) -> Result<bool> {
        if self.native_value == Some(value) {
            return Ok(true);
        }
        if value > self.max {
            warn!(value, max = self.max, "requested value exceeds maximum allowed value");
            return Ok(false);
        }
        if value < self.min {
            warn!(value, min = self.min, "requested value is below minimum allowed value");
            return Ok(false);
        }

        if !api.set_parameter(Some(&self.write_key), value).await? {
            warn!(key = %self.write_key, value, "setting value failed");
            return Ok(false);
        }
        self.native_value = Some(value);
        Ok(true)
    }
}

/// Build a number for `spec` when its read key is in the snapshot and the
/// device reports limits for its write key.
pub(crate) async fn number_from_spec(
    spec: &NumberSpec,
    api: &Econet300Api,
    device: DeviceInfo,
    snapshot: &TelemetrySnapshot,
) -> Result<Option<NumberEntity>> {
    let Some(key) = resolve_key(snapshot, spec.read_key) else {
        debug!(key = spec.read_key, "availability key does not exist, entity will not be added");
        return Ok(None);
    };
    let limits = match api.get_parameter_limits(Some(spec.write_key)).await {
        Ok(Some(limits)) => limits,
        Ok(None) => {
            warn!(key = spec.write_key, "cannot add number entity, numeric limits are missing");
            return Ok(None);
        }
        Err(e) if e.is_authentication() => return Err(e),
        Err(e) => {
            warn!(key = spec.write_key, error = %e, "cannot add number entity, limits unavailable");
            return Ok(None);
        }
    };

    let mut description = EntityDescription::new(&key, spec.read_key, api.uid(), device);
    description.unit = spec.unit;
    description.device_class = spec.device_class;
    description.icon = Some(spec.icon);
    if let Some(translation_key) = spec.translation_key {
        description.translation_key = translation_key.to_string();
    }

    let mut number = NumberEntity {
        description,
        write_key: spec.write_key.to_string(),
        min: spec.min,
        max: spec.max,
        step: spec.step,
        native_value: None,
    };
    number.apply_limits(&limits);
    number.handle_update(snapshot);
    Ok(Some(number))
}

pub async fn create_numbers(
    snapshot: &TelemetrySnapshot,
    api: &Econet300Api,
) -> Result<Vec<NumberEntity>> {
    let mut entities = Vec::new();
    for spec in NUMBER_TYPES {
        if let Some(number) = number_from_spec(spec, api, api.device_info(), snapshot).await? {
            entities.push(number);
        }
    }
    Ok(entities)
}
