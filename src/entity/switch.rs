use serde_json::Value;
use tracing::{debug, warn};

use super::{EntityDescription, Refreshable, Writable, resolve_key};
use crate::Result;
use crate::api::Econet300Api;
use crate::mapping::{SWITCH_TYPES, coerce_bool};
use crate::types::TelemetrySnapshot;

/// Boiler on/off. Any non-zero operation mode reads as on.
#[derive(Debug, Clone)]
pub struct Switch {
    pub description: EntityDescription,
    write_key: String,
    icon_off: Option<&'static str>,
    is_on: Option<bool>,
}

impl Switch {
    pub fn is_on(&self) -> Option<bool> {
        self.is_on
    }

    pub fn icon(&self) -> Option<&'static str> {
        match (self.icon_off, self.is_on) {
            (Some(off), Some(false)) => Some(off),
            _ => self.description.icon,
        }
    }

    pub async fn turn_on(&mut self, api: &Econet300Api) -> Result<bool> {
        self.write(api, true).await
    }

    pub async fn turn_off(&mut self, api: &Econet300Api) -> Result<bool> {
        self.write(api, false).await
    }
}

impl Refreshable for Switch {
    fn key(&self) -> &str {
        &self.description.key
    }

    fn sync_state(&mut self, value: &Value, _snapshot: &TelemetrySnapshot) {
        self.is_on = coerce_bool(value);
    }
}

impl Writable for Switch {
    type Value = bool;

    async fn write(&mut self, api: &Econet300Api, on: bool) -> Result<bool> {
        if !api.set_parameter(Some(&self.write_key), on).await? {
            warn!(key = %self.write_key, on, "switching the boiler failed");
            return Ok(false);
        }
        self.is_on = Some(on);
        Ok(true)
    }
}

pub fn create_switches(snapshot: &TelemetrySnapshot, api: &Econet300Api) -> Vec<Switch> {
    let mut entities = Vec::new();
    for spec in SWITCH_TYPES {
        let Some(key) = resolve_key(snapshot, spec.key) else {
            debug!(key = spec.key, "availability key does not exist, entity will not be added");
            continue;
        };
        let mut description = EntityDescription::new(&key, spec.key, api.uid(), api.device_info());
        description.translation_key = spec.translation_key.to_string();
        description.icon = Some(spec.icon);

        let mut switch = Switch {
            description,
            write_key: spec.write_key.to_string(),
            icon_off: spec.icon_off,
            is_on: None,
        };
        switch.handle_update(snapshot);
        entities.push(switch);
    }
    entities
}
