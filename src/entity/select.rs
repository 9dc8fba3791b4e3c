use serde_json::Value;
use tracing::{debug, warn};

use super::{EntityDescription, Refreshable, Writable, resolve_key};
use crate::Result;
use crate::api::Econet300Api;
use crate::mapping::{SELECT_TYPES, SelectSpec};
use crate::types::{DeviceInfo, TelemetrySnapshot, value_as_f64};

/// Option picker backed by an integer index on the device.
#[derive(Debug, Clone)]
pub struct Select {
    pub description: EntityDescription,
    write_key: String,
    options: &'static [&'static str],
    current: Option<usize>,
}

impl Select {
    pub fn options(&self) -> &'static [&'static str] {
        self.options
    }

    pub fn current_option(&self) -> Option<&'static str> {
        self.current.and_then(|i| self.options.get(i).copied())
    }
}

impl Refreshable for Select {
    fn key(&self) -> &str {
        &self.description.key
    }

    fn sync_state(&mut self, value: &Value, _snapshot: &TelemetrySnapshot) {
        self.current = value_as_f64(value)
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as usize)
            .filter(|i| *i < self.options.len());
        if self.current.is_none() {
            debug!(key = %self.description.key, %value, "value does not match any option");
        }
    }
}

impl Writable for Select {
    type Value = String;

    async fn write(&mut self, api: &Econet300Api, option: String) -> Result<bool> {
        let Some(index) = self.options.iter().position(|o| *o == option) else {
            warn!(key = %self.description.key, %option, "unknown option");
            return Ok(false);
        };
        if !api.set_parameter(Some(&self.write_key), index as i64).await? {
            warn!(key = %self.write_key, %option, "setting option failed");
            return Ok(false);
        }
        self.current = Some(index);
        Ok(true)
    }
}

pub(crate) fn select_from_spec(
    spec: &SelectSpec,
    idx: usize,
    uid: &str,
    device: DeviceInfo,
    snapshot: &TelemetrySnapshot,
) -> Option<Select> {
    let name = spec.indexed_key(idx);
    let Some(key) = resolve_key(snapshot, &name) else {
        debug!(key = %name, "availability key does not exist, entity will not be added");
        return None;
    };

    let mut description = EntityDescription::new(&key, &name, uid, device);
    description.icon = Some(spec.icon);

    let mut select = Select {
        description,
        write_key: spec.indexed_write_key(idx),
        options: spec.options,
        current: None,
    };
    select.handle_update(snapshot);
    Some(select)
}

/// Controller-level selects; per-zone selects come from the fan-out.
pub fn create_selects(snapshot: &TelemetrySnapshot, api: &Econet300Api) -> Vec<Select> {
    SELECT_TYPES
        .iter()
        .filter_map(|spec| select_from_spec(spec, 0, api.uid(), api.device_info(), snapshot))
        .collect()
}
