use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::cache::MemCache;
use crate::client::EconetClient;
use crate::mapping::{
    DEVICE_INFO_CONTROLLER_NAME, DEVICE_INFO_ECOSTER_NAME, DEVICE_INFO_MANUFACTURER,
    DEVICE_INFO_MIXER_NAME, DEVICE_INFO_MODEL,
};
use crate::types::{Alarm, DeviceIdentity, DeviceInfo, Limits, ParamValue, TelemetrySnapshot};
use crate::{Error, Result};

pub const SYS_PARAMS_RESOURCE: &str = "sysParams";
pub const SYS_PARAMS_UID: &str = "uid";
pub const SYS_PARAMS_MODEL_ID: &str = "controllerID";
pub const SYS_PARAMS_SW_REV: &str = "softVer";
pub const SYS_PARAMS_HW_VER: &str = "routerType";
pub const SYS_PARAMS_ALARMS: &str = "alarms";

pub const REG_PARAMS_DATA_RESOURCE: &str = "regParamsData";
pub const REG_PARAMS_DATA_KEY: &str = "data";

pub const EDIT_LIMITS_RESOURCE: &str = "rmCurrentDataParamsEdits";
pub const EDIT_LIMITS_DATA_KEY: &str = "data";
/// Cache slot holding the whole edit-limits blob.
pub const EDIT_LIMITS_CACHE_KEY: &str = "rmCurrentDataParamsEdits";

/// Typed operations over [`EconetClient`].
///
/// Construction is two-phase: [`Econet300Api::new`] only wires the client and
/// cache, [`Econet300Api::initialize`] reads the device identity. Use
/// [`Econet300Api::create`] to do both.
pub struct Econet300Api {
    client: EconetClient,
    cache: Arc<MemCache>,
    identity: DeviceIdentity,
}

impl Econet300Api {
    pub fn new(client: EconetClient, cache: Arc<MemCache>) -> Self {
        debug!(host = client.host(), "api created");
        Self {
            client,
            cache,
            identity: DeviceIdentity::default(),
        }
    }

    pub async fn create(client: EconetClient, cache: Arc<MemCache>) -> Result<Self> {
        let mut api = Self::new(client, cache);
        api.initialize().await?;
        Ok(api)
    }

    /// Read `sysParams` and fill in whatever identity fields it carries.
    /// Missing fields keep their previous value.
    pub async fn initialize(&mut self) -> Result<()> {
        let Some(sys_params) = self.client.get(SYS_PARAMS_RESOURCE).await? else {
            warn!("{SYS_PARAMS_RESOURCE} unavailable, keeping placeholder device identity");
            return Ok(());
        };

        let identity = &mut self.identity;
        let fields = [
            (SYS_PARAMS_UID, &mut identity.uid),
            (SYS_PARAMS_MODEL_ID, &mut identity.model_id),
            (SYS_PARAMS_SW_REV, &mut identity.software_revision),
            (SYS_PARAMS_HW_VER, &mut identity.hardware_version),
        ];
        for (key, slot) in fields {
            match sys_params.get(key).and_then(value_to_string) {
                Some(v) => *slot = v,
                None => warn!(key, "missing from {SYS_PARAMS_RESOURCE}, keeping {slot}"),
            }
        }

        info!(
            uid = %self.identity.uid,
            model = %self.identity.model_id,
            sw = %self.identity.software_revision,
            hw = %self.identity.hardware_version,
            "device identity loaded"
        );
        Ok(())
    }

    pub fn host(&self) -> &str {
        self.client.host()
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    pub fn cache(&self) -> &MemCache {
        &self.cache
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifier: self.identity.uid.clone(),
            name: DEVICE_INFO_CONTROLLER_NAME.to_string(),
            manufacturer: DEVICE_INFO_MANUFACTURER.to_string(),
            model: DEVICE_INFO_MODEL.to_string(),
            configuration_url: self.host().to_string(),
            sw_version: Some(self.identity.software_revision.clone()),
            hw_version: Some(self.identity.hardware_version.clone()),
            via_device: None,
        }
    }

    pub fn mixer_device_info(&self, idx: usize) -> DeviceInfo {
        self.sub_device_info("mixer", DEVICE_INFO_MIXER_NAME, idx)
    }

    pub fn ecoster_device_info(&self, idx: usize) -> DeviceInfo {
        self.sub_device_info("ecoster", DEVICE_INFO_ECOSTER_NAME, idx)
    }

    /// Zone devices hang off the controller via its uid.
    fn sub_device_info(&self, kind: &str, name: &str, idx: usize) -> DeviceInfo {
        DeviceInfo {
            identifier: format!("{}-{kind}-{idx}", self.identity.uid),
            name: format!("{name}{idx}"),
            manufacturer: DEVICE_INFO_MANUFACTURER.to_string(),
            model: DEVICE_INFO_MODEL.to_string(),
            configuration_url: self.host().to_string(),
            sw_version: Some(self.identity.software_revision.clone()),
            hw_version: None,
            via_device: Some(self.identity.uid.clone()),
        }
    }

    /// Fetch the full telemetry snapshot from `regParamsData`.
    pub async fn fetch_telemetry(&self) -> Result<TelemetrySnapshot> {
        let data = self.fetch_reg_key(REG_PARAMS_DATA_RESOURCE, REG_PARAMS_DATA_KEY).await?;
        match data {
            Value::Object(map) => {
                debug!(keys = map.len(), "telemetry fetched");
                Ok(TelemetrySnapshot::new(map))
            }
            other => Err(Error::DataUnavailable(format!(
                "{REG_PARAMS_DATA_RESOURCE}.{REG_PARAMS_DATA_KEY} is not an object: {other}"
            ))),
        }
    }

    /// Alarms listed in `sysParams`; `None` when the field is absent.
    pub async fn fetch_alarms(&self) -> Result<Option<Vec<Alarm>>> {
        let sys_params = self.client.get(SYS_PARAMS_RESOURCE).await?.ok_or_else(|| {
            Error::DataUnavailable(format!("{SYS_PARAMS_RESOURCE} returned no data"))
        })?;

        let Some(alarms) = sys_params.get(SYS_PARAMS_ALARMS) else {
            warn!("alarms not found in {SYS_PARAMS_RESOURCE}");
            return Ok(None);
        };
        let alarms: Vec<Alarm> = serde_json::from_value(alarms.clone())?;
        debug!(count = alarms.len(), "alarms fetched");
        Ok(Some(alarms))
    }

    /// Edit limits for `key`. The limits resource is fetched once and cached
    /// whole; `None` when there is no key or no entry for it.
    pub async fn get_parameter_limits(&self, key: Option<&str>) -> Result<Option<Limits>> {
        let blob = self.limits_blob().await?;

        let Some(key) = key else {
            warn!("limits requested for a parameter with no mapping");
            return Ok(None);
        };
        match blob.get(key) {
            Some(entry) if entry.is_object() => Ok(Some(Limits::from_json(entry))),
            _ => {
                warn!(key, "no limits reported for parameter");
                Ok(None)
            }
        }
    }

    /// Write `value` to `key`. Returns `Ok(false)` when there is no key, when
    /// the value falls outside cached limits, or when the device does not
    /// answer `"OK"`. On success the value is mirrored into the cache.
    pub async fn set_parameter(
        &self,
        key: Option<&str>,
        value: impl Into<ParamValue>,
    ) -> Result<bool> {
        let value = value.into();
        let Some(key) = key else {
            warn!(%value, "parameter set requested but no write mapping exists");
            return Ok(false);
        };

        if let Some(limits) = self.cached_limits(key)
            && !limits.contains(value.as_f64())
        {
            warn!(key, %value, min = ?limits.min, max = ?limits.max, "value outside edit limits");
            return Ok(false);
        }

        let Some(resp) = self.client.set_param(key, &value).await? else {
            warn!(key, %value, "parameter write got no response");
            return Ok(false);
        };
        match resp.get("result").and_then(Value::as_str) {
            Some("OK") => {
                self.cache.set(key, value.to_json());
                debug!(key, %value, "parameter written");
                Ok(true)
            }
            other => {
                warn!(key, %value, result = ?other, "parameter write rejected");
                Ok(false)
            }
        }
    }

    async fn limits_blob(&self) -> Result<Map<String, Value>> {
        if let Some(Value::Object(blob)) = self.cache.get(EDIT_LIMITS_CACHE_KEY) {
            return Ok(blob);
        }
        let data = self.fetch_reg_key(EDIT_LIMITS_RESOURCE, EDIT_LIMITS_DATA_KEY).await?;
        let Value::Object(blob) = data else {
            return Err(Error::DataUnavailable(format!(
                "{EDIT_LIMITS_RESOURCE}.{EDIT_LIMITS_DATA_KEY} is not an object"
            )));
        };
        self.cache.set(EDIT_LIMITS_CACHE_KEY, Value::Object(blob.clone()));
        Ok(blob)
    }

    fn cached_limits(&self, key: &str) -> Option<Limits> {
        let blob = self.cache.get(EDIT_LIMITS_CACHE_KEY)?;
        blob.get(key).filter(|e| e.is_object()).map(Limits::from_json)
    }

    async fn fetch_reg_key(&self, resource: &str, data_key: &str) -> Result<Value> {
        let mut data = self
            .client
            .get(resource)
            .await?
            .ok_or_else(|| Error::DataUnavailable(format!("{resource} returned no data")))?;

        match data.get_mut(data_key) {
            Some(v) => Ok(v.take()),
            None => {
                debug!(%data, "unexpected payload");
                Err(Error::DataUnavailable(format!(
                    "{resource} has no `{data_key}` field"
                )))
            }
        }
    }
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
