use serde_json::Value;
use tracing::{debug, warn};

use super::{EntityDescription, Refreshable, Writable, resolve_key};
use crate::Result;
use crate::api::Econet300Api;
use crate::mapping::{ECOSTER_AVAILABILITY_KEY, Unit, coerce_bool};
use crate::types::{DeviceInfo, TelemetrySnapshot, value_as_f64};

pub const TEMPERATURE_STEP: f64 = 0.1;

/// ecoSTER operating modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Schedule,
    Eco,
    Comfort,
    Outside,
    Airing,
    Party,
    Holiday,
    Antifreeze,
}

impl Preset {
    pub const ALL: [Preset; 8] = [
        Preset::Schedule,
        Preset::Eco,
        Preset::Comfort,
        Preset::Outside,
        Preset::Airing,
        Preset::Party,
        Preset::Holiday,
        Preset::Antifreeze,
    ];

    /// Party is reported as 133 by some firmwares and as 5 by others.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Preset::Schedule),
            1 => Some(Preset::Eco),
            2 => Some(Preset::Comfort),
            3 => Some(Preset::Outside),
            4 => Some(Preset::Airing),
            5 | 133 => Some(Preset::Party),
            6 => Some(Preset::Holiday),
            7 => Some(Preset::Antifreeze),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Preset::Schedule => 0,
            Preset::Eco => 1,
            Preset::Comfort => 2,
            Preset::Outside => 3,
            Preset::Airing => 4,
            Preset::Party => 5,
            Preset::Holiday => 6,
            Preset::Antifreeze => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Schedule => "schedule",
            Preset::Eco => "eco",
            Preset::Comfort => "comfort",
            Preset::Outside => "outside",
            Preset::Airing => "airing",
            Preset::Party => "party",
            Preset::Holiday => "holiday",
            Preset::Antifreeze => "antifreeze",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Preset::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Prefix of the parameter holding this preset's target temperature.
    fn temperature_param(&self) -> Option<&'static str> {
        match self {
            Preset::Eco | Preset::Outside => Some("STER_TEMP_NIGHT_"),
            Preset::Comfort => Some("STER_TEMP_DAY_"),
            Preset::Party => Some("STER_TEMP_SET_PARTY_"),
            Preset::Holiday => Some("STER_TEMP_SET_SUMMER_"),
            Preset::Antifreeze => Some("STER_TEMP_ANTIFREEZ_"),
            Preset::Schedule | Preset::Airing => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacAction {
    Heating,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClimateCommand {
    Temperature(f64),
    Preset(Preset),
}

/// Room thermostat zone (ecoSTER). Heat-only.
#[derive(Debug, Clone)]
pub struct Climate {
    pub description: EntityDescription,
    idx: usize,
    preset: Option<Preset>,
    hvac_action: HvacAction,
    current_temperature: Option<f64>,
    target_temperature: Option<f64>,
    comfort_temperature: Option<f64>,
    eco_temperature: Option<f64>,
    min_temp: f64,
    max_temp: f64,
    target_temperature_name: Option<&'static str>,
}

impl Climate {
    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn preset(&self) -> Option<Preset> {
        self.preset
    }

    pub fn hvac_action(&self) -> HvacAction {
        self.hvac_action
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.current_temperature
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.target_temperature
    }

    pub fn min_temp(&self) -> f64 {
        self.min_temp
    }

    pub fn max_temp(&self) -> f64 {
        self.max_temp
    }

    /// Parameter a new target temperature is written to, e.g.
    /// `STER_TEMP_DAY_1`. `None` while the active preset is unknown.
    pub fn target_temperature_key(&self) -> Option<String> {
        self.target_temperature_name
            .map(|name| format!("{name}{}", self.idx))
    }

    pub async fn set_temperature(&mut self, api: &Econet300Api, temperature: f64) -> Result<bool> {
        self.write(api, ClimateCommand::Temperature(temperature)).await
    }

    pub async fn set_preset(&mut self, api: &Econet300Api, preset: Preset) -> Result<bool> {
        self.write(api, ClimateCommand::Preset(preset)).await
    }

    fn mode_key(&self) -> String {
        format!("STER_MODE_{}", self.idx)
    }

    fn apply_bounds(&mut self) {
        (self.min_temp, self.max_temp) = match self.preset {
            Some(Preset::Antifreeze) => (5.0, 30.0),
            _ => (10.0, 35.0),
        };
    }

    fn update_target_temperature_name(&mut self) {
        let preset = match self.preset {
            Some(Preset::Schedule) => self.schedule_preset(),
            other => other,
        };
        self.target_temperature_name = preset.and_then(|p| p.temperature_param());
    }

    /// Under the schedule the active period is inferred by matching the
    /// target against the comfort and eco temperatures.
    fn schedule_preset(&self) -> Option<Preset> {
        let target = round1(self.target_temperature?);
        let comfort = self.comfort_temperature.map(round1);
        let eco = self.eco_temperature.map(round1);
        if comfort == Some(target) && eco != Some(target) {
            Some(Preset::Comfort)
        } else if eco == Some(target) && comfort != Some(target) {
            Some(Preset::Eco)
        } else {
            None
        }
    }
}

impl Refreshable for Climate {
    fn key(&self) -> &str {
        &self.description.key
    }

    fn sync_state(&mut self, value: &Value, snapshot: &TelemetrySnapshot) {
        let i = self.idx;
        self.current_temperature = value_as_f64(value);
        self.target_temperature = snapshot.f64(&format!("ecoSterSetTemp{i}"));
        self.comfort_temperature = snapshot.f64(&format!("STER_TEMP_DAY_{i}"));
        self.eco_temperature = snapshot.f64(&format!("STER_TEMP_NIGHT_{i}"));
        self.preset = snapshot
            .f64(&format!("ecoSterMode{i}"))
            .and_then(|code| Preset::from_code(code as i64));

        let contacts = snapshot
            .get(&format!("ecoSterContacts{i}"))
            .and_then(coerce_bool)
            .unwrap_or(false);
        self.hvac_action = if contacts { HvacAction::Heating } else { HvacAction::Idle };

        self.apply_bounds();
        self.update_target_temperature_name();
        debug!(
            idx = i,
            current = ?self.current_temperature,
            target = ?self.target_temperature,
            preset = ?self.preset,
            "thermostat updated"
        );
    }
}

impl Writable for Climate {
    type Value = ClimateCommand;

    async fn write(&mut self, api: &Econet300Api, command: ClimateCommand) -> Result<bool> {
        match command {
            ClimateCommand::Temperature(temperature) => {
                let Some(key) = self.target_temperature_key() else {
                    warn!(
                        idx = self.idx,
                        "target temperature parameter unknown for current preset"
                    );
                    return Ok(false);
                };
                let temperature = round1(temperature);
                if !api.set_parameter(Some(&key), temperature).await? {
                    warn!(%key, temperature, "setting target temperature failed");
                    return Ok(false);
                }
                self.target_temperature = Some(temperature);
            }
            ClimateCommand::Preset(preset) => {
                let key = self.mode_key();
                debug!(%key, preset = preset.as_str(), "setting thermostat mode");
                if !api.set_parameter(Some(&key), preset.code()).await? {
                    warn!(%key, preset = preset.as_str(), "setting thermostat mode failed");
                    return Ok(false);
                }
                self.preset = Some(preset);
                self.apply_bounds();
                self.update_target_temperature_name();
            }
        }
        Ok(true)
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Thermostat for zone `idx` if its temperature is reported.
pub(crate) fn climate_for(
    idx: usize,
    uid: &str,
    device: DeviceInfo,
    snapshot: &TelemetrySnapshot,
) -> Option<Climate> {
    let name = format!("{ECOSTER_AVAILABILITY_KEY}{idx}");
    let key = resolve_key(snapshot, &name)?;

    let mut description = EntityDescription::new(&key, &name, uid, device);
    description.unique_id = format!("{uid}-ecoster-{idx}-thermostat");
    description.translation_key = format!("ecoster_{idx}_thermostat");
    description.unit = Some(Unit::Celsius);

    let mut climate = Climate {
        description,
        idx,
        preset: None,
        hvac_action: HvacAction::Idle,
        current_temperature: None,
        target_temperature: None,
        comfort_temperature: None,
        eco_temperature: None,
        min_temp: 10.0,
        max_temp: 35.0,
        target_temperature_name: None,
    };
    climate.handle_update(snapshot);
    Some(climate)
}
