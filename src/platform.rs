//! Entity fan-out: controller-level entities plus one bundle per mixer
//! circuit and per ecoSTER thermostat found in the first snapshot.

use tracing::{debug, info, warn};

use crate::Result;
use crate::api::Econet300Api;
use crate::config::Config;
use crate::entity::{
    BinarySensor, Climate, NumberEntity, Refreshable, Select, Sensor, Switch,
    binary_sensor_from_spec, climate_for, create_binary_sensors, create_controller_sensors,
    create_numbers, create_selects, create_switches, number_from_spec, resolve_key,
    select_from_spec, sensor_from_spec,
};
use crate::mapping::{
    ECOSTER_AVAILABILITY_KEY, ECOSTER_SELECT_TYPES, ECOSTER_SENSOR_TYPES, MIXER_AVAILABILITY_KEY,
    MIXER_BINARY_SENSOR_TYPES, MIXER_NUMBER_TYPES, MIXER_SELECT_TYPES, MIXER_SENSOR_TYPES,
    SensorSpec,
};
use crate::types::{DeviceInfo, TelemetrySnapshot};

/// Entities of one mixer circuit, grouped under their own device.
#[derive(Debug, Clone)]
pub struct MixerBundle {
    pub idx: usize,
    pub device: DeviceInfo,
    pub sensors: Vec<Sensor>,
    pub binary_sensors: Vec<BinarySensor>,
    pub numbers: Vec<NumberEntity>,
    pub selects: Vec<Select>,
}

/// Entities of one ecoSTER room thermostat.
#[derive(Debug, Clone)]
pub struct EcosterBundle {
    pub idx: usize,
    pub device: DeviceInfo,
    pub climate: Climate,
    pub sensors: Vec<Sensor>,
    pub selects: Vec<Select>,
}

/// Indices `1..=count` whose `{prefix}{i}` key carries a value.
pub fn probe_indices(snapshot: &TelemetrySnapshot, prefix: &str, count: usize) -> Vec<usize> {
    (1..=count)
        .filter(|i| {
            let name = format!("{prefix}{i}");
            let found = resolve_key(snapshot, &name).is_some();
            if !found {
                debug!(key = %name, "availability key missing, zone skipped");
            }
            found
        })
        .collect()
}

pub fn mixer_indices(snapshot: &TelemetrySnapshot, count: usize) -> Vec<usize> {
    probe_indices(snapshot, MIXER_AVAILABILITY_KEY, count)
}

pub fn ecoster_indices(snapshot: &TelemetrySnapshot, count: usize) -> Vec<usize> {
    probe_indices(snapshot, ECOSTER_AVAILABILITY_KEY, count)
}

fn indexed_sensors(
    specs: &[SensorSpec],
    idx: usize,
    uid: &str,
    device: &DeviceInfo,
    snapshot: &TelemetrySnapshot,
) -> Vec<Sensor> {
    specs
        .iter()
        .filter_map(|spec| {
            let name = format!("{}{idx}", spec.name);
            let key = resolve_key(snapshot, &name)?;
            Some(sensor_from_spec(&key, &name, spec, uid, device.clone(), snapshot))
        })
        .collect()
}

pub async fn create_mixers(
    snapshot: &TelemetrySnapshot,
    api: &Econet300Api,
    count: usize,
) -> Result<Vec<MixerBundle>> {
    let uid = api.uid();
    let mut bundles = Vec::new();
    for idx in mixer_indices(snapshot, count) {
        let device = api.mixer_device_info(idx);

        let sensors = indexed_sensors(MIXER_SENSOR_TYPES, idx, uid, &device, snapshot);
        let binary_sensors = MIXER_BINARY_SENSOR_TYPES
            .iter()
            .filter_map(|spec| {
                let name = format!("{}{idx}", spec.name);
                binary_sensor_from_spec(&name, spec, uid, device.clone(), snapshot)
            })
            .collect();

        let read_key = format!("mixerSetTemp{idx}");
        let mut numbers = Vec::new();
        for spec in MIXER_NUMBER_TYPES.iter().filter(|s| s.read_key == read_key) {
            if let Some(number) = number_from_spec(spec, api, device.clone(), snapshot).await? {
                numbers.push(number);
            }
        }

        let selects = MIXER_SELECT_TYPES
            .iter()
            .filter_map(|spec| select_from_spec(spec, idx, uid, device.clone(), snapshot))
            .collect();

        bundles.push(MixerBundle {
            idx,
            device,
            sensors,
            binary_sensors,
            numbers,
            selects,
        });
    }
    Ok(bundles)
}

pub fn create_ecosters(
    snapshot: &TelemetrySnapshot,
    api: &Econet300Api,
    count: usize,
) -> Vec<EcosterBundle> {
    let uid = api.uid();
    ecoster_indices(snapshot, count)
        .into_iter()
        .filter_map(|idx| {
            let device = api.ecoster_device_info(idx);
            let climate = climate_for(idx, uid, device.clone(), snapshot)?;
            let sensors = indexed_sensors(ECOSTER_SENSOR_TYPES, idx, uid, &device, snapshot);
            let selects = ECOSTER_SELECT_TYPES
                .iter()
                .filter_map(|spec| select_from_spec(spec, idx, uid, device.clone(), snapshot))
                .collect();
            Some(EcosterBundle {
                idx,
                device,
                climate,
                sensors,
                selects,
            })
        })
        .collect()
}

/// Every entity the integration exposes for one controller.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    pub sensors: Vec<Sensor>,
    pub binary_sensors: Vec<BinarySensor>,
    pub numbers: Vec<NumberEntity>,
    pub switches: Vec<Switch>,
    pub selects: Vec<Select>,
    pub mixers: Vec<MixerBundle>,
    pub ecosters: Vec<EcosterBundle>,
}

impl Entities {
    /// Build all entities from the first snapshot. Entities are only
    /// created for keys present at this point; later snapshots update them.
    pub async fn create(
        snapshot: &TelemetrySnapshot,
        api: &Econet300Api,
        config: &Config,
    ) -> Result<Self> {
        if snapshot.is_empty() {
            warn!("first snapshot is empty, no entities will be created");
        }

        let entities = Self {
            sensors: create_controller_sensors(snapshot, api),
            binary_sensors: create_binary_sensors(snapshot, api),
            numbers: create_numbers(snapshot, api).await?,
            switches: create_switches(snapshot, api),
            selects: create_selects(snapshot, api),
            mixers: create_mixers(snapshot, api, config.mixers).await?,
            ecosters: create_ecosters(snapshot, api, config.ecosters),
        };
        info!(
            sensors = entities.sensors.len(),
            binary_sensors = entities.binary_sensors.len(),
            numbers = entities.numbers.len(),
            switches = entities.switches.len(),
            selects = entities.selects.len(),
            mixers = entities.mixers.len(),
            ecosters = entities.ecosters.len(),
            "entities created"
        );
        Ok(entities)
    }

    pub fn len(&self) -> usize {
        let mixers: usize = self
            .mixers
            .iter()
            .map(|m| m.sensors.len() + m.binary_sensors.len() + m.numbers.len() + m.selects.len())
            .sum();
        let ecosters: usize = self
            .ecosters
            .iter()
            .map(|e| 1 + e.sensors.len() + e.selects.len())
            .sum();
        self.sensors.len()
            + self.binary_sensors.len()
            + self.numbers.len()
            + self.switches.len()
            + self.selects.len()
            + mixers
            + ecosters
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a new snapshot into every entity.
    pub fn refresh(&mut self, snapshot: &TelemetrySnapshot) {
        refresh_all(&mut self.sensors, snapshot);
        refresh_all(&mut self.binary_sensors, snapshot);
        refresh_all(&mut self.numbers, snapshot);
        refresh_all(&mut self.switches, snapshot);
        refresh_all(&mut self.selects, snapshot);
        for mixer in &mut self.mixers {
            refresh_all(&mut mixer.sensors, snapshot);
            refresh_all(&mut mixer.binary_sensors, snapshot);
            refresh_all(&mut mixer.numbers, snapshot);
            refresh_all(&mut mixer.selects, snapshot);
        }
        for ecoster in &mut self.ecosters {
            ecoster.climate.handle_update(snapshot);
            refresh_all(&mut ecoster.sensors, snapshot);
            refresh_all(&mut ecoster.selects, snapshot);
        }
    }
}

fn refresh_all<E: Refreshable>(entities: &mut [E], snapshot: &TelemetrySnapshot) {
    for entity in entities {
        entity.handle_update(snapshot);
    }
}
