//! Static tables translating raw controller parameters into entity metadata.
//!
//! Telemetry keys come either as numeric codes (`"1024"`) or as semantic
//! names (`"tempCO"`). Codes are resolved through [`REG_PARAM_MAP`]; every
//! per-domain table is keyed by semantic name.

use serde_json::Value;

use crate::types::{NativeValue, value_as_f64};

pub const DEVICE_INFO_MANUFACTURER: &str = "PLUM";
pub const DEVICE_INFO_MODEL: &str = "ecoNET300";
pub const DEVICE_INFO_CONTROLLER_NAME: &str = "PLUM ecoNET300";
pub const DEVICE_INFO_MIXER_NAME: &str = "Mixer";
pub const DEVICE_INFO_ECOSTER_NAME: &str = "ecoSTER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Celsius,
    Percent,
    Kilowatt,
    KilowattHour,
    KilogramsPerHour,
    KilowattHourPerKilogram,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Celsius => "\u{00b0}C",
            Unit::Percent => "%",
            Unit::Kilowatt => "kW",
            Unit::KilowattHour => "kWh",
            Unit::KilogramsPerHour => "kg/h",
            Unit::KilowattHourPerKilogram => "kWh/kg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Temperature,
    Power,
    PowerFactor,
    Energy,
    Running,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// Pure post-processing applied to a raw telemetry value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueProcessor {
    #[default]
    Identity,
    /// Boiler operation code to label, see [`OPERATION_MODE_NAMES`].
    OperationMode,
    /// `true`/`false`, `"true"`/`"false"` or non-zero numbers.
    Boolean,
    DivideByTen,
    Round(u32),
}

impl ValueProcessor {
    pub fn apply(&self, raw: &Value) -> Option<NativeValue> {
        match self {
            ValueProcessor::Identity => NativeValue::from_json(raw),
            ValueProcessor::OperationMode => {
                let code = value_as_f64(raw)? as i64;
                operation_mode_name(code).map(|name| NativeValue::Text(name.to_string()))
            }
            ValueProcessor::Boolean => coerce_bool(raw).map(NativeValue::Bool),
            ValueProcessor::DivideByTen => value_as_f64(raw).map(|v| NativeValue::Number(v / 10.0)),
            ValueProcessor::Round(digits) => {
                let factor = 10f64.powi(*digits as i32);
                value_as_f64(raw).map(|v| NativeValue::Number((v * factor).round() / factor))
            }
        }
    }
}

pub fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Some(true),
            "false" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub const OPERATION_MODE_NAMES: &[(i64, &str)] = &[
    (0, "turned_off"),
    (1, "fire_up"),
    (2, "fire_up"),
    (3, "work"),
    (4, "supervision"),
    (5, "halted"),
    (6, "stop"),
    (7, "burning_off"),
    (8, "manual"),
    (9, "alarm"),
    (10, "unsealing"),
    (11, "chimney"),
    (12, "stabilization"),
    (13, "no_transmission"),
];

pub fn operation_mode_name(code: i64) -> Option<&'static str> {
    OPERATION_MODE_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Numeric `regParamsData` codes and the semantic names they stand for.
pub const REG_PARAM_MAP: &[(&str, &str)] = &[
    ("26", "tempFeeder"),
    ("28", "tempExternalSensor"),
    ("1024", "tempCO"),
    ("1025", "tempCWU"),
    ("1028", "tempUpperBuffer"),
    ("1029", "tempLowerBuffer"),
    ("1030", "tempFlueGas"),
    ("1031", "mixerTemp1"),
    ("1032", "mixerTemp2"),
    ("1033", "mixerTemp3"),
    ("1034", "mixerTemp4"),
    ("1280", "tempCOSet"),
    ("1281", "tempCWUSet"),
    ("1287", "mixerSetTemp1"),
    ("1288", "mixerSetTemp2"),
    ("1289", "mixerSetTemp3"),
    ("1290", "mixerSetTemp4"),
    ("1536", "fanPower"),
    ("1537", "fuelLevel"),
    ("1541", "pumpCOWorks"),
    ("1542", "pumpCWUWorks"),
    ("1544", "mixerPumpWorks1"),
    ("1545", "mixerPumpWorks2"),
    ("1546", "mixerPumpWorks3"),
    ("1547", "mixerPumpWorks4"),
    ("1792", "mode"),
    ("1794", "boilerPower"),
    ("1795", "boilerPowerKW"),
    ("1798", "fuelStream"),
];

/// Resolve a raw key to its semantic name; unknown keys are their own name.
pub fn semantic_name(key: &str) -> &str {
    REG_PARAM_MAP
        .iter()
        .find(|(code, _)| *code == key)
        .map(|(_, name)| *name)
        .unwrap_or(key)
}

/// Numeric code the controller may report `name` under.
pub fn code_for(name: &str) -> Option<&'static str> {
    REG_PARAM_MAP
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(code, _)| *code)
}

#[derive(Debug, Clone, Copy)]
pub struct SensorSpec {
    pub name: &'static str,
    pub unit: Option<Unit>,
    pub precision: Option<u8>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub processor: ValueProcessor,
    pub visible_default: bool,
}

const fn temperature(name: &'static str) -> SensorSpec {
    SensorSpec {
        name,
        unit: Some(Unit::Celsius),
        precision: Some(1),
        device_class: Some(DeviceClass::Temperature),
        state_class: Some(StateClass::Measurement),
        processor: ValueProcessor::Identity,
        visible_default: true,
    }
}

const fn percent(name: &'static str) -> SensorSpec {
    SensorSpec {
        name,
        unit: Some(Unit::Percent),
        precision: Some(0),
        device_class: Some(DeviceClass::PowerFactor),
        state_class: Some(StateClass::Measurement),
        processor: ValueProcessor::Identity,
        visible_default: true,
    }
}

pub const SENSOR_TYPES: &[SensorSpec] = &[
    temperature("tempCO"),
    temperature("tempCOSet"),
    temperature("tempCWU"),
    temperature("tempCWUSet"),
    temperature("tempFeeder"),
    temperature("tempFlueGas"),
    temperature("tempExternalSensor"),
    temperature("tempBack"),
    temperature("tempUpperBuffer"),
    temperature("tempLowerBuffer"),
    temperature("tempUpperSolar"),
    temperature("tempLowerSolar"),
    temperature("tempFireplace"),
    temperature("tempExchanger"),
    temperature("tempAirIn"),
    temperature("tempAirOut"),
    temperature("TzCWU"),
    SensorSpec {
        processor: ValueProcessor::Round(1),
        ..temperature("thermoTemp")
    },
    SensorSpec {
        precision: Some(0),
        ..temperature("thermoSetTemp")
    },
    percent("fanPower"),
    percent("fanPowerExhaust"),
    percent("fuelLevel"),
    percent("tempOpticalSensor"),
    percent("blowFan1BlowPower"),
    percent("blowFan2BlowPower"),
    percent("boilerPower"),
    SensorSpec {
        processor: ValueProcessor::DivideByTen,
        precision: Some(1),
        ..percent("lambdaLevel")
    },
    SensorSpec {
        processor: ValueProcessor::DivideByTen,
        precision: Some(1),
        ..percent("lambdaSet")
    },
    SensorSpec {
        name: "boilerPowerKW",
        unit: Some(Unit::Kilowatt),
        precision: Some(1),
        device_class: Some(DeviceClass::Power),
        state_class: Some(StateClass::Measurement),
        processor: ValueProcessor::Round(1),
        visible_default: true,
    },
    SensorSpec {
        name: "fuelStream",
        unit: Some(Unit::KilogramsPerHour),
        precision: Some(1),
        device_class: None,
        state_class: Some(StateClass::Measurement),
        processor: ValueProcessor::Round(1),
        visible_default: true,
    },
    SensorSpec {
        name: "totalGain",
        unit: Some(Unit::KilowattHour),
        precision: Some(0),
        device_class: Some(DeviceClass::Energy),
        state_class: Some(StateClass::TotalIncreasing),
        processor: ValueProcessor::Identity,
        visible_default: false,
    },
    SensorSpec {
        name: "mode",
        unit: None,
        precision: None,
        device_class: Some(DeviceClass::Enum),
        state_class: None,
        processor: ValueProcessor::OperationMode,
        visible_default: true,
    },
];

/// Sensors generated per mixer circuit; the index is appended to the name.
pub const MIXER_SENSOR_TYPES: &[SensorSpec] =
    &[temperature("mixerTemp"), temperature("mixerSetTemp")];

/// Sensors generated per ecoSTER thermostat.
pub const ECOSTER_SENSOR_TYPES: &[SensorSpec] =
    &[temperature("ecoSterTemp"), temperature("ecoSterSetTemp")];

pub fn sensor_spec(name: &str) -> Option<&'static SensorSpec> {
    SENSOR_TYPES.iter().find(|s| s.name == name)
}

#[derive(Debug, Clone, Copy)]
pub struct BinarySensorSpec {
    pub name: &'static str,
    pub icon: &'static str,
    pub icon_off: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
}

const fn pump(name: &'static str) -> BinarySensorSpec {
    BinarySensorSpec {
        name,
        icon: "mdi:pump",
        icon_off: Some("mdi:pump-off"),
        device_class: Some(DeviceClass::Running),
    }
}

pub const BINARY_SENSOR_TYPES: &[BinarySensorSpec] = &[
    pump("pumpCOWorks"),
    pump("pumpCWUWorks"),
    pump("pumpSolarWorks"),
    pump("pumpCirculationWorks"),
    pump("pumpFireplaceWorks"),
    BinarySensorSpec {
        name: "fanWorks",
        icon: "mdi:fan",
        icon_off: Some("mdi:fan-off"),
        device_class: Some(DeviceClass::Running),
    },
    BinarySensorSpec {
        name: "lighterWorks",
        icon: "mdi:fire",
        icon_off: Some("mdi:fire-off"),
        device_class: Some(DeviceClass::Running),
    },
    BinarySensorSpec {
        name: "feederWorks",
        icon: "mdi:screw-lag",
        icon_off: None,
        device_class: Some(DeviceClass::Running),
    },
    BinarySensorSpec {
        name: "thermostat",
        icon: "mdi:thermostat",
        icon_off: None,
        device_class: None,
    },
];

pub const MIXER_BINARY_SENSOR_TYPES: &[BinarySensorSpec] = &[pump("mixerPumpWorks")];

/// A writable setpoint. `read_key` names the telemetry value, `write_key`
/// is what `rmCurrNewParam` and the edit-limits resource expect.
#[derive(Debug, Clone, Copy)]
pub struct NumberSpec {
    pub read_key: &'static str,
    pub write_key: &'static str,
    pub unit: Option<Unit>,
    pub device_class: Option<DeviceClass>,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub icon: &'static str,
    /// Overrides the snake_case form of `read_key`.
    pub translation_key: Option<&'static str>,
}

const fn setpoint(
    read_key: &'static str,
    write_key: &'static str,
    min: f64,
    max: f64,
) -> NumberSpec {
    NumberSpec {
        read_key,
        write_key,
        unit: Some(Unit::Celsius),
        device_class: Some(DeviceClass::Temperature),
        min,
        max,
        step: 1.0,
        icon: "mdi:thermometer",
        translation_key: None,
    }
}

/// Fuel parameters are read and written under the same key.
const fn fuel(key: &'static str, unit: Unit, translation_key: &'static str) -> NumberSpec {
    NumberSpec {
        read_key: key,
        write_key: key,
        unit: Some(unit),
        device_class: None,
        min: 0.1,
        max: 25.0,
        step: 0.1,
        icon: "mdi:fire",
        translation_key: Some(translation_key),
    }
}

pub const NUMBER_TYPES: &[NumberSpec] = &[
    setpoint("tempCOSet", "1280", 27.0, 68.0),
    setpoint("tempCWUSet", "1281", 20.0, 55.0),
    fuel("CALORIFIC_KWH_KG", Unit::KilowattHourPerKilogram, "calorific_set"),
    fuel("FUEL_KG_H", Unit::KilogramsPerHour, "fuelfeederspeed_set"),
];

pub const MIXER_NUMBER_TYPES: &[NumberSpec] = &[
    setpoint("mixerSetTemp1", "1287", 30.0, 40.0),
    setpoint("mixerSetTemp2", "1288", 30.0, 40.0),
    setpoint("mixerSetTemp3", "1289", 30.0, 40.0),
    setpoint("mixerSetTemp4", "1290", 30.0, 40.0),
];

/// Write key for an editable semantic parameter, `None` when the
/// parameter cannot be written.
pub fn map_param(name: &str) -> Option<&'static str> {
    NUMBER_TYPES
        .iter()
        .chain(MIXER_NUMBER_TYPES)
        .find(|n| n.read_key == name)
        .map(|n| n.write_key)
        .or_else(|| {
            SWITCH_TYPES
                .iter()
                .find(|s| s.key == name)
                .map(|s| s.write_key)
        })
}

#[derive(Debug, Clone, Copy)]
pub struct SwitchSpec {
    pub key: &'static str,
    pub translation_key: &'static str,
    pub write_key: &'static str,
    pub icon: &'static str,
    pub icon_off: Option<&'static str>,
}

/// The boiler on/off switch reads the operation mode: anything but
/// `turned_off` is on.
pub const SWITCH_TYPES: &[SwitchSpec] = &[SwitchSpec {
    key: "mode",
    translation_key: "boiler_switch",
    write_key: "BOILER_CONTROL",
    icon: "mdi:light-switch",
    icon_off: Some("mdi:light-switch-off"),
}];

#[derive(Debug, Clone, Copy)]
pub struct SelectSpec {
    /// Telemetry key; `{}` is replaced by the zone index for fan-out specs.
    pub key: &'static str,
    pub write_key: &'static str,
    pub options: &'static [&'static str],
    pub icon: &'static str,
}

impl SelectSpec {
    pub fn indexed_key(&self, idx: usize) -> String {
        self.key.replace("{}", &idx.to_string())
    }

    pub fn indexed_write_key(&self, idx: usize) -> String {
        self.write_key.replace("{}", &idx.to_string())
    }
}

pub const SELECT_TYPES: &[SelectSpec] = &[SelectSpec {
    key: "summerMode",
    write_key: "SUMMER_MODE",
    options: &["winter", "summer", "auto"],
    icon: "mdi:weather-sunny",
}];

pub const MIXER_SELECT_TYPES: &[SelectSpec] = &[
    SelectSpec {
        key: "CTRL_WEATHER_MIX_{}",
        write_key: "CTRL_WEATHER_MIX_{}",
        options: &["off", "on"],
        icon: "mdi:weather-partly-cloudy",
    },
    SelectSpec {
        key: "MIX_THERM_MODE_{}",
        write_key: "MIX_THERM_MODE_{}",
        options: &["off", "thermostat_contact", "ecoster_t1", "ecoster_t2"],
        icon: "mdi:thermostat-cog",
    },
];

pub const ECOSTER_SELECT_TYPES: &[SelectSpec] = &[SelectSpec {
    key: "STER_MODE_{}",
    write_key: "STER_MODE_{}",
    options: &[
        "schedule",
        "eco",
        "comfort",
        "outside",
        "airing",
        "party",
        "holiday",
        "antifreeze",
    ],
    icon: "mdi:sync",
}];

/// Probe keys deciding whether a fan-out zone exists.
pub const MIXER_AVAILABILITY_KEY: &str = "mixerTemp";
pub const ECOSTER_AVAILABILITY_KEY: &str = "ecoSterTemp";
