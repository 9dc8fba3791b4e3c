use std::sync::Arc;

use econet300::entity::{Preset, Refreshable, Writable};
use econet300::{
    Config, Econet300Api, EconetClient, Entities, MemCache, NativeValue, TelemetrySnapshot,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> Econet300Api {
    let client = EconetClient::builder(server.uri()).max_attempts(1).build().unwrap();
    Econet300Api::new(client, Arc::new(MemCache::new()))
}

fn snapshot(v: Value) -> TelemetrySnapshot {
    TelemetrySnapshot::new(v.as_object().unwrap().clone())
}

fn config(mixers: usize, ecosters: usize) -> Config {
    let mut config = Config::new("boiler", "admin", "secret");
    config.mixers = mixers;
    config.ecosters = ecosters;
    config
}

async fn mount_ok_write(server: &MockServer, key: &str, value: &str) {
    Mock::given(method("GET"))
        .and(path("/econet/rmCurrNewParam"))
        .and(query_param("newParamKey", key))
        .and(query_param("newParamValue", value))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "OK"})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn controller_sensors_follow_snapshot() {
    let server = MockServer::start().await;
    let api = api(&server);
    let first = snapshot(json!({"1024": 62.5, "1792": 3, "tempFeeder": null}));

    let mut entities = Entities::create(&first, &api, &config(4, 3)).await.unwrap();
    let names: Vec<_> = entities.sensors.iter().map(|s| s.description.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"tempCO"));
    assert!(names.contains(&"mode"));
    assert!(!names.contains(&"tempCWU"));
    assert!(!names.contains(&"tempFeeder"));

    let temp = entities.sensors.iter().find(|s| s.description.name == "tempCO").unwrap();
    assert_eq!(temp.native_value(), Some(&NativeValue::Number(62.5)));
    assert_eq!(temp.description.unique_id, "default-uid-1024");
    assert_eq!(temp.description.translation_key, "temp_co");

    let mode = entities.sensors.iter().find(|s| s.description.name == "mode").unwrap();
    assert_eq!(mode.native_value(), Some(&NativeValue::Text("work".into())));

    entities.refresh(&snapshot(json!({"1024": 64.0, "1792": 4})));
    let temp = entities.sensors.iter().find(|s| s.description.name == "tempCO").unwrap();
    assert_eq!(temp.native_value(), Some(&NativeValue::Number(64.0)));

    // A key missing from a later snapshot keeps the last value.
    entities.refresh(&snapshot(json!({"1792": 4})));
    let temp = entities.sensors.iter().find(|s| s.description.name == "tempCO").unwrap();
    assert_eq!(temp.native_value(), Some(&NativeValue::Number(64.0)));
}

#[tokio::test]
async fn mixer_fan_out_skips_absent_circuits() {
    let server = MockServer::start().await;
    let api = api(&server);
    let first = snapshot(json!({
        "mixerTemp2": 35.5,
        "mixerPumpWorks2": false,
        "CTRL_WEATHER_MIX_2": 1
    }));

    let entities = Entities::create(&first, &api, &config(3, 3)).await.unwrap();
    assert_eq!(entities.mixers.len(), 1);
    let mixer = &entities.mixers[0];
    assert_eq!(mixer.idx, 2);
    assert_eq!(mixer.device.name, "Mixer2");
    assert_eq!(mixer.device.via_device.as_deref(), Some("default-uid"));
    assert_eq!(mixer.sensors.len(), 1);
    assert!(mixer.binary_sensors.is_empty());
    assert!(mixer.numbers.is_empty());
    assert_eq!(mixer.selects.len(), 1);
    assert_eq!(mixer.selects[0].current_option(), Some("on"));
}

#[tokio::test]
async fn binary_sensor_reported_false_is_not_added() {
    let server = MockServer::start().await;
    let api = api(&server);
    let first = snapshot(json!({"pumpCOWorks": false, "pumpCWUWorks": true, "1536": 1}));

    let mut entities = Entities::create(&first, &api, &config(0, 0)).await.unwrap();
    assert_eq!(entities.binary_sensors.len(), 1);
    let pump = &entities.binary_sensors[0];
    assert_eq!(pump.description.name, "pumpCWUWorks");
    assert_eq!(pump.is_on(), Some(true));
    assert_eq!(pump.icon(), Some("mdi:pump"));

    entities.refresh(&snapshot(json!({"pumpCWUWorks": false})));
    let pump = &entities.binary_sensors[0];
    assert_eq!(pump.is_on(), Some(false));
    assert_eq!(pump.icon(), Some("mdi:pump-off"));
}

#[tokio::test]
async fn number_uses_reported_limits_and_writes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/econet/rmCurrentDataParamsEdits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"1280": {"min": 40, "max": 80}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_ok_write(&server, "1280", "60").await;

    let api = api(&server);
    let first = snapshot(json!({"tempCOSet": 55, "tempCWUSet": 45}));
    let mut entities = Entities::create(&first, &api, &config(0, 0)).await.unwrap();

    // tempCWUSet has no limits entry.
    assert_eq!(entities.numbers.len(), 1);
    let number = &mut entities.numbers[0];
    assert_eq!((number.min_value(), number.max_value()), (40.0, 80.0));
    assert_eq!(number.native_value(), Some(55.0));

    assert!(!number.write(&api, 85.0).await.unwrap());
    assert_eq!(number.native_value(), Some(55.0));
    assert!(number.write(&api, 60.0).await.unwrap());
    assert_eq!(number.native_value(), Some(60.0));
    assert_eq!(api.cache().get("1280"), Some(json!(60)));
}

#[tokio::test]
async fn boiler_switch_writes_control_key() {
    let server = MockServer::start().await;
    mount_ok_write(&server, "BOILER_CONTROL", "0").await;

    let api = api(&server);
    let mut entities = Entities::create(&snapshot(json!({"mode": 3})), &api, &config(0, 0))
        .await
        .unwrap();
    let switch = &mut entities.switches[0];
    assert_eq!(switch.is_on(), Some(true));
    assert!(switch.turn_off(&api).await.unwrap());
    assert_eq!(switch.is_on(), Some(false));
}

#[tokio::test]
async fn failed_select_write_keeps_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/econet/rmCurrNewParam"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = api(&server);
    let mut entities = Entities::create(&snapshot(json!({"summerMode": 0})), &api, &config(0, 0))
        .await
        .unwrap();
    let select = &mut entities.selects[0];
    assert_eq!(select.current_option(), Some("winter"));
    assert!(!select.write(&api, "summer".to_string()).await.unwrap());
    assert!(!select.write(&api, "spring".to_string()).await.unwrap());
    assert_eq!(select.current_option(), Some("winter"));
}

#[tokio::test]
async fn ecoster_thermostat_presets_and_setpoint() {
    let server = MockServer::start().await;
    mount_ok_write(&server, "STER_MODE_1", "5").await;
    mount_ok_write(&server, "STER_TEMP_SET_PARTY_1", "23.5").await;

    let api = api(&server);
    let first = snapshot(json!({
        "ecoSterTemp1": 21.0,
        "ecoSterSetTemp1": 22.0,
        "ecoSterMode1": 2,
        "ecoSterContacts1": false,
        "STER_MODE_1": 2
    }));
    let mut entities = Entities::create(&first, &api, &config(0, 3)).await.unwrap();
    assert_eq!(entities.ecosters.len(), 1);

    let ecoster = &mut entities.ecosters[0];
    assert_eq!(ecoster.device.name, "ecoSTER1");
    assert_eq!(ecoster.sensors.len(), 2);
    assert_eq!(ecoster.selects[0].current_option(), Some("comfort"));

    let climate = &mut ecoster.climate;
    assert_eq!(climate.preset(), Some(Preset::Comfort));
    assert!(climate.set_preset(&api, Preset::Party).await.unwrap());
    assert_eq!(climate.target_temperature_key().as_deref(), Some("STER_TEMP_SET_PARTY_1"));
    assert!(climate.set_temperature(&api, 23.46).await.unwrap());
    assert_eq!(climate.target_temperature(), Some(23.5));

    climate.handle_update(&snapshot(json!({"ecoSterTemp1": 21.2, "ecoSterMode1": 133})));
    assert_eq!(climate.preset(), Some(Preset::Party));
}

#[tokio::test]
async fn missing_limits_resource_only_drops_numbers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/econet/rmCurrentDataParamsEdits"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = api(&server);
    let first = snapshot(json!({"tempCO": 65, "mode": 3, "tempCOSet": 60, "pumpCOWorks": true}));
    let entities = Entities::create(&first, &api, &config(4, 3)).await.unwrap();

    assert!(entities.numbers.is_empty());
    assert_eq!(entities.sensors.len(), 3);
    assert_eq!(entities.binary_sensors.len(), 1);
    assert_eq!(entities.switches.len(), 1);
}

#[tokio::test]
async fn fuel_numbers_accept_fractional_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/econet/rmCurrentDataParamsEdits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "CALORIFIC_KWH_KG": {"min": 0.1, "max": 25},
                "FUEL_KG_H": {"min": 0.1, "max": 25}
            }
        })))
        .mount(&server)
        .await;
    mount_ok_write(&server, "CALORIFIC_KWH_KG", "12.5").await;

    let api = api(&server);
    let first = snapshot(json!({"CALORIFIC_KWH_KG": 4.8, "FUEL_KG_H": 3.2}));
    let mut entities = Entities::create(&first, &api, &config(0, 0)).await.unwrap();
    assert_eq!(entities.numbers.len(), 2);

    let calorific = entities
        .numbers
        .iter_mut()
        .find(|n| n.write_key() == "CALORIFIC_KWH_KG")
        .unwrap();
    assert_eq!(calorific.step(), 0.1);
    assert_eq!(calorific.description.unit.map(|u| u.as_str()), Some("kWh/kg"));
    assert_eq!(calorific.description.translation_key, "calorific_set");

    assert!(calorific.write(&api, 12.5).await.unwrap());
    assert_eq!(calorific.native_value(), Some(12.5));
    assert_eq!(api.cache().get("CALORIFIC_KWH_KG"), Some(json!(12.5)));
}

#[tokio::test]
async fn select_ignores_negative_and_fractional_values() {
    let server = MockServer::start().await;
    let api = api(&server);
    let mut entities = Entities::create(&snapshot(json!({"summerMode": -1})), &api, &config(0, 0))
        .await
        .unwrap();
    assert_eq!(entities.selects[0].current_option(), None);

    entities.refresh(&snapshot(json!({"summerMode": 1.7})));
    assert_eq!(entities.selects[0].current_option(), None);

    entities.refresh(&snapshot(json!({"summerMode": 2})));
    assert_eq!(entities.selects[0].current_option(), Some("auto"));
}

#[tokio::test]
async fn thermostat_refuses_temperature_without_target_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/econet/rmCurrNewParam"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "OK"})))
        .expect(0)
        .mount(&server)
        .await;

    let api = api(&server);
    let first = snapshot(json!({"ecoSterTemp1": 21.0, "ecoSterSetTemp1": 22.0, "ecoSterMode1": 2}));
    let mut entities = Entities::create(&first, &api, &config(0, 1)).await.unwrap();
    let climate = &mut entities.ecosters[0].climate;

    climate.handle_update(&snapshot(json!({"ecoSterTemp1": 21.0, "ecoSterMode1": 4})));
    assert!(!climate.set_temperature(&api, 23.0).await.unwrap());
}
