use std::sync::Arc;
use std::time::Duration;

use econet300::{
    DEFAULT_HW_VERSION, DEFAULT_MODEL_ID, DEFAULT_SW_REVISION, DEFAULT_UID, Econet300Api,
    EconetClient, Error, MemCache,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> Econet300Api {
    let client = EconetClient::builder(server.uri())
        .credentials("admin", "secret")
        .retry_delay(Duration::from_millis(10))
        .build()
        .unwrap();
    Econet300Api::new(client, Arc::new(MemCache::new()))
}

async fn mount_json(server: &MockServer, resource: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/econet/{resource}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_limits(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/econet/rmCurrentDataParamsEdits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"1280": {"min": 27, "max": 68}, "1281": {"min": 20, "max": 55}}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn identity_is_read_from_sys_params() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "sysParams",
        json!({
            "uid": "ABC123",
            "controllerID": "ecoMAX 810P-L",
            "softVer": "1.2.3",
            "routerType": 4
        }),
    )
    .await;

    let client = EconetClient::builder(server.uri()).build().unwrap();
    let api = Econet300Api::create(client, Arc::new(MemCache::new())).await.unwrap();
    assert_eq!(api.uid(), "ABC123");
    assert_eq!(api.identity().model_id, "ecoMAX 810P-L");
    assert_eq!(api.identity().software_revision, "1.2.3");
    assert_eq!(api.identity().hardware_version, "4");

    let device = api.device_info();
    assert_eq!(device.identifier, "ABC123");
    assert_eq!(device.manufacturer, "PLUM");
    assert_eq!(device.configuration_url, server.uri());
}

#[tokio::test]
async fn missing_identity_fields_keep_placeholders() {
    let server = MockServer::start().await;
    mount_json(&server, "sysParams", json!({"uid": "ABC123"})).await;

    let mut api = api(&server);
    api.initialize().await.unwrap();
    assert_eq!(api.uid(), "ABC123");
    assert_eq!(api.identity().model_id, DEFAULT_MODEL_ID);
    assert_eq!(api.identity().software_revision, DEFAULT_SW_REVISION);
    assert_eq!(api.identity().hardware_version, DEFAULT_HW_VERSION);
}

#[tokio::test]
async fn unreachable_sys_params_keeps_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/econet/sysParams"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut api = api(&server);
    api.initialize().await.unwrap();
    assert_eq!(api.uid(), DEFAULT_UID);
}

#[tokio::test]
async fn telemetry_snapshot_is_data_object() {
    let server = MockServer::start().await;
    mount_json(&server, "regParamsData", json!({"data": {"1024": 62.5, "1792": 3}})).await;

    let snapshot = api(&server).fetch_telemetry().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.f64("1024"), Some(62.5));
}

#[tokio::test]
async fn telemetry_without_data_key_is_unavailable() {
    let server = MockServer::start().await;
    mount_json(&server, "regParamsData", json!({"other": {}})).await;

    let err = api(&server).fetch_telemetry().await.unwrap_err();
    assert!(matches!(err, Error::DataUnavailable(_)), "got {err}");
}

#[tokio::test]
async fn telemetry_without_response_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/econet/regParamsData"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = api(&server).fetch_telemetry().await.unwrap_err();
    assert!(matches!(err, Error::DataUnavailable(_)), "got {err}");
}

#[tokio::test]
async fn limits_are_fetched_once() {
    let server = MockServer::start().await;
    mount_limits(&server).await;

    let api = api(&server);
    let co = api.get_parameter_limits(Some("1280")).await.unwrap().unwrap();
    assert_eq!((co.min, co.max), (Some(27.0), Some(68.0)));
    let cwu = api.get_parameter_limits(Some("1281")).await.unwrap().unwrap();
    assert_eq!((cwu.min, cwu.max), (Some(20.0), Some(55.0)));
    assert_eq!(api.get_parameter_limits(Some("9999")).await.unwrap(), None);
    assert_eq!(api.get_parameter_limits(None).await.unwrap(), None);
}

#[tokio::test]
async fn set_parameter_mirrors_value_into_cache() {
    let server = MockServer::start().await;
    mount_limits(&server).await;
    Mock::given(method("GET"))
        .and(path("/econet/rmCurrNewParam"))
        .and(query_param("newParamKey", "1280"))
        .and(query_param("newParamValue", "45"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "OK"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server);
    api.get_parameter_limits(Some("1280")).await.unwrap();
    assert!(api.set_parameter(Some("1280"), 45).await.unwrap());
    assert_eq!(api.cache().get("1280"), Some(json!(45)));
}

#[tokio::test]
async fn out_of_range_write_is_refused_locally() {
    let server = MockServer::start().await;
    mount_limits(&server).await;
    Mock::given(method("GET"))
        .and(path("/econet/rmCurrNewParam"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "OK"})))
        .expect(0)
        .mount(&server)
        .await;

    let api = api(&server);
    api.get_parameter_limits(Some("1280")).await.unwrap();
    assert!(!api.set_parameter(Some("1280"), 90).await.unwrap());
    assert!(!api.cache().exists("1280"));
}

#[tokio::test]
async fn rejected_write_leaves_cache_alone() {
    let server = MockServer::start().await;
    mount_json(&server, "rmCurrNewParam", json!({"result": "ERROR"})).await;

    let api = api(&server);
    assert!(!api.set_parameter(Some("BOILER_CONTROL"), true).await.unwrap());
    assert!(!api.cache().exists("BOILER_CONTROL"));
    assert!(!api.set_parameter(None, 1).await.unwrap());
}

#[tokio::test]
async fn alarms_are_parsed() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "sysParams",
        json!({"alarms": [
            {"code": 2, "fromDate": "2024-01-10 08:15:00", "toDate": "2024-01-10 09:00:00"},
            {"code": 7, "fromDate": "2024-02-01 12:00:00", "toDate": null}
        ]}),
    )
    .await;

    let alarms = api(&server).fetch_alarms().await.unwrap().unwrap();
    assert_eq!(alarms.len(), 2);
    assert!(!alarms[0].is_active());
    assert!(alarms[1].is_active());
    assert_eq!(
        alarms[0].started_at().map(|t| t.to_string()).as_deref(),
        Some("2024-01-10 08:15:00")
    );
}

#[tokio::test]
async fn missing_alarms_field_is_none() {
    let server = MockServer::start().await;
    mount_json(&server, "sysParams", json!({"uid": "ABC123"})).await;

    assert_eq!(api(&server).fetch_alarms().await.unwrap(), None);
}
