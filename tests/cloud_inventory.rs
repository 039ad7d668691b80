#[path = "support/scripted_http.rs"]
mod scripted_http;

use avion_import::cloud::{CloudClient, CloudCredentials, fetch_inventory};
use avion_import::inventory::{Device, Group};
use avion_import::payload::{ResetPolicy, synthesize};
use avion_import::settings::CloudSettings;
use avion_import::{ErrorKind, SyncError};
use serde_json::json;

use scripted_http::ScriptedHttp;

const API: &str = "https://cloud.test/";

fn settings() -> CloudSettings {
    CloudSettings {
        api_base: API.to_string(),
        ..CloudSettings::default()
    }
}

fn credentials() -> CloudCredentials {
    CloudCredentials {
        email: "owner@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

fn url(path: &str) -> String {
    format!("{API}{path}")
}

fn logged_in() -> ScriptedHttp {
    ScriptedHttp::new().json(
        "POST",
        &url("sessions"),
        200,
        json!({"credentials": {"auth_token": "tok-1"}}),
    )
}

fn account() -> ScriptedHttp {
    logged_in()
        .json(
            "GET",
            &url("user/locations"),
            200,
            json!({"locations": [
                {"pid": "loc-1", "name": "Home"},
                {"pid": "loc-2", "name": "Cabin"}
            ]}),
        )
        .json(
            "GET",
            &url("locations/loc-1"),
            200,
            json!({"location": {"passphrase": "c2VjcmV0cGFzcw=="}}),
        )
        .json(
            "GET",
            &url("locations/loc-1/abstract_devices"),
            200,
            json!({"abstract_devices": [
                {"type": "device", "pid": "abc123", "avid": 42, "name": "Porch", "product_id": 162},
                {"type": "device", "pid": "def456", "avid": 43},
                {"type": "device", "pid": "new000", "avid": 0, "name": "Unclaimed"},
                {"type": "device", "pid": "noavid", "name": "Pending"},
                {"type": "gateway", "pid": "gw1", "avid": 90, "name": "Bridge"}
            ]}),
        )
        .json(
            "GET",
            &url("locations/loc-1/groups"),
            200,
            json!({"groups": [
                {"pid": "g-kitchen", "avid": 10, "name": "Kitchen"},
                {"pid": "g-new", "avid": 0, "name": "Draft"},
                {"pid": "g-outside", "avid": 11}
            ]}),
        )
        .json(
            "GET",
            &url("groups/g-kitchen"),
            200,
            json!({"group": {"devices": ["abc123", 77, {"avid": 5}, "unknown"]}}),
        )
        .json(
            "GET",
            &url("groups/g-outside"),
            200,
            json!({"group": {"devices": [{"device_id": 43}, "gw1"]}}),
        )
}

#[test]
fn fetches_and_resolves_a_full_account() {
    let http = account();
    let inventory = fetch_inventory(&http, &settings(), &credentials()).unwrap();

    assert_eq!(
        inventory.devices,
        vec![
            Device {
                device_id: 42,
                name: "Porch".to_string(),
                product_type: 162,
            },
            Device {
                device_id: 43,
                name: "Device".to_string(),
                product_type: 134,
            },
        ]
    );
    assert_eq!(
        inventory.groups,
        vec![
            Group {
                group_id: 10,
                name: "Kitchen".to_string(),
                members: vec![42, 77, 5],
            },
            Group {
                group_id: 11,
                name: "Group".to_string(),
                members: vec![43],
            },
        ]
    );
    assert_eq!(inventory.passphrase.as_deref(), Some("c2VjcmV0cGFzcw=="));

    // Groups without a mesh id get no detail request.
    assert!(http.sent_to(&url("groups/g-new")).is_empty());
    assert!(http.sent_to(&url("locations/loc-2")).is_empty());
}

#[test]
fn requests_carry_the_expected_headers() {
    let http = account();
    fetch_inventory(&http, &settings(), &credentials()).unwrap();
    let sent = http.sent();

    let login = &sent[0];
    assert_eq!(login.method(), "POST");
    assert_eq!(login.url, url("sessions"));
    assert_eq!(login.header_value("Authorization"), None);
    assert_eq!(login.header_value("Content-Type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(login.body.as_ref().unwrap()).unwrap();
    assert_eq!(body, json!({"email": "owner@example.com", "password": "hunter2"}));

    for request in &sent[1..] {
        assert_eq!(request.method(), "GET");
        assert_eq!(request.header_value("Authorization"), Some("Token tok-1"));
        assert_eq!(request.header_value("Accept"), Some("application/api.avi-on.v3"));
    }
    // login, locations, location detail, devices, groups, two group details
    assert_eq!(sent.len(), 7);
}

#[test]
fn login_without_credentials_is_an_auth_failure() {
    let http = ScriptedHttp::new().json("POST", &url("sessions"), 200, json!({"error": "nope"}));
    let err = fetch_inventory(&http, &settings(), &credentials()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(http.sent().len(), 1);
}

#[test]
fn unauthorized_login_is_an_auth_failure() {
    let http = ScriptedHttp::new().raw("POST", &url("sessions"), 401, "{\"error\":\"invalid\"}");
    let err = CloudClient::new(&http, settings())
        .login(&credentials())
        .err()
        .unwrap();
    assert!(matches!(err, SyncError::AuthFailure(ref msg) if msg.contains("401")));
}

#[test]
fn account_without_locations_is_empty_inventory() {
    let http = logged_in().json("GET", &url("user/locations"), 200, json!({"locations": []}));
    let err = fetch_inventory(&http, &settings(), &credentials()).unwrap_err();
    assert!(matches!(err, SyncError::EmptyInventory));
    assert_eq!(http.sent().len(), 2);
}

#[test]
fn missing_passphrase_is_not_an_error() {
    let http = logged_in()
        .json(
            "GET",
            &url("user/locations"),
            200,
            json!({"locations": [{"pid": "loc-1"}]}),
        )
        .json("GET", &url("locations/loc-1"), 200, json!({"location": {}}));
    let session = CloudClient::new(&http, settings()).login(&credentials()).unwrap();
    let location = session.fetch_location().unwrap();
    assert_eq!(location.name, "loc-1");
    assert_eq!(location.passphrase, None);
}

#[test]
fn server_error_mid_run_is_fatal() {
    let http = logged_in()
        .json(
            "GET",
            &url("user/locations"),
            200,
            json!({"locations": [{"pid": "loc-1"}]}),
        )
        .json("GET", &url("locations/loc-1"), 200, json!({"location": {}}))
        .json(
            "GET",
            &url("locations/loc-1/abstract_devices"),
            200,
            json!({"abstract_devices": []}),
        )
        .raw("GET", &url("locations/loc-1/groups"), 502, "bad gateway");
    let err = fetch_inventory(&http, &settings(), &credentials()).unwrap_err();
    match err {
        SyncError::HttpFailure { status, body, url: failed } => {
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
            assert_eq!(failed, url("locations/loc-1/groups"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn connection_failure_is_a_network_failure() {
    let http = ScriptedHttp::new().unreachable("POST", &url("sessions"), "timed out");
    let err = fetch_inventory(&http, &settings(), &credentials()).unwrap_err();
    assert!(matches!(err, SyncError::NetworkFailure { ref reason, .. } if reason == "timed out"));
}

#[test]
fn unchanged_account_yields_identical_payloads() {
    let first = fetch_inventory(&account(), &settings(), &credentials()).unwrap();
    let second = fetch_inventory(&account(), &settings(), &credentials()).unwrap();
    let first = synthesize(first, ResetPolicy::Replace).to_json().unwrap();
    let second = synthesize(second, ResetPolicy::Replace).to_json().unwrap();
    assert_eq!(first, second);
}
