mod common;

use std::thread;
use std::time::Duration;

use common::{Behavior, MAC, PASSWORD};
use tydom_thermostat::blocking::TydomClient;
use tydom_thermostat::climate::{ClimateConfig, ClimateDevice, HvacMode, Preset, Thermostat};
use tydom_thermostat::{Error, RunState};

const SNAPSHOT_BODY: &str = r#"[{"endpoints":[{"id":"7","data":[{"name":"temperature","value":19.5},{"name":"setpoint","value":21}]}]}]"#;

fn client_for(host: &str) -> TydomClient {
    TydomClient::builder(MAC, PASSWORD)
        .host(host)
        .tls(false)
        .connect_timeout(Duration::from_millis(500))
        .build()
        .expect("client should build")
}

#[test]
fn blocking_fetch_snapshot() {
    let server = common::start_on_thread(Behavior::Reply(common::reply_frame("HTTP/1.1 200 OK", SNAPSHOT_BODY)));
    let mut client = client_for(&server.host());

    let snapshot = client.fetch_snapshot().expect("snapshot should succeed");
    assert_eq!(snapshot.endpoint_id.as_deref(), Some("7"));
    assert_eq!(snapshot.temperature, Some(19.5));
    assert_eq!(snapshot.setpoint, Some(21.0));
}

#[test]
fn blocking_calls_from_several_threads() {
    let server = common::start_on_thread(Behavior::Reply(common::reply_frame("HTTP/1.1 200 OK", SNAPSHOT_BODY)));
    let host = server.host();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let host = host.clone();
            thread::spawn(move || client_for(&host).fetch_snapshot())
        })
        .collect();
    for handle in handles {
        let snapshot = handle.join().unwrap().expect("each call should succeed");
        assert_eq!(snapshot.endpoint_id.as_deref(), Some("7"));
    }
    assert_eq!(server.recorded.frames().len(), 3);
}

#[test]
fn blocking_errors_surface() {
    let server = common::start_on_thread(Behavior::NoChallenge);
    let mut client = client_for(&server.host());
    let err = client.set_run_state("7", RunState::Heating).unwrap_err();
    assert!(matches!(err, Error::AuthChallenge(_)), "got {err:?}");
}

#[test]
fn silent_host_does_not_block_other_callers() {
    let silent = common::start_silent_on_thread();
    let server = common::start_on_thread(Behavior::Reply(common::reply_frame("HTTP/1.1 200 OK", SNAPSHOT_BODY)));

    let stuck = thread::spawn(move || {
        TydomClient::builder(MAC, PASSWORD)
            .host(silent.to_string())
            .tls(false)
            .connect_timeout(Duration::from_millis(200))
            .build()
            .unwrap()
            .fetch_snapshot()
    });
    let err = stuck.join().unwrap().unwrap_err();
    assert!(matches!(err, Error::Connect(_)), "got {err:?}");

    let snapshot = client_for(&server.host()).fetch_snapshot().expect("shared runtime is free again");
    assert_eq!(snapshot.endpoint_id.as_deref(), Some("7"));
}

#[test]
fn thermostat_drives_device_over_mediation() {
    let server = common::start_on_thread(Behavior::Reply(common::reply_frame("HTTP/1.1 200 OK", SNAPSHOT_BODY)));
    let mut thermostat = Thermostat::new(ClimateConfig::new(MAC, PASSWORD), client_for(&server.host()));

    assert!(thermostat.update().unwrap());
    let state = thermostat.state();
    assert_eq!(state.current_temperature, 19.5);
    assert_eq!(state.target_temperature, 21.0);
    assert_eq!(state.endpoint_id.as_deref(), Some("7"));

    thermostat.set_preset(Preset::Saving).unwrap();
    thermostat.set_run_mode(HvacMode::Off).unwrap();

    let frames: Vec<String> = server
        .recorded
        .frames()
        .into_iter()
        .map(|f| String::from_utf8(f).unwrap())
        .collect();
    assert_eq!(frames.len(), 3);
    assert!(frames[1].starts_with("\x02PUT /devices/7/endpoints/7/data HTTP/1.1\r\n"));
    assert!(frames[1].contains(r#"[{"name":"setpoint","value":"18"}]"#));
    assert!(frames[2].contains(r#"[{"name":"authorization","value":"STOP"}]"#));
}

#[test]
fn thermostat_keeps_state_on_empty_snapshot() {
    let server = common::start_on_thread(Behavior::Reply(common::reply_frame("HTTP/1.1 200 OK", "[]")));
    let mut thermostat = Thermostat::new(ClimateConfig::new(MAC, PASSWORD), client_for(&server.host()));

    assert!(!thermostat.update().unwrap());
    assert_eq!(thermostat.state().endpoint_id, None);
    assert_eq!(thermostat.state().run_state_label, "Unknown");
}
