use serde::Serialize;
use serde_json::Value;

use crate::codec::Request;
use crate::types::{DeviceCommand, DeviceSnapshot};
use crate::{Error, Result};

pub const DEVICES_DATA_PATH: &str = "/devices/data";

const TRACKED_ATTRIBUTES: &[&str] = &["temperature", "authorization", "hvacMode", "setpoint"];

#[derive(Serialize)]
struct DataEntry<'a> {
    name: &'a str,
    value: &'a str,
}

pub fn devices_data_request() -> Request {
    Request::get(DEVICES_DATA_PATH)
}

pub fn endpoint_data_path(endpoint_id: &str) -> String {
    format!("/devices/{endpoint_id}/endpoints/{endpoint_id}/data")
}

pub fn put_data_body(command: &DeviceCommand) -> Result<String> {
    let entries = [DataEntry {
        name: command.attribute.as_tydom_str(),
        value: &command.value,
    }];
    serde_json::to_string(&entries).map_err(|e| Error::InvalidCommand(e.to_string()))
}

pub fn put_data_request(command: &DeviceCommand) -> Result<Request> {
    Ok(Request::put(
        endpoint_data_path(&command.endpoint_id),
        put_data_body(command)?,
    ))
}

/// Flatten a `/devices/data` body into a snapshot.
///
/// Every endpoint of every device is visited in order; each tracked attribute
/// overwrites the previous value and records its endpoint as the snapshot's
/// endpoint. With several endpoints the last one visited wins.
pub fn parse_devices_data(body: &str) -> Result<DeviceSnapshot> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| Error::UnexpectedResponse(format!("devices data is not JSON: {e}")))?;
    let devices = parsed
        .as_array()
        .ok_or_else(|| Error::UnexpectedResponse("devices data is not an array".to_string()))?;

    let mut snapshot = DeviceSnapshot::default();
    for device in devices {
        let Some(Value::Array(endpoints)) = device.get("endpoints") else {
            continue;
        };
        for endpoint in endpoints {
            let Some(Value::Array(data)) = endpoint.get("data") else {
                continue;
            };
            for entry in data {
                let name = match entry.get("name").and_then(|v| v.as_str()) {
                    Some(n) if TRACKED_ATTRIBUTES.contains(&n) => n,
                    _ => continue,
                };
                let value = entry.get("value").unwrap_or(&Value::Null);
                snapshot.endpoint_id = endpoint.get("id").and_then(id_string);
                apply_attribute(&mut snapshot, name, value);
            }
        }
    }
    Ok(snapshot)
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn apply_attribute(snapshot: &mut DeviceSnapshot, name: &str, value: &Value) {
    match name {
        "temperature" => snapshot.temperature = number(value),
        "setpoint" => snapshot.setpoint = number(value),
        "authorization" => snapshot.authorization = text(value),
        "hvacMode" => snapshot.hvac_mode = text(value),
        _ => {}
    }
}
