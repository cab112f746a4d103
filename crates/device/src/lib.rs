//! HTTP client for the field sensor device.
//!
//! The device is a black-box HTTP source: it answers GET with either a JSON
//! object or a free-text blob with one object literal embedded somewhere in
//! it. The parsing contract is: accept a structured object directly, or
//! extract the first balanced-brace substring from text and parse that.
//! All metric values are coerced to text before persistence — the device
//! formats its own units and we store whatever it sent.

use agrisense_core::{DeviceError, SensorReading};
use serde_json::Value;
use tracing::debug;

/// Client for the sensor device endpoint.
pub struct DeviceClient {
    url: String,
    client: reqwest::Client,
}

impl DeviceClient {
    /// Create a client for the given device URL.
    ///
    /// No explicit timeout is set on this client — the fetch relies on the
    /// transport default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the device's current payload as-is.
    ///
    /// Returns a JSON value when the body parses as JSON, otherwise the raw
    /// body as a JSON string — exactly what the proxy route forwards.
    pub async fn fetch(&self) -> Result<Value, DeviceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DeviceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(DeviceError::BadStatus { status_code: status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| DeviceError::Network(e.to_string()))?;

        debug!(bytes = body.len(), "Device payload received");

        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    /// Fetch and decode the payload into a fresh reading.
    pub async fn fetch_reading(&self) -> Result<SensorReading, DeviceError> {
        let payload = self.fetch().await?;
        reading_from_payload(&payload)
    }
}

/// Decode a device payload (object, or text with an embedded object literal)
/// into a reading, coercing every value to text.
pub fn reading_from_payload(payload: &Value) -> Result<SensorReading, DeviceError> {
    let object = match payload {
        Value::Object(map) => map.clone(),
        Value::String(text) => {
            let literal = extract_object_literal(text).ok_or_else(|| {
                DeviceError::Payload("no object literal found in device text".into())
            })?;
            match serde_json::from_str::<Value>(literal) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(DeviceError::Payload(
                        "embedded literal is not an object".into(),
                    ));
                }
                Err(e) => {
                    return Err(DeviceError::Payload(format!(
                        "embedded literal failed to parse: {e}"
                    )));
                }
            }
        }
        other => {
            return Err(DeviceError::Payload(format!(
                "unsupported payload type: {other}"
            )));
        }
    };

    let field = |key: &str| {
        object
            .get(key)
            .map(coerce_to_text)
            .unwrap_or_default()
    };

    Ok(SensorReading::new(
        field("temperature"),
        field("humidity"),
        field("waterLevel"),
        field("steam"),
        field("light"),
        field("soilHumidity"),
    ))
}

/// Find the first balanced-brace substring of `text`.
///
/// Scans for the first `{` and walks forward counting brace depth; returns
/// the slice up to the matching `}`. Brace characters inside JSON strings
/// are rare in device output, so depth counting is sufficient here.
pub fn extract_object_literal(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;

    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Map an arbitrary-typed payload value to the text stored in a reading.
pub fn coerce_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".into(),
        other => other.to_string(),
    }
}
