/// Sensor telemetry protocol: message types and the line decoder.
///
/// The sensor streams newline-delimited JSON (NDJSON) over BLE
/// notifications. Older firmware sends plain-text lines instead; those are
/// still classified so the signal meter keeps working.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Maximum length for normalized MAC address strings ("AA:BB:CC:DD:EE:FF")
pub type MacString = heapless::String<18>;

/// RSSI reported when a message carries no signal strength.
pub const RSSI_ABSENT: i32 = -100;

/// `type` value of heartbeat messages.
pub const HEARTBEAT_TYPE: &str = "heartbeat";

/// Plain-text lines starting with this prefix announce a detection.
pub const LEGACY_ALERT_PREFIX: &str = "FLOCK DETECTED!";

/// Bracketed RSSI tag embedded in plain-text lines, e.g. `[RSSI:-75]`.
const LEGACY_RSSI_TAG: &str = "[RSSI:";

/// Companion crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Radio the sensor saw the device on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Wifi,
    BluetoothLe,
    /// Missing or unrecognized `protocol` field
    Unknown,
}

impl Protocol {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "wifi" => Protocol::Wifi,
            "bluetooth_le" => Protocol::BluetoothLe,
            _ => Protocol::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Wifi => "wifi",
            Protocol::BluetoothLe => "bluetooth_le",
            Protocol::Unknown => "unknown",
        }
    }
}

/// A decoded detection report.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    /// MAC address as sent by the sensor (trimmed, not yet normalized)
    pub mac: String,
    pub rssi: i32,
    pub protocol: Protocol,
    /// SSID for WiFi detections, advertised name for BLE. Empty if absent.
    pub ssid_or_name: String,
    /// Empty if absent
    pub manufacturer: String,
    /// Explicit category identifier (`device_category`)
    pub device_category_tag: Option<String>,
    /// Finer device type (`device_type`), e.g. `RAVEN_GUNSHOT_DETECTOR`
    pub device_type: Option<String>,
    pub threat_score: i32,
}

/// One classified line of sensor output.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Link liveness ping carrying only signal strength
    Heartbeat { rssi: i32 },
    Detection(DetectionEvent),
    /// Plain-text line from older firmware
    LegacyText {
        raw: String,
        rssi: Option<i32>,
        is_alert: bool,
    },
    /// Well-formed JSON that is neither a heartbeat nor a detection
    Ignored { raw: String },
    /// Line looked like JSON but failed to parse
    Unparseable { raw: String },
}

/// Wire format for sensor messages. Flat struct, every field optional.
///
/// Each field is read leniently: a value of the wrong JSON type is treated
/// as absent instead of rejecting the whole message. Unknown fields
/// (`ssid_length`, `detection_method`, ...) are ignored.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawMessage {
    #[serde(rename = "type", deserialize_with = "lenient_str")]
    kind: Option<String>,
    #[serde(deserialize_with = "lenient_str")]
    mac_address: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    rssi: Option<i32>,
    #[serde(deserialize_with = "lenient_str")]
    protocol: Option<String>,
    #[serde(deserialize_with = "lenient_str")]
    ssid: Option<String>,
    #[serde(deserialize_with = "lenient_str")]
    device_name: Option<String>,
    #[serde(deserialize_with = "lenient_str")]
    manufacturer: Option<String>,
    #[serde(deserialize_with = "lenient_str")]
    device_category: Option<String>,
    #[serde(deserialize_with = "lenient_str")]
    device_type: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    threat_score: Option<i32>,
}

fn lenient_str<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// Classify one complete line of sensor output.
///
/// Pure: the same line always yields the same message. Never panics;
/// malformed JSON degrades to [`Message::Unparseable`].
pub fn decode(message: &str) -> Message {
    let trimmed = message.trim();
    if trimmed.starts_with('{') {
        decode_json(trimmed)
    } else {
        decode_legacy(message)
    }
}

fn decode_json(text: &str) -> Message {
    let raw: RawMessage = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(_) => {
            return Message::Unparseable {
                raw: text.to_owned(),
            }
        }
    };

    let rssi = raw.rssi.unwrap_or(RSSI_ABSENT);

    if raw.kind.as_deref() == Some(HEARTBEAT_TYPE) {
        return Message::Heartbeat { rssi };
    }

    let mac = match non_empty(raw.mac_address) {
        Some(mac) => mac,
        None => {
            return Message::Ignored {
                raw: text.to_owned(),
            }
        }
    };

    let protocol = raw
        .protocol
        .as_deref()
        .map(Protocol::from_wire)
        .unwrap_or(Protocol::Unknown);

    let ssid = non_empty(raw.ssid);
    let name = non_empty(raw.device_name);
    let ssid_or_name = match protocol {
        Protocol::Wifi => ssid.or(name),
        _ => name.or(ssid),
    }
    .unwrap_or_default();

    Message::Detection(DetectionEvent {
        mac,
        rssi,
        protocol,
        ssid_or_name,
        manufacturer: non_empty(raw.manufacturer).unwrap_or_default(),
        device_category_tag: non_empty(raw.device_category),
        device_type: non_empty(raw.device_type),
        threat_score: raw.threat_score.unwrap_or(0),
    })
}

fn decode_legacy(message: &str) -> Message {
    Message::LegacyText {
        raw: message.to_owned(),
        rssi: legacy_rssi(message),
        is_alert: message.starts_with(LEGACY_ALERT_PREFIX),
    }
}

/// Extract the first well-formed `[RSSI:<signed int>]` tag.
fn legacy_rssi(text: &str) -> Option<i32> {
    text.match_indices(LEGACY_RSSI_TAG).find_map(|(start, _)| {
        let rest = &text[start + LEGACY_RSSI_TAG.len()..];
        let end = rest.find(']')?;
        let value = &rest[..end];
        let digits = value.strip_prefix('-').unwrap_or(value);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        value.parse().ok()
    })
}
