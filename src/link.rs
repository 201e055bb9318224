/// Sensor link: the per-connection data flow.
///
/// Raw notification chunks go through the [`FrameReassembler`], each
/// complete line through [`decode`], detections through category resolution
/// into the shared [`DetectionStore`], and finally through the
/// [`AlertPolicy`]. The current location is a side input fed from another
/// thread via [`LocationFeed`].

use std::sync::{Arc, Mutex, PoisonError};

use crate::alert::AlertPolicy;
use crate::category::{resolve_detection, Category};
use crate::config::CompanionConfig;
use crate::framer::FrameReassembler;
use crate::protocol::{decode, DetectionEvent, Message, Protocol, RSSI_ABSENT};
use crate::store::{DetectionInput, DetectionRecord, DetectionStore, GeoFix};
use crate::threat::ThreatLevel;

/// Payload for the notification and text-to-speech collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub category: Category,
    pub record: DetectionRecord,
    /// `"<icon> <name> Detected!"`
    pub headline: String,
    pub body: String,
    pub voice: &'static str,
}

impl Alert {
    fn new(category: Category, event: &DetectionEvent, record: DetectionRecord) -> Self {
        let headline = format!("{} {} Detected!", category.icon(), category.name());
        let manufacturer = if event.manufacturer.is_empty() {
            "Unknown"
        } else {
            event.manufacturer.as_str()
        };
        let label = match event.protocol {
            Protocol::Wifi => "SSID",
            _ => "Name",
        };
        let seen = if event.ssid_or_name.is_empty() {
            "Unknown"
        } else {
            event.ssid_or_name.as_str()
        };

        let mut body = format!(
            "Manufacturer: {}\n{}: {}\nMAC: {}",
            manufacturer, label, seen, record.mac
        );
        if let Some(kind) = &event.device_type {
            body.push_str("\nType: ");
            body.push_str(kind);
        }
        body.push_str(&format!("\nScore: {}\nCount: {} | ", event.threat_score, record.count));
        match record.location() {
            Some((lat, lon)) => body.push_str(&format!("Loc: {:.5}, {:.5}", lat, lon)),
            None => body.push_str("Loc: N/A"),
        }

        Self {
            category,
            headline,
            body,
            voice: category.voice_announcement(),
            record,
        }
    }

    /// Headline and body as one notification text.
    pub fn message(&self) -> String {
        format!("{}\n{}", self.headline, self.body)
    }
}

/// Outcome of one complete sensor message.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Heartbeat {
        rssi: i32,
    },
    Detection {
        record: DetectionRecord,
        category: Category,
        /// Present when the cooldown allowed an alert
        alert: Option<Alert>,
    },
    /// Detection that was not recorded: blocklisted device or unusable MAC
    Blocked {
        mac: String,
    },
    Legacy {
        raw: String,
        rssi: Option<i32>,
        is_alert: bool,
    },
    Ignored {
        raw: String,
    },
    Unparseable {
        raw: String,
    },
}

/// Cloneable handle for the location source. Each fix becomes the current
/// location and is appended to the route.
#[derive(Clone)]
pub struct LocationFeed {
    current: Arc<Mutex<Option<GeoFix>>>,
    store: Arc<DetectionStore>,
}

impl LocationFeed {
    pub fn update(&self, fix: GeoFix) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(fix);
        self.store.add_route_point(fix.lat, fix.lon);
    }

    /// Location source lost its fix.
    pub fn clear(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn current(&self) -> Option<GeoFix> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One sensor connection.
pub struct SensorLink {
    framer: FrameReassembler,
    store: Arc<DetectionStore>,
    alerts: AlertPolicy,
    location: LocationFeed,
    config: CompanionConfig,
    last_rssi: Option<i32>,
}

impl SensorLink {
    pub fn new(store: Arc<DetectionStore>, config: &CompanionConfig) -> Self {
        let framer = match config.max_buffer_len {
            Some(max) => FrameReassembler::with_max_buffer(max),
            None => FrameReassembler::new(),
        };
        Self {
            framer,
            location: LocationFeed {
                current: Arc::new(Mutex::new(None)),
                store: Arc::clone(&store),
            },
            store,
            alerts: AlertPolicy::new(config.alert_cooldown_ms),
            config: config.clone(),
            last_rssi: None,
        }
    }

    pub fn store(&self) -> &Arc<DetectionStore> {
        &self.store
    }

    pub fn alerts(&self) -> &AlertPolicy {
        &self.alerts
    }

    /// Handle for the thread delivering location fixes.
    pub fn location_feed(&self) -> LocationFeed {
        self.location.clone()
    }

    pub fn update_location(&self, fix: GeoFix) {
        self.location.update(fix);
    }

    /// Most recent RSSI reported by the sensor, for the signal meter.
    pub fn last_rssi(&self) -> Option<i32> {
        self.last_rssi
    }

    /// Proximity reading of [`last_rssi`](Self::last_rssi).
    pub fn proximity(&self) -> Option<ThreatLevel> {
        self.last_rssi.map(ThreatLevel::from_rssi)
    }

    /// Drop any partial frame, e.g. after the transport reconnects.
    pub fn reset(&mut self) {
        if self.framer.pending() > 0 {
            log::debug!("Discarding {} buffered bytes", self.framer.pending());
        }
        self.framer.reset();
    }

    /// Feed one transport chunk and process every message it completes.
    pub fn on_chunk(&mut self, chunk: &[u8], now_ms: u64) -> Vec<LinkEvent> {
        let lines: Vec<String> = self.framer.feed(chunk).collect();
        lines
            .iter()
            .filter_map(|line| self.handle_message(line, now_ms))
            .collect()
    }

    /// Process one complete message. Blank lines (notification padding)
    /// yield nothing.
    pub fn handle_message(&mut self, message: &str, now_ms: u64) -> Option<LinkEvent> {
        if message.trim().is_empty() {
            return None;
        }
        let event = match decode(message) {
            Message::Heartbeat { rssi } => {
                log::debug!("Heartbeat: RSSI {}", rssi);
                self.note_rssi(rssi);
                LinkEvent::Heartbeat { rssi }
            }
            Message::Detection(event) => {
                self.note_rssi(event.rssi);
                self.on_detection(event, now_ms)
            }
            Message::LegacyText { raw, rssi, is_alert } => {
                log::debug!("Received: {}", raw);
                if let Some(rssi) = rssi {
                    self.note_rssi(rssi);
                }
                if is_alert {
                    log::info!("{}", raw);
                }
                LinkEvent::Legacy { raw, rssi, is_alert }
            }
            Message::Ignored { raw } => {
                log::debug!("Unknown JSON message: {}", raw);
                LinkEvent::Ignored { raw }
            }
            Message::Unparseable { raw } => {
                log::warn!("Unparseable message: {}", raw);
                LinkEvent::Unparseable { raw }
            }
        };
        Some(event)
    }

    fn note_rssi(&mut self, rssi: i32) {
        if rssi != RSSI_ABSENT {
            self.last_rssi = Some(rssi);
        }
    }

    fn on_detection(&self, event: DetectionEvent, now_ms: u64) -> LinkEvent {
        let category = resolve_detection(&event);
        let known = category != Category::Unknown;
        let input = DetectionInput {
            mac: event.mac.clone(),
            rssi: event.rssi,
            protocol: event.protocol,
            timestamp: now_ms,
            location: self.location.current(),
            manufacturer: Some(event.manufacturer.clone()),
            device_name: Some(event.ssid_or_name.clone()),
            category_tag: known.then(|| category.id().to_owned()),
            threat_level: known.then(|| category.threat_level()),
        };

        let Some(record) = self.store.accept(input) else {
            return LinkEvent::Blocked { mac: event.mac };
        };

        // only radio reports alert; other protocols are aggregated silently
        let may_alert =
            event.protocol != Protocol::Unknown && self.config.rssi_may_alert(event.rssi);
        let alert = if may_alert && self.alerts.should_alert(&record.mac, now_ms) {
            let alert = Alert::new(category, &event, record.clone());
            log::info!("{}", alert.headline);
            Some(alert)
        } else {
            log::debug!("{} {} (no alert)", category.name(), record.mac);
            None
        };

        LinkEvent::Detection {
            record,
            category,
            alert,
        }
    }
}
