/// Threat levels attached to device categories, plus the RSSI proximity
/// heuristic used for the live signal meter.

use core::fmt;

use serde::{Deserialize, Serialize};

/// RSSI above this is treated as a critical (very close) signal.
pub const RSSI_CRITICAL: i32 = -60;
/// RSSI above this is treated as a high (close) signal.
pub const RSSI_HIGH: i32 = -70;
/// RSSI above this is treated as a medium signal.
pub const RSSI_MEDIUM: i32 = -80;

/// Weakest RSSI shown on the signal meter (0%).
pub const RSSI_METER_FLOOR: i32 = -100;
/// Strongest RSSI shown on the signal meter (100%).
pub const RSSI_METER_CEIL: i32 = -30;

/// Fixed threat level of a category. Rendered as the uppercase tag the
/// companion app stores in `threatLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Critical => "CRITICAL",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::Low => "LOW",
            ThreatLevel::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored threat tag (case-insensitive). Unrecognized tags map
    /// to `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => ThreatLevel::Critical,
            "HIGH" => ThreatLevel::High,
            "MEDIUM" => ThreatLevel::Medium,
            "LOW" => ThreatLevel::Low,
            _ => ThreatLevel::Unknown,
        }
    }

    /// Proximity heuristic: stronger signals mean a closer device.
    /// Never returns `Unknown`.
    pub fn from_rssi(rssi: i32) -> Self {
        if rssi > RSSI_CRITICAL {
            ThreatLevel::Critical
        } else if rssi > RSSI_HIGH {
            ThreatLevel::High
        } else if rssi > RSSI_MEDIUM {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        }
    }

    /// Label shown next to the live signal meter.
    pub fn proximity_label(&self) -> &'static str {
        match self {
            ThreatLevel::Critical => "CRITICAL THREAT",
            ThreatLevel::High => "HIGH THREAT",
            ThreatLevel::Medium => "MEDIUM THREAT",
            ThreatLevel::Low | ThreatLevel::Unknown => "NO THREAT",
        }
    }

    /// ARGB color for the level.
    pub fn color(&self) -> u32 {
        match self {
            ThreatLevel::Critical => 0xFFDC2626,
            ThreatLevel::High => 0xFFEF4444,
            ThreatLevel::Medium => 0xFFF59E0B,
            ThreatLevel::Low => 0xFF22C55E,
            ThreatLevel::Unknown => 0xFF9CA3AF,
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an RSSI onto the 0..=100 signal meter.
pub fn signal_percent(rssi: i32) -> u8 {
    let span = (RSSI_METER_CEIL - RSSI_METER_FLOOR) as i64;
    let pct = (rssi as i64 - RSSI_METER_FLOOR as i64) * 100 / span;
    pct.clamp(0, 100) as u8
}
