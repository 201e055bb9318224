/// Static category table for surveillance device classification.
///
/// One entry per [`Category`] carrying its wire identifier, legacy tag
/// aliases, display metadata, fixed threat level, and the MAC OUI prefixes
/// that resolve to it. Sources: flock-you companion app category tables and
/// sensor firmware tags.

use crate::category::{Category, CategoryInfo};
use crate::threat::ThreatLevel;

pub static FLOCK_SAFETY: CategoryInfo = CategoryInfo {
    category: Category::FlockSafety,
    id: "FLOCK_SAFETY",
    aliases: &["SURVEILLANCE_CAMERA"],
    name: "Flock Safety",
    description: "Flock Safety ALPR / Surveillance Camera",
    icon: "\u{1F4F9}",
    color: 0xFFFF8C00,
    threat: ThreatLevel::High,
    ouis: &[
        [0xB4, 0x1E, 0x52],
        // Silicon Labs modules shipped in Flock units
        [0x58, 0x8E, 0x81],
        [0xCC, 0xCC, 0xCC],
        [0xEC, 0x1B, 0xBD],
        [0x90, 0x35, 0xEA],
        [0x04, 0x0D, 0x84],
        [0xF0, 0x82, 0xC0],
        [0x1C, 0x34, 0xF1],
        [0x38, 0x5B, 0x44],
        [0x94, 0x34, 0x69],
        [0xB4, 0xE3, 0xF9],
        [0x70, 0xC9, 0x4E],
        [0x3C, 0x91, 0x80],
        [0xD8, 0xF3, 0xBC],
        [0x80, 0x30, 0x49],
        [0x14, 0x5A, 0xFC],
        [0x74, 0x4C, 0xA1],
        [0x08, 0x3A, 0x88],
        [0x9C, 0x2F, 0x9D],
        [0x94, 0x08, 0x53],
        [0xE4, 0xAA, 0xEA],
    ],
    voice: "Flock Safety camera detected",
};

pub static AXON: CategoryInfo = CategoryInfo {
    category: Category::Axon,
    id: "AXON",
    aliases: &["LAW_ENFORCEMENT", "AXON_SYSTEM"],
    name: "Axon",
    description: "Axon Body Cam / Fleet System",
    icon: "\u{1F46E}",
    color: 0xFF0000FF,
    threat: ThreatLevel::Critical,
    ouis: &[[0x00, 0x13, 0x03], [0x00, 0x25, 0xDF]],
    voice: "Warning! Axon body camera detected",
};

/// Raven units carry no distinctive OUI; they are only identified by tag.
pub static RAVEN: CategoryInfo = CategoryInfo {
    category: Category::Raven,
    id: "RAVEN",
    aliases: &["GUNSHOT_DETECTION", "RAVEN_GUNSHOT_DETECTOR"],
    name: "Raven",
    description: "Raven / ShotSpotter Gunshot Detection",
    icon: "\u{1F6A8}",
    color: 0xFFDC2626,
    threat: ThreatLevel::Critical,
    ouis: &[],
    voice: "Critical alert! Gunshot detector nearby",
};

pub static RING: CategoryInfo = CategoryInfo {
    category: Category::Ring,
    id: "RING",
    aliases: &["SECURITY_CAMERA"],
    name: "Ring",
    description: "Ring Doorbell / Security Camera",
    icon: "\u{1F6AA}",
    color: 0xFF00FFFF,
    threat: ThreatLevel::Medium,
    ouis: &[
        [0x44, 0x61, 0x32],
        [0x74, 0xC6, 0x3B],
        [0x08, 0x62, 0x66],
        [0x18, 0xB7, 0x11],
        [0x34, 0xD2, 0x70],
        [0xB0, 0x4E, 0x26],
        [0x70, 0x56, 0x81],
        [0x50, 0xF5, 0xDA],
        [0xF0, 0xD7, 0xAA],
        [0x04, 0xD9, 0xF5],
        [0xD0, 0x52, 0xA8],
        [0x18, 0x7F, 0x88],
        [0x24, 0x2B, 0xD6],
        [0x34, 0x3E, 0xA4],
        [0x54, 0xE0, 0x19],
        [0x5C, 0x47, 0x5E],
        [0x64, 0x9A, 0x63],
        [0x90, 0x48, 0x6C],
        [0x9C, 0x76, 0x13],
        [0xAC, 0x9F, 0xC3],
        [0xC4, 0xDB, 0xAD],
        [0xCC, 0x3B, 0xFB],
    ],
    voice: "Ring camera detected",
};

pub static CRADLEPOINT: CategoryInfo = CategoryInfo {
    category: Category::Cradlepoint,
    id: "CRADLEPOINT",
    aliases: &["NETWORK_EQUIPMENT"],
    name: "Cradlepoint",
    description: "Cradlepoint Router / Network Equipment",
    icon: "\u{1F310}",
    color: 0xFF10B981,
    threat: ThreatLevel::Medium,
    ouis: &[[0x00, 0x30, 0x44], [0x00, 0xE0, 0x1C]],
    voice: "Surveillance network equipment detected",
};

pub static DRONE: CategoryInfo = CategoryInfo {
    category: Category::Drone,
    id: "DRONE",
    aliases: &["CONSUMER_DRONE", "COMMERCIAL_DRONE"],
    name: "Drone",
    description: "Drone (DJI / Parrot / Skydio)",
    icon: "\u{1F6F8}",
    color: 0xFFFFFF00,
    threat: ThreatLevel::Low,
    ouis: &[
        // === DJI ===
        [0x0C, 0x9A, 0xE6],
        [0x8C, 0x58, 0x23],
        [0x04, 0xA8, 0x5A],
        [0x58, 0xB8, 0x58],
        [0xE4, 0x7A, 0x2C],
        [0x60, 0x60, 0x1F],
        [0x48, 0x1C, 0xB9],
        [0x34, 0xD2, 0x62],
        // === Parrot ===
        [0x00, 0x12, 0x1C],
        [0x00, 0x26, 0x7E],
        [0x90, 0x03, 0xB7],
        [0x90, 0x3A, 0xE6],
        [0xA0, 0x14, 0x3D],
        // === Skydio ===
        [0x38, 0x1D, 0x14],
    ],
    voice: "Drone detected nearby",
};

pub static NEST_GOOGLE: CategoryInfo = CategoryInfo {
    category: Category::NestGoogle,
    id: "NEST_GOOGLE",
    aliases: &[],
    name: "Nest/Google",
    description: "Nest / Google Camera",
    icon: "\u{1F3E0}",
    color: 0xFFFFFFFF,
    threat: ThreatLevel::Low,
    ouis: &[
        [0x18, 0xB4, 0x30],
        [0x1C, 0xF2, 0x9A],
        [0x44, 0x07, 0x0B],
        [0x54, 0x60, 0x09],
        [0x64, 0x16, 0x66],
        [0x94, 0x94, 0x26],
        [0x98, 0xD2, 0x93],
        [0xAC, 0x0D, 0x1A],
        [0xD4, 0xA9, 0x28],
        [0xE8, 0xEB, 0x11],
        [0xF4, 0xF5, 0xD8],
        [0xF4, 0xF5, 0xE8],
    ],
    voice: "Nest camera detected",
};

pub static ARLO: CategoryInfo = CategoryInfo {
    category: Category::Arlo,
    id: "ARLO",
    aliases: &[],
    name: "Arlo",
    description: "Arlo Security Camera",
    icon: "\u{1F4F7}",
    color: 0xFF00FF64,
    threat: ThreatLevel::Low,
    ouis: &[
        [0x00, 0x1A, 0x3A],
        [0x20, 0xDF, 0xB9],
        [0x28, 0xB4, 0x66],
        [0x3C, 0x37, 0x86],
        [0x44, 0x6C, 0x24],
        [0x6C, 0xB0, 0xCE],
        [0x84, 0xD6, 0xD0],
        [0x9C, 0x53, 0x22],
        [0xA0, 0xC5, 0x89],
        [0xC4, 0x04, 0x15],
        [0xC4, 0x41, 0x1E],
    ],
    voice: "Arlo camera detected",
};

pub static EUFY: CategoryInfo = CategoryInfo {
    category: Category::Eufy,
    id: "EUFY",
    aliases: &[],
    name: "Eufy",
    description: "Eufy Security Camera",
    icon: "\u{1F512}",
    color: 0xFFFF64C8,
    threat: ThreatLevel::Low,
    ouis: &[
        [0x10, 0xD7, 0xB0],
        [0x18, 0x3A, 0x2D],
        [0x1C, 0x1B, 0x68],
        [0x48, 0xA9, 0xD2],
        [0x60, 0xFD, 0xA8],
        [0x74, 0xFE, 0xCE],
        [0x78, 0x02, 0xB1],
        [0xA4, 0x3B, 0xFA],
        [0xAC, 0xC1, 0xEE],
        [0xD4, 0xA6, 0x51],
    ],
    voice: "Eufy camera detected",
};

pub static WYZE: CategoryInfo = CategoryInfo {
    category: Category::Wyze,
    id: "WYZE",
    aliases: &[],
    name: "Wyze",
    description: "Wyze Camera",
    icon: "\u{1F441}\u{FE0F}",
    color: 0xFF64C8FF,
    threat: ThreatLevel::Low,
    ouis: &[
        [0x2C, 0xAA, 0x8E],
        [0xD0, 0x3F, 0x27],
        [0x7C, 0x78, 0xB2],
        [0x8C, 0x4B, 0x14],
    ],
    voice: "Wyze camera detected",
};

pub static BLINK: CategoryInfo = CategoryInfo {
    category: Category::Blink,
    id: "BLINK",
    aliases: &[],
    name: "Blink",
    description: "Blink / Amazon Camera",
    icon: "\u{1F4A1}",
    color: 0xFF00E5FF,
    threat: ThreatLevel::Low,
    ouis: &[
        [0x18, 0xE7, 0x4A],
        [0x24, 0x62, 0xAB],
        [0x34, 0x4B, 0x50],
        [0x44, 0x91, 0x60],
        [0x68, 0x9C, 0x70],
        [0x74, 0x6F, 0xF7],
        [0xB4, 0x7C, 0x9C],
    ],
    voice: "Blink camera detected",
};

pub static UNKNOWN: CategoryInfo = CategoryInfo {
    category: Category::Unknown,
    id: "UNKNOWN",
    aliases: &[],
    name: "Unknown Device",
    description: "Unidentified Device",
    icon: "\u{2753}",
    color: 0xFF9CA3AF,
    threat: ThreatLevel::Unknown,
    ouis: &[],
    voice: "Unknown device detected",
};

/// OUI lookup order. Address blocks are shared between vendors, so the
/// higher-threat interpretation is checked first: law enforcement, then
/// surveillance infrastructure, then consumer cameras and drones.
pub static OUI_LOOKUP_ORDER: &[&CategoryInfo] = &[
    &AXON,
    &CRADLEPOINT,
    &FLOCK_SAFETY,
    &RING,
    &DRONE,
    &NEST_GOOGLE,
    &ARLO,
    &EUFY,
    &WYZE,
    &BLINK,
];

/// Every category, `Unknown` last.
pub static CATEGORIES: &[&CategoryInfo] = &[
    &FLOCK_SAFETY,
    &AXON,
    &RAVEN,
    &RING,
    &CRADLEPOINT,
    &DRONE,
    &NEST_GOOGLE,
    &ARLO,
    &EUFY,
    &WYZE,
    &BLINK,
    &UNKNOWN,
];
