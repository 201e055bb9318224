/// Device category resolution.
///
/// An explicit category tag from the sensor wins; otherwise the MAC OUI is
/// looked up in [`defaults::OUI_LOOKUP_ORDER`]. Everything here is a pure
/// read of the static tables in [`defaults`].

use core::fmt;

use crate::defaults::{self, CATEGORIES, OUI_LOOKUP_ORDER};
use crate::protocol::{DetectionEvent, MacString};
use crate::threat::ThreatLevel;

/// Closed set of device categories the companion distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Flock Safety ALPR cameras (Falcon, Penguin, Pigvision)
    FlockSafety,
    /// Axon body cams and fleet systems
    Axon,
    /// Raven / ShotSpotter gunshot detectors
    Raven,
    Ring,
    /// Cradlepoint routers backhauling surveillance gear
    Cradlepoint,
    /// DJI, Parrot and Skydio, grouped
    Drone,
    NestGoogle,
    Arlo,
    Eufy,
    Wyze,
    Blink,
    Unknown,
}

/// Static metadata for one category.
#[derive(Debug)]
pub struct CategoryInfo {
    pub category: Category,
    /// Wire identifier, e.g. `FLOCK_SAFETY`
    pub id: &'static str,
    /// Legacy tags that map onto this category
    pub aliases: &'static [&'static str],
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    /// ARGB, matching the sensor's LED colors
    pub color: u32,
    pub threat: ThreatLevel,
    pub ouis: &'static [[u8; 3]],
    /// Text handed to the text-to-speech collaborator
    pub voice: &'static str,
}

impl CategoryInfo {
    fn matches_tag(&self, tag: &str) -> bool {
        self.id.eq_ignore_ascii_case(tag)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(tag))
    }
}

impl Category {
    pub fn info(&self) -> &'static CategoryInfo {
        match self {
            Category::FlockSafety => &defaults::FLOCK_SAFETY,
            Category::Axon => &defaults::AXON,
            Category::Raven => &defaults::RAVEN,
            Category::Ring => &defaults::RING,
            Category::Cradlepoint => &defaults::CRADLEPOINT,
            Category::Drone => &defaults::DRONE,
            Category::NestGoogle => &defaults::NEST_GOOGLE,
            Category::Arlo => &defaults::ARLO,
            Category::Eufy => &defaults::EUFY,
            Category::Wyze => &defaults::WYZE,
            Category::Blink => &defaults::BLINK,
            Category::Unknown => &defaults::UNKNOWN,
        }
    }

    /// All categories, `Unknown` last.
    pub fn all() -> impl Iterator<Item = Category> {
        CATEGORIES.iter().map(|info| info.category)
    }

    pub fn id(&self) -> &'static str {
        self.info().id
    }

    pub fn name(&self) -> &'static str {
        self.info().name
    }

    pub fn icon(&self) -> &'static str {
        self.info().icon
    }

    pub fn threat_level(&self) -> ThreatLevel {
        self.info().threat
    }

    pub fn voice_announcement(&self) -> &'static str {
        self.info().voice
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a category tag (identifier or legacy alias, case-insensitive) to its
/// category. `UNKNOWN` and unrecognized tags return `None` so the caller
/// can fall back to the OUI table.
pub fn category_from_tag(tag: &str) -> Option<Category> {
    let tag = tag.trim();
    if tag.is_empty() {
        return None;
    }
    CATEGORIES
        .iter()
        .filter(|info| info.category != Category::Unknown)
        .find(|info| info.matches_tag(tag))
        .map(|info| info.category)
}

/// Look up an OUI in priority order. First table that contains it wins.
pub fn category_from_oui(oui: [u8; 3]) -> Option<Category> {
    OUI_LOOKUP_ORDER
        .iter()
        .find(|info| info.ouis.contains(&oui))
        .map(|info| info.category)
}

/// Classify by MAC address prefix alone.
pub fn category_from_mac(mac: &str) -> Category {
    parse_oui(mac)
        .and_then(category_from_oui)
        .unwrap_or(Category::Unknown)
}

/// Resolve a category: a recognized tag takes precedence over the MAC
/// prefix; neither resolving yields `Unknown`.
pub fn resolve(tag: Option<&str>, mac: &str) -> Category {
    tag.and_then(category_from_tag)
        .unwrap_or_else(|| category_from_mac(mac))
}

/// Resolve a decoded detection. `device_type` acts as a second tag, since
/// the sensor identifies gunshot detectors only through it.
pub fn resolve_detection(event: &DetectionEvent) -> Category {
    event
        .device_category_tag
        .as_deref()
        .and_then(category_from_tag)
        .or_else(|| event.device_type.as_deref().and_then(category_from_tag))
        .unwrap_or_else(|| category_from_mac(&event.mac))
}

/// Threat level of a category (pure table read).
pub fn threat_level(category: Category) -> ThreatLevel {
    category.threat_level()
}

/// Normalize a MAC address for use as a store key: trimmed, uppercase,
/// `-` separators rewritten to `:`. Returns `None` for empty input or
/// input too long to be a MAC address.
pub fn normalize_mac(mac: &str) -> Option<MacString> {
    let mac = mac.trim();
    if mac.is_empty() {
        return None;
    }
    let mut out = MacString::new();
    for c in mac.chars() {
        let c = if c == '-' { ':' } else { c.to_ascii_uppercase() };
        out.push(c).ok()?;
    }
    Some(out)
}

/// Parse the first three octets of a MAC address.
///
/// Accepts `:` or `-` separated forms and bare hex (`AABBCC112233`).
pub fn parse_oui(mac: &str) -> Option<[u8; 3]> {
    let mac = mac.trim();
    let mut oui = [0u8; 3];
    if mac.contains(':') || mac.contains('-') {
        let mut parts = mac.split(|c: char| c == ':' || c == '-');
        for byte in oui.iter_mut() {
            *byte = parse_octet(parts.next()?)?;
        }
    } else {
        for (i, byte) in oui.iter_mut().enumerate() {
            *byte = parse_octet(mac.get(i * 2..i * 2 + 2)?)?;
        }
    }
    Some(oui)
}

fn parse_octet(s: &str) -> Option<u8> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(s, 16).ok()
}
