/// CSV and KML renderings of a store snapshot.
///
/// Pure string builders; writing the result to disk is the host's job.

use core::fmt::Write;

use chrono::{TimeZone, Utc};

use crate::store::{DetectionRecord, RoutePoint};

pub const CSV_HEADER: &str = concat!(
    "MAC,Count,FirstSeen,LastSeen,LastRSSI,Latitude,Longitude,",
    "Manufacturer,DeviceName,Category,ThreatLevel"
);

const FILE_PREFIX: &str = "flockyou_export_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Csv,
    Kml,
}

impl ExportKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportKind::Csv => "csv",
            ExportKind::Kml => "kml",
        }
    }
}

/// `flockyou_export_<yyyyMMdd_HHmmss>.<ext>` for a UTC timestamp in ms.
pub fn export_file_name(kind: ExportKind, timestamp_ms: u64) -> String {
    let stamp = i64::try_from(timestamp_ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_default();
    format!(
        "{}{}.{}",
        FILE_PREFIX,
        stamp.format("%Y%m%d_%H%M%S"),
        kind.extension()
    )
}

/// One header line plus one line per record. Text columns are always
/// quoted with embedded quotes doubled.
pub fn to_csv(records: &[DetectionRecord]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + records.len() * 96);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for r in records {
        let _ = write!(
            out,
            "{},{},{},{},{},{},{},",
            r.mac,
            r.count,
            r.first_seen,
            r.last_seen,
            r.last_rssi,
            opt_num(r.last_lat),
            opt_num(r.last_lon),
        );
        push_quoted(&mut out, r.manufacturer.as_deref().unwrap_or(""));
        out.push(',');
        push_quoted(&mut out, r.device_name.as_deref().unwrap_or(""));
        out.push(',');
        push_quoted(&mut out, r.category_tag.as_deref().unwrap_or(""));
        out.push(',');
        push_quoted(&mut out, r.threat_level.map_or("", |t| t.as_str()));
        out.push('\n');
    }
    out
}

fn opt_num(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

/// KML document with a placemark per located record and, when at least two
/// route points exist, the route as a `LineString`.
pub fn to_kml(records: &[DetectionRecord], route: &[RoutePoint]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n");
    out.push_str("<Document>\n");
    out.push_str("  <name>Flock-You Detections</name>\n");
    out.push_str("  <description>Surveillance device detections</description>\n");
    out.push_str("  <Style id=\"detection\">\n");
    out.push_str("    <IconStyle><color>ff0000ff</color><scale>1.0</scale></IconStyle>\n");
    out.push_str("  </Style>\n");

    for r in records {
        let Some((lat, lon)) = r.location() else {
            continue;
        };
        let name = r.manufacturer.as_deref().unwrap_or(r.mac.as_str());
        let category = r.category_tag.as_deref().unwrap_or("Unknown");
        let _ = write!(
            out,
            "  <Placemark>\n    <name>{}</name>\n    <description><![CDATA[\n",
            xml_escape(name)
        );
        let _ = write!(
            out,
            concat!(
                "      MAC: {}<br/>\n      Count: {}<br/>\n",
                "      Category: {}<br/>\n      RSSI: {} dBm<br/>\n"
            ),
            r.mac,
            r.count,
            cdata_safe(category),
            r.last_rssi
        );
        out.push_str("    ]]></description>\n");
        out.push_str("    <styleUrl>#detection</styleUrl>\n");
        let _ = writeln!(
            out,
            "    <Point>\n      <coordinates>{},{},0</coordinates>\n    </Point>",
            lon, lat
        );
        out.push_str("  </Placemark>\n");
    }

    if route.len() > 1 {
        out.push_str("  <Placemark>\n");
        out.push_str("    <name>Route</name>\n");
        out.push_str(
            "    <Style><LineStyle><color>ff00ff00</color><width>3</width></LineStyle></Style>\n",
        );
        out.push_str("    <LineString>\n      <coordinates>\n");
        for p in route {
            let _ = writeln!(out, "        {},{},0", p.lon, p.lat);
        }
        out.push_str("      </coordinates>\n    </LineString>\n");
        out.push_str("  </Placemark>\n");
    }

    out.push_str("</Document>\n</kml>\n");
    out
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Split any `]]>` so text cannot terminate the enclosing CDATA section.
fn cdata_safe(s: &str) -> String {
    s.replace("]]>", "]]]]><![CDATA[>")
}
