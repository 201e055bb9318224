/// Detection aggregator: the per-device record store.
///
/// Merges decoded detections into one [`DetectionRecord`] per normalized MAC,
/// tracks session counters, owns the blocklist and the route trace, and
/// persists records and blocklist as JSON arrays. All state sits behind one
/// mutex; listeners are notified after it is released, so a listener may
/// call back into the store.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};

use crate::category::normalize_mac;
use crate::config::CompanionConfig;
use crate::error::{Error, Result};
use crate::protocol::{MacString, Protocol};
use crate::threat::ThreatLevel;

/// Milliseconds since the Unix epoch from the system clock.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A location fix from the host's positioning source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub lat: f64,
    pub lon: f64,
    /// Fix time, ms since epoch
    pub timestamp: u64,
}

/// One point of the traveled route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lon: f64,
}

/// Aggregated state for one device. Persisted with the companion app's
/// camelCase keys; absent optionals are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub mac: MacString,
    pub count: u32,
    pub first_seen: u64,
    pub last_seen: u64,
    pub last_rssi: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// Category identifier, e.g. `FLOCK_SAFETY`
    #[serde(
        rename = "deviceCategory",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub category_tag: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "threat_tag"
    )]
    pub threat_level: Option<ThreatLevel>,
}

impl DetectionRecord {
    fn new(mac: MacString, timestamp: u64) -> Self {
        Self {
            mac,
            count: 0,
            first_seen: timestamp,
            last_seen: timestamp,
            last_rssi: 0,
            last_lat: None,
            last_lon: None,
            manufacturer: None,
            device_name: None,
            category_tag: None,
            threat_level: None,
        }
    }

    /// Last known position as `(lat, lon)`, if any.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.last_lat.zip(self.last_lon)
    }
}

/// Stored threat tags are free text; anything unrecognized loads as `Unknown`.
fn threat_tag<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<ThreatLevel>, D::Error> {
    let tag = Option::<String>::deserialize(d)?;
    Ok(tag.map(|t| ThreatLevel::from_tag(&t)))
}

/// One detection to merge into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionInput {
    pub mac: String,
    pub rssi: i32,
    pub protocol: Protocol,
    /// Detection time, ms since epoch
    pub timestamp: u64,
    pub location: Option<GeoFix>,
    pub manufacturer: Option<String>,
    pub device_name: Option<String>,
    pub category_tag: Option<String>,
    pub threat_level: Option<ThreatLevel>,
}

/// Session and lifetime counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub session_start: u64,
    /// Distinct MACs seen this session
    pub session_unique: usize,
    /// Detections accepted this session
    pub session_total: u64,
    /// Distinct MACs in the store
    pub lifetime_unique: usize,
    /// Sum of all record counts
    pub lifetime_total: u64,
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Updated(DetectionRecord),
    Cleared,
    Loaded { records: usize },
}

/// Handle returned by [`DetectionStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

struct State {
    records: BTreeMap<MacString, DetectionRecord>,
    session_start: u64,
    session_unique: BTreeSet<MacString>,
    session_total: u64,
    blocklist: BTreeSet<MacString>,
    route: Vec<RoutePoint>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

/// Shared detection store. `Send + Sync`; share it with `Arc`.
pub struct DetectionStore {
    store_path: PathBuf,
    blocklist_path: PathBuf,
    state: Mutex<State>,
    /// Serializes file access so a clear cannot interleave with a save.
    /// Always taken before `state`.
    io: Mutex<()>,
}

impl DetectionStore {
    /// Empty store persisting to the given files. Nothing is read until
    /// [`load`](Self::load).
    pub fn new(
        store_path: impl Into<PathBuf>,
        blocklist_path: impl Into<PathBuf>,
        session_start: u64,
    ) -> Self {
        Self {
            store_path: store_path.into(),
            blocklist_path: blocklist_path.into(),
            state: Mutex::new(State {
                records: BTreeMap::new(),
                session_start,
                session_unique: BTreeSet::new(),
                session_total: 0,
                blocklist: BTreeSet::new(),
                route: Vec::new(),
                listeners: Vec::new(),
                next_listener: 0,
            }),
            io: Mutex::new(()),
        }
    }

    pub fn from_config(config: &CompanionConfig, session_start: u64) -> Self {
        Self::new(config.store_path(), config.blocklist_path(), session_start)
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn blocklist_path(&self) -> &Path {
        &self.blocklist_path
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_io(&self) -> MutexGuard<'_, ()> {
        self.io.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: StoreEvent) {
        let listeners: Vec<Listener> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            (*listener)(&event);
        }
    }

    // ── Aggregation ─────────────────────────────────────────────────

    /// Merge one detection. Returns the updated record, or `None` when the
    /// MAC is blocklisted (or not a usable address) and nothing changed.
    pub fn accept(&self, input: DetectionInput) -> Option<DetectionRecord> {
        let Some(mac) = normalize_mac(&input.mac) else {
            log::warn!("Dropping detection with unusable MAC {:?}", input.mac);
            return None;
        };

        let snapshot = {
            let mut state = self.lock();
            if state.blocklist.contains(&mac) {
                log::debug!("Blocked {} ({})", mac, input.protocol.as_str());
                return None;
            }

            let record = state
                .records
                .entry(mac.clone())
                .or_insert_with(|| DetectionRecord::new(mac.clone(), input.timestamp));
            record.count = record.count.saturating_add(1);
            record.last_seen = record.last_seen.max(input.timestamp);
            record.last_rssi = input.rssi;

            if let Some(m) = input.manufacturer.filter(|s| !s.is_empty()) {
                record.manufacturer = Some(m);
            }
            if let Some(n) = input.device_name.filter(|s| !s.is_empty()) {
                record.device_name = Some(n);
            }
            if let Some(c) = input.category_tag.filter(|s| !s.is_empty()) {
                record.category_tag = Some(c);
            }
            if let Some(t) = input.threat_level {
                record.threat_level = Some(t);
            }
            if let Some(fix) = input.location {
                record.last_lat = Some(fix.lat);
                record.last_lon = Some(fix.lon);
            }
            let snapshot = record.clone();

            state.session_unique.insert(mac);
            state.session_total += 1;
            snapshot
        };

        log::debug!(
            "Aggregated {} count={} rssi={}",
            snapshot.mac,
            snapshot.count,
            snapshot.last_rssi
        );
        self.notify(StoreEvent::Updated(snapshot.clone()));
        Some(snapshot)
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn get(&self, mac: &str) -> Option<DetectionRecord> {
        let mac = normalize_mac(mac)?;
        self.lock().records.get(&mac).cloned()
    }

    /// Snapshot of every record, sorted by MAC.
    pub fn records(&self) -> Vec<DetectionRecord> {
        self.lock().records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn session_stats(&self) -> SessionStats {
        let state = self.lock();
        SessionStats {
            session_start: state.session_start,
            session_unique: state.session_unique.len(),
            session_total: state.session_total,
            lifetime_unique: state.records.len(),
            lifetime_total: state.records.values().map(|r| u64::from(r.count)).sum(),
        }
    }

    /// Drop every record, the session counters and the route, then delete
    /// the persisted file. The blocklist is kept.
    pub fn clear(&self, now_ms: u64) {
        {
            let _io = self.lock_io();
            {
                let mut state = self.lock();
                state.records.clear();
                state.session_unique.clear();
                state.session_total = 0;
                state.session_start = now_ms;
                state.route.clear();
            }
            match fs::remove_file(&self.store_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to delete {}: {}", self.store_path.display(), e),
            }
        }
        log::info!("Detection store cleared");
        self.notify(StoreEvent::Cleared);
    }

    // ── Blocklist ───────────────────────────────────────────────────

    /// Returns false if the MAC was already blocked or is not usable.
    pub fn add_to_blocklist(&self, mac: &str) -> bool {
        match normalize_mac(mac) {
            Some(mac) => self.lock().blocklist.insert(mac),
            None => false,
        }
    }

    pub fn remove_from_blocklist(&self, mac: &str) -> bool {
        match normalize_mac(mac) {
            Some(mac) => self.lock().blocklist.remove(&mac),
            None => false,
        }
    }

    pub fn is_blocked(&self, mac: &str) -> bool {
        normalize_mac(mac).is_some_and(|mac| self.lock().blocklist.contains(&mac))
    }

    pub fn blocklist(&self) -> Vec<MacString> {
        self.lock().blocklist.iter().cloned().collect()
    }

    // ── Route ───────────────────────────────────────────────────────

    /// Append a route point unless it equals the last one. Returns whether
    /// a point was added.
    pub fn add_route_point(&self, lat: f64, lon: f64) -> bool {
        let point = RoutePoint { lat, lon };
        let mut state = self.lock();
        if state.route.last() == Some(&point) {
            return false;
        }
        state.route.push(point);
        true
    }

    pub fn route_points(&self) -> Vec<RoutePoint> {
        self.lock().route.clone()
    }

    // ── Listeners ───────────────────────────────────────────────────

    /// Register a listener. Listeners run in registration order on the
    /// thread that changed the store, after the store lock is released.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let mut state = self.lock();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut state = self.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(lid, _)| *lid != id);
        state.listeners.len() != before
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Replace the records with the persisted ones. A missing file loads as
    /// empty. A half-present location is dropped.
    pub fn try_load(&self) -> Result<usize> {
        let n = {
            let _io = self.lock_io();
            let records: Vec<DetectionRecord> = match read_json(&self.store_path) {
                Ok(records) => records,
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e),
            };
            let mut state = self.lock();
            state.records = records
                .into_iter()
                .filter_map(|mut r| {
                    let mac = normalize_mac(&r.mac)?;
                    r.mac = mac.clone();
                    if r.location().is_none() {
                        r.last_lat = None;
                        r.last_lon = None;
                    }
                    Some((mac, r))
                })
                .collect();
            state.records.len()
        };
        log::info!("Loaded {} detections from {}", n, self.store_path.display());
        self.notify(StoreEvent::Loaded { records: n });
        Ok(n)
    }

    /// Best-effort [`try_load`](Self::try_load): on failure the store is
    /// left empty and the error logged.
    pub fn load(&self) -> usize {
        match self.try_load() {
            Ok(n) => n,
            Err(e) => {
                log::warn!("Failed to load detections: {}", e);
                self.lock().records.clear();
                self.notify(StoreEvent::Loaded { records: 0 });
                0
            }
        }
    }

    /// Snapshot and write under the file lock, so a concurrent
    /// [`clear`](Self::clear) either precedes the snapshot or deletes the
    /// written file.
    pub fn try_save(&self) -> Result<()> {
        let _io = self.lock_io();
        let records = self.records();
        write_json(&self.store_path, &records)?;
        log::info!("Saved {} detections to {}", records.len(), self.store_path.display());
        Ok(())
    }

    /// Best-effort [`try_save`](Self::try_save). Memory stays authoritative.
    pub fn save(&self) -> bool {
        match self.try_save() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save detections: {}", e);
                false
            }
        }
    }

    /// Merge the persisted blocklist into the in-memory one.
    pub fn load_blocklist(&self) -> Result<usize> {
        let macs: Vec<String> = match read_json(&self.blocklist_path) {
            Ok(macs) => macs,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        let mut state = self.lock();
        state
            .blocklist
            .extend(macs.iter().filter_map(|m| normalize_mac(m)));
        log::info!("Blocklist holds {} devices", state.blocklist.len());
        Ok(state.blocklist.len())
    }

    pub fn save_blocklist(&self) -> Result<()> {
        write_json(&self.blocklist_path, &self.blocklist())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::json(path, e))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let bytes = serde_json::to_vec(value).map_err(|e| Error::json(path, e))?;
    fs::write(path, bytes).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MAC: &str = "AA:BB:CC:11:22:33";

    fn store_in(dir: &tempfile::TempDir) -> DetectionStore {
        DetectionStore::new(
            dir.path().join("detections.json"),
            dir.path().join("blocklist.json"),
            1_000,
        )
    }

    fn input(mac: &str, rssi: i32, timestamp: u64) -> DetectionInput {
        DetectionInput {
            mac: mac.into(),
            rssi,
            protocol: Protocol::Wifi,
            timestamp,
            location: None,
            manufacturer: None,
            device_name: None,
            category_tag: None,
            threat_level: None,
        }
    }

    // ── Aggregation ─────────────────────────────────────────────────

    #[test]
    fn first_accept_creates_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let rec = store.accept(input(MAC, -65, 5_000)).unwrap();
        assert_eq!(rec.mac.as_str(), MAC);
        assert_eq!(rec.count, 1);
        assert_eq!(rec.first_seen, 5_000);
        assert_eq!(rec.last_seen, 5_000);
        assert_eq!(rec.last_rssi, -65);
        assert_eq!(rec.location(), None);
    }

    #[test]
    fn three_accepts_with_late_location() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.accept(input(MAC, -70, 1_000));
        store.accept(input(MAC, -68, 2_000));
        let mut third = input(MAC, -60, 3_000);
        third.location = Some(GeoFix {
            lat: 37.7,
            lon: -122.4,
            timestamp: 2_900,
        });
        let rec = store.accept(third).unwrap();

        assert_eq!(rec.count, 3);
        assert_eq!(rec.first_seen, 1_000);
        assert_eq!(rec.last_seen, 3_000);
        assert_eq!(rec.last_rssi, -60);
        assert_eq!(rec.location(), Some((37.7, -122.4)));

        let stats = store.session_stats();
        assert_eq!(stats.session_unique, 1);
        assert_eq!(stats.session_total, 3);
        assert_eq!(stats.lifetime_unique, 1);
        assert_eq!(stats.lifetime_total, 3);
    }

    #[test]
    fn mac_is_normalized_for_keying() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.accept(input("aa:bb:cc:11:22:33", -70, 1));
        let rec = store.accept(input("AA-BB-CC-11-22-33", -70, 2)).unwrap();
        assert_eq!(rec.count, 2);
        assert_eq!(store.len(), 1);
        assert!(store.get("aa-bb-cc-11-22-33").is_some());
    }

    #[test]
    fn last_seen_never_decreases() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.accept(input(MAC, -70, 5_000));
        let rec = store.accept(input(MAC, -70, 4_000)).unwrap();
        assert_eq!(rec.last_seen, 5_000);
        assert!(rec.last_seen >= rec.first_seen);
        assert_eq!(rec.count, 2);
    }

    #[test]
    fn sparse_update_keeps_previous_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut first = input(MAC, -70, 1);
        first.manufacturer = Some("Flock Safety".into());
        first.device_name = Some("Flock-A1".into());
        first.category_tag = Some("FLOCK_SAFETY".into());
        first.threat_level = Some(ThreatLevel::High);
        first.location = Some(GeoFix {
            lat: 1.0,
            lon: 2.0,
            timestamp: 1,
        });
        store.accept(first);

        let mut second = input(MAC, -75, 2);
        second.manufacturer = Some(String::new());
        let rec = store.accept(second).unwrap();
        assert_eq!(rec.manufacturer.as_deref(), Some("Flock Safety"));
        assert_eq!(rec.device_name.as_deref(), Some("Flock-A1"));
        assert_eq!(rec.category_tag.as_deref(), Some("FLOCK_SAFETY"));
        assert_eq!(rec.threat_level, Some(ThreatLevel::High));
        assert_eq!(rec.location(), Some((1.0, 2.0)));
        assert_eq!(rec.last_rssi, -75);
    }

    #[test]
    fn present_values_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut first = input(MAC, -70, 1);
        first.device_name = Some("old".into());
        store.accept(first);
        let mut second = input(MAC, -70, 2);
        second.device_name = Some("new".into());
        let rec = store.accept(second).unwrap();
        assert_eq!(rec.device_name.as_deref(), Some("new"));
    }

    #[test]
    fn unusable_mac_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.accept(input("   ", -70, 1)).is_none());
        assert!(store.accept(input("AA:BB:CC:11:22:33:44:55", -70, 1)).is_none());
        assert!(store.is_empty());
        assert_eq!(store.session_stats().session_total, 0);
    }

    #[test]
    fn records_sorted_by_mac() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.accept(input("CC:00:00:00:00:01", -70, 1));
        store.accept(input("AA:00:00:00:00:01", -70, 1));
        store.accept(input("BB:00:00:00:00:01", -70, 1));
        let macs: Vec<String> = store.records().iter().map(|r| r.mac.to_string()).collect();
        assert_eq!(
            macs,
            vec!["AA:00:00:00:00:01", "BB:00:00:00:00:01", "CC:00:00:00:00:01"]
        );
    }

    #[test]
    fn concurrent_accepts_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.accept(input(MAC, -70, t * 1_000 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.get(MAC).unwrap().count, 200);
        assert_eq!(store.session_stats().session_total, 200);
    }

    // ── Blocklist ───────────────────────────────────────────────────

    #[test]
    fn blocked_mac_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.accept(input(MAC, -70, 1));
        assert!(store.add_to_blocklist("aa:bb:cc:11:22:33"));
        assert!(store.is_blocked(MAC));

        assert!(store.accept(input(MAC, -50, 2)).is_none());
        let rec = store.get(MAC).unwrap();
        assert_eq!(rec.count, 1);
        assert_eq!(rec.last_rssi, -70);
        assert_eq!(store.session_stats().session_total, 1);

        assert!(store.remove_from_blocklist(MAC));
        assert_eq!(store.accept(input(MAC, -50, 3)).unwrap().count, 2);
    }

    #[test]
    fn blocklist_round_trips_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.add_to_blocklist(MAC);
        store.add_to_blocklist("11:22:33:44:55:66");
        store.save_blocklist().unwrap();

        let fresh = store_in(&dir);
        fresh.add_to_blocklist("99:99:99:99:99:99");
        assert_eq!(fresh.load_blocklist().unwrap(), 3);
        assert!(fresh.is_blocked(MAC));
        assert!(fresh.is_blocked("11:22:33:44:55:66"));
    }

    #[test]
    fn missing_blocklist_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load_blocklist().unwrap(), 0);
    }

    // ── Clear ───────────────────────────────────────────────────────

    #[test]
    fn clear_resets_session_but_keeps_blocklist() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.accept(input(MAC, -70, 1));
        store.add_to_blocklist("11:22:33:44:55:66");
        store.add_route_point(1.0, 2.0);
        assert!(store.save());
        assert!(store.store_path().exists());

        store.clear(9_000);
        assert!(store.is_empty());
        assert!(store.route_points().is_empty());
        assert!(!store.store_path().exists());
        assert!(store.is_blocked("11:22:33:44:55:66"));
        let stats = store.session_stats();
        assert_eq!(stats.session_start, 9_000);
        assert_eq!(stats.session_unique, 0);
        assert_eq!(stats.session_total, 0);
    }

    #[test]
    fn clear_without_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.clear(2);
        assert!(store.is_empty());
    }

    #[test]
    fn clear_racing_save_leaves_nothing_to_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));
        for i in 0..20_000u32 {
            let mac = format!("02:00:{:02X}:{:02X}:{:02X}:01", i >> 16, (i >> 8) & 0xFF, i & 0xFF);
            store.accept(input(&mac, -70, 1));
        }

        let saver = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.save())
        };
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.clear(2);
        assert!(saver.join().unwrap());

        let fresh = store_in(&dir);
        assert_eq!(fresh.load(), 0);
        assert!(fresh.is_empty());
    }

    // ── Route ───────────────────────────────────────────────────────

    #[test]
    fn route_dedups_only_against_last_point() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.add_route_point(1.0, 1.0));
        assert!(!store.add_route_point(1.0, 1.0));
        assert!(store.add_route_point(2.0, 2.0));
        assert!(store.add_route_point(1.0, 1.0));
        assert_eq!(store.route_points().len(), 3);
    }

    // ── Listeners ───────────────────────────────────────────────────

    #[test]
    fn listeners_run_in_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            store.subscribe(move |_| order.lock().unwrap().push(tag));
        }
        store.accept(input(MAC, -70, 1));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn listener_sees_post_update_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        store.subscribe(move |ev| s.lock().unwrap().push(ev.clone()));
        store.accept(input(MAC, -70, 1));
        store.accept(input(MAC, -60, 2));
        store.clear(3);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        match &seen[1] {
            StoreEvent::Updated(rec) => {
                assert_eq!(rec.count, 2);
                assert_eq!(rec.last_rssi, -60);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(seen[2], StoreEvent::Cleared);
    }

    #[test]
    fn listener_may_reenter_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));
        let counts = Arc::new(Mutex::new(Vec::new()));
        let (s, c) = (Arc::clone(&store), Arc::clone(&counts));
        store.subscribe(move |ev| {
            if let StoreEvent::Updated(rec) = ev {
                let stored = s.get(rec.mac.as_str()).map(|r| r.count);
                c.lock().unwrap().push(stored);
            }
        });
        store.accept(input(MAC, -70, 1));
        assert_eq!(*counts.lock().unwrap(), vec![Some(1)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let id = store.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        store.accept(input(MAC, -70, 1));
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.accept(input(MAC, -70, 2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn blocked_accept_does_not_notify() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        store.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        store.add_to_blocklist(MAC);
        store.accept(input(MAC, -70, 1));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    // ── Persistence ─────────────────────────────────────────────────

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut a = input(MAC, -62, 10);
        a.manufacturer = Some("Flock Safety".into());
        a.category_tag = Some("FLOCK_SAFETY".into());
        a.threat_level = Some(ThreatLevel::High);
        a.location = Some(GeoFix {
            lat: 40.5,
            lon: -74.25,
            timestamp: 10,
        });
        store.accept(a);
        store.accept(input("11:22:33:44:55:66", -88, 20));
        store.try_save().unwrap();

        let fresh = store_in(&dir);
        assert_eq!(fresh.try_load().unwrap(), 2);
        assert_eq!(fresh.records(), store.records());
    }

    #[test]
    fn persisted_format_uses_camel_case_and_omits_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut a = input(MAC, -62, 10);
        a.category_tag = Some("RAVEN".into());
        a.threat_level = Some(ThreatLevel::Critical);
        store.accept(a);
        store.try_save().unwrap();

        let text = fs::read_to_string(store.store_path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        let obj = &v[0];
        assert_eq!(obj["mac"], MAC);
        assert_eq!(obj["count"], 1);
        assert_eq!(obj["firstSeen"], 10);
        assert_eq!(obj["lastSeen"], 10);
        assert_eq!(obj["lastRssi"], -62);
        assert_eq!(obj["deviceCategory"], "RAVEN");
        assert_eq!(obj["threatLevel"], "CRITICAL");
        assert!(obj.get("lastLat").is_none());
        assert!(obj.get("manufacturer").is_none());
    }

    #[test]
    fn loads_companion_app_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.store_path(),
            r#"[{"mac":"b4:1e:52:00:00:01","count":4,"firstSeen":1,"lastSeen":9,
                "lastRssi":-71,"lastLat":1.5,"lastLon":2.5,"threatLevel":"weird"}]"#,
        )
        .unwrap();
        assert_eq!(store.load(), 1);
        let rec = store.get("B4:1E:52:00:00:01").unwrap();
        assert_eq!(rec.count, 4);
        assert_eq!(rec.location(), Some((1.5, 2.5)));
        assert_eq!(rec.threat_level, Some(ThreatLevel::Unknown));
    }

    #[test]
    fn half_location_is_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.store_path(),
            r#"[{"mac":"AA:BB:CC:11:22:33","count":1,"firstSeen":1,"lastSeen":1,
                "lastRssi":-70,"lastLat":1.5},
               {"mac":"AA:BB:CC:11:22:34","count":1,"firstSeen":1,"lastSeen":1,
                "lastRssi":-70,"lastLon":2.5}]"#,
        )
        .unwrap();
        assert_eq!(store.load(), 2);
        for rec in store.records() {
            assert_eq!(rec.last_lat, None);
            assert_eq!(rec.last_lon, None);
        }
        let csv = crate::export::to_csv(&store.records());
        assert!(csv.contains("AA:BB:CC:11:22:33,1,1,1,-70,,,"));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.try_load().unwrap(), 0);
    }

    #[test]
    fn corrupt_file_leaves_store_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.accept(input(MAC, -70, 1));
        fs::write(store.store_path(), b"{not json").unwrap();
        assert!(matches!(store.try_load(), Err(Error::Json { .. })));
        assert_eq!(store.load(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn save_failure_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();
        let store = DetectionStore::new(
            blocker.join("detections.json"),
            dir.path().join("blocklist.json"),
            0,
        );
        store.accept(input(MAC, -70, 1));
        assert!(!store.save());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn load_notifies_listeners() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.accept(input(MAC, -70, 1));
        store.save();

        let fresh = store_in(&dir);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        fresh.subscribe(move |ev| s.lock().unwrap().push(ev.clone()));
        fresh.load();
        assert_eq!(*seen.lock().unwrap(), vec![StoreEvent::Loaded { records: 1 }]);
    }
}
