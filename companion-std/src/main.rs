//! flocktrack host companion
//!
//! Feeds a captured sensor byte stream (a file or stdin) through a
//! `SensorLink` in transport-sized chunks, logs every detection and alert,
//! and saves the store on EOF. A reader thread hands chunks to the link
//! over a bounded `std::sync::mpsc` channel.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context};
use clap::Parser;

use flocktrack::config::CompanionConfig;
use flocktrack::export::{self, ExportKind};
use flocktrack::link::{LinkEvent, SensorLink};
use flocktrack::protocol::VERSION;
use flocktrack::store::{now_ms, DetectionStore, GeoFix, StoreEvent};

#[derive(Parser)]
#[command(author, version, about = "Replay a sensor capture through the detection core")]
struct Args {
    /// Capture file with raw sensor output; stdin if omitted
    input: Option<PathBuf>,
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the config's data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Bytes per transport chunk
    #[arg(long, default_value_t = 20)]
    chunk_size: usize,
    /// Fixed location for the whole capture, as LAT,LON
    #[arg(long)]
    fix: Option<String>,
    /// Add a MAC to the blocklist before replaying
    #[arg(long)]
    block: Vec<String>,
    /// Clear stored detections before replaying
    #[arg(long, default_value_t = false)]
    clear: bool,
    /// Write CSV and KML exports into this directory on exit
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

fn parse_fix(s: &str) -> anyhow::Result<GeoFix> {
    let Some((lat, lon)) = s.split_once(',') else {
        bail!("expected LAT,LON, got {s:?}");
    };
    Ok(GeoFix {
        lat: lat.trim().parse().context("latitude")?,
        lon: lon.trim().parse().context("longitude")?,
        timestamp: now_ms(),
    })
}

/// Reader thread: push fixed-size chunks until EOF.
fn spawn_reader(
    mut source: Box<dyn Read + Send>,
    chunk_size: usize,
    tx: SyncSender<Vec<u8>>,
) -> thread::JoinHandle<io::Result<u64>> {
    thread::spawn(move || {
        let mut buf = vec![0u8; chunk_size];
        let mut total = 0u64;
        loop {
            let n = match source.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            total += n as u64;
            if tx.send(buf[..n].to_vec()).is_err() {
                return Ok(total);
            }
        }
    })
}

fn log_event(event: &LinkEvent) {
    match event {
        LinkEvent::Detection {
            record,
            category,
            alert: Some(alert),
        } => {
            log::warn!("{}", alert.message());
            log::info!("[{}] {} -> {}", category.threat_level(), record.mac, alert.voice);
        }
        LinkEvent::Detection {
            record, category, ..
        } => log::info!("{} {} seen {}x", category.name(), record.mac, record.count),
        LinkEvent::Blocked { mac } => log::debug!("Ignored blocklisted {}", mac),
        LinkEvent::Legacy {
            raw,
            is_alert: true,
            ..
        } => log::warn!("{}", raw),
        _ => {}
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("flocktrack v{} starting", VERSION);

    let mut config = match &args.config {
        Some(path) => CompanionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CompanionConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }
    if args.chunk_size == 0 {
        bail!("--chunk-size must be positive");
    }

    // ── Store ────────────────────────────────────────────────────────

    let store = Arc::new(DetectionStore::from_config(&config, now_ms()));
    store.load();
    if let Err(e) = store.load_blocklist() {
        log::warn!("Blocklist not loaded: {}", e);
    }
    if args.clear {
        store.clear(now_ms());
    }
    if !args.block.is_empty() {
        for mac in &args.block {
            if !store.add_to_blocklist(mac) {
                log::warn!("Not blocking {:?}: already blocked or not a MAC", mac);
            }
        }
        store.save_blocklist().context("saving blocklist")?;
    }
    store.subscribe(|event| {
        if let StoreEvent::Updated(record) = event {
            if record.count == 1 {
                log::debug!("New device {}", record.mac);
            }
        }
    });

    // ── Link ─────────────────────────────────────────────────────────

    let mut link = SensorLink::new(Arc::clone(&store), &config);
    if let Some(fix) = &args.fix {
        link.update_location(parse_fix(fix)?);
    }

    let source: Box<dyn Read + Send> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(io::stdin()),
    };

    let (tx, rx) = mpsc::sync_channel::<Vec<u8>>(16);
    let reader = spawn_reader(source, args.chunk_size, tx);

    for chunk in rx {
        for event in link.on_chunk(&chunk, now_ms()) {
            log_event(&event);
        }
    }

    let bytes = match reader.join() {
        Ok(result) => result.context("reading input")?,
        Err(_) => bail!("reader thread panicked"),
    };

    // ── Teardown ─────────────────────────────────────────────────────

    let stats = store.session_stats();
    log::info!(
        "Read {} bytes: {} detections from {} devices this session ({} devices stored)",
        bytes,
        stats.session_total,
        stats.session_unique,
        stats.lifetime_unique
    );
    store.save();

    if let Some(dir) = &args.export_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let records = store.records();
        let stamp = now_ms();
        let csv_path = dir.join(export::export_file_name(ExportKind::Csv, stamp));
        fs::write(&csv_path, export::to_csv(&records))
            .with_context(|| format!("writing {}", csv_path.display()))?;
        let kml_path = dir.join(export::export_file_name(ExportKind::Kml, stamp));
        fs::write(&kml_path, export::to_kml(&records, &store.route_points()))
            .with_context(|| format!("writing {}", kml_path.display()))?;
        log::info!("Exported {} and {}", csv_path.display(), kml_path.display());
    }

    Ok(())
}
