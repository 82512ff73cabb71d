//! tollgate-daemon: the metered-access service daemon.
//!
//! Single OS process running a Tokio async runtime. Opens the accounting
//! database, builds the shared usage snapshot cache, and drives the four
//! periodic lifecycle jobs until shutdown.

mod config;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{error, info};

use tollgate_cache::SnapshotCache;
use tollgate_jobs::{JobSpec, Scheduler};
use tollgate_types::GIB;

use crate::config::DaemonConfig;

/// Job periods in seconds.
const DAILY_PERIOD_SECS: u64 = 86_400;
const HOURLY_PERIOD_SECS: u64 = 3_600;
const CHECK_PERIOD_SECS: u64 = 600;
const CLEAN_PERIOD_SECS: u64 = 604_800;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config first so tracing comes up at the configured level
    let config = DaemonConfig::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("tollgate={}", config.log.level).parse()?),
        )
        .init();

    info!("tollgate daemon starting");

    // Ensure data directory exists
    std::fs::create_dir_all(DaemonConfig::data_dir())?;

    // 2. Open database
    let db_path = config.db_path();
    let conn = tollgate_db::open(&db_path)?;
    info!("database open at {:?}", db_path);
    let db = Arc::new(Mutex::new(conn));

    // 3. Build the snapshot cache shared by reports and jobs
    let cache = Arc::new(SnapshotCache::new());

    // 4. Start the lifecycle job scheduler
    let mut scheduler = Scheduler::new();
    if config.scheduler.enabled {
        let grace = config.scheduler.grace_secs;
        let quota_per_class = config.billing.default_quota_gib * GIB;
        scheduler.spawn(daily_job(
            Arc::clone(&db),
            Arc::clone(&cache),
            quota_per_class,
            grace,
        ));
        scheduler.spawn(hourly_job(Arc::clone(&db), Arc::clone(&cache), grace));
        scheduler.spawn(check_job(Arc::clone(&db), Arc::clone(&cache), grace));
        scheduler.spawn(clean_job(Arc::clone(&db), grace));
    } else {
        info!("scheduler disabled by config");
    }

    // 5. Run until interrupted
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => error!("signal listener failed: {e}"),
    }

    // Graceful shutdown: let in-flight job runs finish
    scheduler.shutdown().await;

    info!("daemon stopped");
    Ok(())
}

type Db = Arc<Mutex<rusqlite::Connection>>;

fn daily_job(db: Db, cache: Arc<SnapshotCache>, quota_per_class: u64, grace: u64) -> JobSpec {
    JobSpec::new("daily", DAILY_PERIOD_SECS, grace.min(DAILY_PERIOD_SECS), move || {
        let db = Arc::clone(&db);
        let cache = Arc::clone(&cache);
        async move {
            let mut conn = db.lock().await;
            tollgate_jobs::daily::run(&mut conn, &cache, quota_per_class, unix_now());
        }
    })
}

fn hourly_job(db: Db, cache: Arc<SnapshotCache>, grace: u64) -> JobSpec {
    JobSpec::new("hourly", HOURLY_PERIOD_SECS, grace.min(HOURLY_PERIOD_SECS), move || {
        let db = Arc::clone(&db);
        let cache = Arc::clone(&cache);
        async move {
            let mut conn = db.lock().await;
            tollgate_jobs::hourly::run(&mut conn, &cache, unix_now());
        }
    })
}

fn check_job(db: Db, cache: Arc<SnapshotCache>, grace: u64) -> JobSpec {
    JobSpec::new("check", CHECK_PERIOD_SECS, grace.min(CHECK_PERIOD_SECS), move || {
        let db = Arc::clone(&db);
        let cache = Arc::clone(&cache);
        async move {
            let mut conn = db.lock().await;
            tollgate_jobs::check::run(&mut conn, &cache, unix_now());
        }
    })
}

fn clean_job(db: Db, grace: u64) -> JobSpec {
    JobSpec::new("clean", CLEAN_PERIOD_SECS, grace.min(CLEAN_PERIOD_SECS), move || {
        let db = Arc::clone(&db);
        async move {
            let mut conn = db.lock().await;
            tollgate_jobs::clean::run(&mut conn, unix_now());
        }
    })
}
