use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Args, Parser, Subcommand};
use leadpool::config::AppConfig;
use leadpool::domain::{
    DropReason, FollowUpRecord, Lead, LeadId, ReclaimInfo, Staff, StaffId, StaffRole,
};
use leadpool::engine::{
    recycle_router, Clock, RecycleCycle, RecycleScheduler, SchedulerConfig, SystemClock,
};
use leadpool::error::AppError;
use leadpool::memory::MemoryStore;
use leadpool::pool::{pool_router, PoolTransferService};
use leadpool::repository::{FollowUpStore, LeadStore};
use leadpool::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "leadpool",
    about = "Run the lead pool recycling engine and its HTTP surface",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and the daily recycling worker (default)
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Seed the in-memory store with demo staff and leads
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = Arc::new(MemoryStore::new());
    if args.seed_demo {
        seed_demo(&store)?;
        info!("demo data seeded");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let runner = Arc::new(RecycleCycle::new(Arc::clone(&store), Arc::clone(&clock)));
    let pool_service = Arc::new(PoolTransferService::new(
        Arc::clone(&store),
        Arc::clone(&clock),
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(pool_router(pool_service))
        .merge(recycle_router(Arc::clone(&runner), Arc::clone(&store)))
        .layer(prometheus_layer);

    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = if config.recycle.enabled {
        let scheduler = RecycleScheduler::new(
            Arc::clone(&runner),
            Arc::clone(&clock),
            SchedulerConfig {
                poll_interval: config.recycle.poll_interval,
                window_hour: config.recycle.window_hour,
                window_minutes: config.recycle.window_minutes,
            },
        );
        Some(tokio::spawn(scheduler.run(stop_rx)))
    } else {
        info!("recycle worker disabled by configuration");
        None
    };

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead pool service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the worker between cycles and wait for it before exiting.
    let _ = stop_tx.send(true);
    if let Some(handle) = worker {
        let _ = handle.await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Seeds a small org and lead book so the HTTP surface can be exercised
/// without a backing CRM.
fn seed_demo(store: &MemoryStore) -> Result<(), AppError> {
    let now = Utc::now();

    for (id, name, role) in [
        ("admin-1", "系统管理员", StaffRole::Admin),
        ("mgr-1", "销售主管", StaffRole::Manager),
        ("sales-1", "王敏", StaffRole::Sales),
        ("sales-2", "李强", StaffRole::Sales),
    ] {
        store.upsert_staff(Staff {
            id: StaffId(id.to_string()),
            name: name.to_string(),
            role,
            active: true,
        });
    }

    let leads = [
        // Assigned four days ago, never followed up: rule 1 candidate.
        Lead {
            id: LeadId("L-1001".to_string()),
            name: "陈晨".to_string(),
            phone: "13800001001".to_string(),
            source: "douyin".to_string(),
            status: "following".to_string(),
            level: "B".to_string(),
            owner: Some(StaffId("sales-1".to_string())),
            last_follow_up: None,
            created_at: Some(now - ChronoDuration::days(4)),
            updated_at: now - ChronoDuration::days(4),
            reclaim: None,
        },
        // Grade-A lead, silent for weeks but protected.
        Lead {
            id: LeadId("L-1002".to_string()),
            name: "刘洋".to_string(),
            phone: "13800001002".to_string(),
            source: "referral".to_string(),
            status: "following".to_string(),
            level: "A".to_string(),
            owner: Some(StaffId("sales-2".to_string())),
            last_follow_up: Some(now - ChronoDuration::days(30)),
            created_at: Some(now - ChronoDuration::days(40)),
            updated_at: now - ChronoDuration::days(30),
            reclaim: None,
        },
        // Already in the pool from an earlier manual drop.
        Lead {
            id: LeadId("L-1003".to_string()),
            name: "赵蕾".to_string(),
            phone: "13800001003".to_string(),
            source: "walk-in".to_string(),
            status: "new".to_string(),
            level: "C".to_string(),
            owner: None,
            last_follow_up: None,
            created_at: Some(now - ChronoDuration::days(10)),
            updated_at: now - ChronoDuration::days(2),
            reclaim: Some(ReclaimInfo {
                reason: DropReason::ManualReturn,
                dropped_at: now - ChronoDuration::days(2),
                previous_owner: "王敏".to_string(),
            }),
        },
    ];
    for lead in leads {
        store.insert_lead(lead).map_err(store_io_error)?;
    }

    store
        .insert_follow_up(FollowUpRecord {
            lead: LeadId("L-1002".to_string()),
            kind: "call".to_string(),
            content: "约看房，下周回复".to_string(),
            operator: "sales-2".to_string(),
            recorded_at: now - ChronoDuration::days(30),
        })
        .map_err(store_io_error)?;

    Ok(())
}

fn store_io_error(err: leadpool::repository::StoreError) -> AppError {
    AppError::Io(std::io::Error::other(err.to_string()))
}
