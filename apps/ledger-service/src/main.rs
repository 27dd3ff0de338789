//! # Detail Ledger Service Binary
//!
//! Startup health check and refund reconciliation pass.
//!
//! ## Usage
//! ```bash
//! # One reconciliation pass, then exit
//! ledger-service
//!
//! # Keep reconciling every 60 seconds
//! ledger-service --watch 60
//!
//! # Custom config file
//! ledger-service --config ./ledger.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use ledger_core::{Role, Session};
use ledger_db::{Database, DbConfig};
use ledger_service::commands::refund::reconcile_refunds;
use ledger_service::config::ServiceConfig;
use ledger_service::gateway::HttpGateway;
use ledger_service::{init_tracing, AppContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut watch: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "-w" | "--watch" => {
                if i + 1 < args.len() {
                    watch = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("Detail Ledger Service");
                println!();
                println!("Usage: ledger-service [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -w, --watch <SECS>    Reconcile every SECS seconds instead of once");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!("Starting Detail Ledger service");

    let config = ServiceConfig::load(config_path)?;
    let db_path = config.resolve_database_path()?;
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path)).await?;
    let (applied, total) = db.migration_status().await?;
    info!(applied, total, "Database connected and migrations applied");

    let unresolved = db.refund_outbox().count_unresolved().await?;
    if unresolved > 0 {
        warn!(unresolved, "Refunds awaiting reconciliation");
    }

    let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
    let ctx = AppContext::new(db, config, gateway);
    let system = Session::new("system:reconcile", Role::Admin);

    loop {
        match reconcile_refunds(&ctx, &system).await {
            Ok(report) => info!(?report, "Reconciliation pass complete"),
            Err(e) => error!(error = %e, "Reconciliation pass failed"),
        }

        let Some(secs) = watch else { break };
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    ctx.database().close().await;
    Ok(())
}
