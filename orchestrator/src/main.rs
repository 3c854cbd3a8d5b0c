//! Engine runtime: wires the stores together, runs the package-expiry
//! sweep, and waits for shutdown.

use std::sync::Arc;
use std::time::Duration;

use booking_engine::{BookingEngine, FallbackRoomProvisioner, SessionStore, SlotBoard};
use chrono::Utc;
use core_types::EngineConfig;
use ledger::{LedgerStore, WalletController};
use log::{info, warn};
use pricing::{MentorCatalog, PricingResolver, StaticCatalog};
use session_inventory::PackageInventory;

const FRONTEND_URL: &str = "https://app.example.com";

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match EngineConfig::load() {
        Ok(config) => config,
        Err(err) => {
            warn!("config load failed ({err}), using defaults");
            EngineConfig::default()
        }
    };

    let ledger = Arc::new(LedgerStore::new());
    let inventory = Arc::new(PackageInventory::new());
    let catalog = Arc::new(StaticCatalog::new());
    let slots = Arc::new(SlotBoard::new());
    let sessions = Arc::new(SessionStore::new());
    let resolver = Arc::new(PricingResolver::new(
        catalog.clone() as Arc<dyn MentorCatalog>,
        inventory.clone(),
        ledger.clone(),
        config.pricing.clone(),
    ));
    let _wallets = WalletController::new(ledger.clone());
    let _engine = BookingEngine::new(
        ledger,
        inventory.clone(),
        resolver,
        slots,
        sessions,
        Arc::new(FallbackRoomProvisioner::new(FRONTEND_URL)),
        FallbackRoomProvisioner::new(FRONTEND_URL),
        &config,
    );

    let sweep_interval = Duration::from_secs(config.inventory.sweep_interval_s);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let swept = inventory.expire_overdue(Utc::now());
            if !swept.is_empty() {
                info!("expired {} overdue package(s)", swept.len());
            }
        }
    });

    info!("booking engine up, sweep interval {}s", sweep_interval.as_secs());
    tokio::signal::ctrl_c().await.expect("shutdown signal");
    info!("shutting down");
}
