use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use dealgate_core::{
    deals::{DealService, DealServiceTrait},
    deliverables::{
        DeliverableGenerator, DeliverableService, DeliverableServiceTrait, GenerationJob,
        GenerationQueue, PurchaseService, PurchaseServiceTrait,
    },
    gates::{GateService, GateServiceTrait},
    wallet::{WalletService, WalletServiceTrait},
};
use dealgate_storage_sqlite::{
    db, DealRepository, DeliverableRepository, WalletRepository,
};

use crate::config::{Config, LogFormat};
use crate::dispatcher::ChannelQueue;
use crate::generator::BriefGenerator;

pub struct AppState {
    pub deal_service: Arc<dyn DealServiceTrait>,
    pub wallet_service: Arc<dyn WalletServiceTrait>,
    pub purchase_service: Arc<dyn PurchaseServiceTrait>,
    pub gate_service: Arc<dyn GateServiceTrait>,
    pub deliverable_service: Arc<dyn DeliverableServiceTrait>,
    pub db_path: String,
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

/// Opens the database and wires every service with the built-in generator.
/// The receiver feeds [`crate::dispatcher::start_dispatcher`].
pub async fn build_state(
    config: &Config,
) -> anyhow::Result<(Arc<AppState>, mpsc::UnboundedReceiver<GenerationJob>)> {
    build_state_with_generator(config, Arc::new(BriefGenerator)).await
}

pub async fn build_state_with_generator(
    config: &Config,
    generator: Arc<dyn DeliverableGenerator>,
) -> anyhow::Result<(Arc<AppState>, mpsc::UnboundedReceiver<GenerationJob>)> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let deal_repository = Arc::new(DealRepository::new(pool.clone(), writer.clone()));
    let wallet_repository = Arc::new(WalletRepository::new(pool.clone(), writer.clone()));
    let deliverable_repository = Arc::new(DeliverableRepository::new(pool, writer));

    let deal_service = Arc::new(DealService::new(deal_repository));
    let wallet_service = Arc::new(WalletService::new(wallet_repository));

    // Purchases notify the dispatcher; the dispatcher's sweep covers any
    // notification that gets lost.
    let (queue, jobs) = ChannelQueue::channel();
    let queue: Arc<dyn GenerationQueue> = Arc::new(queue);
    let purchase_service = Arc::new(PurchaseService::new(
        deal_service.clone(),
        deliverable_repository.clone(),
        Some(queue),
    ));
    let gate_service = Arc::new(GateService::new(
        deal_service.clone(),
        deliverable_repository.clone(),
        purchase_service.clone(),
    ));
    let deliverable_service = Arc::new(DeliverableService::new(
        deliverable_repository,
        deal_service.clone(),
        generator,
    ));

    let state = Arc::new(AppState {
        deal_service,
        wallet_service,
        purchase_service,
        gate_service,
        deliverable_service,
        db_path,
    });
    Ok((state, jobs))
}
