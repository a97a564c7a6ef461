use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::{tempdir, TempDir};
use tokio::sync::watch;

use dealgate_core::deals::DealPatch;
use dealgate_core::deliverables::{DeliverableGenerator, DeliverableStatus, GenerationJob};
use dealgate_core::{Deal, Journey, Result};
use dealgate_server::config::{Config, LogFormat};
use dealgate_server::dispatcher::{start_dispatcher, sweep};
use dealgate_server::{build_state, build_state_with_generator, AppState};

fn test_config(dir: &TempDir, interval_ms: u64) -> Config {
    Config {
        db_path: dir.path().join("dispatch.db").to_string_lossy().into_owned(),
        dispatch_interval: Duration::from_millis(interval_ms),
        dispatch_batch: 10,
        generation_timeout: Duration::from_secs(600),
        log_format: LogFormat::Text,
    }
}

async fn funded_sell_deal(state: &AppState) -> Deal {
    let deal = state
        .deal_service
        .create_deal(
            1,
            Journey::Sell,
            Some(DealPatch {
                industry: Some("Residential HVAC".into()),
                revenue_cents: Some(95_000_000),
                sde_cents: Some(24_000_000),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    state
        .wallet_service
        .credit(1, 50_000, "Top-up", Some("pi_dispatch"))
        .await
        .unwrap();
    deal
}

/// Counts generator calls so duplicate deliveries can be detected.
#[derive(Default)]
struct CountingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl DeliverableGenerator for CountingGenerator {
    async fn generate(&self, job: &GenerationJob, _deal: &Deal) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} body", job.item_ref))
    }
}

#[tokio::test]
async fn purchase_is_generated_in_the_background() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir, 50);
    let (state, jobs) = build_state(&config).await.unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = start_dispatcher(
        state.deliverable_service.clone(),
        jobs,
        config.dispatch_interval,
        config.dispatch_batch,
        config.generation_timeout,
        shutdown_rx,
    );

    let deal = funded_sell_deal(&state).await;
    let receipt = state
        .purchase_service
        .purchase(1, deal.id, "teaser")
        .await
        .unwrap();
    assert_eq!(receipt.status, DeliverableStatus::Queued);

    let mut settled = None;
    for _ in 0..100 {
        let d = state.deliverable_service.get(receipt.deliverable_id).unwrap();
        if d.status.is_terminal() {
            settled = Some(d);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let settled = settled.expect("deliverable never settled");
    assert_eq!(settled.status, DeliverableStatus::Complete);
    assert!(settled.content.unwrap().starts_with("# Blind Teaser"));
    assert!(state
        .deal_service
        .get_deal(deal.id)
        .unwrap()
        .financials
        .has("teaser_generated"));

    shutdown_tx.send(true).unwrap();
    dispatcher.await.unwrap();
}

#[tokio::test]
async fn repeated_delivery_generates_once() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir, 60_000);
    let generator = Arc::new(CountingGenerator::default());
    let (state, mut jobs) = build_state_with_generator(&config, generator.clone())
        .await
        .unwrap();

    let deal = funded_sell_deal(&state).await;
    let receipt = state
        .purchase_service
        .purchase(1, deal.id, "buyer_list")
        .await
        .unwrap();

    // The purchase enqueued one job; a sweep and a replay of that job race it.
    let job = jobs.recv().await.unwrap();
    assert_eq!(job.deliverable_id, receipt.deliverable_id);
    let service = state.deliverable_service.as_ref();
    assert_eq!(sweep(service, 10, config.generation_timeout).await, 1);
    assert_eq!(sweep(service, 10, config.generation_timeout).await, 0);
    assert!(service.process(job.deliverable_id).await.unwrap().is_none());

    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        service.get(receipt.deliverable_id).unwrap().status,
        DeliverableStatus::Complete
    );
}

#[tokio::test]
async fn abandoned_generation_is_picked_up_again() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir, 60_000);
    let generator = Arc::new(CountingGenerator::default());
    let (state, mut jobs) = build_state_with_generator(&config, generator.clone())
        .await
        .unwrap();

    let deal = funded_sell_deal(&state).await;
    let receipt = state
        .purchase_service
        .purchase(1, deal.id, "teaser")
        .await
        .unwrap();
    jobs.recv().await.unwrap();

    // A worker claims the row and dies before settling it.
    let service = state.deliverable_service.as_ref();
    service.claim(receipt.deliverable_id).await.unwrap().unwrap();
    assert_eq!(sweep(service, 10, config.generation_timeout).await, 0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sweep(service, 10, Duration::from_millis(10)).await, 1);

    let settled = service.get(receipt.deliverable_id).unwrap();
    assert_eq!(settled.status, DeliverableStatus::Complete);
    assert_eq!(settled.attempts, 2);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert!(state
        .deal_service
        .get_deal(deal.id)
        .unwrap()
        .financials
        .has("teaser_generated"));
}
