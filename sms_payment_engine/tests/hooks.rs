use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
    Mutex,
};

use log::*;
use sms_payment_engine::{
    db_types::{OrderId, Provider},
    events::{EventHandlers, EventHooks},
    EngineConfig,
};
use tokio::runtime::Runtime;

use crate::support::prepare_env::{bkash_message, order_aged, setup, tear_down};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::SeqCst)
    }
}

#[test]
fn on_order_paid() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let event_copy = event.clone();
    let paid_ids = Arc::new(Mutex::new(Vec::new()));
    let ids_copy = Arc::clone(&paid_ids);
    rt.block_on(async move {
        let mut hooks = EventHooks::default();
        hooks.on_order_paid(move |ev| {
            info!("🪝️ {:?}", ev.order);
            event_copy.called();
            ids_copy.lock().unwrap().push(ev.order.order_id.clone());
            Box::pin(async {})
        });
        let handlers = EventHandlers::new(EngineConfig::default().event_buffer_size, hooks);
        let (api, orders) = setup(handlers.producers()).await;
        handlers.start_handlers().await;

        order_aged(&orders, "8001", 500, Provider::Bkash, 60).await;
        let _ = api.process_message(&bkash_message(500, "BKHOOK00001"), "bKash").await.unwrap();
        // No pending order, so no order is paid
        let _ = api.process_message(&bkash_message(500, "BKHOOK00002"), "bKash").await.unwrap();
        // Duplicates publish nothing
        let _ = api.process_message(&bkash_message(500, "BKHOOK00001"), "bKash").await.unwrap();
        tear_down(api).await;
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    });
    assert_eq!(event.count(), 1);
    assert_eq!(*paid_ids.lock().unwrap(), vec![OrderId::from("8001")]);
    info!("🪝️ test complete");
}

#[test]
fn on_transaction_processed() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let matched = HookCalled::default();
    let (event_copy, matched_copy) = (event.clone(), matched.clone());
    rt.block_on(async move {
        let mut hooks = EventHooks::default();
        hooks.on_transaction_processed(move |ev| {
            info!("🪝️ Transaction {} processed. Matched: {}", ev.transaction_id, ev.matched);
            event_copy.called();
            if ev.matched {
                assert!(ev.order.is_some());
                matched_copy.called();
            }
            Box::pin(async {})
        });
        let handlers = EventHandlers::new(EngineConfig::default().event_buffer_size, hooks);
        let (api, orders) = setup(handlers.producers()).await;
        handlers.start_handlers().await;

        order_aged(&orders, "9001", 500, Provider::Bkash, 60).await;
        let _ = api.process_message(&bkash_message(500, "BKHOOK00003"), "bKash").await.unwrap();
        let _ = api.process_message(&bkash_message(800, "BKHOOK00004"), "bKash").await.unwrap();
        let _ = api.process_message(&bkash_message(800, "BKHOOK00004"), "bKash").await.unwrap();
        let _ = api.process_message("Your bKash OTP is 123456", "bKash").await.unwrap();
        tear_down(api).await;
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    });
    assert_eq!(event.count(), 2);
    assert_eq!(matched.count(), 1);
    info!("🪝️ test complete");
}
