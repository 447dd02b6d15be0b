use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use ledger_engine::{
    db_types::OrderStatusType,
    events::{EventHandlers, EventHooks, OrderCancelledEvent},
    CancellationApi,
    CancellationOptions,
    SideEffectDispatcher,
};
use log::*;
use tokio::runtime::Runtime;

use crate::support::{
    prepare_env::{prepare_test_env, tear_down},
    seed_o1,
    CLIENT,
};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
    events: Arc<Mutex<Vec<OrderCancelledEvent>>>,
}

impl HookCalled {
    pub fn called(&self, event: OrderCancelledEvent) {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::SeqCst)
    }
}

#[test]
fn on_order_cancelled() {
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let event_copy = event.clone();
    rt.block_on(async move {
        let db = prepare_test_env().await;
        let fixture = seed_o1(&db).await;
        let mut hooks = EventHooks::default();
        hooks.on_order_cancelled(move |ev| {
            info!("🪝️ {ev:?}");
            event_copy.called(ev);
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let handlers = EventHandlers::new(8, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;
        let dispatcher = SideEffectDispatcher::new(db.clone(), db.clone());
        let api = CancellationApi::new(db.clone(), dispatcher, producers, CancellationOptions::default());

        api.cancel_order(&fixture.order.id, CLIENT, Some("found someone cheaper")).await.expect("Cancellation failed");
        // A repeat call changes nothing, so it must not fire the hook again
        api.cancel_order(&fixture.order.id, CLIENT, Some("found someone cheaper")).await.expect("Cancellation failed");
        tokio::time::sleep(Duration::from_millis(250)).await;
        drop(api);
        tear_down(db).await;
    });
    assert_eq!(event.count(), 1);
    let events = event.events.lock().unwrap();
    let ev = &events[0];
    assert_eq!(ev.order.status, OrderStatusType::Cancelled);
    assert_eq!(ev.initiator_id, CLIENT);
    assert_eq!(ev.reason, "found someone cheaper");
    assert_eq!(ev.details.transactions_processed, 1);
    info!("🪝️ test complete");
}
