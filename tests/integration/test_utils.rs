//! Shared fixtures for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use vision::admin::{AdminEvent, AdminEventBus, AdminService, CommandDispatcher};
use vision::bus::InProcessBus;
use vision::store::{DurableStore, MemoryStore};
use vision::types::Clock;

/// Clock under test control, in milliseconds since epoch.
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn at(millis: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(millis)))
    }

    pub fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[allow(dead_code)]
pub struct AdminFixture {
    pub store: Arc<MemoryStore>,
    pub bus: InProcessBus,
    pub admin: AdminService,
    pub events: Receiver<AdminEvent>,
}

/// Admin service over a memory store and an empty bus, defaults installed.
pub fn admin_fixture(clock: Arc<dyn Clock>) -> AdminFixture {
    let store = Arc::new(MemoryStore::new());
    let bus = InProcessBus::new();
    let shared: Arc<dyn DurableStore> = store.clone();
    let dispatcher = Arc::new(CommandDispatcher::new(shared.clone(), Arc::new(bus.clone())));
    let (events, receiver) = AdminEventBus::new_pair();
    let admin = AdminService::new(shared, dispatcher, clock, events);
    admin.install("admin123").unwrap();
    AdminFixture {
        store,
        bus,
        admin,
        events: receiver,
    }
}
