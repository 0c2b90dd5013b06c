//! Property-based tests for block-list invariants

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use vision::admin::{AdminEventBus, CommandDispatcher, SiteBlockRegistry};
use vision::bus::InProcessBus;
use vision::store::{DurableStore, MemoryStore};
use vision::types::SystemClock;

fn registry() -> SiteBlockRegistry {
    let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(CommandDispatcher::new(
        store.clone(),
        Arc::new(InProcessBus::new()),
    ));
    let (events, _rx) = AdminEventBus::new_pair();
    SiteBlockRegistry::new(store, dispatcher, events, Arc::new(SystemClock))
}

fn domain() -> impl Strategy<Value = String> {
    "[a-z]{1,8}\\.(com|org|example)"
}

/// Whatever sequence of blocks and unblocks, the list never holds duplicates
/// and matches a set model.
#[test]
fn test_block_list_matches_set_model() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::vec((any::<bool>(), domain()), 0..40),
            |ops| {
                let registry = registry();
                let mut model = BTreeSet::new();
                for (is_block, site) in ops {
                    if is_block {
                        let added = registry.block(&site).unwrap();
                        prop_assert_eq!(added, model.insert(site.clone()));
                    } else {
                        let removed = registry.unblock(&site).unwrap();
                        prop_assert_eq!(removed, model.remove(&site));
                    }
                }

                let sites = registry.blocked_sites().unwrap();
                let unique: BTreeSet<_> = sites.iter().cloned().collect();
                prop_assert_eq!(unique.len(), sites.len());
                prop_assert_eq!(unique, model);
                Ok(())
            },
        )
        .unwrap();
}

/// Blocking a new site then unblocking it restores the previous list.
#[test]
fn test_block_then_unblock_restores_list() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec(domain(), 0..10), domain()),
            |(existing, extra)| {
                let registry = registry();
                for site in &existing {
                    registry.block(site).unwrap();
                }
                prop_assume!(!existing.contains(&extra));

                let before = registry.blocked_sites().unwrap();
                registry.block(&extra).unwrap();
                registry.unblock(&extra).unwrap();
                prop_assert_eq!(registry.blocked_sites().unwrap(), before);
                Ok(())
            },
        )
        .unwrap();
}
