//! Site Block Registry: canonical block list and unblock-request queue.
//!
//! Every mutation is a single store transaction, so two administrators'
//! contexts blocking different sites at the same moment both land. Approve
//! removes the block entry and dequeues the request in one compound write;
//! there is no window where a pending request points at an already
//! unblocked site. Propagation to students happens after the commit.

use crate::admin::dispatcher::CommandDispatcher;
use crate::admin::events::{AdminEvent, AdminEventBus};
use crate::error::{ApiError, StorageError};
use crate::hostname::normalize_hostname;
use crate::protocol::{keys, Command, RequestStatus, UnblockRequest};
use crate::store::{decode_entry, encode_entry, get_json, DurableStore, Entries};
use crate::types::Clock;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SiteBlockRegistry {
    store: Arc<dyn DurableStore>,
    dispatcher: Arc<CommandDispatcher>,
    events: AdminEventBus,
    clock: Arc<dyn Clock>,
}

impl SiteBlockRegistry {
    pub fn new(
        store: Arc<dyn DurableStore>,
        dispatcher: Arc<CommandDispatcher>,
        events: AdminEventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            events,
            clock,
        }
    }

    /// Current block list.
    pub fn blocked_sites(&self) -> Result<Vec<String>, ApiError> {
        Ok(get_json(self.store.as_ref(), keys::BLOCKED_SITES)?.unwrap_or_default())
    }

    /// Current request queue, oldest first.
    pub fn unblock_requests(&self) -> Result<Vec<UnblockRequest>, ApiError> {
        Ok(get_json(self.store.as_ref(), keys::UNBLOCK_REQUESTS)?.unwrap_or_default())
    }

    /// Block the hostname of `url_or_domain`. Returns `false` (and does not
    /// propagate) when it was already blocked.
    pub fn block(&self, url_or_domain: &str) -> Result<bool, ApiError> {
        let domain = normalize_hostname(url_or_domain)?;
        let mut added = false;
        let committed = self.mutate(&[keys::BLOCKED_SITES], |entries| {
            let mut sites: Vec<String> = decode_entry(entries, keys::BLOCKED_SITES)?.unwrap_or_default();
            added = !sites.iter().any(|s| s == &domain);
            if added {
                sites.push(domain.clone());
                encode_entry(entries, keys::BLOCKED_SITES, &sites)?;
            }
            Ok(())
        })?;

        if !added {
            info!(domain = %domain, "site already blocked");
            return Ok(false);
        }
        info!(domain = %domain, "site blocked");
        self.propagate(&committed)?;
        Ok(true)
    }

    /// Remove every entry equal to `domain`. Returns `false` (and does not
    /// propagate) when nothing matched.
    pub fn unblock(&self, domain: &str) -> Result<bool, ApiError> {
        let domain = domain.trim().to_string();
        let mut removed = false;
        let committed = self.mutate(&[keys::BLOCKED_SITES], |entries| {
            let mut sites: Vec<String> = decode_entry(entries, keys::BLOCKED_SITES)?.unwrap_or_default();
            let before = sites.len();
            sites.retain(|s| s != &domain);
            removed = sites.len() != before;
            if removed {
                encode_entry(entries, keys::BLOCKED_SITES, &sites)?;
            }
            Ok(())
        })?;

        if !removed {
            info!(domain = %domain, "site was not blocked");
            return Ok(false);
        }
        info!(domain = %domain, "site unblocked");
        self.propagate(&committed)?;
        Ok(true)
    }

    /// Empty the block list and propagate the empty set.
    pub fn clear_all(&self) -> Result<(), ApiError> {
        let committed = self.mutate(&[keys::BLOCKED_SITES], |entries| {
            encode_entry(entries, keys::BLOCKED_SITES, &Vec::<String>::new())?;
            Ok(())
        })?;
        info!("all site blocks cleared");
        self.propagate(&committed)
    }

    /// Queue a student's unblock request.
    ///
    /// A second pending request for the same site is dropped silently and
    /// reported as `Ok(false)`; the first request wins.
    pub fn submit_unblock_request(&self, site: &str, reason: &str) -> Result<bool, ApiError> {
        let site = site.trim().to_string();
        let reason = reason.trim().to_string();
        if site.is_empty() {
            return Err(ApiError::InvalidUrl(site));
        }
        if reason.is_empty() {
            return Err(ApiError::EmptyReason);
        }

        let timestamp = self.clock.now_millis();
        let mut queued = false;
        self.mutate(&[keys::UNBLOCK_REQUESTS], |entries| {
            let mut requests: Vec<UnblockRequest> =
                decode_entry(entries, keys::UNBLOCK_REQUESTS)?.unwrap_or_default();
            queued = !requests.iter().any(|r| r.site == site && r.is_pending());
            if queued {
                requests.push(UnblockRequest {
                    site: site.clone(),
                    reason: reason.clone(),
                    timestamp,
                    status: RequestStatus::Pending,
                });
                encode_entry(entries, keys::UNBLOCK_REQUESTS, &requests)?;
            }
            Ok(())
        })?;

        if queued {
            info!(site = %site, "unblock request queued");
            self.events.emit(AdminEvent::UnblockRequested { site });
        } else {
            info!(site = %site, "duplicate unblock request ignored");
        }
        Ok(queued)
    }

    /// Approve the request at `index`: unblock its site and dequeue it in
    /// one write, then propagate. `Ok(None)` if there is no such request.
    pub fn approve(&self, index: usize) -> Result<Option<UnblockRequest>, ApiError> {
        let mut approved = None;
        let committed = self.mutate(&[keys::BLOCKED_SITES, keys::UNBLOCK_REQUESTS], |entries| {
            approved = None;
            let mut requests: Vec<UnblockRequest> =
                decode_entry(entries, keys::UNBLOCK_REQUESTS)?.unwrap_or_default();
            if index >= requests.len() {
                return Ok(());
            }
            let mut request = requests.remove(index);
            let mut sites: Vec<String> = decode_entry(entries, keys::BLOCKED_SITES)?.unwrap_or_default();
            sites.retain(|s| s != &request.site);
            encode_entry(entries, keys::BLOCKED_SITES, &sites)?;
            encode_entry(entries, keys::UNBLOCK_REQUESTS, &requests)?;
            request.status = RequestStatus::Approved;
            approved = Some(request);
            Ok(())
        })?;

        match &approved {
            Some(request) => {
                info!(site = %request.site, "unblock request approved");
                self.propagate(&committed)?;
            }
            None => warn!(index, "approve: no unblock request at index"),
        }
        Ok(approved)
    }

    /// Deny the request at `index`: dequeue it, block list untouched.
    /// `Ok(None)` if there is no such request.
    pub fn deny(&self, index: usize) -> Result<Option<UnblockRequest>, ApiError> {
        let mut denied = None;
        self.mutate(&[keys::UNBLOCK_REQUESTS], |entries| {
            denied = None;
            let mut requests: Vec<UnblockRequest> =
                decode_entry(entries, keys::UNBLOCK_REQUESTS)?.unwrap_or_default();
            if index >= requests.len() {
                return Ok(());
            }
            let mut request = requests.remove(index);
            encode_entry(entries, keys::UNBLOCK_REQUESTS, &requests)?;
            request.status = RequestStatus::Denied;
            denied = Some(request);
            Ok(())
        })?;

        match &denied {
            Some(request) => info!(site = %request.site, "unblock request denied"),
            None => warn!(index, "deny: no unblock request at index"),
        }
        Ok(denied)
    }

    /// Run a fallible edit inside one store transaction.
    fn mutate<F>(&self, watched: &[&str], mut edit: F) -> Result<Entries, ApiError>
    where
        F: FnMut(&mut Entries) -> Result<(), StorageError>,
    {
        let mut failure = None;
        let committed = self.store.transact(watched, &mut |entries| {
            failure = None;
            let snapshot = entries.clone();
            if let Err(e) = edit(entries) {
                // Leave the store untouched on a decode/encode failure.
                *entries = snapshot;
                failure = Some(e);
            }
        })?;
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(committed),
        }
    }

    /// Broadcast the committed block list to every student.
    fn propagate(&self, committed: &Entries) -> Result<(), ApiError> {
        let sites: Vec<String> = decode_entry(committed, keys::BLOCKED_SITES)?.unwrap_or_default();
        self.dispatcher.broadcast(&Command::UpdateBlocks { sites })?;
        Ok(())
    }
}
