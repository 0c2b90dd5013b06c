//! Status Aggregator: latest heartbeat per student plus a staleness sweep.
//!
//! Records are keyed by `studentId` and overwritten on every report. The
//! sweep is purely observational: it announces inactive students and never
//! removes their records. Only `reset` deletes.

use crate::admin::events::{AdminEvent, AdminEventBus};
use crate::error::ApiError;
use crate::protocol::{keys, StatusReport, StudentStatusRecord};
use crate::store::{get_json, update_json, DurableStore};
use crate::types::Clock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// All records, keyed by student id.
pub type StatusTable = BTreeMap<String, StudentStatusRecord>;

/// A record flagged by the staleness sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InactiveStudent {
    pub student_id: String,
    pub idle_ms: u64,
    pub last_update: u64,
}

pub struct StatusAggregator {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    events: AdminEventBus,
}

impl StatusAggregator {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>, events: AdminEventBus) -> Self {
        Self {
            store,
            clock,
            events,
        }
    }

    /// Upsert the record for `report.student_id`, stamping `lastUpdate`.
    pub fn ingest(&self, report: StatusReport) -> Result<StudentStatusRecord, ApiError> {
        let record = StudentStatusRecord {
            report,
            last_update: self.clock.now_millis(),
        };
        let student_id = record.report.student_id.clone();
        update_json::<StatusTable, _>(self.store.as_ref(), keys::STUDENT_STATUSES, |table| {
            table.insert(student_id.clone(), record.clone());
        })?;
        debug!(student_id = %student_id, url = %record.report.url, "status ingested");
        self.events.emit(AdminEvent::StudentReported { student_id });
        Ok(record)
    }

    pub fn records(&self) -> Result<StatusTable, ApiError> {
        Ok(get_json(self.store.as_ref(), keys::STUDENT_STATUSES)?.unwrap_or_default())
    }

    /// Records whose last heartbeat is strictly older than `threshold_ms`.
    pub fn stale(&self, threshold_ms: u64) -> Result<Vec<InactiveStudent>, ApiError> {
        let now = self.clock.now_millis();
        Ok(self
            .records()?
            .into_iter()
            .filter_map(|(student_id, record)| {
                let idle_ms = now.saturating_sub(record.last_update);
                (idle_ms > threshold_ms).then_some(InactiveStudent {
                    student_id,
                    idle_ms,
                    last_update: record.last_update,
                })
            })
            .collect())
    }

    /// Flag stale records and announce each as `StudentInactive`.
    pub fn sweep_stale(&self, threshold_ms: u64) -> Result<Vec<InactiveStudent>, ApiError> {
        let inactive = self.stale(threshold_ms)?;
        for student in &inactive {
            info!(
                student_id = %student.student_id,
                idle_ms = student.idle_ms,
                "student inactive"
            );
            self.events.emit(AdminEvent::StudentInactive {
                student_id: student.student_id.clone(),
                idle_ms: student.idle_ms,
            });
        }
        Ok(inactive)
    }

    /// Drop every record.
    pub fn reset(&self) -> Result<(), ApiError> {
        self.store.remove(keys::STUDENT_STATUSES)?;
        info!("student statuses reset");
        Ok(())
    }

    fn monitoring_enabled(&self) -> Result<bool, ApiError> {
        Ok(get_json(self.store.as_ref(), keys::IS_MONITORING)?.unwrap_or(false))
    }

    /// Sweep every `interval` while monitoring is on, until `shutdown` flips
    /// to `true` or its sender is dropped.
    pub async fn run_sweeper(
        self: Arc<Self>,
        interval: Duration,
        threshold_ms: u64,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so a fresh sweeper
        // does not flag students that have not had a chance to report.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.monitoring_enabled() {
                        Ok(true) => {
                            if let Err(e) = self.sweep_stale(threshold_ms) {
                                warn!(error = %e, "staleness sweep failed");
                            }
                        }
                        Ok(false) => debug!("monitoring off, sweep skipped"),
                        Err(e) => warn!(error = %e, "could not read monitoring flag"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("sweeper stopped");
                        break;
                    }
                }
            }
        }
    }
}
