//! Administrator side: block registry, command fan-out, status aggregation
//! and the service that ties them to the upstream channel.

pub mod aggregator;
pub mod dispatcher;
pub mod events;
pub mod registry;
pub mod service;

pub use aggregator::{InactiveStudent, StatusAggregator, StatusTable};
pub use dispatcher::{BroadcastReport, CommandDispatcher, DEFAULT_EXCLUDED_PREFIXES};
pub use events::{AdminEvent, AdminEventBus};
pub use registry::SiteBlockRegistry;
pub use service::AdminService;
