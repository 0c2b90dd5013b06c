//! Student side: per-context state, the reconciliation agent and its event
//! loop.

pub mod agent;
pub mod effects;
pub mod runtime;
pub mod state;

pub use agent::StudentAgent;
pub use effects::{Effect, LoggingEffects, RecordingEffects, StudentEffects};
pub use runtime::{Navigation, StudentRuntime};
pub use state::{BlockOverlay, LockState, PageInfo, StudentState};
