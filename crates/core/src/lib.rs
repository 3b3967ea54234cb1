//! # modegate Core
//!
//! Domain types, traits, and error definitions for the modegate autonomy
//! engine. This crate has **no policy logic** — it defines the model that
//! the classifier, store, and engine crates implement against.
//!
//! ## Design Philosophy
//!
//! Durability is a trait ([`StateStore`]) so hosts can swap the backing
//! storage, and tests can run the whole engine without touching disk.

pub mod error;
pub mod event;
pub mod mode;
pub mod session;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, StoreError};
pub use event::{DomainEvent, EventBus};
pub use mode::{AutonomyMode, ModeSource, RiskTier, Verdict};
pub use session::{
    ApprovalMetrics, ApprovalRecord, BackgroundAction, BackgroundStatus, ConversationId,
    PendingApproval, SessionAutonomyState, MAX_APPROVAL_HISTORY,
    MAX_FINISHED_BACKGROUND,
};
pub use store::StateStore;
