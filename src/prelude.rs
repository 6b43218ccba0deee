//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use operand_bindinfo_controller::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Reconciler types
pub use crate::controller::reconciler::{
    ReconcileOutcome, Reconciler, ReconcilerError, SyncError, SyncErrors, SyncOutcome,
    SyncSummary,
};

// Seams injected into the reconciler
pub use crate::events::{EventSink, KubeEventSink, RecordingEventSink, Severity};
pub use crate::store::{InMemoryStore, KubeStore, ObjectStore, StoreError};

pub use crate::config::{ControllerConfig, LogFormat};
