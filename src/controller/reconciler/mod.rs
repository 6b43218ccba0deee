//! # Reconciler
//!
//! Core reconciliation logic for `OperandBindInfo` resources.
//!
//! The reconciler:
//! - Resolves the consumers of an operand through its `OperandRegistry`
//! - Reads each consumer's `OperandRequest` for the names it wants
//! - Copies every public Secret and ConfigMap into the consumer namespaces
//! - Records ownership so copies are garbage-collected with their request
//! - Updates the `OperandBindInfo` phase with the outcome of the pass
//!
//! The reconciler is generic over an [`crate::store::ObjectStore`] and an
//! [`crate::events::EventSink`], both supplied at construction.

pub mod reconcile;
pub mod registry;
pub mod request;
pub mod status;
pub mod sync;
pub mod types;

// Re-export public API
pub use registry::ResolvedRegistry;
pub use request::{binding_targets, BindingTargets};
pub use status::{SyncError, SyncErrors};
pub use sync::{sync_config_map, sync_secret, Replicable, SyncOutcome, SyncTarget};
pub use types::{ReconcileOutcome, Reconciler, ReconcilerError, SyncSummary};
