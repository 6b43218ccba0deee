//! # Controller
//!
//! Reconciliation core plus the pieces the runtime wires around it.
//!
//! - `reconciler` - one reconcile pass for an OperandBindInfo
//! - `backoff` - Fibonacci retry delays used by the error policy
//! - `server` - metrics and probe endpoints

pub mod backoff;
pub mod reconciler;
pub mod server;
