//! # Custom Resource Definitions
//!
//! CRD types read and written by the OperandBindInfo controller.
//!
//! ## Module Structure
//!
//! - `binding.rs` - Binding declarations and their visibility scope
//! - `bindinfo.rs` - OperandBindInfo spec, status, defaulting and labelling
//! - `registry.rs` - OperandRegistry (read-only to this controller)
//! - `request.rs` - OperandRequest (read-only to this controller)

mod binding;
mod bindinfo;
mod registry;
mod request;

// Re-export all public types
pub use binding::{Binding, Scope};
pub use bindinfo::{BindInfoPhase, OperandBindInfo, OperandBindInfoSpec, OperandBindInfoStatus};
pub use registry::{
    OperandRegistry, OperandRegistrySpec, OperandRegistryStatus, Operator, OperatorStatus,
    ReconcileRequest,
};
pub use request::{Operand, OperandRequest, OperandRequestSpec, Request};
