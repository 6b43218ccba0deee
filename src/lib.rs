//! OperandBindInfo Controller Library
//!
//! Shares the Secrets and ConfigMaps an operand exposes through an
//! OperandBindInfo with every namespace whose OperandRequest asked for it.
//!
//! ## Quick Start
//!
//! ```rust
//! use operand_bindinfo_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod events;
pub mod observability;
pub mod ownership;
pub mod prelude;
pub mod runtime;
pub mod store;
