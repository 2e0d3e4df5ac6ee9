//! Shared identifiers and types for the klaxon notification routing core.
//!
//! Every other crate in the workspace depends on this one for check/state
//! vocabulary, medium types, and the [`types::DispatchInstruction`] value
//! handed to the delivery subsystem.

pub mod id;
pub mod types;
