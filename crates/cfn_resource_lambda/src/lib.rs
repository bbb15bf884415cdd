//! Lambda-side harness for CloudFormation custom resources.
//!
//! This crate owns runtime integration details (the invocation context
//! capability, response delivery over HTTP, handler dispatch) on top of the
//! wire contract in `cfn_resource_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
