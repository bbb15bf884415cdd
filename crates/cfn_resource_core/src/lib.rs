//! Shared CloudFormation custom-resource contract.
//!
//! This crate owns the wire shapes CloudFormation sends and expects back, plus
//! the deterministic rules for turning a handler result into a response
//! envelope. It intentionally excludes Lambda runtime and HTTP concerns.

pub mod contract;
pub mod physical_id;
