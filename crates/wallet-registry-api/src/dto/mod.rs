//! Data Transfer Objects
//!
//! Request and response types for the API.

pub mod common;
pub mod registry;

pub use common::*;
pub use registry::*;
