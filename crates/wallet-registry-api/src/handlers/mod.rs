//! API Handlers

pub mod health;
pub mod registry;
