//! Pieslot - keeps the slots of a radial window-switcher menu in sync with
//! the desktop's open windows.
//!
//! The library holds the reconciliation engine, the periodic service that
//! drives it, configuration loading and the CLI built on top of them.

pub mod actions;
pub mod cli;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod platform;
pub mod schema;
pub mod service;
