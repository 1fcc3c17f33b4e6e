//! Core domain types
//!
//! This module contains the core domain structures used across oneclick crates.
//! They are shared between the runner (which produces them while executing a
//! deployment), the server (which streams and records them) and the CLI
//! (which renders them).

pub mod asset;
pub mod deployment;
pub mod event;
pub mod stage;
pub mod token;
