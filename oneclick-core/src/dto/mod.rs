//! Data Transfer Objects for inter-service communication
//!
//! This module contains DTOs exchanged between the CLI and the deploy
//! service. DTOs are lightweight representations of domain entities
//! optimized for network transfer.

pub mod deploy;
pub mod deployment;
