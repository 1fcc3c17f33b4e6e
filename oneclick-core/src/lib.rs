//! Oneclick Core
//!
//! Core types and abstractions for the oneclick deployment pipeline.
//!
//! This crate contains:
//! - Domain types: Core business entities (progress events, stages, deployment records, assets)
//! - DTOs: Data transfer objects exchanged between the CLI and the deploy service
//! - Naming helpers: project and deployment name derivation

pub mod domain;
pub mod dto;
pub mod naming;
