//! Strata Core
//!
//! Core types shared by the Strata pipeline registry.
//!
//! This crate contains:
//! - Domain types: Core business entities (Pipeline, PipelineVersion, Schedule)
//! - DTOs: Request/response shapes exchanged between the server and its clients

pub mod domain;
pub mod dto;
