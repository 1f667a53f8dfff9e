//! Core domain types
//!
//! This module contains the core domain structures used across Strata services.
//! These types represent the persisted entities; the server owns their storage
//! and the client only ever sees them through the DTOs.

pub mod pipeline;
pub mod schedule;
