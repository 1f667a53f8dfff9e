//! Data Transfer Objects for the registry API
//!
//! This module contains the request and response shapes exchanged between the
//! server and its clients. Row keys never leave the server; pagination state
//! travels as opaque markers instead.

pub mod error;
pub mod pipeline;
