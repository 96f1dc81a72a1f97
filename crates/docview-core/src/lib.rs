//! # docview core
//!
//! I/O-free logic for resolving how a search-backend document should be
//! displayed: the document metadata model, case-insensitive field
//! extraction, view strategy selection, connector URI construction and the
//! ACI request builders.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! runtime-specific dependencies. The `docview` application crate wires
//! these pieces to real backends.

pub mod config;
pub mod fields;
pub mod models;
pub mod request;
pub mod strategy;
