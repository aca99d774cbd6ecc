//! Shared test utilities for the converge workspace.
//!
//! This crate provides an in-memory remote service and plan fixtures for
//! controller tests. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`remote`]: [`InMemoryRemote`], a fake Remote Configuration Service
//!   with a call log and failure injection
//! - [`fixtures`]: ready-made plans for the builtin resources

pub mod fixtures;
pub mod remote;

pub use remote::{CallKind, InMemoryRemote, RemoteCall};
