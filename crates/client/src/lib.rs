//! Network side of swkit.
//!
//! This crate provides the reqwest-backed [`Transport`](swkit_core::Transport)
//! shared by the server and CLI.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
