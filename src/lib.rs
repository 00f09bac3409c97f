//! An in-memory, time-indexed snapshot of global BGP routing state,
//! reconstructed incrementally from RIB dumps and UPDATE streams.
//!
//! The crate is organized bottom-up: [`peer_sig`] and [`as_path`] are
//! the two intern tables a [`view::View`] is built from; `view` is the
//! queryable snapshot itself; [`rib_engine`] drives a `View` from a
//! stream of BGP records; `transport` and `metrics` are the external
//! interfaces a running engine talks to the outside world through.

#![allow(dead_code)]

pub mod as_path;
pub mod config;
pub mod error;
pub mod metrics;
pub mod peer_sig;
pub mod rib_engine;
pub mod transport;
pub mod view;

pub use config::RIBEngineConfig;
pub use error::{ViewError, ViewResult};
pub use rib_engine::RIBEngine;
pub use view::View;
