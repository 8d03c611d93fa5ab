//! Container geometry, pack ordering and scene serialization for the pack planner.
//!
//! The library holds the pure building blocks; `main.rs` serves them over HTTP.

pub mod api;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod mesh;
pub mod model;
pub mod ordering;
pub mod scene;
pub mod types;
