//! Stable 3D box stacking.
//!
//! Blocks are placed one after another at the lowest supported corner of a
//! container (no-fit boxes, an event sweep and a prefix-sum grid search).
//! Simulated annealing over packing order and orientation minimises the
//! height of the tallest stack.

pub mod api;
pub mod config;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod model;
pub mod optimizer;
pub mod placement;
pub mod settle;
pub mod types;
