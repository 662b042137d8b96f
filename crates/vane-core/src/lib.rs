#![forbid(unsafe_code)]

//! Framework-independent value types for Vane.
//!
//! This crate provides:
//! - [`Point`] and [`Size`] geometry primitives used by view adapters
//! - [`Environment`], the keyed attribute store views consult for
//!   cascading presentation hints such as [`TextAlignment`]

pub mod environment;
pub mod geometry;

pub use environment::{Environment, TextAlignment, keys};
pub use geometry::{Point, Size};
