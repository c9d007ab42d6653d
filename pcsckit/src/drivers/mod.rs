//! Bundled peripheral drivers

pub mod acr122;

pub use acr122::{Acr122Driver, Acr122Error};
