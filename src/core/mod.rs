//! Core traits, types, and constants.
//!
//! This module has no async runtime dependency and defines the boundary
//! between the receiver and its external collaborators.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
