pub mod config;
pub mod decoder;
pub mod error;
pub mod render;
pub mod rotate;
pub mod serial;
pub mod viewer;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// Number of degrees in a full turn of the compass.
pub const FULL_TURN: u16 = 360;

/// A compass bearing in whole degrees, always within `0..360`.
///
/// Devices are allowed to send values up to `999`. Anything at or beyond a
/// full turn is wrapped, so `H360` reads as north and `H999` as 279.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Heading(u16);

impl Heading {
    pub const NORTH: Self = Self(0);

    /// Build a heading from raw degrees, wrapping into `0..360`.
    #[must_use]
    pub const fn from_degrees(degrees: u16) -> Self {
        Self(degrees % FULL_TURN)
    }

    #[must_use]
    pub const fn degrees(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
