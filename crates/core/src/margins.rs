use serde::{Deserialize, Serialize};
use std::fmt;

use crate::InputError;

/// Which edge of the page a band hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Top,
    Bottom,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Top => f.write_str("top"),
            Band::Bottom => f.write_str("bottom"),
        }
    }
}

/// Header and footer heights in points.
///
/// Both values are finite and non-negative once constructed. A zero value
/// disables that band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 75.0,
            bottom: 75.0,
        }
    }
}

impl Margins {
    pub fn new(top: f32, bottom: f32) -> Result<Self, InputError> {
        Ok(Self {
            top: check(Band::Top, top)?,
            bottom: check(Band::Bottom, bottom)?,
        })
    }

    /// Parses free-form margin text as typed by a user.
    ///
    /// Surrounding whitespace is ignored; anything that is not a plain
    /// floating-point number is rejected.
    pub fn parse(top: &str, bottom: &str) -> Result<Self, InputError> {
        let top = parse_one(Band::Top, top)?;
        let bottom = parse_one(Band::Bottom, bottom)?;
        Self::new(top, bottom)
    }

    pub fn get(&self, band: Band) -> f32 {
        match band {
            Band::Top => self.top,
            Band::Bottom => self.bottom,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.bottom == 0.0
    }
}

fn parse_one(band: Band, text: &str) -> Result<f32, InputError> {
    text.trim()
        .parse::<f32>()
        .map_err(|_| InputError::NotANumber {
            band,
            text: text.to_string(),
        })
}

fn check(band: Band, value: f32) -> Result<f32, InputError> {
    if !value.is_finite() {
        return Err(InputError::NonFinite { band });
    }
    if value < 0.0 {
        return Err(InputError::Negative { band, value });
    }
    // -0.0 collapses to 0.0
    Ok(if value == 0.0 { 0.0 } else { value })
}
