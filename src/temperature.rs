use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Unit {
    C,
    #[default]
    F,
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "C" => Ok(Unit::C),
            "F" => Ok(Unit::F),
            other => Err(Error::Validation(format!(
                "unrecognized unit for temperature: {other}"
            ))),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::C => write!(f, "C"),
            Unit::F => write!(f, "F"),
        }
    }
}

/// A temperature holding both Celsius and Fahrenheit, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Temperature {
    #[serde(rename = "C")]
    c: f64,
    #[serde(rename = "F")]
    f: f64,
}

impl Temperature {
    pub fn new(value: f64, unit: Unit) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::Validation(format!(
                "temperature value must be numeric, got {value}"
            )));
        }

        Ok(match unit {
            Unit::F => Temperature {
                f: value,
                c: (value - 32.0) * 5.0 / 9.0,
            },
            Unit::C => Temperature {
                c: value,
                f: value * 9.0 / 5.0 + 32.0,
            },
        })
    }

    /// Parses bus payload text such as `"72"` or `" 21.5 "`.
    pub fn parse(text: &str, unit: Unit) -> Result<Self> {
        let value: f64 = text
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("value must be provided, got {text:?}")))?;

        Self::new(value, unit)
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn f(&self) -> f64 {
        self.f
    }

    pub fn value(&self, unit: Unit) -> f64 {
        match unit {
            Unit::C => self.c,
            Unit::F => self.f,
        }
    }

    /// Value as the thermostat displays it: whole degrees F, tenths of a degree C.
    pub fn rounded(&self, unit: Unit) -> f64 {
        match unit {
            Unit::F => self.f.round(),
            Unit::C => (self.c * 10.0).round() / 10.0,
        }
    }

    /// Text form used on the bus.
    pub fn to_display(&self, unit: Unit) -> String {
        match unit {
            Unit::F => format!("{:.0}", self.f),
            Unit::C => format!("{:.1}", self.c),
        }
    }
}
