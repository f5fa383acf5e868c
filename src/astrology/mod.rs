//! Astrology Module
//!
//! Chart types, the ephemeris seam, and the report formatter.

pub mod ephemeris;
pub mod report;

pub use ephemeris::{Ephemeris, MeanMotionEphemeris};
pub use report::format_report;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::session::BirthData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    /// Sign containing an ecliptic longitude. Each sign spans 30 degrees
    /// starting from 0 Aries; out-of-range input wraps.
    pub fn from_degree(longitude: f64) -> Self {
        let wrapped = longitude.rem_euclid(360.0);
        let index = (wrapped / 30.0) as usize;
        Self::ALL[index.min(11)]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The ten bodies a chart tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CelestialBody {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

impl CelestialBody {
    pub const ALL: [CelestialBody; 10] = [
        CelestialBody::Sun,
        CelestialBody::Moon,
        CelestialBody::Mercury,
        CelestialBody::Venus,
        CelestialBody::Mars,
        CelestialBody::Jupiter,
        CelestialBody::Saturn,
        CelestialBody::Uranus,
        CelestialBody::Neptune,
        CelestialBody::Pluto,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CelestialBody::Sun => "Sun",
            CelestialBody::Moon => "Moon",
            CelestialBody::Mercury => "Mercury",
            CelestialBody::Venus => "Venus",
            CelestialBody::Mars => "Mars",
            CelestialBody::Jupiter => "Jupiter",
            CelestialBody::Saturn => "Saturn",
            CelestialBody::Uranus => "Uranus",
            CelestialBody::Neptune => "Neptune",
            CelestialBody::Pluto => "Pluto",
        }
    }
}

impl fmt::Display for CelestialBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Ordinal house name, "First House" through "Twelfth House".
pub fn house_name(number: u8) -> &'static str {
    match number {
        1 => "First House",
        2 => "Second House",
        3 => "Third House",
        4 => "Fourth House",
        5 => "Fifth House",
        6 => "Sixth House",
        7 => "Seventh House",
        8 => "Eighth House",
        9 => "Ninth House",
        10 => "Tenth House",
        11 => "Eleventh House",
        12 => "Twelfth House",
        _ => "Unknown House",
    }
}

/// A body placed in the chart. `degree` is within the sign (0..30).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPosition {
    pub body: CelestialBody,
    pub sign: ZodiacSign,
    pub degree: f64,
    pub house: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseCusp {
    pub number: u8,
    pub sign: ZodiacSign,
    pub degree: f64,
}

/// A computed natal chart: ten body positions and twelve house cusps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub positions: Vec<BodyPosition>,
    pub cusps: Vec<HouseCusp>,
}

impl Chart {
    pub fn position(&self, body: CelestialBody) -> Option<&BodyPosition> {
        self.positions.iter().find(|p| p.body == body)
    }

    /// Look a body up by name, for tools that identify planets as strings.
    pub fn position_named(&self, name: &str) -> Option<&BodyPosition> {
        self.positions
            .iter()
            .find(|p| p.body.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn cusp(&self, number: u8) -> Option<&HouseCusp> {
        self.cusps.iter().find(|c| c.number == number)
    }
}

/// What an ephemeris needs to place a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub name: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub place: String,
    /// Country hint for ambiguous place names. Intake never asks for it.
    pub nation: Option<String>,
}

impl ChartRequest {
    /// Build a request from validated birth data. Returns `None` when the
    /// stored strings no longer parse (possible with presets).
    pub fn from_birth_data(birth: &BirthData) -> Option<Self> {
        use chrono::{Datelike, Timelike};

        let (date, time) = birth.as_moment()?;
        Some(Self {
            name: birth.subject_name().to_string(),
            year: date.year(),
            month: date.month(),
            day: date.day(),
            hour: time.hour(),
            minute: time.minute(),
            place: birth.place.trim().to_string(),
            nation: None,
        })
    }
}
