//! Ephemeris seam and the built-in mean-motion backend.
//!
//! Chart positions here come from J2000 mean elements: each body advances
//! along the ecliptic at its mean daily rate. That is nowhere near
//! observatory-grade, but it is deterministic, needs no data files, and
//! gives every chart a plausible spread of signs and houses. A real
//! ephemeris can replace it behind the same trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use super::{BodyPosition, CelestialBody, Chart, ChartRequest, HouseCusp, ZodiacSign};

#[async_trait]
pub trait Ephemeris: Send + Sync {
    async fn compute(&self, request: &ChartRequest) -> Result<Chart>;
}

/// Mean ecliptic longitude at J2000.0 and mean daily motion, in degrees.
const J2000_ELEMENTS: [(CelestialBody, f64, f64); 10] = [
    (CelestialBody::Sun, 280.460, 0.985_647_4),
    (CelestialBody::Moon, 218.316, 13.176_396),
    (CelestialBody::Mercury, 252.251, 4.092_335),
    (CelestialBody::Venus, 181.980, 1.602_130),
    (CelestialBody::Mars, 355.433, 0.524_033),
    (CelestialBody::Jupiter, 34.351, 0.083_056),
    (CelestialBody::Saturn, 50.077, 0.033_371),
    (CelestialBody::Uranus, 314.055, 0.011_698),
    (CelestialBody::Neptune, 304.348, 0.005_965),
    (CelestialBody::Pluto, 238.930, 0.003_964),
];

pub struct MeanMotionEphemeris;

#[async_trait]
impl Ephemeris for MeanMotionEphemeris {
    async fn compute(&self, request: &ChartRequest) -> Result<Chart> {
        let t = days_since_j2000(
            request.year,
            request.month,
            request.day,
            request.hour,
            request.minute,
        )?;

        let ascendant = ascendant_longitude(&request.place, request.hour, request.minute);

        let cusps = (1..=12u8)
            .map(|number| {
                // Equal house system: one cusp every 30 degrees from the ascendant.
                let longitude = (ascendant + f64::from(number - 1) * 30.0).rem_euclid(360.0);
                HouseCusp {
                    number,
                    sign: ZodiacSign::from_degree(longitude),
                    degree: longitude % 30.0,
                }
            })
            .collect();

        let positions = J2000_ELEMENTS
            .iter()
            .map(|&(body, epoch_longitude, daily_motion)| {
                let longitude = (epoch_longitude + daily_motion * t).rem_euclid(360.0);
                let house = (((longitude - ascendant).rem_euclid(360.0)) / 30.0) as u8 + 1;
                BodyPosition {
                    body,
                    sign: ZodiacSign::from_degree(longitude),
                    degree: longitude % 30.0,
                    house,
                }
            })
            .collect();

        Ok(Chart { positions, cusps })
    }
}

fn days_since_j2000(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Result<f64> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid calendar date {}-{}-{}", year, month, day))?;
    let epoch = NaiveDate::from_ymd_opt(2000, 1, 1).context("epoch")?;
    let days = date.signed_duration_since(epoch).num_days() as f64;
    // J2000.0 is noon on 2000-01-01; civil time is close enough here.
    Ok(days + (f64::from(hour) - 12.0) / 24.0 + f64::from(minute) / 1440.0)
}

/// A stand-in rising degree: a stable hash of the birthplace fixes the
/// horizon, and the clock advances it at 0.25 degrees per minute, one full
/// turn per day.
fn ascendant_longitude(place: &str, hour: u32, minute: u32) -> f64 {
    let seed = place
        .trim()
        .to_lowercase()
        .bytes()
        .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)));
    let base = (seed % 360) as f64;
    (base + f64::from(hour * 60 + minute) * 0.25).rem_euclid(360.0)
}
