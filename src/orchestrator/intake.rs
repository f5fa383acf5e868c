//! Birth-data intake.
//!
//! Before any advice flows, the session needs a validated birth date, time,
//! and place. The stage is derived from the session itself, so a restart or
//! a failed report attempt resumes exactly where it left off.

use tracing::warn;

use crate::agent::{AgentError, AgentResult};
use crate::astrology::{format_report, Chart, ChartRequest, Ephemeris};
use crate::session::{BirthData, Session};
use crate::transport::Transport;
use crate::validate::{validate_date, validate_input, validate_place, validate_time};

pub const DATE_PROMPT: &str = "What's your birth date? (e.g. DD/MM/YYYY)";
pub const TIME_PROMPT: &str = "What's your birth time? (e.g. HH:MM AM/PM)";
pub const PLACE_PROMPT: &str = "Where were you born? (City, Country)";

/// Where the session stands on the way to a full reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    NeedBirthData,
    NeedReport,
    Conversing,
}

pub fn stage_of(session: &Session) -> IntakeStage {
    if session.birth_data.is_none() {
        IntakeStage::NeedBirthData
    } else if session.report.is_none() {
        IntakeStage::NeedReport
    } else {
        IntakeStage::Conversing
    }
}

/// Gather birth data, preferring a preset when it passes validation.
/// An invalid preset is never trusted silently.
pub async fn collect_birth_data(
    transport: &dyn Transport,
    preset: Option<&BirthData>,
    max_attempts: Option<usize>,
) -> AgentResult<BirthData> {
    if let Some(preset) = preset {
        if validate_date(&preset.date)
            && validate_time(&preset.time)
            && validate_place(&preset.place)
        {
            return Ok(preset.clone());
        }
        warn!(
            date = %preset.date,
            time = %preset.time,
            "preset birth data failed validation, falling back to prompts"
        );
    }

    let date = validate_input(transport, DATE_PROMPT, validate_date, max_attempts).await?;
    let time = validate_input(transport, TIME_PROMPT, validate_time, max_attempts).await?;
    let place = validate_input(transport, PLACE_PROMPT, validate_place, max_attempts).await?;
    Ok(BirthData::new(date, time, place))
}

pub fn confirmation_message(birth: &BirthData) -> String {
    format!(
        "Thank you for providing your details. Here's what I gathered:\n\
         Birth Date: {}\n\
         Birth Time: {}\n\
         Birth Place: {}\n\
         Now, please tell me about your situation.",
        birth.date, birth.time, birth.place
    )
}

/// Compute the chart and render the report for stored birth data.
pub async fn build_report(
    birth: &BirthData,
    ephemeris: &dyn Ephemeris,
) -> AgentResult<(Chart, String)> {
    let request = ChartRequest::from_birth_data(birth).ok_or_else(|| {
        AgentError::Validation(format!(
            "stored birth data is unparseable: {} {}",
            birth.date, birth.time
        ))
    })?;
    let chart = ephemeris
        .compute(&request)
        .await
        .map_err(|e| AgentError::Ephemeris(e.to_string()))?;
    let report = format_report(birth.subject_name(), &chart);
    Ok((chart, report))
}
