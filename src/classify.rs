//! Lookup tables turning raw AIS type and status fields into categories.
//!
//! Sources disagree on encoding: NOAA exports carry numeric codes, DMA
//! exports carry free text such as "Cargo" or "Under way using engine".
//! Both classifiers try the exact numeric code first and fall back to a
//! case-insensitive keyword scan. The tables are immutable statics and
//! safe to read from any number of concurrent runs.

use crate::model::{NavigationStatus, VesselCategory};

const TYPE_KEYWORDS: &[(&str, VesselCategory)] = &[
    ("tanker", VesselCategory::Tanker),
    ("cargo", VesselCategory::Cargo),
    ("fishing", VesselCategory::Fishing),
    ("passenger", VesselCategory::Passenger),
    ("tug", VesselCategory::Tug),
    ("towing", VesselCategory::Towing),
    ("dredg", VesselCategory::Dredging),
    ("diving", VesselCategory::Diving),
    ("military", VesselCategory::Military),
    ("sailing", VesselCategory::Sailing),
    ("pleasure", VesselCategory::PleasureCraft),
    ("high speed", VesselCategory::HighSpeedCraft),
    ("hsc", VesselCategory::HighSpeedCraft),
    ("pilot", VesselCategory::PilotVessel),
    ("search and rescue", VesselCategory::SearchAndRescue),
    ("sar", VesselCategory::SearchAndRescue),
    ("port tender", VesselCategory::PortTender),
    ("anti-pollution", VesselCategory::AntiPollution),
    ("law enforcement", VesselCategory::LawEnforcement),
    ("medical", VesselCategory::MedicalTransport),
    ("wing in ground", VesselCategory::WingInGround),
    ("wig", VesselCategory::WingInGround),
    ("spare", VesselCategory::Spare),
];

// Order matters: more specific phrases come before the words they contain.
const STATUS_KEYWORDS: &[(&str, NavigationStatus)] = &[
    ("not under command", NavigationStatus::NotUnderCommand),
    ("using engine", NavigationStatus::UnderWayUsingEngine),
    ("anchor", NavigationStatus::AtAnchor),
    ("restricted", NavigationStatus::RestrictedManoeuvrability),
    ("draught", NavigationStatus::ConstrainedByDraught),
    ("moored", NavigationStatus::Moored),
    ("aground", NavigationStatus::Aground),
    ("fishing", NavigationStatus::EngagedInFishing),
    ("sailing", NavigationStatus::UnderWaySailing),
    ("towing astern", NavigationStatus::TowingAstern),
    ("pushing ahead", NavigationStatus::PushingAhead),
    ("sart", NavigationStatus::AisSartActive),
    ("amendment", NavigationStatus::ReservedForAmendment),
    ("reserved", NavigationStatus::ReservedForFutureUse),
    ("not defined", NavigationStatus::NotDefined),
];

/// Integer AIS code, accepting "70" as well as "70.0".
fn numeric_code(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(code) = raw.parse::<u32>() {
        return Some(code);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

fn type_for_code(code: u32) -> Option<VesselCategory> {
    let category = match code {
        20..=29 => VesselCategory::WingInGround,
        30 => VesselCategory::Fishing,
        31 | 32 => VesselCategory::Towing,
        33 => VesselCategory::Dredging,
        34 => VesselCategory::Diving,
        35 => VesselCategory::Military,
        36 => VesselCategory::Sailing,
        37 => VesselCategory::PleasureCraft,
        40..=49 => VesselCategory::HighSpeedCraft,
        50 => VesselCategory::PilotVessel,
        51 => VesselCategory::SearchAndRescue,
        52 => VesselCategory::Tug,
        53 => VesselCategory::PortTender,
        54 => VesselCategory::AntiPollution,
        55 => VesselCategory::LawEnforcement,
        56 | 57 => VesselCategory::Spare,
        58 => VesselCategory::MedicalTransport,
        59 => VesselCategory::SpecialCraft,
        60..=69 => VesselCategory::Passenger,
        70..=79 => VesselCategory::Cargo,
        80..=89 => VesselCategory::Tanker,
        90..=99 => VesselCategory::Other,
        _ => return None,
    };
    Some(category)
}

fn status_for_code(code: u32) -> Option<NavigationStatus> {
    let status = match code {
        0 => NavigationStatus::UnderWayUsingEngine,
        1 => NavigationStatus::AtAnchor,
        2 => NavigationStatus::NotUnderCommand,
        3 => NavigationStatus::RestrictedManoeuvrability,
        4 => NavigationStatus::ConstrainedByDraught,
        5 => NavigationStatus::Moored,
        6 => NavigationStatus::Aground,
        7 => NavigationStatus::EngagedInFishing,
        8 => NavigationStatus::UnderWaySailing,
        9 | 10 => NavigationStatus::ReservedForAmendment,
        11 => NavigationStatus::TowingAstern,
        12 => NavigationStatus::PushingAhead,
        13 => NavigationStatus::ReservedForFutureUse,
        14 => NavigationStatus::AisSartActive,
        15 => NavigationStatus::NotDefined,
        _ => return None,
    };
    Some(status)
}

fn keyword_match<T: Copy>(raw: &str, table: &[(&str, T)]) -> Option<T> {
    let lowered = raw.to_lowercase();
    table
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, value)| *value)
}

/// Classify a raw ship type field. Unmatched input is `Other`.
pub fn vessel_category(raw: &str) -> VesselCategory {
    if let Some(category) = numeric_code(raw).and_then(type_for_code) {
        return category;
    }
    keyword_match(raw, TYPE_KEYWORDS).unwrap_or(VesselCategory::Other)
}

/// Classify a raw navigational status field. Unmatched input is `Unknown`.
pub fn navigation_status(raw: &str) -> NavigationStatus {
    if let Some(status) = numeric_code(raw).and_then(status_for_code) {
        return status;
    }
    keyword_match(raw, STATUS_KEYWORDS).unwrap_or(NavigationStatus::Unknown)
}
