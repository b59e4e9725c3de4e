use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Name given to vessels whose name column is blank, "0" or "unknown".
pub const UNKNOWN_VESSEL: &str = "Unknown Vessel";

/// Semantic vessel category derived from the AIS ship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub enum VesselCategory {
    #[serde(rename = "Wing in ground")]
    WingInGround,
    Fishing,
    Towing,
    Dredging,
    Diving,
    Military,
    Sailing,
    #[serde(rename = "Pleasure Craft")]
    PleasureCraft,
    #[serde(rename = "High Speed Craft")]
    HighSpeedCraft,
    #[serde(rename = "Pilot Vessel")]
    PilotVessel,
    #[serde(rename = "Search and Rescue")]
    SearchAndRescue,
    Tug,
    #[serde(rename = "Port Tender")]
    PortTender,
    #[serde(rename = "Anti-pollution")]
    AntiPollution,
    #[serde(rename = "Law Enforcement")]
    LawEnforcement,
    Spare,
    #[serde(rename = "Medical Transport")]
    MedicalTransport,
    #[serde(rename = "Special Craft")]
    SpecialCraft,
    Passenger,
    Cargo,
    Tanker,
    Other,
}

impl VesselCategory {
    pub const ALL: [VesselCategory; 22] = [
        VesselCategory::WingInGround,
        VesselCategory::Fishing,
        VesselCategory::Towing,
        VesselCategory::Dredging,
        VesselCategory::Diving,
        VesselCategory::Military,
        VesselCategory::Sailing,
        VesselCategory::PleasureCraft,
        VesselCategory::HighSpeedCraft,
        VesselCategory::PilotVessel,
        VesselCategory::SearchAndRescue,
        VesselCategory::Tug,
        VesselCategory::PortTender,
        VesselCategory::AntiPollution,
        VesselCategory::LawEnforcement,
        VesselCategory::Spare,
        VesselCategory::MedicalTransport,
        VesselCategory::SpecialCraft,
        VesselCategory::Passenger,
        VesselCategory::Cargo,
        VesselCategory::Tanker,
        VesselCategory::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VesselCategory::WingInGround => "Wing in ground",
            VesselCategory::Fishing => "Fishing",
            VesselCategory::Towing => "Towing",
            VesselCategory::Dredging => "Dredging",
            VesselCategory::Diving => "Diving",
            VesselCategory::Military => "Military",
            VesselCategory::Sailing => "Sailing",
            VesselCategory::PleasureCraft => "Pleasure Craft",
            VesselCategory::HighSpeedCraft => "High Speed Craft",
            VesselCategory::PilotVessel => "Pilot Vessel",
            VesselCategory::SearchAndRescue => "Search and Rescue",
            VesselCategory::Tug => "Tug",
            VesselCategory::PortTender => "Port Tender",
            VesselCategory::AntiPollution => "Anti-pollution",
            VesselCategory::LawEnforcement => "Law Enforcement",
            VesselCategory::Spare => "Spare",
            VesselCategory::MedicalTransport => "Medical Transport",
            VesselCategory::SpecialCraft => "Special Craft",
            VesselCategory::Passenger => "Passenger",
            VesselCategory::Cargo => "Cargo",
            VesselCategory::Tanker => "Tanker",
            VesselCategory::Other => "Other",
        }
    }
}

impl fmt::Display for VesselCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vessel category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for VesselCategory {
    type Err = UnknownCategory;

    /// Case-insensitive match on the display name, e.g. "cargo" or "High Speed Craft".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        VesselCategory::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// AIS navigational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub enum NavigationStatus {
    #[serde(rename = "Under way using engine")]
    UnderWayUsingEngine,
    #[serde(rename = "At anchor")]
    AtAnchor,
    #[serde(rename = "Not under command")]
    NotUnderCommand,
    #[serde(rename = "Restricted manoeuvrability")]
    RestrictedManoeuvrability,
    #[serde(rename = "Constrained by her draught")]
    ConstrainedByDraught,
    Moored,
    Aground,
    #[serde(rename = "Engaged in fishing")]
    EngagedInFishing,
    #[serde(rename = "Under way sailing")]
    UnderWaySailing,
    #[serde(rename = "Reserved for future amendment")]
    ReservedForAmendment,
    #[serde(rename = "Power-driven vessel towing astern")]
    TowingAstern,
    #[serde(rename = "Power-driven vessel pushing ahead")]
    PushingAhead,
    #[serde(rename = "Reserved for future use")]
    ReservedForFutureUse,
    #[serde(rename = "AIS-SART is active")]
    AisSartActive,
    #[serde(rename = "Not defined")]
    NotDefined,
    Unknown,
}

impl NavigationStatus {
    pub fn name(self) -> &'static str {
        match self {
            NavigationStatus::UnderWayUsingEngine => "Under way using engine",
            NavigationStatus::AtAnchor => "At anchor",
            NavigationStatus::NotUnderCommand => "Not under command",
            NavigationStatus::RestrictedManoeuvrability => "Restricted manoeuvrability",
            NavigationStatus::ConstrainedByDraught => "Constrained by her draught",
            NavigationStatus::Moored => "Moored",
            NavigationStatus::Aground => "Aground",
            NavigationStatus::EngagedInFishing => "Engaged in fishing",
            NavigationStatus::UnderWaySailing => "Under way sailing",
            NavigationStatus::ReservedForAmendment => "Reserved for future amendment",
            NavigationStatus::TowingAstern => "Power-driven vessel towing astern",
            NavigationStatus::PushingAhead => "Power-driven vessel pushing ahead",
            NavigationStatus::ReservedForFutureUse => "Reserved for future use",
            NavigationStatus::AisSartActive => "AIS-SART is active",
            NavigationStatus::NotDefined => "Not defined",
            NavigationStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for NavigationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One normalized AIS observation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselRecord {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub heading_degrees: f64,
    pub speed_knots: f64,
    pub course_over_ground: f64,
    pub vessel_type_code: String,
    pub vessel_type_category: VesselCategory,
    pub navigation_status_code: String,
    pub navigation_status_category: NavigationStatus,
    pub length_meters: f64,
    pub width_meters: f64,
    pub draft_meters: f64,
    pub destination: String,
    pub estimated_arrival: String,
    pub timestamp: DateTime<Utc>,
    pub call_sign: String,
    pub imo_number: String,
    pub gross_tonnage: f64,
    pub deadweight_tonnage: f64,
    pub cargo: String,
    pub transceiver_class: String,
    /// Flag state, empty when absent.
    pub flag: String,
    pub build_year: String,
}

impl VesselRecord {
    /// Zero coordinates are AIS "no fix" placeholders and count as invalid.
    pub fn has_valid_position(&self) -> bool {
        is_valid_position(self.latitude, self.longitude)
    }

    pub fn trajectory_point(&self) -> TrajectoryPoint {
        TrajectoryPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: self.timestamp,
            speed_knots: self.speed_knots,
            heading_degrees: self.heading_degrees,
        }
    }
}

pub fn is_valid_position(latitude: f64, longitude: f64) -> bool {
    latitude != 0.0
        && longitude != 0.0
        && latitude.abs() <= 90.0
        && longitude.abs() <= 180.0
}

/// Lightweight projection of a record kept in a vessel's history.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub speed_knots: f64,
    pub heading_degrees: f64,
}
