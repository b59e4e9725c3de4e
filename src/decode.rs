//! Row decoding: header alias resolution and tolerant field parsing.
//!
//! Each canonical [`Field`] owns an ordered alias list. When a source's
//! header row is read, [`HeaderIndex`] records which columns answer to
//! each field. For every row the first alias column holding a non-empty
//! value wins.
//!
//! Recognised dialects, all through the same table:
//!
//! - generic AIS: `mmsi,lat,lon,sog,cog,heading,vessel_type,...`
//! - NOAA: `MMSI,BaseDateTime,LAT,LON,SOG,COG,Heading,VesselName,...`
//! - DMA: `# Timestamp,Type of mobile,MMSI,Latitude,Longitude,...`
//!   e.g. `23/06/2017 00:44:23,Class A,305484000,56.134323,11.474578,Under way using engine,...`

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::StringRecord;
use log::debug;

use crate::classify;
use crate::model::{VesselRecord, UNKNOWN_VESSEL};

/// AIS heading value meaning "not available".
const HEADING_NOT_AVAILABLE: f64 = 511.0;

/// Canonical columns of the vessel-state schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Latitude,
    Longitude,
    Heading,
    Speed,
    Course,
    VesselType,
    Status,
    Length,
    Width,
    Draft,
    Destination,
    Eta,
    Timestamp,
    CallSign,
    Imo,
    GrossTonnage,
    Deadweight,
    Cargo,
    TransceiverClass,
    Flag,
    BuildYear,
}

impl Field {
    pub const ALL: [Field; 23] = [
        Field::Id,
        Field::Name,
        Field::Latitude,
        Field::Longitude,
        Field::Heading,
        Field::Speed,
        Field::Course,
        Field::VesselType,
        Field::Status,
        Field::Length,
        Field::Width,
        Field::Draft,
        Field::Destination,
        Field::Eta,
        Field::Timestamp,
        Field::CallSign,
        Field::Imo,
        Field::GrossTonnage,
        Field::Deadweight,
        Field::Cargo,
        Field::TransceiverClass,
        Field::Flag,
        Field::BuildYear,
    ];

    /// Normalized header names, highest priority first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Id => &["mmsi", "vesselid", "vessel_id", "shipid", "ship_id", "id"],
            Field::Name => &["vesselname", "vessel_name", "name", "shipname", "ship_name"],
            Field::Latitude => &["lat", "latitude"],
            Field::Longitude => &["lon", "lng", "long", "longitude"],
            Field::Heading => &["heading", "trueheading", "true_heading", "hdg"],
            Field::Speed => &["sog", "speed", "speedoverground", "speed_over_ground"],
            Field::Course => &["cog", "course", "courseoverground", "course_over_ground"],
            Field::VesselType => &[
                "vesseltype",
                "vessel_type",
                "shiptype",
                "ship_type",
                "type",
            ],
            Field::Status => &[
                "status",
                "navigationalstatus",
                "navigationstatus",
                "navstatus",
                "nav_status",
                "navigational_status",
            ],
            Field::Length => &["length", "length_m"],
            Field::Width => &["width", "beam", "width_m"],
            Field::Draft => &["draft", "draught"],
            Field::Destination => &["destination"],
            Field::Eta => &["eta", "estimatedarrival", "estimated_arrival"],
            Field::Timestamp => &[
                "basedatetime",
                "base_date_time",
                "timestamp",
                "datetime",
                "date_time",
                "time",
            ],
            Field::CallSign => &["callsign", "call_sign"],
            Field::Imo => &["imo", "imonumber", "imo_number"],
            Field::GrossTonnage => &["grosstonnage", "gross_tonnage", "gt"],
            Field::Deadweight => &["deadweight", "dwt", "deadweight_tonnage"],
            Field::Cargo => &["cargo", "cargotype", "cargo_type"],
            Field::TransceiverClass => &[
                "transceiverclass",
                "transceiver_class",
                "typeofmobile",
                "type_of_mobile",
            ],
            Field::Flag => &["flag", "country"],
            Field::BuildYear => &["year_built", "build_year", "yearbuilt", "buildyear"],
        }
    }
}

/// Lowercase and drop whitespace and `#`, so `# Timestamp`, `TimeStamp`
/// and `timestamp` all compare equal.
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '#')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Column positions answering to each [`Field`], in alias priority order.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    columns: Vec<(Field, Vec<usize>)>,
}

impl HeaderIndex {
    pub fn new(headers: &StringRecord) -> Self {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let columns = Field::ALL
            .iter()
            .map(|&field| {
                let positions = field
                    .aliases()
                    .iter()
                    .filter_map(|alias| normalized.iter().position(|h| h == alias))
                    .collect();
                (field, positions)
            })
            .collect();
        HeaderIndex { columns }
    }

    pub fn has(&self, field: Field) -> bool {
        self.positions(field).map_or(false, |p| !p.is_empty())
    }

    fn positions(&self, field: Field) -> Option<&[usize]> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, p)| p.as_slice())
    }

    pub fn row<'a>(&'a self, record: &'a StringRecord) -> Row<'a> {
        Row {
            index: self,
            record,
        }
    }
}

/// One data row viewed through a [`HeaderIndex`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    index: &'a HeaderIndex,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// First non-empty trimmed value among the field's alias columns.
    pub fn get(&self, field: Field) -> Option<&'a str> {
        let record = self.record;
        self.index
            .positions(field)?
            .iter()
            .filter_map(|&i| record.get(i))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(parse_number)
    }

    fn text(&self, field: Field, default: &str) -> String {
        self.get(field).unwrap_or(default).to_string()
    }
}

/// Parse a finite float, tolerating surrounding whitespace.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a timestamp in any supported format, treating naive times as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

/// Collapse placeholder names to [`UNKNOWN_VESSEL`], otherwise trim and upper-case.
pub fn clean_vessel_name(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None => UNKNOWN_VESSEL.to_string(),
        Some(name) if name.is_empty() || name == "0" || name.eq_ignore_ascii_case("unknown") => {
            UNKNOWN_VESSEL.to_string()
        }
        Some(name) => name.to_uppercase(),
    }
}

/// Decode a row into a record. `None` means the row has no vessel identity.
///
/// Every other field falls back to a default, so coordinate validity is
/// left to the validator. `now` replaces unparseable timestamps.
pub fn decode_row(row: &Row<'_>, now: DateTime<Utc>) -> Option<VesselRecord> {
    let id = row.get(Field::Id)?.to_string();

    let course = row.number(Field::Course);
    let heading = row
        .number(Field::Heading)
        .filter(|h| *h != HEADING_NOT_AVAILABLE)
        .or(course)
        .unwrap_or(0.0);

    let timestamp = match row.get(Field::Timestamp).and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            debug!(
                "vessel {}: unparseable timestamp {:?}, using ingestion time",
                id,
                row.get(Field::Timestamp)
            );
            now
        }
    };

    let vessel_type_code = row.text(Field::VesselType, "0");
    let navigation_status_code = row.text(Field::Status, "");

    Some(VesselRecord {
        name: clean_vessel_name(row.get(Field::Name)),
        latitude: row.number(Field::Latitude).unwrap_or(0.0),
        longitude: row.number(Field::Longitude).unwrap_or(0.0),
        heading_degrees: heading,
        speed_knots: non_negative(row.number(Field::Speed)),
        course_over_ground: course.unwrap_or(0.0),
        vessel_type_category: classify::vessel_category(&vessel_type_code),
        vessel_type_code,
        navigation_status_category: classify::navigation_status(&navigation_status_code),
        navigation_status_code,
        length_meters: non_negative(row.number(Field::Length)),
        width_meters: non_negative(row.number(Field::Width)),
        draft_meters: non_negative(row.number(Field::Draft)),
        destination: row.text(Field::Destination, "Unknown"),
        estimated_arrival: row.text(Field::Eta, ""),
        timestamp,
        call_sign: row.text(Field::CallSign, ""),
        imo_number: row.text(Field::Imo, ""),
        gross_tonnage: non_negative(row.number(Field::GrossTonnage)),
        deadweight_tonnage: non_negative(row.number(Field::Deadweight)),
        cargo: row.text(Field::Cargo, ""),
        transceiver_class: row.text(Field::TransceiverClass, "A"),
        flag: row.text(Field::Flag, ""),
        build_year: row.text(Field::BuildYear, ""),
        id,
    })
}

fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| *v >= 0.0).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NavigationStatus, VesselCategory};
    use chrono::TimeZone;

    fn decode(headers: &[&str], values: &[&str]) -> Option<VesselRecord> {
        let index = HeaderIndex::new(&StringRecord::from(headers.to_vec()));
        let record = StringRecord::from(values.to_vec());
        decode_row(&index.row(&record), now())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header("# Timestamp"), "timestamp");
        assert_eq!(normalize_header(" BaseDateTime "), "basedatetime");
        assert_eq!(normalize_header("Ship type"), "shiptype");
    }

    #[test]
    fn missing_identity_is_a_decode_failure() {
        assert!(decode(&["lat", "lon"], &["51.5", "-0.1"]).is_none());
        assert!(decode(&["mmsi", "lat", "lon"], &["  ", "51.5", "-0.1"]).is_none());
    }

    #[test]
    fn noaa_dialect() {
        let header = [
            "MMSI",
            "BaseDateTime",
            "LAT",
            "LON",
            "SOG",
            "COG",
            "Heading",
            "VesselName",
            "VesselType",
            "Status",
            "Length",
            "Width",
            "Draft",
            "Cargo",
            "TransceiverClass",
        ];
        let values = [
            "367123456",
            "2022-01-01T00:05:00",
            "29.93",
            "-89.99",
            "3.1",
            "120.4",
            "511",
            " maersk line ",
            "80",
            "5",
            "180",
            "30",
            "9.5",
            "70",
            "A",
        ];
        let rec = decode(&header, &values).unwrap();
        assert_eq!(rec.id, "367123456");
        assert_eq!(rec.name, "MAERSK LINE");
        assert_eq!(rec.heading_degrees, 120.4);
        assert_eq!(rec.vessel_type_category, VesselCategory::Tanker);
        assert_eq!(rec.navigation_status_category, NavigationStatus::Moored);
        assert_eq!(rec.draft_meters, 9.5);
        assert_eq!(rec.destination, "Unknown");
        assert_eq!(rec.timestamp, Utc.with_ymd_and_hms(2022, 1, 1, 0, 5, 0).unwrap());
    }

    #[test]
    fn generic_dialect_with_heading() {
        let rec = decode(
            &["mmsi", "lat", "lon", "sog", "cog", "heading", "vessel_type", "timestamp"],
            &["100", "10.5", "20.5", "-4", "90", "87", "Fishing", "2023-06-01 08:30:00"],
        )
        .unwrap();
        assert_eq!(rec.heading_degrees, 87.0);
        assert_eq!(rec.speed_knots, 0.0);
        assert_eq!(rec.vessel_type_category, VesselCategory::Fishing);
        assert_eq!(rec.timestamp, Utc.with_ymd_and_hms(2023, 6, 1, 8, 30, 0).unwrap());
        assert_eq!(rec.name, UNKNOWN_VESSEL);
    }

    #[test]
    fn dma_dialect() {
        let header = [
            "# Timestamp",
            "Type of mobile",
            "MMSI",
            "Latitude",
            "Longitude",
            "Navigational status",
            "SOG",
            "COG",
            "Heading",
            "Name",
            "Ship type",
            "Draught",
            "Destination",
            "ETA",
        ];
        let values = [
            "23/06/2017 00:44:23",
            "Class A",
            "305484000",
            "56.134323",
            "11.474578",
            "Under way using engine",
            "6.8",
            "268.1",
            "264",
            "ICE MOON",
            "Cargo",
            "6.8",
            "AARHUS",
            "23/06/2017 08:00:00",
        ];
        let rec = decode(&header, &values).unwrap();
        assert_eq!(rec.timestamp, Utc.with_ymd_and_hms(2017, 6, 23, 0, 44, 23).unwrap());
        assert_eq!(rec.vessel_type_category, VesselCategory::Cargo);
        assert_eq!(
            rec.navigation_status_category,
            NavigationStatus::UnderWayUsingEngine
        );
        assert_eq!(rec.heading_degrees, 264.0);
        assert_eq!(rec.destination, "AARHUS");
        assert_eq!(rec.transceiver_class, "Class A");
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let rec = decode(
            &["mmsi", "lat", "lon", "heading", "length", "timestamp", "vesselname"],
            &["7", "abc", "", "n/a", "-3", "yesterday", "unknown"],
        )
        .unwrap();
        assert_eq!(rec.latitude, 0.0);
        assert_eq!(rec.longitude, 0.0);
        assert_eq!(rec.heading_degrees, 0.0);
        assert_eq!(rec.length_meters, 0.0);
        assert_eq!(rec.timestamp, now());
        assert_eq!(rec.name, UNKNOWN_VESSEL);
        assert_eq!(rec.vessel_type_category, VesselCategory::Other);
        assert_eq!(rec.navigation_status_category, NavigationStatus::Unknown);
    }

    #[test]
    fn first_non_empty_alias_wins() {
        let rec = decode(&["mmsi", "lat", "latitude", "lon"], &["1", "", "45.0", "9.0"]).unwrap();
        assert_eq!(rec.latitude, 45.0);
        let header = ["mmsi", "latitude", "lat", "lon"];
        let rec = decode(&header, &["1", "44.0", "45.0", "9.0"]).unwrap();
        assert_eq!(rec.latitude, 45.0);
    }

    #[test]
    fn flag_and_build_year_pass_through() {
        let header = ["mmsi", "lat", "lon", "country", "build_year"];
        let rec = decode(&header, &["1", "45.0", "9.0", "Panama", "2004"]).unwrap();
        assert_eq!(rec.flag, "Panama");
        assert_eq!(rec.build_year, "2004");
        let rec = decode(&["mmsi", "lat", "lon"], &["1", "45.0", "9.0"]).unwrap();
        assert!(rec.flag.is_empty());
        assert!(rec.build_year.is_empty());
    }

    #[test]
    fn vessel_name_cleaning() {
        assert_eq!(clean_vessel_name(None), UNKNOWN_VESSEL);
        assert_eq!(clean_vessel_name(Some("0")), UNKNOWN_VESSEL);
        assert_eq!(clean_vessel_name(Some("UNKNOWN")), UNKNOWN_VESSEL);
        assert_eq!(clean_vessel_name(Some("  ever given ")), "EVER GIVEN");
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2022-01-01T00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2022-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2022-01-01T01:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2022-01-01 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("01/01/2022 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2022-01-01"), Some(expected));
        assert_eq!(parse_timestamp("not a date"), None);
    }
}
