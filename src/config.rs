use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::model::VesselCategory;
use crate::pipeline::IngestOptions;
use crate::validate::BoundingBox;

const fn bbox(north: f64, south: f64, east: f64, west: f64) -> Option<BoundingBox> {
    Some(BoundingBox {
        north,
        south,
        east,
        west,
    })
}

/// Named bounding boxes for common US coastal regions.
pub const REGIONS: &[(&str, Option<BoundingBox>)] = &[
    ("all", None),
    ("northeast", bbox(45.0, 35.0, -65.0, -80.0)),
    ("southeast", bbox(35.0, 25.0, -75.0, -85.0)),
    ("gulfcoast", bbox(31.0, 24.0, -80.0, -100.0)),
    ("westcoast", bbox(50.0, 32.0, -115.0, -130.0)),
    ("greatlakes", bbox(49.0, 41.0, -76.0, -93.0)),
];

pub fn region(name: &str) -> Result<Option<BoundingBox>> {
    REGIONS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(_, bbox)| *bbox)
        .with_context(|| {
            let known: Vec<_> = REGIONS.iter().map(|(n, _)| *n).collect();
            format!("unknown region '{}', expected one of {}", name, known.join(", "))
        })
}

/// Parse `north,south,east,west`.
pub fn parse_bbox(raw: &str) -> Result<BoundingBox> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("bad bounding box '{raw}'"))?;
    let &[north, south, east, west] = parts.as_slice() else {
        bail!(
            "bounding box needs 4 values (north,south,east,west), got {}",
            parts.len()
        );
    };
    if south > north || west > east {
        bail!("bounding box '{raw}' is inverted");
    }
    Ok(BoundingBox {
        north,
        south,
        east,
        west,
    })
}

pub fn parse_vessel_types<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<Option<HashSet<VesselCategory>>> {
    let types = names
        .into_iter()
        .map(|n| n.parse::<VesselCategory>())
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(if types.is_empty() { None } else { Some(types) })
}

#[derive(Debug)]
pub struct Config {
    pub paths: Vec<PathBuf>,
    pub options: IngestOptions,
    pub json: bool,
}

impl Config {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Config {
            paths,
            options: IngestOptions::default(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_parsing() {
        let bbox = parse_bbox("45, 35, -65, -80").unwrap();
        assert_eq!(bbox.north, 45.0);
        assert_eq!(bbox.west, -80.0);
        assert!(parse_bbox("45,35,-65").is_err());
        assert!(parse_bbox("35,45,-65,-80").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
    }

    #[test]
    fn region_lookup() {
        assert!(region("all").unwrap().is_none());
        assert_eq!(region("GulfCoast").unwrap().unwrap().west, -100.0);
        assert!(region("atlantis").is_err());
    }

    #[test]
    fn vessel_type_list() {
        let types = parse_vessel_types(["cargo", "Tanker"]).unwrap().unwrap();
        assert!(types.contains(&VesselCategory::Cargo));
        assert!(types.contains(&VesselCategory::Tanker));
        assert!(parse_vessel_types(Vec::<&str>::new()).unwrap().is_none());
        assert!(parse_vessel_types(["boat"]).is_err());
    }
}
