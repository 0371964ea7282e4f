use std::fmt;

use serde::Serialize;

use super::lines::Line;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageType {
    CrashInfo,
    VehicleUnit,
    MotoristInfo,
    OccupantInfo,
    Unknown,
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PageType::CrashInfo => "crash-info",
            PageType::VehicleUnit => "vehicle-unit",
            PageType::MotoristInfo => "motorist",
            PageType::OccupantInfo => "occupant",
            PageType::Unknown => "unknown",
        };
        f.pad(label)
    }
}

/// Classify a page from the marker keywords in its first `window` lines.
pub fn classify(page: &[Line], window: usize) -> PageType {
    let header = page
        .iter()
        .take(window)
        .map(|l| l.text.to_uppercase())
        .collect::<Vec<_>>()
        .join(" ");

    if header.contains("LOCAL REPORT NUMBER")
        && (header.contains("PHOTOS TAKEN") || header.contains("OH-2"))
    {
        PageType::CrashInfo
    } else if header.contains("UNIT #")
        && ["COMMERCIAL", "OWNER", "VEHICLE"]
            .iter()
            .any(|k| header.contains(k))
    {
        PageType::VehicleUnit
    } else if header.contains("MOTORIST") && header.contains("NON-MOTORIST") {
        PageType::MotoristInfo
    } else if header.contains("OCCUPANT") && header.contains("WITNESS") {
        PageType::OccupantInfo
    } else {
        PageType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(texts: &[&str]) -> Vec<Line> {
        texts
            .iter()
            .map(|t| Line {
                text: t.to_string(),
                page: 0,
            })
            .collect()
    }

    #[test]
    fn crash_info_needs_both_markers() {
        let p = page(&["LOCAL REPORT NUMBER *", "25-0422-01", "PHOTOS TAKEN"]);
        assert_eq!(classify(&p, 20), PageType::CrashInfo);
        let p = page(&["LOCAL REPORT NUMBER *", "25-0422-01"]);
        assert_eq!(classify(&p, 20), PageType::Unknown);
    }

    #[test]
    fn vehicle_unit() {
        let p = page(&["UNIT #", "1", "OWNER NAME: LAST, FIRST, MIDDLE ( SAME AS DRIVER )"]);
        assert_eq!(classify(&p, 20), PageType::VehicleUnit);
    }

    #[test]
    fn motorist_and_occupant() {
        let p = page(&["MOTORIST / NON-MOTORIST", "UNIT #", "1"]);
        assert_eq!(classify(&p, 20), PageType::MotoristInfo);
        let p = page(&["Occupant / Witness Addendum", "UNIT #", "2"]);
        assert_eq!(classify(&p, 20), PageType::OccupantInfo);
    }

    #[test]
    fn markers_outside_window_are_ignored() {
        let mut texts = vec!["filler"; 20];
        texts.push("MOTORIST / NON-MOTORIST");
        let p = page(&texts);
        assert_eq!(classify(&p, 20), PageType::Unknown);
        assert_eq!(classify(&p, 21), PageType::MotoristInfo);
    }

    #[test]
    fn empty_page_is_unknown() {
        assert_eq!(classify(&[], 20), PageType::Unknown);
    }
}
