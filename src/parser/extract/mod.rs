pub mod crash;
pub mod person;
pub mod vehicle;

use serde::Serialize;
use tracing::debug;

use super::lines::LineStream;
use super::pages::{self, PageType};
use super::sections::{self, Section};
use super::Diagnostics;
use crate::config::Calibration;
use crash::CrashDraft;
use person::PersonDraft;
use vehicle::VehicleDraft;

/// Where things were found, kept for inspection output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Layout {
    pub page_types: Vec<PageType>,
    pub vehicles: Vec<Section>,
    pub persons: Vec<Section>,
}

pub struct ExtractedData {
    pub crash: CrashDraft,
    pub vehicles: Vec<VehicleDraft>,
    pub layout: Layout,
}

pub fn extract_all(stream: &LineStream, cal: &Calibration, diag: &mut Diagnostics) -> ExtractedData {
    let page_types: Vec<PageType> = (0..stream.page_count())
        .map(|p| {
            let kind = pages::classify(stream.page_lines(p), cal.classify_window);
            debug!(page = p, %kind, "classified page");
            kind
        })
        .collect();
    let type_at = |idx: usize| {
        stream
            .page_of(idx)
            .and_then(|p| page_types.get(p).copied())
            .unwrap_or(PageType::Unknown)
    };

    let vehicle_sections: Vec<Section> = sections::segment_vehicles(stream, cal)
        .into_iter()
        .filter(|s| type_at(s.anchor) != PageType::CrashInfo)
        .collect();
    if vehicle_sections.is_empty() {
        diag.warn("no vehicle sections found");
    }

    let preamble_end = vehicle_sections.first().map_or(stream.len(), |v| v.start);
    let crash = crash::extract(stream, &page_types, preamble_end, diag);

    let mut vehicles: Vec<VehicleDraft> = vehicle_sections
        .iter()
        .enumerate()
        .map(|(i, s)| vehicle::extract(stream, s, i, diag))
        .collect();

    let mut bounds = Vec::with_capacity(vehicle_sections.len() + 1);
    if preamble_end > 0 {
        bounds.push(0..preamble_end);
    }
    let spill = sections::spill_bounds(&vehicle_sections, stream.len());
    bounds.extend(spill.iter().cloned());

    let mut person_sections: Vec<Section> = Vec::new();
    let mut person_kinds: Vec<PageType> = Vec::new();
    for s in bounds
        .into_iter()
        .flat_map(|b| sections::segment_persons(stream, b, cal))
    {
        match person_page_type(type_at(s.start), type_at(s.anchor)) {
            Some(kind) => {
                person_sections.push(s);
                person_kinds.push(kind);
            }
            None => debug!(start = s.start, anchor = s.anchor, "skipping injury marker on unclassified page"),
        }
    }
    if person_sections.is_empty() {
        diag.warn("no person sections found");
    }

    let persons: Vec<PersonDraft> = person_sections
        .iter()
        .zip(&person_kinds)
        .enumerate()
        .map(|(i, (s, kind))| person::extract(stream, s, *kind, i, diag))
        .collect();

    link_persons(&mut vehicles, &spill, persons, diag);

    ExtractedData {
        crash,
        vehicles,
        layout: Layout {
            page_types,
            vehicles: vehicle_sections,
            persons: person_sections,
        },
    }
}

/// The page type a person block is read as. The heading's page wins, so a
/// motorist block running onto an unclassified page keeps its type. Blocks
/// lying wholly on unclassified pages are not persons.
fn person_page_type(start: PageType, anchor: PageType) -> Option<PageType> {
    let person_page = |t: PageType| matches!(t, PageType::MotoristInfo | PageType::OccupantInfo);
    if person_page(start) {
        Some(start)
    } else if person_page(anchor) {
        Some(anchor)
    } else if start == PageType::Unknown && anchor == PageType::Unknown {
        None
    } else {
        Some(anchor)
    }
}

/// Attach each person to the vehicle named by its own unit number, else to the
/// vehicle whose spill bound holds it. Persons matching neither are dropped.
fn link_persons(
    vehicles: &mut [VehicleDraft],
    spill: &[std::ops::Range<usize>],
    persons: Vec<PersonDraft>,
    diag: &mut Diagnostics,
) {
    for person in persons {
        let by_unit = person.unit_ref.as_deref().and_then(|unit| {
            vehicles
                .iter()
                .position(|v| !unit.is_empty() && v.fields.vehicle_unit == unit)
        });
        let target = by_unit.or_else(|| spill.iter().position(|b| b.contains(&person.section.anchor)));

        let Some(idx) = target else {
            diag.warn(format!(
                "dropping person at line {} with no vehicle to attach to",
                person.section.anchor
            ));
            continue;
        };

        let vehicle = &mut vehicles[idx];
        let mut record = person.record;
        if person.address_from_driver {
            if let Some(driver) = vehicle
                .persons
                .iter()
                .find(|p| p.fields.person_type == "D")
            {
                record.address_block = driver.address_block.clone();
            }
        }
        vehicle.persons.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lines::split_pages;

    fn fixture() -> LineStream {
        let text = std::fs::read_to_string("tests/fixtures/oh1_two_units.txt").unwrap();
        LineStream::build("oh1_two_units.txt", &split_pages(&text)).unwrap()
    }

    #[test]
    fn fixture_layout_and_linking() {
        let stream = fixture();
        let mut diag = Diagnostics::default();
        let data = extract_all(&stream, &Calibration::default(), &mut diag);

        assert_eq!(
            data.layout.page_types,
            vec![
                PageType::CrashInfo,
                PageType::VehicleUnit,
                PageType::VehicleUnit,
                PageType::MotoristInfo,
                PageType::OccupantInfo,
                PageType::Unknown,
            ]
        );
        assert_eq!(data.layout.vehicles.len(), 2);
        assert_eq!(data.layout.persons.len(), 3);

        let names = |v: &VehicleDraft| -> Vec<String> {
            v.persons.iter().map(|p| p.fields.first_name.clone()).collect()
        };
        assert_eq!(names(&data.vehicles[0]), vec!["JOHN"]);
        assert_eq!(names(&data.vehicles[1]), vec!["MARY", "TIMMY"]);

        let child = &data.vehicles[1].persons[1];
        assert_eq!(child.address_block.address_line1, "88 ELM ST");
        assert!(diag.warnings.is_empty());
    }

    #[test]
    fn consecutive_vehicles_have_no_persons() {
        let pages = [
            "UNIT #\n1\nOWNER NAME: LAST, FIRST, MIDDLE ( SAME AS DRIVER )\nDOE, JOHN",
            "UNIT #\n2\nOWNER NAME: LAST, FIRST, MIDDLE ( SAME AS DRIVER )\nROE, MARY",
        ];
        let stream = LineStream::build("t", &pages).unwrap();
        let mut diag = Diagnostics::default();
        let data = extract_all(&stream, &Calibration::default(), &mut diag);
        assert_eq!(data.vehicles.len(), 2);
        assert!(data.vehicles.iter().all(|v| v.persons.is_empty()));
        assert!(diag.warnings.iter().any(|w| w.contains("no person")));
    }

    #[test]
    fn person_without_vehicle_is_dropped() {
        let stream = LineStream::build("t", &["MOTORIST / NON-MOTORIST\nUNIT #\n1\nINJURIES\n3"]).unwrap();
        let mut diag = Diagnostics::default();
        let data = extract_all(&stream, &Calibration::default(), &mut diag);
        assert!(data.vehicles.is_empty());
        assert_eq!(data.layout.persons.len(), 1);
        assert!(diag.warnings.iter().any(|w| w.contains("dropping person")));
    }

    const UNIT_PAGE: &str = "UNIT #\n1\nOWNER NAME: LAST, FIRST, MIDDLE ( SAME AS DRIVER )\nDOE, JOHN";

    #[test]
    fn narrative_injury_marker_is_not_a_person() {
        let pages = [
            UNIT_PAGE,
            "MOTORIST / NON-MOTORIST\nUNIT #\n1\nNAME: LAST, FIRST, MIDDLE\nDOE, JOHN\nINJURIES\n3",
            "NARRATIVE\nUNIT 1 STRUCK A POLE\nINJURIES\n2",
        ];
        let stream = LineStream::build("t", &pages).unwrap();
        let mut diag = Diagnostics::default();
        let data = extract_all(&stream, &Calibration::default(), &mut diag);

        assert_eq!(data.layout.page_types[2], PageType::Unknown);
        assert_eq!(data.layout.persons.len(), 1);
        let persons = &data.vehicles[0].persons;
        assert_eq!(persons.len(), 1);
        assert_eq!(persons[0].fields.person_type, "D");
        assert_eq!(persons[0].fields.last_name, "DOE");
    }

    #[test]
    fn motorist_block_continues_onto_next_page() {
        let pages = [
            UNIT_PAGE,
            "MOTORIST / NON-MOTORIST\nUNIT #\n1\nNAME: LAST, FIRST, MIDDLE\nDOE, JOHN, ALLEN\nDATE OF BIRTH\n04/17/1988",
            "INJURIES\n3\nOL STATE\nOH\nOPERATOR LICENSE NUMBER\nRS448812",
        ];
        let stream = LineStream::build("t", &pages).unwrap();
        let mut diag = Diagnostics::default();
        let data = extract_all(&stream, &Calibration::default(), &mut diag);

        assert_eq!(data.layout.page_types[2], PageType::Unknown);
        let persons = &data.vehicles[0].persons;
        assert_eq!(persons.len(), 1);
        let f = &persons[0].fields;
        assert_eq!(f.person_type, "D");
        assert_eq!(f.last_name, "DOE");
        assert_eq!(f.injury, "3");
        assert_eq!(f.dl_state, "OH");
        assert_eq!(f.driving_license, "RS448812");
    }

    #[test]
    fn person_type_prefers_heading_page() {
        use PageType::*;
        assert_eq!(person_page_type(MotoristInfo, Unknown), Some(MotoristInfo));
        assert_eq!(person_page_type(VehicleUnit, OccupantInfo), Some(OccupantInfo));
        assert_eq!(person_page_type(Unknown, Unknown), None);
        assert_eq!(person_page_type(VehicleUnit, VehicleUnit), Some(VehicleUnit));
    }

    #[test]
    fn unmatched_unit_falls_back_to_containing_vehicle() {
        let pages = [
            "UNIT #\n1\nOWNER NAME ( SAME AS DRIVER )",
            "MOTORIST / NON-MOTORIST\nUNIT #\n7\nINJURIES\n1",
        ];
        let stream = LineStream::build("t", &pages).unwrap();
        let mut diag = Diagnostics::default();
        let data = extract_all(&stream, &Calibration::default(), &mut diag);
        assert_eq!(data.vehicles.len(), 1);
        assert_eq!(data.vehicles[0].persons.len(), 1);
        let spill = sections::spill_bounds(&data.layout.vehicles, stream.len());
        assert!(spill[0].contains(&data.layout.persons[0].anchor));
    }
}
