use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::extract::crash::CrashDraft;
use super::extract::vehicle::VehicleDraft;
use super::Diagnostics;
use crate::config::Jurisdiction;
use crate::record::{CrashRecord, VehicleRecord};

/// Ohio county numbers are alphabetical, 1 through 88.
const OHIO_COUNTIES: [&str; 88] = [
    "ADAMS", "ALLEN", "ASHLAND", "ASHTABULA", "ATHENS", "AUGLAIZE", "BELMONT", "BROWN",
    "BUTLER", "CARROLL", "CHAMPAIGN", "CLARK", "CLERMONT", "CLINTON", "COLUMBIANA",
    "COSHOCTON", "CRAWFORD", "CUYAHOGA", "DARKE", "DEFIANCE", "DELAWARE", "ERIE",
    "FAIRFIELD", "FAYETTE", "FRANKLIN", "FULTON", "GALLIA", "GEAUGA", "GREENE", "GUERNSEY",
    "HAMILTON", "HANCOCK", "HARDIN", "HARRISON", "HENRY", "HIGHLAND", "HOCKING", "HOLMES",
    "HURON", "JACKSON", "JEFFERSON", "KNOX", "LAKE", "LAWRENCE", "LICKING", "LOGAN",
    "LORAIN", "LUCAS", "MADISON", "MAHONING", "MARION", "MEDINA", "MEIGS", "MERCER", "MIAMI",
    "MONROE", "MONTGOMERY", "MORGAN", "MORROW", "MUSKINGUM", "NOBLE", "OTTAWA", "PAULDING",
    "PERRY", "PICKAWAY", "PIKE", "PORTAGE", "PREBLE", "PUTNAM", "RICHLAND", "ROSS",
    "SANDUSKY", "SCIOTO", "SENECA", "SHELBY", "STARK", "SUMMIT", "TRUMBULL", "TUSCARAWAS",
    "UNION", "VAN WERT", "VINTON", "WARREN", "WASHINGTON", "WAYNE", "WILLIAMS", "WOOD",
    "WYANDOT",
];

/// Build the final record: settle unit numbers, order vehicles, normalize
/// dates and fill the values the form never prints.
pub fn assemble(
    crash: CrashDraft,
    vehicles: Vec<VehicleDraft>,
    jurisdiction: &Jurisdiction,
    source_ref: &str,
    diag: &mut Diagnostics,
) -> CrashRecord {
    let mut fields = crash.fields;
    let mut case = crash.case_detail;

    fields.date_of_crash = normalize_date(&fields.date_of_crash);

    let mut vehicles = settle_units(vehicles, diag);
    for person in vehicles.iter_mut().flat_map(|v| v.persons.iter_mut()) {
        person.fields.date_of_birth = normalize_date(&person.fields.date_of_birth);
    }
    vehicles.sort_by(|a, b| unit_order(&a.fields.vehicle_unit, &b.fields.vehicle_unit));

    let count = vehicles.len().to_string();
    fields.total_vehicles = match crash.explicit_total_vehicles {
        Some(explicit) => {
            if explicit != count {
                diag.warn(format!(
                    "NUMBER OF UNITS says {} but {} vehicles were extracted",
                    explicit, count
                ));
            }
            explicit
        }
        None => count,
    };

    if fields.department.is_empty() {
        fields.department = jurisdiction.department.clone();
    }
    if fields.state_code.is_empty() {
        fields.state_code = jurisdiction.state_code.clone();
    }
    if fields.state_abbreviation.is_empty() {
        fields.state_abbreviation = jurisdiction.state_abbreviation.clone();
    }
    if fields.state_name.is_empty() {
        fields.state_name = jurisdiction.state_name.clone();
    }
    if fields.county.is_empty() {
        fields.county = county_name(&fields.county_code)
            .map(str::to_string)
            .unwrap_or_else(|| fields.county_code.clone());
    }

    case.local_information = fields.report_number.clone();
    case.locality = locality(&fields.crash_location).to_string();
    fields.pdf_file_path = source_ref.to_string();

    CrashRecord {
        fields,
        case_detail: vec![case],
        vehicles,
    }
}

/// Keep the first vehicle for each unit number, folding the persons of later
/// duplicates into it, then number the units that carry none.
fn settle_units(vehicles: Vec<VehicleDraft>, diag: &mut Diagnostics) -> Vec<VehicleRecord> {
    let mut kept: Vec<VehicleRecord> = Vec::with_capacity(vehicles.len());

    for v in vehicles {
        let unit = v.fields.vehicle_unit.clone();
        if !unit.is_empty() {
            if let Some(first) = kept.iter_mut().find(|k| k.fields.vehicle_unit == unit) {
                diag.warn(format!(
                    "duplicate vehicle unit {} at line {}; merged {} person(s) into the first",
                    unit,
                    v.section.anchor,
                    v.persons.len()
                ));
                first.persons.extend(v.persons);
                continue;
            }
        }
        kept.push(VehicleRecord {
            fields: v.fields,
            vehicle_details: v.details,
            persons: v.persons,
        });
    }

    let mut used: BTreeSet<u32> = kept
        .iter()
        .filter_map(|v| v.fields.vehicle_unit.parse().ok())
        .collect();
    let mut next = 1;
    for v in kept.iter_mut().filter(|v| v.fields.vehicle_unit.is_empty()) {
        while used.contains(&next) {
            next += 1;
        }
        used.insert(next);
        v.fields.vehicle_unit = next.to_string();
    }

    kept
}

/// Numeric when both parse, numbers before text, otherwise lexical.
fn unit_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// `"MM/DD/YYYY ..."` to `"YYYY-MM-DD"`; anything unparsable becomes `""`.
pub fn normalize_date(raw: &str) -> String {
    let token = raw.split_whitespace().next().unwrap_or("");
    NaiveDate::parse_from_str(token, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(token, "%Y-%m-%d"))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn denormalize_date(iso: &str) -> String {
    NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .map(|d| d.format("%m/%d/%Y").to_string())
        .unwrap_or_default()
}

pub fn county_name(code: &str) -> Option<&'static str> {
    let n: usize = code.trim().parse().ok()?;
    OHIO_COUNTIES.get(n.checked_sub(1)?).copied()
}

fn locality(location: &str) -> &'static str {
    let upper = location.to_uppercase();
    if upper.contains("TOWNSHIP") || upper.contains("TWP") {
        "TOWNSHIP"
    } else if upper.contains("VILLAGE") {
        "VILLAGE"
    } else if upper.trim().is_empty() {
        ""
    } else {
        "CITY"
    }
}
