use std::sync::LazyLock;

use regex::Regex;

use crate::parser::anchor::Anchor;
use crate::parser::lines::LineStream;
use crate::parser::resolve::{self, Delimiter, FieldRule, Validator};
use crate::parser::sections::Section;
use crate::parser::Diagnostics;
use crate::record::{PersonRecord, VehicleDetails, VehicleFields};

/// "LP STATE  LICENSE PLATE #  VEHICLE IDENTIFICATION #  VEHICLE YEAR  VEHICLE MAKE"
/// labels a single row holding all five values.
const PLATE_ROW: Anchor = Anchor::All(&["LP STATE", "LICENSE PLATE #"]);

static VEHICLE_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::code("vehicle_unit", Anchor::Exact("UNIT #"), 2),
        FieldRule::split("plate_state", PLATE_ROW, 1, Delimiter::Whitespace, 0)
            .validate(Validator::StateCode),
        FieldRule::split("plate_number", PLATE_ROW, 1, Delimiter::Whitespace, 1)
            .validate(Validator::Pattern(Regex::new(r"^[A-Z0-9-]{2,10}$").unwrap())),
        FieldRule::split("vin", PLATE_ROW, 1, Delimiter::Whitespace, 2).validate(Validator::Vin),
        FieldRule::capture(
            "vin",
            Anchor::Literal("VEHICLE IDENTIFICATION #"),
            r"\b([A-HJ-NPR-Z0-9]{17})\b",
            &[1, 2],
        ),
        FieldRule::split("vehicle_year", PLATE_ROW, 1, Delimiter::Whitespace, 3)
            .validate(Validator::Year),
        FieldRule::split("make", PLATE_ROW, 1, Delimiter::Whitespace, 4)
            .rest()
            .validate(Validator::NotLabel),
        FieldRule::offset("plate_number", Anchor::Exact("LICENSE PLATE #"), 1)
            .validate(Validator::Pattern(Regex::new(r"^[A-Z0-9-]{2,10}$").unwrap())),
        FieldRule::offset("vehicle_year", Anchor::Exact("VEHICLE YEAR"), 1).validate(Validator::Year),
        FieldRule::offset("make", Anchor::Exact("VEHICLE MAKE"), 1).validate(Validator::NotLabel),
        FieldRule::offset("model", Anchor::Literal("VEHICLE MODEL"), 1).validate(Validator::NotLabel),
        FieldRule::offset("color", Anchor::Exact("COLOR"), 1).validate(Validator::NotLabel),
        FieldRule::offset("plate_year", Anchor::Literal("PLATE YEAR"), 1).validate(Validator::Year),
        FieldRule::offset("policy", Anchor::Literal("INSURANCE POLICY #"), 1)
            .validate(Validator::NotLabel),
        FieldRule::code("is_hit_and_run", Anchor::Literal("HIT/SKIP UNIT"), 1),
        FieldRule::code("vehicle_type", Anchor::Literal("UNIT TYPE"), 2),
        FieldRule::code("vehicle_used", Anchor::Literal("VEHICLE USED"), 2),
        FieldRule::code("vehicle_body_type", Anchor::Literal("BODY TYPE"), 2),
        FieldRule::code("vehicle_travel_direction", Anchor::Literal("DIRECTION OF TRAVEL"), 2),
        FieldRule::code("trailer_or_carrier_count", Anchor::Literal("# OF TRAILING UNITS"), 2),
    ]
});

static DETAIL_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    let sequence = || Anchor::Literal("SEQUENCE OF EVENTS");
    vec![
        FieldRule::code("crash_seq_1st_event", sequence(), 4).contiguous(),
        FieldRule::code("crash_seq_2nd_event", sequence(), 4).nth(1).contiguous(),
        FieldRule::code("crash_seq_3rd_event", sequence(), 4).nth(2).contiguous(),
        FieldRule::code("crash_seq_4th_event", sequence(), 4).nth(3).contiguous(),
        FieldRule::code("most_harmful_event", Anchor::Literal("MOST HARMFUL EVENT"), 2),
        FieldRule::code("authorized_speed", Anchor::Literal("POSTED SPEED"), 2),
        FieldRule::code("estimated_original_speed", Anchor::Literal("ESTIMATED ORIGINAL SPEED"), 2),
        FieldRule::code("estimated_impact_speed", Anchor::Literal("ESTIMATED IMPACT SPEED"), 2),
        FieldRule::code("tad", Anchor::Exact("TAD"), 2),
        FieldRule::capture(
            "estimated_damage",
            Anchor::Literal("ESTIMATED DAMAGE"),
            r"^\$?\s*([\d,]+(?:\.\d{2})?)$",
            &[1],
        ),
        FieldRule::offset("insurance_company", Anchor::Literal("INSURANCE COMPANY"), 1)
            .validate(Validator::NotLabel),
        FieldRule::offset("us_dot", Anchor::Literal("US DOT #"), 1)
            .validate(Validator::Pattern(Regex::new(r"^\d{5,8}$").unwrap())),
        FieldRule::offset("towed_by", Anchor::Literal("TOWED BY"), 1).validate(Validator::NotLabel),
        FieldRule::code("occupant_count", Anchor::Literal("# OCCUPANTS"), 2),
        FieldRule::code("initial_impact", Anchor::Literal("INITIAL POINT OF CONTACT"), 2),
        FieldRule::code("contributing_circumstance", Anchor::Literal("CONTRIBUTING CIRCUMSTANCE"), 3),
        FieldRule::code("damage_severity", Anchor::Literal("DAMAGE SCALE"), 2),
        FieldRule::offset("damaged_area", Anchor::Literal("DAMAGED AREA"), 1)
            .validate(Validator::NotLabel),
        FieldRule::offset("vehicle_defects", Anchor::Literal("VEHICLE DEFECTS"), 1)
            .validate(Validator::NotLabel),
        FieldRule::code("overweight_permit", Anchor::Literal("OVERWEIGHT PERMIT"), 2),
    ]
});

/// One vehicle block before unit settlement; persons are linked in afterwards.
#[derive(Debug, Clone)]
pub struct VehicleDraft {
    pub section: Section,
    pub fields: VehicleFields,
    pub details: VehicleDetails,
    pub persons: Vec<PersonRecord>,
}

pub fn extract(stream: &LineStream, section: &Section, ordinal: usize, diag: &mut Diagnostics) -> VehicleDraft {
    let scope = format!("vehicle[{}]", ordinal);
    let bounds = [section.range()];

    let mut fields = VehicleFields::default();
    for (field, value) in resolve::apply(&VEHICLE_RULES, stream.lines(), &bounds, &scope, diag) {
        fields.set(field, value);
    }

    let mut details = VehicleDetails::default();
    for (field, value) in resolve::apply(&DETAIL_RULES, stream.lines(), &bounds, &scope, diag) {
        details.set(field, value);
    }

    if !details.towed_by.is_empty() {
        fields.is_towed = "1".into();
    }
    if !details.insurance_company.is_empty() {
        details.insurance_verified = "1".into();
    }
    if !details.us_dot.is_empty() {
        fields.is_commercial = "1".into();
    }

    VehicleDraft {
        section: *section,
        fields,
        details,
        persons: Vec::new(),
    }
}
