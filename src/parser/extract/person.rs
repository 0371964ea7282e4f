use std::sync::LazyLock;

use regex::Regex;

use crate::parser::anchor::{self, Anchor};
use crate::parser::lines::LineStream;
use crate::parser::pages::PageType;
use crate::parser::resolve::{self, Delimiter, FieldRule, LineTest, Validator};
use crate::parser::sections::Section;
use crate::parser::Diagnostics;
use crate::record::{AddressBlock, PersonRecord};

static UNIT_REF: LazyLock<FieldRule> =
    LazyLock::new(|| FieldRule::code("vehicle_unit", Anchor::Exact("UNIT #"), 2));

static ADDRESS_LABEL: LazyLock<Anchor> =
    LazyLock::new(|| Anchor::Pattern(Regex::new(r"^ADDRESS:").unwrap()));

static PERSON_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    let name = || Anchor::Pattern(Regex::new(r"^NAME:").unwrap());
    vec![
        FieldRule::split("last_name", name(), 1, Delimiter::Comma, 0).validate(Validator::NotLabel),
        FieldRule::split("first_name", name(), 1, Delimiter::Comma, 1).validate(Validator::NotLabel),
        FieldRule::split("middle_name", name(), 1, Delimiter::Comma, 2).validate(Validator::NotLabel),
        FieldRule::capture(
            "date_of_birth",
            Anchor::Literal("DATE OF BIRTH"),
            r"(\d{1,2}/\d{1,2}/\d{4})",
            &[0, 1],
        ),
        FieldRule::code("age", Anchor::Exact("AGE"), 2),
        FieldRule::pick("gender", Anchor::Exact("GENDER"), 2, LineTest::OneOf(&["M", "F", "U"])),
        FieldRule::capture(
            "contact_number",
            Anchor::Literal("CONTACT PHONE"),
            r"(\(?\d{3}\)?[-\s.]?\d{3}-\d{4})",
            &[0, 1],
        ),
        FieldRule::code("injury", Anchor::Exact("INJURIES"), 1),
        FieldRule::code("injured_taken_by_ems", Anchor::Literal("INJURED TAKEN BY"), 2),
        FieldRule::offset("ems_name", Anchor::Literal("EMS AGENCY"), 1).validate(Validator::NotLabel),
        FieldRule::offset("injured_taken_to", Anchor::Literal("INJURED TAKEN TO"), 1)
            .validate(Validator::NotLabel),
        FieldRule::code("seating_position", Anchor::Exact("SEATING POSITION"), 2),
        FieldRule::code("airbag_deployed", Anchor::Literal("AIR BAG USAGE"), 2),
        FieldRule::code("ejection", Anchor::Exact("EJECTION"), 2),
        FieldRule::code("trapped", Anchor::Exact("TRAPPED"), 2),
    ]
});

/// Operator-only fields printed on motorist pages.
static MOTORIST_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::offset("dl_state", Anchor::Exact("OL STATE"), 1).validate(Validator::StateCode),
        FieldRule::offset("driving_license", Anchor::Literal("OPERATOR LICENSE NUMBER"), 1)
            .validate(Validator::NotLabel),
        FieldRule::offset("ol_class", Anchor::Exact("OL CLASS"), 1).validate(Validator::NotLabel),
        FieldRule::offset("endorsement", Anchor::Exact("ENDORSEMENT"), 1).validate(Validator::NotLabel),
        FieldRule::offset("restriction", Anchor::Exact("RESTRICTION"), 1).validate(Validator::NotLabel),
        FieldRule::code("driver_distracted_by", Anchor::Literal("DISTRACTED BY"), 2),
        FieldRule::offset("alcohol_or_drug_suspected", Anchor::Literal("ALCOHOL / DRUG SUSPECTED"), 1)
            .validate(Validator::NotLabel),
        FieldRule::code("alcohol_test_status", Anchor::Exact("ALCOHOL TEST STATUS"), 2),
        FieldRule::code("alcohol_test_type", Anchor::Exact("ALCOHOL TEST TYPE"), 2),
        FieldRule::offset("alcohol_test_value", Anchor::Exact("ALCOHOL TEST VALUE"), 1)
            .validate(Validator::Pattern(Regex::new(r"^\d*\.\d+$").unwrap())),
        FieldRule::code("drug_test_status", Anchor::Exact("DRUG TEST STATUS"), 2),
        FieldRule::code("drug_test_type", Anchor::Exact("DRUG TEST TYPE"), 2),
        FieldRule::offset("drug_test_value", Anchor::Exact("DRUG TEST VALUE"), 1)
            .validate(Validator::NotLabel),
        FieldRule::offset("offense_charged", Anchor::Exact("OFFENSE CHARGED"), 1)
            .validate(Validator::NotLabel),
        FieldRule::offset("local_code", Anchor::Exact("LOCAL CODE"), 1).validate(Validator::NotLabel),
        FieldRule::offset("offense_description", Anchor::Exact("OFFENSE DESCRIPTION"), 1)
            .validate(Validator::NotLabel),
        FieldRule::offset("citation_number", Anchor::Exact("CITATION NUMBER"), 1)
            .validate(Validator::Pattern(Regex::new(r"^[A-Z0-9-]{4,}$").unwrap())),
    ]
});

static ADDRESS_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    let label = || ADDRESS_LABEL.clone();
    vec![
        FieldRule::split("address_line1", label(), 1, Delimiter::Comma, 0).validate(Validator::NotLabel),
        FieldRule::split("address_city", label(), 1, Delimiter::Comma, 1).validate(Validator::NotLabel),
        FieldRule::split("address_state", label(), 1, Delimiter::Comma, 2).validate(Validator::StateCode),
        FieldRule::split("address_zip", label(), 1, Delimiter::Comma, 3)
            .validate(Validator::Pattern(Regex::new(r"^\d{5}(-\d{4})?$").unwrap())),
    ]
});

#[derive(Debug, Clone)]
pub struct PersonDraft {
    pub section: Section,
    /// Unit number printed in the person's own block, if any.
    pub unit_ref: Option<String>,
    /// The address row only says "SAME AS DRIVER".
    pub address_from_driver: bool,
    pub record: PersonRecord,
}

pub fn extract(
    stream: &LineStream,
    section: &Section,
    page_type: PageType,
    ordinal: usize,
    diag: &mut Diagnostics,
) -> PersonDraft {
    let scope = format!("person[{}]", ordinal);
    let lines = stream.lines();
    let bounds = [section.range()];
    let mut record = PersonRecord::default();

    for (field, value) in resolve::apply(&PERSON_RULES, lines, &bounds, &scope, diag) {
        record.fields.set(field, value);
    }

    match page_type {
        PageType::MotoristInfo => {
            record.fields.person_type = "D".into();
            record.fields.same_as_driver = "1".into();
            for (field, value) in resolve::apply(&MOTORIST_RULES, lines, &bounds, &scope, diag) {
                record.fields.set(field, value);
            }
        }
        PageType::OccupantInfo => {
            record.fields.person_type = "O".into();
            record.fields.occupant = "1".into();
        }
        _ => {}
    }

    let address_from_driver = anchor::find(&ADDRESS_LABEL, lines, section.start, Some(section.len()))
        .is_some_and(|at| lines[at].text.contains("SAME AS DRIVER"));
    if !address_from_driver {
        let mut block = AddressBlock::default();
        for (field, value) in resolve::apply(&ADDRESS_RULES, lines, &bounds, &scope, diag) {
            block.set(field, value);
        }
        record.address_block = block;
    }

    PersonDraft {
        section: *section,
        unit_ref: resolve::resolve(&UNIT_REF, lines, section.range()).ok(),
        address_from_driver,
        record,
    }
}
