use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::parser::anchor::Anchor;
use crate::parser::lines::LineStream;
use crate::parser::pages::PageType;
use crate::parser::resolve::{self, Delimiter, FieldRule, LineTest, Validator};
use crate::parser::Diagnostics;
use crate::record::{CaseDetail, CrashFields};

static CRASH_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::capture(
            "incident_number",
            Anchor::Literal("LOCAL REPORT NUMBER"),
            r"\b(\d{2}-\d{4}-\d{2})\b",
            &[0, 1, 2],
        ),
        FieldRule::offset("incident_number", Anchor::Literal("LOCAL REPORT NUMBER"), 1)
            .validate(Validator::NotLabel),
        FieldRule::capture(
            "report_number",
            Anchor::Literal("LOCAL INFORMATION"),
            r"\b([A-Z]\d{11,})\b",
            &[0, 1],
        ),
        FieldRule::offset("department", Anchor::Literal("REPORTING AGENCY NAME"), 1)
            .validate(Validator::NotLabel),
        FieldRule::offset("municipality_code", Anchor::Literal("NCIC"), 1)
            .validate(Validator::Pattern(Regex::new(r"^[A-Z0-9]{3,12}$").unwrap())),
        // The form has no separate municipality name; the NCIC code stands in.
        FieldRule::offset("municipality", Anchor::Literal("NCIC"), 1)
            .validate(Validator::Pattern(Regex::new(r"^[A-Z0-9]{3,12}$").unwrap())),
        FieldRule::code(
            "county_code",
            Anchor::Pattern(Regex::new(r"^COUNTY\b").unwrap()),
            3,
        ),
        FieldRule::offset("crash_location", Anchor::Literal("CITY, VILLAGE, TOWNSHIP"), 1)
            .validate(Validator::NotLabel),
        FieldRule::capture(
            "date_of_crash",
            Anchor::Literal("CRASH DATE"),
            r"(\d{1,2}/\d{1,2}/\d{4})",
            &[0, 1, 2],
        ),
        FieldRule::code("crash_type_l1", Anchor::Literal("MANNER OF CRASH"), 3),
        FieldRule::code("crash_type_l2", Anchor::Literal("FIRST HARMFUL EVENT"), 3),
        FieldRule::code("total_killed", Anchor::Literal("NUMBER KILLED"), 2),
        FieldRule::code("total_injured", Anchor::Literal("NUMBER INJURED"), 2),
        // No fallback: the assembler counts vehicles when this is absent.
        FieldRule::code("total_vehicles", Anchor::Literal("NUMBER OF UNITS"), 2),
    ]
});

static CASE_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::offset("location", Anchor::Literal("ROAD NAME"), 1)
            .validate(Validator::NotLabel),
        FieldRule::pick(
            "route_type",
            Anchor::All(&["ROUTE TYPE", "ROUTE NUMBER"]),
            3,
            LineTest::OneOf(&["SR", "US", "CR", "IR", "TR"]),
        ),
        FieldRule::code("route_number", Anchor::All(&["ROUTE TYPE", "ROUTE NUMBER"]), 3),
        FieldRule::code("route_number", Anchor::Literal("ROUTE NUMBER"), 3),
        FieldRule::pick(
            "route_prefix",
            Anchor::Literal("PREFIX"),
            4,
            LineTest::OneOf(&["N", "S", "E", "W"]),
        )
        .or("NA"),
        FieldRule::split("lane_speed_limit_1", Anchor::Literal("SPEED LIMIT"), 1, Delimiter::Whitespace, 0)
            .validate(Validator::Digits),
        FieldRule::split("lane_speed_limit_2", Anchor::Literal("SPEED LIMIT"), 1, Delimiter::Whitespace, 1)
            .validate(Validator::Digits),
        FieldRule::code("crash_severity", Anchor::Literal("CRASH SEVERITY"), 4),
    ]
});

/// Crash-level values before jurisdiction defaults and vehicle counting.
#[derive(Debug, Clone, Default)]
pub struct CrashDraft {
    pub fields: CrashFields,
    pub case_detail: CaseDetail,
    /// "NUMBER OF UNITS" as printed, when the form carries it.
    pub explicit_total_vehicles: Option<String>,
}

/// Resolve crash and case fields over the crash-info pages, or over the
/// lines before the first vehicle when no page classified as crash-info.
pub fn extract(
    stream: &LineStream,
    page_types: &[PageType],
    preamble_end: usize,
    diag: &mut Diagnostics,
) -> CrashDraft {
    let mut bounds: Vec<Range<usize>> = page_types
        .iter()
        .enumerate()
        .filter(|(_, t)| **t == PageType::CrashInfo)
        .map(|(p, _)| stream.page_range(p))
        .collect();
    if bounds.is_empty() {
        diag.warn("no crash-info page; reading crash fields from the preamble");
        bounds.push(0..preamble_end);
    }

    let mut draft = CrashDraft::default();

    let values = resolve::apply(&CRASH_RULES, stream.lines(), &bounds, "crash", diag);
    draft.explicit_total_vehicles = values.get("total_vehicles").cloned();
    for (field, value) in values {
        draft.fields.set(field, value);
    }

    let values = resolve::apply(&CASE_RULES, stream.lines(), &bounds, "case_detail", diag);
    for (field, value) in values {
        draft.case_detail.set(field, value);
    }

    draft
}
