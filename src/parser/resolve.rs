use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::anchor::{self, Anchor};
use super::lines::Line;
use super::Diagnostics;

static WIDE_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Resolved values keyed by output field name.
pub type FieldMap = BTreeMap<&'static str, String>;

/// Predicate for a single candidate line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTest {
    Digits,
    StateCode,
    OneOf(&'static [&'static str]),
}

impl LineTest {
    pub fn accepts(&self, line: &str) -> bool {
        let line = line.trim();
        match self {
            LineTest::Digits => is_digits(line),
            LineTest::StateCode => is_state_code(line),
            LineTest::OneOf(set) => set.contains(&line),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ahead,
    Behind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    /// Runs of two or more spaces, the column gap in layout-preserving dumps.
    WideSpace,
    Whitespace,
}

impl Delimiter {
    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let parts: Vec<&str> = match self {
            Delimiter::Comma => line.split(',').collect(),
            Delimiter::WideSpace => WIDE_SPACE_RE.split(line).collect(),
            Delimiter::Whitespace => line.split_whitespace().collect(),
        };
        parts.into_iter().map(str::trim).collect()
    }
}

#[derive(Debug, Clone)]
pub enum Strategy {
    /// The line `k` after the anchor.
    Offset(usize),
    /// The `nth` accepted line within `span` lines of the anchor. A contiguous
    /// scan stops at the first line the test rejects.
    Lookahead {
        span: usize,
        direction: Direction,
        accept: LineTest,
        nth: usize,
        contiguous: bool,
    },
    /// First capture group of `pattern` on the first listed neighbour that matches.
    Capture {
        pattern: Regex,
        offsets: &'static [usize],
    },
    /// One part of the line `offset` after the anchor; with `rest`, that part
    /// and everything after it joined by single spaces.
    Split {
        offset: usize,
        delimiter: Delimiter,
        part: usize,
        rest: bool,
    },
}

#[derive(Debug, Clone)]
pub enum Validator {
    Any,
    Digits,
    /// Four digits between 1900 and 2100.
    Year,
    /// 17 characters, digits and capitals other than I, O and Q.
    Vin,
    StateCode,
    /// Rejects text that is itself a form label (empty fields leave the next label behind).
    NotLabel,
    Pattern(Regex),
}

impl Validator {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Validator::Any => true,
            Validator::Digits => is_digits(value),
            Validator::Year => {
                value.len() == 4
                    && is_digits(value)
                    && value
                        .parse::<u16>()
                        .is_ok_and(|y| (1900..=2100).contains(&y))
            }
            Validator::Vin => {
                value.len() == 17
                    && value.chars().all(|c| {
                        c.is_ascii_digit()
                            || (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q'))
                    })
            }
            Validator::StateCode => is_state_code(value),
            Validator::NotLabel => !looks_like_label(value),
            Validator::Pattern(re) => re.is_match(value),
        }
    }
}

/// Declarative recipe for one field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: &'static str,
    pub anchor: Anchor,
    pub strategy: Strategy,
    pub validator: Validator,
    /// Written when every rule for the field misses; `None` keeps the record default.
    pub fallback: Option<&'static str>,
}

impl FieldRule {
    pub fn new(field: &'static str, anchor: Anchor, strategy: Strategy) -> Self {
        Self {
            field,
            anchor,
            strategy,
            validator: Validator::Any,
            fallback: None,
        }
    }

    pub fn offset(field: &'static str, anchor: Anchor, k: usize) -> Self {
        Self::new(field, anchor, Strategy::Offset(k))
    }

    /// First line within `span` after the anchor accepted by `accept`.
    pub fn pick(field: &'static str, anchor: Anchor, span: usize, accept: LineTest) -> Self {
        Self::new(
            field,
            anchor,
            Strategy::Lookahead {
                span,
                direction: Direction::Ahead,
                accept,
                nth: 0,
                contiguous: false,
            },
        )
    }

    /// First purely numeric line within `span` after the anchor.
    pub fn code(field: &'static str, anchor: Anchor, span: usize) -> Self {
        Self::pick(field, anchor, span, LineTest::Digits)
    }

    /// Panics on an invalid pattern; rule tables only pass literals.
    pub fn capture(
        field: &'static str,
        anchor: Anchor,
        pattern: &str,
        offsets: &'static [usize],
    ) -> Self {
        Self::new(
            field,
            anchor,
            Strategy::Capture {
                pattern: Regex::new(pattern).unwrap(),
                offsets,
            },
        )
    }

    pub fn split(
        field: &'static str,
        anchor: Anchor,
        offset: usize,
        delimiter: Delimiter,
        part: usize,
    ) -> Self {
        Self::new(
            field,
            anchor,
            Strategy::Split {
                offset,
                delimiter,
                part,
                rest: false,
            },
        )
    }

    /// For split rules: keep the selected part and everything after it.
    pub fn rest(mut self) -> Self {
        if let Strategy::Split { rest, .. } = &mut self.strategy {
            *rest = true;
        }
        self
    }

    /// For lookahead rules: take the `n`th accepted line instead of the first.
    pub fn nth(mut self, n: usize) -> Self {
        if let Strategy::Lookahead { nth, .. } = &mut self.strategy {
            *nth = n;
        }
        self
    }

    pub fn contiguous(mut self) -> Self {
        if let Strategy::Lookahead { contiguous, .. } = &mut self.strategy {
            *contiguous = true;
        }
        self
    }

    pub fn behind(mut self) -> Self {
        if let Strategy::Lookahead { direction, .. } = &mut self.strategy {
            *direction = Direction::Behind;
        }
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn or(mut self, fallback: &'static str) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    AnchorNotFound,
    NoCandidate,
    Invalid(String),
}

impl Miss {
    fn rank(&self) -> u8 {
        match self {
            Miss::AnchorNotFound => 0,
            Miss::NoCandidate => 1,
            Miss::Invalid(_) => 2,
        }
    }
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Miss::AnchorNotFound => write!(f, "anchor not found"),
            Miss::NoCandidate => write!(f, "no candidate near anchor"),
            Miss::Invalid(v) => write!(f, "rejected value {:?}", v),
        }
    }
}

/// A field that fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMiss {
    pub scope: String,
    pub field: &'static str,
    pub reason: Miss,
}

/// Resolve one rule inside `bound`: locate the anchor, extract, validate.
pub fn resolve(rule: &FieldRule, lines: &[Line], bound: Range<usize>) -> Result<String, Miss> {
    let bound = bound.start..bound.end.min(lines.len());
    let at = anchor::find(
        &rule.anchor,
        lines,
        bound.start,
        Some(bound.end.saturating_sub(bound.start)),
    )
    .ok_or(Miss::AnchorNotFound)?;

    let raw = extract(&rule.strategy, lines, at, &bound).ok_or(Miss::NoCandidate)?;
    let value = raw.trim();
    if value.is_empty() {
        return Err(Miss::NoCandidate);
    }
    if !rule.validator.accepts(value) {
        return Err(Miss::Invalid(value.to_string()));
    }
    Ok(value.to_string())
}

fn extract(strategy: &Strategy, lines: &[Line], at: usize, bound: &Range<usize>) -> Option<String> {
    match strategy {
        Strategy::Offset(k) => {
            let i = at + k;
            (i < bound.end).then(|| lines[i].text.clone())
        }
        Strategy::Lookahead {
            span,
            direction,
            accept,
            nth,
            contiguous,
        } => {
            let candidates: Vec<usize> = match direction {
                Direction::Ahead => (at + 1..(at + 1 + span).min(bound.end)).collect(),
                Direction::Behind => (at.saturating_sub(*span).max(bound.start)..at).rev().collect(),
            };
            let mut seen = 0;
            for i in candidates {
                let text = &lines[i].text;
                if accept.accepts(text) {
                    if seen == *nth {
                        return Some(text.clone());
                    }
                    seen += 1;
                } else if *contiguous {
                    return None;
                }
            }
            None
        }
        Strategy::Capture { pattern, offsets } => offsets
            .iter()
            .map(|k| at + k)
            .filter(|&i| i < bound.end)
            .find_map(|i| {
                pattern
                    .captures(&lines[i].text)
                    .and_then(|c| c.get(1).or_else(|| c.get(0)))
                    .map(|m| m.as_str().to_string())
            }),
        Strategy::Split {
            offset,
            delimiter,
            part,
            rest,
        } => {
            let i = at + offset;
            if i >= bound.end {
                return None;
            }
            let parts = delimiter.split(&lines[i].text);
            if *rest {
                (*part < parts.len()).then(|| parts[*part..].join(" "))
            } else {
                parts.get(*part).map(|s| s.to_string())
            }
        }
    }
}

/// Run a rule table over one or more bounds (tried in order). The first rule
/// that resolves a field wins; fields nobody resolves get their fallback and a
/// recorded miss.
pub fn apply(
    rules: &[FieldRule],
    lines: &[Line],
    bounds: &[Range<usize>],
    scope: &str,
    diag: &mut Diagnostics,
) -> FieldMap {
    let mut values = FieldMap::new();
    let mut misses: BTreeMap<&'static str, (Miss, Option<&'static str>)> = BTreeMap::new();

    for rule in rules {
        if values.contains_key(rule.field) {
            continue;
        }

        let mut worst = Miss::AnchorNotFound;
        let mut hit = None;
        for bound in bounds {
            match resolve(rule, lines, bound.clone()) {
                Ok(v) => {
                    hit = Some(v);
                    break;
                }
                Err(m) if m.rank() >= worst.rank() => worst = m,
                Err(_) => {}
            }
        }

        match hit {
            Some(v) => {
                misses.remove(rule.field);
                values.insert(rule.field, v);
            }
            None => {
                let entry = misses
                    .entry(rule.field)
                    .or_insert((Miss::AnchorNotFound, None));
                if worst.rank() >= entry.0.rank() {
                    entry.0 = worst;
                }
                entry.1 = entry.1.or(rule.fallback);
            }
        }
    }

    for (field, (reason, fallback)) in misses {
        debug!(scope, field, reason = %reason, "field unresolved");
        if let Some(fb) = fallback {
            values.insert(field, fb.to_string());
        }
        diag.misses.push(FieldMiss {
            scope: scope.to_string(),
            field,
            reason,
        });
    }

    values
}

pub fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_state_code(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

/// Form labels start with `#`, end in `#`, `:` or `*`, or read "LABEL: PARTS"
/// in capitals.
pub fn looks_like_label(s: &str) -> bool {
    let s = s.trim();
    s.starts_with('#')
        || s.ends_with(['#', ':', '*'])
        || (s.contains(": ") && !s.chars().any(|c| c.is_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<Line> {
        texts
            .iter()
            .map(|t| Line {
                text: t.to_string(),
                page: 0,
            })
            .collect()
    }

    fn all(ls: &[Line]) -> Range<usize> {
        0..ls.len()
    }

    #[test]
    fn fixed_offset() {
        let ls = lines(&["REPORTING AGENCY NAME *", "Liberty Township Police Department"]);
        let rule = FieldRule::offset("department", Anchor::Literal("REPORTING AGENCY NAME"), 1);
        assert_eq!(
            resolve(&rule, &ls, all(&ls)).unwrap(),
            "Liberty Township Police Department"
        );
    }

    #[test]
    fn offset_past_bound_is_no_candidate() {
        let ls = lines(&["VEHICLE MODEL", "ACCORD"]);
        let rule = FieldRule::offset("model", Anchor::Literal("VEHICLE MODEL"), 1);
        assert_eq!(resolve(&rule, &ls, 0..1), Err(Miss::NoCandidate));
    }

    #[test]
    fn missing_anchor() {
        let ls = lines(&["COLOR", "WHI"]);
        let rule = FieldRule::offset("tad", Anchor::Exact("TAD"), 1);
        assert_eq!(resolve(&rule, &ls, all(&ls)), Err(Miss::AnchorNotFound));
    }

    #[test]
    fn digit_lookahead_skips_text_lines() {
        let ls = lines(&["COUNTY *", "Delaware", "21", "99"]);
        let rule = FieldRule::code("county_code", Anchor::Literal("COUNTY"), 3);
        assert_eq!(resolve(&rule, &ls, all(&ls)).unwrap(), "21");
    }

    #[test]
    fn digit_lookahead_respects_span() {
        let ls = lines(&["CRASH SEVERITY", "a", "b", "3"]);
        let rule = FieldRule::code("crash_severity", Anchor::Literal("CRASH SEVERITY"), 2);
        assert_eq!(resolve(&rule, &ls, all(&ls)), Err(Miss::NoCandidate));
    }

    #[test]
    fn lookahead_behind() {
        let ls = lines(&["7", "x", "SEATING POSITION"]);
        let rule = FieldRule::code("seating_position", Anchor::Literal("SEATING POSITION"), 2).behind();
        assert_eq!(resolve(&rule, &ls, all(&ls)).unwrap(), "7");
    }

    #[test]
    fn contiguous_nth_stops_at_next_label() {
        let ls = lines(&["SEQUENCE OF EVENTS", "20", "24", "MOST HARMFUL EVENT", "24"]);
        let anchor = || Anchor::Literal("SEQUENCE OF EVENTS");
        let second = FieldRule::code("crash_seq_2nd_event", anchor(), 4).nth(1).contiguous();
        let third = FieldRule::code("crash_seq_3rd_event", anchor(), 4).nth(2).contiguous();
        let loose = FieldRule::code("crash_seq_3rd_event", anchor(), 4).nth(2);
        assert_eq!(resolve(&second, &ls, all(&ls)).unwrap(), "24");
        assert_eq!(resolve(&third, &ls, all(&ls)), Err(Miss::NoCandidate));
        assert_eq!(resolve(&loose, &ls, all(&ls)).unwrap(), "24");
    }

    #[test]
    fn regex_capture_on_anchor_line() {
        let ls = lines(&["LOCAL INFORMATION P25102200000570"]);
        let rule = FieldRule::capture(
            "report_number",
            Anchor::Literal("LOCAL INFORMATION"),
            r"\b([A-Z]\d{11,})\b",
            &[0, 1],
        );
        assert_eq!(resolve(&rule, &ls, all(&ls)).unwrap(), "P25102200000570");
    }

    #[test]
    fn regex_capture_on_neighbour() {
        let ls = lines(&["CRASH DATE / TIME *", "10/22/2025 14:35"]);
        let rule = FieldRule::capture(
            "date_of_crash",
            Anchor::Literal("CRASH DATE"),
            r"(\d{2}/\d{2}/\d{4})",
            &[0, 1],
        );
        assert_eq!(resolve(&rule, &ls, all(&ls)).unwrap(), "10/22/2025");
    }

    #[test]
    fn split_by_comma_and_rest() {
        let ls = lines(&["NAME: LAST, FIRST, MIDDLE", "DOE, JOHN, ALLEN"]);
        let anchor = || Anchor::Literal("NAME: LAST, FIRST, MIDDLE");
        let first = FieldRule::split("first_name", anchor(), 1, Delimiter::Comma, 1);
        let missing = FieldRule::split("x", anchor(), 1, Delimiter::Comma, 3);
        assert_eq!(resolve(&first, &ls, all(&ls)).unwrap(), "JOHN");
        assert_eq!(resolve(&missing, &ls, all(&ls)), Err(Miss::NoCandidate));

        let ls = lines(&["LP STATE", "OH HXT4471 SALJB 2019 LAND ROVER"]);
        let make = FieldRule::split("make", Anchor::Literal("LP STATE"), 1, Delimiter::Whitespace, 4).rest();
        assert_eq!(resolve(&make, &ls, all(&ls)).unwrap(), "LAND ROVER");
    }

    #[test]
    fn split_on_wide_space() {
        let ls = lines(&["LABEL", "OH   HXT4471    2003 HONDA"]);
        let rule = FieldRule::split("year_make", Anchor::Literal("LABEL"), 1, Delimiter::WideSpace, 2);
        assert_eq!(resolve(&rule, &ls, all(&ls)).unwrap(), "2003 HONDA");
    }

    #[test]
    fn validation_failure_reports_value() {
        let ls = lines(&["US DOT #", "# OCCUPANTS"]);
        let rule = FieldRule::offset("us_dot", Anchor::Literal("US DOT #"), 1).validate(Validator::Digits);
        assert_eq!(
            resolve(&rule, &ls, all(&ls)),
            Err(Miss::Invalid("# OCCUPANTS".to_string()))
        );
    }

    #[test]
    fn validators() {
        assert!(Validator::Vin.accepts("3C6UR5FL6MG630586"));
        assert!(!Validator::Vin.accepts("3C6UR5FL6MG63058"));
        assert!(!Validator::Vin.accepts("3C6UR5FL6MG63058O"));
        assert!(Validator::Year.accepts("2021"));
        assert!(!Validator::Year.accepts("1850"));
        assert!(!Validator::Year.accepts("21"));
        assert!(Validator::StateCode.accepts("KY"));
        assert!(!Validator::StateCode.accepts("Ky"));
        assert!(!Validator::NotLabel.accepts("INSURANCE POLICY #"));
        assert!(!Validator::NotLabel.accepts("# OCCUPANTS"));
        assert!(!Validator::NotLabel.accepts("NAME: LAST, FIRST, MIDDLE"));
        assert!(Validator::NotLabel.accepts("Liberty Township"));
        assert!(Validator::NotLabel.accepts("4511.21(A)"));
    }

    #[test]
    fn apply_first_rule_wins_then_fallback() {
        let ls = lines(&["ROUTE NUMBER", "315"]);
        let rules = vec![
            FieldRule::code("route_number", Anchor::Literal("ROUTE TYPE"), 3),
            FieldRule::code("route_number", Anchor::Literal("ROUTE NUMBER"), 2),
            FieldRule::code("route_number", Anchor::Literal("ROUTE"), 2).or("never"),
            FieldRule::offset("route_prefix", Anchor::Literal("PREFIX"), 1).or("NA"),
        ];
        let mut diag = Diagnostics::default();
        let map = apply(&rules, &ls, &[all(&ls)], "case_detail", &mut diag);
        assert_eq!(map.get("route_number").map(String::as_str), Some("315"));
        assert_eq!(map.get("route_prefix").map(String::as_str), Some("NA"));
        assert_eq!(diag.misses.len(), 1);
        assert_eq!(diag.misses[0].field, "route_prefix");
        assert_eq!(diag.misses[0].reason, Miss::AnchorNotFound);
    }

    #[test]
    fn apply_tries_later_bounds() {
        let ls = lines(&["NCIC *", "LOCAL REPORT NUMBER *", "NCIC *", "OH0230500"]);
        let rules = vec![FieldRule::offset("municipality_code", Anchor::Literal("NCIC"), 1)
            .validate(Validator::Pattern(Regex::new(r"^[A-Z0-9]{3,12}$").unwrap()))];
        let mut diag = Diagnostics::default();
        let map = apply(&rules, &ls, &[0..2, 2..4], "crash", &mut diag);
        assert_eq!(map.get("municipality_code").map(String::as_str), Some("OH0230500"));
        assert!(diag.misses.is_empty());
    }

    #[test]
    fn apply_without_fallback_leaves_field_absent() {
        let ls = lines(&["NOTHING"]);
        let rules = vec![FieldRule::code("total_vehicles", Anchor::Literal("NUMBER OF UNITS"), 2)];
        let mut diag = Diagnostics::default();
        let map = apply(&rules, &ls, &[all(&ls)], "crash", &mut diag);
        assert!(map.is_empty());
        assert_eq!(diag.misses.len(), 1);
    }
}
