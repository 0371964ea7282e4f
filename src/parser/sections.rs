use std::ops::Range;

use serde::Serialize;

use super::anchor::{self, Anchor};
use super::lines::LineStream;
use super::resolve::LineTest;
use crate::config::Calibration;

/// Ownership declaration that opens every vehicle block.
static OWNERSHIP: Anchor = Anchor::All(&["OWNER NAME", "SAME AS DRIVER"]);
static UNIT_HEADING: Anchor = Anchor::Exact("UNIT #");
static INJURIES: Anchor = Anchor::Exact("INJURIES");
/// Person pages close the last vehicle block before them.
static PERSON_PAGES: Anchor = Anchor::Any(&["MOTORIST / NON-MOTORIST", "OCCUPANT / WITNESS"]);

/// A bounded block of the line stream: `[start, end)`, plus the line whose
/// match created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Section {
    pub start: usize,
    pub end: usize,
    pub anchor: usize,
}

impl Section {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.range().contains(&idx)
    }
}

struct SectionSpec<'a> {
    discriminator: &'a Anchor,
    /// Test the line right after the discriminator must pass.
    confirm: Option<LineTest>,
    /// Label preceding the discriminator that belongs to the same block.
    heading: Option<&'a Anchor>,
    terminator: Option<&'a Anchor>,
    lead: usize,
    skip: usize,
    max_span: usize,
}

/// Vehicle blocks across the whole stream, in reading order.
pub fn segment_vehicles(stream: &LineStream, cal: &Calibration) -> Vec<Section> {
    let spec = SectionSpec {
        discriminator: &OWNERSHIP,
        confirm: None,
        heading: Some(&UNIT_HEADING),
        terminator: Some(&PERSON_PAGES),
        lead: cal.vehicle_lead,
        skip: cal.vehicle_skip,
        max_span: cal.vehicle_max_span,
    };
    segment(stream, 0..stream.len(), &spec)
}

/// Person blocks inside `bound`: an "INJURIES" line directly followed by a code.
pub fn segment_persons(stream: &LineStream, bound: Range<usize>, cal: &Calibration) -> Vec<Section> {
    let spec = SectionSpec {
        discriminator: &INJURIES,
        confirm: Some(LineTest::Digits),
        heading: Some(&UNIT_HEADING),
        terminator: None,
        lead: cal.person_lead,
        skip: cal.person_skip,
        max_span: cal.person_max_span,
    };
    segment(stream, bound, &spec)
}

/// Where each vehicle's persons may appear: from the vehicle start up to the
/// next vehicle start, or end-of-stream for the last one. Covers person
/// blocks that spill onto the pages after the vehicle's own.
pub fn spill_bounds(vehicles: &[Section], total: usize) -> Vec<Range<usize>> {
    vehicles
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let end = vehicles.get(i + 1).map_or(total, |next| next.start);
            v.start..end
        })
        .collect()
}

fn segment(stream: &LineStream, bound: Range<usize>, spec: &SectionSpec) -> Vec<Section> {
    let lines = stream.lines();
    let bound = bound.start..bound.end.min(lines.len());
    let mut sections: Vec<Section> = Vec::new();
    let mut cursor = bound.start;
    let mut floor = bound.start;

    while let Some(at) = anchor::find(
        spec.discriminator,
        lines,
        cursor,
        Some(bound.end.saturating_sub(cursor)),
    ) {
        let confirmed = spec.confirm.map_or(true, |test| {
            lines.get(at + 1).is_some_and(|l| test.accepts(&l.text))
        });
        if !confirmed {
            cursor = at + 1;
            continue;
        }

        let start = spec
            .heading
            .and_then(|h| anchor::find_back(h, lines, at, floor.max(at.saturating_sub(spec.lead))))
            .unwrap_or(at);

        if let Some(prev) = sections.last_mut() {
            prev.end = prev.end.min(start);
        }

        let mut end = bound.end.min(start.saturating_add(spec.max_span)).max(at + 1);
        if let Some(stop) = spec
            .terminator
            .and_then(|t| anchor::find(t, lines, at + 1, Some(end.saturating_sub(at + 1))))
        {
            end = stop;
        }

        sections.push(Section { start, end, anchor: at });

        // Skip the block's own lines, but never past its page: a new page may open a new block.
        floor = at + 1;
        cursor = at
            .saturating_add(spec.skip)
            .min(stream.page_end(at))
            .max(at + 1);
    }

    sections
}
