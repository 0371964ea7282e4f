use regex::Regex;

use super::lines::Line;

/// A label matcher. Stateless; the same anchor is reused across documents.
#[derive(Debug, Clone)]
pub enum Anchor {
    /// Substring containment.
    Literal(&'static str),
    /// Every literal on the same line.
    All(&'static [&'static str]),
    /// Any one of the literals.
    Any(&'static [&'static str]),
    /// The whole (trimmed) line equals the text.
    Exact(&'static str),
    Pattern(Regex),
}

impl Anchor {
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Anchor::Literal(s) => line.contains(s),
            Anchor::All(parts) => parts.iter().all(|p| line.contains(p)),
            Anchor::Any(parts) => parts.iter().any(|p| line.contains(p)),
            Anchor::Exact(s) => line.trim() == *s,
            Anchor::Pattern(re) => re.is_match(line),
        }
    }
}

/// First line at or after `start` matching `anchor`. With a `window`, only
/// `[start, start + window)` is searched.
pub fn find(anchor: &Anchor, lines: &[Line], start: usize, window: Option<usize>) -> Option<usize> {
    let end = match window {
        Some(w) => start.saturating_add(w).min(lines.len()),
        None => lines.len(),
    };
    if start >= end {
        return None;
    }
    lines[start..end]
        .iter()
        .position(|l| anchor.matches(&l.text))
        .map(|i| start + i)
}

/// Nearest line before `from` (exclusive) and not before `floor` matching `anchor`.
pub fn find_back(anchor: &Anchor, lines: &[Line], from: usize, floor: usize) -> Option<usize> {
    let from = from.min(lines.len());
    if floor >= from {
        return None;
    }
    (floor..from).rev().find(|&i| anchor.matches(&lines[i].text))
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

    #[test]
    fn literal_is_substring() {
        let ls = lines(&["CRASH DATE / TIME *", "10/22/2025 14:35"]);
        assert_eq!(find(&Anchor::Literal("CRASH DATE"), &ls, 0, None), Some(0));
        assert_eq!(find(&Anchor::Literal("CRASH DATE"), &ls, 1, None), None);
    }

    #[test]
    fn conjunction_needs_same_line() {
        let ls = lines(&[
            "OWNER NAME: LAST, FIRST, MIDDLE",
            "SAME AS DRIVER",
            "OWNER NAME: LAST, FIRST, MIDDLE ( SAME AS DRIVER )",
        ]);
        let a = Anchor::All(&["OWNER NAME", "SAME AS DRIVER"]);
        assert_eq!(find(&a, &ls, 0, None), Some(2));
    }

    #[test]
    fn exact_rejects_longer_lines() {
        let ls = lines(&["DAMAGE AREA", "AGE", "37"]);
        assert_eq!(find(&Anchor::Literal("AGE"), &ls, 0, None), Some(0));
        assert_eq!(find(&Anchor::Exact("AGE"), &ls, 0, None), Some(1));
    }

    #[test]
    fn pattern_and_any() {
        let ls = lines(&["COUNTY ROAD 12", "COUNTY *", "21"]);
        let a = Anchor::Pattern(Regex::new(r"^COUNTY\s*\*?$").unwrap());
        assert_eq!(find(&a, &ls, 0, None), Some(1));
        let any = Anchor::Any(&["OCCUPANT / WITNESS", "COUNTY *"]);
        assert_eq!(find(&any, &ls, 0, None), Some(1));
    }

    #[test]
    fn window_bounds_the_search() {
        let ls = lines(&["a", "b", "c", "UNIT #"]);
        let a = Anchor::Exact("UNIT #");
        assert_eq!(find(&a, &ls, 0, Some(3)), None);
        assert_eq!(find(&a, &ls, 1, Some(3)), Some(3));
        assert_eq!(find(&a, &ls, 9, None), None);
    }

    #[test]
    fn first_match_wins_and_next_match_from_cursor() {
        let ls = lines(&["UNIT #", "1", "UNIT #", "2"]);
        let a = Anchor::Exact("UNIT #");
        let first = find(&a, &ls, 0, None).unwrap();
        assert_eq!(first, 0);
        assert_eq!(find(&a, &ls, first + 1, None), Some(2));
    }

    #[test]
    fn backwards_search_respects_floor() {
        let ls = lines(&["UNIT #", "1", "x", "UNIT #", "2", "OWNER NAME"]);
        let a = Anchor::Exact("UNIT #");
        assert_eq!(find_back(&a, &ls, 5, 0), Some(3));
        assert_eq!(find_back(&a, &ls, 3, 1), None);
        assert_eq!(find_back(&a, &ls, 3, 0), Some(0));
        assert_eq!(find_back(&a, &ls, 0, 0), None);
    }
}
