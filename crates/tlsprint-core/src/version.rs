//! Loose dotted version ordering.
//!
//! Tags are split on `.` and compared segment by segment:
//! - a segment with a leading run of digits compares by that number first
//!   (any width, no overflow) and then by the remaining suffix, lexically,
//!   so `2 < 2k < 10`;
//! - a segment without leading digits compares lexically and ranks after
//!   every numeric segment;
//! - when one tag runs out of segments first it is the lower one
//!   (`1.0 < 1.0.0`);
//! - tags whose segments all compare equal (`1.01` vs `1.1`) are ordered by
//!   their raw bytes, so the order is total and agrees with string equality.
//!
//! The same comparison backs sorting and threshold checks ([`VersionRange`]).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Numbered { digits: &'a str, suffix: &'a str },
    Text(&'a str),
}

impl<'a> Segment<'a> {
    fn parse(raw: &'a str) -> Self {
        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        if split == 0 {
            return Segment::Text(raw);
        }
        let (digits, suffix) = raw.split_at(split);
        Segment::Numbered {
            digits: digits.trim_start_matches('0'),
            suffix,
        }
    }
}

impl Ord for Segment<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Segment::Numbered { digits: a, suffix: sa },
                Segment::Numbered { digits: b, suffix: sb },
            ) => a
                .len()
                .cmp(&b.len())
                .then_with(|| a.cmp(b))
                .then_with(|| sa.cmp(sb)),
            (Segment::Numbered { .. }, Segment::Text(_)) => Ordering::Less,
            (Segment::Text(_), Segment::Numbered { .. }) => Ordering::Greater,
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Segment<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two version tags.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.').map(Segment::parse);
    let mut right = b.split('.').map(Segment::parse);

    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => match l.cmp(&r) {
                Ordering::Equal => continue,
                decided => return decided,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return a.cmp(b),
        }
    }
}

/// Half-open version interval `[since, until)`; either bound may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
}

impl VersionRange {
    pub fn new(since: Option<&str>, until: Option<&str>) -> Self {
        Self {
            since: since.map(str::to_string),
            until: until.map(str::to_string),
        }
    }

    pub fn contains(&self, version: &str) -> bool {
        let above = self
            .since
            .as_deref()
            .map_or(true, |since| compare_versions(version, since) != Ordering::Less);
        let below = self
            .until
            .as_deref()
            .map_or(true, |until| compare_versions(version, until) == Ordering::Less);
        above && below
    }
}
