use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::Interval;

/// Normalized set of closed intervals.
///
/// Stored intervals are sorted by start and are pairwise non-overlapping and
/// non-adjacent: anything touching is merged on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `interval`, merging every stored interval that overlaps or touches it.
    ///
    /// Intervals without positive length (zero-length, reversed, NaN bounds)
    /// are ignored.
    pub fn add(&mut self, interval: Interval) {
        let has_length = interval.length() > 0.0;
        if !has_length {
            return;
        }

        let mut merged = interval;
        let mut kept = Vec::with_capacity(self.intervals.len() + 1);
        for existing in self.intervals.drain(..) {
            if existing.intersects(merged) {
                merged = merged.join(existing);
            } else {
                kept.push(existing);
            }
        }
        kept.push(merged);
        kept.sort_by_key(|entry| OrderedFloat(entry.start));
        self.intervals = kept;
    }

    /// Returns the part of `other`'s coverage not already covered by `self`.
    ///
    /// Boundary points are treated as covered, so remainders that would only
    /// consist of a shared endpoint disappear.
    #[must_use]
    pub fn difference(&self, other: &IntervalSet) -> IntervalSet {
        let mut remaining = other.clone();

        for covered in &self.intervals {
            let mut next = IntervalSet::new();
            for candidate in &remaining.intervals {
                let candidate = *candidate;
                if !candidate.intersects(*covered) {
                    next.add(candidate);
                } else if covered.contains_interval(candidate) {
                    continue;
                } else if candidate.contains_interval(*covered) {
                    next.add(Interval::new(candidate.start, covered.start));
                    next.add(Interval::new(covered.end, candidate.end));
                } else if covered.comes_before(candidate) {
                    next.add(Interval::new(covered.end, candidate.end));
                } else {
                    next.add(Interval::new(candidate.start, covered.start));
                }
            }
            remaining = next;
            if remaining.is_empty() {
                break;
            }
        }

        remaining
    }

    /// Removes the coverage of `interval` from this set.
    pub fn remove(&mut self, interval: Interval) {
        *self = IntervalSet::from(interval).difference(self);
    }

    /// True when `interval` lies entirely inside one stored interval.
    #[must_use]
    pub fn covers(&self, interval: Interval) -> bool {
        self.intervals
            .iter()
            .any(|entry| entry.contains_interval(interval))
    }

    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.intervals.iter().map(|entry| entry.length()).sum()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Interval> {
        self.intervals.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Interval> + '_ {
        self.intervals.iter().copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Interval] {
        &self.intervals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

impl From<Interval> for IntervalSet {
    fn from(interval: Interval) -> Self {
        let mut set = Self::new();
        set.add(interval);
        set
    }
}

impl FromIterator<Interval> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = Interval>>(iter: T) -> Self {
        let mut set = Self::new();
        for interval in iter {
            set.add(interval);
        }
        set
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, interval) in self.intervals.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{interval}")?;
        }
        f.write_str("}")
    }
}
