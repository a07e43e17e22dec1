use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed interval `[start, end]` on the real line.
///
/// Used for domain windows, range extrema and coverage bookkeeping alike.
/// `start <= end` is expected but not enforced; callers building intervals
/// from untrusted bounds should normalize first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    #[must_use]
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Degenerate interval containing exactly `value`.
    #[must_use]
    pub fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Returns the interval with endpoints swapped when reversed.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self::new(self.end, self.start)
        }
    }

    /// Membership including both endpoints.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        value >= self.start && value <= self.end
    }

    /// Membership excluding both endpoints.
    #[must_use]
    pub fn contains_open(self, value: f64) -> bool {
        value > self.start && value < self.end
    }

    #[must_use]
    pub fn contains_interval(self, other: Interval) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// True when the two closed intervals share at least one point.
    #[must_use]
    pub fn intersects(self, other: Interval) -> bool {
        other.start <= self.end && other.end >= self.start
    }

    /// True when the intervals overlap on a span of positive length.
    #[must_use]
    pub fn overlaps(self, other: Interval) -> bool {
        other.start < self.end && other.end > self.start
    }

    /// True when the intervals touch at exactly one endpoint.
    #[must_use]
    pub fn is_adjacent_to(self, other: Interval) -> bool {
        self.end == other.start || other.end == self.start
    }

    /// True when `self` starts before `other` does.
    #[must_use]
    pub fn comes_before(self, other: Interval) -> bool {
        self.start < other.start
    }

    #[must_use]
    pub fn intersect(self, other: Interval) -> Option<Interval> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self::new(
            self.start.max(other.start),
            self.end.min(other.end),
        ))
    }

    /// Smallest interval covering both operands.
    #[must_use]
    pub fn join(self, other: Interval) -> Interval {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Grows the interval just enough to contain `value`.
    pub fn expand(&mut self, value: f64) {
        if value < self.start {
            self.start = value;
        } else if value > self.end {
            self.end = value;
        }
    }

    pub fn expand_to_include(&mut self, other: Interval) {
        self.expand(other.start);
        self.expand(other.end);
    }

    /// Maps `point` to its position relative to this interval, so `start`
    /// maps to `0.0` and `end` to `1.0`. Zero-length intervals map to `0.0`.
    #[must_use]
    pub fn ratio_from_point(self, point: f64) -> f64 {
        if self.end == self.start {
            0.0
        } else {
            (point - self.start) / (self.end - self.start)
        }
    }

    /// Inverse of [`Interval::ratio_from_point`].
    #[must_use]
    pub fn point_from_ratio(self, ratio: f64) -> f64 {
        if self.end == self.start {
            self.start
        } else {
            self.start + ratio * (self.end - self.start)
        }
    }

    /// Translates both endpoints by `amount`, preserving the length.
    pub fn slide(&mut self, amount: f64) {
        self.start += amount;
        self.end += amount;
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.end - self.start
    }

    #[must_use]
    pub fn midpoint(self) -> f64 {
        self.start + self.length() / 2.0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
