use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};

use serde::Serialize;

/// Cost of a route or edge.
///
/// Compared lexicographically: pass-through changes, then access changes, then the
/// travel time. At equal time the route crossing fewer protected-area boundaries wins.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RouteWeight {
    weight: f64,
    num_pass_through_changes: i32,
    num_access_changes: i32,
    transit_time: f64,
}

impl RouteWeight {
    pub const fn new(weight: f64) -> Self {
        Self {
            weight,
            num_pass_through_changes: 0,
            num_access_changes: 0,
            transit_time: 0.0,
        }
    }

    pub const fn with_penalties(
        weight: f64,
        num_pass_through_changes: i32,
        num_access_changes: i32,
        transit_time: f64,
    ) -> Self {
        Self {
            weight,
            num_pass_through_changes,
            num_access_changes,
            transit_time,
        }
    }

    pub const fn weight(&self) -> f64 {
        self.weight
    }

    pub const fn num_pass_through_changes(&self) -> i32 {
        self.num_pass_through_changes
    }

    pub const fn num_access_changes(&self) -> i32 {
        self.num_access_changes
    }

    pub const fn transit_time(&self) -> f64 {
        self.transit_time
    }

    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.num_pass_through_changes
            .cmp(&other.num_pass_through_changes)
            .then(self.num_access_changes.cmp(&other.num_access_changes))
            .then(self.weight.total_cmp(&other.weight))
            .then(self.transit_time.total_cmp(&other.transit_time))
    }

    /// Scales the continuous components, leaving the change counters untouched
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            weight: self.weight * factor,
            transit_time: self.transit_time * factor,
            ..*self
        }
    }

    /// Clamps the travel time at zero; used for reduced weights in A*
    pub fn non_negative(&self) -> Self {
        Self {
            weight: self.weight.max(0.0),
            ..*self
        }
    }

    pub fn is_almost_equal(&self, other: &Self, epsilon: f64) -> bool {
        self.num_pass_through_changes == other.num_pass_through_changes
            && self.num_access_changes == other.num_access_changes
            && (self.weight - other.weight).abs() <= epsilon
            && (self.transit_time - other.transit_time).abs() <= epsilon
    }
}

impl PartialEq for RouteWeight {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for RouteWeight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.total_cmp(other))
    }
}

impl Add for RouteWeight {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            weight: self.weight + rhs.weight,
            num_pass_through_changes: self.num_pass_through_changes + rhs.num_pass_through_changes,
            num_access_changes: self.num_access_changes + rhs.num_access_changes,
            transit_time: self.transit_time + rhs.transit_time,
        }
    }
}

impl AddAssign for RouteWeight {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for RouteWeight {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Neg for RouteWeight {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            weight: -self.weight,
            num_pass_through_changes: -self.num_pass_through_changes,
            num_access_changes: -self.num_access_changes,
            transit_time: -self.transit_time,
        }
    }
}

impl fmt::Display for RouteWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}s (pass-through {}, access {})",
            self.weight, self.num_pass_through_changes, self.num_access_changes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_counts_dominate_raw_weight() {
        let cheap_but_crossing = RouteWeight::with_penalties(10.0, 1, 0, 0.0);
        let slow_but_clean = RouteWeight::new(1000.0);
        assert!(slow_but_clean < cheap_but_crossing);

        let access_change = RouteWeight::with_penalties(1.0, 0, 1, 0.0);
        assert!(slow_but_clean < access_change);
        assert!(access_change < cheap_but_crossing);
    }

    #[test]
    fn arithmetic_is_componentwise() {
        let a = RouteWeight::with_penalties(3.0, 1, 2, 0.5);
        let b = RouteWeight::with_penalties(1.0, 1, 0, 0.5);
        let sum = a + b;
        assert_eq!(sum.weight(), 4.0);
        assert_eq!(sum.num_pass_through_changes(), 2);
        assert_eq!(sum.num_access_changes(), 2);
        assert_eq!(sum - b, a);
    }

    #[test]
    fn scaling_keeps_counters() {
        let w = RouteWeight::with_penalties(8.0, 2, 1, 4.0).scaled(0.5);
        assert_eq!(w.weight(), 4.0);
        assert_eq!(w.transit_time(), 2.0);
        assert_eq!(w.num_pass_through_changes(), 2);
    }
}
