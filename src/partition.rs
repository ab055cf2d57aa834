//! Target partitioner: computes the set of grade levels to differentiate for.
//!
//! Given a primary grade estimate and a complexity signal, produces a
//! symmetric spread of target grades clipped to the valid domain. Near the
//! domain edges, fixed fallback triples keep the set at three or more
//! distinct values whenever the domain is wide enough to allow it.

use serde::{Deserialize, Serialize};

use crate::content::Complexity;

/// Inclusive range of valid grade levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeDomain {
    pub min: u8,
    pub max: u8,
}

impl GradeDomain {
    /// Creates a domain, normalizing an inverted range.
    pub fn new(min: u8, max: u8) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn contains(&self, grade: u8) -> bool {
        grade >= self.min && grade <= self.max
    }

    /// Number of distinct grades in the domain.
    pub fn span(&self) -> u8 {
        self.max - self.min + 1
    }

    pub fn clamp(&self, grade: u8) -> u8 {
        grade.clamp(self.min, self.max)
    }
}

impl Default for GradeDomain {
    fn default() -> Self {
        Self { min: 1, max: 12 }
    }
}

/// Ordered set of distinct target grades, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSet {
    grades: Vec<u8>,
}

impl TargetSet {
    /// Builds a set from arbitrary grades: sorts, deduplicates.
    pub fn from_grades(mut grades: Vec<u8>) -> Self {
        grades.sort_unstable();
        grades.dedup();
        Self { grades }
    }

    pub fn grades(&self) -> &[u8] {
        &self.grades
    }

    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.grades.iter().copied()
    }

    /// Widest distance between the lowest and highest target.
    pub fn grade_span(&self) -> u8 {
        match (self.grades.first(), self.grades.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }
}

/// Computes the differentiation target set for an estimated grade level.
///
/// The spread is `{estimate - w, estimate, estimate + w}` with `w = 1` for
/// low/medium complexity and `w = 2` for high. When the spread touches or
/// crosses a domain boundary, a fixed edge triple is substituted instead:
/// `{min, min+2, min+4}` at the low end, `{max-4, max-2, max}` at the high
/// end (for the default 1-12 domain these are `{1,3,5}` and `{8,10,12}`).
/// The result is always sorted, deduplicated, inside the domain, and has at
/// least three values whenever the domain spans three or more grades.
pub fn partition_targets(estimate: u8, complexity: Complexity, domain: GradeDomain) -> TargetSet {
    let estimate = domain.clamp(estimate);
    let width = complexity.spread_width();

    let spread = symmetric_spread(estimate, width);
    let clipped: Vec<u8> = spread
        .iter()
        .copied()
        .filter(|g| domain.contains(*g))
        .collect();

    if domain.span() < 3 {
        // Domain too narrow for three distinct grades; best effort.
        return TargetSet::from_grades(clipped);
    }

    let touches_low = estimate.saturating_sub(width) <= domain.min;
    let touches_high = estimate as u16 + width as u16 >= domain.max as u16;

    let grades = if clipped.len() < 3 || touches_low || touches_high {
        if touches_low {
            edge_triple_low(domain)
        } else if touches_high {
            edge_triple_high(domain)
        } else {
            // Defensive path required by the contract; with a 3-wide clipped
            // spread and no boundary contact it is not normally reached.
            spread.into_iter().filter(|g| domain.contains(*g)).collect()
        }
    } else {
        clipped
    };

    TargetSet::from_grades(fill_to_minimum(grades, domain, 3))
}

fn symmetric_spread(estimate: u8, width: u8) -> Vec<u8> {
    let low = estimate.saturating_sub(width);
    vec![low, estimate, estimate.saturating_add(width)]
}

/// Fixed low-end triple: `{min, min+2, min+4}` clipped to the domain.
fn edge_triple_low(domain: GradeDomain) -> Vec<u8> {
    [
        domain.min,
        domain.min.saturating_add(2),
        domain.min.saturating_add(4),
    ]
    .into_iter()
    .filter(|g| domain.contains(*g))
    .collect()
}

/// Fixed high-end triple: `{max-4, max-2, max}` clipped to the domain.
fn edge_triple_high(domain: GradeDomain) -> Vec<u8> {
    [
        domain.max.saturating_sub(4),
        domain.max.saturating_sub(2),
        domain.max,
    ]
    .into_iter()
    .filter(|g| domain.contains(*g))
    .collect()
}

/// Tops a grade list up to `minimum` distinct values with the nearest unused
/// domain grades. Only narrow domains ever need this.
fn fill_to_minimum(grades: Vec<u8>, domain: GradeDomain, minimum: usize) -> Vec<u8> {
    let mut grades = grades;
    grades.sort_unstable();
    grades.dedup();

    if grades.len() >= minimum || (domain.span() as usize) < minimum {
        return grades;
    }
    for candidate in domain.min..=domain.max {
        if !grades.contains(&candidate) {
            grades.push(candidate);
            grades.sort_unstable();
            if grades.len() >= minimum {
                break;
            }
        }
    }
    grades
}
