//! Scrape-gap mask.
//!
//! Simulates a target that was not scraped for a few windows of a replay.
//! Only the liveness series consults it; every other series for the same
//! tick is emitted as usual.

use serde::{Deserialize, Serialize};

/// Open interval `(start, end)` in elapsed seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub start: f64,
    pub end: f64,
}

impl Gap {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, elapsed: f64) -> bool {
        self.start < elapsed && elapsed < self.end
    }
}

/// Fixed set of scrape gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingScrapeMask {
    gaps: Vec<Gap>,
}

impl Default for MissingScrapeMask {
    /// Gaps at minutes 2-3, 5-10 and 25-35 of the window.
    fn default() -> Self {
        Self::new(vec![
            Gap::new(120.0, 180.0),
            Gap::new(300.0, 600.0),
            Gap::new(1500.0, 2100.0),
        ])
    }
}

impl MissingScrapeMask {
    pub fn new(gaps: Vec<Gap>) -> Self {
        Self { gaps }
    }

    /// A mask that never suppresses.
    pub fn none() -> Self {
        Self { gaps: Vec::new() }
    }

    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// True iff `elapsed` lies strictly inside a gap.
    pub fn is_missing(&self, elapsed: f64) -> bool {
        self.gaps.iter().any(|gap| gap.contains(elapsed))
    }
}

/// [`MissingScrapeMask::is_missing`] with the default gaps.
pub fn is_missing_scrape(elapsed: f64) -> bool {
    MissingScrapeMask::default().is_missing(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries_are_not_missing() {
        for edge in [120.0, 180.0, 300.0, 600.0, 1500.0, 2100.0] {
            assert!(!is_missing_scrape(edge), "edge {} must be scraped", edge);
        }
    }

    #[test]
    fn test_inside_gaps_are_missing() {
        for inside in [121.0, 179.0, 301.0, 450.0, 599.0, 1501.0, 2099.0] {
            assert!(is_missing_scrape(inside), "{} must be missing", inside);
        }
        for outside in [0.0, 119.0, 181.0, 299.0, 601.0, 1499.0, 2101.0, 3599.0] {
            assert!(!is_missing_scrape(outside), "{} must be scraped", outside);
        }
    }

    #[test]
    fn test_none_never_suppresses() {
        let mask = MissingScrapeMask::none();
        assert!(!mask.is_missing(150.0));
        assert!(mask.gaps().is_empty());
    }

    proptest! {
        #[test]
        fn property_mask_matches_interval_definition(e in 0.0f64..4000.0) {
            let expected = (120.0 < e && e < 180.0)
                || (300.0 < e && e < 600.0)
                || (1500.0 < e && e < 2100.0);
            prop_assert_eq!(is_missing_scrape(e), expected);
        }

        #[test]
        fn property_integer_seconds(e in 0i64..4000) {
            let expected = (121..=179).contains(&e)
                || (301..=599).contains(&e)
                || (1501..=2099).contains(&e);
            prop_assert_eq!(is_missing_scrape(e as f64), expected);
        }
    }
}
