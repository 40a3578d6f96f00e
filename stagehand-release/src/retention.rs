//! Retention: which releases `prune` may delete.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use stagehand_core::ReleaseId;

use crate::error::ReleaseError;

/// Number of releases kept when no spec is given.
pub const DEFAULT_KEEP: usize = 10;

/// How many releases to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneSpec {
    /// Every unreferenced release is eligible.
    All,
    /// Keep the newest `n` releases.
    Keep(usize),
}

impl Default for PruneSpec {
    fn default() -> Self {
        Self::Keep(DEFAULT_KEEP)
    }
}

impl FromStr for PruneSpec {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<usize>()
            .map(Self::Keep)
            .map_err(|_| ReleaseError::InvalidPruneSpec { spec: s.to_owned() })
    }
}

impl fmt::Display for PruneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Keep(n) => write!(f, "{n}"),
        }
    }
}

/// Releases to delete.
///
/// Releases in `referenced` (some repo's current release) are never selected.
/// Of the rest, `Keep(n)` spares the newest `n`; `All` spares none.
pub fn select_for_pruning(
    all: &[ReleaseId],
    referenced: &BTreeSet<ReleaseId>,
    spec: PruneSpec,
) -> BTreeSet<ReleaseId> {
    let unreferenced: BTreeSet<&ReleaseId> =
        all.iter().filter(|r| !referenced.contains(*r)).collect();
    let spared = match spec {
        PruneSpec::All => 0,
        PruneSpec::Keep(n) => n,
    };
    let take = unreferenced.len().saturating_sub(spared);
    unreferenced.into_iter().take(take).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ids(names: &[&str]) -> Vec<ReleaseId> {
        names.iter().map(|n| ReleaseId::parse(n).unwrap()).collect()
    }

    fn set(names: &[&str]) -> BTreeSet<ReleaseId> {
        ids(names).into_iter().collect()
    }

    #[rstest]
    #[case::keep_two(PruneSpec::Keep(2), &["A", "B"])]
    #[case::all(PruneSpec::All, &["A", "B", "D", "E"])]
    #[case::keep_more_than_exist(PruneSpec::Keep(10), &[])]
    #[case::keep_exactly_unreferenced(PruneSpec::Keep(4), &[])]
    #[case::keep_zero(PruneSpec::Keep(0), &["A", "B", "D", "E"])]
    fn selection(#[case] spec: PruneSpec, #[case] expected: &[&str]) {
        let all = ids(&["A", "B", "C", "D", "E"]);
        assert_eq!(select_for_pruning(&all, &set(&["C"]), spec), set(expected));
    }

    #[test]
    fn kept_count_excludes_referenced_releases() {
        let all = ids(&["A", "B", "C", "D", "E"]);
        assert_eq!(
            select_for_pruning(&all, &set(&["E"]), PruneSpec::Keep(2)),
            set(&["A", "B"])
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let all = ids(&["E", "A", "D", "B", "C"]);
        assert_eq!(
            select_for_pruning(&all, &set(&["C"]), PruneSpec::Keep(2)),
            set(&["A", "B"])
        );
    }

    #[rstest]
    #[case("all", PruneSpec::All)]
    #[case("ALL", PruneSpec::All)]
    #[case("5", PruneSpec::Keep(5))]
    #[case(" 0 ", PruneSpec::Keep(0))]
    fn parse_valid(#[case] input: &str, #[case] expected: PruneSpec) {
        assert_eq!(input.parse::<PruneSpec>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("-1")]
    #[case("some")]
    #[case("2.5")]
    fn parse_invalid(#[case] input: &str) {
        assert!(matches!(
            input.parse::<PruneSpec>(),
            Err(ReleaseError::InvalidPruneSpec { .. })
        ));
    }

    #[test]
    fn default_keeps_ten() {
        assert_eq!(PruneSpec::default(), PruneSpec::Keep(10));
        assert_eq!(PruneSpec::default().to_string(), "10");
    }
}
