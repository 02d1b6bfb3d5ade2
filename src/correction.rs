//! Keeps a [`FilterState`] consistent with the options a roster offers.
//!
//! Two rules reset a dimension to "all":
//! - a concrete value that is no longer offered for its dimension;
//! - a section that the selected branch does not run.
//!
//! Both rules read the same snapshot and their findings are unioned, so the
//! outcome does not depend on which rule runs first. Every flagged
//! dimension is reset in the same pass; options are then re-derived and the
//! rules re-run until nothing changes. A section counts as stale unless a
//! record actually runs it, so an empty roster clears every selection.

use crate::filter::FilterState;
use crate::ids::{Choice, Dimension};
use crate::models::Classified;
use crate::options::{derive_options, AvailableOptions};
use crate::topology;

/// Dimensions a rule wants opened back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resets {
    pub year: bool,
    pub branch: bool,
    pub section: bool,
}

impl Resets {
    pub fn is_empty(&self) -> bool {
        !(self.year || self.branch || self.section)
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            year: self.year || other.year,
            branch: self.branch || other.branch,
            section: self.section || other.section,
        }
    }

    pub fn apply(&self, state: &FilterState) -> FilterState {
        let mut next = *state;
        if self.year {
            next.year = Choice::All;
        }
        if self.branch {
            next.branch = Choice::All;
        }
        if self.section {
            next.section = Choice::All;
        }
        next
    }

    /// Flagged dimensions, in cascade order.
    pub fn dimensions(&self) -> impl Iterator<Item = Dimension> {
        [
            (Dimension::Year, self.year),
            (Dimension::Branch, self.branch),
            (Dimension::Section, self.section),
        ]
        .into_iter()
        .filter_map(|(dimension, flagged)| flagged.then_some(dimension))
    }
}

/// Values absent from the freshly derived options.
pub fn stale_values(state: &FilterState, options: &AvailableOptions) -> Resets {
    Resets {
        year: state.year.value().is_some_and(|y| !options.offers_year(y)),
        branch: state.branch.value().is_some_and(|b| !options.offers_branch(b)),
        section: state
            .section
            .value()
            .is_some_and(|s| !options.covers_section(state.branch, s)),
    }
}

/// A section the concrete branch does not run.
///
/// Live coverage wins over the static layout when the roster has any.
pub fn branch_section_mismatch(state: &FilterState, options: &AvailableOptions) -> Resets {
    let (Choice::Only(branch), Choice::Only(section)) = (state.branch, state.section) else {
        return Resets::default();
    };
    let allowed = match options.live_sections(branch) {
        Some(live) => live.contains(&section),
        None => topology::allows(branch, section),
    };
    Resets {
        section: !allowed,
        ..Resets::default()
    }
}

/// Findings of both rules against one snapshot.
pub fn findings(state: &FilterState, options: &AvailableOptions) -> Resets {
    stale_values(state, options).union(branch_section_mismatch(state, options))
}

/// Outcome of [`auto_correct`].
#[derive(Debug, Clone, PartialEq)]
pub struct Corrected {
    pub state: FilterState,
    pub options: AvailableOptions,
    /// Dimensions that were reset along the way.
    pub reset: Vec<Dimension>,
}

/// Drive `state` to the fixed point of both rules over `roster`.
pub fn auto_correct<R: Classified>(roster: &[R], state: &FilterState) -> Corrected {
    let mut current = *state;
    let mut reset = Vec::new();
    loop {
        let options = derive_options(roster, &current);
        let found = findings(&current, &options);
        if found.is_empty() {
            if !reset.is_empty() {
                tracing::debug!(?reset, state = %current.label(), "filter selections reset");
            }
            return Corrected {
                state: current,
                options,
                reset,
            };
        }
        for dimension in found.dimensions() {
            if !reset.contains(&dimension) {
                reset.push(dimension);
            }
        }
        current = found.apply(&current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BranchId, SectionId, YearId};
    use crate::models::{StudentId, StudentRecord};

    fn student(id: u64, year: u8, branch: u8, section: u8) -> StudentRecord {
        StudentRecord {
            id: StudentId(id),
            name: format!("Student {id}"),
            roll_no: String::new(),
            email: String::new(),
            phone: String::new(),
            year: YearId::new(year).unwrap(),
            branch: BranchId::new(branch).unwrap(),
            section: SectionId::new(section).unwrap(),
            cgpa: None,
            fee_status: None,
        }
    }

    fn only<T>(value: crate::error::Result<T>) -> Choice<T> {
        Choice::Only(value.unwrap())
    }

    #[test]
    fn valid_selection_is_left_alone() {
        let roster = vec![student(1, 4, 1, 2), student(2, 3, 2, 1)];
        let state = FilterState::new(only(YearId::new(4)), only(BranchId::new(1)), only(SectionId::new(2)));
        let corrected = auto_correct(&roster, &state);
        assert_eq!(corrected.state, state);
        assert!(corrected.reset.is_empty());
    }

    #[test]
    fn stale_branch_resets_only_that_dimension() {
        let roster = vec![student(1, 4, 1, 1), student(2, 4, 2, 1)];
        let state = FilterState::new(Choice::All, only(BranchId::new(5)), Choice::All);
        let corrected = auto_correct(&roster, &state);
        assert!(corrected.state.is_unrestricted());
        assert_eq!(corrected.reset, vec![Dimension::Branch]);
    }

    #[test]
    fn conflicting_year_and_branch_both_reset() {
        let roster = vec![student(1, 4, 1, 1), student(2, 3, 2, 1)];
        let state = FilterState::new(only(YearId::new(4)), only(BranchId::new(2)), Choice::All);
        let corrected = auto_correct(&roster, &state);
        assert!(corrected.state.is_unrestricted());
        assert_eq!(corrected.reset, vec![Dimension::Year, Dimension::Branch]);
    }

    #[test]
    fn section_outside_branch_coverage_resets() {
        let roster = vec![student(1, 4, 1, 2), student(2, 4, 2, 1)];
        let state = FilterState::new(Choice::All, only(BranchId::new(2)), only(SectionId::new(2)));
        let corrected = auto_correct(&roster, &state);
        assert_eq!(corrected.state.section, Choice::All);
        assert!(corrected.reset.contains(&Dimension::Section));
        assert!(!crate::filter::apply_filter(&roster, &corrected.state).is_empty());
    }

    #[test]
    fn empty_roster_clears_a_concrete_section() {
        let roster: Vec<StudentRecord> = Vec::new();
        let state = FilterState::new(Choice::All, Choice::All, only(SectionId::new(3)));
        let corrected = auto_correct(&roster, &state);
        assert!(corrected.state.is_unrestricted());
        assert_eq!(corrected.reset, vec![Dimension::Section]);

        let state = FilterState::new(Choice::All, only(BranchId::new(1)), only(SectionId::new(1)));
        let corrected = auto_correct(&roster, &state);
        assert!(corrected.state.is_unrestricted());
    }

    #[test]
    fn layout_decides_when_branch_has_no_live_sections() {
        let options = AvailableOptions::default();
        let state = FilterState::new(Choice::All, only(BranchId::new(6)), only(SectionId::new(3)));
        assert!(branch_section_mismatch(&state, &options).section);
        let state = FilterState::new(Choice::All, only(BranchId::new(1)), only(SectionId::new(3)));
        assert!(!branch_section_mismatch(&state, &options).section);
    }

    type Rule = fn(&FilterState, &AvailableOptions) -> Resets;

    /// Runs `first` then `second` as separate updates against each pass's
    /// options until a pass changes nothing.
    fn run_in_order<R: Classified>(roster: &[R], state: &FilterState, first: Rule, second: Rule) -> FilterState {
        let mut current = *state;
        loop {
            let options = derive_options(roster, &current);
            let after_first = first(&current, &options).apply(&current);
            let after_second = second(&after_first, &options).apply(&after_first);
            if after_second == current {
                return current;
            }
            current = after_second;
        }
    }

    #[test]
    fn rule_order_does_not_change_the_outcome() {
        let rosters = [
            vec![student(1, 4, 1, 1), student(2, 3, 2, 1)],
            vec![student(1, 4, 1, 2), student(2, 4, 2, 1)],
            vec![student(1, 4, 1, 1), student(2, 4, 1, 2), student(3, 2, 6, 1)],
            Vec::new(),
        ];
        let states = [
            FilterState::new(only(YearId::new(4)), only(BranchId::new(2)), only(SectionId::new(2))),
            FilterState::new(Choice::All, only(BranchId::new(2)), only(SectionId::new(2))),
            FilterState::new(only(YearId::new(2)), only(BranchId::new(1)), only(SectionId::new(3))),
            FilterState::new(Choice::All, only(BranchId::new(6)), only(SectionId::new(3))),
        ];
        for roster in &rosters {
            for state in &states {
                let stale_first = run_in_order(roster, state, stale_values, branch_section_mismatch);
                let layout_first = run_in_order(roster, state, branch_section_mismatch, stale_values);
                assert_eq!(stale_first, layout_first, "{}", state.label());
                assert_eq!(auto_correct(roster, state).state, stale_first);
            }
        }
    }

    #[test]
    fn correcting_twice_changes_nothing() {
        let roster = vec![student(1, 4, 1, 1), student(2, 3, 2, 2), student(3, 1, 7, 1)];
        let state = FilterState::new(only(YearId::new(2)), only(BranchId::new(2)), only(SectionId::new(3)));
        let once = auto_correct(&roster, &state);
        let twice = auto_correct(&roster, &once.state);
        assert_eq!(once.state, twice.state);
        assert!(twice.reset.is_empty());
    }
}
