//! Selectable filter values derived from a roster.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::filter::FilterState;
use crate::ids::{BranchId, Choice, Dimension, SectionId, YearId};
use crate::models::Classified;
use crate::topology;

/// Values a user may pick next without reaching an empty roster.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AvailableOptions {
    pub years: Vec<YearId>,
    pub branches: Vec<BranchId>,
    /// Live section coverage per branch, restricted by the current year only.
    pub sections_by_branch: BTreeMap<BranchId, Vec<SectionId>>,
}

impl AvailableOptions {
    pub fn offers_year(&self, year: YearId) -> bool {
        self.years.contains(&year)
    }

    pub fn offers_branch(&self, branch: BranchId) -> bool {
        self.branches.contains(&branch)
    }

    /// Section dropdown contents for a branch selection. Never empty.
    ///
    /// A concrete branch without live coverage falls back to the static
    /// layout; "all branches" offers the union of live sections, or every
    /// section when the roster has none.
    pub fn sections_for(&self, branch: Choice<BranchId>) -> Vec<SectionId> {
        match branch {
            Choice::Only(branch) => match self.sections_by_branch.get(&branch) {
                Some(live) if !live.is_empty() => live.clone(),
                _ => topology::sections_for(branch),
            },
            Choice::All => {
                let union: BTreeSet<SectionId> =
                    self.sections_by_branch.values().flatten().copied().collect();
                if union.is_empty() {
                    SectionId::all().collect()
                } else {
                    union.into_iter().collect()
                }
            }
        }
    }

    /// Live sections for a branch, without the static fallback.
    pub fn live_sections(&self, branch: BranchId) -> Option<&[SectionId]> {
        self.sections_by_branch
            .get(&branch)
            .map(Vec::as_slice)
            .filter(|s| !s.is_empty())
    }

    /// Whether some record in the current year runs `section` under `branch`.
    ///
    /// Unlike [`sections_for`](Self::sections_for) there is no layout
    /// fallback: an empty roster covers nothing.
    pub fn covers_section(&self, branch: Choice<BranchId>, section: SectionId) -> bool {
        match branch {
            Choice::Only(branch) => self
                .live_sections(branch)
                .is_some_and(|live| live.contains(&section)),
            Choice::All => self
                .sections_by_branch
                .values()
                .any(|live| live.contains(&section)),
        }
    }
}

fn distinct<R, T, F>(roster: &[R], filters: &FilterState, project: F) -> Vec<T>
where
    R: Classified,
    T: Ord,
    F: Fn(&R) -> T,
{
    roster
        .iter()
        .filter(|record| filters.matches(*record))
        .map(project)
        .collect::<BTreeSet<T>>()
        .into_iter()
        .collect()
}

/// Derive the selectable values for each dimension.
///
/// A dimension's choices come from the records matching the *other* two
/// selections, so a stale value on that dimension never hides its own
/// replacements. Ids are ordered numerically.
pub fn derive_options<R: Classified>(roster: &[R], filters: &FilterState) -> AvailableOptions {
    let years = distinct(roster, &filters.without(Dimension::Year), R::year_id);
    let branches = distinct(roster, &filters.without(Dimension::Branch), R::branch_id);

    let year_only = FilterState::new(filters.year, Choice::All, Choice::All);
    let mut coverage: BTreeMap<BranchId, BTreeSet<SectionId>> = BTreeMap::new();
    for record in roster.iter().filter(|record| year_only.matches(*record)) {
        coverage
            .entry(record.branch_id())
            .or_default()
            .insert(record.section_id());
    }
    let sections_by_branch = coverage
        .into_iter()
        .map(|(branch, sections)| (branch, sections.into_iter().collect()))
        .collect();

    tracing::debug!(
        records = roster.len(),
        years = years.len(),
        branches = branches.len(),
        "derived filter options"
    );

    AvailableOptions {
        years,
        branches,
        sections_by_branch,
    }
}
