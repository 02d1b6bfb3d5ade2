//! Static branch → section layout of the college.
//!
//! Only consulted when the live roster says nothing about a branch.

use crate::ids::{BranchId, SectionId};

const LAYOUT: [(u8, &[u8]); 7] = [
    (1, &[1, 2, 3]),
    (2, &[1, 2]),
    (3, &[1, 2]),
    (4, &[1]),
    (5, &[1]),
    (6, &[1]),
    (7, &[1]),
];

/// Sections a branch is known to run, ascending and never empty.
pub fn sections_for(branch: BranchId) -> Vec<SectionId> {
    let sections: Vec<SectionId> = LAYOUT
        .iter()
        .find(|(id, _)| *id == branch.get())
        .map(|(_, sections)| {
            sections
                .iter()
                .filter_map(|&s| SectionId::new(s).ok())
                .collect()
        })
        .unwrap_or_default();

    if sections.is_empty() {
        vec![SectionId::FIRST]
    } else {
        sections
    }
}

/// Whether `section` exists in `branch` according to the static layout.
pub fn allows(branch: BranchId, section: SectionId) -> bool {
    sections_for(branch).contains(&section)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_branch_has_sections() {
        for branch in BranchId::all() {
            assert!(!sections_for(branch).is_empty(), "branch {branch} has no sections");
        }
    }

    #[test]
    fn cse_runs_three_sections_and_small_branches_one() {
        let cse = BranchId::new(1).unwrap();
        assert_eq!(sections_for(cse).len(), 3);
        let civil = BranchId::new(6).unwrap();
        assert_eq!(sections_for(civil), vec![SectionId::FIRST]);
        assert!(!allows(civil, SectionId::new(2).unwrap()));
    }
}
