//! A roster together with its cascading filter state.

use crate::correction::{auto_correct, branch_section_mismatch};
use crate::filter::{apply_filter, FilterState, Focus};
use crate::ids::{BranchId, Choice, Dimension, SectionId, YearId};
use crate::models::Classified;
use crate::options::{derive_options, AvailableOptions};

/// Roster, selections and derived options for one page.
///
/// Every mutation re-derives the options and auto-corrects the selections,
/// so the state never points at an empty combination the roster cannot
/// satisfy. Switching to a concrete branch first drops a section that
/// branch does not run, which keeps the new branch itself selected.
#[derive(Debug, Clone)]
pub struct Cascade<R: Classified> {
    roster: Vec<R>,
    filters: FilterState,
    options: AvailableOptions,
    focus: Focus<R::Key>,
}

impl<R: Classified> Cascade<R> {
    pub fn new(roster: Vec<R>) -> Self {
        let mut cascade = Self {
            roster,
            filters: FilterState::default(),
            options: AvailableOptions::default(),
            focus: Focus::default(),
        };
        cascade.settle();
        cascade
    }

    pub fn roster(&self) -> &[R] {
        &self.roster
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn options(&self) -> &AvailableOptions {
        &self.options
    }

    /// Section dropdown for the current branch selection.
    pub fn section_choices(&self) -> Vec<SectionId> {
        self.options.sections_for(self.filters.branch)
    }

    pub fn visible(&self) -> Vec<&R> {
        apply_filter(&self.roster, &self.filters)
    }

    pub fn focused(&self) -> Option<&R> {
        self.focus.resolve(&self.visible())
    }

    /// Replace the roster, keeping whichever selections remain valid.
    pub fn replace_roster(&mut self, roster: Vec<R>) -> Vec<Dimension> {
        self.roster = roster;
        self.settle()
    }

    pub fn select_year(&mut self, year: Choice<YearId>) -> Vec<Dimension> {
        self.filters.year = year;
        self.settle()
    }

    pub fn select_branch(&mut self, branch: Choice<BranchId>) -> Vec<Dimension> {
        let previous = self.filters.branch;
        self.filters.branch = branch;
        let dropped = self.follow_branch(previous);
        self.settle_after(dropped)
    }

    pub fn select_section(&mut self, section: Choice<SectionId>) -> Vec<Dimension> {
        self.filters.section = section;
        self.settle()
    }

    /// Apply several selections at once, then correct.
    pub fn select(&mut self, filters: FilterState) -> Vec<Dimension> {
        let previous = self.filters.branch;
        self.filters = filters;
        let dropped = self.follow_branch(previous);
        self.settle_after(dropped)
    }

    pub fn reset(&mut self) {
        self.filters = FilterState::default();
        self.settle();
    }

    /// Focus a record by key; ignored when the record is filtered out.
    pub fn focus(&mut self, key: R::Key) -> bool {
        let visible = apply_filter(&self.roster, &self.filters);
        self.focus.select(key, &visible)
    }

    fn follow_branch(&mut self, previous: Choice<BranchId>) -> Option<Dimension> {
        if self.filters.branch == previous {
            return None;
        }
        let options = derive_options(&self.roster, &self.filters);
        if !branch_section_mismatch(&self.filters, &options).section {
            return None;
        }
        self.filters.section = Choice::All;
        Some(Dimension::Section)
    }

    fn settle_after(&mut self, dropped: Option<Dimension>) -> Vec<Dimension> {
        let mut reset: Vec<Dimension> = dropped.into_iter().collect();
        for dimension in self.settle() {
            if !reset.contains(&dimension) {
                reset.push(dimension);
            }
        }
        reset
    }

    fn settle(&mut self) -> Vec<Dimension> {
        let corrected = auto_correct(&self.roster, &self.filters);
        self.filters = corrected.state;
        self.options = corrected.options;
        let visible = apply_filter(&self.roster, &self.filters);
        self.focus.reconcile(&visible);
        corrected.reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn new_cascade_focuses_first_record() {
        let cascade = Cascade::new(vec![student(4, 4, 1, 1), student(9, 3, 2, 1)]);
        assert!(cascade.filters().is_unrestricted());
        assert_eq!(cascade.focused().map(|s| s.id), Some(StudentId(4)));
    }

    #[test]
    fn branch_change_drops_unsupported_section() {
        let mut cascade = Cascade::new(vec![
            student(1, 4, 1, 1),
            student(2, 4, 1, 2),
            student(3, 4, 2, 1),
        ]);
        cascade.select_branch(Choice::Only(BranchId::new(1).unwrap()));
        cascade.select_section(Choice::Only(SectionId::new(2).unwrap()));
        assert_eq!(cascade.visible().len(), 1);

        let reset = cascade.select_branch(Choice::Only(BranchId::new(2).unwrap()));
        assert_eq!(reset, vec![Dimension::Section]);
        assert_eq!(cascade.filters().section, Choice::All);
        assert_eq!(cascade.focused().map(|s| s.id), Some(StudentId(3)));
    }

    #[test]
    fn bulk_selection_with_a_dead_section_and_unchanged_branch_clears_both() {
        let mut cascade = Cascade::new(vec![student(1, 4, 1, 2), student(2, 4, 2, 1)]);
        cascade.select_branch(Choice::Only(BranchId::new(2).unwrap()));
        let reset = cascade.select(FilterState::new(
            Choice::All,
            Choice::Only(BranchId::new(2).unwrap()),
            Choice::Only(SectionId::new(2).unwrap()),
        ));
        assert_eq!(reset, vec![Dimension::Branch, Dimension::Section]);
        assert!(cascade.filters().is_unrestricted());
    }

    #[test]
    fn empty_roster_never_keeps_a_section() {
        let mut cascade = Cascade::new(Vec::<StudentRecord>::new());
        let reset = cascade.select_section(Choice::Only(SectionId::new(3).unwrap()));
        assert_eq!(reset, vec![Dimension::Section]);
        assert_eq!(cascade.filters().section, Choice::All);
        assert!(cascade.visible().is_empty());
        assert_eq!(cascade.section_choices().len(), 3);
    }

    #[test]
    fn refreshed_roster_keeps_valid_selection() {
        let mut cascade = Cascade::new(vec![student(1, 4, 1, 1), student(2, 3, 1, 1)]);
        cascade.select_year(Choice::Only(YearId::new(3).unwrap()));
        let reset = cascade.replace_roster(vec![student(2, 3, 1, 1), student(5, 2, 1, 1)]);
        assert!(reset.is_empty());
        assert_eq!(cascade.filters().year, Choice::Only(YearId::new(3).unwrap()));

        let reset = cascade.replace_roster(vec![student(5, 2, 1, 1)]);
        assert_eq!(reset, vec![Dimension::Year]);
        assert!(cascade.filters().is_unrestricted());
    }

    #[test]
    fn focus_ignores_hidden_records() {
        let mut cascade = Cascade::new(vec![student(1, 4, 1, 1), student(2, 3, 1, 1)]);
        cascade.select_year(Choice::Only(YearId::new(4).unwrap()));
        assert!(!cascade.focus(StudentId(2)));
        assert_eq!(cascade.focused().map(|s| s.id), Some(StudentId(1)));
    }
}
