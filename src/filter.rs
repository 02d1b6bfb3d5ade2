//! Filter state and the stable roster filter.

use serde::{Deserialize, Serialize};

use crate::ids::{BranchId, Choice, Dimension, SectionId, YearId};
use crate::models::Classified;

/// The three cascading selections. Starts at all/all/all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub year: Choice<YearId>,
    #[serde(default)]
    pub branch: Choice<BranchId>,
    #[serde(default)]
    pub section: Choice<SectionId>,
}

impl FilterState {
    pub fn new(year: Choice<YearId>, branch: Choice<BranchId>, section: Choice<SectionId>) -> Self {
        Self {
            year,
            branch,
            section,
        }
    }

    /// True when no dimension is restricted.
    pub fn is_unrestricted(&self) -> bool {
        self.year.is_all() && self.branch.is_all() && self.section.is_all()
    }

    pub fn matches<R: Classified + ?Sized>(&self, record: &R) -> bool {
        self.year.admits(record.year_id())
            && self.branch.admits(record.branch_id())
            && self.section.admits(record.section_id())
    }

    /// The same state with one dimension opened back up to "all".
    pub fn without(&self, dimension: Dimension) -> Self {
        let mut relaxed = *self;
        match dimension {
            Dimension::Year => relaxed.year = Choice::All,
            Dimension::Branch => relaxed.branch = Choice::All,
            Dimension::Section => relaxed.section = Choice::All,
        }
        relaxed
    }

    /// Query pairs for the roster endpoints; "all" dimensions are omitted.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(year) = self.year.value() {
            pairs.push((Dimension::Year.query_key(), year.to_string()));
        }
        if let Some(branch) = self.branch.value() {
            pairs.push((Dimension::Branch.query_key(), branch.to_string()));
        }
        if let Some(section) = self.section.value() {
            pairs.push((Dimension::Section.query_key(), section.to_string()));
        }
        pairs
    }

    /// Human label such as `4th Year / CSE / Section A`.
    pub fn label(&self) -> String {
        if self.is_unrestricted() {
            return "all students".to_string();
        }
        let year = self.year.value().map_or_else(|| "All Years".to_string(), YearId::label);
        let branch = self
            .branch
            .value()
            .map_or_else(|| "All Branches".to_string(), |b| b.code().to_string());
        let section = self
            .section
            .value()
            .map_or_else(|| "All Sections".to_string(), |s| format!("Section {}", s.letter()));
        format!("{year} / {branch} / {section}")
    }
}

/// Records matching `filters`, in their original order.
pub fn apply_filter<'a, R: Classified>(roster: &'a [R], filters: &FilterState) -> Vec<&'a R> {
    roster.iter().filter(|record| filters.matches(*record)).collect()
}

/// Owned variant of [`apply_filter`].
pub fn apply_filter_owned<R: Classified + Clone>(roster: &[R], filters: &FilterState) -> Vec<R> {
    roster
        .iter()
        .filter(|record| filters.matches(*record))
        .cloned()
        .collect()
}

/// The record shown in a page's detail panel.
///
/// Never points at a record hidden by the active filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Focus<K> {
    key: Option<K>,
}

impl<K> Default for Focus<K> {
    fn default() -> Self {
        Self { key: None }
    }
}

impl<K: Clone + PartialEq> Focus<K> {
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn clear(&mut self) {
        self.key = None;
    }

    /// Focus `key` if it is among `visible`; returns whether it took.
    pub fn select<R>(&mut self, key: K, visible: &[&R]) -> bool
    where
        R: Classified<Key = K>,
    {
        if visible.iter().any(|r| r.key() == key) {
            self.key = Some(key);
            true
        } else {
            false
        }
    }

    /// Move focus to the first visible record if the current one vanished.
    pub fn reconcile<R>(&mut self, visible: &[&R])
    where
        R: Classified<Key = K>,
    {
        let still_visible = self
            .key
            .as_ref()
            .is_some_and(|key| visible.iter().any(|r| &r.key() == key));
        if !still_visible {
            self.key = visible.first().map(|r| r.key());
        }
    }

    pub fn resolve<'a, R>(&self, visible: &[&'a R]) -> Option<&'a R>
    where
        R: Classified<Key = K>,
    {
        let key = self.key.as_ref()?;
        visible.iter().copied().find(|r| &r.key() == key)
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
            roll_no: format!("R{id:03}"),
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
    fn filter_keeps_order_and_matches_every_restricted_dimension() {
        let roster = vec![
            student(1, 4, 1, 1),
            student(2, 3, 1, 1),
            student(3, 4, 1, 2),
            student(4, 4, 2, 1),
            student(5, 4, 1, 3),
        ];
        let filters = FilterState::new(
            Choice::Only(YearId::new(4).unwrap()),
            Choice::Only(BranchId::new(1).unwrap()),
            Choice::All,
        );
        let ids: Vec<u64> = apply_filter(&roster, &filters).iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn query_omits_all_dimensions() {
        let filters = FilterState::new(Choice::Only(YearId::new(2).unwrap()), Choice::All, Choice::All);
        assert_eq!(filters.to_query(), vec![("year", "2".to_string())]);
        assert!(FilterState::default().to_query().is_empty());
    }

    #[test]
    fn focus_moves_to_first_visible_record() {
        let roster = vec![student(1, 4, 1, 1), student(2, 4, 2, 1), student(3, 4, 2, 1)];
        let mut focus = Focus::default();
        let everyone = apply_filter(&roster, &FilterState::default());
        assert!(focus.select(StudentId(1), &everyone));

        let ece = FilterState::new(Choice::All, Choice::Only(BranchId::new(2).unwrap()), Choice::All);
        let visible = apply_filter(&roster, &ece);
        focus.reconcile(&visible);
        assert_eq!(focus.key(), Some(&StudentId(2)));

        let mech = FilterState::new(Choice::All, Choice::Only(BranchId::new(7).unwrap()), Choice::All);
        let visible = apply_filter(&roster, &mech);
        focus.reconcile(&visible);
        assert_eq!(focus.key(), None);
    }

    #[test]
    fn focus_stays_when_still_visible() {
        let roster = vec![student(1, 4, 1, 1), student(2, 4, 1, 2)];
        let mut focus = Focus::default();
        let everyone = apply_filter(&roster, &FilterState::default());
        focus.select(StudentId(2), &everyone);
        let section_b = FilterState::new(Choice::All, Choice::All, Choice::Only(SectionId::new(2).unwrap()));
        let visible = apply_filter(&roster, &section_b);
        focus.reconcile(&visible);
        assert_eq!(focus.resolve(&visible).map(|r| r.id), Some(StudentId(2)));
    }
}
