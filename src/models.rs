use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PortalError;
use crate::filter::FilterState;
use crate::ids::{BranchId, SectionId, YearId};

/// A record that belongs to exactly one class (year, branch, section).
///
/// Anything a dashboard lists under the cascading filter implements this:
/// students, assignment submissions, fee entries with class coverage.
pub trait Classified {
    /// Identity used to keep the focused record stable across refilters.
    type Key: Clone + PartialEq + fmt::Debug;

    fn key(&self) -> Self::Key;
    fn year_id(&self) -> YearId;
    fn branch_id(&self) -> BranchId;
    fn section_id(&self) -> SectionId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: StudentId,
    pub name: String,
    #[serde(alias = "rollNo", deserialize_with = "string_or_number", default)]
    pub roll_no: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(alias = "year_id")]
    pub year: YearId,
    #[serde(alias = "branch_id")]
    pub branch: BranchId,
    #[serde(alias = "section_id", alias = "sec_id")]
    pub section: SectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgpa: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_status: Option<FeeStatus>,
}

impl Classified for StudentRecord {
    type Key = StudentId;

    fn key(&self) -> StudentId {
        self.id
    }

    fn year_id(&self) -> YearId {
        self.year
    }

    fn branch_id(&self) -> BranchId {
        self.branch
    }

    fn section_id(&self) -> SectionId {
        self.section
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Submitted,
    Graded,
}

fn default_year() -> YearId {
    YearId::FINAL
}

fn default_branch() -> BranchId {
    BranchId::FIRST
}

fn default_section() -> SectionId {
    SectionId::FIRST
}

/// A student's submission for an assignment, as seen by grading faculty.
///
/// Submissions without class coverage are placed in year 4, branch 1,
/// section 1 so they still show under the default filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub assignment_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentId>,
    pub student_name: String,
    #[serde(deserialize_with = "string_or_number", default)]
    pub student_roll_no: String,
    #[serde(default)]
    pub course_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<NaiveDate>,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks_awarded: Option<f64>,
    #[serde(default = "default_year")]
    pub year_id: YearId,
    #[serde(default = "default_branch")]
    pub branch_id: BranchId,
    #[serde(default = "default_section")]
    pub section_id: SectionId,
}

impl Classified for AssignmentRecord {
    type Key = u64;

    fn key(&self) -> u64 {
        self.assignment_id
    }

    fn year_id(&self) -> YearId {
        self.year_id
    }

    fn branch_id(&self) -> BranchId {
        self.branch_id
    }

    fn section_id(&self) -> SectionId {
        self.section_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeeStatus {
    Paid,
    Pending,
}

impl<'de> Deserialize<'de> for FeeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            other => Err(serde::de::Error::custom(format!("unknown fee status {other:?}"))),
        }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Paid => "Paid",
            Self::Pending => "Pending",
        })
    }
}

/// One student's fee position.
///
/// The fee endpoint filters by class server-side and does not echo the
/// class back, so class coverage is optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecord {
    #[serde(alias = "id", alias = "student_id")]
    pub student_id: StudentId,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "roll_no", deserialize_with = "string_or_number", default)]
    pub roll_no: String,
    #[serde(default)]
    pub admission_mode: String,
    #[serde(default)]
    pub fee_total: i64,
    #[serde(default)]
    pub paid_amount: i64,
    #[serde(default)]
    pub remaining_amount: i64,
    #[serde(default)]
    pub library_fine: i64,
    #[serde(default)]
    pub equipment_fine: i64,
    pub status: FeeStatus,
    #[serde(default, alias = "year_id", skip_serializing_if = "Option::is_none")]
    pub year: Option<YearId>,
    #[serde(default, alias = "branch_id", skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchId>,
    #[serde(default, alias = "section_id", skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionId>,
}

impl FeeRecord {
    pub fn is_pending(&self) -> bool {
        self.status == FeeStatus::Pending
    }

    /// Whether the record belongs to the selected class. A dimension the
    /// record does not echo is trusted as already filtered.
    pub fn in_class(&self, filters: &FilterState) -> bool {
        self.year.map_or(true, |y| filters.year.admits(y))
            && self.branch.map_or(true, |b| filters.branch.admits(b))
            && self.section.map_or(true, |s| filters.section.admits(s))
    }
}

/// Totals shown on the management fee page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSummary {
    pub expected_fee: i64,
    pub collected_fee: i64,
    pub pending_fee: i64,
}

impl FeeSummary {
    pub fn from_records(records: &[FeeRecord]) -> Self {
        let expected_fee: i64 = records.iter().map(|r| r.fee_total).sum();
        let collected_fee: i64 = records.iter().map(|r| r.paid_amount).sum();
        Self {
            expected_fee,
            collected_fee,
            pending_fee: expected_fee - collected_fee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NotificationKind {
    #[default]
    General,
    Academic,
    Fee,
    Administrative,
    Placement,
    Training,
}

impl FromStr for Priority {
    type Err = PortalError;

    fn from_str(raw: &str) -> crate::error::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(PortalError::Config(format!("unknown priority {other:?}"))),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = PortalError;

    fn from_str(raw: &str) -> crate::error::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "academic" => Ok(Self::Academic),
            "fee" => Ok(Self::Fee),
            "administrative" => Ok(Self::Administrative),
            "placement" => Ok(Self::Placement),
            "training" => Ok(Self::Training),
            other => Err(PortalError::Config(format!("unknown notification type {other:?}"))),
        }
    }
}

/// Form contents of a notification before it is addressed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

/// A notification as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_accepts_backend_and_demo_shapes() {
        let backend: StudentRecord = serde_json::from_str(
            r#"{"id": 7, "name": "Asha Rao", "email": "asha@college.edu", "roll_no": 21001,
                "phone": "9876500000", "year": 4, "branch": 1, "section": 2}"#,
        )
        .unwrap();
        assert_eq!(backend.roll_no, "21001");
        assert_eq!(backend.section.get(), 2);

        let demo: StudentRecord = serde_json::from_str(
            r#"{"id": 2, "name": "Alice Smith", "rollNo": "4YCS002", "year": "4th Year",
                "branch": "CSE", "section": "A", "fee_status": "pending"}"#,
        )
        .unwrap();
        assert_eq!(demo.year.get(), 4);
        assert_eq!(demo.branch.get(), 1);
        assert_eq!(demo.fee_status, Some(FeeStatus::Pending));
    }

    #[test]
    fn fee_record_class_check_trusts_missing_dimensions() {
        use crate::ids::Choice;

        let record: FeeRecord =
            serde_json::from_str(r#"{"studentId": 1, "status": "pending", "year": 4, "branch": 2}"#).unwrap();
        let ece_a = FilterState::new(
            Choice::Only(YearId::FINAL),
            Choice::Only(BranchId::new(2).unwrap()),
            Choice::Only(SectionId::new(1).unwrap()),
        );
        assert!(record.in_class(&ece_a));
        assert!(record.in_class(&FilterState::default()));
        let cse = FilterState::new(Choice::All, Choice::Only(BranchId::new(1).unwrap()), Choice::All);
        assert!(!record.in_class(&cse));
    }

    #[test]
    fn assignment_without_class_defaults_to_final_year_cse_a() {
        let record: AssignmentRecord = serde_json::from_str(
            r#"{"assignment_id": 3, "student_name": "Rajesh Patel", "student_roll_no": "4YCS003"}"#,
        )
        .unwrap();
        assert_eq!(record.year_id.get(), 4);
        assert_eq!(record.branch_id.get(), 1);
        assert_eq!(record.section_id.get(), 1);
        assert_eq!(record.status, SubmissionStatus::Pending);
    }

    #[test]
    fn fee_record_reads_management_payload() {
        let record: FeeRecord = serde_json::from_str(
            r#"{"id": 2, "name": "Alice Smith", "roll_no": 4002, "admissionMode": "Regular",
                "feeTotal": 100000, "paidAmount": 50000, "remainingAmount": 50000,
                "libraryFine": 500, "equipmentFine": 1000, "status": "Pending"}"#,
        )
        .unwrap();
        assert!(record.is_pending());
        assert_eq!(record.student_id, StudentId(2));
        assert_eq!(record.year, None);
    }

    #[test]
    fn fee_summary_totals() {
        let records: Vec<FeeRecord> = serde_json::from_str(
            r#"[{"studentId": 1, "feeTotal": 100, "paidAmount": 100, "status": "Paid"},
                {"studentId": 2, "feeTotal": 100, "paidAmount": 40, "status": "pending"}]"#,
        )
        .unwrap();
        let summary = FeeSummary::from_records(&records);
        assert_eq!(summary.expected_fee, 200);
        assert_eq!(summary.collected_fee, 140);
        assert_eq!(summary.pending_fee, 60);
    }

    #[test]
    fn draft_fields_parse_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("placement".parse::<NotificationKind>().unwrap(), NotificationKind::Placement);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
