//! Demo dataset shown when the backend cannot be reached.

use std::path::Path;

use chrono::{NaiveDate, Utc};

use crate::error::{PortalError, Result};
use crate::ids::{BranchId, SectionId, YearId};
use crate::models::{
    AssignmentRecord, FeeRecord, FeeStatus, Notification, StudentId, StudentRecord, SubmissionStatus,
};

fn class(year: u8, branch: u8, section: u8) -> (YearId, BranchId, SectionId) {
    // Literal fixture ids are always in range.
    (
        YearId::new(year).unwrap_or(YearId::FINAL),
        BranchId::new(branch).unwrap_or(BranchId::FIRST),
        SectionId::new(section).unwrap_or(SectionId::FIRST),
    )
}

fn student(id: u64, name: &str, roll_no: &str, at: (u8, u8, u8), cgpa: f64, fee: FeeStatus) -> StudentRecord {
    let (year, branch, section) = class(at.0, at.1, at.2);
    StudentRecord {
        id: StudentId(id),
        name: name.to_string(),
        roll_no: roll_no.to_string(),
        email: format!("{}@college.edu", name.split_whitespace().next().unwrap_or(name).to_lowercase()),
        phone: format!("98765432{:02}", id % 100),
        year,
        branch,
        section,
        cgpa: Some(cgpa),
        fee_status: Some(fee),
    }
}

pub fn demo_students() -> Vec<StudentRecord> {
    vec![
        student(1, "John Doe", "4YCS001", (4, 1, 1), 8.4, FeeStatus::Paid),
        student(2, "Alice Smith", "4YCS002", (4, 1, 1), 9.1, FeeStatus::Pending),
        student(3, "Bob Johnson", "4YCS003", (4, 1, 2), 7.6, FeeStatus::Paid),
        student(4, "Sneha Gupta", "3ECE001", (3, 2, 1), 8.8, FeeStatus::Pending),
        student(5, "Vikram Nair", "2CSM001", (2, 3, 1), 7.2, FeeStatus::Paid),
        student(6, "Priya Singh", "4YCS004", (4, 1, 3), 8.9, FeeStatus::Paid),
    ]
}

pub fn demo_fees() -> Vec<FeeRecord> {
    demo_students()
        .into_iter()
        .map(|s| {
            let paid = s.fee_status == Some(FeeStatus::Paid);
            let paid_amount = if paid { 100_000 } else { 50_000 };
            FeeRecord {
                student_id: s.id,
                name: s.name,
                roll_no: s.roll_no,
                admission_mode: "Regular".to_string(),
                fee_total: 100_000,
                paid_amount,
                remaining_amount: 100_000 - paid_amount,
                library_fine: if paid { 0 } else { 500 },
                equipment_fine: if paid { 0 } else { 1_000 },
                status: if paid { FeeStatus::Paid } else { FeeStatus::Pending },
                year: Some(s.year),
                branch: Some(s.branch),
                section: Some(s.section),
            }
        })
        .collect()
}

pub fn demo_assignments() -> Vec<AssignmentRecord> {
    let rows = [
        (1, "Aditya Kumar", "4YCS001", "CS101", (2024, 2, 1), (4, 1, 1)),
        (2, "Priya Singh", "4YCS002", "CS102", (2024, 2, 2), (4, 1, 1)),
        (3, "Rajesh Patel", "4YCS003", "CS101", (2024, 2, 3), (4, 1, 2)),
        (4, "Sneha Gupta", "3ECE001", "EC101", (2024, 2, 4), (3, 2, 1)),
        (5, "Vikram Nair", "2CSM001", "ME101", (2024, 2, 5), (2, 3, 1)),
    ];
    rows.into_iter()
        .map(|(id, name, roll_no, course, (y, m, d), (year, branch, section))| {
            let (year_id, branch_id, section_id) = class(year, branch, section);
            AssignmentRecord {
                assignment_id: id,
                student_id: None,
                student_name: name.to_string(),
                student_roll_no: roll_no.to_string(),
                course_id: course.to_string(),
                submitted_at: NaiveDate::from_ymd_opt(y, m, d),
                status: SubmissionStatus::Submitted,
                marks_awarded: None,
                year_id,
                branch_id,
                section_id,
            }
        })
        .collect()
}

pub fn demo_notifications() -> Vec<Notification> {
    let now = Utc::now();
    vec![
        Notification {
            id: 1,
            title: "Fee Submission Deadline".to_string(),
            description: "Please submit your fees by the end of this semester.".to_string(),
            kind: "Fee".to_string(),
            priority: "High".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 2, 28),
            created_at: Some(now - chrono::Duration::days(3)),
        },
        Notification {
            id: 2,
            title: "Mid-Semester Exam Schedule Released".to_string(),
            description: "Check the academic calendar for details.".to_string(),
            kind: "Academic".to_string(),
            priority: "Medium".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 2, 20),
            created_at: Some(now - chrono::Duration::days(5)),
        },
    ]
}

/// Read a student roster from CSV.
///
/// Columns follow the backend's JSON keys (`id,name,roll_no,email,phone,
/// year,branch,section`); ids may be numerals, codes or letters.
pub fn read_students_csv(path: &Path) -> Result<Vec<StudentRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut students = Vec::new();
    for (line, row) in reader.deserialize::<StudentRecord>().enumerate() {
        let student = row.map_err(|e| PortalError::Csv(format!("{}: row {}: {e}", path.display(), line + 2)))?;
        students.push(student);
    }
    Ok(students)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn demo_roster_spans_several_classes() {
        let students = demo_students();
        let branches: std::collections::BTreeSet<u8> = students.iter().map(|s| s.branch.get()).collect();
        assert!(branches.len() >= 3);
        assert_eq!(demo_fees().len(), students.len());
    }

    #[test]
    fn reads_roster_with_mixed_identifier_spellings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,name,roll_no,email,phone,year,branch,section").unwrap();
        writeln!(file, "1,Asha Rao,21001,asha@college.edu,9000000001,4,CSE,A").unwrap();
        writeln!(file, "2,Ravi Teja,21002,ravi@college.edu,9000000002,3rd Year,2,2").unwrap();
        file.flush().unwrap();

        let students = read_students_csv(file.path()).unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].branch.get(), 1);
        assert_eq!(students[0].section.get(), 1);
        assert_eq!(students[1].year.get(), 3);
    }

    #[test]
    fn bad_identifier_reports_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,name,roll_no,email,phone,year,branch,section").unwrap();
        writeln!(file, "1,Asha Rao,21001,asha@college.edu,9000000001,9,CSE,A").unwrap();
        file.flush().unwrap();

        let err = read_students_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }
}
