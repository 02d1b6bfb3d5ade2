use std::collections::BTreeMap;
use std::fmt::Write;
use std::io;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::filter::FilterState;
use crate::ids::{BranchId, SectionId, YearId};
use crate::models::{FeeRecord, FeeSummary, StudentRecord};
use crate::options::AvailableOptions;

/// Headcount for one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassCount {
    pub year: YearId,
    pub branch: BranchId,
    pub section: SectionId,
    pub students: usize,
}

/// Headcounts per class, ordered by year, branch then section.
pub fn summarize_by_class(students: &[&StudentRecord]) -> Vec<ClassCount> {
    let mut map: BTreeMap<(YearId, BranchId, SectionId), usize> = BTreeMap::new();
    for student in students {
        *map.entry((student.year, student.branch, student.section)).or_insert(0) += 1;
    }
    map.into_iter()
        .map(|((year, branch, section), students)| ClassCount {
            year,
            branch,
            section,
            students,
        })
        .collect()
}

fn join<T: ToString>(values: &[T]) -> String {
    if values.is_empty() {
        return "none".to_string();
    }
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

pub struct ReportInput<'a> {
    pub filters: &'a FilterState,
    pub options: &'a AvailableOptions,
    pub students: &'a [&'a StudentRecord],
    pub fees: &'a [FeeRecord],
    pub banner: Option<&'a str>,
    pub generated_on: NaiveDate,
}

pub fn build_report(input: &ReportInput<'_>) -> String {
    let classes = summarize_by_class(input.students);
    let mut output = String::new();

    let _ = writeln!(output, "# Class Roster Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        input.filters.label(),
        input.generated_on
    );
    if let Some(banner) = input.banner {
        let _ = writeln!(output);
        let _ = writeln!(output, "> {banner}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Available Filters");
    let years: Vec<String> = input.options.years.iter().map(|y| y.label()).collect();
    let branches: Vec<&str> = input.options.branches.iter().map(|b| b.code()).collect();
    let _ = writeln!(output, "- Years: {}", join(&years));
    let _ = writeln!(output, "- Branches: {}", join(&branches));
    for (branch, sections) in &input.options.sections_by_branch {
        let letters: Vec<char> = sections.iter().map(|s| s.letter()).collect();
        let _ = writeln!(output, "- {} sections: {}", branch.code(), join(&letters));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Breakdown");
    if classes.is_empty() {
        let _ = writeln!(output, "No students match these filters.");
    } else {
        for class in &classes {
            let _ = writeln!(
                output,
                "- {} {} Section {}: {} students",
                class.year.label(),
                class.branch.code(),
                class.section.letter(),
                class.students
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");
    if input.students.is_empty() {
        let _ = writeln!(output, "No students match these filters.");
    } else {
        for student in input.students {
            let _ = writeln!(
                output,
                "- {} ({}, {}) {} {} Section {}",
                student.name,
                student.roll_no,
                student.email,
                student.year.label(),
                student.branch.code(),
                student.section.letter()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Fee Status");
    if input.fees.is_empty() {
        let _ = writeln!(output, "No fee records for these filters.");
    } else {
        let summary = FeeSummary::from_records(input.fees);
        let _ = writeln!(
            output,
            "Expected {} / collected {} / pending {}",
            summary.expected_fee, summary.collected_fee, summary.pending_fee
        );
        let pending: Vec<&FeeRecord> = input.fees.iter().filter(|r| r.is_pending()).collect();
        if pending.is_empty() {
            let _ = writeln!(output, "All fees are paid.");
        }
        for record in pending {
            let _ = writeln!(
                output,
                "- {} ({}) owes {}",
                record.name, record.roll_no, record.remaining_amount
            );
        }
    }

    output
}

#[derive(Serialize)]
struct RosterRow<'a> {
    id: u64,
    name: &'a str,
    roll_no: &'a str,
    email: &'a str,
    phone: &'a str,
    year: u8,
    branch: &'static str,
    section: char,
}

/// Write the filtered roster as CSV. Returns the number of rows written.
pub fn write_roster_csv<W: io::Write>(writer: W, students: &[&StudentRecord]) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    for student in students {
        csv.serialize(RosterRow {
            id: student.id.0,
            name: &student.name,
            roll_no: &student.roll_no,
            email: &student.email,
            phone: &student.phone,
            year: student.year.get(),
            branch: student.branch.code(),
            section: student.section.letter(),
        })?;
    }
    csv.flush()?;
    Ok(students.len())
}
