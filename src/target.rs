//! Notification audience resolution.

use serde::{Serialize, Serializer};

use crate::error::{PortalError, Result};
use crate::filter::FilterState;
use crate::models::{FeeRecord, StudentId};
use crate::source::DataSource;

/// How the user chose to address a notification. Exactly one per send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    /// Every student.
    Broadcast,
    /// The class picked in the cascading filter.
    Class,
    /// One student, usually the focused record.
    Individual(StudentId),
    /// Students in the filtered class whose fees are still pending.
    FeePending,
}

/// One class selected by year/branch/section; `None` covers every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSelector {
    pub year: Option<u8>,
    pub branch: Option<u8>,
    pub section: Option<u8>,
}

impl From<&FilterState> for ClassSelector {
    fn from(filters: &FilterState) -> Self {
        Self {
            year: filters.year.value().map(|y| y.get()),
            branch: filters.branch.value().map(|b| b.get()),
            section: filters.section.value().map(|s| s.get()),
        }
    }
}

/// Resolved audience handed to the notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    Everyone,
    Classes(Vec<ClassSelector>),
    Students(Vec<StudentId>),
}

/// Wire shape of one audience entry; `0` is the backend's "every value".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct WireSelector {
    year_id: u8,
    branch_id: u8,
    section_id: u8,
    student_id: u64,
}

impl NotificationTarget {
    fn wire(&self) -> Vec<WireSelector> {
        let broadcast = WireSelector {
            year_id: 0,
            branch_id: 0,
            section_id: 0,
            student_id: 0,
        };
        match self {
            Self::Everyone => vec![broadcast],
            Self::Classes(classes) => classes
                .iter()
                .map(|c| WireSelector {
                    year_id: c.year.unwrap_or(0),
                    branch_id: c.branch.unwrap_or(0),
                    section_id: c.section.unwrap_or(0),
                    ..broadcast
                })
                .collect(),
            Self::Students(ids) => ids
                .iter()
                .map(|id| WireSelector {
                    student_id: id.0,
                    ..broadcast
                })
                .collect(),
        }
    }

    pub fn recipient_hint(&self) -> String {
        match self {
            Self::Everyone => "all students".to_string(),
            Self::Classes(classes) => format!("{} class selector(s)", classes.len()),
            Self::Students(ids) => format!("{} student(s)", ids.len()),
        }
    }
}

impl Serialize for NotificationTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.wire().serialize(serializer)
    }
}

/// Class audience for the current selection.
pub fn class_target(filters: &FilterState) -> NotificationTarget {
    if filters.is_unrestricted() {
        NotificationTarget::Everyone
    } else {
        NotificationTarget::Classes(vec![ClassSelector::from(filters)])
    }
}

/// Students with pending fees among `records`, restricted to the class.
///
/// Records that do not echo their class are trusted to have been filtered
/// server-side.
pub fn pending_fee_target(records: &[FeeRecord], filters: &FilterState) -> Result<NotificationTarget> {
    let mut ids: Vec<StudentId> = Vec::new();
    for record in records.iter().filter(|r| r.is_pending()) {
        if record.in_class(filters) && !ids.contains(&record.student_id) {
            ids.push(record.student_id);
        }
    }

    if ids.is_empty() {
        return Err(PortalError::NoMatchingRecipients {
            condition: format!("pending fees in {}", filters.label()),
        });
    }
    Ok(NotificationTarget::Students(ids))
}

/// Resolve `mode` to an audience, fetching fee records when it needs them.
pub async fn resolve<S: DataSource>(
    mode: TargetMode,
    filters: &FilterState,
    source: &S,
) -> Result<NotificationTarget> {
    let target = match mode {
        TargetMode::Broadcast => NotificationTarget::Everyone,
        TargetMode::Class => class_target(filters),
        TargetMode::Individual(student) => NotificationTarget::Students(vec![student]),
        TargetMode::FeePending => {
            let records = source.list_fee_records(filters).await?;
            pending_fee_target(&records, filters)?
        }
    };
    tracing::debug!(?mode, audience = %target.recipient_hint(), "resolved notification target");
    Ok(target)
}
