//! Composing and sending notifications.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{PortalError, Result};
use crate::filter::FilterState;
use crate::models::{NotificationDraft, NotificationKind, Priority};
use crate::source::DataSource;
use crate::target::{resolve, NotificationTarget, TargetMode};

/// Body of the create-notification call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub targets: NotificationTarget,
}

impl NotificationRequest {
    pub fn new(draft: &NotificationDraft, targets: NotificationTarget) -> Self {
        Self {
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            kind: draft.kind,
            priority: draft.priority,
            due_date: draft.due_date,
            targets,
        }
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub target: NotificationTarget,
    pub echo: serde_json::Value,
}

/// The notification form on a staff page.
///
/// The draft survives failed sends so the user can retry by hand; it is
/// only cleared once the backend has accepted the notification.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    draft: NotificationDraft,
}

impl Composer {
    pub fn new(draft: NotificationDraft) -> Self {
        Self { draft }
    }

    pub fn draft(&self) -> &NotificationDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut NotificationDraft {
        &mut self.draft
    }

    pub fn validate(&self) -> Result<()> {
        if self.draft.title.trim().is_empty() {
            return Err(PortalError::MissingField("title"));
        }
        if self.draft.description.trim().is_empty() {
            return Err(PortalError::MissingField("description"));
        }
        Ok(())
    }

    /// Resolve the audience for `mode`, then submit.
    ///
    /// Nothing is submitted when validation fails or the audience is empty.
    pub async fn send<S: DataSource>(&mut self, source: &S, filters: &FilterState, mode: TargetMode) -> Result<Sent> {
        self.validate()?;
        let target = match resolve(mode, filters, source).await {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(error = %err, "notification not sent");
                return Err(err);
            }
        };
        let request = NotificationRequest::new(&self.draft, target.clone());
        let echo = source.create_notification(&request).await.map_err(|err| match err {
            PortalError::NotificationSubmitFailure(_) => err,
            other => PortalError::NotificationSubmitFailure(other.to_string()),
        })?;
        self.draft = NotificationDraft::default();
        Ok(Sent { target, echo })
    }
}
