//! Where rosters and notifications come from.
//!
//! [`RemoteDataSource`] talks to the portal's REST backend;
//! [`FixtureDataSource`] serves a fixed demo dataset. Which one a run uses
//! is a configuration decision ([`PortalSource`]), not a fallback buried in
//! each page.

use std::future::Future;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::config::{PortalConfig, SourceKind};
use crate::error::{PortalError, Result};
use crate::filter::{apply_filter_owned, FilterState};
use crate::fixture;
use crate::models::{AssignmentRecord, FeeRecord, Notification, StudentRecord};
use crate::notify::NotificationRequest;
use crate::session::{Role, Session, TokenPair};

/// Operations the roster pipeline needs from the backend.
pub trait DataSource {
    fn list_students(&self, filters: &FilterState) -> impl Future<Output = Result<Vec<StudentRecord>>> + Send;

    fn list_fee_records(&self, filters: &FilterState) -> impl Future<Output = Result<Vec<FeeRecord>>> + Send;

    fn list_assignments(&self) -> impl Future<Output = Result<Vec<AssignmentRecord>>> + Send;

    /// Returns the backend's echo of the created notification.
    fn create_notification(
        &self,
        request: &NotificationRequest,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;

    fn list_notifications(&self) -> impl Future<Output = Result<Vec<Notification>>> + Send;
}

const STUDENTS_PATH: &str = "/management/students/";
const FEES_PATH: &str = "/management/fees/details/";
const ASSIGNMENTS_PATH: &str = "/assignments/faculty/assignments/pending/";
const NOTIFICATIONS_PATH: &str = "/notifications/";
const LOGIN_PATH: &str = "/users/login/";

/// REST client for the portal backend.
#[derive(Debug, Clone)]
pub struct RemoteDataSource {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl RemoteDataSource {
    pub fn new(base_url: impl Into<String>, session: Session, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortalError::Config(format!("failed to create HTTP client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| PortalError::Config(format!("invalid API URL {base_url:?}: {e}")))?;

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Full URL for `path` with `query` appended; empty query adds nothing.
    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| PortalError::Config(format!("invalid endpoint {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(ACCEPT, HeaderValue::from_static("application/json"));
        match self.session.bearer() {
            Some(bearer) => request.header(AUTHORIZATION, bearer),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!(%url, "GET");
        let response = self.authorize(self.client.get(url.clone())).send().await?;
        let status = response.status();
        if !status.is_success() {
            let reason = error_reason(status, &response.text().await.unwrap_or_default());
            tracing::warn!(%url, %status, "request failed");
            return Err(PortalError::RosterUnavailable(reason));
        }
        response
            .json()
            .await
            .map_err(|e| PortalError::RosterUnavailable(format!("malformed response from {url}: {e}")))
    }

    /// Exchange credentials for a token pair and store it in the session.
    pub async fn login(&self, email: &str, password: &str, role: Role) -> Result<TokenPair> {
        let url = self.endpoint(LOGIN_PATH, &[])?;
        let body = serde_json::json!({ "email": email, "password": password, "role": role });
        // Login never carries a stale bearer token.
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortalError::Authentication(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let reason = error_reason(status, &response.text().await.unwrap_or_default());
            return Err(PortalError::Authentication(reason));
        }
        let tokens: TokenPair = response
            .json()
            .await
            .map_err(|e| PortalError::Authentication(format!("malformed login response: {e}")))?;
        self.session.login(tokens.clone(), None);
        Ok(tokens)
    }
}

/// Prefer the backend's `{"error": ...}` message, then the raw body.
fn error_reason(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("detail"))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {message}")
    }
}

impl DataSource for RemoteDataSource {
    async fn list_students(&self, filters: &FilterState) -> Result<Vec<StudentRecord>> {
        let url = self.endpoint(STUDENTS_PATH, &filters.to_query())?;
        let students: Vec<StudentRecord> = self.get_json(url).await?;
        tracing::info!(count = students.len(), filters = %filters.label(), "loaded students");
        Ok(students)
    }

    async fn list_fee_records(&self, filters: &FilterState) -> Result<Vec<FeeRecord>> {
        let url = self.endpoint(FEES_PATH, &filters.to_query())?;
        let records: Vec<FeeRecord> = self.get_json(url).await?;
        tracing::info!(count = records.len(), filters = %filters.label(), "loaded fee records");
        Ok(records)
    }

    async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>> {
        let url = self.endpoint(ASSIGNMENTS_PATH, &[])?;
        self.get_json(url).await
    }

    async fn create_notification(&self, request: &NotificationRequest) -> Result<serde_json::Value> {
        let url = self.endpoint(NOTIFICATIONS_PATH, &[])?;
        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await
            .map_err(|e| PortalError::NotificationSubmitFailure(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PortalError::NotificationSubmitFailure(error_reason(status, &body)));
        }
        tracing::info!(title = %request.title, audience = %request.targets.recipient_hint(), "notification created");
        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        let url = self.endpoint(NOTIFICATIONS_PATH, &[])?;
        self.get_json(url).await
    }
}

/// In-memory demo data, used when no backend is configured or reachable.
#[derive(Debug, Default)]
pub struct FixtureDataSource {
    students: Vec<StudentRecord>,
    fees: Vec<FeeRecord>,
    assignments: Vec<AssignmentRecord>,
    notifications: Mutex<Vec<Notification>>,
}

impl FixtureDataSource {
    /// The built-in demo dataset.
    pub fn demo() -> Self {
        Self::new(
            fixture::demo_students(),
            fixture::demo_fees(),
            fixture::demo_assignments(),
            fixture::demo_notifications(),
        )
    }

    pub fn new(
        students: Vec<StudentRecord>,
        fees: Vec<FeeRecord>,
        assignments: Vec<AssignmentRecord>,
        notifications: Vec<Notification>,
    ) -> Self {
        Self {
            students,
            fees,
            assignments,
            notifications: Mutex::new(notifications),
        }
    }

    /// Demo dataset with the student roster replaced by a CSV file.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let students = fixture::read_students_csv(path)?;
        tracing::info!(count = students.len(), path = %path.display(), "loaded fixture roster");
        Ok(Self {
            students,
            ..Self::demo()
        })
    }

    pub fn students(&self) -> &[StudentRecord] {
        &self.students
    }
}

impl DataSource for FixtureDataSource {
    async fn list_students(&self, filters: &FilterState) -> Result<Vec<StudentRecord>> {
        Ok(apply_filter_owned(&self.students, filters))
    }

    async fn list_fee_records(&self, filters: &FilterState) -> Result<Vec<FeeRecord>> {
        Ok(self
            .fees
            .iter()
            .filter(|r| r.in_class(filters))
            .cloned()
            .collect())
    }

    async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>> {
        Ok(self.assignments.clone())
    }

    async fn create_notification(&self, request: &NotificationRequest) -> Result<serde_json::Value> {
        let mut notifications = self
            .notifications
            .lock()
            .map_err(|_| PortalError::NotificationSubmitFailure("fixture store poisoned".to_string()))?;
        let id = notifications.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        let created = Notification {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            kind: format!("{:?}", request.kind),
            priority: format!("{:?}", request.priority),
            due_date: request.due_date,
            created_at: Some(Utc::now()),
        };
        notifications.insert(0, created.clone());
        serde_json::to_value(created).map_err(|e| PortalError::NotificationSubmitFailure(e.to_string()))
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .map_err(|_| PortalError::RosterUnavailable("fixture store poisoned".to_string()))
    }
}

/// The data source a run is configured with.
#[derive(Debug)]
pub enum PortalSource {
    Remote(RemoteDataSource),
    Fixture(FixtureDataSource),
}

impl PortalSource {
    pub fn from_config(config: &PortalConfig, session: Session) -> Result<Self> {
        match config.source {
            SourceKind::Remote => Ok(Self::Remote(RemoteDataSource::new(
                config.api_base_url.clone(),
                session,
                config.request_timeout,
            )?)),
            SourceKind::Fixture => match &config.fixture_path {
                Some(path) => Ok(Self::Fixture(FixtureDataSource::from_csv(path)?)),
                None => Ok(Self::Fixture(FixtureDataSource::demo())),
            },
        }
    }

    pub fn is_fixture(&self) -> bool {
        matches!(self, Self::Fixture(_))
    }
}

impl DataSource for PortalSource {
    async fn list_students(&self, filters: &FilterState) -> Result<Vec<StudentRecord>> {
        match self {
            Self::Remote(s) => s.list_students(filters).await,
            Self::Fixture(s) => s.list_students(filters).await,
        }
    }

    async fn list_fee_records(&self, filters: &FilterState) -> Result<Vec<FeeRecord>> {
        match self {
            Self::Remote(s) => s.list_fee_records(filters).await,
            Self::Fixture(s) => s.list_fee_records(filters).await,
        }
    }

    async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>> {
        match self {
            Self::Remote(s) => s.list_assignments().await,
            Self::Fixture(s) => s.list_assignments().await,
        }
    }

    async fn create_notification(&self, request: &NotificationRequest) -> Result<serde_json::Value> {
        match self {
            Self::Remote(s) => s.create_notification(request).await,
            Self::Fixture(s) => s.create_notification(request).await,
        }
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        match self {
            Self::Remote(s) => s.list_notifications().await,
            Self::Fixture(s) => s.list_notifications().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BranchId, Choice, SectionId, YearId};

    fn remote() -> RemoteDataSource {
        RemoteDataSource::new("http://localhost:8000/api/", Session::new(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn roster_query_uses_numeral_keys() {
        let filters = FilterState::new(
            Choice::Only(YearId::new(4).unwrap()),
            Choice::Only(BranchId::new(1).unwrap()),
            Choice::Only(SectionId::new(2).unwrap()),
        );
        let url = remote().endpoint(STUDENTS_PATH, &filters.to_query()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/management/students/?year=4&branch=1&section=2"
        );
    }

    #[test]
    fn unrestricted_query_has_no_parameters() {
        let url = remote().endpoint(STUDENTS_PATH, &FilterState::default().to_query()).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = RemoteDataSource::new("not a url", Session::new(), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PortalError::Config(_)));
    }

    #[test]
    fn error_reason_prefers_backend_message() {
        let reason = error_reason(StatusCode::BAD_REQUEST, r#"{"error": "Invalid year filter: 9"}"#);
        assert_eq!(reason, "HTTP 400 Bad Request: Invalid year filter: 9");
        assert_eq!(error_reason(StatusCode::BAD_GATEWAY, ""), "HTTP 502 Bad Gateway");
    }

    #[tokio::test]
    async fn fixture_filters_like_the_backend() {
        let source = FixtureDataSource::demo();
        let filters = FilterState::new(Choice::All, Choice::All, Choice::Only(SectionId::new(2).unwrap()));
        let students = source.list_students(&filters).await.unwrap();
        assert!(!students.is_empty());
        assert!(students.iter().all(|s| s.section.get() == 2));
    }
}
