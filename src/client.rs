//! HTTP client for the school API

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use campusdesk_core::academic::{AcademicYear, Semester};
use campusdesk_core::analytics::{AnalyticsFilters, AnalyticsReport};
use campusdesk_core::attendance::{StatusUpdate, StudentAttendance, StudentDetails};
use campusdesk_core::config::CampusConfig;
use campusdesk_core::date_range::DateRange;
use campusdesk_core::event::{AcademicEvent, EventPayload, EventStatus};
use campusdesk_core::filter::{StudentFilter, StudentSort};
use campusdesk_core::paginate::{Page, PageRequest, ServerPage};
use campusdesk_core::trends::TrendRow;

/// Why a request failed, split the way the user needs to hear about it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Could not reach the server: {0}")]
    Network(String),

    #[error("The server did not answer within {0}s")]
    Timeout(u64),

    #[error("You do not have permission to do that{}", detail(.0))]
    Forbidden(String),

    #[error("Not found{}", detail(.0))]
    NotFound(String),

    #[error("The server had a problem (HTTP {status}){}", detail(.message))]
    Server { status: u16, message: String },

    #[error("Request failed (HTTP {status}){}", detail(.message))]
    Status { status: u16, message: String },

    #[error("Unexpected response from the server: {0}")]
    Decode(String),

    #[error("{0}")]
    Rejected(String),
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

impl ApiError {
    fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                message,
            },
            s => ApiError::Status {
                status: s.as_u16(),
                message,
            },
        }
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout.as_secs())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Error body shapes the API uses.
#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn text(self) -> String {
        self.error.or(self.message).unwrap_or_default()
    }
}

/// Hands out tickets so that only the most recently started fetch is
/// allowed to publish its result.
#[derive(Debug, Default, Clone)]
pub struct LatestOnly {
    generation: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl LatestOnly {
    pub fn begin(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }
}

/// HTTP client for the school API
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    user_role: String,
    request_timeout: Duration,
    analytics_timeout: Duration,
    analytics_latest: LatestOnly,
}

impl Client {
    pub fn new(config: &CampusConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("campusdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            user_id: config.user_id.clone(),
            user_role: config.user_role.clone(),
            request_timeout: config.request_timeout()?,
            analytics_timeout: config.analytics_timeout()?,
            analytics_latest: LatestOnly::default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, timeout: Duration) -> (RequestBuilder, String) {
        let request_id = uuid::Uuid::new_v4().to_string();
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(timeout)
            .header("x-user-id", &self.user_id)
            .header("x-user-role", &self.user_role)
            .header("x-request-id", &request_id);
        (builder, request_id)
    }

    /// Send and return the raw successful response.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        timeout: Duration,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let (builder, request_id) = self.request(method.clone(), path, timeout);
        debug!(%method, path, %request_id, "sending request");

        let resp = build(builder).send().await.map_err(|e| {
            let err = ApiError::from_reqwest(e, timeout);
            warn!(%method, path, %request_id, error = %err, "request failed");
            err
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(ErrorBody::text)
                .unwrap_or_default();
            let err = ApiError::from_status(status, message);
            warn!(%method, path, %request_id, status = status.as_u16(), error = %err, "request rejected");
            return Err(err);
        }

        debug!(%method, path, %request_id, status = status.as_u16(), "response received");
        Ok(resp)
    }

    /// Send and decode JSON, unwrapping the `{ success, data }` envelope when
    /// the API uses one.
    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        timeout: Duration,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<T, ApiError> {
        let value = self.send_value(method, path, timeout, build).await?;
        decode(unwrap_data(value))
    }

    async fn send_value(
        &self,
        method: Method,
        path: &str,
        timeout: Duration,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Value, ApiError> {
        let resp = self.execute(method, path, timeout, build).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;
        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?
        };
        check_business_error(&value)?;
        Ok(value)
    }

    async fn send_empty(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<(), ApiError> {
        self.send_value(method, path, self.request_timeout, build)
            .await
            .map(|_| ())
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// GET /api/events
    pub async fn list_events(&self, range: &DateRange) -> Result<Vec<AcademicEvent>, ApiError> {
        let query = range.query_pairs();
        self.send_json(Method::GET, "/api/events", self.request_timeout, |r| r.query(&query))
            .await
    }

    /// POST /api/events
    pub async fn create_event(&self, payload: &EventPayload) -> Result<AcademicEvent, ApiError> {
        self.send_json(Method::POST, "/api/events", self.request_timeout, |r| r.json(payload))
            .await
    }

    /// PUT /api/events/:id
    pub async fn update_event(&self, id: i64, payload: &EventPayload) -> Result<AcademicEvent, ApiError> {
        let path = format!("/api/events/{id}");
        self.send_value(Method::PUT, &path, self.request_timeout, |r| r.json(payload))
            .await
            .and_then(|value| decode_or_echo(value, id, payload))
    }

    /// PUT /api/events/:id with only the status changed.
    pub async fn set_event_status(&self, event: &AcademicEvent, status: EventStatus) -> Result<AcademicEvent, ApiError> {
        let mut draft = event.to_draft();
        draft.status = status;
        let payload = draft
            .into_payload()
            .map_err(|e| ApiError::Rejected(format!("event {} cannot be saved: {e}", event.id)))?;
        self.update_event(event.id, &payload).await
    }

    /// DELETE /api/events/:id
    pub async fn delete_event(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/api/events/{id}"), |r| r)
            .await
    }

    /// GET /api/academic-years
    pub async fn list_academic_years(&self) -> Result<Vec<AcademicYear>, ApiError> {
        self.send_json(Method::GET, "/api/academic-years", self.request_timeout, |r| r)
            .await
    }

    /// GET /api/semesters, optionally for one academic year.
    pub async fn list_semesters(&self, academic_year_id: Option<i64>) -> Result<Vec<Semester>, ApiError> {
        let query: Vec<(&str, String)> = academic_year_id
            .map(|id| vec![("academicYearId", id.to_string())])
            .unwrap_or_default();
        self.send_json(Method::GET, "/api/semesters", self.request_timeout, |r| r.query(&query))
            .await
    }

    // ========================================================================
    // Attendance
    // ========================================================================

    /// GET /api/analytics/trends
    pub async fn trends(&self, class_code: Option<&str>, range: &DateRange) -> Result<Vec<TrendRow>, ApiError> {
        let mut query = range.query_pairs();
        if let Some(code) = class_code {
            query.push(("classCode", code.to_string()));
        }
        self.send_json(Method::GET, "/api/analytics/trends", self.request_timeout, |r| r.query(&query))
            .await
    }

    /// GET /api/attendance/students (server-paginated)
    pub async fn list_students(
        &self,
        filter: &StudentFilter,
        sort: &StudentSort,
        page: PageRequest,
    ) -> Result<Page<StudentAttendance>, ApiError> {
        let mut query = page.query_pairs();
        query.extend(filter.query_pairs());
        query.extend(sort.query_pairs());

        let value = self
            .send_value(Method::GET, "/api/attendance/students", self.request_timeout, |r| r.query(&query))
            .await?;
        let server_page: ServerPage<StudentAttendance> = decode(page_body(value))?;
        Ok(server_page.into_page(page))
    }

    /// GET /api/students/:id/details
    pub async fn student_details(&self, id: i64) -> Result<StudentDetails, ApiError> {
        let path = format!("/api/students/{id}/details");
        self.send_json(Method::GET, &path, self.request_timeout, |r| r)
            .await
    }

    /// PATCH /api/students/:id/status
    pub async fn update_student_status(&self, id: i64, update: &StatusUpdate) -> Result<(), ApiError> {
        self.send_empty(Method::PATCH, &format!("/api/students/{id}/status"), |r| r.json(update))
            .await
    }

    /// PATCH /api/students/:id/soft-delete
    pub async fn archive_student(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(Method::PATCH, &format!("/api/students/{id}/soft-delete"), |r| r)
            .await
    }

    /// GET /api/attendance/analytics. Returns `None` when a newer analytics
    /// fetch started while this one was in flight.
    pub async fn analytics(
        &self,
        filters: &AnalyticsFilters,
        range: &DateRange,
    ) -> Result<Option<AnalyticsReport>, ApiError> {
        let ticket = self.analytics_latest.begin();
        let mut query = filters.query_pairs();
        query.extend(range.query_pairs());

        let report: AnalyticsReport = self
            .send_json(Method::GET, "/api/attendance/analytics", self.analytics_timeout, |r| r.query(&query))
            .await?;

        if !self.analytics_latest.is_current(ticket) {
            debug!("discarding stale analytics response");
            return Ok(None);
        }
        Ok(Some(report))
    }

    /// GET /api/attendance/export: spreadsheet/PDF rendered by the export service.
    pub async fn export_attendance(&self, format: &str, filter: &StudentFilter) -> Result<Vec<u8>, ApiError> {
        let mut query = filter.query_pairs();
        query.push(("format", format.to_string()));
        let timeout = self.request_timeout;
        let resp = self
            .execute(Method::GET, "/api/attendance/export", timeout, |r| r.query(&query))
            .await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;
        Ok(bytes.to_vec())
    }
}

/// A 2xx body can still carry `{ "success": false, "error": ... }`.
fn check_business_error(value: &Value) -> Result<(), ApiError> {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("the server rejected the request")
            .to_string();
        return Err(ApiError::Rejected(message));
    }
    Ok(())
}

fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

/// Page listings keep `total` next to `data`, so only unwrap when `data`
/// itself is the page object.
fn page_body(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Some update endpoints answer with only `{ success: true }`; echo the
/// request back as the updated event in that case.
fn decode_or_echo(value: Value, id: i64, payload: &EventPayload) -> Result<AcademicEvent, ApiError> {
    let data = unwrap_data(value);
    if data.get("id").is_some() {
        return decode(data);
    }

    #[derive(Serialize)]
    struct Echo<'a> {
        id: i64,
        #[serde(flatten)]
        payload: &'a EventPayload,
    }
    decode(serde_json::to_value(Echo { id, payload }).map_err(|e| ApiError::Decode(e.to_string()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> CampusConfig {
        CampusConfig {
            api_url: server.uri(),
            ..Default::default()
        }
    }

    fn event_json(id: i64, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "startDate": "2024-01-02T09:00:00",
            "endDate": "2024-01-02T10:00:00",
            "category": "academic",
            "priority": "medium",
            "status": "draft"
        })
    }

    #[tokio::test]
    async fn list_events_accepts_bare_array_and_sends_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("from", "2024-01-01"))
            .and(header("x-user-role", "admin"))
            .and(header_exists("x-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([event_json(1, "Opening")])))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(&config_for(&server)).unwrap();
        let range = DateRange::from_args(Some("2024-01-01"), None).unwrap();
        let events = client.list_events(&range).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Opening");
    }

    #[tokio::test]
    async fn list_events_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [event_json(1, "A"), event_json(2, "B")]
            })))
            .mount(&server)
            .await;

        let client = Client::new(&config_for(&server)).unwrap();
        let events = client.list_events(&DateRange::default()).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn business_error_in_ok_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": "Event overlaps a holiday"
            })))
            .mount(&server)
            .await;

        let client = Client::new(&config_for(&server)).unwrap();
        let payload = campusdesk_core::event::EventDraft {
            title: "Exam".into(),
            start: campusdesk_core::timestamp::parse_timestamp("2024-01-02T09:00:00"),
            ..Default::default()
        }
        .into_payload()
        .unwrap();
        let err = client.create_event(&payload).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "Event overlaps a holiday"));
    }

    #[tokio::test]
    async fn status_codes_map_to_categories() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/events/1"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "admins only"})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/events/2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/events/3"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
            .mount(&server)
            .await;

        let client = Client::new(&config_for(&server)).unwrap();

        let err = client.delete_event(1).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(err.to_string(), "You do not have permission to do that: admins only");

        let err = client.delete_event(2).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found");

        let err = client.delete_event(3).await.unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 500, .. }));
    }

    #[tokio::test]
    async fn timeout_is_reported_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/academic-years"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = CampusConfig {
            request_timeout: "1s".into(),
            ..config_for(&server)
        };
        let client = Client::new(&config).unwrap();
        let err = client.list_academic_years().await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(1)));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let config = CampusConfig {
            api_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        };
        let client = Client::new(&config).unwrap();
        let err = client.list_semesters(None).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/analytics/trends"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = Client::new(&config_for(&server)).unwrap();
        let err = client.trends(None, &DateRange::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn student_page_trusts_server_total() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/students"))
            .and(query_param("page", "2"))
            .and(query_param("pageSize", "1"))
            .and(query_param("sortBy", "attendanceRate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"studentId": 5, "firstName": "Ana", "lastName": "Reyes", "attendanceRate": 71.0}],
                "total": 40
            })))
            .mount(&server)
            .await;

        let client = Client::new(&config_for(&server)).unwrap();
        let sort = StudentSort {
            field: campusdesk_core::filter::StudentSortField::AttendanceRate,
            ..Default::default()
        };
        let page = client
            .list_students(&StudentFilter::default(), &sort, PageRequest::new(2, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 40);
        assert_eq!(page.items[0].student_id, 5);
        assert_eq!(page.total_pages(), 40);
    }

    #[tokio::test]
    async fn update_without_body_echoes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/events/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let client = Client::new(&config_for(&server)).unwrap();
        let event: AcademicEvent = serde_json::from_value(event_json(9, "Recital")).unwrap();
        let updated = client.set_event_status(&event, EventStatus::Published).await.unwrap();
        assert_eq!(updated.id, 9);
        assert_eq!(updated.status, EventStatus::Published);
    }

    #[tokio::test]
    async fn stale_analytics_response_is_discarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/analytics"))
            .and(query_param("department", "Slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/analytics"))
            .and(query_param("department", "Fast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"summary": {"totalStudents": 3}})))
            .mount(&server)
            .await;

        let client = Client::new(&config_for(&server)).unwrap();
        let slow_filters = AnalyticsFilters {
            department: Some("Slow".into()),
            ..Default::default()
        };
        let fast_filters = AnalyticsFilters {
            department: Some("Fast".into()),
            ..Default::default()
        };

        let slow_client = client.clone();
        let slow = tokio::spawn(async move { slow_client.analytics(&slow_filters, &DateRange::default()).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let fast = client.analytics(&fast_filters, &DateRange::default()).await.unwrap();

        assert_eq!(fast.unwrap().summary.total_students, 3);
        assert!(slow.await.unwrap().unwrap().is_none());
    }

    #[test]
    fn latest_only_tracks_newest_ticket() {
        let latest = LatestOnly::default();
        let first = latest.begin();
        assert!(latest.is_current(first));
        let second = latest.begin();
        assert!(!latest.is_current(first));
        assert!(latest.is_current(second));
    }
}
