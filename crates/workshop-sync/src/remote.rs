//! Boundary with the remote workshop service.
//!
//! The remote service owns persistence and business logic. This module holds
//! the wire types it speaks, the [`RemoteService`] seam the sync and capture
//! layers depend on, and [`ApiClient`], the HTTP implementation.
//!
//! Every request carries an explicit timeout: the query timeout for lookups
//! and commands, the longer export timeout for spreadsheet downloads. A timed
//! out request is aborted and reported as [`Error::Timeout`].

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::record::{Collection, Equipment, Fields, Record};

/// Filename used when neither the response nor the request names the export.
const FALLBACK_EXPORT_NAME: &str = "report.xlsx";

static DISPOSITION_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)filename\*?=(?:UTF-8'')?([^;]+)").expect("valid disposition pattern")
});

/// What a batch item carries.
///
/// A full drain sends stored records with their local `_id` and `createdAt`.
/// An immediate sync sends only the submitted form values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// A record read back from the local store.
    Stored(Record),
    /// Bare form values.
    Form(Fields),
}

impl Payload {
    /// Look up a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        match self {
            Self::Stored(record) => record.get(field),
            Self::Form(fields) => fields.get(field).map(String::as_str),
        }
    }
}

/// One queued record on its way to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Collection the record came from.
    pub store: Collection,
    /// The record's values.
    pub payload: Payload,
}

/// The ordered set of records submitted in one sync request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBatch {
    /// Records tagged with their originating collection.
    pub items: Vec<BatchItem>,
    /// Key the caller is about to look up, sent with immediate syncs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_key: Option<String>,
}

impl SyncBatch {
    /// Build a one-record batch for immediate sync from the submitted values.
    #[must_use]
    pub fn single(collection: Collection, fields: Fields, return_key: Option<String>) -> Self {
        Self {
            items: vec![BatchItem {
                store: collection,
                payload: Payload::Form(fields),
            }],
            return_key,
        }
    }

    /// Append a stored record.
    pub fn push(&mut self, collection: Collection, record: Record) {
        self.items.push(BatchItem {
            store: collection,
            payload: Payload::Stored(record),
        });
    }

    /// Number of records in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the batch has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The remote service's acknowledgement of a batch upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAck {
    /// Whether the service accepted the batch.
    pub ok: bool,
    /// How many records the service reports as saved.
    #[serde(default)]
    pub saved: u64,
}

/// Records matching a key, grouped by event kind (`supply`, `issue`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Engine events by kind.
    #[serde(default)]
    pub engines: BTreeMap<String, Vec<serde_json::Value>>,
    /// Generator events by kind.
    #[serde(default)]
    pub generators: BTreeMap<String, Vec<serde_json::Value>>,
}

impl SearchResults {
    /// Total number of matching events.
    #[must_use]
    pub fn total(&self) -> usize {
        self.engines
            .values()
            .chain(self.generators.values())
            .map(Vec::len)
            .sum()
    }

    /// Check if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// The remote service's answer to a batch upload.
///
/// A batch carrying a `returnKey` is answered with the search results for
/// that key instead of an acknowledgement. A successful response of either
/// shape means the batch was stored. Any other body fails to decode, so an
/// unrecognised answer is never taken as delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchReply {
    /// `{ok, saved}`.
    Ack(SyncAck),
    /// `{engines, generators}` for the batch's return key.
    Search(SearchResults),
}

impl<'de> Deserialize<'de> for BatchReply {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let is_ack = value.get("ok").is_some();
        let is_search = value.get("engines").is_some() || value.get("generators").is_some();
        if is_ack {
            SyncAck::deserialize(value).map(Self::Ack).map_err(de::Error::custom)
        } else if is_search {
            SearchResults::deserialize(value)
                .map(Self::Search)
                .map_err(de::Error::custom)
        } else {
            Err(de::Error::custom(
                "expected an acknowledgement or search results",
            ))
        }
    }
}

impl BatchReply {
    /// Check if the service stored the batch.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        match self {
            Self::Ack(ack) => ack.ok,
            Self::Search(_) => true,
        }
    }

    /// The saved count, when the service reported one.
    #[must_use]
    pub fn saved(&self) -> Option<u64> {
        match self {
            Self::Ack(ack) => Some(ack.saved),
            Self::Search(_) => None,
        }
    }

    /// Search results returned in place of an acknowledgement.
    #[must_use]
    pub fn search(&self) -> Option<&SearchResults> {
        match self {
            Self::Ack(_) => None,
            Self::Search(results) => Some(results),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RecentItems {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct CommandAck {
    #[serde(default)]
    ok: bool,
}

/// Which records a report covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    /// Engine records only.
    #[default]
    Engines,
    /// Generator records only.
    Generators,
    /// Engines and generators.
    Both,
}

impl ExportScope {
    fn file_label(self) -> &'static str {
        match self {
            Self::Engines => "engines",
            Self::Generators => "generators",
            Self::Both => "engines-and-generators",
        }
    }
}

/// Body of a spreadsheet export request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    /// Requested download name.
    pub filename: String,
    /// Records to include.
    pub scope: ExportScope,
    /// Inclusive lower date bound.
    pub date_from: Option<String>,
    /// Inclusive upper date bound.
    pub date_to: Option<String>,
}

impl ExportRequest {
    /// Build a request with a suggested filename dated today.
    #[must_use]
    pub fn new(scope: ExportScope, date_from: Option<String>, date_to: Option<String>) -> Self {
        let filename = suggested_filename(
            scope,
            date_from.as_deref(),
            date_to.as_deref(),
            Utc::now().date_naive(),
        );
        Self {
            filename,
            scope,
            date_from,
            date_to,
        }
    }
}

/// A downloaded report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Name to save the file under.
    pub filename: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Suggest a report filename from its scope and date range.
///
/// An open bound is written as `-`; the range is omitted when both are open.
#[must_use]
pub fn suggested_filename(
    scope: ExportScope,
    date_from: Option<&str>,
    date_to: Option<&str>,
    today: NaiveDate,
) -> String {
    let from = date_from.filter(|d| !d.is_empty());
    let to = date_to.filter(|d| !d.is_empty());
    let range = if from.is_some() || to.is_some() {
        format!(
            "_from-{}_to-{}",
            from.unwrap_or("-"),
            to.unwrap_or("-")
        )
    } else {
        String::new()
    };
    format!(
        "report_{}{range}_{}.xlsx",
        scope.file_label(),
        today.format("%Y-%m-%d")
    )
}

/// Extract the filename from a `Content-Disposition` header value.
///
/// Handles plain, quoted, and RFC 5987 `filename*=UTF-8''...` forms. A value
/// that fails to percent-decode is returned as-is.
#[must_use]
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = DISPOSITION_FILENAME
        .captures(header)?.get(1)?.as_str().trim();
    let unquoted = raw.trim_matches('"');
    if unquoted.is_empty() {
        return None;
    }

    let name = percent_decode_str(unquoted)
        .decode_utf8()
        .map_or_else(|_| unquoted.to_string(), |decoded| decoded.into_owned());
    Some(name)
}

/// The remote operations the sync and capture layers rely on.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Upload a batch of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, times out, or gets a non-success status.
    async fn submit_batch(&self, batch: &SyncBatch) -> Result<BatchReply>;

    /// Look up every event recorded for a serial number or generator code.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is blank or the request fails.
    async fn search(&self, key: &str) -> Result<SearchResults>;
}

/// HTTP client for the remote workshop service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    query_timeout: Duration,
    export_timeout: Duration,
}

impl ApiClient {
    /// Create a client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(api_base: &str, settings: &RemoteConfig) -> Result<Self> {
        let base = Url::parse(api_base.trim())?;
        if base.cannot_be_a_base() {
            return Err(Error::ConfigValidation {
                message: format!("api_base cannot be used as a base URL: {api_base}"),
            });
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("wsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::transport("client setup", e))?;

        Ok(Self {
            base,
            http,
            query_timeout: settings.query_timeout(),
            export_timeout: settings.export_timeout(),
        })
    }

    /// Build an endpoint URL, percent-encoding each segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot take path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::internal(format!("cannot extend base URL {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Probe connectivity. Any failure counts as offline.
    pub async fn health(&self) -> bool {
        let Ok(url) = self.endpoint(&["health"]) else {
            return false;
        };
        match self
            .http
            .get(url)
            .timeout(self.query_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("Health probe failed: {}", err);
                false
            }
        }
    }

    /// Fetch the most recently supplied items of one equipment kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn last3(&self, equipment: Equipment) -> Result<Vec<serde_json::Value>> {
        let url = self.endpoint(&["last3", equipment.path_segment()])?;
        let recent: RecentItems = self.get_json("recent records", url).await?;
        Ok(recent.items)
    }

    /// Download a spreadsheet report.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or times out.
    pub async fn export_xlsx(&self, request: &ExportRequest) -> Result<ExportFile> {
        let url = self.endpoint(&["export", "xlsx"])?;
        let response = self
            .http
            .post(url)
            .json(request)
            .timeout(self.export_timeout)
            .send()
            .await
            .map_err(|e| Error::transport("export", e))?;
        let response = check_status(response).await?;

        let disposition_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition);
        let filename = disposition_name
            .or_else(|| Some(request.filename.clone()).filter(|n| !n.is_empty()))
            .unwrap_or_else(|| FALLBACK_EXPORT_NAME.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport("export", e))?
            .to_vec();
        debug!("Downloaded export {} ({} bytes)", filename, bytes.len());
        Ok(ExportFile { filename, bytes })
    }

    /// Ask the service to repair its schema.
    ///
    /// Returns the service's `ok` flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or gets a non-success status.
    pub async fn repair(&self) -> Result<bool> {
        let url = self.endpoint(&["admin", "repair"])?;
        debug!("POST {}", url);
        let ack: CommandAck = self.send_json("repair", self.http.post(url)).await?;
        Ok(ack.ok)
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, url: Url) -> Result<T> {
        debug!("GET {}", url);
        self.send_json(operation, self.http.get(url)).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request
            .timeout(self.query_timeout)
            .send()
            .await
            .map_err(|e| Error::transport(operation, e))?;
        decode_json(operation, response).await
    }
}

#[async_trait]
impl RemoteService for ApiClient {
    async fn submit_batch(&self, batch: &SyncBatch) -> Result<BatchReply> {
        let url = self.endpoint(&["sync", "batch"])?;
        debug!("POST {} ({} record(s))", url, batch.len());
        let reply: BatchReply = self
            .send_json("sync batch", self.http.post(url).json(batch))
            .await?;
        if !reply.is_delivered() {
            warn!("Remote service rejected a batch of {} record(s)", batch.len());
        }
        Ok(reply)
    }

    async fn search(&self, key: &str) -> Result<SearchResults> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::EmptySearchKey);
        }
        let url = self.endpoint(&["search", key])?;
        self.get_json("search", url).await
    }
}

/// Turn a non-success response into [`Error::Remote`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Remote {
        status: status.as_u16(),
        body: describe_body(status, &body),
    })
}

async fn decode_json<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
    let response = check_status(response).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::transport(operation, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn describe_body(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, &RemoteConfig::default()).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = client("http://127.0.0.1:9000/api");
        assert_eq!(
            api.endpoint(&["sync", "batch"]).unwrap().as_str(),
            "http://127.0.0.1:9000/api/sync/batch"
        );
    }

    #[test]
    fn test_endpoint_with_trailing_slash() {
        let api = client("https://workshop.example.com/api/");
        assert_eq!(
            api.endpoint(&["health"]).unwrap().as_str(),
            "https://workshop.example.com/api/health"
        );
    }

    #[test]
    fn test_endpoint_encodes_search_key() {
        let api = client("http://127.0.0.1:9000/api");
        let url = api.endpoint(&["search", "G 100/A"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/search/G%20100%2FA");
    }

    #[test]
    fn test_new_rejects_relative_base() {
        let err = ApiClient::new("/api", &RemoteConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_new_rejects_non_base_url() {
        let err = ApiClient::new("mailto:ops@example.com", &RemoteConfig::default()).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    fn form(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_batch_wire_shape() {
        let batch = SyncBatch::single(
            Collection::GenSupply,
            form(&[("code", "G-100")]),
            Some("G-100".to_string()),
        );

        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["items"][0]["store"], "gen_supply");
        assert_eq!(value["items"][0]["payload"]["code"], "G-100");
        assert_eq!(value["returnKey"], "G-100");
    }

    #[test]
    fn test_immediate_payload_is_form_values_only() {
        let batch = SyncBatch::single(Collection::EngSupply, form(&[("serial", "111")]), None);
        let value = serde_json::to_value(&batch).unwrap();
        let payload = value["items"][0]["payload"].as_object().unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload["serial"], "111");
    }

    #[test]
    fn test_drained_payload_keeps_local_identity() {
        let mut record = Record::new(form(&[("serial", "111")]));
        record.id = Some(7);
        let mut batch = SyncBatch::default();
        batch.push(Collection::EngIssue, record);

        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["items"][0]["payload"]["_id"], 7);
        assert!(value["items"][0]["payload"]["createdAt"].is_i64());

        let decoded: SyncBatch = serde_json::from_value(value).unwrap();
        assert!(matches!(decoded.items[0].payload, Payload::Stored(_)));
        assert_eq!(decoded.items[0].payload.get("serial"), Some("111"));
    }

    #[test]
    fn test_batch_omits_absent_return_key() {
        let batch = SyncBatch::default();
        let value = serde_json::to_value(&batch).unwrap();
        assert!(value.get("returnKey").is_none());
        assert!(batch.is_empty());
    }

    #[test]
    fn test_sync_ack_defaults() {
        let ack: SyncAck = serde_json::from_str(r#"{"ok": true, "saved": 3}"#).unwrap();
        assert_eq!(ack, SyncAck { ok: true, saved: 3 });

        let ack: SyncAck = serde_json::from_str(r#"{"ok": false}"#).unwrap();
        assert_eq!(ack.saved, 0);
        assert!(serde_json::from_str::<SyncAck>("{}").is_err());
    }

    #[test]
    fn test_batch_reply_ack_shape() {
        let reply: BatchReply = serde_json::from_str(r#"{"ok": true, "saved": 2}"#).unwrap();
        assert_eq!(reply, BatchReply::Ack(SyncAck { ok: true, saved: 2 }));
        assert!(reply.is_delivered());
        assert_eq!(reply.saved(), Some(2));
        assert!(reply.search().is_none());

        let reply: BatchReply = serde_json::from_str(r#"{"ok": false, "saved": 0}"#).unwrap();
        assert!(!reply.is_delivered());
    }

    #[test]
    fn test_batch_reply_search_shape_counts_as_delivered() {
        let json = r#"{"engines": {}, "generators": {"supply": [{"code": "G-100"}]}}"#;
        let reply: BatchReply = serde_json::from_str(json).unwrap();

        assert!(reply.is_delivered());
        assert_eq!(reply.saved(), None);
        let results = reply.search().unwrap();
        assert_eq!(results.total(), 1);
        assert_eq!(results.generators["supply"][0]["code"], "G-100");
    }

    #[test]
    fn test_batch_reply_rejects_unknown_shape() {
        assert!(serde_json::from_str::<BatchReply>("{}").is_err());
        assert!(serde_json::from_str::<BatchReply>(r#"{"detail": "x"}"#).is_err());
    }

    #[test]
    fn test_search_results_total() {
        let json = r#"{
            "engines": {"supply": [{"serial": "111"}], "issue": [{"serial": "111"}, {"serial": "111"}]},
            "generators": {"supply": []}
        }"#;
        let results: SearchResults = serde_json::from_str(json).unwrap();
        assert_eq!(results.total(), 3);
        assert!(!results.is_empty());
        assert!(SearchResults::default().is_empty());
    }

    #[test]
    fn test_export_request_wire_shape() {
        let request = ExportRequest {
            filename: "r.xlsx".to_string(),
            scope: ExportScope::Both,
            date_from: Some("2025-10-01".to_string()),
            date_to: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["scope"], "both");
        assert_eq!(value["date_from"], "2025-10-01");
        assert!(value["date_to"].is_null());
    }

    #[test]
    fn test_suggested_filename() {
        let today = NaiveDate::from_ymd_opt(2025, 11, 6).unwrap();
        assert_eq!(
            suggested_filename(ExportScope::Engines, None, None, today),
            "report_engines_2025-11-06.xlsx"
        );
        assert_eq!(
            suggested_filename(ExportScope::Both, Some("2025-10-01"), None, today),
            "report_engines-and-generators_from-2025-10-01_to--_2025-11-06.xlsx"
        );
        assert_eq!(
            suggested_filename(ExportScope::Generators, Some(""), Some("2025-11-01"), today),
            "report_generators_from--_to-2025-11-01_2025-11-06.xlsx"
        );
    }

    #[test]
    fn test_filename_from_disposition_plain() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="search_111.xlsx""#).as_deref(),
            Some("search_111.xlsx")
        );
    }

    #[test]
    fn test_filename_from_disposition_rfc5987() {
        assert_eq!(
            filename_from_disposition("attachment; filename*=UTF-8''report%20engines.xlsx")
                .as_deref(),
            Some("report engines.xlsx")
        );
    }

    #[test]
    fn test_filename_from_disposition_bad_encoding_kept_raw() {
        assert_eq!(
            filename_from_disposition("attachment; filename*=UTF-8''bad%FFname.xlsx").as_deref(),
            Some("bad%FFname.xlsx")
        );
    }

    #[test]
    fn test_filename_from_disposition_repeated_calls() {
        for _ in 0..3 {
            assert_eq!(
                filename_from_disposition("attachment; filename=a.xlsx").as_deref(),
                Some("a.xlsx")
            );
        }
    }

    #[test]
    fn test_filename_from_disposition_missing() {
        assert_eq!(filename_from_disposition("inline"), None);
        assert_eq!(filename_from_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_describe_body() {
        assert_eq!(describe_body(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
        assert_eq!(
            describe_body(StatusCode::UNPROCESSABLE_ENTITY, "bad serial"),
            "bad serial"
        );
    }

    #[tokio::test]
    async fn test_search_rejects_blank_key() {
        let api = client("http://127.0.0.1:9/api");
        let err = api.search("   ").await.unwrap_err();
        assert!(matches!(err, Error::EmptySearchKey));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_remote_error() {
        // Port 9 (discard) is closed on loopback in test environments.
        let api = client("http://127.0.0.1:9/api");
        let err = api.submit_batch(&SyncBatch::default()).await.unwrap_err();
        assert!(err.is_remote());
        assert!(!api.health().await);
    }
}
