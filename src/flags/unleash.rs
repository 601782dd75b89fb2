//! Unleash-compatible feature flag client
//!
//! Follows the same trait-based pattern as the rest of the crate:
//! - `FeatureSource` trait for the control-plane transport
//! - `HttpFeatureSource` for production (reqwest against the Unleash client API)
//! - `MockFeatureSource` for testing
//!
//! `UnleashClient` fetches toggles once during `initialize` (blocking until the
//! first fetch succeeds or the ready timeout elapses), then refreshes them on a
//! fixed interval. Failed refreshes keep the last known toggles.

use crate::config::UnleashConfig;
use crate::flags::FlagProvider;
use crate::server::shutdown::{shutdown_channel, ShutdownController, ShutdownSignal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Strategies this client can evaluate without a user context
const SUPPORTED_STRATEGIES: [&str; 3] = ["default", "flexibleRollout", "gradualRolloutRandom"];

/// Environment reported in the evaluation context
const DEFAULT_ENVIRONMENT: &str = "default";

/// Reported to the control plane on registration
const SDK_VERSION: &str = concat!("flagserve:", env!("CARGO_PKG_VERSION"));

/// Per-request timeout against the control plane
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("control plane request failed: {0}")]
    Http(String),

    #[error("control plane returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse feature toggles: {0}")]
    Parse(String),

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("feature flags not ready after {waited:?}: {last_error}")]
    NotReady { waited: Duration, last_error: String },
}

/// One feature toggle as served by `/client/features`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub strategies: Vec<Strategy>,
}

/// Activation strategy attached to a toggle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    /// Strategy parameters, e.g. `rollout` for `flexibleRollout`
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

/// Condition on a context field that must hold for a strategy to apply
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub context_name: String,
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub case_insensitive: bool,
}

/// Fields known to every evaluation; requests carry no user context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticContext {
    pub app_name: String,
    pub environment: String,
}

impl StaticContext {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "appName" => Some(self.app_name.clone()),
            "environment" => Some(self.environment.clone()),
            "currentTime" => Some(Utc::now().to_rfc3339()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeaturesResponse {
    #[serde(default)]
    #[allow(dead_code)] // Part of the wire format, not needed for evaluation
    version: u32,
    features: Vec<Feature>,
}

/// Result of a toggle fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Updated {
        features: Vec<Feature>,
        etag: Option<String>,
    },
    NotModified,
}

/// Client registration payload for `/client/register`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub app_name: String,
    pub instance_id: String,
    pub sdk_version: String,
    pub strategies: Vec<String>,
    pub started: DateTime<Utc>,
    /// Metrics interval in milliseconds
    pub interval: u64,
}

/// Yes/no evaluation counts for one toggle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleCount {
    pub yes: u64,
    pub no: u64,
}

/// Usage counts collected between two metrics reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBucket {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub toggles: HashMap<String, ToggleCount>,
}

/// Usage metrics payload for `/client/metrics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub app_name: String,
    pub instance_id: String,
    pub bucket: MetricsBucket,
}

/// Parse a `/client/features` response body
pub fn parse_features(json: &str) -> Result<Vec<Feature>, ProviderError> {
    let response: FeaturesResponse = serde_json::from_str(json)
        .map_err(|e| ProviderError::Parse(format!("Invalid JSON: {}", e)))?;
    Ok(response.features)
}

/// Whether a toggle is on for `context`
///
/// An enabled toggle without strategies is on. Otherwise at least one
/// strategy must have all its constraints met and be enabled itself.
/// Strategies keyed on user or session ids never match since requests carry
/// neither; random stickiness rolls per evaluation.
pub fn evaluate(feature: &Feature, context: &StaticContext) -> bool {
    feature.enabled
        && (feature.strategies.is_empty()
            || feature.strategies.iter().any(|strategy| {
                strategy
                    .constraints
                    .iter()
                    .all(|constraint| constraint_met(constraint, context))
                    && strategy_enabled(strategy)
            }))
}

fn strategy_enabled(strategy: &Strategy) -> bool {
    match strategy.name.as_str() {
        "default" => true,
        "flexibleRollout" => {
            let stickiness = strategy
                .parameters
                .get("stickiness")
                .and_then(|v| v.as_str())
                .unwrap_or("default");
            match stickiness {
                // Falls back to random once user and session ids are absent
                "default" | "random" => rolled_in(percentage(strategy, "rollout")),
                _ => false,
            }
        }
        "gradualRolloutRandom" => rolled_in(percentage(strategy, "percentage")),
        _ => false,
    }
}

/// Percentage parameter, sent as a string or a number; invalid values count as 0
fn percentage(strategy: &Strategy, key: &str) -> u32 {
    let value = match strategy.parameters.get(key) {
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        _ => None,
    };
    value.map_or(0, |v| v.clamp(0.0, 100.0) as u32)
}

fn rolled_in(percentage: u32) -> bool {
    match percentage {
        0 => false,
        100 => true,
        p => rand::thread_rng().gen_range(1..=100) <= p,
    }
}

fn constraint_met(constraint: &Constraint, context: &StaticContext) -> bool {
    let field = context.field(&constraint.context_name);
    let met = match (constraint.operator.as_str(), field.as_deref()) {
        ("IN", Some(value)) => constraint.values.iter().any(|v| v == value),
        ("IN", None) => false,
        ("NOT_IN", Some(value)) => !constraint.values.iter().any(|v| v == value),
        ("NOT_IN", None) => true,
        ("STR_CONTAINS" | "STR_STARTS_WITH" | "STR_ENDS_WITH", Some(value)) => {
            string_match(constraint, value)
        }
        ("NUM_EQ" | "NUM_GT" | "NUM_GTE" | "NUM_LT" | "NUM_LTE", Some(value)) => {
            number_match(constraint, value)
        }
        ("DATE_AFTER" | "DATE_BEFORE", Some(value)) => date_match(constraint, value),
        // Missing fields and unsupported operators
        _ => false,
    };
    met != constraint.inverted
}

fn string_match(constraint: &Constraint, value: &str) -> bool {
    let fold = |s: &str| {
        if constraint.case_insensitive {
            s.to_lowercase()
        } else {
            s.to_string()
        }
    };
    let value = fold(value);
    constraint.values.iter().map(|v| fold(v.as_str())).any(|candidate| {
        match constraint.operator.as_str() {
            "STR_CONTAINS" => value.contains(&candidate),
            "STR_STARTS_WITH" => value.starts_with(&candidate),
            _ => value.ends_with(&candidate),
        }
    })
}

fn number_match(constraint: &Constraint, value: &str) -> bool {
    let (Ok(actual), Some(Ok(expected))) = (
        value.parse::<f64>(),
        constraint.value.as_deref().map(str::parse::<f64>),
    ) else {
        return false;
    };
    match constraint.operator.as_str() {
        "NUM_EQ" => actual == expected,
        "NUM_GT" => actual > expected,
        "NUM_GTE" => actual >= expected,
        "NUM_LT" => actual < expected,
        _ => actual <= expected,
    }
}

fn date_match(constraint: &Constraint, value: &str) -> bool {
    let (Ok(actual), Some(Ok(expected))) = (
        DateTime::parse_from_rfc3339(value),
        constraint.value.as_deref().map(DateTime::parse_from_rfc3339),
    ) else {
        return false;
    };
    if constraint.operator == "DATE_AFTER" {
        actual > expected
    } else {
        actual < expected
    }
}

/// Transport to the feature flag control plane
///
/// Production code uses `HttpFeatureSource`.
/// Tests use `MockFeatureSource` which serves toggles from memory.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Fetch toggles, sending `etag` as `If-None-Match` when present
    async fn fetch_features(&self, etag: Option<&str>) -> Result<FetchOutcome, ProviderError>;

    async fn register(&self, registration: &Registration) -> Result<(), ProviderError>;

    async fn send_metrics(&self, report: &MetricsReport) -> Result<(), ProviderError>;
}

/// Production feature source speaking the Unleash client API over HTTP
pub struct HttpFeatureSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFeatureSource {
    pub fn new(config: &UnleashConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("unleash-appname"),
            header_value(&config.app_name)?,
        );
        headers.insert(
            HeaderName::from_static("unleash-instanceid"),
            header_value(&config.instance_id)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(SDK_VERSION)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(format!("{}{}", self.url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        check_status(response).await.map(|_| ())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value)
        .map_err(|e| ProviderError::Config(format!("invalid header value {:?}: {}", value, e)))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}

#[async_trait]
impl FeatureSource for HttpFeatureSource {
    async fn fetch_features(&self, etag: Option<&str>) -> Result<FetchOutcome, ProviderError> {
        let mut request = self.client.get(format!("{}/client/features", self.url));
        if let Some(etag) = etag {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified);
        }
        let response = check_status(response).await?;

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(FetchOutcome::Updated {
            features: parse_features(&body)?,
            etag,
        })
    }

    async fn register(&self, registration: &Registration) -> Result<(), ProviderError> {
        self.post_json("/client/register", registration).await
    }

    async fn send_metrics(&self, report: &MetricsReport) -> Result<(), ProviderError> {
        self.post_json("/client/metrics", report).await
    }
}

#[derive(Default)]
struct Toggles {
    features: HashMap<String, Feature>,
    etag: Option<String>,
}

struct Inner {
    config: UnleashConfig,
    context: StaticContext,
    source: Arc<dyn FeatureSource>,
    toggles: RwLock<Toggles>,
    /// `None` when metrics are disabled
    metrics: Option<Mutex<MetricsBucket>>,
}

impl Inner {
    async fn refresh(&self) -> Result<(), ProviderError> {
        let etag = read_lock(&self.toggles).etag.clone();

        match self.source.fetch_features(etag.as_deref()).await? {
            FetchOutcome::Updated { features, etag } => {
                let count = features.len();
                let mut toggles = write_lock(&self.toggles);
                toggles.features = features.into_iter().map(|f| (f.name.clone(), f)).collect();
                toggles.etag = etag;
                debug!(toggles = count, "Feature toggles updated");
            }
            FetchOutcome::NotModified => {
                debug!("Feature toggles unchanged");
            }
        }
        Ok(())
    }

    fn record(&self, name: &str, enabled: bool) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let mut bucket = metrics.lock().unwrap_or_else(|e| e.into_inner());
        let count = bucket.toggles.entry(name.to_string()).or_default();
        if enabled {
            count.yes += 1;
        } else {
            count.no += 1;
        }
    }

    /// Close the current bucket and start a new one
    fn take_bucket(&self) -> Option<MetricsBucket> {
        let metrics = self.metrics.as_ref()?;
        let mut bucket = metrics.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let mut closed = std::mem::replace(&mut *bucket, empty_bucket(now));
        closed.stop = now;
        Some(closed)
    }

    /// Put unsent counts back so the next report includes them
    fn restore_bucket(&self, unsent: MetricsBucket) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let mut bucket = metrics.lock().unwrap_or_else(|e| e.into_inner());
        bucket.start = unsent.start;
        for (name, count) in unsent.toggles {
            let entry = bucket.toggles.entry(name).or_default();
            entry.yes += count.yes;
            entry.no += count.no;
        }
    }

    async fn report_metrics(&self) {
        let Some(bucket) = self.take_bucket() else {
            return;
        };
        if bucket.toggles.is_empty() {
            return;
        }

        let report = MetricsReport {
            app_name: self.config.app_name.clone(),
            instance_id: self.config.instance_id.clone(),
            bucket,
        };
        match self.source.send_metrics(&report).await {
            Ok(()) => debug!(toggles = report.bucket.toggles.len(), "Usage metrics sent"),
            Err(e) => {
                warn!(error = %e, "Failed to send usage metrics, keeping counts for next report");
                self.restore_bucket(report.bucket);
            }
        }
    }
}

fn empty_bucket(now: DateTime<Utc>) -> MetricsBucket {
    MetricsBucket {
        start: now,
        stop: now,
        toggles: HashMap::new(),
    }
}

fn read_lock(lock: &RwLock<Toggles>) -> std::sync::RwLockReadGuard<'_, Toggles> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock(lock: &RwLock<Toggles>) -> std::sync::RwLockWriteGuard<'_, Toggles> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Feature flag client backed by an Unleash-compatible control plane
pub struct UnleashClient {
    inner: Arc<Inner>,
    stop: ShutdownController,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl UnleashClient {
    /// Connect to the control plane described by `config`
    ///
    /// Returns once the first toggle fetch succeeds. Fails with
    /// `ProviderError::NotReady` if that does not happen within
    /// `config.ready_timeout`.
    pub async fn initialize(config: UnleashConfig) -> Result<Self, ProviderError> {
        let source = Arc::new(HttpFeatureSource::new(&config)?);
        Self::with_source(config, source).await
    }

    /// Same as `initialize` with an explicit transport
    pub async fn with_source(
        config: UnleashConfig,
        source: Arc<dyn FeatureSource>,
    ) -> Result<Self, ProviderError> {
        let metrics = if config.disable_metrics {
            None
        } else {
            Some(Mutex::new(empty_bucket(Utc::now())))
        };
        let inner = Arc::new(Inner {
            context: StaticContext::new(config.app_name.clone()),
            config,
            source,
            toggles: RwLock::new(Toggles::default()),
            metrics,
        });

        wait_until_ready(&inner).await?;
        info!(
            app_name = %inner.config.app_name,
            toggles = read_lock(&inner.toggles).features.len(),
            "Feature flag client ready"
        );

        let (stop, signal) = shutdown_channel();
        let mut tasks = vec![tokio::spawn(poll_toggles(inner.clone(), signal.clone()))];

        if inner.metrics.is_some() {
            let registration = Registration {
                app_name: inner.config.app_name.clone(),
                instance_id: inner.config.instance_id.clone(),
                sdk_version: SDK_VERSION.to_string(),
                strategies: SUPPORTED_STRATEGIES.iter().map(|s| s.to_string()).collect(),
                started: Utc::now(),
                interval: inner.config.metrics_interval.as_millis() as u64,
            };
            match inner.source.register(&registration).await {
                Ok(()) => debug!("Client registered with control plane"),
                Err(e) => warn!(error = %e, "Client registration failed"),
            }
            tasks.push(tokio::spawn(report_usage(inner.clone(), signal)));
        }

        Ok(Self {
            inner,
            stop,
            tasks: Mutex::new(tasks),
        })
    }

    /// Stop background refresh/metrics tasks and wait for them to finish
    ///
    /// Pending usage counts are flushed when metrics are enabled.
    pub async fn shutdown(&self) {
        self.stop.shutdown();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Feature flag background task failed");
            }
        }
        info!("Feature flag client stopped");
    }
}

impl FlagProvider for UnleashClient {
    fn is_enabled(&self, name: &str) -> bool {
        let enabled = read_lock(&self.inner.toggles)
            .features
            .get(name)
            .map(|feature| evaluate(feature, &self.inner.context))
            .unwrap_or(false);
        self.inner.record(name, enabled);
        enabled
    }
}

/// Retry the first fetch until it succeeds or the ready timeout elapses
async fn wait_until_ready(inner: &Inner) -> Result<(), ProviderError> {
    let waited = inner.config.ready_timeout;
    let deadline = Instant::now() + waited;

    loop {
        let last_error = match tokio::time::timeout_at(deadline, inner.refresh()).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.to_string(),
            Err(_) => "timed out waiting for control plane".to_string(),
        };

        let retry_at = Instant::now() + inner.config.refresh_interval;
        if retry_at >= deadline {
            return Err(ProviderError::NotReady { waited, last_error });
        }
        warn!(error = %last_error, "Feature flag fetch failed, retrying");
        tokio::time::sleep_until(retry_at).await;
    }
}

async fn poll_toggles(inner: Arc<Inner>, mut stop: ShutdownSignal) {
    let mut ticker = tokio::time::interval(inner.config.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and initialization already fetched
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.wait() => break,
            _ = ticker.tick() => {
                if let Err(e) = inner.refresh().await {
                    warn!(error = %e, "Feature toggle refresh failed, keeping last known toggles");
                }
            }
        }
    }
    debug!("Feature toggle refresh stopped");
}

async fn report_usage(inner: Arc<Inner>, mut stop: ShutdownSignal) {
    let mut ticker = tokio::time::interval(inner.config.metrics_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.wait() => break,
            _ = ticker.tick() => inner.report_metrics().await,
        }
    }
    inner.report_metrics().await;
    debug!("Usage metrics reporting stopped");
}

/// Mock feature source for testing - serves toggles from memory
#[cfg(test)]
#[derive(Default)]
pub struct MockFeatureSource {
    state: Mutex<MockState>,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    features: Vec<Feature>,
    version: u64,
    failures_remaining: usize,
    fail_metrics: bool,
    fetches: usize,
    etags_seen: Vec<Option<String>>,
    registrations: Vec<Registration>,
    reports: Vec<MetricsReport>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
impl MockFeatureSource {
    pub fn new(features: Vec<Feature>) -> Self {
        let source = Self::default();
        source.set_features(features);
        source
    }

    /// Replace the served toggles (bumps the ETag)
    pub fn set_features(&self, features: Vec<Feature>) {
        let mut state = self.state.lock().unwrap();
        state.features = features;
        state.version += 1;
    }

    /// Make the next `n` fetches fail
    pub fn fail_next(&self, n: usize) {
        self.state.lock().unwrap().failures_remaining = n;
    }

    pub fn fail_metrics(&self, fail: bool) {
        self.state.lock().unwrap().fail_metrics = fail;
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().unwrap().fetches
    }

    pub fn etags_seen(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().etags_seen.clone()
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.state.lock().unwrap().registrations.clone()
    }

    pub fn reports(&self) -> Vec<MetricsReport> {
        self.state.lock().unwrap().reports.clone()
    }
}

#[cfg(test)]
#[async_trait]
#[allow(clippy::unwrap_used)]
impl FeatureSource for MockFeatureSource {
    async fn fetch_features(&self, etag: Option<&str>) -> Result<FetchOutcome, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.fetches += 1;
        state.etags_seen.push(etag.map(str::to_string));

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(ProviderError::Http("connection refused".to_string()));
        }

        let current = format!("\"v{}\"", state.version);
        if etag == Some(current.as_str()) {
            return Ok(FetchOutcome::NotModified);
        }
        Ok(FetchOutcome::Updated {
            features: state.features.clone(),
            etag: Some(current),
        })
    }

    async fn register(&self, registration: &Registration) -> Result<(), ProviderError> {
        self.state
            .lock()
            .unwrap()
            .registrations
            .push(registration.clone());
        Ok(())
    }

    async fn send_metrics(&self, report: &MetricsReport) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_metrics {
            return Err(ProviderError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        state.reports.push(report.clone());
        Ok(())
    }
}
