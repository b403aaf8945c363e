//! Dashboard reactive controller
//!
//! One controller per dashboard instance. It cycles between parsed-idle
//! and executing, with parse-failed reachable whenever the source text
//! changes and re-parsing fails.
//!
//! All state mutation happens under one lock, never across an await. Each
//! query execution carries a per-name version snapshot; completions whose
//! snapshot no longer matches are discarded, so the latest request always
//! wins over a stale in-flight one.

use std::sync::Arc;

use ahash::AHashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use dash_core::{InputState, InputValue, QueryClient, Row, ThemeBase};
use dash_parser::{parse_dashboard, ParseError, ParsedDashboard};

use crate::inputs::{affected_queries, apply_inputs_to_query, initial_input_state, input_state_to_params};
use crate::render::{render_dashboard, RenderedDashboard};
use crate::sanitize::HtmlSanitizer;

/// Per-query runtime state. Owned exclusively by the controller; reset to
/// loading immediately before each (re)execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRuntimeState {
    pub loading: bool,
    /// Last good rows. Kept while a re-execution is in flight, cleared on
    /// failure.
    pub rows: Option<Vec<Row>>,
    pub error: Option<String>,
    /// Row limit in effect for the stored rows.
    pub effective_limit: Option<u64>,
}

/// What the controller can currently show.
#[derive(Debug, Clone)]
pub enum DashboardView {
    /// No content supplied yet.
    Unparsed,
    /// The last parse failed; only the aggregate error is renderable.
    ParseFailed(ParseError),
    Ready(RenderedDashboard),
}

#[derive(Default)]
struct Inner {
    parsed: Option<ParsedDashboard>,
    parse_error: Option<ParseError>,
    inputs: InputState,
    queries: IndexMap<String, QueryRuntimeState>,
    /// Monotonic per-query dispatch counters for staleness checks.
    versions: AHashMap<String, u64>,
    /// External seed values, consumed by the first successful parse.
    seed: Option<Vec<(String, String)>>,
}

/// Orchestrates parse, execution, and input-driven re-execution for one
/// dashboard.
#[derive(Clone)]
pub struct DashboardController {
    client: Arc<dyn QueryClient>,
    inner: Arc<RwLock<Inner>>,
}

impl DashboardController {
    pub fn new(client: Arc<dyn QueryClient>) -> Self {
        Self {
            client,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Supply externally serialized input values (URL reflection) to seed
    /// input state ahead of the first successful parse. Later re-parses
    /// rebuild state purely from declared defaults.
    pub fn with_initial_params(self, params: Vec<(String, String)>) -> Self {
        self.inner.write().seed = Some(params);
        self
    }

    /// Replace the source document. Always a full re-parse: prior query
    /// and input state is discarded either way. On failure only the parse
    /// error remains renderable.
    pub fn set_content(&self, text: &str) -> Result<(), ParseError> {
        match parse_dashboard(text) {
            Ok(parsed) => {
                let mut inner = self.inner.write();
                let seed = inner.seed.take().unwrap_or_default();
                inner.inputs = initial_input_state(&parsed.inputs, &seed);
                inner.queries.clear();
                inner.versions.clear();
                inner.parse_error = None;
                inner.parsed = Some(parsed);
                Ok(())
            }
            Err(err) => {
                let mut inner = self.inner.write();
                inner.parsed = None;
                inner.parse_error = Some(err.clone());
                inner.inputs.clear();
                inner.queries.clear();
                inner.versions.clear();
                Err(err)
            }
        }
    }

    /// Execute every query in the document once, concurrently. One
    /// query's failure never blocks or fails the others.
    pub async fn run_initial(&self) {
        let names: Vec<String> = {
            let inner = self.inner.read();
            match &inner.parsed {
                Some(parsed) => parsed.queries.keys().cloned().collect(),
                None => return,
            }
        };
        self.execute(names).await;
    }

    /// Record a user input change and re-execute only the affected query
    /// subset. The state update itself is synchronous; the returned list
    /// names the queries that were re-executed.
    pub async fn set_input(&self, name: &str, value: InputValue) -> Vec<String> {
        let affected = {
            let mut inner = self.inner.write();
            let affected = match inner.parsed.as_ref() {
                None => return Vec::new(),
                Some(parsed) => {
                    match parsed.inputs.iter().find(|i| i.input_name() == Some(name)) {
                        None => {
                            warn!(input = name, "change for undeclared input, ignoring");
                            return Vec::new();
                        }
                        Some(input) => affected_queries(input, parsed),
                    }
                }
            };
            inner.inputs.insert(name.to_string(), value);
            affected
        };

        if !affected.is_empty() {
            self.execute(affected.clone()).await;
        }
        affected
    }

    /// Dispatch the named queries together; each completion updates only
    /// its own entry, so out-of-order completion across names is fine.
    async fn execute(&self, names: Vec<String>) {
        let jobs = {
            let mut inner = self.inner.write();
            let Some(parsed) = inner.parsed.as_ref() else {
                return;
            };

            let mut compiled = Vec::with_capacity(names.len());
            for name in names {
                let Some(base) = parsed.queries.get(&name) else {
                    warn!(query = name.as_str(), "unknown query in execution set, skipping");
                    continue;
                };
                let spec = apply_inputs_to_query(&name, base, &parsed.inputs, &inner.inputs);
                compiled.push((name, spec));
            }

            let mut jobs = Vec::with_capacity(compiled.len());
            for (name, spec) in compiled {
                let version = {
                    let counter = inner.versions.entry(name.clone()).or_insert(0);
                    *counter += 1;
                    *counter
                };
                let entry = inner.queries.entry(name.clone()).or_default();
                entry.loading = true;
                entry.error = None;
                jobs.push((name, version, spec));
            }
            jobs
        };

        let mut handles = Vec::with_capacity(jobs.len());
        for (name, version, spec) in jobs {
            let client = Arc::clone(&self.client);
            let inner = Arc::clone(&self.inner);
            handles.push(tokio::spawn(async move {
                debug!(query = name.as_str(), version, "executing query");
                let result = client.query(&spec).await;

                let mut guard = inner.write();
                if guard.versions.get(&name).copied() != Some(version) {
                    debug!(query = name.as_str(), version, "discarding stale completion");
                    return;
                }
                let entry = guard.queries.entry(name.clone()).or_default();
                match result {
                    Ok(response) => {
                        entry.loading = false;
                        entry.error = None;
                        entry.effective_limit = response.applied_limit.or(spec.limit);
                        entry.rows = Some(response.rows);
                    }
                    Err(err) => {
                        entry.loading = false;
                        entry.rows = None;
                        entry.error = Some(err.to_string());
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "query task failed to complete");
            }
        }
    }

    /// Resolve the current view: parse error, render tree, or nothing.
    pub fn render(&self, sanitizer: &dyn HtmlSanitizer, base: ThemeBase) -> DashboardView {
        let inner = self.inner.read();
        if let Some(err) = &inner.parse_error {
            return DashboardView::ParseFailed(err.clone());
        }
        let Some(parsed) = &inner.parsed else {
            return DashboardView::Unparsed;
        };
        DashboardView::Ready(render_dashboard(
            parsed,
            &inner.inputs,
            &inner.queries,
            sanitizer,
            base,
        ))
    }

    /// Snapshot of one query's runtime state.
    pub fn query_state(&self, name: &str) -> Option<QueryRuntimeState> {
        self.inner.read().queries.get(name).cloned()
    }

    /// Snapshot of current input state.
    pub fn input_state(&self) -> InputState {
        self.inner.read().inputs.clone()
    }

    /// Current input state as flat URL-reflection pairs.
    pub fn input_params(&self) -> Vec<(String, String)> {
        input_state_to_params(&self.inner.read().inputs)
    }

    /// The last parse error, if the current content failed to parse.
    pub fn parse_error(&self) -> Option<ParseError> {
        self.inner.read().parse_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dash_core::{DateRangePreset, DateRangeValue, QueryResponse, QuerySpec};
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::sync::{oneshot, Notify};

    fn rows(data: serde_json::Value) -> Vec<Row> {
        data.as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    /// Keys a response on the query's first field, counting calls.
    struct CountingClient {
        responses: AHashMap<String, Result<Vec<Row>, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl CountingClient {
        fn new() -> Self {
            Self {
                responses: AHashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with(mut self, field: &str, response: Result<Vec<Row>, String>) -> Self {
            self.responses.insert(field.to_string(), response);
            self
        }

        fn calls_for(&self, field: &str) -> usize {
            self.calls.lock().iter().filter(|c| *c == field).count()
        }
    }

    #[async_trait]
    impl QueryClient for CountingClient {
        async fn query(&self, spec: &QuerySpec) -> anyhow::Result<QueryResponse> {
            let key = spec
                .all_fields()
                .next()
                .unwrap_or_default()
                .to_string();
            self.calls.lock().push(key.clone());
            match self.responses.get(&key) {
                Some(Ok(rows)) => Ok(QueryResponse {
                    rows: rows.clone(),
                    applied_limit: None,
                }),
                Some(Err(message)) => Err(anyhow::anyhow!("{message}")),
                None => Ok(QueryResponse::default()),
            }
        }
    }

    /// Completes each query only when the test releases it, in arrival
    /// order.
    struct ManualClient {
        pending: Mutex<Vec<oneshot::Sender<anyhow::Result<QueryResponse>>>>,
        arrived: Notify,
    }

    impl ManualClient {
        fn new() -> Self {
            Self {
                pending: Mutex::new(Vec::new()),
                arrived: Notify::new(),
            }
        }

        async fn next_sender(&self) -> oneshot::Sender<anyhow::Result<QueryResponse>> {
            loop {
                if let Some(tx) = {
                    let mut pending = self.pending.lock();
                    (!pending.is_empty()).then(|| pending.remove(0))
                } {
                    return tx;
                }
                self.arrived.notified().await;
            }
        }
    }

    #[async_trait]
    impl QueryClient for ManualClient {
        async fn query(&self, _spec: &QuerySpec) -> anyhow::Result<QueryResponse> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().push(tx);
            self.arrived.notify_one();
            rx.await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("request dropped")))
        }
    }

    const TARGETED_DOC: &str = "\
```query a
measures: [a.total]
timeDimension:
  dimension: a.date
```

```query b
measures: [b.total]
timeDimension:
  dimension: b.date
```

```query c
measures: [c.total]
```

<DateRange name=\"period\" queries=\"a,b\" />
<Dropdown name=\"pick\" data={c} dimension=\"c.kind\" />

<DataTable data={a} />
";

    fn range_value() -> InputValue {
        InputValue::DateRange(DateRangeValue {
            preset: DateRangePreset::Last7Days,
            range: ("2024-01-01".to_string(), "2024-01-07".to_string()),
        })
    }

    #[tokio::test]
    async fn test_initial_run_executes_every_query() {
        let client = Arc::new(
            CountingClient::new()
                .with("a.total", Ok(rows(json!([{"a.total": 1}]))))
                .with("b.total", Ok(rows(json!([{"b.total": 2}]))))
                .with("c.total", Err("backend down".to_string())),
        );
        let controller = DashboardController::new(client.clone());
        controller.set_content(TARGETED_DOC).unwrap();
        controller.run_initial().await;

        assert_eq!(client.calls_for("a.total"), 1);
        assert_eq!(client.calls_for("b.total"), 1);
        assert_eq!(client.calls_for("c.total"), 1);

        // One failure is isolated to its own entry
        let a = controller.query_state("a").unwrap();
        assert!(!a.loading);
        assert_eq!(a.rows.as_ref().unwrap().len(), 1);
        let c = controller.query_state("c").unwrap();
        assert_eq!(c.error.as_deref(), Some("backend down"));
        assert!(c.rows.is_none());
    }

    #[tokio::test]
    async fn test_targeted_date_range_reexecutes_only_targets() {
        let client = Arc::new(
            CountingClient::new()
                .with("a.total", Ok(rows(json!([{"a.total": 1}]))))
                .with("b.total", Ok(rows(json!([{"b.total": 2}]))))
                .with("c.total", Ok(rows(json!([{"c.total": 3}])))),
        );
        let controller = DashboardController::new(client.clone());
        controller.set_content(TARGETED_DOC).unwrap();
        controller.run_initial().await;

        let c_before = controller.query_state("c").unwrap();
        let affected = controller.set_input("period", range_value()).await;
        assert_eq!(affected, vec!["a".to_string(), "b".to_string()]);

        assert_eq!(client.calls_for("a.total"), 2);
        assert_eq!(client.calls_for("b.total"), 2);
        assert_eq!(client.calls_for("c.total"), 1);

        // Untargeted query state is untouched, including the loading flag
        let c_after = controller.query_state("c").unwrap();
        assert_eq!(c_before, c_after);
    }

    #[tokio::test]
    async fn test_dropdown_without_targets_triggers_nothing() {
        let client = Arc::new(
            CountingClient::new().with("c.total", Ok(rows(json!([{"c.total": 3}])))),
        );
        let controller = DashboardController::new(client.clone());
        controller.set_content(TARGETED_DOC).unwrap();
        controller.run_initial().await;

        let affected = controller
            .set_input("pick", InputValue::Dropdown(Some("x".to_string())))
            .await;
        assert!(affected.is_empty());
        assert_eq!(client.calls_for("a.total"), 1);
        assert_eq!(client.calls_for("c.total"), 1);

        // The state update itself still happened
        match controller.input_state().get("pick") {
            Some(InputValue::Dropdown(Some(v))) => assert_eq!(v, "x"),
            other => panic!("unexpected input state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_completion_is_discarded() {
        let doc = "\
```query x
measures: [x.total]
```

<DateRange name=\"period\" queries=\"x\" />

<DataTable data={x} />
";
        let client = Arc::new(ManualClient::new());
        let controller = DashboardController::new(client.clone());
        controller.set_content(doc).unwrap();

        // First execution dispatches and blocks on the client
        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.run_initial().await })
        };
        let old_request = client.next_sender().await;

        // Second execution for the same query while the first is in flight
        let second = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_input("period", range_value()).await })
        };
        let new_request = client.next_sender().await;

        // The newer request resolves first…
        new_request
            .send(Ok(QueryResponse {
                rows: rows(json!([{"x.total": "new"}])),
                applied_limit: None,
            }))
            .ok();
        second.await.unwrap();

        // …and the older one resolves after, but must not win
        old_request
            .send(Ok(QueryResponse {
                rows: rows(json!([{"x.total": "old"}])),
                applied_limit: None,
            }))
            .ok();
        first.await.unwrap();

        let state = controller.query_state("x").unwrap();
        assert!(!state.loading);
        assert_eq!(state.rows.unwrap()[0]["x.total"], json!("new"));
    }

    #[tokio::test]
    async fn test_reparse_discards_runtime_state() {
        let client = Arc::new(
            CountingClient::new().with("a.total", Ok(rows(json!([{"a.total": 1}])))),
        );
        let controller = DashboardController::new(client);
        controller.set_content(TARGETED_DOC).unwrap();
        controller.run_initial().await;
        assert!(controller.query_state("a").is_some());

        controller
            .set_content("```query only\nmeasures: [only.v]\n```\n")
            .unwrap();
        assert!(controller.query_state("a").is_none());
        assert!(controller.input_state().is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_surfaces_only_the_error() {
        let client = Arc::new(CountingClient::new());
        let controller = DashboardController::new(client);
        controller.set_content(TARGETED_DOC).unwrap();

        let bad = "```query dup\nmeasures: [m.v]\n```\n\n```query dup\nmeasures: [m.v]\n```\n";
        assert!(controller.set_content(bad).is_err());
        assert!(controller.parse_error().is_some());
        match controller.render(&crate::sanitize::StructuralSanitizer, ThemeBase::Light) {
            DashboardView::ParseFailed(err) => {
                assert!(err.to_string().contains("Duplicate query name"))
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_seed_params_consumed_once() {
        let client = Arc::new(CountingClient::new());
        let controller = DashboardController::new(client).with_initial_params(vec![(
            "period".to_string(),
            "year-to-date".to_string(),
        )]);
        controller.set_content(TARGETED_DOC).unwrap();
        match controller.input_state().get("period") {
            Some(InputValue::DateRange(v)) => {
                assert_eq!(v.preset, DateRangePreset::YearToDate)
            }
            other => panic!("unexpected input state: {other:?}"),
        }

        // A re-parse goes back to declared defaults
        controller.set_content(TARGETED_DOC).unwrap();
        match controller.input_state().get("period") {
            Some(InputValue::DateRange(v)) => {
                assert_eq!(v.preset, dash_core::dates::DEFAULT_PRESET)
            }
            other => panic!("unexpected input state: {other:?}"),
        }
    }
}
