//! End-to-end integration tests for the Quarry research agent.
//!
//! These tests wire the real action router, search client and page
//! extraction pipeline against local HTTP servers, driven either by a
//! scripted model backend or by the real Anthropic backend pointed at a
//! fake Messages API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use quarry_agent::{FALLBACK_MESSAGE, Outcome, ResearchAgent};
use quarry_config::{AppConfig, FetchConfig, SearchConfig};
use quarry_core::{
    ActionRequest, BackendError, CompletionSignal, ContentBlock, ModelBackend, ModelRequest,
    ModelResponse,
};
use quarry_tools::{ActionRouter, SerperClient, WebPageReader};
use serde_json::{Value, json};

// ── Scripted backend ─────────────────────────────────────────────────────

/// A backend that returns scripted responses in sequence and keeps every
/// request it was given.
struct ScriptedBackend {
    responses: Mutex<Vec<ModelResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "e2e_scripted"
    }

    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        if index >= responses.len() {
            panic!(
                "ScriptedBackend exhausted: call #{}, have {}",
                index,
                responses.len()
            );
        }
        requests.push(request);
        Ok(responses[index].clone())
    }
}

fn actions(requests: Vec<(&str, &str, Value)>) -> ModelResponse {
    ModelResponse {
        completion_signal: CompletionSignal::ActionRequest,
        content: requests
            .into_iter()
            .map(|(id, name, arguments)| {
                ContentBlock::ActionRequest(ActionRequest::new(id, name, arguments))
            })
            .collect(),
        model: "mock".into(),
        usage: None,
    }
}

fn answer(text: &str) -> ModelResponse {
    ModelResponse {
        completion_signal: CompletionSignal::Answer,
        content: vec![ContentBlock::text(text)],
        model: "mock".into(),
        usage: None,
    }
}

// ── Local web: search endpoint + pages ───────────────────────────────────

async fn serper(Json(body): Json<Value>) -> Json<Value> {
    let query = body["q"].as_str().unwrap_or("");
    Json(json!({
        "answerBox": { "answer": "Net energy gain" },
        "organic": [
            {
                "title": format!("Results for {query}"),
                "link": "https://news.example/fusion",
                "snippet": "Scientists report a breakthrough."
            }
        ]
    }))
}

async fn article() -> Html<&'static str> {
    Html(
        "<html><head><title>Fusion Milestone</title></head><body>\
         <header>Site chrome</header>\
         <nav>Home | World | Science</nav>\
         <article>\
           <h1>Ignition achieved</h1>\
           <p>The experiment   produced more energy than it consumed.</p>\
           <div style=\"display: none\">tracking pixel text</div>\
         </article>\
         <footer>Copyright</footer>\
         </body></html>",
    )
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_web() -> String {
    spawn(
        Router::new()
            .route("/search", post(serper))
            .route("/article", get(article)),
    )
    .await
}

fn real_router(web: &str) -> ActionRouter {
    let search = SerperClient::new("serper-test", &SearchConfig::default())
        .unwrap()
        .with_endpoint(format!("{web}/search"));
    let reader = WebPageReader::new(&FetchConfig {
        timeout_secs: 5,
        ..FetchConfig::default()
    })
    .unwrap();
    ActionRouter::new(Arc::new(search), Arc::new(reader))
}

fn observations(request: &ModelRequest) -> Vec<(String, String)> {
    request
        .transcript
        .last()
        .unwrap()
        .payload
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ObservationResult(r) => Some((r.request_id.clone(), r.output.clone())),
            _ => None,
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_and_fetch_through_real_pipeline() {
    let web = spawn_web().await;
    let article_url = format!("{web}/article");

    let backend = Arc::new(ScriptedBackend::new(vec![
        actions(vec![("toolu_search", "web_search", json!({"query": "fusion ignition"}))]),
        actions(vec![("toolu_fetch", "web_scraper", json!({"url": article_url}))]),
        answer("**Answer:** Ignition was achieved."),
    ]));
    let mut agent = ResearchAgent::new(backend.clone(), real_router(&web));

    let report = agent.run_report("Has fusion reached ignition?").await.unwrap();
    assert_eq!(report.answer, "**Answer:** Ignition was achieved.");
    assert_eq!(report.outcome, Outcome::Answered);
    assert_eq!(report.actions_executed, 2);
    assert_eq!(backend.calls(), 3);
    assert_eq!(agent.counters().summary(), "1 search(es), 1 fetch(es)");

    let requests = backend.requests.lock().unwrap().clone();

    let search_obs = observations(&requests[1]);
    assert_eq!(search_obs.len(), 1);
    assert_eq!(search_obs[0].0, "toolu_search");
    assert!(search_obs[0].1.starts_with("DIRECT ANSWER: Net energy gain\nResult 1:\n"));
    assert!(search_obs[0].1.contains("Title:   Results for fusion ignition"));

    let fetch_obs = observations(&requests[2]);
    assert_eq!(fetch_obs[0].0, "toolu_fetch");
    let page = &fetch_obs[0].1;
    assert!(page.starts_with(&format!("SOURCE: {article_url}\nTITLE: Fusion Milestone\n")));
    assert!(
        page.ends_with("Ignition achieved\nThe experiment produced more energy than it consumed.")
    );
    assert!(!page.contains("Site chrome"));
    assert!(!page.contains("tracking pixel"));

    let transcript = agent.conversation().transcript();
    assert_eq!(transcript.len(), 6);
    assert!(transcript.is_well_formed());
}

#[tokio::test]
async fn failing_actions_do_not_stop_siblings() {
    let web = spawn_web().await;

    let backend = Arc::new(ScriptedBackend::new(vec![
        actions(vec![
            ("toolu_1", "web_scraper", json!({"url": "not-a-url"})),
            ("toolu_2", "web_scraper", json!({"url": format!("{web}/missing")})),
            ("toolu_3", "calculator", json!({"expression": "1+1"})),
            ("toolu_4", "web_search", json!({"query": "still runs"})),
        ]),
        answer("done"),
    ]));
    let mut agent = ResearchAgent::new(backend.clone(), real_router(&web));

    assert_eq!(agent.run("q").await.unwrap(), "done");

    let requests = backend.requests.lock().unwrap().clone();
    let obs = observations(&requests[1]);
    let ids: Vec<&str> = obs.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["toolu_1", "toolu_2", "toolu_3", "toolu_4"]);
    assert!(obs[0].1.starts_with("Error: Invalid URL 'not-a-url'"));
    assert!(obs[1].1.contains("404"));
    assert!(obs[2].1.contains("calculator"));
    assert!(obs[3].1.contains("Results for still runs"));
}

#[tokio::test]
async fn exhausted_session_accepts_follow_up() {
    let web = spawn_web().await;

    let mut script: Vec<ModelResponse> = ["t0", "t1", "t2"]
        .into_iter()
        .map(|id| actions(vec![(id, "web_search", json!({"query": "loop"}))]))
        .collect();
    script.push(answer("follow-up answered"));

    let backend = Arc::new(ScriptedBackend::new(script));
    let mut agent = ResearchAgent::new(backend.clone(), real_router(&web)).with_max_steps(3);

    assert_eq!(agent.run("first").await.unwrap(), FALLBACK_MESSAGE);
    assert_eq!(agent.run("second").await.unwrap(), "follow-up answered");
    assert_eq!(backend.calls(), 4);
    assert!(agent.conversation().transcript().is_well_formed());
}

// ── Full stack: real Anthropic backend against a fake Messages API ───────

#[derive(Clone, Default)]
struct FakeAnthropic {
    calls: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn messages(State(state): State<FakeAnthropic>, Json(body): Json<Value>) -> Json<Value> {
    let call = state.calls.fetch_add(1, Ordering::SeqCst);
    state.bodies.lock().unwrap().push(body.clone());

    if call == 0 {
        return Json(json!({
            "id": "msg_1",
            "model": body["model"],
            "stop_reason": "tool_use",
            "content": [
                {"type": "thinking", "thinking": "search first", "signature": "sig-1"},
                {"type": "text", "text": "Searching."},
                {"type": "tool_use", "id": "toolu_abc", "name": "web_search", "input": {"query": "capital of france", "num_results": 2}}
            ],
            "usage": {"input_tokens": 50, "output_tokens": 20}
        }));
    }

    // Echo the first line of the tool result so the test can check it.
    let messages = body["messages"].as_array().cloned().unwrap_or_default();
    let tool_result = messages
        .last()
        .and_then(|m| m["content"][0]["content"].as_str())
        .unwrap_or("")
        .lines()
        .next()
        .unwrap_or("")
        .to_string();

    Json(json!({
        "id": "msg_2",
        "model": body["model"],
        "stop_reason": "end_turn",
        "content": [{"type": "text", "text": format!("Saw: {tool_result}")}],
        "usage": {"input_tokens": 80, "output_tokens": 10}
    }))
}

#[tokio::test]
async fn full_stack_with_anthropic_backend() {
    let web = spawn_web().await;
    let fake = FakeAnthropic::default();
    let api = spawn(
        Router::new()
            .route("/v1/messages", post(messages))
            .with_state(fake.clone()),
    )
    .await;

    let mut config = AppConfig::default();
    config.anthropic.api_key = Some("sk-ant-test".into());
    config.anthropic.base_url = api;
    config.model = "claude-test".into();

    let backend = quarry_providers::build_from_config(&config).unwrap();
    let mut agent = quarry_agent::build_agent(&config, backend, real_router(&web));

    let answer = agent.run("What is the capital of France?").await.unwrap();
    assert_eq!(answer, "Saw: DIRECT ANSWER: Net energy gain");
    assert_eq!(fake.calls.load(Ordering::SeqCst), 2);

    let bodies = fake.bodies.lock().unwrap().clone();
    assert_eq!(bodies[0]["model"], "claude-test");
    assert_eq!(bodies[0]["tools"].as_array().unwrap().len(), 2);
    assert_eq!(bodies[0]["messages"][0]["content"], "What is the capital of France?");

    // The assistant turn is replayed verbatim, thinking block included.
    let replayed = &bodies[1]["messages"][1];
    assert_eq!(replayed["role"], "assistant");
    assert_eq!(replayed["content"][0]["type"], "thinking");
    assert_eq!(replayed["content"][0]["signature"], "sig-1");
    assert_eq!(replayed["content"][2]["id"], "toolu_abc");

    let results = &bodies[1]["messages"][2];
    assert_eq!(results["role"], "user");
    assert_eq!(results["content"][0]["type"], "tool_result");
    assert_eq!(results["content"][0]["tool_use_id"], "toolu_abc");
}
