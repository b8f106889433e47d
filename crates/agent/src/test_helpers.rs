//! Shared test helpers for the research loop tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quarry_core::{
    ActionRequest, BackendError, CompletionSignal, ContentBlock, ModelBackend, ModelRequest,
    ModelResponse, Usage,
};
use quarry_tools::error::SearchError;
use quarry_tools::extract::{ExtractedPage, Extraction};
use quarry_tools::search::{OrganicResult, SearchResponse};
use quarry_tools::{ActionRouter, PageReader, SearchBackend};

/// A mock backend that returns a sequence of scripted responses.
///
/// Each call to `respond` returns the next response in the queue and
/// records the request it was given. Panics if more calls are made than
/// responses provided.
pub struct ScriptedBackend {
    responses: Mutex<Vec<Result<ModelResponse, BackendError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(responses: Vec<Result<ModelResponse, BackendError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();

        if index >= responses.len() {
            panic!(
                "ScriptedBackend: no more responses (call #{}, have {})",
                index,
                responses.len()
            );
        }

        requests.push(request);
        responses[index].clone()
    }
}

pub fn answer(text: &str) -> ModelResponse {
    response(CompletionSignal::Answer, vec![ContentBlock::text(text)])
}

pub fn response(signal: CompletionSignal, content: Vec<ContentBlock>) -> ModelResponse {
    ModelResponse {
        completion_signal: signal,
        content,
        model: "mock-model".into(),
        usage: Some(Usage {
            input_tokens: 10,
            output_tokens: 5,
        }),
    }
}

pub fn action(id: &str, name: &str, arguments: serde_json::Value) -> ContentBlock {
    ContentBlock::ActionRequest(ActionRequest::new(id, name, arguments))
}

/// A response asking for a single search.
pub fn search_request(id: &str, query: &str) -> ModelResponse {
    response(
        CompletionSignal::ActionRequest,
        vec![
            ContentBlock::text("Let me look that up."),
            action(id, "web_search", serde_json::json!({ "query": query })),
        ],
    )
}

/// Search backend that records queries and returns one result each.
#[derive(Default)]
pub struct FakeSearch {
    pub queries: Mutex<Vec<String>>,
}

#[async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, query: &str, _num_results: u32) -> Result<SearchResponse, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(SearchResponse {
            answer_box: None,
            organic: vec![OrganicResult {
                title: Some(format!("About {query}")),
                link: Some("https://result.example".into()),
                snippet: Some("A relevant snippet.".into()),
            }],
        })
    }
}

/// Page reader that records URLs and returns a canned page.
#[derive(Default)]
pub struct FakeReader {
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl PageReader for FakeReader {
    async fn read(&self, url: &str) -> Extraction {
        self.urls.lock().unwrap().push(url.to_string());
        Extraction::Page(ExtractedPage {
            header: format!("SOURCE: {url}\nTITLE: Fake\n"),
            body: "Page body.".into(),
        })
    }
}

pub fn fake_router() -> (ActionRouter, Arc<FakeSearch>, Arc<FakeReader>) {
    let search = Arc::new(FakeSearch::default());
    let reader = Arc::new(FakeReader::default());
    let router = ActionRouter::new(search.clone(), reader.clone());
    (router, search, reader)
}
