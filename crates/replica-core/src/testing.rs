//! In-memory collaborators shared by the unit tests of this crate.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::Stream;
use tokio::sync::mpsc;

use replica_types::error::{ArtifactError, FetchError, ScrapeError};
use replica_types::event::NotificationEvent;
use replica_types::llm::{CompletionRequest, LlmError, StopReason, StreamEvent};

use crate::artifact::ArtifactStore;
use crate::asset::{AssetFetcher, PlaceholderRenderer};
use crate::llm::provider::LlmProvider;
use crate::scrape::{PageScraper, ScrapeSession};
use crate::service::hash::ContentHasher;

// --- LLM ---

pub enum Reply {
    Tokens(Vec<String>),
    /// Tokens, then the stream closes without `Done`.
    Truncated(Vec<String>),
    Fail(fn() -> LlmError),
}

impl Reply {
    pub fn tokens(tokens: &[&str]) -> Self {
        Reply::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }

    pub fn truncated(tokens: &[&str]) -> Self {
        Reply::Truncated(tokens.iter().map(|t| t.to_string()).collect())
    }
}

/// Provider that replays scripted replies in order and records requests.
///
/// Once the script is exhausted every call streams `default_tokens`.
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    default_tokens: Vec<String>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new(default_tokens: Vec<&str>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            default_tokens: default_tokens.into_iter().map(str::to_string).collect(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_replies(replies: Vec<Reply>) -> Self {
        let provider = Self::new(vec![]);
        provider.replies.lock().unwrap().extend(replies);
        provider
    }

    /// Handle to the requests seen so far; stays valid after boxing.
    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Tokens(self.default_tokens.clone()));
        Box::pin(async_stream::stream! {
            yield Ok(StreamEvent::Connected);
            match reply {
                Reply::Tokens(tokens) => {
                    for text in tokens {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    yield Ok(StreamEvent::MessageDelta { stop_reason: StopReason::EndTurn });
                    yield Ok(StreamEvent::Done);
                }
                Reply::Truncated(tokens) => {
                    for text in tokens {
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                }
                Reply::Fail(make_error) => {
                    yield Err(make_error());
                }
            }
        })
    }
}

/// Provider whose stream never produces a token.
pub struct StalledProvider;

impl LlmProvider for StalledProvider {
    fn name(&self) -> &str {
        "stalled"
    }

    fn stream(
        &self,
        _request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        Box::pin(futures_util::stream::pending())
    }
}

// --- Artifact store ---

/// Artifact store backed by a map of relative path -> bytes.
pub struct MemoryStore {
    document_name: String,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    document_writes: AtomicUsize,
    resets: AtomicUsize,
}

impl MemoryStore {
    pub fn new(document_name: &str) -> Self {
        Self {
            document_name: document_name.to_string(),
            files: Mutex::new(BTreeMap::new()),
            document_writes: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
        }
    }

    pub fn with_document(document_name: &str, content: &str) -> Self {
        let store = Self::new(document_name);
        store
            .files
            .lock()
            .unwrap()
            .insert(document_name.to_string(), content.as_bytes().to_vec());
        store
    }

    pub fn asset(&self, filename: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(&format!("assets/{filename}"))
            .cloned()
    }

    pub fn document(&self) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(&self.document_name)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn document_writes(&self) -> usize {
        self.document_writes.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl ArtifactStore for MemoryStore {
    fn document_name(&self) -> &str {
        &self.document_name
    }

    async fn reset(&self) -> Result<(), ArtifactError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.files.lock().unwrap().clear();
        Ok(())
    }

    async fn write_document(&self, content: &str) -> Result<(), ArtifactError> {
        self.document_writes.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .insert(self.document_name.clone(), content.as_bytes().to_vec());
        Ok(())
    }

    async fn read_document(&self) -> Result<Option<String>, ArtifactError> {
        Ok(self.document())
    }

    async fn write_asset(&self, filename: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        self.files
            .lock()
            .unwrap()
            .insert(format!("assets/{filename}"), bytes.to_vec());
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<String>, ArtifactError> {
        Ok(self.files.lock().unwrap().keys().cloned().collect())
    }

    async fn read_file(&self, relative_path: &str) -> Result<String, ArtifactError> {
        if relative_path.split('/').any(|part| part == "..") {
            return Err(ArtifactError::InvalidPath(relative_path.to_string()));
        }
        self.files
            .lock()
            .unwrap()
            .get(relative_path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .ok_or_else(|| ArtifactError::NotFound(relative_path.to_string()))
    }
}

// --- Assets ---

/// Fetcher serving a fixed set of URLs; everything else is a 404.
pub struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockFetcher {
    pub fn serving(bodies: &[(&str, &str)]) -> Self {
        Self {
            bodies: bodies
                .iter()
                .map(|(url, body)| (url.to_string(), body.as_bytes().to_vec()))
                .collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl AssetFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        tokio::task::yield_now().await;
        self.bodies.get(url).cloned().ok_or(FetchError::Status(404))
    }
}

pub struct StubPlaceholder;

impl PlaceholderRenderer for StubPlaceholder {
    fn render(&self, filename: &str) -> Vec<u8> {
        format!("placeholder:{filename}").into_bytes()
    }
}

/// FNV-1a based stand-in for a cryptographic hasher.
pub struct FakeHasher;

impl ContentHasher for FakeHasher {
    fn compute_hash(&self, content: &str) -> String {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in content.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        format!("{hash:016x}{:016x}", hash.rotate_left(17))
    }
}

// --- Scraper ---

/// Scraper returning canned content and recording each call by name.
#[derive(Clone)]
pub struct MockScraper {
    pub markup: String,
    pub screenshot: Option<Vec<u8>>,
    pub fail_navigation: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockScraper {
    pub fn serving(markup: &str) -> Self {
        Self {
            markup: markup.to_string(),
            screenshot: Some(b"PNGDATA".to_vec()),
            fail_navigation: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

impl PageScraper for MockScraper {
    type Session = MockScraper;

    async fn connect(&self) -> Result<Self::Session, ScrapeError> {
        self.record("connect");
        Ok(self.clone())
    }
}

impl ScrapeSession for MockScraper {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.record("navigate");
        if self.fail_navigation {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn screenshot(&mut self, _url: &str, _full_page: bool) -> Result<Vec<u8>, ScrapeError> {
        self.record("screenshot");
        self.screenshot
            .clone()
            .ok_or(ScrapeError::Unsupported("screenshot"))
    }

    async fn inspect_dom(
        &mut self,
        _url: &str,
        _selector: &str,
        _include_children: bool,
        _include_styles: bool,
    ) -> Result<String, ScrapeError> {
        self.record("inspect_dom");
        Ok(self.markup.clone())
    }

    async fn analyze_page(
        &mut self,
        _url: &str,
        _map_elements: bool,
        _full_page: bool,
    ) -> Result<String, ScrapeError> {
        self.record("analyze_page");
        Ok("title: Example".to_string())
    }

    async fn disconnect(self) -> Result<(), ScrapeError> {
        self.record("disconnect");
        Ok(())
    }
}

// --- Observer ---

/// Collect every event currently buffered (the sender side must be dropped
/// or finished).
pub async fn drain(rx: &mut mpsc::Receiver<NotificationEvent>) -> Vec<NotificationEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub async fn drain_logs(rx: &mut mpsc::Receiver<NotificationEvent>) -> Vec<String> {
    drain(rx)
        .await
        .into_iter()
        .filter_map(|event| match event {
            NotificationEvent::Log { message } => Some(message),
            _ => None,
        })
        .collect()
}
