//! Shared fakes for integration tests.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dataroom_diligence::config::{
    AnalysisConfig, ChatConfig, Config, DatabaseConfig, DataroomConfig, LangbaseConfig, LogFormat,
    LoggingConfig, ModelConfig, PipeConfig, RequestConfig,
};
use dataroom_diligence::error::{LangbaseError, LangbaseResult, RetrievalError, RetrievalResult};
use dataroom_diligence::index::{IndexProvider, Passage, Retriever};
use dataroom_diligence::langbase::{Generator, MessageRole, PipeRequest};

/// Config rooted at `dataroom_root`, with small, deterministic tuning.
pub fn test_config(dataroom_root: &Path) -> Config {
    Config {
        langbase: LangbaseConfig {
            api_key: "test-key".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
        },
        database: DatabaseConfig {
            path: dataroom_root.join("index.db"),
            max_connections: 1,
        },
        dataroom: DataroomConfig {
            root: dataroom_root.to_path_buf(),
        },
        model: ModelConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        },
        request: RequestConfig {
            timeout_ms: 1000,
            max_retries: 0,
            retry_delay_ms: 1,
        },
        pipes: PipeConfig::default(),
        analysis: AnalysisConfig {
            top_k: 3,
            summary_fanout: 2,
            max_concurrent_agents: 2,
        },
        chat: ChatConfig {
            memory_budget: 1500,
            top_k: 3,
        },
    }
}

// ============================================================================
// Retrieval fakes
// ============================================================================

/// Returns the same passages for every query and records the queries.
#[derive(Default)]
pub struct StaticRetriever {
    passages: Vec<Passage>,
    queries: Mutex<Vec<String>>,
}

impl StaticRetriever {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<Passage>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}

/// Always fails.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> RetrievalResult<Vec<Passage>> {
        Err(RetrievalError::Query {
            message: "index unavailable".to_string(),
        })
    }
}

/// Serves fixed passages but fails any query mentioning `marker`.
pub struct FailingOnRetriever {
    passages: Vec<Passage>,
    marker: String,
}

impl FailingOnRetriever {
    pub fn new(marker: &str, passages: Vec<Passage>) -> Self {
        Self {
            passages,
            marker: marker.to_string(),
        }
    }
}

#[async_trait]
impl Retriever for FailingOnRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<Passage>> {
        if query.contains(&self.marker) {
            return Err(RetrievalError::Query {
                message: format!("index locked while answering '{}'", query),
            });
        }
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}

/// Fixed project -> retriever map.
#[derive(Default)]
pub struct FakeIndex {
    projects: HashMap<String, Arc<dyn Retriever>>,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: &str, retriever: Arc<dyn Retriever>) -> Self {
        self.projects.insert(project.to_string(), retriever);
        self
    }
}

#[async_trait]
impl IndexProvider for FakeIndex {
    async fn open_index(&self, project: &str) -> RetrievalResult<Arc<dyn Retriever>> {
        self.projects
            .get(project)
            .cloned()
            .ok_or_else(|| RetrievalError::ProjectNotFound {
                project: project.to_string(),
            })
    }
}

// ============================================================================
// Generation fakes
// ============================================================================

type Reply = dyn Fn(&PipeRequest) -> LangbaseResult<String> + Send + Sync;

/// Generator driven by a closure; records every request it sees.
pub struct ScriptedGenerator {
    reply: Box<Reply>,
    requests: Mutex<Vec<PipeRequest>>,
}

impl ScriptedGenerator {
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(&PipeRequest) -> LangbaseResult<String> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with the same text.
    pub fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Fails any request whose user content mentions `marker`, otherwise
    /// answers with `text`.
    pub fn failing_on(marker: &str, text: &str) -> Self {
        let marker = marker.to_string();
        let text = text.to_string();
        Self::new(move |request| {
            if last_user_content(request).contains(&marker) {
                Err(LangbaseError::Api {
                    status: 500,
                    message: format!("refused: {}", marker),
                })
            } else {
                Ok(text.clone())
            }
        })
    }

    pub fn requests(&self) -> Vec<PipeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, pipe: &str) -> Vec<PipeRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.name == pipe)
            .collect()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: PipeRequest) -> LangbaseResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        (self.reply)(&request)
    }
}

/// Records the peak number of `generate` calls in flight at once.
///
/// Every call holds for a while before answering, so calls that are able
/// to overlap do.
pub struct OverlapGenerator {
    hold: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl OverlapGenerator {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for OverlapGenerator {
    async fn generate(&self, _request: PipeRequest) -> LangbaseResult<String> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok("Done.".to_string())
    }
}

/// Content of the last user message in a request.
pub fn last_user_content(request: &PipeRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

/// Common passages about a solar company.
pub fn solar_passages() -> Vec<Passage> {
    vec![
        Passage::new("pitch.md", "Company X sells solar panels.", 2.0),
        Passage::new("financials.md", "Revenue grew 40% year over year.", 1.5),
        Passage::new("team.md", "The founders previously built two energy startups.", 1.0),
    ]
}
