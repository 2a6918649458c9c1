use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub database: DatabaseConfig,
    pub dataroom: DataroomConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
    pub analysis: AnalysisConfig,
    pub chat: ChatConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Retrieval index database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Project storage root
#[derive(Debug, Clone)]
pub struct DataroomConfig {
    pub root: PathBuf,
}

/// Generation model selection
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub name: String,
    pub temperature: f64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Langbase pipe name configuration
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub analysis: String,
    pub condense: String,
    pub chat: String,
}

/// Analysis orchestration tuning
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Passages retrieved per section query.
    pub top_k: usize,
    /// Passages (or partial summaries) combined per tree-summarize call.
    pub summary_fanout: usize,
    /// Upper bound on agents running at once.
    pub max_concurrent_agents: usize,
}

/// Conversation session tuning
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Memory cap in estimated tokens.
    pub memory_budget: usize,
    pub top_k: usize,
}

impl DataroomConfig {
    /// Directory holding a project's source documents.
    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    /// Directory holding a project's generated reports.
    pub fn results_dir(&self, project: &str) -> PathBuf {
        self.project_dir(project).join(RESULTS_DIR_NAME)
    }
}

/// Name of the per-project reports directory.
pub const RESULTS_DIR_NAME: &str = "results";

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/dataroom.db".to_string()),
            ),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5),
        };

        let dataroom = DataroomConfig {
            root: PathBuf::from(
                env::var("DATAROOM_PATH").unwrap_or_else(|_| "./dataroom".to_string()),
            ),
        };

        let model = ModelConfig {
            name: env::var("MODEL_NAME").unwrap_or_else(|_| "openai:gpt-4o".to_string()),
            temperature: env_parse("MODEL_TEMPERATURE", 0.1),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 30000),
            max_retries: env_parse("MAX_RETRIES", 3),
            retry_delay_ms: env_parse("RETRY_DELAY_MS", 1000),
        };

        let pipes = PipeConfig {
            analysis: env::var("PIPE_ANALYSIS")
                .unwrap_or_else(|_| "diligence-analysis-v1".to_string()),
            condense: env::var("PIPE_CONDENSE")
                .unwrap_or_else(|_| "diligence-condense-v1".to_string()),
            chat: env::var("PIPE_CHAT").unwrap_or_else(|_| "diligence-chat-v1".to_string()),
        };

        let analysis = AnalysisConfig {
            top_k: env_parse("RETRIEVAL_TOP_K", 5).max(1),
            summary_fanout: env_parse("SUMMARY_FANOUT", 5).max(2),
            max_concurrent_agents: env_parse("MAX_CONCURRENT_AGENTS", default_concurrency())
                .max(1),
        };

        let chat = ChatConfig {
            memory_budget: env_parse("CHAT_MEMORY_BUDGET", 1500),
            top_k: env_parse("CHAT_TOP_K", analysis.top_k).max(1),
        };

        Ok(Config {
            langbase,
            database,
            dataroom,
            model,
            logging,
            request,
            pipes,
            analysis,
            chat,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            analysis: "diligence-analysis-v1".to_string(),
            condense: "diligence-condense-v1".to_string(),
            chat: "diligence-chat-v1".to_string(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "openai:gpt-4o".to_string(),
            temperature: 0.1,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            summary_fanout: 5,
            max_concurrent_agents: default_concurrency(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            memory_budget: 1500,
            top_k: 5,
        }
    }
}
