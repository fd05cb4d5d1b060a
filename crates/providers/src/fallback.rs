//! Fallback router: ordered retry across registered providers.
//!
//! Holds a priority-sorted registry of (backend, model) pairs and walks
//! it strictly sequentially per call. A call with tools must never land
//! on two backends at once; that would double side effects and billing,
//! so there is no hedging and no parallelism here. First success wins,
//! non-retryable failures abort the walk, and exhaustion surfaces every
//! attempt in one aggregate error.
//!
//! The registry is an explicit handle the caller constructs and shares
//! (typically behind an `Arc`), not process-global state. Registration is
//! expected to finish before traffic starts.

use crate::classify::{ClassifiedError, classify_error};
use copperclaw_core::backend::{ChatBackend, ChatRequest, ChatResponse, ToolDefinition};
use copperclaw_core::error::ChatError;
use copperclaw_core::message::Message;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One registered fallback candidate.
#[derive(Clone)]
pub struct ProviderEntry {
    /// Unique provider ID (e.g. "openrouter", "anthropic-direct")
    pub id: String,

    /// Model requested from this backend
    pub model: String,

    /// Lower priority is tried earlier among non-preferred candidates
    pub priority: i32,

    /// The chat capability itself
    pub backend: Arc<dyn ChatBackend>,
}

impl ProviderEntry {
    pub fn new(
        id: impl Into<String>,
        model: impl Into<String>,
        priority: i32,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            priority,
            backend,
        }
    }
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("id", &self.id)
            .field("model", &self.model)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Record of a single attempt against one provider.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackAttempt {
    pub provider_id: String,
    pub model: String,
    pub success: bool,
    pub error: Option<ClassifiedError>,
    pub latency: Duration,
}

/// The outcome of a successful fallback execution: the winning response
/// plus the full attempt trail.
#[derive(Debug, Clone)]
pub struct FallbackResult {
    pub response: ChatResponse,
    pub provider_id: String,
    pub model: String,
    pub attempts: Vec<FallbackAttempt>,
    pub total_latency: Duration,
}

/// Observer invoked synchronously after every attempt, success or not.
pub type AttemptObserver = Box<dyn Fn(&FallbackAttempt) + Send + Sync>;

/// Parameters for one routed chat call.
pub struct ChatCall {
    /// The assembled prompt
    pub messages: Vec<Message>,

    /// Tools offered to the model
    pub tools: Vec<ToolDefinition>,

    /// Provider to try first, ahead of priority order
    pub preferred_provider: Option<String>,

    /// Per-attempt observer
    pub on_attempt: Option<AttemptObserver>,
}

impl ChatCall {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            preferred_provider: None,
            on_attempt: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_preferred_provider(mut self, id: impl Into<String>) -> Self {
        self.preferred_provider = Some(id.into());
        self
    }

    pub fn with_observer(mut self, observer: impl Fn(&FallbackAttempt) + Send + Sync + 'static) -> Self {
        self.on_attempt = Some(Box::new(observer));
        self
    }
}

/// Errors from fallback execution.
#[derive(Debug)]
pub enum FallbackError {
    /// The registry is empty.
    NoProviders,

    /// A provider failed in a way no other backend can fix; raised
    /// immediately without trying the rest.
    NonRetryable(ClassifiedError),

    /// Every candidate was tried and failed.
    Exhausted { attempts: Vec<FallbackAttempt> },
}

impl std::fmt::Display for FallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoProviders => write!(f, "No providers registered"),
            Self::NonRetryable(error) => write!(f, "{error}"),
            Self::Exhausted { attempts } => {
                let summary: Vec<String> = attempts
                    .iter()
                    .map(|a| {
                        let message = a
                            .error
                            .as_ref()
                            .map(|e| e.message.as_str())
                            .unwrap_or("unknown error");
                        format!("{}: {}", a.provider_id, message)
                    })
                    .collect();
                write!(f, "All providers failed: {}", summary.join("; "))
            }
        }
    }
}

impl std::error::Error for FallbackError {}

/// The fallback router. Construct once, register providers at startup,
/// then share behind an `Arc` for the lifetime of the process.
pub struct FallbackRouter {
    entries: RwLock<Vec<ProviderEntry>>,
    retry_delay: Duration,
    attempt_timeout: Option<Duration>,
}

impl Default for FallbackRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackRouter {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            retry_delay: Duration::from_millis(1000),
            attempt_timeout: None,
        }
    }

    /// Set the fixed delay between a retryable failure and the next
    /// candidate (default 1000ms).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Cap the wall-clock time of each individual attempt. Off by
    /// default; when set, an attempt that exceeds the cap is surfaced as
    /// a timeout failure and the walk continues.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Register a provider. Ids are unique: re-registering an id replaces
    /// its entry. The registry is re-sorted by priority on every
    /// registration; entries with equal priority keep their registration
    /// order.
    pub fn register_provider(&self, entry: ProviderEntry) {
        let mut entries = self.entries.write().unwrap();
        debug!(provider = %entry.id, model = %entry.model, priority = entry.priority, "Registered provider");
        entries.retain(|e| e.id != entry.id);
        entries.push(entry);
        entries.sort_by_key(|e| e.priority);
    }

    /// Whether any provider is registered.
    pub fn has_providers(&self) -> bool {
        !self.entries.read().unwrap().is_empty()
    }

    /// Snapshot of the registry in priority order.
    pub fn providers(&self) -> Vec<ProviderEntry> {
        self.entries.read().unwrap().clone()
    }

    /// Candidate order for one call: the preferred provider first (when
    /// registered), then the rest by priority with the preferred entry
    /// removed from its natural slot.
    fn candidates(&self, preferred: Option<&str>) -> Vec<ProviderEntry> {
        let entries = self.entries.read().unwrap();
        let mut out = Vec::with_capacity(entries.len());

        let preferred = preferred.and_then(|id| entries.iter().find(|e| e.id == id));
        if let Some(entry) = preferred {
            out.push(entry.clone());
        }
        for entry in entries.iter() {
            if preferred.is_none_or(|p| p.id != entry.id) {
                out.push(entry.clone());
            }
        }
        out
    }

    /// Execute one chat call with ordered fallback.
    ///
    /// Strictly sequential: at most one backend has the request in flight
    /// at any moment. Returns on the first success; aborts on the first
    /// non-retryable failure; otherwise waits the retry delay and moves
    /// to the next candidate until none remain.
    pub async fn execute_with_fallback(
        &self,
        call: ChatCall,
    ) -> Result<FallbackResult, FallbackError> {
        let candidates = self.candidates(call.preferred_provider.as_deref());
        if candidates.is_empty() {
            return Err(FallbackError::NoProviders);
        }

        let total_start = Instant::now();
        let mut attempts: Vec<FallbackAttempt> = Vec::new();
        let last = candidates.len() - 1;

        for (i, entry) in candidates.iter().enumerate() {
            info!(
                provider = %entry.id,
                model = %entry.model,
                attempt = i + 1,
                total = candidates.len(),
                "Fallback: trying provider"
            );

            let request = ChatRequest {
                model: entry.model.clone(),
                messages: call.messages.clone(),
                tools: call.tools.clone(),
            };

            let start = Instant::now();
            let outcome = self.attempt(entry, request).await;
            let latency = start.elapsed();

            match outcome {
                Ok(response) => {
                    let attempt = FallbackAttempt {
                        provider_id: entry.id.clone(),
                        model: entry.model.clone(),
                        success: true,
                        error: None,
                        latency,
                    };
                    if let Some(observer) = &call.on_attempt {
                        observer(&attempt);
                    }
                    attempts.push(attempt);

                    info!(
                        provider = %entry.id,
                        attempts = attempts.len(),
                        latency_ms = latency.as_millis() as u64,
                        "Fallback: provider succeeded"
                    );
                    return Ok(FallbackResult {
                        response,
                        provider_id: entry.id.clone(),
                        model: entry.model.clone(),
                        attempts,
                        total_latency: total_start.elapsed(),
                    });
                }
                Err(error) => {
                    let classified = classify_error(&error, &entry.id);
                    warn!(
                        provider = %entry.id,
                        kind = %classified.kind,
                        retryable = classified.retryable,
                        error = %classified.message,
                        "Fallback: provider failed"
                    );

                    let retryable = classified.retryable;
                    let attempt = FallbackAttempt {
                        provider_id: entry.id.clone(),
                        model: entry.model.clone(),
                        success: false,
                        error: Some(classified.clone()),
                        latency,
                    };
                    if let Some(observer) = &call.on_attempt {
                        observer(&attempt);
                    }
                    attempts.push(attempt);

                    if !retryable {
                        return Err(FallbackError::NonRetryable(classified));
                    }
                    if i < last {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(FallbackError::Exhausted { attempts })
    }

    async fn attempt(
        &self,
        entry: &ProviderEntry,
        request: ChatRequest,
    ) -> Result<ChatResponse, ChatError> {
        match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, entry.backend.chat(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ChatError::Timeout(format!(
                    "no response from '{}' after {}ms",
                    entry.id,
                    limit.as_millis()
                ))),
            },
            None => entry.backend.chat(request).await,
        }
    }
}
