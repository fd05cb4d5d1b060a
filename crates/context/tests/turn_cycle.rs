//! End-to-end turn cycle: begin a turn, assemble the prompt, route the
//! call with fallback, append the response, compress when the history
//! outgrows its window.

use async_trait::async_trait;
use copperclaw_context::{CompressionPolicy, ContextAssembler, ContextConfig, StaticSystemPrompt};
use copperclaw_core::backend::{ChatBackend, ChatRequest, ChatResponse};
use copperclaw_core::error::ChatError;
use copperclaw_core::message::{Message, Role};
use copperclaw_core::session::SessionKey;
use copperclaw_providers::{ChatCall, FallbackRouter, ProviderEntry};
use copperclaw_session::SessionStore;
use std::sync::Arc;
use std::time::Duration;

struct FlakyBackend {
    id: String,
    fail_first: bool,
    calls: std::sync::Mutex<usize>,
}

impl FlakyBackend {
    fn new(id: &str, fail_first: bool) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            fail_first,
            calls: std::sync::Mutex::new(0),
        })
    }
}

#[async_trait]
impl ChatBackend for FlakyBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if self.fail_first && *calls == 1 {
            return Err(ChatError::RateLimited { retry_after_secs: 30 });
        }
        let turns = request
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        Ok(ChatResponse::text(
            format!("reply after {turns} user turns"),
            request.model,
        ))
    }
}

fn test_stack() -> (ContextAssembler, CompressionPolicy, FallbackRouter) {
    let config = ContextConfig {
        history_window: 3,
        ..ContextConfig::default()
    };
    let assembler = ContextAssembler::new(
        config.clone(),
        Arc::new(StaticSystemPrompt::new(
            "You are a personal assistant.",
            vec!["web_search".into()],
        )),
    );
    let policy = CompressionPolicy::new(&config);
    let router = FallbackRouter::new().with_retry_delay(Duration::ZERO);
    (assembler, policy, router)
}

#[tokio::test]
async fn a_full_turn_survives_a_flaky_primary() {
    let (assembler, _policy, router) = test_stack();
    router.register_provider(ProviderEntry::new(
        "primary",
        "model-a",
        0,
        FlakyBackend::new("primary", true),
    ));
    router.register_provider(ProviderEntry::new(
        "secondary",
        "model-b",
        1,
        FlakyBackend::new("secondary", false),
    ));

    let store = SessionStore::new();
    let key = SessionKey::new("web", "user-1");

    let mut turn = store.begin_turn(&key).await;
    turn.push(Message::user("what's the weather?"));

    let prompt = assembler.build_context(&turn);
    assert_eq!(prompt[0].role, Role::System);

    let result = router
        .execute_with_fallback(ChatCall::new(prompt))
        .await
        .unwrap();

    // Primary rate-limited, secondary carried the turn.
    assert_eq!(result.provider_id, "secondary");
    assert_eq!(result.attempts.len(), 2);
    assert_eq!(result.response.message.content, "reply after 1 user turns");

    turn.push(result.response.message);
    assert_eq!(turn.messages.len(), 2);
}

#[tokio::test]
async fn long_conversations_compress_and_keep_their_summary() {
    let (assembler, policy, router) = test_stack();
    router.register_provider(ProviderEntry::new(
        "primary",
        "model-a",
        0,
        FlakyBackend::new("primary", false),
    ));

    let store = SessionStore::new();
    let key = SessionKey::new("web", "user-2");

    // Run enough turns to outgrow twice the window of 3.
    for i in 0..4 {
        let mut turn = store.begin_turn(&key).await;
        turn.push(Message::user(format!("question {i}")));
        let prompt = assembler.build_context(&turn);
        let result = router
            .execute_with_fallback(ChatCall::new(prompt))
            .await
            .unwrap();
        turn.push(result.response.message);
    }

    let mut turn = store.begin_turn(&key).await;
    assert!(policy.needs_compression(&turn));

    let to_fold = policy.messages_for_compression(&turn);
    assert_eq!(to_fold.len(), turn.messages.len() - 3);
    // Stand-in for the summarizer collaborator.
    let summary = format!("{} earlier messages about questions", to_fold.len());
    assert!(policy.apply_compression(&mut turn, &summary));
    assert_eq!(turn.messages.len(), 3);

    // The next prompt carries the summary section plus the survivors.
    let prompt = assembler.build_context(&turn);
    assert!(
        prompt
            .iter()
            .any(|m| m.role == Role::System && m.content.contains("earlier messages"))
    );
    let history: Vec<_> = prompt.iter().filter(|m| m.role != Role::System).collect();
    assert_eq!(history.len(), 3);
}
