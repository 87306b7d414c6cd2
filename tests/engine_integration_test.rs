//! 引擎集成测试：从名单文件构建引擎，用确定性的路由客户端跑完整的审讯流程

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alibi::llm::{Completion, LlmClient, LlmError, ToolCall, ToolDefinition};
use alibi::memory::Message;
use alibi::profile::Cast;
use alibi::{EngineBuilder, EngineError};
use async_trait::async_trait;
use serde_json::json;

const CAST: &str = r#"
title = "Test Manor"

[[suspect]]
id = "graves"
name = "Mr. Graves"
role = "butler"
personality = "stiff"
alibi = "In the pantry"
is_guilty = true
lies = [{ topic = "whereabouts", claim = "I never left the pantry." }]
confidants = ["alice"]

[[suspect]]
id = "alice"
name = "Alice"
role = "maid"
personality = "nervous"
alibi = "Upstairs"

[[suspect]]
id = "whitby"
name = "Colonel Whitby"
role = "guest"
personality = "loud"
alibi = "On the terrace"
"#;

/// 按 system prompt 路由：裁决提示返回「有矛盾」，嫌疑人提示先查一次旧口径再回答
#[derive(Default)]
struct RoutingLlm {
    judge_calls: AtomicUsize,
    systems: Mutex<HashMap<String, String>>,
}

impl RoutingLlm {
    fn last_system_for(&self, name: &str) -> String {
        self.systems
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for RoutingLlm {
    async fn complete(
        &self,
        system: &str,
        tools: &[ToolDefinition],
        messages: &[Message],
    ) -> Result<Completion, LlmError> {
        if system.contains("detective's assistant") {
            self.judge_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(Completion::text(
                r#"{"isContradiction": true, "severity": "major", "explanation": "Both cannot be true."}"#,
            ));
        }

        let speaker = if system.contains("You are Mr. Graves") {
            "Mr. Graves"
        } else if system.contains("You are Alice") {
            "Alice"
        } else {
            "Colonel Whitby"
        };
        self.systems
            .lock()
            .unwrap()
            .insert(speaker.to_string(), system.to_string());

        let already_observed = messages
            .last()
            .is_some_and(|m| m.content.starts_with("Observation from"));
        if !tools.is_empty() && !already_observed {
            return Ok(Completion::tools(vec![ToolCall {
                tool: "check_previous_statement".to_string(),
                args: json!({"topic": "whereabouts"}),
            }]));
        }
        let reply = match speaker {
            "Mr. Graves" => "I never left the pantry, sir.",
            "Alice" => "I saw Mr. Graves walking out of the study at eleven.",
            _ => "Hmph. Terrace. Cigar. That is all.",
        };
        Ok(Completion::text(reply))
    }
}

fn cast_from_tempfile() -> Cast {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CAST.as_bytes()).unwrap();
    Cast::load(file.path()).unwrap()
}

#[tokio::test]
async fn test_contradiction_between_suspects_is_detected_once() {
    let llm = Arc::new(RoutingLlm::default());
    let engine = EngineBuilder::new(cast_from_tempfile())
        .with_llm(llm.clone())
        .build();

    let first = engine
        .interrogate("graves", "Where were you at eleven?", 0.0)
        .await
        .unwrap();
    assert_eq!(first.reply.message, "I never left the pantry, sir.");
    assert_eq!(first.reply.tools_used, vec!["check_previous_statement".to_string()]);
    assert!(first.contradiction_check.unwrap().await.unwrap().is_empty());

    let second = engine
        .interrogate("alice", "Where were you last night?", 0.0)
        .await
        .unwrap();
    let found = second.contradiction_check.unwrap().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(llm.judge_calls.load(Ordering::SeqCst), 1);
    assert!(found[0].involves("graves") && found[0].involves("alice"));

    // 不同话题的问题不会产生候选对
    let third = engine
        .interrogate("whitby", "How do you feel about the victim?", 0.0)
        .await
        .unwrap();
    assert!(third.contradiction_check.unwrap().await.unwrap().is_empty());
    assert_eq!(llm.judge_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.detected_contradictions().len(), 1);

    let before = engine.pressure_state("graves").unwrap().level;
    let after = engine
        .expose_contradiction("graves", &found[0].id)
        .unwrap()
        .unwrap();
    assert!(after.level >= before + 19.9);
    assert_eq!(after.contradictions_exposed, 1);
    assert!(engine
        .expose_contradiction("whitby", &found[0].id)
        .unwrap()
        .is_none());

    // 之后的回合里，矛盾出现在当事人的调查进展中
    engine
        .interrogate("graves", "Anything to add?", 0.0)
        .await
        .unwrap();
    assert!(llm
        .last_system_for("Mr. Graves")
        .contains("Your account conflicts with what Alice said"));
}

#[tokio::test]
async fn test_evidence_ripple_reaches_confidant_context_only() {
    let llm = Arc::new(RoutingLlm::default());
    let engine = EngineBuilder::new(cast_from_tempfile())
        .with_llm(llm.clone())
        .build();

    engine
        .on_evidence_shown("graves", "study-key", "the study's spare key", "went pale")
        .unwrap();
    engine.interrogate("alice", "Hello again.", 0.0).await.unwrap();
    engine.interrogate("whitby", "Hello again.", 0.0).await.unwrap();

    let alice = llm.last_system_for("Alice");
    assert_eq!(alice.matches("the study's spare key").count(), 1);
    assert!(alice.contains("Mr. Graves was confronted with evidence"));
    assert!(alice.contains("secondhand"));
    assert!(!llm.last_system_for("Colonel Whitby").contains("spare key"));
}

#[tokio::test]
async fn test_turns_for_one_suspect_accumulate_history_and_memory() {
    let llm = Arc::new(RoutingLlm::default());
    let engine = EngineBuilder::new(cast_from_tempfile())
        .with_llm(llm.clone())
        .build();

    engine
        .interrogate("graves", "Where were you at eleven?", 0.0)
        .await
        .unwrap();
    engine
        .interrogate("graves", "Were you in the pantry?", 0.0)
        .await
        .unwrap();

    let state = engine.pressure_state("graves").unwrap();
    assert_eq!(state.confrontations, 2);
    assert_eq!(engine.statements().len(), 2);
    assert!(llm
        .last_system_for("Mr. Graves")
        .contains("The detective has questioned you 2 time(s)"));
}

#[tokio::test]
async fn test_concurrent_turns_for_different_suspects() {
    let llm = Arc::new(RoutingLlm::default());
    let engine = Arc::new(
        EngineBuilder::new(cast_from_tempfile())
            .with_llm(llm)
            .build(),
    );

    let handles: Vec<_> = ["graves", "alice", "whitby"]
        .into_iter()
        .map(|id| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.interrogate(id, "What did you see?", 0.0).await })
        })
        .collect();
    for h in handles {
        assert!(h.await.unwrap().is_ok());
    }
    assert_eq!(engine.statements().len(), 3);
    assert_eq!(engine.all_pressure_states().len(), 3);
}

#[tokio::test]
async fn test_unknown_suspect_surfaces_immediately() {
    let engine = EngineBuilder::new(cast_from_tempfile())
        .with_llm(Arc::new(RoutingLlm::default()))
        .build();
    let err = engine.interrogate("gardener", "Hello", 0.0).await;
    assert!(matches!(err, Err(EngineError::UnknownSuspect(_))));
    assert!(engine.statements().is_empty());
}
