//! 审讯引擎门面
//!
//! 一局游戏构造一次，持有所有共享账本（压力、证词、矛盾、传闻、记忆、独白）与回合编排器。
//! 同一嫌疑人的回合通过各自的异步互斥锁串行；不同嫌疑人的回合可以并发。
//! 矛盾检测在证词入账后放到后台任务里跑，不阻塞回复。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::core::{EngineError, TurnPhase};
use crate::interrogation::{
    classify_topic, prompt_modifier_for, Contradiction, ContradictionJudge, PressureLedger,
    PressureState, Statement,
};
use crate::memory::{
    summarize_entries, ConversationMemory, GossipEvent, GossipStore, MemoryEntry, MemoryKind,
    MemoryStore, Message,
};
use crate::observability;
use crate::profile::{Cast, SuspectProfile};
use crate::react::{build_context, ContextSources, InternalMonologue, MonologueLog, TurnOrchestrator, TurnResult};
use crate::social::SocialPropagator;

/// 一次完整审讯回合的产出
#[derive(Debug)]
pub struct TurnOutcome {
    pub suspect_id: String,
    pub reply: TurnResult,
    pub statement: Statement,
    /// 回合开始时结算后的压力
    pub pressure: PressureState,
    /// 后台矛盾检测；兜底回复不送检，为 None
    pub contradiction_check: Option<JoinHandle<Vec<Contradiction>>>,
}

pub struct InterrogationEngine {
    cast: Arc<Cast>,
    config: AppConfig,
    pressure: Arc<PressureLedger>,
    judge: Arc<ContradictionJudge>,
    social: Arc<SocialPropagator>,
    memory: Arc<dyn MemoryStore>,
    gossip: Arc<dyn GossipStore>,
    monologues: Arc<MonologueLog>,
    orchestrator: TurnOrchestrator,
    sessions: HashMap<String, AsyncMutex<ConversationMemory>>,
    accused: RwLock<HashSet<String>>,
    shutdown: CancellationToken,
}

impl InterrogationEngine {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        cast: Arc<Cast>,
        config: AppConfig,
        pressure: Arc<PressureLedger>,
        judge: Arc<ContradictionJudge>,
        social: Arc<SocialPropagator>,
        memory: Arc<dyn MemoryStore>,
        gossip: Arc<dyn GossipStore>,
        monologues: Arc<MonologueLog>,
        orchestrator: TurnOrchestrator,
    ) -> Self {
        let sessions = cast
            .ids()
            .map(|id| {
                (
                    id.to_string(),
                    AsyncMutex::new(ConversationMemory::new(config.interrogation.history_turns)),
                )
            })
            .collect();
        Self {
            cast,
            config,
            pressure,
            judge,
            social,
            memory,
            gossip,
            monologues,
            orchestrator,
            sessions,
            accused: RwLock::new(HashSet::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn cast(&self) -> &Cast {
        &self.cast
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 取消所有进行中的回合（之后开始的回合同样会被取消）
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// 完整回合：串行锁 -> 压力更新 -> 拼上下文 -> 工具循环（带总超时）-> 记录证词 -> 后台查矛盾
    pub async fn interrogate(
        &self,
        suspect_id: &str,
        message: &str,
        tactic_bonus: f64,
    ) -> Result<TurnOutcome, EngineError> {
        let cancel = self.shutdown.child_token();
        self.interrogate_with_cancel(suspect_id, message, tactic_bonus, &cancel)
            .instrument(observability::turn_span(suspect_id))
            .await
    }

    /// 同 interrogate，可由调用方中途取消；被取消的回合不写入证词账本与对话历史
    pub async fn interrogate_with_cancel(
        &self,
        suspect_id: &str,
        message: &str,
        tactic_bonus: f64,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, EngineError> {
        let profile = self.cast.get(suspect_id)?;
        let mut session = self.session(suspect_id)?.lock().await;

        let pressure = self
            .pressure
            .record_confrontation(suspect_id, Some(message), tactic_bonus);
        tracing::info!(
            suspect = suspect_id,
            pressure = pressure.level,
            category = pressure.category().as_str(),
            "interrogation turn started"
        );
        let modifier = prompt_modifier_for(pressure.level, profile.is_guilty);

        let (reply, statement, contradiction_check) = self
            .execute_turn(profile, message, session.messages(), &modifier, cancel)
            .await?;
        session.push_exchange(message, &reply.message);

        Ok(TurnOutcome {
            suspect_id: suspect_id.to_string(),
            reply,
            statement,
            pressure,
            contradiction_check,
        })
    }

    /// 单回合入口：调用方自带历史与压力指令。与 interrogate 共用该嫌疑人的串行锁，
    /// 问答同样追加到引擎的对话历史，写入证词账本与记忆，并在后台查矛盾。
    pub async fn run_turn(
        &self,
        suspect_id: &str,
        player_message: &str,
        history: &[Message],
        pressure_modifier: &str,
    ) -> Result<TurnResult, EngineError> {
        let profile = self.cast.get(suspect_id)?;
        let mut session = self.session(suspect_id)?.lock().await;
        let cancel = self.shutdown.child_token();
        let (reply, _, _) = self
            .execute_turn(profile, player_message, history, pressure_modifier, &cancel)
            .instrument(observability::turn_span(suspect_id))
            .await?;
        session.push_exchange(player_message, &reply.message);
        Ok(reply)
    }

    /// 引擎保存的该嫌疑人对话历史
    pub async fn history(&self, suspect_id: &str) -> Result<Vec<Message>, EngineError> {
        Ok(self.session(suspect_id)?.lock().await.messages().to_vec())
    }

    fn session(&self, suspect_id: &str) -> Result<&AsyncMutex<ConversationMemory>, EngineError> {
        self.sessions
            .get(suspect_id)
            .ok_or_else(|| EngineError::UnknownSuspect(suspect_id.to_string()))
    }

    async fn execute_turn(
        &self,
        profile: Arc<SuspectProfile>,
        message: &str,
        history: &[Message],
        pressure_modifier: &str,
        cancel: &CancellationToken,
    ) -> Result<(TurnResult, Statement, Option<JoinHandle<Vec<Contradiction>>>), EngineError> {
        let suspect_id = profile.id.clone();
        let sources = self.context_sources(&suspect_id);
        let system = build_context(&profile, pressure_modifier, &sources);
        tracing::debug!(suspect = %suspect_id, prompt_chars = system.len(), "context assembled");

        let turn_timeout = Duration::from_secs(self.config.interrogation.turn_timeout_secs.max(1));
        let run = self
            .orchestrator
            .run_turn(profile.clone(), message, history, &system, cancel);
        let reply = match tokio::time::timeout(turn_timeout, run).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    suspect = %suspect_id,
                    timeout_secs = turn_timeout.as_secs(),
                    "turn timed out, using fallback reply"
                );
                TurnResult::fallback(self.orchestrator.fallback_reply())
            }
        };

        let topic = classify_topic(message);
        self.memory.append(MemoryEntry::new(
            suspect_id.clone(),
            MemoryKind::Exchange,
            topic.as_str(),
            format!("Q: {} A: {}", message, reply.message),
        ));
        let statement = self
            .judge
            .ledger()
            .record(&suspect_id, &profile.name, message, &reply.message);
        tracing::info!(
            suspect = %suspect_id,
            phase = %TurnPhase::Recorded,
            topic = %statement.topic,
            tools = ?reply.tools_used,
            fallback = reply.fallback,
            "turn recorded"
        );

        let contradiction_check = if reply.fallback {
            None
        } else {
            let judge = self.judge.clone();
            let new = statement.clone();
            Some(tokio::spawn(async move { judge.check_all(&new).await }))
        };

        Ok((reply, statement, contradiction_check))
    }

    fn context_sources(&self, suspect_id: &str) -> ContextSources {
        ContextSources {
            memory_summary: self.memory.summarize(suspect_id),
            gossip_summary: self.gossip_summary(suspect_id),
            ripple_summaries: self.social.ripples_affecting(suspect_id),
            investigation_summary: self.investigation_summary(suspect_id),
            accused: self.is_accused(suspect_id),
        }
    }

    /// 证据类传闻已经以涟漪摘要出现在上下文里，这里只保留其他传闻
    fn gossip_summary(&self, suspect_id: &str) -> String {
        let entries: Vec<_> = self
            .gossip
            .for_recipient(suspect_id)
            .into_iter()
            .filter(|e| e.event != GossipEvent::EvidenceShown)
            .collect();
        summarize_entries(&entries)
    }

    /// 嫌疑人对调查进展的感知：被问了几次、看过哪些证据、被揭穿过几次、牵涉自己的矛盾
    fn investigation_summary(&self, suspect_id: &str) -> String {
        let state = self.pressure.get(suspect_id);
        let mut lines = Vec::new();
        if state.confrontations > 0 {
            lines.push(format!(
                "The detective has questioned you {} time(s) so far.",
                state.confrontations
            ));
        }
        if !state.evidence_presented.is_empty() {
            lines.push(format!(
                "Evidence they have shown you: {}.",
                state
                    .evidence_presented
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        if state.contradictions_exposed > 0 {
            lines.push(format!(
                "They have caught you in a contradiction {} time(s).",
                state.contradictions_exposed
            ));
        }
        for c in self.judge.detected().iter().filter(|c| c.involves(suspect_id)) {
            let other = if c.statement1.suspect_id == suspect_id {
                &c.statement2
            } else {
                &c.statement1
            };
            lines.push(format!(
                "Your account conflicts with what {} said: \"{}\"",
                other.suspect_name, other.content
            ));
        }
        lines.join("\n")
    }

    pub fn pressure_state(&self, suspect_id: &str) -> Result<PressureState, EngineError> {
        self.cast.get(suspect_id)?;
        Ok(self.pressure.get(suspect_id))
    }

    pub fn all_pressure_states(&self) -> HashMap<String, PressureState> {
        self.pressure.all()
    }

    pub fn clear_pressure(&self, suspect_id: Option<&str>) {
        self.pressure.clear(suspect_id);
    }

    pub fn detected_contradictions(&self) -> Vec<Contradiction> {
        self.judge.detected()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.judge.ledger().all()
    }

    /// 清空证词、已裁决对与矛盾
    pub fn clear_statements(&self) {
        self.judge.clear();
    }

    /// 证据出示钩子：给当事人加证据压力，并沿知己图扩散传闻
    pub fn on_evidence_shown(
        &self,
        suspect_id: &str,
        evidence_id: &str,
        description: &str,
        reaction: &str,
    ) -> Result<PressureState, EngineError> {
        self.cast.get(suspect_id)?;
        let state = self.pressure.record_evidence_presented(suspect_id, evidence_id);
        self.social
            .propagate_evidence_shown(suspect_id, evidence_id, description, reaction);
        Ok(state)
    }

    /// 正式指控：之后该嫌疑人的上下文带上防御指令，知己会听到风声
    pub fn accuse(&self, suspect_id: &str) -> Result<(), EngineError> {
        self.cast.get(suspect_id)?;
        let newly = self
            .accused
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(suspect_id.to_string());
        if newly {
            self.social.propagate_accusation(suspect_id);
            tracing::info!(suspect = suspect_id, "suspect accused");
        }
        Ok(())
    }

    pub fn is_accused(&self, suspect_id: &str) -> bool {
        self.accused
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(suspect_id)
    }

    /// 用已发现的矛盾当面质问嫌疑人；矛盾不存在或与其无关时返回 None
    pub fn expose_contradiction(
        &self,
        suspect_id: &str,
        contradiction_id: &str,
    ) -> Result<Option<PressureState>, EngineError> {
        self.cast.get(suspect_id)?;
        match self.judge.find(contradiction_id) {
            Some(c) if c.involves(suspect_id) => {
                Ok(Some(self.pressure.record_contradiction_exposed(suspect_id)))
            }
            _ => {
                tracing::debug!(
                    suspect = suspect_id,
                    contradiction = contradiction_id,
                    "contradiction not found for suspect"
                );
                Ok(None)
            }
        }
    }

    pub fn monologues(&self, suspect_id: &str) -> Vec<InternalMonologue> {
        self.monologues.history(suspect_id)
    }

    /// 重开一局：清空所有账本、记忆、传闻、独白、指控与对话历史
    pub async fn reset_game(&self) {
        self.pressure.clear(None);
        self.judge.clear();
        self.social.clear();
        self.memory.clear();
        self.monologues.clear();
        self.accused
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        for session in self.sessions.values() {
            session.lock().await.clear();
        }
        tracing::info!("game reset");
    }
}
