//! 矛盾裁决：廉价的话题配对先筛候选，再让对话模型逐对判断
//!
//! 每个无序证词对只问一次模型（规范化的排序键去重）；模型失败或输出不合规都按「无矛盾」处理，
//! 宁可漏报也不冤枉嫌疑人。

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interrogation::statements::{Statement, StatementLedger};
use crate::llm::LlmClient;
use crate::memory::Message;

const JUDGE_SYSTEM_PROMPT: &str = "You are a meticulous detective's assistant reviewing witness \
statements from a murder investigation. You decide whether two statements genuinely contradict \
each other, meaning both cannot be true at the same time. Differences in wording, vagueness, or \
one witness knowing less than another are NOT contradictions. Respond with a single JSON object \
and nothing else.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Significant,
    Major,
}

impl Severity {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "minor" => Some(Severity::Minor),
            "significant" => Some(Severity::Significant),
            "major" => Some(Severity::Major),
            _ => None,
        }
    }
}

/// 已确认的矛盾：记录后不可变，不再重新评估
#[derive(Clone, Debug, Serialize)]
pub struct Contradiction {
    pub id: String,
    pub statement1: Statement,
    pub statement2: Statement,
    pub explanation: String,
    pub severity: Severity,
    pub discovered_at: DateTime<Utc>,
}

impl Contradiction {
    pub fn involves(&self, suspect_id: &str) -> bool {
        self.statement1.suspect_id == suspect_id || self.statement2.suspect_id == suspect_id
    }
}

/// 模型返回的裁决对象
#[derive(Debug, Deserialize)]
struct Judgment {
    #[serde(rename = "isContradiction", alias = "is_contradiction")]
    is_contradiction: bool,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

/// 无序证词对的规范键
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

fn build_judge_prompt(a: &Statement, b: &Statement) -> String {
    format!(
        "Statement A\n- Speaker: {} ({})\n- Question asked: \"{}\"\n- Answer: \"{}\"\n- Topic: {}\n\n\
         Statement B\n- Speaker: {} ({})\n- Question asked: \"{}\"\n- Answer: \"{}\"\n- Topic: {}\n\n\
         Do these statements contradict each other?\n\
         Reply with exactly this JSON shape:\n\
         {{\"isContradiction\": true|false, \"severity\": \"minor\"|\"significant\"|\"major\", \
         \"explanation\": \"one short sentence\"}}",
        a.suspect_name,
        a.suspect_id,
        a.player_question,
        a.content,
        a.topic,
        b.suspect_name,
        b.suspect_id,
        b.player_question,
        b.content,
        b.topic,
    )
}

/// 从模型输出中取出首个 `{` 到末个 `}` 并解析；不合规返回 None
fn parse_judgment(content: &str) -> Option<(Severity, String)> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    let judgment: Judgment = serde_json::from_str(&content[start..=end]).ok()?;
    if !judgment.is_contradiction {
        return None;
    }
    let severity = Severity::parse(judgment.severity.as_deref()?)?;
    let explanation = judgment
        .explanation
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())?;
    Some((severity, explanation))
}

/// 矛盾裁决器：持有证词账本、模型客户端、已裁决键集合与已发现的矛盾
pub struct ContradictionJudge {
    llm: Arc<dyn LlmClient>,
    ledger: Arc<StatementLedger>,
    judged: Mutex<HashSet<String>>,
    detected: RwLock<Vec<Contradiction>>,
    max_pairs_per_check: usize,
}

impl ContradictionJudge {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        ledger: Arc<StatementLedger>,
        max_pairs_per_check: usize,
    ) -> Self {
        Self {
            llm,
            ledger,
            judged: Mutex::new(HashSet::new()),
            detected: RwLock::new(Vec::new()),
            max_pairs_per_check,
        }
    }

    pub fn ledger(&self) -> &Arc<StatementLedger> {
        &self.ledger
    }

    /// 认领一个证词对；已被认领（已裁决或正在裁决）返回 false
    fn claim(&self, key: &str) -> bool {
        self.judged
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string())
    }

    fn is_judged(&self, key: &str) -> bool {
        self.judged
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    /// 裁决一对证词；同一对只会问模型一次，失败也不重试
    pub async fn judge(&self, a: &Statement, b: &Statement) -> Option<Contradiction> {
        let key = pair_key(&a.id, &b.id);
        if !self.claim(&key) {
            return None;
        }

        let prompt = build_judge_prompt(a, b);
        let completion = match self
            .llm
            .complete(JUDGE_SYSTEM_PROMPT, &[], &[Message::user(prompt)])
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(pair = %key, error = %e, "contradiction judgment failed, treating as none");
                return None;
            }
        };

        let Some((severity, explanation)) = parse_judgment(&completion.content) else {
            tracing::debug!(pair = %key, output = %completion.content, "no contradiction (or malformed judgment)");
            return None;
        };

        let contradiction = Contradiction {
            id: uuid::Uuid::new_v4().to_string(),
            statement1: a.clone(),
            statement2: b.clone(),
            explanation,
            severity,
            discovered_at: Utc::now(),
        };
        tracing::info!(
            pair = %key,
            severity = ?contradiction.severity,
            a = %a.suspect_id,
            b = %b.suspect_id,
            "contradiction detected"
        );
        self.detected
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(contradiction.clone());
        Some(contradiction)
    }

    /// 对新证词跑一遍候选配对，最多裁决 max_pairs_per_check 对（顺序执行）
    pub async fn check_all(&self, new: &Statement) -> Vec<Contradiction> {
        let candidates: Vec<Statement> = self
            .ledger
            .find_candidates(new)
            .into_iter()
            .filter(|c| !self.is_judged(&pair_key(&new.id, &c.id)))
            .take(self.max_pairs_per_check)
            .collect();

        let mut found = Vec::new();
        for candidate in &candidates {
            if let Some(c) = self.judge(candidate, new).await {
                found.push(c);
            }
        }
        found
    }

    pub fn detected(&self) -> Vec<Contradiction> {
        self.detected
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn find(&self, contradiction_id: &str) -> Option<Contradiction> {
        self.detected
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|c| c.id == contradiction_id)
            .cloned()
    }

    /// 游戏重开：清空证词、已裁决键与矛盾
    pub fn clear(&self) {
        self.ledger.clear();
        self.judged
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.detected
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, LlmError, ScriptedLlmClient};

    const AFFIRM: &str = r#"{"isContradiction": true, "severity": "major", "explanation": "Both claim to be alone in different rooms at nine."}"#;

    fn setup(llm: Arc<ScriptedLlmClient>, max_pairs: usize) -> (Arc<StatementLedger>, ContradictionJudge) {
        let ledger = Arc::new(StatementLedger::default());
        let judge = ContradictionJudge::new(llm, ledger.clone(), max_pairs);
        (ledger, judge)
    }

    #[tokio::test]
    async fn test_whereabouts_conflict_judged_once() {
        let llm = Arc::new(ScriptedLlmClient::always(Ok(Completion::text(AFFIRM))));
        let (ledger, judge) = setup(llm.clone(), 5);
        ledger.record("maid", "Ellie", "Where were you at nine?", "In the library with the butler.");
        let new = ledger.record("butler", "Graves", "Where were you at nine?", "Alone in the pantry.");

        let found = judge.check_all(&new).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Major);
        assert!(found[0].involves("maid") && found[0].involves("butler"));
        assert_eq!(llm.call_count(), 1);

        // 同一证词再提交一次：不再问模型，也不重复记录
        assert!(judge.check_all(&new).await.is_empty());
        assert_eq!(llm.call_count(), 1);
        assert_eq!(judge.detected().len(), 1);

        // 反向直接裁决同一对也被去重
        let other = ledger.all()[0].clone();
        assert!(judge.judge(&new, &other).await.is_none());
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_or_failed_judgment_is_no_contradiction() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok(Completion::text("Yes, absolutely a contradiction!")),
            Ok(Completion::text(r#"{"isContradiction": true, "severity": "enormous", "explanation": "x"}"#)),
            Err(LlmError::Timeout),
        ]));
        let (ledger, judge) = setup(llm.clone(), 5);
        ledger.record("a", "A", "Where were you?", "Garden.");
        ledger.record("b", "B", "Where were you?", "Study.");
        ledger.record("c", "C", "Where were you?", "Cellar.");
        let new = ledger.record("d", "D", "Where were you?", "Attic.");

        assert!(judge.check_all(&new).await.is_empty());
        assert_eq!(llm.call_count(), 3);
        assert!(judge.detected().is_empty());
    }

    #[tokio::test]
    async fn test_negative_judgment_not_recorded() {
        let llm = Arc::new(ScriptedLlmClient::always(Ok(Completion::text(
            r#"{"isContradiction": false, "severity": "minor", "explanation": "Compatible."}"#,
        ))));
        let (ledger, judge) = setup(llm, 5);
        ledger.record("a", "A", "Where were you?", "Garden.");
        let new = ledger.record("b", "B", "Where were you?", "Also the garden.");
        assert!(judge.check_all(&new).await.is_empty());
    }

    #[tokio::test]
    async fn test_pairs_capped_per_check() {
        let llm = Arc::new(ScriptedLlmClient::always(Ok(Completion::text(AFFIRM))));
        let (ledger, judge) = setup(llm.clone(), 5);
        for i in 0..8 {
            ledger.record(&format!("s{i}"), "S", "Where were you?", "Somewhere.");
        }
        let new = ledger.record("z", "Z", "Where were you?", "Elsewhere.");
        assert_eq!(judge.check_all(&new).await.len(), 5);
        assert_eq!(llm.call_count(), 5);
        // 下一次只剩未裁决的 3 对
        assert_eq!(judge.check_all(&new).await.len(), 3);
        assert_eq!(judge.detected().len(), 8);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let llm = Arc::new(ScriptedLlmClient::always(Ok(Completion::text(AFFIRM))));
        let (ledger, judge) = setup(llm, 5);
        ledger.record("a", "A", "Where were you?", "Garden.");
        let new = ledger.record("b", "B", "Where were you?", "Study.");
        judge.check_all(&new).await;
        judge.clear();
        assert!(judge.detected().is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(pair_key("x", "y"), pair_key("y", "x"));
    }
}
