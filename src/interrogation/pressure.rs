//! 压力账本：每个嫌疑人的审讯压力
//!
//! level 始终在 [0, 100]；衰减在读写时惰性计算（距上次结算超过 1 分钟才生效，按分钟线性），
//! 不会把记录删掉。所有修改都经过本模块的方法，证据去重在这里统一执行。

use std::collections::{BTreeSet, HashMap};
use std::sync::{LazyLock, RwLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::config::PressureSection;

pub const MIN_LEVEL: f64 = 0.0;
pub const MAX_LEVEL: f64 = 100.0;

/// 直接指控短语：命中任意一条即取最大增量
const DIRECT_ACCUSATIONS: &[&str] = &[
    "you did it",
    "you killed",
    "you're the killer",
    "you are the killer",
    "you murdered",
    "admit it",
    "confess",
    "you're lying",
    "you are lying",
    "i know you did",
];

/// 尖锐关键词：按命中的不同词数分档
const POINTED_KEYWORDS: &[&str] = &[
    "lie",
    "lying",
    "truth",
    "evidence",
    "proof",
    "witness",
    "blood",
    "weapon",
    "motive",
    "murder",
    "alibi",
    "hiding",
    "suspicious",
    "explain",
    "fingerprint",
    "saw you",
    "really",
    "why did you",
];

/// 按整词匹配，避免 "lie" 命中 "believe"
fn word_patterns(words: &[&str]) -> Vec<Regex> {
    words
        .iter()
        .filter_map(|w| match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(w))) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(keyword = *w, error = %e, "invalid pressure keyword");
                None
            }
        })
        .collect()
}

static DIRECT_ACCUSATION_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| word_patterns(DIRECT_ACCUSATIONS));

static POINTED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| word_patterns(POINTED_KEYWORDS));

/// (最少命中数, 增量)，从高到低
const POINTED_TIERS: &[(usize, f64)] = &[(4, 20.0), (3, 15.0), (2, 10.0), (1, 7.0)];

/// 压力分档：阈值 30 / 60 / 80
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureCategory {
    Low,
    Medium,
    High,
    Breaking,
}

impl PressureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PressureCategory::Low => "low",
            PressureCategory::Medium => "medium",
            PressureCategory::High => "high",
            PressureCategory::Breaking => "breaking",
        }
    }
}

pub fn category_of(level: f64) -> PressureCategory {
    if level < 30.0 {
        PressureCategory::Low
    } else if level < 60.0 {
        PressureCategory::Medium
    } else if level < 80.0 {
        PressureCategory::High
    } else {
        PressureCategory::Breaking
    }
}

/// 根据压力与是否有罪生成行为指令；high / breaking 两档有罪与无辜的指令截然不同
pub fn prompt_modifier_for(level: f64, is_guilty: bool) -> String {
    let directive = match (category_of(level), is_guilty) {
        (PressureCategory::Low, _) => {
            "You feel relaxed and in control. Answer naturally and stay composed."
        }
        (PressureCategory::Medium, true) => {
            "You are getting uneasy. Keep your story straight, choose words carefully, \
             and deflect questions that get too close."
        }
        (PressureCategory::Medium, false) => {
            "You are a little irritated by the questioning but have nothing to hide. \
             Answer plainly, perhaps a touch impatiently."
        }
        (PressureCategory::High, true) => {
            "You are rattled. Your answers grow shorter and more defensive, you over-explain \
             small details, and you may let a minor detail slip that does not quite fit your story."
        }
        (PressureCategory::High, false) => {
            "You feel wrongly targeted. Defend yourself firmly, insist on the facts you know, \
             and offer concrete details that could help the detective verify your account."
        }
        (PressureCategory::Breaking, true) => {
            "You are close to breaking. Your composure cracks: contradict yourself under \
             pressure, react emotionally to evidence, and let a self-incriminating detail slip, \
             though you still do not confess outright unless cornered with proof."
        }
        (PressureCategory::Breaking, false) => {
            "You are exhausted and frightened of being blamed. Become fully cooperative: \
             volunteer everything you saw or heard, including things you held back earlier, \
             and point the detective toward anything that could clear you."
        }
    };
    format!(
        "Current pressure: {:.0}/100 ({}).\n{}",
        level,
        category_of(level).as_str(),
        directive
    )
}

/// 根据提问的攻击性计算基础增量（不含 tactic_bonus）
pub fn question_delta(question: Option<&str>, cfg: &PressureSection) -> f64 {
    let Some(q) = question else {
        return cfg.base_delta;
    };
    if DIRECT_ACCUSATION_PATTERNS.iter().any(|re| re.is_match(q)) {
        return cfg.direct_accusation_delta;
    }
    let hits = POINTED_PATTERNS.iter().filter(|re| re.is_match(q)).count();
    POINTED_TIERS
        .iter()
        .find(|(min, _)| hits >= *min)
        .map(|(_, d)| *d)
        .unwrap_or(cfg.base_delta)
}

/// 单个嫌疑人的压力状态
#[derive(Clone, Debug, Serialize)]
pub struct PressureState {
    pub level: f64,
    pub confrontations: u32,
    pub evidence_presented: BTreeSet<String>,
    pub contradictions_exposed: u32,
    pub last_interaction_time: DateTime<Utc>,
    /// 衰减已结算到的时间点（读操作只推进它，不算交互）
    #[serde(skip)]
    decayed_through: DateTime<Utc>,
}

impl PressureState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            level: MIN_LEVEL,
            confrontations: 0,
            evidence_presented: BTreeSet::new(),
            contradictions_exposed: 0,
            last_interaction_time: now,
            decayed_through: now,
        }
    }

    pub fn category(&self) -> PressureCategory {
        category_of(self.level)
    }

    fn apply_decay(&mut self, now: DateTime<Utc>, per_minute: f64) {
        let minutes = (now - self.decayed_through).num_milliseconds() as f64 / 60_000.0;
        if minutes <= 1.0 {
            return;
        }
        self.level = (self.level - minutes * per_minute).clamp(MIN_LEVEL, MAX_LEVEL);
        self.decayed_through = now;
    }

    fn add(&mut self, delta: f64, now: DateTime<Utc>) {
        self.level = (self.level + delta).clamp(MIN_LEVEL, MAX_LEVEL);
        self.last_interaction_time = now;
        self.decayed_through = now;
    }
}

/// 压力账本：按嫌疑人 id 惰性建档
pub struct PressureLedger {
    states: RwLock<HashMap<String, PressureState>>,
    cfg: PressureSection,
}

impl PressureLedger {
    pub fn new(cfg: PressureSection) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            cfg,
        }
    }

    /// 在写锁内对某个嫌疑人的状态先衰减、再执行 f，返回修改后的快照
    fn with_state<F>(&self, suspect_id: &str, now: DateTime<Utc>, f: F) -> PressureState
    where
        F: FnOnce(&mut PressureState, &PressureSection),
    {
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        let state = states
            .entry(suspect_id.to_string())
            .or_insert_with(|| PressureState::new(now));
        state.apply_decay(now, self.cfg.decay_per_minute);
        f(state, &self.cfg);
        state.clone()
    }

    pub fn get(&self, suspect_id: &str) -> PressureState {
        self.get_at(suspect_id, Utc::now())
    }

    pub fn get_at(&self, suspect_id: &str, now: DateTime<Utc>) -> PressureState {
        self.with_state(suspect_id, now, |_, _| {})
    }

    pub fn record_confrontation(
        &self,
        suspect_id: &str,
        question: Option<&str>,
        tactic_bonus: f64,
    ) -> PressureState {
        self.record_confrontation_at(suspect_id, question, tactic_bonus, Utc::now())
    }

    pub fn record_confrontation_at(
        &self,
        suspect_id: &str,
        question: Option<&str>,
        tactic_bonus: f64,
        now: DateTime<Utc>,
    ) -> PressureState {
        let state = self.with_state(suspect_id, now, |s, cfg| {
            s.add(question_delta(question, cfg) + tactic_bonus, now);
            s.confrontations += 1;
        });
        tracing::debug!(suspect = suspect_id, level = state.level, "confrontation recorded");
        state
    }

    /// 同一证据对同一嫌疑人只加一次压力
    pub fn record_evidence_presented(&self, suspect_id: &str, evidence_id: &str) -> PressureState {
        self.record_evidence_presented_at(suspect_id, evidence_id, Utc::now())
    }

    pub fn record_evidence_presented_at(
        &self,
        suspect_id: &str,
        evidence_id: &str,
        now: DateTime<Utc>,
    ) -> PressureState {
        self.with_state(suspect_id, now, |s, cfg| {
            if s.evidence_presented.insert(evidence_id.to_string()) {
                s.add(cfg.evidence_delta, now);
            }
        })
    }

    /// 不去重：反复揭穿会叠加
    pub fn record_contradiction_exposed(&self, suspect_id: &str) -> PressureState {
        self.record_contradiction_exposed_at(suspect_id, Utc::now())
    }

    pub fn record_contradiction_exposed_at(
        &self,
        suspect_id: &str,
        now: DateTime<Utc>,
    ) -> PressureState {
        self.with_state(suspect_id, now, |s, cfg| {
            s.add(cfg.contradiction_delta, now);
            s.contradictions_exposed += 1;
        })
    }

    /// 所有已建档嫌疑人的快照（先结算衰减）
    pub fn all(&self) -> HashMap<String, PressureState> {
        let now = Utc::now();
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        states
            .iter_mut()
            .map(|(id, s)| {
                s.apply_decay(now, self.cfg.decay_per_minute);
                (id.clone(), s.clone())
            })
            .collect()
    }

    /// 清除单个嫌疑人或全部
    pub fn clear(&self, suspect_id: Option<&str>) {
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        match suspect_id {
            Some(id) => {
                states.remove(id);
            }
            None => states.clear(),
        }
    }
}

impl Default for PressureLedger {
    fn default() -> Self {
        Self::new(PressureSection::default())
    }
}
