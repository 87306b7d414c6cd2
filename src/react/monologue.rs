//! 内心独白：嫌疑人私下的自我评估
//!
//! 每个嫌疑人只保留最近 N 条（默认 10），只给展示层看，不会进入其他嫌疑人的上下文。

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 嫌疑人自评的威胁程度
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Safe,
    Concerning,
    Dangerous,
    Critical,
}

impl ThreatLevel {
    /// 返回给模型的行动指引：取决于威胁程度与是否有罪
    pub fn guidance(&self, is_guilty: bool) -> &'static str {
        match (self, is_guilty) {
            (ThreatLevel::Safe, true) => {
                "You feel in control. Keep your story simple and consistent with what you said before."
            }
            (ThreatLevel::Safe, false) => {
                "You have nothing to fear. Answer honestly and helpfully."
            }
            (ThreatLevel::Concerning, true) => {
                "Be careful. Stick exactly to your earlier claims and avoid volunteering new details."
            }
            (ThreatLevel::Concerning, false) => {
                "The questions are pointed, but the truth is on your side. Stay calm and clarify."
            }
            (ThreatLevel::Dangerous, true) => {
                "They are getting close. Deflect toward other people's suspicious behaviour, but do \
                 not invent a new alibi you cannot keep."
            }
            (ThreatLevel::Dangerous, false) => {
                "You are being suspected unfairly. Firmly restate your alibi and offer details the \
                 detective could verify."
            }
            (ThreatLevel::Critical, true) => {
                "Your story is crumbling. Emotion shows through and a small slip is possible, but \
                 do not confess outright."
            }
            (ThreatLevel::Critical, false) => {
                "You are frightened of being blamed. Cooperate fully and share anything that might \
                 point to the truth."
            }
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct InternalMonologue {
    pub suspect_id: String,
    pub thought: String,
    pub threat_level: ThreatLevel,
    pub strategy: String,
    pub timestamp: DateTime<Utc>,
}

/// 每个嫌疑人独立的有界独白历史
pub struct MonologueLog {
    entries: RwLock<HashMap<String, VecDeque<InternalMonologue>>>,
    capacity: usize,
}

impl MonologueLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, entry: InternalMonologue) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let list = entries.entry(entry.suspect_id.clone()).or_default();
        if list.len() == self.capacity {
            list.pop_front();
        }
        list.push_back(entry);
    }

    pub fn history(&self, suspect_id: &str) -> Vec<InternalMonologue> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(suspect_id)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, suspect_id: &str) -> Option<InternalMonologue> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(suspect_id)
            .and_then(|l| l.back().cloned())
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for MonologueLog {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(suspect: &str, thought: &str) -> InternalMonologue {
        InternalMonologue {
            suspect_id: suspect.to_string(),
            thought: thought.to_string(),
            threat_level: ThreatLevel::Concerning,
            strategy: "stay calm".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_history_bounded_per_suspect() {
        let log = MonologueLog::new(10);
        for i in 0..12 {
            log.record(entry("butler", &format!("t{i}")));
        }
        log.record(entry("maid", "only one"));
        let h = log.history("butler");
        assert_eq!(h.len(), 10);
        assert_eq!(h[0].thought, "t2");
        assert_eq!(log.latest("butler").unwrap().thought, "t11");
        assert_eq!(log.history("maid").len(), 1);
    }

    #[test]
    fn test_guidance_depends_on_guilt() {
        for level in [
            ThreatLevel::Safe,
            ThreatLevel::Concerning,
            ThreatLevel::Dangerous,
            ThreatLevel::Critical,
        ] {
            assert_ne!(level.guidance(true), level.guidance(false));
        }
    }

    #[test]
    fn test_threat_level_parses_lowercase() {
        let t: ThreatLevel = serde_json::from_str("\"dangerous\"").unwrap();
        assert_eq!(t, ThreatLevel::Dangerous);
    }
}
