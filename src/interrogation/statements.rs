//! 证词账本：只追加的有界环形缓冲（默认最近 100 条）
//!
//! 每条证词在创建时按提问定好话题，之后不可变。满了丢弃最旧的，不算错误。

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::interrogation::topic::{classify_topic, Topic};

/// 嫌疑人的一条证词
#[derive(Clone, Debug, Serialize)]
pub struct Statement {
    pub id: String,
    pub suspect_id: String,
    pub suspect_name: String,
    pub topic: Topic,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub player_question: String,
}

pub struct StatementLedger {
    statements: Mutex<VecDeque<Statement>>,
    capacity: usize,
}

impl StatementLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            statements: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn record(
        &self,
        suspect_id: &str,
        suspect_name: &str,
        question: &str,
        answer: &str,
    ) -> Statement {
        let statement = Statement {
            id: uuid::Uuid::new_v4().to_string(),
            suspect_id: suspect_id.to_string(),
            suspect_name: suspect_name.to_string(),
            topic: classify_topic(question),
            content: answer.to_string(),
            timestamp: Utc::now(),
            player_question: question.to_string(),
        };
        let mut statements = self.statements.lock().unwrap_or_else(|e| e.into_inner());
        if statements.len() == self.capacity {
            statements.pop_front();
        }
        statements.push_back(statement.clone());
        statement
    }

    /// 可能与新证词矛盾的旧证词：其他嫌疑人、话题相同或相关；新的在前
    ///
    /// 同一嫌疑人自己前后说法的一致性由 check_previous_statement 工具负责，不在这里配对。
    pub fn find_candidates(&self, new: &Statement) -> Vec<Statement> {
        let statements = self.statements.lock().unwrap_or_else(|e| e.into_inner());
        statements
            .iter()
            .rev()
            .filter(|s| s.id != new.id)
            .filter(|s| s.suspect_id != new.suspect_id)
            .filter(|s| new.topic.is_comparable_with(s.topic))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Statement> {
        self.statements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn by_suspect(&self, suspect_id: &str) -> Vec<Statement> {
        self.statements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|s| s.suspect_id == suspect_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.statements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.statements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for StatementLedger {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let ledger = StatementLedger::new(3);
        for i in 0..5 {
            ledger.record("s", "S", "Where were you?", &format!("answer {i}"));
        }
        let all = ledger.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].content, "answer 2");
        assert_eq!(all[2].content, "answer 4");
    }

    #[test]
    fn test_topic_fixed_at_record() {
        let ledger = StatementLedger::default();
        let s = ledger.record("s", "S", "What time did you go to bed?", "Around eleven.");
        assert_eq!(s.topic, Topic::Timeline);
    }

    #[test]
    fn test_candidates_exclude_same_suspect_and_unrelated_topics() {
        let ledger = StatementLedger::default();
        ledger.record("maid", "Ellie", "Where were you at nine?", "Upstairs.");
        ledger.record("cook", "Mrs. Hale", "What time did dinner end?", "Half past eight.");
        ledger.record("cook", "Mrs. Hale", "Are you upset?", "Terribly.");
        let own = ledger.record("butler", "Graves", "Where were you?", "In the pantry.");
        let new = ledger.record("butler", "Graves", "Where did you go after dinner?", "The pantry.");

        let candidates = ledger.find_candidates(&new);
        let ids: Vec<&str> = candidates.iter().map(|s| s.suspect_id.as_str()).collect();
        assert_eq!(ids, vec!["cook", "maid"]);
        assert!(candidates.iter().all(|s| s.id != own.id));
    }
}
