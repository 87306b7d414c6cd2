//! 话题分类：按固定顺序的正则匹配提问文本，首个命中的类别胜出，默认 general

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Whereabouts,
    Timeline,
    Relationship,
    Actions,
    Knowledge,
    Observations,
    Possessions,
    Emotions,
    General,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Whereabouts => "whereabouts",
            Topic::Timeline => "timeline",
            Topic::Relationship => "relationship",
            Topic::Actions => "actions",
            Topic::Knowledge => "knowledge",
            Topic::Observations => "observations",
            Topic::Possessions => "possessions",
            Topic::Emotions => "emotions",
            Topic::General => "general",
        }
    }

    /// 同话题，或属于可互相印证的话题对（whereabouts↔timeline，actions↔observations）
    pub fn is_comparable_with(&self, other: Topic) -> bool {
        *self == other
            || matches!(
                (*self, other),
                (Topic::Whereabouts, Topic::Timeline)
                    | (Topic::Timeline, Topic::Whereabouts)
                    | (Topic::Actions, Topic::Observations)
                    | (Topic::Observations, Topic::Actions)
            )
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static TOPIC_PATTERNS: LazyLock<Vec<(Topic, Regex)>> = LazyLock::new(|| {
    let table: &[(Topic, &str)] = &[
        (
            Topic::Whereabouts,
            r"\b(where|location|which room|were you (in|at)|went|place)\b",
        ),
        (
            Topic::Timeline,
            r"\b(when|what time|o'clock|before|after|during|midnight|hour|minutes?|\d{1,2}(:\d{2})?\s?(am|pm))\b",
        ),
        (
            Topic::Relationship,
            r"\b(relationship|friends?|married|husband|wife|lover|affair|enemy|enemies|get along|related|know (him|her|them) well)\b",
        ),
        (
            Topic::Actions,
            r"\b(what (were|was) you doing|what did you do|doing|touch(ed)?|took|take|moved?|hid|hide|open(ed)?|lock(ed)?|clean(ed)?)\b",
        ),
        (
            Topic::Knowledge,
            r"\b(know|knew|aware|heard about|tell me about|who)\b",
        ),
        (
            Topic::Observations,
            r"\b(see|saw|seen|notice(d)?|hear|heard|witness(ed)?|observe(d)?|spot(ted)?|look(ed)?)\b",
        ),
        (
            Topic::Possessions,
            r"\b(own|belong(s)?|yours|keys?|weapon|knife|gun|letter|possess|carry|pocket)\b",
        ),
        (
            Topic::Emotions,
            r"\b(feel|feeling|angry|upset|afraid|scared|nervous|happy|sad|hate|love|jealous)\b",
        ),
    ];
    table
        .iter()
        .filter_map(|(topic, pat)| match Regex::new(&format!("(?i){}", pat)) {
            Ok(re) => Some((*topic, re)),
            Err(e) => {
                tracing::error!(topic = topic.as_str(), error = %e, "invalid topic pattern");
                None
            }
        })
        .collect()
});

pub fn classify_topic(question: &str) -> Topic {
    TOPIC_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(question))
        .map(|(topic, _)| *topic)
        .unwrap_or(Topic::General)
}
