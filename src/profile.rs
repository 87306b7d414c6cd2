//! 嫌疑人档案与名单
//!
//! 档案是编写好的内容（cast.toml），运行期只读。名单里找不到的 id 属于内容错误，
//! 以 EngineError::UnknownSuspect 直接返回给调用方。

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::core::EngineError;

/// 有罪嫌疑人预先编好的谎言：某个话题上对外的说法
#[derive(Debug, Clone, Deserialize)]
pub struct LieRecord {
    pub topic: String,
    pub claim: String,
}

/// 单个嫌疑人的私密档案
#[derive(Debug, Clone, Deserialize)]
pub struct SuspectProfile {
    pub id: String,
    pub name: String,
    pub role: String,
    pub personality: String,
    #[serde(default)]
    pub speech_pattern: String,
    #[serde(default)]
    pub secrets: Vec<String>,
    pub alibi: String,
    #[serde(default)]
    pub relationships: Vec<String>,
    /// 角色身份带来的知识（如管家知道钥匙放在哪）
    #[serde(default)]
    pub knowledge: Vec<String>,
    #[serde(default)]
    pub is_guilty: bool,
    #[serde(default)]
    pub lies: Vec<LieRecord>,
    /// 社交图中的知己：本人遇到的事会以传闻形式传给他们
    #[serde(default)]
    pub confidants: Vec<String>,
}

impl SuspectProfile {
    /// 该话题上预编的谎言（topic 子串匹配，大小写不敏感）
    pub fn lies_about(&self, topic: &str) -> Vec<&LieRecord> {
        let topic = topic.to_lowercase();
        self.lies
            .iter()
            .filter(|l| {
                let t = l.topic.to_lowercase();
                t.contains(&topic) || topic.contains(&t)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CastFile {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "suspect", default)]
    suspects: Vec<SuspectProfile>,
}

/// 嫌疑人名单：按 id 索引
#[derive(Debug, Clone, Default)]
pub struct Cast {
    pub title: Option<String>,
    suspects: BTreeMap<String, Arc<SuspectProfile>>,
}

impl Cast {
    pub fn new(profiles: Vec<SuspectProfile>) -> Self {
        Self {
            title: None,
            suspects: profiles
                .into_iter()
                .map(|p| (p.id.clone(), Arc::new(p)))
                .collect(),
        }
    }

    /// 从 TOML 文本解析（`[[suspect]]` 数组）
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let file: CastFile =
            toml::from_str(s).map_err(|e| EngineError::CastLoad(e.to_string()))?;
        let mut cast = Self::new(file.suspects);
        cast.title = file.title;
        cast.validate()?;
        Ok(cast)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| EngineError::CastLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&s)
    }

    /// 知己必须指向名单内的嫌疑人，且不能是自己
    fn validate(&self) -> Result<(), EngineError> {
        for p in self.suspects.values() {
            for c in &p.confidants {
                if c == &p.id || !self.suspects.contains_key(c) {
                    return Err(EngineError::CastLoad(format!(
                        "suspect '{}' lists invalid confidant '{}'",
                        p.id, c
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Arc<SuspectProfile>, EngineError> {
        self.suspects
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownSuspect(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.suspects.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<SuspectProfile>> {
        self.suspects.values()
    }

    pub fn len(&self) -> usize {
        self.suspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suspects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAST: &str = r#"
title = "Murder at Blackwood Manor"

[[suspect]]
id = "butler"
name = "Mr. Graves"
role = "butler"
personality = "stiff, formal"
alibi = "Polishing silver in the pantry from 8 to 10pm"
is_guilty = true
confidants = ["maid"]

[[suspect.lies]]
topic = "whereabouts"
claim = "I never left the pantry."

[[suspect]]
id = "maid"
name = "Ellie"
role = "maid"
personality = "nervous, chatty"
alibi = "Turning down beds upstairs"
"#;

    #[test]
    fn test_parse_cast() {
        let cast = Cast::from_toml_str(CAST).unwrap();
        assert_eq!(cast.len(), 2);
        assert_eq!(cast.title.as_deref(), Some("Murder at Blackwood Manor"));
        let butler = cast.get("butler").unwrap();
        assert!(butler.is_guilty);
        assert_eq!(butler.lies_about("Whereabouts").len(), 1);
        assert!(!cast.get("maid").unwrap().is_guilty);
    }

    #[test]
    fn test_unknown_suspect_is_error() {
        let cast = Cast::from_toml_str(CAST).unwrap();
        assert!(matches!(cast.get("cook"), Err(EngineError::UnknownSuspect(id)) if id == "cook"));
    }

    #[test]
    fn test_invalid_confidant_rejected() {
        let bad = CAST.replace("confidants = [\"maid\"]", "confidants = [\"ghost\"]");
        assert!(matches!(Cast::from_toml_str(&bad), Err(EngineError::CastLoad(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cast.toml");
        std::fs::write(&path, CAST).unwrap();
        assert_eq!(Cast::load(&path).unwrap().len(), 2);
    }
}
