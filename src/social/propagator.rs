//! 传闻传播：证据出示 / 指控发生在某个嫌疑人身上时，沿静态知己图扩散给相关的人
//!
//! 知己只获得二手印象（can_reference=false）：可以紧张、好奇，但不能把它当确知的事实说出来。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::memory::{GossipEntry, GossipEvent, GossipStore};
use crate::profile::Cast;

/// 涟漪记录上限，超出丢弃最旧的
const MAX_RIPPLES: usize = 100;

/// 静态知己图：嫌疑人 id -> 知己 id 列表（按剧本编写，不推导）
#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    adjacency: HashMap<String, Vec<String>>,
    names: HashMap<String, String>,
}

impl SocialGraph {
    pub fn new(adjacency: HashMap<String, Vec<String>>) -> Self {
        Self {
            adjacency,
            names: HashMap::new(),
        }
    }

    pub fn with_names(mut self, names: HashMap<String, String>) -> Self {
        self.names = names;
        self
    }

    pub fn from_cast(cast: &Cast) -> Self {
        Self::new(
            cast.profiles()
                .map(|p| (p.id.clone(), p.confidants.clone()))
                .collect(),
        )
        .with_names(cast.profiles().map(|p| (p.id.clone(), p.name.clone())).collect())
    }

    /// 传闻里用的称呼；没有登记名字时退回 id
    pub fn display_name<'a>(&'a self, suspect_id: &'a str) -> &'a str {
        self.names
            .get(suspect_id)
            .map(String::as_str)
            .unwrap_or(suspect_id)
    }

    pub fn confidants_of(&self, suspect_id: &str) -> &[String] {
        self.adjacency
            .get(suspect_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// 一次证据出示引起的涟漪
#[derive(Clone, Debug, Serialize)]
pub struct EvidenceRipple {
    pub evidence_id: String,
    pub evidence_description: String,
    pub shown_to: String,
    pub timestamp: DateTime<Utc>,
    pub reaction: String,
    pub spread_to: Vec<String>,
}

pub struct SocialPropagator {
    graph: SocialGraph,
    gossip: Arc<dyn GossipStore>,
    ripples: RwLock<Vec<EvidenceRipple>>,
}

impl SocialPropagator {
    pub fn new(graph: SocialGraph, gossip: Arc<dyn GossipStore>) -> Self {
        Self {
            graph,
            gossip,
            ripples: RwLock::new(Vec::new()),
        }
    }

    pub fn graph(&self) -> &SocialGraph {
        &self.graph
    }

    pub fn propagate_evidence_shown(
        &self,
        suspect_id: &str,
        evidence_id: &str,
        description: &str,
        reaction: &str,
    ) {
        let spread_to = self.graph.confidants_of(suspect_id).to_vec();
        let name = self.graph.display_name(suspect_id);
        let now = Utc::now();
        for confidant in &spread_to {
            self.gossip.enqueue(GossipEntry {
                about_suspect: suspect_id.to_string(),
                recipient: confidant.clone(),
                event: GossipEvent::EvidenceShown,
                summary: format!(
                    "Word is the detective showed {} something: {}.",
                    name, description
                ),
                can_reference: false,
                timestamp: now,
            });
        }
        tracing::info!(
            suspect = suspect_id,
            evidence = evidence_id,
            spread = spread_to.len(),
            "evidence ripple propagated"
        );
        let mut ripples = self.ripples.write().unwrap_or_else(|e| e.into_inner());
        ripples.push(EvidenceRipple {
            evidence_id: evidence_id.to_string(),
            evidence_description: description.to_string(),
            shown_to: suspect_id.to_string(),
            timestamp: now,
            reaction: reaction.to_string(),
            spread_to,
        });
        let n = ripples.len();
        if n > MAX_RIPPLES {
            ripples.drain(0..n - MAX_RIPPLES);
        }
    }

    /// 指控同样以传闻形式传给被指控者的知己
    pub fn propagate_accusation(&self, accused_id: &str) {
        let now = Utc::now();
        let name = self.graph.display_name(accused_id);
        for confidant in self.graph.confidants_of(accused_id) {
            self.gossip.enqueue(GossipEntry {
                about_suspect: accused_id.to_string(),
                recipient: confidant.clone(),
                event: GossipEvent::Accusation,
                summary: format!(
                    "You have heard whispers that the detective openly accused {}.",
                    name
                ),
                can_reference: false,
                timestamp: now,
            });
        }
    }

    /// 传到该嫌疑人的涟漪摘要（可读文本），用于拼入其上下文
    pub fn ripples_affecting(&self, suspect_id: &str) -> Vec<String> {
        self.ripples
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.spread_to.iter().any(|s| s == suspect_id))
            .map(|r| {
                let reaction = if r.reaction.trim().is_empty() {
                    String::new()
                } else {
                    format!(" They reportedly reacted: {}.", r.reaction.trim())
                };
                format!(
                    "You sense that {} was confronted with evidence ({}).{} You only know this \
                     secondhand; you may seem uneasy or curious, but do not state it as fact.",
                    self.graph.display_name(&r.shown_to),
                    r.evidence_description,
                    reaction
                )
            })
            .collect()
    }

    pub fn ripples(&self) -> Vec<EvidenceRipple> {
        self.ripples
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.ripples
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.gossip.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGossipStore;

    fn propagator() -> (Arc<InMemoryGossipStore>, SocialPropagator) {
        let mut adj = HashMap::new();
        adj.insert("butler".to_string(), vec!["maid".to_string(), "cook".to_string()]);
        adj.insert("maid".to_string(), vec!["butler".to_string()]);
        let mut names = HashMap::new();
        names.insert("butler".to_string(), "Mr. Graves".to_string());
        let gossip = Arc::new(InMemoryGossipStore::default());
        let p = SocialPropagator::new(SocialGraph::new(adj).with_names(names), gossip.clone());
        (gossip, p)
    }

    #[test]
    fn test_ripple_reaches_confidants_only() {
        let (gossip, p) = propagator();
        p.propagate_evidence_shown("butler", "knife", "a bloodied letter opener", "went pale");

        for c in ["maid", "cook"] {
            let r = p.ripples_affecting(c);
            assert_eq!(r.len(), 1);
            assert!(r[0].contains("a bloodied letter opener"));
            let g = gossip.for_recipient(c);
            assert_eq!(g.len(), 1);
            assert!(!g[0].can_reference);
            assert!(g[0].summary.contains("Mr. Graves"));
            assert!(r[0].starts_with("You sense that Mr. Graves"));
        }
        assert!(p.ripples_affecting("gardener").is_empty());
        assert!(p.ripples_affecting("butler").is_empty());
    }

    #[test]
    fn test_accusation_gossip() {
        let (gossip, p) = propagator();
        p.propagate_accusation("maid");
        let g = gossip.for_recipient("butler");
        assert_eq!(g.len(), 1);
        assert_eq!(g[0].event, GossipEvent::Accusation);
        assert!(gossip.summarize("butler").contains("rumor"));
        assert!(gossip.for_recipient("cook").is_empty());
    }

    #[test]
    fn test_ripples_are_bounded() {
        let (_, p) = propagator();
        for i in 0..MAX_RIPPLES + 5 {
            p.propagate_evidence_shown("butler", &format!("e{i}"), "a scrap", "");
        }
        let ripples = p.ripples();
        assert_eq!(ripples.len(), MAX_RIPPLES);
        assert_eq!(ripples[0].evidence_id, "e5");
    }

    #[test]
    fn test_clear() {
        let (gossip, p) = propagator();
        p.propagate_evidence_shown("butler", "knife", "knife", "");
        p.clear();
        assert!(p.ripples().is_empty());
        assert!(gossip.for_recipient("maid").is_empty());
    }
}
