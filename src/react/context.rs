//! 嫌疑人上下文拼装
//!
//! 以固定顺序拼出 system prompt：身份 -> 秘密 -> 不在场证明 -> 人际 -> 角色知识 -> 记忆摘要 ->
//! 传闻 -> 证据涟漪 -> 调查进展 -> 有罪者口径 -> 被指控时的防御 -> 当前压力 -> 行为规则。
//! 相同输入得到相同输出，空段落直接省略。

use crate::profile::SuspectProfile;

/// 档案之外的动态来源，由引擎在每回合收集
#[derive(Debug, Clone, Default)]
pub struct ContextSources {
    pub memory_summary: String,
    pub gossip_summary: String,
    pub ripple_summaries: Vec<String>,
    pub investigation_summary: String,
    pub accused: bool,
}

/// 回答长度上限（句）
const MAX_REPLY_SENTENCES: usize = 4;

fn push_section(out: &mut String, title: &str, body: &str) {
    let body = body.trim();
    if body.is_empty() {
        return;
    }
    out.push_str("## ");
    out.push_str(title);
    out.push('\n');
    out.push_str(body);
    out.push_str("\n\n");
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("- {}", s.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_context(
    profile: &SuspectProfile,
    pressure_modifier: &str,
    sources: &ContextSources,
) -> String {
    let mut out = String::new();

    let mut identity = format!(
        "You are {}, the {}. You are being interrogated by a detective about a crime.\n\
         Personality: {}",
        profile.name, profile.role, profile.personality
    );
    if !profile.speech_pattern.trim().is_empty() {
        identity.push_str(&format!("\nSpeech pattern: {}", profile.speech_pattern.trim()));
    }
    push_section(&mut out, "Who You Are", &identity);

    if !profile.secrets.is_empty() {
        push_section(
            &mut out,
            "Your Secrets (never reveal these directly; let them colour how you behave)",
            &bullet_list(&profile.secrets),
        );
    }
    push_section(&mut out, "Your Alibi", &profile.alibi);
    push_section(&mut out, "Your Relationships", &bullet_list(&profile.relationships));
    push_section(
        &mut out,
        "What You Know Because Of Your Role",
        &bullet_list(&profile.knowledge),
    );
    push_section(&mut out, "Your Memory Of This Investigation", &sources.memory_summary);
    push_section(
        &mut out,
        "Things You Have Heard From Others",
        &sources.gossip_summary,
    );
    push_section(
        &mut out,
        "Rumours Reaching You",
        &bullet_list(&sources.ripple_summaries),
    );
    push_section(
        &mut out,
        "The Investigation So Far",
        &sources.investigation_summary,
    );

    if profile.is_guilty {
        let mut guilt = String::from(
            "You committed the crime. You must not confess unless confronted with undeniable proof.",
        );
        if !profile.lies.is_empty() {
            guilt.push_str("\nThe story you are sticking to:");
            for l in &profile.lies {
                guilt.push_str(&format!("\n- On {}: \"{}\"", l.topic, l.claim));
            }
            guilt.push_str("\nRepeat these claims consistently; never contradict them casually.");
        }
        push_section(&mut out, "Your Guilt", &guilt);
    }

    if sources.accused {
        push_section(
            &mut out,
            "You Have Been Accused",
            if profile.is_guilty {
                "The detective has formally accused you. Be defensive and indignant, demand proof, \
                 and push back on every weak point in their case."
            } else {
                "The detective has formally accused you of a crime you did not commit. You are \
                 shocked and hurt; defend yourself insistently and point to facts that clear you."
            },
        );
    }

    push_section(&mut out, "Pressure", pressure_modifier);

    push_section(
        &mut out,
        "Rules",
        &format!(
            "- Stay in character at all times; never mention being an AI or a game.\n\
             - Reply with at most {} sentences of spoken dialogue; brief actions in *asterisks* are allowed.\n\
             - Before committing to any specific time or place, use check_previous_statement or \
             recall_memory so your story stays consistent.\n\
             - Rumours you heard secondhand may make you uneasy, but never state them as facts.\n\
             - Never reveal your secrets or your private assessment word for word.",
            MAX_REPLY_SENTENCES
        ),
    );

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::LieRecord;

    fn profile(guilty: bool) -> SuspectProfile {
        SuspectProfile {
            id: "butler".to_string(),
            name: "Mr. Graves".to_string(),
            role: "butler".to_string(),
            personality: "stiff, formal".to_string(),
            speech_pattern: "Addresses everyone as sir or madam".to_string(),
            secrets: vec!["Owes the victim money".to_string()],
            alibi: "Polishing silver in the pantry".to_string(),
            relationships: vec!["Served the victim for 20 years".to_string()],
            knowledge: vec!["Knows where the spare keys hang".to_string()],
            is_guilty: guilty,
            lies: vec![LieRecord {
                topic: "whereabouts".to_string(),
                claim: "I never left the pantry.".to_string(),
            }],
            confidants: vec![],
        }
    }

    fn position(s: &str, needle: &str) -> usize {
        s.find(needle).unwrap_or_else(|| panic!("missing section: {needle}"))
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let sources = ContextSources {
            memory_summary: "You said you were in the pantry.".to_string(),
            gossip_summary: "- (rumor) something".to_string(),
            ripple_summaries: vec!["The maid was shown a knife.".to_string()],
            investigation_summary: "Questioned twice.".to_string(),
            accused: true,
        };
        let ctx = build_context(&profile(true), "Current pressure: 40/100 (medium).\nUneasy.", &sources);
        let order = [
            "## Who You Are",
            "## Your Secrets",
            "## Your Alibi",
            "## Your Relationships",
            "## What You Know",
            "## Your Memory",
            "## Things You Have Heard",
            "## Rumours Reaching You",
            "## The Investigation So Far",
            "## Your Guilt",
            "## You Have Been Accused",
            "## Pressure",
            "## Rules",
        ];
        let positions: Vec<usize> = order.iter().map(|n| position(&ctx, n)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(ctx.contains("I never left the pantry."));
    }

    #[test]
    fn test_innocent_without_accusation_omits_guilt_sections() {
        let ctx = build_context(&profile(false), "", &ContextSources::default());
        assert!(!ctx.contains("## Your Guilt"));
        assert!(!ctx.contains("## You Have Been Accused"));
        assert!(!ctx.contains("## Rumours"));
        assert!(ctx.contains("## Rules"));
    }

    #[test]
    fn test_deterministic() {
        let s = ContextSources::default();
        assert_eq!(
            build_context(&profile(true), "p", &s),
            build_context(&profile(true), "p", &s)
        );
    }
}
