//! Prompt templates for the feasibility assessment.
//!
//! A template is a system instruction plus a user message with two named
//! slots, `{topic}` and `{context}`. The built-in template is the startup
//! mentor persona; others can be loaded from TOML without touching the
//! pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::domain::Topic;
use crate::error::Error;

const TOPIC_SLOT: &str = "{topic}";
const CONTEXT_SLOT: &str = "{context}";

const FEASIBILITY_SYSTEM: &str = "你是一个专业、犀利、数据驱动的商业分析师。";

const FEASIBILITY_USER: &str = r#"【身份】你是一位拥有 20 年实战经验的资深创业导师，专为“雄心荟”个体创业者服务。你熟悉中国下沉市场、实体店逻辑和电商玩法。

【用户想做】"{topic}"

【全网情报】
{context}

【任务】请基于情报，撰写《项目可行性深度评测》。

【要求】
1. **拒绝废话**：用数据说话，犀利点评，不讲正确的废话。
2. **必须包含以下模块**：
   - 📊 **市场红蓝海**：用数据判断饱和度。
   - 💰 **算笔账**：预估客单价、毛利、盈亏平衡点、回本周期（必须给出估算数字）。
   - 🚚 **进货实操**：给出具体的平台名称（如1688关键词）、批发市场名字或APP。
   - ⚠️ **劝退指南**：直击痛点，什么样的人千万别干这个。
3. **结尾推荐**：给出 0-10 分的推荐指数，并一句话总结。
4. **格式**：使用 Markdown，排版清晰，多用 Emoji。
"#;

/// The two chat messages sent to the completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::feasibility()
    }
}

impl PromptTemplate {
    /// The startup-mentor feasibility template.
    pub fn feasibility() -> Self {
        Self {
            system: FEASIBILITY_SYSTEM.to_string(),
            user: FEASIBILITY_USER.to_string(),
        }
    }

    /// Build a template, rejecting a user message that lacks either slot.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Result<Self, Error> {
        let template = Self {
            system: system.into(),
            user: user.into(),
        };
        template.validate()?;
        Ok(template)
    }

    /// Parse a template from TOML with `system` and `user` keys.
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let template: PromptTemplate =
            toml::from_str(s).map_err(|e| Error::config(format!("Invalid prompt template: {}", e)))?;
        template.validate()?;
        Ok(template)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read prompt template {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), Error> {
        for slot in [TOPIC_SLOT, CONTEXT_SLOT] {
            if !self.user.contains(slot) {
                return Err(Error::config(format!(
                    "Prompt template user message must contain the {} slot",
                    slot
                )));
            }
        }
        Ok(())
    }

    pub fn render(&self, topic: &Topic, context: &Context) -> Prompt {
        Prompt {
            system: fill(&self.system, topic.as_str(), context.as_str()),
            user: fill(&self.user, topic.as_str(), context.as_str()),
        }
    }
}

/// Single-pass slot substitution: braces inside the substituted values are
/// copied through, never expanded again.
fn fill(template: &str, topic: &str, context: &str) -> String {
    let mut out = String::with_capacity(template.len() + topic.len() + context.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(TOPIC_SLOT) {
            out.push_str(topic);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(CONTEXT_SLOT) {
            out.push_str(context);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchResult;

    fn render(topic: &str, results: &[SearchResult]) -> Prompt {
        PromptTemplate::feasibility().render(&Topic::new(topic).unwrap(), &Context::assemble(results))
    }

    #[test]
    fn test_feasibility_prompt_sections() {
        let prompt = render("在三线城市开一家自助洗车店", &[SearchResult::new("行业", "数据")]);

        assert_eq!(prompt.system, "你是一个专业、犀利、数据驱动的商业分析师。");
        assert!(prompt.user.contains("在三线城市开一家自助洗车店"));
        assert!(prompt.user.contains("【来源：行业】数据"));
        for label in [
            "市场红蓝海",
            "饱和度",
            "客单价",
            "毛利",
            "盈亏平衡点",
            "回本周期",
            "进货实操",
            "劝退指南",
            "推荐指数",
            "Markdown",
        ] {
            assert!(prompt.user.contains(label), "missing section label {label}");
        }
    }

    #[test]
    fn test_sections_in_order() {
        let prompt = render("鲜花店", &[]);
        let positions: Vec<usize> = ["市场红蓝海", "算笔账", "进货实操", "劝退指南", "推荐指数"]
            .iter()
            .map(|label| prompt.user.find(label).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_context_still_renders() {
        let prompt = render("车位投资", &[]);
        assert!(prompt.user.contains("【全网情报】\n\n"));
        assert!(!prompt.user.contains(CONTEXT_SLOT));
    }

    #[test]
    fn test_fill_is_single_pass() {
        let filled = fill("A {topic} B {context} C {other}", "{context}", "x{topic}");
        assert_eq!(filled, "A {context} B x{topic} C {other}");
    }

    #[test]
    fn test_custom_template() {
        let template = PromptTemplate::new("You are a VC partner.", "Idea: {topic}\nNotes:\n{context}").unwrap();
        let prompt = template.render(
            &Topic::new("pet bakery").unwrap(),
            &Context::assemble(&[SearchResult::new("news", "demand rising")]),
        );
        assert_eq!(prompt.system, "You are a VC partner.");
        assert_eq!(prompt.user, "Idea: pet bakery\nNotes:\n【来源：news】demand rising");
    }

    #[test]
    fn test_template_requires_slots() {
        assert!(PromptTemplate::new("s", "only {topic}").is_err());
        assert!(PromptTemplate::new("s", "only {context}").is_err());
    }

    #[test]
    fn test_template_from_toml() {
        let toml = r#"
            system = "Be brief."
            user = """
            Topic: {topic}
            {context}
            """
        "#;
        let template = PromptTemplate::from_toml_str(toml).unwrap();
        assert_eq!(template.system, "Be brief.");
        assert!(template.user.contains("{topic}"));

        let err = PromptTemplate::from_toml_str("system = \"x\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
