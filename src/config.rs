//! Memory settings and the builtin extraction rule table

use serde::{Deserialize, Serialize};

use crate::memory::fact::FactType;

/// Behavior settings for the memory core.
///
/// The host owns where settings live; the engine only reads them. All
/// numeric fields are range-clamped through [`MemorySettings::sanitized`],
/// applied when an engine is constructed or its settings are replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemorySettings {
    /// Master switch; when off, nothing is extracted or injected
    pub enabled: bool,
    /// Extract facts from incoming user messages
    pub auto_extract: bool,
    /// Upper bound on facts per injection block
    pub max_items: usize,
    /// Context depth at which the host should place the injection
    pub depth: u32,
    /// Rank facts against the latest user message instead of taking the
    /// chronological tail
    pub relevance: bool,
    /// Include the recency term in relevance scoring
    pub recency_bonus: bool,
    /// Render the injection block in multi-party conversations (which never
    /// own the store)
    pub inject_in_groups: bool,
    /// Enable the opt-in experience rule family
    pub experience_rules: bool,
    /// Minimum extracted payload length in characters; shorter spans are
    /// dropped
    pub min_value_len: usize,
    /// Maximum value length in characters; longer values are truncated with
    /// an ellipsis marker
    pub max_value_len: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_extract: true,
            max_items: 12,
            depth: 1,
            relevance: true,
            recency_bonus: true,
            inject_in_groups: false,
            experience_rules: false,
            min_value_len: 1,
            max_value_len: 60,
        }
    }
}

impl MemorySettings {
    /// Clamp all numeric fields into their supported ranges.
    pub fn sanitized(mut self) -> Self {
        self.max_items = self.max_items.clamp(1, 50);
        self.depth = self.depth.min(20);
        self.min_value_len = self.min_value_len.max(1);
        self.max_value_len = self.max_value_len.clamp(self.min_value_len, 400);
        self
    }
}

/// Settings toggle gating an opt-in rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleToggle {
    /// `experience_rules`
    ExperienceRules,
}

impl RuleToggle {
    /// Whether the gated rule family is enabled under the given settings.
    pub fn enabled_in(&self, settings: &MemorySettings) -> bool {
        match self {
            RuleToggle::ExperienceRules => settings.experience_rules,
        }
    }
}

/// A declarative extraction rule descriptor.
///
/// Rules are consumed by one generic matching loop in the extractor; table
/// order is the presentation tie-break (first rule wins a duplicated merge
/// key within one extraction call) but never fact identity.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    /// Stable rule name, stamped as the extracted fact's `source`
    pub name: String,
    /// Pattern matched against the normalized utterance
    pub pattern: String,
    /// Fact type of produced candidates
    pub fact_type: FactType,
    /// Base confidence of produced candidates
    pub confidence: f32,
    /// Tags stamped on produced candidates
    pub tags: Vec<String>,
    /// Index of the capture group holding the payload span
    pub capture: usize,
    /// Fixed rendering prefix; fact value = prefix + clipped payload
    pub prefix: String,
    /// Payloads matching this pattern are skipped (best-effort anti-overlap
    /// with an earlier, more specific rule family)
    pub veto: Option<String>,
    /// Settings toggle gating this rule, if it is opt-in
    pub opt_in: Option<RuleToggle>,
}

fn rule(
    name: &str,
    pattern: &str,
    fact_type: FactType,
    confidence: f32,
    tags: &[&str],
    prefix: &str,
) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        pattern: pattern.to_string(),
        fact_type,
        confidence,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        capture: 1,
        prefix: prefix.to_string(),
        veto: None,
        opt_in: None,
    }
}

/// Character class for payload spans: stop at sentence punctuation, commas
/// and newlines, bounded at 60 characters in-pattern.
const PAYLOAD: &str = r"([^。！？!?，,、\n]{1,60})";

/// Want-phrase markers, used both by the want rule and as the plan rule's
/// anti-overlap veto.
const WANT_VERBS: &str = "想要|想買|想入手|想得到|想收到";

/// The builtin extraction rule table (Traditional-Chinese first-person
/// statement rules).
pub fn default_extraction_rules() -> Vec<RuleSpec> {
    vec![
        rule(
            "like",
            &format!(r"(?:我|俺|本人)\s*(?:很|超|非常|最)?\s*(?:喜歡|喜愛|愛|偏好)\s*{PAYLOAD}"),
            FactType::PreferenceLike,
            0.75,
            &["preference"],
            "使用者喜歡：",
        ),
        rule(
            "dislike",
            &format!(r"(?:我|俺|本人)\s*(?:很|超|非常|最)?\s*(?:不喜歡|討厭|不愛|雷)\s*{PAYLOAD}"),
            FactType::PreferenceDislike,
            0.75,
            &["boundary"],
            "使用者不喜歡：",
        ),
        rule(
            "interest",
            &format!(r"(?:我|俺|本人)\s*(?:最近在|在|對)?\s*(?:學|研究|玩|看|追|有興趣)\s*{PAYLOAD}"),
            FactType::Interest,
            0.65,
            &["interest"],
            "使用者的興趣/在做：",
        ),
        rule(
            "want",
            &format!(r"(?:我|俺|本人)\s*(?:很|超|非常)?\s*(?:{WANT_VERBS})\s*{PAYLOAD}"),
            FactType::Want,
            0.7,
            &["want"],
            "使用者想要：",
        ),
        RuleSpec {
            veto: Some(format!("(?:{WANT_VERBS})")),
            ..rule(
                "plan",
                &format!(r"(?:我|俺|本人)\s*(?:打算|計畫|計劃|準備)\s*{PAYLOAD}"),
                FactType::GoalPlan,
                0.7,
                &["goal"],
                "使用者打算：",
            )
        },
        rule(
            "habit",
            &format!(r"(?:我|俺|本人)\s*(?:每天|每週|常常|習慣|通常|總是)\s*{PAYLOAD}"),
            FactType::Habit,
            0.6,
            &["habit"],
            "使用者的習慣：",
        ),
        rule(
            "skill_role",
            &format!(r"(?:我|俺|本人)\s*(?:擔任|從事|會|是)\s*{PAYLOAD}"),
            FactType::SkillRole,
            0.6,
            &["skill"],
            "使用者會/是：",
        ),
        rule(
            "relationship",
            r"(?:我|俺|本人)的\s*((?:爸爸|媽媽|哥哥|姊姊|弟弟|妹妹|男友|女友|老公|老婆|朋友|同事|室友)[^。！？!?，,、\n]{0,50})",
            FactType::Relationship,
            0.6,
            &["relationship"],
            "使用者的人際：",
        ),
        rule(
            "boundary",
            &format!(r"(?:我|俺|本人)\s*(?:不想|不願意|不能接受|拒絕)\s*{PAYLOAD}"),
            FactType::Boundary,
            0.7,
            &["boundary"],
            "使用者的底線：",
        ),
        RuleSpec {
            opt_in: Some(RuleToggle::ExperienceRules),
            ..rule(
                "experience",
                &format!(r"(?:我|俺|本人)\s*(?:以前|曾經|小時候|過去)\s*{PAYLOAD}"),
                FactType::Experience,
                0.55,
                &["experience"],
                "使用者的經歷：",
            )
        },
        rule(
            "nickname",
            r"(?:叫我|我叫|稱呼我|你可以叫我)\s*([^\s。！？!?，,、\n]{1,30})",
            FactType::IdentityName,
            0.7,
            &["identity"],
            "使用者希望被稱呼為：",
        ),
    ]
}
