//! Advisory injection block rendering
//!
//! Pure, deterministic rendering of the selected facts into the text block
//! handed to the host's prompt-assembly mechanism. The block addresses a
//! single persona through the literal `{{char}}` placeholder, which the
//! host substitutes; the conversation transcript is never altered.

use crate::memory::fact::Fact;

/// Placeholder token the host substitutes with the addressed persona's
/// name.
pub const CHAR_PLACEHOLDER: &str = "{{char}}";

const HEADER_SCOPE: &str = "【權限：以下是 {{char}} 的私密內心筆記；NPC/旁白不得直接知道】";
const HEADER_KNOWN: &str = "【{{char}} 已知的使用者資訊（未列出=未知）】";
const FOOTER_GUIDANCE: &str = "【以上筆記僅供 {{char}} 參考，不得在對話中逐字複述】";
const EMPTY_PLACEHOLDER: &str = "- （尚無）";

/// Render the advisory block for the selected facts.
pub fn build_injection(selected: &[&Fact]) -> String {
    let mut lines = vec![HEADER_SCOPE.to_string(), HEADER_KNOWN.to_string()];

    if selected.is_empty() {
        lines.push(EMPTY_PLACEHOLDER.to_string());
    } else {
        for fact in selected {
            lines.push(format!("- {}", fact.value));
        }
    }

    lines.push(FOOTER_GUIDANCE.to_string());
    lines.join("\n")
}
