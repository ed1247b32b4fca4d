//! Rule-based extraction of fact candidates from user utterances
//!
//! The Extractor applies a declarative rule table to the normalized text of
//! a user message and produces zero or more candidate Facts. Extraction is
//! deterministic (no LLM): identical input and settings yield an identical
//! candidate set, ignoring generated ids and timestamps.
//!
//! Candidates sharing a merge key within one extraction call collapse to
//! the first occurrence, by rule order then match order.

use regex::Regex;
use std::collections::HashSet;

use crate::config::{MemorySettings, RuleSpec, RuleToggle};
use crate::error::{Error, Result};
use crate::memory::fact::{Fact, FactBuilder, FactType};
use crate::normalize::{clip, normalize};

/// Rule-based extractor over a compiled rule table.
pub struct Extractor {
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    name: String,
    pattern: Regex,
    fact_type: FactType,
    confidence: f32,
    tags: Vec<String>,
    capture: usize,
    prefix: String,
    veto: Option<Regex>,
    opt_in: Option<RuleToggle>,
}

impl Extractor {
    /// Compile a rule table into an extractor.
    pub fn new(rules: Vec<RuleSpec>) -> Result<Self> {
        let compiled = rules
            .into_iter()
            .map(|spec| {
                let pattern = Regex::new(&spec.pattern).map_err(|e| {
                    Error::Rule(format!("Invalid pattern for rule '{}': {}", spec.name, e))
                })?;
                let veto = spec
                    .veto
                    .map(|v| {
                        Regex::new(&v).map_err(|e| {
                            Error::Rule(format!("Invalid veto for rule '{}': {}", spec.name, e))
                        })
                    })
                    .transpose()?;

                Ok(CompiledRule {
                    name: spec.name,
                    pattern,
                    fact_type: spec.fact_type,
                    confidence: spec.confidence,
                    tags: spec.tags,
                    capture: spec.capture,
                    prefix: spec.prefix,
                    veto,
                    opt_in: spec.opt_in,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules: compiled })
    }

    /// Extract candidate facts from a raw utterance.
    ///
    /// Returns an empty list when the normalized input is empty. Every
    /// enabled rule runs against the full text and may match repeatedly;
    /// one utterance can yield several facts of the same type.
    pub fn extract(&self, text: &str, settings: &MemorySettings) -> Vec<Fact> {
        let text = normalize(text);
        if text.is_empty() {
            return Vec::new();
        }

        let mut seen: HashSet<(FactType, String)> = HashSet::new();
        let mut candidates = Vec::new();

        for rule in &self.rules {
            if let Some(toggle) = &rule.opt_in {
                if !toggle.enabled_in(settings) {
                    continue;
                }
            }

            for caps in rule.pattern.captures_iter(&text) {
                let Some(span) = caps.get(rule.capture) else {
                    continue;
                };
                let Some(payload) =
                    clip(span.as_str(), settings.min_value_len, settings.max_value_len)
                else {
                    continue;
                };
                if let Some(veto) = &rule.veto {
                    if veto.is_match(&payload) {
                        continue;
                    }
                }

                let value = format!("{}{}", rule.prefix, payload);
                if !seen.insert((rule.fact_type, value.to_lowercase())) {
                    continue;
                }

                candidates.push(
                    FactBuilder::new(rule.fact_type)
                        .value(value)
                        .confidence(rule.confidence)
                        .tags(rule.tags.iter().cloned())
                        .source(rule.name.clone())
                        .build(),
                );
            }
        }

        candidates
    }
}
