//! Advisory task classification over free message text.
//!
//! Scores a message against per-tier keyword lists. The result is purely
//! informational and never feeds into a permission verdict.

use modegate_config::TierLists;
use modegate_core::RiskTier;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskClassification {
    pub tier: RiskTier,
    /// Share of keyword hits belonging to `tier`, in `[0, 1]`.
    pub confidence: f32,
    pub matched: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TaskClassifier {
    keywords: Vec<(RiskTier, Vec<String>)>,
}

impl TaskClassifier {
    pub fn new(lists: &TierLists) -> Self {
        let lower = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            keywords: vec![
                (RiskTier::High, lower(&lists.high)),
                (RiskTier::Medium, lower(&lists.medium)),
                (RiskTier::Low, lower(&lists.low)),
            ],
        }
    }

    /// Classify `text`. Ties go to the higher tier; no hits at all yields
    /// `Medium` with zero confidence.
    pub fn classify(&self, text: &str) -> TaskClassification {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric() && c != '_' && c != '-')
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let padded = format!(" {} ", words.join(" "));

        let mut total = 0usize;
        let mut best: Option<(RiskTier, usize)> = None;
        let mut matched = Vec::new();

        for (tier, keywords) in &self.keywords {
            let hits: Vec<&String> = keywords
                .iter()
                .filter(|k| padded.contains(&format!(" {k} ")))
                .collect();
            total += hits.len();
            // Tiers are visited highest first, so a strict `>` keeps ties high.
            if !hits.is_empty() && best.is_none_or(|(_, n)| hits.len() > n) {
                best = Some((*tier, hits.len()));
            }
            matched.extend(hits.into_iter().cloned());
        }

        match best {
            Some((tier, n)) => TaskClassification {
                tier,
                confidence: n as f32 / total as f32,
                matched,
            },
            None => TaskClassification {
                tier: RiskTier::Medium,
                confidence: 0.0,
                matched,
            },
        }
    }
}

impl Default for TaskClassifier {
    fn default() -> Self {
        Self::new(&modegate_config::AutonomyConfig::default().task_keywords)
    }
}
