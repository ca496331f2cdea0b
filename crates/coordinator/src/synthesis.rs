//! Merge successful agent results into one answer.

use conclave_common::{AgentExecutionResult, IntentCategory, IntentClassification};
use tracing::debug;

const SNIPPET_MIN_SENTENCE_CHARS: usize = 40;
const SNIPPET_PREFIX_CHARS: usize = 160;
const COLLABORATION_BOOST: f32 = 0.05;
const COLLABORATION_COMPLEXITY: f32 = 0.6;

const INSIGHTS_HEADER: &str = "**Additional insights**";

pub const REGULATORY_DISCLAIMER: &str = "_This analysis is informational only. Confirm regulatory \
    decisions with qualified regulatory affairs professionals and the relevant health authority._";

pub const CLINICAL_DISCLAIMER: &str = "_Clinical information is provided for research and planning \
    purposes only and is not medical advice._";

/// The merged answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub content: String,
    pub confidence: f32,
    pub contributors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResponseSynthesizer;

impl ResponseSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Anchor on the primary agent (or the first success when it failed) and
    /// append collaborator snippets. Returns `None` when nothing succeeded.
    pub fn synthesize(
        &self,
        results: &[AgentExecutionResult],
        primary_agent: &str,
        intent: &IntentClassification,
    ) -> Option<Synthesis> {
        let succeeded: Vec<&AgentExecutionResult> = results.iter().filter(|r| r.success).collect();

        let anchor = succeeded
            .iter()
            .find(|r| r.agent_id == primary_agent)
            .or_else(|| succeeded.first())
            .copied()?;

        let mut content = anchor.text().trim_end().to_string();

        let others: Vec<&AgentExecutionResult> = succeeded
            .iter()
            .filter(|r| r.agent_id != anchor.agent_id)
            .copied()
            .collect();

        if !others.is_empty() {
            content.push_str("\n\n---\n\n");
            content.push_str(INSIGHTS_HEADER);
            content.push('\n');
            for result in &others {
                content.push_str(&format!(
                    "\n- **{}**: {}",
                    result.agent_id,
                    snippet(result.text())
                ));
            }
        }

        let mut contributors = Vec::with_capacity(succeeded.len());
        contributors.push(anchor.agent_id.clone());
        contributors.extend(others.iter().map(|r| r.agent_id.clone()));

        let confidence = aggregate_confidence(&succeeded);
        let (content, confidence) = quality_pass(content, confidence, contributors.len(), intent);

        debug!(
            anchor = %anchor.agent_id,
            contributors = contributors.len(),
            confidence,
            "Synthesized response"
        );

        Some(Synthesis {
            content,
            confidence,
            contributors,
        })
    }
}

/// Mean of non-zero confidences; zero-confidence results still contribute
/// content but do not drag the average down.
fn aggregate_confidence(results: &[&AgentExecutionResult]) -> f32 {
    let scored: Vec<f32> = results
        .iter()
        .map(|r| r.confidence)
        .filter(|c| *c > 0.0)
        .collect();

    if scored.is_empty() {
        return 0.0;
    }
    scored.iter().sum::<f32>() / scored.len() as f32
}

fn quality_pass(
    mut content: String,
    mut confidence: f32,
    contributor_count: usize,
    intent: &IntentClassification,
) -> (String, f32) {
    let disclaimer = match intent.category {
        IntentCategory::Regulatory => Some(REGULATORY_DISCLAIMER),
        IntentCategory::Clinical => Some(CLINICAL_DISCLAIMER),
        _ => None,
    };

    if let Some(disclaimer) = disclaimer {
        if !content.contains(disclaimer) {
            content.push_str("\n\n");
            content.push_str(disclaimer);
        }
    }

    if contributor_count > 1 && intent.complexity > COLLABORATION_COMPLEXITY {
        confidence += COLLABORATION_BOOST;
    }

    (content, confidence.clamp(0.0, 1.0))
}

/// First sentence when it is long enough to stand alone, else a bounded prefix.
fn snippet(text: &str) -> String {
    let text = text.trim();

    if let Some((idx, ch)) = text.char_indices().find(|(_, c)| matches!(c, '.' | '!' | '?')) {
        let sentence = &text[..idx + ch.len_utf8()];
        if sentence.chars().count() >= SNIPPET_MIN_SENTENCE_CHARS {
            return sentence.to_string();
        }
    }

    if text.chars().count() > SNIPPET_PREFIX_CHARS {
        let prefix: String = text.chars().take(SNIPPET_PREFIX_CHARS).collect();
        format!("{}…", prefix.trim_end())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_common::ContextualFactors;

    fn intent(category: IntentCategory, complexity: f32) -> IntentClassification {
        IntentClassification {
            category,
            confidence: 0.5,
            subcategories: Vec::new(),
            key_terms: Vec::new(),
            complexity,
            factors: ContextualFactors::default(),
        }
    }

    fn ok(id: &str, content: &str, confidence: f32) -> AgentExecutionResult {
        AgentExecutionResult::succeeded(id, content, confidence, None)
    }

    #[test]
    fn single_result_round_trips() {
        let synthesis = ResponseSynthesizer::new()
            .synthesize(
                &[ok("general-advisor", "Plain answer.", 0.9)],
                "general-advisor",
                &intent(IntentCategory::General, 0.3),
            )
            .unwrap();

        assert_eq!(synthesis.content, "Plain answer.");
        assert!((synthesis.confidence - 0.9).abs() < 1e-6);
        assert_eq!(synthesis.contributors, vec!["general-advisor"]);
    }

    #[test]
    fn collaborators_appended_as_insights() {
        let results = vec![
            ok("a", "Primary analysis of the question.", 0.8),
            ok(
                "b",
                "Biostatistics suggests a group sequential design with two interim looks. More detail follows.",
                0.6,
            ),
        ];
        let synthesis = ResponseSynthesizer::new()
            .synthesize(&results, "a", &intent(IntentCategory::Research, 0.4))
            .unwrap();

        assert!(synthesis.content.starts_with("Primary analysis of the question."));
        assert!(synthesis.content.contains("---"));
        assert!(synthesis.content.contains(INSIGHTS_HEADER));
        assert!(synthesis.content.contains(
            "- **b**: Biostatistics suggests a group sequential design with two interim looks."
        ));
        assert!(!synthesis.content.contains("More detail follows"));
        assert!((synthesis.confidence - 0.7).abs() < 1e-6);
        assert_eq!(synthesis.contributors, vec!["a", "b"]);
    }

    #[test]
    fn failed_primary_anchors_on_first_success() {
        let results = vec![
            AgentExecutionResult::failed("a", "timeout"),
            ok("b", "Answer from b.", 0.5),
            ok("c", "Answer from c.", 0.7),
        ];
        let synthesis = ResponseSynthesizer::new()
            .synthesize(&results, "a", &intent(IntentCategory::General, 0.3))
            .unwrap();

        assert!(synthesis.content.starts_with("Answer from b."));
        assert_eq!(synthesis.contributors, vec!["b", "c"]);
    }

    #[test]
    fn nothing_succeeded_is_none() {
        let results = vec![AgentExecutionResult::failed("a", "down")];
        assert!(ResponseSynthesizer::new()
            .synthesize(&results, "a", &intent(IntentCategory::General, 0.3))
            .is_none());
    }

    #[test]
    fn zero_confidence_excluded_from_average() {
        let results = vec![ok("a", "One.", 0.8), ok("b", "Two.", 0.0)];
        let synthesis = ResponseSynthesizer::new()
            .synthesize(&results, "a", &intent(IntentCategory::General, 0.3))
            .unwrap();

        assert!((synthesis.confidence - 0.8).abs() < 1e-6);
        assert_eq!(synthesis.contributors, vec!["a", "b"]);
    }

    #[test]
    fn all_zero_confidence_is_zero() {
        let results = vec![ok("a", "One.", 0.0), ok("b", "Two.", 0.0)];
        let synthesis = ResponseSynthesizer::new()
            .synthesize(&results, "a", &intent(IntentCategory::General, 0.3))
            .unwrap();
        assert_eq!(synthesis.confidence, 0.0);
    }

    #[test]
    fn collaboration_boost_on_complex_queries() {
        let results = vec![ok("a", "One.", 0.6), ok("b", "Two.", 0.6)];
        let synthesis = ResponseSynthesizer::new()
            .synthesize(&results, "a", &intent(IntentCategory::Research, 0.7))
            .unwrap();
        assert!((synthesis.confidence - 0.65).abs() < 1e-6);

        let results = vec![ok("a", "One.", 0.98), ok("b", "Two.", 0.99)];
        let synthesis = ResponseSynthesizer::new()
            .synthesize(&results, "a", &intent(IntentCategory::Research, 0.9))
            .unwrap();
        assert_eq!(synthesis.confidence, 1.0);
    }

    #[test]
    fn disclaimers_appended_once() {
        let synthesizer = ResponseSynthesizer::new();

        let synthesis = synthesizer
            .synthesize(&[ok("a", "Regulatory view.", 0.7)], "a", &intent(IntentCategory::Regulatory, 0.3))
            .unwrap();
        assert!(synthesis.content.ends_with(REGULATORY_DISCLAIMER));

        let already = format!("Clinical view.\n\n{}", CLINICAL_DISCLAIMER);
        let synthesis = synthesizer
            .synthesize(&[ok("a", &already, 0.7)], "a", &intent(IntentCategory::Clinical, 0.3))
            .unwrap();
        assert_eq!(synthesis.content.matches(CLINICAL_DISCLAIMER).count(), 1);
    }

    #[test]
    fn snippet_falls_back_to_prefix() {
        assert_eq!(snippet("Short. Then more text."), "Short. Then more text.");

        let long = "x".repeat(200);
        let s = snippet(&long);
        assert!(s.ends_with('…'));
        assert_eq!(s.chars().count(), SNIPPET_PREFIX_CHARS + 1);

        let sentence = "This first sentence is comfortably longer than forty characters. Second.";
        assert_eq!(
            snippet(sentence),
            "This first sentence is comfortably longer than forty characters."
        );
    }
}
