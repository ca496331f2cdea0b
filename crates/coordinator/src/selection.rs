//! Capability-based agent selection.
//!
//! Agents are scored against the classified intent and the raw query. When no
//! registered agent scores at all, the per-category rule registry decides.

use crate::strategy;
use conclave_common::{
    AgentDescriptor, AgentSelection, ConclaveError, IntentCategory, IntentClassification, Result,
};
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

const KEYWORD_MATCH_SCORE: u32 = 10;
const LEADING_TOKEN_SCORE: u32 = 5;
const SPECIAL_CASE_BONUS: u32 = 50;
const COLLABORATOR_MIN_SCORE: u32 = 5;
const COLLABORATION_COMPLEXITY: f32 = 0.6;
const MAX_COLLABORATORS: usize = 2;

/// Leading tokens shorter than this are too generic to overlap meaningfully.
const MIN_LEADING_TOKEN_CHARS: usize = 3;

fn relevant_capabilities(category: IntentCategory) -> &'static [&'static str] {
    match category {
        IntentCategory::Regulatory => &[
            "regulatory",
            "compliance",
            "submission",
            "fda",
            "510k",
            "approval",
            "labeling",
        ],
        IntentCategory::Clinical => &[
            "clinical",
            "trial",
            "protocol",
            "endpoint",
            "biostatistics",
            "safety",
        ],
        IntentCategory::Research => &["research", "discovery", "preclinical", "literature", "science"],
        IntentCategory::MarketAccess => &[
            "market access",
            "payer",
            "reimbursement",
            "pricing",
            "health economics",
        ],
        IntentCategory::Quality => &["quality", "gmp", "manufacturing", "validation", "audit"],
        IntentCategory::Strategy => &["strategy", "portfolio", "competitive", "commercial"],
        IntentCategory::General => &["general", "analysis", "research"],
    }
}

/// A predicate-guarded fallback routing decision.
#[derive(Debug, Clone)]
pub struct SelectionRule {
    pub predicate: fn(&IntentClassification, &str) -> bool,
    pub primary: &'static str,
    pub collaborators: &'static [&'static str],
    pub rationale: &'static str,
}

impl SelectionRule {
    fn catch_all(
        primary: &'static str,
        collaborators: &'static [&'static str],
        rationale: &'static str,
    ) -> Self {
        Self {
            predicate: |_, _| true,
            primary,
            collaborators,
            rationale,
        }
    }
}

fn rule_registry() -> HashMap<IntentCategory, Vec<SelectionRule>> {
    use IntentCategory::*;

    let mut rules = HashMap::new();
    rules.insert(
        Regulatory,
        vec![
            SelectionRule {
                predicate: |_, q| q.contains("510k") || q.contains("510(k)"),
                primary: "fda-510k-specialist",
                collaborators: &["regulatory-strategist"],
                rationale: "510(k) pathway question",
            },
            SelectionRule {
                predicate: |intent, _| intent.factors.risk_level >= 0.7,
                primary: "regulatory-strategist",
                collaborators: &["clinical-strategist"],
                rationale: "High-risk regulatory question",
            },
            SelectionRule::catch_all(
                "regulatory-strategist",
                &["general-advisor"],
                "General regulatory question",
            ),
        ],
    );
    rules.insert(
        Clinical,
        vec![
            SelectionRule {
                predicate: |_, q| q.contains("sample size") || q.contains("statistic"),
                primary: "biostatistician",
                collaborators: &["clinical-strategist"],
                rationale: "Statistical design question",
            },
            SelectionRule::catch_all(
                "clinical-strategist",
                &["regulatory-strategist"],
                "General clinical development question",
            ),
        ],
    );
    rules.insert(
        Research,
        vec![SelectionRule::catch_all(
            "general-advisor",
            &["clinical-strategist"],
            "Early research question",
        )],
    );
    rules.insert(
        MarketAccess,
        vec![SelectionRule::catch_all(
            "market-access-strategist",
            &["general-advisor"],
            "Market access question",
        )],
    );
    rules.insert(
        Quality,
        vec![SelectionRule::catch_all(
            "quality-specialist",
            &["regulatory-strategist"],
            "Quality system question",
        )],
    );
    rules.insert(
        Strategy,
        vec![SelectionRule::catch_all(
            "general-advisor",
            &["regulatory-strategist", "clinical-strategist"],
            "Portfolio or commercial strategy question",
        )],
    );
    rules.insert(
        General,
        vec![SelectionRule::catch_all("general-advisor", &[], "General question")],
    );
    rules
}

#[derive(Debug, Clone, PartialEq)]
struct ScoredAgent<'a> {
    id: &'a str,
    score: u32,
}

/// Scores registered agents and picks a primary plus up to two collaborators.
#[derive(Debug, Clone)]
pub struct AgentSelector {
    default_agent: String,
    special_cases: Vec<(Regex, &'static str)>,
    rules: HashMap<IntentCategory, Vec<SelectionRule>>,
}

impl AgentSelector {
    pub fn new(default_agent: impl Into<String>) -> Result<Self> {
        let special_cases = [
            (r"510\s*\(?k\)?|premarket notification", "fda-510k-specialist"),
            (
                r"\b(sample size|power calculation|statistical analysis plan)\b",
                "biostatistician",
            ),
            (
                r"\b(hta|value dossier|reimbursement dossier)\b",
                "market-access-strategist",
            ),
        ]
        .into_iter()
        .map(|(src, agent)| {
            Regex::new(src)
                .map(|re| (re, agent))
                .map_err(|e| ConclaveError::Config(format!("Invalid selection pattern '{}': {}", src, e)))
        })
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            default_agent: default_agent.into(),
            special_cases,
            rules: rule_registry(),
        })
    }

    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }

    /// Select agents for a classified query. Never fails; internal errors
    /// degrade to a single-agent selection of the default agent.
    pub fn select(
        &self,
        intent: &IntentClassification,
        query: &str,
        agents: &[AgentDescriptor],
    ) -> AgentSelection {
        match self.try_select(intent, query, agents) {
            Ok(selection) => {
                debug!(
                    primary = %selection.primary_agent,
                    collaborators = ?selection.collaborators,
                    collaboration = %selection.collaboration_type,
                    "Agents selected"
                );
                selection
            }
            Err(e) => {
                warn!(error = %e, "Agent selection failed, using default agent");
                AgentSelection::single(
                    self.default_agent.clone(),
                    format!("Default selection after selection error: {}", e),
                )
            }
        }
    }

    fn try_select(
        &self,
        intent: &IntentClassification,
        query: &str,
        agents: &[AgentDescriptor],
    ) -> Result<AgentSelection> {
        if agents.is_empty() {
            return Err(ConclaveError::Selection("no candidate agents".into()));
        }

        let lower = query.to_lowercase();
        let ranked = self.rank(intent, &lower, agents);

        let (primary, collaborators, rationale) = match ranked.first() {
            Some(top) if top.score > 0 => {
                let collaborators: Vec<String> = if intent.complexity > COLLABORATION_COMPLEXITY {
                    ranked
                        .iter()
                        .skip(1)
                        .filter(|a| a.score > COLLABORATOR_MIN_SCORE)
                        .take(MAX_COLLABORATORS)
                        .map(|a| a.id.to_string())
                        .collect()
                } else {
                    Vec::new()
                };

                let rationale = format!(
                    "Capability match for {} intent: {} scored {}{}",
                    intent.category,
                    top.id,
                    top.score,
                    describe_collaborators(&ranked, &collaborators),
                );
                (top.id.to_string(), collaborators, rationale)
            }
            _ => self.apply_rules(intent, &lower, agents),
        };

        let collaboration_type = strategy::resolve(
            intent.complexity,
            collaborators.len(),
            intent.factors.urgency,
            intent.category,
        );

        Ok(AgentSelection {
            primary_agent: primary,
            collaborators,
            collaboration_type,
            rationale,
        })
    }

    /// Score every candidate, highest first. Ties keep registry order.
    fn rank<'a>(
        &self,
        intent: &IntentClassification,
        lower: &str,
        agents: &'a [AgentDescriptor],
    ) -> Vec<ScoredAgent<'a>> {
        let relevant = relevant_capabilities(intent.category);
        let leading = lower
            .split_whitespace()
            .next()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| t.chars().count() >= MIN_LEADING_TOKEN_CHARS);

        let boosted: Vec<&str> = self
            .special_cases
            .iter()
            .filter(|(re, _)| re.is_match(lower))
            .map(|(_, agent)| *agent)
            .collect();

        let mut ranked: Vec<ScoredAgent<'a>> = agents
            .iter()
            .map(|agent| {
                let mut score = 0;

                for keyword in relevant {
                    if agent
                        .capabilities
                        .iter()
                        .any(|tag| tag.contains(keyword) || keyword.contains(tag.as_str()))
                    {
                        score += KEYWORD_MATCH_SCORE;
                    }
                }

                if let Some(token) = leading {
                    for tag in &agent.capabilities {
                        if tag.contains(token) {
                            score += LEADING_TOKEN_SCORE;
                        }
                    }
                }

                for special in &boosted {
                    if agent.id == *special {
                        score += SPECIAL_CASE_BONUS;
                    }
                }

                ScoredAgent {
                    id: agent.id.as_str(),
                    score,
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    fn apply_rules(
        &self,
        intent: &IntentClassification,
        lower: &str,
        agents: &[AgentDescriptor],
    ) -> (String, Vec<String>, String) {
        let registered = |id: &str| agents.iter().any(|a| a.id == id);

        let rule = self
            .rules
            .get(&intent.category)
            .and_then(|rules| rules.iter().find(|r| (r.predicate)(intent, lower)));

        let Some(rule) = rule else {
            return (
                self.default_agent.clone(),
                Vec::new(),
                format!("No rule matched {} intent, using default agent", intent.category),
            );
        };

        let primary = if registered(rule.primary) {
            rule.primary.to_string()
        } else {
            self.default_agent.clone()
        };

        let collaborators = if intent.complexity > COLLABORATION_COMPLEXITY {
            rule.collaborators
                .iter()
                .filter(|id| registered(**id) && **id != primary)
                .take(MAX_COLLABORATORS)
                .map(|id| id.to_string())
                .collect()
        } else {
            Vec::new()
        };

        let rationale = format!(
            "No capability match for {} intent; rule '{}' routed to {}",
            intent.category, rule.rationale, primary
        );
        (primary, collaborators, rationale)
    }
}

fn describe_collaborators(ranked: &[ScoredAgent<'_>], collaborators: &[String]) -> String {
    if collaborators.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = collaborators
        .iter()
        .filter_map(|id| ranked.iter().find(|a| a.id == id))
        .map(|a| format!("{} ({})", a.id, a.score))
        .collect();
    format!("; collaborators: {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_agents;
    use conclave_common::{CollaborationType, ContextualFactors, Urgency};

    fn intent(category: IntentCategory, complexity: f32) -> IntentClassification {
        IntentClassification {
            category,
            confidence: 0.7,
            subcategories: Vec::new(),
            key_terms: Vec::new(),
            complexity,
            factors: ContextualFactors::default(),
        }
    }

    fn selector() -> AgentSelector {
        AgentSelector::new("general-advisor").unwrap()
    }

    fn roster() -> Vec<AgentDescriptor> {
        let mut agents = default_agents();
        agents.push(AgentDescriptor::new(
            "fda-510k-specialist",
            &["510k", "premarket notification", "device"],
        ));
        agents.push(AgentDescriptor::new(
            "biostatistician",
            &["biostatistics", "sample size", "clinical"],
        ));
        agents
    }

    #[test]
    fn special_case_bonus_dominates() {
        let selection = selector().select(
            &intent(IntentCategory::Regulatory, 0.5),
            "What are the 510k submission requirements for our device?",
            &roster(),
        );
        assert_eq!(selection.primary_agent, "fda-510k-specialist");
        assert!(selection.collaborators.is_empty());
        assert_eq!(selection.collaboration_type, CollaborationType::Single);
        assert!(!selection.rationale.is_empty());
    }

    #[test]
    fn low_complexity_never_collaborates() {
        for complexity in [0.0, 0.3, 0.6] {
            let selection = selector().select(
                &intent(IntentCategory::Clinical, complexity),
                "How should we design the clinical trial protocol?",
                &roster(),
            );
            assert!(selection.collaborators.is_empty(), "complexity {complexity}");
        }
    }

    #[test]
    fn high_complexity_adds_scoring_collaborators() {
        let selection = selector().select(
            &intent(IntentCategory::Clinical, 0.9),
            "How should we design the clinical trial protocol?",
            &roster(),
        );

        assert_eq!(selection.primary_agent, "clinical-strategist");
        assert!(!selection.collaborators.is_empty());
        assert!(selection.collaborators.len() <= 2);
        assert!(!selection.collaborators.contains(&selection.primary_agent));
        assert_eq!(selection.collaborators[0], "biostatistician");
        assert_eq!(selection.collaboration_type, CollaborationType::Parallel);
    }

    #[test]
    fn collaborators_need_score_above_threshold() {
        // Only the clinical strategist matches clinical capabilities.
        let agents = vec![
            AgentDescriptor::new("clinical-strategist", &["clinical", "trial"]),
            AgentDescriptor::new("copywriter", &["marketing"]),
        ];
        let selection = selector().select(
            &intent(IntentCategory::Clinical, 0.95),
            "Design a trial",
            &agents,
        );
        assert_eq!(selection.primary_agent, "clinical-strategist");
        assert!(selection.collaborators.is_empty());
    }

    #[test]
    fn unscored_query_uses_rules_with_registered_agents() {
        let agents = vec![AgentDescriptor::new("copywriter", &["marketing"])];
        let selection = selector().select(
            &intent(IntentCategory::MarketAccess, 0.9),
            "pricing corridor",
            &agents,
        );
        // Rule primary is not registered, so the default id is used.
        assert_eq!(selection.primary_agent, "general-advisor");
        assert!(selection.collaborators.is_empty());
        assert!(selection.rationale.contains("Market access question"));
    }

    #[test]
    fn rule_collaborators_filtered_to_registered() {
        let agents = vec![
            AgentDescriptor::new("market-access-strategist", &["oncology"]),
            AgentDescriptor::new("general-advisor", &["dermatology"]),
        ];
        let selection = selector().select(
            &intent(IntentCategory::MarketAccess, 0.9),
            "pricing corridor",
            &agents,
        );
        assert_eq!(selection.primary_agent, "market-access-strategist");
        assert_eq!(selection.collaborators, vec!["general-advisor"]);
        assert_eq!(selection.collaboration_type, CollaborationType::Parallel);
    }

    #[test]
    fn empty_candidates_degrade_to_default() {
        let selection = selector().select(&intent(IntentCategory::Clinical, 0.9), "trial", &[]);
        assert_eq!(selection.primary_agent, "general-advisor");
        assert!(selection.collaborators.is_empty());
        assert_eq!(selection.collaboration_type, CollaborationType::Single);
    }

    #[test]
    fn leading_token_overlap_scores() {
        let s = selector();
        let agents = vec![
            AgentDescriptor::new("a", &["oncology"]),
            AgentDescriptor::new("b", &["cardiology"]),
        ];
        let ranked = s.rank(&intent(IntentCategory::General, 0.1), "oncology question", &agents);
        assert_eq!(ranked[0].id, "a");
        assert_eq!(ranked[0].score, LEADING_TOKEN_SCORE);
        assert_eq!(ranked[1].score, 0);
    }

    #[test]
    fn short_tags_do_not_match_inside_leading_token() {
        let s = selector();
        let agents = vec![
            AgentDescriptor::new("a", &["ai"]),
            AgentDescriptor::new("b", &["qa", "trial design"]),
        ];
        let ranked = s.rank(&intent(IntentCategory::General, 0.1), "maintain the plan", &agents);
        assert!(ranked.iter().all(|a| a.score == 0));

        let ranked = s.rank(&intent(IntentCategory::General, 0.1), "design review", &agents);
        assert_eq!(ranked[0].id, "b");
        assert_eq!(ranked[0].score, LEADING_TOKEN_SCORE);
    }

    #[test]
    fn critical_regulatory_complex_query_is_sequential() {
        let mut i = intent(IntentCategory::Regulatory, 0.9);
        i.factors.urgency = Urgency::Critical;
        let selection = selector().select(&i, "FDA submission compliance plan", &roster());

        assert_eq!(selection.primary_agent, "regulatory-strategist");
        assert!(!selection.collaborators.is_empty());
        assert_eq!(selection.collaboration_type, CollaborationType::Sequential);
    }
}
