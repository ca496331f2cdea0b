//! Keyword and pattern based intent classification.
//!
//! Classification is pure and CPU-bound: the pattern registry is compiled once
//! when the classifier is built and only read afterwards.

use conclave_common::{
    ConclaveError, ContextualFactors, DevelopmentPhase, IntentCategory, IntentClassification,
    Result, Stakeholder, Urgency,
};
use regex::Regex;
use tracing::debug;

const DEFAULT_CONFIDENCE: f32 = 0.3;
const KEYWORD_SCORE: f32 = 0.1;
const REGEX_SCORE: f32 = 0.3;
const SUBCATEGORY_SCORE: f32 = 0.05;

const BASE_COMPLEXITY: f32 = 0.3;
const ADVANCED_TERM_SCORE: f32 = 0.1;
const MULTI_QUESTION_SCORE: f32 = 0.1;

/// Domain jargon that signals a harder question.
const ADVANCED_TERMS: &[&str] = &[
    "biomarker",
    "pharmacokinetic",
    "pharmacodynamic",
    "adaptive design",
    "bayesian",
    "companion diagnostic",
    "real-world evidence",
    "health economic",
    "payer",
    "multi-regional",
    "phase 3",
    "phase iii",
    "meta-analysis",
    "orphan",
];

/// Fixed confidence increases for high-precision category/keyword pairs.
const BOOSTS: &[(IntentCategory, &str, f32)] = &[
    (IntentCategory::Regulatory, "510k", 0.1),
    (IntentCategory::Regulatory, "pma", 0.05),
    (IntentCategory::Clinical, "phase 3", 0.05),
    (IntentCategory::Clinical, "primary endpoint", 0.05),
    (IntentCategory::MarketAccess, "reimbursement", 0.05),
];

const URGENCY_RULES: &[(Urgency, &[&str])] = &[
    (
        Urgency::Critical,
        &["urgent", "asap", "immediately", "emergency", "critical", "recall"],
    ),
    (
        Urgency::High,
        &["deadline", "priority", "soon", "this week", "time-sensitive"],
    ),
    (
        Urgency::Low,
        &["no rush", "eventually", "long-term", "when possible"],
    ),
];

const STAKEHOLDER_RULES: &[(Stakeholder, &[&str])] = &[
    (
        Stakeholder::Regulatory,
        &["fda", "regulator", "agency", "notified body"],
    ),
    (
        Stakeholder::Clinical,
        &["investigator", "physician", "clinician", "patient"],
    ),
    (
        Stakeholder::Commercial,
        &["payer", "pricing", "sales", "market"],
    ),
    (
        Stakeholder::Executive,
        &["board", "ceo", "executive", "investor"],
    ),
];

const PHASE_RULES: &[(DevelopmentPhase, &[&str])] = &[
    (
        DevelopmentPhase::Regulatory,
        &["submission", "510k", "approval", "clearance", "new drug application"],
    ),
    (
        DevelopmentPhase::Clinical,
        &["trial", "phase 1", "phase 2", "phase 3", "clinical"],
    ),
    (
        DevelopmentPhase::Preclinical,
        &["preclinical", "in vivo", "animal", "toxicology"],
    ),
    (
        DevelopmentPhase::Commercial,
        &["launch", "commercial", "payer", "market"],
    ),
];

const RISK_RULES: &[(f32, &[&str])] = &[
    (0.9, &["recall", "death", "fatal", "serious adverse"]),
    (0.7, &["adverse", "safety", "warning letter"]),
    (0.5, &["compliance", "regulatory", "fda", "audit"]),
];

const DEFAULT_RISK: f32 = 0.3;

/// One category's recognition pattern.
#[derive(Debug, Clone)]
pub struct IntentPattern {
    pub category: IntentCategory,
    pub keywords: Vec<&'static str>,
    pub regexes: Vec<Regex>,
    /// Upper bound on the score this pattern can produce
    pub weight: f32,
    pub subcategories: Vec<&'static str>,
}

impl IntentPattern {
    fn build(
        category: IntentCategory,
        weight: f32,
        keywords: &[&'static str],
        regexes: &[&str],
        subcategories: &[&'static str],
    ) -> Result<Self> {
        let regexes = regexes
            .iter()
            .map(|src| {
                Regex::new(src).map_err(|e| {
                    ConclaveError::Config(format!("Invalid intent pattern '{}': {}", src, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            category,
            keywords: keywords.to_vec(),
            regexes,
            weight,
            subcategories: subcategories.to_vec(),
        })
    }

    /// Score a lowercased query against this pattern.
    fn score(&self, lower: &str) -> PatternMatch {
        let mut score = 0.0;
        let mut key_terms = Vec::new();
        let mut subcategories = Vec::new();

        // Token hits are a subset of substring hits, so one check covers both.
        for keyword in &self.keywords {
            if lower.contains(keyword) {
                score += KEYWORD_SCORE;
                key_terms.push(keyword.to_string());
            }
        }

        for regex in &self.regexes {
            if regex.is_match(lower) {
                score += REGEX_SCORE;
            }
        }

        for sub in &self.subcategories {
            if lower.contains(sub) {
                score += SUBCATEGORY_SCORE;
                subcategories.push(sub.to_string());
            }
        }

        PatternMatch {
            score: f32::min(score, self.weight),
            key_terms,
            subcategories,
        }
    }
}

struct PatternMatch {
    score: f32,
    key_terms: Vec<String>,
    subcategories: Vec<String>,
}

/// Classifies queries into intent categories.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    patterns: Vec<IntentPattern>,
}

impl IntentClassifier {
    /// Build the classifier with the standard life-sciences pattern registry.
    pub fn new() -> Result<Self> {
        use IntentCategory::*;

        let patterns = vec![
            IntentPattern::build(
                Regulatory,
                0.95,
                &[
                    "fda", "regulatory", "submission", "approval", "clearance", "510k",
                    "pma", "compliance", "guidance", "labeling",
                ],
                &[
                    r"\b510\s*\(?k\)?",
                    r"\b(ind|nda|bla|pma|maa|ema)\b",
                    r"\bfda\s+(approval|clearance|guidance)\b",
                    r"\bde\s+novo\b",
                ],
                &[
                    "510k",
                    "pma",
                    "de novo",
                    "ind application",
                    "new drug application",
                    "biologics license",
                    "labeling",
                    "post-market",
                ],
            )?,
            IntentPattern::build(
                Clinical,
                0.9,
                &[
                    "clinical", "trial", "patient", "endpoint", "protocol", "enrollment", "phase",
                    "efficacy", "adverse", "biomarker", "cohort", "randomized",
                ],
                &[
                    r"\bphase\s+(i{1,3}|iv|[1-4])\b",
                    r"\b(rct|randomi[sz]ed)\b",
                    r"\bprimary\s+endpoint\b",
                ],
                &["trial design", "endpoint", "biomarker", "safety", "enrollment", "statistics"],
            )?,
            IntentPattern::build(
                Research,
                0.85,
                &[
                    "research", "discovery", "target", "mechanism", "pathway", "preclinical",
                    "compound", "molecule", "assay", "literature",
                ],
                &[r"\bin\s+(vitro|vivo)\b", r"\bmechanism\s+of\s+action\b"],
                &["target identification", "lead optimization", "preclinical", "literature review"],
            )?,
            IntentPattern::build(
                MarketAccess,
                0.85,
                &[
                    "payer", "reimbursement", "pricing", "market access", "coverage", "formulary",
                    "value", "cost",
                ],
                &[r"\bcost[- ]effective", r"\b(hta|heor|qaly)\b"],
                &["pricing", "reimbursement", "hta", "value dossier"],
            )?,
            IntentPattern::build(
                Quality,
                0.85,
                &[
                    "quality", "gmp", "manufacturing", "validation", "capa", "deviation", "audit",
                    "batch",
                ],
                &[r"\b(gmp|capa|cmc)\b", r"\bquality\s+(system|management)\b"],
                &["gmp", "capa", "validation", "supplier"],
            )?,
            IntentPattern::build(
                Strategy,
                0.8,
                &[
                    "strategy", "competitive", "portfolio", "roadmap", "launch", "partnership",
                    "investment",
                ],
                &[r"\bgo[- ]to[- ]market\b", r"\bcompetitive\s+landscape\b"],
                &["portfolio", "launch", "partnering"],
            )?,
        ];

        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[IntentPattern] {
        &self.patterns
    }

    /// Classify a query. Never fails; low-signal queries resolve to `General`.
    pub fn classify(&self, query: &str) -> IntentClassification {
        let lower = query.to_lowercase();

        let mut category = IntentCategory::General;
        let mut confidence = DEFAULT_CONFIDENCE;
        let mut key_terms = Vec::new();
        let mut subcategories = Vec::new();

        // Strictly greater keeps the first registered pattern on ties.
        for pattern in &self.patterns {
            let matched = pattern.score(&lower);
            if matched.score > confidence {
                category = pattern.category;
                confidence = matched.score;
                key_terms = matched.key_terms;
                subcategories = matched.subcategories;
            }
        }

        let complexity = complexity(query, &lower, category);
        let factors = contextual_factors(&lower);
        let confidence = boost(category, confidence, &lower);

        debug!(
            category = %category,
            confidence,
            complexity,
            urgency = ?factors.urgency,
            "Classified query"
        );

        IntentClassification {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            subcategories,
            key_terms,
            complexity,
            factors,
        }
    }
}

fn complexity(query: &str, lower: &str, category: IntentCategory) -> f32 {
    let mut score = BASE_COMPLEXITY;

    let chars = query.chars().count();
    score += if chars > 200 {
        0.3
    } else if chars > 100 {
        0.2
    } else if chars > 50 {
        0.1
    } else {
        0.0
    };

    score += ADVANCED_TERMS
        .iter()
        .filter(|term| lower.contains(*term))
        .count() as f32
        * ADVANCED_TERM_SCORE;

    score += match category {
        IntentCategory::Regulatory | IntentCategory::Clinical => 0.1,
        IntentCategory::Quality | IntentCategory::MarketAccess | IntentCategory::Strategy => 0.05,
        IntentCategory::Research | IntentCategory::General => 0.0,
    };

    if query.matches('?').count() > 1 {
        score += MULTI_QUESTION_SCORE;
    }

    score.clamp(0.0, 1.0)
}

fn first_match<T: Copy>(lower: &str, rules: &[(T, &[&str])], default: T) -> T {
    rules
        .iter()
        .find(|(_, terms)| terms.iter().any(|t| lower.contains(t)))
        .map(|(value, _)| *value)
        .unwrap_or(default)
}

fn contextual_factors(lower: &str) -> ContextualFactors {
    ContextualFactors {
        urgency: first_match(lower, URGENCY_RULES, Urgency::Medium),
        stakeholder: first_match(lower, STAKEHOLDER_RULES, Stakeholder::Researcher),
        phase: first_match(lower, PHASE_RULES, DevelopmentPhase::Discovery),
        risk_level: first_match(lower, RISK_RULES, DEFAULT_RISK),
    }
}

fn boost(category: IntentCategory, confidence: f32, lower: &str) -> f32 {
    BOOSTS
        .iter()
        .filter(|(cat, term, _)| *cat == category && lower.contains(term))
        .fold(confidence, |acc, (_, _, inc)| f32::min(acc + inc, 1.0))
}
