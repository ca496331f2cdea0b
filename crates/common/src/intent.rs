//! Intent classification types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The purpose category a query was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Regulatory,
    Clinical,
    Research,
    MarketAccess,
    Quality,
    Strategy,
    General,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regulatory => "regulatory",
            Self::Clinical => "clinical",
            Self::Research => "research",
            Self::MarketAccess => "market_access",
            Self::Quality => "quality",
            Self::Strategy => "strategy",
            Self::General => "general",
        }
    }

    /// Categories whose answers must be built up step by step for review.
    pub fn is_regulatory_class(&self) -> bool {
        matches!(self, Self::Regulatory | Self::Quality)
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stakeholder {
    #[default]
    Researcher,
    Regulatory,
    Clinical,
    Commercial,
    Executive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevelopmentPhase {
    #[default]
    Discovery,
    Preclinical,
    Clinical,
    Regulatory,
    Commercial,
}

/// Situational signals extracted from the query independently of its category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextualFactors {
    pub urgency: Urgency,
    pub stakeholder: Stakeholder,
    pub phase: DevelopmentPhase,
    /// Risk level (0.0 - 1.0)
    pub risk_level: f32,
}

impl Default for ContextualFactors {
    fn default() -> Self {
        Self {
            urgency: Urgency::Medium,
            stakeholder: Stakeholder::Researcher,
            phase: DevelopmentPhase::Discovery,
            risk_level: 0.3,
        }
    }
}

/// The result of classifying a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    pub category: IntentCategory,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,

    #[serde(default)]
    pub subcategories: Vec<String>,

    /// Keywords from the winning pattern that were found in the query
    #[serde(default)]
    pub key_terms: Vec<String>,

    /// Complexity score (0.0 - 1.0)
    pub complexity: f32,

    pub factors: ContextualFactors,
}

impl IntentClassification {
    pub fn summary(&self) -> IntentSummary {
        IntentSummary {
            category: self.category,
            confidence: self.confidence,
            complexity: self.complexity,
            urgency: self.factors.urgency,
        }
    }
}

/// Compact view of a classification kept in performance records and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentSummary {
    pub category: IntentCategory,
    pub confidence: f32,
    pub complexity: f32,
    pub urgency: Urgency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&IntentCategory::MarketAccess).unwrap(),
            "\"market_access\""
        );
        assert_eq!(IntentCategory::MarketAccess.to_string(), "market_access");
    }

    #[test]
    fn regulatory_class_categories() {
        assert!(IntentCategory::Regulatory.is_regulatory_class());
        assert!(IntentCategory::Quality.is_regulatory_class());
        assert!(!IntentCategory::Clinical.is_regulatory_class());
        assert!(!IntentCategory::General.is_regulatory_class());
    }

    #[test]
    fn urgency_ordering() {
        assert!(Urgency::Critical > Urgency::High);
        assert!(Urgency::High > Urgency::Medium);
        assert!(Urgency::Medium > Urgency::Low);
    }
}
