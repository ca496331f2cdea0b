//! Collaboration topology resolution.

use conclave_common::{CollaborationType, IntentCategory, Urgency};

/// Choose how the selected agents should collaborate.
///
/// Pure and deterministic. Urgency escalation is checked before
/// category-driven sequencing.
pub fn resolve(
    complexity: f32,
    collaborator_count: usize,
    urgency: Urgency,
    category: IntentCategory,
) -> CollaborationType {
    if collaborator_count == 0 {
        return CollaborationType::Single;
    }

    if urgency == Urgency::Critical && collaborator_count > 2 {
        return CollaborationType::Hierarchical;
    }

    if category.is_regulatory_class() && complexity > 0.7 {
        return CollaborationType::Sequential;
    }

    if complexity > 0.8 && collaborator_count > 2 {
        return CollaborationType::Hierarchical;
    }

    CollaborationType::Parallel
}
