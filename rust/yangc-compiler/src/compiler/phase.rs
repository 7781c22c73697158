//! Model processing phases.
//!
//! Every statement context in a build advances through these phases in
//! lock-step. A context's phase only ever increases; the reactor asserts
//! monotonicity on every transition.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelProcessingPhase {
    /// Sources ingested, nothing processed yet.
    Init,
    /// Each source's own header parsed; names registered globally.
    SourcePreLinkage,
    /// Namespace URI, prefix and revision of each root registered.
    PreLinkage,
    /// `import`/`include` resolved against other sources' headers.
    Linkage,
    /// All arguments parsed, substatement grammar validated, symbol
    /// tables populated.
    StatementDefinition,
    /// Cross-reference resolution: `uses` expansion, `augment` splicing,
    /// identity `base` resolution.
    FullDeclaration,
    /// Graph frozen into immutable effective statements.
    EffectiveModel,
}

impl ModelProcessingPhase {
    /// The phases the reactor drives, in execution order (`Init` excluded).
    pub const EXECUTION_ORDER: [ModelProcessingPhase; 6] = [
        ModelProcessingPhase::SourcePreLinkage,
        ModelProcessingPhase::PreLinkage,
        ModelProcessingPhase::Linkage,
        ModelProcessingPhase::StatementDefinition,
        ModelProcessingPhase::FullDeclaration,
        ModelProcessingPhase::EffectiveModel,
    ];

    pub fn previous(self) -> Option<ModelProcessingPhase> {
        match self {
            ModelProcessingPhase::Init => None,
            ModelProcessingPhase::SourcePreLinkage => Some(ModelProcessingPhase::Init),
            ModelProcessingPhase::PreLinkage => Some(ModelProcessingPhase::SourcePreLinkage),
            ModelProcessingPhase::Linkage => Some(ModelProcessingPhase::PreLinkage),
            ModelProcessingPhase::StatementDefinition => Some(ModelProcessingPhase::Linkage),
            ModelProcessingPhase::FullDeclaration => {
                Some(ModelProcessingPhase::StatementDefinition)
            }
            ModelProcessingPhase::EffectiveModel => Some(ModelProcessingPhase::FullDeclaration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_execution_order_is_increasing() {
        let order = ModelProcessingPhase::EXECUTION_ORDER;
        for pair in order.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_previous_links_cover_all_phases() {
        for phase in ModelProcessingPhase::iter() {
            match phase.previous() {
                Some(prev) => assert!(prev < phase),
                None => assert_eq!(phase, ModelProcessingPhase::Init),
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ModelProcessingPhase::FullDeclaration.to_string(), "FULL_DECLARATION");
        assert_eq!(ModelProcessingPhase::EffectiveModel.to_string(), "EFFECTIVE_MODEL");
    }
}
