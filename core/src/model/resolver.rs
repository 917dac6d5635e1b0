use std::collections::BTreeMap;

use crate::error::ResolutionError;
use crate::model::participant::{ResolvedParticipant, TypeDescriptor};
use crate::model::resolved::{NodeId, ResolvedKind, ResolvedModel};

/// Technology specific adapter that looks up attribute values by name for a
/// managed system.
///
/// Implementations never let a lookup fault escape: a failed lookup is
/// encoded as a participant with state `Failed` carrying the resolution
/// error.
pub trait ModelResolver: Send + Sync {
    /// Resolve the named attribute on the object behind `participant`.
    fn resolve_attribute(&self, name: &str, participant: &ResolvedParticipant)
        -> ResolvedParticipant;

    /// Enumerate the attribute names of a composite participant, sorted by
    /// name for deterministic traversal.
    fn resolve_attribute_names(
        &self,
        participant: &ResolvedParticipant,
    ) -> Result<Vec<String>, ResolutionError>;

    /// Resolve every entry of a collection typed participant, keyed by entry
    /// name. Returns an empty map when the participant's state is `Nil` or
    /// `Failed`.
    fn resolve_collection_attribute_values(
        &self,
        participant: &ResolvedParticipant,
    ) -> BTreeMap<String, ResolvedParticipant>;

    /// Classify the shape of an attribute pairing.
    fn classify(
        &self,
        parent_primary: &ResolvedParticipant,
        primary: &ResolvedParticipant,
    ) -> Result<ResolvedKind, ResolutionError>;

    /// Participant for a declared collection entry with no live counterpart.
    /// Reuses the parent's type so downstream consumers keep type information
    /// on a miss.
    fn create_non_existing_collection_value(
        &self,
        id: &str,
        parent: &ResolvedParticipant,
    ) -> ResolvedParticipant;
}

/// Classify a pairing and append it under `parent`.
///
/// Classification never propagates an error: a failed classification
/// downgrades to an `Unresolved` node whose secondary participant preserves
/// the triggering error for diagnostics.
pub fn create_resolved_type(
    model: &mut ResolvedModel,
    parent: NodeId,
    resolver: &dyn ModelResolver,
    primary: ResolvedParticipant,
    secondary: ResolvedParticipant,
) -> NodeId {
    let parent_primary = model.node(parent).primary_participant().clone();
    match resolver.classify(&parent_primary, &primary) {
        Ok(kind) => model.add_child(parent, kind, primary, secondary),
        Err(err) => {
            tracing::debug!(
                attribute = primary.name(),
                error = %err,
                "classification failed, downgrading to unresolved"
            );
            let failed = ResolvedParticipant::failed(
                primary.name(),
                TypeDescriptor::unknown(),
                err,
            );
            model.add_child(parent, ResolvedKind::Unresolved, primary, failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::participant::AttributeKind;
    use serde_json::json;

    struct FailingClassifier;

    impl ModelResolver for FailingClassifier {
        fn resolve_attribute(
            &self,
            name: &str,
            _participant: &ResolvedParticipant,
        ) -> ResolvedParticipant {
            ResolvedParticipant::failed(
                name,
                TypeDescriptor::unknown(),
                ResolutionError::new("unreachable"),
            )
        }

        fn resolve_attribute_names(
            &self,
            _participant: &ResolvedParticipant,
        ) -> Result<Vec<String>, ResolutionError> {
            Ok(Vec::new())
        }

        fn resolve_collection_attribute_values(
            &self,
            _participant: &ResolvedParticipant,
        ) -> BTreeMap<String, ResolvedParticipant> {
            BTreeMap::new()
        }

        fn classify(
            &self,
            _parent_primary: &ResolvedParticipant,
            _primary: &ResolvedParticipant,
        ) -> Result<ResolvedKind, ResolutionError> {
            Err(ResolutionError::new("unknown shape"))
        }

        fn create_non_existing_collection_value(
            &self,
            id: &str,
            parent: &ResolvedParticipant,
        ) -> ResolvedParticipant {
            ResolvedParticipant::failed(
                id,
                parent.type_desc().clone(),
                ResolutionError::new("missing"),
            )
        }
    }

    #[test]
    fn classification_error_downgrades_to_unresolved() {
        let mut model = ResolvedModel::new();
        let root_participant = ResolvedParticipant::set(
            "root",
            TypeDescriptor::new(AttributeKind::Object, "root"),
            json!({}),
        );
        let root = model.add_root(
            ResolvedKind::Object,
            root_participant.clone(),
            root_participant,
        );

        let primary = ResolvedParticipant::set(
            "weird",
            TypeDescriptor::unknown(),
            json!(1),
        );
        let secondary = primary.clone();
        let id = create_resolved_type(&mut model, root, &FailingClassifier, primary, secondary);

        let node = model.node(id);
        assert_eq!(node.kind(), ResolvedKind::Unresolved);
        // primary preserved, secondary carries the error
        assert_eq!(node.primary_participant().name(), "weird");
        assert!(node.secondary_participant().resolution_error().is_some());
    }
}
