//! Reconciliation driver.
//!
//! Walks the declared model and the live state side by side, resolving each
//! attribute through the primary and secondary resolvers and pairing the
//! outcomes into a [`ResolvedModel`]. One execution result child is recorded
//! per resolved attribute; the supplied result is completed from the
//! children's states when the walk finishes.

use crate::error::ExecutionError;
use crate::execution::{ExecutionResult, ExecutionState, MSG_ERROR_MESSAGE, MSG_MESSAGE};
use crate::model::participant::ResolvedParticipant;
use crate::model::resolved::{NodeId, ResolvedKind, ResolvedModel};
use crate::model::resolver::{create_resolved_type, ModelResolver};

/// Pair a declared root against a live root and resolve the full tree.
///
/// Resolution is declared-driven: attributes and collection entries present
/// only in the live state are left alone. A declared collection entry with
/// no live counterpart is paired against
/// [`ModelResolver::create_non_existing_collection_value`] so the mismatch
/// shows up as a failed secondary participant instead of a missing node.
pub fn build_resolved_model(
    primary_resolver: &dyn ModelResolver,
    secondary_resolver: &dyn ModelResolver,
    declared_root: ResolvedParticipant,
    live_root: ResolvedParticipant,
    result: &ExecutionResult,
) -> Result<ResolvedModel, ExecutionError> {
    let mut model = ResolvedModel::new();
    let root = model.add_root(ResolvedKind::Object, declared_root, live_root);
    resolve_object(
        &mut model,
        root,
        primary_resolver,
        secondary_resolver,
        result,
    )?;

    let resolved = model.len().saturating_sub(1).to_string();
    result.complete_as_computed(
        "model.resolve_completed",
        &[&resolved],
        "model.resolve_failed",
        &[],
    )?;
    Ok(model)
}

fn resolve_object(
    model: &mut ResolvedModel,
    node: NodeId,
    primary_resolver: &dyn ModelResolver,
    secondary_resolver: &dyn ModelResolver,
    result: &ExecutionResult,
) -> Result<(), ExecutionError> {
    let primary = model.node(node).primary_participant().clone();
    let secondary = model.node(node).secondary_participant().clone();

    let names = match primary_resolver.resolve_attribute_names(&primary) {
        Ok(names) => names,
        Err(err) => {
            let child = result.add_child(format!(
                "Enumerate attributes of '{}'",
                primary.name()
            ));
            child.complete_as_failure(
                "model.attribute_unresolved",
                &[&err.to_string()],
            )?;
            return Ok(());
        }
    };

    for name in names {
        let declared = primary_resolver.resolve_attribute(&name, &primary);
        let live = secondary_resolver.resolve_attribute(&name, &secondary);
        let child_result = result.add_child(format!("Resolve attribute '{name}'"));
        let id = create_resolved_type(model, node, primary_resolver, declared, live);
        record_attribute_outcome(model, id, &child_result)?;

        match model.node(id).kind() {
            ResolvedKind::Object => {
                resolve_object(model, id, primary_resolver, secondary_resolver, result)?;
            }
            ResolvedKind::Collection => {
                resolve_collection(model, id, primary_resolver, secondary_resolver, result)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn resolve_collection(
    model: &mut ResolvedModel,
    node: NodeId,
    primary_resolver: &dyn ModelResolver,
    secondary_resolver: &dyn ModelResolver,
    result: &ExecutionResult,
) -> Result<(), ExecutionError> {
    let primary = model.node(node).primary_participant().clone();
    let secondary = model.node(node).secondary_participant().clone();

    let declared_entries = primary_resolver.resolve_collection_attribute_values(&primary);
    let mut live_entries = secondary_resolver.resolve_collection_attribute_values(&secondary);

    for (entry_id, declared) in declared_entries {
        let live = live_entries.remove(&entry_id).unwrap_or_else(|| {
            secondary_resolver.create_non_existing_collection_value(&entry_id, &secondary)
        });
        let child_result =
            result.add_child(format!("Resolve collection entry '{entry_id}'"));
        let id = create_resolved_type(model, node, primary_resolver, declared, live);
        record_attribute_outcome(model, id, &child_result)?;

        if model.node(id).kind() == ResolvedKind::Object {
            resolve_object(model, id, primary_resolver, secondary_resolver, result)?;
        }
    }
    Ok(())
}

fn record_attribute_outcome(
    model: &ResolvedModel,
    id: NodeId,
    result: &ExecutionResult,
) -> Result<(), ExecutionError> {
    let node = model.node(id);
    let primary = node.primary_participant();
    let secondary = node.secondary_participant();
    let resolved = node.kind() != ResolvedKind::Unresolved
        && primary.is_resolution_successful()
        && secondary.is_resolution_successful();

    if resolved {
        result.add_message(
            MSG_MESSAGE,
            &format!("declared: {}", primary.value_as_single_line()),
        );
        result.add_message(
            MSG_MESSAGE,
            &format!("live: {}", secondary.value_as_single_line()),
        );
        result.complete_as_successful(
            "model.attribute_resolved",
            &[primary.name(), &primary.value_as_single_line()],
        )?;
    } else {
        let reason = if !primary.is_resolution_successful() {
            primary.resolution_error_as_single_line()
        } else if !secondary.is_resolution_successful() {
            secondary.resolution_error_as_single_line()
        } else {
            "classification failed".to_string()
        };
        result.add_message(MSG_ERROR_MESSAGE, &reason);
        result.complete_as_failure("model.attribute_unresolved", &[&reason])?;
    }
    Ok(())
}

/// True when the state computed for `result` reports a fully resolved walk.
pub fn is_fully_resolved(state: ExecutionState) -> bool {
    state == ExecutionState::Success
}
