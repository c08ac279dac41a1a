use std::collections::BTreeMap;
use std::time::Instant;

use crate::database::DatabaseError;
use crate::delta::Patch;
use crate::entities::{Entity, Patchable};
use crate::observer::context::RuleContext;
use crate::observer::traits::{Rule, RuleRing};
use crate::outcome::{ErrorCode, ValidationResult};
use crate::types::Operation;

/// Patched snapshot, or every violation found while checking it
pub type Checked<E> = Result<E, ValidationResult>;

/// Rules registered per ring, executed in ring order
pub struct RulePipeline<E: Entity> {
    rules: BTreeMap<RuleRing, Vec<Box<dyn Rule<E>>>>,
}

impl<E: Entity> RulePipeline<E> {
    pub fn new() -> Self {
        Self { rules: BTreeMap::new() }
    }

    /// Register a rule (builder style)
    pub fn with(mut self, rule: impl Rule<E> + 'static) -> Self {
        let ring = rule.ring();
        tracing::trace!("Registered rule '{}' for {} in ring {:?}", rule.name(), E::TABLE, ring);
        self.rules.entry(ring).or_default().push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run one ring's rules against the snapshot
    async fn execute_ring(
        &self,
        ring: RuleRing,
        snapshot: &E,
        ctx: &RuleContext<'_, E>,
        result: &mut ValidationResult,
    ) -> Result<(), DatabaseError> {
        let Some(rules) = self.rules.get(&ring) else {
            return Ok(());
        };

        for rule in rules {
            if !rule.applies_to_operation(ctx.operation) {
                tracing::trace!("Rule {} skipped for {}", rule.name(), ctx.operation.as_str());
                continue;
            }

            let started = Instant::now();
            let before = result.errors().len();
            rule.check(snapshot, ctx, result).await?;
            tracing::debug!(
                "Rule {} on {} reported {} error(s) in {:?}",
                rule.name(),
                E::TABLE,
                result.errors().len() - before,
                started.elapsed()
            );
        }
        Ok(())
    }
}

impl<E: Patchable> RulePipeline<E> {
    /// Apply `delta` onto a clone of `existing` and run every ring.
    ///
    /// All violations are accumulated. Nothing is persisted here; the caller
    /// stamps audit fields and saves the snapshot only on `Ok(Ok(_))`.
    pub async fn apply_and_validate(
        &self,
        existing: &E,
        delta: &E::Delta,
        ctx: &RuleContext<'_, E>,
    ) -> Result<Checked<E>, DatabaseError> {
        if E::delta_is_empty(delta) {
            return Ok(Err(ErrorCode::entity_format_invalid().into()));
        }

        let mut snapshot = existing.clone();
        snapshot.apply(delta);

        let mut id_violation = match (ctx.operation, E::delta_id(delta)) {
            (_, Patch::Absent) => None,
            (Operation::Create, Patch::Present(_)) => Some(ErrorCode::id_assigned_by_server()),
            (_, Patch::Present(id)) if *id != existing.id() => Some(ErrorCode::id_update_not_allowed()),
            _ => None,
        };

        let mut result = ValidationResult::new();
        for ring in RuleRing::ALL {
            if ring == RuleRing::Immutable {
                if let Some(error) = id_violation.take() {
                    result.push(error);
                }
            }
            self.execute_ring(ring, &snapshot, ctx, &mut result).await?;
        }

        if result.is_invalid() {
            tracing::info!(
                "{} {} rejected with {} validation error(s)",
                E::TABLE,
                ctx.operation.as_str(),
                result.errors().len()
            );
            Ok(Err(result))
        } else {
            Ok(Ok(snapshot))
        }
    }
}

impl<E: Entity> Default for RulePipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}
