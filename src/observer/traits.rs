use async_trait::async_trait;

use crate::database::DatabaseError;
use crate::entities::Entity;
use crate::observer::context::RuleContext;
use crate::outcome::ValidationResult;
use crate::types::Operation;

/// Validation rings, executed in ascending order.
/// Every ring runs even when an earlier one reported errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RuleRing {
    Required = 0,   // Non-empty names, keys, foreign key ids
    Format = 1,     // Shape of values (e.g. keys that are purely numeric)
    ForeignKey = 2, // Referenced rows exist, are visible, tenant bindings
    Uniqueness = 3, // Sibling rows sharing a key
    Immutable = 4,  // Id changes
    Hierarchy = 5,  // Parent chains
}

impl RuleRing {
    pub const ALL: [RuleRing; 6] = [
        RuleRing::Required,
        RuleRing::Format,
        RuleRing::ForeignKey,
        RuleRing::Uniqueness,
        RuleRing::Immutable,
        RuleRing::Hierarchy,
    ];
}

/// A single validation rule over a patched snapshot.
///
/// Rules report violations into `result` and only return `Err` for
/// infrastructure failures, which abort the whole request.
#[async_trait]
pub trait Rule<E: Entity>: Send + Sync {
    /// Rule name for logging and debugging
    fn name(&self) -> &'static str;

    /// Which ring this rule belongs to
    fn ring(&self) -> RuleRing;

    /// Check if rule applies to this operation
    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    async fn check(
        &self,
        snapshot: &E,
        ctx: &RuleContext<'_, E>,
        result: &mut ValidationResult,
    ) -> Result<(), DatabaseError>;
}
