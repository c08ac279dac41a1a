// Reusable validation rules. Entities assemble these into a `RulePipeline`
// from their `Patchable::rules()` implementation.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::entities::{Entity, Fetchable};
use crate::observer::context::RuleContext;
use crate::observer::traits::{Rule, RuleRing};
use crate::outcome::{ErrorCode, ValidationResult};
use crate::types::Operation;

/// A value that must be present (non-blank string, non-nil id, Some)
pub struct Required<E> {
    property: &'static str,
    present: fn(&E) -> bool,
    create_only: bool,
}

impl<E> Required<E> {
    pub fn new(property: &'static str, present: fn(&E) -> bool) -> Self {
        Self { property, present, create_only: false }
    }

    /// Only enforce on create; patches may leave the value unset
    pub fn on_create(mut self) -> Self {
        self.create_only = true;
        self
    }
}

#[async_trait]
impl<E: Entity> Rule<E> for Required<E> {
    fn name(&self) -> &'static str {
        "Required"
    }

    fn ring(&self) -> RuleRing {
        RuleRing::Required
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        !self.create_only || op == Operation::Create
    }

    async fn check(&self, snapshot: &E, _ctx: &RuleContext<'_, E>, result: &mut ValidationResult) -> Result<(), DatabaseError> {
        if !(self.present)(snapshot) {
            result.push(ErrorCode::required(self.property));
        }
        Ok(())
    }
}

/// Keys such as i18n names must not be purely numeric
pub struct NotNumericKey<E> {
    property: &'static str,
    value: fn(&E) -> &str,
}

impl<E> NotNumericKey<E> {
    pub fn new(property: &'static str, value: fn(&E) -> &str) -> Self {
        Self { property, value }
    }
}

pub(crate) fn is_numeric_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty()
        && key.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
        && key.chars().any(|c| c.is_ascii_digit())
}

#[async_trait]
impl<E: Entity> Rule<E> for NotNumericKey<E> {
    fn name(&self) -> &'static str {
        "NotNumericKey"
    }

    fn ring(&self) -> RuleRing {
        RuleRing::Format
    }

    async fn check(&self, snapshot: &E, _ctx: &RuleContext<'_, E>, result: &mut ValidationResult) -> Result<(), DatabaseError> {
        let key = (self.value)(snapshot);
        if is_numeric_key(key) {
            result.push(ErrorCode::format_invalid(
                self.property,
                format!("{} '{}' must not be numeric", self.property, key),
            ));
        }
        Ok(())
    }
}

/// The referenced `R` exists and the caller can see it.
/// A row outside the caller's scope is reported exactly like a missing one.
pub struct ForeignKey<E, R> {
    property: &'static str,
    value: fn(&E) -> Option<Uuid>,
    _target: PhantomData<fn() -> R>,
}

impl<E, R> ForeignKey<E, R> {
    pub fn new(property: &'static str, value: fn(&E) -> Option<Uuid>) -> Self {
        Self { property, value, _target: PhantomData }
    }
}

#[async_trait]
impl<E: Entity, R: Fetchable> Rule<E> for ForeignKey<E, R> {
    fn name(&self) -> &'static str {
        "ForeignKey"
    }

    fn ring(&self) -> RuleRing {
        RuleRing::ForeignKey
    }

    async fn check(&self, snapshot: &E, ctx: &RuleContext<'_, E>, result: &mut ValidationResult) -> Result<(), DatabaseError> {
        let Some(id) = (self.value)(snapshot) else {
            return Ok(());
        };
        if id.is_nil() {
            return Ok(());
        }

        let visible = match R::repository(ctx.db).find(id).await? {
            Some(target) => ctx.scope.permits(&target.scope()),
            None => false,
        };
        if !visible {
            tracing::debug!("{} {} not found or not visible for {}", self.property, id, E::TABLE);
            result.push(ErrorCode::fk_missing(self.property, id));
        }
        Ok(())
    }
}

/// A direct tenant column must name one of the caller's tenants
pub struct TenantBinding<E> {
    property: &'static str,
    value: fn(&E) -> Uuid,
}

impl<E> TenantBinding<E> {
    pub fn new(property: &'static str, value: fn(&E) -> Uuid) -> Self {
        Self { property, value }
    }
}

#[async_trait]
impl<E: Entity> Rule<E> for TenantBinding<E> {
    fn name(&self) -> &'static str {
        "TenantBinding"
    }

    fn ring(&self) -> RuleRing {
        RuleRing::ForeignKey
    }

    async fn check(&self, snapshot: &E, ctx: &RuleContext<'_, E>, result: &mut ValidationResult) -> Result<(), DatabaseError> {
        let tenant_id = (self.value)(snapshot);
        if !tenant_id.is_nil() && !ctx.scope.belongs_to(tenant_id) {
            result.push(ErrorCode::tenant_mismatch(
                self.property,
                format!("caller is not a member of tenant {}", tenant_id),
            ));
        }
        Ok(())
    }
}

/// No other row of `E` shares this value
pub struct Unique<E> {
    property: &'static str,
    value: fn(&E) -> &str,
    ignore_case: bool,
}

impl<E> Unique<E> {
    pub fn new(property: &'static str, value: fn(&E) -> &str) -> Self {
        Self {
            property,
            value,
            ignore_case: false,
        }
    }

    /// Treat values differing only in ASCII case as the same
    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

#[async_trait]
impl<E: Entity> Rule<E> for Unique<E> {
    fn name(&self) -> &'static str {
        "Unique"
    }

    fn ring(&self) -> RuleRing {
        RuleRing::Uniqueness
    }

    async fn check(&self, snapshot: &E, ctx: &RuleContext<'_, E>, result: &mut ValidationResult) -> Result<(), DatabaseError> {
        let value = (self.value)(snapshot);
        if value.trim().is_empty() {
            return Ok(());
        }

        let repository = E::repository(ctx.db);
        let siblings = if self.ignore_case {
            let mut rows = repository.list().await?;
            rows.retain(|other| (self.value)(other).eq_ignore_ascii_case(value));
            rows
        } else {
            repository.find_by(self.property, &Value::String(value.to_string())).await?
        };
        if siblings.iter().any(|other| other.id() != snapshot.id()) {
            result.push(ErrorCode::duplicate(self.property, value));
        }
        Ok(())
    }
}

/// Walking the parent chain from the snapshot never reaches the snapshot itself
pub struct AcyclicParent<E> {
    property: &'static str,
    parent: fn(&E) -> Option<Uuid>,
}

impl<E> AcyclicParent<E> {
    pub fn new(property: &'static str, parent: fn(&E) -> Option<Uuid>) -> Self {
        Self { property, parent }
    }
}

#[async_trait]
impl<E: Entity> Rule<E> for AcyclicParent<E> {
    fn name(&self) -> &'static str {
        "AcyclicParent"
    }

    fn ring(&self) -> RuleRing {
        RuleRing::Hierarchy
    }

    async fn check(&self, snapshot: &E, ctx: &RuleContext<'_, E>, result: &mut ValidationResult) -> Result<(), DatabaseError> {
        let own_id = snapshot.id();
        let mut seen = HashSet::new();
        let mut current = (self.parent)(snapshot);

        while let Some(ancestor) = current {
            if ancestor == own_id {
                result.push(ErrorCode::circular_reference(self.property));
                break;
            }
            // An existing loop that does not pass through us is not our problem
            if !seen.insert(ancestor) {
                break;
            }
            current = E::repository(ctx.db).find(ancestor).await?.and_then(|row| (self.parent)(&row));
        }
        Ok(())
    }
}
