use crate::database::Database;
use crate::tenancy::AccessScope;
use crate::types::Operation;

/// Everything a rule may consult while checking a snapshot
pub struct RuleContext<'a, E> {
    pub db: &'a Database,
    pub scope: &'a AccessScope,
    pub operation: Operation,
    /// Persisted state before the delta (None for creates)
    pub original: Option<&'a E>,
}

impl<'a, E> RuleContext<'a, E> {
    pub fn for_create(db: &'a Database, scope: &'a AccessScope) -> Self {
        Self {
            db,
            scope,
            operation: Operation::Create,
            original: None,
        }
    }

    pub fn for_update(db: &'a Database, scope: &'a AccessScope, original: &'a E) -> Self {
        Self {
            db,
            scope,
            operation: Operation::Update,
            original: Some(original),
        }
    }
}
