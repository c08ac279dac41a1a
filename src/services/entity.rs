use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{resolve_user, Principal};
use crate::config::QueryConfig;
use crate::database::Database;
use crate::entities::{Creatable, Deletable, Effects, Fetchable, Patchable, TenantScope};
use crate::observer::RuleContext;
use crate::odata::{apply_query, ODataQuery, Page};
use crate::outcome::{CommandResult, ErrorCode, Outcome, QueryResult};
use crate::services::ServiceError;
use crate::storage::NotificationSender;
use crate::tenancy::{visible_entities, visible_entity, AccessScope};

/// Generic tenant-scoped CRUD over every entity type.
///
/// Each operation resolves the caller and their tenant set exactly once,
/// then works only with rows inside that scope.
#[derive(Clone)]
pub struct EntityService {
    db: Database,
    notifier: Arc<dyn NotificationSender>,
    query: QueryConfig,
}

/// Resolve the caller's scope or return `Unauthorized` from the enclosing operation
macro_rules! caller_scope {
    ($self:ident, $principal:expr) => {
        match $self.scope_for($principal).await? {
            Some(scope) => scope,
            None => return Ok(Outcome::unauthorized(vec![ErrorCode::missing_user_id()])),
        }
    };
}

impl EntityService {
    pub fn new(db: Database, notifier: Arc<dyn NotificationSender>, query: QueryConfig) -> Self {
        Self { db, notifier, query }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Shared rows need at least one tenant membership to change
    fn shared_change_denied<E: Fetchable>(scope: &AccessScope, entity: &E) -> bool {
        let target = entity.scope();
        if !matches!(target, TenantScope::Global) || scope.may_change(&target) {
            return false;
        }
        info!("User {} has no tenant and may not change {}", scope.user_id, E::TABLE);
        true
    }

    async fn scope_for(&self, principal: Option<&Principal>) -> Result<Option<AccessScope>, ServiceError> {
        match resolve_user(principal) {
            Some(user_id) => Ok(Some(AccessScope::resolve(&self.db, user_id).await?)),
            None => {
                debug!("Request without a usable user id claim");
                Ok(None)
            }
        }
    }

    pub async fn list<E: Fetchable>(
        &self,
        principal: Option<&Principal>,
        query: &ODataQuery,
    ) -> Result<QueryResult<Page<E>>, ServiceError> {
        let scope = caller_scope!(self, principal);
        let rows: Vec<E> = visible_entities(&self.db, &scope).await?;

        match apply_query(rows, query, &self.query) {
            Ok(page) => Ok(Outcome::ok(page)),
            Err(e) => {
                debug!("Rejected query on {}: {}", E::SET, e);
                Ok(Outcome::bad_request(vec![e.to_error_code()]))
            }
        }
    }

    pub async fn get<E: Fetchable>(&self, principal: Option<&Principal>, id: Uuid) -> Result<QueryResult<E>, ServiceError> {
        let scope = caller_scope!(self, principal);
        match visible_entity::<E>(&self.db, &scope, id).await? {
            Some(entity) => Ok(Outcome::ok(entity)),
            None => Ok(Outcome::not_found()),
        }
    }

    /// `delta` is None when the body was missing, null or not valid JSON for `E::Delta`
    pub async fn create<E: Creatable>(
        &self,
        principal: Option<&Principal>,
        delta: Option<E::Delta>,
    ) -> Result<CommandResult<E>, ServiceError> {
        let scope = caller_scope!(self, principal);
        let Some(delta) = delta else {
            return Ok(Outcome::bad_request(vec![ErrorCode::entity_format_invalid()]));
        };

        let blank = E::blank(Uuid::new_v4());
        if Self::shared_change_denied(&scope, &blank) {
            return Ok(Outcome::unauthorized(vec![ErrorCode::no_tenant_membership()]));
        }
        let ctx = RuleContext::for_create(&self.db, &scope);
        let mut entity = match E::rules().apply_and_validate(&blank, &delta, &ctx).await? {
            Ok(entity) => entity,
            Err(result) => return Ok(Outcome::bad_request(result.into_errors())),
        };

        entity.audit_mut().stamp_created(scope.user_id, Utc::now());
        E::repository(&self.db).insert(&entity).await?;

        let effects = Effects {
            db: &self.db,
            notifier: self.notifier.as_ref(),
            user_id: scope.user_id,
        };
        entity.after_create(&effects).await?;

        info!("Created {} {} by {}", E::TABLE, entity.id(), scope.user_id);
        let id = entity.id();
        Ok(Outcome::created(entity, id))
    }

    pub async fn patch<E: Patchable>(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
        delta: Option<E::Delta>,
    ) -> Result<CommandResult<E>, ServiceError> {
        let scope = caller_scope!(self, principal);
        let delta = match delta {
            Some(delta) if !E::delta_is_empty(&delta) => delta,
            _ => return Ok(Outcome::bad_request(vec![ErrorCode::entity_format_invalid()])),
        };

        let Some(existing) = visible_entity::<E>(&self.db, &scope, id).await? else {
            return Ok(Outcome::not_found());
        };
        if Self::shared_change_denied(&scope, &existing) {
            return Ok(Outcome::unauthorized(vec![ErrorCode::no_tenant_membership()]));
        }

        let ctx = RuleContext::for_update(&self.db, &scope, &existing);
        let mut entity = match E::rules().apply_and_validate(&existing, &delta, &ctx).await? {
            Ok(entity) => entity,
            Err(result) => return Ok(Outcome::bad_request(result.into_errors())),
        };

        entity.audit_mut().stamp_modified(scope.user_id, Utc::now());
        E::repository(&self.db).update(&entity).await?;

        info!("Updated {} {} by {}", E::TABLE, id, scope.user_id);
        Ok(Outcome::ok(entity))
    }

    pub async fn delete<E: Deletable>(&self, principal: Option<&Principal>, id: Uuid) -> Result<CommandResult<()>, ServiceError> {
        let scope = caller_scope!(self, principal);
        let Some(existing) = visible_entity::<E>(&self.db, &scope, id).await? else {
            return Ok(Outcome::not_found());
        };
        if Self::shared_change_denied(&scope, &existing) {
            return Ok(Outcome::unauthorized(vec![ErrorCode::no_tenant_membership()]));
        }

        if let Some(blocked) = existing.blocking_dependents(&self.db).await? {
            info!("Delete of {} {} blocked: {}", E::TABLE, id, blocked.description);
            return Ok(Outcome::bad_request(vec![blocked]));
        }

        if !E::repository(&self.db).delete(id).await? {
            // Removed concurrently between the lookup and the delete
            return Ok(Outcome::not_found());
        }
        existing.after_delete(&self.db).await?;

        info!("Deleted {} {} by {}", E::TABLE, id, scope.user_id);
        Ok(Outcome::no_content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::config::AppConfig;
    use crate::database::seed::{seed, DemoData};
    use crate::entities::{
        Dashboard, DashboardOption, DashboardOptionDelta, InAppMessage, LimitType, LimitTypeDelta, Location,
        LocationDelta, Parameter, ProductOfferingTenantLocation,
    };
    use crate::outcome::codes;
    use crate::storage::MemoryNotifier;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};

    struct Fixture {
        service: EntityService,
        notifier: Arc<MemoryNotifier>,
        demo: DemoData,
        principal: Principal,
    }

    async fn fixture() -> Fixture {
        let db = Database::memory();
        let demo = seed(&db).await.unwrap();
        let notifier = Arc::new(MemoryNotifier::new());
        let service = EntityService::new(db, notifier.clone(), AppConfig::development().query);
        let principal = principal_for(demo.user);
        Fixture { service, notifier, demo, principal }
    }

    fn principal_for(user_id: Uuid) -> Principal {
        Principal {
            claims: Claims::new(Some(user_id.to_string()), None, 1),
        }
    }

    fn delta<D: DeserializeOwned>(body: Value) -> Option<D> {
        Some(serde_json::from_value(body).unwrap())
    }

    fn codes_of<T>(outcome: &Outcome<T>) -> Vec<&str> {
        outcome.errors().iter().map(|e| e.code.as_str()).collect()
    }

    #[tokio::test]
    async fn missing_user_claim_is_unauthorized() {
        let f = fixture().await;
        let no_claim = Principal { claims: Claims::new(None, None, 1) };

        let outcome = f.service.get::<Location>(Some(&no_claim), f.demo.site_a).await.unwrap();
        assert_eq!(codes_of(&outcome), vec![codes::TOKEN_INVALID_MISSING_USER_ID]);
        assert!(matches!(outcome, Outcome::Unauthorized(_)));

        let outcome = f.service.list::<Location>(None, &ODataQuery::default()).await.unwrap();
        assert!(matches!(outcome, Outcome::Unauthorized(_)));
    }

    #[tokio::test]
    async fn patch_leaves_absent_fields_untouched() {
        let f = fixture().await;
        let before = f.service.database().locations.find(f.demo.line_a).await.unwrap().unwrap();

        let outcome = f
            .service
            .patch::<Location>(Some(&f.principal), f.demo.line_a, delta(json!({"name": "Cooling Tower 2"})))
            .await
            .unwrap();
        let after = outcome.into_payload().unwrap();

        assert_eq!(after.name, "Cooling Tower 2");
        assert_eq!(after.parent_id, before.parent_id);
        assert_eq!(after.location_type, before.location_type);
        assert_eq!(after.is_active, before.is_active);
        assert_eq!(after.audit.created_by_id, before.audit.created_by_id);
        assert_eq!(after.audit.created_on, before.audit.created_on);
        assert_eq!(after.audit.modified_by_id, f.demo.user);
    }

    #[tokio::test]
    async fn other_tenants_rows_are_not_found() {
        let f = fixture().await;

        let foreign = f.service.get::<Location>(Some(&f.principal), f.demo.site_b).await.unwrap();
        let missing = f.service.get::<Location>(Some(&f.principal), Uuid::new_v4()).await.unwrap();
        assert_eq!(foreign, Outcome::NotFound);
        assert_eq!(missing, Outcome::NotFound);

        let patched = f
            .service
            .patch::<Location>(Some(&f.principal), f.demo.site_b, delta(json!({"name": "Mine now"})))
            .await
            .unwrap();
        assert_eq!(patched, Outcome::NotFound);
        let deleted = f.service.delete::<Location>(Some(&f.principal), f.demo.site_b).await.unwrap();
        assert_eq!(deleted, Outcome::NotFound);
    }

    #[tokio::test]
    async fn every_violation_is_reported() {
        let f = fixture().await;
        let outcome = f
            .service
            .patch::<Location>(
                Some(&f.principal),
                f.demo.line_a,
                delta(json!({"id": Uuid::new_v4(), "name": " ", "parentId": f.demo.site_b})),
            )
            .await
            .unwrap();

        assert_eq!(codes_of(&outcome), vec![codes::REQUIRED, codes::FK_MISSING, codes::IMMUTABLE_FIELD]);
    }

    #[tokio::test]
    async fn id_changes_are_rejected() {
        let f = fixture().await;
        let outcome = f
            .service
            .patch::<Location>(Some(&f.principal), f.demo.line_a, delta(json!({"id": Uuid::new_v4()})))
            .await
            .unwrap();

        assert_eq!(outcome.errors().len(), 1);
        assert_eq!(outcome.errors()[0].description, "id update not allowed");
        assert_eq!(outcome.errors()[0].property.as_deref(), Some("id"));

        let same_id = f
            .service
            .patch::<Location>(Some(&f.principal), f.demo.line_a, delta(json!({"id": f.demo.line_a})))
            .await
            .unwrap();
        assert!(same_id.is_success());
    }

    #[tokio::test]
    async fn circular_parents_are_rejected() {
        let f = fixture().await;

        let self_parent = f
            .service
            .patch::<Location>(Some(&f.principal), f.demo.site_a, delta(json!({"parentId": f.demo.site_a})))
            .await
            .unwrap();
        assert_eq!(codes_of(&self_parent), vec![codes::CIRCULAR_REFERENCE]);

        let descendant = f
            .service
            .patch::<Location>(Some(&f.principal), f.demo.site_a, delta(json!({"parentId": f.demo.line_a})))
            .await
            .unwrap();
        assert_eq!(codes_of(&descendant), vec![codes::CIRCULAR_REFERENCE]);
    }

    #[tokio::test]
    async fn created_dashboard_option_is_fetchable_with_audit() {
        let f = fixture().await;
        let created = f
            .service
            .create::<DashboardOption>(
                Some(&f.principal),
                delta::<DashboardOptionDelta>(json!({"tenantId": f.demo.tenant_a, "options": {"theme": "dark"}})),
            )
            .await
            .unwrap();

        let Outcome::Created { payload, id } = created else {
            panic!("expected Created, got {:?}", created);
        };
        assert_eq!(payload.id, id);

        let fetched = f.service.get::<DashboardOption>(Some(&f.principal), id).await.unwrap();
        let fetched = fetched.into_payload().unwrap();
        assert_eq!(fetched.options, json!({"theme": "dark"}));
        assert_eq!(fetched.audit.created_by_id, f.demo.user);
        assert_eq!(fetched.audit.modified_by_id, f.demo.user);
    }

    #[tokio::test]
    async fn cross_tenant_create_persists_nothing() {
        let f = fixture().await;
        let before = f.service.database().dashboard_options.list().await.unwrap().len();

        let outcome = f
            .service
            .create::<DashboardOption>(
                Some(&f.principal),
                delta::<DashboardOptionDelta>(json!({"tenantId": f.demo.tenant_b, "options": {}})),
            )
            .await
            .unwrap();

        assert_eq!(codes_of(&outcome), vec![codes::TENANT_MISMATCH]);
        assert_eq!(f.service.database().dashboard_options.list().await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn duplicate_limit_type_key_keeps_original() {
        let f = fixture().await;
        let outcome = f
            .service
            .create::<LimitType>(
                Some(&f.principal),
                delta::<LimitTypeDelta>(json!({"i18nKeyName": "limit.high", "name": "Another high"})),
            )
            .await
            .unwrap();
        assert_eq!(codes_of(&outcome), vec![codes::DUPLICATE]);
        assert_eq!(f.service.database().limit_types.list().await.unwrap().len(), 2);

        // Renaming a sibling onto the taken key, in any case, keeps the sibling as it was
        for key in ["limit.high", "LIMIT.HIGH"] {
            let outcome = f
                .service
                .patch::<LimitType>(
                    Some(&f.principal),
                    f.demo.limit_type_low,
                    delta::<LimitTypeDelta>(json!({"i18nKeyName": key})),
                )
                .await
                .unwrap();
            assert_eq!(codes_of(&outcome), vec![codes::DUPLICATE], "key {}", key);
        }
        let low = f.service.get::<LimitType>(Some(&f.principal), f.demo.limit_type_low).await.unwrap();
        assert_eq!(low.into_payload().unwrap().i18n_key_name, "limit.low");
    }

    #[tokio::test]
    async fn tenantless_caller_cannot_change_shared_rows() {
        let f = fixture().await;
        let stranger = principal_for(Uuid::new_v4());

        // Still readable
        let read = f.service.get::<LimitType>(Some(&stranger), f.demo.limit_type).await.unwrap();
        assert!(read.is_success());

        let patched = f
            .service
            .patch::<LimitType>(Some(&stranger), f.demo.limit_type, delta(json!({"name": "Renamed"})))
            .await
            .unwrap();
        assert!(matches!(patched, Outcome::Unauthorized(_)));
        assert_eq!(codes_of(&patched), vec![codes::TENANT_MISMATCH]);

        let created = f
            .service
            .create::<LimitType>(
                Some(&stranger),
                delta::<LimitTypeDelta>(json!({"i18nKeyName": "limit.mid", "name": "Mid"})),
            )
            .await
            .unwrap();
        assert!(matches!(created, Outcome::Unauthorized(_)));

        let stored = f.service.database().limit_types.find(f.demo.limit_type).await.unwrap().unwrap();
        assert_eq!(stored.name, "High");
        assert_eq!(f.service.database().limit_types.list().await.unwrap().len(), 2);

        // Any membership is enough
        let member = f
            .service
            .patch::<LimitType>(Some(&f.principal), f.demo.limit_type, delta(json!({"name": "Very high"})))
            .await
            .unwrap();
        assert!(member.is_success());
        assert!(f.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn new_limit_type_is_broadcast() {
        let f = fixture().await;
        let outcome = f
            .service
            .create::<LimitType>(
                Some(&f.principal),
                delta::<LimitTypeDelta>(json!({"i18nKeyName": "limit.mid", "name": "Mid"})),
            )
            .await
            .unwrap();
        assert!(outcome.is_success());

        let sent = f.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].group, None);
        assert_eq!(sent[0].message, "New limit type: Mid");
    }

    #[tokio::test]
    async fn client_supplied_id_on_create_is_rejected() {
        let f = fixture().await;
        let outcome = f
            .service
            .create::<Location>(
                Some(&f.principal),
                delta::<LocationDelta>(json!({"id": Uuid::new_v4(), "name": "Pump house", "parentId": f.demo.site_a})),
            )
            .await
            .unwrap();

        assert_eq!(codes_of(&outcome), vec![codes::IMMUTABLE_FIELD]);
        assert_eq!(outcome.errors()[0].description, "id is assigned by the server");
    }

    #[tokio::test]
    async fn empty_or_missing_delta_is_malformed() {
        let f = fixture().await;
        let missing = f.service.create::<Location>(Some(&f.principal), None).await.unwrap();
        assert_eq!(codes_of(&missing), vec![codes::ENTITY_FORMAT_INVALID]);

        let empty = f
            .service
            .patch::<Location>(Some(&f.principal), f.demo.site_a, delta(json!({})))
            .await
            .unwrap();
        assert_eq!(codes_of(&empty), vec![codes::ENTITY_FORMAT_INVALID]);
    }

    #[tokio::test]
    async fn new_location_inherits_parent_tenant_links() {
        let f = fixture().await;
        let outcome = f
            .service
            .create::<Location>(
                Some(&f.principal),
                delta::<LocationDelta>(json!({"name": "Pump house", "parentId": f.demo.site_a})),
            )
            .await
            .unwrap();
        let Outcome::Created { id, .. } = outcome else {
            panic!("expected Created, got {:?}", outcome);
        };

        let links: Vec<ProductOfferingTenantLocation> = f
            .service
            .database()
            .tenant_locations
            .find_by("locationId", &json!(id))
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].tenant_id, f.demo.tenant_a);

        // Visible right away through the inherited link
        assert!(f.service.get::<Location>(Some(&f.principal), id).await.unwrap().is_success());

        let orphan = f
            .service
            .create::<Location>(Some(&f.principal), delta::<LocationDelta>(json!({"name": "Floating"})))
            .await
            .unwrap();
        assert_eq!(codes_of(&orphan), vec![codes::REQUIRED]);
    }

    #[tokio::test]
    async fn delete_guards_report_could_not_delete() {
        let f = fixture().await;

        let option = f.service.delete::<DashboardOption>(Some(&f.principal), f.demo.dashboard_option_a).await.unwrap();
        assert_eq!(codes_of(&option), vec![codes::COULD_NOT_DELETE]);

        let site = f.service.delete::<Location>(Some(&f.principal), f.demo.site_a).await.unwrap();
        assert_eq!(codes_of(&site), vec![codes::COULD_NOT_DELETE]);

        // Clear the dependents, then both deletes go through
        assert_eq!(
            f.service.delete::<Dashboard>(Some(&f.principal), f.demo.dashboard_a).await.unwrap(),
            Outcome::NoContent
        );
        assert_eq!(
            f.service.delete::<DashboardOption>(Some(&f.principal), f.demo.dashboard_option_a).await.unwrap(),
            Outcome::NoContent
        );
        assert_eq!(
            f.service.delete::<Parameter>(Some(&f.principal), f.demo.parameter_a).await.unwrap(),
            Outcome::NoContent
        );
        assert_eq!(
            f.service.delete::<Location>(Some(&f.principal), f.demo.line_a).await.unwrap(),
            Outcome::NoContent
        );
        let links = f
            .service
            .database()
            .tenant_locations
            .find_by("locationId", &json!(f.demo.line_a))
            .await
            .unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn in_app_message_notifies_tenant_group() {
        let f = fixture().await;
        let outcome = f
            .service
            .create::<InAppMessage>(
                Some(&f.principal),
                delta(json!({"tenantId": f.demo.tenant_a, "subject": "Maintenance", "body": "Tonight 22:00"})),
            )
            .await
            .unwrap();
        assert!(outcome.is_success());

        let sent = f.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].group.as_deref(), Some(format!("tenant-{}", f.demo.tenant_a).as_str()));
        assert_eq!(sent[0].message, "Maintenance");
    }

    #[tokio::test]
    async fn list_applies_odata_after_scoping() {
        let f = fixture().await;
        let query = ODataQuery {
            filter: Some("locationType eq 'line'".to_string()),
            count: Some(true),
            ..Default::default()
        };
        let page = f.service.list::<Location>(Some(&f.principal), &query).await.unwrap().into_payload().unwrap();
        assert_eq!(page.count, Some(1));
        assert_eq!(page.value[0].id, f.demo.line_a);

        let bad = ODataQuery { filter: Some("name eq".to_string()), ..Default::default() };
        let outcome = f.service.list::<Location>(Some(&f.principal), &bad).await.unwrap();
        assert_eq!(codes_of(&outcome), vec![codes::FORMAT_INVALID]);
    }
}
