//! Grant store tests
//!
//! Link stamping per kind, visibility-scoped removal, idempotent regrant
//! and missing-entity errors, checked against the stored rows.

use cretoai_rbac::{
    AbilitySpec, EntityStore, Filter, GrantStore, InMemoryStore, Rbac, RbacConfig, RbacError,
    RbacStore, Resolver, Role, ScopeContext, ScopeFilter, ScopeId, SubjectRef, Target, Verdict,
};
use std::sync::Arc;

struct Fixture {
    store: Arc<InMemoryStore>,
    entities: EntityStore,
    grants: GrantStore,
    resolver: Resolver,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let shared: Arc<dyn RbacStore> = store.clone();
    let entities = EntityStore::new(shared.clone());
    let grants = GrantStore::new(shared.clone(), entities.clone());
    let resolver = Resolver::new(shared);

    Fixture {
        store,
        entities,
        grants,
        resolver,
    }
}

fn alice() -> SubjectRef {
    SubjectRef::new("user:alice")
}

fn scope(id: i64) -> Option<ScopeId> {
    Some(ScopeId::from(id))
}

#[tokio::test]
async fn test_link_kinds_stamped_independently() -> anyhow::Result<()> {
    let f = fixture();
    let ctx = ScopeContext::to(7).only_relations();

    let ability = f.entities.create_ability(&ctx, &AbilitySpec::new("edit", "Post")).await?;
    let role = f.entities.create_role(&ctx, "editor").await?;
    assert_eq!(ability.scope, None);
    assert_eq!(role.scope, None);

    let permission = f.grants.grant(&ctx, &alice(), &ability).await?;
    let assignment = f.grants.assign_role(&ctx, &alice(), &role).await?;
    let link = f.grants.attach_ability_to_role(&ctx, &role, &ability).await?;
    assert_eq!(permission.scope, scope(7));
    assert_eq!(assignment.scope, scope(7));
    assert_eq!(link.scope, scope(7));

    let shared = ctx.clone().dont_scope_role_abilities();
    let other = f.entities.create_role(&shared, "reviewer").await?;
    let link = f.grants.attach_ability_to_role(&shared, &other, &ability).await?;
    assert_eq!(link.scope, None);

    let assignment = f.grants.assign_role(&shared, &alice(), &other).await?;
    assert_eq!(assignment.scope, scope(7));

    Ok(())
}

#[tokio::test]
async fn test_regrant_same_stamp_is_noop() -> anyhow::Result<()> {
    let f = fixture();
    let ctx = ScopeContext::to(1);

    let ability = f.entities.create_ability(&ctx, &AbilitySpec::new("edit", "Post")).await?;
    f.grants.grant(&ctx, &alice(), &ability).await?;
    f.grants.grant(&ctx, &alice(), &ability).await?;

    let rows = f.store.permissions(&Filter::new().subject(&alice())).await?;
    assert_eq!(rows.len(), 1);

    // A different stamp is a different link
    let global = ScopeContext::global();
    f.grants.grant(&global, &alice(), &ability).await?;
    let rows = f.store.permissions(&Filter::new().subject(&alice())).await?;
    assert_eq!(rows.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_missing_entities_not_found() {
    let f = fixture();
    let ctx = ScopeContext::global();

    // Built against a different store, so the ids are unknown here
    let elsewhere = EntityStore::new(Arc::new(InMemoryStore::new()));
    let ability = elsewhere
        .create_ability(&ctx, &AbilitySpec::new("edit", "Post"))
        .await
        .unwrap();
    let role: Role = elsewhere.create_role(&ctx, "ghost").await.unwrap();

    let err = f.grants.grant(&ctx, &alice(), &ability).await.unwrap_err();
    assert!(matches!(err, RbacError::NotFound(_)));

    let err = f.grants.assign_role(&ctx, &alice(), &role).await.unwrap_err();
    assert!(matches!(err, RbacError::NotFound(_)));

    let known = f.entities.create_role(&ctx, "known").await.unwrap();
    let err = f
        .grants
        .attach_ability_to_role(&ctx, &known, &ability)
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::NotFound(_)));
}

#[tokio::test]
async fn test_revoke_only_visible_links() -> anyhow::Result<()> {
    let f = fixture();
    let one = ScopeContext::to(1).only_relations();
    let two = ScopeContext::to(2).only_relations();

    let ability = f.entities.create_ability(&one, &AbilitySpec::new("edit", "Post")).await?;
    f.grants.grant(&one, &alice(), &ability).await?;
    f.grants.grant(&two, &alice(), &ability).await?;

    assert_eq!(f.grants.revoke(&two, &alice(), &ability).await?, 1);
    assert_eq!(f.grants.revoke(&two, &alice(), &ability).await?, 0);

    let left = f
        .store
        .permissions(&Filter::new().subject(&alice()).scope(ScopeFilter::Any))
        .await?;
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].scope, scope(1));

    Ok(())
}

#[tokio::test]
async fn test_removal_reaches_global_links() -> anyhow::Result<()> {
    let f = fixture();
    let global = ScopeContext::global();
    let spec = AbilitySpec::new("delete", "Post");

    f.grants.forbid(&global, &alice(), &spec).await?;
    assert_eq!(
        f.resolver.authorize(&ScopeContext::to(3), &alice(), "delete", &Target::new("Post")).await?,
        Verdict::Deny
    );

    assert_eq!(f.grants.unforbid(&ScopeContext::to(3), &alice(), &spec).await?, 1);
    assert!(f.store.permissions(&Filter::new().subject(&alice())).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unforbid_leaves_allows() -> anyhow::Result<()> {
    let f = fixture();
    let ctx = ScopeContext::to(1);
    let spec = AbilitySpec::new("publish", "Post");

    let allow = f.entities.find_or_create_ability(&ctx, &spec, false).await?;
    f.grants.grant(&ctx, &alice(), &allow).await?;
    f.grants.forbid(&ctx, &alice(), &spec).await?;

    assert_eq!(f.grants.unforbid(&ctx, &alice(), &spec).await?, 1);
    assert_eq!(
        f.resolver.authorize(&ctx, &alice(), "publish", &Target::new("Post")).await?,
        Verdict::Allow
    );

    assert_eq!(f.grants.disallow(&ctx, &alice(), &spec).await?, 1);
    assert_eq!(
        f.resolver.authorize(&ctx, &alice(), "publish", &Target::new("Post")).await?,
        Verdict::Deny
    );

    Ok(())
}

#[tokio::test]
async fn test_retract_and_detach() -> anyhow::Result<()> {
    let f = fixture();
    let ctx = ScopeContext::to(4);
    let target = Target::new("Post");

    let role = f.entities.create_role(&ctx, "editor").await?;
    let ability = f.entities.create_ability(&ctx, &AbilitySpec::new("edit", "Post")).await?;
    f.grants.attach_ability_to_role(&ctx, &role, &ability).await?;
    f.grants.assign_role(&ctx, &alice(), &role).await?;
    assert!(f.resolver.authorize(&ctx, &alice(), "edit", &target).await?.is_allow());

    assert_eq!(f.grants.detach_ability_from_role(&ctx, &role, &ability).await?, 1);
    assert!(!f.resolver.authorize(&ctx, &alice(), "edit", &target).await?.is_allow());
    assert!(f.resolver.has_role(&ctx, &alice(), "editor").await?);

    assert_eq!(f.grants.retract_role(&ctx, &alice(), &role).await?, 1);
    assert!(!f.resolver.has_role(&ctx, &alice(), "editor").await?);
    assert_eq!(f.grants.retract_role(&ctx, &alice(), &role).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_role_forbid_lifecycle() -> anyhow::Result<()> {
    let f = fixture();
    let ctx = ScopeContext::to(5);
    let spec = AbilitySpec::new("delete", "Post");
    let target = Target::new("Post");

    let role = f.entities.create_role(&ctx, "moderator").await?;
    let allow = f.entities.find_or_create_ability(&ctx, &spec, false).await?;
    f.grants.attach_ability_to_role(&ctx, &role, &allow).await?;
    f.grants.forbid_for_role(&ctx, &role, &spec).await?;
    f.grants.assign_role(&ctx, &alice(), &role).await?;

    assert_eq!(f.resolver.authorize(&ctx, &alice(), "delete", &target).await?, Verdict::Deny);

    assert_eq!(f.grants.unforbid_for_role(&ctx, &role, &spec).await?, 1);
    assert_eq!(f.resolver.authorize(&ctx, &alice(), "delete", &target).await?, Verdict::Allow);

    assert_eq!(f.grants.disallow_for_role(&ctx, &role, &spec).await?, 1);
    assert_eq!(f.resolver.authorize(&ctx, &alice(), "delete", &target).await?, Verdict::Deny);

    Ok(())
}

#[tokio::test]
async fn test_retract_by_name_covers_tenant_and_global_roles() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let rbac = Rbac::with_config(RbacConfig::default(), store.clone())?;
    let ctx = ScopeContext::to(2);

    // Global "admin" assigned in tenant 2, then a tenant-owned "admin" appears
    let global = rbac.assign(&ScopeContext::to(2).only_relations(), &alice(), "admin").await?;
    assert_eq!(global.scope, None);
    let local = rbac.entities().create_role(&ctx, "admin").await?;
    assert_eq!(local.scope, scope(2));
    assert!(rbac.is_a(&ctx, &alice(), "admin").await?);

    assert_eq!(rbac.retract(&ctx, &alice(), "admin").await?, 1);
    assert!(!rbac.is_a(&ctx, &alice(), "admin").await?);

    // Holding both at once loses both
    rbac.grants().assign_role(&ctx, &alice(), &global).await?;
    rbac.grants().assign_role(&ctx, &alice(), &local).await?;
    assert_eq!(rbac.resolver().roles_for(&ctx, &alice()).await?.len(), 2);

    assert_eq!(rbac.retract(&ctx, &alice(), "admin").await?, 2);
    assert!(!rbac.is_a(&ctx, &alice(), "admin").await?);
    assert!(store.role_assignments(&Filter::new().subject(&alice())).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_retract_by_name_leaves_other_tenants() -> anyhow::Result<()> {
    let rbac = Rbac::new();

    rbac.assign(&ScopeContext::to(1).only_relations(), &alice(), "admin").await?;
    rbac.assign(&ScopeContext::to(2).only_relations(), &alice(), "admin").await?;

    assert_eq!(rbac.retract(&ScopeContext::to(2), &alice(), "admin").await?, 1);
    assert!(rbac.is_a(&ScopeContext::to(1), &alice(), "admin").await?);

    Ok(())
}

#[tokio::test]
async fn test_blank_subject_and_scope_rejected() {
    let f = fixture();
    let ctx = ScopeContext::to(1);
    let spec = AbilitySpec::new("create", "User");

    let ability = f.entities.create_ability(&ctx, &spec).await.unwrap();
    let role = f.entities.create_role(&ctx, "admin").await.unwrap();

    let err = f.grants.grant(&ctx, &SubjectRef::new(""), &ability).await.unwrap_err();
    assert!(matches!(err, RbacError::Validation(_)));

    let err = f.grants.assign_role(&ctx, &SubjectRef::new(" "), &role).await.unwrap_err();
    assert!(matches!(err, RbacError::Validation(_)));

    let blank = ScopeContext::to("");
    let err = f.entities.create_ability(&blank, &spec).await.unwrap_err();
    assert!(matches!(err, RbacError::Validation(_)));

    let err = f.entities.create_role(&blank, "admin").await.unwrap_err();
    assert!(matches!(err, RbacError::Validation(_)));

    let err = f.grants.grant(&blank, &alice(), &ability).await.unwrap_err();
    assert!(matches!(err, RbacError::Validation(_)));

    let err = f.grants.attach_ability_to_role(&blank, &role, &ability).await.unwrap_err();
    assert!(matches!(err, RbacError::Validation(_)));

    assert!(f.store.permissions(&Filter::new()).await.unwrap().is_empty());
    assert!(f.store.role_abilities(&Filter::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_tenant_never_authorizes() {
    let rbac = Rbac::new();
    let blank = ScopeContext::to("");
    let target = Target::new("User");

    let err = rbac
        .allow(&blank, &SubjectRef::new(""), &AbilitySpec::new("create", "User"))
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::Validation(_)));

    let err = rbac.allow(&blank, &alice(), &AbilitySpec::new("create", "User")).await.unwrap_err();
    assert!(matches!(err, RbacError::Validation(_)));

    assert!(rbac.cannot(&blank, &alice(), "create", &target).await.unwrap());
}
