mod common;

use common::{leave_request, test_store};
use dynaform::domain::{FormDefinition, TenantId};
use dynaform::engine::DEFAULT_TABLE_PREFIX;
use dynaform::persistence::{FormRepository, PersistenceError};
use uuid::Uuid;

#[tokio::test]
async fn test_migrations_are_recorded_once() {
    let (store, _dir) = test_store().await;

    let again = store.migrate().await.unwrap();
    assert_eq!(again.applied, 0);
    assert!(again.skipped > 0);

    let status = store.migration_status().await.unwrap();
    assert_eq!(status.len(), 2);
    assert!(status.iter().all(|m| m.applied && m.applied_at.is_some()));
}

#[tokio::test]
async fn test_add_and_load_definition() {
    let (store, _dir) = test_store().await;
    let tenant = TenantId::new(Uuid::new_v4());
    let form = FormDefinition::from_request(tenant, leave_request(), DEFAULT_TABLE_PREFIX);

    store.forms().add(&form).await.unwrap();

    let loaded = store
        .forms()
        .get_by_name(tenant, "leave_request")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, form.id);
    assert_eq!(loaded.tenant_id, tenant);
    assert_eq!(loaded.display_name, "Leave request");
    assert_eq!(loaded.description.as_deref(), Some("Annual and sick leave"));
    assert_eq!(loaded.fields.len(), form.fields.len());
    assert!(loaded.fields[0].is_required);
    assert_eq!(loaded.fields[0].label, "Reason");

    let by_id = store.forms().get_by_id(tenant, form.id).await.unwrap();
    assert!(by_id.is_some());

    // Ids from another tenant do not resolve
    let foreign = store
        .forms()
        .get_by_id(TenantId::new(Uuid::new_v4()), form.id)
        .await
        .unwrap();
    assert!(foreign.is_none());
}

#[tokio::test]
async fn test_concurrent_duplicate_reported_as_duplicate() {
    let (store, _dir) = test_store().await;
    let tenant = TenantId::new(Uuid::new_v4());

    // Two requests that both passed the existence check
    let first = FormDefinition::from_request(tenant, leave_request(), DEFAULT_TABLE_PREFIX);
    let second = FormDefinition::from_request(tenant, leave_request(), DEFAULT_TABLE_PREFIX);

    store.forms().add(&first).await.unwrap();
    let err = store.forms().add(&second).await.unwrap_err();
    assert!(matches!(err, PersistenceError::Duplicate { .. }));

    // The losing insert left no partial field rows behind
    let loaded = store
        .forms()
        .get_by_name(tenant, "leave_request")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, first.id);
    assert_eq!(loaded.fields.len(), first.fields.len());
}

#[tokio::test]
async fn test_list_and_delete() {
    let (store, _dir) = test_store().await;
    let tenant = TenantId::new(Uuid::new_v4());

    let mut other = leave_request();
    other.name = "expense_claim".to_string();

    store
        .forms()
        .add(&FormDefinition::from_request(tenant, leave_request(), DEFAULT_TABLE_PREFIX))
        .await
        .unwrap();
    store
        .forms()
        .add(&FormDefinition::from_request(tenant, other, DEFAULT_TABLE_PREFIX))
        .await
        .unwrap();

    let names: Vec<String> = store
        .forms()
        .list(tenant)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"leave_request".to_string()));
    assert!(names.contains(&"expense_claim".to_string()));

    assert!(store.forms().delete(tenant, "leave_request").await.unwrap());
    assert!(!store.forms().delete(tenant, "leave_request").await.unwrap());
    assert_eq!(store.forms().list(tenant).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_leaves_tombstone() {
    let (store, _dir) = test_store().await;
    let tenant = TenantId::new(Uuid::new_v4());
    let form = FormDefinition::from_request(tenant, leave_request(), DEFAULT_TABLE_PREFIX);

    store.forms().add(&form).await.unwrap();
    assert!(store.forms().find_retired(&form.table_name).await.unwrap().is_none());

    assert!(store.forms().delete(tenant, "leave_request").await.unwrap());

    let retired = store
        .forms()
        .find_retired("USERDATA_LEAVE_REQUEST")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(retired.tenant_id, tenant);
    assert_eq!(retired.table_name, form.table_name);
    assert_eq!(retired.form_name, "leave_request");
    assert_eq!(retired.table_shape, form.table_shape());

    // Re-adding the form takes the table back
    let again = FormDefinition::from_request(tenant, leave_request(), DEFAULT_TABLE_PREFIX);
    store.forms().add(&again).await.unwrap();
    assert!(store.forms().find_retired(&form.table_name).await.unwrap().is_none());
}

#[tokio::test]
async fn test_table_names_unique_regardless_of_case() {
    let (store, _dir) = test_store().await;
    let first = TenantId::new(Uuid::new_v4());
    let second = TenantId::new(Uuid::new_v4());

    let mut shouting = leave_request();
    shouting.name = "Leave_Request".to_string();

    store
        .forms()
        .add(&FormDefinition::from_request(first, leave_request(), DEFAULT_TABLE_PREFIX))
        .await
        .unwrap();
    let err = store
        .forms()
        .add(&FormDefinition::from_request(second, shouting, DEFAULT_TABLE_PREFIX))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Duplicate { .. }));

    // Names resolve without regard to case
    let found = store
        .forms()
        .get_by_name(first, "LEAVE_REQUEST")
        .await
        .unwrap();
    assert!(found.is_some());
}
