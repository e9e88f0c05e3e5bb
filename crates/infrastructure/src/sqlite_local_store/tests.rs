use chrono::Utc;
use serde_json::json;

use dolimirror_application::{LocalStore, seed_defaults};
use dolimirror_domain::{
    ConfigValueType, Group, LedgerAction, NewLedgerEntry, Product, ProductKind, ThirdParty,
    ThirdPartyStatus, User,
};

use super::SqliteLocalStore;

async fn store() -> SqliteLocalStore {
    match SqliteLocalStore::in_memory().await {
        Ok(store) => store,
        Err(error) => panic!("failed to open in-memory store: {error}"),
    }
}

fn third_party(id: i64, name: &str) -> ThirdParty {
    let now = Utc::now();
    ThirdParty {
        id,
        name: name.to_owned(),
        name_alias: Some(format!("{name} alias")),
        address: None,
        zip: Some("75001".to_owned()),
        town: Some("Paris".to_owned()),
        state: None,
        country: Some("France".to_owned()),
        phone: None,
        email: None,
        website: None,
        client: true,
        supplier: false,
        prospect: false,
        status: ThirdPartyStatus::Active,
        notes: None,
        created_at: now,
        updated_at: now,
        last_contact: None,
    }
}

fn product(id: i64, label: &str) -> Product {
    let now = Utc::now();
    Product {
        id,
        reference: format!("REF-{id}"),
        label: label.to_owned(),
        description: Some("A widget".to_owned()),
        kind: ProductKind::Product,
        price: 10.5,
        price_incl_tax: 12.6,
        status: 1,
        category: "Hardware".to_owned(),
        stock: 7,
        stock_alert: 2,
        image_url: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn user_rows_roundtrip_with_refs_and_grants() {
    let store = store().await;
    let now = Utc::now();
    let mut user = User::bootstrap_admin(now);
    user.id = 7;
    user.login = "toto".to_owned();
    user.admin = false;
    user.groups = vec![1, 2];
    user.permissions = vec!["user_read".to_owned()];
    user.last_login = Some(now);

    assert!(store.upsert_user(&user).await.is_ok());

    let Some(loaded) = store.user(7).await.ok().flatten() else {
        panic!("user missing after upsert");
    };
    assert_eq!(loaded.login, "toto");
    assert_eq!(loaded.groups, vec![1, 2]);
    assert_eq!(loaded.permissions, vec!["user_read".to_owned()]);
    assert!(loaded.last_login.is_some());

    let by_login = store.user_by_login("toto").await.ok().flatten();
    assert_eq!(by_login.map(|user| user.id), Some(7));
}

#[tokio::test]
async fn upsert_preserves_created_at() {
    let store = store().await;
    let user = User::bootstrap_admin(Utc::now());

    assert!(store.upsert_user(&user).await.is_ok());
    let Some(first) = store.user(user.id).await.ok().flatten() else {
        panic!("user missing");
    };

    let mut renamed = first.clone();
    renamed.firstname = "Root".to_owned();
    assert!(store.upsert_user(&renamed).await.is_ok());

    let Some(second) = store.user(user.id).await.ok().flatten() else {
        panic!("user missing");
    };
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.firstname, "Root");
}

#[tokio::test]
async fn group_rows_roundtrip() {
    let store = store().await;
    let now = Utc::now();
    let group = Group {
        id: 3,
        name: "sales".to_owned(),
        description: Some("Sales staff".to_owned()),
        permissions: vec!["thirdparty_read".to_owned(), "thirdparty_write".to_owned()],
        created_at: now,
        updated_at: now,
    };

    assert!(store.upsert_group(&group).await.is_ok());

    let Some(loaded) = store.group(3).await.ok().flatten() else {
        panic!("group missing");
    };
    assert_eq!(loaded.permissions.len(), 2);

    assert!(store.delete_group(3).await.is_ok());
    assert!(store.group(3).await.ok().flatten().is_none());
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let store = store().await;

    assert!(seed_defaults(&store).await.is_ok());
    assert!(seed_defaults(&store).await.is_ok());

    assert_eq!(store.users().await.unwrap_or_default().len(), 1);
    assert_eq!(store.permissions().await.unwrap_or_default().len(), 9);

    let user_module = store.permissions_by_module("user").await.unwrap_or_default();
    assert_eq!(user_module.len(), 3);
}

#[tokio::test]
async fn replacement_leaves_no_stale_rows() {
    let store = store().await;

    assert!(store
        .replace_third_parties(&[third_party(1, "Stale")])
        .await
        .is_ok());
    assert!(store
        .replace_third_parties(&[third_party(2, "Acme"), third_party(3, "Globex")])
        .await
        .is_ok());

    let ids: Vec<i64> = store
        .third_parties()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(ids, vec![2, 3]);

    let found = store.third_party(2).await.ok().flatten();
    assert_eq!(found.map(|row| row.name), Some("Acme".to_owned()));
}

#[tokio::test]
async fn per_row_mirror_writes_merge_and_delete() {
    let store = store().await;

    assert!(store.upsert_third_party(&third_party(1, "Acme")).await.is_ok());
    assert!(store
        .upsert_third_party(&third_party(1, "Acme Renamed"))
        .await
        .is_ok());
    assert_eq!(store.third_parties().await.unwrap_or_default().len(), 1);
    let found = store.third_party(1).await.ok().flatten();
    assert_eq!(found.map(|row| row.name), Some("Acme Renamed".to_owned()));

    assert!(store.delete_third_party(1).await.is_ok());
    assert!(store.third_parties().await.unwrap_or_default().is_empty());

    assert!(store.upsert_product(&product(4, "Wrench")).await.is_ok());
    assert!(store.upsert_product(&product(4, "Torque Wrench")).await.is_ok());
    let found = store.product(4).await.ok().flatten();
    assert_eq!(found.map(|row| row.label), Some("Torque Wrench".to_owned()));

    assert!(store.delete_product(4).await.is_ok());
    assert!(store.products().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn product_rows_roundtrip_through_replacement() {
    let store = store().await;

    assert!(store
        .replace_products(&[product(1, "Wrench"), product(2, "Hammer")])
        .await
        .is_ok());

    let loaded = store.products().await.unwrap_or_default();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].reference, "REF-1");
    assert_eq!(loaded[0].kind, ProductKind::Product);
    assert_eq!(loaded[0].status_label(), "Active");

    let found = store.product(2).await.ok().flatten();
    assert_eq!(found.map(|row| row.label), Some("Hammer".to_owned()));
}

#[tokio::test]
async fn configuration_upserts_by_unique_key() {
    let store = store().await;

    for value in ["one", "two"] {
        assert!(store
            .set_configuration("dolibarr_url", value, ConfigValueType::String, None)
            .await
            .is_ok());
    }

    let all = store.configurations().await.unwrap_or_default();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].value, "two");

    assert!(store.delete_configuration("dolibarr_url").await.is_ok());
    assert!(store.configuration("dolibarr_url").await.ok().flatten().is_none());
    // Deleting a missing key is not an error.
    assert!(store.delete_configuration("dolibarr_url").await.is_ok());
}

#[tokio::test]
async fn ledger_appends_and_acknowledges() {
    let store = store().await;

    let first = store
        .append_ledger_entry(&NewLedgerEntry {
            entity_type: "third_parties".to_owned(),
            entity_id: 4,
            action: LedgerAction::Update,
            payload: json!({"name": "Acme"}),
        })
        .await;
    let Ok(first) = first else {
        panic!("append failed");
    };

    let second = store
        .append_ledger_entry(&NewLedgerEntry {
            entity_type: "products".to_owned(),
            entity_id: 9,
            action: LedgerAction::Delete,
            payload: json!({}),
        })
        .await;
    assert!(second.is_ok_and(|id| id > first));

    let pending = store.pending_ledger_entries().await.unwrap_or_default();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].action, LedgerAction::Update);
    assert_eq!(pending[0].payload, json!({"name": "Acme"}));

    assert!(store.mark_ledger_entry_synced(first).await.is_ok());
    let pending = store.pending_ledger_entries().await.unwrap_or_default();
    assert_eq!(pending.len(), 1);

    // Acknowledging twice or acknowledging an unknown id is an error.
    assert!(store.mark_ledger_entry_synced(first).await.is_err());
    assert!(store.mark_ledger_entry_synced(999).await.is_err());
}

#[tokio::test]
async fn clear_all_wipes_every_table() {
    let store = store().await;
    assert!(seed_defaults(&store).await.is_ok());
    assert!(store
        .replace_third_parties(&[third_party(1, "Acme")])
        .await
        .is_ok());
    assert!(store
        .set_configuration("dolibarr_url", "https://x/", ConfigValueType::String, None)
        .await
        .is_ok());

    assert!(store.clear_all().await.is_ok());

    assert!(store.users().await.unwrap_or_default().is_empty());
    assert!(store.permissions().await.unwrap_or_default().is_empty());
    assert!(store.third_parties().await.unwrap_or_default().is_empty());
    assert!(store.configurations().await.unwrap_or_default().is_empty());
}
