//! Integration tests for registration and item-preference screening

mod helpers;

use cjs_common::config::UserFieldConfig;
use cjs_common::Error;
use cjs_engine::ledger;
use cjs_engine::respondent;
use helpers::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[tokio::test]
async fn registration_persists_attributes_and_memberships() {
    let mut config = equal_config(&["a", "b"], false);
    config.user_fields = vec![
        UserFieldConfig {
            name: "age".to_string(),
            required: true,
        },
        UserFieldConfig {
            name: "region".to_string(),
            required: false,
        },
    ];
    let db = seeded_db(&config).await;
    let g1 = group_id_by_name(&db.pool, "g1").await;

    let attributes = vec![
        ("age".to_string(), "34".to_string()),
        ("region".to_string(), "north".to_string()),
    ];
    let session = respondent::register(&db.pool, &config, &attributes, &[g1])
        .await
        .unwrap();

    assert_eq!(session.group_ids, vec![g1]);
    assert!(session.comparison_ids.is_empty());
    assert_eq!(session.previous_comparison_id, None);

    let stored: Vec<(String, String)> = sqlx::query_as(
        "SELECT key, value FROM user_attributes WHERE user_id = ? ORDER BY key",
    )
    .bind(session.user_id)
    .fetch_all(&db.pool)
    .await
    .unwrap();
    assert_eq!(
        stored,
        vec![
            ("age".to_string(), "34".to_string()),
            ("region".to_string(), "north".to_string()),
        ]
    );

    let memberships: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_groups WHERE user_id = ?")
            .bind(session.user_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(memberships, 1);
}

#[tokio::test]
async fn registration_rejects_schema_violations() {
    let mut config = equal_config(&["a", "b"], false);
    config.user_fields = vec![UserFieldConfig {
        name: "age".to_string(),
        required: true,
    }];
    let db = seeded_db(&config).await;
    let g1 = group_id_by_name(&db.pool, "g1").await;

    let missing: Vec<(String, String)> = vec![];
    let err = respondent::register(&db.pool, &config, &missing, &[g1])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let unknown = vec![
        ("age".to_string(), "34".to_string()),
        ("favourite_color".to_string(), "teal".to_string()),
    ];
    let err = respondent::register(&db.pool, &config, &unknown, &[g1])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(users, 0, "Rejected registrations must not create users");
}

#[tokio::test]
async fn registration_under_manual_weighting_requires_one_group() {
    let config = custom_config(&["a", "b"], vec![weight("a", "b", 1.0)]);
    let db = seeded_db(&config).await;
    let g1 = group_id_by_name(&db.pool, "g1").await;

    let err = respondent::register(&db.pool, &config, &[], &[g1, g1 + 1])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    assert!(respondent::register(&db.pool, &config, &[], &[g1])
        .await
        .is_ok());
}

#[tokio::test]
async fn registration_requires_a_group() {
    let config = equal_config(&["a", "b"], false);
    let db = seeded_db(&config).await;

    let err = respondent::register(&db.pool, &config, &[], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn screening_walks_every_group_item_once() {
    let config = equal_config(&["a", "b", "c"], true);
    let db = seeded_db(&config).await;
    let g1 = group_id_by_name(&db.pool, "g1").await;

    let session = respondent::register(&db.pool, &config, &[], &[g1])
        .await
        .unwrap();
    let mut rng = StdRng::seed_from_u64(5);

    let mut screened = Vec::new();
    while let Some(item) = respondent::next_unscreened_item(&db.pool, &session, &mut rng)
        .await
        .unwrap()
    {
        respondent::record_item_preference(&db.pool, session.user_id, item.item_id, true)
            .await
            .unwrap();
        screened.push(item.item_id);
    }

    assert_eq!(screened.len(), 3, "Every item is offered exactly once");
    let known = ledger::known_items(&db.pool, session.user_id).await.unwrap();
    assert_eq!(known.len(), 3);
}

#[tokio::test]
async fn first_screening_answer_wins() {
    let config = equal_config(&["a", "b"], true);
    let db = seeded_db(&config).await;
    let g1 = group_id_by_name(&db.pool, "g1").await;

    let session = respondent::register(&db.pool, &config, &[], &[g1])
        .await
        .unwrap();
    let a = item_id_by_name(&db.pool, "a").await;

    respondent::record_item_preference(&db.pool, session.user_id, a, true)
        .await
        .unwrap();
    // A later answer never overrides the earlier one
    respondent::record_item_preference(&db.pool, session.user_id, a, false)
        .await
        .unwrap();

    let known = ledger::known_items(&db.pool, session.user_id).await.unwrap();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].item_id, a);
}
