//! Integration tests for the generated client.
//!
//! These tests drive the client generated from `db/schema.rdb` against the
//! recording engine and check:
//! - Rendered SQL and parameters for typical queries
//! - Unique lookups, including compound identifiers
//! - Writes with defaults and numeric updates
//! - Relation loading
//! - Transactions, events and error classification

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;

use reportdb::query::FilterValue;
use reportdb::query::testing::MockEngine;
use reportdb::{
    Client, ClientOptions, EmitMode, ErrorCode, ErrorKind, Event, LogLevel, NumberUpdate, QueryError,
    SortOrder, account, latest_tweets_query, post, report, tezos_wallet, tweet, twitter_user, user,
    verification_token,
};

fn client(engine: &MockEngine) -> Client<MockEngine> {
    Client::new(engine.clone(), ClientOptions::new())
}

fn tweet_row(id: &str, twitter_user_id: &str, like_count: i32) -> serde_json::Value {
    json!({
        "id": id,
        "tweetId": format!("t-{}", id),
        "twitterUserId": twitter_user_id,
        "latestTweetsQueryCursor": "c1",
        "text": "gm",
        "tweetedAt": "2024-03-01T12:00:00Z",
        "likeCount": like_count,
        "retweetCount": 0,
        "quoteCount": 0,
        "replyCount": 0,
        "viewCount": 100,
        "createdAt": "2024-03-01T12:05:00Z"
    })
}

// ==========================================================================
// Reads
// ==========================================================================

#[test]
fn test_find_many_filters_and_ordering() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .tweet()
        .find_many()
        .r#where(tweet::twitter_user_id::equals("tu1"))
        .r#where(tweet::like_count::gt(10))
        .order_by(tweet::tweeted_at::desc())
        .take(20)
        .select([tweet::ScalarField::Id, tweet::ScalarField::Text])
        .build_sql()
        .unwrap();

    assert_eq!(
        statement.sql,
        "SELECT \"id\", \"text\" FROM \"Tweet\" \
         WHERE (\"twitterUserId\" = $1 AND \"likeCount\" > $2) \
         ORDER BY \"tweetedAt\" DESC LIMIT 20"
    );
    assert_eq!(
        statement.params,
        vec![FilterValue::String("tu1".into()), FilterValue::Int(10)]
    );
}

#[test]
fn test_cursor_on_nullable_ordering_keeps_null_rows() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .user()
        .find_many()
        .order_by(user::name::asc())
        .cursor(user::UniqueWhere::Id("u1".into()))
        .take(10)
        .build_sql()
        .unwrap();

    assert!(statement.sql.contains("EXISTS (SELECT 1 FROM \"cursor\")"));
    assert!(statement.sql.contains("\"name\" IS NULL"));
    assert!(statement.sql.contains(
        "(\"name\" IS NOT DISTINCT FROM (SELECT \"name\" FROM \"cursor\") AND \"id\" = (SELECT \"id\" FROM \"cursor\"))"
    ));
    assert_eq!(statement.params, vec![FilterValue::String("u1".into())]);
}

#[test]
fn test_boolean_composition() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .report()
        .find_many()
        .r#where(report::or([
            report::email_sent_at::is_null(),
            report::email::ends_with_insensitive("@example.com"),
        ]))
        .select([report::ScalarField::Id])
        .build_sql()
        .unwrap();

    assert!(statement.sql.contains("\"emailSentAt\" IS NULL OR"));
    assert_eq!(statement.params.len(), 1);
}

#[test]
fn test_relation_filter_renders_exists() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .twitter_user()
        .find_many()
        .r#where(twitter_user::tweets::some(tweet::like_count::gte(100)))
        .build_sql()
        .unwrap();

    assert!(statement.sql.contains("EXISTS (SELECT 1 FROM \"Tweet\""));
    assert_eq!(statement.params, vec![FilterValue::Int(100)]);
}

#[test]
fn test_compound_unique_lookup() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .account()
        .find_unique(account::UniqueWhere::ProviderProviderAccountId {
            provider: "github".into(),
            provider_account_id: "42".into(),
        })
        .build_sql()
        .unwrap();

    assert!(statement.sql.starts_with("SELECT \"id\", \"userId\", \"type\""));
    assert!(statement.sql.contains("\"provider\" = $1"));
    assert!(statement.sql.contains("\"providerAccountId\" = $2"));
    assert!(statement.sql.ends_with("LIMIT 1"));
}

#[test]
fn test_models_without_id_use_compound_keys() {
    let lookup = latest_tweets_query::UniqueWhere::CursorTwitterUserId {
        cursor: "c1".into(),
        twitter_user_id: "tu1".into(),
    };
    let engine = MockEngine::new();
    let statement = client(&engine).latest_tweets_query().find_unique(lookup).build_sql().unwrap();
    assert!(statement.sql.contains("\"cursor\" = $1"));

    let token = verification_token::UniqueWhere::Token("abc".into());
    let statement = client(&engine).verification_token().delete(token).build_sql().unwrap();
    assert!(statement.sql.starts_with("DELETE FROM \"VerificationToken\" WHERE \"token\" = $1"));
}

#[tokio::test]
async fn test_find_unique_decodes_payload() {
    let engine = MockEngine::new();
    engine.push_rows([tweet_row("1", "tu1", 12)]);

    let found = client(&engine)
        .tweet()
        .find_unique(tweet::UniqueWhere::TweetId("t-1".into()))
        .exec()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.like_count, 12);
    assert_eq!(found.tweeted_at, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    assert!(found.twitter_user.is_none());
}

#[tokio::test]
async fn test_find_unique_or_throw_reports_not_found() {
    let engine = MockEngine::new();
    let err = client(&engine)
        .tezos_wallet()
        .find_unique_or_throw(tezos_wallet::UniqueWhere::Address("tz1".into()))
        .exec()
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::RecordNotFound);
    assert_eq!(err.kind(), ErrorKind::KnownRequest);
}

#[tokio::test]
async fn test_include_loads_children_in_one_query() {
    let engine = MockEngine::new();
    engine
        .push_rows([json!({
            "id": "tu1",
            "handle": "ada",
            "externalUserId": "1",
            "userInfoData": null,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })])
        .push_rows([tweet_row("1", "tu1", 3), tweet_row("2", "tu1", 5)]);

    let users = client(&engine)
        .twitter_user()
        .find_many()
        .include(twitter_user::tweets::include().order_by(tweet::like_count::desc()))
        .exec()
        .await
        .unwrap();

    assert_eq!(engine.statements().len(), 2);
    assert!(engine.executed_sql()[1].contains("FROM \"Tweet\""));
    let tweets = users[0].tweets.as_ref().unwrap();
    assert_eq!(tweets.len(), 2);
}

#[tokio::test]
async fn test_count_and_relation_ordering() {
    let engine = MockEngine::new();
    engine.push_rows([json!({"_count": 7})]);

    let count = client(&engine)
        .report()
        .count()
        .r#where(report::tezos_wallet::is(tezos_wallet::address::equals("tz1")))
        .exec()
        .await
        .unwrap();
    assert_eq!(count, 7);

    let statement = client(&engine)
        .twitter_user()
        .find_many()
        .order_by(twitter_user::reports::order_by_count(SortOrder::Desc))
        .build_sql()
        .unwrap();
    assert!(statement.sql.contains("ORDER BY (SELECT COUNT(*)"));
}

// ==========================================================================
// Writes
// ==========================================================================

#[test]
fn test_create_fills_generated_defaults() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .report()
        .create(report::CreateInput {
            email: "ada@example.com".into(),
            start_generation_code: "code".into(),
            twitter_user_id: "tu1".into(),
            tezos_wallet_id: "w1".into(),
            ..Default::default()
        })
        .select([report::ScalarField::Id])
        .build_sql()
        .unwrap();

    assert!(statement.sql.starts_with("INSERT INTO \"Report\" (\"id\", \"publicId\", \"email\""));
    assert!(statement.sql.ends_with("RETURNING \"id\""));
    assert!(matches!(statement.params[0], FilterValue::String(_)));
}

#[test]
fn test_create_input_from_payload_drops_autoincrement_id() {
    let payload = post::Post {
        id: 9,
        name: "hello".into(),
        created_by_id: "u1".into(),
        ..Default::default()
    };
    let input = post::CreateInput::from(payload);

    assert_eq!(input.id, None);
    assert_eq!(input.name, "hello");
    assert_eq!(input.created_by_id, "u1");
    assert!(input.created_at.is_some());
}

#[test]
fn test_update_with_number_operations() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .tweet()
        .update(
            tweet::UniqueWhere::Id("1".into()),
            tweet::UpdateInput {
                like_count: Some(NumberUpdate::Increment(1)),
                text: Some("edited".into()),
                ..Default::default()
            },
        )
        .select([tweet::ScalarField::Id])
        .build_sql()
        .unwrap();

    assert_eq!(
        statement.sql,
        "UPDATE \"Tweet\" SET \"text\" = $1, \"likeCount\" = \"likeCount\" + $2 \
         WHERE \"id\" = $3 RETURNING \"id\""
    );
}

#[test]
fn test_update_clears_nullable_fields() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .account()
        .update_many(account::UpdateInput {
            expires_at: Some(None),
            ..Default::default()
        })
        .r#where(account::provider::equals("github"))
        .build_sql()
        .unwrap()
        .expect("update with assignments renders a statement");

    assert!(statement.sql.starts_with("UPDATE \"Account\" SET \"expires_at\" = $1"));
    assert_eq!(statement.params[0], FilterValue::Null);
}

#[test]
fn test_upsert_conflict_target() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .tezos_wallet()
        .upsert(
            tezos_wallet::UniqueWhere::Address("tz1".into()),
            tezos_wallet::CreateInput {
                address: "tz1".into(),
                ..Default::default()
            },
            tezos_wallet::UpdateInput::default(),
        )
        .build_sql()
        .unwrap();

    assert!(statement.sql.contains("ON CONFLICT (\"address\")"));
}

#[test]
fn test_upsert_targets_the_unique_record() {
    let engine = MockEngine::new();
    let statement = client(&engine)
        .twitter_user()
        .upsert(
            twitter_user::UniqueWhere::Id("existing-id".into()),
            twitter_user::CreateInput {
                handle: "h1".into(),
                external_user_id: "ext-1".into(),
                ..Default::default()
            },
            twitter_user::UpdateInput {
                handle: Some("h2".into()),
                ..Default::default()
            },
        )
        .build_sql()
        .unwrap();

    assert!(statement.sql.starts_with("INSERT INTO \"TwitterUser\" (\"id\", "));
    assert!(statement.sql.contains("ON CONFLICT (\"id\") DO UPDATE"));
    assert_eq!(statement.params[0], FilterValue::String("existing-id".into()));
}

#[test]
fn test_upsert_rejects_conflicting_create_data() {
    let engine = MockEngine::new();
    let err = client(&engine)
        .tezos_wallet()
        .upsert(
            tezos_wallet::UniqueWhere::Address("tz-A".into()),
            tezos_wallet::CreateInput {
                address: "tz-B".into(),
                ..Default::default()
            },
            tezos_wallet::UpdateInput::default(),
        )
        .build_sql()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("address"));
}

// ==========================================================================
// Group by
// ==========================================================================

#[test]
fn test_group_by_validation() {
    let engine = MockEngine::new();
    let err = client(&engine)
        .tweet()
        .group_by([tweet::ScalarField::TwitterUserId])
        .take(3)
        .build_sql()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = client(&engine)
        .tweet()
        .group_by([tweet::ScalarField::TwitterUserId])
        .order_by(tweet::like_count::asc())
        .build_sql()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let ok = client(&engine)
        .tweet()
        .group_by([tweet::ScalarField::TwitterUserId])
        .sum(tweet::ScalarField::LikeCount)
        .order_by(tweet::twitter_user_id::asc())
        .take(3)
        .build_sql();
    assert!(ok.is_ok());
}

// ==========================================================================
// Transactions and events
// ==========================================================================

#[tokio::test]
async fn test_transaction_commits() {
    let engine = MockEngine::new();
    engine.push_rows([json!({
        "id": "w1",
        "address": "tz1",
        "createdAt": "2024-01-01T00:00:00Z"
    })]);

    let wallet = client(&engine)
        .transaction(|tx| async move {
            tx.tezos_wallet()
                .create(tezos_wallet::CreateInput {
                    address: "tz1".into(),
                    ..Default::default()
                })
                .exec()
                .await
        })
        .await
        .unwrap();

    assert_eq!(wallet.address, "tz1");
    let sql = engine.executed_sql();
    assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(sql.last().map(String::as_str), Some("COMMIT"));
}

#[tokio::test]
async fn test_transaction_rolls_back_on_error() {
    let engine = MockEngine::new();
    engine.push_error(QueryError::unique_violation("User", "email"));

    let err = client(&engine)
        .transaction(|tx| async move {
            tx.user()
                .create(user::CreateInput {
                    email: Some("ada@example.com".into()),
                    ..Default::default()
                })
                .exec()
                .await
        })
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::UniqueConstraint);
    assert_eq!(engine.executed_sql().last().map(String::as_str), Some("ROLLBACK"));
}

#[tokio::test]
async fn test_query_events_reach_subscribers() {
    let engine = MockEngine::new();
    let client = Client::new(engine.clone(), ClientOptions::new().log(LogLevel::Query, EmitMode::Event));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.on(LogLevel::Query, move |event| {
        if let Event::Query(query) = event {
            sink.lock().push(query.query.clone());
        }
    });

    client.session().count().exec().await.unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("SELECT COUNT(*)"));
}

#[tokio::test]
async fn test_raw_query_as() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Total {
        total: i64,
    }

    let engine = MockEngine::new();
    engine.push_rows([json!({"total": 3})]);
    let rows: Vec<Total> = client(&engine)
        .query_raw_as(reportdb::raw_query!(
            "SELECT COUNT(*) AS total FROM \"Report\" WHERE \"email\" = {}",
            "ada@example.com"
        ))
        .await
        .unwrap();

    assert_eq!(rows, vec![Total { total: 3 }]);
    assert_eq!(engine.statements()[0].params.len(), 1);
}
