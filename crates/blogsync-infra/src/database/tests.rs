use chrono::{DateTime, TimeZone, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, Statement, Value};

use blogsync_core::domain::{BlogKey, BlogMeta, BlogPost, Paging};
use blogsync_core::error::RepoError;
use blogsync_core::ports::{StorageQueryRepository, StorageSyncRepository};

use crate::database::entity::{blog_meta, blog_post};
use crate::database::postgres_repo::PostgresBlogStorage;

fn key() -> BlogKey {
    BlogKey::new("blog").unwrap()
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, 8, 0, 0).unwrap()
}

fn meta_row(updated_at: DateTime<Utc>) -> blog_meta::Model {
    blog_meta::Model {
        blog_key: "blog".to_owned(),
        id: "blog".to_owned(),
        source_id: None,
        name: "Test Blog".to_owned(),
        description: None,
        url: Some("https://blog.example".to_owned()),
        published_at: at(1).into(),
        updated_at: updated_at.into(),
    }
}

fn post_row(id: &str, tags: &[&str], day: u32) -> blog_post::Model {
    let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    blog_post::Model {
        blog_key: "blog".to_owned(),
        id: id.to_owned(),
        slug: format!("post-{id}"),
        title: format!("Post {id}"),
        tags: serde_json::json!(tags),
        tag_index: blog_post::tag_index(&tags),
        published_at: at(day).into(),
        updated_at: at(day).into(),
        content: "<p>Content</p>".to_owned(),
        summary: String::new(),
        hash: Some("abc".to_owned()),
        author_id: None,
        author_name: "Ann".to_owned(),
        author_image_url: None,
        author_url: None,
        author_source_id: None,
        image_url: None,
        source_url: None,
        source_id: None,
        search_text: format!("post {id}\n\n<p>content</p>"),
    }
}

fn exec_ok(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

/// Every statement the mock saw, in order, transaction markers included.
fn statements(storage: PostgresBlogStorage) -> Vec<Statement> {
    storage
        .db
        .into_transaction_log()
        .iter()
        .flat_map(|txn| txn.statements().to_vec())
        .collect()
}

#[tokio::test]
async fn test_get_last_updated_at() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![meta_row(at(3))]])
        .into_connection();

    let storage = PostgresBlogStorage::new(db);
    let watermark = storage.get_last_updated_at(&key()).await.unwrap();

    assert_eq!(watermark, Some(at(3)));
}

#[tokio::test]
async fn test_get_post_maps_columns() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![post_row("1", &["Rust", "async"], 2)]])
        .into_connection();

    let storage = PostgresBlogStorage::new(db);
    let post = storage.get_post("1", &key()).await.unwrap().unwrap();

    assert_eq!(post.blog_key, key());
    assert_eq!(post.tags, vec!["Rust".to_string(), "async".to_string()]);
    assert_eq!(post.author.name, "Ann");
    assert_eq!(post.hash.as_deref(), Some("abc"));
    assert_eq!(post.published_at, at(2));
}

#[tokio::test]
async fn test_get_meta_respects_after() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![meta_row(at(3))], vec![meta_row(at(3))]])
        .into_connection();

    let storage = PostgresBlogStorage::new(db);

    assert!(storage.get_meta(&key(), Some(at(2))).await.unwrap().is_some());
    assert!(storage.get_meta(&key(), Some(at(3))).await.unwrap().is_none());
}

#[tokio::test]
async fn test_tag_listing_refines_candidates() {
    // "rustacean" shares no tag with the query; the index prefilter is only
    // a hint and must not decide the result.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            post_row("2", &["Rust"], 4),
            post_row("1", &["rustacean"], 3),
        ]])
        .into_connection();

    let storage = PostgresBlogStorage::new(db);
    let page = storage
        .list_posts_by_tag("rust", Paging::new(0, 10).unwrap(), &[key()])
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, "2");
}

#[tokio::test]
async fn test_full_update_commits() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ])
        .append_query_results([Vec::<blog_meta::Model>::new()])
        .into_connection();

    let storage = PostgresBlogStorage::new(db);
    let mut post = BlogPost::new(key(), "1");
    post.tags = vec!["Rust".to_string()];

    storage
        .update(
            &key(),
            Some(BlogMeta::new(key(), "Test Blog", at(4))),
            vec![post],
            vec![],
            vec![],
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_rejects_foreign_post_before_touching_db() {
    // No results queued: any query would fail the test with a mock error.
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let storage = PostgresBlogStorage::new(db);

    let foreign = BlogPost::new(BlogKey::new("other").unwrap(), "1");
    let err = storage
        .update(&key(), None, vec![foreign], vec![], vec![], Some(at(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, RepoError::InvalidInput(_)));
}

#[tokio::test]
async fn test_get_post_with_all_key_searches_every_blog() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([
            vec![post_row("1", &[], 2)],
            vec![post_row("1", &[], 2)],
        ])
        .into_connection();

    let storage = PostgresBlogStorage::new(db);
    let any = storage.get_post("1", &BlogKey::all()).await.unwrap();
    let scoped = storage.get_post_by_slug("post-1", &key()).await.unwrap();
    assert_eq!(any.unwrap().id, "1");
    assert_eq!(scoped.unwrap().slug, "post-1");

    let log = statements(storage);
    assert_eq!(log.len(), 2);
    assert!(!log[0].sql.contains(r#""blog_key" IN"#), "{}", log[0].sql);
    assert!(log[0].sql.contains(r#""id" ="#), "{}", log[0].sql);
    assert!(log[1].sql.contains(r#""blog_key" IN"#), "{}", log[1].sql);
}

#[tokio::test]
async fn test_failed_upsert_rolls_back_the_clear() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec_ok(3)])
        .append_exec_errors([DbErr::Custom("connection reset".to_owned())])
        .into_connection();

    let storage = PostgresBlogStorage::new(db);
    let err = storage
        .update(
            &key(),
            Some(BlogMeta::new(key(), "Test Blog", at(4))),
            vec![BlogPost::new(key(), "1")],
            vec![],
            vec![],
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Query(_)));

    let log = statements(storage);
    assert_eq!(log.first().unwrap().sql, "BEGIN");
    assert!(log[1].sql.starts_with(r#"DELETE FROM "blog_posts""#), "{}", log[1].sql);
    assert!(log[2].sql.starts_with(r#"INSERT INTO "blog_posts""#), "{}", log[2].sql);
    assert_eq!(log.last().unwrap().sql, "ROLLBACK");
    assert!(log.iter().all(|stmt| stmt.sql != "COMMIT"));
    assert!(!log.iter().any(|stmt| stmt.sql.contains("blog_metas")));
}

#[tokio::test]
async fn test_incremental_update_deletes_listed_ids_and_keeps_newer_watermark() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec_ok(1), exec_ok(1), exec_ok(1)])
        .append_query_results([vec![meta_row(at(6))]])
        .into_connection();

    let storage = PostgresBlogStorage::new(db);
    let mut meta = BlogMeta::new(key(), "Test Blog", at(4));
    meta.published_at = at(1);
    let gone = BlogPost::new(key(), "2").base();

    storage
        .update(
            &key(),
            Some(meta),
            vec![],
            vec![BlogPost::new(key(), "1")],
            vec![gone],
            Some(at(3)),
        )
        .await
        .unwrap();

    let log = statements(storage);
    let sql: Vec<&str> = log.iter().map(|stmt| stmt.sql.as_str()).collect();
    assert_eq!(sql.first(), Some(&"BEGIN"));
    assert_eq!(sql.last(), Some(&"COMMIT"));

    let delete = log
        .iter()
        .find(|stmt| stmt.sql.starts_with("DELETE"))
        .unwrap();
    assert!(delete.sql.contains(r#""id" IN"#), "{}", delete.sql);

    let meta_insert = log
        .iter()
        .find(|stmt| stmt.sql.starts_with(r#"INSERT INTO "blog_metas""#))
        .unwrap();
    let values = &meta_insert.values.as_ref().unwrap().0;
    assert!(values.contains(&Value::from(DateTimeWithTimeZone::from(at(6)))));
    assert!(!values.contains(&Value::from(DateTimeWithTimeZone::from(at(4)))));
}
