use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;

mod test_utils;
use test_utils::{date, insert_activity_row, insert_leaderboard_row, setup_test_db_arc, spawn_test_app};

#[tokio::test]
async fn root_returns_service_info() {
    let db = setup_test_db_arc().await.unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let response = reqwest::get(format!("{}/", url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["service"], "ghstats");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn openapi_document_lists_read_endpoints() {
    let db = setup_test_db_arc().await.unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let body: Value = reqwest::get(format!("{}/openapi.json", url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/repos/top100"));
    assert!(paths.contains_key("/api/repos/{owner}/{repo}/activity"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn top100_on_empty_table_is_not_found() {
    let db = setup_test_db_arc().await.unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let response = reqwest::get(format!("{}/api/repos/top100", url))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/problem+json"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn top100_sorts_by_allow_listed_column() {
    let db = setup_test_db_arc().await.unwrap();
    insert_leaderboard_row(&db, "a/one", 1, 300, Some("Rust")).await.unwrap();
    insert_leaderboard_row(&db, "b/two", 2, 200, Some("Go")).await.unwrap();
    insert_leaderboard_row(&db, "c/three", 3, 100, Some("C")).await.unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let default_order: Vec<Value> = reqwest::get(format!("{}/api/repos/top100", url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let repos: Vec<&str> = default_order
        .iter()
        .map(|r| r["repo"].as_str().unwrap())
        .collect();
    assert_eq!(repos, vec!["a/one", "b/two", "c/three"]);
    assert_eq!(default_order[0]["position_cur"], 1);
    assert!(default_order[0]["position_prev"].is_null());

    let by_language: Vec<Value> = reqwest::get(format!(
        "{}/api/repos/top100?sort_by=language&order=asc",
        url
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    let languages: Vec<&str> = by_language
        .iter()
        .map(|r| r["language"].as_str().unwrap())
        .collect();
    assert_eq!(languages, vec!["C", "Go", "Rust"]);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn top100_rejects_bad_parameters() {
    let db = setup_test_db_arc().await.unwrap();
    insert_leaderboard_row(&db, "a/one", 1, 300, None).await.unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let unknown = reqwest::get(format!("{}/api/repos/top100?limit=5", url))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

    let invalid = reqwest::get(format!("{}/api/repos/top100?sort_by=name", url))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = invalid.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["allowed"][3], "open_issues");

    let bad_order = reqwest::get(format!("{}/api/repos/top100?order=up", url))
        .await
        .unwrap();
    assert_eq!(bad_order.status(), StatusCode::UNPROCESSABLE_ENTITY);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn activity_returns_inclusive_range() {
    let db = setup_test_db_arc().await.unwrap();
    for day in [1, 2, 3, 4] {
        insert_activity_row(&db, "octo/app", date(2024, 1, day), &["alice", "bob"])
            .await
            .unwrap();
    }
    insert_activity_row(&db, "octo/other", date(2024, 1, 2), &["eve"])
        .await
        .unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let response = reqwest::get(format!(
        "{}/api/repos/octo/app/activity?start_date=2024-01-02&end_date=2024-01-03",
        url
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert!(body.get("message").is_none());
    let activity = body["activity"].as_array().unwrap();
    assert_eq!(activity.len(), 2);
    assert_eq!(activity[0]["date"], "2024-01-02");
    assert_eq!(activity[1]["date"], "2024-01-03");
    assert_eq!(activity[0]["commits"], 2);
    assert_eq!(activity[0]["authors"][1], "bob");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn activity_flags_range_before_stored_data() {
    let db = setup_test_db_arc().await.unwrap();
    insert_activity_row(&db, "octo/app", date(2024, 1, 10), &["alice"])
        .await
        .unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let body: Value = reqwest::get(format!(
        "{}/api/repos/octo/app/activity?start_date=2023-12-01&end_date=2024-01-31",
        url
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    assert!(body["message"].as_str().unwrap().contains("2024-01-10"));
    assert_eq!(body["activity"].as_array().unwrap().len(), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn activity_without_rows_returns_message_and_empty_list() {
    let db = setup_test_db_arc().await.unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let response = reqwest::get(format!(
        "{}/api/repos/nobody/nothing/activity?start_date=2024-01-01&end_date=2024-01-31",
        url
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());
    assert_eq!(body["activity"], serde_json::json!([]));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn activity_rejects_malformed_dates() {
    let db = setup_test_db_arc().await.unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let bad_format = reqwest::get(format!(
        "{}/api/repos/octo/app/activity?start_date=2024-13-01&end_date=2024-01-31",
        url
    ))
    .await
    .unwrap();
    assert_eq!(bad_format.status(), StatusCode::BAD_REQUEST);

    let reversed = reqwest::get(format!(
        "{}/api/repos/octo/app/activity?start_date=2024-02-01&end_date=2024-01-01",
        url
    ))
    .await
    .unwrap();
    assert_eq!(reversed.status(), StatusCode::BAD_REQUEST);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let db = setup_test_db_arc().await.unwrap();
    let (url, handle) = spawn_test_app(db).await;

    let response = reqwest::Client::new()
        .get(format!("{}/", url))
        .header("Origin", "https://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn closed_database_pool_returns_service_unavailable() {
    let db = setup_test_db_arc().await.unwrap();
    insert_leaderboard_row(&db, "a/one", 1, 300, None).await.unwrap();
    let (url, handle) = spawn_test_app(Arc::clone(&db)).await;

    db.close_by_ref().await.unwrap();

    let leaderboard = reqwest::get(format!("{}/api/repos/top100", url))
        .await
        .unwrap();
    assert_eq!(leaderboard.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(leaderboard.headers().get("retry-after").unwrap(), "5");
    let body: Value = leaderboard.json().await.unwrap();
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");

    let activity = reqwest::get(format!(
        "{}/api/repos/a/one/activity?start_date=2024-01-01&end_date=2024-01-31",
        url
    ))
    .await
    .unwrap();
    assert_eq!(activity.status(), StatusCode::SERVICE_UNAVAILABLE);

    handle.shutdown().await.unwrap();
}
