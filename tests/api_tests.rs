//! Integration tests for the HTTP API.
//!
//! Each test starts a server on a free port and talks to it with reqwest.

mod common;

use common::TestEnv;
use serde_json::{Value, json};

fn url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", port, path)
}

#[tokio::test]
async fn test_create_defaults_and_get() {
    let env = TestEnv::new();
    let handle = env.start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(url(handle.port, "/api/tasks"))
        .json(&json!({ "date": "2024-01-01", "start_time": "09:00", "title": "Gym" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["duration"], 45);
    assert_eq!(created["location"], "");
    assert_eq!(created["description"], "");
    assert!(created.get("created_at").is_none());

    let id = created["id"].as_i64().unwrap();
    let resp = client
        .get(url(handle.port, &format!("/api/tasks/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched, created);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_get_missing_returns_404() {
    let env = TestEnv::new();
    let handle = env.start_server().await;

    let resp = reqwest::get(url(handle.port, "/api/tasks/999")).await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_create_invalid_returns_400() {
    let env = TestEnv::new();
    let handle = env.start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(url(handle.port, "/api/tasks"))
        .json(&json!({ "date": "2024-01-01", "start_time": "9am", "title": "Gym" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(url(handle.port, "/api/tasks"))
        .json(&json!({ "date": "2024-01-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(url(handle.port, "/api/tasks"))
        .json(&json!({
            "date": "2024-01-01",
            "start_time": "09:00",
            "title": "Gym",
            "duration": 4_294_967_295_u32
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("exceeds 1440 minutes"));

    assert_eq!(env.total_count(), 0);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_non_numeric_id_returns_json_400() {
    let env = TestEnv::new();
    let handle = env.start_server().await;
    let client = reqwest::Client::new();

    let requests = [
        client.get(url(handle.port, "/api/tasks/abc")),
        client.put(url(handle.port, "/api/tasks/abc")).json(&json!({ "title": "New" })),
        client.delete(url(handle.port, "/api/tasks/abc")),
        client
            .post(url(handle.port, "/api/tasks/abc/split"))
            .json(&json!({ "split_count": 2 })),
    ];

    for request in requests {
        let resp = request.send().await.unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_list_with_and_without_range() {
    let mut env = TestEnv::new();
    env.create_task("2024-01-01", "09:00", 30);
    env.create_task("2024-01-05", "09:00", 30);
    env.create_task("2024-02-01", "09:00", 30);
    let handle = env.start_server().await;

    let all: Vec<Value> = reqwest::get(url(handle.port, "/api/tasks"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let january: Vec<Value> = reqwest::get(url(
        handle.port,
        "/api/tasks?start_date=2024-01-01&end_date=2024-01-31",
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(january.len(), 2);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_and_delete() {
    let mut env = TestEnv::new();
    let task = env.create_task("2024-01-01", "09:00", 30);
    let handle = env.start_server().await;
    let client = reqwest::Client::new();
    let path = format!("/api/tasks/{}", task.id);

    let resp = client
        .put(url(handle.port, &path))
        .json(&json!({ "title": "Renamed", "duration": 50 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["title"], "Renamed");
    assert_eq!(updated["duration"], 50);
    assert_eq!(updated["start_time"], "09:00");

    let resp = client.delete(url(handle.port, &path)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Task deleted successfully");

    let resp = client.delete(url(handle.port, &path)).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .put(url(handle.port, &path))
        .json(&json!({ "title": "Ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_merge_endpoint() {
    let mut env = TestEnv::new();
    let a = env.create_task("2024-01-01", "09:00", 30);
    let b = env.create_task("2024-01-01", "10:00", 45);
    let handle = env.start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(url(handle.port, "/api/tasks/merge"))
        .json(&json!({ "task_ids": [b.id, a.id], "title": "Morning block" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let merged: Value = resp.json().await.unwrap();
    assert_eq!(merged["id"], a.id);
    assert_eq!(merged["duration"], 75);
    assert_eq!(merged["title"], "Morning block");

    env.assert_deleted(&b);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_merge_errors() {
    let mut env = TestEnv::new();
    let a = env.create_task("2024-01-01", "09:00", 30);
    let handle = env.start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(url(handle.port, "/api/tasks/merge"))
        .json(&json!({ "task_ids": [a.id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(url(handle.port, "/api/tasks/merge"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(url(handle.port, "/api/tasks/merge"))
        .json(&json!({ "task_ids": [a.id, 9999] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    assert_eq!(env.reload(&a).unwrap().duration, 30);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_split_endpoint() {
    let mut env = TestEnv::new();
    let task = env.create_titled("2024-01-01", "09:00", 90, "Study");
    let handle = env.start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(url(handle.port, &format!("/api/tasks/{}/split", task.id)))
        .json(&json!({ "split_count": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["original"]["id"], task.id);
    assert_eq!(body["original"]["duration"], 30);
    let new_tasks = body["new_tasks"].as_array().unwrap();
    assert_eq!(new_tasks.len(), 2);
    assert_eq!(new_tasks[0]["start_time"], "09:40");
    assert_eq!(new_tasks[0]["title"], "Study (2)");
    assert_eq!(new_tasks[1]["start_time"], "10:20");
    assert_eq!(new_tasks[1]["title"], "Study (3)");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_split_defaults_to_two_parts() {
    let mut env = TestEnv::new();
    let task = env.create_task("2024-01-01", "09:00", 60);
    let handle = env.start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(url(handle.port, &format!("/api/tasks/{}/split", task.id)))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["new_tasks"].as_array().unwrap().len(), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_split_errors() {
    let mut env = TestEnv::new();
    let task = env.create_task("2024-01-01", "09:00", 60);
    let handle = env.start_server().await;
    let client = reqwest::Client::new();
    let path = format!("/api/tasks/{}/split", task.id);

    for count in [1, 0, -3, 61, 101, 4_294_967_295_i64, i64::MAX] {
        let resp = client
            .post(url(handle.port, &path))
            .json(&json!({ "split_count": count }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "split_count {}", count);
    }

    let resp = client
        .post(url(handle.port, "/api/tasks/9999/split"))
        .json(&json!({ "split_count": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    assert_eq!(env.total_count(), 1);

    handle.shutdown().await.unwrap();
}
