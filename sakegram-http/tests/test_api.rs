mod common;

use common::{image_part, spawn_server, spawn_server_with, TestOptions};
use reqwest::multipart::Form;
use reqwest::StatusCode;
use sakegram::Settings;
use sakegram_graph::GraphConfig;
use sakegram_media::MediaEndpoints;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_ID: &str = "17841400000000";

fn schedule_form(schedule_time: &str) -> Form {
    Form::new()
        .part("image", image_part(8, 8))
        .text("caption", "純米吟醸 入荷しました")
        .text("scheduleTime", schedule_time.to_string())
}

#[tokio::test]
async fn test_health() {
    let server = spawn_server().await;
    let resp = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_open_mode_needs_no_token() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/api/posts")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let posts: Vec<Value> = resp.json().await.unwrap();
    assert!(posts.is_empty());

    let status: Value = client
        .get(server.url("/api/auth-status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status, json!({"authRequired": false, "authenticated": true}));

    let resp = client
        .post(server.url("/api/login"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_password_login_flow() {
    let server = spawn_server_with(TestOptions {
        settings: Settings {
            app_password: Some("kanpai".into()),
            ..Settings::default()
        },
        ..TestOptions::default()
    })
    .await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/api/posts")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "unauthorized");

    let resp = client
        .post(server.url("/api/login"))
        .json(&json!({"password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid password");

    let resp = client
        .post(server.url("/api/login"))
        .json(&json!({"password": "kanpai"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    let resp = client
        .get(server.url("/api/posts"))
        .header("x-auth-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let status: Value = client
        .get(server.url("/api/auth-status"))
        .header("x-auth-token", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status, json!({"authRequired": true, "authenticated": true}));

    // a second login replaces the session
    let second: Value = client
        .post(server.url("/api/login"))
        .json(&json!({"password": "kanpai"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_ne!(second["token"].as_str().unwrap(), token);

    let resp = client
        .get(server.url("/api/posts"))
        .header("x-auth-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_stays_public_with_password() {
    let server = spawn_server_with(TestOptions {
        settings: Settings {
            app_password: Some("kanpai".into()),
            ..Settings::default()
        },
        ..TestOptions::default()
    })
    .await;
    let resp = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_config_roundtrip() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let view: Value = client
        .get(server.url("/api/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["hasConfig"], false);
    assert_eq!(view["accessToken"], "");

    let resp = client
        .post(server.url("/api/config"))
        .json(&json!({
            "accessToken": "EAAB-token",
            "instagramId": USER_ID,
            "publicUrl": "https://sake.example.com"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Settings updated");

    let view: Value = client
        .get(server.url("/api/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["hasConfig"], true);
    assert_eq!(view["accessToken"], "EAAB-token");
    assert_eq!(view["instagramId"], USER_ID);
    assert_eq!(view["publicUrl"], "https://sake.example.com");
    assert_eq!(view["openAiKey"], "");

    let env_file = std::fs::read_to_string(server.dir.path().join(".env")).unwrap();
    assert!(env_file.contains("ACCESS_TOKEN="));
    assert!(env_file.contains("BASE_URL="));
}

#[tokio::test]
async fn test_schedule_list_and_delete() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/schedule"))
        .multipart(schedule_form("2099-01-01T09:00:00Z"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Post scheduled successfully!");

    let post = &body["post"];
    assert_eq!(post["status"], "scheduled");
    assert_eq!(post["caption"], "純米吟醸 入荷しました");
    assert_eq!(post["scheduleTime"], "2099-01-01T09:00:00Z");
    let image_path = post["imagePath"].as_str().unwrap().to_string();
    assert!(image_path.starts_with("uploads/"));
    assert!(image_path.ends_with(".png"));
    assert!(server.dir.path().join(&image_path).exists());

    // uploads are served statically
    let resp = client
        .get(server.url(&format!("/{}", image_path)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let posts: Vec<Value> = client
        .get(server.url("/api/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    let id = posts[0]["id"].as_i64().unwrap();
    assert!(server.dir.path().join("db.json").exists());

    let resp = client
        .delete(server.url(&format!("/api/posts/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": true}));

    let resp = client
        .delete(server.url(&format!("/api/posts/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Post not found");
}

fn with_cloudinary(mock: &MockServer) -> TestOptions {
    TestOptions {
        settings: Settings {
            cloudinary_cloud_name: Some("sakegram-demo".into()),
            cloudinary_api_key: Some("cl-key".into()),
            cloudinary_api_secret: Some("cl-secret".into()),
            ..Settings::default()
        },
        media: MediaEndpoints {
            cloudinary: mock.uri(),
            ..MediaEndpoints::default()
        },
        ..TestOptions::default()
    }
}

fn upload_count(server: &common::TestServer) -> usize {
    std::fs::read_dir(server.dir.path().join("uploads"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_schedule_hosts_image_on_cloudinary() {
    let mock = MockServer::start().await;
    let secure_url =
        "https://res.cloudinary.com/sakegram-demo/image/upload/v1712/insta-sake/bottle.png";
    Mock::given(method("POST"))
        .and(path("/sakegram-demo/image/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "insta-sake/bottle",
            "secure_url": secure_url
        })))
        .expect(1)
        .mount(&mock)
        .await;
    let server = spawn_server_with(with_cloudinary(&mock)).await;

    let resp = reqwest::Client::new()
        .post(server.url("/api/schedule"))
        .multipart(schedule_form("2099-01-01T09:00:00Z"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["post"]["imagePath"], secure_url);

    // the local copy is gone once the image is hosted
    assert_eq!(upload_count(&server), 0);
    assert_eq!(server.state.store.list()[0].image_path, secure_url);
}

#[tokio::test]
async fn test_cloudinary_failure_keeps_post_out() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sakegram-demo/image/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"message": "Server error"}
        })))
        .mount(&mock)
        .await;
    let server = spawn_server_with(with_cloudinary(&mock)).await;

    let resp = reqwest::Client::new()
        .post(server.url("/api/schedule"))
        .multipart(schedule_form("2099-01-01T09:00:00Z"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Image upload to Cloudinary failed");
    assert_eq!(body["code"], "upload_failed");
    assert!(server.state.store.is_empty());
}

#[tokio::test]
async fn test_schedule_rejects_bad_input() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let form = Form::new()
        .text("caption", "no image")
        .text("scheduleTime", "2099-01-01T09:00:00Z");
    let resp = client
        .post(server.url("/api/schedule"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "missing_field");

    let resp = client
        .post(server.url("/api/schedule"))
        .multipart(schedule_form("next tuesday"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(server.state.store.is_empty());
}

#[tokio::test]
async fn test_retry_unknown_post() {
    let server = spawn_server().await;
    let resp = reqwest::Client::new()
        .post(server.url("/api/posts/42/retry"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_post_id_is_bad_request() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/posts/abc/retry"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_request");
    assert!(body["error"].as_str().unwrap().contains("invalid post id"));

    let resp = client
        .delete(server.url("/api/posts/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn test_schedule_prunes_oldest_posts() {
    let server = spawn_server_with(TestOptions {
        post_limit: 2,
        ..TestOptions::default()
    })
    .await;
    let client = reqwest::Client::new();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let body: Value = client
            .post(server.url("/api/schedule"))
            .multipart(schedule_form("2099-01-01T09:00:00Z"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(body["post"]["id"].as_i64().unwrap());
        // upload names and creation times have millisecond resolution
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let posts: Vec<Value> = client
        .get(server.url("/api/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let kept: Vec<i64> = posts.iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert_eq!(kept, ids[1..].to_vec());
}

#[tokio::test]
async fn test_retry_without_credentials_marks_failed() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(server.url("/api/schedule"))
        .multipart(schedule_form("2099-01-01T09:00:00Z"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = body["post"]["id"].as_i64().unwrap();

    let resp = client
        .post(server.url(&format!("/api/posts/{}/retry", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "failed");
    assert!(body["error"].as_str().unwrap().contains("ACCESS_TOKEN"));

    let stored = server.state.store.get(id).unwrap();
    assert_eq!(stored.status, sakegram::PostStatus::Failed);
    assert!(stored.posted_at.is_some());
}

#[tokio::test]
async fn test_retry_publishes_through_graph_api() {
    let graph = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v19.0/{}/media", USER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "container-7"})))
        .expect(1)
        .mount(&graph)
        .await;
    Mock::given(method("GET"))
        .and(path("/v19.0/container-7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status_code": "FINISHED"})),
        )
        .mount(&graph)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v19.0/{}/media_publish", USER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "media-7"})))
        .expect(1)
        .mount(&graph)
        .await;

    let server = spawn_server_with(TestOptions {
        settings: Settings {
            access_token: Some("test-token".into()),
            instagram_user_id: Some(USER_ID.into()),
            base_url: Some("https://sake.example.com".into()),
            ..Settings::default()
        },
        graph: GraphConfig {
            api_base: format!("{}/v19.0", graph.uri()),
            poll_attempts: 3,
            poll_interval: Duration::from_millis(1),
            request_timeout: Duration::from_secs(5),
            probe_images: false,
        },
        ..TestOptions::default()
    })
    .await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(server.url("/api/schedule"))
        .multipart(schedule_form("2099-01-01T09:00:00Z"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = body["post"]["id"].as_i64().unwrap();

    let body: Value = client
        .post(server.url(&format!("/api/posts/{}/retry", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "posted");
    assert!(body.get("error").is_none());

    let posts: Vec<Value> = client
        .get(server.url("/api/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts[0]["mediaId"], "media-7");
    assert!(posts[0]["postedAt"].is_string());

    // already published
    let resp = client
        .post(server.url(&format!("/api/posts/{}/retry", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_api_route_is_json_404() {
    let server = spawn_server_with(TestOptions {
        with_front_end: true,
        ..TestOptions::default()
    })
    .await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/api/nope")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not_found");

    let resp = client.get(server.url("/calendar/2025")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("<title>Sakegram</title>"));
}

#[tokio::test]
async fn test_no_front_end_means_404() {
    let server = spawn_server().await;
    let resp = reqwest::get(server.url("/calendar")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let server = spawn_server().await;
    let doc: Value = reqwest::get(server.url("/api-docs/openapi.json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let paths = doc["paths"].as_object().unwrap();
    for route in [
        "/health",
        "/api/login",
        "/api/schedule",
        "/api/posts/{id}/retry",
        "/api/clean-background",
    ] {
        assert!(paths.contains_key(route), "missing {}", route);
    }
    assert!(doc["components"]["securitySchemes"]["auth_token"].is_object());
}
