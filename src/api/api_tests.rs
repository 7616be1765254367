#[cfg(test)]
mod router_tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::api::{app_state::AppState, create_router};
    use crate::config::config::AppConfig;
    use crate::services::{
        OfflineGateway, PersonaRegistry, create_chat_service, create_enrollment_service,
        create_upload_service,
    };
    use crate::storage::factory::Repositories;
    use crate::storage::seed::seed_demo_data;

    async fn test_app() -> (Router, TempDir) {
        test_app_with_upload_limit(AppConfig::development().uploads.max_bytes).await
    }

    async fn test_app_with_upload_limit(max_bytes: usize) -> (Router, TempDir) {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = AppConfig::development();
        config.uploads.dir = uploads.path().to_path_buf();
        config.uploads.max_bytes = max_bytes;
        config.llm.offline_fallback = true;

        let repos = Repositories::in_memory();
        seed_demo_data(&repos).await.unwrap();

        let chat_service = create_chat_service(
            repos.catalog.clone(),
            repos.enrollments.clone(),
            repos.chat_logs.clone(),
            repos.turns.clone(),
            Arc::new(PersonaRegistry::builtin()),
            Arc::new(OfflineGateway),
        );
        let enrollment_service =
            create_enrollment_service(repos.enrollments.clone(), repos.catalog.clone());
        let upload_service = create_upload_service(
            config.uploads.clone(),
            repos.enrollments.clone(),
            repos.chat_logs.clone(),
        );

        let state = AppState::new(
            repos,
            chat_service,
            enrollment_service,
            upload_service,
            config,
        );
        (create_router(state), uploads)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn post_chat(enrollment_id: i64, message: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"enrollment_id": enrollment_id, "message": message}).to_string(),
            ))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_chat_completes_last_module_without_update() {
        let (app, _uploads) = test_app().await;

        let (status, body) = send(&app, post_chat(1, "I'm done")).await;

        assert_eq!(status, StatusCode::OK);
        let reply = body["agent_response"].as_str().unwrap();
        assert!(reply.contains("Income"));
        assert!(!reply.contains("[MODULE_COMPLETE]"));
        assert!(body["workspace_update"].is_null());
    }

    #[tokio::test]
    async fn test_chat_unlocks_next_module() {
        let (app, _uploads) = test_app().await;

        let (status, body) = send(&app, post_chat(2, "finished")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["workspace_update"]["status"], "unlocked");
        assert_eq!(body["workspace_update"]["next_module"], "Tags & Elements");

        let (_, listing) = send(&app, get("/api/enrollments")).await;
        assert_eq!(listing[1]["current_module_index"], 1);
        assert_eq!(listing[1]["current_module_title"], "Tags & Elements");
    }

    #[tokio::test]
    async fn test_chat_errors() {
        let (app, _uploads) = test_app().await;

        let (status, body) = send(&app, post_chat(99, "hi")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, body) = send(&app, post_chat(1, "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_history_lists_turns_in_order() {
        let (app, _uploads) = test_app().await;
        send(&app, post_chat(2, "what is a tag?")).await;
        send(&app, post_chat(2, "finished")).await;

        let (status, body) = send(&app, get("/api/chat/history?enrollment_id=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enrollment_id"], 2);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0]["sender"], "student");
        assert_eq!(items[0]["content"], "what is a tag?");
        assert_eq!(items[3]["sender"], "agent");

        let (_, body) = send(&app, get("/api/chat/history?enrollment_id=2&limit=1")).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["sender"], "agent");
    }

    #[tokio::test]
    async fn test_history_rejects_bad_requests() {
        let (app, _uploads) = test_app().await;

        let (status, _) = send(&app, get("/api/chat/history?enrollment_id=2&limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get("/api/chat/history?enrollment_id=2&limit=501")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get("/api/chat/history?enrollment_id=77")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_enrollments_listing() {
        let (app, _uploads) = test_app().await;

        let (status, body) = send(&app, get("/api/enrollments")).await;

        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["course_title"], "Money 101");
        assert_eq!(items[0]["agent_name"], "Daisy Dollars");
        assert_eq!(items[0]["total_modules"], 1);
        assert_eq!(items[0]["current_module_objective"], "Categorize transactions.");
    }

    const BOUNDARY: &str = "homegrown-test-boundary";

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: text/plain\r\n\r\n",
                    name, filename
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        body
    }

    fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/uploads")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_stores_file() {
        let (app, uploads) = test_app().await;

        let (status, body) = send(
            &app,
            multipart_request(&[
                ("enrollment_id", None, "1"),
                ("file", Some("budget.csv"), "rent,1200"),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["filename"], "budget.csv");
        assert_eq!(body["content_type"], "text/plain");
        assert_eq!(body["bytes"], 9);
        let stored = body["stored_name"].as_str().unwrap();
        assert!(stored.starts_with("1_") && stored.ends_with("_budget.csv"));
        assert!(uploads.path().join(stored).exists());

        let (_, history) = send(&app, get("/api/chat/history?enrollment_id=1")).await;
        assert_eq!(history["items"][0]["sender"], "system");
    }

    #[tokio::test]
    async fn test_upload_errors() {
        let (app, _uploads) = test_app().await;

        let (status, _) = send(
            &app,
            multipart_request(&[("file", Some("a.txt"), "x")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            multipart_request(&[
                ("enrollment_id", None, "42"),
                ("file", Some("a.txt"), "x"),
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_size_limits() {
        let (app, uploads) = test_app_with_upload_limit(16).await;

        // 超过上传上限但仍在请求体上限内：由服务校验
        let (status, body) = send(
            &app,
            multipart_request(&[
                ("enrollment_id", None, "1"),
                ("file", Some("big.txt"), &"x".repeat(17)),
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        // 超过请求体上限：在读取表单之前拒绝
        let huge = "x".repeat(80 * 1024);
        let body = multipart_body(&[
            ("enrollment_id", None, "1"),
            ("file", Some("huge.txt"), &huge),
        ]);
        let request = Request::builder()
            .method("POST")
            .uri("/api/uploads")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_with_security_headers() {
        let (app, _uploads) = test_app().await;

        let response = app.oneshot(get("/api/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }
}
