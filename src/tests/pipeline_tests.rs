#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode, routing::get as route_get, Router};
    use tower::ServiceExt;

    use crate::middleware::Pipeline;
    use crate::routes::build_router;
    use crate::tests::{body_string, get, get_from, list_file, open_config, test_state};

    #[tokio::test]
    async fn test_rate_limit_rejects_after_max_requests() {
        let mut cfg = open_config();
        cfg.rate_limit.enable = true;
        cfg.rate_limit.max_requests = 3;
        cfg.rate_limit.window_secs = 60;
        let state = test_state(cfg).await;
        let metrics = state.metrics.clone();
        let app = build_router(state);

        for _ in 0..3 {
            let res = app.clone().oneshot(get("/ping")).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = app.clone().oneshot(get("/ping")).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
        assert_eq!(body_string(res).await, "Too Many Requests\n");

        let snap = metrics.get_snapshot();
        assert_eq!(snap.requests_total, 4);
        assert_eq!(snap.rate_limited, 1);
    }

    #[tokio::test]
    async fn test_rate_limit_counts_every_route() {
        let mut cfg = open_config();
        cfg.rate_limit.enable = true;
        cfg.rate_limit.max_requests = 2;
        let app = build_router(test_state(cfg).await);

        assert_eq!(app.clone().oneshot(get("/healthz")).await.unwrap().status(), StatusCode::OK);
        assert_eq!(app.clone().oneshot(get("/character")).await.unwrap().status(), StatusCode::OK);
        // Operational and API routes share one global budget
        let res = app.clone().oneshot(get("/ping")).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_disabled_rate_limit_installs_no_gate() {
        let mut cfg = open_config();
        cfg.rate_limit.max_requests = 0;
        let state = test_state(cfg).await;
        let pipeline = Pipeline::new(&state.policy, state.limiter.clone(), &state.authorities, state.metrics.clone());
        assert!(!pipeline.rate_limited());

        let app = build_router(state);
        for _ in 0..20 {
            assert_eq!(app.clone().oneshot(get("/ping")).await.unwrap().status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_unknown_ip_is_unauthorized() {
        let ips = list_file(r#"{"10.0.0.1": true}"#);
        let mut cfg = open_config();
        cfg.api_auth.enforce_ip = true;
        cfg.api_auth.ip_list_file = ips.path().to_string_lossy().into_owned();
        let state = test_state(cfg).await;
        let metrics = state.metrics.clone();
        let app = build_router(state);

        let res = app.clone().oneshot(get_from("/ping", "10.0.0.2")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(res).await, "Unauthorized\n");

        let res = app.clone().oneshot(get_from("/ping", "10.0.0.1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        // Without proxy headers or a socket address the client IP is empty and unknown
        let res = app.clone().oneshot(get("/ping")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(metrics.get_snapshot().unauthorized, 2);
    }

    #[tokio::test]
    async fn test_forwarded_for_first_entry_is_used() {
        let ips = list_file(r#"{"10.0.0.1": true}"#);
        let mut cfg = open_config();
        cfg.api_auth.enforce_ip = true;
        cfg.api_auth.ip_list_file = ips.path().to_string_lossy().into_owned();
        let app = build_router(test_state(cfg).await);

        let req = Request::builder()
            .uri("/ping")
            .header("x-forwarded-for", " 10.0.0.1 , 10.9.9.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

        let req = Request::builder()
            .uri("/ping")
            .header("x-forwarded-for", "10.9.9.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_api_key_is_checked() {
        let mut cfg = open_config();
        cfg.api_auth.enforce_key = true;
        cfg.api_auth.key = "secret".to_string();
        let app = build_router(test_state(cfg).await);

        let res = app.clone().oneshot(get("/ping")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder().uri("/ping").header("authorization", "wrong").body(Body::empty()).unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder().uri("/ping").header("authorization", "secret").body(Body::empty()).unwrap();
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ip_check_precedes_key_check() {
        let ips = list_file(r#"{"10.0.0.1": true}"#);
        let mut cfg = open_config();
        cfg.api_auth.enforce_ip = true;
        cfg.api_auth.enforce_key = true;
        cfg.api_auth.key = "secret".to_string();
        cfg.api_auth.ip_list_file = ips.path().to_string_lossy().into_owned();
        let app = build_router(test_state(cfg).await);

        // Correct key from an unknown address is still rejected
        let req = Request::builder()
            .uri("/ping")
            .header("x-real-ip", "10.0.0.2")
            .header("authorization", "secret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/ping")
            .header("x-real-ip", "10.0.0.1")
            .header("authorization", "secret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejected_identity_still_consumes_rate_budget() {
        let mut cfg = open_config();
        cfg.rate_limit.enable = true;
        cfg.rate_limit.max_requests = 1;
        cfg.api_auth.enforce_key = true;
        cfg.api_auth.key = "secret".to_string();
        let app = build_router(test_state(cfg).await);

        let res = app.clone().oneshot(get("/ping")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder().uri("/ping").header("authorization", "secret").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_control_headers_on_every_response() {
        let mut cfg = open_config();
        cfg.api_auth.enforce_key = true;
        cfg.api_auth.key = "secret".to_string();
        let app = build_router(test_state(cfg).await);

        let res = app.oneshot(get("/ping")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()["access-control-max-age"], "7200");
        assert_eq!(res.headers()["access-control-allow-methods"], "GET, POST, PATCH, PUT, DELETE, OPTIONS");
    }

    async fn slow() -> &'static str {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        "late"
    }

    #[tokio::test]
    async fn test_slow_handler_times_out() {
        let state = test_state(open_config()).await;
        let pipeline = Pipeline::new(&state.policy, state.limiter.clone(), &state.authorities, state.metrics.clone())
            .with_timeout(std::time::Duration::from_millis(50));
        let app: Router =
            pipeline.wrap(Router::new().route("/slow", route_get(slow)).route("/ok", route_get(|| async { "ok" })));

        let res = app.clone().oneshot(get("/slow")).await.unwrap();
        assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(res.headers()["access-control-max-age"], "7200");

        let res = app.oneshot(get("/ok")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_zero_timeout_leaves_requests_unbounded() {
        let state = test_state(open_config()).await;
        let pipeline = Pipeline::new(&state.policy, state.limiter.clone(), &state.authorities, state.metrics.clone())
            .with_timeout(std::time::Duration::ZERO);
        let app: Router = pipeline.wrap(Router::new().route(
            "/pause",
            route_get(|| async {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                "done"
            }),
        ));

        let res = app.oneshot(get("/pause")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "done");
    }

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn test_panic_is_recovered_once() {
        let state = test_state(open_config()).await;
        let metrics = state.metrics.clone();
        let pipeline = Pipeline::new(&state.policy, state.limiter.clone(), &state.authorities, state.metrics.clone());
        let app: Router = pipeline.wrap(Router::new().route("/boom", route_get(boom)).route("/ok", route_get(|| async { "ok" })));

        let res = app.clone().oneshot(get("/boom")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers()["access-control-max-age"], "7200");
        assert_eq!(body_string(res).await, "Internal Server Error\n");

        // The server keeps serving after a recovered panic
        let res = app.oneshot(get("/ok")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "ok");

        let snap = metrics.get_snapshot();
        assert_eq!(snap.panics_recovered, 1);
        assert_eq!(snap.requests_total, 2);
    }
}
