use http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode, Uri};
use micro_router::middleware::builtin::{CorsConfig, Source, bearer_auth_with, cors, json_only, rate_limit, validate};
use micro_router::middleware::shared;
use micro_router::view::{Request, RequestView, Response, ResponseBody};
use micro_router::{Outcome, Router, RouterConfig, handler_fn, try_handler_fn};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct User(String);

fn api() -> Router<String> {
    let mut builder = Router::builder();
    builder.add_middleware(cors(CorsConfig::default()));
    builder
        .group(
            "/api",
            [
                shared(bearer_auth_with(|token| (token == "secret").then(|| User("zava".to_owned())))),
                shared(json_only()),
            ],
            |api| {
                api.get(
                    "/me",
                    handler_fn(|req, _resp, _params| req.extensions().get::<User>().map(|user| user.0.clone()).unwrap_or_default()),
                )?;
                api.post("/users", handler_fn(|_req, _resp, _params| "created".to_owned()))?.with(validate(["name"], Source::Body));
                Ok(())
            },
        )
        .unwrap();
    builder.build()
}

fn authorized(method: Method, uri: &'static str) -> Request {
    Request::new(method, Uri::from_static(uri)).with_header(AUTHORIZATION, HeaderValue::from_static("Bearer secret"))
}

fn message(resp: &Response) -> Option<String> {
    match resp.body() {
        ResponseBody::Json(body) => body["message"].as_str().map(str::to_owned),
        _ => None,
    }
}

#[tokio::test]
async fn authenticated_user_reaches_the_handler() {
    let router = api();
    let mut resp = Response::default();
    let outcome = router.serve(&mut authorized(Method::GET, "/api/me"), &mut resp).await.unwrap();

    assert_eq!(outcome, Outcome::Completed("zava".to_owned()));
    assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn missing_token_halts_before_json_check() {
    let router = api();
    let mut resp = Response::default();
    let mut req = Request::new(Method::POST, Uri::from_static("/api/users"));

    let outcome = router.serve(&mut req, &mut resp).await.unwrap();
    assert!(outcome.is_halted());
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(message(&resp).as_deref(), Some("Unauthorized: Token not provided"));
}

#[tokio::test]
async fn post_is_validated_after_group_middleware() {
    let router = api();

    let mut resp = Response::default();
    let mut req = authorized(Method::POST, "/api/users").with_body("name=zava");
    router.serve(&mut req, &mut resp).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let mut resp = Response::default();
    let mut req = authorized(Method::POST, "/api/users")
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_body(r#"{"email": "z@example.com"}"#);
    let outcome = router.serve(&mut req, &mut resp).await.unwrap();
    assert!(outcome.is_halted());
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(message(&resp).as_deref(), Some("Missing required fields: name"));

    let mut resp = Response::default();
    let mut req = authorized(Method::POST, "/api/users")
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_body(r#"{"name": "zava"}"#);
    let outcome = router.serve(&mut req, &mut resp).await.unwrap();
    assert_eq!(outcome, Outcome::Completed("created".to_owned()));
}

#[tokio::test]
async fn preflight_needs_a_matching_route() {
    let mut builder = Router::builder();
    builder.add_middleware(cors(CorsConfig::default()));
    builder.options("/api/users", handler_fn(|_req, _resp, _params| ())).unwrap();
    let router = builder.build();

    let mut resp = Response::default();
    let outcome = router.serve(&mut Request::new(Method::OPTIONS, Uri::from_static("/api/users")), &mut resp).await.unwrap();
    assert!(outcome.is_halted());
    assert_eq!(resp.status(), StatusCode::OK);

    // no OPTIONS route, so no middleware runs at all
    let err = router
        .serve(&mut Request::new(Method::OPTIONS, Uri::from_static("/elsewhere")), &mut Response::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn rate_limit_applies_per_route() {
    let mut builder = Router::builder();
    builder
        .get("/limited", handler_fn(|_req, _resp, _params| ()))
        .unwrap()
        .with(rate_limit(2, Duration::from_secs(60)));
    let router = builder.build();

    for _ in 0..2 {
        let outcome = router.serve(&mut Request::new(Method::GET, Uri::from_static("/limited")), &mut Response::default()).await;
        assert_eq!(outcome.unwrap(), Outcome::Completed(()));
    }

    let mut resp = Response::default();
    let outcome = router.serve(&mut Request::new(Method::GET, Uri::from_static("/limited")), &mut resp).await.unwrap();
    assert!(outcome.is_halted());
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn faults_are_appended_to_the_error_log() {
    let dir = std::env::temp_dir().join(format!("micro-router-it-{}", std::process::id()));
    let log = dir.join("logs").join("error.log");
    let config = RouterConfig::default().with_error_log(&log);

    let mut builder = Router::builder_with(config);
    builder.get("/fail", try_handler_fn(|_req, _resp, _params| Err::<(), _>("storage offline"))).unwrap();
    builder.get("/fine", handler_fn(|_req, _resp, _params| ())).unwrap();
    let router = builder.build();

    for _ in 0..2 {
        let err = router.serve(&mut Request::new(Method::GET, Uri::from_static("/fail")), &mut Response::default()).await;
        assert!(err.unwrap_err().is_fault());
    }
    let not_found = router.serve(&mut Request::new(Method::GET, Uri::from_static("/missing")), &mut Response::default()).await;
    assert!(not_found.unwrap_err().is_not_found());

    let content = std::fs::read_to_string(&log).unwrap();
    let lines = content.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    for line in lines {
        assert!(line.starts_with('['));
        assert_eq!(&line[20..], "] storage offline in handler of GET /fail");
    }
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn json_error_preference_follows_config_and_request() {
    let config = RouterConfig::default().with_json(false);
    let mut builder = Router::<()>::builder_with(config);
    builder.get("/", handler_fn(|_req, _resp, _params| ())).unwrap();
    let router = builder.build();

    let mut req = Request::new(Method::GET, Uri::from_static("/missing"));
    let mut resp = Response::for_request(&req, router.response_config());
    router.handle(&mut req, &mut resp).await.unwrap_err();
    assert_eq!(resp.body(), &ResponseBody::Html("<h1>Error: Route not found</h1><p>Status Code: 404</p>".to_owned()));

    let mut req = Request::new(Method::GET, Uri::from_static("/missing"))
        .with_header(http::header::ACCEPT, HeaderValue::from_static("application/json"));
    let mut resp = Response::for_request(&req, router.response_config());
    router.handle(&mut req, &mut resp).await.unwrap_err();
    assert_eq!(resp.body(), &ResponseBody::Json(json!({"error": true, "code": 404, "message": "Route not found"})));
    assert_eq!(req.path(), "/missing");
}
