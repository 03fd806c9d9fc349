use http::{Method, StatusCode, Uri};
use micro_router::view::{Request, Response, ResponseView};
use micro_router::{Router, handler_fn, middleware_fn};
use serde_json::json;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut builder = Router::builder();
    builder.get("/", handler_fn(|_req, resp, _params| resp.with_html("<h1>hello world</h1>".into(), StatusCode::OK))).unwrap();
    builder
        .group("/users", [], |users| {
            users.get("/:id(\\d+)", handler_fn(|_req, resp, params| {
                resp.with_json(json!({ "id": params.get("id") }), StatusCode::OK);
            }))?;
            users
                .delete("/:id(\\d+)", handler_fn(|_req, resp, _params| resp.with_status(StatusCode::NO_CONTENT, None)))?
                .with(middleware_fn(|_req, resp: &mut dyn ResponseView, _params| {
                    resp.with_error("Forbidden", StatusCode::FORBIDDEN);
                }));
            Ok(())
        })
        .unwrap();
    let router = builder.build();

    for (method, uri) in [(Method::GET, "/"), (Method::GET, "/users/42"), (Method::DELETE, "/users/42"), (Method::GET, "/nope")] {
        let mut req = Request::new(method, Uri::from_static(uri));
        let mut resp = Response::for_request(&req, router.response_config());
        let result = router.handle(&mut req, &mut resp).await;
        info!(uri, status = %resp.status(), ok = result.is_ok(), "dispatched");
    }
}
