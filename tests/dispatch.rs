//! End-to-end dispatch tests against a local upstream.

use std::sync::Arc;

use fetch_middleware::{
    from_fn, FetchError, FetchInit, FormParams, Middleware, Next, RequestBody, RequestRecord,
    ResponseRecord, ResponseSource,
};
use futures_util::future::BoxFuture;
use serde_json::{json, Value};

mod common;

/// Rewrites the outgoing request before it reaches the network.
struct Rewrite;

impl Middleware for Rewrite {
    fn handle<'a>(
        &'a self,
        req: &'a mut RequestRecord,
        res: &'a mut ResponseRecord,
        next: Next<'a>,
    ) -> BoxFuture<'a, fetch_middleware::FetchResult<()>> {
        Box::pin(async move {
            req.headers.insert("x-tag", "rewritten".parse().unwrap());
            req.set_url("/rewritten?x=1")?;
            req.set_body(Some(RequestBody::Json(json!({"changed": true}))))?;
            next.run(req, res).await
        })
    }
}

#[tokio::test]
async fn test_falls_through_to_network_once() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client();

    let res = client
        .fetch(upstream.url("/users"), FetchInit::new().json(json!({"name": "Alice"})))
        .await
        .unwrap();

    assert_eq!(res.source, ResponseSource::Network);
    assert_eq!(res.status, 200);
    assert_eq!(upstream.hits(), 1);

    let echo: Value = res.json().unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/users");
    assert_eq!(echo["content_type"], "application/json");
    assert_eq!(echo["body"], r#"{"name":"Alice"}"#);
}

#[tokio::test]
async fn test_middleware_json_short_circuits() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client().with(from_fn(|_req, res, _next| {
        Box::pin(async move {
            res.json(&json!({"a": 1}))?;
            Ok(())
        })
    }));

    let res = client.get(upstream.url("/never")).await.unwrap();

    assert_eq!(res.source, ResponseSource::Middleware);
    assert_eq!(res.content_type(), Some("application/json"));
    assert_eq!(res.json::<Value>().unwrap(), json!({"a": 1}));
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_query_object_is_appended() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client();

    let res = client
        .fetch(upstream.url("/items"), FetchInit::new().query(json!({"id": 123})))
        .await
        .unwrap();
    let echo: Value = res.json().unwrap();
    assert_eq!(echo["query"], "id=123");

    let res = client
        .fetch(upstream.url("/items?page=2"), FetchInit::new().query(json!({"id": 123})))
        .await
        .unwrap();
    let echo: Value = res.json().unwrap();
    assert_eq!(echo["query"], "page=2&id=123");
}

#[tokio::test]
async fn test_form_params_sent_untouched() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client();
    let params = FormParams::new().append("a", "1").append("b", "two words");

    let res = client
        .fetch(upstream.url("/form"), FetchInit::new().body(params))
        .await
        .unwrap();

    let echo: Value = res.json().unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(
        echo["content_type"],
        "application/x-www-form-urlencoded;charset=UTF-8"
    );
    assert_eq!(echo["body"], "a=1&b=two+words");
}

#[tokio::test]
async fn test_explicit_content_type_is_kept() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client();

    let res = client
        .fetch(
            upstream.url("/raw"),
            FetchInit::new()
                .method("put")
                .header("Content-Type", "text/csv")
                .body("a,b\n1,2"),
        )
        .await
        .unwrap();

    let echo: Value = res.json().unwrap();
    assert_eq!(echo["method"], "PUT");
    assert_eq!(echo["content_type"], "text/csv");
    assert_eq!(echo["body"], "a,b\n1,2");
}

#[tokio::test]
async fn test_middleware_mutations_reach_the_network() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client().with(Rewrite);

    let res = client.get(upstream.url("/original")).await.unwrap();

    assert_eq!(upstream.hits(), 1);
    let echo: Value = res.json().unwrap();
    assert_eq!(echo["path"], "/rewritten");
    assert_eq!(echo["query"], "x=1");
    assert_eq!(echo["tag"], "rewritten");
    assert_eq!(echo["content_type"], "application/json");
    assert_eq!(echo["body"], r#"{"changed":true}"#);
    // Method was resolved before the body was added.
    assert_eq!(echo["method"], "GET");
}

#[tokio::test]
async fn test_middleware_error_aborts_dispatch() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client().with(from_fn(|_req, _res, _next| {
        Box::pin(async move { Err(FetchError::middleware("denied")) })
    }));

    let err = client.get(upstream.url("/")).await.unwrap_err();

    assert!(matches!(err, FetchError::Middleware(_)));
    assert_eq!(err.to_string(), "middleware error: denied");
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_double_next_fails_the_call() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client().with(from_fn(|req, res, next| {
        Box::pin(async move {
            next.run(req, res).await?;
            next.run(req, res).await
        })
    }));

    let err = client.get(upstream.url("/")).await.unwrap_err();

    assert!(matches!(err, FetchError::DoubleInvocation { .. }));
    // The first continuation ran the (empty) rest of the chain only.
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_request_id_reaches_upstream() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client().with(fetch_middleware::RequestIdMiddleware::new());

    let res = client.get(upstream.url("/")).await.unwrap();
    let echo: Value = res.json().unwrap();
    let id = echo["request_id"].as_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_concurrent_dispatches_are_independent() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client().with(from_fn(|req, res, next| {
        Box::pin(async move {
            if req.query().get("mock").is_some() {
                res.send(json!({"mocked": req.url()}))?;
                return Ok(());
            }
            next.run(req, res).await
        })
    }));

    let (mocked, real) = tokio::join!(
        client.fetch(upstream.url("/a"), FetchInit::new().query(json!({"mock": 1}))),
        client.get(upstream.url("/b")),
    );

    let mocked = mocked.unwrap();
    let real = real.unwrap();
    assert_eq!(mocked.source, ResponseSource::Middleware);
    assert_eq!(mocked.json::<Value>().unwrap(), json!({"mocked": "/a?mock=1"}));
    assert_eq!(real.source, ResponseSource::Network);
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_transport_error_passes_through() {
    let client = common::client();
    // Port 9 (discard) is not expected to accept connections locally.
    let err = client.get("http://127.0.0.1:9/").await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn test_clones_share_the_registry() {
    let upstream = common::start_echo_upstream().await;
    let client = common::client();
    let clone = client.clone();

    client.middleware().push_arc(Arc::new(from_fn(|_req, res, _next| {
        Box::pin(async move {
            res.status(418).end_with("teapot");
            Ok(())
        })
    })));

    let res = clone.get(upstream.url("/")).await.unwrap();
    assert_eq!(res.status, 418);
    assert_eq!(res.text(), "teapot");
    assert_eq!(upstream.hits(), 0);
}
