#![allow(dead_code)]
use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use load_calculator::api;
use load_calculator::config::Config;
use load_calculator::controller::AppState;

pub const MOTOR: &str = "name=Motor&efficiency=0.9&powerFactor=0.8&voltage=380\
&devicesCount=2&power=1000&utilizationFactor=0.6&reactivePowerFactor=0.75";

pub const PUMP: &str = "name=Pump&efficiency=0.92&powerFactor=0.85&voltage=380\
&devicesCount=3&power=500&utilizationFactor=0.7&reactivePowerFactor=0.6";

/// Router with default configuration, mirroring `main.rs`.
pub fn build_test_app() -> Router {
    build_test_app_with(Config::default())
}

pub fn build_test_app_with(cfg: Config) -> Router {
    let state = AppState::new(&cfg);
    api::router(state, &cfg)
}

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_form(app: &Router, body: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// `name=value` pair of the session cookie set by the response, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("load_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

pub fn assert_ok(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::OK);
}
