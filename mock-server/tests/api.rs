use std::convert::Infallible;

use axum::http::{self, Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use mock_server::{app, Brand, Profile, Segment, Vehicle};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("token {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("token {token}"));
    }
    builder.body(String::new()).unwrap()
}

async fn send<S>(app: &mut S, req: Request<String>) -> Response
where
    S: Service<Request<String>, Response = Response, Error = Infallible>,
{
    ServiceExt::ready(app).await.unwrap().call(req).await.unwrap()
}

/// Register `dummy` and return a fresh token.
async fn login<S>(app: &mut S) -> String
where
    S: Service<Request<String>, Response = Response, Error = Infallible>,
{
    let creds = r#"{"username":"dummy","password":"dummy_pw"}"#;
    let resp = send(app, json_request("POST", "/api/create/", None, creds)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(app, json_request("POST", "/api/auth/", None, creds)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    body["token"].as_str().unwrap().to_string()
}

// --- users ---

#[tokio::test]
async fn register_returns_profile_without_password() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/create/",
            None,
            r#"{"username":"dummy","password":"dummy_pw"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["username"], "dummy");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn register_rejects_short_password() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/create/",
            None,
            r#"{"username":"dummy","password":"pw"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_rejects_duplicate_username() {
    let mut app = app().into_service();
    login(&mut app).await;
    let resp = send(
        &mut app,
        json_request("POST", "/api/create/", None, r#"{"username":"dummy","password":"other_pw"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn auth_rejects_wrong_password() {
    let mut app = app().into_service();
    login(&mut app).await;
    let resp = send(
        &mut app,
        json_request("POST", "/api/auth/", None, r#"{"username":"dummy","password":"wrong"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn auth_rejects_unknown_and_empty_credentials() {
    let mut app = app().into_service();
    for creds in [
        r#"{"username":"ghost","password":"dummy_pw"}"#,
        r#"{"username":"","password":""}"#,
    ] {
        let resp = send(&mut app, json_request("POST", "/api/auth/", None, creds)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn profile_requires_token_and_rejects_put() {
    let mut app = app().into_service();
    let resp = send(&mut app, bare_request("GET", "/api/profile/", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let token = login(&mut app).await;
    let resp = send(&mut app, bare_request("GET", "/api/profile/", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Profile = body_json(resp).await;
    assert_eq!(profile.username, "dummy");

    let resp = send(
        &mut app,
        json_request("PUT", "/api/profile/", Some(&token), r#"{"username":"x"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let resp = app()
        .oneshot(bare_request("GET", "/api/segments/", Some("nope")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- segments / brands ---

#[tokio::test]
async fn segment_crud() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    let token = Some(token.as_str());

    let resp = send(&mut app, json_request("POST", "/api/segments/", token, r#"{"segment_name":"SUV"}"#)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Segment = body_json(resp).await;
    assert_eq!(created.segment_name, "SUV");

    let uri = format!("/api/segments/{}/", created.id);
    let resp = send(&mut app, json_request("PUT", &uri, token, r#"{"segment_name":"Crossover"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Segment = body_json(resp).await;
    assert_eq!(updated.segment_name, "Crossover");

    let resp = send(&mut app, bare_request("DELETE", &uri, token)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&mut app, bare_request("DELETE", &uri, token)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&mut app, bare_request("GET", "/api/segments/", token)).await;
    let segments: Vec<Segment> = body_json(resp).await;
    assert!(segments.is_empty());
}

#[tokio::test]
async fn blank_brand_name_is_rejected() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    let resp = send(
        &mut app,
        json_request("POST", "/api/brands/", Some(&token), r#"{"brand_name":"  "}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_returns_422() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    let resp = send(
        &mut app,
        json_request("POST", "/api/brands/", Some(&token), r#"{"not_brand_name":1}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- vehicles ---

#[tokio::test]
async fn vehicle_lifecycle_and_cascade() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    let token = Some(token.as_str());

    let resp = send(&mut app, json_request("POST", "/api/segments/", token, r#"{"segment_name":"Sedan"}"#)).await;
    let sedan: Segment = body_json(resp).await;
    let resp = send(&mut app, json_request("POST", "/api/segments/", token, r#"{"segment_name":"SUV"}"#)).await;
    let suv: Segment = body_json(resp).await;
    let resp = send(&mut app, json_request("POST", "/api/brands/", token, r#"{"brand_name":"Tesla"}"#)).await;
    let tesla: Brand = body_json(resp).await;

    let body = format!(
        r#"{{"vehicle_name":"MODEL S","release_year":2019,"price":500,"segment":{},"brand":{}}}"#,
        sedan.id, tesla.id
    );
    let resp = send(&mut app, json_request("POST", "/api/vehicles/", token, &body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let model_s: Vehicle = body_json(resp).await;
    assert_eq!(model_s.segment_name, "Sedan");
    assert_eq!(model_s.brand_name, "Tesla");
    assert_eq!(model_s.price.to_string(), "500.00");

    let body = format!(
        r#"{{"vehicle_name":"MODEL X","release_year":2020,"price":"900.50","segment":{},"brand":{}}}"#,
        suv.id, tesla.id
    );
    let resp = send(&mut app, json_request("POST", "/api/vehicles/", token, &body)).await;
    let model_x: Vehicle = body_json(resp).await;

    // update keeps denormalized names in sync
    let body = format!(
        r#"{{"vehicle_name":"MODEL S","release_year":2021,"price":"550.00","segment":{},"brand":{}}}"#,
        suv.id, tesla.id
    );
    let uri = format!("/api/vehicles/{}/", model_s.id);
    let resp = send(&mut app, json_request("PUT", &uri, token, &body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Vehicle = body_json(resp).await;
    assert_eq!(updated.segment_name, "SUV");
    assert_eq!(updated.release_year, 2021);

    // deleting the segment deletes both vehicles that now reference it
    let resp = send(&mut app, bare_request("DELETE", &format!("/api/segments/{}/", suv.id), token)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&mut app, bare_request("GET", "/api/vehicles/", token)).await;
    let vehicles: Vec<Vehicle> = body_json(resp).await;
    assert!(vehicles.iter().all(|v| v.id != model_x.id && v.id != model_s.id));
    assert!(vehicles.is_empty());
}

#[tokio::test]
async fn vehicle_with_unknown_brand_is_rejected() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    let token = Some(token.as_str());
    send(&mut app, json_request("POST", "/api/segments/", token, r#"{"segment_name":"Sedan"}"#)).await;

    let resp = send(
        &mut app,
        json_request(
            "POST",
            "/api/vehicles/",
            token,
            r#"{"vehicle_name":"Ghost","release_year":2020,"price":"1.00","segment":1,"brand":42}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vehicle_price_over_limit_is_rejected() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    let token = Some(token.as_str());
    send(&mut app, json_request("POST", "/api/segments/", token, r#"{"segment_name":"Sedan"}"#)).await;
    send(&mut app, json_request("POST", "/api/brands/", token, r#"{"brand_name":"Audi"}"#)).await;

    let resp = send(
        &mut app,
        json_request(
            "POST",
            "/api/vehicles/",
            token,
            r#"{"vehicle_name":"R8","release_year":2020,"price":"10000.00","segment":1,"brand":1}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
