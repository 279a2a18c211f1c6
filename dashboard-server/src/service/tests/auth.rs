//! Sign in and out tests

use actix_web::http::StatusCode;
use actix_web::{App, test};
use dashboard::Role;
use dashboard::auth::backend::LoginResponse;
use serde_json::json;

use crate::model::Model;
use crate::service;
use crate::service::tests::{bearer, no_assets, token};

#[actix_web::test]
async fn login_returns_role_token() {
    let model = Model::test();
    let app = App::new().configure(service::configure(model.clone(), no_assets()));
    let app = test::init_service(app).await;

    for (username, password, role) in [
        ("intern", "intern123", Role::Intern),
        ("spoc", "spoc123", Role::Spoc),
        ("manager", "manager123", Role::Manager),
    ] {
        let resp: LoginResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/Auth/login")
                .set_json(json!({ "username": username, "password": password }))
                .to_request(),
        )
        .await;

        assert_eq!(resp.role, role);
        let claims = model
            .auth()
            .issuer()
            .verify(resp.token.as_str())
            .await
            .unwrap();
        assert_eq!(claims.user.username, username);
        assert_eq!(claims.expires_at, resp.expires_at);
    }
}

#[actix_web::test]
async fn login_rejects_invalid_credentials() {
    let app = App::new().configure(service::configure(Model::test(), no_assets()));
    let app = test::init_service(app).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/Auth/login")
            .set_json(json!({ "username": "spoc", "password": "intern123" }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn logout_revokes_token() {
    let model = Model::test();
    let app = App::new().configure(service::configure(model.clone(), no_assets()));
    let app = test::init_service(app).await;

    let login: LoginResponse = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/Auth/login")
            .set_json(json!({ "username": "manager", "password": "manager123" }))
            .to_request(),
    )
    .await;
    let token = login.token.as_str();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/InternPerformance")
            .insert_header(bearer(token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/Auth/logout")
            .set_json(json!({ "token": token }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(model.auth().issuer().active().await, 0);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/InternPerformance")
            .insert_header(bearer(token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn logout_always_succeeds() {
    let app = App::new().configure(service::configure(Model::test(), no_assets()));
    let app = test::init_service(app).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/Auth/logout")
            .set_json(json!({ "token": "v4.public.garbage" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/Auth/logout").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn logout_with_stale_bearer() {
    let model = Model::test();
    let token = token(&model, "manager").await.unwrap();
    let app = App::new().configure(service::configure(model.clone(), no_assets()));
    let app = test::init_service(app).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/Auth/logout")
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(model.auth().issuer().active().await, 0);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/Auth/logout")
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}
