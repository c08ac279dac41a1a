mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::TestApp;
use ffco_api::auth::{encode_claims, Claims};

#[tokio::test]
async fn public_routes_need_no_token() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.get("/", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "FFCO API");

    let res = app.get("/health", None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["database"], "memory");
    Ok(())
}

#[tokio::test]
async fn missing_token_is_unauthorized() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.get("/api/locations", None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.error_codes(), vec!["token-invalid-missing-user-id"]);
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_unauthorized() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.get("/api/dashboards", Some("not.a.jwt")).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error_codes(), vec!["token-invalid-missing-user-id"]);
    Ok(())
}

#[tokio::test]
async fn token_without_user_id_claim_is_unauthorized() -> Result<()> {
    let app = TestApp::spawn().await?;

    let anonymous = encode_claims(&Claims::new(None, Some("service".to_string()), 1), &app.config.security)?;
    let res = app.get("/api/dashboards", Some(&anonymous)).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let malformed = encode_claims(
        &Claims::new(Some("not-a-uuid".to_string()), None, 1),
        &app.config.security,
    )?;
    let res = app.get("/api/dashboards", Some(&malformed)).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn valid_token_reaches_facade() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.get("/api/dashboards", Some(&app.user_token())).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["value"].as_array().map(Vec::len), Some(1));
    Ok(())
}
