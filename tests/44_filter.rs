mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::TestApp;

fn names(body: &serde_json::Value) -> Vec<String> {
    body["data"]["value"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|r| r["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn filter_by_equality() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .get("/api/locations?$filter=locationType%20eq%20'line'", Some(&app.user_token()))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(names(&res.body), vec!["Cooling Tower 1"]);
    Ok(())
}

#[tokio::test]
async fn filter_by_guid_and_function() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token();

    let uri = format!("/api/locations?$filter=parentId%20eq%20{}", app.demo.site_a);
    let res = app.get(&uri, Some(&token)).await?;
    assert_eq!(names(&res.body), vec!["Cooling Tower 1"]);

    let res = app
        .get("/api/locations?$filter=startswith(name,'River')%20or%20parentId%20eq%20null", Some(&token))
        .await?;
    assert_eq!(names(&res.body), vec!["Riverside Plant"]);
    Ok(())
}

#[tokio::test]
async fn filter_never_widens_tenant_scope() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .get("/api/locations?$filter=name%20eq%20'Harbor%20Plant'", Some(&app.user_token()))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(names(&res.body).is_empty());
    Ok(())
}

#[tokio::test]
async fn order_page_and_count() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .get("/api/locations?$orderby=name%20desc&$top=1&$count=true", Some(&app.user_token()))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(names(&res.body), vec!["Riverside Plant"]);
    assert_eq!(res.body["data"]["@odata.count"], 2);

    let res = app
        .get("/api/locations?$orderby=name&$skip=1", Some(&app.user_token()))
        .await?;
    assert_eq!(names(&res.body), vec!["Riverside Plant"]);
    Ok(())
}

#[tokio::test]
async fn malformed_options_are_format_errors() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token();

    let res = app.get("/api/locations?$filter=name%20eq%20'open", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_codes(), vec!["format-invalid"]);
    assert_eq!(res.body["errors"][0]["property"], "$filter");

    let res = app.get("/api/locations?$orderby=name%20sideways", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["errors"][0]["property"], "$orderby");

    let res = app.get("/api/locations?$top=many", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_codes(), vec!["format-invalid"]);
    Ok(())
}
