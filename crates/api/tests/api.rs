//! End-to-end tests for the REST router against an in-memory database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use api::{build_router, AppState};
use engine::LinkConfig;

async fn app() -> Router {
    let pool = db::pool::memory_pool().await.expect("pool");
    build_router(AppState::new(pool, LinkConfig::default()))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn seed(app: &Router) {
    let (status, _) = call(app, "POST", "/databases", Some(json!({ "databaseId": "plant" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    for id in ["turbine", "blade"] {
        let (status, _) = call(
            app,
            "POST",
            "/databases/plant/assets",
            Some(json!({ "assetId": id, "assetName": id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// =============================================================================
// Link graph
// =============================================================================

#[tokio::test]
async fn parent_child_link_is_listed_from_both_sides() {
    let app = app().await;
    seed(&app).await;

    let (status, link) = call(
        &app,
        "POST",
        "/asset-links",
        Some(json!({
            "fromDatabaseId": "plant",
            "fromAssetId": "turbine",
            "toDatabaseId": "plant",
            "toAssetId": "blade",
            "relationshipType": "parentChild",
            "tags": ["assembly"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let link_id = link["assetLinkId"].as_str().unwrap().to_owned();

    let (_, turbine) = call(&app, "GET", "/databases/plant/assets/turbine/asset-links", None).await;
    assert_eq!(turbine["children"].as_array().unwrap().len(), 1);
    assert_eq!(turbine["children"][0]["assetId"], "blade");
    assert_eq!(turbine["parents"].as_array().unwrap().len(), 0);

    let (_, blade) = call(&app, "GET", "/databases/plant/assets/blade/asset-links", None).await;
    assert_eq!(blade["parents"][0]["assetLinkId"], link_id.as_str());

    let (status, body) = call(
        &app,
        "POST",
        "/asset-links",
        Some(json!({
            "fromDatabaseId": "plant",
            "fromAssetId": "blade",
            "toDatabaseId": "plant",
            "toAssetId": "turbine",
            "relationshipType": "parentChild"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn deleting_link_cascades_to_metadata() {
    let app = app().await;
    seed(&app).await;

    let (_, link) = call(
        &app,
        "POST",
        "/asset-links",
        Some(json!({
            "fromDatabaseId": "plant",
            "fromAssetId": "turbine",
            "toDatabaseId": "plant",
            "toAssetId": "blade",
            "relationshipType": "related"
        })),
    )
    .await;
    let link_id = link["assetLinkId"].as_str().unwrap().to_owned();
    let metadata_uri = format!("/asset-links/{link_id}/metadata");

    let (status, _) = call(
        &app,
        "POST",
        &metadata_uri,
        Some(json!({
            "metadataKey": "offset",
            "metadataValue": "{\"x\":0,\"y\":1.5,\"z\":0}",
            "metadataValueType": "XYZ"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &app,
        "POST",
        &metadata_uri,
        Some(json!({
            "metadataKey": "angle",
            "metadataValue": "steep",
            "metadataValueType": "number"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "DELETE", &format!("/asset-links/{link_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, "GET", &metadata_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metadata_type_defaults_to_string() {
    let app = app().await;
    seed(&app).await;

    let (_, link) = call(
        &app,
        "POST",
        "/asset-links",
        Some(json!({
            "fromDatabaseId": "plant",
            "fromAssetId": "turbine",
            "toDatabaseId": "plant",
            "toAssetId": "blade",
            "relationshipType": "related"
        })),
    )
    .await;
    let link_id = link["assetLinkId"].as_str().unwrap().to_owned();
    let metadata_uri = format!("/asset-links/{link_id}/metadata");

    let (status, body) = call(
        &app,
        "POST",
        &metadata_uri,
        Some(json!({ "metadataKey": "note", "metadataValue": "inspected" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["metadataValueType"], "string");

    let (status, body) = call(
        &app,
        "PUT",
        &format!("{metadata_uri}/note"),
        Some(json!({ "metadataValue": "replaced" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadataValue"], "replaced");
    assert_eq!(body["metadataValueType"], "string");
}

#[tokio::test]
async fn unknown_endpoint_asset_is_rejected() {
    let app = app().await;
    seed(&app).await;
    let (status, body) = call(
        &app,
        "POST",
        "/asset-links",
        Some(json!({
            "fromDatabaseId": "plant",
            "fromAssetId": "turbine",
            "toDatabaseId": "plant",
            "toAssetId": "nacelle",
            "relationshipType": "related"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("nacelle"));
}

// =============================================================================
// Catalog & executions
// =============================================================================

#[tokio::test]
async fn workflow_listing_includes_global_and_executions_settle() {
    let app = app().await;
    seed(&app).await;

    let (status, _) = call(
        &app,
        "POST",
        "/databases/GLOBAL/pipelines",
        Some(json!({
            "pipelineId": "mesh-preview",
            "assetType": ".obj",
            "outputType": ".glb",
            "executionType": "Lambda"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &app,
        "PUT",
        "/databases/GLOBAL/pipelines/mesh-preview/enabled",
        Some(json!({ "enabled": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        "POST",
        "/databases/GLOBAL/workflows",
        Some(json!({
            "workflowId": "preview",
            "pipelines": [{ "databaseId": "GLOBAL", "pipelineId": "mesh-preview" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = call(&app, "GET", "/databases/plant/workflows", None).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["databaseId"], "GLOBAL");

    let (status, execution) = call(
        &app,
        "POST",
        "/databases/plant/assets/turbine/workflows/preview",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(execution["status"], "RUNNING");
    let execution_id = execution["executionId"].as_str().unwrap().to_owned();

    let (status, _) = call(
        &app,
        "POST",
        "/databases/plant/assets/turbine/workflows/preview",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let status_uri = format!("/workflows/GLOBAL/preview/executions/{execution_id}/status");
    let (status, done) =
        call(&app, "PUT", &status_uri, Some(json!({ "status": "SUCCEEDED" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(done["stoppedAt"].is_string());

    let (status, _) = call(&app, "PUT", &status_uri, Some(json!({ "status": "FAILED" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, executions) = call(
        &app,
        "GET",
        "/databases/plant/assets/turbine/workflows/preview/executions",
        None,
    )
    .await;
    assert_eq!(executions.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn permanent_asset_delete_removes_links() {
    let app = app().await;
    seed(&app).await;
    let (_, link) = call(
        &app,
        "POST",
        "/asset-links",
        Some(json!({
            "fromDatabaseId": "plant",
            "fromAssetId": "turbine",
            "toDatabaseId": "plant",
            "toAssetId": "blade",
            "relationshipType": "related"
        })),
    )
    .await;

    let (status, _) = call(
        &app,
        "DELETE",
        "/databases/plant/assets/blade?permanent=true",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let uri = format!("/asset-links/{}", link["assetLinkId"].as_str().unwrap());
    let (status, _) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, turbine) = call(&app, "GET", "/databases/plant/assets/turbine/asset-links", None).await;
    assert_eq!(turbine["related"].as_array().unwrap().len(), 0);
    assert_eq!(turbine["hidden"]["related"], 0);
}

#[tokio::test]
async fn reserved_database_cannot_be_created() {
    let app = app().await;
    let (status, body) =
        call(&app, "POST", "/databases", Some(json!({ "databaseId": "GLOBAL" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("reserved"));
}
