//! End-to-end workflow: manual add, recce assignment, submission, review
//! (reject then approve), installation assignment and submission.

mod common;

use axum::{body, http::Method, response::Response};
use common::TestApp;
use serde_json::{json, Value};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_full_store_lifecycle() {
    let app = TestApp::new().await;

    // Manual add by the admin.
    let response = app
        .request(
            Method::POST,
            "/api/v1/stores",
            Some(json!({
                "dealer_code": "dlr001",
                "store_name": "Elora Art",
                "city": "Mumbai",
                "district": "Mumbai Suburban",
                "address": "12 MG Road"
            })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    let store = &body["data"];
    assert_eq!(store["current_status"], "MANUALLY_ADDED");
    assert_eq!(store["dealer_code"], "DLR001");
    assert_eq!(store["store_id"], "MUMMUMDLR001");
    let store_pk = store["id"].as_str().expect("store id").to_string();

    // Direct recce assignment.
    let response = app
        .request(
            Method::POST,
            "/api/v1/stores/recce/assign",
            Some(json!({
                "store_ids": [store_pk],
                "assignee_id": app.recce.id
            })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["successCount"], 1);
    assert_eq!(body["data"]["errorCount"], 0);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/stores/{store_pk}"),
            None,
            Some(&app.recce.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["current_status"], "RECCE_ASSIGNED");

    // The installer cannot submit someone else's recce.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/recce"),
            Some(json!({ "notes": "not mine" })),
            Some(&app.installer.token),
        )
        .await;
    assert_eq!(response.status(), 403);

    // Recce submission by the assignee.
    let submit_payload = json!({
        "notes": "Front wall is usable",
        "site_photos": ["http://localhost:8080/uploads/recce/GENERAL/MUMMUMDLR001/site.jpg"],
        "photos": [{
            "url": "http://localhost:8080/uploads/recce/GENERAL/MUMMUMDLR001/board.jpg",
            "width": 10.0,
            "height": 8.0,
            "unit": "ft",
            "elements": []
        }]
    });
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/recce"),
            Some(submit_payload.clone()),
            Some(&app.recce.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["current_status"], "RECCE_SUBMITTED");

    // Field users cannot review.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/recce/review"),
            Some(json!({ "decision": "APPROVED" })),
            Some(&app.recce.token),
        )
        .await;
    assert_eq!(response.status(), 403);

    // Rejection requires remarks.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/recce/review"),
            Some(json!({ "decision": "REJECTED" })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 400);

    // Reject with remarks stamps them into the recce notes.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/recce/review"),
            Some(json!({ "decision": "REJECTED", "remarks": "Photos are blurry" })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["current_status"], "RECCE_REJECTED");
    let notes = body["data"]["recce"]["notes"].as_str().expect("notes");
    assert!(notes.starts_with("[Admin]: Photos are blurry | "));

    // Resubmission after rejection, then approval.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/recce"),
            Some(submit_payload),
            Some(&app.recce.token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/recce/review"),
            Some(json!({ "decision": "APPROVED" })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["current_status"], "RECCE_APPROVED");

    // Installation assignment and submission.
    let response = app
        .request(
            Method::POST,
            "/api/v1/stores/installation/assign",
            Some(json!({
                "store_ids": [store_pk],
                "assignee_id": app.installer.id
            })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/installation"),
            Some(json!({
                "photos": [{
                    "url": "http://localhost:8080/uploads/installation/GENERAL/MUMMUMDLR001/after.jpg",
                    "recce_photo_index": 0
                }]
            })),
            Some(&app.installer.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["current_status"], "INSTALLATION_SUBMITTED");

    // Report becomes available once recce data exists.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/stores/{store_pk}/report"),
            None,
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["store_id"], "MUMMUMDLR001");
    assert_eq!(
        body["data"]["photos"][0]["installation_url"],
        "http://localhost:8080/uploads/installation/GENERAL/MUMMUMDLR001/after.jpg"
    );
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_unassign_rolls_status_back() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/stores",
            Some(json!({
                "dealer_code": "DLR777",
                "store_name": "Roll Back",
                "city": "Pune",
                "district": "Haveli"
            })),
            Some(&app.admin.token),
        )
        .await;
    let body = response_json(response).await;
    let store_pk = body["data"]["id"].as_str().unwrap().to_string();

    app.request(
        Method::POST,
        "/api/v1/stores/recce/assign",
        Some(json!({ "store_ids": [store_pk], "assignee_id": app.recce.id })),
        Some(&app.admin.token),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/stores/recce/unassign",
            Some(json!({ "store_ids": [store_pk] })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/stores/{store_pk}"),
            None,
            Some(&app.admin.token),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["current_status"], "UPLOADED");
    assert!(body["data"]["recce_assigned_to"].is_null());
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_duplicate_dealer_code_rejected() {
    let app = TestApp::new().await;

    let payload = json!({
        "dealer_code": "DLR900",
        "store_name": "First",
        "city": "Nagpur",
        "district": "Nagpur"
    });
    let response = app
        .request(
            Method::POST,
            "/api/v1/stores",
            Some(payload.clone()),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .request(
            Method::POST,
            "/api/v1/stores",
            Some(payload),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        "A store with this Dealer Code already exists"
    );
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_submissions_are_not_status_gated() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/stores",
            Some(json!({
                "dealer_code": "DLR001",
                "store_name": "Elora Art",
                "city": "Mumbai",
                "district": "Mumbai Suburban"
            })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    let store_pk = body["data"]["id"].as_str().expect("store id").to_string();

    // An admin can record a recce straight from MANUALLY_ADDED; the workflow
    // never gates submissions on the current status.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/recce"),
            Some(json!({
                "notes": "ok",
                "photos": [{ "url": "uploads/recce/front.jpg", "width": 10.0, "height": 8.0, "unit": "ft" }]
            })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["current_status"], "RECCE_SUBMITTED");
    assert_eq!(body["data"]["store_id"], "MUMMUMDLR001");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/recce/review"),
            Some(json!({ "decision": "APPROVED" })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 200);

    // Installation likewise goes through without an assignment step.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/stores/{store_pk}/installation"),
            Some(json!({
                "photos": [{ "url": "uploads/installation/after.jpg", "recce_photo_index": 0 }]
            })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["current_status"], "INSTALLATION_SUBMITTED");
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_admin_update_can_mark_completed() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/stores",
            Some(json!({
                "dealer_code": "DLR002",
                "store_name": "Crown Decor",
                "city": "Nagpur",
                "district": "Nagpur"
            })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    let store_pk = body["data"]["id"].as_str().expect("store id").to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/stores/{store_pk}"),
            Some(json!({ "current_status": "COMPLETED" })),
            Some(&app.admin.token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["current_status"], "COMPLETED");
}
