//! Bulk spreadsheet import and roster assignment sheets.

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

const STORE_SHEET: &str = "\
Sr. No.,Dealer Code,Vendor Code & Name,Dealer's Name,City,District,Dealer's Address,Width (Ft.),Height (Ft.),Dealer Board Type
1,DLR100,V01 Acme,Sunrise Traders,Mumbai,Mumbai Suburban,12 MG Road,10,4,Flex
2,DLR101,V01 Acme,Moonlight Stores,Pune,Haveli,5 FC Road,8,3,ACP
3,,V01 Acme,No Dealer Code,Nashik,Nashik,Main Road,6,3,Flex
4,DLR100,V01 Acme,Duplicate In File,Mumbai,Mumbai Suburban,12 MG Road,10,4,Flex
";

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_bulk_upload_reports_row_errors() {
    let app = TestApp::new().await;

    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/stores/upload",
            &app.admin.token,
            "stores.csv",
            STORE_SHEET.as_bytes(),
            &[("client_code", "ACME")],
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let report = &body["data"];
    assert_eq!(report["totalProcessed"], 4);
    assert_eq!(report["successCount"], 2);
    assert_eq!(report["errorCount"], 2);

    let errors = report["errors"].as_array().expect("errors array");
    assert_eq!(errors[0]["row"], 4);
    assert_eq!(errors[0]["reason"], "Skipped: 'Dealer Code' is missing or empty");
    assert_eq!(errors[1]["row"], 5);
    assert_eq!(errors[1]["reference"], "DLR100");
    assert_eq!(errors[1]["reason"], "Duplicate Dealer Code in this file");

    // Uploading the same sheet again trips the database duplicate check.
    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/stores/upload",
            &app.admin.token,
            "stores.csv",
            STORE_SHEET.as_bytes(),
            &[("client_code", "ACME")],
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["successCount"], 0);
    assert_eq!(
        body["data"]["errors"][0]["reason"],
        "A store with this Dealer Code already exists"
    );
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_bulk_upload_all_good_returns_created() {
    let app = TestApp::new().await;

    let sheet = "\
Sr. No.,Dealer Code,Vendor Code & Name,Dealer's Name,City,District,Dealer's Address,Width (Ft.),Height (Ft.),Dealer Board Type
1,DLR200,V02,Clean Row,Nagpur,Nagpur,Station Road,7,3,Flex
";
    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/stores/upload",
            &app.admin.token,
            "stores.csv",
            sheet.as_bytes(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["errorCount"], 0);

    // The derived business id is keyed on city, district and dealer code.
    let response = app
        .request(
            Method::GET,
            "/api/v1/stores?search=DLR200",
            None,
            Some(&app.admin.token),
        )
        .await;
    let body = response_json(response).await;
    let store = &body["data"]["stores"][0];
    assert_eq!(store["store_id"], "NAGNAGDLR200");
    assert_eq!(store["current_status"], "UPLOADED");
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_roster_assignment_sheets() {
    let app = TestApp::new().await;

    // Seed one store through the upload path so the roster sheet can find it.
    let sheet = "\
Sr. No.,Dealer Code,Vendor Code & Name,Dealer's Name,City,District,Dealer's Address,Width (Ft.),Height (Ft.),Dealer Board Type
1,DLR300,V03,Roster Target,Mumbai,Mumbai Suburban,Hill Road,9,4,ACP
";
    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/stores/upload",
            &app.admin.token,
            "stores.csv",
            sheet.as_bytes(),
            &[("client_code", "ACME")],
        )
        .await;
    assert_eq!(response.status(), 201);

    let roster = "\
Store ID,Client Code,Status
MUMMUMDLR300,ACME,
MISSING999,,
";

    // Installation before recce approval is refused per row.
    let response = app
        .request_multipart(
            Method::POST,
            &format!(
                "/api/v1/stores/installation/assign-sheet/{}",
                app.installer.id
            ),
            &app.admin.token,
            "roster.csv",
            roster.as_bytes(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["successCount"], 0);
    assert_eq!(
        body["data"]["errors"][0]["reason"],
        "Recce not approved yet (status: UPLOADED)"
    );

    // Recce roster sheet assigns the known store and reports the unknown one.
    let response = app
        .request_multipart(
            Method::POST,
            &format!("/api/v1/stores/recce/assign-sheet/{}", app.recce.id),
            &app.admin.token,
            "roster.csv",
            roster.as_bytes(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let report = &body["data"];
    assert_eq!(report["successCount"], 1);
    assert_eq!(report["errorCount"], 1);
    assert_eq!(report["errors"][0]["reference"], "MISSING999");
    assert_eq!(report["errors"][0]["reason"], "Store not found");

    // A store still in RECCE_ASSIGNED may be handed to someone else; only
    // submitted or later recces are locked.
    let response = app
        .request_multipart(
            Method::POST,
            &format!("/api/v1/stores/recce/assign-sheet/{}", app.recce.id),
            &app.admin.token,
            "roster.csv",
            roster.as_bytes(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["successCount"], 1);
    assert_eq!(body["data"]["errors"][0]["reason"], "Store not found");
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_roster_sheet_rejects_wrong_assignee_role() {
    let app = TestApp::new().await;

    let roster = "Store ID,Client Code,Status\nMUMMUMDLR300,,\n";
    let response = app
        .request_multipart(
            Method::POST,
            &format!("/api/v1/stores/recce/assign-sheet/{}", app.installer.id),
            &app.admin.token,
            "roster.csv",
            roster.as_bytes(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore = "requires the sqlite test database"]
async fn test_field_users_cannot_upload_stores() {
    let app = TestApp::new().await;

    let sheet = "Sr. No.,Dealer Code,Dealer's Name,City,District\n1,DLR400,Nope,Pune,Haveli\n";
    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/stores/upload",
            &app.recce.token,
            "stores.csv",
            sheet.as_bytes(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 403);
}
