//! Router-level integration tests over in-memory stores.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use axum_test::TestServer;
use caravan_core::stores::{TravelerStore, UserStore};
use caravan_core::types::{Designation, Its, NewTraveler, User};
use caravan_core::MemoryStores;
use caravan_server::session::{hash_password, Session, SessionStore};
use caravan_server::{build_router, AppState};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

struct TestApp {
    server: TestServer,
    stores: MemoryStores,
}

async fn spawn_app() -> TestApp {
    let stores = MemoryStores::new();
    for (username, password, designation) in [
        ("root", "rootpw", Designation::Admin),
        ("alice", "alicepw", Designation::Customs),
        ("gate", "gatepw", Designation::Arrival),
    ] {
        stores
            .create_user(&User {
                username: username.into(),
                password_hash: hash_password(password),
                designation,
            })
            .await
            .unwrap();
    }

    let state = AppState::new(stores.clone(), 10);
    let server = TestServer::new(build_router(state)).unwrap();
    TestApp { server, stores }
}

impl TestApp {
    async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .server
            .post("/auth/login")
            .json(&json!({"username": username, "password": password}))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn seed_traveler(&self, its: i64) {
        self.stores
            .create_traveler(&NewTraveler {
                its: Its::new(its).unwrap(),
                first_name: "Amina".into(),
                middle_name: None,
                last_name: "Khan".into(),
                date_of_birth: None,
                passport_no: None,
                passport_expiry: None,
                visa_no: None,
            })
            .await
            .unwrap();
    }
}

fn process_body(its: i64, passport: &str) -> Value {
    json!({
        "its": its,
        "first_name": "Amina",
        "last_name": "Khan",
        "passport_no": passport,
        "passport_expiry": "2030-01-01",
    })
}

#[tokio::test]
async fn health_needs_no_auth() {
    let app = spawn_app().await;
    app.server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/auth/login")
        .json(&json!({"username": "alice", "password": "wrong"}))
        .await;
    response.assert_status_unauthorized();

    let response = app
        .server
        .post("/auth/login")
        .json(&json!({"username": "nobody", "password": "x"}))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn api_requires_a_session() {
    let app = spawn_app().await;
    app.server
        .get("/api/travelers")
        .await
        .assert_status_unauthorized();

    let token = app.login("alice", "alicepw").await;
    app.server
        .get("/api/travelers")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    // Logout revokes the token.
    app.server
        .post("/auth/logout")
        .authorization_bearer(&token)
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);
    app.server
        .get("/api/travelers")
        .authorization_bearer(&token)
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn expired_sessions_are_rejected() {
    let state = AppState::new(MemoryStores::new(), 10);
    state
        .sessions
        .insert(
            "old-token",
            Session {
                username: "alice".into(),
                designation: Designation::Customs,
                created_at: Utc::now() - Duration::hours(13),
            },
        )
        .await;
    let server = TestServer::new(build_router(state)).unwrap();

    server
        .get("/api/travelers")
        .authorization_bearer("old-token")
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn role_guards_hold() {
    let app = spawn_app().await;
    app.seed_traveler(100).await;
    let gate = app.login("gate", "gatepw").await;
    let alice = app.login("alice", "alicepw").await;

    // Arrival staff cannot process.
    app.server
        .post("/api/process")
        .authorization_bearer(&gate)
        .json(&process_body(100, "P100"))
        .await
        .assert_status_forbidden();

    // Customs staff cannot mark arrivals, clear data, or create accounts.
    app.server
        .post("/api/travelers/100/arrived")
        .authorization_bearer(&alice)
        .await
        .assert_status_forbidden();
    app.server
        .delete("/api/travelers")
        .authorization_bearer(&alice)
        .await
        .assert_status_forbidden();
    app.server
        .post("/api/users")
        .authorization_bearer(&alice)
        .json(&json!({"username": "eve", "password": "pw", "designation": "customs"}))
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn admin_creates_accounts() {
    let app = spawn_app().await;
    let root = app.login("root", "rootpw").await;

    let response = app
        .server
        .post("/api/users")
        .authorization_bearer(&root)
        .json(&json!({"username": "bob", "password": "bobpw", "designation": "customs"}))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    // The new account can log in; a duplicate username conflicts.
    app.login("bob", "bobpw").await;
    app.server
        .post("/api/users")
        .authorization_bearer(&root)
        .json(&json!({"username": "bob", "password": "other", "designation": "arrival"}))
        .await
        .assert_status_conflict();

    // Blank usernames and passwords are rejected.
    app.server
        .post("/api/users")
        .authorization_bearer(&root)
        .json(&json!({"username": "   ", "password": "pw", "designation": "customs"}))
        .await
        .assert_status_bad_request();
    app.server
        .post("/api/users")
        .authorization_bearer(&root)
        .json(&json!({"username": "carol", "password": "", "designation": "customs"}))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn processing_example_flow() {
    let app = spawn_app().await;
    app.seed_traveler(12345).await;
    let alice = app.login("alice", "alicepw").await;

    let response = app
        .server
        .post("/api/process")
        .authorization_bearer(&alice)
        .json(&process_body(12345, "P123"))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["pending_count"], 1);
    assert_eq!(body["should_flush"], false);
    assert_eq!(body["record"]["operator"], "alice");

    // Processing the same traveler again conflicts and the batch stays at 1.
    app.server
        .post("/api/process")
        .authorization_bearer(&alice)
        .json(&process_body(12345, "P123"))
        .await
        .assert_status_conflict();

    let pending = app
        .server
        .get("/api/pending-batch")
        .authorization_bearer(&alice)
        .await
        .json::<Value>();
    assert_eq!(pending["count"], 1);
}

#[tokio::test]
async fn flush_empties_the_batch() {
    let app = spawn_app().await;
    for its in 1..=3 {
        app.seed_traveler(its).await;
    }
    let alice = app.login("alice", "alicepw").await;
    for its in 1..=3 {
        app.server
            .post("/api/process")
            .authorization_bearer(&alice)
            .json(&process_body(its, &format!("P{its}")))
            .await
            .assert_status_ok();
    }

    let flushed = app
        .server
        .post("/api/flush-batch")
        .authorization_bearer(&alice)
        .await
        .json::<Value>();
    assert_eq!(flushed["count"], 3);
    let its_order: Vec<i64> = flushed["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["its"].as_i64().unwrap())
        .collect();
    assert_eq!(its_order, vec![1, 2, 3]);

    // Second flush finds nothing; that is not an error.
    let again = app
        .server
        .post("/api/flush-batch")
        .authorization_bearer(&alice)
        .await
        .json::<Value>();
    assert_eq!(again["count"], 0);
}

#[tokio::test]
async fn capacity_is_bounded_and_seats_reused() {
    let app = spawn_app().await;
    for its in 1..=4 {
        app.seed_traveler(its).await;
    }
    let root = app.login("root", "rootpw").await;

    let unit = app
        .server
        .post("/api/units")
        .authorization_bearer(&root)
        .json(&json!({"kind": "bus", "capacity": 3}))
        .await
        .json::<Value>();
    let unit_id = unit["id"].as_i64().unwrap();

    let mut bookings = Vec::new();
    for its in 1..=3 {
        let response = app
            .server
            .post("/api/allocate-seat")
            .authorization_bearer(&root)
            .json(&json!({"its": its, "unit_id": unit_id}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        bookings.push(response.json::<Value>());
    }
    let seats: Vec<i64> = bookings
        .iter()
        .map(|b| b["seat"].as_i64().unwrap())
        .collect();
    assert_eq!(seats, vec![1, 2, 3]);

    // Unit is now full.
    app.server
        .post("/api/allocate-seat")
        .authorization_bearer(&root)
        .json(&json!({"its": 4, "unit_id": unit_id}))
        .await
        .assert_status_conflict();

    // Cancelling seat 2 makes it the next seat issued.
    let booking_two = bookings[1]["id"].as_i64().unwrap();
    app.server
        .post("/api/cancel-seat")
        .authorization_bearer(&root)
        .json(&json!({"booking_id": booking_two}))
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);
    let replacement = app
        .server
        .post("/api/allocate-seat")
        .authorization_bearer(&root)
        .json(&json!({"its": 4, "unit_id": unit_id}))
        .await
        .json::<Value>();
    assert_eq!(replacement["seat"], 2);

    let units = app
        .server
        .get("/api/units?kind=bus")
        .authorization_bearer(&root)
        .await
        .json::<Value>();
    assert_eq!(units["units"][0]["attrs"]["seated"]["seats_remaining"], 0);
}

#[tokio::test]
async fn departure_check_reports_bookings() {
    let app = spawn_app().await;
    app.seed_traveler(1).await;
    let root = app.login("root", "rootpw").await;

    let unit = app
        .server
        .post("/api/units")
        .authorization_bearer(&root)
        .json(&json!({"kind": "bus", "capacity": 2}))
        .await
        .json::<Value>();
    app.server
        .post("/api/allocate-seat")
        .authorization_bearer(&root)
        .json(&json!({"its": 1, "unit_id": unit["id"]}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = app
        .server
        .get("/api/travelers/1/bookings")
        .authorization_bearer(&root)
        .await
        .json::<Value>();
    assert_eq!(response["bookings"].as_array().unwrap().len(), 1);
    assert_eq!(response["bookings"][0]["seat"], 1);
    assert_eq!(response["bookings"][0]["kind"], "bus");

    app.server
        .get("/api/travelers/999/bookings")
        .authorization_bearer(&root)
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn group_registration_policies() {
    let app = spawn_app().await;
    for its in 1..=3 {
        app.seed_traveler(its).await;
    }
    let alice = app.login("alice", "alicepw").await;

    // A missing member rejects the whole group.
    let response = app
        .server
        .post("/api/register-group")
        .authorization_bearer(&alice)
        .json(&json!({"leader_its": 1, "member_its": [2, 99]}))
        .await;
    response.assert_status_not_found();

    // The leader cannot be a member of their own group.
    app.server
        .post("/api/register-group")
        .authorization_bearer(&alice)
        .json(&json!({"leader_its": 1, "member_its": [1, 2]}))
        .await
        .assert_status_bad_request();

    let response = app
        .server
        .post("/api/register-group")
        .authorization_bearer(&alice)
        .json(&json!({"leader_its": 1, "member_its": [2, 3]}))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let group = response.json::<Value>();

    let fetched = app
        .server
        .get(&format!("/api/groups/{}", group["id"]))
        .authorization_bearer(&alice)
        .await
        .json::<Value>();
    assert_eq!(fetched["leader"], 1);
    assert_eq!(fetched["members"], json!([2, 3]));
}

#[tokio::test]
async fn csv_import_and_lookup() {
    let app = spawn_app().await;
    let alice = app.login("alice", "alicepw").await;

    let csv = "ITS_ID,Full_Name,Date of Birth,Passport Number,Passport Expiry Date,Visa Number\n\
               12345,Amina Bibi Khan,1990-05-12,P123,2030-01-01,V9\n\
               12346,Yusuf Patel,03/07/1985,P124,15/08/2031,\n";
    let response = app
        .server
        .post("/api/travelers/import")
        .authorization_bearer(&alice)
        .bytes(csv.as_bytes().to_vec().into())
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["imported"], 2);

    let traveler = app
        .server
        .get("/api/travelers/12345")
        .authorization_bearer(&alice)
        .await
        .json::<Value>();
    assert_eq!(traveler["first_name"], "Amina");
    assert_eq!(traveler["middle_name"], "Bibi");
    assert_eq!(traveler["last_name"], "Khan");

    // A bad row rejects the whole file with the offending line.
    let bad = "ITS_ID,Full_Name,Date of Birth,Passport Number,Passport Expiry Date,Visa Number\n\
               12347,Sara Ali,not-a-date,P125,2030-01-01,\n";
    let response = app
        .server
        .post("/api/travelers/import")
        .authorization_bearer(&alice)
        .bytes(bad.as_bytes().to_vec().into())
        .await;
    response.assert_status_bad_request();
    assert!(response.json::<Value>()["message"]
        .as_str()
        .unwrap()
        .contains("line 2"));
}

#[tokio::test]
async fn arrival_flow() {
    let app = spawn_app().await;
    app.seed_traveler(7).await;
    let gate = app.login("gate", "gatepw").await;

    app.server
        .post("/api/travelers/7/arrived")
        .authorization_bearer(&gate)
        .await
        .assert_status_ok();

    let arrived = app
        .server
        .get("/api/travelers/arrived")
        .authorization_bearer(&gate)
        .await
        .json::<Value>();
    assert_eq!(arrived["count"], 1);
    assert_eq!(arrived["travelers"][0]["its"], 7);
    assert_eq!(arrived["travelers"][0]["arrived"], true);
}

#[tokio::test]
async fn sim_assignment_conflicts_on_reuse() {
    let app = spawn_app().await;
    app.seed_traveler(1).await;
    app.seed_traveler(2).await;
    let alice = app.login("alice", "alicepw").await;

    app.server
        .post("/api/travelers/1/sim")
        .authorization_bearer(&alice)
        .json(&json!({"phone": "+966500000001"}))
        .await
        .assert_status_ok();
    app.server
        .post("/api/travelers/2/sim")
        .authorization_bearer(&alice)
        .json(&json!({"phone": "+966500000001"}))
        .await
        .assert_status_conflict();
}

#[tokio::test]
async fn error_statuses_match_the_taxonomy() {
    let app = spawn_app().await;
    let alice = app.login("alice", "alicepw").await;

    // Unknown traveler.
    app.server
        .get("/api/travelers/999")
        .authorization_bearer(&alice)
        .await
        .assert_status_not_found();

    // Unparsable date.
    app.seed_traveler(1).await;
    let mut bad = process_body(1, "P1");
    bad["passport_expiry"] = json!("soon");
    app.server
        .post("/api/process")
        .authorization_bearer(&alice)
        .json(&bad)
        .await
        .assert_status_bad_request();

    // Non-positive ITS.
    app.server
        .get("/api/travelers/-1")
        .authorization_bearer(&alice)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn admin_bulk_clear_removes_travelers() {
    let app = spawn_app().await;
    for its in 1..=5 {
        app.seed_traveler(its).await;
    }
    let root = app.login("root", "rootpw").await;

    let response = app
        .server
        .delete("/api/travelers")
        .authorization_bearer(&root)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["removed"], 5);

    let listing = app
        .server
        .get("/api/travelers")
        .authorization_bearer(&root)
        .await
        .json::<Value>();
    assert_eq!(listing["total"], 0);
}
