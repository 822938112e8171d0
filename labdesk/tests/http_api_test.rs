//! HTTP API tests: the full router over in-memory providers.
//!
//! Run with: `cargo test -p labdesk --test http_api_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use labdesk::broadcast::ChannelBroadcaster;
use labdesk::config::RequestConfig;
use labdesk::server::{build_router, AppState, Providers};
use labdesk_testing::{epoch, ManualClock};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// Harness
// ============================================================================

struct Api {
    router: Router,
    clock: Arc<ManualClock>,
}

struct Caller {
    id: Uuid,
    roles: &'static str,
}

impl Caller {
    fn admin() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: "admin",
        }
    }

    fn staff() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: "staff",
        }
    }

    fn member(id: Uuid) -> Self {
        Self {
            id,
            roles: "member",
        }
    }
}

impl Api {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(epoch()));
        let state = AppState::new(
            Providers::in_memory(),
            ChannelBroadcaster::new(),
            clock.clone(),
            &RequestConfig {
                ttl_days: 7,
                sweep_interval_secs: 0,
            },
        );
        Self {
            router: build_router(state),
            clock,
        }
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        caller: Option<&Caller>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            builder = builder
                .header("X-User-Id", caller.id.to_string())
                .header("X-User-Roles", caller.roles);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn add_equipment(&self, stock: u32, in_repair: u32) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/equipments",
                Some(&Caller::staff()),
                Some(json!({
                    "name": "Spectrophotometer",
                    "stock": stock,
                    "in_repair": in_repair,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    /// Issue a token as admin and redeem it; returns the new user's id.
    async fn register_member(&self, email: &str) -> Uuid {
        let (_, token) = self
            .call(
                "POST",
                "/api/register-tokens",
                Some(&Caller::admin()),
                Some(json!({ "role": "member" })),
            )
            .await;
        let (status, user) = self
            .call(
                "POST",
                "/api/register",
                None,
                Some(json!({
                    "token": token["id"],
                    "email": email,
                    "name": "Grace",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        Uuid::parse_str(user["id"].as_str().unwrap()).unwrap()
    }
}

fn equipment_request(id: &str, amount: u32) -> Value {
    json!({
        "usage_date": "2025-01-04T09:00:00Z",
        "equipments": [{ "id": id, "amount": amount }],
    })
}

// ============================================================================
// Health and identity
// ============================================================================

#[tokio::test]
async fn test_health_needs_no_identity() {
    let api = Api::new();

    let (status, _) = api.call("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let api = Api::new();

    let (status, body) = api.call("GET", "/api/requests", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

// ============================================================================
// Stock
// ============================================================================

#[tokio::test]
async fn test_members_cannot_edit_stock() {
    let api = Api::new();

    let (status, _) = api
        .call(
            "POST",
            "/api/materials",
            Some(&Caller::member(Uuid::new_v4())),
            Some(json!({ "name": "Flask", "stock": 4 })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stock_crud_and_soft_delete() {
    let api = Api::new();
    let staff = Caller::staff();
    let id = api.add_equipment(3, 0).await;

    let (status, listed) = api
        .call("GET", "/api/equipments?available=true", Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, updated) = api
        .call(
            "PUT",
            &format!("/api/equipments/{id}"),
            Some(&staff),
            Some(json!({ "name": "Spectrophotometer UV", "stock": 5, "in_repair": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["stock"], 5);

    let (status, _) = api
        .call("DELETE", &format!("/api/equipments/{id}"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = api
        .call("DELETE", &format!("/api/equipments/{id}"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = api
        .call("GET", "/api/equipments?available=true", Some(&staff), None)
        .await;
    assert!(listed.as_array().unwrap().is_empty());
}

// ============================================================================
// Requests
// ============================================================================

#[tokio::test]
async fn test_unavailable_equipment_is_a_bad_request() {
    let api = Api::new();
    let e1 = api.add_equipment(10, 2).await;
    let member = Caller::member(Uuid::new_v4());

    let (status, body) = api
        .call("POST", "/api/requests", Some(&member), Some(equipment_request(&e1, 9)))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Equipment unavailable");
}

#[tokio::test]
async fn test_empty_request_is_a_bad_request() {
    let api = Api::new();
    let member = Caller::member(Uuid::new_v4());

    let (status, body) = api
        .call(
            "POST",
            "/api/requests",
            Some(&member),
            Some(json!({ "usage_date": "2025-01-04T09:00:00Z" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_ne!(body["message"], "Equipment unavailable");
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let api = Api::new();

    let (status, body) = api
        .call(
            "GET",
            &format!("/api/requests/{}", Uuid::new_v4()),
            Some(&Caller::staff()),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_request_lifecycle_over_http() {
    let api = Api::new();
    let e1 = api.add_equipment(10, 2).await;
    let member = Caller::member(Uuid::new_v4());
    let staff = Caller::staff();

    let (status, created) = api
        .call("POST", "/api/requests", Some(&member), Some(equipment_request(&e1, 5)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = api
        .call("POST", &format!("/api/requests/{id}/approve"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, approved) = api
        .call("POST", &format!("/api/requests/{id}/approve"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "APPROVED");

    let (status, body) = api
        .call("POST", &format!("/api/requests/{id}/approve"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, completed) = api
        .call("POST", &format!("/api/requests/{id}/complete"), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "COMPLETED");
}

#[tokio::test]
async fn test_members_only_see_their_own_requests() {
    let api = Api::new();
    let e1 = api.add_equipment(10, 0).await;
    let alice = Caller::member(Uuid::new_v4());
    let bob = Caller::member(Uuid::new_v4());

    let (_, created) = api
        .call("POST", "/api/requests", Some(&alice), Some(equipment_request(&e1, 1)))
        .await;
    let id = created["id"].as_str().unwrap();

    let (_, mine) = api.call("GET", "/api/requests", Some(&bob), None).await;
    assert!(mine.as_array().unwrap().is_empty());

    let (status, _) = api
        .call("GET", &format!("/api/requests/{id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, all) = api
        .call("GET", "/api/requests", Some(&Caller::staff()), None)
        .await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stale_request_reads_as_rejected() {
    let api = Api::new();
    let e1 = api.add_equipment(10, 0).await;
    let member = Caller::member(Uuid::new_v4());
    let (_, created) = api
        .call("POST", "/api/requests", Some(&member), Some(equipment_request(&e1, 1)))
        .await;
    let id = created["id"].as_str().unwrap();

    api.clock.advance(chrono::Duration::days(8));
    let (status, request) = api
        .call("GET", &format!("/api/requests/{id}"), Some(&member), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["status"], "REJECTED");

    let (_, rejected) = api
        .call(
            "GET",
            "/api/requests?status=REJECTED",
            Some(&Caller::staff()),
            None,
        )
        .await;
    assert_eq!(rejected.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleted_request_is_gone() {
    let api = Api::new();
    let e1 = api.add_equipment(10, 0).await;
    let member = Caller::member(Uuid::new_v4());
    let (_, created) = api
        .call("POST", "/api/requests", Some(&member), Some(equipment_request(&e1, 1)))
        .await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = api
        .call("DELETE", &format!("/api/requests/{id}"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = api
        .call("DELETE", &format!("/api/requests/{id}"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = api
        .call("GET", &format!("/api/requests/{id}"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_availability_dry_run() {
    let api = Api::new();
    let e1 = api.add_equipment(2, 0).await;
    let member = Caller::member(Uuid::new_v4());

    let (status, ok) = api
        .call(
            "POST",
            "/api/availability",
            Some(&member),
            Some(json!({ "equipments": [{ "id": e1, "amount": 2 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ok["available"], true);

    let (_, short) = api
        .call(
            "POST",
            "/api/availability",
            Some(&member),
            Some(json!({ "equipments": [{ "id": e1, "amount": 3 }] })),
        )
        .await;
    assert_eq!(short["available"], false);
    assert_eq!(short["reason"], "Equipment unavailable");
}

// ============================================================================
// Registration and conversations
// ============================================================================

#[tokio::test]
async fn test_token_is_single_use() {
    let api = Api::new();
    let admin = Caller::admin();
    let (status, token) = api
        .call(
            "POST",
            "/api/register-tokens",
            Some(&admin),
            Some(json!({ "role": "staff", "email": "Ada@Lab.example" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let body = json!({ "token": token["id"], "email": "ada@lab.example", "name": "Ada" });
    let (first, user) = api.call("POST", "/api/register", None, Some(body.clone())).await;
    let (second, _) = api.call("POST", "/api/register", None, Some(body)).await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(user["role"], "staff");
    assert_eq!(second, StatusCode::BAD_REQUEST);

    let (_, stored) = api
        .call(
            "GET",
            &format!("/api/register-tokens/{}", token["id"].as_str().unwrap()),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(stored["user_created"], user["id"]);
}

#[tokio::test]
async fn test_only_admins_issue_tokens() {
    let api = Api::new();

    let (status, _) = api
        .call(
            "POST",
            "/api/register-tokens",
            Some(&Caller::staff()),
            Some(json!({ "role": "admin" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_requester_can_talk_in_the_request_thread() {
    let api = Api::new();
    let e1 = api.add_equipment(10, 0).await;
    let member = Caller::member(api.register_member("grace@lab.example").await);

    let (_, created) = api
        .call("POST", "/api/requests", Some(&member), Some(equipment_request(&e1, 1)))
        .await;
    let id = created["id"].as_str().unwrap();
    let (_, request) = api
        .call("GET", &format!("/api/requests/{id}"), Some(&member), None)
        .await;
    let conversation = request["conversation"].as_str().unwrap();

    let (status, message) = api
        .call(
            "POST",
            &format!("/api/conversations/{conversation}/messages"),
            Some(&member),
            Some(json!({ "text": "Can I come at 10 instead?" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["owner"], member.id.to_string());

    let (status, thread) = api
        .call(
            "GET",
            &format!("/api/conversations/{conversation}"),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["messages"].as_array().unwrap().len(), 1);

    let (status, _) = api
        .call(
            "GET",
            &format!("/api/conversations/{conversation}"),
            Some(&Caller::member(Uuid::new_v4())),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
