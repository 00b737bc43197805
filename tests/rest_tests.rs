//! End-to-end tests through the HTTP adapter
//!
//! A small middleware stands in for the authentication layer: it turns the
//! `x-test-user` header (`staff:<uuid>` or `user:<uuid>`) into an
//! `AuthContext` request extension.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum_test::TestServer;
use foundation::accounts::{User, user_viewset};
use foundation::prelude::*;
use serde_json::{Value, json};

// =============================================================================
// Test Setup
// =============================================================================

impl_base_model!(Coupon, "coupon", "coupons", {
    code: String,
    percent: i64,
}, unique = ["code"]);

/// Leaves uniqueness of `code` to the store
struct CouponSerializer;

impl Serializer for CouponSerializer {
    fn fields(&self, _ctx: &SerializerContext) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldKind::Uuid).read_only(),
            FieldDescriptor::new("code", FieldKind::Text).required(),
            FieldDescriptor::new("percent", FieldKind::Integer).required(),
        ]
    }
}

impl ModelSerializer<Coupon> for CouponSerializer {}

const AUTH_HEADER: &str = "x-test-user";

async fn header_auth(mut request: Request, next: Next) -> Response {
    let auth = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(':'))
        .and_then(|(kind, id)| {
            let id = Uuid::parse_str(id).ok()?;
            match kind {
                "staff" => Some(AuthContext::staff(id)),
                "user" => Some(AuthContext::user(id)),
                _ => None,
            }
        })
        .unwrap_or_default();
    request.extensions_mut().insert(auth);
    next.run(request).await
}

struct Fixture {
    server: TestServer,
    users: Arc<InMemoryStore<User>>,
}

fn fixture() -> Fixture {
    let settings = Arc::new(Settings::default());
    let users = Arc::new(InMemoryStore::<User>::new());
    let coupons = ViewSet::builder()
        .capabilities(presets::CREATE_LIST_RETRIEVE_UPDATE)
        .store(Arc::new(InMemoryStore::<Coupon>::new()))
        .serializer(CouponSerializer)
        .settings(settings.clone())
        .build()
        .expect("coupon viewset");

    let app = ServerBuilder::new()
        .with_settings(settings.clone())
        .register(user_viewset(users.clone(), settings).expect("user viewset"))
        .register(coupons)
        .build()
        .expect("router")
        .layer(middleware::from_fn(header_auth));

    Fixture {
        server: TestServer::try_new(app).expect("Failed to create test server"),
        users,
    }
}

fn as_staff() -> (HeaderName, HeaderValue) {
    identity("staff", Uuid::new_v4())
}

fn as_user(id: Uuid) -> (HeaderName, HeaderValue) {
    identity("user", id)
}

fn identity(kind: &str, id: Uuid) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(AUTH_HEADER),
        HeaderValue::from_str(&format!("{}:{}", kind, id)).expect("header value"),
    )
}

fn signup(email: &str) -> Value {
    json!({
        "full_name": "Ada Lovelace",
        "email": email,
        "password1": "engine1",
        "password2": "engine1",
    })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let fixture = fixture();
    for path in ["/health", "/healthz"] {
        let response = fixture.server.get(path).await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "api-foundation");
    }
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_anonymous_signup_is_created() {
    let fixture = fixture();
    let response = fixture
        .server
        .post("/api/v1/users")
        .json(&signup("ada@example.com"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["is_staff"], false);
    assert!(body.get("password1").is_none());
    assert!(body.get("password").is_none());

    let stored = fixture.users.list(Scope::All).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].check_password("engine1"));
}

#[tokio::test]
async fn test_validation_errors_are_400_with_field_details() {
    let fixture = fixture();
    let response = fixture
        .server
        .post("/api/v1/users")
        .json(&json!({"email": "not-an-email", "password1": "abc", "password2": "abc"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields = &body["details"]["fields"];
    assert_eq!(fields["email"][0], "Enter a valid email address.");
    assert_eq!(fields["full_name"][0], "This field is required.");
    assert!(fields["password1"].is_array());
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let fixture = fixture();
    let response = fixture
        .server
        .post("/api/v1/users")
        .text("{\"email\":")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("JSON parse error")
    );
}

#[tokio::test]
async fn test_list_requires_authentication() {
    let fixture = fixture();
    let response = fixture.server.get("/api/v1/users").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "NOT_AUTHENTICATED");

    let (name, value) = as_user(Uuid::new_v4());
    let response = fixture
        .server
        .get("/api/v1/users")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_unclaimed_verb_is_405() {
    let fixture = fixture();
    let (name, value) = as_staff();
    // users expose no retrieve capability
    let response = fixture
        .server
        .get(&format!("/api/v1/users/{}", Uuid::new_v4()))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_password_change_is_admin_only() {
    let fixture = fixture();
    let created = fixture
        .server
        .post("/api/v1/users")
        .json(&signup("ada@example.com"))
        .await
        .json::<Value>();
    let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();
    let path = format!("/api/v1/users/{}/password_change", id);
    let body = json!({"password1": "babbage", "password2": "babbage"});

    // even for their own account, regular users are refused
    let (name, value) = as_user(id);
    let response = fixture
        .server
        .put(&path)
        .add_header(name, value)
        .json(&body)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let (name, value) = as_staff();
    let response = fixture
        .server
        .put(&path)
        .add_header(name, value)
        .json(&body)
        .await;
    response.assert_status_ok();

    let user = fixture.users.get(&id).await.unwrap().unwrap();
    assert!(user.check_password("babbage"));
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_404() {
    let fixture = fixture();
    for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
        let (name, value) = as_staff();
        let response = fixture
            .server
            .patch(&format!("/api/v1/users/{}", id))
            .add_header(name, value)
            .json(&json!({"gender": "other"}))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_delete_deactivates_user() {
    let fixture = fixture();
    let created = fixture
        .server
        .post("/api/v1/users")
        .json(&signup("ada@example.com"))
        .await
        .json::<Value>();
    let id = created["id"].as_str().unwrap().to_string();

    let (name, value) = as_staff();
    let response = fixture
        .server
        .delete(&format!("/api/v1/users/{}", id))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let (name, value) = as_staff();
    let listed = fixture
        .server
        .get("/api/v1/users")
        .add_header(name, value)
        .await
        .json::<Value>();
    assert_eq!(listed["pagination"]["total"], 0);
    assert_eq!(fixture.users.len(), 1);
}

// =============================================================================
// Store-level conflicts
// =============================================================================

#[tokio::test]
async fn test_store_unique_violation_is_409() {
    let fixture = fixture();
    let coupon = json!({"code": "SPRING", "percent": 10});

    let (name, value) = as_staff();
    fixture
        .server
        .post("/api/v1/coupons")
        .add_header(name, value)
        .json(&coupon)
        .await
        .assert_status(StatusCode::CREATED);

    let (name, value) = as_staff();
    let response = fixture
        .server
        .post("/api/v1/coupons")
        .add_header(name, value)
        .json(&coupon)
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "UNIQUE_VIOLATION");
    assert_eq!(body["details"]["field"], "code");
}

#[tokio::test]
async fn test_query_string_reaches_list() {
    let fixture = fixture();
    for (code, percent) in [("A", 5), ("B", 15), ("C", 25)] {
        let (name, value) = as_staff();
        fixture
            .server
            .post("/api/v1/coupons")
            .add_header(name, value)
            .json(&json!({"code": code, "percent": percent}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let (name, value) = as_staff();
    let page = fixture
        .server
        .get("/api/v1/coupons")
        .add_query_param("ordering", "-percent")
        .add_query_param("limit", "2")
        .add_query_param("fields", "code,percent")
        .add_header(name, value)
        .await
        .json::<Value>();
    assert_eq!(
        page["data"],
        json!([{"code": "C", "percent": 25}, {"code": "B", "percent": 15}])
    );
    assert_eq!(page["pagination"]["has_next"], true);
}

#[tokio::test]
async fn test_repeated_fields_parameters_are_combined() {
    let fixture = fixture();
    let (name, value) = as_staff();
    let created = fixture
        .server
        .post("/api/v1/coupons")
        .add_header(name, value)
        .json(&json!({"code": "SPRING", "percent": 10}))
        .await
        .json::<Value>();

    let (name, value) = as_staff();
    let page = fixture
        .server
        .get("/api/v1/coupons")
        .add_raw_query_param("fields=id&fields=code")
        .add_header(name, value)
        .await
        .json::<Value>();
    assert_eq!(
        page["data"],
        json!([{"id": created["id"], "code": "SPRING"}])
    );
}
