//! Reference user viewset behavior

use axum::http::{Method, StatusCode};
use foundation::accounts::{User, user_viewset};
use foundation::core::NON_FIELD_ERRORS;
use foundation::prelude::*;
use serde_json::{Value, json};

struct Accounts {
    viewset: ViewSet<User>,
    store: Arc<InMemoryStore<User>>,
}

fn accounts() -> Accounts {
    let store = Arc::new(InMemoryStore::<User>::new());
    let viewset =
        user_viewset(store.clone(), Arc::new(Settings::default())).expect("user viewset");
    Accounts { viewset, store }
}

fn staff() -> AuthContext {
    AuthContext::staff(Uuid::new_v4())
}

async fn sign_up(accounts: &Accounts, body: Value) -> Result<ViewResponse, FoundationError> {
    accounts.viewset.dispatch(ViewRequest::post(body)).await
}

fn signup(email: &str, phone: Option<&str>) -> Value {
    json!({
        "full_name": "  Grace Hopper ",
        "email": email,
        "phone_number": phone,
        "password1": "cobol59",
        "password2": "cobol59",
        "referral_code": "FRIEND",
    })
}

fn validation(err: FoundationError) -> ValidationError {
    match err {
        FoundationError::Validation(errors) => errors,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_signup_trims_and_hashes() {
    let accounts = accounts();
    let created = sign_up(&accounts, signup("grace@navy.mil", Some("+977-9841234567")))
        .await
        .unwrap();
    assert_eq!(created.status, StatusCode::CREATED);

    let body = created.object();
    assert_eq!(body["full_name"], json!("Grace Hopper"));
    assert_eq!(body["phone_number"], json!("+977-9841234567"));
    assert!(!body.contains_key("referral_code"));

    let user = accounts.store.list(Scope::All).await.unwrap().remove(0);
    assert_ne!(user.password, "cobol59");
    assert!(user.check_password("cobol59"));
}

#[tokio::test]
async fn test_duplicate_email_ignores_case() {
    let accounts = accounts();
    sign_up(&accounts, signup("grace@navy.mil", None)).await.unwrap();

    let errors = validation(
        sign_up(&accounts, signup("Grace@Navy.MIL", None))
            .await
            .unwrap_err(),
    );
    assert_eq!(
        errors.messages("email"),
        Some(&["You cannot create account with this email address.".to_string()][..])
    );
    assert_eq!(accounts.store.len(), 1);
}

#[tokio::test]
async fn test_duplicate_phone_number_message() {
    let accounts = accounts();
    sign_up(&accounts, signup("grace@navy.mil", Some("9841234567")))
        .await
        .unwrap();

    let errors = validation(
        sign_up(&accounts, signup("ada@example.com", Some("9841234567")))
            .await
            .unwrap_err(),
    );
    assert_eq!(
        errors.messages("phone_number"),
        Some(&["You cannot create user with this phone number.".to_string()][..])
    );
}

#[tokio::test]
async fn test_users_without_phone_do_not_collide() {
    let accounts = accounts();
    sign_up(&accounts, signup("grace@navy.mil", None)).await.unwrap();
    sign_up(&accounts, signup("ada@example.com", None)).await.unwrap();
    assert_eq!(accounts.store.len(), 2);
}

#[tokio::test]
async fn test_invalid_phone_number() {
    let accounts = accounts();
    let errors = validation(
        sign_up(&accounts, signup("grace@navy.mil", Some("12-34")))
            .await
            .unwrap_err(),
    );
    assert!(errors.has_field("phone_number"));
}

#[tokio::test]
async fn test_password_mismatch_is_non_field_error() {
    let accounts = accounts();
    let mut body = signup("grace@navy.mil", None);
    body["password2"] = json!("cobol60");
    let errors = validation(sign_up(&accounts, body).await.unwrap_err());
    assert_eq!(
        errors.messages(NON_FIELD_ERRORS),
        Some(&["Both Password must be same".to_string()][..])
    );
    assert!(accounts.store.is_empty());
}

#[tokio::test]
async fn test_update_keeps_own_email_and_ignores_is_staff() {
    let accounts = accounts();
    let created = sign_up(&accounts, signup("grace@navy.mil", None))
        .await
        .unwrap();
    let id = created.object()["id"].as_str().unwrap().to_string();

    let updated = accounts
        .viewset
        .dispatch(
            ViewRequest::put(
                &id,
                json!({"full_name": "Rear Admiral Hopper", "email": "GRACE@navy.mil", "is_staff": true}),
            )
            .with_auth(AuthContext::user(Uuid::new_v4())),
        )
        .await
        .unwrap();
    let body = updated.object();
    assert_eq!(body["full_name"], json!("Rear Admiral Hopper"));
    assert_eq!(body["email"], json!("GRACE@navy.mil"));
    assert_eq!(body["is_staff"], json!(false));
}

#[tokio::test]
async fn test_password_change_by_admin() {
    let accounts = accounts();
    let created = sign_up(&accounts, signup("grace@navy.mil", None))
        .await
        .unwrap();
    let id = created.object()["id"].as_str().unwrap().to_string();

    let response = accounts
        .viewset
        .dispatch(
            ViewRequest::new(Method::PUT)
                .with_id(&id)
                .with_action("password_change")
                .with_body(json!({"password1": "flowmatic", "password2": "flowmatic"}))
                .with_auth(staff()),
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, Some(json!({})));

    let user = accounts
        .store
        .get(&Uuid::parse_str(&id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(user.check_password("flowmatic"));
    assert!(!user.check_password("cobol59"));
}

#[tokio::test]
async fn test_password_change_validates_before_saving() {
    let accounts = accounts();
    let created = sign_up(&accounts, signup("grace@navy.mil", None))
        .await
        .unwrap();
    let id = created.object()["id"].as_str().unwrap().to_string();

    let err = accounts
        .viewset
        .dispatch(
            ViewRequest::new(Method::PUT)
                .with_id(&id)
                .with_action("password_change")
                .with_body(json!({"password1": "flowmatic", "password2": "flowmatix"}))
                .with_auth(staff()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let user = accounts.store.list(Scope::All).await.unwrap().remove(0);
    assert!(user.check_password("cobol59"));
}

#[tokio::test]
async fn test_deactivated_user_is_hidden_and_keeps_email_reserved() {
    let accounts = accounts();
    let created = sign_up(&accounts, signup("grace@navy.mil", None))
        .await
        .unwrap();
    let id = created.object()["id"].as_str().unwrap().to_string();

    accounts
        .viewset
        .dispatch(ViewRequest::delete(&id).with_auth(staff()))
        .await
        .unwrap();

    let listed = accounts
        .viewset
        .dispatch(ViewRequest::get().with_auth(staff()))
        .await
        .unwrap();
    assert_eq!(listed.object()["pagination"]["total"], json!(0));

    let errors = validation(
        sign_up(&accounts, signup("grace@navy.mil", None))
            .await
            .unwrap_err(),
    );
    assert!(errors.has_field("email"));
}

#[tokio::test]
async fn test_search_and_staff_filter() {
    let accounts = accounts();
    sign_up(&accounts, signup("grace@navy.mil", None)).await.unwrap();
    let mut ada = signup("ada@example.com", Some("9800000000"));
    ada["full_name"] = json!("Ada Lovelace");
    sign_up(&accounts, ada).await.unwrap();

    let found = accounts
        .viewset
        .dispatch(
            ViewRequest::get()
                .with_query("search", "LOVELACE")
                .with_auth(staff()),
        )
        .await
        .unwrap();
    let data = found.object()["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["email"], json!("ada@example.com"));

    let staff_only = accounts
        .viewset
        .dispatch(
            ViewRequest::get()
                .with_query("is_staff", "true")
                .with_auth(staff()),
        )
        .await
        .unwrap();
    assert_eq!(staff_only.object()["pagination"]["total"], json!(0));
}

#[tokio::test]
async fn test_store_rejects_email_differing_only_in_case() {
    let accounts = accounts();
    accounts.store.save(User::new("Ada@x.com")).await.unwrap();

    let err = accounts
        .store
        .save(User::new("ada@X.com"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation_on("email"));
    assert_eq!(accounts.store.len(), 1);
}
