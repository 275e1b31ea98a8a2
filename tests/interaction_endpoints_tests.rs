//! Remote surface of `interactions` for each kind of caller

mod harness;

use axum::http::StatusCode;
use harness::*;
use serde_json::{Value, json};

const PLURAL: &str = "interactions";

fn valid_interaction() -> Value {
    json!({
        "description": "This is an example",
        "startDate": 1_500_000_000_000_i64,
        "type": "communication",
        "notes": "These are notes",
    })
}

async fn with_instance() -> (TestApp, String) {
    let app = TestApp::start().await;
    let id = app.create_owned(PLURAL, valid_interaction()).await;
    (app, id)
}

// =============================================================================
// Enabled static methods
// =============================================================================

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_is_inaccessible_by_anonymous() {
        let app = TestApp::start().await;
        should_be::inaccessible_by(&app, &Endpoint::post("/interactions"), &app.anonymous).await;
    }

    #[tokio::test]
    async fn test_create_is_accessible_by_authenticated() {
        let app = TestApp::start().await;
        let response = should_be::accessible_by(
            &app,
            &Endpoint::post("/interactions"),
            &app.authenticated,
            Some(&valid_interaction()),
        )
        .await;

        have_status_code(&response, StatusCode::OK);
        let created: Value = response.json();
        assert_eq!(created["type"], "communication");
        assert_eq!(created["userId"], app.authenticated.user_id());
    }

    #[tokio::test]
    async fn test_create_stamps_the_caller_as_owner() {
        let app = TestApp::start().await;
        let mut data = valid_interaction();
        data["userId"] = json!(app.owner.user_id());

        let response = app
            .call(&Endpoint::post("/interactions"), &app.authenticated, Some(&data))
            .await;

        have_status_code(&response, StatusCode::OK);
        assert_eq!(response.json::<Value>()["userId"], app.authenticated.user_id());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_type() {
        let app = TestApp::start().await;
        let mut data = valid_interaction();
        data["type"] = json!("lunch");

        let response = app
            .call(&Endpoint::post("/interactions"), &app.authenticated, Some(&data))
            .await;

        have_status_code(&response, StatusCode::UNPROCESSABLE_ENTITY);
        match_content_type(&response, JSON);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["details"]["messages"]["type"].is_array());
    }
}

// =============================================================================
// Disabled static methods
// =============================================================================

mod disabled_tests {
    use super::*;

    #[tokio::test]
    async fn test_collection_methods_are_disabled() {
        let app = TestApp::start().await;

        for endpoint in [
            Endpoint::patch("/interactions"),
            Endpoint::put("/interactions"),
            Endpoint::get("/interactions"),
            Endpoint::post("/interactions/replace"),
            Endpoint::post("/interactions/upsertWithWhere"),
            Endpoint::post("/interactions/update"),
            Endpoint::post("/interactions/change-stream"),
        ] {
            should_be::disabled_for_everyone(&app, &endpoint).await;
        }
    }

    #[tokio::test]
    async fn test_count_is_disabled_regardless_of_caller() {
        let app = TestApp::start().await;
        should_be::disabled_for_everyone(&app, &Endpoint::get("/interactions/count")).await;
    }

    #[tokio::test]
    async fn test_find_one_and_change_stream_are_disabled() {
        let app = TestApp::start().await;
        should_be::disabled_for_everyone(&app, &Endpoint::get("/interactions/findOne")).await;
        should_be::disabled_for_everyone(&app, &Endpoint::get("/interactions/change-stream")).await;
    }

    #[tokio::test]
    async fn test_disabled_answer_is_a_json_error() {
        let app = TestApp::start().await;
        let response = app
            .call(&Endpoint::get("/interactions"), &app.owner, None)
            .await;

        have_status_code(&response, StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"]["statusCode"], 404);
    }
}

// =============================================================================
// Instance methods
// =============================================================================

mod instance_tests {
    use super::*;

    #[tokio::test]
    async fn test_find_by_id() {
        let (app, id) = with_instance().await;
        let endpoint = Endpoint::get("/interactions/:id").with_id(&id);

        should_be::inaccessible_by(&app, &endpoint, &app.anonymous).await;
        should_be::inaccessible_by(&app, &endpoint, &app.authenticated).await;

        let response = should_be::accessible_by(&app, &endpoint, &app.owner, None).await;
        let found: Value = response.json();
        assert_eq!(found["id"], id.as_str());
        assert_eq!(found["notes"], "These are notes");
    }

    #[tokio::test]
    async fn test_patch_attributes() {
        let (app, id) = with_instance().await;
        let endpoint = Endpoint::patch("/interactions/:id").with_id(&id);

        should_be::inaccessible_by(&app, &endpoint, &app.anonymous).await;
        should_be::inaccessible_by(&app, &endpoint, &app.authenticated).await;

        let response = should_be::accessible_by(
            &app,
            &endpoint,
            &app.owner,
            Some(&json!({ "notes": "Follow up next week" })),
        )
        .await;
        let patched: Value = response.json();
        assert_eq!(patched["notes"], "Follow up next week");
        assert_eq!(patched["type"], "communication");
    }

    #[tokio::test]
    async fn test_patch_cannot_change_owner() {
        let (app, id) = with_instance().await;
        let endpoint = Endpoint::patch("/interactions/:id").with_id(&id);

        let response = app
            .call(
                &endpoint,
                &app.owner,
                Some(&json!({ "userId": app.authenticated.user_id() })),
            )
            .await;

        have_status_code(&response, StatusCode::OK);
        assert_eq!(response.json::<Value>()["userId"], app.owner.user_id());
    }

    #[tokio::test]
    async fn test_replace_by_id_on_both_bindings() {
        let (app, id) = with_instance().await;
        let mut replacement = valid_interaction();
        replacement["type"] = json!("interview");

        for endpoint in [
            Endpoint::put("/interactions/:id").with_id(&id),
            Endpoint::post("/interactions/:id/replace").with_id(&id),
        ] {
            should_be::inaccessible_by(&app, &endpoint, &app.anonymous).await;
            should_be::inaccessible_by(&app, &endpoint, &app.authenticated).await;

            let response =
                should_be::accessible_by(&app, &endpoint, &app.owner, Some(&replacement)).await;
            let replaced: Value = response.json();
            assert_eq!(replaced["type"], "interview");
            assert_eq!(replaced["userId"], app.owner.user_id());
        }
    }

    #[tokio::test]
    async fn test_exists() {
        let (app, id) = with_instance().await;
        let endpoint = Endpoint::get("/interactions/:id/exists").with_id(&id);

        should_be::inaccessible_by(&app, &endpoint, &app.anonymous).await;
        should_be::inaccessible_by(&app, &endpoint, &app.authenticated).await;

        let response = should_be::accessible_by(&app, &endpoint, &app.owner, None).await;
        assert_eq!(response.json::<Value>(), json!({ "exists": true }));
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let (app, id) = with_instance().await;
        let endpoint = Endpoint::delete("/interactions/:id").with_id(&id);

        should_be::inaccessible_by(&app, &endpoint, &app.anonymous).await;
        should_be::inaccessible_by(&app, &endpoint, &app.authenticated).await;

        let response = should_be::accessible_by(&app, &endpoint, &app.owner, None).await;
        have_status_code(&response, StatusCode::OK);
        assert_eq!(response.json::<Value>(), json!({ "count": 1 }));

        // a deleted instance has no owner
        should_be::inaccessible_by(
            &app,
            &Endpoint::get("/interactions/:id").with_id(&id),
            &app.owner,
        )
        .await;
    }

    #[tokio::test]
    async fn test_access_token_query_parameter() {
        let (app, id) = with_instance().await;
        let path = format!("{}/interactions/{}", API_ROOT, id);
        let token = app.owner.token.clone().unwrap_or_default();

        let response = app
            .server
            .get(&path)
            .add_query_param("access_token", token)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["id"], id.as_str());
    }
}

// =============================================================================
// Relations
// =============================================================================

mod relation_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_job_without_a_job_is_null() {
        let (app, id) = with_instance().await;
        let endpoint = Endpoint::get("/interactions/:id/job").with_id(&id);

        should_be::inaccessible_by(&app, &endpoint, &app.anonymous).await;
        should_be::inaccessible_by(&app, &endpoint, &app.authenticated).await;

        let response = should_be::accessible_by(&app, &endpoint, &app.owner, None).await;
        assert_eq!(response.json::<Value>(), Value::Null);
    }

    #[tokio::test]
    async fn test_get_job_returns_the_parent() {
        let app = TestApp::start().await;
        let job_id = app
            .create_owned("jobs", json!({ "title": "Backend engineer", "status": "open" }))
            .await;
        let mut data = valid_interaction();
        data["jobId"] = json!(job_id);
        let id = app.create_owned(PLURAL, data).await;

        let response = app
            .call(&Endpoint::get("/interactions/:id/job").with_id(&id), &app.owner, None)
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["title"], "Backend engineer");
    }

    #[tokio::test]
    async fn test_get_user_hides_the_password() {
        let (app, id) = with_instance().await;
        let endpoint = Endpoint::get("/interactions/:id/user").with_id(&id);

        should_be::inaccessible_by(&app, &endpoint, &app.authenticated).await;

        let response = should_be::accessible_by(&app, &endpoint, &app.owner, None).await;
        let user: Value = response.json();
        assert_eq!(user["username"], "testuser2");
        assert!(user.get("password").is_none());
    }

    #[tokio::test]
    async fn test_relation_writes_are_not_routed() {
        let (app, id) = with_instance().await;

        for endpoint in [
            Endpoint::post("/interactions/:id/job").with_id(&id),
            Endpoint::put("/interactions/:id/user").with_id(&id),
            Endpoint::delete("/interactions/:id/job").with_id(&id),
        ] {
            should_be::disabled_for_everyone(&app, &endpoint).await;
        }
    }
}
