//! Jobs and the relation routes that link them to searches, offers and interactions

mod harness;

use axum::http::StatusCode;
use harness::*;
use serde_json::{Value, json};

async fn with_job() -> (TestApp, String) {
    let app = TestApp::start().await;
    let id = app
        .create_owned("jobs", json!({ "title": "Platform engineer", "status": "open" }))
        .await;
    (app, id)
}

// =============================================================================
// Base methods
// =============================================================================

mod base_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_read_back() {
        let (app, id) = with_job().await;
        let endpoint = Endpoint::get("/jobs/:id").with_id(&id);

        should_be::inaccessible_by(&app, &endpoint, &app.authenticated).await;
        let response = should_be::accessible_by(&app, &endpoint, &app.owner, None).await;

        let job: Value = response.json();
        assert_eq!(job["title"], "Platform engineer");
        assert_eq!(job["userId"], app.owner.user_id());
    }

    #[tokio::test]
    async fn test_status_must_be_known() {
        let app = TestApp::start().await;
        let response = app
            .call(
                &Endpoint::post("/jobs"),
                &app.owner,
                Some(&json!({ "title": "Tester", "status": "pending" })),
            )
            .await;

        have_status_code(&response, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_patch_validates_only_sent_fields() {
        let (app, id) = with_job().await;
        let endpoint = Endpoint::patch("/jobs/:id").with_id(&id);

        let response = app
            .call(&endpoint, &app.owner, Some(&json!({ "status": "closed" })))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "closed");

        let response = app
            .call(&endpoint, &app.owner, Some(&json!({ "status": "maybe" })))
            .await;
        have_status_code(&response, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_missing_job_is_not_owned() {
        let app = TestApp::start().await;
        let endpoint = Endpoint::get("/jobs/:id").with_id(&uuid::Uuid::new_v4().to_string());

        should_be::inaccessible_by(&app, &endpoint, &app.owner).await;
    }

    #[tokio::test]
    async fn test_collection_methods_are_disabled() {
        let app = TestApp::start().await;

        for endpoint in [
            Endpoint::get("/jobs"),
            Endpoint::get("/jobs/count"),
            Endpoint::put("/jobs"),
            Endpoint::post("/jobs/update"),
        ] {
            should_be::disabled_for_everyone(&app, &endpoint).await;
        }
    }
}

// =============================================================================
// hasMany
// =============================================================================

mod has_many_tests {
    use super::*;

    #[tokio::test]
    async fn test_interactions_are_scoped_to_the_job() {
        let (app, id) = with_job().await;
        let other = app
            .create_owned("jobs", json!({ "title": "Other", "status": "open" }))
            .await;

        for job_id in [&id, &id, &other] {
            app.create_owned(
                "interactions",
                json!({ "type": "communication", "startDate": "2024-01-01", "jobId": job_id }),
            )
            .await;
        }

        let endpoint = Endpoint::get("/jobs/:id/interactions").with_id(&id);
        should_be::inaccessible_by(&app, &endpoint, &app.authenticated).await;
        let response = should_be::accessible_by(&app, &endpoint, &app.owner, None).await;
        let interactions: Vec<Value> = response.json();
        assert_eq!(interactions.len(), 2);
        assert!(interactions.iter().all(|i| i["jobId"] == id.as_str()));

        let count = Endpoint::get("/jobs/:id/interactions/count").with_id(&id);
        let response = should_be::accessible_by(&app, &count, &app.owner, None).await;
        assert_eq!(response.json::<Value>(), json!({ "count": 2 }));
    }

    #[tokio::test]
    async fn test_offers_of_a_job() {
        let (app, id) = with_job().await;
        app.create_owned(
            "offers",
            json!({ "givenDate": "2024-03-01", "status": "undecided", "jobId": id }),
        )
        .await;

        let response = app
            .call(&Endpoint::get("/jobs/:id/offers").with_id(&id), &app.owner, None)
            .await;
        response.assert_status_ok();
        let offers: Vec<Value> = response.json();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0]["status"], "undecided");
    }

    #[tokio::test]
    async fn test_relation_writes_are_disabled() {
        let (app, id) = with_job().await;
        let fk = uuid::Uuid::new_v4().to_string();

        for endpoint in [
            Endpoint::post("/jobs/:id/interactions").with_id(&id),
            Endpoint::delete("/jobs/:id/offers").with_id(&id),
            Endpoint::get("/jobs/:id/interactions/:fk").with_id(&id).with_fk(&fk),
            Endpoint::put("/jobs/:id/offers/:fk").with_id(&id).with_fk(&fk),
        ] {
            should_be::disabled_for_everyone(&app, &endpoint).await;
        }
    }
}

// =============================================================================
// belongsTo
// =============================================================================

mod belongs_to_tests {
    use super::*;

    #[tokio::test]
    async fn test_search_is_null_until_linked() {
        let (app, id) = with_job().await;
        let endpoint = Endpoint::get("/jobs/:id/search").with_id(&id);

        let response = should_be::accessible_by(&app, &endpoint, &app.owner, None).await;
        assert_eq!(response.json::<Value>(), Value::Null);

        let search_id = app
            .create_owned("searches", json!({ "title": "Spring 2024", "status": "open" }))
            .await;
        app.call(
            &Endpoint::patch("/jobs/:id").with_id(&id),
            &app.owner,
            Some(&json!({ "searchId": search_id })),
        )
        .await
        .assert_status_ok();

        let response = app.call(&endpoint, &app.owner, None).await;
        assert_eq!(response.json::<Value>()["title"], "Spring 2024");

        let jobs = app
            .call(
                &Endpoint::get("/searches/:id/jobs").with_id(&search_id),
                &app.owner,
                None,
            )
            .await;
        let jobs: Vec<Value> = jobs.json();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0]["id"], id.as_str());
    }

    #[tokio::test]
    async fn test_dangling_parent_is_null() {
        let (app, id) = with_job().await;
        app.call(
            &Endpoint::patch("/jobs/:id").with_id(&id),
            &app.owner,
            Some(&json!({ "searchId": uuid::Uuid::new_v4().to_string() })),
        )
        .await
        .assert_status_ok();

        let response = app
            .call(&Endpoint::get("/jobs/:id/search").with_id(&id), &app.owner, None)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), Value::Null);
    }

    #[tokio::test]
    async fn test_user_of_a_job() {
        let (app, id) = with_job().await;
        let endpoint = Endpoint::get("/jobs/:id/user").with_id(&id);

        should_be::inaccessible_by(&app, &endpoint, &app.anonymous).await;
        let response = should_be::accessible_by(&app, &endpoint, &app.owner, None).await;
        assert_eq!(response.json::<Value>()["id"], app.owner.user_id());
    }
}
