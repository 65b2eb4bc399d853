use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{mount_email_api, TestApp};
use lead_capture::domain::subscriber_status::SubscriberStatus;
use lead_capture::store::preferences;

#[tokio::test]
async fn get_preferences_without_token_is_rejected_with_400() {
    let test_app = TestApp::spawn_app().await;

    let response = reqwest::get(&format!("{}/preferences", test_app.address))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Token is required");
}

#[tokio::test]
async fn get_preferences_with_unknown_token_returns_404() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get_preferences(&"b".repeat(64)).await;

    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn get_preferences_returns_the_profile_and_defaults() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.create_confirmed_subscriber("ann@example.com").await;

    let response = test_app.get_preferences(&token).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "success": true,
            "subscriber": { "email": "ann@example.com", "name": "Ann Smith", "status": "confirmed" },
            "preferences": {
                "topic_business_automation": true,
                "topic_ai_trends": true,
                "topic_ai_education": true,
                "frequency": "weekly"
            }
        })
    );
}

#[tokio::test]
async fn a_partial_update_only_changes_the_given_fields() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.create_confirmed_subscriber("ann@example.com").await;

    mount_email_api(&test_app.email_server).await;
    Mock::given(method("PUT"))
        .and(path("/contacts/ann%40example.com"))
        .and(body_json(serde_json::json!({
            "attributes": { "TOPIC_TRENDS": false, "FREQUENCY": "monthly" }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_preferences(&serde_json::json!({
            "token": token,
            "topic_ai_trends": false,
            "frequency": "monthly"
        }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Your preferences have been updated successfully.");

    let body: serde_json::Value = test_app.get_preferences(&token).await.json().await.unwrap();
    assert_eq!(
        body["preferences"],
        serde_json::json!({
            "topic_business_automation": true,
            "topic_ai_trends": false,
            "topic_ai_education": true,
            "frequency": "monthly"
        })
    );

    let email_request = test_app.sent_emails().await.pop().unwrap();
    let email_body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();
    assert_eq!(email_body["subject"], "Email preferences updated");
}

#[tokio::test]
async fn an_empty_update_changes_nothing() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.create_confirmed_subscriber("ann@example.com").await;
    let subscriber = test_app.find_subscriber("ann@example.com").await.unwrap();
    let before = preferences::get_preferences(&test_app.db_pool, subscriber.id)
        .await
        .unwrap();
    let emails_before = test_app.sent_emails().await.len();

    let response = test_app
        .post_preferences(&serde_json::json!({ "token": token }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let after = preferences::get_preferences(&test_app.db_pool, subscriber.id)
        .await
        .unwrap();
    assert_eq!(before, after);
    assert_eq!(test_app.sent_emails().await.len(), emails_before);
}

#[tokio::test]
async fn invalid_updates_are_rejected() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.create_confirmed_subscriber("ann@example.com").await;
    let test_cases = vec![
        (serde_json::json!({ "topic_ai_trends": false }), 400, "missing token"),
        (serde_json::json!({ "token": "", "topic_ai_trends": false }), 400, "blank token"),
        (serde_json::json!({ "token": "c".repeat(64) }), 404, "unknown token"),
        (serde_json::json!({ "token": token, "frequency": "hourly" }), 400, "invalid frequency"),
        (serde_json::json!({ "token": token, "topic_ai_trends": "no" }), 400, "invalid topic flag"),
    ];

    for (body, status, description) in test_cases {
        let response = test_app.post_preferences(&body).await;

        assert_eq!(
            status,
            response.status().as_u16(),
            "The API did not fail with {} when the payload had {}.",
            status,
            description
        );
    }
}

#[tokio::test]
async fn unsubscribing_blacklists_the_contact_and_keeps_the_preferences() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.create_confirmed_subscriber("ann@example.com").await;

    Mock::given(method("PUT"))
        .and(path("/contacts/ann%40example.com"))
        .and(body_json(serde_json::json!({ "emailBlacklisted": true })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_preferences(&serde_json::json!({
            "token": token,
            "unsubscribe": true,
            "topic_ai_trends": false
        }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You have been unsubscribed successfully.");

    let subscriber = test_app.find_subscriber("ann@example.com").await.unwrap();
    assert_eq!(subscriber.status, SubscriberStatus::Unsubscribed);
    let stored = preferences::get_preferences(&test_app.db_pool, subscriber.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.topic_ai_trends);

    // A second unsubscribe is a no-op and does not call the provider again
    let response = test_app
        .post_preferences(&serde_json::json!({ "token": token, "unsubscribe": true }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn unsubscribed_subscribers_can_still_store_preferences_without_notifications() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.create_confirmed_subscriber("ann@example.com").await;

    Mock::given(method("PUT"))
        .and(path_regex("^/contacts/.+$"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&test_app.email_server)
        .await;

    test_app
        .post_preferences(&serde_json::json!({ "token": token, "unsubscribe": true }))
        .await
        .error_for_status()
        .unwrap();
    let requests_before = test_app.email_server.received_requests().await.unwrap().len();

    let response = test_app
        .post_preferences(&serde_json::json!({ "token": token, "frequency": "daily" }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = test_app.get_preferences(&token).await.json().await.unwrap();
    assert_eq!(body["preferences"]["frequency"], "daily");
    assert_eq!(body["subscriber"]["status"], "unsubscribed");
    assert_eq!(
        test_app.email_server.received_requests().await.unwrap().len(),
        requests_before
    );
}

#[tokio::test]
async fn a_confirmed_homepage_signup_gets_the_default_preferences() {
    let test_app = TestApp::spawn_app().await;

    mount_email_api(&test_app.email_server).await;

    test_app
        .post_subscription(&serde_json::json!({
            "name": "Ann",
            "email": "a@x.com",
            "pdf_choice": "all",
            "source": "homepage"
        }))
        .await
        .error_for_status()
        .unwrap();

    let subscriber = test_app.find_subscriber("a@x.com").await.unwrap();
    test_app
        .get_confirmation(subscriber.confirmation_token.as_ref())
        .await
        .error_for_status()
        .unwrap();

    let subscriber = test_app.find_subscriber("a@x.com").await.unwrap();
    assert_eq!(subscriber.status, SubscriberStatus::Confirmed);
    assert_eq!(subscriber.source, "homepage");

    let body: serde_json::Value = test_app
        .get_preferences(subscriber.preference_token.as_ref())
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(
        body["preferences"],
        serde_json::json!({
            "topic_business_automation": true,
            "topic_ai_trends": true,
            "topic_ai_education": true,
            "frequency": "weekly"
        })
    );
}
