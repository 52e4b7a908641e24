use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{FakeMailer, TestApp};
use sevenarts_digest::domain::send_status::SendStatus;
use sevenarts_digest::domain::subscriber_email::SubscriberEmail;

#[tokio::test]
async fn digest_is_sent_to_every_active_subscriber_only() {
    let test_app = TestApp::spawn_app().await;
    test_app.add_subscriber("frank@test.com", Some("Frank")).await;
    test_app.add_subscriber("ada@test.com", None).await;
    test_app.add_subscriber("gone@test.com", Some("Gone")).await;
    test_app.get("/unsubscribe/gone@test.com").await;
    Mock::given(path("/everything"))
        .and(method("GET"))
        .and(header("X-Api-Key", "demo-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "articles": [crate::helpers::article_json("Light and Shadow")]
        })))
        .expect(3)
        .mount(&test_app.news_server)
        .await;

    let response = test_app.post_send_newsletter().await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["outcome"], "delivered");
    assert_eq!(body["sent"], 2);
    assert_eq!(body["failed"], 0);

    let mut recipients = test_app.mailer.recipients();
    recipients.sort();
    assert_eq!(recipients, vec!["ada@test.com", "frank@test.com"]);

    let delivered = test_app.mailer.delivered.lock().unwrap().clone();
    for email in &delivered {
        assert_eq!(email.subject, test_app.config.digest.subject);
        assert!(email.text_body.contains("Light and Shadow"));
        assert!(email
            .html_body
            .contains(&format!("/unsubscribe/{}", email.recipient.as_ref())));
    }

    let sends = test_app.store.recent_sends(10).await.unwrap();
    assert_eq!(sends.len(), 2);
    assert!(sends
        .iter()
        .all(|send| send.status == SendStatus::Sent && send.articles.len() == 3));

    let gone = test_app
        .store
        .find_subscriber(&SubscriberEmail::parse(String::from("gone@test.com")).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(sends.iter().all(|send| send.subscriber_id != gone.id));
}

#[tokio::test]
async fn a_failed_delivery_is_recorded_and_does_not_stop_the_run() {
    let test_app = TestApp::spawn_app_with_mailer(FakeMailer {
        failing: vec![String::from("bounce@test.com")],
        ..FakeMailer::default()
    })
    .await;
    test_app.add_subscriber("frank@test.com", Some("Frank")).await;
    test_app.add_subscriber("bounce@test.com", None).await;
    test_app.mock_news_api().await;

    let response = test_app.post_send_newsletter().await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["sent"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(test_app.mailer.recipients(), vec!["frank@test.com"]);

    let bounce = test_app
        .store
        .find_subscriber(&SubscriberEmail::parse(String::from("bounce@test.com")).unwrap())
        .await
        .unwrap()
        .unwrap();
    let sends = test_app.store.recent_sends(10).await.unwrap();
    assert_eq!(sends.len(), 2);
    for send in sends {
        let expected = if send.subscriber_id == bounce.id {
            SendStatus::Failed
        } else {
            SendStatus::Sent
        };
        assert_eq!(send.status, expected);
    }
}

#[tokio::test]
async fn nothing_is_sent_without_active_subscribers() {
    let test_app = TestApp::spawn_app().await;
    Mock::given(path("/everything"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.news_server)
        .await;

    let response = test_app.post_send_newsletter().await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["outcome"], "no_subscribers");
    assert!(test_app.store.recent_sends(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn nothing_is_sent_without_articles() {
    let test_app = TestApp::spawn_app().await;
    test_app.add_subscriber("frank@test.com", Some("Frank")).await;
    test_app.mock_empty_news_api().await;

    let response = test_app.post_send_newsletter().await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["outcome"], "no_articles");
    assert!(test_app.mailer.recipients().is_empty());
    assert!(test_app.store.recent_sends(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn news_api_failures_count_as_no_articles() {
    let test_app = TestApp::spawn_app().await;
    test_app.add_subscriber("frank@test.com", Some("Frank")).await;
    Mock::given(path("/everything"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&test_app.news_server)
        .await;

    let response = test_app.post_send_newsletter().await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["outcome"], "no_articles");
}

#[tokio::test]
async fn dashboard_shows_counts_and_recent_sends() {
    let test_app = TestApp::spawn_app().await;
    test_app.add_subscriber("frank@test.com", Some("Frank")).await;
    test_app.add_subscriber("ada@test.com", None).await;
    test_app.mock_news_api().await;
    test_app.post_send_newsletter().await;

    let response = test_app.get("/").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["active_subscribers"], 2);
    assert_eq!(body["recent_newsletters"].as_array().unwrap().len(), 2);
    assert_eq!(body["recent_newsletters"][0]["status"], "sent");
    assert_eq!(body["art_forms"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn preview_composes_a_generic_digest_without_sending() {
    let test_app = TestApp::spawn_app().await;
    test_app.add_subscriber("frank@test.com", Some("Frank")).await;
    test_app.mock_news_api().await;

    let response = test_app.get("/newsletters/preview").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["subject"], test_app.config.digest.subject.as_str());
    assert_eq!(body["articles"].as_array().unwrap().len(), 3);
    assert!(body["text"].as_str().unwrap().starts_with("Hello!"));
    assert!(body["html"].as_str().unwrap().contains("Light and Shadow"));
    assert!(test_app.mailer.recipients().is_empty());
    assert!(test_app.store.recent_sends(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_news_reports_the_fetched_articles() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_news_api().await;

    let response = test_app.get("/api/test_news").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["articles"].as_array().unwrap().len(), 3);
    assert_eq!(body["articles"][0]["source"], "Arts Weekly");
    assert_eq!(body["articles"][0]["published_date"], "March 05, 2024");
}

#[tokio::test]
async fn test_email_reports_the_transport_check() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get("/api/test_email").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn emailed_unsubscribe_links_work_for_unusual_addresses() {
    let test_app = TestApp::spawn_app().await;
    let emails = ["a?b@test.com", "a#b@test.com", "a/b@test.com"];
    for email in emails {
        test_app.add_subscriber(email, None).await;
    }
    test_app.mock_news_api().await;

    test_app.post_send_newsletter().await;

    let delivered = test_app.mailer.delivered.lock().unwrap().clone();
    assert_eq!(delivered.len(), 3);

    for email in delivered {
        let link = email
            .text_body
            .lines()
            .find_map(|line| line.strip_prefix("To unsubscribe, visit: "))
            .expect("No unsubscribe link in the digest.");
        let link = reqwest::Url::parse(link).unwrap();
        assert_eq!(
            link.path_segments().unwrap().count(),
            2,
            "{} is not a two segment path",
            link
        );
        assert!(link.query().is_none());
        assert!(link.fragment().is_none());

        let response = test_app.get(link.path()).await;

        assert_eq!(200, response.status().as_u16(), "{} failed", link);
        let subscriber = test_app
            .store
            .find_subscriber(&email.recipient)
            .await
            .unwrap()
            .unwrap();
        assert!(!subscriber.active, "{} is still active", email.recipient);
    }

    assert_eq!(test_app.store.count_active().await.unwrap(), 0);
}
