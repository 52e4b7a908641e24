use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Response;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sevenarts_digest::{
    config::{get_configuration, Settings},
    domain::new_subscriber::{NewSubscriber, NewSubscriberBody},
    email_client::{DeliveryError, Mailer, OutgoingEmail},
    startup::Application,
    store::SubscriptionStore,
    telemetry::{get_subscriber, init_subscriber},
};

// Logs are only printed when TEST_LOG is set, e.g. `TEST_LOG=true cargo test`.
static TRACING: Lazy<()> = Lazy::new(|| {
    let name = String::from("test");
    let env_filter = String::from("debug");

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(name, env_filter, std::io::stdout);
        init_subscriber(subscriber).expect("Failed to init the tracing subscriber.");
    } else {
        let subscriber = get_subscriber(name, env_filter, std::io::sink);
        init_subscriber(subscriber).expect("Failed to init the tracing subscriber.");
    }
});

/// Records every message it is handed. Messages to `failing` addresses are
/// rejected.
#[derive(Default)]
pub struct FakeMailer {
    pub failing: Vec<String>,
    pub delivered: Mutex<Vec<OutgoingEmail>>,
}

impl FakeMailer {
    pub fn recipients(&self) -> Vec<String> {
        self.delivered
            .lock()
            .expect("Mailer lock poisoned.")
            .iter()
            .map(|email| email.recipient.as_ref().to_string())
            .collect()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send_email(&self, email: OutgoingEmail) -> Result<(), DeliveryError> {
        if self
            .failing
            .iter()
            .any(|failing| failing == email.recipient.as_ref())
        {
            let err = "rejected"
                .parse::<lettre::Address>()
                .expect_err("Address should be invalid.");
            return Err(DeliveryError::Address(err));
        }

        self.delivered
            .lock()
            .expect("Mailer lock poisoned.")
            .push(email);

        Ok(())
    }

    async fn test_connection(&self) -> bool {
        true
    }
}

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub store: SubscriptionStore,
    pub news_server: MockServer,
    pub mailer: Arc<FakeMailer>,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        Self::spawn_app_with_mailer(FakeMailer::default()).await
    }

    pub async fn spawn_app_with_mailer(mailer: FakeMailer) -> TestApp {
        Lazy::force(&TRACING);

        let mut config = get_configuration().expect("Missing configuration file.");
        let news_server = MockServer::start().await;

        // Port 0 lets the OS pick a free port for every test.
        config.set_app_port(0);
        config.set_news_api_base_url(news_server.uri());
        // Every test gets its own private database.
        config.set_db_url(String::from("sqlite::memory:"));
        config.digest.scheduler_enabled = false;

        let mailer = Arc::new(mailer);
        let application = Application::build_with_mailer(config.clone(), mailer.clone())
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());
        let store = application.store();

        tokio::spawn(application.run_until_stop());

        TestApp {
            config,
            address,
            store,
            news_server,
            mailer,
        }
    }

    pub async fn post_subscription(&self, body: &Value) -> Response {
        reqwest::Client::new()
            .post(format!("{}/subscriptions", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_art_form(&self, body: &Value) -> Response {
        reqwest::Client::new()
            .post(format!("{}/art_forms", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_send_newsletter(&self) -> Response {
        reqwest::Client::new()
            .post(format!("{}/newsletters/send", self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get(&self, route: &str) -> Response {
        reqwest::Client::new()
            .get(format!("{}{}", self.address, route))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Stores a subscriber straight through the store, skipping the API.
    pub async fn add_subscriber(&self, email: &str, name: Option<&str>) {
        let new_subscriber: NewSubscriber = NewSubscriberBody {
            email: email.to_string(),
            name: name.map(String::from),
            art_forms: vec![String::from("Painting")],
        }
        .try_into()
        .expect("Invalid subscriber.");

        self.store
            .upsert_subscriber(&new_subscriber)
            .await
            .expect("Failed to store the subscriber.");
    }

    /// Every news search answers with a single article that passes the
    /// quality filter.
    pub async fn mock_news_api(&self) {
        Mock::given(path("/everything"))
            .and(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "status": "ok",
                    "articles": [article_json("Light and Shadow")]
                })),
            )
            .mount(&self.news_server)
            .await;
    }

    pub async fn mock_empty_news_api(&self) {
        Mock::given(path("/everything"))
            .and(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": "ok", "articles": [] })),
            )
            .mount(&self.news_server)
            .await;
    }
}

pub fn article_json(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "description": "A retrospective of the painter's late work opens this weekend in the old harbour.",
        "url": "https://news.example.com/light-and-shadow",
        "source": { "name": "Arts Weekly" },
        "publishedAt": "2024-03-05T10:00:00Z",
        "urlToImage": "https://news.example.com/light-and-shadow.jpg"
    })
}
