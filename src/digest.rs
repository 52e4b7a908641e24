use html_escape::{encode_double_quoted_attribute, encode_text};
use reqwest::Url;
use std::sync::Arc;

use crate::domain::article::Article;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;
use crate::email_client::{DeliveryError, Mailer, OutgoingEmail};

#[derive(Debug, Clone, serde::Serialize)]
pub struct DigestBody {
    pub html: String,
    pub text: String,
}

/// Renders the HTML body and its plain-text fallback.
pub fn compose(
    articles: &[Article],
    name: Option<&SubscriberName>,
    unsubscribe_url: &str,
) -> DigestBody {
    let greeting = match name {
        Some(name) => format!("Hello {}!", name.as_ref()),
        None => String::from("Hello!"),
    };

    DigestBody {
        html: compose_html(articles, &greeting, unsubscribe_url),
        text: compose_text(articles, &greeting, unsubscribe_url),
    }
}

fn compose_text(articles: &[Article], greeting: &str, unsubscribe_url: &str) -> String {
    let mut text = format!("{}\n\nHere's your curated arts digest:\n\n", greeting);

    for (index, article) in articles.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}\n   Topic: {}\n   Source: {}\n   Published: {}\n   {}\n   Read more: {}\n\n",
            index + 1,
            article.title,
            article.art_form,
            article.source,
            article.published_date,
            article.description,
            article.url,
        ));
    }

    text.push_str("---\n");
    text.push_str(&format!("To unsubscribe, visit: {}\n", unsubscribe_url));
    text.push_str("Thanks for reading!\n");

    text
}

fn compose_html(articles: &[Article], greeting: &str, unsubscribe_url: &str) -> String {
    let mut html = format!(
        "<div>\n<h1>{}</h1>\n<p>Here's your curated arts digest:</p>\n",
        encode_text(greeting)
    );

    for article in articles {
        let image = match &article.image_url {
            Some(image_url) => format!(
                "<img src=\"{}\" alt=\"\" width=\"560\">\n",
                encode_double_quoted_attribute(image_url)
            ),
            None => String::new(),
        };
        html.push_str(&format!(
            "<div class=\"article\">\n{}<h2><a href=\"{}\">{}</a></h2>\n<p><small>{} &middot; {} &middot; {}</small></p>\n<p>{}</p>\n</div>\n",
            image,
            encode_double_quoted_attribute(&article.url),
            encode_text(&article.title),
            encode_text(&article.art_form),
            encode_text(&article.source),
            encode_text(&article.published_date),
            encode_text(&article.description),
        ));
    }

    html.push_str(&format!(
        "<hr>\n<p><small><a href=\"{}\">Unsubscribe</a></small></p>\n</div>\n",
        encode_double_quoted_attribute(unsubscribe_url)
    ));

    html
}

/// Composes a digest for one subscriber and hands it to the mail transport.
#[derive(Clone)]
pub struct DigestSender {
    mailer: Arc<dyn Mailer>,
    base_url: Url,
}

impl DigestSender {
    /// `base_url` must be able to carry a path, see
    /// [`Settings::get_app_base_url`](crate::config::Settings::get_app_base_url).
    pub fn new(mailer: Arc<dyn Mailer>, base_url: Url) -> Self {
        Self { mailer, base_url }
    }

    /// `{base_url}/unsubscribe/{email}` with the email percent-encoded as a
    /// single path segment.
    pub fn unsubscribe_url(&self, email: &SubscriberEmail) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("unsubscribe").push(email.as_ref());
        }

        url.to_string()
    }

    #[tracing::instrument(
        name = "Send a digest",
        skip(self, articles, name),
        fields(subscriber_email = %recipient)
    )]
    pub async fn send(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        articles: &[Article],
        name: Option<&SubscriberName>,
    ) -> Result<(), DeliveryError> {
        let body = compose(articles, name, &self.unsubscribe_url(recipient));

        self.mailer
            .send_email(OutgoingEmail {
                recipient: recipient.clone(),
                subject: subject.to_string(),
                html_body: body.html,
                text_body: body.text,
            })
            .await?;

        tracing::info!("Digest sent successfully");

        Ok(())
    }

    pub async fn test_connection(&self) -> bool {
        self.mailer.test_connection().await
    }
}
