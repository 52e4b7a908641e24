use rand::seq::SliceRandom;

use crate::domain::art_form::{ArtForm, DEFAULT_ART_FORMS};
use crate::domain::article::Article;
use crate::news_client::NewsClient;

/// Maximum number of art forms picked, and of articles returned, per digest.
pub const ARTICLES_PER_DIGEST: usize = 3;

/// Picks the articles of a digest. Every subscriber of a run gets the same set.
#[derive(Clone)]
pub struct Curator {
    news_client: NewsClient,
}

struct Topic {
    name: String,
    keywords: Vec<String>,
}

impl Curator {
    pub fn new(news_client: NewsClient) -> Self {
        Self { news_client }
    }

    /// Draws up to three art forms at random (the seven classic ones when none
    /// is active) and fetches one article for each. Never fails: a topic whose
    /// fetch fails just contributes nothing.
    #[tracing::instrument(name = "Curate digest articles", skip(self, art_forms))]
    pub async fn curate(&self, art_forms: &[ArtForm]) -> Vec<Article> {
        let topics = select_topics(art_forms);
        let mut articles = Vec::with_capacity(ARTICLES_PER_DIGEST);

        for topic in topics {
            let found = self
                .news_client
                .fetch_for_topic(&topic.name, &topic.keywords, 1)
                .await;
            articles.extend(found);
        }

        articles.truncate(ARTICLES_PER_DIGEST);
        tracing::info!("Curated {} articles", articles.len());

        articles
    }
}

fn select_topics(art_forms: &[ArtForm]) -> Vec<Topic> {
    let mut candidates: Vec<Topic> = art_forms
        .iter()
        .filter(|art_form| art_form.active)
        .map(|art_form| Topic {
            name: art_form.name.as_ref().to_string(),
            keywords: art_form.keywords.clone(),
        })
        .collect();

    if candidates.is_empty() {
        candidates = DEFAULT_ART_FORMS
            .iter()
            .map(|(name, keywords, _)| Topic {
                name: name.to_string(),
                keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
            })
            .collect();
    }

    let mut rng = rand::thread_rng();
    candidates.shuffle(&mut rng);
    candidates.truncate(ARTICLES_PER_DIGEST);

    candidates
}
