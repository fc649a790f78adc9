use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::NewsConfig;
use crate::error::{Result, SourceError};
use crate::sources::http::{build_client, read_json};
use crate::sources::retry::RetryPolicy;
use crate::sources::types::{Headline, ResolvedLocation};
use crate::sources::{NewsSource, SourceResult};

const REMOVED_TITLE: &str = "[Removed]";

/// Location-specific headlines from NewsAPI, falling back to national top
/// headlines when the location search comes back empty.
pub struct NewsApi {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    language: String,
    sort_by: String,
    max_articles: usize,
    fallback_country: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ArticlesResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    url: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl NewsApi {
    pub fn new(config: &NewsConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            sort_by: config.sort_by.clone(),
            max_articles: config.max_articles,
            fallback_country: config.fallback_country.clone(),
            retry,
        })
    }

    async fn get_articles(
        &self,
        api_key: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> SourceResult<Vec<Article>> {
        let url = format!("{}{endpoint}", self.base_url);
        self.retry
            .run("news", || async {
                let response = self
                    .client
                    .get(&url)
                    .header("X-Api-Key", api_key)
                    .query(params)
                    .send()
                    .await?;
                let body: ArticlesResponse = read_json(response).await?;
                Ok(body.articles)
            })
            .await
    }

    fn headlines(&self, articles: Vec<Article>) -> Vec<Headline> {
        articles
            .into_iter()
            .filter_map(|article| {
                let title = article.title?.trim().to_string();
                if title.is_empty() || title == REMOVED_TITLE {
                    return None;
                }
                Some(Headline {
                    title,
                    source: article.source.and_then(|s| s.name),
                    url: article.url,
                })
            })
            .take(self.max_articles)
            .collect()
    }
}

#[async_trait]
impl NewsSource for NewsApi {
    async fn fetch_news(&self, location: &ResolvedLocation) -> SourceResult<Vec<Headline>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("news API key".to_string()))?;
        let page_size = self.max_articles.to_string();

        let articles = self
            .get_articles(
                api_key,
                "/everything",
                &[
                    ("q", location.search_term(" ")),
                    ("language", self.language.clone()),
                    ("sortBy", self.sort_by.clone()),
                    ("pageSize", page_size.clone()),
                ],
            )
            .await?;
        let headlines = self.headlines(articles);
        if !headlines.is_empty() {
            return Ok(headlines);
        }

        tracing::debug!(
            location = %location.display_name,
            country = %self.fallback_country,
            "No location-specific news, falling back to top headlines"
        );
        let articles = self
            .get_articles(
                api_key,
                "/top-headlines",
                &[
                    ("country", self.fallback_country.clone()),
                    ("pageSize", page_size),
                ],
            )
            .await?;
        Ok(self.headlines(articles))
    }
}
