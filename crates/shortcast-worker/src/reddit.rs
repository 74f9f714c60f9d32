//! Reddit thread fetching through the public JSON listing endpoint.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use shortcast_models::{RedditComment, RedditConfig, RedditThread};
use shortcast_timeline::{ContentSource, TimelineError, TimelineResult};

use crate::error::{WorkerError, WorkerResult};

static THREAD_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/comments/([A-Za-z0-9]{5,10})").expect("valid regex"));

static THREAD_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{5,10}$").expect("valid regex"));

/// Accept a thread URL, a `t3_` fullname or a bare id.
pub fn extract_thread_id(input: &str) -> WorkerResult<String> {
    let trimmed = input.trim();
    if let Some(caps) = THREAD_URL_RE.captures(trimmed) {
        return Ok(caps[1].to_lowercase());
    }
    let bare = trimmed.strip_prefix("t3_").unwrap_or(trimmed);
    if THREAD_ID_RE.is_match(bare) {
        return Ok(bare.to_lowercase());
    }
    Err(WorkerError::InvalidThread(input.to_string()))
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    subreddit: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    stickied: bool,
}

fn is_narratable(comment: &CommentData) -> bool {
    let Some(body) = comment.body.as_deref().map(str::trim) else {
        return false;
    };
    !comment.stickied && !body.is_empty() && body != "[deleted]" && body != "[removed]"
}

/// Parse the two-listing thread response: the post, then its comments.
///
/// Stickied, deleted, removed and empty comments are dropped; "more"
/// placeholders are ignored. At most `limit` comments are kept.
pub fn parse_thread_response(raw: &str, limit: usize) -> WorkerResult<RedditThread> {
    let listings: Vec<Listing> = serde_json::from_str(raw)?;
    let mut listings = listings.into_iter();

    let post_listing = listings
        .next()
        .ok_or_else(|| WorkerError::content_fetch("response has no post listing"))?;
    let post = post_listing
        .data
        .children
        .into_iter()
        .find(|t| t.kind == "t3")
        .ok_or_else(|| WorkerError::content_fetch("post listing is empty"))?;
    let post: PostData = serde_json::from_value(post.data)?;

    let mut comments = Vec::new();
    for thing in listings.next().map(|l| l.data.children).unwrap_or_default() {
        if comments.len() >= limit {
            break;
        }
        if thing.kind != "t1" {
            continue;
        }
        let data: CommentData = serde_json::from_value(thing.data)?;
        if !is_narratable(&data) {
            continue;
        }
        comments.push(RedditComment {
            author: data.author.unwrap_or_else(|| "[deleted]".to_string()),
            body: data.body.unwrap_or_default().trim().to_string(),
            score: data.score,
        });
    }

    Ok(RedditThread {
        thread_id: post.id,
        subreddit: post.subreddit,
        title: post.title.trim().to_string(),
        comments,
    })
}

/// Fetches threads from Reddit (or anything serving the same JSON).
#[derive(Debug, Clone)]
pub struct RedditSource {
    client: Client,
    base_url: Url,
    prefer_top: bool,
}

impl RedditSource {
    pub fn new(config: &RedditConfig) -> WorkerResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| WorkerError::config_error(format!("reddit.base_url: {}", e)))?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            prefer_top: config.prefer_top_comments,
        })
    }

    fn thread_url(&self, thread_id: &str, limit: usize) -> WorkerResult<Url> {
        let mut url = self
            .base_url
            .join(&format!("comments/{}.json", thread_id))
            .map_err(|e| WorkerError::content_fetch(format!("bad thread url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("depth", "1")
            .append_pair("sort", if self.prefer_top { "top" } else { "confidence" });
        Ok(url)
    }

    /// Fetch a thread with up to `limit` narratable top-level comments.
    pub async fn fetch_thread(&self, thread_id: &str, limit: usize) -> WorkerResult<RedditThread> {
        let url = self.thread_url(thread_id, limit)?;
        debug!(url = %url, "Fetching thread");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WorkerError::ThreadNotFound(thread_id.to_string()));
        }
        if !status.is_success() {
            return Err(WorkerError::content_fetch(format!(
                "HTTP {} for thread {}",
                status, thread_id
            )));
        }

        let body = response.text().await?;
        let thread = parse_thread_response(&body, limit)?;
        info!(
            thread_id = %thread.thread_id,
            subreddit = %thread.subreddit,
            comments = thread.comments.len(),
            "Fetched thread"
        );
        Ok(thread)
    }
}

#[async_trait]
impl ContentSource for RedditSource {
    async fn fetch(&self, thread_id: &str, limit: usize) -> TimelineResult<RedditThread> {
        self.fetch_thread(thread_id, limit)
            .await
            .map_err(|e| TimelineError::content(e.to_string()))
    }
}
