use serde::Deserialize;

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";
const WATCH_BASE_URL: &str = "https://www.youtube.com/watch?v=";

pub struct YouTubeClient {
    client: reqwest::Client,
}
impl YouTubeClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetches the most recent upload on a channel, newest first.
    pub async fn latest_video(
        &self,
        api_key: &str,
        channel_id: &str,
    ) -> Result<LatestVideo, YouTubeError> {
        let body = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("key", api_key),
                ("channelId", channel_id),
                ("part", "snippet,id"),
                ("order", "date"),
                ("maxResults", "1"),
            ])
            .send()
            .await?
            .text()
            .await?;

        let response = serde_json::from_str(&body)?;

        LatestVideo::from_response(response)
    }
}

#[derive(Debug, Clone)]
pub struct LatestVideo {
    pub title: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
}
impl LatestVideo {
    fn from_response(response: SearchResponse) -> Result<Self, YouTubeError> {
        let Some(item) = response.items.into_iter().next() else {
            return Err(YouTubeError::NoVideos);
        };

        Ok(Self {
            title: item.snippet.title,
            url: format!("{WATCH_BASE_URL}{}", item.id.video_id),
            thumbnail_url: item.snippet.thumbnails.high.map(|thumbnail| thumbnail.url),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchItemSnippet {
    title: String,
    thumbnails: SearchItemThumbnails,
}

#[derive(Debug, Deserialize)]
struct SearchItemThumbnails {
    high: Option<SearchItemThumbnail>,
}

#[derive(Debug, Deserialize)]
struct SearchItemThumbnail {
    url: String,
}

#[derive(Debug)]
pub enum YouTubeError {
    Http(reqwest::Error),
    Parse(serde_json::Error),
    NoVideos,
}

impl From<reqwest::Error> for YouTubeError {
    fn from(e: reqwest::Error) -> Self {
        YouTubeError::Http(e)
    }
}

impl From<serde_json::Error> for YouTubeError {
    fn from(e: serde_json::Error) -> Self {
        YouTubeError::Parse(e)
    }
}

impl std::fmt::Display for YouTubeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YouTubeError::Http(e) => write!(f, "HTTP error: {e}"),
            YouTubeError::Parse(e) => write!(f, "malformed search response: {e}"),
            YouTubeError::NoVideos => write!(f, "no videos found"),
        }
    }
}

impl std::error::Error for YouTubeError {}
