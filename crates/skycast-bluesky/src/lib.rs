use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SESSION_ENDPOINT: &str = "https://bsky.social/xrpc/com.atproto.server.createSession";
const RECORD_ENDPOINT: &str = "https://bsky.social/xrpc/com.atproto.repo.createRecord";

const POST_COLLECTION: &str = "app.bsky.feed.post";
const EXTERNAL_EMBED_TYPE: &str = "app.bsky.embed.external";

/// Used when no template is configured. Placeholders are filled with the
/// video title and watch URL, in that order.
pub const DEFAULT_TEMPLATE: &str = "🎥 New Video: %s\n📺 Watch here: %s";

pub struct BlueskyClient {
    client: reqwest::Client,
}
impl BlueskyClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Exchanges an identifier and app password for a short-lived session.
    pub async fn create_session(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Session, BlueskyError> {
        let body = self
            .client
            .post(SESSION_ENDPOINT)
            .json(&SessionRequest {
                identifier,
                password,
            })
            .send()
            .await?
            .text()
            .await?;

        Session::from_body(&body)
    }

    /// Creates a post record in the given repo. Anything other than a 200
    /// is an error carrying the raw response body.
    pub async fn create_record(
        &self,
        session: &Session,
        repo: &str,
        record: PostRecord,
    ) -> Result<(), BlueskyError> {
        let response = self
            .client
            .post(RECORD_ENDPOINT)
            .bearer_auth(&session.access_jwt)
            .json(&CreateRecordRequest {
                collection: POST_COLLECTION,
                repo,
                record,
            })
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(BlueskyError::Api {
                status: response.status(),
                body: response.text().await?,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    access_jwt: String,
}
impl Session {
    /// A missing or empty `accessJwt` means authentication failed, whatever
    /// the HTTP status said.
    fn from_body(body: &str) -> Result<Self, BlueskyError> {
        let session: Session = serde_json::from_str(body)?;

        if session.access_jwt.is_empty() {
            return Err(BlueskyError::Auth);
        }

        Ok(session)
    }
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    collection: &'a str,
    repo: &'a str,
    record: PostRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<ExternalEmbed>,
}
impl PostRecord {
    /// Builds a post stamped with the current time.
    pub fn new(text: String, embed: Option<ExternalEmbed>) -> Self {
        Self {
            text,
            created_at: Utc::now(),
            embed,
        }
    }
}

/// Link-preview card attached to a post, rendered by clients as a rich embed.
#[derive(Debug, Serialize)]
pub struct ExternalEmbed {
    #[serde(rename = "$type")]
    kind: &'static str,
    external: ExternalLink,
}
impl ExternalEmbed {
    pub fn link(
        uri: String,
        title: String,
        description: String,
        thumbnail_uri: Option<String>,
    ) -> Self {
        Self {
            kind: EXTERNAL_EMBED_TYPE,
            external: ExternalLink {
                uri,
                title,
                description,
                thumbnail: thumbnail_uri.map(|uri| ThumbnailRef { uri }),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ExternalLink {
    uri: String,
    title: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<ThumbnailRef>,
}

#[derive(Debug, Serialize)]
struct ThumbnailRef {
    uri: String,
}

/// Fills a message template containing exactly two `%s` placeholders, in
/// order: title, then URL. Any other placeholder count is a configuration
/// error.
pub fn render_message(template: &str, title: &str, url: &str) -> Result<String, BlueskyError> {
    let placeholders = template.matches("%s").count();
    if placeholders != 2 {
        return Err(BlueskyError::Template(placeholders));
    }

    // Splice rather than replace so a `%s` inside the title can't swallow
    // the URL's slot.
    let first = template.find("%s").unwrap_or_default();
    let rest = &template[first + 2..];
    let second = rest.find("%s").unwrap_or_default();

    let mut message =
        String::with_capacity(template.len() + title.len() + url.len());
    message.push_str(&template[..first]);
    message.push_str(title);
    message.push_str(&rest[..second]);
    message.push_str(url);
    message.push_str(&rest[second + 2..]);

    Ok(message)
}

#[derive(Debug)]
pub enum BlueskyError {
    Http(reqwest::Error),
    Parse(serde_json::Error),
    Auth,
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    Template(usize),
}

impl From<reqwest::Error> for BlueskyError {
    fn from(e: reqwest::Error) -> Self {
        BlueskyError::Http(e)
    }
}

impl From<serde_json::Error> for BlueskyError {
    fn from(e: serde_json::Error) -> Self {
        BlueskyError::Parse(e)
    }
}

impl std::fmt::Display for BlueskyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlueskyError::Http(e) => write!(f, "HTTP error: {e}"),
            BlueskyError::Parse(e) => write!(f, "malformed response: {e}"),
            BlueskyError::Auth => write!(f, "failed to authenticate with Bluesky"),
            BlueskyError::Api { status, body } => write!(f, "failed to post ({status}): {body}"),
            BlueskyError::Template(count) => write!(
                f,
                "message template must contain exactly two %s placeholders, found {count}"
            ),
        }
    }
}

impl std::error::Error for BlueskyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_with_token_parses() {
        let session = Session::from_body(r#"{"accessJwt": "jwt", "did": "did:plc:xyz"}"#).unwrap();

        assert_eq!(session.access_jwt, "jwt");
    }

    #[test]
    fn session_without_token_is_auth_failure() {
        assert!(matches!(
            Session::from_body(r#"{"error": "AuthenticationRequired"}"#),
            Err(BlueskyError::Auth)
        ));
    }

    #[test]
    fn session_with_empty_token_is_auth_failure() {
        assert!(matches!(
            Session::from_body(r#"{"accessJwt": ""}"#),
            Err(BlueskyError::Auth)
        ));
    }

    #[test]
    fn renders_custom_template() {
        assert_eq!(render_message("New: %s (%s)", "T", "U").unwrap(), "New: T (U)");
    }

    #[test]
    fn renders_default_template() {
        assert_eq!(
            render_message(DEFAULT_TEMPLATE, "T", "U").unwrap(),
            "🎥 New Video: T\n📺 Watch here: U"
        );
    }

    #[test]
    fn placeholder_in_title_does_not_swallow_url() {
        assert_eq!(
            render_message("%s %s", "a %s b", "U").unwrap(),
            "a %s b U"
        );
    }

    #[test]
    fn wrong_placeholder_count_is_rejected() {
        assert!(matches!(
            render_message("just %s", "T", "U"),
            Err(BlueskyError::Template(1))
        ));
        assert!(matches!(
            render_message("%s %s %s", "T", "U"),
            Err(BlueskyError::Template(3))
        ));
    }

    #[test]
    fn record_body_matches_wire_shape() {
        let record = PostRecord::new(
            "New: T (U)".to_string(),
            Some(ExternalEmbed::link(
                "https://www.youtube.com/watch?v=abc".to_string(),
                "T".to_string(),
                "Watch now on YouTube".to_string(),
                Some("https://i.ytimg.com/vi/abc/hqdefault.jpg".to_string()),
            )),
        );

        let body = serde_json::to_value(CreateRecordRequest {
            collection: POST_COLLECTION,
            repo: "alice.bsky.social",
            record,
        })
        .unwrap();

        assert_eq!(body["collection"], "app.bsky.feed.post");
        assert_eq!(body["repo"], "alice.bsky.social");
        assert_eq!(body["record"]["text"], "New: T (U)");
        assert!(body["record"]["createdAt"].is_string());
        assert_eq!(body["record"]["embed"]["$type"], "app.bsky.embed.external");
        assert_eq!(
            body["record"]["embed"]["external"]["uri"],
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(
            body["record"]["embed"]["external"]["thumbnail"]["uri"],
            "https://i.ytimg.com/vi/abc/hqdefault.jpg"
        );
    }

    #[test]
    fn missing_thumbnail_is_omitted_from_embed() {
        let embed = ExternalEmbed::link(
            "U".to_string(),
            "T".to_string(),
            "D".to_string(),
            None,
        );

        let value = serde_json::to_value(embed).unwrap();

        assert!(value["external"].get("thumbnail").is_none());
    }

    #[test]
    fn api_error_carries_response_body() {
        let err = BlueskyError::Api {
            status: reqwest::StatusCode::NOT_FOUND,
            body: "not found".to_string(),
        };

        assert!(err.to_string().contains("not found"));
    }
}
