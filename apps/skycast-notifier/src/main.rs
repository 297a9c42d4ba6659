use eyre::Context as _;
use skycast_bluesky::{BlueskyClient, DEFAULT_TEMPLATE, ExternalEmbed, PostRecord, render_message};
use skycast_youtube::YouTubeClient;

const EMBED_DESCRIPTION: &str = "Watch now on YouTube";

macro_rules! env_var {
    ($name:expr) => {
        ::std::env::var($name)
            .wrap_err_with(|| format!("Failed to find environment variable {}", $name))?
    };
}

struct Config {
    youtube_api_key: String,
    youtube_channel_id: String,
    bluesky_username: String,
    bluesky_app_pass: String,
    bluesky_template: Option<String>,
}
impl Config {
    fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            youtube_api_key: env_var!("YOUTUBE_API_KEY"),
            youtube_channel_id: env_var!("YOUTUBE_CHANNEL_ID"),
            bluesky_username: env_var!("BLUESKY_USERNAME"),
            bluesky_app_pass: env_var!("BLUESKY_APP_PASS"),
            bluesky_template: std::env::var("BLUESKY_MESSAGE_TEMPLATE").ok(),
        })
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let youtube = YouTubeClient::new();
    let bluesky = BlueskyClient::new();

    let video = youtube
        .latest_video(&config.youtube_api_key, &config.youtube_channel_id)
        .await
        .wrap_err("Failed to fetch latest YouTube video")?;

    tracing::info!(title = %video.title, url = %video.url, "found latest upload");

    let template = config
        .bluesky_template
        .as_deref()
        .unwrap_or(DEFAULT_TEMPLATE);
    let text = render_message(template, &video.title, &video.url)
        .wrap_err("Failed to render message template")?;

    let record = PostRecord::new(
        text,
        Some(ExternalEmbed::link(
            video.url,
            video.title,
            EMBED_DESCRIPTION.to_string(),
            video.thumbnail_url,
        )),
    );

    let session = bluesky
        .create_session(&config.bluesky_username, &config.bluesky_app_pass)
        .await
        .wrap_err("Failed to authenticate with Bluesky")?;

    bluesky
        .create_record(&session, &config.bluesky_username, record)
        .await
        .wrap_err("Failed to create post record")?;

    tracing::info!("posted to Bluesky with video embed and thumbnail");

    Ok(())
}
