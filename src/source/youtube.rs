use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::COOKIE;
use serde::Deserialize;
use tracing::{debug, info};

use super::{FetchError, SourceRecord};
use crate::config::{AuthMode, VideoSettings};

const FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml";
const API_URL: &str = "https://www.googleapis.com/youtube/v3";
const API_PAGE_SIZE: usize = 50;

/// How requests to YouTube are authenticated. The first two read the public
/// channel feed (newest ~15 uploads); the last two page through the Data API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoAuth {
    Public,
    Cookie(String),
    ApiKey(String),
    Bearer(String),
}

impl VideoAuth {
    pub fn from_settings(settings: &VideoSettings) -> Self {
        let secret = |v: &Option<String>| v.clone().unwrap_or_default();
        match settings.auth {
            AuthMode::Public => VideoAuth::Public,
            AuthMode::Cookie => VideoAuth::Cookie(secret(&settings.cookie)),
            AuthMode::ApiKey => VideoAuth::ApiKey(secret(&settings.api_key)),
            AuthMode::Bearer => VideoAuth::Bearer(secret(&settings.access_token)),
        }
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            VideoAuth::Public => request,
            VideoAuth::Cookie(cookie) => request.header(COOKIE, cookie),
            VideoAuth::ApiKey(key) => request.query(&[("key", key)]),
            VideoAuth::Bearer(token) => request.bearer_auth(token),
        }
    }
}

/// A video as listed by the channel, or as written in a local JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoEntry {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl From<VideoEntry> for SourceRecord {
    fn from(v: VideoEntry) -> Self {
        SourceRecord::video(&v.video_id, &v.title, &v.description)
    }
}

/// Keep the first `cap` videos (newest first, as listed); `None` keeps all.
pub fn cap_videos(videos: &mut Vec<VideoEntry>, cap: Option<usize>) {
    if let Some(cap) = cap {
        videos.truncate(cap);
    }
}

pub struct YouTubeSource {
    client: reqwest::Client,
    auth: VideoAuth,
}

impl YouTubeSource {
    pub fn new(auth: VideoAuth, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(YouTubeSource { client, auth })
    }

    /// Newest-first uploads of `channel_id`, at most `cap` of them.
    pub async fn fetch_videos(
        &self,
        channel_id: &str,
        cap: Option<usize>,
    ) -> Result<Vec<VideoEntry>, FetchError> {
        let mut videos = match self.auth {
            VideoAuth::Public | VideoAuth::Cookie(_) => self.fetch_feed(channel_id).await?,
            VideoAuth::ApiKey(_) | VideoAuth::Bearer(_) => {
                self.fetch_uploads(channel_id, cap).await?
            }
        };
        cap_videos(&mut videos, cap);
        info!("Fetched {} videos from channel {}", videos.len(), channel_id);
        Ok(videos)
    }

    async fn fetch_feed(&self, channel_id: &str) -> Result<Vec<VideoEntry>, FetchError> {
        let request = self.client.get(FEED_URL).query(&[("channel_id", channel_id)]);
        let xml = self
            .auth
            .apply(request)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_feed(&xml)
    }

    async fn fetch_uploads(
        &self,
        channel_id: &str,
        cap: Option<usize>,
    ) -> Result<Vec<VideoEntry>, FetchError> {
        let request = self
            .client
            .get(format!("{}/channels", API_URL))
            .query(&[("part", "contentDetails"), ("id", channel_id)]);
        let channels: ChannelList = self
            .auth
            .apply(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let playlist = channels
            .items
            .into_iter()
            .next()
            .map(|c| c.content_details.related_playlists.uploads)
            .ok_or_else(|| FetchError::Provider(format!("channel {} not found", channel_id)))?;

        let page_size = API_PAGE_SIZE.to_string();
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(format!("{}/playlistItems", API_URL)).query(&[
                ("part", "snippet"),
                ("playlistId", playlist.as_str()),
                ("maxResults", page_size.as_str()),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: PlaylistPage = self
                .auth
                .apply(request)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            debug!(items = page.items.len(), "playlist page");

            videos.extend(page.items.into_iter().map(PlaylistItem::into_entry));
            page_token = page.next_page_token;
            let full = cap.is_some_and(|cap| videos.len() >= cap);
            if full || page_token.is_none() {
                break;
            }
        }
        Ok(videos)
    }
}

// ── Data API shapes ──

#[derive(Debug, Deserialize)]
struct ChannelList {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

impl PlaylistItem {
    fn into_entry(self) -> VideoEntry {
        VideoEntry {
            video_id: self.snippet.resource_id.video_id,
            title: self.snippet.title,
            description: self.snippet.description,
        }
    }
}

// ── Channel feed ──

#[derive(Clone, Copy, PartialEq)]
enum Field {
    None,
    VideoId,
    Title,
    Description,
}

/// Parse an Atom channel feed into videos, in feed order.
fn parse_feed(xml: &str) -> Result<Vec<VideoEntry>, FetchError> {
    let mut reader = Reader::from_str(xml);
    let mut videos = Vec::new();
    let mut current: Option<VideoEntry> = None;
    let mut field = Field::None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"entry" => {
                    current = Some(VideoEntry {
                        video_id: String::new(),
                        title: String::new(),
                        description: String::new(),
                    })
                }
                b"yt:videoId" if current.is_some() => field = Field::VideoId,
                b"title" if current.is_some() => field = Field::Title,
                b"media:description" if current.is_some() => field = Field::Description,
                _ => {}
            },
            Event::Text(e) if field != Field::None => {
                let text = e.unescape()?;
                if let Some(entry) = current.as_mut() {
                    match field {
                        Field::VideoId => entry.video_id.push_str(text.trim()),
                        Field::Title => entry.title.push_str(&text),
                        Field::Description => entry.description.push_str(&text),
                        Field::None => {}
                    }
                }
            }
            Event::CData(e) if field == Field::Description => {
                if let Some(entry) = current.as_mut() {
                    entry.description.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"entry" => {
                    if let Some(entry) = current.take().filter(|v| !v.video_id.is_empty()) {
                        videos.push(entry);
                    }
                    field = Field::None;
                }
                _ => field = Field::None,
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(videos)
}

// ── Tests ──
