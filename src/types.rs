//! Protocol payloads returned by catalog and stream handlers.
//!
//! See <https://github.com/Stremio/stremio-addon-sdk/tree/master/docs/api/responses>.

use serde::{Deserialize, Serialize};

/// A meta preview item, used within catalog responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaPreviewItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    /// URL
    pub poster: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_shape: Option<String>,

    // Used for the "Discover" page sidebar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<MetaLinkItem>>,
    #[serde(rename = "imdbRating", default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    /// E.g. "2000" for movies and "2000-2014" or "2000-" for TV shows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A full meta item, used when info for a specific item was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<MetaLinkItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_info: Option<String>,
    #[serde(rename = "imdbRating", default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,
    /// ISO 8601, e.g. "2010-12-06T05:00:00.000Z"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<VideoItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awards: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Links to a page within the client. Not fully supported by all clients yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaLinkItem {
    pub name: String,
    pub category: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub title: String,
    /// ISO 8601
    pub released: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streams: Option<Vec<StreamItem>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    /// YouTube ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
}

/// A playable stream for a meta item.
///
/// Exactly one of `url`, `yt_id`, `info_hash` or `external_url` should be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yt_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,

    /// Usually used for stream quality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Only when using `info_hash`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_idx: Option<u8>,
}

impl StreamItem {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn youtube(id: impl Into<String>) -> Self {
        Self {
            yt_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn torrent(info_hash: impl Into<String>, file_idx: Option<u8>) -> Self {
        Self {
            info_hash: Some(info_hash.into()),
            file_idx,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_item_omits_unset_sources() {
        let stream = StreamItem::url("http://example.com/video.mp4").with_title("1080p");
        let json = serde_json::to_string(&stream).unwrap();
        assert_eq!(
            json,
            r#"{"url":"http://example.com/video.mp4","title":"1080p"}"#
        );
    }

    #[test]
    fn torrent_stream_keys() {
        let json = serde_json::to_value(StreamItem::torrent("abc", Some(1))).unwrap();
        assert_eq!(json["infoHash"], "abc");
        assert_eq!(json["fileIdx"], 1);
        assert!(json.get("ytId").is_none());
    }

    #[test]
    fn meta_preview_keys() {
        let item = MetaPreviewItem {
            id: "tt1254207".into(),
            kind: "movie".into(),
            name: "Big Buck Bunny".into(),
            poster: "https://example.com/poster.jpg".into(),
            imdb_rating: Some("6.4".into()),
            release_info: Some("2008".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "movie");
        assert_eq!(json["imdbRating"], "6.4");
        assert_eq!(json["releaseInfo"], "2008");
        assert!(json.get("posterShape").is_none());
        assert!(json.get("genres").is_none());
    }

    #[test]
    fn video_item_available_only_when_true() {
        let mut video = VideoItem {
            id: "tt0903747:1:1".into(),
            title: "Pilot".into(),
            released: "2008-01-20T00:00:00.000Z".into(),
            ..Default::default()
        };
        assert!(serde_json::to_value(&video).unwrap().get("available").is_none());
        video.available = true;
        assert_eq!(serde_json::to_value(&video).unwrap()["available"], true);
    }
}
