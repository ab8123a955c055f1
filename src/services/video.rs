//! Video Recommendation Service
//!
//! Tag-driven video recommendations backed by the Bilibili search API. The
//! tags come from the learner's vocabulary or scene objects; the service
//! builds a search keyword, derives up to three recommended tags, fetches
//! matching videos, and normalizes them for the frontend. Like the AI
//! services it is total: a dead search backend yields an empty video list
//! while the query and tags still come back.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::VideoConfig;
use crate::types::{ErrorClassifier, LingoError, Result};

const SERVICE_NAME: &str = "bilibili";
const PAGE_SIZE: &str = "20";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One recommended video, normalized from the search API entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub cover: String,
    pub url: String,
    pub duration: String,
    pub play_count: u64,
    pub up: String,
    pub tags: Vec<String>,
}

/// The full recommendation payload.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecommendation {
    pub search_query: String,
    pub recommended_tags: Vec<String>,
    pub videos: Vec<VideoInfo>,
}

pub struct VideoSearchService {
    api_base: String,
    client: reqwest::Client,
}

impl VideoSearchService {
    pub fn new(config: &VideoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LingoError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_base: config.api_base.clone(),
            client,
        })
    }

    /// Recommend videos for the given tags.
    pub async fn recommend(&self, tags: &[String]) -> VideoRecommendation {
        let plan = build_search_plan(tags);

        let videos = match self.search(&plan.search_query).await {
            Ok(raw) => normalize_videos(raw, &plan.tags),
            Err(e) => {
                warn!(error = %e, "video search degraded to empty result");
                Vec::new()
            }
        };

        VideoRecommendation {
            search_query: plan.search_query,
            recommended_tags: plan.tags,
            videos,
        }
    }

    async fn search(&self, keyword: &str) -> Result<Vec<RawVideo>> {
        debug!(keyword, "sending video search request");

        let response = self
            .client
            .get(&self.api_base)
            .query(&[
                ("keyword", keyword),
                ("search_type", "video"),
                ("page", "1"),
                ("pagesize", PAGE_SIZE),
            ])
            // The API rejects requests without browser-looking headers
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Referer", "https://www.bilibili.com/")
            .header("Origin", "https://www.bilibili.com")
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, SERVICE_NAME))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_status(status, &body, SERVICE_NAME).into());
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, SERVICE_NAME))?;

        Ok(body
            .data
            .map(|d| d.result)
            .unwrap_or_default()
            .into_iter()
            .filter(|group| group.result_type == "video")
            .flat_map(|group| group.data)
            .collect())
    }
}

struct SearchPlan {
    search_query: String,
    tags: Vec<String>,
}

/// Build the search keyword and up to three recommended tags from the
/// learner's tags.
fn build_search_plan(user_tags: &[String]) -> SearchPlan {
    let search_query = user_tags.join(" ");

    let mut tags: Vec<String> = Vec::new();
    for tag in user_tags {
        let lower = tag.to_lowercase();
        if lower.contains("sport") || tag.contains("运动") {
            tags.extend(["运动", "健身", "训练"].map(String::from));
        } else if lower.contains("music") || tag.contains("音乐") {
            tags.extend(["音乐", "歌曲", "演奏"].map(String::from));
        } else if lower.contains("cook") || tag.contains("烹饪") {
            tags.extend(["烹饪", "美食", "料理"].map(String::from));
        } else {
            tags.push(tag.clone());
        }
    }
    tags.truncate(3);

    SearchPlan { search_query, tags }
}

fn normalize_videos(raw: Vec<RawVideo>, recommended_tags: &[String]) -> Vec<VideoInfo> {
    raw.into_iter()
        .map(|video| {
            let mut tags: Vec<String> = video
                .tag
                .split(',')
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
            tags.extend(recommended_tags.iter().take(2).cloned());

            VideoInfo {
                url: format!("https://www.bilibili.com/video/{}", video.bvid),
                id: video.bvid,
                title: strip_keyword_markup(&video.title),
                cover: normalize_cover_url(&video.pic),
                duration: video.duration,
                play_count: video.play,
                up: video.author,
                tags,
            }
        })
        .collect()
}

/// Search results highlight the keyword with `<em>` markup inside titles.
fn strip_keyword_markup(title: &str) -> String {
    title
        .replace("<em class=\"keyword\">", "")
        .replace("</em>", "")
}

/// Cover URLs arrive protocol-relative or plain http; serve https only.
fn normalize_cover_url(pic: &str) -> String {
    if let Some(rest) = pic.strip_prefix("//") {
        format!("https://{rest}")
    } else if let Some(rest) = pic.strip_prefix("http://") {
        format!("https://{rest}")
    } else {
        pic.to_string()
    }
}

// Search API response types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    result: Vec<SearchGroup>,
}

#[derive(Debug, Deserialize)]
struct SearchGroup {
    #[serde(default)]
    result_type: String,
    #[serde(default)]
    data: Vec<RawVideo>,
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    #[serde(default)]
    bvid: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    pic: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    play: u64,
    #[serde(default)]
    author: String,
    #[serde(default)]
    tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_plan_joins_tags_into_query() {
        let plan = build_search_plan(&["kettle".to_string(), "kitchen".to_string()]);
        assert_eq!(plan.search_query, "kettle kitchen");
        assert_eq!(plan.tags, vec!["kettle", "kitchen"]);
    }

    #[test]
    fn test_search_plan_maps_known_categories() {
        let plan = build_search_plan(&["sports day".to_string()]);
        assert_eq!(plan.tags, vec!["运动", "健身", "训练"]);

        let plan = build_search_plan(&["音乐".to_string()]);
        assert_eq!(plan.tags, vec!["音乐", "歌曲", "演奏"]);
    }

    #[test]
    fn test_search_plan_caps_at_three_tags() {
        let tags: Vec<String> = ["a", "b", "c", "d", "e"].map(String::from).to_vec();
        let plan = build_search_plan(&tags);
        assert_eq!(plan.tags.len(), 3);
    }

    #[test]
    fn test_cover_url_forced_to_https() {
        assert_eq!(
            normalize_cover_url("//i0.hdslb.com/cover.jpg"),
            "https://i0.hdslb.com/cover.jpg"
        );
        assert_eq!(
            normalize_cover_url("http://i0.hdslb.com/cover.jpg"),
            "https://i0.hdslb.com/cover.jpg"
        );
        assert_eq!(
            normalize_cover_url("https://i0.hdslb.com/cover.jpg"),
            "https://i0.hdslb.com/cover.jpg"
        );
    }

    #[test]
    fn test_title_markup_stripped() {
        assert_eq!(
            strip_keyword_markup("learn <em class=\"keyword\">cooking</em> fast"),
            "learn cooking fast"
        );
    }

    #[test]
    fn test_search_response_shape_parses_and_normalizes() {
        let raw = r#"{
            "data": {
                "result": [
                    {"result_type": "media_bangumi", "data": []},
                    {"result_type": "video", "data": [{
                        "bvid": "BV1xx411c7mD",
                        "title": "<em class=\"keyword\">kettle</em> basics",
                        "pic": "//i0.hdslb.com/cover.jpg",
                        "duration": "12:34",
                        "play": 4321,
                        "author": "someone",
                        "tag": "cooking,kitchen"
                    }]}
                ]
            }
        }"#;
        let body: SearchResponse = serde_json::from_str(raw).unwrap();
        let raw_videos: Vec<RawVideo> = body
            .data
            .unwrap()
            .result
            .into_iter()
            .filter(|g| g.result_type == "video")
            .flat_map(|g| g.data)
            .collect();
        assert_eq!(raw_videos.len(), 1);

        let videos = normalize_videos(raw_videos, &["美食".to_string()]);
        assert_eq!(videos[0].id, "BV1xx411c7mD");
        assert_eq!(videos[0].title, "kettle basics");
        assert_eq!(videos[0].cover, "https://i0.hdslb.com/cover.jpg");
        assert_eq!(videos[0].url, "https://www.bilibili.com/video/BV1xx411c7mD");
        assert_eq!(videos[0].tags, vec!["cooking", "kitchen", "美食"]);
    }

    #[test]
    fn test_empty_body_yields_no_videos() {
        let body: SearchResponse = serde_json::from_str(r#"{"code": -412}"#).unwrap();
        assert!(body.data.is_none());
    }
}
