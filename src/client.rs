//! Rate-limited remote client for curriculum and caption lookups.
//!
//! The pipeline talks to the remote service through the
//! [`CurriculumSource`] trait so the transport can be swapped out in
//! tests. [`UdemyClient`] is the real implementation: every call is
//! preceded by a randomized delay (a deliberate throttle to avoid
//! tripping abuse protection, not a retry mechanism), and no retries
//! are performed here; the caller decides what a failure means.

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::RemoteConfig;
use crate::error::{Error, RemoteError, Result};
use crate::types::{CourseContext, CourseId, ItemId, ItemKind, WorkItem};

/// Source of curriculum and transcript data
///
/// Implemented by [`UdemyClient`] for the real service; tests plug in
/// their own implementation.
#[async_trait]
pub trait CurriculumSource: Send + Sync {
    /// Fetch the ordered curriculum for a course
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] on a non-success response or transport
    /// failure. A curriculum failure is fatal to run initialization.
    async fn fetch_curriculum(&self, course: CourseId) -> Result<Vec<WorkItem>>;

    /// Fetch the raw caption document for one lecture
    ///
    /// Returns `Ok(None)` when the lecture legitimately has no usable
    /// transcript: non-success response, no captions, no English track,
    /// or a caption-file download failure. Errors are reserved for
    /// unexpected transport/decode failures on the lecture request
    /// itself; the processing loop isolates those per item.
    async fn fetch_transcript(&self, course: CourseId, lecture: ItemId) -> Result<Option<String>>;
}

/// Source of the course identity for the current session
///
/// The embedding application knows which course it is operating on
/// (from a page, a CLI argument, a saved session); the pipeline asks
/// this trait at initialization time.
pub trait ContextSource: Send + Sync {
    /// Resolve the current course identity
    ///
    /// # Errors
    ///
    /// Returns [`Error::Context`] when the calling context does not
    /// correspond to a valid course session.
    fn course_context(&self) -> Result<CourseContext>;
}

/// A [`ContextSource`] with a fixed course identity
pub struct StaticContext {
    context: CourseContext,
}

impl StaticContext {
    /// Create a context source that always resolves to the given course
    pub fn new(course_id: impl Into<CourseId>, course_title: impl Into<String>) -> Self {
        Self {
            context: CourseContext {
                course_id: course_id.into(),
                course_title: course_title.into(),
            },
        }
    }
}

impl ContextSource for StaticContext {
    fn course_context(&self) -> Result<CourseContext> {
        Ok(self.context.clone())
    }
}

/// HTTP client for the Udemy subscriber API
pub struct UdemyClient {
    /// Underlying HTTP client
    http: reqwest::Client,
    /// Parsed base URL of the remote service
    base: Url,
    /// Remote settings (paging, throttle window)
    config: RemoteConfig,
}

impl UdemyClient {
    /// Create a new client from remote configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the base URL does not parse and
    /// [`RemoteError`] when the HTTP client cannot be constructed.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", config.base_url, e),
            key: Some("remote.base_url".to_string()),
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("lecture-dl")
            .build()
            .map_err(RemoteError::Http)?;

        Ok(Self {
            http,
            base,
            config: config.clone(),
        })
    }

    /// Wait a uniformly random amount of time inside the throttle window
    async fn throttle(&self) {
        let delay_ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.config.throttle_min_ms..=self.config.throttle_max_ms)
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

#[async_trait]
impl CurriculumSource for UdemyClient {
    async fn fetch_curriculum(&self, course: CourseId) -> Result<Vec<WorkItem>> {
        let url = self
            .base
            .join(&format!(
                "api-2.0/courses/{}/subscriber-curriculum-items/",
                course
            ))
            .map_err(|e| RemoteError::MalformedResponse(format!("invalid curriculum URL: {}", e)))?;

        self.throttle().await;

        let page_size = self.config.page_size.to_string();
        let response = self
            .http
            .get(url)
            .query(&[
                ("curriculum_types", "chapter,lecture,quiz"),
                ("page_size", page_size.as_str()),
                ("fields[lecture]", "title,asset"),
                ("fields[chapter]", "title"),
            ])
            .send()
            .await
            .map_err(RemoteError::Http)?;

        if !response.status().is_success() {
            return Err(RemoteError::CurriculumStatus {
                status: response.status().as_u16(),
            }
            .into());
        }

        let page: CurriculumPage = response.json().await.map_err(RemoteError::Http)?;
        tracing::debug!(course_id = %course, items = page.results.len(), "curriculum fetched");

        Ok(page.results.into_iter().map(map_item).collect())
    }

    async fn fetch_transcript(&self, course: CourseId, lecture: ItemId) -> Result<Option<String>> {
        let url = self
            .base
            .join(&format!(
                "api-2.0/users/me/subscribed-courses/{}/lectures/{}/",
                course, lecture
            ))
            .map_err(|e| RemoteError::MalformedResponse(format!("invalid lecture URL: {}", e)))?;

        self.throttle().await;

        let response = self
            .http
            .get(url)
            .query(&[("fields[lecture]", "asset"), ("fields[asset]", "captions")])
            .send()
            .await
            .map_err(RemoteError::Http)?;

        if !response.status().is_success() {
            // Likely no access, or not a video lecture
            tracing::debug!(lecture_id = %lecture, status = %response.status(), "no transcript available");
            return Ok(None);
        }

        let payload: LecturePayload = response.json().await.map_err(RemoteError::Http)?;

        let Some(tracks) = payload.asset.and_then(|asset| asset.captions) else {
            return Ok(None);
        };

        let Some(track_url) = tracks
            .iter()
            .find(|track| {
                track.locale_id.as_deref() == Some("en_US")
                    || track.language.as_deref() == Some("en")
            })
            .and_then(|track| track.url.clone())
        else {
            return Ok(None);
        };

        // Caption-file failures of any kind count as "no transcript"
        match self.http.get(track_url).send().await {
            Ok(caption_response) if caption_response.status().is_success() => {
                match caption_response.text().await {
                    Ok(text) => Ok(Some(text)),
                    Err(e) => {
                        tracing::debug!(lecture_id = %lecture, error = %e, "caption body read failed");
                        Ok(None)
                    }
                }
            }
            Ok(caption_response) => {
                tracing::debug!(lecture_id = %lecture, status = %caption_response.status(), "caption fetch rejected");
                Ok(None)
            }
            Err(e) => {
                tracing::debug!(lecture_id = %lecture, error = %e, "caption fetch failed");
                Ok(None)
            }
        }
    }
}

/// One page of the curriculum endpoint
#[derive(Debug, Deserialize)]
struct CurriculumPage {
    #[serde(default)]
    results: Vec<RawCurriculumItem>,
}

/// Curriculum item as the remote reports it
#[derive(Debug, Deserialize)]
struct RawCurriculumItem {
    #[serde(rename = "_class")]
    class: String,
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    sort_order: i64,
    #[serde(default)]
    asset: Option<RawAsset>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    #[serde(default)]
    asset_type: String,
}

/// Lecture detail payload carrying the caption list
#[derive(Debug, Deserialize)]
struct LecturePayload {
    #[serde(default)]
    asset: Option<CaptionAsset>,
}

#[derive(Debug, Deserialize)]
struct CaptionAsset {
    #[serde(default)]
    captions: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(default)]
    locale_id: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Map a raw remote item to the internal work item
fn map_item(raw: RawCurriculumItem) -> WorkItem {
    let kind = ItemKind::from_class(&raw.class);
    let has_video_asset = kind == ItemKind::Lecture
        && raw
            .asset
            .as_ref()
            .is_some_and(|asset| asset.asset_type == "Video");

    WorkItem {
        kind,
        id: ItemId(raw.id),
        title: raw.title,
        ordinal: raw.sort_order,
        has_video_asset,
        completed: false,
        content: None,
    }
}
