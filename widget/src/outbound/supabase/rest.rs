//! Row access through the PostgREST endpoint.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::ACCEPT;

use super::SupabaseClient;
use super::dto::{FeedbackInsertDto, FeedbackRowDto, FeedbackUpdateDto, ProfileRowDto, TrackingIdRowDto};
use crate::domain::ports::{BackendError, FeedbackRepository, ProfileRepository};
use crate::domain::{
    FeedbackId, FeedbackInsert, FeedbackRecord, FeedbackUpdate, Profile, TrackingId, UserId,
};

const FEEDBACKS: &str = "rest/v1/feedbacks";
const PROFILES: &str = "rest/v1/profiles";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[async_trait]
impl FeedbackRepository for SupabaseClient {
    async fn insert(&self, row: &FeedbackInsert) -> Result<Option<TrackingId>, BackendError> {
        let url = self.endpoint(&format!("{FEEDBACKS}?select=tracking_id"))?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&FeedbackInsertDto::from(row));
        let body = self.send(request).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let echoed: TrackingIdRowDto = serde_json::from_slice(&body)
            .map_err(|error| BackendError::decode(format!("invalid insert response: {error}")))?;
        Ok(echoed
            .tracking_id
            .filter(|id| !id.is_empty())
            .map(TrackingId::new))
    }

    async fn list_newest_first(&self) -> Result<Vec<FeedbackRecord>, BackendError> {
        let url = self.endpoint(&format!("{FEEDBACKS}?select=*&order=created_at.desc"))?;
        let rows: Vec<FeedbackRowDto> = self.send_json(self.request(Method::GET, url)).await?;
        Ok(rows.into_iter().map(FeedbackRecord::from).collect())
    }

    async fn update(&self, id: FeedbackId, update: &FeedbackUpdate) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("{FEEDBACKS}?id=eq.{id}"))?;
        let request = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=minimal")
            .json(&FeedbackUpdateDto::from(update));
        self.send(request).await.map(drop)
    }

    async fn delete(&self, id: FeedbackId) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("{FEEDBACKS}?id=eq.{id}"))?;
        self.send(self.request(Method::DELETE, url)).await.map(drop)
    }

    async fn probe(&self) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("{FEEDBACKS}?select=id&limit=1"))?;
        self.send(self.request(Method::GET, url)).await.map(drop)
    }
}

#[async_trait]
impl ProfileRepository for SupabaseClient {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Profile>, BackendError> {
        let url = self.endpoint(&format!("{PROFILES}?select=id,role&id=eq.{user_id}"))?;
        let rows: Vec<ProfileRowDto> = self.send_json(self.request(Method::GET, url)).await?;
        Ok(rows.into_iter().next().map(Profile::from))
    }
}
