use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::services::{CreateRequest, CreateResponse};
use crate::domain::entities::{GenerationRequest, RequestPatch};
use crate::domain::value_objects::GeneratedArticle;

// Missing fields deserialize as empty strings so they surface as validation
// errors rather than body rejections.
#[derive(Debug, Deserialize)]
pub struct CreateRequestDto {
    #[serde(default)]
    pub user_query: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub userid: String,
}

#[derive(Debug, Serialize)]
pub struct CreateResponseDto {
    pub request_id: Uuid,
    pub status: String,
    pub estimated_completion_time_minutes: f64,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequestDto {
    pub model: Option<String>,
    pub user_query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArticleDto {
    pub title: String,
    pub slug: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct RequestDto {
    pub request_id: Uuid,
    pub user_query: String,
    pub model: String,
    pub name: String,
    pub userid: String,
    pub status: String,
    pub created_at: String,
    pub claimed_at: Option<String>,
    pub completed_at: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub articles: Vec<ArticleDto>,
}

impl From<CreateRequestDto> for CreateRequest {
    fn from(dto: CreateRequestDto) -> Self {
        Self {
            user_query: dto.user_query,
            model: dto.model,
            name: dto.name,
            userid: dto.userid,
        }
    }
}

impl From<CreateResponse> for CreateResponseDto {
    fn from(response: CreateResponse) -> Self {
        Self {
            request_id: response.request_id,
            status: response.status.label().to_string(),
            estimated_completion_time_minutes: response.estimated_completion_time_minutes,
            message: response.message,
        }
    }
}

impl From<UpdateRequestDto> for RequestPatch {
    fn from(dto: UpdateRequestDto) -> Self {
        Self {
            model: dto.model,
            user_query: dto.user_query,
        }
    }
}

impl From<GeneratedArticle> for ArticleDto {
    fn from(article: GeneratedArticle) -> Self {
        Self {
            title: article.title,
            slug: article.slug,
            content: article.content,
        }
    }
}

impl From<GenerationRequest> for RequestDto {
    fn from(request: GenerationRequest) -> Self {
        Self {
            request_id: request.id(),
            articles: request.articles().into_iter().map(ArticleDto::from).collect(),
            user_query: request.user_query().to_string(),
            model: request.model().to_string(),
            name: request.name().to_string(),
            userid: request.userid().to_string(),
            status: request.status().label().to_string(),
            created_at: request.created_at().to_rfc3339(),
            claimed_at: request.claimed_at().map(|t| t.to_rfc3339()),
            completed_at: request.completed_at().map(|t| t.to_rfc3339()),
            result: request.result().map(str::to_string),
            error: request.error().map(str::to_string),
        }
    }
}
