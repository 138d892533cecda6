// Evaluation and response domain types
//
// An evaluation shares its identifier with the event it belongs to.

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A single questionnaire prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Question {
    pub text: String,
}

/// Questionnaire attached to one event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Evaluation {
    /// Same value as the owning event's ID
    pub id: String,
    #[serde(default)]
    pub rating: Vec<Question>,
    #[serde(default)]
    pub comment: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RatingAnswer {
    pub question: String,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CommentAnswer {
    pub question: String,
    pub answer: String,
}

/// One user's answers to an evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Response {
    pub id: String,
    pub evaluation_id: String,
    pub user_id: String,
    #[serde(default)]
    pub rating: Vec<RatingAnswer>,
    #[serde(default)]
    pub comment: Vec<CommentAnswer>,
}
