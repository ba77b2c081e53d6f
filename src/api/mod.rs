use serde::Serialize;

use crate::core::message::{ContentPart, TranscriptEntry};

pub mod error;
pub mod models;
pub mod transport;

#[derive(Serialize)]
pub struct ChatRequestBody<'a> {
    pub model: &'a str,
    pub messages: Vec<ApiMessage>,
    pub stream: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ApiMessage {
    pub role: &'static str,
    pub content: ApiContent,
}

/// Plain string for text-only messages, a part list once images are involved.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ApiContent {
    Text(String),
    Parts(Vec<ApiContentPart>),
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiContentPart {
    Text { text: String },
    ImageUrl { image_url: ApiImageUrl },
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ApiImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<&'static str>,
}

impl From<&ContentPart> for ApiContentPart {
    fn from(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => ApiContentPart::Text { text: text.clone() },
            ContentPart::ImageReference { url, detail } => ApiContentPart::ImageUrl {
                image_url: ApiImageUrl {
                    url: url.clone(),
                    detail: detail.map(|detail| detail.as_str()),
                },
            },
        }
    }
}

impl From<&TranscriptEntry> for ApiMessage {
    fn from(entry: &TranscriptEntry) -> Self {
        let content = match entry.content.as_slice() {
            [ContentPart::Text(text)] => ApiContent::Text(text.clone()),
            parts => ApiContent::Parts(parts.iter().map(ApiContentPart::from).collect()),
        };
        ApiMessage {
            role: entry.role.as_str(),
            content,
        }
    }
}

impl<'a> ChatRequestBody<'a> {
    pub fn streaming(model: &'a str, messages: &[TranscriptEntry]) -> Self {
        Self {
            model,
            messages: messages.iter().map(ApiMessage::from).collect(),
            stream: true,
        }
    }
}
