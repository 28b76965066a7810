use serde::{Deserialize, Serialize};

/// Role in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message sent to the generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

/// A passage stored in the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// The sample passages seeded into a fresh knowledge base.
    pub fn default_corpus() -> Vec<Document> {
        vec![
            Document::new(
                "doc1",
                "The first rule of Fight Club is: you do not talk about Fight Club.",
            ),
            Document::new(
                "doc2",
                "The second rule of Fight Club is: you DO NOT talk about Fight Club!",
            ),
            Document::new(
                "doc3",
                "The sky above the port was the color of television, tuned to a dead channel.",
            ),
            Document::new(
                "doc4",
                "It was a bright cold day in April, and the clocks were striking thirteen.",
            ),
        ]
    }
}
