use serde::{Deserialize, Serialize};

pub const DEFAULT_DECK_NAME: &str = "My Deck";
pub const DECK_FILE_EXTENSION: &str = "apkg";

/// One question/answer flashcard candidate.
///
/// Cards carry no identity; a card is addressed by its position in the
/// collection that holds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Opaque image references produced by the extraction service.
    #[serde(default)]
    pub images: Vec<String>,
}

impl Card {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            tags: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images = images.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_field(&mut self, field: CardField, value: String) {
        match field {
            CardField::Front => self.front = value,
            CardField::Back => self.back = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardField {
    Front,
    Back,
}

impl CardField {
    pub fn as_str(self) -> &'static str {
        match self {
            CardField::Front => "front",
            CardField::Back => "back",
        }
    }
}

impl std::str::FromStr for CardField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "front" | "q" | "question" => Ok(CardField::Front),
            "back" | "a" | "answer" => Ok(CardField::Back),
            other => Err(format!("unknown card field '{other}' (expected front or back)")),
        }
    }
}

impl std::fmt::Display for CardField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
