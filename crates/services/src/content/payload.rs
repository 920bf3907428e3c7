//! Wire shapes of the content service. These never leave the loader.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Explicit discriminator for the lesson payload generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    /// Pre-structured slide list.
    #[serde(alias = "v2", alias = "structured")]
    Slides,
    /// Keyed do / do-not / checklist / reflection sections.
    #[serde(alias = "keyed")]
    Sections,
    /// Legacy flat bullet list, grouped into slides on load.
    #[serde(alias = "v1", alias = "legacy", alias = "flat")]
    Points,
}

impl ContentFormat {
    /// Fallback order when the preferred source is absent or empty.
    pub(crate) const FALLBACK: [ContentFormat; 3] = [
        ContentFormat::Slides,
        ContentFormat::Sections,
        ContentFormat::Points,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentFormat::Slides => "slides",
            ContentFormat::Sections => "sections",
            ContentFormat::Points => "points",
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slides" | "v2" | "structured" => Ok(Self::Slides),
            "sections" | "keyed" => Ok(Self::Sections),
            "points" | "v1" | "legacy" | "flat" => Ok(Self::Points),
            other => Err(format!("unknown content format: {other}")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawActivity {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub pass_threshold: Option<u32>,
    #[serde(flatten)]
    pub body: RawBody,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum RawBody {
    Lesson(RawLesson),
    Quiz(RawQuiz),
    Puzzle(RawPuzzle),
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawLesson {
    #[serde(default)]
    pub format: Option<ContentFormat>,
    #[serde(default)]
    pub slides: Vec<RawSlide>,
    #[serde(default)]
    pub sections: RawSections,
    #[serde(default)]
    pub points: Vec<String>,
    #[serde(default)]
    pub slide_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSlide {
    #[serde(default, alias = "heading")]
    pub title: Option<String>,
    #[serde(default, alias = "bullets")]
    pub points: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSections {
    #[serde(default, rename = "do")]
    pub dos: Vec<String>,
    #[serde(default, rename = "dont", alias = "do_not")]
    pub donts: Vec<String>,
    #[serde(default)]
    pub checklist: Vec<String>,
    #[serde(default)]
    pub reflection: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQuiz {
    #[serde(default)]
    pub questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQuestion {
    pub id: String,
    #[serde(alias = "question", alias = "text")]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawOption {
    pub id: String,
    #[serde(alias = "label")]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPuzzle {
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawStep {
    pub id: String,
    pub text: String,
}
