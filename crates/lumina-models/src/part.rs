//! Classified, renderable media parts.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::MessageKind;

/// Detected layout orientation of a source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Width >= height, or detection failed
    #[default]
    Horizontal,
    /// Height > width
    Vertical,
}

impl Orientation {
    /// Classify from pixel dimensions.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height > width {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Orientation::Vertical)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

/// The renderable unit derived from one contributor message.
///
/// Parts own local scratch files (downloaded media, pre-rendered slides);
/// they are scoped to a single job run and never serialized.
#[derive(Debug, Clone)]
pub enum MediaPart {
    /// A text tribute rendered onto a slide image.
    Text {
        /// Pre-rendered slide image
        slide: PathBuf,
    },
    /// An audio tribute played over a static slide image.
    Audio {
        /// Pre-rendered slide image
        slide: PathBuf,
        /// Downloaded audio file
        audio: PathBuf,
    },
    /// A video tribute overlaid on an info slide.
    Video {
        /// Downloaded video file
        file: PathBuf,
        /// Detected source orientation (horizontal when detection fails)
        orientation: Orientation,
        /// Contributor name, needed for the info slide rendered at segment time
        contributor_name: String,
    },
}

impl MediaPart {
    /// The message kind this part was derived from.
    pub fn kind(&self) -> MessageKind {
        match self {
            MediaPart::Text { .. } => MessageKind::Text,
            MediaPart::Audio { .. } => MessageKind::Audio,
            MediaPart::Video { .. } => MessageKind::Video,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_from_dimensions() {
        assert_eq!(Orientation::from_dimensions(1920, 1080), Orientation::Horizontal);
        assert_eq!(Orientation::from_dimensions(1080, 1920), Orientation::Vertical);
        // Square counts as horizontal
        assert_eq!(Orientation::from_dimensions(1080, 1080), Orientation::Horizontal);
    }

    #[test]
    fn orientation_defaults_horizontal() {
        assert_eq!(Orientation::default(), Orientation::Horizontal);
        assert!(!Orientation::default().is_vertical());
    }
}
