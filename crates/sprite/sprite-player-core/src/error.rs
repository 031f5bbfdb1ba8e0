//! Error types for the sprite player

use serde::{Deserialize, Serialize};

pub type Result<T> = core::result::Result<T, PlayerError>;

/// Failures surfaced while discovering, loading, or mounting an animation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PlayerError {
    /// Container is missing its identifier or asset base path
    #[error("Missing animation configuration: {field}")]
    MissingConfig { field: String },

    /// Preview asset could not be fetched or shown
    #[error("Preview unavailable at {path}: {reason}")]
    PreviewFetch { path: String, reason: String },

    /// Sprite sheet could not be fetched
    #[error("Failed to fetch sprite {path}: {reason}")]
    SpriteFetch { path: String, reason: String },

    /// Timeline resource could not be fetched
    #[error("Failed to fetch timeline {path}: {reason}")]
    TimelineFetch { path: String, reason: String },

    /// Timeline resource holds no entry list for the animation
    #[error("Timeline {name} not found")]
    TimelineNotFound { name: String },

    /// Timeline entry list is malformed
    #[error("Timeline parse error: {reason}")]
    TimelineParse { reason: String },

    /// Markup could not be turned into render-tree nodes
    #[error("Render tree error: {reason}")]
    RenderTree { reason: String },

    /// Finished sprite could not be swapped into its container
    #[error("Mount failed: {reason}")]
    Mount { reason: String },
}

impl PlayerError {
    pub fn render_tree(reason: impl Into<String>) -> Self {
        Self::RenderTree {
            reason: reason.into(),
        }
    }

    /// Whether calling `init()` again may succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PreviewFetch { .. }
                | Self::SpriteFetch { .. }
                | Self::TimelineFetch { .. }
                | Self::Mount { .. }
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingConfig { .. } => "config",
            Self::PreviewFetch { .. } | Self::SpriteFetch { .. } | Self::TimelineFetch { .. } => {
                "network"
            }
            Self::TimelineNotFound { .. } | Self::TimelineParse { .. } => "timeline",
            Self::RenderTree { .. } | Self::Mount { .. } => "render",
        }
    }
}

impl From<serde_json::Error> for PlayerError {
    fn from(err: serde_json::Error) -> Self {
        Self::TimelineParse {
            reason: err.to_string(),
        }
    }
}
