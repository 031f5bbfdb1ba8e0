//! Per-animation asset locations.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{PlayerError, Result};

/// Raw configuration read from a container (`data-id`, `data-base-path`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAttributes {
    pub id: Option<String>,
    pub base_path: Option<String>,
}

impl ContainerAttributes {
    pub fn new(id: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            base_path: Some(base_path.into()),
        }
    }
}

/// Validated identifier and base path of one animation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSource {
    pub id: String,
    pub base_path: String,
}

fn required(value: &Option<String>, field: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(PlayerError::MissingConfig {
            field: field.to_string(),
        }),
    }
}

impl AnimationSource {
    pub fn from_attributes(attrs: &ContainerAttributes) -> Result<Self> {
        Ok(Self {
            id: required(&attrs.id, "data-id")?,
            base_path: required(&attrs.base_path, "data-base-path")?,
        })
    }

    fn asset(&self, file: &str) -> String {
        if self.base_path.ends_with('/') {
            format!("{}{}", self.base_path, file)
        } else {
            format!("{}/{}", self.base_path, file)
        }
    }

    pub fn preview_path(&self, config: &Config) -> String {
        self.asset(&config.preview_file)
    }

    pub fn sprite_path(&self, config: &Config) -> String {
        self.asset(&config.sprite_file)
    }

    pub fn timeline_path(&self, config: &Config) -> String {
        self.asset(&config.timeline_file)
    }

    /// Name of the binding the timeline script declares (`<id>_timeline`).
    pub fn timeline_binding(&self) -> String {
        format!("{}_timeline", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_asset_paths() {
        let source =
            AnimationSource::from_attributes(&ContainerAttributes::new("wave", "assets/wave"))
                .unwrap();
        let config = Config::default();
        assert_eq!(source.sprite_path(&config), "assets/wave/sprite.svg");
        assert_eq!(source.preview_path(&config), "assets/wave/preview.svg");
        assert_eq!(source.timeline_path(&config), "assets/wave/timeline.js");
        assert_eq!(source.timeline_binding(), "wave_timeline");

        let slash =
            AnimationSource::from_attributes(&ContainerAttributes::new("wave", "/a/")).unwrap();
        assert_eq!(slash.sprite_path(&config), "/a/sprite.svg");
    }

    #[test]
    fn missing_or_blank_fields_are_rejected() {
        let err = AnimationSource::from_attributes(&ContainerAttributes {
            id: None,
            base_path: Some("x".into()),
        })
        .unwrap_err();
        assert_eq!(
            err,
            PlayerError::MissingConfig {
                field: "data-id".into()
            }
        );

        let err = AnimationSource::from_attributes(&ContainerAttributes::new("a", "  "))
            .unwrap_err();
        assert_eq!(err.category(), "config");
    }
}
