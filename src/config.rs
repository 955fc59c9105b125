use serde::{Deserialize, Serialize};

use crate::camera::Dimension;
use crate::color::Color;
use crate::error::{RendererError, Result};
use crate::render::ShaderBindings;

/// Construction-time settings for a [`crate::Renderer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub dimension: Dimension,
    pub width: u32,
    pub height: u32,
    pub background: Color,
    /// Element id of the container; the document root is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    pub bindings: ShaderBindings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            dimension: Dimension::Three,
            width: 800,
            height: 600,
            background: Color::BLACK,
            container_id: None,
            bindings: ShaderBindings::default(),
        }
    }
}

impl RendererConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source)
            .map_err(|err| RendererError::Configuration(format!("invalid renderer config: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_keep_defaults() {
        let config = RendererConfig::from_json(r#"{ "width": 320, "dimension": 2 }"#).unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 600);
        assert_eq!(config.dimension, Dimension::Two);
        assert_eq!(config.background, Color::BLACK);
        assert_eq!(config.container_id, None);
        assert_eq!(config.bindings, ShaderBindings::default());
    }

    #[test]
    fn partial_bindings_keep_default_names() {
        let config =
            RendererConfig::from_json(r#"{ "bindings": { "view_uniform": "u_camera" } }"#).unwrap();
        assert_eq!(config.bindings.view_uniform, "u_camera");
        assert_eq!(config.bindings.position_attribute, "a_position");
    }

    #[test]
    fn dimension_is_encoded_as_a_number() {
        let config = RendererConfig {
            container_id: Some("stage".to_string()),
            background: Color::WHITE,
            ..RendererConfig::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["dimension"], 3);
        assert_eq!(json["container_id"], "stage");
        assert_eq!(RendererConfig::from_json(&json.to_string()).unwrap(), config);

        let defaults = serde_json::to_value(RendererConfig::default()).unwrap();
        assert!(defaults.get("container_id").is_none());
    }

    #[test]
    fn unsupported_dimension_is_rejected() {
        let err = RendererConfig::from_json(r#"{ "dimension": 4 }"#).unwrap_err();
        assert!(matches!(err, RendererError::Configuration(ref message) if message.contains("dimension 4")));
    }
}
