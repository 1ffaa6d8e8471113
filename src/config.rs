//! Frame graph configuration.

/// Configuration for a single frame graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGraphConfig {
    /// Label used to prefix log output of this graph.
    pub label: String,
    /// Cull passes that contribute nothing to a presented resource or side
    /// effect. Disable to keep every declared pass while debugging.
    pub culling: bool,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self {
            label: "frame".to_string(),
            culling: true,
        }
    }
}

impl FrameGraphConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Enable or disable pass culling.
    pub fn with_culling(mut self, culling: bool) -> Self {
        self.culling = culling;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FrameGraphConfig::default();
        assert_eq!(config.label, "frame");
        assert!(config.culling);
    }

    #[test]
    fn test_builder_methods() {
        let config = FrameGraphConfig::new()
            .with_label("shadow_frame")
            .with_culling(false);
        assert_eq!(config.label, "shadow_frame");
        assert!(!config.culling);
    }
}
