//! Central error handling for the line renderer
//!
//! Provides a unified RenderError enum with consistent categorization
//! across atlas packing, style loading, buffer upload and drawing.

/// Centralized error type for all renderer operations
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Device error: {0}")]
    Device(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Atlas full: cannot place {width}x{height} sprite in {max_size}x{max_size} atlas")]
    AtlasFull { width: u32, height: u32, max_size: u32 },

    #[error("Index overflow: {vertex_count} vertices exceed the 16-bit index limit of {limit}")]
    IndexOverflow { vertex_count: usize, limit: usize },

    #[error("Style error: {0}")]
    Style(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    /// Short category prefix used in log lines
    pub fn category(&self) -> &'static str {
        match self {
            RenderError::Device(_) => "Device",
            RenderError::Upload(_) => "Upload",
            RenderError::Render(_) => "Render",
            RenderError::AtlasFull { .. } => "Atlas",
            RenderError::IndexOverflow { .. } => "Upload",
            RenderError::Style(_) => "Style",
            RenderError::Resource(_) => "Resource",
            RenderError::Config(_) => "Config",
            RenderError::Io(_) => "IO",
            RenderError::Json(_) => "JSON",
        }
    }

    /// Convenience constructors for common error types
    pub fn device<T: ToString>(msg: T) -> Self {
        RenderError::Device(msg.to_string())
    }

    pub fn upload<T: ToString>(msg: T) -> Self {
        RenderError::Upload(msg.to_string())
    }

    pub fn render<T: ToString>(msg: T) -> Self {
        RenderError::Render(msg.to_string())
    }

    pub fn style<T: ToString>(msg: T) -> Self {
        RenderError::Style(msg.to_string())
    }

    pub fn resource<T: ToString>(msg: T) -> Self {
        RenderError::Resource(msg.to_string())
    }
}

/// Result type alias for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(RenderError::upload("x").category(), "Upload");
        assert_eq!(
            RenderError::IndexOverflow { vertex_count: 70_000, limit: 65_536 }.category(),
            "Upload"
        );
        assert_eq!(
            RenderError::AtlasFull { width: 10, height: 10, max_size: 8 }.category(),
            "Atlas"
        );
    }

    #[test]
    fn test_messages() {
        let err = RenderError::IndexOverflow { vertex_count: 70_000, limit: 65_536 };
        assert!(err.to_string().contains("70000 vertices"));

        let err = RenderError::style("lineWidth must be > 0");
        assert_eq!(err.to_string(), "Style error: lineWidth must be > 0");
    }
}
