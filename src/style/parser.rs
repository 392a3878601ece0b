//! Style sheet and GeoJSON feature collection loading.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::Deserialize;
use serde_json::Value;

use crate::error::RenderError;
use crate::style::types::{Feature, Properties, StyleRule};

/// Error type for style and feature parsing.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid style: {0}")]
    Invalid(String),
    #[error("Invalid feature {index}: {message}")]
    InvalidFeature { index: usize, message: String },
}

impl From<StyleError> for RenderError {
    fn from(err: StyleError) -> Self {
        match err {
            StyleError::Io(e) => RenderError::Io(e),
            StyleError::Json(e) => RenderError::Json(e),
            other => RenderError::Style(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StyleSheet {
    Wrapped { rules: Vec<StyleRule> },
    Bare(Vec<StyleRule>),
}

/// Parse a style sheet file.
pub fn parse_style(path: &Path) -> Result<Vec<StyleRule>, StyleError> {
    let content = fs::read_to_string(path)?;
    parse_style_str(&content)
}

/// Parse a style sheet from a JSON string.
///
/// Accepts `{"rules": [...]}` or a bare array of rules.
pub fn parse_style_str(json: &str) -> Result<Vec<StyleRule>, StyleError> {
    let sheet: StyleSheet = serde_json::from_str(json)?;
    let rules = match sheet {
        StyleSheet::Wrapped { rules } | StyleSheet::Bare(rules) => rules,
    };
    validate_rules(&rules)?;
    Ok(rules)
}

fn validate_rules(rules: &[StyleRule]) -> Result<(), StyleError> {
    for (i, rule) in rules.iter().enumerate() {
        rule.symbol
            .validate()
            .map_err(|msg| StyleError::Invalid(format!("rule {i}: {msg}")))?;
    }
    Ok(())
}

/// Parse a GeoJSON feature collection file.
pub fn parse_features(path: &Path) -> Result<Vec<Feature>, StyleError> {
    let content = fs::read_to_string(path)?;
    parse_features_str(&content)
}

/// Parse a GeoJSON `FeatureCollection` into line features.
///
/// `LineString` geometries map to one feature, `MultiLineString` to one per
/// part. Other geometry types are skipped.
pub fn parse_features_str(json: &str) -> Result<Vec<Feature>, StyleError> {
    let root: Value = serde_json::from_str(json)?;
    let kind = root.get("type").and_then(Value::as_str).map(str::to_string);
    let features = match kind.as_deref() {
        Some("FeatureCollection") => root
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| StyleError::Invalid("FeatureCollection without features".into()))?
            .clone(),
        Some("Feature") => vec![root],
        other => {
            return Err(StyleError::Invalid(format!(
                "expected a FeatureCollection, got {other:?}"
            )))
        }
    };

    let mut out = Vec::new();
    for (index, feature) in features.iter().enumerate() {
        let properties: Properties = match feature.get("properties") {
            Some(Value::Object(map)) => map.clone(),
            _ => Properties::new(),
        };
        let Some(geometry) = feature.get("geometry").filter(|g| !g.is_null()) else {
            log::debug!("feature {index} has no geometry, skipping");
            continue;
        };
        let kind = geometry.get("type").and_then(Value::as_str).unwrap_or("");
        let coords = geometry.get("coordinates");
        let invalid = |message: String| StyleError::InvalidFeature { index, message };

        match kind {
            "LineString" => {
                let points = parse_line(coords).map_err(invalid)?;
                out.push(Feature::new(points, properties));
            }
            "MultiLineString" => {
                let parts = coords
                    .and_then(Value::as_array)
                    .ok_or_else(|| invalid("MultiLineString coordinates must be an array".into()))?;
                for part in parts {
                    let points = parse_line(Some(part)).map_err(invalid)?;
                    out.push(Feature::new(points, properties.clone()));
                }
            }
            other => log::debug!("feature {index} has unsupported geometry {other:?}, skipping"),
        }
    }
    Ok(out)
}

fn parse_line(coords: Option<&Value>) -> Result<Vec<Vec2>, String> {
    let coords = coords
        .and_then(Value::as_array)
        .ok_or_else(|| "line coordinates must be an array".to_string())?;
    coords
        .iter()
        .map(|pos| {
            let pair = pos.as_array().filter(|p| p.len() >= 2);
            match pair.and_then(|p| Some((p[0].as_f64()?, p[1].as_f64()?))) {
                Some((x, y)) => Ok(Vec2::new(x as f32, y as f32)),
                None => Err(format!("invalid position {pos}")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::filter::FilterExpr;

    #[test]
    fn test_parse_wrapped_rules() {
        let json = r##"{
            "rules": [
                { "filter": ["==", "type", "road"],
                  "symbol": { "lineWidth": 8, "lineColor": "#ff0000", "lineDasharray": [10, 5] } },
                { "symbol": { "lineWidth": 2 } }
            ]
        }"##;
        let rules = parse_style_str(json).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].filter, FilterExpr::eq("type", "road"));
        assert_eq!(rules[0].symbol.line_color.rgba(), [1.0, 0.0, 0.0, 1.0]);
        // Missing filter matches everything
        assert_eq!(rules[1].filter, FilterExpr::Literal(true));
    }

    #[test]
    fn test_parse_bare_array() {
        let rules = parse_style_str(r#"[{"symbol": {"lineWidth": 3}}]"#).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].symbol.line_width, 3.0);
    }

    #[test]
    fn test_rejects_invalid_symbol() {
        let err = parse_style_str(r#"[{"symbol": {"lineWidth": 0}}]"#).unwrap_err();
        assert!(matches!(err, StyleError::Invalid(_)));
        assert!(err.to_string().contains("rule 0"));
    }

    #[test]
    fn test_rejects_bad_filter() {
        let err = parse_style_str(r#"[{"filter": ["~=", "a", 1], "symbol": {}}]"#).unwrap_err();
        assert!(matches!(err, StyleError::Json(_)));
    }

    #[test]
    fn test_parse_feature_collection() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "type": "road" },
                  "geometry": { "type": "LineString", "coordinates": [[0, 0], [10, 0]] } },
                { "type": "Feature", "properties": { "type": "river" },
                  "geometry": { "type": "MultiLineString",
                                "coordinates": [[[0, 1], [1, 1]], [[2, 2], [3, 3], [4, 3]]] } },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "Point", "coordinates": [0, 0] } }
            ]
        }"#;
        let features = parse_features_str(json).unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].points, vec![Vec2::ZERO, Vec2::new(10.0, 0.0)]);
        assert_eq!(features[2].points.len(), 3);
        assert_eq!(features[2].properties.get("type"), Some(&Value::from("river")));
    }

    #[test]
    fn test_bad_position_reports_feature() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[0, 0], ["x", 1]]}}
        ]}"#;
        let err = parse_features_str(json).unwrap_err();
        assert!(matches!(err, StyleError::InvalidFeature { index: 0, .. }));
    }

    #[test]
    fn test_style_error_into_render_error() {
        let err: RenderError = StyleError::Invalid("bad".into()).into();
        assert_eq!(err.category(), "Style");
    }
}
