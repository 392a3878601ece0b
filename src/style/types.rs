//! Style rule, symbol and feature types.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::style::filter::FilterExpr;

/// Feature attribute map.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A line feature: an ordered point path plus its attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub points: Vec<Vec2>,
    pub properties: Properties,
}

impl Feature {
    pub fn new(points: Vec<Vec2>, properties: Properties) -> Self {
        Self { points, properties }
    }

    /// Set a single attribute, builder style.
    pub fn with_property(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

/// RGBA color in [0, 1], parsed from a CSS color string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const BLACK: Color = Color([0.0, 0.0, 0.0, 1.0]);

    pub fn rgba(&self) -> [f32; 4] {
        self.0
    }

    /// Straight-alpha 8-bit RGBA with an extra opacity multiplier on alpha.
    pub fn to_rgba8(&self, opacity: f32) -> [u8; 4] {
        let [r, g, b, a] = self.0;
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(r), q(g), q(b), q(a * opacity)]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_color_string(&s)
            .map(Color)
            .ok_or_else(|| format!("invalid color: {s:?}"))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        let [r, g, b, a] = c.0;
        format!(
            "rgba({}, {}, {}, {})",
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
            a
        )
    }
}

/// Line symbol: width, color, opacity and dash pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    #[serde(default = "Symbol::default_line_width")]
    pub line_width: f32,
    #[serde(default)]
    pub line_color: Color,
    #[serde(default = "Symbol::default_line_opacity")]
    pub line_opacity: f32,
    /// Alternating dash/gap lengths in pixels.
    #[serde(default)]
    pub line_dasharray: Vec<f32>,
    /// External image used as the line sprite instead of the dash pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_pattern_file: Option<String>,
}

impl Symbol {
    const fn default_line_width() -> f32 {
        1.0
    }

    const fn default_line_opacity() -> f32 {
        1.0
    }

    /// Reference symbol of the big-line layer. Not applied to features.
    pub fn fallback() -> Self {
        Self {
            line_width: 12.0,
            line_color: Color::BLACK,
            line_opacity: 1.0,
            line_dasharray: vec![20.0, 10.0, 30.0, 20.0],
            line_pattern_file: None,
        }
    }

    pub fn solid(line_width: f32, line_color: Color) -> Self {
        Self {
            line_width,
            line_color,
            ..Default::default()
        }
    }

    pub fn dashed(line_width: f32, dasharray: &[f32]) -> Self {
        Self {
            line_width,
            line_dasharray: dasharray.to_vec(),
            ..Default::default()
        }
    }

    /// Dash pattern to rasterize, or `None` when the line renders solid.
    ///
    /// Odd-length arrays are repeated once so dashes and gaps alternate.
    pub fn dash_pattern(&self) -> Option<Vec<f32>> {
        let dashes = &self.line_dasharray;
        if dashes.is_empty() || dashes.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return None;
        }
        let mut pattern = dashes.clone();
        if pattern.len() % 2 == 1 {
            pattern.extend_from_slice(dashes);
        }
        let total: f32 = pattern.iter().sum();
        let has_gap = pattern.iter().skip(1).step_by(2).any(|gap| *gap > 0.0);
        if total <= 0.0 || !has_gap {
            return None;
        }
        Some(pattern)
    }

    pub fn needs_texture(&self) -> bool {
        self.line_pattern_file.is_some() || self.dash_pattern().is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.line_width.is_finite() || self.line_width <= 0.0 {
            return Err(format!("lineWidth must be > 0, got {}", self.line_width));
        }
        if !(0.0..=1.0).contains(&self.line_opacity) {
            return Err(format!(
                "lineOpacity must be within [0, 1], got {}",
                self.line_opacity
            ));
        }
        if let Some(bad) = self
            .line_dasharray
            .iter()
            .find(|d| !d.is_finite() || **d < 0.0)
        {
            return Err(format!("lineDasharray entries must be >= 0, got {bad}"));
        }
        Ok(())
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Self {
            line_width: Self::default_line_width(),
            line_color: Color::BLACK,
            line_opacity: Self::default_line_opacity(),
            line_dasharray: Vec::new(),
            line_pattern_file: None,
        }
    }
}

/// A filter plus the symbol applied to features it matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    #[serde(default)]
    pub filter: FilterExpr,
    pub symbol: Symbol,
}

impl StyleRule {
    pub fn new(filter: FilterExpr, symbol: Symbol) -> Self {
        Self { filter, symbol }
    }
}

/// Parse a CSS color string to RGBA.
pub fn parse_color_string(s: &str) -> Option<[f32; 4]> {
    let s = s.trim();

    if s.starts_with('#') {
        return parse_hex_color(s);
    }

    if s.starts_with("rgb") {
        return parse_rgb_color(s);
    }

    if s.starts_with("hsl") {
        return parse_hsl_color(s);
    }

    match s.to_lowercase().as_str() {
        "black" => Some([0.0, 0.0, 0.0, 1.0]),
        "white" => Some([1.0, 1.0, 1.0, 1.0]),
        "red" => Some([1.0, 0.0, 0.0, 1.0]),
        "green" => Some([0.0, 0.5, 0.0, 1.0]),
        "blue" => Some([0.0, 0.0, 1.0, 1.0]),
        "yellow" => Some([1.0, 1.0, 0.0, 1.0]),
        "cyan" => Some([0.0, 1.0, 1.0, 1.0]),
        "magenta" => Some([1.0, 0.0, 1.0, 1.0]),
        "gray" | "grey" => Some([0.5, 0.5, 0.5, 1.0]),
        "orange" => Some([1.0, 0.647, 0.0, 1.0]),
        "transparent" => Some([0.0, 0.0, 0.0, 0.0]),
        _ => None,
    }
}

fn parse_hex_color(s: &str) -> Option<[f32; 4]> {
    let hex = s.trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| -> Option<f32> {
        let digits = &hex[range];
        let digits = if digits.len() == 1 {
            digits.repeat(2)
        } else {
            digits.to_string()
        };
        u8::from_str_radix(&digits, 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    match hex.len() {
        3 => Some([channel(0..1)?, channel(1..2)?, channel(2..3)?, 1.0]),
        4 => Some([channel(0..1)?, channel(1..2)?, channel(2..3)?, channel(3..4)?]),
        6 => Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, 1.0]),
        8 => Some([channel(0..2)?, channel(2..4)?, channel(4..6)?, channel(6..8)?]),
        _ => None,
    }
}

/// Comma-separated arguments of a CSS function such as `rgba(...)`.
fn css_args<'a>(s: &'a str, names: &[&str]) -> Option<Vec<&'a str>> {
    let inner = names
        .iter()
        .find_map(|name| s.strip_prefix(name)?.strip_prefix('('))?
        .strip_suffix(')')?;
    let args: Vec<&str> = inner.split(',').map(str::trim).collect();
    matches!(args.len(), 3 | 4).then_some(args)
}

fn alpha_arg(args: &[&str]) -> Option<f32> {
    match args.get(3) {
        Some(a) => a.parse::<f32>().ok().map(|a| a.clamp(0.0, 1.0)),
        None => Some(1.0),
    }
}

fn percent(arg: &str) -> Option<f32> {
    arg.strip_suffix('%')?.parse::<f32>().ok().map(|v| v / 100.0)
}

fn parse_rgb_color(s: &str) -> Option<[f32; 4]> {
    let args = css_args(s, &["rgba", "rgb"])?;
    let channel = |arg: &str| -> Option<f32> {
        let value = match percent(arg) {
            Some(v) => v,
            None => arg.parse::<f32>().ok()? / 255.0,
        };
        Some(value.clamp(0.0, 1.0))
    };
    Some([
        channel(args[0])?,
        channel(args[1])?,
        channel(args[2])?,
        alpha_arg(&args)?,
    ])
}

fn parse_hsl_color(s: &str) -> Option<[f32; 4]> {
    let args = css_args(s, &["hsla", "hsl"])?;
    let hue = args[0].trim_end_matches("deg").parse::<f32>().ok()?.rem_euclid(360.0);
    let sat = percent(args[1])?.clamp(0.0, 1.0);
    let light = percent(args[2])?.clamp(0.0, 1.0);

    // CSS Color 4 closed form: each channel samples a piecewise-linear hue ramp
    let chroma = sat * light.min(1.0 - light);
    let channel = |n: f32| {
        let k = (n + hue / 30.0) % 12.0;
        light - chroma * (k - 3.0).min(9.0 - k).clamp(-1.0, 1.0)
    };
    Some([channel(0.0), channel(8.0), channel(4.0), alpha_arg(&args)?])
}
