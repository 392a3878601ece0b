// src/cli/args.rs
// Argument parsing for bigline_render

use std::path::PathBuf;

pub const USAGE: &str = "usage: bigline_render --style <style.json> --features <features.geojson> \
--out <image.png> [--size WxH] [--options <options.json>]";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CliError {
    #[error("missing required flag {0}")]
    Missing(&'static str),
    #[error("flag {0} expects a value")]
    NoValue(String),
    #[error("invalid --size value {0:?}, expected WxH")]
    BadSize(String),
    #[error("unknown flag {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderArgs {
    pub style: PathBuf,
    pub features: PathBuf,
    pub out: PathBuf,
    pub width: u32,
    pub height: u32,
    pub options: Option<PathBuf>,
}

impl RenderArgs {
    pub const DEFAULT_SIZE: (u32, u32) = (1024, 768);

    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let mut style = None;
        let mut features = None;
        let mut out = None;
        let mut options = None;
        let (mut width, mut height) = Self::DEFAULT_SIZE;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let mut value = || {
                iter.next()
                    .cloned()
                    .ok_or_else(|| CliError::NoValue(arg.clone()))
            };
            match arg.as_str() {
                "--style" => style = Some(PathBuf::from(value()?)),
                "--features" => features = Some(PathBuf::from(value()?)),
                "--out" => out = Some(PathBuf::from(value()?)),
                "--options" => options = Some(PathBuf::from(value()?)),
                "--size" => {
                    let dim = value()?;
                    (width, height) = parse_size(&dim).ok_or(CliError::BadSize(dim))?;
                }
                other => return Err(CliError::Unknown(other.to_string())),
            }
        }

        Ok(Self {
            style: style.ok_or(CliError::Missing("--style"))?,
            features: features.ok_or(CliError::Missing("--features"))?,
            out: out.ok_or(CliError::Missing("--out"))?,
            width,
            height,
            options,
        })
    }
}

fn parse_size(dim: &str) -> Option<(u32, u32)> {
    let (w, h) = dim.split_once('x')?;
    let (w, h) = (w.parse::<u32>().ok()?, h.parse::<u32>().ok()?);
    (w > 0 && h > 0).then_some((w, h))
}
