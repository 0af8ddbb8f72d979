//! Index configuration.
//!
//! Loaded from JSON and overridable per key, e.g. `index.l=80` or
//! `search.t=4`, so a host can carry the same settings as a flat list of
//! dotted keys.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use simgraph_core::{IndexParams, SearchParams};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Whether an index ever builds a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    #[default]
    Approximate,
    /// Always brute force.
    Linear,
}

impl FromStr for IndexMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approximate" => Ok(IndexMode::Approximate),
            "linear" => Ok(IndexMode::Linear),
            other => Err(format!("expected approximate or linear, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub mode: IndexMode,
    /// Below this many entries an approximate index stays brute force.
    pub min_build_size: usize,
    /// Result count used when a query asks for none.
    pub default_k: usize,
    /// Radius used when a query gives none; `None` is unbounded.
    pub default_r: Option<f32>,
    pub index: IndexParams,
    /// Graph search knobs. `k` and `epsilon` are replaced on every query by
    /// the hint-derived count and radius, so only `m`, `p`, `t` and `seed`
    /// take effect.
    pub search: SearchParams,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            mode: IndexMode::Approximate,
            min_build_size: 10_000,
            default_k: 10,
            default_r: None,
            index: IndexParams::default(),
            search: SearchParams::default(),
        }
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl IndexConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Override one setting by dotted key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "mode" => self.mode = parse(key, value)?,
            "min_build_size" => self.min_build_size = parse(key, value)?,
            "default_k" => self.default_k = parse(key, value)?,
            "default_r" => {
                self.default_r = match value.trim() {
                    "" | "none" | "inf" => None,
                    _ => Some(parse(key, value)?),
                }
            }

            "index.iterations" => self.index.iterations = parse(key, value)?,
            "index.l" => self.index.l = parse(key, value)?,
            "index.k" => self.index.k = parse(key, value)?,
            "index.s" => self.index.s = parse(key, value)?,
            "index.r" => self.index.r = parse(key, value)?,
            "index.controls" => self.index.controls = parse(key, value)?,
            "index.seed" => self.index.seed = parse(key, value)?,
            "index.delta" => self.index.delta = parse(key, value)?,
            "index.recall" => self.index.recall = parse(key, value)?,
            "index.prune" => self.index.prune = parse(key, value)?,

            "search.m" => self.search.m = parse(key, value)?,
            "search.p" => self.search.p = parse(key, value)?,
            "search.t" => self.search.t = parse(key, value)?,
            "search.seed" => self.search.seed = parse(key, value)?,

            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Apply `key=value` overrides in order.
    pub fn apply_overrides<'o, I>(&mut self, overrides: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = &'o str>,
    {
        for item in overrides {
            let (key, value) = item.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                key: item.to_string(),
                value: String::new(),
                reason: "expected key=value".to_string(),
            })?;
            self.set(key.trim(), value)?;
        }
        Ok(())
    }
}
