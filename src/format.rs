use anyhow::{Result, bail};
use serde::Serialize;
use std::str::FromStr;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => bail!("Invalid format '{s}'. Use: text or json"),
        }
    }
}

impl OutputFormat {
    /// Print `data` as JSON, or the text produced by `text`.
    pub fn emit<T: Serialize>(self, data: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
        match self {
            Self::Json => {
                let json = serde_json::to_string_pretty(data)
                    .map_err(|e| anyhow::anyhow!("JSON serialization failed: {e}"))?;
                println!("{json}");
            }
            Self::Text => {
                let out = text(data);
                if !out.is_empty() {
                    println!("{out}");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
    }

    #[test]
    fn rejects_unknown_format() {
        let err = "toon".parse::<OutputFormat>().unwrap_err();
        assert!(err.to_string().contains("text or json"));
    }
}
