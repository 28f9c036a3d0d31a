//! Static checks on deployment configuration files
//!
//! Plain text and JSON inspection of files such as `vercel.json` or
//! `package.json`. Nothing is executed.

use super::context::lookup;
use crate::parser::types::FileParams;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Verify a file against its assertions; the error carries the failure detail
pub fn inspect_file(path: &Path, params: &FileParams) -> Result<String> {
    if !params.exists {
        if path.exists() {
            anyhow::bail!("{} should not exist", path.display());
        }
        return Ok(format!("{} absent as expected", path.display()));
    }

    if !path.is_file() {
        anyhow::bail!("file not found: {}", path.display());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let missing: Vec<&str> = params
        .contains
        .iter()
        .filter(|needle| !content.contains(needle.as_str()))
        .map(|s| s.as_str())
        .collect();
    if !missing.is_empty() {
        anyhow::bail!("missing text: {}", missing.join(", "));
    }

    let forbidden: Vec<&str> = params
        .not_contains
        .iter()
        .filter(|needle| content.contains(needle.as_str()))
        .map(|s| s.as_str())
        .collect();
    if !forbidden.is_empty() {
        anyhow::bail!("unexpected text: {}", forbidden.join(", "));
    }

    let mut verified = params.contains.len() + params.not_contains.len();

    if !params.json.is_empty() || !params.has_keys.is_empty() {
        let doc: Value = serde_json::from_str(&content)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;

        let mut pointers: Vec<&String> = params.json.keys().collect();
        pointers.sort();
        for pointer in pointers {
            let expected = &params.json[pointer];
            match lookup(&doc, pointer) {
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    anyhow::bail!("{}: expected {}, got {}", pointer, expected, actual)
                }
                None => anyhow::bail!("{}: expected {}, got nothing", pointer, expected),
            }
        }

        let absent: Vec<&str> = params
            .has_keys
            .iter()
            .filter(|p| lookup(&doc, p).is_none())
            .map(|s| s.as_str())
            .collect();
        if !absent.is_empty() {
            anyhow::bail!("missing keys: {}", absent.join(", "));
        }

        verified += params.json.len() + params.has_keys.len();
    }

    Ok(format!("{} assertion(s) verified", verified))
}
