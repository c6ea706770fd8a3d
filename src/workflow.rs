// src/workflow.rs
//
// Minimal workflow-file loader for the batch binary: a list of trigger specs
// in TOML or JSON. The full workflow compiler (jobs, expressions, outputs)
// lives in the downstream engine and is out of scope here.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::registry;
use crate::types::TriggerSpec;

const ENV_PATH: &str = "FLOWPOLL_WORKFLOW";

/// Load trigger specs from an explicit path. Supports TOML
/// (`[[triggers]]` tables) or JSON (top-level array or `{"triggers": [...]}`).
pub fn load_triggers_from(path: &Path) -> Result<Vec<TriggerSpec>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading workflow from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut specs = parse_triggers(&content, ext.as_str())?;

    // Triggers without a declaring path inherit the workflow file's.
    let fallback = path.to_string_lossy().to_string();
    for spec in &mut specs {
        if spec.path.is_empty() {
            spec.path = fallback.clone();
        }
    }
    Ok(specs)
}

/// Load using `$FLOWPOLL_WORKFLOW`, falling back to `workflow.toml` then
/// `workflow.json` in the working directory.
pub fn load_triggers_default() -> Result<Vec<TriggerSpec>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_triggers_from(&pb);
        }
        return Err(anyhow!("FLOWPOLL_WORKFLOW points to non-existent path"));
    }
    for candidate in ["workflow.toml", "workflow.json"] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_triggers_from(&pb);
        }
    }
    Ok(Vec::new())
}

/// Reject unknown trigger kinds up front; genuinely dynamic configs can skip
/// this and rely on the runner's non-fatal warning instead.
pub fn validate_kinds(specs: &[TriggerSpec]) -> Result<()> {
    for spec in specs {
        if registry::resolve(&spec.kind).is_none() {
            return Err(anyhow!(
                "unknown trigger kind `{}` in {} (supported: {})",
                spec.kind,
                spec.path,
                registry::known_kinds().join(", ")
            ));
        }
    }
    Ok(())
}

fn parse_triggers(s: &str, hint_ext: &str) -> Result<Vec<TriggerSpec>> {
    let try_toml = hint_ext == "toml" || s.contains("[[triggers]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported workflow format"))
}

#[derive(serde::Deserialize)]
struct Workflow {
    triggers: Vec<TriggerSpecToml>,
}

// TOML table without a `path` key; filled in by the loader.
#[derive(serde::Deserialize)]
struct TriggerSpecToml {
    kind: String,
    #[serde(default)]
    options: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    path: String,
}

impl From<TriggerSpecToml> for TriggerSpec {
    fn from(t: TriggerSpecToml) -> Self {
        Self {
            kind: t.kind,
            options: t.options,
            path: t.path,
        }
    }
}

fn parse_toml(s: &str) -> Result<Vec<TriggerSpec>> {
    let wf: Workflow = toml::from_str(s)?;
    Ok(wf.triggers.into_iter().map(Into::into).collect())
}

fn parse_json(s: &str) -> Result<Vec<TriggerSpec>> {
    if let Ok(specs) = serde_json::from_str::<Vec<TriggerSpecToml>>(s) {
        return Ok(specs.into_iter().map(Into::into).collect());
    }
    let wf: Workflow = serde_json::from_str(s)?;
    Ok(wf.triggers.into_iter().map(Into::into).collect())
}
