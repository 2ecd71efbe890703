use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};

/// Reserved key holding the root/fallback help text.
pub const ROOT_HELP_KEY: &str = "base";
pub const HELP_KEY_SEP: &str = ".";

const STUB_HELP: &str = "No help text is configured.";

/// Read-only help texts keyed by dot-joined command path.
///
/// Built once at startup; lookups for unknown topics fall back to the root
/// entry.
#[derive(Clone, Debug, Default)]
pub struct HelpTable {
    entries: BTreeMap<String, String>,
}

impl HelpTable {
    pub fn parse(raw: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> =
            serde_yaml_bw::from_str(raw).context("parse help yaml")?;
        if entries.is_empty() {
            bail!("help file has no entries");
        }
        if !entries.contains_key(ROOT_HELP_KEY) {
            bail!("help file has no '{ROOT_HELP_KEY}' entry");
        }
        Ok(HelpTable { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read help file {}", path.display()))?;
        Self::parse(&raw)
    }

    /// Loads the table, degrading to a stub entry so the gateway can still
    /// answer help requests when the file is missing or broken.
    pub fn load_or_stub(path: &Path) -> Self {
        match Self::load(path) {
            Ok(table) => table,
            Err(err) => {
                tracing::warn!("help table unavailable, serving stub: {err:#}");
                Self::stub()
            }
        }
    }

    pub fn stub() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(ROOT_HELP_KEY.to_string(), STUB_HELP.to_string());
        HelpTable { entries }
    }

    pub fn root(&self) -> &str {
        self.get(ROOT_HELP_KEY)
    }

    /// Help text for a command path; the root entry covers unknown topics.
    pub fn for_path(&self, path: &[String]) -> &str {
        if path.is_empty() {
            return self.root();
        }
        self.get(&path.join(HELP_KEY_SEP))
    }

    pub fn get(&self, key: &str) -> &str {
        self.entries
            .get(key)
            .or_else(|| self.entries.get(ROOT_HELP_KEY))
            .map(String::as_str)
            .unwrap_or_default()
    }
}
