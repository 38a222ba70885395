//! Plugin manifest file.
//!
//! ```toml
//! [[plugin]]
//! id = "examplemod"
//! version = "1.2.0"
//! delay_ms = 20              # simulated work per stage
//! fail_at = "common_setup"   # simulated failure
//!
//! [[plugin.dependencies]]
//! id = "forge"
//! ordering = "AFTER"
//! mandatory = true
//! version_range = ">=47"
//! ```

use std::cmp::Ordering as CmpOrdering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stagehand_core::error::keys;
use stagehand_core::{DependencyConstraint, ErrorPayload, Ordering, PluginInfo, VersionRange};

use crate::error::CliError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "plugin", default)]
    pub plugins: Vec<PluginEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEntry {
    pub id: String,
    pub version: String,

    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,

    /// Milliseconds each stage handler sleeps.
    #[serde(default)]
    pub delay_ms: u64,

    /// Stage whose handler fails.
    #[serde(default)]
    pub fail_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub id: String,

    #[serde(default = "default_ordering")]
    pub ordering: OrderingEntry,

    #[serde(default = "default_mandatory")]
    pub mandatory: bool,

    #[serde(default)]
    pub version_range: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderingEntry {
    Before,
    After,
    None,
}

fn default_ordering() -> OrderingEntry {
    OrderingEntry::None
}

fn default_mandatory() -> bool {
    true
}

impl From<OrderingEntry> for Ordering {
    fn from(entry: OrderingEntry) -> Self {
        match entry {
            OrderingEntry::Before => Ordering::Before,
            OrderingEntry::After => Ordering::After,
            OrderingEntry::None => Ordering::None,
        }
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| CliError::Manifest(format!("{}: {e}", path.display())))?;
        Self::parse(&s).map_err(|e| CliError::Manifest(format!("{}: {e}", path.display())))
    }

    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn entry(&self, id: &str) -> Option<&PluginEntry> {
        self.plugins.iter().find(|p| p.id == id)
    }

    /// Convert to plugin infos for the resolver.
    ///
    /// Unparseable version ranges do not abort: they come back as payloads
    /// to hand to the sorter as upstream errors, and the constraint is kept
    /// without a range.
    pub fn to_infos(&self) -> (Vec<PluginInfo>, Vec<ErrorPayload>) {
        let mut errors = Vec::new();
        let infos = self
            .plugins
            .iter()
            .map(|entry| {
                let mut info = PluginInfo::new(entry.id.clone(), entry.version.clone());
                for dep in &entry.dependencies {
                    let mut constraint = if dep.mandatory {
                        DependencyConstraint::mandatory(&entry.id, &dep.id, dep.ordering.into())
                    } else {
                        DependencyConstraint::optional(&entry.id, &dep.id, dep.ordering.into())
                    };
                    if let Some(spec) = &dep.version_range {
                        match parse_version_range(spec) {
                            Ok(range) => constraint = constraint.with_version_range(range),
                            Err(reason) => errors.push(ErrorPayload::new(
                                keys::VALIDATION_FAILED,
                                [entry.id.clone(), dep.id.clone(), spec.clone(), reason],
                            )),
                        }
                    }
                    info = info.with_constraint(constraint);
                }
                info
            })
            .collect();
        (infos, errors)
    }
}

/// Parse a dotted numeric version. Non-numeric suffixes on a component
/// (`1.20.1-pre`) are ignored.
pub fn parse_version(s: &str) -> Option<Vec<u64>> {
    let parts: Option<Vec<u64>> = s
        .trim()
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect();
    parts.filter(|p| !p.is_empty())
}

fn compare(a: &[u64], b: &[u64]) -> CmpOrdering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let (x, y) = (a.get(i).unwrap_or(&0), b.get(i).unwrap_or(&0));
        match x.cmp(y) {
            CmpOrdering::Equal => continue,
            other => return other,
        }
    }
    CmpOrdering::Equal
}

/// Parse a range such as `*`, `1.2`, `=1.2`, `>=47`, or `>=1.0,<2.0`.
pub fn parse_version_range(text: &str) -> Result<VersionRange, String> {
    let text = text.trim();
    if text.is_empty() || text == "*" {
        return Ok(VersionRange::any());
    }

    let mut bounds: Vec<(&'static str, Vec<u64>)> = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        let (op, rest) = ["<=", ">=", "<", ">", "="]
            .iter()
            .find_map(|op| part.strip_prefix(op).map(|rest| (*op, rest)))
            .unwrap_or(("=", part));
        let version = parse_version(rest).ok_or_else(|| format!("bad version '{rest}'"))?;
        bounds.push((op, version));
    }

    Ok(VersionRange::new(text, move |installed| {
        let Some(installed) = parse_version(installed) else {
            return false;
        };
        bounds.iter().all(|(op, bound)| {
            let ord = compare(&installed, bound);
            match *op {
                "<=" => ord != CmpOrdering::Greater,
                ">=" => ord != CmpOrdering::Less,
                "<" => ord == CmpOrdering::Less,
                ">" => ord == CmpOrdering::Greater,
                _ => ord == CmpOrdering::Equal,
            }
        })
    }))
}
