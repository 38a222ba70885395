use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{keys, ErrorPayload};

/// Relative ordering declared by a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Ordering {
    /// Subject must complete each stage before the target.
    Before,
    /// Subject must complete each stage after the target.
    After,
    /// No ordering; the constraint only takes part in validation.
    None,
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
            Self::None => "NONE",
        })
    }
}

/// Version requirement supplied by the manifest layer.
///
/// The core does not parse versions: it only holds the display form and a
/// predicate deciding whether an installed version satisfies it.
#[derive(Clone)]
pub struct VersionRange {
    requirement: String,
    test: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl VersionRange {
    pub fn new<F>(requirement: impl Into<String>, test: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            requirement: requirement.into(),
            test: Arc::new(test),
        }
    }

    /// Matches every version.
    pub fn any() -> Self {
        Self::new("*", |_| true)
    }

    pub fn requirement(&self) -> &str {
        &self.requirement
    }

    pub fn contains(&self, version: &str) -> bool {
        (self.test)(version)
    }
}

impl fmt::Debug for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VersionRange").field(&self.requirement).finish()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.requirement)
    }
}

// Ranges compare by their declared form, so identical requirements collapse.
impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.requirement == other.requirement
    }
}

impl Eq for VersionRange {}

impl Hash for VersionRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.requirement.hash(state);
    }
}

/// A declared relation from `subject` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyConstraint {
    pub subject: String,
    pub target: String,
    pub ordering: Ordering,
    pub mandatory: bool,
    pub version_range: Option<VersionRange>,
}

impl DependencyConstraint {
    pub fn mandatory(
        subject: impl Into<String>,
        target: impl Into<String>,
        ordering: Ordering,
    ) -> Self {
        Self {
            subject: subject.into(),
            target: target.into(),
            ordering,
            mandatory: true,
            version_range: None,
        }
    }

    pub fn optional(
        subject: impl Into<String>,
        target: impl Into<String>,
        ordering: Ordering,
    ) -> Self {
        Self {
            mandatory: false,
            ..Self::mandatory(subject, target, ordering)
        }
    }

    pub fn with_version_range(mut self, range: VersionRange) -> Self {
        self.version_range = Some(range);
        self
    }
}

/// Identity and declared constraints of one plugin, as produced by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub id: String,
    pub version: String,
    pub constraints: Vec<DependencyConstraint>,
}

impl PluginInfo {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            constraints: Vec::new(),
        }
    }

    /// Mandatory: this plugin completes each stage before `target`.
    pub fn before(self, target: impl Into<String>) -> Self {
        self.with_dependency(target, Ordering::Before, true)
    }

    /// Mandatory: this plugin completes each stage after `target`.
    pub fn after(self, target: impl Into<String>) -> Self {
        self.with_dependency(target, Ordering::After, true)
    }

    pub fn with_dependency(
        mut self,
        target: impl Into<String>,
        ordering: Ordering,
        mandatory: bool,
    ) -> Self {
        let constraint = if mandatory {
            DependencyConstraint::mandatory(self.id.clone(), target, ordering)
        } else {
            DependencyConstraint::optional(self.id.clone(), target, ordering)
        };
        self.constraints.push(constraint);
        self
    }

    /// Add a prebuilt constraint. Its subject is always this plugin.
    pub fn with_constraint(mut self, mut constraint: DependencyConstraint) -> Self {
        constraint.subject.clone_from(&self.id);
        self.constraints.push(constraint);
        self
    }
}

/// A plugin on a cycle, with the declarations that keep it there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleMember {
    pub id: String,
    /// Declared constraints whose target is in the same cycle.
    pub dependencies: Vec<(Ordering, String)>,
}

impl fmt::Display for CycleMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        let deps = self
            .dependencies
            .iter()
            .map(|(ordering, target)| format!("{ordering} {target}"))
            .collect::<Vec<_>>();
        if !deps.is_empty() {
            write!(f, " {}", deps.join(", "))?;
        }
        Ok(())
    }
}

/// One strongly connected group of plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    pub members: Vec<CycleMember>,
}

impl Cycle {
    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }
}

/// Every cycle found in the graph, as disjoint groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycles: Vec<Cycle>,
}

impl CycleReport {
    pub fn contains(&self, id: &str) -> bool {
        self.cycles.iter().any(|c| c.contains(id))
    }

    /// One `loading.cycle` payload per cycle member.
    pub fn payloads(&self) -> Vec<ErrorPayload> {
        self.cycles
            .iter()
            .flat_map(|cycle| cycle.members.iter())
            .map(|member| ErrorPayload::new(keys::CYCLE, [member.to_string()]))
            .collect()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Detected Cycles:")?;
        for cycle in &self.cycles {
            writeln!(f, "\tCycle:")?;
            for member in &cycle.members {
                writeln!(f, "\t\tPlugin: {member}")?;
            }
        }
        Ok(())
    }
}
