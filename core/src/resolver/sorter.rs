use std::collections::HashMap;

use crate::error::{ErrorPayload, ResolveError};

use super::graph::DependencyGraph;
use super::types::PluginInfo;
use super::validate::validate;

/// Plugins the host cannot run without, in their fixed load order.
pub const DEFAULT_SYSTEM_PLUGINS: &[&str] = &["minecraft", "forge"];

/// Sort `plugins` by their ordering constraints.
///
/// Returns the plugins in load order, or the cycle report when no order
/// exists. Validation is not part of this call; see [`PluginSorter`].
pub fn resolve(plugins: &[PluginInfo]) -> Result<Vec<PluginInfo>, ResolveError> {
    let graph = DependencyGraph::from_plugins(plugins)?;
    let order = graph.topological_sort().map_err(ResolveError::Cycle)?;
    Ok(reorder(plugins, &order))
}

fn reorder(plugins: &[PluginInfo], order: &[String]) -> Vec<PluginInfo> {
    let by_id: HashMap<&str, &PluginInfo> = plugins.iter().map(|p| (p.id.as_str(), p)).collect();
    order
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).map(|p| (*p).clone()))
        .collect()
}

/// Result of sorting: the order to load in, the graph it came from, and the
/// error that forced a fallback, if any.
///
/// When `error` is set, `plugins` holds only the system plugins so the host
/// can still come up far enough to report the failure.
#[derive(Debug, Clone)]
pub struct LoadingList {
    pub plugins: Vec<PluginInfo>,
    pub graph: DependencyGraph,
    pub error: Option<ResolveError>,
}

impl LoadingList {
    pub fn ids(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    pub fn errors(&self) -> Vec<ErrorPayload> {
        self.error.as_ref().map(ResolveError::payloads).unwrap_or_default()
    }
}

/// Full sorting pass: system plugin detection, duplicate check, validation,
/// then the topological sort.
#[derive(Debug, Clone)]
pub struct PluginSorter {
    system_plugins: Vec<String>,
}

impl Default for PluginSorter {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PLUGINS.iter().copied())
    }
}

impl PluginSorter {
    pub fn new<I, S>(system_plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            system_plugins: system_plugins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn system_plugins(&self) -> &[String] {
        &self.system_plugins
    }

    /// Sort the plugin set.
    ///
    /// `upstream` carries errors from earlier phases (discovery, manifest
    /// parsing); any entry there forces the fallback order just like a local
    /// validation failure.
    ///
    /// Only a missing system plugin is returned as `Err`: without those there
    /// is no fallback order to hand back.
    #[tracing::instrument(level = "debug", skip_all, fields(plugins = plugins.len()))]
    pub fn sort(
        &self,
        plugins: &[PluginInfo],
        upstream: Vec<ErrorPayload>,
    ) -> Result<LoadingList, ResolveError> {
        let system = self.detect_system_plugins(plugins)?;

        let graph = match DependencyGraph::from_plugins(plugins) {
            Ok(graph) => graph,
            Err(err) => {
                tracing::error!(error = %err, "duplicate plugins in the load set");
                return Ok(self.fallback(system, err));
            }
        };

        let mut errors = upstream;
        errors.extend(validate(plugins));
        if !errors.is_empty() {
            for payload in &errors {
                tracing::error!(%payload, "plugin validation failed");
            }
            return Ok(self.fallback(system, ResolveError::Validation(errors)));
        }

        match graph.topological_sort() {
            Ok(order) => {
                tracing::debug!(order = ?order, "plugin load order");
                Ok(LoadingList {
                    plugins: reorder(plugins, &order),
                    graph,
                    error: None,
                })
            }
            Err(report) => {
                tracing::error!("{report}");
                Ok(self.fallback(system, ResolveError::Cycle(report)))
            }
        }
    }

    fn detect_system_plugins(&self, plugins: &[PluginInfo]) -> Result<Vec<PluginInfo>, ResolveError> {
        self.system_plugins
            .iter()
            .map(|id| {
                plugins
                    .iter()
                    .find(|p| &p.id == id)
                    .cloned()
                    .ok_or_else(|| {
                        tracing::error!(plugin = %id, "system plugin not found");
                        ResolveError::MissingSystemPlugin(id.clone())
                    })
            })
            .collect()
    }

    fn fallback(&self, system: Vec<PluginInfo>, error: ResolveError) -> LoadingList {
        LoadingList {
            graph: DependencyGraph::unordered(system.iter().map(|p| p.id.as_str())),
            plugins: system,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::keys;

    fn base() -> Vec<PluginInfo> {
        vec![PluginInfo::new("minecraft", "1.20"), PluginInfo::new("forge", "47")]
    }

    #[test]
    fn test_sorts_full_set() {
        let mut plugins = base();
        plugins.push(PluginInfo::new("b", "1").after("a"));
        plugins.push(PluginInfo::new("a", "1"));
        let list = PluginSorter::default().sort(&plugins, Vec::new()).unwrap();
        assert!(!list.is_degraded());
        assert_eq!(list.ids(), vec!["minecraft", "forge", "a", "b"]);
    }

    #[test]
    fn test_system_plugins_only_lead_the_fallback_order() {
        let plugins = vec![
            PluginInfo::new("a", "1"),
            PluginInfo::new("forge", "47"),
            PluginInfo::new("minecraft", "1.20"),
        ];
        let sorter = PluginSorter::default();

        let list = sorter.sort(&plugins, Vec::new()).unwrap();
        assert_eq!(list.ids(), vec!["a", "forge", "minecraft"]);

        let upstream = vec![ErrorPayload::new(keys::INTERNAL, ["bad manifest"])];
        let list = sorter.sort(&plugins, upstream).unwrap();
        assert_eq!(list.ids(), vec!["minecraft", "forge"]);
    }

    #[test]
    fn test_missing_system_plugin_is_hard_error() {
        let plugins = vec![PluginInfo::new("minecraft", "1.20")];
        let err = PluginSorter::default().sort(&plugins, Vec::new()).unwrap_err();
        assert!(matches!(err, ResolveError::MissingSystemPlugin(id) if id == "forge"));
    }

    #[test]
    fn test_validation_failure_falls_back_to_system_plugins() {
        let mut plugins = base();
        plugins.push(PluginInfo::new("a", "1").after("ghost"));
        let list = PluginSorter::default().sort(&plugins, Vec::new()).unwrap();
        assert!(list.is_degraded());
        assert_eq!(list.ids(), vec!["minecraft", "forge"]);
        assert_eq!(list.errors().len(), 1);
        assert_eq!(list.errors()[0].key, keys::MISSING_DEPENDENCY);
    }

    #[test]
    fn test_upstream_errors_force_fallback() {
        let upstream = vec![ErrorPayload::new(keys::INTERNAL, ["bad manifest"])];
        let list = PluginSorter::default().sort(&base(), upstream.clone()).unwrap();
        assert!(list.is_degraded());
        assert_eq!(list.errors(), upstream);
    }

    #[test]
    fn test_duplicate_falls_back() {
        let mut plugins = base();
        plugins.push(PluginInfo::new("a", "1"));
        plugins.push(PluginInfo::new("a", "2"));
        let list = PluginSorter::default().sort(&plugins, Vec::new()).unwrap();
        assert_eq!(list.errors()[0].key, keys::DUPLICATE_PLUGIN);
        assert_eq!(list.graph.len(), 2);
    }

    #[test]
    fn test_cycle_falls_back() {
        let mut plugins = base();
        plugins.push(PluginInfo::new("x", "1").before("y"));
        plugins.push(PluginInfo::new("y", "1").before("x"));
        let list = PluginSorter::default().sort(&plugins, Vec::new()).unwrap();
        assert!(matches!(list.error, Some(ResolveError::Cycle(_))));
        assert_eq!(list.ids(), vec!["minecraft", "forge"]);
    }

    #[test]
    fn test_resolve_returns_cycle() {
        let plugins = vec![
            PluginInfo::new("x", "1").before("y"),
            PluginInfo::new("y", "1").before("x"),
        ];
        match resolve(&plugins) {
            Err(ResolveError::Cycle(report)) => {
                assert_eq!(report.cycles.len(), 1);
                assert_eq!(report.cycles[0].ids(), vec!["x", "y"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }
}
