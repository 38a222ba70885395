use std::collections::HashMap;
use std::sync::Arc;

use crate::resolver::{DependencyGraph, PluginInfo};
use crate::stage::StageName;

use super::container::PluginContainer;

/// Containers in load order, with lookup by id.
#[derive(Debug, Default, Clone)]
pub struct PluginList {
    containers: Vec<Arc<PluginContainer>>,
    index: HashMap<String, usize>,
}

impl PluginList {
    /// Pair the sorted plugin infos with the host's containers.
    ///
    /// Every plugin in `order` gets a container (an empty one if the host
    /// supplied none); containers for plugins not in `order` are dropped.
    /// Each container's dependencies are its direct predecessors in `graph`,
    /// and its stage is set to `initial`.
    pub fn assemble(
        order: &[PluginInfo],
        graph: &DependencyGraph,
        containers: Vec<PluginContainer>,
        initial: &StageName,
    ) -> Self {
        let mut supplied: HashMap<String, PluginContainer> = containers
            .into_iter()
            .map(|c| (c.id().to_string(), c))
            .collect();

        let containers = order
            .iter()
            .map(|info| {
                let mut container = supplied
                    .remove(&info.id)
                    .unwrap_or_else(|| PluginContainer::new(info.id.clone(), info.version.clone()));
                container.set_dependencies(graph.predecessors(&info.id));
                container.set_stage(initial.clone());
                container
            })
            .collect();

        for id in supplied.keys() {
            tracing::debug!(plugin = %id, "container has no place in the load order; dropped");
        }

        Self::from_sorted(containers)
    }

    /// Take containers as already sorted, dependencies included.
    pub fn from_sorted(containers: Vec<PluginContainer>) -> Self {
        let containers: Vec<Arc<PluginContainer>> = containers.into_iter().map(Arc::new).collect();
        let index = containers
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.id().to_string(), pos))
            .collect();
        Self { containers, index }
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PluginContainer>> {
        self.containers.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<PluginContainer>> {
        self.index.get(id).map(|&pos| &self.containers[pos])
    }

    pub fn ids(&self) -> Vec<&str> {
        self.containers.iter().map(|c| c.id()).collect()
    }

    /// Current stage of every plugin, in load order.
    pub fn stages(&self) -> Vec<(String, StageName)> {
        self.containers
            .iter()
            .map(|c| (c.id().to_string(), c.stage()))
            .collect()
    }
}
