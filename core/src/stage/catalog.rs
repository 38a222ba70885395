use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::CatalogError;
use crate::transition::NextStageFn;

use super::types::{LifecycleStage, StageName};

/// Ordered, validated chain of lifecycle stages.
///
/// Each stage names the one before it; exactly one stage has no previous
/// stage, and following the chain from it reaches every stage exactly once.
#[derive(Debug, Clone)]
pub struct StageCatalog {
    stages: Vec<LifecycleStage>,
    index: HashMap<StageName, usize>,
}

impl StageCatalog {
    pub fn new(stages: Vec<LifecycleStage>) -> Result<Self, CatalogError> {
        if stages.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut names = HashSet::new();
        for stage in &stages {
            if stage.name.is_error() {
                return Err(CatalogError::ReservedName(stage.name.to_string()));
            }
            if !names.insert(stage.name.clone()) {
                return Err(CatalogError::DuplicateStage(stage.name.to_string()));
            }
        }

        let mut roots = Vec::new();
        let mut followers: HashMap<&StageName, usize> = HashMap::new();
        for (pos, stage) in stages.iter().enumerate() {
            let Some(previous) = &stage.previous else {
                roots.push(pos);
                continue;
            };
            if !names.contains(previous) {
                return Err(CatalogError::UnknownPrevious {
                    stage: stage.name.to_string(),
                    previous: previous.to_string(),
                });
            }
            if let Some(&first) = followers.get(previous) {
                return Err(CatalogError::Branch {
                    previous: previous.to_string(),
                    first: stages[first].name.to_string(),
                    second: stage.name.to_string(),
                });
            }
            followers.insert(previous, pos);
        }

        let root = match roots.as_slice() {
            [] => return Err(CatalogError::NoInitialStage),
            [root] => *root,
            many => {
                return Err(CatalogError::MultipleInitialStages(
                    many.iter().map(|&p| stages[p].name.to_string()).collect(),
                ))
            }
        };

        let mut chain = vec![root];
        let mut current = root;
        while let Some(&next) = followers.get(&stages[current].name) {
            chain.push(next);
            current = next;
        }

        if chain.len() != stages.len() {
            let reached: HashSet<usize> = chain.iter().copied().collect();
            return Err(CatalogError::Unreachable(
                (0..stages.len())
                    .filter(|p| !reached.contains(p))
                    .map(|p| stages[p].name.to_string())
                    .collect(),
            ));
        }

        let mut slots: Vec<Option<LifecycleStage>> = stages.into_iter().map(Some).collect();
        let ordered: Vec<LifecycleStage> = chain
            .into_iter()
            .filter_map(|pos| slots[pos].take())
            .collect();
        let index = ordered
            .iter()
            .enumerate()
            .map(|(pos, stage)| (stage.name.clone(), pos))
            .collect();

        Ok(Self {
            stages: ordered,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn initial(&self) -> &LifecycleStage {
        &self.stages[0]
    }

    pub fn terminal(&self) -> &LifecycleStage {
        &self.stages[self.stages.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &LifecycleStage> {
        self.stages.iter()
    }

    pub fn get(&self, name: &str) -> Option<&LifecycleStage> {
        self.index.get(name).map(|&pos| &self.stages[pos])
    }

    pub fn next_after(&self, name: &str) -> Option<&LifecycleStage> {
        self.index.get(name).and_then(|&pos| self.stages.get(pos + 1))
    }

    /// First stage that dispatches to plugins; where every plugin starts.
    pub fn first_dispatch_stage(&self) -> StageName {
        self.dispatch_after(None)
    }

    /// Default next-stage mapping for transitions over this catalog.
    ///
    /// A failed transition moves the plugin to `error`. Otherwise it moves to
    /// the next stage that dispatches, or to the terminal stage when none is
    /// left. A plugin outside the catalog (already in `error`) stays put.
    pub fn next_stage_fn(&self) -> NextStageFn {
        let catalog = self.clone();
        Arc::new(move |current: &StageName, failed: bool| {
            if failed {
                return StageName::error();
            }
            match catalog.index.get(current) {
                Some(&pos) => catalog.dispatch_after(Some(pos)),
                None => current.clone(),
            }
        })
    }

    fn dispatch_after(&self, pos: Option<usize>) -> StageName {
        let start = pos.map_or(0, |p| p + 1);
        self.stages[start.min(self.stages.len())..]
            .iter()
            .find(|stage| stage.transition.is_some())
            .unwrap_or_else(|| self.terminal())
            .name
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Phase;
    use crate::transition::StateTransition;

    fn empty(name: &str, previous: Option<&str>) -> LifecycleStage {
        let builder = LifecycleStage::builder(name, Phase::Load);
        match previous {
            Some(p) => builder.after(p).empty(),
            None => builder.empty(),
        }
    }

    fn dispatch(name: &str, previous: &str) -> LifecycleStage {
        LifecycleStage::builder(name, Phase::Load)
            .after(previous)
            .with_transition(StateTransition::parallel())
    }

    fn names(catalog: &StageCatalog) -> Vec<String> {
        catalog.iter().map(|s| s.name.to_string()).collect()
    }

    #[test]
    fn test_orders_by_previous() {
        let catalog = StageCatalog::new(vec![
            empty("c", Some("b")),
            empty("a", None),
            empty("b", Some("a")),
        ])
        .unwrap();
        assert_eq!(names(&catalog), vec!["a", "b", "c"]);
        assert_eq!(catalog.initial().name.as_str(), "a");
        assert_eq!(catalog.terminal().name.as_str(), "c");
        assert_eq!(catalog.next_after("a").map(|s| s.name.as_str()), Some("b"));
        assert!(catalog.next_after("c").is_none());
    }

    #[test]
    fn test_rejects_malformed_chains() {
        assert_eq!(StageCatalog::new(vec![]).unwrap_err(), CatalogError::Empty);
        assert!(matches!(
            StageCatalog::new(vec![empty("a", None), empty("b", None)]).unwrap_err(),
            CatalogError::MultipleInitialStages(_)
        ));
        assert!(matches!(
            StageCatalog::new(vec![empty("a", None), empty("a", Some("a"))]).unwrap_err(),
            CatalogError::DuplicateStage(_)
        ));
        assert!(matches!(
            StageCatalog::new(vec![empty("a", Some("ghost"))]).unwrap_err(),
            CatalogError::UnknownPrevious { .. }
        ));
        assert!(matches!(
            StageCatalog::new(vec![empty("a", None), empty("b", Some("a")), empty("c", Some("a"))])
                .unwrap_err(),
            CatalogError::Branch { .. }
        ));
        assert!(matches!(
            StageCatalog::new(vec![empty("error", None)]).unwrap_err(),
            CatalogError::ReservedName(_)
        ));
        assert_eq!(
            StageCatalog::new(vec![empty("a", Some("b")), empty("b", Some("a"))]).unwrap_err(),
            CatalogError::NoInitialStage
        );
    }

    #[test]
    fn test_detached_loop_is_unreachable() {
        let err = StageCatalog::new(vec![
            empty("root", None),
            empty("x", Some("y")),
            empty("y", Some("x")),
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::Unreachable(vec!["x".into(), "y".into()]));
    }

    #[test]
    fn test_next_stage_skips_stages_without_dispatch() {
        let catalog = StageCatalog::new(vec![
            empty("construct", None),
            dispatch("setup", "construct"),
            empty("freeze", Some("setup")),
            dispatch("complete", "freeze"),
            empty("done", Some("complete")),
        ])
        .unwrap();
        assert_eq!(catalog.first_dispatch_stage().as_str(), "setup");

        let next = catalog.next_stage_fn();
        assert_eq!(next(&"setup".into(), false).as_str(), "complete");
        assert_eq!(next(&"complete".into(), false).as_str(), "done");
        assert_eq!(next(&"setup".into(), true), StageName::error());
        assert_eq!(next(&StageName::error(), false), StageName::error());
    }
}
