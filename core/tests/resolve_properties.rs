mod common;

use std::collections::HashSet;

use common::Lcg;
use pretty_assertions::assert_eq;
use stagehand_core::error::keys;
use stagehand_core::{resolve, validate, Ordering, PluginInfo, PluginSorter, ResolveError};

/// Random constraint set. With `acyclic`, every edge goes forward in a
/// hidden random ranking, so the set is a DAG.
fn random_plugins(rng: &mut Lcg, n: usize, acyclic: bool) -> (Vec<PluginInfo>, Vec<(String, String)>) {
    let ids: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();

    let mut rank: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        rank.swap(i, rng.below(i + 1));
    }

    let mut plugins: Vec<PluginInfo> = ids.iter().map(|id| PluginInfo::new(id.clone(), "1")).collect();
    let mut edges = Vec::new();

    for _ in 0..n * 2 {
        let (a, b) = (rng.below(n), rng.below(n));
        if a == b {
            continue;
        }
        let (from, to) = if !acyclic || rank[a] < rank[b] { (a, b) } else { (b, a) };

        // Express from -> to either as "from BEFORE to" or "to AFTER from".
        if rng.chance(50) {
            plugins[from] = plugins[from].clone().before(ids[to].clone());
        } else {
            plugins[to] = plugins[to].clone().after(ids[from].clone());
        }
        edges.push((ids[from].clone(), ids[to].clone()));
    }

    (plugins, edges)
}

fn on_some_cycle(node: &str, edges: &[(String, String)]) -> bool {
    let mut seen = HashSet::new();
    let mut stack: Vec<&str> = edges
        .iter()
        .filter(|(from, _)| from == node)
        .map(|(_, to)| to.as_str())
        .collect();
    while let Some(current) = stack.pop() {
        if current == node {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        stack.extend(
            edges
                .iter()
                .filter(|(from, _)| from == current)
                .map(|(_, to)| to.as_str()),
        );
    }
    false
}

#[test]
fn dag_order_respects_every_edge() {
    for seed in 0..64 {
        let mut rng = Lcg::new(seed);
        let n = 2 + rng.below(30);
        let (plugins, edges) = random_plugins(&mut rng, n, true);

        let order: Vec<String> = resolve(&plugins)
            .unwrap_or_else(|e| panic!("seed {seed}: unexpected failure {e}"))
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(order.len(), n);
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        for (from, to) in &edges {
            assert!(pos(from) < pos(to), "seed {seed}: {from} must precede {to}");
        }
    }
}

#[test]
fn cycle_report_covers_every_node_on_a_cycle() {
    let mut cyclic_seen = 0;
    for seed in 0..64 {
        let mut rng = Lcg::new(1000 + seed);
        let n = 2 + rng.below(12);
        let (plugins, edges) = random_plugins(&mut rng, n, false);

        let on_cycle: Vec<&str> = plugins
            .iter()
            .map(|p| p.id.as_str())
            .filter(|id| on_some_cycle(id, &edges))
            .collect();

        match resolve(&plugins) {
            Ok(order) => assert!(on_cycle.is_empty(), "seed {seed}: sorted {} nodes despite a cycle", order.len()),
            Err(ResolveError::Cycle(report)) => {
                cyclic_seen += 1;
                for plugin in &plugins {
                    assert_eq!(
                        report.contains(&plugin.id),
                        on_cycle.contains(&plugin.id.as_str()),
                        "seed {seed}: membership of {}",
                        plugin.id
                    );
                }
            }
            Err(other) => panic!("seed {seed}: unexpected error {other}"),
        }
    }
    assert!(cyclic_seen > 0);
}

#[test]
fn resolve_is_deterministic() {
    for seed in 0..16 {
        let mut rng = Lcg::new(seed);
        let (plugins, _) = random_plugins(&mut rng, 20, true);
        let first: Vec<String> = resolve(&plugins).unwrap().into_iter().map(|p| p.id).collect();
        let second: Vec<String> = resolve(&plugins).unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(first, second);
    }
}

#[test]
fn optional_missing_dependency_is_ignored_and_mandatory_reported_once() {
    let plugins = vec![
        PluginInfo::new("a", "1")
            .with_dependency("soft-ghost", Ordering::After, false)
            .with_dependency("hard-ghost", Ordering::After, true),
        PluginInfo::new("b", "1")
            .with_dependency("other-ghost", Ordering::Before, true)
            .with_dependency("soft-ghost", Ordering::Before, false),
    ];

    let errors = validate(&plugins);
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.key == keys::MISSING_DEPENDENCY));
    let targets: Vec<&str> = errors.iter().map(|e| e.args[1].as_str()).collect();
    assert_eq!(targets, vec!["hard-ghost", "other-ghost"]);

    // Neither kind of absent target becomes an edge.
    let order: Vec<String> = resolve(&plugins).unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(order, vec!["a", "b"]);
}

#[test]
fn system_plugins_then_dependent() {
    let plugins = vec![
        PluginInfo::new("minecraft", "1.20.1"),
        PluginInfo::new("forge", "47.1.0"),
        PluginInfo::new("a", "1.0").after("forge"),
    ];

    let list = PluginSorter::default().sort(&plugins, Vec::new()).unwrap();
    assert!(list.error.is_none());
    assert_eq!(list.ids(), vec!["minecraft", "forge", "a"]);
}

#[test]
fn mutual_before_is_one_cycle() {
    let plugins = vec![
        PluginInfo::new("x", "1").before("y"),
        PluginInfo::new("y", "1").before("x"),
    ];

    let Err(ResolveError::Cycle(report)) = resolve(&plugins) else {
        panic!("expected a cycle");
    };
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].ids(), vec!["x", "y"]);
    assert!(report.to_string().contains("Detected Cycles"));
}

/// `p0 -> p1 -> ... -> p{n-1} -> p0`
fn ring(n: usize) -> Vec<PluginInfo> {
    (0..n)
        .map(|i| PluginInfo::new(format!("p{i}"), "1").before(format!("p{}", (i + 1) % n)))
        .collect()
}

#[test]
fn long_ring_is_reported_as_one_cycle() {
    let n = 100_000;
    let Err(ResolveError::Cycle(report)) = resolve(&ring(n)) else {
        panic!("expected a cycle");
    };
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].members.len(), n);
    assert!(report.contains("p0"));
    assert!(report.contains(&format!("p{}", n - 1)));
}

#[test]
fn long_ring_falls_back_to_system_plugins() {
    let mut plugins = vec![
        PluginInfo::new("minecraft", "1.20.1"),
        PluginInfo::new("forge", "47.1.0"),
    ];
    plugins.extend(ring(100_000));

    let list = PluginSorter::default().sort(&plugins, Vec::new()).unwrap();
    assert!(list.is_degraded());
    assert_eq!(list.ids(), vec!["minecraft", "forge"]);
    assert!(matches!(list.error, Some(ResolveError::Cycle(_))));
}
