use std::collections::{HashMap, HashSet};

use crate::error::{keys, ErrorPayload};

use super::types::{DependencyConstraint, PluginInfo};

/// Check every declared constraint against the plugin set.
///
/// Each distinct requirement yields at most one payload:
/// - mandatory, target absent or outside the range: `loading.missing_dependency`
/// - soft, target present but outside the range: `loading.unsupported_optional`
/// - soft, target absent: nothing
///
/// Args are `[subject, target, range, installed]`, with `installed` empty
/// when the target is absent. The subject is the plugin declaring the
/// constraint, as in the dependency graph.
pub fn validate(plugins: &[PluginInfo]) -> Vec<ErrorPayload> {
    let versions: HashMap<&str, &str> = plugins
        .iter()
        .map(|p| (p.id.as_str(), p.version.as_str()))
        .collect();

    let mut seen: HashSet<(&str, &DependencyConstraint)> = HashSet::new();
    let mut errors = Vec::new();

    let declared = plugins
        .iter()
        .flat_map(|p| p.constraints.iter().map(move |c| (p.id.as_str(), c)));
    for (subject, constraint) in declared {
        if !seen.insert((subject, constraint)) {
            continue;
        }

        let installed = versions.get(constraint.target.as_str()).copied();
        let in_range = match (installed, &constraint.version_range) {
            (Some(version), Some(range)) => range.contains(version),
            (Some(_), None) => true,
            (None, _) => false,
        };

        let key = match (constraint.mandatory, installed, in_range) {
            (_, _, true) => continue,
            (true, _, false) => keys::MISSING_DEPENDENCY,
            (false, Some(_), false) => keys::UNSUPPORTED_OPTIONAL,
            (false, None, _) => continue,
        };

        let range = constraint
            .version_range
            .as_ref()
            .map(|r| r.requirement().to_string())
            .unwrap_or_else(|| "*".to_string());

        tracing::debug!(
            subject,
            target = %constraint.target,
            range = %range,
            key,
            "unsatisfied dependency"
        );

        errors.push(ErrorPayload::new(
            key,
            [
                subject.to_string(),
                constraint.target.clone(),
                range,
                installed.unwrap_or_default().to_string(),
            ],
        ));
    }

    errors
}
