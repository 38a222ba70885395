//! User-facing text for loader error payloads.

use stagehand_core::error::keys;
use stagehand_core::ErrorPayload;

fn arg(payload: &ErrorPayload, i: usize) -> &str {
    payload.args.get(i).map(String::as_str).unwrap_or("?")
}

pub fn render(payload: &ErrorPayload) -> String {
    match payload.key.as_str() {
        keys::MISSING_DEPENDENCY => {
            let installed = match arg(payload, 3) {
                "" => "missing".to_string(),
                v => format!("found {v}"),
            };
            format!(
                "Plugin {} requires {} {} ({installed})",
                arg(payload, 0),
                arg(payload, 1),
                arg(payload, 2)
            )
        }
        keys::UNSUPPORTED_OPTIONAL => format!(
            "Plugin {} only supports {} {}, but {} is installed",
            arg(payload, 0),
            arg(payload, 1),
            arg(payload, 2),
            arg(payload, 3)
        ),
        keys::DUPLICATE_PLUGIN => format!("Plugin id {} is declared more than once", arg(payload, 0)),
        keys::MISSING_SYSTEM_PLUGIN => format!("Required plugin {} is missing", arg(payload, 0)),
        keys::CYCLE => format!("Dependency cycle through {}", arg(payload, 0)),
        keys::VALIDATION_FAILED => format!(
            "Plugin {} has an invalid version range '{}' for {}: {}",
            arg(payload, 0),
            arg(payload, 2),
            arg(payload, 1),
            arg(payload, 3)
        ),
        keys::STAGE_FAILED => format!("Stage {} failed: {}", arg(payload, 0), arg(payload, 1)),
        keys::INTERNAL => format!("Internal error: {}", arg(payload, 0)),
        _ => payload.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_text() {
        let payload = ErrorPayload::new(keys::MISSING_DEPENDENCY, ["a", "b", ">=2", ""]);
        assert_eq!(render(&payload), "Plugin a requires b >=2 (missing)");

        let payload = ErrorPayload::new(keys::MISSING_DEPENDENCY, ["a", "b", ">=2", "1"]);
        assert_eq!(render(&payload), "Plugin a requires b >=2 (found 1)");
    }

    #[test]
    fn test_unknown_key_falls_back_to_display() {
        let payload = ErrorPayload::new("custom.key", ["x"]);
        assert_eq!(render(&payload), "custom.key: x");
    }
}
