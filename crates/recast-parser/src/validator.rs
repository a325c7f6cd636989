//! Post-parse sanity checks. Everything here is advisory: warnings never
//! block a result, and re-validating the same action list yields the same
//! warnings in the same order.

use recast_common::protocol::{Action, ActionType};

pub fn validate(actions: &[Action]) -> Vec<String> {
    let mut warnings = Vec::new();

    if actions.is_empty() {
        warnings.push("recording contains no recognizable actions".to_string());
        return warnings;
    }

    if !actions.iter().any(|a| a.kind == ActionType::Goto) {
        warnings.push(
            "recording has no navigation (goto) action; replay has no starting page".to_string(),
        );
    }

    for action in actions {
        if !action.kind.requires_locator() {
            continue;
        }
        if action.locator_type.is_none() || action.locator_value.is_none() {
            warnings.push(format!(
                "{} action at line {} has no locator; the target element cannot be identified",
                action.kind.as_str(),
                action.line_number
            ));
        }
    }

    warnings
}
