//! Format detection over raw recording text.
//!
//! An ordered list of strategies, first match wins. Detection is total: any
//! input, including the empty string, classifies to something, with
//! `Format::Unknown` as the fallthrough.

use recast_common::protocol::Format;

/// Substrings that mark a Python automation script.
const PYTHON_MARKERS: &[&str] = &[
    "import playwright",
    "from playwright",
    "sync_playwright",
    "async_playwright",
    ".get_by_",
    "page.goto(",
    "expect_popup",
];

/// Substrings that mark a JS/TS automation script.
const SCRIPT_MARKERS: &[&str] = &[
    "await page.",
    "await expect(",
    "page.getBy",
    "page.locator(",
    "async function",
    "=>",
];

/// Type-annotation markers that upgrade a script match to TypeScript.
const TYPESCRIPT_MARKERS: &[&str] = &[": Page", "interface ", "<Page>", "import type", ": Promise<"];

/// Classify raw recording text. Never panics, never errors; ambiguous input
/// yields `Format::Unknown` and the caller must treat it as unparseable.
pub fn detect(content: &str) -> Format {
    let trimmed = content.trim();

    // JSON-shaped input first: a HAR trace or a saved action list. A parse
    // failure falls through to the script heuristics rather than giving up.
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if value.pointer("/log/entries").is_some() {
                return Format::Har;
            }
            if value.is_array() || value.get("actions").is_some() {
                return Format::Json;
            }
        }
    }

    if PYTHON_MARKERS.iter().any(|m| content.contains(m)) {
        return Format::Python;
    }

    if SCRIPT_MARKERS.iter().any(|m| content.contains(m)) {
        if TYPESCRIPT_MARKERS.iter().any(|m| content.contains(m)) {
            return Format::Typescript;
        }
        return Format::Javascript;
    }

    Format::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_unknown() {
        assert_eq!(detect(""), Format::Unknown);
        assert_eq!(detect("   \n  "), Format::Unknown);
    }

    #[test]
    fn prose_is_unknown() {
        assert_eq!(detect("just some notes about the test plan"), Format::Unknown);
    }

    #[test]
    fn har_log_entries() {
        let content = r#"{ "log": { "version": "1.2", "entries": [] } }"#;
        assert_eq!(detect(content), Format::Har);
    }

    #[test]
    fn json_action_list() {
        let array = r#"[{"type":"click","rawLine":"x","lineNumber":1}]"#;
        assert_eq!(detect(array), Format::Json);
        let object = r#"{"actions":[]}"#;
        assert_eq!(detect(object), Format::Json);
    }

    #[test]
    fn json_without_known_shape_falls_through() {
        assert_eq!(detect(r#"{"foo": 1}"#), Format::Unknown);
    }

    #[test]
    fn malformed_json_falls_through_to_scripts() {
        // Broken JSON that still carries script markers keeps its script class.
        assert_eq!(detect("{ await page.goto('x') }"), Format::Python);
    }

    #[test]
    fn python_markers() {
        assert_eq!(
            detect("from playwright.sync_api import sync_playwright"),
            Format::Python
        );
        assert_eq!(detect("page.get_by_role(\"button\").click()"), Format::Python);
        assert_eq!(detect("page.goto(\"https://x.com\")"), Format::Python);
    }

    #[test]
    fn javascript_markers() {
        assert_eq!(detect("await page.getByText('Hi').click();"), Format::Javascript);
        assert_eq!(detect("const go = async () => {};"), Format::Javascript);
    }

    #[test]
    fn typescript_needs_type_annotations() {
        let source = "import type { Page } from '@playwright/test';\nawait page.getByRole('button').click();";
        assert_eq!(detect(source), Format::Typescript);
    }
}
