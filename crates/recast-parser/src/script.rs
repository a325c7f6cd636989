//! Heuristic parser for script-style recordings that have no grammar binding
//! in this toolchain, Python automation scripts foremost. Recognized calls
//! are matched by a fixed pattern table; everything else on a line is
//! ignored. This is best effort by design, not a formal grammar.

use std::sync::LazyLock;

use recast_common::protocol::{
    Action, ActionType, Assertion, AssertionType, LocatorType, ParseIssue, ParseResult,
};
use regex::Regex;
use tracing::debug;

/// One recognized call pattern. Rules are evaluated in order; the first
/// needle found on a line wins.
struct MethodRule {
    needle: &'static str,
    kind: ActionType,
    takes_value: bool,
}

const METHOD_RULES: &[MethodRule] = &[
    MethodRule { needle: ".goto(", kind: ActionType::Goto, takes_value: false },
    MethodRule { needle: ".dblclick(", kind: ActionType::Dblclick, takes_value: false },
    MethodRule { needle: ".click(", kind: ActionType::Click, takes_value: false },
    MethodRule { needle: ".fill(", kind: ActionType::Fill, takes_value: true },
    MethodRule { needle: ".type(", kind: ActionType::Fill, takes_value: true },
    MethodRule { needle: ".press(", kind: ActionType::Press, takes_value: true },
    MethodRule { needle: ".select_option(", kind: ActionType::Select, takes_value: true },
    MethodRule { needle: ".selectOption(", kind: ActionType::Select, takes_value: true },
    MethodRule { needle: ".check(", kind: ActionType::Check, takes_value: false },
    MethodRule { needle: ".hover(", kind: ActionType::Hover, takes_value: false },
    MethodRule { needle: ".close(", kind: ActionType::Close, takes_value: false },
];

struct MatcherRule {
    needle: &'static str,
    kind: AssertionType,
    matcher: &'static str,
}

// Both the snake_case and camelCase spellings are listed because goto-bearing
// JS/TS sources route here through the python vocabulary.
const MATCHER_RULES: &[MatcherRule] = &[
    MatcherRule { needle: ".to_have_url(", kind: AssertionType::Url, matcher: "to_have_url" },
    MatcherRule { needle: ".toHaveURL(", kind: AssertionType::Url, matcher: "toHaveURL" },
    MatcherRule { needle: ".to_be_visible(", kind: AssertionType::Visible, matcher: "to_be_visible" },
    MatcherRule { needle: ".toBeVisible(", kind: AssertionType::Visible, matcher: "toBeVisible" },
    MatcherRule { needle: ".to_have_text(", kind: AssertionType::Text, matcher: "to_have_text" },
    MatcherRule { needle: ".toHaveText(", kind: AssertionType::Text, matcher: "toHaveText" },
    MatcherRule { needle: ".to_contain_text(", kind: AssertionType::Text, matcher: "to_contain_text" },
    MatcherRule { needle: ".toContainText(", kind: AssertionType::Text, matcher: "toContainText" },
];

const LOCATOR_RULES: &[(&str, LocatorType)] = &[
    (".get_by_role(", LocatorType::Role),
    (".getByRole(", LocatorType::Role),
    (".get_by_text(", LocatorType::Text),
    (".getByText(", LocatorType::Text),
    (".get_by_label(", LocatorType::Label),
    (".getByLabel(", LocatorType::Label),
    (".get_by_placeholder(", LocatorType::Placeholder),
    (".getByPlaceholder(", LocatorType::Placeholder),
    (".get_by_test_id(", LocatorType::Testid),
    (".getByTestId(", LocatorType::Testid),
    (".locator(", LocatorType::Css),
];

static STRING_LIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'"#).unwrap());
static NAME_KWARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name\s*[:=]\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#).unwrap()
});
static RECEIVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:await\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\.").unwrap());
static PAGE_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(page\d+)\b").unwrap());

/// Parse a script recording line by line. Lines matching no pattern are
/// skipped silently so imports, control flow and comments pass through.
pub fn parse(content: &str) -> ParseResult {
    let mut result = ParseResult::default();
    let mut has_popups = false;
    let mut has_assertions = false;

    for (idx, raw) in content.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.contains("expect_popup") {
            has_popups = true;
        }
        let page_context = PAGE_VAR
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        if page_context.is_some() {
            has_popups = true;
        }

        if line.contains("expect(") {
            if let Some(mut action) = parse_assertion(line, line_number) {
                action.page_context = page_context;
                has_assertions = true;
                result.actions.push(action);
                continue;
            }
        }

        let Some((rule, pos)) = METHOD_RULES
            .iter()
            .find_map(|rule| line.find(rule.needle).map(|pos| (rule, pos)))
        else {
            continue;
        };

        let Some(mut action) = action_from_rule(line, line_number, rule, pos, &mut result.parse_errors)
        else {
            continue;
        };
        action.page_context = page_context;

        if action.kind == ActionType::Goto
            && result.metadata.start_url.is_none()
            && action.url.is_some()
        {
            result.metadata.start_url = action.url.clone();
        }
        result.actions.push(action);
    }

    result.metadata.total_actions = result.actions.len();
    result.metadata.has_assertions = Some(has_assertions);
    result.metadata.has_popups = Some(has_popups);

    debug!(
        actions = result.actions.len(),
        errors = result.parse_errors.len(),
        "script heuristic parse complete"
    );
    result
}

fn action_from_rule(
    line: &str,
    line_number: usize,
    rule: &MethodRule,
    pos: usize,
    issues: &mut Vec<ParseIssue>,
) -> Option<Action> {
    let mut action = Action::new(rule.kind, line, line_number);
    let prefix = &line[..pos];
    let args_segment = &line[pos + rule.needle.len()..];

    match rule.kind {
        ActionType::Goto => match string_literals(args_segment, 1).into_iter().next() {
            Some(url) => action.url = Some(url),
            None => issues.push(issue("non-literal URL in goto call", line, line_number)),
        },
        ActionType::Close => {
            // Only page handles produce a close action; browser and context
            // teardown is boilerplate.
            let receiver = RECEIVER.captures(line).and_then(|c| c.get(1));
            if !receiver.is_some_and(|m| m.as_str().starts_with("page")) {
                return None;
            }
        }
        _ => {
            let literals = string_literals(args_segment, 2);
            match scan_locator(prefix) {
                Some((locator_type, locator_value, element_name)) => {
                    action.locator_type = Some(locator_type);
                    action.locator_value = Some(locator_value);
                    action.element_name = element_name;
                    if rule.takes_value {
                        match literals.into_iter().next() {
                            Some(value) => action.value = Some(value),
                            None => issues.push(issue(
                                &format!("non-literal argument in {} call", rule.kind.as_str()),
                                line,
                                line_number,
                            )),
                        }
                    }
                }
                None => {
                    let mut literals = literals.into_iter();
                    if rule.takes_value {
                        match (literals.next(), literals.next()) {
                            // Selector-first calling convention: fill(selector, value).
                            (Some(selector), Some(value)) => {
                                let (locator_type, locator_value) = selector_locator(&selector);
                                action.locator_type = Some(locator_type);
                                action.locator_value = Some(locator_value);
                                action.value = Some(value);
                            }
                            (Some(value), None) => action.value = Some(value),
                            (None, _) => issues.push(issue(
                                &format!("non-literal argument in {} call", rule.kind.as_str()),
                                line,
                                line_number,
                            )),
                        }
                    } else if let Some(selector) = literals.next() {
                        let (locator_type, locator_value) = selector_locator(&selector);
                        action.locator_type = Some(locator_type);
                        action.locator_value = Some(locator_value);
                    }
                }
            }
        }
    }

    Some(action)
}

fn parse_assertion(line: &str, line_number: usize) -> Option<Action> {
    let (rule, pos) = MATCHER_RULES
        .iter()
        .find_map(|rule| line.find(rule.needle).map(|pos| (rule, pos)))?;
    let prefix = &line[..pos];
    let args_segment = &line[pos + rule.needle.len()..];

    let mut action = Action::new(ActionType::Expect, line, line_number);
    let locator = scan_locator(prefix);
    if let Some((locator_type, locator_value, element_name)) = locator.clone() {
        action.locator_type = Some(locator_type);
        action.locator_value = Some(locator_value);
        action.element_name = element_name;
    }

    let expected = match rule.kind {
        AssertionType::Visible => locator
            .map(|(_, value, _)| value)
            .unwrap_or_else(|| expect_argument(prefix)),
        _ => string_literals(args_segment, 1)
            .into_iter()
            .next()
            .unwrap_or_else(|| raw_argument(args_segment)),
    };

    action.assertion = Some(Assertion {
        kind: rule.kind,
        expected,
        matcher: Some(rule.matcher.to_string()),
    });
    Some(action)
}

/// Rightmost locator constructor in the chain wins; chained filters narrow
/// the target, so the one closest to the action is the real one.
fn scan_locator(prefix: &str) -> Option<(LocatorType, String, Option<String>)> {
    let mut best: Option<(usize, &'static str, LocatorType)> = None;
    for &(needle, locator_type) in LOCATOR_RULES {
        if let Some(pos) = prefix.rfind(needle) {
            if best.is_none_or(|(b, _, _)| pos > b) {
                best = Some((pos, needle, locator_type));
            }
        }
    }
    let (pos, needle, mut locator_type) = best?;
    let segment = &prefix[pos + needle.len()..];
    let value = string_literals(segment, 1).into_iter().next()?;

    if locator_type == LocatorType::Css && (value.starts_with("//") || value.starts_with("xpath=")) {
        locator_type = LocatorType::Xpath;
    }
    let value = value.strip_prefix("xpath=").map(str::to_string).unwrap_or(value);

    let element_name = if locator_type == LocatorType::Role {
        NAME_KWARG.captures(segment).map(|caps| {
            let raw = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
            unescape(raw)
        })
    } else {
        None
    };
    Some((locator_type, value, element_name))
}

fn selector_locator(value: &str) -> (LocatorType, String) {
    if let Some(stripped) = value.strip_prefix("xpath=") {
        (LocatorType::Xpath, stripped.to_string())
    } else if value.starts_with("//") {
        (LocatorType::Xpath, value.to_string())
    } else {
        (LocatorType::Css, value.to_string())
    }
}

fn string_literals(segment: &str, limit: usize) -> Vec<String> {
    STRING_LIT
        .captures_iter(segment)
        .take(limit)
        .map(|caps| {
            let raw = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
            unescape(raw)
        })
        .collect()
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Inner expression of `expect(...)`, used as a fallback expectation text.
fn expect_argument(prefix: &str) -> String {
    let start = prefix
        .find("expect(")
        .map(|i| i + "expect(".len())
        .unwrap_or(0);
    prefix[start..].trim_end().trim_end_matches(')').trim().to_string()
}

fn raw_argument(segment: &str) -> String {
    segment
        .trim()
        .trim_end_matches(';')
        .trim_end_matches(')')
        .to_string()
}

fn issue(reason: &str, line: &str, line_number: usize) -> ParseIssue {
    ParseIssue {
        reason: reason.to_string(),
        line: Some(line.to_string()),
        line_number: Some(line_number),
        context: None,
    }
}
