use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The closed set of normalized action types. Source operations outside this
/// set are dropped during parsing, never represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Goto,
    Click,
    Dblclick,
    Fill,
    Press,
    Check,
    Select,
    Hover,
    Close,
    Expect,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Goto => "goto",
            ActionType::Click => "click",
            ActionType::Dblclick => "dblclick",
            ActionType::Fill => "fill",
            ActionType::Press => "press",
            ActionType::Check => "check",
            ActionType::Select => "select",
            ActionType::Hover => "hover",
            ActionType::Close => "close",
            ActionType::Expect => "expect",
        }
    }

    /// Whether an action of this type targets a page element. Actions that
    /// do not are exempt from the locator completeness check.
    pub fn requires_locator(&self) -> bool {
        !matches!(
            self,
            ActionType::Goto | ActionType::Close | ActionType::Expect
        )
    }
}

/// How the target element was identified in the source recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorType {
    Role,
    Text,
    Label,
    Placeholder,
    Testid,
    Css,
    Xpath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionType {
    Url,
    Visible,
    Text,
}

/// Payload carried by `expect` actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    #[serde(rename = "type")]
    pub kind: AssertionType,
    pub expected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
}

/// One normalized UI action. Every parser produces these regardless of the
/// input format; insertion order is the replay order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator_type: Option<LocatorType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator_value: Option<String>,
    /// Accessible name attached to a `role` locator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_name: Option<String>,
    /// Payload for `fill`, `press` and `select`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Present only on `goto` actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<Assertion>,
    /// The source fragment this action was derived from.
    pub raw_line: String,
    /// 1-based source line, or a synthetic counter for formats that are not
    /// line oriented.
    pub line_number: usize,
    /// Browser page or tab the action applies to. `None` means the default
    /// page; popup-derived actions carry the popup's identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_context: Option<String>,
    /// True for actions reconstructed from indirect evidence (for example a
    /// form POST in a network trace) rather than observed directly.
    #[serde(default)]
    pub synthesized: bool,
}

impl Action {
    pub fn new(kind: ActionType, raw_line: impl Into<String>, line_number: usize) -> Self {
        Self {
            kind,
            locator_type: None,
            locator_value: None,
            element_name: None,
            value: None,
            url: None,
            assertion: None,
            raw_line: raw_line.into(),
            line_number,
            page_context: None,
            synthesized: false,
        }
    }
}

/// Format-specific facts normalized to a common subset. Flags stay `None`
/// when a parser cannot know them; they are never defaulted to a guess.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    pub total_actions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_assertions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_popups: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_form_submissions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_ajax_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_async: Option<bool>,
    /// Format-specific extras that have no common slot.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A recoverable problem encountered while parsing. Parsing continues past
/// these; they are reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseIssue {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Uniform output of every parser, before format tagging and validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub actions: Vec<Action>,
    pub metadata: Metadata,
    pub parse_errors: Vec<ParseIssue>,
}

/// Recording formats the subsystem can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Python,
    Typescript,
    Javascript,
    Json,
    Har,
    Unknown,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Python => "python",
            Format::Typescript => "typescript",
            Format::Javascript => "javascript",
            Format::Json => "json",
            Format::Har => "har",
            Format::Unknown => "unknown",
        }
    }
}

/// Final result returned to callers: the parse result plus the detected (or
/// forced) format and advisory validation warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversalParseResult {
    pub format: Format,
    pub actions: Vec<Action>,
    pub metadata: Metadata,
    pub parse_errors: Vec<ParseIssue>,
    pub warnings: Vec<String>,
}
