//! AST-based parser for JS/TS automation recordings.
//!
//! The source is parsed with a tree-sitter grammar and visited top down.
//! Each candidate call expression is rebuilt into its method chain by
//! walking the call and member-access spine back to a root identifier;
//! the chain's terminal method selects the action type and earlier links
//! contribute the locator.
//!
//! Unlike the heuristic script parser this one is all or nothing: a tree
//! containing syntax errors cannot be visited safely, so the error is
//! raised to the router.

use std::collections::HashMap;

use recast_common::protocol::{
    Action, ActionType, Assertion, AssertionType, Format, LocatorType, Metadata, ParseIssue,
    ParseResult,
};
use thiserror::Error;
use tracing::debug;
use tree_sitter::{Node, Parser};

#[derive(Debug, Error)]
pub enum ChainParseError {
    #[error("failed to load {0} grammar: {1}")]
    Language(&'static str, tree_sitter::LanguageError),
    #[error("source could not be parsed")]
    Unparseable,
    #[error("syntax error at line {line}")]
    Syntax { line: usize },
}

/// Parse JS/TS source into actions. `format` selects the grammar; anything
/// other than `Format::Typescript` uses the JavaScript grammar.
pub fn parse(content: &str, format: Format) -> Result<ParseResult, ChainParseError> {
    let mut parser = Parser::new();
    let (name, language): (&'static str, tree_sitter::Language) = match format {
        Format::Typescript => (
            "typescript",
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        ),
        _ => ("javascript", tree_sitter_javascript::LANGUAGE.into()),
    };
    parser
        .set_language(&language)
        .map_err(|e| ChainParseError::Language(name, e))?;

    let tree = parser
        .parse(content, None)
        .ok_or(ChainParseError::Unparseable)?;
    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(1);
        return Err(ChainParseError::Syntax { line });
    }

    let mut visitor = Visitor::new(content);
    visitor.visit(root);
    let result = visitor.finish();
    debug!(
        actions = result.actions.len(),
        errors = result.parse_errors.len(),
        "AST chain parse complete"
    );
    Ok(result)
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(line) = first_error_line(child) {
            return Some(line);
        }
    }
    None
}

fn action_kind(method: &str) -> Option<ActionType> {
    match method {
        "goto" => Some(ActionType::Goto),
        "click" => Some(ActionType::Click),
        "dblclick" => Some(ActionType::Dblclick),
        "fill" | "type" => Some(ActionType::Fill),
        "press" => Some(ActionType::Press),
        "check" => Some(ActionType::Check),
        "selectOption" => Some(ActionType::Select),
        "hover" => Some(ActionType::Hover),
        "close" => Some(ActionType::Close),
        _ => None,
    }
}

fn assertion_kind(method: &str) -> Option<AssertionType> {
    match method {
        "toHaveURL" => Some(AssertionType::Url),
        "toBeVisible" => Some(AssertionType::Visible),
        "toHaveText" | "toContainText" => Some(AssertionType::Text),
        _ => None,
    }
}

/// One link in a reconstructed method chain, source order.
struct ChainLink<'t> {
    method: String,
    args: Option<Node<'t>>,
}

enum ChainBase<'t> {
    /// Chain rooted at a plain identifier: `page`, `page1`, a locator variable.
    Identifier(String),
    /// Chain rooted at a direct call such as `expect(...)`.
    Call {
        name: String,
        args: Option<Node<'t>>,
    },
    /// Anything else (subscripts, literals); kept for debuggability.
    Other(String),
}

#[derive(Debug, Clone)]
struct LocatorBinding {
    locator_type: LocatorType,
    locator_value: String,
    element_name: Option<String>,
}

struct Visitor<'a> {
    source: &'a str,
    actions: Vec<Action>,
    parse_errors: Vec<ParseIssue>,
    locator_vars: HashMap<String, LocatorBinding>,
    start_url: Option<String>,
    has_async: bool,
    has_assertions: bool,
    has_popups: bool,
}

impl<'a> Visitor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            actions: Vec::new(),
            parse_errors: Vec::new(),
            locator_vars: HashMap::new(),
            start_url: None,
            has_async: false,
            has_assertions: false,
            has_popups: false,
        }
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "await_expression" => self.has_async = true,
            "call_expression" => {
                if is_chain_terminal(node) {
                    self.handle_call(node);
                }
            }
            "variable_declarator" => self.handle_declarator(node),
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn finish(self) -> ParseResult {
        ParseResult {
            metadata: Metadata {
                start_url: self.start_url,
                total_actions: self.actions.len(),
                has_assertions: Some(self.has_assertions),
                has_popups: Some(self.has_popups),
                has_async: Some(self.has_async),
                ..Default::default()
            },
            actions: self.actions,
            parse_errors: self.parse_errors,
        }
    }

    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Source fragment for an action, including the `await` wrapper when
    /// there is one.
    fn raw_text(&self, node: Node) -> String {
        let node = match node.parent() {
            Some(parent) if parent.kind() == "await_expression" => parent,
            _ => node,
        };
        self.text(node).to_string()
    }

    /// Rebuild the method chain of an outermost call expression. Returns the
    /// root of the chain and its links in source order (base first).
    fn reconstruct_chain<'t>(&self, node: Node<'t>) -> Option<(ChainBase<'t>, Vec<ChainLink<'t>>)> {
        let mut links: Vec<ChainLink<'t>> = Vec::new();
        let mut current = node;
        let base;
        loop {
            let func = current.child_by_field_name("function")?;
            let args = current.child_by_field_name("arguments");
            match func.kind() {
                "member_expression" => {
                    let property = func.child_by_field_name("property")?;
                    links.push(ChainLink {
                        method: self.text(property).to_string(),
                        args,
                    });
                    let mut object = func.child_by_field_name("object")?;
                    // Pass through bare property links (`.not`, `.value`) and
                    // await/paren wrappers inside the spine.
                    loop {
                        match object.kind() {
                            "member_expression" => {
                                let prop = object.child_by_field_name("property")?;
                                links.push(ChainLink {
                                    method: self.text(prop).to_string(),
                                    args: None,
                                });
                                object = object.child_by_field_name("object")?;
                            }
                            "await_expression" | "parenthesized_expression" => {
                                object = object.named_child(0)?;
                            }
                            _ => break,
                        }
                    }
                    match object.kind() {
                        "call_expression" => {
                            current = object;
                        }
                        "identifier" => {
                            base = ChainBase::Identifier(self.text(object).to_string());
                            break;
                        }
                        _ => {
                            base = ChainBase::Other(self.text(object).to_string());
                            break;
                        }
                    }
                }
                "identifier" => {
                    base = ChainBase::Call {
                        name: self.text(func).to_string(),
                        args,
                    };
                    break;
                }
                _ => {
                    base = ChainBase::Other(self.text(func).to_string());
                    break;
                }
            }
        }
        links.reverse();
        Some((base, links))
    }

    fn handle_call(&mut self, node: Node) {
        let Some((base, links)) = self.reconstruct_chain(node) else {
            return;
        };

        if let ChainBase::Call { name, args } = &base {
            if name == "expect" {
                self.handle_assertion(node, *args, &links);
            }
            // Other root calls (test, require, helpers) are not actions.
            return;
        }

        let Some(terminal) = links.last() else {
            return;
        };
        let Some(kind) = action_kind(&terminal.method) else {
            // Popup hand-off is tracked even though it emits no action.
            if matches!(terminal.method.as_str(), "waitForEvent" | "on")
                && self.first_string_arg(terminal.args).as_deref() == Some("popup")
            {
                self.has_popups = true;
            }
            return;
        };

        let base_name = match &base {
            ChainBase::Identifier(name) => Some(name.clone()),
            _ => None,
        };
        if kind == ActionType::Close
            && !base_name.as_deref().is_some_and(|n| n.starts_with("page"))
        {
            return;
        }

        let raw_line = self.raw_text(node);
        let line_number = node.start_position().row + 1;
        let mut action = Action::new(kind, raw_line, line_number);

        let locator = self
            .scan_links_for_locator(&links[..links.len() - 1])
            .or_else(|| {
                base_name
                    .as_ref()
                    .and_then(|name| self.locator_vars.get(name).cloned())
            });
        if let Some(binding) = locator {
            action.locator_type = Some(binding.locator_type);
            action.locator_value = Some(binding.locator_value);
            action.element_name = binding.element_name;
        }
        if let Some(name) = &base_name {
            if name.starts_with("page") && name != "page" {
                action.page_context = Some(name.clone());
            }
        }

        match kind {
            ActionType::Goto => match self.first_string_arg(terminal.args) {
                Some(url) => {
                    if self.start_url.is_none() {
                        self.start_url = Some(url.clone());
                    }
                    action.url = Some(url);
                }
                None => {
                    let (raw, line) = (action.raw_line.clone(), action.line_number);
                    self.push_issue("non-literal URL in goto call".to_string(), raw, line);
                }
            },
            ActionType::Fill | ActionType::Press | ActionType::Select => {
                match self.first_string_arg(terminal.args) {
                    Some(value) => action.value = Some(value),
                    None => {
                        let (raw, line) = (action.raw_line.clone(), action.line_number);
                        self.push_issue(
                            format!("non-literal argument in {} call", terminal.method),
                            raw,
                            line,
                        );
                    }
                }
            }
            _ => {}
        }

        self.actions.push(action);
    }

    fn handle_assertion(&mut self, node: Node, expect_args: Option<Node>, links: &[ChainLink]) {
        let Some(matcher_link) = links
            .iter()
            .rev()
            .find(|link| assertion_kind(&link.method).is_some())
        else {
            // Matchers outside the table are dropped, not represented.
            return;
        };
        let Some(kind) = assertion_kind(&matcher_link.method) else {
            return;
        };
        self.has_assertions = true;

        let raw_line = self.raw_text(node);
        let line_number = node.start_position().row + 1;
        let mut action = Action::new(ActionType::Expect, raw_line, line_number);

        let mut locator = None;
        let mut arg_text = String::new();
        if let Some(args) = expect_args {
            if let Some(arg) = args.named_child(0) {
                arg_text = self.text(arg).to_string();
                match arg.kind() {
                    "call_expression" => {
                        if let Some((arg_base, arg_links)) = self.reconstruct_chain(arg) {
                            locator = self.scan_links_for_locator(&arg_links).or_else(|| {
                                match &arg_base {
                                    ChainBase::Identifier(name) => {
                                        self.locator_vars.get(name).cloned()
                                    }
                                    _ => None,
                                }
                            });
                            if let ChainBase::Identifier(name) = &arg_base {
                                if name.starts_with("page") && name != "page" {
                                    action.page_context = Some(name.clone());
                                }
                            }
                        }
                    }
                    "identifier" => {
                        let name = self.text(arg);
                        locator = self.locator_vars.get(name).cloned();
                        if name.starts_with("page") && name != "page" {
                            action.page_context = Some(name.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        if let Some(binding) = &locator {
            action.locator_type = Some(binding.locator_type);
            action.locator_value = Some(binding.locator_value.clone());
            action.element_name = binding.element_name.clone();
        }

        let expected = match kind {
            AssertionType::Visible => locator
                .map(|binding| binding.locator_value)
                .unwrap_or(arg_text),
            _ => self
                .first_string_arg(matcher_link.args)
                .or_else(|| {
                    matcher_link
                        .args
                        .and_then(|args| args.named_child(0))
                        .map(|arg| self.text(arg).to_string())
                })
                .unwrap_or(arg_text),
        };

        action.assertion = Some(Assertion {
            kind,
            expected,
            matcher: Some(matcher_link.method.clone()),
        });
        self.actions.push(action);
    }

    /// Remember locator-producing declarations so later chains rooted at the
    /// variable resolve to the same target.
    fn handle_declarator(&mut self, node: Node) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        if name.kind() != "identifier" {
            return;
        }
        let Some(mut value) = node.child_by_field_name("value") else {
            return;
        };
        if value.kind() == "await_expression" {
            match value.named_child(0) {
                Some(inner) => value = inner,
                None => return,
            }
        }
        if value.kind() != "call_expression" {
            return;
        }
        let Some((_, links)) = self.reconstruct_chain(value) else {
            return;
        };
        let Some(terminal) = links.last() else {
            return;
        };
        if action_kind(&terminal.method).is_some() {
            return;
        }
        if let Some(binding) = self.scan_links_for_locator(&links) {
            let key = self.text(name).to_string();
            self.locator_vars.insert(key, binding);
        }
    }

    /// Scan chain links for locator constructors; the last one wins because
    /// chained filters narrow the target.
    fn scan_links_for_locator(&self, links: &[ChainLink]) -> Option<LocatorBinding> {
        let mut found = None;
        for link in links {
            let locator_type = match link.method.as_str() {
                "getByRole" => LocatorType::Role,
                "getByText" => LocatorType::Text,
                "getByLabel" => LocatorType::Label,
                "getByPlaceholder" => LocatorType::Placeholder,
                "getByTestId" => LocatorType::Testid,
                "locator" => LocatorType::Css,
                _ => continue,
            };
            let Some(value) = self.first_string_arg(link.args) else {
                continue;
            };
            let locator_type = if locator_type == LocatorType::Css && value.starts_with("//") {
                LocatorType::Xpath
            } else {
                locator_type
            };
            let element_name = if locator_type == LocatorType::Role {
                self.object_string_prop(link.args, "name")
            } else {
                None
            };
            found = Some(LocatorBinding {
                locator_type,
                locator_value: value,
                element_name,
            });
        }
        found
    }

    fn first_string_arg(&self, args: Option<Node>) -> Option<String> {
        let args = args?;
        let mut cursor = args.walk();
        for child in args.named_children(&mut cursor) {
            if let Some(text) = self.string_text(child) {
                return Some(text);
            }
        }
        None
    }

    /// String property of the first object literal among the arguments,
    /// e.g. the `name` option of `getByRole('button', { name: 'Submit' })`.
    fn object_string_prop(&self, args: Option<Node>, key: &str) -> Option<String> {
        let args = args?;
        let mut cursor = args.walk();
        for child in args.named_children(&mut cursor) {
            if child.kind() != "object" {
                continue;
            }
            let mut pair_cursor = child.walk();
            for pair in child.named_children(&mut pair_cursor) {
                if pair.kind() != "pair" {
                    continue;
                }
                let Some(key_node) = pair.child_by_field_name("key") else {
                    continue;
                };
                let key_text = match key_node.kind() {
                    "property_identifier" | "identifier" => self.text(key_node).to_string(),
                    "string" => self.string_text(key_node).unwrap_or_default(),
                    _ => continue,
                };
                if key_text != key {
                    continue;
                }
                let value_node = pair.child_by_field_name("value")?;
                return self.string_text(value_node);
            }
        }
        None
    }

    /// Literal text of a string node, escapes resolved. Template strings
    /// count only when they carry no substitution.
    fn string_text(&self, node: Node) -> Option<String> {
        match node.kind() {
            "string" => {
                let mut out = String::new();
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    match child.kind() {
                        "string_fragment" => out.push_str(self.text(child)),
                        "escape_sequence" => out.push_str(&unescape(self.text(child))),
                        _ => {}
                    }
                }
                Some(out)
            }
            "template_string" => {
                let raw = self.text(node);
                if raw.contains("${") {
                    None
                } else {
                    Some(raw.trim_matches('`').to_string())
                }
            }
            _ => None,
        }
    }

    fn push_issue(&mut self, reason: String, line: String, line_number: usize) {
        self.parse_errors.push(ParseIssue {
            reason,
            line: Some(line),
            line_number: Some(line_number),
            context: None,
        });
    }
}

/// A call is the end of its chain unless the surrounding member expression
/// feeds a longer spine or another call.
fn is_chain_terminal(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return true;
    };
    if parent.kind() != "member_expression" {
        return true;
    }
    match parent.parent() {
        Some(grand) => !matches!(grand.kind(), "call_expression" | "member_expression"),
        None => true,
    }
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
