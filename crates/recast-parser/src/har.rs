//! Network-trace parser for HAR (HTTP Archive) recordings.
//!
//! No UI events are present in a HAR file, so user actions are inferred
//! from request/response pairs: HTML GETs become navigations, POST bodies
//! are reconstructed into form fills plus a submit click, and leftover HTML
//! GETs become link clicks. The reconstruction passes are independent pure
//! functions over the same entry list; their fixed composition order, not
//! request order, decides the output ordering.
//!
//! This parser never propagates an error: anything wrong with the document
//! becomes a single parse issue and an empty action list.

use std::collections::HashSet;

use recast_common::protocol::{
    Action, ActionType, LocatorType, Metadata, ParseIssue, ParseResult,
};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct HarFile {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    entries: Vec<HarEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HarEntry {
    request: HarRequest,
    response: HarResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HarRequest {
    method: String,
    url: String,
    headers: Vec<HarHeader>,
    #[serde(rename = "postData")]
    post_data: Option<HarPostData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HarHeader {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HarPostData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    params: Vec<HarPostParam>,
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HarPostParam {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HarResponse {
    status: u16,
    content: HarContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HarContent {
    #[serde(rename = "mimeType")]
    mime_type: String,
}

/// Parse a HAR document into inferred actions.
pub fn parse(content: &str) -> ParseResult {
    let har: HarFile = match serde_json::from_str(content) {
        Ok(har) => har,
        Err(err) => {
            warn!(%err, "HAR document rejected");
            return ParseResult {
                actions: Vec::new(),
                metadata: Metadata::default(),
                parse_errors: vec![ParseIssue {
                    reason: format!("invalid HAR document: {err}"),
                    line: None,
                    line_number: None,
                    context: None,
                }],
            };
        }
    };
    let entries = &har.log.entries;

    let (mut actions, start_url, consumed) = extract_navigations(entries);
    let (form_actions, has_forms) = extract_form_submissions(entries);
    actions.extend(form_actions);
    let has_ajax = has_ajax_calls(entries);
    actions.extend(extract_link_clicks(entries, &consumed));

    // Synthetic line numbers follow the assembled output order.
    for (idx, action) in actions.iter_mut().enumerate() {
        action.line_number = idx + 1;
    }

    debug!(
        entries = entries.len(),
        actions = actions.len(),
        "network trace parse complete"
    );

    ParseResult {
        metadata: Metadata {
            start_url,
            total_actions: actions.len(),
            has_form_submissions: Some(has_forms),
            has_ajax_calls: Some(has_ajax),
            ..Default::default()
        },
        actions,
        parse_errors: Vec::new(),
    }
}

fn is_html_get(entry: &HarEntry) -> bool {
    entry.request.method.eq_ignore_ascii_case("GET")
        && entry.response.content.mime_type.contains("text/html")
}

fn is_iframe_load(entry: &HarEntry) -> bool {
    header_value(&entry.request.headers, "sec-fetch-dest")
        .is_some_and(|v| v.eq_ignore_ascii_case("iframe"))
}

fn header_value<'a>(headers: &'a [HarHeader], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Pass 1: top-level HTML GETs become `goto` actions, deduplicated against
/// the immediately preceding navigation only. Returns the entry indices it
/// consumed so the link-click pass can skip them.
fn extract_navigations(entries: &[HarEntry]) -> (Vec<Action>, Option<String>, HashSet<usize>) {
    let mut actions = Vec::new();
    let mut consumed = HashSet::new();
    let mut last_url: Option<&str> = None;

    for (idx, entry) in entries.iter().enumerate() {
        if !is_html_get(entry) || is_iframe_load(entry) {
            continue;
        }
        if last_url == Some(entry.request.url.as_str()) {
            continue;
        }
        last_url = Some(entry.request.url.as_str());
        consumed.insert(idx);

        let mut action = Action::new(ActionType::Goto, format!("GET {}", entry.request.url), 0);
        action.url = Some(entry.request.url.clone());
        actions.push(action);
    }

    let start_url = actions.first().and_then(|a| a.url.clone());
    (actions, start_url, consumed)
}

/// Pass 2: each POST body field becomes a synthetic `fill`, followed by one
/// synthetic submit `click`. The click was never observed, only the POST it
/// caused; both carry the `synthesized` marker.
fn extract_form_submissions(entries: &[HarEntry]) -> (Vec<Action>, bool) {
    let mut actions = Vec::new();
    let mut has_forms = false;

    for entry in entries {
        if !entry.request.method.eq_ignore_ascii_case("POST") {
            continue;
        }
        let Some(post_data) = &entry.request.post_data else {
            continue;
        };
        has_forms = true;
        let raw = format!("POST {}", entry.request.url);

        for (name, value) in extract_fields(post_data) {
            let mut fill = Action::new(ActionType::Fill, raw.clone(), 0);
            fill.locator_type = Some(LocatorType::Label);
            fill.locator_value = Some(name);
            fill.value = Some(value);
            fill.synthesized = true;
            actions.push(fill);
        }

        let mut click = Action::new(ActionType::Click, raw, 0);
        click.locator_type = Some(LocatorType::Role);
        click.locator_value = Some("button".to_string());
        click.element_name = Some("Submit".to_string());
        click.synthesized = true;
        actions.push(click);
    }

    (actions, has_forms)
}

fn extract_fields(post_data: &HarPostData) -> Vec<(String, String)> {
    if !post_data.params.is_empty() {
        return post_data
            .params
            .iter()
            .map(|p| (p.name.clone(), p.value.clone().unwrap_or_default()))
            .collect();
    }
    let Some(text) = post_data.text.as_deref() else {
        return Vec::new();
    };
    if post_data.mime_type.contains("application/x-www-form-urlencoded") {
        return url::form_urlencoded::parse(text.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
    }
    if post_data.mime_type.contains("application/json") {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(text) {
            return map
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect();
        }
    }
    Vec::new()
}

/// Pass 3: XHR/data requests generate no actions of their own; they are
/// assumed to be side effects of actions already captured.
fn has_ajax_calls(entries: &[HarEntry]) -> bool {
    entries.iter().any(|entry| {
        header_value(&entry.request.headers, "x-requested-with")
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
            || is_data_response(entry)
    })
}

fn is_data_response(entry: &HarEntry) -> bool {
    let mime = &entry.response.content.mime_type;
    !mime.contains("html") && (mime.contains("json") || mime.contains("xml"))
}

/// Pass 4: HTML GETs the navigation pass did not take are treated as the
/// consequence of a link click, with the link text inferred from the URL.
fn extract_link_clicks(entries: &[HarEntry], consumed: &HashSet<usize>) -> Vec<Action> {
    let mut actions = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        if consumed.contains(&idx) || !is_html_get(entry) || is_iframe_load(entry) {
            continue;
        }
        let mut action = Action::new(ActionType::Click, format!("GET {}", entry.request.url), 0);
        action.locator_type = Some(LocatorType::Text);
        action.locator_value = Some(link_text(&entry.request.url));
        action.synthesized = true;
        actions.push(action);
    }
    actions
}

fn link_text(raw_url: &str) -> String {
    let segment = Url::parse(raw_url).ok().and_then(|url| {
        url.path_segments().and_then(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .last()
                .map(|s| s.to_string())
        })
    });
    match segment {
        Some(s) => capitalize(&s),
        None => "Link".to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Link".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_get(url: &str) -> String {
        format!(
            r#"{{ "request": {{ "method": "GET", "url": "{url}", "headers": [] }},
                 "response": {{ "status": 200, "content": {{ "mimeType": "text/html; charset=utf-8" }} }} }}"#
        )
    }

    fn har_with(entries: &[String]) -> String {
        format!(
            r#"{{ "log": {{ "version": "1.2", "entries": [{}] }} }}"#,
            entries.join(",")
        )
    }

    #[test]
    fn single_navigation() {
        let har = har_with(&[html_get("https://shop.com/")]);
        let result = parse(&har);
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].kind, ActionType::Goto);
        assert_eq!(result.actions[0].url.as_deref(), Some("https://shop.com/"));
        assert_eq!(result.actions[0].line_number, 1);
        assert_eq!(result.metadata.start_url.as_deref(), Some("https://shop.com/"));
        assert!(!result.actions[0].synthesized);
    }

    #[test]
    fn adjacent_duplicates_become_link_clicks() {
        let har = har_with(&[
            html_get("https://shop.com/cart"),
            html_get("https://shop.com/cart"),
        ]);
        let result = parse(&har);
        assert_eq!(result.actions.len(), 2);
        assert_eq!(result.actions[0].kind, ActionType::Goto);
        assert_eq!(result.actions[1].kind, ActionType::Click);
        assert_eq!(result.actions[1].locator_value.as_deref(), Some("Cart"));
        assert!(result.actions[1].synthesized);
    }

    #[test]
    fn form_post_reconstruction() {
        let post = r#"{ "request": { "method": "POST", "url": "https://shop.com/login",
            "headers": [],
            "postData": { "mimeType": "application/x-www-form-urlencoded",
                          "params": [ { "name": "email", "value": "a@b.com" } ] } },
            "response": { "status": 302, "content": { "mimeType": "text/html" } } }"#;
        let har = har_with(&[post.to_string()]);
        let result = parse(&har);
        assert_eq!(result.actions.len(), 2);
        let fill = &result.actions[0];
        assert_eq!(fill.kind, ActionType::Fill);
        assert_eq!(fill.locator_type, Some(LocatorType::Label));
        assert_eq!(fill.locator_value.as_deref(), Some("email"));
        assert_eq!(fill.value.as_deref(), Some("a@b.com"));
        assert!(fill.synthesized);
        let click = &result.actions[1];
        assert_eq!(click.kind, ActionType::Click);
        assert_eq!(click.locator_value.as_deref(), Some("button"));
        assert_eq!(click.element_name.as_deref(), Some("Submit"));
        assert!(click.synthesized);
        assert_eq!(result.metadata.has_form_submissions, Some(true));
    }

    #[test]
    fn urlencoded_body_text_is_parsed() {
        let post_data = HarPostData {
            mime_type: "application/x-www-form-urlencoded".to_string(),
            params: Vec::new(),
            text: Some("user=jo&pass=secret%21".to_string()),
        };
        let fields = extract_fields(&post_data);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], ("user".to_string(), "jo".to_string()));
        assert_eq!(fields[1], ("pass".to_string(), "secret!".to_string()));
    }

    #[test]
    fn json_body_keys_become_fields() {
        let post_data = HarPostData {
            mime_type: "application/json".to_string(),
            params: Vec::new(),
            text: Some(r#"{"email":"a@b.com","remember":true}"#.to_string()),
        };
        let fields = extract_fields(&post_data);
        assert!(fields.contains(&("email".to_string(), "a@b.com".to_string())));
        assert!(fields.contains(&("remember".to_string(), "true".to_string())));
    }

    #[test]
    fn ajax_flag_without_actions() {
        let xhr = r#"{ "request": { "method": "GET", "url": "https://shop.com/api/cart",
            "headers": [ { "name": "X-Requested-With", "value": "XMLHttpRequest" } ] },
            "response": { "status": 200, "content": { "mimeType": "application/json" } } }"#;
        let har = har_with(&[xhr.to_string()]);
        let result = parse(&har);
        assert!(result.actions.is_empty());
        assert_eq!(result.metadata.has_ajax_calls, Some(true));
    }

    #[test]
    fn iframe_loads_are_excluded() {
        let iframe = r#"{ "request": { "method": "GET", "url": "https://ads.example/frame",
            "headers": [ { "name": "Sec-Fetch-Dest", "value": "iframe" } ] },
            "response": { "status": 200, "content": { "mimeType": "text/html" } } }"#;
        let har = har_with(&[html_get("https://shop.com/"), iframe.to_string()]);
        let result = parse(&har);
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].kind, ActionType::Goto);
    }

    #[test]
    fn missing_entries_is_a_single_issue() {
        let result = parse(r#"{ "log": { "version": "1.2" } }"#);
        assert!(result.actions.is_empty());
        assert_eq!(result.parse_errors.len(), 1);
        assert!(result.parse_errors[0].reason.contains("invalid HAR document"));
    }

    #[test]
    fn link_text_from_path_segment() {
        assert_eq!(link_text("https://shop.com/products/gloves"), "Gloves");
        assert_eq!(link_text("https://shop.com/"), "Link");
        assert_eq!(link_text("not a url"), "Link");
    }
}
