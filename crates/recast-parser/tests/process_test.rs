use recast_common::protocol::{
    ActionType, AssertionType, Format, LocatorType, UniversalParseResult,
};
use recast_parser::{process, validator, ParseOptions};

#[test]
fn role_click_normalizes_from_javascript() {
    let source = "await page.getByRole('button', { name: 'Submit' }).click();";
    let result = process(source, &ParseOptions::default());
    assert_eq!(result.actions.len(), 1);
    let action = &result.actions[0];
    assert_eq!(action.kind, ActionType::Click);
    assert_eq!(action.locator_type, Some(LocatorType::Role));
    assert_eq!(action.locator_value.as_deref(), Some("button"));
    assert_eq!(action.element_name.as_deref(), Some("Submit"));
}

#[test]
fn goto_carries_url_and_start_url() {
    let source = "await page.goto('https://x.com');";
    let result = process(source, &ParseOptions::default());
    assert_eq!(result.actions.len(), 1);
    assert_eq!(result.actions[0].kind, ActionType::Goto);
    assert_eq!(result.actions[0].url.as_deref(), Some("https://x.com"));
    assert_eq!(result.metadata.start_url.as_deref(), Some("https://x.com"));
}

#[test]
fn har_single_navigation() {
    let har = r#"{ "log": { "version": "1.2", "entries": [
        { "request": { "method": "GET", "url": "https://shop.com/", "headers": [] },
          "response": { "status": 200, "content": { "mimeType": "text/html" } } }
    ] } }"#;
    let result = process(har, &ParseOptions::default());
    assert_eq!(result.format, Format::Har);
    assert_eq!(result.actions.len(), 1);
    assert_eq!(result.actions[0].kind, ActionType::Goto);
    assert_eq!(result.actions[0].url.as_deref(), Some("https://shop.com/"));
    assert_eq!(result.metadata.start_url.as_deref(), Some("https://shop.com/"));
}

#[test]
fn har_form_post_becomes_fill_then_click() {
    let har = r#"{ "log": { "version": "1.2", "entries": [
        { "request": { "method": "POST", "url": "https://shop.com/signup", "headers": [],
            "postData": { "mimeType": "application/x-www-form-urlencoded",
                          "params": [ { "name": "email", "value": "a@b.com" } ] } },
          "response": { "status": 302, "content": { "mimeType": "text/html" } } }
    ] } }"#;
    let result = process(har, &ParseOptions::default());
    assert_eq!(result.actions.len(), 2);
    let fill = &result.actions[0];
    assert_eq!(fill.kind, ActionType::Fill);
    assert_eq!(fill.locator_type, Some(LocatorType::Label));
    assert_eq!(fill.locator_value.as_deref(), Some("email"));
    assert_eq!(fill.value.as_deref(), Some("a@b.com"));
    let click = &result.actions[1];
    assert_eq!(click.kind, ActionType::Click);
    assert_eq!(click.locator_type, Some(LocatorType::Role));
    assert_eq!(click.element_name.as_deref(), Some("Submit"));
    assert!(fill.synthesized && click.synthesized);
}

#[test]
fn empty_input_rejects_with_one_issue() {
    let result = process("", &ParseOptions::default());
    assert_eq!(result.format, Format::Unknown);
    assert!(result.actions.is_empty());
    assert_eq!(result.parse_errors.len(), 1);
}

#[test]
fn visibility_expectation_becomes_expect_action() {
    let source = "await expect(page).toBeVisible();";
    let result = process(source, &ParseOptions::default());
    assert_eq!(result.actions.len(), 1);
    let action = &result.actions[0];
    assert_eq!(action.kind, ActionType::Expect);
    let assertion = action.assertion.as_ref().unwrap();
    assert_eq!(assertion.kind, AssertionType::Visible);
}

#[test]
fn navigation_comes_first_in_network_traces() {
    let har = r#"{ "log": { "version": "1.2", "entries": [
        { "request": { "method": "GET", "url": "https://shop.com/", "headers": [] },
          "response": { "status": 200, "content": { "mimeType": "text/html" } } },
        { "request": { "method": "POST", "url": "https://shop.com/login", "headers": [],
            "postData": { "mimeType": "application/x-www-form-urlencoded",
                          "params": [ { "name": "user", "value": "jo" } ] } },
          "response": { "status": 302, "content": { "mimeType": "text/html" } } },
        { "request": { "method": "GET", "url": "https://shop.com/account", "headers": [] },
          "response": { "status": 200, "content": { "mimeType": "text/html" } } }
    ] } }"#;
    let result = process(har, &ParseOptions::default());

    let kinds: Vec<ActionType> = result.actions.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ActionType::Goto,
            ActionType::Goto,
            ActionType::Fill,
            ActionType::Click,
        ]
    );
    assert_eq!(result.actions[0].kind, ActionType::Goto);
    assert_eq!(result.metadata.start_url.as_deref(), Some("https://shop.com/"));
    let lines: Vec<usize> = result.actions.iter().map(|a| a.line_number).collect();
    assert_eq!(lines, vec![1, 2, 3, 4]);
}

#[test]
fn parsing_is_deterministic() {
    let sources = [
        "await page.getByRole('button', { name: 'Go' }).click();",
        "page.get_by_label(\"Email\").fill(\"a@b.com\")",
        r#"{ "log": { "version": "1.2", "entries": [] } }"#,
    ];
    for source in sources {
        let first = process(source, &ParseOptions::default());
        let second = process(source, &ParseOptions::default());
        assert_eq!(first, second);
    }
}

#[test]
fn revalidation_is_idempotent() {
    let source = "await page.goto('https://x.com');\nawait helper.hover();";
    let result = process(source, &ParseOptions { format: Some(Format::Javascript) });
    let first = validator::validate(&result.actions);
    let second = validator::validate(&result.actions);
    assert_eq!(first, second);
    assert_eq!(first, result.warnings);
}

#[test]
fn serialized_results_reingest_as_json() {
    let source = r#"
from playwright.sync_api import sync_playwright

page.goto("https://demo.shop/")
page.get_by_role("button", name="Accept").click()
"#;
    let original = process(source, &ParseOptions::default());
    assert_eq!(original.actions.len(), 2);

    let wire = serde_json::to_string(&original).expect("serialize");
    let round: UniversalParseResult = serde_json::from_str(&wire).expect("deserialize");
    assert_eq!(round, original);

    // A serialized result is itself a valid `json` recording.
    let reparsed = process(&wire, &ParseOptions::default());
    assert_eq!(reparsed.format, Format::Json);
    assert_eq!(reparsed.actions, original.actions);
    assert_eq!(
        reparsed.metadata.start_url.as_deref(),
        Some("https://demo.shop/")
    );
}

#[test]
fn action_types_stay_inside_the_closed_set() {
    let source = r#"
page.goto("https://x.com")
page.get_by_role("button", name="Go").click()
page.get_by_label("Name").fill("Jo")
page.keyboard.press("Enter")
page.get_by_role("checkbox").check()
page.get_by_role("combobox").select_option("a")
page.get_by_text("menu").hover()
page.get_by_text("menu").dblclick()
expect(page).to_have_url("https://x.com/done")
page.close()
page.screenshot()
page.wait_for_timeout(100)
"#;
    let result = process(source, &ParseOptions::default());
    // Unrecognized operations are dropped, not represented.
    assert_eq!(result.actions.len(), 10);
    for action in &result.actions {
        assert!(matches!(
            action.kind,
            ActionType::Goto
                | ActionType::Click
                | ActionType::Dblclick
                | ActionType::Fill
                | ActionType::Press
                | ActionType::Check
                | ActionType::Select
                | ActionType::Hover
                | ActionType::Close
                | ActionType::Expect
        ));
    }
}
