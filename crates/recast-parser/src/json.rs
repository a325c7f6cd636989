//! Re-ingestion of previously serialized action lists. Accepts either a
//! bare JSON array of actions or an object carrying an `actions` field (a
//! serialized parse result qualifies), and rebuilds the derived metadata.

use recast_common::protocol::{Action, ActionType, Metadata, ParseIssue, ParseResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActionDocument {
    List(Vec<Action>),
    Object { actions: Vec<Action> },
}

pub fn parse(content: &str) -> ParseResult {
    match serde_json::from_str::<ActionDocument>(content) {
        Ok(document) => {
            let actions = match document {
                ActionDocument::List(actions) => actions,
                ActionDocument::Object { actions } => actions,
            };
            let start_url = actions
                .iter()
                .find(|a| a.kind == ActionType::Goto)
                .and_then(|a| a.url.clone());
            ParseResult {
                metadata: Metadata {
                    start_url,
                    total_actions: actions.len(),
                    ..Default::default()
                },
                actions,
                parse_errors: Vec::new(),
            }
        }
        Err(err) => ParseResult {
            actions: Vec::new(),
            metadata: Metadata::default(),
            parse_errors: vec![ParseIssue {
                reason: format!("invalid action document: {err}"),
                line: None,
                line_number: None,
                context: None,
            }],
        },
    }
}
