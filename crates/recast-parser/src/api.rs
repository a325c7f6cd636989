use recast_common::protocol::{Format, Metadata, ParseIssue, ParseResult, UniversalParseResult};
use tracing::{debug, warn};

use crate::{chain, detector, har, json, script, validator};

/// Caller-supplied knobs for a single parse run. The subsystem reads no
/// environment and takes no flags; this struct is its whole configuration
/// surface.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Skip detection and force a specific input format.
    pub format: Option<Format>,
}

/// Process a recording through the full pipeline: detect the format (unless
/// a hint is supplied), parse, normalize the metadata, and validate.
///
/// Always returns a result; parse failures of any kind surface as
/// `parse_errors` entries, never as a panic or error value.
pub fn process(content: &str, options: &ParseOptions) -> UniversalParseResult {
    let format = options.format.unwrap_or_else(|| detector::detect(content));
    debug!(format = format.as_str(), "dispatching recording parse");

    let mut result = match format {
        Format::Unknown => {
            return UniversalParseResult {
                format,
                actions: Vec::new(),
                metadata: Metadata::default(),
                parse_errors: vec![ParseIssue {
                    reason: "unsupported recording format: input matched no known shape"
                        .to_string(),
                    line: None,
                    line_number: None,
                    context: None,
                }],
                warnings: Vec::new(),
            };
        }
        Format::Python => script::parse(content),
        Format::Typescript | Format::Javascript => match chain::parse(content, format) {
            Ok(result) => result,
            // The AST parser is the only one allowed to raise; its error is
            // folded into the same structured shape here.
            Err(err) => {
                warn!(%err, "AST parse aborted");
                let line_number = match &err {
                    chain::ChainParseError::Syntax { line } => Some(*line),
                    _ => None,
                };
                ParseResult {
                    actions: Vec::new(),
                    metadata: Metadata::default(),
                    parse_errors: vec![ParseIssue {
                        reason: err.to_string(),
                        line: None,
                        line_number,
                        context: None,
                    }],
                }
            }
        },
        Format::Har => har::parse(content),
        Format::Json => json::parse(content),
    };

    result.metadata.total_actions = result.actions.len();
    let warnings = validator::validate(&result.actions);

    UniversalParseResult {
        format,
        actions: result.actions,
        metadata: result.metadata,
        parse_errors: result.parse_errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_a_structured_rejection() {
        let result = process("", &ParseOptions::default());
        assert_eq!(result.format, Format::Unknown);
        assert!(result.actions.is_empty());
        assert_eq!(result.parse_errors.len(), 1);
    }

    #[test]
    fn format_hint_overrides_detection() {
        // Plain prose would detect as unknown; the hint forces the HAR path.
        let result = process("not json at all", &ParseOptions { format: Some(Format::Har) });
        assert_eq!(result.format, Format::Har);
        assert_eq!(result.parse_errors.len(), 1);
        assert!(result.parse_errors[0].reason.contains("invalid HAR document"));
    }

    #[test]
    fn ast_failure_becomes_a_structured_result() {
        let result = process(
            "function ((({",
            &ParseOptions { format: Some(Format::Javascript) },
        );
        assert_eq!(result.format, Format::Javascript);
        assert!(result.actions.is_empty());
        assert_eq!(result.parse_errors.len(), 1);
        assert!(result.parse_errors[0].reason.contains("syntax error"));
    }
}
