//! Tool Call Protocol
//!
//! The model asks for a tool by writing a fixed marker block into its
//! free-text answer:
//!
//! ```text
//! [TOOL_CALL]
//! Tool: search
//! Parameters: {"query": "running shoes"}
//! [/TOOL_CALL]
//! ```
//!
//! Parameters are a JSON object and are decoded with `serde_json` only.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};

const OPEN_TAG: &str = "[TOOL_CALL]\nTool: ";
const PARAMETERS_LABEL: &str = "Parameters: ";
const CLOSE_TAG: &str = "\n[/TOOL_CALL]";

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier, trimmed
    pub tool_name: String,

    /// Parameters as key-value pairs
    pub parameters: Map<String, Value>,
}

/// Extracts tool calls from raw model output
pub struct ToolCallParser;

impl ToolCallParser {
    /// Find the first tool call block in `text`
    ///
    /// A block whose parameters are not a JSON object is treated as ordinary
    /// text: the failure is logged and `None` is returned.
    pub fn extract(text: &str) -> Option<ToolCall> {
        match Self::try_extract(text) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed tool call block");
                None
            }
        }
    }

    /// Like [`ToolCallParser::extract`], but reports malformed parameters as
    /// [`AgentError::Parse`]
    pub fn try_extract(text: &str) -> Result<Option<ToolCall>> {
        let Some((name, literal)) = find_block(text) else {
            return Ok(None);
        };

        let parameters: Map<String, Value> = serde_json::from_str(literal.trim())
            .map_err(|e| AgentError::Parse(format!("tool '{name}' parameters: {e}")))?;

        Ok(Some(ToolCall {
            tool_name: name.to_string(),
            parameters,
        }))
    }
}

/// Locate the first structurally complete block, returning the trimmed tool
/// name and the raw parameters literal
fn find_block(text: &str) -> Option<(&str, &str)> {
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(OPEN_TAG) {
        let body_start = cursor + offset + OPEN_TAG.len();
        cursor = body_start;

        let body = &text[body_start..];
        let Some(line_end) = body.find('\n') else {
            continue;
        };
        let name = body[..line_end].trim();
        if name.is_empty() {
            continue;
        }

        let Some(literal_area) = body[line_end + 1..].strip_prefix(PARAMETERS_LABEL) else {
            continue;
        };
        if !literal_area.starts_with('{') {
            continue;
        }

        // Shortest literal that closes a brace right before the end tag
        let Some(end) = literal_area.find(&format!("}}{CLOSE_TAG}")) else {
            continue;
        };

        return Some((name, &literal_area[..=end]));
    }

    None
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

/// Tool declaration shown to the model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,
}

/// Render a system prompt section that declares `tools` and teaches the
/// model the marker format. Empty when no tools are declared.
pub fn tool_instructions(tools: &[ToolSchema]) -> String {
    if tools.is_empty() {
        return String::new();
    }

    let mut prompt = String::from("## Available Tools\n\n");
    prompt.push_str("To use a tool, reply with a block in exactly this format:\n\n");
    prompt.push_str("[TOOL_CALL]\nTool: tool_name\nParameters: {\"arg\": \"value\"}\n[/TOOL_CALL]\n\n");
    prompt.push_str("Parameters must be a JSON object.\n\n");

    for schema in tools {
        prompt.push_str(&format!("### {}\n{}\n", schema.name, schema.description));

        if !schema.parameters.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &schema.parameters {
                let required = if param.required { " (required)" } else { "" };
                prompt.push_str(&format!(
                    "- `{}` ({}){}: {}\n",
                    param.name, param.param_type, required, param.description
                ));
            }
        }
        prompt.push('\n');
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_tool_call() {
        let text = "Sure.\n[TOOL_CALL]\nTool: search\nParameters: {\"query\": \"shoes\"}\n[/TOOL_CALL]\n";

        let call = ToolCallParser::extract(text).unwrap();
        assert_eq!(call.tool_name, "search");
        assert_eq!(Value::Object(call.parameters), json!({"query": "shoes"}));
    }

    #[test]
    fn test_trims_name_and_spans_lines() {
        let text = "[TOOL_CALL]\nTool:   web_crawl  \nParameters: {\n  \"url\": \"https://example.com\",\n  \"depth\": 2\n}\n[/TOOL_CALL]";

        let call = ToolCallParser::extract(text).unwrap();
        assert_eq!(call.tool_name, "web_crawl");
        assert_eq!(call.parameters["depth"], json!(2));
        assert_eq!(call.parameters["url"], json!("https://example.com"));
    }

    #[test]
    fn test_absent_without_marker() {
        assert!(ToolCallParser::extract("Just a plain answer.").is_none());
        assert!(ToolCallParser::extract("").is_none());
    }

    #[test]
    fn test_malformed_parameters_are_absent() {
        let text = "[TOOL_CALL]\nTool: search\nParameters: {not json}\n[/TOOL_CALL]\n";
        assert!(ToolCallParser::extract(text).is_none());

        let err = ToolCallParser::try_extract(text).unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[test]
    fn test_non_object_parameters_are_absent() {
        let text = "[TOOL_CALL]\nTool: search\nParameters: not json\n[/TOOL_CALL]\n";
        assert!(ToolCallParser::extract(text).is_none());
        assert!(ToolCallParser::try_extract(text).unwrap().is_none());
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        let text = "[tool_call]\nTool: search\nParameters: {\"q\": 1}\n[/tool_call]";
        assert!(ToolCallParser::extract(text).is_none());
    }

    #[test]
    fn test_only_first_block_is_used() {
        let text = "[TOOL_CALL]\nTool: first\nParameters: {\"n\": 1}\n[/TOOL_CALL]\n\
                    [TOOL_CALL]\nTool: second\nParameters: {\"n\": 2}\n[/TOOL_CALL]";

        let call = ToolCallParser::extract(text).unwrap();
        assert_eq!(call.tool_name, "first");
        assert_eq!(call.parameters["n"], json!(1));
    }

    #[test]
    fn test_incomplete_block_is_skipped() {
        let text = "[TOOL_CALL]\nTool: broken\n\n\
                    [TOOL_CALL]\nTool: search\nParameters: {\"q\": \"x\"}\n[/TOOL_CALL]";

        let call = ToolCallParser::extract(text).unwrap();
        assert_eq!(call.tool_name, "search");
    }

    #[test]
    fn test_empty_parameters_object() {
        let text = "[TOOL_CALL]\nTool: list_sources\nParameters: {}\n[/TOOL_CALL]";

        let call = ToolCallParser::extract(text).unwrap();
        assert_eq!(call.tool_name, "list_sources");
        assert!(call.parameters.is_empty());
    }

    #[test]
    fn test_nested_parameters() {
        let text = "[TOOL_CALL]\nTool: filter\nParameters: {\"a\": {\"b\": 1}}\n[/TOOL_CALL]\nDone.";

        let call = ToolCallParser::extract(text).unwrap();
        assert_eq!(call.tool_name, "filter");
        assert_eq!(Value::Object(call.parameters), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_blank_tool_name_is_skipped() {
        let blank = "[TOOL_CALL]\nTool:    \nParameters: {\"q\": 1}\n[/TOOL_CALL]";
        assert!(ToolCallParser::extract(blank).is_none());

        let text = format!("{blank}\n[TOOL_CALL]\nTool: search\nParameters: {{\"q\": 2}}\n[/TOOL_CALL]");
        let call = ToolCallParser::extract(&text).unwrap();
        assert_eq!(call.tool_name, "search");
        assert_eq!(call.parameters["q"], json!(2));
    }

    #[test]
    fn test_python_style_literal_is_rejected() {
        let text = "[TOOL_CALL]\nTool: search\nParameters: {'query': __import__('os')}\n[/TOOL_CALL]";
        assert!(ToolCallParser::extract(text).is_none());
    }

    #[test]
    fn test_tool_instructions() {
        assert!(tool_instructions(&[]).is_empty());

        let tools = vec![ToolSchema {
            name: "search".into(),
            description: "Search the web".into(),
            parameters: vec![ParameterSchema {
                name: "query".into(),
                param_type: "string".into(),
                description: "What to look for".into(),
                required: true,
            }],
        }];

        let section = tool_instructions(&tools);
        assert!(section.contains("[TOOL_CALL]\nTool: tool_name"));
        assert!(section.contains("### search"));
        assert!(section.contains("- `query` (string) (required): What to look for"));
    }
}
