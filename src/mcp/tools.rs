//! Chain drive tools exposed over MCP.
//!
//! Every tool takes numbers in the caller's length unit and returns a pretty
//! printed JSON document as text content. Calculation failures are reported
//! as tool errors (`isError: true`), not JSON-RPC errors, so the client can
//! show them and retry with corrected dimensions.
//!
//! The pitch for a call comes from, in order: a `pitch` argument, a `chain`
//! argument holding an ANSI chain number, or the configured default chain.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{Config, SearchConfig};
use crate::drive::{
    center_distance, chain_length_in_pitches, fit_chain, nearest_practical_length,
    scan_sprocket_candidates, solve_for_both_sprockets, solve_for_one_sprocket, ChainSpec,
    DriveError,
};
use crate::error::ConfigError;

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if wants fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Returns the text of the first content item.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|content| match content {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

/// Why a tool call could not produce a result.
#[derive(Debug, Error)]
enum ToolError {
    /// Arguments were missing or had the wrong type.
    #[error("{0}")]
    Argument(String),

    /// The calculation itself failed.
    #[error(transparent)]
    Drive(#[from] DriveError),
}

type ToolOutcome<T = Value> = Result<T, ToolError>;

/// Chain drive calculations with configured defaults.
#[derive(Debug, Clone)]
pub struct ChainTools {
    default_chain: ChainSpec,
    search: SearchConfig,
}

impl ChainTools {
    /// Creates the tool set with an explicit default chain and search limits.
    #[must_use]
    pub const fn new(default_chain: ChainSpec, search: SearchConfig) -> Self {
        Self {
            default_chain,
            search,
        }
    }

    /// Creates the tool set from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured chain is invalid.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.chain.spec()?, config.search.clone()))
    }

    /// Dispatches a tool call by name.
    #[must_use]
    pub fn call(&self, name: &str, arguments: &Value) -> ToolCallResult {
        debug!(tool = name, arguments = %arguments, "Tool call");

        let outcome = match name {
            "center_distance" => self.call_center_distance(arguments),
            "chain_length" => self.call_chain_length(arguments),
            "practical_length" => Self::call_practical_length(arguments),
            "fit_chain" => self.call_fit_chain(arguments),
            "solve_sprocket" => self.call_solve_sprocket(arguments),
            "solve_both_sprockets" => self.call_solve_both_sprockets(arguments),
            "scan_sprocket" => self.call_scan_sprocket(arguments),
            _ => return ToolCallResult::error(format!("Unknown tool: {name}")),
        };

        match outcome {
            Ok(mut result) => {
                if let Some(fields) = result.as_object_mut() {
                    fields.insert("status".to_string(), json!("success"));
                }
                ToolCallResult::text(format!("{result:#}"))
            }
            Err(error) => {
                debug!(tool = name, %error, "Tool call failed");
                let result = json!({
                    "status": "error",
                    "error": error.to_string(),
                });
                ToolCallResult::error(format!("{result:#}"))
            }
        }
    }

    // ==================== Tool Handlers ====================

    fn call_center_distance(&self, arguments: &Value) -> ToolOutcome {
        let pitch = self.resolve_pitch(arguments)?;
        let length = required_f64(arguments, "length_in_pitches")?;
        let teeth_a = required_teeth(arguments, "teeth_a")?;
        let teeth_b = required_teeth(arguments, "teeth_b")?;

        let distance = center_distance(pitch, length, teeth_a, teeth_b)?;

        Ok(json!({
            "pitch": pitch,
            "length_in_pitches": length,
            "teeth": [teeth_a, teeth_b],
            "distance": distance,
        }))
    }

    fn call_chain_length(&self, arguments: &Value) -> ToolOutcome {
        let pitch = self.resolve_pitch(arguments)?;
        let distance = required_f64(arguments, "distance")?;
        let teeth_a = required_teeth(arguments, "teeth_a")?;
        let teeth_b = required_teeth(arguments, "teeth_b")?;

        let length = chain_length_in_pitches(distance, pitch, teeth_a, teeth_b)?;

        Ok(json!({
            "pitch": pitch,
            "distance": distance,
            "teeth": [teeth_a, teeth_b],
            "length_in_pitches": length,
            "practical_length": nearest_practical_length(length),
        }))
    }

    fn call_practical_length(arguments: &Value) -> ToolOutcome {
        let length = required_f64(arguments, "length_in_pitches")?;
        if length < 0.0 {
            return Err(ToolError::Argument(format!(
                "Invalid parameter 'length_in_pitches': must not be negative, got {length}"
            )));
        }

        Ok(json!({
            "length_in_pitches": length,
            "practical_length": nearest_practical_length(length),
        }))
    }

    fn call_fit_chain(&self, arguments: &Value) -> ToolOutcome {
        let pitch = self.resolve_pitch(arguments)?;
        let distance = required_f64(arguments, "distance")?;
        let teeth_a = required_teeth(arguments, "teeth_a")?;
        let teeth_b = required_teeth(arguments, "teeth_b")?;

        let fit = fit_chain(distance, pitch, teeth_a, teeth_b)?;

        Ok(json!({
            "pitch": pitch,
            "distance": distance,
            "teeth": [teeth_a, teeth_b],
            "fit": fit,
        }))
    }

    fn call_solve_sprocket(&self, arguments: &Value) -> ToolOutcome {
        let pitch = self.resolve_pitch(arguments)?;
        let distance = required_f64(arguments, "distance")?;
        let fixed = required_teeth(arguments, "fixed_teeth")?;
        let (min, max) = self.search_bounds(arguments, "min_teeth", "max_teeth")?;
        self.check_search_size(span(min, max))?;

        if tracing::enabled!(tracing::Level::TRACE) {
            for candidate in scan_sprocket_candidates(distance, pitch, fixed, min, max)? {
                trace!(
                    teeth = candidate.teeth,
                    length_error = candidate.length_error,
                    "Candidate"
                );
            }
        }

        let solution = solve_for_one_sprocket(distance, pitch, fixed, min, max)?;
        let teeth = solution.teeth;
        let fit = fit_chain(distance, pitch, teeth, fixed)?;

        debug!(fixed, teeth, length_error = solution.length_error, "Solved one sprocket");

        Ok(json!({
            "pitch": pitch,
            "distance": distance,
            "fixed_teeth": fixed,
            "search": [min.min(max), min.max(max)],
            "teeth": teeth,
            "length_error": solution.length_error,
            "fit": fit,
        }))
    }

    fn call_solve_both_sprockets(&self, arguments: &Value) -> ToolOutcome {
        let pitch = self.resolve_pitch(arguments)?;
        let distance = required_f64(arguments, "distance")?;
        let (min_a, max_a) = self.search_bounds(arguments, "min_teeth_a", "max_teeth_a")?;
        let (min_b, max_b) = self.search_bounds(arguments, "min_teeth_b", "max_teeth_b")?;
        self.check_search_size(span(min_a, max_a).saturating_mul(span(min_b, max_b)))?;

        let solution = solve_for_both_sprockets(distance, pitch, min_a, max_a, min_b, max_b)?;
        let [teeth_a, teeth_b] = solution.teeth;
        let fit = fit_chain(distance, pitch, teeth_a, teeth_b)?;

        debug!(
            teeth_a,
            teeth_b,
            length_error = solution.length_error,
            "Solved both sprockets"
        );

        Ok(json!({
            "pitch": pitch,
            "distance": distance,
            "teeth": [teeth_a, teeth_b],
            "length_error": solution.length_error,
            "fit": fit,
        }))
    }

    fn call_scan_sprocket(&self, arguments: &Value) -> ToolOutcome {
        let pitch = self.resolve_pitch(arguments)?;
        let distance = required_f64(arguments, "distance")?;
        let fixed = required_teeth(arguments, "fixed_teeth")?;
        let (min, max) = self.search_bounds(arguments, "min_teeth", "max_teeth")?;
        self.check_search_size(span(min, max))?;

        let candidates = scan_sprocket_candidates(distance, pitch, fixed, min, max)?;

        Ok(json!({
            "pitch": pitch,
            "distance": distance,
            "fixed_teeth": fixed,
            "candidates": candidates,
        }))
    }

    // ==================== Argument Helpers ====================

    /// Picks the pitch for a call.
    fn resolve_pitch(&self, arguments: &Value) -> ToolOutcome<f64> {
        if let Some(pitch) = optional_f64(arguments, "pitch")? {
            return Ok(ChainSpec::new(pitch)?.pitch());
        }

        match arguments.get("chain") {
            None | Some(Value::Null) => Ok(self.default_chain.pitch()),
            Some(Value::String(number)) => Ok(ChainSpec::from_ansi(number)?.pitch()),
            Some(Value::Number(number)) => Ok(ChainSpec::from_ansi(&number.to_string())?.pitch()),
            Some(_) => Err(ToolError::Argument(
                "Invalid parameter 'chain': expected an ANSI chain number".to_string(),
            )),
        }
    }

    /// Reads a pair of search bounds, falling back to the configured range.
    fn search_bounds(
        &self,
        arguments: &Value,
        min_name: &str,
        max_name: &str,
    ) -> ToolOutcome<(u32, u32)> {
        let min = optional_teeth(arguments, min_name)?.unwrap_or(self.search.min_teeth);
        let max = optional_teeth(arguments, max_name)?.unwrap_or(self.search.max_teeth);
        Ok((min, max))
    }

    fn check_search_size(&self, candidates: u64) -> ToolOutcome<()> {
        if candidates > self.search.max_candidates {
            return Err(ToolError::Argument(format!(
                "Search would evaluate {candidates} tooth combinations, limit is {}",
                self.search.max_candidates
            )));
        }
        Ok(())
    }

    /// Returns the list of available tools.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn definitions() -> Vec<ToolDefinition> {
        let pitch_properties = json!({
            "pitch": {
                "type": "number",
                "description": "Chain pitch in the same unit as distances (e.g. 0.25 for #25 chain in inches)"
            },
            "chain": {
                "type": "string",
                "description": "ANSI roller chain number (e.g. '25', '#40'). Used when pitch is omitted"
            }
        });

        let with_pitch = |mut schema: Value| {
            if let (Some(properties), Some(pitch)) = (
                schema.get_mut("properties").and_then(Value::as_object_mut),
                pitch_properties.as_object(),
            ) {
                properties.extend(pitch.clone());
            }
            schema
        };

        vec![
            ToolDefinition {
                name: "center_distance".to_string(),
                description: Some(
                    "Calculate the center-to-center distance of two sprockets for a chain of a \
                     given length. Chain length is in pitches (links). Fails if the chain is too \
                     short to wrap both sprockets."
                        .to_string(),
                ),
                input_schema: with_pitch(json!({
                    "type": "object",
                    "properties": {
                        "length_in_pitches": {
                            "type": "number",
                            "description": "Chain length in pitches (number of links)"
                        },
                        "teeth_a": { "type": "integer", "description": "Tooth count of one sprocket" },
                        "teeth_b": { "type": "integer", "description": "Tooth count of the other sprocket" }
                    },
                    "required": ["length_in_pitches", "teeth_a", "teeth_b"]
                })),
            },
            ToolDefinition {
                name: "chain_length".to_string(),
                description: Some(
                    "Calculate the exact chain length in pitches needed for two sprockets at a \
                     center distance, plus the shortest buildable (even) length."
                        .to_string(),
                ),
                input_schema: with_pitch(json!({
                    "type": "object",
                    "properties": {
                        "distance": { "type": "number", "description": "Center-to-center distance" },
                        "teeth_a": { "type": "integer", "description": "Tooth count of one sprocket" },
                        "teeth_b": { "type": "integer", "description": "Tooth count of the other sprocket" }
                    },
                    "required": ["distance", "teeth_a", "teeth_b"]
                })),
            },
            ToolDefinition {
                name: "practical_length".to_string(),
                description: Some(
                    "Round a chain length in pitches up to the nearest even number of links."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "length_in_pitches": {
                            "type": "number",
                            "description": "Exact chain length in pitches"
                        }
                    },
                    "required": ["length_in_pitches"]
                }),
            },
            ToolDefinition {
                name: "fit_chain".to_string(),
                description: Some(
                    "Fit a buildable chain to two sprockets at a fixed center distance. Returns \
                     the exact and practical lengths, the slack in pitches, and the center \
                     distance at which the practical chain is taut."
                        .to_string(),
                ),
                input_schema: with_pitch(json!({
                    "type": "object",
                    "properties": {
                        "distance": { "type": "number", "description": "Center-to-center distance" },
                        "teeth_a": { "type": "integer", "description": "Tooth count of one sprocket" },
                        "teeth_b": { "type": "integer", "description": "Tooth count of the other sprocket" }
                    },
                    "required": ["distance", "teeth_a", "teeth_b"]
                })),
            },
            ToolDefinition {
                name: "solve_sprocket".to_string(),
                description: Some(
                    "Given a fixed center distance and one sprocket, find the tooth count for the \
                     other sprocket that needs the least chain slack. Ties go to the lowest \
                     tooth count."
                        .to_string(),
                ),
                input_schema: with_pitch(json!({
                    "type": "object",
                    "properties": {
                        "distance": { "type": "number", "description": "Fixed center-to-center distance" },
                        "fixed_teeth": { "type": "integer", "description": "Tooth count of the known sprocket" },
                        "min_teeth": { "type": "integer", "description": "Optional: lowest tooth count to try" },
                        "max_teeth": { "type": "integer", "description": "Optional: highest tooth count to try" }
                    },
                    "required": ["distance", "fixed_teeth"]
                })),
            },
            ToolDefinition {
                name: "solve_both_sprockets".to_string(),
                description: Some(
                    "Given a fixed center distance, search tooth counts for both sprockets and \
                     return the pair that needs the least chain slack."
                        .to_string(),
                ),
                input_schema: with_pitch(json!({
                    "type": "object",
                    "properties": {
                        "distance": { "type": "number", "description": "Fixed center-to-center distance" },
                        "min_teeth_a": { "type": "integer", "description": "Optional: lowest tooth count for the first sprocket" },
                        "max_teeth_a": { "type": "integer", "description": "Optional: highest tooth count for the first sprocket" },
                        "min_teeth_b": { "type": "integer", "description": "Optional: lowest tooth count for the second sprocket" },
                        "max_teeth_b": { "type": "integer", "description": "Optional: highest tooth count for the second sprocket" }
                    },
                    "required": ["distance"]
                })),
            },
            ToolDefinition {
                name: "scan_sprocket".to_string(),
                description: Some(
                    "List every candidate tooth count for one sprocket with its exact length, \
                     practical length and slack, for a fixed center distance and other sprocket."
                        .to_string(),
                ),
                input_schema: with_pitch(json!({
                    "type": "object",
                    "properties": {
                        "distance": { "type": "number", "description": "Fixed center-to-center distance" },
                        "fixed_teeth": { "type": "integer", "description": "Tooth count of the known sprocket" },
                        "min_teeth": { "type": "integer", "description": "Optional: lowest tooth count to try" },
                        "max_teeth": { "type": "integer", "description": "Optional: highest tooth count to try" }
                    },
                    "required": ["distance", "fixed_teeth"]
                })),
            },
        ]
    }
}

/// Number of tooth counts in an inclusive range given in either order.
fn span(a: u32, b: u32) -> u64 {
    u64::from(a.abs_diff(b)) + 1
}

fn missing(name: &str) -> ToolError {
    ToolError::Argument(format!("Missing required parameter: {name}"))
}

fn optional_f64(arguments: &Value, name: &str) -> ToolOutcome<Option<f64>> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            ToolError::Argument(format!("Invalid parameter '{name}': expected a number"))
        }),
    }
}

fn required_f64(arguments: &Value, name: &str) -> ToolOutcome<f64> {
    optional_f64(arguments, name)?.ok_or_else(|| missing(name))
}

fn optional_teeth(arguments: &Value, name: &str) -> ToolOutcome<Option<u32>> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|teeth| u32::try_from(teeth).ok())
            .map(Some)
            .ok_or_else(|| {
                ToolError::Argument(format!(
                    "Invalid parameter '{name}': expected a non-negative integer tooth count"
                ))
            }),
    }
}

fn required_teeth(arguments: &Value, name: &str) -> ToolOutcome<u32> {
    optional_teeth(arguments, name)?.ok_or_else(|| missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> ChainTools {
        ChainTools::new(ChainSpec::new(0.25).unwrap(), SearchConfig::default())
    }

    fn call_ok(name: &str, arguments: Value) -> Value {
        let result = tools().call(name, &arguments);
        assert!(!result.is_error, "{name} failed: {:?}", result.first_text());
        serde_json::from_str(result.first_text().unwrap()).unwrap()
    }

    fn call_err(name: &str, arguments: Value) -> String {
        let result = tools().call(name, &arguments);
        assert!(result.is_error, "{name} unexpectedly succeeded");
        result.first_text().unwrap().to_string()
    }

    #[test]
    fn tool_definitions_valid() {
        let tools = ChainTools::definitions();
        assert_eq!(tools.len(), 7);

        for tool in &tools {
            assert!(!tool.name.is_empty());
            assert!(tool.input_schema.is_object());
            assert!(tool.input_schema["required"].is_array());
        }

        let solve = tools.iter().find(|t| t.name == "solve_sprocket").unwrap();
        assert!(solve.input_schema["properties"]["chain"].is_object());
    }

    #[test]
    fn tool_call_result_error() {
        let result = ToolCallResult::error("Something went wrong");
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some("Something went wrong"));
    }

    #[test]
    fn center_distance_tool() {
        let result = call_ok(
            "center_distance",
            json!({ "length_in_pitches": 48.0, "teeth_a": 20, "teeth_b": 15 }),
        );
        assert_eq!(result["status"], "success");
        let distance = result["distance"].as_f64().unwrap();
        assert!((distance - 3.807_302).abs() < 1e-6);
    }

    #[test]
    fn chain_length_tool_uses_ansi_chain() {
        let result = call_ok(
            "chain_length",
            json!({ "distance": 3.371, "teeth_a": 15, "teeth_b": 25, "chain": "#25" }),
        );
        let length = result["length_in_pitches"].as_f64().unwrap();
        assert!((length - 47.155_854_463_887_46).abs() < 1e-6);
        assert_eq!(result["practical_length"].as_f64(), Some(48.0));
    }

    #[test]
    fn explicit_pitch_beats_chain() {
        let result = call_ok(
            "chain_length",
            json!({ "distance": 5.0, "pitch": 0.5, "chain": "80", "teeth_a": 20, "teeth_b": 20 }),
        );
        assert_eq!(result["length_in_pitches"].as_f64(), Some(40.0));
    }

    #[test]
    fn practical_length_tool() {
        let result = call_ok("practical_length", json!({ "length_in_pitches": 20.001 }));
        assert_eq!(result["practical_length"].as_f64(), Some(22.0));

        let error = call_err("practical_length", json!({ "length_in_pitches": -1.0 }));
        assert!(error.contains("must not be negative"));
    }

    #[test]
    fn solve_sprocket_tool() {
        let result = call_ok(
            "solve_sprocket",
            json!({ "distance": 3.5, "fixed_teeth": 11, "min_teeth": 36, "max_teeth": 18 }),
        );
        assert_eq!(result["teeth"], 24);
        assert_eq!(result["search"], json!([18, 36]));
        assert_eq!(result["fit"]["practical_length"].as_f64(), Some(46.0));
    }

    #[test]
    fn solve_both_sprockets_tool() {
        let result = call_ok(
            "solve_both_sprockets",
            json!({
                "distance": 3.5,
                "min_teeth_a": 18, "max_teeth_a": 36,
                "min_teeth_b": 18, "max_teeth_b": 36
            }),
        );
        assert_eq!(result["teeth"], json!([18, 18]));
        assert_eq!(result["length_error"].as_f64(), Some(0.0));
    }

    #[test]
    fn scan_sprocket_tool() {
        let result = call_ok(
            "scan_sprocket",
            json!({ "distance": 3.5, "fixed_teeth": 9, "min_teeth": 18, "max_teeth": 20 }),
        );
        let candidates = result["candidates"].as_array().unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0]["teeth"], 18);
    }

    #[test]
    fn domain_errors_become_tool_errors() {
        let error = call_err(
            "center_distance",
            json!({ "length_in_pitches": 20.0, "teeth_a": 10, "teeth_b": 30 }),
        );
        assert!(error.contains("too short"));

        let error = call_err(
            "chain_length",
            json!({ "distance": 0.0, "teeth_a": 10, "teeth_b": 30 }),
        );
        assert!(error.contains("must be positive"));
    }

    #[test]
    fn argument_errors() {
        let error = call_err("fit_chain", json!({ "teeth_a": 10, "teeth_b": 30 }));
        assert!(error.contains("Missing required parameter: distance"));

        let error = call_err(
            "fit_chain",
            json!({ "distance": 3.5, "teeth_a": -4, "teeth_b": 30 }),
        );
        assert!(error.contains("teeth_a"));

        let error = call_err(
            "fit_chain",
            json!({ "distance": 3.5, "teeth_a": 10, "teeth_b": 30, "chain": "99" }),
        );
        assert!(error.contains("unknown ANSI chain number"));
    }

    #[test]
    fn oversized_search_is_rejected() {
        let small = ChainTools::new(
            ChainSpec::new(0.25).unwrap(),
            SearchConfig {
                max_candidates: 100,
                ..SearchConfig::default()
            },
        );
        let result = small.call(
            "solve_both_sprockets",
            &json!({ "distance": 3.5, "min_teeth_a": 10, "max_teeth_a": 30 }),
        );
        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("limit is 100"));
    }

    #[test]
    fn unknown_tool() {
        let result = tools().call("render_sprocket", &json!({}));
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some("Unknown tool: render_sprocket"));
    }
}
