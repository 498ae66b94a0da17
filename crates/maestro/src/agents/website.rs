use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use super::completion::Completer;
use crate::capability::{instruction_argument, Capability, CapabilityOutput, WebsiteCode};
use crate::prompt_template::{load_prompt, WEBSITE_PROMPT, WEBSITE_SYSTEM_PROMPT};

lazy_static! {
    static ref HTML_FIELD: Regex = Regex::new(r#""html"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap();
    static ref CSS_FIELD: Regex = Regex::new(r#""css"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap();
}

/// Generates `{html, css}` website code from an instruction
pub struct WebsiteAgent {
    completer: Completer,
}

impl WebsiteAgent {
    pub fn new(completer: Completer) -> Self {
        Self { completer }
    }
}

#[async_trait]
impl Capability for WebsiteAgent {
    async fn invoke(&self, arguments: Value) -> Result<CapabilityOutput> {
        let instruction = instruction_argument(&arguments)?;
        let prompt = load_prompt(WEBSITE_PROMPT, &json!({ "instruction": instruction }))?;
        let reply = self
            .completer
            .complete(WEBSITE_SYSTEM_PROMPT.trim(), &prompt)
            .await?;

        let code = parse_website_code(&reply).context("Could not read website code from reply")?;
        Ok(CapabilityOutput::Website(code))
    }
}

/// Drop a surrounding markdown code fence, with or without a language tag
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag on the opening line
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Extract website code from a model reply that should be a `{"html","css"}` object.
///
/// Tolerates code fences and prose around the object, and as a last resort
/// pulls the two string fields out with a regex when the object itself is not
/// valid JSON.
pub fn parse_website_code(reply: &str) -> Result<WebsiteCode> {
    let cleaned = strip_code_fence(reply);

    let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) else {
        bail!("No JSON object found in response");
    };
    if end < start {
        bail!("No JSON object found in response");
    }
    let candidate = &cleaned[start..=end];

    match serde_json::from_str::<WebsiteCode>(candidate) {
        Ok(code) if !code.html.is_empty() && !code.css.is_empty() => return Ok(code),
        Ok(_) => debug!("website JSON is missing html or css"),
        Err(err) => debug!(error = %err, "website JSON did not parse, trying field extraction"),
    }

    let html = HTML_FIELD.captures(candidate).map(|c| c[1].to_string());
    let css = CSS_FIELD.captures(candidate).map(|c| c[1].to_string());
    match (html, css) {
        (Some(html), Some(css)) => Ok(WebsiteCode {
            html: unescape_json_string(&html),
            css: unescape_json_string(&css),
        }),
        _ => bail!("Invalid JSON structure: missing html or css fields"),
    }
}

/// Decode JSON string escapes, keeping the raw text when they are invalid
fn unescape_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}
