use anyhow::{bail, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use super::completion::Completer;
use super::website::strip_code_fence;
use crate::capability::{instruction_argument, Capability, CapabilityOutput};
use crate::prompt_template::{load_prompt, VIDEO_PROMPT};

pub const VIDEO_SEGMENTS: usize = 4;

const VIDEO_SYSTEM: &str =
    "You are a video advert director. Respond with a JSON array of segment scripts only.";

lazy_static! {
    static ref LIST_MARKER: Regex = Regex::new(r"^\s*(?:\d+[.)]|[-*])\s*").unwrap();
}

/// Plans a multi-segment video advert as one script per segment.
///
/// Rendering and muxing the segments happens outside this crate.
pub struct VideoAgent {
    completer: Completer,
    segments: usize,
}

impl VideoAgent {
    pub fn new(completer: Completer) -> Self {
        Self {
            completer,
            segments: VIDEO_SEGMENTS,
        }
    }

    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments.max(1);
        self
    }
}

#[async_trait]
impl Capability for VideoAgent {
    async fn invoke(&self, arguments: Value) -> Result<CapabilityOutput> {
        let instruction = instruction_argument(&arguments)?;
        let prompt = load_prompt(
            VIDEO_PROMPT,
            &json!({ "instruction": instruction, "segments": self.segments }),
        )?;
        let reply = self.completer.complete(VIDEO_SYSTEM, &prompt).await?;

        let mut scripts = parse_segment_scripts(&reply);
        if scripts.is_empty() {
            bail!("No video scripts generated");
        }
        scripts.truncate(self.segments);
        Ok(CapabilityOutput::Structured(json!({ "segments": scripts })))
    }
}

/// Segment scripts from a reply that should be a JSON array of strings.
/// Falls back to one script per non-empty line, without list markers.
pub fn parse_segment_scripts(reply: &str) -> Vec<String> {
    let cleaned = strip_code_fence(reply);
    let scripts = match serde_json::from_str::<Vec<String>>(cleaned) {
        Ok(list) => list,
        Err(_) => cleaned
            .lines()
            .map(|line| LIST_MARKER.replace(line, "").to_string())
            .collect(),
    };

    scripts
        .into_iter()
        .map(|script| script.trim().to_string())
        .filter(|script| !script.is_empty())
        .collect()
}
