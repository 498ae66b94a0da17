use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

pub const ORCHESTRATOR_PROMPT: &str = include_str!("prompts/system.md");
pub const CHAIN_STEP_PROMPT: &str = include_str!("prompts/chain_step.md");
pub const WEBSITE_PROMPT: &str = include_str!("prompts/website.md");
pub const WEBSITE_SYSTEM_PROMPT: &str = include_str!("prompts/website_system.md");
pub const SEO_PROMPT: &str = include_str!("prompts/seo.md");
pub const COPYWRITING_PROMPT: &str = include_str!("prompts/copywriting.md");
pub const GENERAL_PROMPT: &str = include_str!("prompts/general.md");
pub const CRAWLER_PROMPT: &str = include_str!("prompts/crawler.md");
pub const SELECTOR_PROMPT: &str = include_str!("prompts/selector.md");
pub const VIDEO_PROMPT: &str = include_str!("prompts/video.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered.trim_end().to_string())
}
