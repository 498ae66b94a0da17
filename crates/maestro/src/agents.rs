//! Built-in capabilities: the content agents, search, images, video plans and URL discovery.
//!
//! [`builtin_tool_registry`] exposes them to models as tools and
//! [`builtin_chain_runner`] binds the chainable ones by agent name.
pub mod completion;
pub mod content;
pub mod crawler;
pub mod general;
pub mod image;
pub mod selector;
pub mod video;
pub mod website;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;

use crate::capability::{capability_fn, Capability, CapabilityOutput};
use crate::chain::ChainRunner;
use crate::errors::RegistryError;
use crate::registry::{instruction_schema, ToolRegistry};

pub use completion::Completer;
pub use content::PromptedAgent;
pub use crawler::CrawlerAgent;
pub use general::{GeneralAgent, SearchConfig, WebSearch};
pub use image::ImageAgent;
pub use selector::AgentSelector;
pub use video::VideoAgent;
pub use website::WebsiteAgent;

/// Settings for the built-in capabilities that talk to services other than the model providers
#[derive(Debug, Clone)]
pub struct BuiltinConfig {
    pub search: Option<SearchConfig>,
    pub image_host: String,
    pub image_timeout: Duration,
}

impl Default for BuiltinConfig {
    fn default() -> Self {
        Self {
            search: None,
            image_host: image::IMAGE_HOST.to_string(),
            image_timeout: Duration::from_secs(60),
        }
    }
}

/// The agents shared by the tool registry and the chain runner
#[derive(Clone)]
pub struct BuiltinAgents {
    pub website: Arc<dyn Capability>,
    pub seo: Arc<dyn Capability>,
    pub copywriting: Arc<dyn Capability>,
    pub general: Arc<dyn Capability>,
    pub image: Arc<dyn Capability>,
    pub crawler: Arc<dyn Capability>,
    pub video: Arc<dyn Capability>,
}

impl BuiltinAgents {
    pub fn new(completer: Completer, config: &BuiltinConfig) -> Result<Self> {
        let search = config.search.clone().map(WebSearch::new).transpose()?;
        Ok(Self {
            website: Arc::new(WebsiteAgent::new(completer.clone())),
            seo: Arc::new(PromptedAgent::seo(completer.clone())),
            copywriting: Arc::new(PromptedAgent::copywriting(completer.clone())),
            general: Arc::new(GeneralAgent::new(completer.clone(), search)),
            image: Arc::new(ImageAgent::new(&config.image_host, config.image_timeout)?),
            crawler: Arc::new(CrawlerAgent::new(completer.clone())),
            video: Arc::new(VideoAgent::new(completer)),
        })
    }
}

/// Register every built-in tool, `listTools` last so it can describe the others
pub fn builtin_tool_registry(agents: &BuiltinAgents) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();

    registry.register(
        "website",
        "Generates complete, production-ready HTML and CSS websites. Use for website creation, landing pages, UI components or frontend work. Include purpose, audience, sections, design preferences and features in the instruction.",
        instruction_schema("Website specification: purpose, target audience, required sections, design preferences, features and any specific functionality"),
        agents.website.clone(),
    )?;
    registry.register(
        "seo",
        "Optimizes website content for search engines: keyword research, meta tags, content optimization, schema markup and search visibility. Returns recommendations and optimized content.",
        instruction_schema("SEO requirements: target keywords, pages or content to optimize and goals"),
        agents.seo.clone(),
    )?;
    registry.register(
        "copywriting",
        "Creates marketing and promotional content: ad copy, product descriptions, emails, blog posts, social media posts, scripts and taglines.",
        instruction_schema("Copywriting brief: content type, audience, key message, tone, length and call to action"),
        agents.copywriting.clone(),
    )?;
    registry.register(
        "image",
        "Generates an image from a description and returns its URL.",
        instruction_schema("Description of the image to generate"),
        agents.image.clone(),
    )?;
    registry.register(
        "crawler",
        "Finds 8-10 URLs of business websites, company pages, classified ads and marketplace listings for a search query.",
        instruction_schema("The kind of businesses, products or services to find"),
        agents.crawler.clone(),
    )?;
    registry.register(
        "motherAI",
        "General-purpose assistant with live web search. Use for general questions, research, news, explanations and anything outside websites, SEO or copywriting.",
        instruction_schema("Any question or task to answer"),
        agents.general.clone(),
    )?;

    let catalog: Vec<_> = registry
        .definitions()
        .into_iter()
        .map(|tool| json!({ "name": tool.name, "description": tool.description }))
        .collect();
    registry.register(
        "listTools",
        "Lists every available tool with its description. Use only when asked which tools or capabilities are available.",
        json!({ "type": "object", "properties": {}, "required": [] }),
        capability_fn(move |_| {
            let catalog = catalog.clone();
            async move { Ok::<_, anyhow::Error>(CapabilityOutput::Structured(json!(catalog))) }
        }),
    )?;

    Ok(registry)
}

/// Bind the chainable built-in agents under the names chain requests use
pub fn builtin_chain_runner(agents: &BuiltinAgents) -> Result<ChainRunner, RegistryError> {
    let mut runner = ChainRunner::new();
    runner.bind("website", agents.website.clone())?;
    runner.bind("seo", agents.seo.clone())?;
    runner.bind("copyWriting", agents.copywriting.clone())?;
    runner.bind("video", agents.video.clone())?;
    runner.bind("motherAI", agents.general.clone())?;
    Ok(runner)
}
