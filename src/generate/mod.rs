use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::error::GenerateError;

pub mod command;
pub mod gemini;
pub mod openai;

/// Generative text backend: prompt in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Engine {
    Gemini,
    Openai,
    Command,
}

impl Engine {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::Openai),
            "command" => Ok(Self::Command),
            other => anyhow::bail!("unsupported engine: {other} (expected gemini, openai, command)"),
        }
    }
}

pub const SERIES_SYSTEM_INSTRUCTION: &str = "You are a professional TV series recap writer.";
pub const BOOK_SYSTEM_INSTRUCTION: &str = "You are a professional book recap writer.";
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub engine: Engine,
    pub system_instruction: String,
    pub temperature: f32,
    pub timeout: Duration,

    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,

    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,

    pub command: Option<String>,
    pub command_args: Vec<String>,
}

/// Builds the configured backend. Fails when the engine's credentials are missing.
pub fn build_generator(config: &GeneratorConfig) -> anyhow::Result<Arc<dyn TextGenerator>> {
    let client = || {
        reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build generator http client")
    };

    let generator: Arc<dyn TextGenerator> = match config.engine {
        Engine::Gemini => {
            let api_key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("GEMINI_KEY is not set"))?;
            Arc::new(gemini::GeminiGenerator {
                client: client()?,
                base_url: config.gemini_base_url.clone(),
                api_key,
                model: config.gemini_model.clone(),
                system_instruction: config.system_instruction.clone(),
                temperature: config.temperature,
            })
        }
        Engine::Openai => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
            Arc::new(openai::OpenAiGenerator {
                client: client()?,
                endpoint: openai::responses_endpoint(&config.openai_base_url),
                api_key,
                model: config.openai_model.clone(),
                instructions: config.system_instruction.clone(),
                temperature: config.temperature,
            })
        }
        Engine::Command => {
            let program = config
                .command
                .clone()
                .ok_or_else(|| anyhow::anyhow!("missing --command (required when --engine=command)"))?;
            Arc::new(command::CommandGenerator {
                program,
                args: config.command_args.clone(),
                timeout: config.timeout,
            })
        }
    };

    tracing::info!(engine = ?config.engine, "text generator ready");
    Ok(generator)
}
