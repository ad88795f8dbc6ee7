use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;
use recapper::book::{BookWindowResolver, Throttle};
use recapper::cli::{BookArgs, Cli, Command, EngineArgs, OutputArgs, SeriesArgs};
use recapper::compose::build_raw_context;
use recapper::config::RecapConfig;
use recapper::fetch::HttpPageFetcher;
use recapper::generate::Engine;
use recapper::model::{BookTargetRequest, RecapResponse, ResolvedWindow, SeriesTarget};
use recapper::series::SeriesWindowResolver;
use recapper::service::RecapService;
use recapper::tmdb::TmdbClient;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    recapper::logging::init(recapper::logging::DEFAULT_DIRECTIVE).context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = RecapConfig::from_env().context("load config")?;

    match cli.command {
        Command::Series(args) => series(args, config).await.context("series recap")?,
        Command::Book(args) => book(args, config).await.context("book recap")?,
    }

    Ok(())
}

async fn series(args: SeriesArgs, mut config: RecapConfig) -> anyhow::Result<()> {
    let target = SeriesTarget::new(&args.title, args.season, args.episode)?;
    apply_overrides(&mut config, &args.engine, &args.output);

    if args.output.window_only {
        let tmdb = config.tmdb.clone().context("TMDB_API_KEY is not set")?;
        let client = TmdbClient::new(tmdb).context("build TMDB client")?;
        let window = SeriesWindowResolver::new(&client)
            .resolve(&target)
            .await
            .context("resolve series window")?;
        return print_window(&window, args.output.json);
    }

    let service = RecapService::from_config(&config)?;
    let response = service.recap_series(&target).await?;
    print_response(&response, args.output.json)
}

async fn book(args: BookArgs, mut config: RecapConfig) -> anyhow::Result<()> {
    let request = BookTargetRequest {
        title: args.title.clone(),
        chapter: args.chapter,
        part: args.part,
    };
    apply_overrides(&mut config, &args.engine, &args.output);
    if let Some(base_url) = &args.base_url {
        config.book_site.base_url = base_url.clone();
    }
    if args.no_delay {
        config.book_site.delay = Throttle::NONE;
    }

    if args.output.window_only {
        let target = request.normalize()?;
        let fetcher = HttpPageFetcher::new().context("build page fetcher")?;
        let window = BookWindowResolver::new(fetcher, config.book_site.clone())
            .resolve(&target)
            .await
            .context("resolve book window")?;
        return print_window(&window, args.output.json);
    }

    let service = RecapService::from_config(&config)?;
    let response = service.recap_book(&request).await?;
    print_response(&response, args.output.json)
}

fn apply_overrides(config: &mut RecapConfig, engine: &EngineArgs, output: &OutputArgs) {
    let generator = &mut config.generator;
    if let Some(selected) = engine.engine {
        generator.engine = selected;
    }
    if let Some(model) = &engine.model {
        match generator.engine {
            Engine::Gemini => generator.gemini_model = model.clone(),
            Engine::Openai => generator.openai_model = model.clone(),
            Engine::Command => tracing::warn!("--model is ignored for the command engine"),
        }
    }
    if let Some(command) = &engine.command {
        generator.command = Some(command.clone());
    }
    if !engine.command_args.is_empty() {
        generator.command_args = engine.command_args.clone();
    }
    if let Some(language) = &output.language {
        config.output_language = language.clone();
    }
}

fn print_window(window: &ResolvedWindow, json: bool) -> anyhow::Result<()> {
    if json {
        let out = serde_json::to_string_pretty(window.units()).context("serialize window")?;
        println!("{out}");
    } else {
        println!("{}", build_raw_context(window));
    }
    Ok(())
}

fn print_response(response: &RecapResponse, json: bool) -> anyhow::Result<()> {
    if json {
        let out = serde_json::to_string_pretty(response).context("serialize recap")?;
        println!("{out}");
        return Ok(());
    }

    println!("CHARACTER CONTEXT");
    for line in &response.character_context {
        println!("{line}");
    }
    println!();
    println!("STORY RECAP");
    println!("{}", response.story_recap);
    Ok(())
}
