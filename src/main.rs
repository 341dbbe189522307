use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use narrator::batch::{BatchOptions, find_cover, pending_characters, run_batch};
use narrator::cli::{Cli, Commands, ConfigAction, NarrateArgs};
use narrator::config::Config;
use narrator::diagnostics::check_dependencies;
use narrator::document::Book;
use narrator::narration::{Assembler, ChunkSynthesizer, NarrationPipeline, PipelineSettings, RateBudgetTracker};
use narrator::tts::{GoogleTtsProvider, SpeechProvider};
use narrator::{SystemCommandExecutor, logging};
use owo_colors::OwoColorize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Narrate(args) => {
            let config = load_config(cli.config.as_deref())?;
            let ok = handle_narrate(config, args, cli.quiet).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Voices { lang } => {
            let config = load_config(cli.config.as_deref())?;
            list_voices(&config, &lang).await?;
        }
        Commands::Check => {
            let config = load_config(cli.config.as_deref())?;
            println!("narrator {}\n", narrator::version_string());
            if !check_dependencies(&config, &SystemCommandExecutor::new()).await {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "narrator", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path()?)?
    };

    Ok(config.with_env_overrides())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            let path = match custom_path {
                Some(path) => path.to_path_buf(),
                None => Config::default_path()?,
            };
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn google_provider(config: &Config) -> Result<GoogleTtsProvider> {
    let Some(auth) = config.google_auth() else {
        bail!(
            "No provider credentials configured.\n\
             Set NARRATOR_API_KEY (or GOOGLE_API_KEY) or NARRATOR_ACCESS_TOKEN, \
             or synthesis.api_key in the config file."
        );
    };
    Ok(GoogleTtsProvider::with_endpoint(
        &config.synthesis.endpoint,
        auth,
        config.http_timeouts(),
    )?)
}

async fn list_voices(config: &Config, prefix: &str) -> Result<()> {
    let voices = google_provider(config)?
        .list_voices(prefix)
        .await
        .context("Failed to list voices")?;

    if voices.is_empty() {
        eprintln!("No voices found for '{}'", prefix);
        std::process::exit(1);
    }

    println!("Available voices for {}:", prefix.bold());
    for voice in voices {
        let mut details = voice.language_codes.join(",");
        if let Some(gender) = &voice.gender {
            details.push_str(&format!(", {}", gender.to_lowercase()));
        }
        if let Some(rate) = voice.natural_sample_rate_hertz {
            details.push_str(&format!(", {} Hz", rate));
        }
        println!("  {}  {}", voice.name, details.dimmed());
    }
    Ok(())
}

/// Returns `false` when at least one chapter failed.
async fn handle_narrate(mut config: Config, args: NarrateArgs, quiet: bool) -> Result<bool> {
    if !args.input.is_file() {
        bail!("Input file not found: {}", args.input.display());
    }
    if let Some(voice) = args.voice {
        config.synthesis.voice = voice;
        config.synthesis.language_code = None;
    }
    if let Some(cover) = &args.cover
        && !cover.is_file()
    {
        bail!("Cover image not found: {}", cover.display());
    }

    let book = Book::load(&args.input, config.synthesis.max_chunk_bytes)?;
    let out_dir = args.out_dir.clone().unwrap_or_else(|| {
        args.input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let options = BatchOptions {
        out_dir,
        format: args.format.unwrap_or(config.output.format),
        author: args
            .author
            .clone()
            .unwrap_or_else(|| config.metadata.default_author.clone()),
        album_title: args.title.clone(),
        genre: config.metadata.genre.clone(),
        cover_image: args.cover.clone().or_else(|| find_cover(&args.input)),
    };

    let characters = pending_characters(&book, &options);
    print_plan(&book, &options, &config, characters);
    if characters == 0 {
        println!("Nothing left to narrate.");
        return Ok(true);
    }
    if !args.yes && !confirm("Start narration?")? {
        println!("Aborted.");
        return Ok(true);
    }

    let provider = Arc::new(google_provider(&config)?);
    let synthesizer = ChunkSynthesizer::new(
        provider,
        config.voice(),
        config.synthesis.encoding,
        config.retry_policy(),
    );
    let assembler = Assembler::new(Arc::new(SystemCommandExecutor::new()), &config.output.ffmpeg);
    let settings = PipelineSettings {
        scratch_root: config.scratch_root(),
        keep_scratch_on_failure: config.output.keep_scratch_on_failure,
        show_progress: !quiet && std::io::stderr().is_terminal(),
    };
    let mut pipeline = NarrationPipeline::new(synthesizer, assembler, settings);
    let mut budget = RateBudgetTracker::new(config.rate_limits());

    let report = run_batch(&mut pipeline, &mut budget, &book, &options).await;

    println!();
    println!(
        "{} narrated, {} skipped, {} empty, {} failed ({} characters sent)",
        report.narrated.len().green(),
        report.skipped.len(),
        report.empty.len(),
        report.failed.len().red(),
        report.characters_sent
    );
    for path in &report.untagged {
        println!("  {} {}", "untagged:".yellow(), path.display());
    }
    for (title, error) in &report.failed {
        println!("  {} {}: {}", "failed:".red(), title, error);
    }
    Ok(report.is_success())
}

fn print_plan(book: &Book, options: &BatchOptions, config: &Config, characters: usize) {
    println!("{} {}", "Book:".dimmed(), book.title);
    println!("{} {}", "Chapters:".dimmed(), book.chapters.len());
    println!("{} {}", "Voice:".dimmed(), config.synthesis.voice);
    println!("{} {}", "Format:".dimmed(), options.format);
    println!("{} {}", "Output:".dimmed(), options.out_dir.display());
    match &options.cover_image {
        Some(cover) => println!("{} {}", "Cover:".dimmed(), cover.display()),
        None => println!("{} none", "Cover:".dimmed()),
    }

    // Lower bound: the character budget alone
    let per_minute = config.rate_limit.max_characters_per_minute.max(1);
    let minutes = (characters as u64).div_ceil(per_minute);
    println!(
        "{} {} characters to send (at least {})",
        "Pending:".dimmed(),
        characters.bold(),
        humantime::format_duration(Duration::from_secs(minutes * 60))
    );
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
