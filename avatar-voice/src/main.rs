//! avatar-voice - Synthesize avatar speech from the command line

use anyhow::{Context, Result};
use avatar_tts::{AudioCache, Config, EngineHandle, EngineKind, SpeechRequest};
use clap::{Parser, Subcommand};
use log::debug;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

#[derive(Parser, Debug)]
#[command(name = "avatar-voice")]
#[command(about = "Synthesize avatar speech with cached audio and lip-sync timing", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file (default: ~/.config/avatar-voice/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize text and print the result as JSON
    Say {
        /// Text to speak (read from stdin when omitted)
        text: Option<String>,

        /// Engine to use instead of the configured one
        #[arg(short, long)]
        engine: Option<String>,

        /// Output directory instead of the configured one
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// List supported engines
    Engines,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set the active engine
    SetEngine {
        /// Engine identifier (see `avatar-voice engines`)
        engine: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path().context("Failed to locate configuration")?,
    };

    match &args.command {
        Commands::Say {
            text,
            engine,
            output_dir,
        } => {
            let text = match text {
                Some(text) => text.clone(),
                None => read_stdin().await?,
            };
            say(&config_path, text, engine.as_deref(), output_dir.as_deref()).await
        }
        Commands::Engines => {
            list_engines();
            Ok(())
        }
        Commands::Config { action } => handle_config_command(&config_path, action),
    }
}

async fn say(
    config_path: &Path,
    text: String,
    engine: Option<&str>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let mut config = Config::load_from(config_path).context("Failed to load configuration")?;
    if let Some(engine) = engine {
        config.tts.engine = engine.to_string();
    }
    if let Some(dir) = output_dir {
        config.audio.output_dir = dir.to_path_buf();
    }

    let request = SpeechRequest::new(text);
    request.validate()?;

    let cache = AudioCache::open(&config.audio.output_dir, &config.audio.url_prefix)
        .with_context(|| {
            format!(
                "Failed to create output directory {}",
                config.audio.output_dir.display()
            )
        })?;
    debug!("Output directory: {}", cache.dir().display());

    let handle = EngineHandle::new(&config.tts);
    debug!("Engine: {}", handle.engine_name());

    let result = handle.speak(&request.text, &cache).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn read_stdin() -> Result<String> {
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read text from stdin")?;
    Ok(text)
}

fn list_engines() {
    for kind in EngineKind::ALL {
        match kind.env_var() {
            Some(var) => println!("{:<10} (API key: {})", kind.as_str(), var),
            None => println!("{}", kind.as_str()),
        }
    }
}

fn handle_config_command(config_path: &Path, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load_from(config_path)?;
            println!("Configuration file: {}", config_path.display());
            println!();
            println!("output_dir = \"{}\"", config.audio.output_dir.display());
            println!("url_prefix = \"{}\"", config.audio.url_prefix);
            println!("engine = \"{}\"", config.tts.engine);
            if let Some(table) = engine_table(&config)? {
                println!();
                println!("[tts.{}]", config.tts.engine.trim().to_lowercase());
                print!("{}", table);
            }
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save_to(config_path)?;
            println!("Wrote default configuration to {}", config_path.display());
        }
        ConfigAction::SetEngine { engine } => {
            let kind = EngineKind::from_str(engine)?;
            let mut config = Config::load_from(config_path)?;
            config.tts.engine = kind.as_str().to_string();
            config.save_to(config_path)?;
            println!("Engine set to: {}", kind.as_str());
        }
    }
    Ok(())
}

/// Render the active engine's settings table, hiding credentials
fn engine_table(config: &Config) -> Result<Option<String>> {
    let tts = &config.tts;
    let value = match EngineKind::from_str(&tts.engine) {
        Ok(EngineKind::OpenAi) => toml::Value::try_from(&tts.openai)?,
        Ok(EngineKind::Google) => toml::Value::try_from(&tts.google)?,
        Ok(EngineKind::Azure) => toml::Value::try_from(&tts.azure)?,
        Ok(EngineKind::Api) => toml::Value::try_from(&tts.api)?,
        Ok(EngineKind::Piper) => toml::Value::try_from(&tts.piper)?,
        Ok(EngineKind::Voicevox) => toml::Value::try_from(&tts.voicevox)?,
        Ok(EngineKind::Custom) => toml::Value::try_from(&tts.custom)?,
        Ok(EngineKind::None) | Err(_) => return Ok(None),
    };

    let mut value = value;
    if let Some(table) = value.as_table_mut() {
        if table.contains_key("api_key") {
            table.insert("api_key".to_string(), toml::Value::from("********"));
        }
    }
    Ok(Some(toml::to_string_pretty(&value)?))
}
