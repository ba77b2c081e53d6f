//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod model_list;
pub mod say;

use std::error::Error;
use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::model_list::list_models;
use crate::cli::say::{run_say, SayOptions};
use crate::core::config::{path_display, Config, SETTING_KEYS};
use crate::core::keyring::{delete_api_key, store_api_key};

/// Environment variable holding the tracing filter directive.
pub const LOG_FILTER_ENV: &str = "PARLEY_LOG";

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Stream chat completions into your terminal")]
#[command(
    long_about = "Parley sends a prompt to an OpenAI-compatible chat backend and prints the \
response as it streams in. Web search tool calls are shown as they happen.\n\n\
Authentication:\n\
  Use 'parley auth' to store an API key in your system keyring.\n\n\
Environment Variables:\n\
  PARLEY_API_KEY       API key (takes precedence over the keyring)\n\
  OPENROUTER_API_KEY   Fallback API key\n\
  PARLEY_LOG           Diagnostic filter, e.g. 'parley=debug' (defaults to warn)\n\n\
Controls:\n\
  Ctrl+C            Cancel the response in flight"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a prompt and stream the response
    Say {
        /// Model to use (defaults to the configured default-model)
        #[arg(short = 'm', long, value_name = "MODEL")]
        model: Option<String>,
        /// Attach an image (URL or local file); may be repeated
        #[arg(short = 'i', long = "image", value_name = "IMAGE")]
        images: Vec<String>,
        /// Append the finished exchange to this file
        #[arg(short = 'l', long)]
        log: Option<String>,
        /// Prompt text (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List the models the backend offers
    Models,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Store an API key in the system keyring
    Auth,
    /// Remove the stored API key
    Deauth,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Say {
            model,
            images,
            log,
            prompt,
        } => {
            let options = SayOptions {
                prompt: prompt.join(" "),
                model,
                images,
                log,
            };
            if let Err(e) = run_say(options).await {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Models => list_models().await,
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            match key {
                Some(key) if !value.is_empty() => {
                    let value = value.join(" ");
                    config.set_value(&key, &value)?;
                    config.save()?;
                    println!("✅ Set {key} to: {value}");
                }
                _ => print_config(&config)?,
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            config.unset_value(&key)?;
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Auth => {
            if let Err(e) = interactive_auth() {
                eprintln!("❌ Authentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Deauth => {
            match delete_api_key() {
                Ok(true) => println!("✅ Removed the stored API key"),
                Ok(false) => println!("No API key was stored"),
                Err(e) => {
                    eprintln!("❌ Deauthentication failed: {e}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
    }
}

fn print_config(config: &Config) -> Result<(), Box<dyn Error>> {
    println!("Parley Configuration");
    println!("====================");
    println!("Config file: {}", path_display(Config::get_config_path()?));
    println!();
    for key in SETTING_KEYS {
        let value = config.display_value(key).unwrap_or_else(|| "(unset)".to_string());
        println!("  {key}: {value}");
    }
    Ok(())
}

fn interactive_auth() -> Result<(), Box<dyn Error>> {
    print!("Enter API key: ");
    io::stdout().flush()?;
    let mut key = String::new();
    io::stdin().lock().read_line(&mut key)?;
    let key = key.trim();
    if key.is_empty() {
        return Err("API key cannot be empty".into());
    }
    store_api_key(key)?;
    println!("✅ API key stored in the system keyring");
    Ok(())
}
