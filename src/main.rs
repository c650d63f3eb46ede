use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use step_engine::codegen;
use step_engine::config::EngineConfig;
use step_engine::executors::live::LiveRunner;
use step_engine::executors::webdriver::WebDriverProvider;
use step_engine::executors::CancelFlag;
use step_engine::extractors;
use step_engine::loader;
use step_engine::telemetry::{self, LogConfig};

#[derive(Parser)]
#[command(name = "step-engine")]
#[command(about = "Turns natural-language test steps into Selenium scripts or live browser runs", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generates a Python test script
    Generate {
        /// Test case file (JSON or raw generator response)
        #[arg(short, long)]
        file: PathBuf,

        /// pytest, unittest or selenium
        #[arg(long, default_value = "pytest")]
        framework: String,

        /// Page the generated script opens
        #[arg(long)]
        base_url: Option<String>,

        /// Script path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Runs the test cases in a live browser session
    Run {
        /// Test case file (JSON or raw generator response)
        #[arg(short, long)]
        file: PathBuf,

        /// WebDriver server, e.g. chromedriver
        #[arg(long)]
        webdriver_url: Option<String>,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(long)]
        headless: bool,

        /// Report path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Shows how step texts are interpreted
    Classify {
        #[arg(required = true)]
        steps: Vec<String>,
    },

    /// Parses a generator response and prints the recovered cases
    Parse {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env().verbose(cli.verbose);
    if let Err(e) = telemetry::init_logging(&log_config) {
        eprintln!("⚠️  Failed to initialize logging: {e}");
    }

    match execute(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Generate {
            file,
            framework,
            base_url,
            output,
        } => {
            let mut config = EngineConfig::from_env();
            if let Some(url) = base_url {
                config.base_url = url;
            }

            let cases = load_non_empty(&file)?;
            let script = codegen::generate(&cases, &framework, &config.plan_settings())?;
            emit(output.as_deref(), &script)?;
            eprintln!("✅ Generated {} test(s) for {}", cases.len(), framework.trim());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Run {
            file,
            webdriver_url,
            base_url,
            headless,
            output,
        } => {
            let mut config = EngineConfig::from_env();
            if let Some(url) = webdriver_url {
                config.webdriver_url = url;
            }
            if let Some(url) = base_url {
                config.base_url = url;
            }
            config.headless |= headless;

            let cases = load_non_empty(&file)?;
            eprintln!("🚀 Running {} test case(s) against {}", cases.len(), config.base_url);

            let cancel = CancelFlag::new();
            let signal_flag = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Ctrl+C received, stopping after the current step");
                    signal_flag.cancel();
                }
            });

            let provider = WebDriverProvider::from_config(&config)?;
            let runner = LiveRunner::new(config, provider).with_cancel_flag(cancel);
            let summary = runner.run(&cases).await;

            let report = serde_json::to_string_pretty(&summary).context("Failed to serialize report")?;
            emit(output.as_deref(), &report)?;

            eprintln!(
                "🏁 {}/{} passed ({:.1}%)",
                summary.passed,
                summary.total,
                summary.success_rate * 100.0
            );
            if let Some(error) = &summary.error {
                eprintln!("❌ {error}");
            }

            Ok(if summary.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Classify { steps } => {
            let actions: Vec<_> = steps.iter().map(|s| extractors::interpret(s)).collect();
            println!("{}", serde_json::to_string_pretty(&actions)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Parse { file } => {
            let cases = loader::load_cases_from_file(&file)?;
            println!("{}", serde_json::to_string_pretty(&cases)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_non_empty(file: &Path) -> Result<Vec<step_engine::protocol::TestCase>> {
    let cases = loader::load_cases_from_file(file)?;
    if cases.is_empty() {
        bail!("no test cases found in {:?}", file);
    }
    Ok(cases)
}

fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("📄 Saved to {:?}", path);
        }
        None => println!("{content}"),
    }
    Ok(())
}
