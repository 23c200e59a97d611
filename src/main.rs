//! SiteScout - LLM-driven web exploration agent
//!
//! Main entry point for the CLI application.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use url::Url;

use sitescout::agent::{Explorer, JsonFileSink, ScriptedPolicy};
use sitescout::browser::{
    AgentBrowserDriver, ConsoleEntry, ConsoleLevel, ElementDescriptor, MemoryDriver, MemoryPage,
};
use sitescout::core::config::ProviderType;
use sitescout::core::logging::init_logging;
use sitescout::core::DriverError;
use sitescout::llm::{create_provider, LlmPolicy};
use sitescout::{Config, ScoutError, SessionReport};

/// SiteScout - explore a website with an LLM and report what looks broken
#[derive(Parser, Debug)]
#[command(name = "sitescout")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page to start exploring from
    #[arg(default_value = "https://www.saucedemo.com/")]
    url: String,

    /// Maximum number of steps
    #[arg(long, short = 'n')]
    max_steps: Option<usize>,

    /// Model name passed to the provider
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// LLM provider (ollama, groq)
    #[arg(long, short = 'p')]
    provider: Option<ProviderType>,

    /// Run in headed browser mode (visible window)
    #[arg(long)]
    headed: bool,

    /// Directory for session logs
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Explore a built-in demo site with a scripted policy; no browser or LLM needed
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.debug)?;

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(max_steps) = args.max_steps {
        config.agent.max_steps = max_steps;
    }

    if let Some(ref model) = args.model {
        config.model.name = model.clone();
    }

    if let Some(provider) = args.provider {
        config.provider = provider;
    }

    if args.headed {
        config.browser.headless = false;
    }

    if let Some(ref dir) = args.log_dir {
        config.agent.log_dir = dir.clone();
        config.browser.screenshot_dir = dir.join("screenshots");
    }

    if args.dry_run {
        config.agent.step_delay_ms = 0;
        config.provider = ProviderType::Ollama;
    }

    config.validate()?;

    let sink = Box::new(JsonFileSink::new(&config.agent.log_dir));
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let report = if args.dry_run {
        let driver = Arc::new(demo_site(&args.url)?);
        let policy = Arc::new(ScriptedPolicy::new(demo_script()));
        Explorer::new(driver, policy, sink, &config)
            .run_until(&args.url, shutdown)
            .await?
    } else {
        if !AgentBrowserDriver::is_available().await {
            return Err(DriverError::AgentBrowserNotFound.into());
        }

        let provider = create_provider(&config)?;
        match provider.is_model_available(&config.model.name).await {
            Ok(true) => {}
            Ok(false) => return Err(ScoutError::ModelNotFound(config.model.name.clone()).into()),
            Err(e) => warn!(error = %e, "Could not list models; continuing"),
        }

        let driver = Arc::new(AgentBrowserDriver::from_config(&config.browser));
        let policy = Arc::new(LlmPolicy::from_config(provider, &config));
        let result = Explorer::new(driver.clone(), policy, sink, &config)
            .run_until(&args.url, shutdown)
            .await;

        if let Err(e) = driver.close().await {
            warn!(error = %e, "Failed to close browser session");
        }
        result?
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!("\n[SiteScout] Session finished: {}", report.termination);
    println!(
        "  steps: {}  issues: {} high / {} medium / {} low",
        report.steps, report.issues.high, report.issues.medium, report.issues.low
    );
    if let Some(path) = &report.log_path {
        println!("  log: {}", path.display());
    }
}

/// Two-page shop: a login form leading to a product list
fn demo_site(start_url: &str) -> anyhow::Result<MemoryDriver> {
    let base = Url::parse(start_url).context("dry-run needs an absolute start URL")?;
    let inventory = base.join("inventory.html")?.to_string();

    let login = MemoryPage::new("Swag Labs")
        .text("Swag Labs\nAccepted usernames are: standard_user")
        .input(ElementDescriptor {
            id: Some("user-name".into()),
            name: Some("user-name".into()),
            placeholder: Some("Username".into()),
            ..Default::default()
        })
        .input(ElementDescriptor {
            id: Some("password".into()),
            name: Some("password".into()),
            placeholder: Some("Password".into()),
            input_type: Some("password".into()),
            ..Default::default()
        })
        .input(ElementDescriptor {
            id: Some("login-button".into()),
            input_type: Some("submit".into()),
            value: Some("Login".into()),
            ..Default::default()
        })
        .on_click("#input-2", &inventory);

    let products = MemoryPage::new("Swag Labs")
        .text("Products\nSauce Labs Backpack $29.99")
        .button("Add to cart")
        .link("Cart", "/cart.html")
        .console(ConsoleEntry::new(
            ConsoleLevel::Warning,
            "Image failed to load: backpack.jpg",
        ));

    Ok(MemoryDriver::new()
        .with_page(start_url, login)
        .with_page(inventory, products))
}

fn demo_script() -> Vec<sitescout::agent::Decision> {
    vec![
        ScriptedPolicy::step("type", "username field", "standard_user"),
        ScriptedPolicy::step("type", "password field", "secret_sauce"),
        ScriptedPolicy::step("click", "Login", ""),
        ScriptedPolicy::step("click", "Add to cart", ""),
    ]
}
