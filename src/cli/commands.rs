use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::Cli;
use crate::config::{Config, LoggingConfig};
use crate::engine::{Engine, ExtractionDiagnostics, Record, SelectorSet};
use crate::error::{Error, Result};
use crate::feed::pipeline::{self, extract_from_page, infer_from_page};
use crate::feed::{PageFetcher, PageSource, Site};

/// Infer selectors for a page and print them as a `[selectors]` table.
pub async fn infer(
    config: &Config,
    source: &str,
    start: Option<&str>,
    base_url: Option<String>,
) -> Result<()> {
    let engine = engine(config)?;
    let (html, default_base) = load_source(config, source).await?;
    let base_url = base_url.unwrap_or(default_base);

    let selectors = infer_from_page(&engine, &html, start)?;

    #[derive(Serialize)]
    struct Table<'a> {
        selectors: &'a SelectorSet,
    }
    print!("{}", toml::to_string_pretty(&Table { selectors: &selectors })?);

    let preview = extract_from_page(&engine, &html, &selectors, &base_url);
    println!();
    println!("# {} records extracted", preview.records.len());
    for record in preview.records.iter().take(5) {
        println!("# {} | {}", record.raw_date_text, record.title);
    }
    Ok(())
}

/// Run the extractor with explicit selectors and print what it found.
pub async fn extract(
    config: &Config,
    source: &str,
    selectors: &SelectorSet,
    base_url: Option<String>,
    json: bool,
) -> Result<()> {
    let engine = engine(config)?;
    let (html, default_base) = load_source(config, source).await?;
    let base_url = base_url.unwrap_or(default_base);

    let extraction = extract_from_page(&engine, &html, selectors, &base_url);

    if json {
        #[derive(Serialize)]
        struct Output<'a> {
            records: &'a [Record],
            diagnostics: &'a ExtractionDiagnostics,
        }
        let output = Output {
            records: &extraction.records,
            diagnostics: &extraction.diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for record in &extraction.records {
        let date = record
            .date
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| format!("({})", record.raw_date_text));
        println!("{}\t{}\t{}", date, record.title, record.link.as_deref().unwrap_or("-"));
    }

    let d = &extraction.diagnostics;
    println!();
    println!(
        "tier: {:?}, container found: {}, candidates: {}, retained: {}, rejected: {}",
        d.tier, d.container_found, d.candidates, d.retained, d.rejected
    );
    Ok(())
}

/// Update configured sites once.
pub async fn run(config: &Config, site: Option<&str>) -> Result<()> {
    let sites: Vec<Site> = match site {
        Some(name) => vec![config.site(name)?.clone()],
        None => config.sites.clone(),
    };
    if sites.is_empty() {
        return Err(Error::NotFound(
            "No sites configured. Run 'rss-scout init' and add a [[sites]] entry.".to_string(),
        ));
    }

    let engine = engine(config)?;
    let fetcher = fetcher(config)?;
    let summary = pipeline::update_all(&fetcher, &engine, &sites).await;

    for report in &summary.succeeded {
        println!(
            "✅ {}: {} records -> {} ({} dropped)",
            report.name,
            report.records,
            report.output.display(),
            report.dropped()
        );
    }
    for (name, error) in &summary.failed {
        println!("❌ {}: {}", name, error);
    }

    if summary.is_success() {
        Ok(())
    } else {
        Err(Error::Feed(format!(
            "{} of {} sites failed",
            summary.failed.len(),
            sites.len()
        )))
    }
}

/// Update all sites on the configured interval until Ctrl-C.
pub async fn watch(config: &Config) -> Result<()> {
    if config.sites.is_empty() {
        return Err(Error::NotFound("No sites configured".to_string()));
    }
    let engine = engine(config)?;
    let fetcher = fetcher(config)?;
    pipeline::run_schedule(&fetcher, &engine, &config.sites, config.settings.interval()).await
}

/// Write a default configuration file.
pub fn init(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_file = get_config_file(config_path)?;
    if config_file.exists() && !force {
        return Err(Error::AlreadyExists(format!(
            "Configuration file {} (use --force to overwrite)",
            config_file.display()
        )));
    }

    default_config().save(&config_file)?;
    info!("Created default configuration: {}", config_file.display());

    println!("✅ Configuration written to {}", config_file.display());
    println!();
    println!("Next steps:");
    println!("   1. Infer selectors: rss-scout infer <url>");
    println!("   2. Add them as a [[sites]] entry in the configuration");
    println!("   3. Generate feeds: rss-scout run");
    Ok(())
}

/// Generate shell completions
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let cmd_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, cmd_name, &mut std::io::stdout());
}

/// Initialize logging. Keep the returned guard alive while logging to a file.
pub fn init_logging(
    debug: bool,
    verbose: bool,
    logging: &LoggingConfig,
) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_new(&logging.level)
            .map_err(|e| Error::Config(format!("Invalid log level {:?}: {}", logging.level, e)))?
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if logging.json_format {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(debug)
                .with_line_number(debug)
                .boxed(),
        );
    }

    let guard = if logging.log_to_file {
        let path = Path::new(&logging.log_file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::Config(format!("Invalid log file: {}", logging.log_file)))?;
        fs::create_dir_all(dir)?;

        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        if logging.json_format {
            layers.push(fmt::layer().json().with_writer(writer).boxed());
        } else {
            layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
        }
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;

    debug!("Logging initialized");
    Ok(guard)
}

/// Load the configuration file, or defaults when the default path has none.
///
/// An explicitly given path has to exist.
pub fn load_config_or_default(config_path: Option<PathBuf>) -> Result<Config> {
    let explicit = config_path.is_some();
    let config_file = get_config_file(config_path)?;

    if config_file.exists() {
        Config::load_with_env(&config_file)
    } else if explicit {
        Err(Error::NotFound(format!(
            "Configuration file {}",
            config_file.display()
        )))
    } else {
        Ok(Config::default())
    }
}

fn get_config_file(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => Ok(Config::config_dir()?.join("config.toml")),
    }
}

fn default_config() -> Config {
    let mut config = Config::default();
    config.engine.container_classes.push("kjj_list".to_string());
    config.sites.push(Site::new(
        "gdstc",
        "https://gdstc.gd.gov.cn/zwgk_n/tzgg/index.html",
        "feeds/gdstc.xml",
        SelectorSet {
            container: "ul.list".to_string(),
            item: "li".to_string(),
            title: "a".to_string(),
            link: "a".to_string(),
            date: "span.time".to_string(),
        },
    ));
    config
}

fn engine(config: &Config) -> Result<Engine> {
    Ok(Engine::new(config.engine.clone(), config.settings.offset()?))
}

fn fetcher(config: &Config) -> Result<PageFetcher> {
    let settings = &config.settings;
    Ok(PageFetcher::new()?
        .with_timeout(settings.timeout())
        .with_user_agent(settings.user_agent.clone())
        .with_retries(settings.retry_attempts, settings.retry_base_delay()))
}

/// Read page HTML from a URL or a local file. Returns the HTML and the base
/// URL implied by the source (empty for files).
async fn load_source(config: &Config, source: &str) -> Result<(String, String)> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let html = fetcher(config)?.fetch_page(source).await?;
        Ok((html, source.to_string()))
    } else {
        let path = Path::new(source);
        if !path.exists() {
            warn!("{} is neither a URL nor an existing file", source);
            return Err(Error::NotFound(source.to_string()));
        }
        Ok((fs::read_to_string(path)?, String::new()))
    }
}
