use std::fmt;
use std::io::Write;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::time::Instant;

use crate::card::{SpriteUrls, DEFAULT_SPRITE_URL};
use crate::catalog::{HttpCatalog, DEFAULT_CATALOG_URL};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::fetcher::PageFetcher;
use crate::gallery::{Gallery, DEFAULT_PAGE_SIZE};
use crate::output::{self, CardCollector, OutputFormat};
use crate::style::{self, AttributeColor, StyleTable};

const BANNER: &str = r#"
     _                       _ _
  __| | _____  ____ _  __ _ | | | ___ _ __ _   _
 / _` |/ _ \ \/ / _` |/ _` || | |/ _ \ '__| | | |
| (_| |  __/>  < (_| | (_| || | |  __/ |  | |_| |
 \__,_|\___/_/\_\__, |\__,_||_|_|\___|_|   \__, |
                |___/                      |___/
"#;

// banner, settings and summary; kept apart from the gallery payload
struct Console<W> {
    out: W,
}

impl<W: Write> Console<W> {
    fn new(out: W) -> Self {
        Self { out }
    }

    // status lines are best effort, a closed stream must not fail the run
    fn line(&mut self, text: impl fmt::Display) {
        let _ = writeln!(self.out, "{}", text);
    }

    fn banner(&mut self) {
        self.line(BANNER);
    }

    fn kv(&mut self, label: &str, value: &str) {
        self.line(format_args!(":: {:<10}: {}", label, value));
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .filter_module("reqwest", log::LevelFilter::Warn)
        .filter_module("hyper", log::LevelFilter::Warn)
        .try_init();
}

#[derive(Clone, Debug)]
pub(crate) struct RunConfig {
    page_size: u64,
    pages: u64,
    catalog_url: String,
    sprite_url: String,
    timeout: u64,
    proxy: Option<String>,
    output: Option<String>,
    output_format: OutputFormat,
    no_color: bool,
    palette: Vec<AttributeColor>,
}

pub(crate) fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let page_size = args
        .page_size
        .or(cfg.page_size)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err("invalid page_size in config, expected positive integer".to_string());
    }
    let pages = args.pages.or(cfg.pages).unwrap_or(1);
    if pages == 0 {
        return Err("invalid pages in config, expected positive integer".to_string());
    }
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);

    let catalog_url = args
        .catalog_url
        .or(cfg.catalog_url)
        .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());
    let sprite_url = args
        .sprite_url
        .or(cfg.sprite_url)
        .unwrap_or_else(|| DEFAULT_SPRITE_URL.to_string());
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());

    let output = args.output.or(cfg.output).filter(|o| !o.trim().is_empty());
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text, json or html"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let palette = cfg
        .attribute_colors
        .unwrap_or_else(style::default_palette);

    Ok(RunConfig {
        page_size,
        pages,
        catalog_url,
        sprite_url,
        timeout,
        proxy,
        output,
        output_format,
        no_color,
        palette,
    })
}

fn output_format_label(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Text => "text",
        OutputFormat::Json => "json",
        OutputFormat::Html => "html",
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    let stdout = std::io::stdout();
    // with no output file the gallery itself goes to stdout
    if run.output.is_none() {
        run_gallery(run, std::io::stderr(), stdout).await
    } else {
        run_gallery(run, stdout, std::io::sink()).await
    }
}

pub(crate) async fn run_gallery<W: Write, P: Write>(
    run: RunConfig,
    status: W,
    mut payload: P,
) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    let mut console = Console::new(status);
    console.banner();

    let styles = StyleTable::build(&run.palette).map_err(|e| format!("invalid palette: {e}"))?;
    let catalog = HttpCatalog::new(&run.catalog_url, run.timeout, run.proxy.as_deref())
        .map_err(|e| format!("failed to build HTTP client: {e}"))?;

    console.kv("Catalog", &run.catalog_url);
    console.kv("Sprites", &run.sprite_url);
    console.kv(
        "Paging",
        &format!("{} page(s) of {}", run.pages, run.page_size),
    );
    console.kv(
        "Styles",
        &format!("{} attributes, {} entries", run.palette.len(), styles.len()),
    );
    console.kv(
        "Output",
        &format!(
            "{} ({})",
            run.output.as_deref().unwrap_or("stdout"),
            output_format_label(run.output_format)
        ),
    );
    console.line("");

    let mut gallery = Gallery::new(
        PageFetcher::new(catalog),
        styles,
        SpriteUrls::new(&run.sprite_url),
        CardCollector::default(),
        run.page_size,
    )
    .map_err(|e| e.to_string())?;

    let pb = ProgressBar::new(run.pages);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_style(
        ProgressStyle::with_template(
            ":: Pages: [{pos}/{len}] :: Duration: [{elapsed_precise}] :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?
        .progress_chars(r#"#>-"#),
    );

    let now = Instant::now();
    for _ in 0..run.pages {
        let next = gallery.state().next_start();
        pb.set_message(format!(
            "{} {}-{}",
            "fetching ::".bold().white(),
            next,
            next + run.page_size - 1
        ));
        // a failed page is logged by the gallery when it is committed
        let _ = gallery.advance().await;
        pb.inc(1);
    }
    pb.finish_and_clear();

    let failed = gallery.pages_failed();
    let appended = gallery.cards_appended();
    let styles = gallery.styles().clone();
    let cards = gallery.into_sink().into_cards();
    let rendered = output::render(run.output_format, &cards, &styles)
        .map_err(|e| format!("failed to render gallery: {e}"))?;

    match run.output.as_deref() {
        Some(path) => {
            let path = config::expand_tilde(path);
            tokio::fs::write(&path, rendered)
                .await
                .map_err(|e| format!("failed to write output '{}': {e}", path.display()))?;
            console.kv("Saved", &path.display().to_string());
        }
        None => {
            payload
                .write_all(&rendered)
                .and_then(|_| payload.flush())
                .map_err(|e| format!("failed to write output to stdout: {e}"))?;
        }
    }

    console.line("");
    console.line(format_args!(
        ":: Completed :: {} cards, {} failed page(s), took {}s ::",
        appended.to_string().bold().green(),
        if failed == 0 {
            failed.to_string().normal()
        } else {
            failed.to_string().bold().red()
        },
        now.elapsed().as_secs()
    ));

    if failed > 0 && appended == 0 {
        return Err("no page could be loaded".to_string());
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", CliArgs::command().render_long_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_logging(args.verbose);

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    if args.init_config {
        let path = user_config_path
            .or_else(config::default_config_path)
            .ok_or_else(|| "could not determine config path".to_string())?;
        if config::ensure_default_config_file(&path)? {
            println!("wrote default config to {}", path.display());
        } else {
            println!("config already exists at {}", path.display());
        }
        return Ok(());
    }

    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
