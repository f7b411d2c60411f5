use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dexgallery",
    version,
    about = "paginated catalog gallery renderer",
    long_about = "dexgallery fetches catalog entities page by page, keeps them in id order and renders them as styled cards.\n\nExamples:\n  dexgallery -o gallery.html\n  dexgallery -n 3 -p 28 -o gallery.json\n  dexgallery --config ~/.dexgallery/config.yml\n\nTip: Use --init-config to write a default config file with the full attribute palette."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the gallery to a file (format inferred from the extension)."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'F',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format: text, json or html."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.dexgallery/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Input",
        help = "Write a default config file (if missing) and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'p',
        long = "ps",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "Paging",
        help = "Entities per page (default 28)."
    )]
    pub page_size: Option<u64>,

    #[arg(
        short = 'n',
        long = "pg",
        visible_alias = "pages",
        value_name = "N",
        help_heading = "Paging",
        help = "Number of pages to load (default 1)."
    )]
    pub pages: Option<u64>,

    #[arg(
        short = 'u',
        long = "cu",
        visible_alias = "catalog-url",
        value_name = "URL",
        help_heading = "Catalog",
        help = "Catalog endpoint; entities are fetched from <URL>/<id>."
    )]
    pub catalog_url: Option<String>,

    #[arg(
        short = 's',
        long = "su",
        visible_alias = "sprite-url",
        value_name = "URL",
        help_heading = "Catalog",
        help = "Sprite base URL; images are <URL>/<id>.png and <URL>/shiny/<id>.png."
    )]
    pub sprite_url: Option<String>,

    #[arg(
        short = 't',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "Catalog",
        help = "Per-request timeout in seconds (default 10)."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'x',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "Catalog",
        help = "HTTP proxy for catalog requests."
    )]
    pub proxy: Option<String>,
}
