use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "artdeck",
    version,
    about = "terminal browser for the Art Institute of Chicago collection",
    long_about = "Artdeck browses the Art Institute of Chicago's public artworks API as a paginated table, with per-row selection that survives paging and a bulk \"select the first N rows\" that walks across page boundaries.\n\nExamples:\n  artdeck\n  artdeck -p 3\n  artdeck -s 20 -o selection.json\n  artdeck --config ~/.artdeck/config.yml\n\nTip: run without --select for the interactive shell; type 'help' at the prompt."
)]
pub struct CliArgs {
    #[arg(
        short = 'e',
        long = "ep",
        visible_alias = "endpoint",
        value_name = "URL",
        help_heading = "Input",
        help = "Collection endpoint (defaults to the public artworks API)."
    )]
    pub endpoint: Option<String>,

    #[arg(
        short = 'p',
        long = "pg",
        visible_alias = "page",
        value_name = "PAGE",
        help_heading = "Input",
        help = "Page to open first (1-based)."
    )]
    pub page: Option<u32>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.artdeck/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 's',
        long = "sel",
        visible_alias = "select",
        value_name = "N",
        help_heading = "Selection",
        help = "Select the first N rows starting from --page, print the result, and exit."
    )]
    pub select: Option<usize>,

    #[arg(
        short = 'o',
        long = "out",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the final selection to a file."
    )]
    pub output: Option<String>,

    #[arg(
        long = "fmt",
        visible_alias = "format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Export format: text or json (inferred from --out extension when omitted)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'r',
        long = "rt",
        visible_alias = "rate",
        value_name = "RPS",
        help_heading = "Performance",
        help = "Request rate limit against the collection API (requests per second)."
    )]
    pub rate: Option<u32>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "Performance",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        long = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "Route requests through an HTTP proxy."
    )]
    pub proxy: Option<String>,
}
