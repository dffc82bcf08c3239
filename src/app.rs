use std::collections::HashSet;
use std::io::Write as _;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::fetcher::{Artwork, HttpFetcherOptions, HttpPageFetcher, DEFAULT_ENDPOINT};
use crate::output::{self, OutputFormat};
use crate::selection::SelectionLedger;
use crate::session::{Event, TableSession};

fn print_banner() {
    const BANNER: &str = r#"
                __      __           __
  ____ _ _____ / /_____/ /___  _____/ /__
 / __ `// ___// __/ __  / _ \/ ___/ //_/
/ /_/ // /   / /_/ /_/ /  __/ /__ / ,<
\__,_//_/    \__/\__,_/\___/\___//_/|_|

       v0.2.1 - artwork table browser
    "#;
    print!("{}", BANNER);
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn print_error(message: &str) {
    println!("{} {}", "error ::".bold().red(), message);
}

#[derive(Clone, Debug)]
struct RunConfig {
    endpoint: String,
    start_page: u32,
    select: Option<usize>,
    output: Option<String>,
    output_format: Option<String>,
    rate: u32,
    timeout: usize,
    proxy: Option<String>,
    no_color: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let endpoint = args
        .endpoint
        .or(cfg.endpoint)
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    if reqwest::Url::parse(&endpoint).is_err() {
        return Err(format!("invalid endpoint '{endpoint}'"));
    }

    let start_page = args.page.or(cfg.page).unwrap_or(1);
    if start_page == 0 {
        return Err("invalid page, pages are numbered from 1".to_string());
    }

    let rate = args.rate.or(cfg.rate).unwrap_or(5);
    if rate == 0 {
        return Err("invalid rate, expected positive requests per second".to_string());
    }
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err("invalid timeout, expected positive seconds".to_string());
    }

    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());
    let output = args
        .output
        .or(cfg.output)
        .map(|p| config::expand_tilde_string(&p));
    let output_format = args.output_format.or(cfg.output_format);
    if let Some(raw) = output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid output format '{raw}', expected text or json"));
        }
    }

    Ok(RunConfig {
        endpoint,
        start_page,
        select: args.select,
        output,
        output_format,
        rate,
        timeout,
        proxy,
        no_color,
    })
}

pub fn run_cli() -> Result<(), String> {
    let args = CliArgs::parse();

    let cfg = match args.config.as_deref() {
        Some(path) => {
            let path = config::expand_tilde(path);
            config::load_config(&path, false)?
        }
        None => match config::default_config_path() {
            Some(path) => {
                config::ensure_default_config_file(&path)?;
                config::load_config(&path, true)?
            }
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    format_kv_line("Endpoint", &run.endpoint);
    format_kv_line("Page", &run.start_page.to_string());
    format_kv_line(
        "HTTP",
        &format!(
            "rate={}/s timeout={}s proxy={}",
            run.rate,
            run.timeout,
            if run.proxy.is_some() { "on" } else { "off" }
        ),
    );
    if let Some(out) = run.output.as_deref() {
        format_kv_line("Output", out);
    }
    println!();

    let fetcher = HttpPageFetcher::new(HttpFetcherOptions {
        endpoint: run.endpoint.clone(),
        rate: run.rate,
        timeout_seconds: run.timeout,
        proxy: run.proxy.clone(),
    })
    .map_err(|e| e.to_string())?;

    let pb = ProgressBar::new(0);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template(":: Fetching: [{pos}] :: {msg}")
            .map_err(|e| format!("failed to build progress bar style: {e}"))?,
    );

    let session = TableSession::open(Box::new(fetcher), run.start_page, pb)
        .await
        .map_err(|e| e.to_string())?;

    match run.select {
        Some(requested) => run_batch(session, requested, &run).await,
        None => run_shell(session, &run).await,
    }
}

async fn run_batch(
    mut session: TableSession,
    requested: usize,
    run: &RunConfig,
) -> Result<(), String> {
    session
        .apply(Event::BulkSelectRequested(requested))
        .await
        .map_err(|e| e.to_string())?;

    print_selected_summary(&session);
    let records = output::build_records(session.ledger());
    print!("{}", String::from_utf8_lossy(&output::render_text(&records)));

    if let Some(path) = run.output.as_deref() {
        write_export(path, run.output_format.as_deref(), session.ledger()).await?;
        println!("saved {} rows to {}", session.selected_count(), path);
    }
    Ok(())
}

async fn run_shell(mut session: TableSession, run: &RunConfig) -> Result<(), String> {
    println!("type 'help' for commands, 'quit' to leave");
    print_page(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "artdeck>".bold().cyan());
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return Err(format!("failed to read input: {e}")),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match parse_shell_command(line) {
            Ok(command) => command,
            Err(message) => {
                print_error(&message);
                continue;
            }
        };

        match command {
            ShellCommand::Quit => break,
            ShellCommand::Help => print_help(),
            ShellCommand::Show => print_page(&session),
            ShellCommand::Next => {
                if session.page() >= session.total_pages() {
                    print_error("already on the last page");
                    continue;
                }
                let target = session.page() + 1;
                navigate(&mut session, target).await;
            }
            ShellCommand::Prev => {
                if session.page() <= 1 {
                    print_error("already on the first page");
                    continue;
                }
                let target = session.page() - 1;
                navigate(&mut session, target).await;
            }
            ShellCommand::Goto(page) => {
                let last = session.total_pages();
                if page == 0 || page > last {
                    print_error(&format!("page out of range, collection has {last} pages"));
                    continue;
                }
                navigate(&mut session, page).await;
            }
            ShellCommand::Pick(ordinals) => match rows_for_ordinals(session.rows(), &ordinals) {
                Ok(records) => {
                    if let Err(e) = session.apply(Event::SelectionEdited(records)).await {
                        print_error(&e.to_string());
                        continue;
                    }
                    print_page(&session);
                }
                Err(message) => print_error(&message),
            },
            ShellCommand::Clear => {
                if let Err(e) = session.apply(Event::SelectionEdited(Vec::new())).await {
                    print_error(&e.to_string());
                    continue;
                }
                print_page(&session);
            }
            ShellCommand::Select(requested) => {
                match session.apply(Event::BulkSelectRequested(requested)).await {
                    Ok(()) => {
                        print_selected_summary(&session);
                        print_page(&session);
                    }
                    Err(e) => print_error(&e.to_string()),
                }
            }
            ShellCommand::Selected => print_selected_summary(&session),
            ShellCommand::Export { path, format } => {
                match write_export(&path, format.as_deref(), session.ledger()).await {
                    Ok(()) => println!("saved {} rows to {}", session.selected_count(), path),
                    Err(message) => print_error(&message),
                }
            }
        }
    }

    // The caller may still want the final selection on disk.
    if let Some(path) = run.output.as_deref() {
        if !session.ledger().is_empty() {
            write_export(path, run.output_format.as_deref(), session.ledger()).await?;
            println!("saved {} rows to {}", session.selected_count(), path);
        }
    }
    Ok(())
}

async fn navigate(session: &mut TableSession, page: u32) {
    match session.apply(Event::PageChanged(page)).await {
        Ok(()) => print_page(session),
        Err(e) => print_error(&e.to_string()),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum ShellCommand {
    Next,
    Prev,
    Goto(u32),
    Pick(Vec<usize>),
    Clear,
    Select(usize),
    Show,
    Selected,
    Export {
        path: String,
        format: Option<String>,
    },
    Help,
    Quit,
}

fn parse_shell_command(line: &str) -> Result<ShellCommand, String> {
    let mut parts = line.split_whitespace();
    let head = parts.next().ok_or_else(|| "empty command".to_string())?;

    match head {
        "next" | "n" => Ok(ShellCommand::Next),
        "prev" | "p" => Ok(ShellCommand::Prev),
        "goto" | "g" => {
            let raw = parts
                .next()
                .ok_or_else(|| "goto needs a page number".to_string())?;
            let page: u32 = raw
                .parse()
                .map_err(|_| format!("invalid page number '{raw}'"))?;
            Ok(ShellCommand::Goto(page))
        }
        "pick" => {
            let raw = parts
                .next()
                .ok_or_else(|| "pick needs row numbers, e.g. pick 1,3,5".to_string())?;
            parse_ordinals_csv(raw).map(ShellCommand::Pick)
        }
        "clear" => Ok(ShellCommand::Clear),
        "select" | "s" => {
            let raw = parts
                .next()
                .ok_or_else(|| "select needs a row count".to_string())?;
            let requested: usize = raw
                .parse()
                .map_err(|_| format!("invalid row count '{raw}'"))?;
            Ok(ShellCommand::Select(requested))
        }
        "show" => Ok(ShellCommand::Show),
        "selected" => Ok(ShellCommand::Selected),
        "export" => {
            let path = parts
                .next()
                .ok_or_else(|| "export needs a file path".to_string())?
                .to_string();
            let format = parts.next().map(|s| s.to_string());
            Ok(ShellCommand::Export { path, format })
        }
        "help" | "h" | "?" => Ok(ShellCommand::Help),
        "quit" | "q" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}

/// Parses a 1-based row-number list like `1,3,5`. Order is kept, duplicates
/// are dropped.
fn parse_ordinals_csv(value: &str) -> Result<Vec<usize>, String> {
    let raw = value.trim();
    if raw.is_empty() {
        return Err("list is empty".to_string());
    }
    let mut out: Vec<usize> = Vec::new();
    for part in raw.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let ordinal: usize = item
            .parse()
            .map_err(|_| format!("invalid row number '{item}'"))?;
        if ordinal == 0 {
            return Err("rows are numbered from 1".to_string());
        }
        if !out.contains(&ordinal) {
            out.push(ordinal);
        }
    }
    if out.is_empty() {
        return Err("list is empty".to_string());
    }
    Ok(out)
}

fn rows_for_ordinals(rows: &[Artwork], ordinals: &[usize]) -> Result<Vec<Artwork>, String> {
    let mut out = Vec::with_capacity(ordinals.len());
    for &ordinal in ordinals {
        match rows.get(ordinal - 1) {
            Some(row) => out.push(row.clone()),
            None => {
                return Err(format!(
                    "no row {ordinal} on this page ({} rows)",
                    rows.len()
                ))
            }
        }
    }
    Ok(out)
}

fn fmt_year(value: Option<i32>) -> String {
    value.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Flattens whitespace (artist lines arrive with embedded newlines) and
/// clips to the column width.
fn truncate_cell(value: &str, width: usize) -> String {
    let flat = value.split_whitespace().join(" ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut out: String = flat.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn print_page(session: &TableSession) {
    let checked: HashSet<u64> = session
        .visible_selection()
        .iter()
        .map(|a| a.id)
        .collect();

    println!();
    let header = format!(
        "{:>4}  {:<3} {:<9} {:<40} {:<20} {:<28} {:>5} {:>5}",
        "#", "", "ID", "Title", "Origin", "Artist", "Start", "End"
    );
    println!("{}", header.bold().white());

    for (idx, row) in session.rows().iter().enumerate() {
        let mark = if checked.contains(&row.id) {
            "[x]".green().to_string()
        } else {
            "[ ]".dimmed().to_string()
        };
        println!(
            "{:>4}  {} {:<9} {:<40} {:<20} {:<28} {:>5} {:>5}",
            idx + 1,
            mark,
            row.id,
            truncate_cell(&row.title, 40),
            truncate_cell(&row.place_of_origin, 20),
            truncate_cell(&row.artist_display, 28),
            fmt_year(row.date_start),
            fmt_year(row.date_end),
        );
    }

    println!(
        "page {}/{} :: {} rows :: {} selected",
        session.page(),
        session.total_pages(),
        session.rows().len(),
        session.selected_count()
    );
}

fn print_selected_summary(session: &TableSession) {
    let ledger = session.ledger();
    if ledger.is_empty() {
        println!("nothing selected");
        return;
    }
    let pages = ledger
        .iter()
        .map(|(page, rows)| format!("{page}({})", rows.len()))
        .join(" ");
    println!(
        "{} rows selected :: pages {}",
        session.selected_count(),
        pages
    );
}

fn print_help() {
    println!("commands:");
    println!("  next | prev | goto K     change page");
    println!("  pick 1,3,5               check exactly those rows on this page");
    println!("  clear                    uncheck everything on this page");
    println!("  select N                 select the first N rows from this page onward");
    println!("  show                     reprint the current page");
    println!("  selected                 per-page selection summary");
    println!("  export FILE [FORMAT]     write the selection (text or json)");
    println!("  quit                     leave");
}

async fn write_export(
    path: &str,
    format_raw: Option<&str>,
    ledger: &SelectionLedger,
) -> Result<(), String> {
    let format = format_raw
        .and_then(OutputFormat::parse)
        .or_else(|| output::infer_format_from_path(path))
        .unwrap_or(OutputFormat::Text);

    let records = output::build_records(ledger);
    let rendered = match format {
        OutputFormat::Text => output::render_text(&records),
        OutputFormat::Json => output::render_json(&records),
    };

    let mut outfile = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| format!("failed to open output file: {e}"))?;
    outfile
        .write_all(&rendered)
        .await
        .map_err(|_| "failed to write output file".to_string())?;
    Ok(())
}
