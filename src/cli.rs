use std::cmp;
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use kava_glossary::labels;
use kava_glossary::{
    Catalog, ContentNode, GlossaryConfig, GlossaryError, Highlighter, OccurrenceSet, Rect,
    Size, TermDictionary, Viewport, glossary_link, scan,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "KAVA_GLOSSARY_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "kava-glossary",
    about = "Highlight glossary terms and place their tooltips",
    version
)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Log engine decisions to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up built-in glossary terms.
    #[command(subcommand)]
    Term(TermCommand),
    /// Print the glossary matches found in a piece of text.
    Scan {
        /// Text to scan.
        text: String,
        #[command(flatten)]
        highlight: HighlightArgs,
    },
    /// Annotate a JSON content tree read from a file or `-` for stdin.
    Annotate {
        input: String,
        #[command(flatten)]
        highlight: HighlightArgs,
    },
    /// Compute where a tooltip would be placed.
    Position {
        /// Anchor rectangle as `top,left,width,height`.
        #[arg(long, value_parser = parse_rect)]
        anchor: Rect,
        /// Viewport as `width,height`.
        #[arg(long, value_parser = parse_size)]
        viewport: Size,
        /// Measured overlay size as `width,height`.
        #[arg(long, value_parser = parse_size)]
        overlay: Option<Size>,
        /// Document scroll offset as `x,y`.
        #[arg(long, value_parser = parse_size)]
        scroll: Option<Size>,
    },
}

#[derive(Subcommand, Debug)]
enum TermCommand {
    /// Look up catalog indices for exact names.
    Get {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List names that start with the provided prefix.
    Prefix {
        prefix: String,
        /// Maximum number of matches to return.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Search names, definitions and related terms.
    Search {
        query: String,
        /// Maximum number of matches to return.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Show the full entry for a term.
    Show {
        /// Name or term id to display.
        query: String,
        /// Interpret the query as a term id instead of a name.
        #[arg(long)]
        by_id: bool,
        #[arg(long)]
        locale: Option<String>,
    },
}

#[derive(Args, Debug)]
struct HighlightArgs {
    /// Locale used for links and labels.
    #[arg(short, long)]
    locale: Option<String>,
    /// Highlight every occurrence instead of only the first.
    #[arg(long)]
    all_occurrences: bool,
    /// Surface forms never to highlight.
    #[arg(long, num_args = 1..)]
    exclude: Vec<String>,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => GlossaryConfig::from_path(path)?,
        None => GlossaryConfig::default(),
    };
    debug!(?config, "configuration loaded");

    match cli.command {
        Command::Term(TermCommand::Get { names }) => handle_get(names, cli.json),
        Command::Term(TermCommand::Prefix { prefix, limit }) => {
            handle_prefix(prefix, limit, cli.json)
        }
        Command::Term(TermCommand::Search { query, limit }) => {
            handle_search(query, limit, cli.json)
        }
        Command::Term(TermCommand::Show {
            query,
            by_id,
            locale,
        }) => {
            let locale = locale.unwrap_or_else(|| config.highlight.default_locale.clone());
            handle_show(query, by_id, &locale, cli.json)
        }
        Command::Scan { text, highlight } => handle_scan(&text, highlight, config, cli.json),
        Command::Annotate { input, highlight } => {
            handle_annotate(&input, highlight, config, cli.json)
        }
        Command::Position {
            anchor,
            viewport,
            overlay,
            scroll,
        } => {
            let scroll = scroll.unwrap_or_default();
            let viewport =
                Viewport::new(viewport.width, viewport.height).with_scroll(scroll.width, scroll.height);
            handle_position(anchor, overlay, viewport, &config, cli.json)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("kava_glossary=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn parse_numbers<const N: usize>(value: &str) -> Result<[f64; N], String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|err| format!("invalid number in {value:?}: {err}"))?;
    parts
        .try_into()
        .map_err(|parts: Vec<f64>| format!("expected {N} comma-separated numbers, got {}", parts.len()))
}

fn parse_rect(value: &str) -> Result<Rect, String> {
    let [top, left, width, height] = parse_numbers::<4>(value)?;
    Ok(Rect::new(top, left, width, height))
}

fn parse_size(value: &str) -> Result<Size, String> {
    let [width, height] = parse_numbers::<2>(value)?;
    Ok(Size::new(width, height))
}

fn apply_overrides(mut config: GlossaryConfig, args: &HighlightArgs) -> GlossaryConfig {
    if args.all_occurrences {
        config.highlight.first_occurrence_only = false;
    }
    config.highlight.excluded_terms.extend(args.exclude.iter().cloned());
    config
}

fn handle_get(names: Vec<String>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let results: Vec<(String, Option<u32>)> = names
        .into_iter()
        .map(|name| {
            let index = Catalog::get(&name);
            (name, index)
        })
        .collect();

    if as_json {
        let payload: Vec<_> = results
            .iter()
            .map(|(name, index)| {
                let id = index
                    .and_then(Catalog::entry_by_index)
                    .map(|entry| entry.id());
                json!({ "name": name, "index": index, "id": id })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_lookup_table(&results);
    }
    Ok(())
}

fn handle_prefix(prefix: String, limit: usize, as_json: bool) -> Result<(), Box<dyn Error>> {
    let limit = cmp::max(1, limit);
    let matches = Catalog::prefix(&prefix, limit);

    if as_json {
        let payload = json!({
            "prefix": prefix,
            "limit": limit,
            "results": matches.iter().map(|(name, index)| {
                json!({"name": name, "index": index})
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if matches.is_empty() {
        println!("No terms matched prefix \"{prefix}\".");
    } else {
        println!("Matches for prefix \"{prefix}\":");
        print_name_table(&matches);
    }
    Ok(())
}

fn handle_search(query: String, limit: usize, as_json: bool) -> Result<(), Box<dyn Error>> {
    let limit = cmp::max(1, limit);
    let entries = Catalog::search(&query, limit);

    if as_json {
        let payload = json!({
            "query": query,
            "limit": limit,
            "results": entries.iter().map(|entry| {
                json!({
                    "id": entry.id(),
                    "name": entry.primary_name(),
                    "short_definition": entry.short_definition(),
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if entries.is_empty() {
        println!("No terms contain \"{query}\".");
    } else {
        let rows: Vec<(String, u32)> = entries
            .iter()
            .map(|entry| (entry.primary_name().to_string(), entry.index()))
            .collect();
        println!("Matches for \"{query}\":");
        print_name_table(&rows);
    }
    Ok(())
}

fn handle_show(query: String, by_id: bool, locale: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let entry = if by_id {
        Catalog::entry_by_id(&query)
    } else {
        Catalog::entry_by_name(&query)
    }
    .ok_or_else(|| GlossaryError::UnknownTerm(query.clone()))?;
    let term = entry.to_term();

    if as_json {
        let payload = json!({
            "index": entry.index(),
            "term": term,
            "link": glossary_link(locale, &term.id),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    match &term.secondary_name {
        Some(secondary) => println!("{} ({secondary})", term.primary_name),
        None => println!("{}", term.primary_name),
    }
    println!("ID: {}", term.id);
    if let Some(category) = term.category {
        println!("Category: {}", labels::category_label(locale, category));
    }
    println!("\n{}", term.short_definition);
    render_markdown_block("Explanation", &term.full_explanation);
    if !term.related_terms.is_empty() {
        println!("\nRelated: {}", term.related_terms.join(", "));
    }
    println!(
        "\n{}: {}",
        labels::more_info(locale),
        glossary_link(locale, &term.id)
    );
    Ok(())
}

fn handle_scan(
    text: &str,
    args: HighlightArgs,
    config: GlossaryConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let config = apply_overrides(config, &args);
    let locale = args
        .locale
        .unwrap_or_else(|| config.highlight.default_locale.clone());
    let dictionary = TermDictionary::build(&Catalog::terms(), &config.highlight.excluded_terms);
    let mut tracker = config.highlight.first_occurrence_only.then(OccurrenceSet::new);
    let matches = scan(text, &dictionary, tracker.as_mut());

    if as_json {
        let payload: Vec<_> = matches
            .iter()
            .map(|found| {
                json!({
                    "id": found.term.id,
                    "text": found.matched_text,
                    "start": found.start,
                    "end": found.end,
                    "link": glossary_link(&locale, &found.term.id),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if matches.is_empty() {
        println!("No glossary terms found.");
        return Ok(());
    }
    let width = matches
        .iter()
        .map(|found| found.term.id.len())
        .max()
        .unwrap_or(2)
        .max("ID".len());
    println!("{:<width$}  {:>5}  {:>5}  {}", "ID", "START", "END", "TEXT", width = width);
    println!("{:-<width$}  -----  -----  ----", "", width = width);
    for found in &matches {
        println!(
            "{:<width$}  {:>5}  {:>5}  {}",
            found.term.id,
            found.start,
            found.end,
            found.matched_text,
            width = width
        );
    }
    Ok(())
}

fn handle_annotate(
    input: &str,
    args: HighlightArgs,
    config: GlossaryConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let raw = if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input).map_err(GlossaryError::from)?
    };
    let content = ContentNode::from_json_str(&raw)?;

    let config = apply_overrides(config, &args);
    let locale = args
        .locale
        .unwrap_or_else(|| config.highlight.default_locale.clone());
    let highlighter = Highlighter::with_config(Catalog, config.highlight);
    let annotated = highlighter.highlight(&locale, &content);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&*annotated)?);
    } else {
        let mut rendered = String::new();
        render_inline(&annotated, &locale, &mut rendered);
        println!("{}", rendered.trim_end());
    }
    Ok(())
}

fn render_inline(node: &ContentNode, locale: &str, out: &mut String) {
    match node {
        ContentNode::Text(text) => out.push_str(text),
        ContentNode::Marker(marker) => {
            out.push('[');
            out.push_str(&marker.text);
            out.push_str("](");
            out.push_str(&glossary_link(locale, &marker.term.id));
            out.push(')');
        }
        ContentNode::Fragment(children) => {
            for child in children {
                render_inline(child, locale, out);
            }
        }
        ContentNode::Element(element) => {
            for child in &element.children {
                render_inline(child, locale, out);
            }
            if is_block(&element.tag) && !out.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "p" | "div" | "li" | "ul" | "ol" | "pre" | "section" | "article" | "h1" | "h2" | "h3"
            | "h4" | "blockquote"
    )
}

fn handle_position(
    anchor: Rect,
    overlay: Option<Size>,
    viewport: Viewport,
    config: &GlossaryConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let position = config.tooltip.compute(anchor, overlay, viewport);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&position)?);
    } else {
        let placement = serde_json::to_value(position.placement)?;
        println!(
            "top: {:.1}\nleft: {:.1}\nplacement: {}",
            position.top,
            position.left,
            placement.as_str().unwrap_or_default()
        );
    }
    Ok(())
}

fn print_lookup_table(rows: &[(String, Option<u32>)]) {
    if rows.is_empty() {
        println!("No names provided.");
        return;
    }
    let width = rows
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(4)
        .max("NAME".len());
    println!("{:<width$}  {}", "NAME", "TERM", width = width);
    println!("{:-<width$}  {}", "", "----------", width = width);
    for (name, index) in rows {
        let value = index
            .and_then(Catalog::entry_by_index)
            .map(|entry| format!("{} (#{})", entry.id(), entry.index()))
            .unwrap_or_else(|| "<missing>".to_string());
        println!("{:<width$}  {}", name, value, width = width);
    }
}

fn print_name_table(rows: &[(String, u32)]) {
    let width = rows
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(4)
        .max("NAME".len());
    println!("{:<width$}  {}", "NAME", "INDEX", width = width);
    println!("{:-<width$}  {}", "", "-----", width = width);
    for (name, index) in rows {
        println!("{:<width$}  {}", name, index, width = width);
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
