use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::{error, info};

use feeder::datetime::format_in_timezone;
use feeder::feed::HttpFetcher;
use feeder::registry::{AddSources, Confirm, Selection, SourceRegistry};
use feeder::Config;

const DEFAULT_CONFIG_FILE: &str = "feeder.toml";

/// Asks on the terminal; anything but "y"/"yes" declines.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        match prompt_line(&format!("{prompt} [y/N] ")) {
            Some(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            None => false,
        }
    }
}

/// Print `prompt` and read one line; `None` on end of input.
fn prompt_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = feeder::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        feeder::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("feeder {}", env!("CARGO_PKG_VERSION"));

    let fetcher = match HttpFetcher::new(&config.fetch) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to create fetcher: {}", e);
            std::process::exit(1);
        }
    };

    let mut registry = match SourceRegistry::open(&config) {
        Ok(registry) => registry,
        Err(e) => {
            error!(
                "Failed to open source list '{}': {}",
                config.data.sourcelist_path().display(),
                e
            );
            std::process::exit(1);
        }
    };
    let loaded = registry.load_articles();
    info!(
        "{} source(s), {} stored article(s)",
        registry.count(),
        loaded
    );

    run(&mut registry, &fetcher, &config).await;
}

async fn run(registry: &mut SourceRegistry, fetcher: &HttpFetcher, config: &Config) {
    print_help();

    loop {
        let Some(line) = prompt_line("> ") else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        match command {
            "q" | "quit" => {
                if registry.has_unsaved_changes()
                    && !StdinConfirm.confirm("There are unsaved changes, quit anyway?")
                {
                    continue;
                }
                break;
            }
            "a" | "add" => add_command(registry, fetcher, &args).await,
            "d" | "delete" => delete_command(registry, &args),
            "l" | "list" => list_command(registry, &args),
            "r" | "refresh" => refresh_command(registry, fetcher).await,
            "v" | "view" => view_command(registry, &args, &config.display.timezone),
            "s" | "save" => save_command(registry, &args),
            "i" | "info" => println!("{}", registry.info()),
            "h" | "help" | "?" => print_help(),
            other => println!("Unknown command '{other}', type h for help"),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  a <url>          add a source (asks for name and subname)");
    println!("  d <index>...     delete sources");
    println!("  l [index]...     list sources");
    println!("  r                refresh all sources");
    println!("  v <index>        view the articles of a source");
    println!("  s [path]         save the source list");
    println!("  i                registry information");
    println!("  h                this help");
    println!("  q                quit");
}

fn parse_selection(args: &[&str]) -> Option<Selection> {
    let indices: Result<Vec<usize>, _> = args.iter().map(|arg| arg.parse::<usize>()).collect();
    match indices {
        Ok(indices) if indices.is_empty() => Some(Selection::All),
        Ok(mut indices) if indices.len() == 1 => indices.pop().map(Selection::One),
        Ok(indices) => Some(Selection::Many(indices)),
        Err(_) => {
            println!("Indices must be non-negative numbers");
            None
        }
    }
}

async fn add_command(registry: &mut SourceRegistry, fetcher: &HttpFetcher, args: &[&str]) {
    let url = match args.first() {
        Some(url) => url.to_string(),
        None => match prompt_line("URL: ") {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => return,
        },
    };
    let name = prompt_line("Name: ").unwrap_or_default();
    let subname = prompt_line("Subname: ").unwrap_or_default();

    let batch = AddSources::one(url)
        .with_names([name.trim()])
        .with_subnames([subname.trim()]);
    match registry.add(batch, fetcher).await {
        Ok(true) => println!("Added."),
        Ok(false) => println!("The URL could not be reached; nothing was added."),
        Err(e) => println!("Add failed: {e}"),
    }
}

fn delete_command(registry: &mut SourceRegistry, args: &[&str]) {
    if args.is_empty() {
        println!("Usage: d <index>...");
        return;
    }
    let Some(selection) = parse_selection(args) else {
        return;
    };

    match registry.delete(selection, &StdinConfirm) {
        Ok(removed) => println!("Deleted {} source(s).", removed.len()),
        Err(e) => println!("Delete failed: {e}"),
    }
}

fn list_command(registry: &SourceRegistry, args: &[&str]) {
    let Some(selection) = parse_selection(args) else {
        return;
    };

    match registry.list(selection) {
        Ok(lines) if lines.is_empty() => println!("No sources."),
        Ok(lines) => lines.iter().for_each(|line| println!("{line}")),
        Err(e) => println!("{e}"),
    }
}

async fn refresh_command(registry: &mut SourceRegistry, fetcher: &HttpFetcher) {
    let summary = registry.refresh_all(fetcher).await;
    println!(
        "Refreshed {} source(s), {} valid.",
        summary.attempted, summary.valid
    );
    for url in &summary.failed {
        println!("  failed: {url}");
    }
    for url in &summary.save_failed {
        println!("  not saved: {url}");
    }
}

fn view_command(registry: &SourceRegistry, args: &[&str], timezone: &str) {
    let Some(source) = args
        .first()
        .and_then(|arg| arg.parse::<usize>().ok())
        .and_then(|index| registry.get(index))
    else {
        println!("Usage: v <index>");
        return;
    };

    println!("{}", source.display_name());
    if let Some(time) = source.time().or(source.file_time()) {
        println!(
            "Updated: {}",
            format_in_timezone(time, timezone, "%Y-%m-%d %H:%M %Z")
        );
    }
    if source.articles().is_empty() {
        println!("No articles.");
    }
    for article in source.articles() {
        println!("{}", article.display_line());
    }
}

fn save_command(registry: &mut SourceRegistry, args: &[&str]) {
    let path = args.first().map(Path::new);
    match registry.save(path, &StdinConfirm) {
        Ok(path) => println!("Saved to {}.", path.display()),
        Err(e) => println!("Save failed: {e}"),
    }
}
