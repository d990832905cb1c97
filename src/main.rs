use anyhow::{anyhow, bail, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mediacat::analyzer::VisionAnalyzer;
use mediacat::config::Config;
use mediacat::db::Catalog;
use mediacat::pipeline::Pipeline;
use mediacat::probe::{self, ToolProbe};
use mediacat::sidecar::Sidecar;
use mediacat::{logging, scanner};

fn print_help() {
    println!(
        r#"mediacat - media ingest pipeline with a searchable catalog

USAGE:
    mediacat <COMMAND> [OPTIONS]

COMMANDS:
    scan <folder> [--output PATH] [--force]
        Discover media files and write a manifest (read-only)
    run <folder> [--force] [--workers N] [--config PATH]
        Full ingest: probe, keyframes, analysis, sidecars, catalog
    upsert <db> <sidecar.json>...
        Add/update catalog rows from existing sidecar files
    search <db> <term>...
        Ranked search over tags and descriptions
    stats <db>
        Catalog statistics
    tags <db>
        List all tags with counts
    export <db> [--output PATH]
        Export the catalog as JSON

OPTIONS:
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    MEDIACAT_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/mediacat/config.toml"#
    );
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let command = match args.first().map(String::as_str) {
        None | Some("--help") | Some("-h") => {
            print_help();
            return Ok(());
        }
        Some("--version") | Some("-V") => {
            println!("mediacat {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(cmd) => cmd.to_string(),
    };

    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let rest = &args[1..];
    match command.as_str() {
        "scan" => cmd_scan(rest),
        "run" => cmd_run(rest),
        "upsert" => cmd_upsert(rest),
        "search" => cmd_search(rest),
        "stats" => cmd_stats(rest),
        "tags" => cmd_tags(rest),
        "export" => cmd_export(rest),
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn positional(args: &[String]) -> Vec<&String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            // All our value flags take exactly one argument
            skip_next = matches!(arg.as_str(), "--output" | "--workers" | "--config");
            continue;
        }
        out.push(arg);
    }
    out
}

fn cmd_scan(args: &[String]) -> Result<()> {
    let folder = positional(args)
        .first()
        .map(|s| PathBuf::from(s.as_str()))
        .ok_or_else(|| anyhow!("usage: mediacat scan <folder> [--output PATH] [--force]"))?;
    if !folder.is_dir() {
        bail!("{} is not a directory", folder.display());
    }

    let config = Config::load()?;
    let force = has_flag(args, "--force");
    let manifest = scanner::scan(&folder, &config.scanner, force)?;

    println!("Media scan results for {}", folder.display());
    println!("{}", manifest.summary());

    let output = flag_value(args, "--output")
        .map(PathBuf::from)
        .unwrap_or_else(|| folder.join("manifest.json"));
    manifest.write_json(&output)?;
    println!("Manifest written to {}", output.display());

    Ok(())
}

fn cmd_run(args: &[String]) -> Result<()> {
    let folder = positional(args)
        .first()
        .map(|s| PathBuf::from(s.as_str()))
        .ok_or_else(|| anyhow!("usage: mediacat run <folder> [--force] [--workers N]"))?;
    if !folder.is_dir() {
        bail!("{} is not a directory", folder.display());
    }

    let mut config = match flag_value(args, "--config") {
        Some(path) => Config::load_from(Path::new(&path))?,
        None => Config::load()?,
    };
    if let Some(workers) = flag_value(args, "--workers") {
        config.pipeline.workers = workers.parse()?;
    }

    // Missing tools are a startup diagnostic, not a per-file failure
    probe::check_tools()?;

    let catalog = Mutex::new(Catalog::open(&config.db_path)?);
    let analyzer = VisionAnalyzer::new(&config.analyzer);
    let pipeline = Pipeline::new(&config, &ToolProbe, &analyzer);

    let summary = pipeline.run(&folder, &catalog, has_flag(args, "--force"))?;
    println!("{}", summary.report());

    Ok(())
}

fn cmd_upsert(args: &[String]) -> Result<()> {
    let positional = positional(args);
    let (db_path, sidecars) = positional
        .split_first()
        .ok_or_else(|| anyhow!("usage: mediacat upsert <db> <sidecar.json>..."))?;
    if sidecars.is_empty() {
        bail!("usage: mediacat upsert <db> <sidecar.json>...");
    }

    let mut catalog = Catalog::open(Path::new(db_path.as_str()))?;
    for path in sidecars {
        let sidecar = Sidecar::read(Path::new(path.as_str()))?;
        let id = catalog.upsert_asset(&sidecar)?;
        println!("Upserted asset #{}: {}", id, sidecar.filename);
    }

    Ok(())
}

fn cmd_search(args: &[String]) -> Result<()> {
    let positional = positional(args);
    let (db_path, terms) = positional
        .split_first()
        .ok_or_else(|| anyhow!("usage: mediacat search <db> <term>..."))?;
    let terms: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
    if terms.is_empty() {
        bail!("usage: mediacat search <db> <term>...");
    }

    let catalog = Catalog::open(Path::new(db_path.as_str()))?;
    let hits = catalog.search(&terms)?;

    if hits.is_empty() {
        println!("No results for: {}", terms.join(" "));
        let stats = catalog.stats(15)?;
        if stats.total_assets > 0 {
            println!("\nCatalog holds {} assets. Top tags:", stats.total_assets);
            for (tag, count) in &stats.top_tags {
                println!("  #{} ({})", tag, count);
            }
        }
        return Ok(());
    }

    println!("{} result(s) for: {}\n", hits.len(), terms.join(" "));
    for hit in &hits {
        let description: String = hit.description.chars().take(120).collect();
        println!("  {}  ({}, matched {})", hit.filename, hit.file_type, hit.score);
        println!("    {}", description);
        println!("    Tags: {}", hit.tags.join(", "));
        println!("    Path: {}\n", hit.filepath);
    }

    Ok(())
}

fn cmd_stats(args: &[String]) -> Result<()> {
    let db_path = positional(args)
        .first()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("usage: mediacat stats <db>"))?;

    let catalog = Catalog::open(Path::new(&db_path))?;
    let stats = catalog.stats(15)?;

    println!("Media catalog stats");
    println!("  Total assets:   {}", stats.total_assets);
    println!("  Photos:         {}", stats.photos);
    println!("  Videos:         {}", stats.videos);
    println!("  Unique tags:    {}", stats.unique_tags);
    println!("  Total tag uses: {}", stats.total_tags);
    if !stats.top_tags.is_empty() {
        println!("\n  Top tags:");
        for (tag, count) in &stats.top_tags {
            println!("    #{} ({})", tag, count);
        }
    }

    Ok(())
}

fn cmd_tags(args: &[String]) -> Result<()> {
    let db_path = positional(args)
        .first()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("usage: mediacat tags <db>"))?;

    let catalog = Catalog::open(Path::new(&db_path))?;
    for (tag, count) in catalog.list_tags()? {
        println!("  #{} ({})", tag, count);
    }

    Ok(())
}

fn cmd_export(args: &[String]) -> Result<()> {
    let db_path = positional(args)
        .first()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("usage: mediacat export <db> [--output PATH]"))?;
    let output = flag_value(args, "--output").unwrap_or_else(|| "catalog_export.json".to_string());

    let catalog = Catalog::open(Path::new(&db_path))?;
    let assets = catalog.export()?;
    let document = serde_json::json!({
        "assets": &assets,
        "exported_at": chrono::Utc::now().to_rfc3339(),
    });
    std::fs::write(&output, serde_json::to_string_pretty(&document)?)?;

    println!("Exported {} assets to {}", assets.len(), output);
    Ok(())
}
