use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use trackmatch::export::{self, ExportFormat};
use trackmatch::query;
use trackmatch::store::JsonFileStorage;
use trackmatch::{
    AddOutcome, Config, ListStore, MatchResult, MoveOutcome, MusicBrainzAdapter, QueryInput, Reconciler,
    SortKey, Source, SourceRecord, SpotifyAdapter, logging,
};

#[derive(Parser)]
#[command(name = "trackmatch", version, about = "Match a recording across Spotify and MusicBrainz")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up by ISRC
    Code {
        isrc: String,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Look up by artist plus track and/or album
    Keyword {
        #[arg(long)]
        artist: String,
        #[arg(long, default_value = "")]
        track: String,
        #[arg(long, default_value = "")]
        album: String,
        #[arg(long, default_value = "")]
        year: String,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Look up a Spotify track/album or MusicBrainz recording URL
    Url {
        url: String,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Show all saved lists
    Lists,
    /// Manage one saved list
    List {
        #[command(subcommand)]
        action: ListAction,
    },
}

#[derive(Args)]
struct SaveArgs {
    /// Add the matched record to this list (created if missing)
    #[arg(long, value_name = "LIST")]
    save: Option<String>,
}

#[derive(Subcommand)]
enum ListAction {
    Create { name: String },
    Rename { list_id: String, name: String },
    Delete { list_id: String },
    Remove { list_id: String, source: Source, id: String },
    Up { list_id: String, index: usize },
    Down { list_id: String, index: usize },
    Sort { list_id: String, key: SortKey },
    Export {
        list_id: String,
        format: ExportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::info!("=== trackmatch starting ===");

    match cli.command {
        Command::Code { isrc, save } => lookup(&config, QueryInput::code(isrc), save).await,
        Command::Keyword { artist, track, album, year, save } => {
            lookup(&config, QueryInput::keyword(artist, track, album).with_year(year), save).await
        }
        Command::Url { url, save } => lookup(&config, QueryInput::url(url), save).await,
        Command::Lists => show_lists(&config),
        Command::List { action } => run_list_action(&config, action),
    }
}

fn open_store(config: &Config) -> Result<ListStore<JsonFileStorage>> {
    let storage = JsonFileStorage::new(&config.data_dir);
    let path = storage.path().display().to_string();
    ListStore::open(storage).with_context(|| format!("opening saved lists at {}", path))
}

async fn lookup(config: &Config, input: QueryInput, save: SaveArgs) -> Result<()> {
    if config.spotify_credentials.is_none() {
        tracing::warn!("SPOTIFY_CLIENT_ID/SPOTIFY_CLIENT_SECRET not set; Spotify lookups will return nothing");
        eprintln!("Note: Spotify credentials are not configured, only MusicBrainz will be queried.");
    }

    let reconciler = Reconciler::new(
        SpotifyAdapter::new(config),
        MusicBrainzAdapter::new(config),
        config.debounce,
    );
    // One-shot command: nothing to debounce or supersede
    let query = query::normalize(&input)?;
    let result = reconciler.lookup_now(&query).await;

    print_result(&result);

    if let Some(list_name) = save.save {
        let record = result
            .preferred_record()
            .context("nothing to save: neither provider returned a record")?;
        save_record(config, &list_name, record)?;
    }
    Ok(())
}

fn print_record(source: Source, record: Option<&SourceRecord>) {
    println!("[{}]", source);
    match record {
        Some(r) => {
            println!("  id:       {}", r.id);
            println!("  title:    {}", r.title);
            println!("  artist:   {}", r.artist);
            println!("  album:    {}", r.album);
            println!("  released: {}", r.release_date.as_deref().unwrap_or("-"));
            println!("  isrc:     {}", r.isrc.as_deref().unwrap_or("-"));
            println!("  duration: {}", r.duration_display());
            if let Some(url) = &r.external_url {
                println!("  link:     {}", url);
            }
        }
        None => println!("  no result"),
    }
}

fn print_result(result: &MatchResult) {
    print_record(Source::Spotify, result.spotify.as_ref());
    print_record(Source::MusicBrainz, result.musicbrainz.as_ref());
    if let Some(fields) = &result.fields {
        println!("[fields]");
        for (name, tag) in fields.entries() {
            println!("  {:<12} {}", name, tag);
        }
    }
    println!("status: {}", result.status);
}

fn save_record(config: &Config, list_name: &str, record: &SourceRecord) -> Result<()> {
    let mut store = open_store(config)?;
    let list_id = match store.find_by_name(list_name) {
        Some(list) => list.id.clone(),
        None => store.create_list(list_name)?.id.clone(),
    };
    match store.add_item(&list_id, record)? {
        AddOutcome::Added => println!("Added '{}' to list '{}'", record.title, list_name),
        AddOutcome::AlreadyPresent => println!("'{}' is already in list '{}'", record.title, list_name),
    }
    Ok(())
}

fn show_lists(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    if store.lists().is_empty() {
        println!("No saved lists.");
    }
    for list in store.lists() {
        println!("{}  {}  ({} items, updated {})", list.id, list.name, list.len(), list.updated_at.format("%Y-%m-%d %H:%M"));
        for (index, item) in list.items.iter().enumerate() {
            println!("  {:>3}. {} - {} [{}:{}]", index, item.record.artist, item.record.title, item.record.source.as_str(), item.record.id);
        }
    }
    Ok(())
}

fn report_move(outcome: MoveOutcome) {
    match outcome {
        MoveOutcome::Moved => println!("Moved."),
        MoveOutcome::AtBoundary => println!("Already at the edge of the list; nothing moved."),
        MoveOutcome::OutOfRange => println!("No item at that index."),
    }
}

fn run_list_action(config: &Config, action: ListAction) -> Result<()> {
    let mut store = open_store(config)?;
    match action {
        ListAction::Create { name } => {
            let list = store.create_list(&name)?;
            println!("Created list '{}' ({})", list.name, list.id);
        }
        ListAction::Rename { list_id, name } => store.rename(&list_id, &name)?,
        ListAction::Delete { list_id } => store.delete_list(&list_id)?,
        ListAction::Remove { list_id, source, id } => {
            if !store.remove_item(&list_id, source, &id)? {
                println!("No such item in the list.");
            }
        }
        ListAction::Up { list_id, index } => report_move(store.move_up(&list_id, index)?),
        ListAction::Down { list_id, index } => report_move(store.move_down(&list_id, index)?),
        ListAction::Sort { list_id, key } => store.sort_by(&list_id, key)?,
        ListAction::Export { list_id, format, out } => {
            let list = store
                .get(&list_id)
                .with_context(|| format!("no list with id '{}'", list_id))?;
            let bytes = export::export(list, format)?;
            let path = out.unwrap_or_else(|| PathBuf::from(format.file_name(list)));
            std::fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} ({}, {} bytes)", path.display(), format.mime_type(), bytes.len());
        }
    }
    Ok(())
}
