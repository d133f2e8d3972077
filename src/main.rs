use chrono::Utc;
use clap::Parser;
use estatewatch::analysis;
use estatewatch::cli::{Cli, Command};
use estatewatch::config::Config;
use estatewatch::error::StoreError;
use estatewatch::logging;
use estatewatch::model::DatasetMetadata;
use estatewatch::novelty::{self, seen::SeenIndex};
use estatewatch::report::{self, InfoReport, MarketReport};
use estatewatch::store::{backend, codec, DurableStore, LoadedDataset};
use estatewatch::util::format_bytes;
use serde::Serialize;
use std::fmt::Display;

fn fail(message: impl Display) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn load_or_exit(store: &DurableStore) -> LoadedDataset {
    let Some(loaded) = store.load() else {
        fail("No saved dataset. Run 'estatewatch import <FILE>' first.");
    };

    if loaded.skipped > 0 {
        eprintln!("warning: {} stored listings could not be read and were ignored", loaded.skipped);
    }
    loaded
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match report::json::render(value) {
        Ok(output) => println!("{output}"),
        Err(e) => fail(format!("Error rendering JSON: {e}")),
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load()
        .unwrap_or_else(|e| fail(format!("Error loading config: {e}")))
        .with_overrides(cli.data_dir, cli.window);

    let window = config
        .novelty_window()
        .unwrap_or_else(|e| fail(format!("Error: {e}")));

    let backend = backend::open_default(config.storage.data_dir.as_deref());
    let store = DurableStore::new(backend.clone(), config.ceiling_bytes());
    let now = Utc::now();

    match cli.command {
        Command::Import(args) => {
            let text = std::fs::read_to_string(&args.file)
                .unwrap_or_else(|e| fail(format!("Error reading {}: {e}", args.file.display())));

            let feed = codec::decode_feed(&text)
                .unwrap_or_else(|e| fail(format!("Error reading {}: {e}", args.file.display())));

            let search_params = match &args.params {
                Some(raw) => serde_json::from_str(raw)
                    .unwrap_or_else(|e| fail(format!("Invalid --params JSON: {e}"))),
                None => feed.search_params,
            };
            let metadata = DatasetMetadata::new(search_params);

            let quota = match store.save(&feed.batch.records, &metadata) {
                Ok(quota) => quota,
                Err(StoreError::QuotaExceeded { size, ceiling }) => fail(format!(
                    "Dataset is {} which exceeds the {} storage limit. The previous dataset was kept.",
                    format_bytes(size),
                    format_bytes(ceiling)
                )),
                Err(e) => fail(format!("Error saving dataset: {e}")),
            };

            if !backend.is_durable() {
                eprintln!("warning: storage is unavailable, the dataset will not be kept after exit");
            }

            let saved = feed.batch.records.len();
            let mut index = SeenIndex::open(backend.clone());
            let classified = novelty::classify(&mut index, feed.batch.records, window, now);
            let summary = novelty::summarize(&classified);

            println!("{}", report::import_summary(saved, feed.batch.skipped, &summary, &quota));
        }
        Command::Report(args) => {
            let loaded = load_or_exit(&store);
            let mut index = SeenIndex::open(backend.clone());
            let market = MarketReport::build(loaded.dataset, &mut index, window, now, args.new_only);

            if args.json {
                print_json(&market);
            } else {
                print!("{}", report::table::render_report(&market));
            }
        }
        Command::Deals(args) => {
            let loaded = load_or_exit(&store);
            let top = args.top.unwrap_or(config.analysis.top_deals);
            let deals = analysis::best_deals(&loaded.dataset.records, top);

            if args.json {
                print_json(&deals);
            } else {
                print!("{}", report::table::render_deals(&deals));
            }
        }
        Command::Groups(args) => {
            let loaded = load_or_exit(&store);
            let groups = analysis::rank_groups(&loaded.dataset.records);

            if args.json {
                print_json(&groups);
            } else {
                print!("{}", report::table::render_groups(&groups));
            }
        }
        Command::Info(args) => {
            let index = SeenIndex::open(backend.clone());
            let info = InfoReport::new(store.info(), index.len());

            if args.json {
                print_json(&info);
            } else {
                print!("{}", report::table::render_info(&info));
            }
        }
        Command::Clear => {
            if let Err(e) = store.clear() {
                fail(format!("Error clearing dataset: {e}"));
            }
            println!("Cleared stored dataset. New-listing history was kept.");
        }
        Command::Prune(args) => {
            let months = args.months.unwrap_or(config.novelty.prune_after_months);
            let mut index = SeenIndex::open(backend.clone());

            match index.prune(months, now) {
                Ok(removed) => println!("Forgot {removed} listings first seen more than {months} months ago."),
                Err(e) => fail(format!("Error pruning listing history: {e}")),
            }
        }
    }
}
