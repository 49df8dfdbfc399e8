use clap::Parser;
use std::error::Error;
use std::io;
use std::path::PathBuf;

mod auth;
mod config;
mod credentials;
mod due_date;
mod error;
mod integrations;
mod lens;
mod models;
mod platform;
mod presentation;
mod runtime;
mod storage;

use config::{Config, config_path, token_path};
use credentials::TokenStore;
use due_date::DueDateFormatter;
use lens::{SearchRequest, TaskLens};
use platform::{SystemBrowser, SystemClock};
use runtime::Shell;

#[derive(Parser)]
#[command(name = "tasklens", version, about = "Search your Remember The Milk tasks")]
struct Cli {
    /// Config file to use instead of the per-user one.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    debug: bool,

    /// Only show tasks from this list.
    #[arg(long)]
    category: Option<String>,

    /// priority, due or name.
    #[arg(long)]
    order: Option<String>,

    /// Include completed tasks.
    #[arg(long)]
    completed: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    init_logging(cli.debug || config.logging.debug);
    log::info!("Using config at {:?}", cli.config.clone().unwrap_or_else(config_path));

    if !config.has_credentials() {
        eprintln!(
            "Set rtm.api_key and rtm.shared_secret in {}",
            cli.config.clone().unwrap_or_else(config_path).display()
        );
    }

    let mut request = SearchRequest::from_config(&config);
    request.category = cli.category;
    if let Some(order) = cli.order {
        request.order = order;
    }
    request.include_completed |= cli.completed;

    let lens = TaskLens::new(
        &config,
        TokenStore::new(token_path()),
        DueDateFormatter::local(),
        SystemClock,
        SystemBrowser,
    )?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    Shell::new(lens, request).run(stdin.lock(), &mut stdout)?;
    Ok(())
}

// Journal logging (`journalctl --user -t tasklens -f`): this crate at info, or
// debug when asked; everything else at warn.
fn init_logging(debug: bool) {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
        debug: bool,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("tasklens") {
                let max = if self.debug {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }

        fn flush(&self) {
            self.inner.flush();
        }
    }

    let Ok(journal) = systemd_journal_logger::JournalLog::new() else {
        return;
    };
    let journal = journal.with_syslog_identifier("tasklens".to_string());
    if log::set_boxed_logger(Box::new(FilteredJournal {
        inner: journal,
        debug,
    }))
    .is_ok()
    {
        log::set_max_level(log::LevelFilter::Debug);
    }
}
