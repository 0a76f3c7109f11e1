//! # diary-feed
//!
//! Terminal front end: assembles stores, session and services from
//! settings, then runs one command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{render_categories, render_entry, render_feed, render_listing, ConsoleShare, TracingNotifier};
use auth_adapters::StaticSession;
use clap::{Parser, Subcommand};
use configs::{BackoffKind, LogSettings, Settings};
use domains::{
    DomainError, EntryDraft, EntryPatch, EntryStore, FeedFilters, NotificationSink, SessionProvider, SortDirection,
    SortKey, SortSpec,
};
use services::{AdminService, Backoff, DiaryService, FeedController, RetryPolicy};
use storage_adapters::{select_diary_store, LocalEntryStore, StoreKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "remote-http")]
use storage_adapters::PostgrestEntryStore;

#[derive(Parser, Debug)]
#[command(name = "diary-feed", about = "Personal diary and public feed")]
struct Cli {
    /// Settings file (defaults to ./diary.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the public feed.
    Feed {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        category: Option<String>,
        /// date, likes or views
        #[arg(long, default_value = "date")]
        sort: SortKey,
        /// Oldest/least first instead of newest/most first.
        #[arg(long)]
        asc: bool,
        /// How many pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Like a public entry.
    Like { id: String },
    /// Count a view of a public entry.
    View { id: String },
    /// Comment on a public entry (needs a signed-in session).
    Comment { id: String, text: String },
    /// Print a public entry for sharing.
    Share { id: String },
    /// Write a diary entry.
    Write {
        text: String,
        #[arg(long)]
        public: bool,
        #[arg(long)]
        category: Option<String>,
    },
    /// Change one of your diary entries.
    Edit {
        id: String,
        #[arg(long)]
        text: Option<String>,
        /// Empty string removes the category.
        #[arg(long)]
        category: Option<String>,
        #[arg(long, conflicts_with = "private")]
        public: bool,
        #[arg(long)]
        private: bool,
    },
    /// List your diary entries.
    Diary,
    /// Export your diary to a text file.
    Backup {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// List categories.
    Categories,
    /// Moderation commands (configured admin only).
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },
    /// Check the remote store connection.
    Ping,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "date")]
        sort: SortKey,
        #[arg(long)]
        asc: bool,
    },
    Delete { id: String },
    Toggle { id: String },
}

/// Everything a command needs, built once per run.
struct App {
    notifier: Arc<dyn NotificationSink>,
    session: Arc<StaticSession>,
    feed_store: Arc<dyn EntryStore>,
    diary_store: Arc<dyn EntryStore>,
    diary_kind: StoreKind,
    policy: RetryPolicy,
    page_size: usize,
    admin_email: Option<String>,
    #[cfg(feature = "remote-http")]
    remote: Option<Arc<PostgrestEntryStore>>,
}

impl App {
    fn build(settings: &Settings) -> anyhow::Result<Self> {
        let notifier: Arc<dyn NotificationSink> = Arc::new(TracingNotifier);
        let session = Arc::new(StaticSession::from_parts(
            settings.session.user_id.clone(),
            settings.session.email.clone(),
        ));
        let local: Arc<dyn EntryStore> = Arc::new(LocalEntryStore::new(&settings.storage.local_path));

        #[cfg(feature = "remote-http")]
        let remote = connect_remote(settings)?;
        #[cfg(feature = "remote-http")]
        let remote_store = remote.clone().map(|r| r as Arc<dyn EntryStore>);
        #[cfg(not(feature = "remote-http"))]
        let remote_store: Option<Arc<dyn EntryStore>> = None;

        let feed_store = remote_store.clone().unwrap_or_else(|| local.clone());
        let (diary_kind, diary_store) = select_diary_store(remote_store, local, session.identity());

        Ok(Self {
            notifier,
            session,
            feed_store,
            diary_store,
            diary_kind,
            policy: retry_policy(settings),
            page_size: settings.feed.page_size,
            admin_email: settings.admin.email.clone(),
            #[cfg(feature = "remote-http")]
            remote,
        })
    }

    fn session(&self) -> Arc<dyn SessionProvider> {
        self.session.clone()
    }

    fn feed(&self) -> FeedController {
        FeedController::new(self.feed_store.clone(), self.notifier.clone(), self.session())
            .with_policy(self.policy)
            .with_page_size(self.page_size)
    }

    fn diary(&self) -> DiaryService {
        DiaryService::new(
            self.diary_store.clone(),
            self.notifier.clone(),
            self.session.identity().cloned(),
            self.diary_kind,
        )
    }

    fn admin(&self) -> AdminService {
        AdminService::new(self.feed_store.clone(), self.notifier.clone(), self.session(), self.admin_email.clone())
    }
}

#[cfg(feature = "remote-http")]
fn connect_remote(settings: &Settings) -> anyhow::Result<Option<Arc<PostgrestEntryStore>>> {
    let (Some(url), Some(key)) = (&settings.backend.url, &settings.backend.anon_key) else {
        return Ok(None);
    };
    let store = PostgrestEntryStore::new(
        url,
        key,
        settings.session.access_token.as_ref(),
        Duration::from_secs(settings.backend.timeout_secs),
    )
    .context("failed to build remote store client")?;
    Ok(Some(Arc::new(store)))
}

fn retry_policy(settings: &Settings) -> RetryPolicy {
    let feed = &settings.feed;
    let backoff = match feed.backoff {
        BackoffKind::Linear => Backoff::Linear,
        BackoffKind::Exponential => Backoff::Exponential,
    };
    RetryPolicy::new(
        feed.max_attempts,
        Duration::from_millis(feed.base_delay_ms),
        Duration::from_millis(feed.max_delay_ms),
        backoff,
    )
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn direction(asc: bool) -> SortDirection {
    if asc {
        SortDirection::Asc
    } else {
        SortDirection::Desc
    }
}

/// `--public` / `--private` to a visibility change, if any.
fn visibility(public: bool, private: bool) -> Option<bool> {
    match (public, private) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    init_tracing(&settings.log);

    let app = App::build(&settings)?;
    info!(diary_store = ?app.diary_kind, signed_in = app.session.identity().is_some(), "diary-feed starting");

    match cli.command {
        Command::Feed { search, category, sort, asc, pages } => {
            let feed = app.feed();
            let filters = FeedFilters { search, category, sort: SortSpec::new(sort, direction(asc)) };
            let first = feed.load_first_page(filters).await;
            if first.is_ok() {
                for _ in 1..pages {
                    if !feed.state().has_more {
                        break;
                    }
                    feed.load_next_page().await?;
                }
            }
            print!("{}", render_feed(&feed.state()));
            first?;
        }
        Command::Like { id } => {
            let likes = app.feed().record_like(&id).await?;
            println!("#{id} now has {likes} likes");
        }
        Command::View { id } => {
            app.feed().record_view(&id).await;
        }
        Command::Comment { id, text } => {
            let feed = app.feed();
            let comment = feed.submit_comment(&id, &text).await?;
            println!("comment {} added to #{id}", comment.id);
            for c in feed.load_comments(&id).await? {
                println!("  > {}: {}", c.user_id, c.content);
            }
        }
        Command::Share { id } => {
            let feed = app.feed();
            feed.load_first_page(FeedFilters::default()).await?;
            while feed.state().entry(&id).is_none() && feed.state().has_more {
                feed.load_next_page().await?;
            }
            match feed.share(&id, &ConsoleShare::stdout()) {
                Ok(_) | Err(DomainError::Cancelled(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Command::Edit { id, text, category, public, private } => {
            app.diary().update_entry(&id, EntryPatch::edit(text, category, visibility(public, private))).await?;
            println!("#{id} updated");
        }
        Command::Write { text, public, category } => {
            let draft = EntryDraft { content: text, category_id: category, is_public: public };
            let entry = app.diary().create_entry(draft).await?;
            print!("{}", render_entry(&entry));
        }
        Command::Diary => {
            let entries = app.diary().list_entries().await?;
            print!("{}", render_listing(&entries));
        }
        Command::Backup { out } => {
            let (file_name, contents) = app.diary().backup().await?;
            tokio::fs::create_dir_all(&out).await?;
            let path = out.join(file_name);
            tokio::fs::write(&path, contents)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("backup written to {}", path.display());
        }
        Command::Categories => {
            print!("{}", render_categories(&app.diary().categories().await));
        }
        Command::Admin { action } => {
            let mut admin = app.admin();
            admin.load_all().await?;
            match action {
                AdminCommand::List { search, sort, asc } => {
                    let visible = admin.browse(&search, SortSpec::new(sort, direction(asc)));
                    print!("{}", render_listing(visible));
                }
                AdminCommand::Delete { id } => {
                    admin.delete_entry(&id).await?;
                    println!("deleted #{id}");
                }
                AdminCommand::Toggle { id } => {
                    let public = admin.toggle_public(&id).await?;
                    println!("#{id} is now {}", if public { "public" } else { "private" });
                }
            }
        }
        Command::Ping => ping(&app, &settings).await?,
    }
    Ok(())
}

#[cfg(feature = "remote-http")]
async fn ping(app: &App, settings: &Settings) -> anyhow::Result<()> {
    match &app.remote {
        Some(remote) => {
            remote.ping().await?;
            println!("remote store reachable");
        }
        None => println!("no backend configured; using {}", settings.storage.local_path.display()),
    }
    Ok(())
}

#[cfg(not(feature = "remote-http"))]
async fn ping(_app: &App, settings: &Settings) -> anyhow::Result<()> {
    println!("built without remote-http; using {}", settings.storage.local_path.display());
    Ok(())
}
