//! CLI entry point for `emlbox`.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, DECIMAL};
use serde::Serialize;

use emlbox::config::{self, Config};
use emlbox::error::MailboxError;
use emlbox::model::attachment::Attachment;
use emlbox::model::part::ContentPart;
use emlbox::store::mailbox::MailboxStore;

#[derive(Parser)]
#[command(
    name = "emlbox",
    version,
    about = "Inspect a directory of .eml files as a mailbox"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Mailbox directory (defaults to `mailbox.dir` from the config file)
    #[arg(short, long, global = true, env = "EMLBOX_DIR", value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List messages with their size and subject
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show how a message decomposes into parts and attachments
    Show {
        id: usize,
        #[arg(long)]
        json: bool,
    },
    /// Print the headers of a message (up to the first MIME boundary)
    Top { id: usize },
    /// Print the raw message
    Retrieve { id: usize },
    /// Delete messages (committed when the mailbox is closed)
    Delete {
        #[arg(required = true)]
        ids: Vec<usize>,
    },
    /// Copy the raw message to a file
    Save { id: usize, output: PathBuf },
    /// Print the effective configuration
    Config {
        /// Write it to the config file, recording --dir as the default mailbox
        #[arg(long)]
        save: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::List { json } => cmd_list(&open_store(cli.dir, &config)?, json),
        Commands::Show { id, json } => cmd_show(&open_store(cli.dir, &config)?, id, json),
        Commands::Top { id } => cmd_top(&open_store(cli.dir, &config)?, id),
        Commands::Retrieve { id } => cmd_retrieve(&open_store(cli.dir, &config)?, id),
        Commands::Delete { ids } => cmd_delete(open_store(cli.dir, &config)?, &ids),
        Commands::Save { id, output } => cmd_save(&open_store(cli.dir, &config)?, id, &output),
        Commands::Config { save } => cmd_config(config, cli.dir, save),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "emlbox.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Open the mailbox named on the command line or in the config.
fn open_store(dir: Option<PathBuf>, config: &Config) -> anyhow::Result<MailboxStore> {
    let dir = dir.or_else(|| config.mailbox.dir.clone()).ok_or_else(|| {
        anyhow::anyhow!("No mailbox directory: pass --dir or set mailbox.dir in the config")
    })?;
    let store = MailboxStore::try_open(&dir)?.with_extension(config.mailbox.extension.clone());
    Ok(store)
}

#[derive(Serialize)]
struct ListRow {
    id: usize,
    file_name: String,
    size: u64,
    pending_delete: bool,
    subject: Option<String>,
}

fn cmd_list(store: &MailboxStore, json: bool) -> anyhow::Result<()> {
    let sizes = store.sizes(None)?.unwrap_or_default();
    let mut rows = Vec::with_capacity(store.count());

    for (id, entry) in store.entries().iter().enumerate() {
        let subject = store.message(id)?.and_then(|m| m.subject());
        rows.push(ListRow {
            id,
            file_name: entry.file_name.clone(),
            size: sizes.get(id).copied().unwrap_or(0),
            pending_delete: entry.pending_delete,
            subject,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        println!(
            "{:>5}  {:>10}  {:<30}  {}",
            row.id,
            format_size(row.size, DECIMAL),
            row.file_name,
            row.subject.as_deref().unwrap_or("(no subject)")
        );
    }
    println!("{} message(s)", rows.len());
    Ok(())
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    id: usize,
    subject: Option<String>,
    from: Option<String>,
    parts: &'a [ContentPart],
    attachments: &'a [Attachment],
}

fn cmd_show(store: &MailboxStore, id: usize, json: bool) -> anyhow::Result<()> {
    let msg = store.message(id)?.ok_or(MailboxError::InvalidId(id))?;

    if json {
        let out = ShowOutput {
            id,
            subject: msg.subject(),
            from: msg.sender(),
            parts: msg.parts(),
            attachments: msg.attachments(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("From:    {}", msg.sender().unwrap_or_default());
    println!("Subject: {}", msg.subject().unwrap_or_default());
    println!("Headers: {}", msg.header().len());

    println!("Parts ({}):", msg.parts().len());
    for part in msg.parts() {
        println!(
            "  {:<24} charset={:<10} encoding={:<16} {}",
            part.content_type,
            part.charset.as_deref().unwrap_or("-"),
            part.transfer_encoding.as_deref().unwrap_or("-"),
            format_size(part.content.len(), DECIMAL)
        );
    }

    println!("Attachments ({}):", msg.attachments().len());
    for att in msg.attachments() {
        println!(
            "  {:<30} {:<24} encoding={:<10} {}",
            att.display_name().unwrap_or("(unnamed)"),
            att.content_type.as_deref().unwrap_or("-"),
            att.transfer_encoding.as_deref().unwrap_or("-"),
            format_size(att.data.len(), DECIMAL)
        );
    }
    Ok(())
}

fn cmd_top(store: &MailboxStore, id: usize) -> anyhow::Result<()> {
    let data = store.top(id)?.ok_or(MailboxError::InvalidId(id))?;
    std::io::stdout().write_all(&data)?;
    Ok(())
}

fn cmd_retrieve(store: &MailboxStore, id: usize) -> anyhow::Result<()> {
    let data = store.retrieve(id)?.ok_or(MailboxError::InvalidId(id))?;
    std::io::stdout().write_all(&data)?;
    Ok(())
}

fn cmd_delete(mut store: MailboxStore, ids: &[usize]) -> anyhow::Result<()> {
    // Reject unknown ids before marking anything
    if let Some(&bad) = ids.iter().find(|&&id| id >= store.count()) {
        return Err(MailboxError::InvalidId(bad).into());
    }
    for &id in ids {
        store.mark_deleted(id);
    }

    let report = store.close();
    for path in &report.deleted {
        println!("deleted {}", path.display());
    }
    for err in &report.failed {
        eprintln!("{err}");
    }
    if !report.is_clean() {
        anyhow::bail!("{} deletion(s) failed", report.failed.len());
    }
    Ok(())
}

fn cmd_save(store: &MailboxStore, id: usize, output: &Path) -> anyhow::Result<()> {
    let msg = store.message(id)?.ok_or(MailboxError::InvalidId(id))?;
    let written = msg.save_to_file(output)?;
    println!("{} written to {}", format_size(written, DECIMAL), output.display());
    Ok(())
}

fn cmd_config(mut config: Config, dir: Option<PathBuf>, save: bool) -> anyhow::Result<()> {
    if dir.is_some() {
        config.mailbox.dir = dir;
    }
    print!("{}", toml::to_string_pretty(&config)?);

    if save {
        config::save_config(&config)?;
        if let Some(path) = config::config_file_path() {
            eprintln!("saved to {}", path.display());
        }
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "emlbox", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}
