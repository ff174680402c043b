//! `postbox admin --username <name> --token <token>`
//!
//! A line-oriented admin console over stdin. The first line is the password
//! unless `--password` / `POSTBOX_PASSWORD` is given.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use postbox_core::{Draft, LocalImage, PostId};
use postbox_session::Session;
use postbox_store::{AccessToken, ContentStore, GithubStore};
use postbox_sync::{DeleteOutcome, EntryState, StatusEvent, StatusKind};

use super::{github_store, load_config};

const HELP: &str = "\
commands:
  list                                   show the working view
  add <title> | <content> [| <image>...]  stage a new post
  delete <id>                            stage a delete (discards drafts)
  undelete <id>                          undo a staged delete
  reorder <id> <id> ...                  stage a new order for published posts
  cancel-reorder                         leave reorder mode
  pending                                summarise staged changes
  publish                                write staged changes to the repository
  refresh                                re-read the repository
  discard                                drop all staged changes
  logout | quit                          end the session";

#[derive(Args, Debug)]
pub struct AdminArgs {
    #[arg(long, short = 'u')]
    pub username: String,

    /// Personal access token with push access to the repository.
    #[arg(long, env = "POSTBOX_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Admin password; read from the first stdin line when omitted.
    #[arg(long, env = "POSTBOX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List,
    Add {
        title: String,
        content: String,
        images: Vec<PathBuf>,
    },
    Delete(PostId),
    Undelete(PostId),
    Reorder(Vec<PostId>),
    CancelReorder,
    Pending,
    Publish,
    Refresh,
    Discard,
    Quit,
    Help,
}

impl AdminArgs {
    pub async fn run(self) -> Result<()> {
        let config = load_config()?;
        let store = github_store(&config)?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        let password = match self.password {
            Some(password) => password,
            None => {
                eprint!("password: ");
                lines
                    .next_line()
                    .await
                    .context("failed to read password")?
                    .unwrap_or_default()
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(print_status(rx));
        let mut session = Session::new(store, config).with_status(tx);

        let login = session
            .login(&self.username, password.trim(), AccessToken::new(self.token))
            .await
            .context("login refused")?
            .login
            .clone();
        println!("{} logged in as {}", "✓".green(), login.bold());
        print_view(&session);

        console(&mut session, &mut lines).await
    }
}

async fn console(
    session: &mut Session<GithubStore>,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    let mut warned_on_quit = false;
    loop {
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            if session.has_pending_changes() {
                warn_pending(session);
            }
            session.logout();
            return Ok(());
        };
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{} {message}", "✗".red());
                continue;
            }
        };

        if command == Command::Quit {
            if session.has_pending_changes() && !warned_on_quit {
                warn_pending(session);
                eprintln!("  run `quit` again to discard them");
                warned_on_quit = true;
                continue;
            }
            session.logout();
            println!("logged out");
            return Ok(());
        }
        warned_on_quit = false;

        if let Err(err) = execute(session, command).await {
            eprintln!("{} {err}", "✗".red());
            if !session.is_active() {
                eprintln!("session closed; log in again with a valid token");
                return Err(err).context("session ended");
            }
        }
    }
}

async fn execute(session: &mut Session<GithubStore>, command: Command) -> Result<()> {
    match command {
        Command::List => print_view(session),
        Command::Help => println!("{HELP}"),
        Command::Add {
            title,
            content,
            images,
        } => {
            let mut draft = Draft::new(title, content.replace("\\n", "\n"));
            for path in &images {
                draft = draft.with_local_image(read_image(path)?);
            }
            let id = session.context_mut()?.staging_mut().stage_add(draft)?;
            println!("staged {id}");
        }
        Command::Delete(id) => {
            match session.context_mut()?.staging_mut().stage_delete(&id)? {
                DeleteOutcome::DiscardedDraft => println!("discarded draft {id}"),
                DeleteOutcome::Marked => println!("{id} will be deleted on publish"),
            }
        }
        Command::Undelete(id) => {
            if session.context_mut()?.staging_mut().unstage_delete(&id) {
                println!("{id} restored");
            } else {
                println!("{id} was not marked for deletion");
            }
        }
        Command::Reorder(order) => {
            session.context_mut()?.staging_mut().stage_reorder(order)?;
            print_view(session);
        }
        Command::CancelReorder => {
            if session.context_mut()?.staging_mut().cancel_reorder() {
                println!("reorder cancelled");
            }
        }
        Command::Pending => {
            let summary = session.context_mut()?.staging().summary();
            println!(
                "{} new ({} images), {} deleted, reorder {}",
                summary.adds,
                summary.local_images,
                summary.deletes,
                if summary.reordered { "staged" } else { "none" }
            );
        }
        Command::Publish => {
            for line in publish(session).await? {
                println!("{line}");
            }
        }
        Command::Refresh => {
            session.refresh().await?;
            print_view(session);
        }
        Command::Discard => {
            session.context_mut()?.staging_mut().discard_all();
            println!("staged changes discarded");
        }
        Command::Quit => {}
    }
    Ok(())
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let ids = || rest.split_whitespace().map(PostId::from).collect::<Vec<_>>();

    let command = match word {
        "list" | "ls" => Command::List,
        "help" | "?" => Command::Help,
        "add" => {
            let mut parts = rest.split('|').map(str::trim);
            let title = parts.next().unwrap_or_default().to_string();
            let content = parts.next().unwrap_or_default().to_string();
            let images = parts.filter(|p| !p.is_empty()).map(PathBuf::from).collect();
            Command::Add {
                title,
                content,
                images,
            }
        }
        "delete" | "rm" => Command::Delete(single_id(rest, word)?),
        "undelete" => Command::Undelete(single_id(rest, word)?),
        "reorder" if !rest.is_empty() => Command::Reorder(ids()),
        "reorder" => return Err("usage: reorder <id> <id> ...".to_string()),
        "cancel-reorder" => Command::CancelReorder,
        "pending" => Command::Pending,
        "publish" => Command::Publish,
        "refresh" => Command::Refresh,
        "discard" => Command::Discard,
        "logout" | "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}' (try `help`)")),
    };
    Ok(Some(command))
}

fn single_id(rest: &str, word: &str) -> Result<PostId, String> {
    let mut ids = rest.split_whitespace();
    match (ids.next(), ids.next()) {
        (Some(id), None) => Ok(PostId::from(id)),
        _ => Err(format!("usage: {word} <id>")),
    }
}

fn read_image(path: &Path) -> Result<LocalImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read image '{}'", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg")
        .to_ascii_lowercase();
    Ok(LocalImage::new(bytes, extension))
}

/// Publish, then render the outcome followed by the rebased working view.
async fn publish<S: ContentStore>(session: &mut Session<S>) -> Result<Vec<String>> {
    let report = session.publish().await?;
    let mut lines = Vec::new();
    if report.attempts == 0 {
        lines.push("nothing to publish".to_string());
    } else if report.images_failed() > 0 {
        lines.push(format!(
            "{} {} of {} images failed to upload and were left out",
            "!".yellow(),
            report.images_failed(),
            report.images_attempted
        ));
    }
    lines.extend(view_lines(session));
    Ok(lines)
}

fn print_view<S: ContentStore>(session: &Session<S>) {
    for line in view_lines(session) {
        println!("{line}");
    }
}

fn view_lines<S: ContentStore>(session: &Session<S>) -> Vec<String> {
    let Some(ctx) = session.context() else {
        return Vec::new();
    };
    let view = ctx.staging().working_view();
    if view.is_empty() {
        return vec!["No posts.".to_string()];
    }
    let mut lines = Vec::with_capacity(view.len());
    for entry in view {
        let marker = match entry.state {
            EntryState::Published => " ".normal(),
            EntryState::Added => "+".green(),
            EntryState::MarkedForDeletion => "-".red(),
        };
        let title = match entry.state {
            EntryState::MarkedForDeletion => entry.post.title.strikethrough(),
            _ => entry.post.title.normal(),
        };
        lines.push(format!(
            "{marker} {}  {}  {title}",
            entry.post.date.dimmed(),
            entry.post.id
        ));
    }
    lines
}

fn warn_pending<S: ContentStore>(session: &Session<S>) {
    if let Some(ctx) = session.context() {
        let summary = ctx.staging().summary();
        eprintln!(
            "{} unpublished changes: {} new, {} deleted{}",
            "!".yellow(),
            summary.adds,
            summary.deletes,
            if summary.reordered { ", reorder" } else { "" }
        );
    }
}

async fn print_status(mut rx: mpsc::UnboundedReceiver<StatusEvent>) {
    while let Some(event) = rx.recv().await {
        let line = match event.kind {
            StatusKind::Success => event.message.green(),
            StatusKind::Error => event.message.red(),
            StatusKind::Loading | StatusKind::Saving | StatusKind::Uploading => {
                event.message.cyan()
            }
        };
        eprintln!("{line}");
    }
}
