//! `postbox posts [--search <text>] [--oldest] [--json]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use postbox_core::query::{strip_markdown, visible_posts, SortOrder};
use postbox_core::Post;
use postbox_store::RemoteDocuments;
use postbox_sync::{PublishEngine, Refresh};

use super::{github_store, load_config};

const PREVIEW_CHARS: usize = 48;

#[derive(Args, Debug)]
pub struct PostsArgs {
    /// Only show posts whose title, text or date contains this.
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Oldest first instead of newest first.
    #[arg(long)]
    pub oldest: bool,

    /// Emit the posts as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PostRow {
    #[tabled(rename = "date")]
    date: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "preview")]
    preview: String,
    #[tabled(rename = "images")]
    images: usize,
}

impl PostsArgs {
    pub async fn run(self) -> Result<()> {
        let config = load_config()?;
        let store = github_store(&config)?;
        let mut engine = PublishEngine::new(
            RemoteDocuments::new(store, config.repo.clone()),
            config.retry.clone(),
        );

        if let Refresh::Cached { reason } = engine.refresh().await {
            eprintln!(
                "{} could not load posts ({reason}); showing cached copy",
                "!".yellow()
            );
        }

        let order = if self.oldest {
            SortOrder::Oldest
        } else {
            SortOrder::Newest
        };
        let posts = visible_posts(&engine.snapshot().posts, self.search.as_deref(), order);

        if self.json {
            let json = serde_json::to_string_pretty(&posts).context("failed to encode posts")?;
            println!("{json}");
            return Ok(());
        }

        if posts.is_empty() {
            println!("No posts.");
            return Ok(());
        }
        print_table(&posts);
        Ok(())
    }
}

pub(crate) fn print_table(posts: &[Post]) {
    let rows: Vec<PostRow> = posts.iter().map(row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn row(post: &Post) -> PostRow {
    PostRow {
        date: post.date.clone(),
        id: post.id.to_string(),
        title: post.title.clone(),
        preview: preview(&post.content),
        images: post.images.len(),
    }
}

fn preview(content: &str) -> String {
    let plain = strip_markdown(content).replace('\n', " ");
    let mut out: String = plain.chars().take(PREVIEW_CHARS).collect();
    if plain.chars().count() > PREVIEW_CHARS {
        out.push('…');
    }
    out
}
