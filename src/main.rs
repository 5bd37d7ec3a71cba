use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use docgraph::config::{CONFIG_FILE, DocgraphConfig};
use docgraph::diff::{
    Alignment, DiffEntry, DiffOptions, DiffSummary, TextChunk, TextOp, diff_blocks,
    document_text_diff,
};
use docgraph::graph::{Commit, GraphSnapshot};
use docgraph::layout::{Layout, LayoutStrategy, layout};
use docgraph::merge::Side;
use docgraph::model::{Block, BlockId, BranchId, CommitId, DocumentId};
use docgraph::session::DocumentSession;
use docgraph::store::{GraphStore, JsonFileStore};

mod format;

use format::OutputFormat;

/// Version history for block-structured documents
///
/// Every document starts with a `main` branch. Commits are immutable
/// snapshots of the document's blocks; branches fork from any commit and are
/// joined back with `docgraph merge`.
///
/// Block content is read from a JSON file holding an array of
/// `{"id", "type", "data"}` objects (`--blocks FILE`, `-` for stdin), or
/// given inline as paragraphs with repeated `--text`.
///
/// QUICK START:
///
///   docgraph init --title "Notes" --text "first paragraph"
///   docgraph branch feature
///   docgraph commit --branch feature -t "More" --text "first paragraph" --text "second"
///   docgraph merge feature --take target
///   docgraph log
#[derive(Parser)]
#[command(name = "docgraph")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'docgraph <command> --help' for more information on a specific command.")]
struct Cli {
    /// Directory holding the document store (overrides `[store] path`)
    #[arg(long, global = true, env = "DOCGRAPH_STORE")]
    store: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, env = "DOCGRAPH_CONFIG", default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Document to operate on
    #[arg(short, long, global = true, default_value_t = DocumentId::new(1))]
    document: DocumentId,

    /// Output format: text or json
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a document with its `main` branch and first commit
    Init {
        /// Document title, also the title of the first commit
        #[arg(short, long)]
        title: String,
        #[command(flatten)]
        content: ContentArgs,
    },

    /// Show branches and commits
    Log {
        /// Only list commits recorded on this branch
        #[arg(long)]
        branch: Option<String>,
    },

    /// Record a commit after a branch's head
    Commit {
        /// Branch to commit on
        #[arg(long, default_value = "main")]
        branch: String,
        /// Commit title
        #[arg(short, long)]
        title: String,
        /// Optional longer description
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        content: ContentArgs,
    },

    /// Save or discard a branch's draft
    Draft {
        /// Branch owning the draft
        #[arg(long, default_value = "main")]
        branch: String,
        /// Drop the draft instead of saving one
        #[arg(long, conflicts_with_all = ["blocks", "text"])]
        discard: bool,
        #[command(flatten)]
        content: ContentArgs,
    },

    /// Fork a branch
    Branch {
        /// Name of the new branch
        name: String,
        /// Commit to fork at (default: head of `main`)
        #[arg(long)]
        from: Option<CommitId>,
    },

    /// Delete a branch with its commits and draft
    DeleteBranch {
        /// Branch to delete
        name: String,
    },

    /// Delete the head commit of a branch
    DeleteCommit {
        /// Commit to delete
        commit: CommitId,
    },

    /// Compare the blocks of two commits
    Diff {
        /// Old side
        from: CommitId,
        /// New side
        to: CommitId,
        /// Block alignment (overrides `[diff] alignment`)
        #[arg(long)]
        alignment: Option<AlignmentArg>,
        /// Diff the whole document text instead of block by block
        #[arg(long)]
        whole: bool,
    },

    /// Merge a branch's head into another branch
    Merge {
        /// Branch to merge from
        target: String,
        /// Branch to merge into
        #[arg(long, default_value = "main")]
        into: String,
        /// Take every block from one side
        #[arg(long)]
        take: Option<SideArg>,
        /// Take one block from one side, as BLOCK_ID=base|target (repeatable)
        #[arg(long, value_name = "BLOCK_ID=SIDE")]
        pick: Vec<String>,
        /// Merge commit title (default: "Merge <target> into <base>")
        #[arg(short, long)]
        title: Option<String>,
        /// Optional longer description
        #[arg(long)]
        description: Option<String>,
        /// Only list the conflicts
        #[arg(long)]
        dry_run: bool,
        /// Block alignment (overrides `[diff] alignment`)
        #[arg(long)]
        alignment: Option<AlignmentArg>,
    },

    /// Compute node coordinates for drawing the history graph
    Layout {
        /// Vertical placement (overrides `[layout] strategy`)
        #[arg(long)]
        strategy: Option<StrategyArg>,
    },
}

/// Block content of a commit or draft.
#[derive(Args)]
struct ContentArgs {
    /// JSON file with an array of blocks (`-` reads stdin)
    #[arg(long, value_name = "FILE", conflicts_with = "text")]
    blocks: Option<PathBuf>,
    /// Paragraph text, one block per occurrence
    #[arg(long)]
    text: Vec<String>,
}

impl ContentArgs {
    fn read(&self) -> Result<Vec<Block>> {
        if let Some(path) = &self.blocks {
            let json = if path == Path::new("-") {
                std::io::read_to_string(std::io::stdin()).context("reading blocks from stdin")?
            } else {
                std::fs::read_to_string(path)
                    .with_context(|| format!("reading blocks from {}", path.display()))?
            };
            return serde_json::from_str(&json)
                .with_context(|| format!("{} is not a JSON array of blocks", path.display()));
        }
        Ok(self
            .text
            .iter()
            .enumerate()
            .map(|(i, t)| Block::paragraph(format!("p{}", i + 1), t))
            .collect())
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Base,
    Target,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Base => Self::Base,
            SideArg::Target => Self::Target,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AlignmentArg {
    Positional,
    IdAware,
}

impl From<AlignmentArg> for Alignment {
    fn from(a: AlignmentArg) -> Self {
        match a {
            AlignmentArg::Positional => Self::Positional,
            AlignmentArg::IdAware => Self::IdAware,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Depth,
    Time,
}

impl From<StrategyArg> for LayoutStrategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::Depth => Self::Depth,
            StrategyArg::Time => Self::Time,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    docgraph::telemetry::init();
    let cli = Cli::parse();
    let config = DocgraphConfig::load(&cli.config)?;
    let root = cli.store.clone().unwrap_or_else(|| config.store.path.clone());
    let store = JsonFileStore::new(root);
    run(cli, &config, store).await
}

async fn run(cli: Cli, config: &DocgraphConfig, store: JsonFileStore) -> Result<()> {
    let doc = cli.document;
    let out = cli.format;
    let diff_options = config.diff.options();

    match cli.command {
        Commands::Init { title, content } => {
            let snapshot = store.create_document(doc, &title, content.read()?).await?;
            out.emit(&snapshot, |g| {
                format!(
                    "Created document {} with commit {} on main",
                    g.document.id,
                    g.commits.first().map_or_else(String::new, |c| c.id.to_string())
                )
            })
        }
        Commands::Log { branch } => {
            let snapshot = store.fetch(doc).await?;
            snapshot.validate()?;
            let filter = branch.as_deref().map(|n| branch_id(&snapshot, n)).transpose()?;
            let view = LogView::build(&snapshot, filter)?;
            out.emit(&view, LogView::render)
        }
        Commands::Commit {
            branch,
            title,
            description,
            content,
        } => {
            let blocks = content.read()?;
            let mut session = DocumentSession::open(store, doc, diff_options).await?;
            let id = branch_id(session.snapshot(), &branch)?;
            session.checkout(id).await?;
            let commit = session
                .commit(&title, description.as_deref(), blocks)
                .await?;
            out.emit(&commit, |c| format!("Committed {} on {branch}: {}", c.id, c.title))
        }
        Commands::Draft {
            branch,
            discard,
            content,
        } => {
            let mut session = DocumentSession::open(store, doc, diff_options).await?;
            let id = branch_id(session.snapshot(), &branch)?;
            session.checkout(id).await?;
            if discard {
                let dropped = session.discard_draft().await?;
                out.emit(&dropped, |d| match d {
                    Some(_) => format!("Discarded the draft of {branch}"),
                    None => format!("{branch} has no draft"),
                })
            } else {
                let draft = session.save_draft(content.read()?).await?;
                out.emit(&draft, |d| {
                    format!("Saved draft of {branch} ({} blocks)", d.blocks.len())
                })
            }
        }
        Commands::Branch { name, from } => {
            let mut session = DocumentSession::open(store, doc, diff_options).await?;
            let from = match from {
                Some(c) => c,
                None => session.snapshot().main_branch()?.leaf_commit_id,
            };
            let branch = session.create_branch(from, &name).await?;
            out.emit(&branch, |b| format!("Created branch {} at commit {from}", b.name))
        }
        Commands::DeleteBranch { name } => {
            let mut session = DocumentSession::open(store, doc, diff_options).await?;
            let id = branch_id(session.snapshot(), &name)?;
            session.delete_branch(id).await?;
            out.emit(&id, |_| format!("Deleted branch {name}"))
        }
        Commands::DeleteCommit { commit } => {
            let mut session = DocumentSession::open(store, doc, diff_options).await?;
            session.delete_commit(commit).await?;
            out.emit(&commit, |c| format!("Deleted commit {c}"))
        }
        Commands::Diff {
            from,
            to,
            alignment,
            whole,
        } => {
            let snapshot = store.fetch(doc).await?;
            let old = snapshot.require_commit(from)?;
            let new = snapshot.require_commit(to)?;
            if whole {
                let chunks = document_text_diff(&old.blocks, &new.blocks);
                return out.emit(&chunks, |c| render_chunks(c.as_slice()));
            }
            let options = alignment.map_or(diff_options, |a| DiffOptions {
                alignment: a.into(),
            });
            let entries = diff_blocks(&old.blocks, &new.blocks, &options);
            let view = DiffView {
                summary: DiffSummary::of(&entries),
                entries,
            };
            out.emit(&view, DiffView::render)
        }
        Commands::Merge {
            target,
            into,
            take,
            pick,
            title,
            description,
            dry_run,
            alignment,
        } => {
            let options = alignment.map_or(diff_options, |a| DiffOptions {
                alignment: a.into(),
            });
            let picks = pick
                .iter()
                .map(|p| parse_pick(p))
                .collect::<Result<Vec<_>>>()?;
            let mut session = DocumentSession::open(store, doc, options).await?;
            let base = branch_id(session.snapshot(), &into)?;
            let target_id = branch_id(session.snapshot(), &target)?;
            session.checkout(base).await?;
            let merge = session.start_merge(target_id).await?;

            if dry_run {
                let view = DiffView {
                    summary: merge.summary(),
                    entries: merge.conflicts().cloned().collect(),
                };
                return out.emit(&view, DiffView::render);
            }
            if let Some(side) = take {
                merge.apply_all_from_side(side.into())?;
            }
            for (block, side) in &picks {
                merge.apply_block_from_side(block, *side)?;
            }
            merge.resolve()?;
            let commit: Commit = session
                .commit_merge(title.as_deref(), description.as_deref())
                .await?;
            out.emit(&commit, |c| format!("Merged {target} into {into} as commit {}", c.id))
        }
        Commands::Layout { strategy } => {
            let snapshot = store.fetch(doc).await?;
            let mut layout_config = config.layout.clone();
            if let Some(s) = strategy {
                layout_config.strategy = s.into();
            }
            let placed = layout(&snapshot, &layout_config)?;
            out.emit(&placed, render_layout)
        }
    }
}

fn branch_id(snapshot: &GraphSnapshot, name: &str) -> Result<BranchId> {
    match snapshot.branch_by_name(name) {
        Some(b) => Ok(b.id),
        None => bail!(
            "branch '{name}' not found\n  To fix: list branches with `docgraph log`."
        ),
    }
}

fn parse_pick(pick: &str) -> Result<(BlockId, Side)> {
    let Some((id, side)) = pick.rsplit_once('=') else {
        bail!("invalid --pick '{pick}': expected BLOCK_ID=base|target");
    };
    let side = match side.trim() {
        "base" => Side::Base,
        "target" => Side::Target,
        other => bail!("invalid side '{other}' in --pick '{pick}': expected base or target"),
    };
    Ok((BlockId::new(id.trim()), side))
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct LogView {
    branches: Vec<BranchView>,
    commits: Vec<CommitView>,
}

#[derive(Serialize)]
struct BranchView {
    id: BranchId,
    name: String,
    head: CommitId,
    from: Option<CommitId>,
    commits: usize,
    merged: bool,
    draft: bool,
    color: &'static str,
}

#[derive(Serialize)]
struct CommitView {
    id: CommitId,
    branch: String,
    title: String,
    depth: usize,
    parents: Vec<CommitId>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl LogView {
    fn build(g: &GraphSnapshot, only: Option<BranchId>) -> Result<Self> {
        let depths = g.depths()?;
        let mut branches = Vec::new();
        for b in &g.branches {
            branches.push(BranchView {
                id: b.id,
                name: b.name.to_string(),
                head: b.leaf_commit_id,
                from: b.from_commit_id,
                commits: g.commit_count(b.id),
                merged: g.is_merged(b.id)?,
                draft: b.draft_id.is_some(),
                color: docgraph::layout::branch_color(b.name.as_str()),
            });
        }
        let mut commits: Vec<CommitView> = g
            .commits
            .iter()
            .filter(|c| only.is_none_or(|b| b == c.branch_id))
            .map(|c| CommitView {
                id: c.id,
                branch: g
                    .branch(c.branch_id)
                    .map_or_else(String::new, |b| b.name.to_string()),
                title: c.title.clone(),
                depth: depths.get(&c.id).copied().unwrap_or(0),
                parents: g.predecessors(c.id),
                created_at: c.created_at,
            })
            .collect();
        commits.sort_by(|a, b| b.depth.cmp(&a.depth).then(b.id.cmp(&a.id)));
        Ok(Self { branches, commits })
    }

    fn render(&self) -> String {
        let mut lines = Vec::new();
        for b in &self.branches {
            let mut line = format!("{} (head {}, {} commits)", b.name, b.head, b.commits);
            if b.merged {
                line.push_str(" merged");
            }
            if b.draft {
                line.push_str(" +draft");
            }
            lines.push(line);
        }
        lines.push(String::new());
        for c in &self.commits {
            let parents: Vec<String> = c.parents.iter().map(ToString::to_string).collect();
            lines.push(format!(
                "{:>4}  {:<16} {}  <- [{}]",
                c.id,
                c.branch,
                c.title,
                parents.join(", ")
            ));
        }
        lines.join("\n")
    }
}

#[derive(Serialize)]
struct DiffView {
    summary: DiffSummary,
    entries: Vec<DiffEntry>,
}

impl DiffView {
    fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| match e {
                DiffEntry::Added { index, block } => format!("+ [{index}] {}", block.text()),
                DiffEntry::Deleted { index, block } => format!("- [{index}] {}", block.text()),
                DiffEntry::Modified {
                    index, text_diff, ..
                } => format!("~ [{index}] {}", render_chunks(text_diff)),
                DiffEntry::Unchanged { index, block } => format!("  [{index}] {}", block.text()),
            })
            .collect();
        let s = &self.summary;
        lines.push(format!(
            "{} added, {} deleted, {} modified, {} unchanged",
            s.added, s.deleted, s.modified, s.unchanged
        ));
        lines.join("\n")
    }
}

fn render_chunks(chunks: &[TextChunk]) -> String {
    chunks
        .iter()
        .map(|c| match c.op {
            TextOp::Equal => c.text.clone(),
            TextOp::Delete => format!("[-{}-]", c.text),
            TextOp::Insert => format!("{{+{}+}}", c.text),
        })
        .collect()
}

fn render_layout(placed: &Layout) -> String {
    let mut lines: Vec<String> = placed
        .lanes
        .iter()
        .map(|l| format!("lane {:<16} x={} {}", l.name.as_str(), l.x, l.color))
        .collect();
    lines.extend(
        placed
            .nodes
            .iter()
            .map(|(id, p)| format!("{:<12} x={} y={}", id.to_string(), p.x, p.y)),
    );
    lines.join("\n")
}
