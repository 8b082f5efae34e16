//! kipit - Competitive programming problem tracker
//!
//! Command-line front end over the problem store: every command loads the
//! store, applies one operation and prints plain text.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use kipit::config::Config;
use kipit::filter::{FilterQuery, SolvedFilter, ViewMode};
use kipit::models::{Judge, Problem, ProblemDraft, ProblemPatch, parse_tags};
use kipit::router::ExtractionRouter;
use kipit::solved::SolvedChecker;
use kipit::transport::FetchTransport;
use kipit::{ProblemStore, SqliteStorage};

#[derive(Parser)]
#[command(name = "kipit")]
#[command(about = "Track competitive programming problems across judges")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new config file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a problem
    Add {
        #[command(flatten)]
        fields: ProblemFields,
    },

    /// List problems matching the filters
    Show {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Edit fields of a problem
    Edit {
        id: u64,

        #[command(flatten)]
        fields: ProblemFields,
    },

    /// Toggle the solved flag
    Solve { id: u64 },

    /// Delete a problem
    Delete { id: u64 },

    /// Manage the todo queue
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },

    /// Manage lists
    List {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Set or show judge handles
    Profile {
        /// Judge name, e.g. codeforces
        judge: Option<Judge>,

        /// Handle; empty clears it
        handle: Option<String>,
    },

    /// Export everything to a JSON file
    Export {
        /// Output path (default: problem-tracker-<millis>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a previously exported JSON file
    Import { path: PathBuf },

    /// Scrape a judge page into a problem draft
    Extract {
        url: String,

        /// Add the extracted problem to the active list
        #[arg(long)]
        add: bool,
    },

    /// Show collection totals
    Stats,

    /// Ask the judge whether a problem is solved by your handle
    Check {
        id: u64,

        /// Mark the problem solved when the judge says so
        #[arg(long)]
        update: bool,
    },
}

#[derive(Subcommand)]
enum TodoAction {
    /// Queue a problem
    Add { id: u64 },
    /// Remove a problem from the queue
    Remove { id: u64 },
}

#[derive(Subcommand)]
enum ListAction {
    /// Create a list
    Create { name: String },
    /// Delete a list; its problems move to the default list
    Delete { name: String },
    /// Make a list the active one
    Use { name: String },
}

#[derive(Args, Default)]
struct ProblemFields {
    #[arg(short, long)]
    name: Option<String>,

    #[arg(short, long)]
    url: Option<String>,

    #[arg(short, long)]
    judge: Option<Judge>,

    #[arg(short, long)]
    rating: Option<String>,

    /// Comma-separated tags
    #[arg(short, long)]
    tags: Option<String>,

    #[arg(long)]
    notes: Option<String>,

    /// Target list (default: active list)
    #[arg(short, long)]
    list: Option<String>,

    /// Mark the problem as already solved
    #[arg(long)]
    solved: bool,
}

#[derive(Args)]
struct FilterArgs {
    /// List to show (default: active list)
    #[arg(short, long, conflicts_with = "todo")]
    list: Option<String>,

    /// Show the todo queue instead of a list
    #[arg(long)]
    todo: bool,

    /// Case-insensitive substring of the name
    #[arg(short, long, default_value = "")]
    search: String,

    /// Tag filter; repeat to match any of several
    #[arg(short, long = "tag")]
    tags: Vec<String>,

    #[arg(short, long, default_value = "")]
    rating: String,

    #[arg(short, long)]
    judge: Option<Judge>,

    #[arg(long, conflicts_with = "unsolved")]
    solved: bool,

    #[arg(long)]
    unsolved: bool,
}

impl FilterArgs {
    fn query(&self) -> FilterQuery {
        let solved = if self.solved {
            SolvedFilter::Solved
        } else if self.unsolved {
            SolvedFilter::Unsolved
        } else {
            SolvedFilter::Any
        };

        FilterQuery {
            search: self.search.clone(),
            tags: self.tags.iter().map(|t| t.trim().to_lowercase()).collect(),
            rating: self.rating.clone(),
            judge: self.judge,
            solved,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kipit=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if let Commands::Init { output } = &cli.command {
        let path = output.clone().unwrap_or(config_path);
        Config::default().save_to(&path)?;
        println!("Created config file: {}", path.display());
        return Ok(());
    }

    let mut cfg = if config_path.exists() {
        Config::load_from(&config_path)?
    } else {
        Config::default()
    };

    let storage = SqliteStorage::open(&cfg.storage.path).context("Failed to open database")?;
    let mut store = ProblemStore::load(storage)?;
    if store.active_list() != cfg.lists.active && !store.set_active_list(&cfg.lists.active) {
        tracing::warn!(list = %cfg.lists.active, "Configured list does not exist, using default");
    }

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Add { fields } => {
            let mut draft = ProblemDraft::for_list(store.active_list());
            fields.fill(&mut draft);
            match store.add_problem(draft)? {
                Some(id) => println!("Added problem {id}"),
                None => bail!("A problem needs both --name and --url"),
            }
        }

        Commands::Show { filter } => {
            let mode = if filter.todo {
                ViewMode::Todo
            } else {
                if let Some(list) = &filter.list
                    && store.active_list() != list.as_str()
                    && !store.set_active_list(list)
                {
                    bail!("No list named '{list}'");
                }
                ViewMode::ByList
            };

            let visible = store.visible(mode, &filter.query());
            if visible.is_empty() {
                println!("No problems found.");
            }
            for problem in visible {
                print_problem(problem, store.is_todo(problem.id));
            }
        }

        Commands::Edit { id, fields } => {
            let patch = fields.patch();
            if patch.is_empty() {
                bail!("Nothing to change");
            }
            if !store.update_problem(id, patch)? {
                bail!("Problem {id} not updated (unknown id, list, or empty name/url)");
            }
            println!("Updated problem {id}");
        }

        Commands::Solve { id } => {
            if !store.toggle_solved(id)? {
                bail!("No problem with id {id}");
            }
            if let Some(problem) = store.problem(id) {
                let state = if problem.solved { "solved" } else { "unsolved" };
                println!("Marked {} as {state}", problem.name);
            }
        }

        Commands::Delete { id } => {
            if !store.delete_problem(id)? {
                bail!("No problem with id {id}");
            }
            println!("Deleted problem {id}");
        }

        Commands::Todo { action } => match action {
            TodoAction::Add { id } => {
                if !store.add_to_todo(id)? {
                    bail!("Problem {id} does not exist or is already queued");
                }
                println!("Queued problem {id}");
            }
            TodoAction::Remove { id } => {
                if !store.remove_from_todo(id)? {
                    bail!("Problem {id} is not queued");
                }
                println!("Removed problem {id} from todo");
            }
        },

        Commands::List { action } => match action {
            ListAction::Create { name } => {
                if !store.create_list(&name)? {
                    bail!("List name is empty or already exists");
                }
                println!("Created list '{}'", name.trim());
            }
            ListAction::Delete { name } => {
                if !store.delete_list(&name)? {
                    bail!("Cannot delete list '{name}'");
                }
                if cfg.lists.active == name {
                    cfg.lists.active = store.active_list().to_string();
                    cfg.save_to(&config_path)?;
                }
                println!("Deleted list '{name}'");
            }
            ListAction::Use { name } => {
                if store.active_list() != name && !store.set_active_list(&name) {
                    bail!("No list named '{name}'");
                }
                cfg.lists.active = name;
                cfg.save_to(&config_path)?;
                println!("Active list: {}", cfg.lists.active);
            }
        },

        Commands::Profile { judge, handle } => match (judge, handle) {
            (Some(judge), Some(handle)) => {
                store.set_profile(judge, &handle)?;
                println!("Saved {judge} handle");
            }
            (Some(judge), None) => {
                println!("{}", store.profile(judge).unwrap_or("(not set)"));
            }
            (None, _) => {
                for (judge, handle) in store.profiles() {
                    println!("{judge}: {handle}");
                }
            }
        },

        Commands::Export { output } => {
            let path = output.unwrap_or_else(|| {
                cfg.export.directory.join(format!(
                    "problem-tracker-{}.json",
                    chrono::Utc::now().timestamp_millis()
                ))
            });
            std::fs::write(&path, store.export_json()?).context("Failed to write export file")?;
            println!("Exported to {}", path.display());
        }

        Commands::Import { path } => {
            let content = std::fs::read_to_string(&path).context("Failed to read import file")?;
            let keys = store.import_json(&content)?;
            let names: Vec<_> = keys.iter().map(|k| k.as_str()).collect();
            println!("Imported {}", names.join(", "));
        }

        Commands::Extract { url, add } => {
            let transport = FetchTransport::new(&cfg.extraction.user_agent)?;
            let router = ExtractionRouter::new(transport).with_timeout(cfg.extraction.timeout());
            let extraction = router.extract(&url).await;
            if extraction.is_fallback() {
                println!("Could not read the page; only the address is known.");
            }
            store.seed_draft(extraction);

            let draft = store.draft().clone();
            println!("Name:   {}", draft.name);
            println!("URL:    {}", draft.url);
            println!("Judge:  {}", draft.judge.map(|j| j.as_str()).unwrap_or("-"));
            println!("Rating: {}", draft.rating);
            println!("Tags:   {}", draft.tags.join(", "));

            if add {
                match store.submit_draft()? {
                    Some(id) => println!("Added problem {id} to {}", store.active_list()),
                    None => bail!("Extracted draft has no name; add it manually"),
                }
            }
        }

        Commands::Stats => {
            let stats = store.stats();
            println!("Total:  {}", stats.total);
            println!("Solved: {}", stats.solved);
            println!("Todo:   {}", stats.todo);
            for (list, count) in stats.per_list {
                println!("  {list}: {count}");
            }
        }

        Commands::Check { id, update } => {
            let Some(problem) = store.problem(id).cloned() else {
                bail!("No problem with id {id}");
            };
            let Some(judge) = problem.judge else {
                bail!("Problem {id} has no judge");
            };

            let client = reqwest::Client::builder()
                .user_agent(cfg.extraction.user_agent.as_str())
                .timeout(cfg.extraction.timeout())
                .build()?;
            let solved = SolvedChecker::new(client)
                .is_solved(judge, &problem.url, store.profile(judge))
                .await?;

            println!("{}: {}", problem.name, if solved { "solved" } else { "not solved" });
            if solved && update && !problem.solved {
                store.update_problem(id, ProblemPatch::solved(true))?;
                println!("Marked as solved");
            }
        }
    }

    Ok(())
}

impl ProblemFields {
    fn fill(self, draft: &mut ProblemDraft) {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(url) = self.url {
            draft.judge = kipit::router::judge_for_url(&url);
            draft.url = url;
        }
        if self.judge.is_some() {
            draft.judge = self.judge;
        }
        if let Some(rating) = self.rating {
            draft.rating = rating;
        }
        if let Some(tags) = self.tags {
            draft.tags = parse_tags(&tags);
        }
        if let Some(notes) = self.notes {
            draft.notes = notes;
        }
        if let Some(list) = self.list {
            draft.list = list;
        }
        draft.solved = self.solved;
    }

    fn patch(self) -> ProblemPatch {
        ProblemPatch {
            name: self.name,
            url: self.url,
            judge: self.judge.map(Some),
            rating: self.rating,
            tags: self.tags.as_deref().map(parse_tags),
            notes: self.notes,
            list: self.list,
            solved: self.solved.then_some(true),
        }
    }
}

fn print_problem(problem: &Problem, queued: bool) {
    let mark = if problem.solved { "x" } else { " " };
    let judge = problem.judge.map(|j| j.as_str()).unwrap_or("-");
    let todo = if queued { " (todo)" } else { "" };
    println!(
        "[{mark}] {:>14}  {}{todo}\n      {judge} {} {}  [{}]",
        problem.id,
        problem.name,
        problem.rating,
        problem.url,
        problem.tags.join(", ")
    );
}
