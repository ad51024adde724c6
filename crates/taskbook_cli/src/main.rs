//! Command-line front end for taskbook.
//!
//! # Responsibility
//! - Map subcommands onto `TaskService` operations.
//! - Resolve config, data directory and logging before touching storage.

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use taskbook_core::{
    init_logging, CalendarMonth, CoreConfig, DueDate, SqliteKvStore, Task, TaskPatch,
    TaskService, ViewState, SNAPSHOT_FILE_NAME,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "taskbook", version, about = "Personal task lists with tags and due dates")]
struct Cli {
    /// TOML config file; defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `data_dir` from the config.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Overrides `log_level` from the config.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show tasks, optionally filtered.
    Tasks {
        #[arg(long)]
        list: Option<String>,
        #[arg(long, default_value = "")]
        query: String,
        /// Only tasks due on this day (YYYY-MM-DD).
        #[arg(long)]
        date: Option<DueDate>,
    },
    /// Create a task.
    Add {
        title: String,
        #[arg(long)]
        list: Option<String>,
        #[arg(long)]
        due: Option<DueDate>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Subtask titles, in order.
        #[arg(long = "step")]
        steps: Vec<String>,
    },
    /// Toggle a task's completion.
    Done { id: String },
    /// Delete a task.
    Rm { id: String },
    /// Show lists with open task counts.
    Lists,
    AddList { name: String },
    /// Delete a list; its tasks move to the first remaining list.
    RmList { name: String },
    Tags,
    AddTag { name: String },
    RmTag { name: String },
    /// Show days with tasks due in a month.
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Write a snapshot document.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace all data with a snapshot document.
    Import { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = resolve_config(&cli)?;
    std::fs::create_dir_all(&config.data_dir)?;
    init_logging(&config.log_level, config.log_dir())?;
    info!(
        "event=cli_start module=cli status=ok data_dir={}",
        config.data_dir.display()
    );

    let kv = SqliteKvStore::open(config.db_path())?;
    let service = TaskService::open(kv, &config);
    execute(&service, &config, cli.command)
}

fn resolve_config(cli: &Cli) -> CliResult<CoreConfig> {
    let default_dir = dirs::data_dir()
        .map(|dir| dir.join("taskbook"))
        .unwrap_or_else(|| PathBuf::from(".taskbook"));
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_dir.join("config.toml"));

    let mut config = CoreConfig::load(&config_path)?;
    if cli.config.is_none() && config.data_dir == CoreConfig::default().data_dir {
        config.data_dir = default_dir;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn execute(
    service: &TaskService<SqliteKvStore>,
    config: &CoreConfig,
    command: Command,
) -> CliResult<()> {
    match command {
        Command::Tasks { list, query, date } => {
            let mut view = ViewState::new().with_query(query);
            if let Some(list) = list {
                view = view.with_active_list(list);
            }
            if let Some(date) = date {
                view = view.with_selected_date(date);
            }
            let visible = service.visible_tasks(&view);
            if visible.is_empty() {
                println!("no tasks");
            }
            for task in &visible {
                println!("{}", render_task(task));
            }
        }
        Command::Add {
            title,
            list,
            due,
            description,
            tags,
            steps,
        } => {
            let list = list.unwrap_or_else(|| config.default_list.clone());
            let draft = service.create_draft_task(&list)?;
            let mut patch = TaskPatch::new().title(title);
            if let Some(due) = due {
                patch = patch.due(due);
            }
            if let Some(description) = description {
                patch = patch.description(description);
            }
            if let Err(err) = service.update_task(&draft.id, patch) {
                service.discard_draft(&draft.id)?;
                return Err(err.into());
            }
            for tag in &tags {
                service.attach_tag(&draft.id, tag)?;
            }
            for step in &steps {
                service.add_subtask(&draft.id, step)?;
            }
            service.confirm_draft(&draft.id)?;
            println!("{}", draft.id);
        }
        Command::Done { id } => report(service.toggle_done(&id)?, &id),
        Command::Rm { id } => report(service.delete_task(&id)?, &id),
        Command::Lists => {
            for (list, open) in service.open_counts() {
                println!("{list}\t{open}");
            }
        }
        Command::AddList { name } => match service.add_list(&name)? {
            Some(added) => println!("added list {added}"),
            None => println!("list unchanged"),
        },
        Command::RmList { name } => match service.delete_list(&name)? {
            Some(removal) => println!(
                "deleted list {name}; {} task(s) moved to {}",
                removal.reassigned, removal.fallback
            ),
            None => println!("no list named {name}"),
        },
        Command::Tags => {
            for tag in service.tags() {
                println!("{tag}");
            }
        }
        Command::AddTag { name } => match service.add_tag(&name)? {
            Some(added) => println!("added tag {added}"),
            None => println!("tag unchanged"),
        },
        Command::RmTag { name } => report(service.remove_tag(&name)?, &name),
        Command::Calendar { year, month } => {
            let current = CalendarMonth::current();
            let month = CalendarMonth::new(
                year.unwrap_or(current.year()),
                month.unwrap_or(current.month()),
            )
            .ok_or("month must be between 1 and 12")?;
            println!("{}-{:02}", month.year(), month.month());
            for date in service.dates_with_tasks(month) {
                println!("{date}");
            }
        }
        Command::Export { out } => {
            let path = out.unwrap_or_else(|| PathBuf::from(SNAPSHOT_FILE_NAME));
            std::fs::write(&path, service.export_snapshot()?)?;
            println!("exported to {}", path.display());
        }
        Command::Import { path } => {
            let document = std::fs::read_to_string(&path)?;
            service.import_snapshot(&document)?;
            println!("imported {}", path.display());
        }
    }
    Ok(())
}

fn report(changed: bool, target: &str) {
    if changed {
        println!("ok {target}");
    } else {
        println!("nothing to do for {target}");
    }
}

fn render_task(task: &Task) -> String {
    let mark = if task.done { "[x]" } else { "[ ]" };
    let mut line = format!("{mark} {}  {}  ({})", task.id, task.title, task.list);
    if let Some(due) = task.due {
        line.push_str(&format!("  due {due}"));
    }
    if !task.tags.is_empty() {
        line.push_str(&format!("  #{}", task.tags.join(" #")));
    }
    if !task.subtasks.is_empty() {
        line.push_str(&format!(
            "  {}/{}",
            task.completed_subtasks(),
            task.subtasks.len()
        ));
    }
    if task.draft {
        line.push_str("  (draft)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{render_task, Cli, Command};
    use clap::Parser;
    use taskbook_core::{DueDate, Task};

    #[test]
    fn add_parses_repeated_tags_and_due() {
        let cli = Cli::try_parse_from([
            "taskbook", "add", "Buy milk", "--due", "2024-03-10", "--tag", "a", "--tag", "b",
        ])
        .unwrap();
        match cli.command {
            Command::Add { title, due, tags, .. } => {
                assert_eq!(title, "Buy milk");
                assert_eq!(due, DueDate::from_ymd(2024, 3, 10));
                assert_eq!(tags, vec!["a", "b"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn invalid_due_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["taskbook", "add", "x", "--due", "10/03/2024"]).is_err());
    }

    #[test]
    fn render_shows_progress_and_due() {
        let mut task = Task::new("t1", "Buy milk", "Personal");
        task.due = DueDate::from_ymd(2024, 3, 10);
        task.subtasks.push(taskbook_core::Subtask::new("s", "fridge"));
        let line = render_task(&task);
        assert!(line.contains("due 2024-03-10"));
        assert!(line.contains("0/1"));
        assert!(line.starts_with("[ ]"));
    }
}
