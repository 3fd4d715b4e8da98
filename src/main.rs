//! Blockcal CLI - a time-blocked task calendar.

use blockcal::{MergeOverrides, NewTask, Server, ServerConfig, Store, Task, TaskPatch};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::{Cli, Command};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("blockcal")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("blockcal.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn get_store_dir(cli: &Cli) -> PathBuf {
    cli.dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn print_task_line(task: &Task) {
    let location = if task.location.is_empty() {
        String::new()
    } else {
        format!(" @ {}", task.location)
    };
    println!(
        "{} {} {} {}{}",
        format!("#{}", task.id).cyan(),
        task.date,
        task.start_time.yellow(),
        format!("{}m", task.duration).dimmed(),
        format!(" {}{}", task.title, location.dimmed())
    );
}

fn run(cli: Cli) -> Result<()> {
    let store_dir = get_store_dir(&cli);

    match cli.command {
        Command::Init => {
            Store::init(&store_dir).context("Failed to initialize blockcal store")?;
            println!("{} Initialized blockcal store in {}", "✓".green(), store_dir.display());
        }

        Command::Create {
            date,
            start_time,
            title,
            duration,
            location,
            description,
        } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let task = store
                .create(
                    NewTask::new(date, start_time, title)
                        .with_duration(duration)
                        .with_location(location)
                        .with_description(description),
                )
                .context("Failed to create task")?;

            println!("{} Created: {} {}", "✓".green(), format!("#{}", task.id).cyan(), task.title);
        }

        Command::List { start, end } => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let tasks = match (start, end) {
                (Some(start), Some(end)) => store.range(&start, &end),
                _ => store.list(),
            }
            .context("Failed to list tasks")?;

            if tasks.is_empty() {
                println!("{}", "No tasks found".dimmed());
            } else {
                for task in &tasks {
                    print_task_line(task);
                }
            }
        }

        Command::Get { id } => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let task = store.get(id).context("Failed to get task")?;

            match task {
                Some(task) => {
                    println!("{}: {}", "ID".bold(), format!("#{}", task.id).cyan());
                    println!("{}: {}", "Title".bold(), task.title);
                    println!("{}: {}", "Date".bold(), task.date);
                    println!("{}: {}", "Start".bold(), task.start_time);
                    println!("{}: {} min", "Duration".bold(), task.duration);
                    if !task.location.is_empty() {
                        println!("{}: {}", "Location".bold(), task.location);
                    }
                    if !task.description.is_empty() {
                        println!("{}: {}", "Description".bold(), task.description);
                    }
                    println!("{}: {}", "Created".bold(), task.created_at);
                    println!("{}: {}", "Updated".bold(), task.updated_at);
                }
                None => {
                    eprintln!("{} Task not found: {}", "✗".red(), id);
                    std::process::exit(1);
                }
            }
        }

        Command::Update {
            id,
            date,
            start_time,
            duration,
            title,
            location,
            description,
        } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let patch = TaskPatch {
                date,
                start_time,
                duration,
                title,
                location,
                description,
            };
            let task = store.update(id, patch).context("Failed to update task")?;

            println!("{} Updated: {} {}", "✓".green(), format!("#{}", task.id).cyan(), task.title);
        }

        Command::Delete { id } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            store.delete(id).context("Failed to delete task")?;

            println!("{} Deleted: {}", "✓".green(), format!("#{}", id).cyan());
        }

        Command::Merge {
            ids,
            title,
            location,
            description,
        } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let overrides = MergeOverrides {
                title,
                location,
                description,
            };
            let task = store.merge(&ids, &overrides).context("Failed to merge tasks")?;

            println!("{} Merged {} task(s) into:", "✓".green(), ids.len());
            print_task_line(&task);
        }

        Command::Split { id, count } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let result = store.split(id, count).context("Failed to split task")?;

            println!("{} Split into {} part(s):", "✓".green(), result.new_tasks.len() + 1);
            print_task_line(&result.original);
            for task in &result.new_tasks {
                print_task_line(task);
            }
        }

        Command::Serve { host, port } => {
            println!("{} Serving {} on {}:{}", "→".blue(), store_dir.display(), host, port);

            let config = ServerConfig {
                host,
                port,
                ..ServerConfig::new(&store_dir)
            };
            let server = Server::new(config).context("Failed to create server")?;

            let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
            rt.block_on(server.run()).context("Server error")?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
