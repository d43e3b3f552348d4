use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime, Utc};

use taskforge::backup::BackupDocument;
use taskforge::cache::{CacheController, FsCache, HttpFetcher};
use taskforge::cache::{CacheBackend, Fetch, FetchRequest};
use taskforge::config::AppConfig;
use taskforge::core::task::{Category, Priority, Task, TaskDraft, TaskPatch};
use taskforge::quotes;
use taskforge::reminder::{LogNotifier, ReminderScheduler};
use taskforge::repo::TaskRepository;
use taskforge::stats;
use taskforge::store::Store;
use taskforge::view::{self, Filter, SortKey, ViewQuery};

const USAGE: &str = "\
taskforge — offline-first personal task manager

USAGE:
  taskforge add <title> [--desc <text>] [--date <YYYY-MM-DD>] [--time <HH:MM>]
                        [--priority high|medium|low] [--category <name>] [--reminder]
  taskforge list [--filter all|today|upcoming|completed] [--sort date|priority|category|title]
                 [--search <query>]
  taskforge done <id>            toggle completion
  taskforge edit <id> [--title <text>] [--desc <text>] [--date <YYYY-MM-DD>|none]
                      [--time <HH:MM>|none] [--priority <p>] [--category <c>]
                      [--reminder on|off]
  taskforge rm <id>              delete a task
  taskforge clear-completed      delete every completed task
  taskforge stats                streak, weekly chart, category breakdown
  taskforge backup [<path>]      export tasks, history and settings
  taskforge restore <path>       import a backup file
  taskforge remind               watch pending reminders until they fire
  taskforge cache update --origin <url>   install and activate the asset cache
  taskforge cache status                  list cache buckets
  taskforge cache fetch <url> [--navigate]

OPTIONS:
  --dir <path>    data directory (default: ~/.local/share/taskforge)
  --debug         verbose logging
";

#[tokio::main]
async fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let debug = take_flag(&mut args, "--debug");
    taskforge::set_debug_logging(debug);

    // Log to the systemd user journal (`journalctl --user -t taskforge -f`);
    // stdout stays reserved for command output.
    if let Ok(journal) = systemd_journal_logger::JournalLog::new() {
        let _ = journal
            .with_syslog_identifier("taskforge".to_string())
            .install();
    }
    log::set_max_level(if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    let config = match take_value(&mut args, "--dir") {
        Some(dir) => AppConfig::with_data_dir(dir),
        None => AppConfig::default(),
    };
    if let Err(e) = config.ensure_dirs() {
        eprintln!("error: could not create {}: {}", config.data_dir.display(), e);
        std::process::exit(1);
    }

    if let Err(e) = run(config, args).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig, mut args: Vec<String>) -> Result<(), String> {
    let store = Store::new(config.clone());
    let Some(command) = args.first().cloned() else {
        print!("{}", USAGE);
        return Ok(());
    };
    args.remove(0);

    match command.as_str() {
        "add" => cmd_add(store, args),
        "list" => cmd_list(store, args),
        "done" => cmd_done(store, args),
        "edit" => cmd_edit(store, args),
        "rm" => cmd_rm(store, args),
        "clear-completed" => cmd_clear_completed(store),
        "stats" => cmd_stats(store),
        "backup" => cmd_backup(store, args),
        "restore" => cmd_restore(store, args),
        "remind" => cmd_remind(store).await,
        "cache" => cmd_cache(config, args).await,
        "help" | "--help" | "-h" => {
            print!("{}", USAGE);
            Ok(())
        }
        other => Err(format!("unknown command `{}` (try `taskforge help`)", other)),
    }
}

// ---- Task commands ----

fn cmd_add(store: Store, mut args: Vec<String>) -> Result<(), String> {
    let mut draft = TaskDraft::default();
    draft.description = take_value(&mut args, "--desc").unwrap_or_default();
    draft.date = match take_value(&mut args, "--date") {
        Some(raw) => Some(parse_date(&raw)?),
        None => None,
    };
    draft.time = match take_value(&mut args, "--time") {
        Some(raw) => Some(parse_time(&raw)?),
        None => None,
    };
    draft.priority = match take_value(&mut args, "--priority") {
        Some(raw) => Some(Priority::from_str(&raw).ok_or(format!("unknown priority `{}`", raw))?),
        None => None,
    };
    draft.category = match take_value(&mut args, "--category") {
        Some(raw) => Some(Category::from_str(&raw).ok_or(format!("unknown category `{}`", raw))?),
        None => None,
    };
    draft.reminder = take_flag(&mut args, "--reminder");
    draft.title = args.join(" ");

    let mut repo = TaskRepository::open(store);
    let task = repo.add(draft).map_err(|e| e.to_string())?;
    println!("Added {} {}", short_id(&task.id), task.title);
    Ok(())
}

fn cmd_list(store: Store, mut args: Vec<String>) -> Result<(), String> {
    let mut query = ViewQuery::default();
    if let Some(raw) = take_value(&mut args, "--filter") {
        query.filter = Filter::from_str(&raw).ok_or(format!("unknown filter `{}`", raw))?;
    }
    if let Some(raw) = take_value(&mut args, "--sort") {
        query.sort = SortKey::from_str(&raw).ok_or(format!("unknown sort key `{}`", raw))?;
    }
    query.search = take_value(&mut args, "--search").unwrap_or_default();

    let repo = TaskRepository::open(store);
    let today = Local::now().date_naive();
    let shown = view::derive_view(repo.tasks(), &query, today);

    if shown.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for task in &shown {
        print_task(task);
    }
    println!(
        "\n{} task(s) · today {}% done",
        shown.len(),
        view::derive_today_progress(repo.tasks(), today)
    );
    Ok(())
}

fn cmd_done(store: Store, args: Vec<String>) -> Result<(), String> {
    let mut repo = TaskRepository::open(store);
    let id = resolve_id(&repo, args.first().ok_or("usage: taskforge done <id>")?)?;
    let today = Local::now().date_naive();
    match repo.toggle_complete(&id, today).map_err(|e| e.to_string())? {
        Some(true) => println!("Completed {}", short_id(&id)),
        Some(false) => println!("Reopened {}", short_id(&id)),
        None => {}
    }
    Ok(())
}

fn cmd_edit(store: Store, mut args: Vec<String>) -> Result<(), String> {
    let mut patch = TaskPatch::default();
    patch.title = take_value(&mut args, "--title");
    patch.description = take_value(&mut args, "--desc");
    patch.date = match take_value(&mut args, "--date") {
        Some(raw) if raw == "none" => Some(None),
        Some(raw) => Some(Some(parse_date(&raw)?)),
        None => None,
    };
    patch.time = match take_value(&mut args, "--time") {
        Some(raw) if raw == "none" => Some(None),
        Some(raw) => Some(Some(parse_time(&raw)?)),
        None => None,
    };
    patch.priority = match take_value(&mut args, "--priority") {
        Some(raw) => Some(Priority::from_str(&raw).ok_or(format!("unknown priority `{}`", raw))?),
        None => None,
    };
    patch.category = match take_value(&mut args, "--category") {
        Some(raw) => Some(Category::from_str(&raw).ok_or(format!("unknown category `{}`", raw))?),
        None => None,
    };
    patch.reminder = match take_value(&mut args, "--reminder") {
        Some(raw) => Some(match raw.as_str() {
            "on" | "true" => true,
            "off" | "false" => false,
            other => return Err(format!("--reminder takes on|off, got `{}`", other)),
        }),
        None => None,
    };

    let mut repo = TaskRepository::open(store);
    let id = resolve_id(&repo, args.first().ok_or("usage: taskforge edit <id> [fields]")?)?;
    if patch.is_empty() {
        return Err("nothing to change".to_string());
    }
    repo.update(&id, patch).map_err(|e| e.to_string())?;
    println!("Updated {}", short_id(&id));
    Ok(())
}

fn cmd_rm(store: Store, args: Vec<String>) -> Result<(), String> {
    let mut repo = TaskRepository::open(store);
    let id = resolve_id(&repo, args.first().ok_or("usage: taskforge rm <id>")?)?;
    if repo.delete(&id).map_err(|e| e.to_string())? {
        println!("Deleted {}", short_id(&id));
    }
    Ok(())
}

fn cmd_clear_completed(store: Store) -> Result<(), String> {
    let mut repo = TaskRepository::open(store);
    let count = repo.clear_completed().map_err(|e| e.to_string())?;
    if count == 0 {
        println!("No completed tasks to clear.");
    } else {
        println!("{} task(s) cleared.", count);
    }
    Ok(())
}

fn cmd_stats(store: Store) -> Result<(), String> {
    let repo = TaskRepository::open(store);
    let today = Local::now().date_naive();

    let summary = stats::summary(repo.tasks(), repo.history(), today);
    println!("=== TaskForge Stats ===\n");
    println!("Completed: {}   Today: {}   Pending: {}   Streak: {} day(s)",
        summary.completed_total, summary.completed_today, summary.pending, summary.streak);

    println!("\nLast 7 days:");
    for (label, count) in stats::weekly_series(repo.history(), today) {
        println!("  {:<4} {:<20} {}", label, "▇".repeat(count.min(20) as usize), count);
    }

    let breakdown = stats::category_breakdown(repo.tasks(), today);
    if !breakdown.is_empty() {
        println!("\nToday by category:");
        for (category, stat) in &breakdown {
            println!(
                "  {} {:<10} {}/{} ({:.0}%)",
                category.emoji(),
                category.as_str(),
                stat.done,
                stat.total,
                stat.ratio() * 100.0
            );
        }
    }

    let quote = quotes::quote_of_the_day(today);
    println!("\n\"{}\" — {}", quote.text, quote.author);
    Ok(())
}

// ---- Backup commands ----

fn cmd_backup(store: Store, args: Vec<String>) -> Result<(), String> {
    let repo = TaskRepository::open(store);
    let today = Local::now().date_naive();
    let path = args
        .first()
        .cloned()
        .unwrap_or_else(|| AppConfig::backup_file_name(today));

    let document = repo.export(Utc::now());
    let json = document.to_json().map_err(|e| e.to_string())?;
    std::fs::write(&path, json).map_err(|e| format!("could not write {}: {}", path, e))?;
    println!("Backup written to {}", path);
    Ok(())
}

fn cmd_restore(store: Store, args: Vec<String>) -> Result<(), String> {
    let path = args.first().ok_or("usage: taskforge restore <path>")?;
    let raw = std::fs::read_to_string(path).map_err(|e| format!("could not read {}: {}", path, e))?;
    let document = BackupDocument::parse(&raw).map_err(|e| e.to_string())?;

    let mut repo = TaskRepository::open(store);
    let outcome = repo.restore(document).map_err(|e| e.to_string())?;
    match outcome.tasks {
        Some(count) => println!("Restored {} task(s).", count),
        None => println!("Backup carried no tasks; task list untouched."),
    }
    if outcome.history {
        println!("Restored completion history.");
    }
    if outcome.settings {
        println!("Restored settings.");
    }
    Ok(())
}

// ---- Reminders ----

async fn cmd_remind(store: Store) -> Result<(), String> {
    let scheduler = Arc::new(ReminderScheduler::new(Arc::new(LogNotifier)));
    let repo = TaskRepository::open(store).with_reminders(Arc::clone(&scheduler));

    let mut scheduled = 0;
    for task in repo.tasks() {
        if scheduler.schedule(task) {
            scheduled += 1;
        }
    }
    if scheduled == 0 {
        println!("No upcoming reminders.");
        return Ok(());
    }
    println!("Watching {} reminder(s)… Ctrl-C to stop.", scheduled);
    while scheduler.pending_count() > 0 {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
    Ok(())
}

// ---- Cache commands ----

async fn cmd_cache(config: AppConfig, mut args: Vec<String>) -> Result<(), String> {
    let Some(subcommand) = args.first().cloned() else {
        return Err("usage: taskforge cache update|status|fetch".to_string());
    };
    args.remove(0);

    let backend: Arc<dyn CacheBackend> = Arc::new(FsCache::new(config.cache_dir()));

    match subcommand.as_str() {
        "status" => {
            let buckets = backend.list_buckets().await?;
            if buckets.is_empty() {
                println!("No cache buckets.");
            } else {
                for name in buckets {
                    println!("{}", name);
                }
            }
            Ok(())
        }
        "update" => {
            let origin = take_value(&mut args, "--origin")
                .ok_or("cache update needs --origin <url>")?;
            let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new()?);
            let mut controller = CacheController::new(backend, fetcher, &origin)?;
            controller.install().await?;
            controller.activate().await?;
            println!(
                "Cache {} installed and activated ({} assets).",
                controller.version(),
                taskforge::cache::CORE_ASSETS.len()
            );
            Ok(())
        }
        "fetch" => {
            let navigate = take_flag(&mut args, "--navigate");
            let url = args.first().ok_or("usage: taskforge cache fetch <url>")?;
            let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new()?);
            let origin = url.clone();
            let controller = CacheController::new(backend, fetcher, &origin)?;
            let request = if navigate {
                FetchRequest::navigation(url.clone())
            } else {
                FetchRequest::asset(url.clone())
            };
            let response = controller.handle_fetch(&request).await?;
            println!(
                "{} {} ({} bytes{})",
                response.status,
                response.url,
                response.body.len(),
                response
                    .content_type
                    .as_deref()
                    .map(|ct| format!(", {}", ct))
                    .unwrap_or_default()
            );
            Ok(())
        }
        other => Err(format!("unknown cache subcommand `{}`", other)),
    }
}

// ---- Helpers ----

fn take_flag(args: &mut Vec<String>, name: &str) -> bool {
    if let Some(pos) = args.iter().position(|a| a == name) {
        args.remove(pos);
        true
    } else {
        false
    }
}

fn take_value(args: &mut Vec<String>, name: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == name)?;
    if pos + 1 >= args.len() {
        return None;
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Some(value)
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid date `{}` (expected YYYY-MM-DD)", raw))
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| format!("invalid time `{}` (expected HH:MM)", raw))
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

/// Accept a full id or an unambiguous prefix.
fn resolve_id(repo: &TaskRepository, needle: &str) -> Result<String, String> {
    if repo.find(needle).is_some() {
        return Ok(needle.to_string());
    }
    let matches: Vec<&Task> = repo
        .tasks()
        .iter()
        .filter(|t| t.id.starts_with(needle))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => Err(format!("no task matches `{}`", needle)),
        _ => Err(format!("`{}` is ambiguous ({} matches)", needle, matches.len())),
    }
}

fn print_task(task: &Task) {
    let checkbox = if task.completed { "[x]" } else { "[ ]" };
    let mut meta = vec![task.priority.as_str().to_string()];
    meta.push(format!("{} {}", task.category.emoji(), task.category.as_str()));
    if let Some(date) = task.date {
        match task.time {
            Some(time) => meta.push(format!("{} {}", date, time.format("%H:%M"))),
            None => meta.push(date.to_string()),
        }
    }
    if task.reminder {
        meta.push("🔔".to_string());
    }
    println!("{} {}  {}  ({})", checkbox, short_id(&task.id), task.title, meta.join(", "));
    if !task.description.is_empty() {
        println!("      {}", task.description);
    }
}
