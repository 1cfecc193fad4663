use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use taskboard::{
    client::{
        export::ExportFormat,
        reminders::{due_reminders, ReminderTracker},
        view::render_item,
        ApiClient, Quadrant, TodoBoard, TodoForm,
    },
    todos::repo_types::{Level, Priority},
};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "taskctl")]
#[command(about = "Command-line client for the taskboard API")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, env = "TASKBOARD_URL", default_value = "http://localhost:5001")]
    url: String,

    #[arg(long, global = true, env = "TASKBOARD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create an account and print its token")]
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    #[command(about = "Log in and print a token")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    #[command(about = "Show the signed-in user")]
    Me,
    #[command(about = "List tasks, newest first")]
    List {
        #[arg(long, help = "Print raw JSON")]
        json: bool,
    },
    #[command(about = "Create a task")]
    Add {
        title: String,
        #[command(flatten)]
        fields: FormArgs,
    },
    #[command(about = "Change fields of a task")]
    Edit {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: FormArgs,
    },
    #[command(about = "Flip a task between TODO and DONE")]
    Toggle { id: Uuid },
    #[command(about = "Delete a task")]
    Rm { id: Uuid },
    #[command(about = "Manage subtasks")]
    Subtask {
        #[command(subcommand)]
        cmd: SubtaskCommands,
    },
    #[command(about = "Show the Eisenhower matrix")]
    Matrix,
    #[command(about = "Export tasks to a file")]
    Export {
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    #[command(about = "Show reminders due in the next five minutes")]
    Remind {
        #[arg(long, help = "Keep polling until interrupted")]
        watch: bool,
        #[arg(long, default_value_t = 60, help = "Polling interval in seconds")]
        interval: u64,
    },
}

#[derive(Subcommand)]
enum SubtaskCommands {
    Add { todo_id: Uuid, title: String },
    Done {
        id: Uuid,
        #[arg(long, help = "Mark as not completed")]
        undo: bool,
    },
    Rm { id: Uuid },
}

#[derive(clap::Args)]
struct FormArgs {
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_parser = parse_priority)]
    priority: Option<Priority>,
    #[arg(long, value_parser = parse_level)]
    importance: Option<Level>,
    #[arg(long, value_parser = parse_level)]
    urgency: Option<Level>,
    #[arg(long, value_parser = parse_day, help = "YYYY-MM-DD")]
    due: Option<Date>,
    #[arg(long, value_parser = parse_instant, help = "RFC 3339 timestamp")]
    reminder: Option<OffsetDateTime>,
    #[arg(long)]
    category: Option<Uuid>,
}

impl FormArgs {
    fn apply(&self, form: &mut TodoForm) {
        if let Some(v) = &self.description {
            form.description = v.clone();
        }
        if let Some(v) = self.priority {
            form.priority = v;
        }
        if let Some(v) = self.importance {
            form.importance = v;
        }
        if let Some(v) = self.urgency {
            form.urgency = v;
        }
        if let Some(v) = self.due {
            form.due_date = Some(v);
        }
        if let Some(v) = self.reminder {
            form.reminder = Some(v);
        }
        if let Some(v) = self.category {
            form.category_id = Some(v);
        }
    }
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    match s.to_ascii_uppercase().as_str() {
        "LOW" => Ok(Priority::Low),
        "MEDIUM" => Ok(Priority::Medium),
        "HIGH" => Ok(Priority::High),
        _ => Err("expected low, medium or high".into()),
    }
}

fn parse_level(s: &str) -> Result<Level, String> {
    match s.to_ascii_uppercase().as_str() {
        "LOW" => Ok(Level::Low),
        "NORMAL" => Ok(Level::Normal),
        "HIGH" => Ok(Level::High),
        _ => Err("expected low, normal or high".into()),
    }
}

fn parse_day(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]")).map_err(|e| e.to_string())
}

fn parse_instant(s: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| e.to_string())
}

fn client(cli: &Cli) -> anyhow::Result<ApiClient> {
    let Some(token) = cli.token.clone() else {
        bail!("no token; run `taskctl login` and set TASKBOARD_TOKEN");
    };
    Ok(ApiClient::new(&cli.url).with_token(token))
}

async fn loaded_board(cli: &Cli) -> anyhow::Result<TodoBoard<ApiClient>> {
    let mut board = TodoBoard::new(client(cli)?);
    board.load().await.context("load tasks")?;
    Ok(board)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "taskboard=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Register {
            email,
            password,
            name,
        } => {
            let mut api = ApiClient::new(&cli.url);
            let auth = api.register(email, password, name.as_deref()).await?;
            println!("{}", auth.message);
            println!("{}", auth.token);
        }
        Commands::Login { email, password } => {
            let mut api = ApiClient::new(&cli.url);
            let auth = api.login(email, password).await?;
            println!("{}", auth.message);
            println!("{}", auth.token);
        }
        Commands::Me => {
            let user = client(&cli)?.me().await?;
            println!("{} {}", user.email, user.name.unwrap_or_default());
        }
        Commands::List { json } => {
            let board = loaded_board(&cli).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(board.todos())?);
            } else {
                for task in board.todos() {
                    println!("{}", render_item(task));
                }
            }
        }
        Commands::Add { title, fields } => {
            let mut board = TodoBoard::new(client(&cli)?);
            let mut form = TodoForm {
                title: title.clone(),
                ..TodoForm::blank()
            };
            fields.apply(&mut form);
            println!("{}", render_item(board.add(form).await?));
        }
        Commands::Edit { id, title, fields } => {
            let mut board = loaded_board(&cli).await?;
            let current = board
                .get(*id)
                .with_context(|| format!("no task {id}"))?;
            let mut form = TodoForm::from_task(current);
            if let Some(title) = title {
                form.title = title.clone();
            }
            fields.apply(&mut form);
            println!("{}", render_item(board.edit(*id, form).await?));
        }
        Commands::Toggle { id } => {
            let mut board = loaded_board(&cli).await?;
            println!("{}", render_item(board.toggle_status(*id).await?));
        }
        Commands::Rm { id } => {
            let mut board = TodoBoard::new(client(&cli)?);
            board.remove(*id).await?;
            println!("Todo deleted successfully");
        }
        Commands::Subtask { cmd } => {
            let mut board = loaded_board(&cli).await?;
            match cmd {
                SubtaskCommands::Add { todo_id, title } => {
                    board.add_subtask(*todo_id, title).await?;
                    if let Some(task) = board.get(*todo_id) {
                        println!("{}", render_item(task));
                    }
                }
                SubtaskCommands::Done { id, undo } => {
                    board.set_subtask_completed(*id, !undo).await?;
                }
                SubtaskCommands::Rm { id } => {
                    board.remove_subtask(*id).await?;
                    println!("Subtask deleted successfully");
                }
            }
        }
        Commands::Matrix => {
            let board = loaded_board(&cli).await?;
            let matrix = board.matrix();
            for q in Quadrant::ALL {
                println!("== {}", q.title());
                for task in matrix.quadrant(q) {
                    println!("  {}", render_item(task));
                }
            }
            if !matrix.unplaced().is_empty() {
                println!("== Not yet classified");
                for task in matrix.unplaced() {
                    println!("  {}", render_item(task));
                }
            }
        }
        Commands::Export { format, out } => {
            let board = loaded_board(&cli).await?;
            let bytes = format.render(board.todos())?;
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(format.file_name()));
            std::fs::write(&path, bytes)
                .with_context(|| format!("write {}", path.display()))?;
            println!("{}", path.display());
        }
        Commands::Remind { watch, interval } => {
            let mut board = loaded_board(&cli).await?;
            if !*watch {
                for r in due_reminders(board.todos(), OffsetDateTime::now_utc()) {
                    println!("{}", r.message());
                }
                return Ok(());
            }
            let mut tracker = ReminderTracker::new();
            let mut tick = tokio::time::interval(Duration::from_secs((*interval).max(1)));
            loop {
                tokio::select! {
                    _ = tick.tick() => {}
                    _ = tokio::signal::ctrl_c() => break,
                }
                // a failed poll is logged by the board; keep the last known list
                let _ = board.load().await;
                for r in tracker.fresh(board.due_reminders(OffsetDateTime::now_utc())) {
                    println!("{}", r.message());
                }
            }
        }
    }
    Ok(())
}
