//! ragnarok - AI lifting lab
//!
//! Generate a session, log it, look back at it.

use anyhow::Result;
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};

use ragnarok::client::{OpenAiClient, RetryPolicy};
use ragnarok::config::{
    DEFAULT_BASE_URL, DEFAULT_DB_PATH, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
    GenerationConfig, StoreConfig,
};
use ragnarok::db::{LogSink, PrBaseline, PrStore};
use ragnarok::exercises::{
    DEFAULT_EXERCISE_COUNT, DEFAULT_WEIGHT, DayType, GeneratedWorkout, Goal, SUPERSET_NONE,
    WorkoutRequest,
};
use ragnarok::lab::parse_date;
use ragnarok::mapper::{RowEdit, SetNotes};
use ragnarok::tui::App;
use ragnarok::{Database, Lab, LabError, Logbook, SheetsSink};

#[derive(Parser)]
#[command(name = "ragnarok")]
#[command(author, version, about = "RAGNARÖK LAB - AI-generated lifting sessions")]
struct Cli {
    /// Where the workout log lives
    #[arg(long, global = true, value_enum, default_value = "sqlite", env = "RAGNAROK_STORE")]
    store: StoreKind,

    /// SQLite file (sqlite store)
    #[arg(long, global = true, env = "RAGNAROK_DB", default_value = DEFAULT_DB_PATH)]
    db: String,

    /// Spreadsheet URL (sheets store)
    #[arg(long, global = true, env = "RAGNAROK_SHEET_URL")]
    sheet_url: Option<String>,

    /// OAuth access token for the Sheets API
    #[arg(long, global = true, env = "GOOGLE_SHEETS_TOKEN", hide_env_values = true)]
    sheets_token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Sqlite,
    Sheets,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the log viewer
    Tui,

    /// Generate a workout, optionally logging it
    Generate {
        /// Push, Pull or Legs
        #[arg(short, long)]
        day: DayType,

        /// Hypertrophy, Strength or Endurance
        #[arg(short, long, default_value = "hypertrophy")]
        goal: Goal,

        /// Session date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Previous sessions of the same day type to show the model
        #[arg(long, default_value = "3")]
        history: usize,

        /// Exercises to ask for
        #[arg(short = 'n', long, default_value_t = DEFAULT_EXERCISE_COUNT)]
        count: usize,

        /// Append the result to the log
        #[arg(long)]
        log: bool,

        /// Per-exercise notes in order, e.g. "weight=80; rpe=8; felt easy"
        #[arg(long = "note")]
        notes: Vec<String>,

        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Show recent sessions of one day type
    History {
        #[arg(short, long)]
        day: DayType,

        /// Number of sessions
        #[arg(short, long, default_value = "3")]
        limit: usize,
    },

    /// Change or remove one exercise of a logged session
    Edit {
        #[arg(short, long)]
        day: DayType,

        /// YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// Exercise name as logged (case-insensitive)
        #[arg(short, long)]
        exercise: String,

        #[arg(long)]
        sets: Option<u32>,

        #[arg(long)]
        reps: Option<String>,

        #[arg(long)]
        weight: Option<String>,

        /// New notes, e.g. "weight=80; rpe=8; felt easy"
        #[arg(long)]
        note: Option<String>,

        /// Drop the exercise from the session
        #[arg(long, conflicts_with_all = ["sets", "reps", "weight", "note"])]
        remove: bool,
    },

    /// Delete every row logged on a date
    Delete {
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
    },

    /// Personal records
    Pr {
        #[command(subcommand)]
        action: PrAction,
    },
}

#[derive(Subcommand)]
enum PrAction {
    /// List all PR baselines
    List,

    /// Record a PR
    Add {
        exercise: String,

        #[arg(short, long)]
        weight: f64,

        #[arg(short, long)]
        reps: u32,
    },
}

#[derive(Args)]
struct GenerationArgs {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "RAGNAROK_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "RAGNAROK_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    #[arg(long, env = "RAGNAROK_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Total attempts on transient failures (1 = no retry)
    #[arg(long, env = "RAGNAROK_RETRIES", default_value_t = 1)]
    retries: u32,
}

impl GenerationArgs {
    fn into_config(self) -> GenerationConfig {
        GenerationConfig {
            api_key: self.api_key.unwrap_or_default(),
            base_url: self.base_url,
            model: self.model,
            temperature: self.temperature,
            timeout_secs: self.timeout,
            max_attempts: self.retries,
        }
    }
}

/// Library error plus what to do about it
fn fail(e: LabError) -> anyhow::Error {
    anyhow::anyhow!("{}\n  hint: {}", e, e.user_hint())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    let store = match cli.store {
        StoreKind::Sqlite => StoreConfig::Sqlite { path: cli.db },
        StoreKind::Sheets => StoreConfig::Sheets {
            url: cli.sheet_url.unwrap_or_default(),
            access_token: cli.sheets_token.unwrap_or_default(),
        },
    };
    store.validate().map_err(fail)?;

    match store {
        StoreConfig::Sqlite { path } => run(command, Database::open(&path).map_err(fail)?).await,
        StoreConfig::Sheets { url, access_token } => {
            run(command, SheetsSink::from_url(&url, &access_token).map_err(fail)?).await
        }
    }
}

async fn run<S: LogSink + PrStore>(command: Commands, sink: S) -> Result<()> {
    match command {
        Commands::Tui => {
            let rows = sink.read_all().await.map_err(fail)?;
            let mut app = App::new(rows);
            app.run()?;
        }

        Commands::Generate { day, goal, date, history, count, log, notes, generation } => {
            let config = generation.into_config();
            let client = OpenAiClient::new(&config).map_err(fail)?;
            let lab = Lab::new(client, sink).with_retry(RetryPolicy::new(config.max_attempts));

            let date = match date {
                Some(d) => parse_date(&d).map_err(fail)?,
                None => Local::now().date_naive(),
            };
            let mut req = lab.build_request(day, goal, date, history).await.map_err(fail)?;
            req.exercise_count = count;

            let workout = match lab.generate(&req).await {
                Ok(w) => w,
                Err(e) => {
                    eprintln!("Generation failed: {}", e);
                    eprintln!("  hint: {}", e.user_hint());
                    println!("No workout generated.");
                    return Ok(());
                }
            };
            print_workout(&req, &workout);

            if log {
                let notes: Vec<String> =
                    notes.iter().map(|n| SetNotes::parse(n).to_string()).collect();
                let rows = lab.log_workout(&req, &workout, &notes).await.map_err(fail)?;
                println!("Logged {} exercises as {}", rows.len(), req.workout_id());
            }
        }

        Commands::History { day, limit } => {
            let book = Logbook::new(sink);
            let rows = book.previous_workouts(day, limit).await.map_err(fail)?;
            if rows.is_empty() {
                println!("No {} sessions logged yet.", day);
                return Ok(());
            }

            println!("{} Recent {} sessions:", day.emoji(), day);
            println!("{:-<80}", "");
            for r in &rows {
                let superset = if r.is_superset() {
                    format!("SS{}", r.superset_group_id)
                } else {
                    "-".to_string()
                };
                println!(
                    "{} | {:24} | {}x{:6} | {:8} | {:4} | {}",
                    r.date,
                    r.exercise,
                    r.sets,
                    r.reps,
                    r.weight,
                    superset,
                    if r.notes.is_empty() { "-" } else { r.notes.as_str() }
                );
            }
        }

        Commands::Edit { day, date, exercise, sets, reps, weight, note, remove } => {
            let book = Logbook::new(sink);
            let edit = RowEdit { sets, reps, weight, notes: note };
            let matched = book
                .edit_exercise(day, &date, &exercise, &edit, remove)
                .await
                .map_err(fail)?;

            let verb = if remove { "Removed" } else { "Updated" };
            println!("{} {} x{} in the {} session on {}", verb, exercise, matched, day, date);
            for r in book.rows_for_date(&date).await.map_err(fail)? {
                if r.workout_type.eq_ignore_ascii_case(day.as_str()) {
                    println!(
                        "  {:24} | {}x{:6} | {:8} | {}",
                        r.exercise, r.sets, r.reps, r.weight, r.notes
                    );
                }
            }
        }

        Commands::Delete { date } => {
            let book = Logbook::new(sink);
            let removed = book.delete_date(&date).await.map_err(fail)?;
            if removed == 0 {
                println!("Nothing logged on {}", date);
            } else {
                println!("Deleted {} rows from {}", removed, date);
            }
        }

        Commands::Pr { action: PrAction::List } => {
            let book = Logbook::new(sink);
            let prs = book.list_prs().await.map_err(fail)?;
            if prs.is_empty() {
                println!("No PRs recorded yet.");
                return Ok(());
            }
            println!("Personal records:");
            println!("{:-<40}", "");
            for pr in &prs {
                println!("{:24} | {}", pr.exercise, pr.load());
            }
        }

        Commands::Pr { action: PrAction::Add { exercise, weight, reps } } => {
            let book = Logbook::new(sink);
            let pr = PrBaseline { exercise, max_weight: weight, reps };
            book.add_pr(&pr).await.map_err(fail)?;
            println!("PR saved: {} {}", pr.exercise, pr.load());
        }
    }

    Ok(())
}

fn print_workout(req: &WorkoutRequest, workout: &GeneratedWorkout) {
    println!(
        "{} {} day - {} ({})",
        req.day_type.emoji(),
        req.day_type,
        req.goal,
        req.date_string()
    );
    if let Some(warm_up) = &workout.warm_up {
        println!("Warm-up: {}", warm_up);
    }
    println!("{:-<80}", "");
    for (i, ex) in workout.exercises.iter().enumerate() {
        let superset = match ex.superset_group_id {
            Some(g) if g != SUPERSET_NONE && g != 0 => format!(" [SS{}]", g),
            _ => String::new(),
        };
        println!(
            "{}. {:28} {}x{:6} {:8} {}{}",
            i + 1,
            ex.name,
            ex.sets,
            ex.reps,
            ex.weight.as_deref().unwrap_or(DEFAULT_WEIGHT),
            ex.primary_muscle,
            superset
        );
    }
    if let Some(finisher) = &workout.finisher {
        println!("{:-<80}", "");
        println!("Finisher: {}", finisher);
    }
}
