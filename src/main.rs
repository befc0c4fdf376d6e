use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode},
    tty::IsTty,
};
use itertools::Itertools;
use log::warn;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use sound_safari::{
    analytics::{AnalyticsSink, CsvLogSink, NullSink},
    app_dirs::AppDirs,
    config::{AnalyticsBackend, Config, ConfigStore, FileConfigStore},
    input::{handle_key, slot_label, Flow},
    narration::LogNarrator,
    runtime::{CrosstermEventSource, FixedTicker, Runner, SafariEvent},
    stats::StatsDb,
    CreaturePool, Difficulty, Handled, Phase, SessionEngine, SessionOptions, SoundCatalog,
};
use std::{
    error::Error,
    io::{self, stdin, Write},
};

/// find the creatures whose names carry the target sound
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A phonemic awareness game: each round names a sound, and you pick every creature whose name carries it before the clock runs out."
)]
pub struct Cli {
    /// difficulty level (overrides the saved setting)
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// number of rounds per session
    #[clap(short = 'r', long)]
    rounds: Option<usize>,

    /// scene the creatures are shown in
    #[clap(short = 'e', long)]
    environment: Option<String>,

    /// where session summaries are recorded
    #[clap(short = 'a', long, value_enum)]
    analytics: Option<AnalyticsBackend>,

    /// seed for reproducible rounds
    #[clap(long)]
    seed: Option<u64>,

    /// print the sound catalog and exit
    #[clap(long)]
    list_sounds: bool,

    /// print recorded progress per sound and exit
    #[clap(long)]
    stats: bool,

    /// persist the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Layer command line flags over the stored settings
    fn apply(&self, mut config: Config) -> Config {
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(rounds) = self.rounds {
            config.total_rounds = rounds;
        }
        if let Some(environment) = &self.environment {
            config.environment = environment.clone();
        }
        if let Some(analytics) = self.analytics {
            config.analytics = analytics;
        }
        config
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());
    if cli.save_config {
        store.save(&config)?;
    }

    let catalog = SoundCatalog::embedded()?;
    if cli.list_sounds {
        print_sounds(&mut io::stdout(), &catalog)?;
        return Ok(());
    }
    if cli.stats {
        print_stats(&mut io::stdout(), &StatsDb::new()?)?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let pool = CreaturePool::embedded()?;
    let options = SessionOptions {
        total_rounds: config.total_rounds,
        environment: config.environment.clone(),
    };
    let narrator = Box::new(LogNarrator);
    let analytics = open_sink(config.analytics);

    enable_raw_mode()?;
    let result = match cli.seed {
        Some(seed) => run(
            SessionEngine::with_rng(
                catalog,
                pool,
                options,
                narrator,
                analytics,
                StdRng::seed_from_u64(seed),
            ),
            &config,
        ),
        None => run(
            SessionEngine::new(catalog, pool, options, narrator, analytics),
            &config,
        ),
    };
    disable_raw_mode()?;

    result
}

fn open_sink(backend: AnalyticsBackend) -> Box<dyn AnalyticsSink> {
    match backend {
        AnalyticsBackend::None => Box::new(NullSink),
        AnalyticsBackend::Sqlite => match StatsDb::new() {
            Ok(db) => Box::new(db),
            Err(e) => {
                warn!("stats database unavailable, summaries will not be kept: {e}");
                Box::new(NullSink)
            }
        },
        AnalyticsBackend::Csv => match AppDirs::session_log_path() {
            Some(path) => Box::new(CsvLogSink::new(path)),
            None => {
                warn!("no state directory for the session log");
                Box::new(NullSink)
            }
        },
    }
}

fn run<R: RngCore>(mut engine: SessionEngine<R>, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut out = io::stdout();
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::every_second());
    let default_profile = config.difficulty.profile();

    render(&mut out, &engine)?;

    loop {
        match runner.step() {
            SafariEvent::Tick => {
                if engine.tick() == Handled::Applied {
                    render_clock(&mut out, &engine)?;
                }
            }
            SafariEvent::Resize => {}
            SafariEvent::Key(key) => {
                match handle_key(&mut engine, &mut runner, &key, &default_profile) {
                    Flow::Quit => break,
                    Flow::Redraw => render(&mut out, &engine)?,
                    Flow::Rejected(e) => write!(out, "cannot start: {e}\r\n")?,
                    Flow::Unchanged => {}
                }
            }
        }
    }

    write!(out, "bye!\r\n")?;
    out.flush()?;
    Ok(())
}

fn render<W: Write, R: RngCore>(out: &mut W, engine: &SessionEngine<R>) -> io::Result<()> {
    match engine.phase() {
        Phase::Config => {
            let current = engine
                .profile()
                .map_or_else(|| "easy".to_string(), |p| p.name.clone());
            write!(
                out,
                "Choose a difficulty: [e]asy [m]edium [h]ard, Enter for {current}, Esc to quit\r\n"
            )?;
        }
        Phase::Loading => write!(out, "Getting the safari ready...\r\n")?,
        Phase::Intro => {
            if let Some(config) = engine.round_config() {
                write!(
                    out,
                    "Round {}/{}: listen for /{}/ at the {} of each name.\r\n",
                    engine.round(),
                    engine.total_rounds(),
                    config.target,
                    config.position
                )?;
                if let Some(descriptor) = engine.catalog().get(&config.target) {
                    write!(out, "  {}\r\n", descriptor.description)?;
                }
                write!(out, "Press Enter to start.\r\n")?;
            }
        }
        Phase::Playing => {
            let selection = engine.selection();
            for (i, creature) in engine.candidates().iter().enumerate() {
                let mark = if selection.is_some_and(|s| s.contains(&creature.id)) {
                    "x"
                } else {
                    " "
                };
                let label = slot_label(i).unwrap_or(' ');
                write!(out, "  [{label}] [{mark}] {}\r\n", creature.name)?;
            }
            write!(
                out,
                "{} selected, {}s left. Number keys pick, Enter submits.\r\n",
                engine.selection_count(),
                engine.time_remaining_secs()
            )?;
        }
        Phase::Results => {
            if let Some(result) = engine.last_result() {
                write!(
                    out,
                    "Score {}% ({} of {} found)\r\n",
                    result.score,
                    result.correct_selected.len(),
                    result.total_correct()
                )?;
                if !result.missed_correct.is_empty() {
                    let missed = result.missed_correct.iter().map(|c| &c.name).join(", ");
                    write!(out, "  missed: {missed}\r\n")?;
                }
                if !result.incorrect_selected.is_empty() {
                    let wrong = result.incorrect_selected.iter().map(|c| &c.name).join(", ");
                    write!(out, "  not this sound: {wrong}\r\n")?;
                }
            }
            write!(
                out,
                "Total {}. [r] try again, Enter for the next round\r\n",
                engine.cumulative_score()
            )?;
        }
        Phase::Complete => write!(
            out,
            "Safari complete! {} points over {} rounds. [p] play again, [d] change difficulty\r\n",
            engine.cumulative_score(),
            engine.total_rounds()
        )?,
    }
    out.flush()
}

fn render_clock<W: Write, R: RngCore>(out: &mut W, engine: &SessionEngine<R>) -> io::Result<()> {
    match engine.phase() {
        Phase::Playing => {
            let remaining = engine.time_remaining_secs();
            if remaining <= 5 || remaining % 10 == 0 {
                write!(out, "{remaining}s left\r\n")?;
            }
            out.flush()
        }
        // The countdown ran out and the round was scored
        _ => {
            write!(out, "Time's up!\r\n")?;
            render(out, engine)
        }
    }
}

fn print_sounds<W: Write>(out: &mut W, catalog: &SoundCatalog) -> io::Result<()> {
    for descriptor in catalog.descriptors() {
        writeln!(
            out,
            "{:<3} {} (e.g. {})",
            descriptor.symbol,
            descriptor.description,
            descriptor.examples.iter().join(", ")
        )?;
    }
    Ok(())
}

fn print_stats<W: Write>(out: &mut W, db: &StatsDb) -> Result<(), Box<dyn Error>> {
    writeln!(
        out,
        "{} sessions played, {} completed",
        db.sessions_played(false)?,
        db.sessions_played(true)?
    )?;
    for row in db.sound_summary()? {
        writeln!(
            out,
            "{:<3} {:>5.1}% over {} sessions",
            row.sound, row.avg_success_rate, row.sessions
        )?;
    }
    Ok(())
}
