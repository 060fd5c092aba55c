//! Color Sort
//!
//! Command-line front end for the puzzle engine: prints the boards of a level
//! or replays a scripted drag session against it.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use log::{error, info};
use serde::Deserialize;

use colorsort::error::{EngineError, Result};
use colorsort::{EngineConfig, Game, GameEvent, LevelDefinition, Ray};

/// Plays color sort levels from the terminal.
#[derive(Parser)]
#[command(name = "colorsort")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine tuning values as JSON; missing fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the boards of the first stage.
    Render {
        /// Level JSON: one stage object or an array of stages.
        level: PathBuf,
    },
    /// Replay a drag script and print what happened.
    Play {
        level: PathBuf,
        /// One command per line: press X Y, move X Y, release, cancel,
        /// tick SECONDS, pause, resume, restart. Lines starting with # are skipped.
        #[arg(long)]
        script: PathBuf,
    },
}

/// A level file holds either every stage or a single one.
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelFile {
    Stages(Vec<LevelDefinition>),
    Single(LevelDefinition),
}

impl LevelFile {
    fn into_stages(self) -> Vec<LevelDefinition> {
        match self {
            Self::Stages(stages) => stages,
            Self::Single(stage) => vec![stage],
        }
    }
}

/// One line of a drag script.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Step {
    Press(f32, f32),
    Move(f32, f32),
    Release,
    Cancel,
    Tick(f32),
    Pause,
    Resume,
    Restart,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Render { level } => run_render(config, &level),
        Command::Play { level, script } => run_play(config, &level, &script),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| EngineError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    EngineConfig::from_json(&read(path)?).map_err(|source| EngineError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn load_level(path: &Path) -> Result<Vec<LevelDefinition>> {
    let file: LevelFile =
        serde_json::from_str(&read(path)?).map_err(|source| EngineError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let stages = file.into_stages();
    info!("loaded {} stages from {}", stages.len(), path.display());
    Ok(stages)
}

/// Builds the first stage and prints its boards.
fn run_render(config: EngineConfig, level: &Path) -> Result<()> {
    let mut game = Game::new(config, load_level(level)?);
    game.start()?;
    println!("{}", game.session().render());
    Ok(())
}

/// Replays a script, then prints the log and the final boards.
fn run_play(config: EngineConfig, level: &Path, script: &Path) -> Result<()> {
    let steps = parse_script(&read(script)?)?;
    let mut game = Game::new(config, load_level(level)?);
    let log = replay(&mut game, &steps)?;
    println!("{log}");
    println!();
    println!("{}", game.session().render());
    Ok(())
}

fn parse_script(text: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fail = |reason: String| EngineError::Script {
            line: index + 1,
            reason,
        };
        let number = |word: Option<&str>| -> Result<f32> {
            let word = word.ok_or_else(|| fail("missing number".to_string()))?;
            word.parse::<f32>()
                .map_err(|_| fail(format!("'{word}' is not a number")))
        };

        let mut words = line.split_whitespace();
        let step = match words.next() {
            Some("press") => Step::Press(number(words.next())?, number(words.next())?),
            Some("move") => Step::Move(number(words.next())?, number(words.next())?),
            Some("release") => Step::Release,
            Some("cancel") => Step::Cancel,
            Some("tick") => Step::Tick(number(words.next())?),
            Some("pause") => Step::Pause,
            Some("resume") => Step::Resume,
            Some("restart") => Step::Restart,
            Some(other) => return Err(fail(format!("unknown command '{other}'"))),
            None => continue,
        };
        if let Some(extra) = words.next() {
            return Err(fail(format!("unexpected '{extra}'")));
        }
        steps.push(step);
    }
    Ok(steps)
}

/// Starts the game and runs every step, logging outcomes and events.
fn replay(game: &mut Game, steps: &[Step]) -> Result<String> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    game.subscribe(move |event: &GameEvent| sink.borrow_mut().push(event.clone()));

    let mut log = String::new();
    let _ = writeln!(log, "> start");
    game.start()?;
    drain_events(&mut log, &events);

    for step in steps {
        let _ = writeln!(log, "> {}", describe(*step));
        match *step {
            Step::Press(x, y) => {
                let outcome = game.press(Ray::vertical(x, y));
                let _ = writeln!(log, "  {outcome:?}");
            }
            Step::Move(x, y) => {
                let moved = game.drag(Ray::vertical(x, y));
                let _ = writeln!(log, "  {}", if moved { "moved" } else { "no drag" });
            }
            Step::Release => {
                let outcome = game.release();
                let _ = writeln!(log, "  {outcome:?}");
            }
            Step::Cancel => {
                let outcome = game.cancel();
                let _ = writeln!(log, "  {outcome:?}");
            }
            Step::Tick(dt) => game.tick(dt),
            Step::Pause => game.pause(),
            Step::Resume => game.resume(),
            Step::Restart => game.restart()?,
        }
        drain_events(&mut log, &events);
    }

    let _ = write!(log, "outcome: {:?}", game.outcome());
    Ok(log)
}

fn drain_events(log: &mut String, events: &Rc<RefCell<Vec<GameEvent>>>) {
    for event in events.borrow_mut().drain(..) {
        let _ = writeln!(log, "  event: {event:?}");
    }
}

fn describe(step: Step) -> String {
    match step {
        Step::Press(x, y) => format!("press {x} {y}"),
        Step::Move(x, y) => format!("move {x} {y}"),
        Step::Release => "release".to_string(),
        Step::Cancel => "cancel".to_string(),
        Step::Tick(dt) => format!("tick {dt}"),
        Step::Pause => "pause".to_string(),
        Step::Resume => "resume".to_string(),
        Step::Restart => "restart".to_string(),
    }
}
