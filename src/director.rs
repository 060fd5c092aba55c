//! Stage and level progression.
//!
//! The director drains the session's completion signals. The completed-board
//! count runs over the whole level; once it reaches the current stage's
//! requirement the stage clears and the next stage is built, or the level is
//! won with that count as its stars. A countdown
//! shared by every stage of the level can run out first, which loses the
//! level. Whichever outcome comes first is final.

use std::fmt;

use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::GameEvent;
use crate::grid::CompletionChange;
use crate::level::{LevelDefinition, LevelSource};
use crate::session::Session;

/// How the level currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelOutcome {
    InProgress,
    Won { stars: u32 },
    Lost,
}

pub struct Director {
    source: Box<dyn LevelSource>,
    resume_delay: f32,
    stage: u32,
    total_stages: u32,
    /// Level-wide completed-board count that clears the current stage.
    required: usize,
    stage_cleared: bool,
    time_limit: f32,
    remaining: f32,
    user_paused: bool,
    /// Time left before the clock restarts after a stage change.
    stage_hold: Option<f32>,
    level_stars: u32,
    total_stars: u32,
    outcome: LevelOutcome,
}

impl Director {
    pub fn new(source: Box<dyn LevelSource>, config: &EngineConfig) -> Self {
        Self {
            source,
            resume_delay: config.stage_resume_delay,
            stage: 0,
            total_stages: 0,
            required: 0,
            stage_cleared: false,
            time_limit: 0.0,
            remaining: 0.0,
            user_paused: false,
            stage_hold: None,
            level_stars: 0,
            total_stars: 0,
            outcome: LevelOutcome::InProgress,
        }
    }

    /// Builds stage 1 and starts the level clock.
    ///
    /// # Errors
    ///
    /// Fails if the source has no first stage.
    pub fn start(&mut self, session: &mut Session) -> Result<()> {
        let level = self
            .source
            .stage(1)
            .ok_or(EngineError::MissingStage { stage: 1 })?;

        self.outcome = LevelOutcome::InProgress;
        self.level_stars = 0;
        session.reset_completed_boards();
        self.user_paused = false;
        self.stage_hold = None;
        self.total_stages = level.total_stages.max(1);
        self.time_limit = level.time_limit;
        self.remaining = level.time_limit.max(0.0);
        info!(
            "level started: {} stages, {}",
            self.total_stages,
            if self.is_timed() {
                format!("{:.1}s on the clock", self.remaining)
            } else {
                "untimed".to_string()
            }
        );

        self.enter_stage(1, &level, session);
        self.process(session);
        Ok(())
    }

    /// Throws the level away and starts again from stage 1.
    ///
    /// Stars already banked from won levels are kept.
    ///
    /// # Errors
    ///
    /// Fails if the source has no first stage.
    pub fn restart(&mut self, session: &mut Session) -> Result<()> {
        info!("restarting level");
        self.start(session)
    }

    /// Reacts to every queued completion transition.
    pub fn process(&mut self, session: &mut Session) {
        while let Some(signal) = session.pop_signal() {
            if self.outcome != LevelOutcome::InProgress || self.stage_cleared {
                debug!("completion signal for board {} ignored", signal.board);
                continue;
            }
            if signal.change == CompletionChange::Completed
                && signal.completed_boards >= self.required
            {
                self.clear_stage(session);
            }
        }
    }

    /// Counts down the stage hold and the level clock.
    pub fn tick(&mut self, dt: f32, session: &mut Session) {
        if self.outcome != LevelOutcome::InProgress {
            return;
        }
        let dt = dt.max(0.0);

        if let Some(hold) = self.stage_hold {
            let left = hold - dt;
            if left > 0.0 {
                self.stage_hold = Some(left);
            } else {
                self.with_timer_events(session, |director| director.stage_hold = None);
            }
            return;
        }

        if !self.is_timer_running() || !self.is_timed() {
            return;
        }
        self.remaining = (self.remaining - dt).max(0.0);
        if self.remaining <= 0.0 {
            info!("time is up on stage {}", self.stage);
            self.outcome = LevelOutcome::Lost;
            session.emit(GameEvent::LevelLost);
        }
    }

    pub fn pause(&mut self, session: &mut Session) {
        if self.outcome == LevelOutcome::InProgress {
            self.with_timer_events(session, |director| director.user_paused = true);
        }
    }

    pub fn resume(&mut self, session: &mut Session) {
        if self.outcome == LevelOutcome::InProgress {
            self.with_timer_events(session, |director| director.user_paused = false);
        }
    }

    pub const fn outcome(&self) -> LevelOutcome {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome != LevelOutcome::InProgress
    }

    pub const fn is_paused(&self) -> bool {
        self.user_paused
    }

    pub const fn stage(&self) -> u32 {
        self.stage
    }

    pub const fn total_stages(&self) -> u32 {
        self.total_stages
    }

    pub const fn remaining_time(&self) -> f32 {
        self.remaining
    }

    /// Stars collected by the stages of the current level so far.
    pub const fn level_stars(&self) -> u32 {
        self.level_stars
    }

    /// Stars banked from every won level.
    pub const fn total_stars(&self) -> u32 {
        self.total_stars
    }

    /// Fraction of stages already cleared; always 0 for a single stage.
    pub fn stage_progress(&self) -> f32 {
        if self.total_stages > 1 {
            self.stage.saturating_sub(1) as f32 / self.total_stages as f32
        } else {
            0.0
        }
    }

    fn is_timed(&self) -> bool {
        self.time_limit > 0.0
    }

    fn is_timer_running(&self) -> bool {
        self.outcome == LevelOutcome::InProgress && !self.user_paused && self.stage_hold.is_none()
    }

    /// Applies `change` and emits a timer event if the clock started or stopped.
    fn with_timer_events(&mut self, session: &mut Session, change: impl FnOnce(&mut Self)) {
        let was_running = self.is_timer_running();
        change(self);
        match (was_running, self.is_timer_running()) {
            (true, false) => session.emit(GameEvent::TimerPaused),
            (false, true) => session.emit(GameEvent::TimerResumed),
            _ => {}
        }
    }

    fn enter_stage(&mut self, stage: u32, level: &LevelDefinition, session: &mut Session) {
        self.stage = stage;
        self.required = level.required_boards(session.completed_boards());
        self.stage_cleared = false;
        session.load_stage(level);
        info!(
            "stage {stage}/{} loaded with {} boards, clears at {} completed",
            self.total_stages,
            level.boards.len(),
            self.required
        );
        session.emit(GameEvent::StageLoaded {
            stage,
            total_stages: self.total_stages,
        });
    }

    fn clear_stage(&mut self, session: &mut Session) {
        self.stage_cleared = true;
        let stars = u32::try_from(session.completed_boards()).unwrap_or(u32::MAX);
        self.level_stars = stars;
        info!("stage {} cleared with {stars} stars", self.stage);
        session.emit(GameEvent::StageCleared {
            stage: self.stage,
            stars,
        });

        if self.stage < self.total_stages {
            let next = self.stage + 1;
            if let Some(level) = self.source.stage(next) {
                let delay = self.resume_delay;
                self.with_timer_events(session, |director| director.stage_hold = Some(delay));
                self.enter_stage(next, &level, session);
                return;
            }
            warn!("stage {next} of {} is missing, ending the level", self.total_stages);
        }

        let stars = self.level_stars;
        self.total_stars = self.total_stars.saturating_add(stars);
        self.outcome = LevelOutcome::Won { stars };
        info!("level won with {stars} stars ({} in total)", self.total_stars);
        session.emit(GameEvent::LevelWon { stars });
    }
}

impl fmt::Debug for Director {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Director")
            .field("stage", &self.stage)
            .field("total_stages", &self.total_stages)
            .field("required", &self.required)
            .field("remaining", &self.remaining)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}
