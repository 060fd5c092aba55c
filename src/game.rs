//! One playable level: session, drag controller and director wired together.
//!
//! Every input and every tick is followed by a pass of the director over the
//! completion signals it produced, so stage changes are visible as soon as the
//! call returns.

use crate::config::EngineConfig;
use crate::director::{Director, LevelOutcome};
use crate::error::Result;
use crate::events::{GameEvent, SubscriptionId};
use crate::geometry::Ray;
use crate::level::LevelSource;
use crate::placement::{DragController, PressIgnored, PressOutcome, ReleaseOutcome};
use crate::session::Session;

#[derive(Debug)]
pub struct Game {
    session: Session,
    controller: DragController,
    director: Director,
}

impl Game {
    pub fn new(config: EngineConfig, source: impl LevelSource + 'static) -> Self {
        let controller = DragController::new(&config);
        let director = Director::new(Box::new(source), &config);
        Self {
            session: Session::new(config),
            controller,
            director,
        }
    }

    /// Builds stage 1 and starts the clock.
    ///
    /// # Errors
    ///
    /// Fails if the level source has no first stage.
    pub fn start(&mut self) -> Result<()> {
        self.controller.reset();
        self.director.start(&mut self.session)
    }

    /// # Errors
    ///
    /// Fails if the level source has no first stage.
    pub fn restart(&mut self) -> Result<()> {
        self.controller.reset();
        self.director.restart(&mut self.session)
    }

    pub fn press(&mut self, ray: Ray) -> PressOutcome {
        if self.director.is_over() {
            return PressOutcome::Ignored(PressIgnored::LevelOver);
        }
        if self.director.is_paused() {
            return PressOutcome::Ignored(PressIgnored::Paused);
        }
        let outcome = self.controller.press(&mut self.session, ray);
        self.director.process(&mut self.session);
        outcome
    }

    pub fn drag(&mut self, ray: Ray) -> bool {
        self.controller.drag(&mut self.session, ray)
    }

    pub fn release(&mut self) -> ReleaseOutcome {
        let outcome = self.controller.release(&mut self.session);
        self.director.process(&mut self.session);
        outcome
    }

    pub fn cancel(&mut self) -> ReleaseOutcome {
        let outcome = self.controller.cancel(&mut self.session);
        self.director.process(&mut self.session);
        outcome
    }

    /// Advances piece transitions, then the clocks.
    pub fn tick(&mut self, dt: f32) {
        self.session.tick(dt);
        self.director.tick(dt, &mut self.session);
    }

    pub fn pause(&mut self) {
        self.director.pause(&mut self.session);
    }

    pub fn resume(&mut self) {
        self.director.resume(&mut self.session);
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&GameEvent) + 'static) -> SubscriptionId {
        self.session.events_mut().subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.session.events_mut().unsubscribe(id)
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn director(&self) -> &Director {
        &self.director
    }

    pub const fn outcome(&self) -> LevelOutcome {
        self.director.outcome()
    }

    pub const fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }
}
