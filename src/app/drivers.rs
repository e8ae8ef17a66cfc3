//! Invocations that drive a tower from the run loop

use std::cell::RefCell;
use std::rc::Rc;

use crate::app::application::RunControl;
use crate::app::invocation::{Invocation, InvocationError};
use crate::core::config::SimulationConfig;
use crate::core::types::{Rectd, Seconds};
use crate::items::sprites::DrawList;
use crate::tower::Tower;

/// Fixed-timestep simulation tick
///
/// Every invocation advances the tower by one timestep and refreshes it; a
/// new day starts every `ticks_per_day` ticks.
pub struct SimulationDriver {
    tower: Rc<RefCell<Tower>>,
    timestep: Seconds,
    ticks_per_day: u64,
    ticks: u64,
    completed: usize,
}

impl SimulationDriver {
    pub fn new(tower: Rc<RefCell<Tower>>, config: &SimulationConfig) -> Self {
        Self {
            tower,
            timestep: config.fixed_timestep,
            ticks_per_day: config.ticks_per_day.max(1),
            ticks: 0,
            completed: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated time elapsed so far
    pub fn elapsed(&self) -> Seconds {
        self.ticks as f64 * self.timestep
    }

    /// Construction sites finished since the driver started
    pub fn completed(&self) -> usize {
        self.completed
    }
}

impl Invocation for SimulationDriver {
    fn invoke(&mut self, _control: &mut RunControl) -> Result<(), InvocationError> {
        let mut tower = self
            .tower
            .try_borrow_mut()
            .map_err(|_| InvocationError::Recoverable("tower is borrowed elsewhere".into()))?;

        self.completed += tower.advance(self.timestep).len();
        tower.update();
        self.ticks += 1;
        if self.ticks % self.ticks_per_day == 0 {
            let day = tower.advance_date();
            tracing::info!("Day {} after {} ticks", day, self.ticks);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "simulation"
    }
}

/// Collects the tower's sprite commands once per iteration
pub struct DrawDriver {
    tower: Rc<RefCell<Tower>>,
    visible: Option<Rectd>,
    frame: DrawList,
    frames: u64,
}

impl DrawDriver {
    /// Draw whatever intersects `visible`, or the whole tower if `None`
    pub fn new(tower: Rc<RefCell<Tower>>, visible: Option<Rectd>) -> Self {
        Self {
            tower,
            visible,
            frame: DrawList::new(),
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Commands produced by the most recent frame
    pub fn last_frame(&self) -> &DrawList {
        &self.frame
    }
}

impl Invocation for DrawDriver {
    fn invoke(&mut self, _control: &mut RunControl) -> Result<(), InvocationError> {
        let tower = self
            .tower
            .try_borrow()
            .map_err(|_| InvocationError::Recoverable("tower is being mutated".into()))?;

        let visible = self.visible.unwrap_or_else(|| tower.bounds());
        self.frame = tower.draw(&visible);
        self.frames += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "draw"
    }
}
