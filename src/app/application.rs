//! Application run loop
//!
//! Each iteration pumps events, then performs every registered invocation
//! once in list order. Termination is cooperative: `terminate()` records a
//! request, and at the end of the iteration the delegate answers it once.
//! A `Now` or `Later` answer commits the loop to exiting; only a fresh
//! `run()` starts it again.

use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;

use crate::app::invocation::{
    InvocationError, InvocationHandle, InvocationList, Ordering, SchedulerError,
};
use crate::app::pump::{EventPump, PumpError, QueuedEventPump};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    NotRunning,
    Running,
    TerminatingNow,
    TerminatingLater,
}

/// Delegate answer to a termination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateReply {
    /// Keep running
    Cancel,
    /// Do not start another iteration
    Now,
    /// Let the current iteration finish, then stop
    Later,
}

/// Phase of an iteration in which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    PumpEvents,
    Invocations,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::PumpEvents => write!(f, "event pump"),
            Phase::Invocations => write!(f, "invocations"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Fatal failure in {phase}: {message}")]
    Fatal { phase: Phase, message: String },

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

#[derive(Debug)]
struct LoopFlags {
    state: Cell<RunState>,
    termination_requested: Cell<bool>,
}

/// Cloneable view of a loop for code that does not own the `Application`
///
/// Bootstrap code keeps one to ask whether the loop is running and to
/// request termination while `run()` holds the application.
#[derive(Debug, Clone)]
pub struct AppHandle {
    flags: Rc<LoopFlags>,
}

impl AppHandle {
    pub fn state(&self) -> RunState {
        self.flags.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() != RunState::NotRunning
    }

    /// Record a termination request; ignored while the loop is not running
    pub fn terminate(&self) {
        if self.is_running() {
            self.flags.termination_requested.set(true);
        } else {
            tracing::debug!("terminate() outside run() ignored");
        }
    }
}

/// Loop state shared with hooks, the event pump and invocations
#[derive(Debug)]
pub struct RunControl {
    flags: Rc<LoopFlags>,
    iteration: u64,
    invocations: InvocationList,
}

impl RunControl {
    pub fn new() -> Self {
        Self {
            flags: Rc::new(LoopFlags {
                state: Cell::new(RunState::NotRunning),
                termination_requested: Cell::new(false),
            }),
            iteration: 0,
            invocations: InvocationList::new(),
        }
    }

    /// Ask the loop to stop at the end of the current iteration
    pub fn terminate(&mut self) {
        self.flags.termination_requested.set(true);
    }

    pub fn termination_requested(&self) -> bool {
        self.flags.termination_requested.get()
    }

    pub fn state(&self) -> RunState {
        self.flags.state.get()
    }

    /// Zero-based index of the current iteration
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn handle(&self) -> AppHandle {
        AppHandle {
            flags: Rc::clone(&self.flags),
        }
    }

    pub fn add_invocation(&mut self, invocation: InvocationHandle) -> Result<(), SchedulerError> {
        self.invocations.add(invocation)
    }

    pub fn add_invocation_relative(
        &mut self,
        invocation: InvocationHandle,
        ordering: Ordering,
        anchor: &InvocationHandle,
    ) -> Result<(), SchedulerError> {
        self.invocations.add_relative(invocation, ordering, anchor)
    }

    /// Removal takes effect immediately, including for the pass in progress
    pub fn remove_invocation(&mut self, invocation: &InvocationHandle) -> bool {
        self.invocations.remove(invocation)
    }

    pub fn invocations(&self) -> &InvocationList {
        &self.invocations
    }

    fn set_state(&self, state: RunState) {
        self.flags.state.set(state);
    }

    fn clear_request(&self) {
        self.flags.termination_requested.set(false);
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Hooks around each step of the run loop; every hook defaults to doing nothing
#[allow(unused_variables)]
pub trait AppDelegate {
    fn will_run(&mut self, control: &mut RunControl) {}
    fn will_iterate_run_loop(&mut self, control: &mut RunControl) {}
    fn will_pump_events(&mut self, control: &mut RunControl) {}
    fn did_pump_events(&mut self, control: &mut RunControl) {}
    fn will_perform_invocations(&mut self, control: &mut RunControl) {}
    fn did_perform_invocations(&mut self, control: &mut RunControl) {}
    fn did_iterate_run_loop(&mut self, control: &mut RunControl) {}
    fn did_run(&mut self, control: &mut RunControl) {}

    /// Answer to a pending termination request, asked once per iteration
    fn should_terminate(&mut self, control: &RunControl) -> TerminateReply {
        TerminateReply::Now
    }

    /// A recoverable failure was contained
    fn iteration_failed(&mut self, control: &mut RunControl, phase: Phase, message: &str) {}
}

/// Delegate with every hook left at its default
#[derive(Debug, Default)]
pub struct DefaultDelegate;

impl AppDelegate for DefaultDelegate {}

/// Totals for one call to `Application::run`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub iterations: u64,
    pub contained_failures: u64,
}

pub struct Application {
    control: RunControl,
    pump: Box<dyn EventPump>,
    delegate: Box<dyn AppDelegate>,
    contained_failures: u64,
}

impl Application {
    pub fn new(pump: Box<dyn EventPump>) -> Self {
        Self::with_delegate(pump, Box::new(DefaultDelegate))
    }

    pub fn with_delegate(pump: Box<dyn EventPump>, delegate: Box<dyn AppDelegate>) -> Self {
        Self {
            control: RunControl::new(),
            pump,
            delegate,
            contained_failures: 0,
        }
    }

    /// Handle that stays usable while `run()` borrows the application
    pub fn handle(&self) -> AppHandle {
        self.control.handle()
    }

    pub fn state(&self) -> RunState {
        self.control.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() != RunState::NotRunning
    }

    pub fn is_terminating(&self) -> bool {
        matches!(
            self.state(),
            RunState::TerminatingNow | RunState::TerminatingLater
        )
    }

    /// Record a termination request; ignored while the loop is not running
    pub fn terminate(&self) {
        self.handle().terminate();
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    pub fn add_invocation(&mut self, invocation: InvocationHandle) -> Result<(), AppError> {
        Ok(self.control.add_invocation(invocation)?)
    }

    pub fn add_invocation_relative(
        &mut self,
        invocation: InvocationHandle,
        ordering: Ordering,
        anchor: &InvocationHandle,
    ) -> Result<(), AppError> {
        Ok(self
            .control
            .add_invocation_relative(invocation, ordering, anchor)?)
    }

    pub fn remove_invocation(&mut self, invocation: &InvocationHandle) -> bool {
        self.control.remove_invocation(invocation)
    }

    /// Run until terminated
    ///
    /// Recoverable failures are logged, reported to the delegate and counted;
    /// a fatal failure stops the loop and is returned after `did_run`.
    pub fn run(&mut self) -> Result<RunSummary, AppError> {
        self.control.set_state(RunState::Running);
        self.control.clear_request();
        self.control.iteration = 0;
        self.contained_failures = 0;
        tracing::info!("Run loop starting with {} invocations", self.control.invocations.len());

        self.delegate.will_run(&mut self.control);
        let mut outcome = Ok(());
        loop {
            if let Err(e) = self.iterate() {
                tracing::error!("{}", e);
                outcome = Err(e);
                break;
            }
            let exit = self.at_boundary();
            self.control.iteration += 1;
            if exit {
                break;
            }
        }

        self.control.clear_request();
        self.delegate.did_run(&mut self.control);
        self.control.set_state(RunState::NotRunning);

        let summary = RunSummary {
            iterations: self.control.iteration,
            contained_failures: self.contained_failures,
        };
        tracing::info!(
            "Run loop stopped after {} iterations ({} contained failures)",
            summary.iterations,
            summary.contained_failures
        );
        outcome.map(|_| summary)
    }

    fn iterate(&mut self) -> Result<(), AppError> {
        self.delegate.will_iterate_run_loop(&mut self.control);

        self.delegate.will_pump_events(&mut self.control);
        self.pump_events()?;
        self.delegate.did_pump_events(&mut self.control);

        self.delegate.will_perform_invocations(&mut self.control);
        self.perform_invocations()?;
        self.delegate.did_perform_invocations(&mut self.control);

        self.delegate.did_iterate_run_loop(&mut self.control);
        Ok(())
    }

    /// Answer a pending request once; true when the loop must exit
    fn at_boundary(&mut self) -> bool {
        if !self.control.termination_requested() {
            return false;
        }
        match self.delegate.should_terminate(&self.control) {
            TerminateReply::Cancel => {
                tracing::debug!("Termination rescinded after iteration {}", self.control.iteration);
                self.control.clear_request();
                false
            }
            TerminateReply::Now => {
                self.control.set_state(RunState::TerminatingNow);
                true
            }
            TerminateReply::Later => {
                self.control.set_state(RunState::TerminatingLater);
                true
            }
        }
    }

    /// Drain the event pump once
    pub fn pump_events(&mut self) -> Result<usize, AppError> {
        match self.pump.pump_events(&mut self.control) {
            Ok(count) => Ok(count),
            Err(PumpError::Recoverable(message)) => {
                self.contain(Phase::PumpEvents, &message);
                Ok(0)
            }
            Err(PumpError::Fatal(message)) => Err(AppError::Fatal {
                phase: Phase::PumpEvents,
                message,
            }),
        }
    }

    /// Perform every registered invocation once, in list order
    ///
    /// The pass walks a snapshot of the list. Entries removed during the pass
    /// are skipped, entries added during the pass first run on the next one.
    pub fn perform_invocations(&mut self) -> Result<(), AppError> {
        for invocation in self.control.invocations.snapshot() {
            if !self.control.invocations.contains(&invocation) {
                tracing::trace!("Skipping removed invocation {:?}", invocation);
                continue;
            }
            match invocation.invoke(&mut self.control) {
                Ok(()) => {}
                Err(InvocationError::Recoverable(message)) => {
                    let message = format!("{}: {}", invocation.name(), message);
                    self.contain(Phase::Invocations, &message);
                }
                Err(InvocationError::Fatal(message)) => {
                    return Err(AppError::Fatal {
                        phase: Phase::Invocations,
                        message: format!("{}: {}", invocation.name(), message),
                    });
                }
            }
        }
        Ok(())
    }

    fn contain(&mut self, phase: Phase, message: &str) {
        tracing::warn!(
            "Contained failure in {} on iteration {}: {}",
            phase,
            self.control.iteration,
            message
        );
        self.contained_failures += 1;
        self.delegate.iteration_failed(&mut self.control, phase, message);
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new(Box::new(QueuedEventPump::new()))
    }
}
