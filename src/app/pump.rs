//! Event pump - feeds queued application events into the run loop

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use thiserror::Error;

use crate::app::application::RunControl;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PumpError {
    #[error("Recoverable pump failure: {0}")]
    Recoverable(String),

    #[error("Fatal pump failure: {0}")]
    Fatal(String),
}

/// Events understood by the run loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Request termination
    Quit,
    /// Application-defined event
    Named(String),
}

/// Called once per iteration; returns the number of events handled
pub trait EventPump {
    fn pump_events(&mut self, control: &mut RunControl) -> Result<usize, PumpError>;
}

type EventQueue = Rc<RefCell<VecDeque<AppEvent>>>;
type NamedHandler = Box<dyn FnMut(&str, &mut RunControl) -> Result<(), PumpError>>;

/// Cloneable producer side of a `QueuedEventPump`
#[derive(Clone, Debug)]
pub struct EventSender {
    queue: EventQueue,
}

impl EventSender {
    pub fn send(&self, event: AppEvent) {
        self.queue.borrow_mut().push_back(event);
    }

    pub fn quit(&self) {
        self.send(AppEvent::Quit);
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

/// Pump draining a shared queue
///
/// Events sent while a pump pass is running are handled on the next pass.
#[derive(Default)]
pub struct QueuedEventPump {
    queue: EventQueue,
    on_named: Option<NamedHandler>,
}

impl QueuedEventPump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            queue: Rc::clone(&self.queue),
        }
    }

    /// Handler for `AppEvent::Named`; unhandled names are only logged
    pub fn on_named<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str, &mut RunControl) -> Result<(), PumpError> + 'static,
    {
        self.on_named = Some(Box::new(handler));
        self
    }
}

impl QueuedEventPump {
    fn handle(&mut self, event: AppEvent, control: &mut RunControl) -> Result<(), PumpError> {
        match event {
            AppEvent::Quit => {
                tracing::debug!("Quit event on iteration {}", control.iteration());
                control.terminate();
            }
            AppEvent::Named(name) => match self.on_named.as_mut() {
                Some(handler) => handler(&name, control)?,
                None => tracing::debug!("Unhandled event '{}'", name),
            },
        }
        Ok(())
    }
}

impl EventPump for QueuedEventPump {
    fn pump_events(&mut self, control: &mut RunControl) -> Result<usize, PumpError> {
        let mut batch: VecDeque<AppEvent> = self.queue.borrow_mut().drain(..).collect();
        let mut handled = 0;
        while let Some(event) = batch.pop_front() {
            if let Err(e) = self.handle(event, control) {
                // The failing event is dropped, the rest wait for the next pass
                let mut queue = self.queue.borrow_mut();
                while let Some(rest) = batch.pop_back() {
                    queue.push_front(rest);
                }
                return Err(e);
            }
            handled += 1;
        }
        Ok(handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_requests_termination() {
        let mut pump = QueuedEventPump::new();
        let sender = pump.sender();
        let mut control = RunControl::new();

        assert_eq!(pump.pump_events(&mut control).unwrap(), 0);
        assert!(!control.termination_requested());

        sender.send(AppEvent::Named("tick".into()));
        sender.quit();
        assert_eq!(sender.pending(), 2);
        assert_eq!(pump.pump_events(&mut control).unwrap(), 2);
        assert!(control.termination_requested());
        assert_eq!(sender.pending(), 0);
    }

    #[test]
    fn test_named_handler_errors_propagate() {
        let mut pump = QueuedEventPump::new()
            .on_named(|name, _| Err(PumpError::Recoverable(format!("bad event {}", name))));
        let sender = pump.sender();
        sender.send(AppEvent::Named("boom".into()));
        sender.quit();
        let mut control = RunControl::new();
        let err = pump.pump_events(&mut control).unwrap_err();
        assert_eq!(err, PumpError::Recoverable("bad event boom".into()));

        // The quit queued behind the failing event survives for the next pass
        assert_eq!(sender.pending(), 1);
        assert_eq!(pump.pump_events(&mut control).unwrap(), 1);
        assert!(control.termination_requested());
    }
}
