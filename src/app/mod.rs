//! Run loop, invocation scheduler and the invocations that drive a tower

pub mod application;
pub mod drivers;
pub mod invocation;
pub mod pump;

pub use application::{
    AppDelegate, AppError, AppHandle, Application, DefaultDelegate, Phase, RunControl, RunState,
    RunSummary, TerminateReply,
};
pub use drivers::{DrawDriver, SimulationDriver};
pub use invocation::{
    Invocation, InvocationError, InvocationHandle, InvocationList, Ordering, SchedulerError,
};
pub use pump::{AppEvent, EventPump, EventSender, PumpError, QueuedEventPump};
