//! Invocation scheduler - recurring work performed once per run loop iteration

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::app::application::RunControl;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// Logged and reported to the delegate; the loop keeps running
    #[error("Recoverable failure: {0}")]
    Recoverable(String),

    /// Terminates the run loop
    #[error("Fatal failure: {0}")]
    Fatal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Anchor invocation '{0}' is not registered")]
    AnchorNotRegistered(String),

    #[error("Invocation '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Where a relative insertion lands next to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Before,
    After,
}

/// A unit of periodic work
pub trait Invocation {
    fn invoke(&mut self, control: &mut RunControl) -> Result<(), InvocationError>;

    /// Label used in logs and errors
    fn name(&self) -> &str {
        "invocation"
    }
}

struct FnInvocation<F> {
    name: String,
    f: F,
}

impl<F> Invocation for FnInvocation<F>
where
    F: FnMut(&mut RunControl) -> Result<(), InvocationError>,
{
    fn invoke(&mut self, control: &mut RunControl) -> Result<(), InvocationError> {
        (self.f)(control)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Shared handle to a registered invocation
///
/// The scheduler and the registrant each hold a clone. Identity is the
/// allocation, so two handles are the same invocation only if one was cloned
/// from the other. The name is captured on creation so it stays readable
/// while the invocation runs.
#[derive(Clone)]
pub struct InvocationHandle {
    inner: Rc<RefCell<dyn Invocation>>,
    name: Rc<str>,
}

impl InvocationHandle {
    pub fn new<I: Invocation + 'static>(invocation: I) -> Self {
        let name: Rc<str> = Rc::from(invocation.name());
        Self {
            inner: Rc::new(RefCell::new(invocation)),
            name,
        }
    }

    /// Wrap an invocation the registrant keeps typed access to
    pub fn from_shared<I: Invocation + 'static>(invocation: Rc<RefCell<I>>) -> Self {
        let name: Rc<str> = match invocation.try_borrow() {
            Ok(inv) => Rc::from(inv.name()),
            Err(_) => Rc::from("invocation"),
        };
        Self {
            inner: invocation,
            name,
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut RunControl) -> Result<(), InvocationError> + 'static,
    {
        Self::new(FnInvocation {
            name: name.into(),
            f,
        })
    }

    pub fn same(&self, other: &InvocationHandle) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }

    pub fn name(&self) -> String {
        self.name.to_string()
    }

    pub fn invoke(&self, control: &mut RunControl) -> Result<(), InvocationError> {
        let mut invocation = self.inner.try_borrow_mut().map_err(|_| {
            InvocationError::Recoverable("invocation re-entered while running".to_string())
        })?;
        invocation.invoke(control)
    }
}

impl std::fmt::Debug for InvocationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InvocationHandle").field(&self.name()).finish()
    }
}

/// Ordered list of registered invocations
#[derive(Debug, Default)]
pub struct InvocationList {
    entries: Vec<InvocationHandle>,
}

impl InvocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, invocation: &InvocationHandle) -> Option<usize> {
        self.entries.iter().position(|e| e.same(invocation))
    }

    pub fn contains(&self, invocation: &InvocationHandle) -> bool {
        self.position(invocation).is_some()
    }

    /// Append at the end
    pub fn add(&mut self, invocation: InvocationHandle) -> Result<(), SchedulerError> {
        if self.contains(&invocation) {
            return Err(SchedulerError::AlreadyRegistered(invocation.name()));
        }
        self.entries.push(invocation);
        Ok(())
    }

    /// Insert directly before or after `anchor`
    pub fn add_relative(
        &mut self,
        invocation: InvocationHandle,
        ordering: Ordering,
        anchor: &InvocationHandle,
    ) -> Result<(), SchedulerError> {
        if self.contains(&invocation) {
            return Err(SchedulerError::AlreadyRegistered(invocation.name()));
        }
        let index = self
            .position(anchor)
            .ok_or_else(|| SchedulerError::AnchorNotRegistered(anchor.name()))?;
        let index = match ordering {
            Ordering::Before => index,
            Ordering::After => index + 1,
        };
        self.entries.insert(index, invocation);
        Ok(())
    }

    /// Remove by identity; returns false if it was not registered
    pub fn remove(&mut self, invocation: &InvocationHandle) -> bool {
        match self.position(invocation) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Copy of the current order, used to drive one pass
    pub fn snapshot(&self) -> Vec<InvocationHandle> {
        self.entries.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InvocationHandle> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> InvocationHandle {
        InvocationHandle::from_fn(name, |_| Ok(()))
    }

    fn names(list: &InvocationList) -> Vec<String> {
        list.iter().map(|h| h.name()).collect()
    }

    #[test]
    fn test_add_appends() {
        let mut list = InvocationList::new();
        list.add(noop("a")).unwrap();
        list.add(noop("b")).unwrap();
        assert_eq!(names(&list), vec!["a", "b"]);
    }

    #[test]
    fn test_relative_insertion() {
        let mut list = InvocationList::new();
        let a = noop("a");
        let c = noop("c");
        list.add(a.clone()).unwrap();
        list.add(c.clone()).unwrap();
        list.add_relative(noop("b"), Ordering::After, &a).unwrap();
        list.add_relative(noop("first"), Ordering::Before, &a).unwrap();
        list.add_relative(noop("last"), Ordering::After, &c).unwrap();
        assert_eq!(names(&list), vec!["first", "a", "b", "c", "last"]);
    }

    #[test]
    fn test_missing_anchor_reported() {
        let mut list = InvocationList::new();
        let ghost = noop("ghost");
        let err = list.add_relative(noop("x"), Ordering::Before, &ghost).unwrap_err();
        assert_eq!(err, SchedulerError::AnchorNotRegistered("ghost".into()));
        assert!(list.is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut list = InvocationList::new();
        let a = noop("a");
        list.add(a.clone()).unwrap();
        assert_eq!(list.add(a.clone()), Err(SchedulerError::AlreadyRegistered("a".into())));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_identity_not_name() {
        let mut list = InvocationList::new();
        let a1 = noop("a");
        let a2 = noop("a");
        list.add(a1.clone()).unwrap();
        assert!(!list.contains(&a2));
        assert!(!list.remove(&a2));
        assert!(list.remove(&a1));
        assert!(!list.remove(&a1));
    }

    #[test]
    fn test_name_readable_while_running() {
        let own: Rc<RefCell<Option<InvocationHandle>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&own);
        let handle = InvocationHandle::from_fn("ticker", move |control| {
            let me = slot.borrow().clone().ok_or_else(|| {
                InvocationError::Fatal("missing self".into())
            })?;
            match control.add_invocation(me) {
                Err(SchedulerError::AlreadyRegistered(name)) if name == "ticker" => Ok(()),
                other => Err(InvocationError::Fatal(format!("{:?}", other))),
            }
        });
        *own.borrow_mut() = Some(handle.clone());

        let mut control = RunControl::new();
        control.add_invocation(handle.clone()).unwrap();
        assert_eq!(handle.invoke(&mut control), Ok(()));
        own.borrow_mut().take();
    }
}
