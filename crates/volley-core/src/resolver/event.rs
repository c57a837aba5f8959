//! Event recorder.
//!
//! Collects every event of the tick, plugin outputs and resolver
//! follow-ups alike, in resolution order. The host drains the log with
//! [`EventResolver::take_events`]. State is never touched.

use std::sync::{Mutex, PoisonError};

use crate::arena::Arena;
use crate::output::{Output, OutputEnvelope, OutputKind};

use super::{ResolveContext, Resolver};

/// Records event outputs for the host.
///
/// ```
/// use volley_core::output::OutputKind;
/// use volley_core::resolver::{EventResolver, Resolver};
///
/// let resolver = EventResolver::new();
/// assert!(resolver.handles().contains(&OutputKind::Event));
/// assert!(resolver.take_events().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct EventResolver {
    log: Mutex<Vec<OutputEnvelope>>,
}

impl EventResolver {
    /// Create a resolver with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
        }
    }

    /// Drain the log in recording order.
    pub fn take_events(&self) -> Vec<OutputEnvelope> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *log)
    }

    /// Number of recorded events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    /// Drop every recorded event.
    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Resolver for EventResolver {
    fn name(&self) -> &'static str {
        "event"
    }

    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Event]
    }

    fn resolve(
        &self,
        _ctx: &ResolveContext<'_>,
        outputs: &[&OutputEnvelope],
        _current: &Arena,
        _next: &mut Arena,
    ) -> Vec<Output> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.extend(
            outputs
                .iter()
                .filter(|e| e.kind() == OutputKind::Event)
                .map(|e| (*e).clone()),
        );
        Vec::new()
    }
}
