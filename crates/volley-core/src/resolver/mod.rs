//! Resolvers turn plugin outputs into mutations of the next buffer.
//!
//! # Chain
//!
//! Resolvers run in a fixed order. Each one receives the outputs whose
//! kind it [`handles`](Resolver::handles) and picks the variants it owns.
//! A resolver may return follow-up outputs (a break caused by damage, a
//! death event); the loop wraps them in envelopes and makes them visible
//! to every resolver later in the chain.
//!
//! 1. [`ActionResolver`]: creates, updates and removes action entities
//! 2. [`DamageResolver`]: turns counted hits into health, torpidity and
//!    rage changes
//! 3. [`InterruptResolver`]: the break state machine
//! 4. [`MotionResolver`]: impacts, actor moves, knockback
//! 5. [`SpawnResolver`]: spawn tables at action trigger points
//! 6. [`EventResolver`]: records events for the host
//!
//! # Invariants
//!
//! - Given the same inputs and output order, a resolver produces the same
//!   mutations and follow-ups.
//! - Lookups of frozen state read `current`. Reads of `next` are limited
//!   to state written earlier in the same chain.

mod action;
mod damage;
mod event;
mod interrupt;
mod motion;
mod spawn;

pub use action::ActionResolver;
pub use damage::DamageResolver;
pub use event::EventResolver;
pub use interrupt::InterruptResolver;
pub use motion::MotionResolver;
pub use spawn::{dispatch, EventSink, SpawnResolver};

use crate::arena::Arena;
use crate::config::SimConfig;
use crate::definition::Definitions;
use crate::output::{Output, OutputEnvelope, OutputKind};
use crate::time::Time;

/// Tick-wide inputs shared by every resolver.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Tick being resolved
    pub tick: u64,
    /// Simulation time at the start of the tick
    pub now: Time,
    /// Tick length
    pub dt: Time,
    /// Master seed
    pub seed: u64,
    /// Static tables
    pub definitions: &'a Definitions,
    /// Simulation settings
    pub config: &'a SimConfig,
}

/// The write side of the tick.
///
/// # Example
///
/// ```
/// use volley_core::arena::Arena;
/// use volley_core::output::{Output, OutputEnvelope, OutputKind};
/// use volley_core::resolver::{ResolveContext, Resolver};
///
/// struct Noop;
///
/// impl Resolver for Noop {
///     fn name(&self) -> &'static str {
///         "noop"
///     }
///
///     fn handles(&self) -> &[OutputKind] {
///         &[OutputKind::Event]
///     }
///
///     fn resolve(
///         &self,
///         _ctx: &ResolveContext<'_>,
///         _outputs: &[&OutputEnvelope],
///         _current: &Arena,
///         _next: &mut Arena,
///     ) -> Vec<Output> {
///         Vec::new()
///     }
/// }
/// ```
pub trait Resolver: Send + Sync {
    /// Stable name, used as the plugin id of follow-up outputs.
    fn name(&self) -> &'static str;

    /// Output kinds routed to this resolver.
    fn handles(&self) -> &[OutputKind];

    /// Apply `outputs` to `next` and return follow-up outputs.
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        outputs: &[&OutputEnvelope],
        current: &Arena,
        next: &mut Arena,
    ) -> Vec<Output>;
}
