//! The ordered list of phases.

use convention_core::shop::Event;

use super::address::AddressPhase;
use super::closed::ClosedPhase;
use super::confirm::ConfirmPhase;
use super::thanks::ThanksPhase;
use super::tickets::TicketsPhase;
use super::welcome::WelcomePhase;
use super::{Phase, PhaseName};

/// Where unconfirmed orders are sent when they reach an unavailable phase.
pub const FIRST_PHASE: PhaseName = PhaseName::Welcome;

/// Where confirmed orders are sent when they reach an unavailable phase.
pub const LAST_PHASE: PhaseName = PhaseName::Address;

/// Immutable wizard definition, built once at startup.
pub struct PhaseRegistry {
    phases: Vec<Box<dyn Phase>>,
    closed: ClosedPhase,
}

impl Default for PhaseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phases: vec![
                Box::new(WelcomePhase),
                Box::new(TicketsPhase),
                Box::new(AddressPhase),
                Box::new(ConfirmPhase),
                Box::new(ThanksPhase),
            ],
            closed: ClosedPhase,
        }
    }

    /// Phases in wizard order.
    pub fn phases(&self) -> impl Iterator<Item = &dyn Phase> {
        self.phases.iter().map(|phase| phase.as_ref())
    }

    /// Position of a phase in the wizard. The closed phase sits at 0.
    #[must_use]
    pub fn index_of(&self, name: PhaseName) -> usize {
        self.phases
            .iter()
            .position(|phase| phase.name() == name)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn get(&self, name: PhaseName) -> Option<&dyn Phase> {
        if name == PhaseName::Closed {
            return Some(&self.closed);
        }
        self.phases().find(|phase| phase.name() == name)
    }

    /// The phase that answers `name` for `event`.
    ///
    /// While ticket sales are closed every phase URL gets the closed phase.
    #[must_use]
    pub fn resolve(&self, name: PhaseName, event: &Event) -> Option<&dyn Phase> {
        if event.ticket_sales_open {
            self.get(name)
        } else {
            Some(&self.closed)
        }
    }
}
