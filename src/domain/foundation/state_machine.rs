//! State machine trait for lifecycle status enums.

use std::fmt;

/// A rejected status change, carrying both ends for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition<S> {
    pub from: S,
    pub to: S,
}

impl<S: fmt::Debug> fmt::Display for InvalidTransition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot transition from {:?} to {:?}", self.from, self.to)
    }
}

impl<S: fmt::Debug> std::error::Error for InvalidTransition<S> {}

/// Trait for status enums that represent state machines.
///
/// Implementors list their edges once in `valid_transitions`; membership
/// checks and validated transitions derive from it.
pub trait StateMachine: Sized + Copy + PartialEq + fmt::Debug + 'static {
    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> &'static [Self];

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, InvalidTransition<Self>> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
