//! State machine trait for lifecycle status enums.
//!
//! Order and subscription statuses implement this so the reconciler can ask
//! one question of either: may the entity move from here to there?

use super::ValidationError;

/// A status enum whose allowed moves are fixed by a table.
///
/// `stage` gives the monotonic ordering: an allowed transition never lowers
/// the stage, and terminal states have no outgoing transitions at all.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if moving from self to target is allowed.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// All states reachable in one step from self.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Position in the lifecycle; higher is later.
    fn stage(&self) -> u8;

    /// Performs the transition or reports why it was refused.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Off,
        Warming,
        On,
        Burnt,
    }

    impl StateMachine for Light {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Light::*;
            match self {
                Off => vec![Warming, Burnt],
                Warming => vec![On, Burnt],
                On => vec![Burnt],
                Burnt => vec![],
            }
        }

        fn stage(&self) -> u8 {
            match self {
                Light::Off => 0,
                Light::Warming => 1,
                Light::On => 2,
                Light::Burnt => 3,
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_listed_target() {
        assert_eq!(Light::Off.transition_to(Light::Warming), Ok(Light::Warming));
    }

    #[test]
    fn transition_to_fails_for_unlisted_target() {
        assert!(Light::On.transition_to(Light::Off).is_err());
    }

    #[test]
    fn terminal_state_has_no_exits() {
        assert!(Light::Burnt.is_terminal());
        assert!(!Light::On.is_terminal());
    }

    #[test]
    fn allowed_transitions_never_lower_the_stage() {
        for state in [Light::Off, Light::Warming, Light::On, Light::Burnt] {
            for target in state.valid_transitions() {
                assert!(target.stage() >= state.stage(), "{:?} -> {:?}", state, target);
            }
        }
    }
}
