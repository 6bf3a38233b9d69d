use anyhow::Result;
use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

use crate::{activity_key::Activity, traits::process_graph::TransitionIndex};

pub trait Displayable: Hash + Clone + Eq + Display + Debug + Send + Sync {}

impl Displayable for usize {}

pub trait Semantics: Debug + Send + Sync {
    type SemState: Displayable;

    /// Returns the initial state, if it exists.
    /// If it does not exist, then the language is empty.
    fn get_initial_state(&self) -> Option<Self::SemState>;

    /// Update the state to reflect execution of `transition`.
    /// Returns an error when `transition` is not enabled, or when the marking cannot be represented.
    fn execute_transition(&self, state: &mut Self::SemState, transition: TransitionIndex) -> Result<()>;

    /// Returns whether the current state is a final state.
    /// Where the object declares no final state explicitly, its deadlocks are final.
    fn is_final_state(&self, state: &Self::SemState) -> bool;

    fn is_transition_silent(&self, transition: TransitionIndex) -> bool;

    fn get_transition_activity(&self, transition: TransitionIndex) -> Option<Activity>;

    /// Returns the enabled transitions in `state`, in ascending order.
    fn get_enabled_transitions(&self, state: &Self::SemState) -> Vec<TransitionIndex>;

    fn get_number_of_transitions(&self) -> usize;
}
