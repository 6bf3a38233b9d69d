use anyhow::{Result, anyhow};

use crate::{
    activity_key::Activity, semantics::semantics::Semantics,
    traits::process_graph::TransitionIndex,
};

/// A concrete activity sequence as a model: state `i` means that the first `i` activities have
/// been executed, and transition `i` executes the activity at position `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceSemantics<'a> {
    trace: &'a [Activity],
}

impl<'a> TraceSemantics<'a> {
    pub fn new(trace: &'a [Activity]) -> Self {
        Self { trace }
    }
}

impl Semantics for TraceSemantics<'_> {
    type SemState = usize;

    fn get_initial_state(&self) -> Option<usize> {
        Some(0)
    }

    fn execute_transition(&self, state: &mut usize, transition: TransitionIndex) -> Result<()> {
        if transition != *state || transition >= self.trace.len() {
            return Err(anyhow!(
                "transition {} is not enabled in state {}",
                transition,
                state
            ));
        }
        *state += 1;
        Ok(())
    }

    fn is_final_state(&self, state: &usize) -> bool {
        *state == self.trace.len()
    }

    fn is_transition_silent(&self, _transition: TransitionIndex) -> bool {
        false
    }

    fn get_transition_activity(&self, transition: TransitionIndex) -> Option<Activity> {
        self.trace.get(transition).copied()
    }

    fn get_enabled_transitions(&self, state: &usize) -> Vec<TransitionIndex> {
        if *state < self.trace.len() {
            vec![*state]
        } else {
            vec![]
        }
    }

    fn get_number_of_transitions(&self) -> usize {
        self.trace.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        activity_key::ActivityKey,
        semantics::{semantics::Semantics, trace_semantics::TraceSemantics},
    };

    #[test]
    fn trace_semantics_walk() {
        let mut key = ActivityKey::new();
        let trace = key.process_trace_ref(&["a", "b"]);
        let semantics = TraceSemantics::new(&trace);

        let mut state = semantics.get_initial_state().unwrap();
        assert_eq!(semantics.get_enabled_transitions(&state), vec![0]);
        assert!(semantics.execute_transition(&mut state, 1).is_err());
        semantics.execute_transition(&mut state, 0).unwrap();
        assert_eq!(semantics.get_transition_activity(1), Some(trace[1]));
        semantics.execute_transition(&mut state, 1).unwrap();
        assert!(semantics.is_final_state(&state));
        assert!(semantics.get_enabled_transitions(&state).is_empty());
    }
}
