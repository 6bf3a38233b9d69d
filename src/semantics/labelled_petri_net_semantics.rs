use std::{
    fmt::{Debug, Display, Formatter},
    hash::Hasher,
};

use anyhow::{Context, anyhow};
use bitvec::{bitvec, vec::BitVec};

use crate::{
    activity_key::Activity,
    marking::Marking,
    objects::labelled_petri_net::LabelledPetriNet,
    semantics::semantics::{Displayable, Semantics},
    traits::process_graph::TransitionIndex,
};

/// Whether every input place of `transition` holds at least the weight of its arc.
fn has_concession(lpn: &LabelledPetriNet, marking: &Marking, transition: TransitionIndex) -> bool {
    lpn.transition2input_places[transition]
        .iter()
        .zip(&lpn.transition2input_places_cardinality[transition])
        .all(|(place, weight)| marking.place2token[*place] >= *weight)
}

fn update_enabled_transition(
    lpn: &LabelledPetriNet,
    state: &mut LPNMarking,
    transition: TransitionIndex,
) {
    let enabled = has_concession(lpn, &state.marking, transition);
    if enabled != state.enabled_transitions[transition] {
        state.enabled_transitions.set(transition, enabled);
        if enabled {
            state.number_of_enabled_transitions += 1;
        } else {
            state.number_of_enabled_transitions -= 1;
        }
    }
}

pub(crate) fn refresh_enabled_transitions(lpn: &LabelledPetriNet, state: &mut LPNMarking) {
    state.number_of_enabled_transitions = 0;
    state.enabled_transitions.fill(false);
    for transition in 0..lpn.get_number_of_transitions() {
        update_enabled_transition(lpn, state, transition);
    }
}

impl Semantics for LabelledPetriNet {
    type SemState = LPNMarking;

    fn is_final_state(&self, state: &LPNMarking) -> bool {
        match &self.final_marking {
            Some(final_marking) => &state.marking == final_marking,
            None => state.number_of_enabled_transitions == 0,
        }
    }

    fn get_initial_state(&self) -> Option<LPNMarking> {
        let mut result = LPNMarking {
            marking: self.initial_marking.clone(),
            enabled_transitions: bitvec![0; self.get_number_of_transitions()],
            number_of_enabled_transitions: 0,
        };
        refresh_enabled_transitions(self, &mut result);

        Some(result)
    }

    fn execute_transition(
        &self,
        state: &mut LPNMarking,
        transition: TransitionIndex,
    ) -> anyhow::Result<()> {
        if transition >= self.get_number_of_transitions() {
            return Err(anyhow!("transition {} does not exist", transition));
        }
        if !state.enabled_transitions[transition] {
            return Err(anyhow!("transition {} is not enabled", transition));
        }

        let consumed = self.transition2input_places[transition]
            .iter()
            .zip(&self.transition2input_places_cardinality[transition]);
        for (place, weight) in consumed {
            state
                .marking
                .decrease(*place, *weight)
                .with_context(|| format!("consuming for transition {}", transition))?;
        }

        let produced = self.transition2output_places[transition]
            .iter()
            .zip(&self.transition2output_places_cardinality[transition]);
        for (place, weight) in produced {
            state
                .marking
                .increase(*place, *weight)
                .with_context(|| format!("producing for transition {}", transition))?;
        }

        //only consumers of touched places can change enabledness
        let touched = self.transition2input_places[transition]
            .iter()
            .chain(&self.transition2output_places[transition]);
        for place in touched {
            for consumer in &self.place2output_transitions[*place] {
                update_enabled_transition(self, state, *consumer);
            }
        }

        Ok(())
    }

    fn get_enabled_transitions(&self, state: &LPNMarking) -> Vec<TransitionIndex> {
        let mut result = Vec::with_capacity(state.number_of_enabled_transitions);
        result.extend(state.enabled_transitions.iter_ones());
        result
    }

    fn is_transition_silent(&self, transition: TransitionIndex) -> bool {
        self.labels[transition].is_none()
    }

    fn get_transition_activity(&self, transition: TransitionIndex) -> Option<Activity> {
        self.labels[transition]
    }

    fn get_number_of_transitions(&self) -> usize {
        LabelledPetriNet::get_number_of_transitions(self)
    }
}

#[derive(Clone)]
pub struct LPNMarking {
    pub(crate) marking: Marking,
    pub(crate) enabled_transitions: BitVec,
    pub(crate) number_of_enabled_transitions: usize,
}

impl LPNMarking {
    pub fn get_marking(&self) -> &Marking {
        &self.marking
    }
}

impl Displayable for LPNMarking {}

impl Eq for LPNMarking {}

impl std::hash::Hash for LPNMarking {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.marking.hash(state);
    }
}

impl PartialEq for LPNMarking {
    fn eq(&self, other: &Self) -> bool {
        self.marking == other.marking
    }
}

impl Display for LPNMarking {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.marking)
    }
}

impl Debug for LPNMarking {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.marking)
    }
}
