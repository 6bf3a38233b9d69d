use anyhow::Result;
use rustc_hash::FxHashSet;

use crate::{activity_key::Activity, semantics::semantics::Semantics};

/// Lazily enumerates the distinct activity sequences of the complete runs of a semantics:
/// the runs from the initial state to a final state. Silent transitions do not contribute an
/// activity; dead ends that are not final are not runs.
///
/// The semantics must be acyclic, otherwise the enumeration does not terminate.
pub struct Realisations<'a, S: Semantics + ?Sized> {
    semantics: &'a S,
    stack: Vec<(S::SemState, Vec<Activity>)>,
    visited: FxHashSet<(S::SemState, Vec<Activity>)>,
    seen: FxHashSet<Vec<Activity>>,
}

impl<'a, S: Semantics + ?Sized> Realisations<'a, S> {
    pub fn new(semantics: &'a S) -> Self {
        let stack = match semantics.get_initial_state() {
            Some(initial_state) => vec![(initial_state, vec![])],
            None => vec![],
        };
        Self {
            semantics,
            stack,
            visited: FxHashSet::default(),
            seen: FxHashSet::default(),
        }
    }
}

impl<S: Semantics + ?Sized> Iterator for Realisations<'_, S> {
    type Item = Result<Vec<Activity>>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((state, prefix)) = self.stack.pop() {
            if self.semantics.is_final_state(&state) {
                if self.seen.insert(prefix.clone()) {
                    return Some(Ok(prefix));
                }
                continue;
            }

            //push in reverse, such that lower transitions are explored first
            for transition in self.semantics.get_enabled_transitions(&state).into_iter().rev() {
                let mut new_state = state.clone();
                if let Err(err) = self.semantics.execute_transition(&mut new_state, transition) {
                    self.stack.clear();
                    return Some(Err(err));
                }

                let mut new_prefix = prefix.clone();
                if let Some(activity) = self.semantics.get_transition_activity(transition) {
                    new_prefix.push(activity);
                }

                if self.visited.insert((new_state.clone(), new_prefix.clone())) {
                    self.stack.push((new_state, new_prefix));
                }
            }
        }
        None
    }
}

pub trait EnumerateRealisations {
    type Sem: Semantics + ?Sized;

    /// Starts a fresh enumeration of the realisations; calling this again restarts from scratch.
    fn realisations(&self) -> Realisations<'_, Self::Sem>;
}

impl<T: Semantics> EnumerateRealisations for T {
    type Sem = T;

    fn realisations(&self) -> Realisations<'_, T> {
        Realisations::new(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::{
        activity_key::ActivityKey,
        objects::{labelled_petri_net::LabelledPetriNet, uncertain_event_log::UncertainEventLog},
        techniques::{behavior_net::BehaviorNet, realisations::EnumerateRealisations},
        traits::process_graph::ProcessGraph,
    };

    fn realisations_of(log: &UncertainEventLog, trace_index: usize) -> HashSet<Vec<String>> {
        let graph = log.get_behavior_graph(trace_index).unwrap();
        let net = BehaviorNet::build(&graph, ActivityKey::new()).unwrap();
        net.get_net()
            .realisations()
            .map(|realisation| {
                net.activity_key()
                    .deprocess_trace(&realisation.unwrap())
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }

    fn set(traces: &[&[&str]]) -> HashSet<Vec<String>> {
        traces
            .iter()
            .map(|trace| trace.iter().map(|a| a.to_string()).collect())
            .collect()
    }

    #[test]
    fn realisations_label_uncertainty() {
        let mut log = UncertainEventLog::new();
        log.add_trace(&[&["a"], &["b", "c"]], &[(0, 1)]).unwrap();

        assert_eq!(realisations_of(&log, 0), set(&[&["a", "b"], &["a", "c"]]));
    }

    #[test]
    fn realisations_order_uncertainty() {
        let mut log = UncertainEventLog::new();
        log.add_trace(&[&["x"], &["y"]], &[]).unwrap();

        assert_eq!(realisations_of(&log, 0), set(&[&["x", "y"], &["y", "x"]]));
    }

    #[test]
    fn realisations_count() {
        let mut log = UncertainEventLog::new();
        //three unordered events: 3! linear extensions times 2 * 1 * 1 labels
        log.add_trace(&[&["a", "b"], &["c"], &["d"]], &[]).unwrap();
        //a chain: 1 linear extension times 2 * 2 labels
        log.add_trace(&[&["a", "b"], &["c", "d"]], &[(0, 1)]).unwrap();
        //a diamond: 2 linear extensions times 1 * 2 * 1 * 1 labels
        log.add_trace(
            &[&["a"], &["b", "c"], &["d"], &["e"]],
            &[(0, 1), (0, 2), (1, 3), (2, 3)],
        )
        .unwrap();

        assert_eq!(realisations_of(&log, 0).len(), 12);
        assert_eq!(realisations_of(&log, 1).len(), 4);
        assert_eq!(realisations_of(&log, 2).len(), 4);
        assert!(
            realisations_of(&log, 2)
                .iter()
                .all(|trace| trace.first().unwrap() == "a" && trace.last().unwrap() == "e")
        );
    }

    #[test]
    fn realisations_certain_trace() {
        let mut log = UncertainEventLog::new();
        log.add_trace(&[&["a"], &["b"], &["c"]], &[(0, 1), (1, 2)])
            .unwrap();

        assert_eq!(realisations_of(&log, 0), set(&[&["a", "b", "c"]]));
    }

    #[test]
    fn realisations_empty_trace() {
        let mut log = UncertainEventLog::new();
        log.add_trace(&[], &[]).unwrap();

        assert_eq!(realisations_of(&log, 0), set(&[&[]]));
    }

    #[test]
    fn realisations_deduplicated() {
        let mut log = UncertainEventLog::new();
        log.add_trace(&[&["a"], &["a"]], &[]).unwrap();

        assert_eq!(realisations_of(&log, 0), set(&[&["a", "a"]]));
    }

    #[test]
    fn realisations_restartable() {
        let mut log = UncertainEventLog::new();
        log.add_trace(&[&["x"], &["y", "z"]], &[]).unwrap();
        let graph = log.get_behavior_graph(0).unwrap();
        let net = BehaviorNet::build(&graph, ActivityKey::new()).unwrap();

        let first = net.get_net().realisations().collect::<Vec<_>>();
        let second = net.get_net().realisations().collect::<Vec<_>>();
        assert_eq!(first.len(), 4);
        assert_eq!(
            first.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>(),
            second.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn realisations_of_model() {
        let model = std::fs::read_to_string("testfiles/a-tau.lpn")
            .unwrap()
            .parse::<LabelledPetriNet>()
            .unwrap();
        let realisations = model
            .realisations()
            .map(|r| r.unwrap())
            .collect::<Vec<_>>();
        assert_eq!(realisations.len(), 1);
        assert_eq!(model.activity_key().deprocess_trace(&realisations[0]), vec!["a"]);
    }
}
