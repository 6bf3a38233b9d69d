use anyhow::{Result, anyhow};

use crate::{
    activity_key::Activity,
    error::BoundsError,
    objects::{
        alignment::{Alignment, Move},
        labelled_petri_net::LabelledPetriNet,
    },
    semantics::{semantics::Semantics, trace_semantics::TraceSemantics},
};

/// The costs of the moves of an alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AlignmentCosts {
    pub log_move: usize,
    pub model_move: usize,
    pub synchronous_move: usize,
    /// A silent transition of the model.
    pub silent_move: usize,
}

impl Default for AlignmentCosts {
    fn default() -> Self {
        Self {
            log_move: 10000,
            model_move: 10000,
            synchronous_move: 0,
            silent_move: 1,
        }
    }
}

/// Computes cost-optimal alignments against a reference model.
/// Both the model and the log side carry their own initial and final markings.
pub trait AlignmentOracle: Send + Sync {
    /// Aligns a concrete activity sequence against `model`.
    fn align_trace(&self, trace: &[Activity], model: &LabelledPetriNet) -> Result<Alignment>;

    /// Aligns the synchronous product of `model` and `trace_net`: the log side may follow any
    /// complete run of `trace_net`, and the oracle picks the run that aligns cheapest.
    fn align_trace_net(
        &self,
        model: &LabelledPetriNet,
        trace_net: &LabelledPetriNet,
    ) -> Result<Alignment>;
}

/// An alignment oracle that searches the synchronous product with A*, without heuristic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AStarOracle {
    costs: AlignmentCosts,
}

impl AStarOracle {
    pub fn new(costs: AlignmentCosts) -> Self {
        Self { costs }
    }

    pub fn get_costs(&self) -> &AlignmentCosts {
        &self.costs
    }
}

impl AlignmentOracle for AStarOracle {
    fn align_trace(&self, trace: &[Activity], model: &LabelledPetriNet) -> Result<Alignment> {
        align_product(&TraceSemantics::new(trace), model, &self.costs)
    }

    fn align_trace_net(
        &self,
        model: &LabelledPetriNet,
        trace_net: &LabelledPetriNet,
    ) -> Result<Alignment> {
        align_product(trace_net, model, &self.costs)
    }
}

/// The moves possible from a state of the synchronous product, with their costs.
/// Silent transitions of the log side are free and yield no move.
fn product_successors<L, M>(
    log: &L,
    model: &M,
    costs: &AlignmentCosts,
    (log_state, model_state): &(L::SemState, M::SemState),
) -> Result<Vec<((L::SemState, M::SemState), Option<Move>, usize)>>
where
    L: Semantics + ?Sized,
    M: Semantics + ?Sized,
{
    let mut result = vec![];

    let model_enabled = model.get_enabled_transitions(model_state);

    for log_transition in log.get_enabled_transitions(log_state) {
        let mut new_log_state = log_state.clone();
        log.execute_transition(&mut new_log_state, log_transition)?;

        match log.get_transition_activity(log_transition) {
            None => {
                result.push(((new_log_state, model_state.clone()), None, 0));
            }
            Some(activity) => {
                //log move
                result.push((
                    (new_log_state.clone(), model_state.clone()),
                    Some(Move::LogMove(activity)),
                    costs.log_move,
                ));

                //synchronous moves
                for model_transition in &model_enabled {
                    if model.get_transition_activity(*model_transition) == Some(activity) {
                        let mut new_model_state = model_state.clone();
                        model.execute_transition(&mut new_model_state, *model_transition)?;
                        result.push((
                            (new_log_state.clone(), new_model_state),
                            Some(Move::SynchronousMove(activity, *model_transition)),
                            costs.synchronous_move,
                        ));
                    }
                }
            }
        }
    }

    //model moves
    for model_transition in model_enabled {
        let mut new_model_state = model_state.clone();
        model.execute_transition(&mut new_model_state, model_transition)?;

        match model.get_transition_activity(model_transition) {
            None => result.push((
                (log_state.clone(), new_model_state),
                Some(Move::SilentMove(model_transition)),
                costs.silent_move,
            )),
            Some(activity) => result.push((
                (log_state.clone(), new_model_state),
                Some(Move::ModelMove(activity, model_transition)),
                costs.model_move,
            )),
        }
    }

    Ok(result)
}

/// Computes a cost-optimal alignment between the complete runs of `log` and `model`.
pub fn align_product<L, M>(log: &L, model: &M, costs: &AlignmentCosts) -> Result<Alignment>
where
    L: Semantics + ?Sized,
    M: Semantics + ?Sized,
{
    let start = match (log.get_initial_state(), model.get_initial_state()) {
        (Some(log_state), Some(model_state)) => (log_state, model_state),
        _ => {
            return Err(BoundsError::OracleFailure(
                "the log or the model has no initial state".to_string(),
            )
            .into());
        }
    };

    //errors cannot leave the search closure, so the first one is kept aside
    let mut error = None;
    let successors = |state: &(L::SemState, M::SemState)| {
        match product_successors(log, model, costs, state) {
            Ok(successors) => successors
                .into_iter()
                .map(|(state, _, cost)| (state, cost))
                .collect::<Vec<_>>(),
            Err(err) => {
                error.get_or_insert(err);
                vec![]
            }
        }
    };

    let heuristic = |_: &(L::SemState, M::SemState)| 0;

    let success = |(log_state, model_state): &(L::SemState, M::SemState)| {
        log.is_final_state(log_state) && model.is_final_state(model_state)
    };

    let result = pathfinding::prelude::astar(&start, successors, heuristic, success);

    if let Some(err) = error {
        return Err(err.context("searching the synchronous product"));
    }

    match result {
        Some((states, cost)) => {
            let moves = transform_alignment(log, model, costs, states)?;
            Ok(Alignment::new(moves, cost))
        }
        None => Err(BoundsError::OracleFailure(
            "no final state of the synchronous product is reachable".to_string(),
        )
        .into()),
    }
}

/// The A* search returns a sequence of states, while we need a sequence of moves.
/// Between two consecutive states, the cheapest move connecting them is the one the search took.
fn transform_alignment<L, M>(
    log: &L,
    model: &M,
    costs: &AlignmentCosts,
    states: Vec<(L::SemState, M::SemState)>,
) -> Result<Vec<Move>>
where
    L: Semantics + ?Sized,
    M: Semantics + ?Sized,
{
    let mut moves = vec![];

    for pair in states.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let step = product_successors(log, model, costs, from)?
            .into_iter()
            .filter(|(state, _, _)| state == to)
            .min_by_key(|(_, _, cost)| *cost)
            .ok_or_else(|| {
                anyhow!(
                    "there is no move that brings the product from ({}, {}) to ({}, {})",
                    from.0,
                    from.1,
                    to.0,
                    to.1
                )
            })?;

        if let Some(movee) = step.1 {
            moves.push(movee);
        }
    }

    Ok(moves)
}
