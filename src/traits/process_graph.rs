use anyhow::Result;

use crate::{activity_key::{Activity, ActivityKey}, marking::Marking};

pub type PlaceIndex = usize;
pub type TransitionIndex = usize;

/// The graph-editing capabilities that net constructions rely on.
///
/// Places and transitions are identified by the dense indices handed out by
/// [`ProcessGraph::add_place`] and [`ProcessGraph::add_transition`], in creation order.
pub trait ProcessGraph {
    fn add_place(&mut self) -> PlaceIndex;

    /// Adds a transition; `None` creates a silent transition.
    fn add_transition(&mut self, label: Option<Activity>) -> TransitionIndex;

    fn add_place_transition_arc(
        &mut self,
        from_place: PlaceIndex,
        to_transition: TransitionIndex,
        cardinality: u64,
    ) -> Result<()>;

    fn add_transition_place_arc(
        &mut self,
        from_transition: TransitionIndex,
        to_place: PlaceIndex,
        cardinality: u64,
    ) -> Result<()>;

    fn get_number_of_places(&self) -> usize;

    fn get_number_of_transitions(&self) -> usize;

    fn get_initial_marking(&self) -> &Marking;

    /// Fails if the marking does not cover exactly the places of the graph.
    fn set_initial_marking(&mut self, marking: Marking) -> Result<()>;

    /// `None` means that every deadlock is final.
    fn get_final_marking(&self) -> Option<&Marking>;

    /// Fails if the marking does not cover exactly the places of the graph.
    fn set_final_marking(&mut self, marking: Marking) -> Result<()>;

    fn activity_key(&self) -> &ActivityKey;

    fn activity_key_mut(&mut self) -> &mut ActivityKey;
}
