use crate::activity_key::{Activity, ActivityKey};

pub type EventIndex = usize;

/// The behavior graph of an uncertain trace: events with sets of candidate activities,
/// ordered by an acyclic precedence relation.
///
/// Implementations guarantee that the precedence relation is acyclic. Sequences are empty,
/// never absent, when an event has no predecessors or successors.
pub trait BehaviorGraph {
    /// The key in which the candidate activities of the events are expressed.
    fn activity_key(&self) -> &ActivityKey;

    /// All events with their candidate activities.
    fn nodes(&self) -> impl Iterator<Item = (EventIndex, &[Activity])> + '_;

    fn predecessors(&self, event: EventIndex) -> impl Iterator<Item = EventIndex> + '_;

    fn successors(&self, event: EventIndex) -> impl Iterator<Item = EventIndex> + '_;
}
