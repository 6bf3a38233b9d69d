use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;

use crate::{
    activity_key::{Activity, ActivityKey, ActivityKeyTranslator},
    error::BoundsError,
    marking::Marking,
    objects::labelled_petri_net::LabelledPetriNet,
    traits::{
        behavior_graph::{BehaviorGraph, EventIndex},
        process_graph::{PlaceIndex, ProcessGraph, TransitionIndex},
    },
};

/// The stable key of a place generated for a behavior net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BehaviorPlace {
    /// Holds the token of the initial marking.
    Source,
    /// Holds the token of the final marking.
    Sink,
    /// Between `t_source` and the transitions of an event without predecessors.
    FromSource(EventIndex),
    /// Between the transitions of two events of a precedence.
    Precedence(EventIndex, EventIndex),
    /// Between the transitions of an event without successors and `t_sink`.
    ToSink(EventIndex),
    /// Between `t_source` and `t_sink` when the trace has no events.
    Bypass,
}

/// The stable key of a transition generated for a behavior net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BehaviorTransition {
    Source,
    Sink,
    /// Executing an event with one of its candidate activities.
    Label(EventIndex, Activity),
}

/// Maps the keys of a behavior net to the places and transitions that were generated for them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BehaviorNetIndex {
    places: IndexMap<BehaviorPlace, PlaceIndex>,
    transitions: IndexMap<BehaviorTransition, TransitionIndex>,
}

impl BehaviorNetIndex {
    pub fn get_place(&self, place: &BehaviorPlace) -> Option<PlaceIndex> {
        self.places.get(place).copied()
    }

    pub fn get_transition(&self, transition: &BehaviorTransition) -> Option<TransitionIndex> {
        self.transitions.get(transition).copied()
    }

    /// The label transitions of `event`, in the order of its candidate activities.
    pub fn get_event_transitions(&self, event: EventIndex) -> Vec<TransitionIndex> {
        self.transitions
            .iter()
            .filter_map(|(key, transition)| match key {
                BehaviorTransition::Label(e, _) if *e == event => Some(*transition),
                _ => None,
            })
            .collect()
    }

    pub fn places(&self) -> impl Iterator<Item = (&BehaviorPlace, &PlaceIndex)> {
        self.places.iter()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (&BehaviorTransition, &TransitionIndex)> {
        self.transitions.iter()
    }

    fn add_place<G: ProcessGraph>(&mut self, net: &mut G, key: BehaviorPlace) -> PlaceIndex {
        *self.places.entry(key).or_insert_with(|| net.add_place())
    }

    fn add_transition<G: ProcessGraph>(
        &mut self,
        net: &mut G,
        key: BehaviorTransition,
        label: Option<Activity>,
    ) -> TransitionIndex {
        *self
            .transitions
            .entry(key)
            .or_insert_with(|| net.add_transition(label))
    }
}

fn transitions_of(
    event2transitions: &IndexMap<EventIndex, Vec<TransitionIndex>>,
    event: EventIndex,
) -> Result<&[TransitionIndex]> {
    match event2transitions.get(&event) {
        Some(transitions) => Ok(transitions),
        None => Err(BoundsError::InvalidTraceGraph(format!(
            "non-existing event {} referenced",
            event
        ))
        .into()),
    }
}

/// Builds the behavior net of `graph` into `net`, which is expected to be empty.
///
/// Every complete firing sequence from the initial marking (a token in the source place) to the
/// final marking (a token in the sink place) executes exactly one label transition per event,
/// respecting the precedences of `graph`. Events are processed in ascending index, so the
/// generated places and transitions do not depend on the iteration order of `graph`.
///
/// The precedence relation of `graph` must be acyclic; this is not checked here.
pub fn build_behavior_net<G, B>(graph: &B, net: &mut G) -> Result<BehaviorNetIndex>
where
    G: ProcessGraph,
    B: BehaviorGraph,
{
    let translator = ActivityKeyTranslator::new(graph.activity_key(), net.activity_key_mut());
    let mut index = BehaviorNetIndex::default();

    let mut nodes = vec![];
    for (event, labels) in graph.nodes() {
        let mut translated: Vec<Activity> = vec![];
        for activity in labels {
            let activity = translator.translate_activity(activity).ok_or_else(|| {
                BoundsError::InvalidTraceGraph(format!(
                    "event {} has activity {} that is not in the activity key of the trace",
                    event, activity
                ))
            })?;
            //a repeated label would double the arc weights of its transition
            if !translated.contains(&activity) {
                translated.push(activity);
            }
        }
        nodes.push((event, translated));
    }
    nodes.sort_by_key(|(event, _)| *event);
    log::debug!("build behavior net of {} events", nodes.len());

    //bracket the net with a source and a sink
    let source = index.add_place(net, BehaviorPlace::Source);
    let t_source = index.add_transition(net, BehaviorTransition::Source, None);
    net.add_place_transition_arc(source, t_source, 1)?;

    let sink = index.add_place(net, BehaviorPlace::Sink);
    let t_sink = index.add_transition(net, BehaviorTransition::Sink, None);
    net.add_transition_place_arc(t_sink, sink, 1)?;

    //one transition per event and candidate activity
    let mut event2transitions: IndexMap<EventIndex, Vec<TransitionIndex>> = IndexMap::new();
    for (event, labels) in &nodes {
        if labels.is_empty() {
            return Err(BoundsError::InvalidTraceGraph(format!(
                "event {} has no candidate activities",
                event
            ))
            .into());
        }
        let transitions = labels
            .iter()
            .map(|activity| {
                index.add_transition(
                    net,
                    BehaviorTransition::Label(*event, *activity),
                    Some(*activity),
                )
            })
            .collect::<Vec<_>>();
        if event2transitions.insert(*event, transitions).is_some() {
            return Err(BoundsError::InvalidTraceGraph(format!(
                "event {} occurs more than once",
                event
            ))
            .into());
        }
    }

    for (event_from, _) in &nodes {
        let from_transitions = transitions_of(&event2transitions, *event_from)?;

        if graph.predecessors(*event_from).next().is_none() {
            let place = index.add_place(net, BehaviorPlace::FromSource(*event_from));
            net.add_transition_place_arc(t_source, place, 1)?;
            for transition in from_transitions {
                net.add_place_transition_arc(place, *transition, 1)?;
            }
        }

        let mut successors = graph.successors(*event_from).collect::<Vec<_>>();
        successors.sort_unstable();
        successors.dedup();
        for event_to in successors {
            let to_transitions = transitions_of(&event2transitions, event_to)
                .with_context(|| format!("successor of event {}", event_from))?;
            let place = index.add_place(net, BehaviorPlace::Precedence(*event_from, event_to));
            for transition in from_transitions {
                net.add_transition_place_arc(*transition, place, 1)?;
            }
            for transition in to_transitions {
                net.add_place_transition_arc(place, *transition, 1)?;
            }
        }

        if graph.successors(*event_from).next().is_none() {
            let place = index.add_place(net, BehaviorPlace::ToSink(*event_from));
            for transition in from_transitions {
                net.add_transition_place_arc(*transition, place, 1)?;
            }
            net.add_place_transition_arc(place, t_sink, 1)?;
        }
    }

    if nodes.is_empty() {
        let place = index.add_place(net, BehaviorPlace::Bypass);
        net.add_transition_place_arc(t_source, place, 1)?;
        net.add_place_transition_arc(place, t_sink, 1)?;
    }

    let mut initial_marking = Marking::new(net.get_number_of_places());
    initial_marking.increase(source, 1)?;
    net.set_initial_marking(initial_marking)?;

    let mut final_marking = Marking::new(net.get_number_of_places());
    final_marking.increase(sink, 1)?;
    net.set_final_marking(final_marking)?;

    Ok(index)
}

/// The behavior net of an uncertain trace: an acyclic labelled Petri net of which the complete
/// runs are exactly the realisations of the trace.
#[derive(Clone, Debug)]
pub struct BehaviorNet {
    net: LabelledPetriNet,
    index: BehaviorNetIndex,
}

impl BehaviorNet {
    /// Builds the behavior net of `graph`. The net uses `activity_key`, extended with the
    /// activities of `graph`; pass the key of the reference model to make activities comparable.
    pub fn build<B: BehaviorGraph>(graph: &B, activity_key: ActivityKey) -> Result<Self> {
        let mut net = LabelledPetriNet::new_with_activity_key(activity_key);
        let index = build_behavior_net(graph, &mut net)?;
        Ok(Self { net, index })
    }

    pub fn get_net(&self) -> &LabelledPetriNet {
        &self.net
    }

    pub fn get_index(&self) -> &BehaviorNetIndex {
        &self.index
    }

    pub fn activity_key(&self) -> &ActivityKey {
        self.net.activity_key()
    }

    pub fn get_place(&self, place: &BehaviorPlace) -> Result<PlaceIndex> {
        self.index
            .get_place(place)
            .ok_or_else(|| anyhow!("behavior net has no place {:?}", place))
    }

    pub fn get_transition(&self, transition: &BehaviorTransition) -> Result<TransitionIndex> {
        self.index
            .get_transition(transition)
            .ok_or_else(|| anyhow!("behavior net has no transition {:?}", transition))
    }
}

impl From<BehaviorNet> for LabelledPetriNet {
    fn from(value: BehaviorNet) -> Self {
        value.net
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        activity_key::{Activity, ActivityKey},
        error::{BoundsError, bounds_error},
        objects::{labelled_petri_net::LabelledPetriNet, uncertain_event_log::UncertainEventLog},
        semantics::semantics::Semantics,
        techniques::realisations::EnumerateRealisations,
        techniques::behavior_net::{
            BehaviorNet, BehaviorPlace, BehaviorTransition, build_behavior_net,
        },
        traits::{
            behavior_graph::{BehaviorGraph, EventIndex},
            process_graph::ProcessGraph,
        },
    };

    /// A behavior graph that lists its events backwards and does not validate anything.
    struct RawGraph {
        activity_key: ActivityKey,
        events: Vec<Vec<Activity>>,
        edges: Vec<(EventIndex, EventIndex)>,
    }

    impl BehaviorGraph for RawGraph {
        fn activity_key(&self) -> &ActivityKey {
            &self.activity_key
        }

        fn nodes(&self) -> impl Iterator<Item = (EventIndex, &[Activity])> + '_ {
            self.events
                .iter()
                .enumerate()
                .rev()
                .map(|(event, labels)| (event, labels.as_slice()))
        }

        fn predecessors(&self, event: EventIndex) -> impl Iterator<Item = EventIndex> + '_ {
            self.edges
                .iter()
                .filter(move |(_, to)| *to == event)
                .map(|(from, _)| *from)
        }

        fn successors(&self, event: EventIndex) -> impl Iterator<Item = EventIndex> + '_ {
            self.edges
                .iter()
                .filter(move |(from, _)| *from == event)
                .map(|(_, to)| *to)
        }
    }

    fn log_a_bc() -> UncertainEventLog {
        let mut log = UncertainEventLog::new();
        log.add_trace(&[&["a"], &["b", "c"]], &[(0, 1)]).unwrap();
        log
    }

    #[test]
    fn behavior_net_structure() {
        let log = log_a_bc();
        let graph = log.get_behavior_graph(0).unwrap();
        let net = BehaviorNet::build(&graph, ActivityKey::new()).unwrap();
        let lpn = net.get_net();

        //source, sink, from source of 0, precedence 0 -> 1, to sink of 1
        assert_eq!(lpn.get_number_of_places(), 5);
        //t_source, t_sink, a, b, c
        assert_eq!(lpn.get_number_of_transitions(), 5);

        let precedence = net.get_place(&BehaviorPlace::Precedence(0, 1)).unwrap();
        let a = lpn.activity_key().get_activity("a").unwrap();
        let b = lpn.activity_key().get_activity("b").unwrap();
        let c = lpn.activity_key().get_activity("c").unwrap();
        let t_a = net.get_transition(&BehaviorTransition::Label(0, a)).unwrap();
        let t_b = net.get_transition(&BehaviorTransition::Label(1, b)).unwrap();
        let t_c = net.get_transition(&BehaviorTransition::Label(1, c)).unwrap();

        assert_eq!(lpn.get_input_transitions(precedence), vec![t_a]);
        assert_eq!(lpn.get_output_transitions(precedence), &[t_b, t_c]);
        assert_eq!(net.get_index().get_event_transitions(1), vec![t_b, t_c]);

        let source = net.get_place(&BehaviorPlace::Source).unwrap();
        let sink = net.get_place(&BehaviorPlace::Sink).unwrap();
        assert_eq!(lpn.get_initial_marking().get_place2token()[source], 1);
        assert_eq!(lpn.get_final_marking().unwrap().get_place2token()[sink], 1);
        assert!(net.get_place(&BehaviorPlace::FromSource(1)).is_err());
        assert!(net.get_place(&BehaviorPlace::ToSink(0)).is_err());
    }

    #[test]
    fn behavior_net_one_place_per_source_and_sink_event() {
        let mut log = UncertainEventLog::new();
        log.add_trace(&[&["x", "z"], &["y"]], &[]).unwrap();
        let graph = log.get_behavior_graph(0).unwrap();
        let net = BehaviorNet::build(&graph, ActivityKey::new()).unwrap();
        let lpn = net.get_net();

        let t_source = net.get_transition(&BehaviorTransition::Source).unwrap();
        let t_sink = net.get_transition(&BehaviorTransition::Sink).unwrap();
        let from_source = net.get_place(&BehaviorPlace::FromSource(0)).unwrap();
        let to_sink = net.get_place(&BehaviorPlace::ToSink(0)).unwrap();

        assert_eq!(lpn.get_output_places(t_source).len(), 2);
        assert_eq!(lpn.get_input_places(t_sink).len(), 2);
        assert_eq!(lpn.get_output_transitions(from_source).len(), 2);
        assert_eq!(lpn.get_input_transitions(to_sink).len(), 2);
    }

    #[test]
    fn behavior_net_idempotent() {
        let log = log_a_bc();
        let graph = log.get_behavior_graph(0).unwrap();
        let net1 = BehaviorNet::build(&graph, ActivityKey::new()).unwrap();
        let net2 = BehaviorNet::build(&graph, ActivityKey::new()).unwrap();

        assert_eq!(net1.get_net().to_string(), net2.get_net().to_string());
        assert_eq!(net1.get_index(), net2.get_index());
    }

    #[test]
    fn behavior_net_independent_of_node_order() {
        let log = log_a_bc();
        let graph = log.get_behavior_graph(0).unwrap();
        let net1 = BehaviorNet::build(&graph, ActivityKey::new()).unwrap();

        let mut activity_key = ActivityKey::new();
        let events = vec![
            activity_key.process_trace_ref(&["a"]),
            activity_key.process_trace_ref(&["b", "c"]),
        ];
        let raw = RawGraph {
            activity_key,
            events,
            edges: vec![(0, 1)],
        };
        let net2 = BehaviorNet::build(&raw, ActivityKey::new()).unwrap();

        assert_eq!(net1.get_net().to_string(), net2.get_net().to_string());
    }

    #[test]
    fn behavior_net_empty_trace() {
        let mut log = UncertainEventLog::new();
        log.add_trace(&[], &[]).unwrap();
        let graph = log.get_behavior_graph(0).unwrap();
        let net = BehaviorNet::build(&graph, ActivityKey::new()).unwrap();
        let lpn = net.get_net();

        assert_eq!(lpn.get_number_of_places(), 3);
        assert_eq!(lpn.get_number_of_transitions(), 2);

        let t_source = net.get_transition(&BehaviorTransition::Source).unwrap();
        let t_sink = net.get_transition(&BehaviorTransition::Sink).unwrap();
        let mut state = lpn.get_initial_state().unwrap();
        assert_eq!(lpn.get_enabled_transitions(&state), vec![t_source]);
        lpn.execute_transition(&mut state, t_source).unwrap();
        assert_eq!(lpn.get_enabled_transitions(&state), vec![t_sink]);
        lpn.execute_transition(&mut state, t_sink).unwrap();
        assert!(lpn.is_final_state(&state));
    }

    #[test]
    fn behavior_net_uses_given_activity_key() {
        let model = std::fs::read_to_string("testfiles/a-b.lpn")
            .unwrap()
            .parse::<LabelledPetriNet>()
            .unwrap();
        let log = log_a_bc();
        let graph = log.get_behavior_graph(0).unwrap();
        let net = BehaviorNet::build(&graph, model.activity_key().clone()).unwrap();

        let a = model.activity_key().get_activity("a").unwrap();
        assert!(net.get_transition(&BehaviorTransition::Label(0, a)).is_ok());
        assert_eq!(net.activity_key().get_number_of_activities(), 3);
    }

    #[test]
    fn behavior_net_into_any_process_graph() {
        let log = log_a_bc();
        let graph = log.get_behavior_graph(0).unwrap();
        let mut lpn = LabelledPetriNet::new();
        let index = build_behavior_net(&graph, &mut lpn).unwrap();
        assert_eq!(index.places().count(), lpn.get_number_of_places());
        assert_eq!(index.transitions().count(), lpn.get_number_of_transitions());
    }

    #[test]
    fn behavior_net_rejects_malformed_graph() {
        let mut activity_key = ActivityKey::new();
        let a = activity_key.process_activity("a");
        let raw = RawGraph {
            activity_key: activity_key.clone(),
            events: vec![vec![a], vec![]],
            edges: vec![],
        };
        let err = BehaviorNet::build(&raw, ActivityKey::new()).unwrap_err();
        assert!(matches!(
            bounds_error(&err),
            Some(BoundsError::InvalidTraceGraph(_))
        ));

        let raw = RawGraph {
            activity_key,
            events: vec![vec![a]],
            edges: vec![(0, 4)],
        };
        let err = BehaviorNet::build(&raw, ActivityKey::new()).unwrap_err();
        assert!(matches!(
            bounds_error(&err),
            Some(BoundsError::InvalidTraceGraph(_))
        ));
    }

    #[test]
    fn behavior_net_repeated_labels() {
        let mut activity_key = ActivityKey::new();
        let a = activity_key.process_activity("a");
        let b = activity_key.process_activity("b");
        let raw = RawGraph {
            activity_key,
            events: vec![vec![a, b, a]],
            edges: vec![],
        };
        let net = BehaviorNet::build(&raw, ActivityKey::new()).unwrap();
        let lpn = net.get_net();

        //t_source, t_sink, a, b
        assert_eq!(lpn.get_number_of_transitions(), 4);
        assert_eq!(net.get_index().get_event_transitions(0).len(), 2);

        let realisations = lpn
            .realisations()
            .map(|realisation| {
                net.activity_key()
                    .deprocess_trace(&realisation.unwrap())
                    .into_iter()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        assert_eq!(
            realisations,
            vec![vec!["a".to_string()], vec!["b".to_string()]]
        );
    }

    #[test]
    fn behavior_net_rejects_foreign_activity() {
        let mut other_key = ActivityKey::new();
        let foreign = other_key.process_trace_ref(&["x", "y", "z"])[2];

        let mut activity_key = ActivityKey::new();
        activity_key.process_activity("a");
        let raw = RawGraph {
            activity_key,
            events: vec![vec![foreign]],
            edges: vec![],
        };
        let err = BehaviorNet::build(&raw, ActivityKey::new()).unwrap_err();
        assert!(matches!(
            bounds_error(&err),
            Some(BoundsError::InvalidTraceGraph(_))
        ));
    }
}
