use anyhow::{Context, Error, Result, anyhow};
use std::{
    collections::VecDeque,
    fmt,
    io::{self, BufRead},
    str::FromStr,
};

use crate::{
    activity_key::{Activity, ActivityKey},
    error::BoundsError,
    line_reader::LineReader,
    traits::behavior_graph::{BehaviorGraph, EventIndex},
};

pub const HEADER: &str = "uncertain event log";

//counts in a file are not trusted to size allocations
const MAX_RESERVE: usize = 1024;

/// A trace of which the activities and the order of the events are only partially known.
/// Each event carries a set of candidate activities; the events are ordered by an acyclic
/// precedence relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UncertainTrace {
    events: Vec<Vec<Activity>>,
    successors: Vec<Vec<EventIndex>>,
    predecessors: Vec<Vec<EventIndex>>,
}

impl UncertainTrace {
    /// Creates a trace from the candidate activities of its events and precedence pairs `(before, after)`.
    ///
    /// Fails with [`BoundsError::InvalidTraceGraph`] if an event has no candidates, if a pair
    /// references an unknown event or if the precedence relation contains a cycle.
    pub fn new(events: Vec<Vec<Activity>>, precedences: Vec<(EventIndex, EventIndex)>) -> Result<Self> {
        let mut events = events;
        for (event, labels) in events.iter_mut().enumerate() {
            if labels.is_empty() {
                return Err(BoundsError::InvalidTraceGraph(format!(
                    "event {} has no candidate activities",
                    event
                ))
                .into());
            }
            let mut seen = vec![];
            labels.retain(|activity| {
                if seen.contains(activity) {
                    false
                } else {
                    seen.push(*activity);
                    true
                }
            });
        }

        let mut successors = vec![vec![]; events.len()];
        let mut predecessors = vec![vec![]; events.len()];
        for (from, to) in precedences {
            if from >= events.len() || to >= events.len() {
                return Err(BoundsError::InvalidTraceGraph(format!(
                    "precedence {} -> {} references a non-existing event, while there are {}",
                    from,
                    to,
                    events.len()
                ))
                .into());
            }
            if from == to {
                return Err(BoundsError::InvalidTraceGraph(format!(
                    "event {} cannot precede itself",
                    from
                ))
                .into());
            }
            if !successors[from].contains(&to) {
                successors[from].push(to);
                predecessors[to].push(from);
            }
        }
        successors.iter_mut().for_each(|list| list.sort_unstable());
        predecessors.iter_mut().for_each(|list| list.sort_unstable());

        let result = Self {
            events,
            successors,
            predecessors,
        };

        if result.topological_order().is_none() {
            return Err(BoundsError::InvalidTraceGraph(
                "the precedence relation contains a cycle".to_string(),
            )
            .into());
        }

        Ok(result)
    }

    pub fn number_of_events(&self) -> usize {
        self.events.len()
    }

    pub fn get_event(&self, event: EventIndex) -> Option<&[Activity]> {
        self.events.get(event).map(Vec::as_slice)
    }

    pub fn get_successors(&self, event: EventIndex) -> &[EventIndex] {
        &self.successors[event]
    }

    pub fn get_predecessors(&self, event: EventIndex) -> &[EventIndex] {
        &self.predecessors[event]
    }

    pub fn number_of_precedences(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    pub fn is_certain(&self) -> bool {
        self.events.iter().all(|labels| labels.len() == 1)
            && self.topological_order().is_some_and(|order| {
                order
                    .windows(2)
                    .all(|pair| self.successors[pair[0]].contains(&pair[1]))
            })
    }

    /// Kahn's algorithm; `None` if the precedence relation is cyclic.
    pub fn topological_order(&self) -> Option<Vec<EventIndex>> {
        let mut in_degree = self
            .predecessors
            .iter()
            .map(Vec::len)
            .collect::<Vec<_>>();
        let mut queue = (0..self.events.len())
            .filter(|event| in_degree[*event] == 0)
            .collect::<VecDeque<_>>();

        let mut result = Vec::with_capacity(self.events.len());
        while let Some(event) = queue.pop_front() {
            result.push(event);
            for successor in &self.successors[event] {
                in_degree[*successor] -= 1;
                if in_degree[*successor] == 0 {
                    queue.push_back(*successor);
                }
            }
        }

        if result.len() == self.events.len() {
            Some(result)
        } else {
            None
        }
    }
}

/// The behavior graph view on a trace, with the activity key of its log.
#[derive(Clone, Copy, Debug)]
pub struct TraceBehaviorGraph<'a> {
    trace: &'a UncertainTrace,
    activity_key: &'a ActivityKey,
}

impl<'a> TraceBehaviorGraph<'a> {
    pub fn new(trace: &'a UncertainTrace, activity_key: &'a ActivityKey) -> Self {
        Self {
            trace,
            activity_key,
        }
    }

    pub fn get_trace(&self) -> &UncertainTrace {
        self.trace
    }
}

impl BehaviorGraph for TraceBehaviorGraph<'_> {
    fn activity_key(&self) -> &ActivityKey {
        self.activity_key
    }

    fn nodes(&self) -> impl Iterator<Item = (EventIndex, &[Activity])> + '_ {
        self.trace
            .events
            .iter()
            .enumerate()
            .map(|(event, labels)| (event, labels.as_slice()))
    }

    fn predecessors(&self, event: EventIndex) -> impl Iterator<Item = EventIndex> + '_ {
        self.trace.predecessors[event].iter().copied()
    }

    fn successors(&self, event: EventIndex) -> impl Iterator<Item = EventIndex> + '_ {
        self.trace.successors[event].iter().copied()
    }
}

#[derive(Clone, Debug, Default)]
pub struct UncertainEventLog {
    activity_key: ActivityKey,
    traces: Vec<UncertainTrace>,
}

impl UncertainEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number_of_traces(&self) -> usize {
        self.traces.len()
    }

    pub fn get_trace(&self, trace_index: usize) -> Option<&UncertainTrace> {
        self.traces.get(trace_index)
    }

    pub fn get_behavior_graph(&self, trace_index: usize) -> Option<TraceBehaviorGraph<'_>> {
        self.traces
            .get(trace_index)
            .map(|trace| TraceBehaviorGraph::new(trace, &self.activity_key))
    }

    pub fn iter(&self) -> impl Iterator<Item = TraceBehaviorGraph<'_>> + '_ {
        self.traces
            .iter()
            .map(|trace| TraceBehaviorGraph::new(trace, &self.activity_key))
    }

    pub fn activity_key(&self) -> &ActivityKey {
        &self.activity_key
    }

    pub fn activity_key_mut(&mut self) -> &mut ActivityKey {
        &mut self.activity_key
    }

    /// Appends a trace of which the activities belong to the activity key of this log.
    pub fn push_trace(&mut self, trace: UncertainTrace) -> Result<()> {
        if let Some(activity) = trace
            .events
            .iter()
            .flatten()
            .find(|activity| !self.activity_key.contains(activity))
        {
            return Err(anyhow!(
                "activity {} of the trace is not in the activity key of the log",
                activity
            ));
        }
        self.traces.push(trace);
        Ok(())
    }

    /// Appends a trace given by the candidate labels of its events and its precedences.
    pub fn add_trace(
        &mut self,
        events: &[&[&str]],
        precedences: &[(EventIndex, EventIndex)],
    ) -> Result<()> {
        let events = events
            .iter()
            .map(|labels| self.activity_key.process_trace_ref(labels))
            .collect();
        let trace = UncertainTrace::new(events, precedences.to_vec())?;
        self.traces.push(trace);
        Ok(())
    }

    pub fn import(reader: &mut dyn BufRead) -> Result<Self> {
        let mut lreader = LineReader::new(reader);

        let head = lreader
            .next_line_string()
            .with_context(|| format!("failed to read header, which should be {}", HEADER))?;
        if head != HEADER {
            return Err(anyhow!(
                "first line should be exactly `{}`, but found `{}` on line `{}`",
                HEADER,
                lreader.get_last_line(),
                lreader.get_last_line_number()
            ));
        }

        let mut result = Self::new();

        let number_of_traces = lreader
            .next_line_index()
            .context("failed to read number of traces")?;

        for trace_index in 0..number_of_traces {
            let number_of_events = lreader.next_line_index().with_context(|| {
                format!("failed to read number of events of trace {}", trace_index)
            })?;

            let mut events = Vec::with_capacity(number_of_events.min(MAX_RESERVE));
            for event in 0..number_of_events {
                let number_of_labels = lreader.next_line_index().with_context(|| {
                    format!(
                        "failed to read number of labels of event {} of trace {}",
                        event, trace_index
                    )
                })?;

                let mut labels = Vec::with_capacity(number_of_labels.min(MAX_RESERVE));
                for l in 0..number_of_labels {
                    let label_line = lreader.next_line_string().with_context(|| {
                        format!(
                            "failed to read label {} of event {} of trace {}",
                            l, event, trace_index
                        )
                    })?;
                    match label_line.trim_start().strip_prefix("label ") {
                        Some(label) => labels.push(result.activity_key.process_activity(label)),
                        None => {
                            return Err(anyhow!(
                                "expected `label <activity>` at line {}; found `{}`",
                                lreader.get_last_line_number(),
                                lreader.get_last_line()
                            ));
                        }
                    }
                }
                events.push(labels);
            }

            let number_of_precedences = lreader.next_line_index().with_context(|| {
                format!(
                    "failed to read number of precedences of trace {}",
                    trace_index
                )
            })?;
            let mut precedences = Vec::with_capacity(number_of_precedences.min(MAX_RESERVE));
            for p in 0..number_of_precedences {
                precedences.push(lreader.next_line_index_pair().with_context(|| {
                    format!("failed to read precedence {} of trace {}", p, trace_index)
                })?);
            }

            let line_number = lreader.get_last_line_number();
            let trace = UncertainTrace::new(events, precedences).with_context(|| {
                format!("trace {} ending at line {}", trace_index, line_number)
            })?;
            result.traces.push(trace);
        }

        Ok(result)
    }
}

impl fmt::Display for UncertainEventLog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", HEADER)?;
        writeln!(f, "# number of traces\n{}", self.traces.len())?;

        for (trace_index, trace) in self.traces.iter().enumerate() {
            writeln!(f, "# trace {}", trace_index)?;
            writeln!(f, "# number of events\n{}", trace.number_of_events())?;
            for (event, labels) in trace.events.iter().enumerate() {
                writeln!(f, "# event {}", event)?;
                writeln!(f, "# number of labels\n{}", labels.len())?;
                for activity in labels {
                    writeln!(f, "label {}", self.activity_key.get_activity_label(activity))?;
                }
            }
            writeln!(
                f,
                "# number of precedences\n{}",
                trace.number_of_precedences()
            )?;
            for (from, successors) in trace.successors.iter().enumerate() {
                for to in successors {
                    writeln!(f, "{} {}", from, to)?;
                }
            }
        }

        write!(f, "")
    }
}

impl FromStr for UncertainEventLog {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut reader = io::Cursor::new(s);
        Self::import(&mut reader)
    }
}
