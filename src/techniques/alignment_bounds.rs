use anyhow::{Context, Result};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::fmt;

use crate::{
    activity_key::{ActivityKey, ActivityKeyTranslator},
    command::get_progress_bar_ticks,
    error::BoundsError,
    objects::{
        alignment::Alignment, labelled_petri_net::LabelledPetriNet,
        uncertain_event_log::UncertainEventLog,
    },
    techniques::{
        align::AlignmentOracle, behavior_net::BehaviorNet, realisations::EnumerateRealisations,
    },
    traits::{behavior_graph::BehaviorGraph, process_graph::ProcessGraph},
};

pub const HEADER: &str = "alignment bounds";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundsParameters {
    /// Stop enumerating realisations for the upper bound once an alignment of at least this cost is found.
    pub cost_ceiling: Option<usize>,
}

/// The optimistic and pessimistic conformance of an uncertain trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceBounds {
    pub lower: Alignment,
    pub upper: Alignment,
    /// The number of realisations that were aligned for the upper bound.
    pub number_of_realisations: usize,
}

/// Computes the lower bound on the conformance cost of all realisations of a behavior net,
/// by aligning the synchronous product of the net and the model.
pub fn alignment_lower_bound<O>(
    behavior_net: &BehaviorNet,
    model: &LabelledPetriNet,
    oracle: &O,
) -> Result<Alignment>
where
    O: AlignmentOracle + ?Sized,
{
    log::debug!(
        "lower bound of a behavior net with {} transitions",
        behavior_net.get_net().get_number_of_transitions()
    );
    oracle.align_trace_net(model, behavior_net.get_net())
}

/// Computes the upper bound on the conformance cost of all realisations of a behavior net,
/// by aligning each realisation and keeping the most expensive alignment.
/// On equal costs, the first realisation found is kept.
///
/// Returns the alignment and the number of realisations that were aligned.
pub fn alignment_upper_bound<O>(
    behavior_net: &BehaviorNet,
    model: &LabelledPetriNet,
    oracle: &O,
    parameters: &BoundsParameters,
) -> Result<(Alignment, usize)>
where
    O: AlignmentOracle + ?Sized,
{
    let mut worst_alignment: Option<Alignment> = None;
    let mut number_of_realisations = 0;

    for realisation in behavior_net.get_net().realisations() {
        let realisation = realisation.map_err(|err| {
            err.context(BoundsError::OracleFailure(
                "could not enumerate the realisations".to_string(),
            ))
        })?;
        let alignment = oracle.align_trace(&realisation, model)?;
        number_of_realisations += 1;
        log::debug!(
            "realisation {} {:?} aligns with cost {}",
            number_of_realisations,
            behavior_net.activity_key().deprocess_trace(&realisation),
            alignment.cost
        );

        if worst_alignment
            .as_ref()
            .is_none_or(|worst| alignment.cost > worst.cost)
        {
            worst_alignment = Some(alignment);
        }

        if let (Some(ceiling), Some(worst)) = (parameters.cost_ceiling, &worst_alignment) {
            if worst.cost >= ceiling {
                log::debug!("cost ceiling {} reached", ceiling);
                break;
            }
        }
    }

    match worst_alignment {
        Some(alignment) => Ok((alignment, number_of_realisations)),
        None => Err(BoundsError::InvalidTraceGraph("the trace has no realisations".to_string()).into()),
    }
}

/// Computes the lower and upper bound of an uncertain trace against `model`.
pub fn alignment_bounds_trace<B, O>(
    graph: &B,
    model: &LabelledPetriNet,
    oracle: &O,
    parameters: &BoundsParameters,
) -> Result<TraceBounds>
where
    B: BehaviorGraph,
    O: AlignmentOracle + ?Sized,
{
    bounds_with_activity_key(graph, model.activity_key().clone(), model, oracle, parameters)
}

fn bounds_with_activity_key<B, O>(
    graph: &B,
    activity_key: ActivityKey,
    model: &LabelledPetriNet,
    oracle: &O,
    parameters: &BoundsParameters,
) -> Result<TraceBounds>
where
    B: BehaviorGraph,
    O: AlignmentOracle + ?Sized,
{
    let behavior_net =
        BehaviorNet::build(graph, activity_key).context("building the behavior net")?;

    let lower = alignment_lower_bound(&behavior_net, model, oracle)?;
    let (upper, number_of_realisations) =
        alignment_upper_bound(&behavior_net, model, oracle, parameters)?;

    Ok(TraceBounds {
        lower,
        upper,
        number_of_realisations,
    })
}

/// The bounds of each trace of a log, in the order of the log.
/// A trace for which the computation failed holds its error.
#[derive(Debug)]
pub struct LogBounds {
    activity_key: ActivityKey,
    bounds: Vec<Result<TraceBounds>>,
}

impl LogBounds {
    /// The key of the activities in the alignments.
    pub fn activity_key(&self) -> &ActivityKey {
        &self.activity_key
    }

    pub fn number_of_traces(&self) -> usize {
        self.bounds.len()
    }

    pub fn get(&self, trace_index: usize) -> Option<&Result<TraceBounds>> {
        self.bounds.get(trace_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Result<TraceBounds>> {
        self.bounds.iter()
    }

    pub fn number_of_failures(&self) -> usize {
        self.bounds.iter().filter(|bounds| bounds.is_err()).count()
    }

    pub fn into_inner(self) -> Vec<Result<TraceBounds>> {
        self.bounds
    }
}

impl fmt::Display for LogBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HEADER)?;
        writeln!(f, "# number of traces\n{}", self.bounds.len())?;

        for (trace_index, bounds) in self.bounds.iter().enumerate() {
            writeln!(f, "# trace {}", trace_index)?;
            match bounds {
                Ok(bounds) => {
                    writeln!(
                        f,
                        "# number of realisations\n{}",
                        bounds.number_of_realisations
                    )?;
                    writeln!(f, "# lower bound")?;
                    bounds.lower.write(f, &self.activity_key)?;
                    writeln!(f, "# upper bound")?;
                    bounds.upper.write(f, &self.activity_key)?;
                }
                Err(err) => {
                    writeln!(f, "failed")?;
                    writeln!(f, "# error\n{:#}", err)?;
                }
            }
        }

        write!(f, "")
    }
}

/// Computes the bounds of all traces of `log` against `model`, in parallel.
/// A failing trace does not affect the other traces.
pub fn alignment_bounds_log<O>(
    log: &UncertainEventLog,
    model: &LabelledPetriNet,
    oracle: &O,
    parameters: &BoundsParameters,
) -> LogBounds
where
    O: AlignmentOracle + ?Sized,
{
    log::info!("Compute alignment bounds of {} traces", log.number_of_traces());

    //all behavior nets share one key, so that the alignments can be read with it
    let mut activity_key = model.activity_key().clone();
    ActivityKeyTranslator::new(log.activity_key(), &mut activity_key);

    let progress_bar = get_progress_bar_ticks(log.number_of_traces());

    let bounds = (0..log.number_of_traces())
        .into_par_iter()
        .map(|trace_index| {
            let result = match log.get_behavior_graph(trace_index) {
                Some(graph) => {
                    bounds_with_activity_key(&graph, activity_key.clone(), model, oracle, parameters)
                        .with_context(|| format!("trace {}", trace_index))
                }
                None => Err(anyhow::anyhow!("trace {} does not exist", trace_index)),
            };
            if let Err(err) = &result {
                log::warn!("{:#}", err);
            }
            progress_bar.inc(1);
            result
        })
        .collect::<Vec<_>>();

    progress_bar.finish_and_clear();

    LogBounds {
        activity_key,
        bounds,
    }
}
