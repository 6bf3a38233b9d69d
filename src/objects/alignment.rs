use std::fmt;

use crate::{activity_key::{Activity, ActivityKey}, traits::process_graph::TransitionIndex};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    LogMove(Activity),
    ModelMove(Activity, TransitionIndex),
    SynchronousMove(Activity, TransitionIndex),
    SilentMove(TransitionIndex),
}

impl Move {
    pub fn write(&self, f: &mut fmt::Formatter<'_>, activity_key: &ActivityKey) -> fmt::Result {
        match self {
            Move::LogMove(activity) => {
                writeln!(f, "log move")?;
                writeln!(f, "label {}", activity_key.get_activity_label(activity))
            }
            Move::ModelMove(activity, transition) => {
                writeln!(f, "model move")?;
                writeln!(f, "label {}", activity_key.get_activity_label(activity))?;
                writeln!(f, "{}", transition)
            }
            Move::SynchronousMove(activity, transition) => {
                writeln!(f, "synchronous move")?;
                writeln!(f, "label {}", activity_key.get_activity_label(activity))?;
                writeln!(f, "{}", transition)
            }
            Move::SilentMove(transition) => {
                writeln!(f, "silent move")?;
                writeln!(f, "{}", transition)
            }
        }
    }
}

/// A cost-optimal alignment as found by an alignment oracle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alignment {
    pub moves: Vec<Move>,
    pub cost: usize,
}

impl Alignment {
    pub fn new(moves: Vec<Move>, cost: usize) -> Self {
        Self { moves, cost }
    }

    /// The activities that the log side of the alignment executed, in order.
    pub fn log_projection(&self) -> Vec<Activity> {
        self.moves
            .iter()
            .filter_map(|movee| match movee {
                Move::LogMove(activity) | Move::SynchronousMove(activity, _) => Some(*activity),
                _ => None,
            })
            .collect()
    }

    /// The activities that the model side of the alignment executed, in order.
    pub fn model_projection(&self) -> Vec<Activity> {
        self.moves
            .iter()
            .filter_map(|movee| match movee {
                Move::ModelMove(activity, _) | Move::SynchronousMove(activity, _) => {
                    Some(*activity)
                }
                _ => None,
            })
            .collect()
    }

    pub fn write(&self, f: &mut fmt::Formatter<'_>, activity_key: &ActivityKey) -> fmt::Result {
        writeln!(f, "# cost\n{}", self.cost)?;
        writeln!(f, "# number of moves\n{}", self.moves.len())?;
        for (j, movee) in self.moves.iter().enumerate() {
            writeln!(f, "# move {}", j)?;
            movee.write(f, activity_key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        activity_key::ActivityKey,
        objects::alignment::{Alignment, Move},
    };

    #[test]
    fn alignment_projections() {
        let mut key = ActivityKey::new();
        let a = key.process_activity("a");
        let b = key.process_activity("b");
        let c = key.process_activity("c");

        let alignment = Alignment::new(
            vec![
                Move::SynchronousMove(a, 0),
                Move::LogMove(c),
                Move::SilentMove(2),
                Move::ModelMove(b, 1),
            ],
            20001,
        );
        assert_eq!(alignment.log_projection(), vec![a, c]);
        assert_eq!(alignment.model_projection(), vec![a, b]);
    }
}
