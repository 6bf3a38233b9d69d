use anyhow::{Context, Error, Result, anyhow};
use std::{
    fmt,
    io::{self, BufRead},
    str::FromStr,
};

use crate::{
    activity_key::{Activity, ActivityKey},
    line_reader::LineReader,
    marking::Marking,
    traits::process_graph::{PlaceIndex, ProcessGraph, TransitionIndex},
};

pub const HEADER: &str = "labelled Petri net";

#[derive(Clone, Debug, Default)]
pub struct LabelledPetriNet {
    pub(crate) activity_key: ActivityKey,
    pub(crate) initial_marking: Marking,
    pub(crate) final_marking: Option<Marking>,
    pub(crate) labels: Vec<Option<Activity>>,
    pub(crate) place2output_transitions: Vec<Vec<TransitionIndex>>,
    pub(crate) transition2input_places: Vec<Vec<PlaceIndex>>,
    pub(crate) transition2output_places: Vec<Vec<PlaceIndex>>,
    pub(crate) transition2input_places_cardinality: Vec<Vec<u64>>,
    pub(crate) transition2output_places_cardinality: Vec<Vec<u64>>,
}

impl LabelledPetriNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty net whose transitions will be labelled with activities of `activity_key`.
    pub fn new_with_activity_key(activity_key: ActivityKey) -> Self {
        Self {
            activity_key,
            ..Self::default()
        }
    }

    pub fn get_number_of_places(&self) -> usize {
        self.place2output_transitions.len()
    }

    pub fn get_number_of_transitions(&self) -> usize {
        self.labels.len()
    }

    pub fn is_transition_silent(&self, transition: TransitionIndex) -> bool {
        self.labels[transition].is_none()
    }

    pub fn get_transition_label(&self, transition: TransitionIndex) -> Option<Activity> {
        self.labels[transition]
    }

    pub fn get_input_places(&self, transition: TransitionIndex) -> &[PlaceIndex] {
        &self.transition2input_places[transition]
    }

    pub fn get_output_places(&self, transition: TransitionIndex) -> &[PlaceIndex] {
        &self.transition2output_places[transition]
    }

    pub fn get_output_transitions(&self, place: PlaceIndex) -> &[TransitionIndex] {
        &self.place2output_transitions[place]
    }

    /// Returns the transitions that put tokens in `place`.
    pub fn get_input_transitions(&self, place: PlaceIndex) -> Vec<TransitionIndex> {
        (0..self.get_number_of_transitions())
            .filter(|transition| self.transition2output_places[*transition].contains(&place))
            .collect()
    }

    pub fn get_number_of_arcs(&self) -> usize {
        self.transition2input_places.iter().map(Vec::len).sum::<usize>()
            + self.transition2output_places.iter().map(Vec::len).sum::<usize>()
    }

    fn check_transition(&self, transition: TransitionIndex) -> Result<()> {
        if transition >= self.get_number_of_transitions() {
            return Err(anyhow!(
                "non-existing transition {} referenced, while there are {}",
                transition,
                self.get_number_of_transitions()
            ));
        }
        Ok(())
    }

    fn check_place(&self, place: PlaceIndex) -> Result<()> {
        if place >= self.get_number_of_places() {
            return Err(anyhow!(
                "non-existing place {} referenced, while there are {}",
                place,
                self.get_number_of_places()
            ));
        }
        Ok(())
    }

    fn check_marking(&self, marking: &Marking) -> Result<()> {
        if marking.len() != self.get_number_of_places() {
            return Err(anyhow!(
                "marking covers {} places, while the net has {}",
                marking.len(),
                self.get_number_of_places()
            ));
        }
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

        let number_of_places = lreader
            .next_line_index()
            .context("failed to read number of places")?;
        for _ in 0..number_of_places {
            result.add_place();
        }

        //read initial marking
        let mut initial_marking = Marking::new(number_of_places);
        for place in 0..number_of_places {
            let tokens = lreader
                .next_line_natural()
                .with_context(|| format!("failed to read initial marking of place {}", place))?;
            initial_marking.increase(place, tokens)?;
        }
        result.initial_marking = initial_marking;

        //read transitions
        let number_of_transitions = lreader
            .next_line_index()
            .context("failed to read number of transitions")?;

        for transition in 0..number_of_transitions {
            let label_line = lreader
                .next_line_string()
                .with_context(|| format!("failed to read label of transition {}", transition))?;

            let label = if let Some(label) = label_line.trim_start().strip_prefix("label ") {
                Some(result.activity_key.process_activity(label))
            } else if label_line.trim() == "silent" {
                None
            } else {
                return Err(anyhow!(
                    "expected `label <activity>` or `silent` for transition {} at line {}; found `{}`",
                    transition,
                    lreader.get_last_line_number(),
                    lreader.get_last_line()
                ));
            };
            result.add_transition(label);

            //read input places
            let number_of_input_places = lreader.next_line_index().with_context(|| {
                format!(
                    "failed to read number of input places of transition {}",
                    transition
                )
            })?;
            for p in 0..number_of_input_places {
                let place = lreader.next_line_index().with_context(|| {
                    format!(
                        "failed to read input place number {} of transition {}",
                        p, transition
                    )
                })?;
                let line_number = lreader.get_last_line_number();
                result
                    .add_place_transition_arc(place, transition, 1)
                    .with_context(|| format!("input place at line {}", line_number))?;
            }

            //read output places
            let number_of_output_places = lreader.next_line_index().with_context(|| {
                format!(
                    "failed to read number of output places of transition {}",
                    transition
                )
            })?;
            for p in 0..number_of_output_places {
                let place = lreader.next_line_index().with_context(|| {
                    format!(
                        "failed to read output place number {} of transition {}",
                        p, transition
                    )
                })?;
                let line_number = lreader.get_last_line_number();
                result
                    .add_transition_place_arc(transition, place, 1)
                    .with_context(|| format!("output place at line {}", line_number))?;
            }
        }

        //read the optional final marking
        if lreader.next_line_option()? {
            let mut final_marking = Marking::new(number_of_places);
            for place in 0..number_of_places {
                let tokens = if place == 0 {
                    lreader.parse_last_line_natural()
                } else {
                    lreader.next_line_natural()
                }
                .with_context(|| format!("failed to read final marking of place {}", place))?;
                final_marking.increase(place, tokens)?;
            }
            result.final_marking = Some(final_marking);
        }

        Ok(result)
    }
}

impl ProcessGraph for LabelledPetriNet {
    fn add_place(&mut self) -> PlaceIndex {
        let place = self.get_number_of_places();
        self.place2output_transitions.push(vec![]);
        self.initial_marking.add_place();
        if let Some(final_marking) = &mut self.final_marking {
            final_marking.add_place();
        }
        place
    }

    fn add_transition(&mut self, label: Option<Activity>) -> TransitionIndex {
        self.labels.push(label);
        self.transition2input_places.push(vec![]);
        self.transition2input_places_cardinality.push(vec![]);
        self.transition2output_places.push(vec![]);
        self.transition2output_places_cardinality.push(vec![]);
        self.labels.len() - 1
    }

    fn add_place_transition_arc(
        &mut self,
        from_place: PlaceIndex,
        to_transition: TransitionIndex,
        cardinality: u64,
    ) -> Result<()> {
        self.check_transition(to_transition)?;
        self.check_place(from_place)?;

        if !self.place2output_transitions[from_place].contains(&to_transition) {
            self.place2output_transitions[from_place].push(to_transition);
        }

        if let Some(pos) = self.transition2input_places[to_transition]
            .iter()
            .position(|p| *p == from_place)
        {
            self.transition2input_places_cardinality[to_transition][pos] += cardinality;
        } else {
            self.transition2input_places[to_transition].push(from_place);
            self.transition2input_places_cardinality[to_transition].push(cardinality);
        }
        Ok(())
    }

    fn add_transition_place_arc(
        &mut self,
        from_transition: TransitionIndex,
        to_place: PlaceIndex,
        cardinality: u64,
    ) -> Result<()> {
        self.check_transition(from_transition)?;
        self.check_place(to_place)?;

        if let Some(pos) = self.transition2output_places[from_transition]
            .iter()
            .position(|p| *p == to_place)
        {
            self.transition2output_places_cardinality[from_transition][pos] += cardinality;
        } else {
            self.transition2output_places[from_transition].push(to_place);
            self.transition2output_places_cardinality[from_transition].push(cardinality);
        }
        Ok(())
    }

    fn get_number_of_places(&self) -> usize {
        LabelledPetriNet::get_number_of_places(self)
    }

    fn get_number_of_transitions(&self) -> usize {
        LabelledPetriNet::get_number_of_transitions(self)
    }

    fn get_initial_marking(&self) -> &Marking {
        &self.initial_marking
    }

    fn set_initial_marking(&mut self, marking: Marking) -> Result<()> {
        self.check_marking(&marking)
            .context("setting the initial marking")?;
        self.initial_marking = marking;
        Ok(())
    }

    fn get_final_marking(&self) -> Option<&Marking> {
        self.final_marking.as_ref()
    }

    fn set_final_marking(&mut self, marking: Marking) -> Result<()> {
        self.check_marking(&marking)
            .context("setting the final marking")?;
        self.final_marking = Some(marking);
        Ok(())
    }

    fn activity_key(&self) -> &ActivityKey {
        &self.activity_key
    }

    fn activity_key_mut(&mut self) -> &mut ActivityKey {
        &mut self.activity_key
    }
}

impl fmt::Display for LabelledPetriNet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", HEADER)?;
        writeln!(f, "# number of places\n{}", self.get_number_of_places())?;

        writeln!(f, "# initial marking")?;
        for place in self.initial_marking.get_place2token() {
            writeln!(f, "{}", place)?;
        }

        writeln!(
            f,
            "# number of transitions\n{}",
            self.get_number_of_transitions()
        )?;

        for transition in 0..self.get_number_of_transitions() {
            writeln!(f, "# transition {}", transition)?;

            if let Some(activity) = self.get_transition_label(transition) {
                writeln!(f, "label {}", self.activity_key.get_activity_label(&activity))?;
            } else {
                writeln!(f, "silent")?;
            }

            let inputs = self.transition2input_places_cardinality[transition]
                .iter()
                .sum::<u64>();
            writeln!(f, "# number of input places\n{}", inputs)?;
            for (pos, place) in self.transition2input_places[transition].iter().enumerate() {
                for _ in 0..self.transition2input_places_cardinality[transition][pos] {
                    writeln!(f, "{}", place)?;
                }
            }

            let outputs = self.transition2output_places_cardinality[transition]
                .iter()
                .sum::<u64>();
            writeln!(f, "# number of output places\n{}", outputs)?;
            for (pos, place) in self.transition2output_places[transition].iter().enumerate() {
                for _ in 0..self.transition2output_places_cardinality[transition][pos] {
                    writeln!(f, "{}", place)?;
                }
            }
        }

        if let Some(final_marking) = &self.final_marking {
            writeln!(f, "# final marking")?;
            for place in final_marking.get_place2token() {
                writeln!(f, "{}", place)?;
            }
        }

        write!(f, "")
    }
}

impl FromStr for LabelledPetriNet {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut reader = io::Cursor::new(s);
        Self::import(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{
        marking::Marking,
        objects::labelled_petri_net::LabelledPetriNet,
        traits::process_graph::ProcessGraph,
    };

    #[test]
    fn lpn_import() {
        let fin = fs::read_to_string("testfiles/a-b.lpn").unwrap();
        let lpn = fin.parse::<LabelledPetriNet>().unwrap();

        assert_eq!(lpn.get_number_of_places(), 3);
        assert_eq!(lpn.get_number_of_transitions(), 2);
        assert_eq!(lpn.get_initial_marking().get_place2token(), &vec![1, 0, 0]);
        assert_eq!(
            lpn.get_final_marking().unwrap().get_place2token(),
            &vec![0, 0, 1]
        );
        assert_eq!(lpn.activity_key().get_number_of_activities(), 2);
        assert!(!lpn.is_transition_silent(0));
    }

    #[test]
    fn lpn_import_without_final_marking() {
        let fin = fs::read_to_string("testfiles/a-tau.lpn").unwrap();
        let lpn = fin.parse::<LabelledPetriNet>().unwrap();

        assert!(lpn.get_final_marking().is_none());
        assert!(lpn.is_transition_silent(1));
    }

    #[test]
    fn lpn_export_import() {
        let fin = fs::read_to_string("testfiles/a-b.lpn").unwrap();
        let lpn = fin.parse::<LabelledPetriNet>().unwrap();

        let lpn2 = lpn.to_string().parse::<LabelledPetriNet>().unwrap();
        assert_eq!(lpn.to_string(), lpn2.to_string());
    }

    #[test]
    fn lpn_non_existing_place() {
        let fin = "labelled Petri net\n1\n1\n1\nlabel a\n1\n3\n0\n";
        assert!(fin.parse::<LabelledPetriNet>().is_err());
    }

    #[test]
    fn lpn_wrong_header() {
        assert!("labelled net\n0\n0\n".parse::<LabelledPetriNet>().is_err());
    }

    #[test]
    fn lpn_build() {
        let mut lpn = LabelledPetriNet::new();
        let a = lpn.activity_key_mut().process_activity("a");
        let source = lpn.add_place();
        let sink = lpn.add_place();
        let transition = lpn.add_transition(Some(a));
        lpn.add_place_transition_arc(source, transition, 1).unwrap();
        lpn.add_transition_place_arc(transition, sink, 1).unwrap();

        assert!(lpn.add_place_transition_arc(7, transition, 1).is_err());
        assert!(lpn.add_transition_place_arc(3, sink, 1).is_err());
        assert!(lpn.set_initial_marking(Marking::new(5)).is_err());

        lpn.set_initial_marking(Marking::from_vec(vec![1, 0])).unwrap();
        lpn.set_final_marking(Marking::from_vec(vec![0, 1])).unwrap();

        assert_eq!(lpn.get_number_of_arcs(), 2);
        assert_eq!(lpn.get_input_transitions(sink), vec![transition]);
        assert_eq!(lpn.get_output_transitions(source), &[transition]);
    }
}
