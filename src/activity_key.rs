use std::{
    collections::HashMap,
    fmt::{Debug, Display},
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Activity {
    id: usize,
}

impl Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ac{}", self.id)
    }
}

impl Debug for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ac{}", self.id)
    }
}

/// Maps activity labels to compact `Activity` ids and back.
/// Two objects can only compare activities if they share a key, or after translation.
#[derive(Clone, Debug, Default)]
pub struct ActivityKey {
    name2activity: HashMap<String, Activity>,
    activity2name: Vec<String>,
}

impl ActivityKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_number_of_activities(&self) -> usize {
        self.activity2name.len()
    }

    pub fn process_activity(&mut self, activity: &str) -> Activity {
        match self.name2activity.get(activity) {
            Some(index) => *index,
            None => {
                let result = Activity {
                    id: self.activity2name.len(),
                };
                self.activity2name.push(activity.to_string());
                self.name2activity.insert(activity.to_string(), result);
                result
            }
        }
    }

    pub fn process_trace_ref(&mut self, trace: &[&str]) -> Vec<Activity> {
        trace
            .iter()
            .map(|activity| self.process_activity(activity))
            .collect()
    }

    pub fn get_activity_label(&self, activity: &Activity) -> &str {
        &self.activity2name[activity.id]
    }

    pub fn get_activity(&self, label: &str) -> Option<Activity> {
        self.name2activity.get(label).copied()
    }

    pub fn contains(&self, activity: &Activity) -> bool {
        activity.id < self.activity2name.len()
    }

    pub fn deprocess_trace(&self, trace: &[Activity]) -> Vec<&str> {
        trace
            .iter()
            .map(|activity| self.get_activity_label(activity))
            .collect()
    }
}

impl Display for ActivityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, label) in self.activity2name.iter().enumerate() {
            write!(f, "ac{}: {}, ", i, label)?;
        }
        write!(f, "")
    }
}

/// Rewrites activities of one key into the activities of another, extending the latter.
pub struct ActivityKeyTranslator {
    from2to: Vec<Activity>,
}

impl ActivityKeyTranslator {
    pub fn new(from: &ActivityKey, to: &mut ActivityKey) -> Self {
        let from2to = from
            .activity2name
            .iter()
            .map(|label_from| to.process_activity(label_from))
            .collect();
        Self { from2to }
    }

    /// Returns `None` if `activity` does not belong to the key translated from.
    pub fn translate_activity(&self, activity: &Activity) -> Option<Activity> {
        self.from2to.get(activity.id).copied()
    }

    pub fn translate_trace(&self, trace: &[Activity]) -> Option<Vec<Activity>> {
        trace
            .iter()
            .map(|activity| self.translate_activity(activity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivityKey, ActivityKeyTranslator};

    #[test]
    fn activity_key_reuses_ids() {
        let mut key = ActivityKey::new();
        let trace = key.process_trace_ref(&["a", "b", "a"]);
        assert_eq!(trace[0], trace[2]);
        assert_ne!(trace[0], trace[1]);
        assert_eq!(key.get_number_of_activities(), 2);
        assert_eq!(key.deprocess_trace(&trace), vec!["a", "b", "a"]);
    }

    #[test]
    fn translator_maps_labels() {
        let mut from = ActivityKey::new();
        let trace = from.process_trace_ref(&["x", "y"]);

        let mut to = ActivityKey::new();
        let y = to.process_activity("y");

        let translator = ActivityKeyTranslator::new(&from, &mut to);
        let translated = translator.translate_trace(&trace).unwrap();
        assert_eq!(translated[1], y);
        assert_eq!(to.get_activity_label(&translated[0]), "x");
        assert_eq!(to.get_number_of_activities(), 2);
    }

    #[test]
    fn translator_rejects_foreign_activity() {
        let mut small = ActivityKey::new();
        small.process_activity("a");

        let mut large = ActivityKey::new();
        let foreign = large.process_trace_ref(&["x", "y", "z"])[2];
        assert!(!small.contains(&foreign));

        let mut to = ActivityKey::new();
        let translator = ActivityKeyTranslator::new(&small, &mut to);
        assert_eq!(translator.translate_activity(&foreign), None);
        assert_eq!(translator.translate_trace(&[foreign]), None);
    }
}
