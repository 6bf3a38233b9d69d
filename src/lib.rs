pub mod traits {
    pub mod behavior_graph;
    pub mod process_graph;
}
pub mod objects {
    pub mod alignment;
    pub mod labelled_petri_net;
    pub mod uncertain_event_log;
}
pub mod semantics {
    pub mod labelled_petri_net_semantics;
    pub mod semantics;
    pub mod trace_semantics;
}
pub mod techniques {
    pub mod align;
    pub mod alignment_bounds;
    pub mod behavior_net;
    pub mod realisations;
}
pub mod activity_key;
pub mod command;
pub mod error;
pub mod line_reader;
pub mod marking;
