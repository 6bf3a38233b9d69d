use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Args, Command, FromArgMatches, value_parser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
};

use crate::{
    activity_key::ActivityKey,
    objects::{labelled_petri_net::LabelledPetriNet, uncertain_event_log::UncertainEventLog},
    techniques::{
        align::{AStarOracle, AlignmentCosts},
        alignment_bounds::{BoundsParameters, alignment_bounds_log},
        behavior_net::BehaviorNet,
        realisations::EnumerateRealisations,
    },
};

pub const PROVED_COMMANDS: ProvedCommand = ProvedCommand::Group {
    name_short: "proved",
    name_long: None,
    explanation_short: "Conformance bounds of uncertain event logs against labelled Petri nets.",
    explanation_long: None,
    children: &[&PROVED_BOUNDS, &PROVED_BEHAVIOR_NET, &PROVED_REALISATIONS],
};

pub const ARG_SHORT_OUTPUT: char = 'o';
pub const ARG_ID_OUTPUT: &str = "output";
pub const ARG_ID_TRACE: &str = "trace";
pub const ARG_ID_LOG_MOVE_COST: &str = "log-move-cost";
pub const ARG_ID_MODEL_MOVE_COST: &str = "model-move-cost";
pub const ARG_ID_SYNCHRONOUS_MOVE_COST: &str = "synchronous-move-cost";
pub const ARG_ID_SILENT_MOVE_COST: &str = "silent-move-cost";
pub const ARG_ID_COST_CEILING: &str = "cost-ceiling";

pub const PROVED_BOUNDS: ProvedCommand = ProvedCommand::Command {
    name_short: "bnd",
    name_long: Some("bounds"),
    explanation_short: "Compute the lower and upper bound on the alignment cost of each trace of an uncertain event log.",
    explanation_long: Some(
        "Compute, for each trace of an uncertain event log, the cost of the best alignment of any of its realisations (the lower bound) and the cost of the worst best alignment over all its realisations (the upper bound). A trace for which the bounds cannot be computed is reported as failed; the other traces are not affected.",
    ),
    input_types: &[InputType::LabelledPetriNet, InputType::UncertainEventLog],
    input_names: &["MODEL", "LOG"],
    input_helps: &[
        "The labelled Petri net to align against.",
        "The uncertain event log.",
    ],
    cli_command: Some(|command| {
        command
            .arg(cost_arg(ARG_ID_LOG_MOVE_COST, "The cost of a log move.", "10000"))
            .arg(cost_arg(ARG_ID_MODEL_MOVE_COST, "The cost of a labelled model move.", "10000"))
            .arg(cost_arg(ARG_ID_SYNCHRONOUS_MOVE_COST, "The cost of a synchronous move.", "0"))
            .arg(cost_arg(ARG_ID_SILENT_MOVE_COST, "The cost of a silent model move.", "1"))
            .arg(
                Arg::new(ARG_ID_COST_CEILING)
                    .long(ARG_ID_COST_CEILING)
                    .action(ArgAction::Set)
                    .value_name("COST")
                    .help("Stop computing the upper bound of a trace once a realisation with at least this cost is found.")
                    .required(false)
                    .value_parser(value_parser!(usize)),
            )
    }),
    execute: |mut inputs, cli_matches| {
        let log = inputs.remove(1).to_type::<UncertainEventLog>()?;
        let model = inputs.remove(0).to_type::<LabelledPetriNet>()?;

        let costs = AlignmentCosts {
            log_move: get_cost(cli_matches, ARG_ID_LOG_MOVE_COST)?,
            model_move: get_cost(cli_matches, ARG_ID_MODEL_MOVE_COST)?,
            synchronous_move: get_cost(cli_matches, ARG_ID_SYNCHRONOUS_MOVE_COST)?,
            silent_move: get_cost(cli_matches, ARG_ID_SILENT_MOVE_COST)?,
        };
        let parameters = BoundsParameters {
            cost_ceiling: cli_matches.get_one::<usize>(ARG_ID_COST_CEILING).copied(),
        };

        let oracle = AStarOracle::new(costs);
        let bounds = alignment_bounds_log(&log, &model, &oracle, &parameters);
        if bounds.number_of_failures() > 0 {
            log::warn!(
                "{} of {} traces failed",
                bounds.number_of_failures(),
                bounds.number_of_traces()
            );
        }
        Ok(bounds.to_string())
    },
};

pub const PROVED_BEHAVIOR_NET: ProvedCommand = ProvedCommand::Command {
    name_short: "bnet",
    name_long: Some("behavior-net"),
    explanation_short: "Construct the behavior net of a trace of an uncertain event log.",
    explanation_long: None,
    input_types: &[InputType::UncertainEventLog],
    input_names: &["LOG"],
    input_helps: &["The uncertain event log."],
    cli_command: Some(|command| command.arg(trace_arg())),
    execute: |mut inputs, cli_matches| {
        let log = inputs.remove(0).to_type::<UncertainEventLog>()?;
        let behavior_net = get_behavior_net(&log, cli_matches)?;
        Ok(behavior_net.get_net().to_string())
    },
};

pub const PROVED_REALISATIONS: ProvedCommand = ProvedCommand::Command {
    name_short: "real",
    name_long: Some("realisations"),
    explanation_short: "List the distinct realisations of a trace of an uncertain event log.",
    explanation_long: None,
    input_types: &[InputType::UncertainEventLog],
    input_names: &["LOG"],
    input_helps: &["The uncertain event log."],
    cli_command: Some(|command| command.arg(trace_arg())),
    execute: |mut inputs, cli_matches| {
        let log = inputs.remove(0).to_type::<UncertainEventLog>()?;
        let behavior_net = get_behavior_net(&log, cli_matches)?;

        let mut result = String::new();
        let mut number_of_realisations = 0;
        for realisation in behavior_net.get_net().realisations() {
            let realisation = realisation?;
            let labels = behavior_net.activity_key().deprocess_trace(&realisation);
            result.push_str(&format!("# realisation {}\n", number_of_realisations));
            result.push_str(&format!("{}\n", labels.join(", ")));
            number_of_realisations += 1;
        }
        Ok(format!(
            "# number of realisations\n{}\n{}",
            number_of_realisations, result
        ))
    },
};

fn cost_arg(id: &'static str, help: &'static str, default: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .action(ArgAction::Set)
        .value_name("COST")
        .help(help)
        .required(false)
        .default_value(default)
        .value_parser(value_parser!(usize))
}

fn get_cost(cli_matches: &ArgMatches, id: &str) -> Result<usize> {
    cli_matches
        .get_one::<usize>(id)
        .copied()
        .ok_or_else(|| anyhow!("argument {} not given", id))
}

fn trace_arg() -> Arg {
    Arg::new(ARG_ID_TRACE)
        .short('t')
        .long(ARG_ID_TRACE)
        .action(ArgAction::Set)
        .value_name("NUMBER")
        .help("The index of the trace in the log.")
        .required(true)
        .value_parser(value_parser!(usize))
}

fn get_behavior_net(log: &UncertainEventLog, cli_matches: &ArgMatches) -> Result<BehaviorNet> {
    let trace_index = cli_matches
        .get_one::<usize>(ARG_ID_TRACE)
        .copied()
        .ok_or_else(|| anyhow!("argument {} not given", ARG_ID_TRACE))?;
    let graph = log.get_behavior_graph(trace_index).ok_or_else(|| {
        anyhow!(
            "trace {} does not exist; the log has {} traces",
            trace_index,
            log.number_of_traces()
        )
    })?;
    BehaviorNet::build(&graph, ActivityKey::new())
        .with_context(|| format!("building the behavior net of trace {}", trace_index))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    LabelledPetriNet,
    UncertainEventLog,
}

impl InputType {
    pub fn read(&self, reader: &mut dyn BufRead) -> Result<Input> {
        Ok(match self {
            InputType::LabelledPetriNet => Input::LabelledPetriNet(LabelledPetriNet::import(reader)?),
            InputType::UncertainEventLog => {
                Input::UncertainEventLog(UncertainEventLog::import(reader)?)
            }
        })
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputType::LabelledPetriNet => write!(f, "labelled Petri net"),
            InputType::UncertainEventLog => write!(f, "uncertain event log"),
        }
    }
}

#[derive(Debug)]
pub enum Input {
    LabelledPetriNet(LabelledPetriNet),
    UncertainEventLog(UncertainEventLog),
}

pub trait FromInput: Sized {
    fn from_input(input: Input) -> Result<Self>;
}

impl FromInput for LabelledPetriNet {
    fn from_input(input: Input) -> Result<Self> {
        match input {
            Input::LabelledPetriNet(net) => Ok(net),
            _ => Err(anyhow!("expected a labelled Petri net")),
        }
    }
}

impl FromInput for UncertainEventLog {
    fn from_input(input: Input) -> Result<Self> {
        match input {
            Input::UncertainEventLog(log) => Ok(log),
            _ => Err(anyhow!("expected an uncertain event log")),
        }
    }
}

impl Input {
    pub fn to_type<T: FromInput>(self) -> Result<T> {
        T::from_input(self)
    }
}

pub enum ProvedCommand {
    Group {
        name_short: &'static str,
        name_long: Option<&'static str>,
        explanation_short: &'static str,
        explanation_long: Option<&'static str>,
        children: &'static [&'static ProvedCommand],
    },
    Command {
        name_short: &'static str,
        name_long: Option<&'static str>,
        explanation_short: &'static str,
        explanation_long: Option<&'static str>,
        input_types: &'static [InputType],
        input_names: &'static [&'static str],
        input_helps: &'static [&'static str],
        cli_command: Option<fn(command: Command) -> Command>,
        execute: fn(inputs: Vec<Input>, cli_matches: &ArgMatches) -> Result<String>,
    },
}

impl ProvedCommand {
    pub fn build_cli(&self) -> Command {
        let mut command;
        match self {
            ProvedCommand::Group {
                name_short,
                name_long,
                explanation_short,
                explanation_long,
                children,
            } => {
                let name = name_long.unwrap_or(*name_short);
                command = Command::new(name)
                    .about(explanation_short)
                    .subcommand_required(true)
                    .allow_external_subcommands(false);

                if name_long.is_some() {
                    command = command.alias(name_short);
                }

                if let Some(l) = explanation_long {
                    command = command.long_about(l);
                }

                for child in children.iter() {
                    command = command.subcommand(child.build_cli());
                }

                command = Verbosity::<WarnLevel>::augment_args(command);
            }
            ProvedCommand::Command {
                name_short,
                name_long,
                explanation_short,
                explanation_long,
                input_types,
                input_names,
                input_helps,
                cli_command,
                ..
            } => {
                let name = name_long.unwrap_or(*name_short);
                command = Command::new(name).about(explanation_short);

                if name_long.is_some() {
                    command = command.alias(name_short);
                }

                if let Some(l) = explanation_long {
                    command = command.long_about(l);
                }

                for (input_name, (input_type, input_help)) in input_names
                    .iter()
                    .zip(input_types.iter().zip(input_helps.iter()))
                {
                    command = command.arg(
                        Arg::new(*input_name)
                            .action(ArgAction::Set)
                            .value_name(*input_name)
                            .help(*input_help)
                            .long_help(format!(
                                "{} The file is read as a {}; use - to read from STDIN.",
                                input_help, input_type
                            ))
                            .required(true)
                            .value_parser(value_parser!(PathBuf)),
                    );
                }

                if let Some(f) = cli_command {
                    command = (f)(command);
                }

                command = command.arg(
                    Arg::new(ARG_ID_OUTPUT)
                        .short(ARG_SHORT_OUTPUT)
                        .long(ARG_ID_OUTPUT)
                        .action(ArgAction::Set)
                        .value_name("FILE")
                        .help("Saves the result to a file.")
                        .required(false)
                        .value_parser(value_parser!(PathBuf)),
                );
            }
        };
        command
    }

    pub fn short_name(&self) -> &str {
        match self {
            ProvedCommand::Group { name_short, .. } => name_short,
            ProvedCommand::Command { name_short, .. } => name_short,
        }
    }

    pub fn long_name(&self) -> &str {
        match self {
            ProvedCommand::Group {
                name_short,
                name_long,
                ..
            } => name_long.unwrap_or(*name_short),
            ProvedCommand::Command {
                name_short,
                name_long,
                ..
            } => name_long.unwrap_or(*name_short),
        }
    }

    /// The log level requested on the command line.
    pub fn get_verbosity(cli_matches: &ArgMatches) -> Result<log::LevelFilter> {
        let verbosity = Verbosity::<WarnLevel>::from_arg_matches(cli_matches)?;
        Ok(verbosity.log_level_filter())
    }

    pub fn execute(&self, cli_matches: &ArgMatches) -> Result<()> {
        match self {
            ProvedCommand::Group { children, .. } => {
                for child in children.iter() {
                    if let Some(sub_matches) = cli_matches.subcommand_matches(child.long_name()) {
                        return child.execute(sub_matches);
                    }
                }
            }
            ProvedCommand::Command {
                input_types,
                input_names,
                execute,
                ..
            } => {
                //read the inputs
                let mut inputs = vec![];
                for (input_type, input_name) in input_types.iter().zip(input_names.iter()) {
                    log::info!("Reading {}", input_name);
                    let mut reader = get_reader(cli_matches, input_name)
                        .with_context(|| format!("Reading parameter {}.", input_name))?;
                    let input = input_type
                        .read(&mut reader)
                        .with_context(|| format!("Parsing {} as a {}.", input_name, input_type))?;
                    inputs.push(input);
                }

                log::info!("Starting {}", self.long_name());

                let result = (execute)(inputs, cli_matches)?;

                if let Some(to_file) = cli_matches.get_one::<PathBuf>(ARG_ID_OUTPUT) {
                    log::info!("Writing result to {:?}", to_file);
                    let mut file = File::create(to_file)
                        .with_context(|| format!("Creating {:?}.", to_file))?;
                    file.write_all(result.as_bytes())?;
                } else {
                    println!("{}", result);
                }

                return Ok(());
            }
        }
        Err(anyhow!("command not recognised"))
    }
}

pub fn get_reader(cli_matches: &ArgMatches, cli_id: &str) -> Result<Box<dyn BufRead>> {
    let path = cli_matches
        .get_one::<PathBuf>(cli_id)
        .ok_or_else(|| anyhow!("argument {} not given", cli_id))?;
    if path.as_os_str() == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        let file = File::open(path).with_context(|| format!("Opening {:?}.", path))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

pub fn get_progress_bar_ticks(total_ticks: usize) -> ProgressBar {
    let pb = ProgressBar::new(total_ticks as u64);
    if let Ok(style) = ProgressStyle::with_template("[{wide_bar:.cyan/blue}] {pos:>7}/{len:7}") {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_position(0);
    pb
}
