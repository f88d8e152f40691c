pub mod sequence;

pub use sequence::{
    bind_contract, connect, invoke, run, run_sequence, BreedingScenario, SequenceReport, REQUIRED_FUNCTIONS,
};
