//! Tools for simulating and optimizing topological quantum computation by
//! braiding.
//!
//! States live in the fusion spaces of a chosen anyon model (Fibonacci and
//! Ising are built in; custom models are checked against the pentagon and
//! hexagon equations), unitaries are braid-group generators built from the
//! model's R- and F-symbols, and circuits are words in those generators,
//! optionally evolved under leakage/dephasing/depolarizing noise and tuned
//! by annealing or gradient search.

pub mod model;
pub mod fusion;
pub mod state;
pub mod braid;
pub mod noise;
pub mod circuit;
pub mod optimize;

pub use model::{
    fibonacci, ising, AnyonModel, Charge, ChargeDef, ModelError, ModelTables,
};
pub use fusion::{ FusionError, FusionSpace, FusionTree, SpaceCache };
pub use state::{ Branch, Ensemble, State, StateInterchange };
pub use braid::{
    braid_matrix, braid_matrix_param, BraidDirection, BraidError,
    BraidGenerator,
};
pub use noise::{ NoiseChannel, NoiseError, NoiseSpec };
pub use circuit::{
    fidelity, process_fidelity, Circuit, Engine, NoiseMode, SimError,
    SimOutput, SimWarning,
};
pub use optimize::{
    optimize, optimize_continuous, OptimizationResult, OptimizerConfig,
    Target,
};
