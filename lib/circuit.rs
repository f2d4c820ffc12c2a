//! Braid circuits and the simulation engine that runs them.
//!
//! A [`Circuit`] is an ordered word in the braid generators; the [`Engine`]
//! binds a word to an anyon model and fusion space, caches each generator's
//! unitary on first use, and evolves states through the word either exactly
//! or under a noise channel. Trajectory mode samples one stochastic history
//! per run from a seeded RNG; ensemble mode evolves the full weighted
//! mixture deterministically.
//!
//! All matrices here are finite products of braid unitaries, so any drift
//! from unit norm signals numerical trouble rather than physics. Drift past
//! [`DRIFT_WARN`] is reported as a warning; past [`DRIFT_FATAL`] the run
//! aborts.

use nalgebra as na;
use num_complex::Complex64 as C64;
use rand::{ rngs::StdRng, SeedableRng };
use rustc_hash::FxHashMap;
use thiserror::Error;
use crate::{
    braid::{ braid_matrix, BraidDirection, BraidError, BraidGenerator },
    fusion::FusionSpace,
    model::AnyonModel,
    noise::{ NoiseChannel, NoiseError, NoiseSpec, TrajectoryOutcome },
    state::{ Branch, Ensemble, State },
};

/// Norm drift past this threshold is reported as a
/// [`SimWarning::NonUnitaryDrift`].
pub const DRIFT_WARN: f64 = 1e-6;

/// Norm drift past this threshold aborts the run with
/// [`SimError::NonUnitary`].
pub const DRIFT_FATAL: f64 = 1e-3;

#[derive(Debug, Error)]
pub enum SimError {
    /// Returned when a state's amplitude vector is keyed against the wrong
    /// basis dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Returned when accumulated numerical drift exceeds [`DRIFT_FATAL`].
    #[error("state norm drifted from 1 by {0:e}")]
    NonUnitary(f64),

    /// Returned by [`fidelity`] when both arguments are mixed; mixed-mixed
    /// overlap is not an amplitude inner product.
    #[error("fidelity against a mixed target is not supported")]
    MixedTarget,

    /// Returned when an interchange direction code is neither 0 nor 1.
    #[error("invalid braid direction code {0}")]
    InvalidDirection(i64),

    #[error(transparent)]
    Braid(#[from] BraidError),

    #[error(transparent)]
    Noise(#[from] NoiseError),
}
pub type SimResult<T> = Result<T, SimError>;

/// Non-fatal condition noticed during a run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SimWarning {
    /// The state norm drifted from 1 by more than [`DRIFT_WARN`] after the
    /// given step; the state was renormalized and the run continued.
    NonUnitaryDrift { step: usize, deviation: f64 },
}

/* Circuit ********************************************************************/

/// An ordered sequence of braid generators, applied left to right.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Circuit {
    gens: Vec<BraidGenerator>,
}

impl Circuit {
    pub fn new() -> Self { Self::default() }

    pub fn from_gens<I>(gens: I) -> Self
    where I: IntoIterator<Item = BraidGenerator>
    {
        Self { gens: gens.into_iter().collect() }
    }

    pub fn push(&mut self, gen: BraidGenerator) { self.gens.push(gen); }

    /// Insert `gen` before step `at`, saturating to an append.
    pub fn insert(&mut self, at: usize, gen: BraidGenerator) {
        let at = at.min(self.gens.len());
        self.gens.insert(at, gen);
    }

    /// Remove and return the generator at step `at`, if in range.
    pub fn remove(&mut self, at: usize) -> Option<BraidGenerator> {
        (at < self.gens.len()).then(|| self.gens.remove(at))
    }

    pub fn len(&self) -> usize { self.gens.len() }

    pub fn is_empty(&self) -> bool { self.gens.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, BraidGenerator> {
        self.gens.iter()
    }

    pub fn gens(&self) -> &[BraidGenerator] { &self.gens }

    /// Interchange form: `(position, direction code)` pairs with `Over` as
    /// 0 and `Under` as 1.
    pub fn to_pairs(&self) -> Vec<(usize, i64)> {
        self.gens.iter()
            .map(|g| (g.position, g.direction.to_code()))
            .collect()
    }

    pub fn from_pairs(pairs: &[(usize, i64)]) -> SimResult<Self> {
        let gens: Vec<BraidGenerator> = pairs.iter()
            .map(|&(position, code)| {
                BraidDirection::from_code(code)
                    .map(|direction| BraidGenerator { position, direction })
                    .ok_or(SimError::InvalidDirection(code))
            })
            .collect::<SimResult<_>>()?;
        Ok(Self { gens })
    }

    /// Cancel adjacent inverse pairs (σ_i σ_i⁻¹ and σ_i⁻¹ σ_i) until none
    /// remain. The word's unitary is unchanged.
    pub fn simplified(&self) -> Self {
        let mut out: Vec<BraidGenerator> = Vec::with_capacity(self.gens.len());
        for &gen in self.gens.iter() {
            if out.last() == Some(&gen.inverse()) {
                out.pop();
            } else {
                out.push(gen);
            }
        }
        Self { gens: out }
    }
}

impl FromIterator<BraidGenerator> for Circuit {
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = BraidGenerator>
    {
        Self::from_gens(iter)
    }
}

/* Engine *********************************************************************/

/// How a noise channel is threaded through a run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NoiseMode {
    /// Sample one stochastic history; the output is pure or fully leaked.
    Trajectory,
    /// Evolve the weighted mixture exactly, pruning branches below
    /// `prune_eps`.
    Ensemble { prune_eps: f64 },
}

impl NoiseMode {
    /// Ensemble mode with the default pruning threshold.
    pub fn ensemble() -> Self {
        Self::Ensemble { prune_eps: crate::noise::DEFAULT_PRUNE_EPS }
    }
}

/// Output of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimOutput {
    pub state: State,
    pub warnings: Vec<SimWarning>,
}

/// A model and fusion space bound together with a cache of generator
/// unitaries. Cheap to clone for parallel workers; each clone carries its
/// own cache.
#[derive(Clone, Debug)]
pub struct Engine<'a> {
    model: &'a AnyonModel,
    space: &'a FusionSpace,
    cache: FxHashMap<(usize, BraidDirection), na::DMatrix<C64>>,
}

impl<'a> Engine<'a> {
    pub fn new(model: &'a AnyonModel, space: &'a FusionSpace) -> Self {
        Self { model, space, cache: FxHashMap::default() }
    }

    pub fn model(&self) -> &AnyonModel { self.model }

    pub fn space(&self) -> &FusionSpace { self.space }

    pub fn dimension(&self) -> usize { self.space.dimension() }

    /// The unitary of a single generator, built on first use and cached.
    pub fn operator(&mut self, gen: BraidGenerator)
        -> SimResult<&na::DMatrix<C64>>
    {
        let key = (gen.position, gen.direction);
        if !self.cache.contains_key(&key) {
            let m = braid_matrix(self.model, self.space, gen)?;
            self.cache.insert(key, m);
        }
        Ok(&self.cache[&key])
    }

    /// The unitary of a whole circuit: the ordered product of its
    /// generators' matrices, first generator applied first.
    pub fn compose(&mut self, circuit: &Circuit)
        -> SimResult<na::DMatrix<C64>>
    {
        let dim = self.dimension();
        let mut acc = na::DMatrix::<C64>::identity(dim, dim);
        for &gen in circuit.iter() {
            acc = self.operator(gen)? * acc;
        }
        Ok(acc)
    }

    /// Run `circuit` on `initial`, optionally under a noise channel.
    ///
    /// With no noise the evolution is the exact unitary product; mixed
    /// inputs evolve branch by branch. Trajectory mode applies one sampled
    /// noise outcome after every braid step, derived deterministically from
    /// `seed`; a sampled leak ends the run in the fully leaked state.
    /// Ensemble mode branches the mixture after every step instead.
    pub fn simulate(
        &mut self,
        circuit: &Circuit,
        initial: &State,
        noise: Option<(&NoiseSpec, NoiseMode)>,
        seed: u64,
    ) -> SimResult<SimOutput> {
        let dim = self.dimension();
        let got = initial.dimension();
        if got != 0 && got != dim {
            return Err(SimError::DimensionMismatch { expected: dim, got });
        }
        match noise {
            None => self.run_exact(circuit, initial),
            Some((spec, NoiseMode::Trajectory)) => {
                let chan = NoiseChannel::new(*spec, dim)?;
                self.run_trajectory(circuit, initial, &chan, seed)
            }
            Some((spec, NoiseMode::Ensemble { prune_eps })) => {
                let chan = NoiseChannel::new(*spec, dim)?;
                self.run_ensemble(circuit, initial, &chan, prune_eps)
            }
        }
    }

    fn run_exact(&mut self, circuit: &Circuit, initial: &State)
        -> SimResult<SimOutput>
    {
        let mut warnings: Vec<SimWarning> = Vec::new();
        match initial {
            State::Pure(amps) => {
                let mut amps = amps.clone();
                for (step, &gen) in circuit.iter().enumerate() {
                    amps = self.operator(gen)? * amps;
                    check_drift(&mut amps, step, &mut warnings)?;
                }
                Ok(SimOutput { state: State::Pure(amps), warnings })
            }
            State::Mixed(ens) => {
                let mut ens = ens.clone();
                for (step, &gen) in circuit.iter().enumerate() {
                    let op = self.operator(gen)?.clone();
                    for branch in ens.branches.iter_mut() {
                        branch.amps = &op * &branch.amps;
                        check_drift(&mut branch.amps, step, &mut warnings)?;
                    }
                }
                Ok(SimOutput { state: State::Mixed(ens), warnings })
            }
        }
    }

    fn run_trajectory(
        &mut self,
        circuit: &Circuit,
        initial: &State,
        chan: &NoiseChannel,
        seed: u64,
    ) -> SimResult<SimOutput> {
        match initial {
            State::Pure(amps) => {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut warnings: Vec<SimWarning> = Vec::new();
                let amps = self.trajectory_branch(
                    circuit, amps.clone(), chan, &mut rng, &mut warnings)?;
                let state = match amps {
                    Some(amps) => State::Pure(amps),
                    None => State::leaked(),
                };
                Ok(SimOutput { state, warnings })
            }
            // each branch runs its own history with a derived seed
            State::Mixed(ens) => {
                let mut warnings: Vec<SimWarning> = Vec::new();
                let mut out =
                    Ensemble { branches: Vec::new(), leaked: ens.leaked };
                for (j, branch) in ens.branches.iter().enumerate() {
                    let mut rng =
                        StdRng::seed_from_u64(mix_seed(seed, j as u64));
                    match self.trajectory_branch(
                        circuit, branch.amps.clone(), chan, &mut rng,
                        &mut warnings)?
                    {
                        Some(amps) => out.branches.push(Branch {
                            weight: branch.weight,
                            amps,
                        }),
                        None => { out.leaked += branch.weight; }
                    }
                }
                Ok(SimOutput { state: State::Mixed(out), warnings })
            }
        }
    }

    fn trajectory_branch(
        &mut self,
        circuit: &Circuit,
        mut amps: na::DVector<C64>,
        chan: &NoiseChannel,
        rng: &mut StdRng,
        warnings: &mut Vec<SimWarning>,
    ) -> SimResult<Option<na::DVector<C64>>> {
        for (step, &gen) in circuit.iter().enumerate() {
            amps = self.operator(gen)? * amps;
            check_drift(&mut amps, step, warnings)?;
            if chan.step_trajectory(&mut amps, rng)
                == TrajectoryOutcome::Leaked
            {
                return Ok(None);
            }
        }
        Ok(Some(amps))
    }

    fn run_ensemble(
        &mut self,
        circuit: &Circuit,
        initial: &State,
        chan: &NoiseChannel,
        prune_eps: f64,
    ) -> SimResult<SimOutput> {
        let mut ens = match initial {
            State::Pure(amps) => Ensemble {
                branches: vec![Branch { weight: 1.0, amps: amps.clone() }],
                leaked: 0.0,
            },
            State::Mixed(ens) => ens.clone(),
        };
        let mut warnings: Vec<SimWarning> = Vec::new();
        for (step, &gen) in circuit.iter().enumerate() {
            let op = self.operator(gen)?.clone();
            for branch in ens.branches.iter_mut() {
                branch.amps = &op * &branch.amps;
                check_drift(&mut branch.amps, step, &mut warnings)?;
            }
            chan.step_ensemble(&mut ens, prune_eps);
        }
        Ok(SimOutput { state: State::Mixed(ens), warnings })
    }
}

fn check_drift(
    amps: &mut na::DVector<C64>,
    step: usize,
    warnings: &mut Vec<SimWarning>,
) -> SimResult<()> {
    let norm = amps.norm();
    let deviation = (norm - 1.0).abs();
    if deviation > DRIFT_FATAL {
        return Err(SimError::NonUnitary(deviation));
    }
    if deviation > DRIFT_WARN {
        warnings.push(SimWarning::NonUnitaryDrift { step, deviation });
        amps.unscale_mut(norm);
    }
    Ok(())
}

// splitmix64 step; decorrelates seeds derived from one base seed
pub(crate) fn mix_seed(seed: u64, k: u64) -> u64 {
    let mut z = seed.wrapping_add(k.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/* Fidelity *******************************************************************/

/// Fidelity between two states on the same basis.
///
/// Pure–pure is |⟨a|b⟩|²; mixed-versus-pure averages the pure overlaps over
/// the ensemble, with leaked weight contributing zero. Both arguments mixed
/// is rejected with [`SimError::MixedTarget`].
pub fn fidelity(a: &State, b: &State) -> SimResult<f64> {
    let (da, db) = (a.dimension(), b.dimension());
    if da != 0 && db != 0 && da != db {
        return Err(SimError::DimensionMismatch { expected: da, got: db });
    }
    match (a, b) {
        (State::Pure(u), State::Pure(v)) => Ok(u.dotc(v).norm_sqr()),
        (State::Mixed(ens), State::Pure(v))
            | (State::Pure(v), State::Mixed(ens))
        => {
            Ok(ens.branches.iter()
                .map(|br| br.weight * br.amps.dotc(v).norm_sqr())
                .sum())
        }
        (State::Mixed(_), State::Mixed(_)) => Err(SimError::MixedTarget),
    }
}

/// Entanglement (process) fidelity between two unitaries,
/// |tr(U† V)|² / d².
pub fn process_fidelity(u: &na::DMatrix<C64>, v: &na::DMatrix<C64>)
    -> SimResult<f64>
{
    if u.nrows() != v.nrows() || u.ncols() != v.ncols() {
        return Err(SimError::DimensionMismatch {
            expected: u.nrows(),
            got: v.nrows(),
        });
    }
    let d = u.nrows() as f64;
    let tr: C64 = (u.adjoint() * v).trace();
    Ok(tr.norm_sqr() / (d * d))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        fusion::FusionSpace,
        model::{ fibonacci, AnyonModel, Charge },
    };

    const TOL: f64 = 1e-9;

    fn qubit_space() -> (AnyonModel, FusionSpace) {
        let model = fibonacci();
        let tau = model.charge("tau").unwrap();
        let space = FusionSpace::new(&model, &[tau; 4], Charge::VACUUM)
            .unwrap();
        (model, space)
    }

    #[test]
    fn empty_circuit_is_identity() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let initial = State::basis_state(space.dimension(), 0).unwrap();
        let out = engine.simulate(&Circuit::new(), &initial, None, 0)
            .unwrap();
        assert!(out.warnings.is_empty());
        assert!(
            (fidelity(&out.state, &initial).unwrap() - 1.0).abs() < TOL);
        let id = engine.compose(&Circuit::new()).unwrap();
        let dim = space.dimension();
        assert_eq!(id, na::DMatrix::<C64>::identity(dim, dim));
    }

    #[test]
    fn compose_matches_stepwise_simulation() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let circuit = Circuit::from_gens([
            BraidGenerator::over(0),
            BraidGenerator::over(1),
            BraidGenerator::under(2),
            BraidGenerator::over(1),
        ]);
        let initial = State::basis_state(space.dimension(), 1).unwrap();
        let out = engine.simulate(&circuit, &initial, None, 0).unwrap();
        let u = engine.compose(&circuit).unwrap();
        let direct = State::Pure(&u * initial.as_pure().unwrap());
        assert!((fidelity(&out.state, &direct).unwrap() - 1.0).abs() < TOL);
    }

    #[test]
    fn fidelity_is_symmetric_and_normalized() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let circuit = Circuit::from_gens(
            [BraidGenerator::over(1), BraidGenerator::over(1)]);
        let s0 = State::basis_state(space.dimension(), 0).unwrap();
        let s1 = engine.simulate(&circuit, &s0, None, 0).unwrap().state;
        assert!((fidelity(&s0, &s0).unwrap() - 1.0).abs() < TOL);
        assert!((fidelity(&s1, &s1).unwrap() - 1.0).abs() < TOL);
        let f01 = fidelity(&s0, &s1).unwrap();
        let f10 = fidelity(&s1, &s0).unwrap();
        assert!((f01 - f10).abs() < TOL);
        assert!((0.0..=1.0 + TOL).contains(&f01));
    }

    #[test]
    fn dimension_mismatch_detected() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let wrong = State::basis_state(space.dimension() + 1, 0).unwrap();
        assert!(matches!(
            engine.simulate(&Circuit::new(), &wrong, None, 0),
            Err(SimError::DimensionMismatch { .. }),
        ));
        let a = State::basis_state(2, 0).unwrap();
        let b = State::basis_state(3, 0).unwrap();
        assert!(matches!(
            fidelity(&a, &b),
            Err(SimError::DimensionMismatch { .. }),
        ));
    }

    #[test]
    fn mixed_targets_rejected() {
        let a = State::leaked();
        let b = State::leaked();
        assert!(matches!(fidelity(&a, &b), Err(SimError::MixedTarget)));
    }

    #[test]
    fn simplify_cancels_inverse_pairs() {
        let word = Circuit::from_gens([
            BraidGenerator::over(0),
            BraidGenerator::over(1),
            BraidGenerator::under(1),
            BraidGenerator::under(0),
            BraidGenerator::over(2),
        ]);
        let simplified = word.simplified();
        assert_eq!(simplified.gens(), &[BraidGenerator::over(2)]);
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let u = engine.compose(&word).unwrap();
        let v = engine.compose(&simplified).unwrap();
        assert!((u - v).norm() < TOL);
    }

    #[test]
    fn pair_interchange_round_trip() {
        let word = Circuit::from_gens([
            BraidGenerator::over(0),
            BraidGenerator::under(2),
        ]);
        let pairs = word.to_pairs();
        assert_eq!(pairs, vec![(0, 0), (2, 1)]);
        let back = Circuit::from_pairs(&pairs).unwrap();
        assert_eq!(word, back);
        assert!(matches!(
            Circuit::from_pairs(&[(0, 5)]),
            Err(SimError::InvalidDirection(5)),
        ));
    }

    #[test]
    fn trajectory_without_noise_matches_exact() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let circuit = Circuit::from_gens(
            [BraidGenerator::over(0), BraidGenerator::over(1)]);
        let initial = State::basis_state(space.dimension(), 0).unwrap();
        let exact = engine.simulate(&circuit, &initial, None, 0)
            .unwrap().state;
        let traj = engine.simulate(
            &circuit,
            &initial,
            Some((&NoiseSpec::none(), NoiseMode::Trajectory)),
            17,
        ).unwrap().state;
        assert!((fidelity(&exact, &traj).unwrap() - 1.0).abs() < TOL);
    }

    #[test]
    fn full_leakage_ends_trajectory() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let circuit = Circuit::from_gens([BraidGenerator::over(0)]);
        let initial = State::basis_state(space.dimension(), 0).unwrap();
        let out = engine.simulate(
            &circuit,
            &initial,
            Some((&NoiseSpec::leakage(1.0), NoiseMode::Trajectory)),
            3,
        ).unwrap();
        assert_eq!(out.state, State::leaked());
        assert_eq!(fidelity(&out.state, &initial).unwrap(), 0.0);
    }

    #[test]
    fn ensemble_fidelity_decreases_with_leakage() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let circuit = Circuit::from_gens([
            BraidGenerator::over(0),
            BraidGenerator::over(1),
            BraidGenerator::over(0),
        ]);
        let initial = State::basis_state(space.dimension(), 0).unwrap();
        let clean = engine.simulate(&circuit, &initial, None, 0)
            .unwrap().state;
        let mut prev = 1.0 + TOL;
        for p in [0.0, 0.05, 0.2, 0.5] {
            let noisy = engine.simulate(
                &circuit,
                &initial,
                Some((
                    &NoiseSpec::leakage(p),
                    NoiseMode::Ensemble { prune_eps: 0.0 },
                )),
                0,
            ).unwrap().state;
            let f = fidelity(&noisy, &clean).unwrap();
            assert!(f <= prev + TOL);
            prev = f;
        }
        assert!(prev < 0.2);
    }

    #[test]
    fn ensemble_fidelity_monotone_in_dephasing_and_depolarizing() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let circuit = Circuit::from_gens([BraidGenerator::over(1)]);
        let initial = State::basis_state(space.dimension(), 0).unwrap();
        let clean = engine.simulate(&circuit, &initial, None, 0)
            .unwrap().state;
        let channels = [
            NoiseSpec::dephasing as fn(f64) -> NoiseSpec,
            NoiseSpec::depolarizing,
        ];
        for channel in channels {
            let mut prev = 1.0 + TOL;
            for p in [0.0, 0.02, 0.1, 0.3, 0.6, 0.9] {
                let noisy = engine.simulate(
                    &circuit,
                    &initial,
                    Some((&channel(p), NoiseMode::ensemble())),
                    0,
                ).unwrap().state;
                let f = fidelity(&noisy, &clean).unwrap();
                assert!(f <= prev + TOL, "p = {}: {} > {}", p, f, prev);
                prev = f;
            }
            assert!(prev < 1.0 - TOL);
        }
    }

    #[test]
    fn norm_drift_warns_then_aborts() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let circuit = Circuit::from_gens([BraidGenerator::over(1)]);
        let dim = space.dimension();

        // drift past the warning threshold: renormalized, run continues
        let mut slightly_off =
            na::DVector::from_element(dim, C64::from(0.0));
        slightly_off[0] = C64::from(1.0 + 5e-6);
        let out = engine.simulate(
            &circuit, &State::Pure(slightly_off), None, 0).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(matches!(
            out.warnings[0],
            SimWarning::NonUnitaryDrift { step: 0, .. },
        ));
        let amps = out.state.as_pure().unwrap();
        assert!((amps.norm() - 1.0).abs() < 1e-12);

        // drift past the fatal threshold: run aborts
        let mut way_off = na::DVector::from_element(dim, C64::from(0.0));
        way_off[0] = C64::from(1.01);
        assert!(matches!(
            engine.simulate(&circuit, &State::Pure(way_off), None, 0),
            Err(SimError::NonUnitary(_)),
        ));
    }

    #[test]
    fn process_fidelity_of_matching_unitaries() {
        let (model, space) = qubit_space();
        let mut engine = Engine::new(&model, &space);
        let circuit = Circuit::from_gens(
            [BraidGenerator::over(1), BraidGenerator::under(0)]);
        let u = engine.compose(&circuit).unwrap();
        assert!((process_fidelity(&u, &u).unwrap() - 1.0).abs() < TOL);
        let dim = space.dimension();
        let id = na::DMatrix::<C64>::identity(dim, dim);
        let f = process_fidelity(&u, &id).unwrap();
        assert!((0.0..=1.0 + TOL).contains(&f));
    }
}
