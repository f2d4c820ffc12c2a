//! Error channels applied between braid steps.
//!
//! Three channel kinds are supported, each with a per-step probability:
//! dephasing (the basis clock operator Z = diag(ω^k)), depolarizing (a
//! uniformly drawn generalized Pauli from {X, Z, XZ}, with X the basis
//! shift), and leakage (weight moved outside the computational subspace,
//! contributing zero to any later fidelity).
//!
//! Two execution modes mirror the two state representations: trajectory
//! sampling draws one outcome per step from a seeded RNG and keeps the state
//! pure (or marks it leaked), while ensemble evolution branches a weighted
//! mixture deterministically, pruning branches below a weight threshold and
//! redistributing the pruned weight proportionally over the survivors.

use nalgebra as na;
use num_complex::Complex64 as C64;
use rand::Rng;
use thiserror::Error;
use crate::state::{ Branch, Ensemble };

#[derive(Debug, Error)]
pub enum NoiseError {
    /// Returned when a channel probability leaves [0, 1] or the kinds sum
    /// past 1.
    #[error("noise parameter out of range: {0}")]
    ParameterOutOfRange(String),
}
pub type NoiseResult<T> = Result<T, NoiseError>;

/// Default ensemble-pruning threshold.
pub const DEFAULT_PRUNE_EPS: f64 = 1e-9;

/* NoiseSpec ******************************************************************/

/// Per-step error probabilities for each channel kind.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct NoiseSpec {
    pub dephasing: f64,
    pub depolarizing: f64,
    pub leakage: f64,
}

impl NoiseSpec {
    pub fn none() -> Self { Self::default() }

    pub fn dephasing(p: f64) -> Self {
        Self { dephasing: p, ..Self::default() }
    }

    pub fn depolarizing(p: f64) -> Self {
        Self { depolarizing: p, ..Self::default() }
    }

    pub fn leakage(p: f64) -> Self {
        Self { leakage: p, ..Self::default() }
    }

    /// Probability that a step applies any error at all.
    pub fn total(&self) -> f64 {
        self.dephasing + self.depolarizing + self.leakage
    }

    pub fn is_trivial(&self) -> bool { self.total() == 0.0 }

    /// Check all probabilities lie in [0, 1] and sum to at most 1.
    pub fn validate(&self) -> NoiseResult<()> {
        let named = [
            ("dephasing", self.dephasing),
            ("depolarizing", self.depolarizing),
            ("leakage", self.leakage),
        ];
        for (name, p) in named {
            if !(0.0..=1.0).contains(&p) || !p.is_finite() {
                return Err(NoiseError::ParameterOutOfRange(
                    format!("{} probability {} outside [0, 1]", name, p)));
            }
        }
        if self.total() > 1.0 {
            return Err(NoiseError::ParameterOutOfRange(
                format!("probabilities sum to {} > 1", self.total())));
        }
        Ok(())
    }
}

/* NoiseChannel ***************************************************************/

/// Outcome of one trajectory-mode noise step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrajectoryOutcome {
    Survived,
    Leaked,
}

/// A validated noise spec bound to a fusion-space dimension, with its
/// perturbation operators precomputed.
#[derive(Clone, Debug)]
pub struct NoiseChannel {
    spec: NoiseSpec,
    dim: usize,
    // clock phases ω^k, ω = e^{2πi/d}
    clock: Vec<C64>,
}

impl NoiseChannel {
    pub fn new(spec: NoiseSpec, dim: usize) -> NoiseResult<Self> {
        use std::f64::consts::TAU;
        spec.validate()?;
        let clock: Vec<C64> = (0..dim)
            .map(|k| C64::cis(TAU * k as f64 / dim as f64))
            .collect();
        Ok(Self { spec, dim, clock })
    }

    pub fn spec(&self) -> &NoiseSpec { &self.spec }

    fn apply_clock(&self, amps: &mut na::DVector<C64>) {
        amps.iter_mut()
            .zip(self.clock.iter())
            .for_each(|(a, w)| { *a *= *w; });
    }

    fn apply_shift(&self, amps: &mut na::DVector<C64>) {
        if self.dim < 2 { return; }
        let last = amps[self.dim - 1];
        for k in (1..self.dim).rev() { amps[k] = amps[k - 1]; }
        amps[0] = last;
    }

    /// Sample one noise outcome and apply it in place. The partition of
    /// the unit interval is fixed (leak, dephase, depolarize, identity) so
    /// a given seed reproduces the same outcome sequence.
    pub fn step_trajectory<R: Rng>(
        &self,
        amps: &mut na::DVector<C64>,
        rng: &mut R,
    ) -> TrajectoryOutcome {
        if self.spec.is_trivial() { return TrajectoryOutcome::Survived; }
        let u: f64 = rng.gen();
        if u < self.spec.leakage {
            return TrajectoryOutcome::Leaked;
        }
        if u < self.spec.leakage + self.spec.dephasing {
            self.apply_clock(amps);
            return TrajectoryOutcome::Survived;
        }
        if u < self.spec.total() {
            match rng.gen_range(0..3_u8) {
                0 => { self.apply_shift(amps); }
                1 => { self.apply_clock(amps); }
                _ => { self.apply_clock(amps); self.apply_shift(amps); }
            }
        }
        TrajectoryOutcome::Survived
    }

    /// Branch every ensemble member across the channel outcomes, then
    /// prune branches lighter than `prune_eps`, redistributing their
    /// weight proportionally over the survivors.
    pub fn step_ensemble(&self, ens: &mut Ensemble, prune_eps: f64) {
        if self.spec.is_trivial() { return; }
        let p_id = 1.0 - self.spec.total();
        let p_z = self.spec.dephasing + self.spec.depolarizing / 3.0;
        let p_x = self.spec.depolarizing / 3.0;
        let mut next: Vec<Branch> = Vec::new();
        let mut leaked = ens.leaked;
        for Branch { weight, amps } in ens.branches.drain(..) {
            leaked += weight * self.spec.leakage;
            if p_id > 0.0 {
                next.push(Branch {
                    weight: weight * p_id,
                    amps: amps.clone(),
                });
            }
            if p_z > 0.0 {
                let mut z = amps.clone();
                self.apply_clock(&mut z);
                next.push(Branch { weight: weight * p_z, amps: z });
            }
            if p_x > 0.0 {
                let mut x = amps.clone();
                self.apply_shift(&mut x);
                let mut xz = amps;
                self.apply_clock(&mut xz);
                self.apply_shift(&mut xz);
                next.push(Branch { weight: weight * p_x, amps: x });
                next.push(Branch { weight: weight * p_x, amps: xz });
            }
        }
        let before: f64 = next.iter().map(|b| b.weight).sum();
        next.retain(|b| b.weight >= prune_eps);
        let after: f64 = next.iter().map(|b| b.weight).sum();
        if after > 0.0 && after < before {
            let scale = before / after;
            next.iter_mut().for_each(|b| { b.weight *= scale; });
        } else if after == 0.0 {
            leaked += before;
        }
        ens.branches = next;
        ens.leaked = leaked;
    }
}
