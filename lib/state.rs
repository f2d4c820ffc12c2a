//! State representations over a fusion-space basis.
//!
//! A [`State`] is either pure (a dense complex amplitude vector keyed
//! against the canonical basis ordering of a [`FusionSpace`][fs]) or mixed:
//! a weighted ensemble of normalized pure vectors together with the weight
//! that has leaked outside the computational subspace. Ensemble weights plus
//! the leaked weight always sum to 1; leaked weight contributes zero to any
//! fidelity.
//!
//! [fs]: crate::fusion::FusionSpace

use nalgebra as na;
use num_complex::Complex64 as C64;
use rand::Rng;

/// One ensemble member: a normalized amplitude vector and its classical
/// weight.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub weight: f64,
    pub amps: na::DVector<C64>,
}

/// A classical mixture of pure amplitude vectors plus leaked weight.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Ensemble {
    pub branches: Vec<Branch>,
    pub leaked: f64,
}

impl Ensemble {
    /// Sum of branch weights plus leaked weight; 1 for a valid ensemble.
    pub fn total_weight(&self) -> f64 {
        self.leaked + self.branches.iter().map(|b| b.weight).sum::<f64>()
    }
}

/// A quantum state over a fusion-space basis.
#[derive(Clone, Debug, PartialEq)]
pub enum State {
    Pure(na::DVector<C64>),
    Mixed(Ensemble),
}

/// Interchange form of a [`State`]: per-branch `(weight, amplitudes)` with
/// amplitudes as `(tree index, re, im)` triples, plus leaked weight. A pure
/// state is a single branch of weight 1 with zero leakage.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct StateInterchange {
    pub branches: Vec<(f64, Vec<(usize, f64, f64)>)>,
    pub leaked: f64,
}

impl State {
    /// The pure state with all amplitude on basis tree `k`, or `None` if
    /// `k` is out of range.
    pub fn basis_state(dim: usize, k: usize) -> Option<Self> {
        (k < dim).then(|| {
            let mut amps = na::DVector::from_element(dim, C64::from(0.0));
            amps[k] = C64::from(1.0);
            Self::Pure(amps)
        })
    }

    /// A pure state from raw amplitudes, normalized.
    pub fn pure(amps: na::DVector<C64>) -> Self {
        let norm = amps.norm();
        if norm > 0.0 {
            Self::Pure(amps.unscale(norm))
        } else {
            Self::Pure(amps)
        }
    }

    /// The fully leaked state: zero weight in the computational subspace.
    pub fn leaked() -> Self {
        Self::Mixed(Ensemble { branches: Vec::new(), leaked: 1.0 })
    }

    pub fn is_pure(&self) -> bool { matches!(self, Self::Pure(_)) }

    /// Basis dimension the amplitudes are keyed against; 0 for a fully
    /// leaked ensemble.
    pub fn dimension(&self) -> usize {
        match self {
            Self::Pure(amps) => amps.len(),
            Self::Mixed(ens) =>
                ens.branches.first().map(|b| b.amps.len()).unwrap_or(0),
        }
    }

    /// Weight remaining in the computational subspace.
    pub fn surviving_weight(&self) -> f64 {
        match self {
            Self::Pure(_) => 1.0,
            Self::Mixed(ens) =>
                ens.branches.iter().map(|b| b.weight).sum::<f64>(),
        }
    }

    pub fn as_pure(&self) -> Option<&na::DVector<C64>> {
        match self {
            Self::Pure(amps) => Some(amps),
            Self::Mixed(_) => None,
        }
    }

    pub fn as_mixed(&self) -> Option<&Ensemble> {
        match self {
            Self::Pure(_) => None,
            Self::Mixed(ens) => Some(ens),
        }
    }

    /// Sample a projective measurement outcome in the canonical basis:
    /// `Some(tree index)`, or `None` when the leaked component is drawn.
    ///
    /// Sampling does not collapse the state.
    pub fn sample_basis<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        match self {
            Self::Pure(amps) => Some(sample_amps(amps, rng)),
            Self::Mixed(ens) => {
                let mut u: f64 = rng.gen::<f64>() * ens.total_weight();
                for branch in ens.branches.iter() {
                    if u < branch.weight {
                        return Some(sample_amps(&branch.amps, rng));
                    }
                    u -= branch.weight;
                }
                None
            }
        }
    }

    /// Convert to the neutral interchange representation.
    pub fn to_interchange(&self) -> StateInterchange {
        let triples = |amps: &na::DVector<C64>| {
            amps.iter()
                .enumerate()
                .filter(|(_, a)| a.norm_sqr() > 0.0)
                .map(|(k, a)| (k, a.re, a.im))
                .collect::<Vec<(usize, f64, f64)>>()
        };
        match self {
            Self::Pure(amps) => StateInterchange {
                branches: vec![(1.0, triples(amps))],
                leaked: 0.0,
            },
            Self::Mixed(ens) => StateInterchange {
                branches: ens.branches.iter()
                    .map(|b| (b.weight, triples(&b.amps)))
                    .collect(),
                leaked: ens.leaked,
            },
        }
    }

    /// Rebuild from interchange form against a basis of dimension `dim`;
    /// `None` if any tree index is out of range.
    pub fn from_interchange(dim: usize, repr: &StateInterchange)
        -> Option<Self>
    {
        let build = |triples: &[(usize, f64, f64)]| {
            let mut amps = na::DVector::from_element(dim, C64::from(0.0));
            for &(k, re, im) in triples {
                if k >= dim { return None; }
                amps[k] = C64::new(re, im);
            }
            Some(amps)
        };
        if repr.leaked == 0.0 && repr.branches.len() == 1
            && repr.branches[0].0 == 1.0
        {
            return build(&repr.branches[0].1).map(Self::Pure);
        }
        let mut branches: Vec<Branch> = Vec::new();
        for (weight, triples) in repr.branches.iter() {
            branches.push(Branch { weight: *weight, amps: build(triples)? });
        }
        Some(Self::Mixed(Ensemble { branches, leaked: repr.leaked }))
    }
}

fn sample_amps<R: Rng>(amps: &na::DVector<C64>, rng: &mut R) -> usize {
    let mut u: f64 = rng.gen::<f64>() * amps.norm_squared();
    for (k, a) in amps.iter().enumerate() {
        let p = a.norm_sqr();
        if u < p { return k; }
        u -= p;
    }
    amps.len() - 1
}
