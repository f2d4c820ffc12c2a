//! Algebraic data for anyon models: charge tables, fusion rules, and the
//! R- and F-symbols that fix braiding and recoupling.
//!
//! A model is a pure table lookup: adding a new model means supplying new
//! tables (see [`ModelTables`]), not writing a new code path. The two
//! built-in models are the Fibonacci model ({1, τ} with τ × τ = 1 + τ) and
//! the Ising model ({1, ψ, σ} with σ × σ = 1 + ψ), both with exact analytic
//! symbol values.
//!
//! Symbol conventions (multiplicity-free):
//! - `[F^{abc}_d]_{e,f}` is the change of basis
//!   ((a b)_e c)_d = Σ_f [F^{abc}_d]_{e,f} (a (b c)_f)_d;
//! - `R^{ab}_c` is the phase acquired when a and b, fused into c, are
//!   exchanged counterclockwise.
//!
//! [`AnyonModel::verify_consistency`] checks the pentagon and hexagon
//! identities numerically, together with the ribbon identity
//! R^{ab}_c R^{ba}_c = θ_c / (θ_a θ_b), F-block unitarity, and |R| = 1.

use std::fmt;
use itertools::Itertools;
use nalgebra as na;
use num_complex::Complex64 as C64;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Returned when a model name has no registered tables.
    #[error("unknown anyon model '{0}'")]
    UnknownAnyonModel(String),

    /// Returned when supplied tables are structurally malformed.
    #[error("malformed model tables: {0}")]
    InvalidTables(String),

    /// Returned when the pentagon, hexagon, or ribbon identities fail; a
    /// model failing this check must not be used.
    #[error("consistency check failed: {0}")]
    Consistency(String),
}
pub type ModelResult<T> = Result<T, ModelError>;

/* Charge *********************************************************************/

/// Index of a topological charge in a model's charge table.
///
/// Charge `0` is always the vacuum (trivial) charge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Charge(pub(crate) usize);

impl Charge {
    /// The vacuum charge, present in every model.
    pub const VACUUM: Self = Self(0);

    /// Position of the charge in its model's charge table.
    pub fn index(self) -> usize { self.0 }

    pub fn is_vacuum(self) -> bool { self.0 == 0 }
}

impl fmt::Display for Charge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/* Tables *********************************************************************/

/// Static data for a single charge.
#[derive(Clone, Debug)]
pub struct ChargeDef {
    /// Display label, e.g. `"tau"` or `"sigma"`.
    pub label: String,
    /// Quantum dimension; positive real.
    pub qdim: f64,
    /// Topological spin; unit-modulus phase.
    pub spin: C64,
}

/// Raw tables defining an anyon model.
///
/// Fusion rules are given for unordered pairs `(a, b)` with `a ≤ b`; the
/// vacuum rules `1 × a = a` are implied and must not be listed. R- and
/// F-entries default to `+1` on every admissible key and are replaced by the
/// listed overrides, so only the gauge-nontrivial symbols need to be
/// written out.
#[derive(Clone, Debug)]
pub struct ModelTables {
    pub name: String,
    /// Charge table; index 0 must be the vacuum (label free, qdim 1, spin 1).
    pub charges: Vec<ChargeDef>,
    /// `(a, b, outcomes)` with each outcome a `(charge, multiplicity)` pair.
    pub fusion: Vec<(usize, usize, Vec<(usize, usize)>)>,
    /// `(a, b, c, value)` overrides for `R^{ab}_c`.
    pub r_overrides: Vec<(usize, usize, usize, C64)>,
    /// `([a, b, c, d, e, f], value)` overrides for `[F^{abc}_d]_{e,f}`.
    pub f_overrides: Vec<([usize; 6], C64)>,
}

/* AnyonModel *****************************************************************/

type FKey = (Charge, Charge, Charge, Charge, Charge, Charge);

/// A complete anyon model: charges, fusion rules, and R/F symbol tables.
///
/// Immutable once constructed; safe to share by reference across worker
/// threads.
#[derive(Clone, Debug)]
pub struct AnyonModel {
    name: String,
    charges: Vec<ChargeDef>,
    fusion: FxHashMap<(Charge, Charge), Vec<(Charge, usize)>>,
    rtab: FxHashMap<(Charge, Charge, Charge), C64>,
    ftab: FxHashMap<FKey, C64>,
}

static BUILDERS: Lazy<FxHashMap<&'static str, fn() -> AnyonModel>> =
    Lazy::new(|| {
        let mut m: FxHashMap<&'static str, fn() -> AnyonModel> =
            FxHashMap::default();
        m.insert("fibonacci", fibonacci as fn() -> AnyonModel);
        m.insert("ising", ising as fn() -> AnyonModel);
        m
    });

impl AnyonModel {
    /// Construct a registered model by name.
    ///
    /// Known names are `"fibonacci"` and `"ising"`.
    pub fn named(name: &str) -> ModelResult<Self> {
        BUILDERS.get(name)
            .map(|build| build())
            .ok_or_else(|| ModelError::UnknownAnyonModel(name.to_string()))
    }

    /// Names of all registered models.
    pub fn registered() -> Vec<&'static str> {
        BUILDERS.keys().copied().sorted().collect()
    }

    /// Build a model from raw tables.
    ///
    /// Validates table shape only; run [`Self::verify_consistency`] before
    /// trusting the algebra.
    pub fn from_tables(tables: ModelTables) -> ModelResult<Self> {
        let ModelTables { name, charges, fusion, r_overrides, f_overrides }
            = tables;
        if charges.is_empty() {
            return Err(ModelError::InvalidTables("empty charge table".into()));
        }
        let n = charges.len();
        let check = |k: usize| -> ModelResult<Charge> {
            if k < n {
                Ok(Charge(k))
            } else {
                Err(ModelError::InvalidTables(
                    format!("charge index {} out of range", k)))
            }
        };
        let mut fmap: FxHashMap<(Charge, Charge), Vec<(Charge, usize)>> =
            FxHashMap::default();
        // implied vacuum rules
        for k in 0..n {
            let a = Charge(k);
            fmap.insert((Charge::VACUUM, a), vec![(a, 1)]);
            if k != 0 { fmap.insert((a, Charge::VACUUM), vec![(a, 1)]); }
        }
        for (ka, kb, outs) in fusion.into_iter() {
            let a = check(ka)?;
            let b = check(kb)?;
            if a.is_vacuum() || b.is_vacuum() {
                return Err(ModelError::InvalidTables(
                    "vacuum fusion rules are implied".into()));
            }
            let mut outcomes: Vec<(Charge, usize)> = Vec::new();
            for (kc, mult) in outs.into_iter() {
                if mult == 0 {
                    return Err(ModelError::InvalidTables(
                        "zero multiplicity".into()));
                }
                outcomes.push((check(kc)?, mult));
            }
            outcomes.sort_by_key(|(c, _)| *c);
            if fmap.insert((a, b), outcomes.clone()).is_some() {
                return Err(ModelError::InvalidTables(
                    format!("duplicate fusion rule for ({}, {})", ka, kb)));
            }
            if a != b { fmap.insert((b, a), outcomes); }
        }
        let mut model = Self {
            name,
            charges,
            fusion: fmap,
            rtab: FxHashMap::default(),
            ftab: FxHashMap::default(),
        };
        model.fill_default_symbols();
        for (ka, kb, kc, val) in r_overrides.into_iter() {
            let key = (check(ka)?, check(kb)?, check(kc)?);
            if !model.rtab.contains_key(&key) {
                return Err(ModelError::InvalidTables(
                    format!("R override on inadmissible ({ka}, {kb}, {kc})")));
            }
            model.rtab.insert(key, val);
        }
        for (k, val) in f_overrides.into_iter() {
            let key = (
                check(k[0])?, check(k[1])?, check(k[2])?,
                check(k[3])?, check(k[4])?, check(k[5])?,
            );
            if !model.ftab.contains_key(&key) {
                return Err(ModelError::InvalidTables(
                    format!("F override on inadmissible {:?}", k)));
            }
            model.ftab.insert(key, val);
        }
        Ok(model)
    }

    // Populate every admissible R and F key with +1; overrides are applied
    // on top by `from_tables`.
    fn fill_default_symbols(&mut self) {
        let one = C64::from(1.0);
        let all: Vec<Charge> = self.charges().collect();
        let rkeys: Vec<(Charge, Charge, Charge)> = all.iter()
            .cartesian_product(all.iter())
            .flat_map(|(&a, &b)| {
                self.fuse(a, b).iter().map(move |&(c, _)| (a, b, c))
            })
            .collect();
        for key in rkeys { self.rtab.insert(key, one); }
        for key in self.admissible_f_keys() {
            self.ftab.insert(key, one);
        }
    }

    fn admissible_f_keys(&self) -> Vec<FKey> {
        let all: Vec<Charge> = self.charges().collect();
        let mut keys: Vec<FKey> = Vec::new();
        for (&a, &b, &c) in all.iter()
            .cartesian_product(all.iter())
            .cartesian_product(all.iter())
            .map(|((a, b), c)| (a, b, c))
        {
            for &(e, _) in self.fuse(a, b) {
                for &(d, _) in self.fuse(e, c) {
                    for &(f, _) in self.fuse(b, c) {
                        if self.n(a, f, d) > 0 {
                            keys.push((a, b, c, d, e, f));
                        }
                    }
                }
            }
        }
        keys
    }

    pub fn name(&self) -> &str { &self.name }

    /// Number of distinct charges.
    pub fn charge_count(&self) -> usize { self.charges.len() }

    /// Iterator over all charges, vacuum first.
    pub fn charges(&self) -> impl Iterator<Item = Charge> + '_ {
        (0..self.charges.len()).map(Charge)
    }

    /// Look up a charge by label.
    pub fn charge(&self, label: &str) -> Option<Charge> {
        self.charges.iter()
            .position(|def| def.label == label)
            .map(Charge)
    }

    pub fn label(&self, c: Charge) -> &str { &self.charges[c.0].label }

    /// Quantum dimension of `c`.
    pub fn quantum_dim(&self, c: Charge) -> f64 { self.charges[c.0].qdim }

    /// Topological spin of `c`; a unit-modulus phase.
    pub fn topological_spin(&self, c: Charge) -> C64 { self.charges[c.0].spin }

    /// Fusion outcomes of `a × b` as `(charge, multiplicity)` pairs, sorted
    /// by charge index.
    pub fn fuse(&self, a: Charge, b: Charge) -> &[(Charge, usize)] {
        self.fusion.get(&(a, b)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Multiplicity of `c` in `a × b`; 0 if inadmissible.
    pub fn n(&self, a: Charge, b: Charge, c: Charge) -> usize {
        self.fuse(a, b).iter()
            .find(|(out, _)| *out == c)
            .map(|(_, mult)| *mult)
            .unwrap_or(0)
    }

    /// Braiding phase `R^{ab}_c`; 0 if `c ∉ a × b`.
    ///
    /// `channel` indexes the fusion vertex when the multiplicity of `c`
    /// exceeds 1; the built-in tables are multiplicity-free and resolve
    /// every channel to the same scalar.
    pub fn r_phase(&self, a: Charge, b: Charge, c: Charge, channel: usize)
        -> C64
    {
        let _ = channel;
        self.rtab.get(&(a, b, c)).copied().unwrap_or_else(|| C64::from(0.0))
    }

    /// Recoupling entry `[F^{abc}_d]_{e,f}`; 0 on inadmissible keys.
    pub fn f_entry(
        &self,
        a: Charge, b: Charge, c: Charge, d: Charge,
        e: Charge, f: Charge,
    ) -> C64 {
        self.ftab.get(&(a, b, c, d, e, f)).copied()
            .unwrap_or_else(|| C64::from(0.0))
    }

    /// Full recoupling block `[F^{abc}_d]` as a matrix, together with its
    /// row labels (admissible `e`) and column labels (admissible `f`).
    pub fn f_block(&self, a: Charge, b: Charge, c: Charge, d: Charge)
        -> (Vec<Charge>, Vec<Charge>, na::DMatrix<C64>)
    {
        let rows: Vec<Charge> = self.fuse(a, b).iter()
            .filter(|&&(e, _)| self.n(e, c, d) > 0)
            .map(|&(e, _)| e)
            .collect();
        let cols: Vec<Charge> = self.fuse(b, c).iter()
            .filter(|&&(f, _)| self.n(a, f, d) > 0)
            .map(|&(f, _)| f)
            .collect();
        let mat = na::DMatrix::from_fn(rows.len(), cols.len(), |i, j| {
            self.f_entry(a, b, c, d, rows[i], cols[j])
        });
        (rows, cols, mat)
    }

    /// Numerically verify the pentagon, both hexagons, the ribbon identity,
    /// F-block unitarity, and |R| = 1, all within `tol`.
    ///
    /// A model failing this check must not be used further.
    pub fn verify_consistency(&self, tol: f64) -> ModelResult<()> {
        self.check_moduli(tol)?;
        self.check_f_unitarity(tol)?;
        self.check_pentagon(tol)?;
        self.check_hexagon(tol)?;
        self.check_ribbon(tol)?;
        Ok(())
    }

    fn check_moduli(&self, tol: f64) -> ModelResult<()> {
        for (&(a, b, c), r) in self.rtab.iter() {
            if (r.norm() - 1.0).abs() > tol {
                return Err(ModelError::Consistency(format!(
                    "|R^({},{})_{}| = {} != 1", a, b, c, r.norm())));
            }
        }
        Ok(())
    }

    fn check_f_unitarity(&self, tol: f64) -> ModelResult<()> {
        let all: Vec<Charge> = self.charges().collect();
        for (&a, &b, &c, &d) in all.iter()
            .cartesian_product(all.iter())
            .cartesian_product(all.iter())
            .cartesian_product(all.iter())
            .map(|(((a, b), c), d)| (a, b, c, d))
        {
            let (rows, cols, mat) = self.f_block(a, b, c, d);
            if rows.is_empty() && cols.is_empty() { continue; }
            if rows.len() != cols.len() {
                return Err(ModelError::Consistency(format!(
                    "F^({},{},{})_{} block is not square", a, b, c, d)));
            }
            let dim = rows.len();
            let dev = (mat.adjoint() * &mat
                    - na::DMatrix::<C64>::identity(dim, dim))
                .norm();
            if dev > tol {
                return Err(ModelError::Consistency(format!(
                    "F^({},{},{})_{} deviates from unitarity by {:e}",
                    a, b, c, d, dev)));
            }
        }
        Ok(())
    }

    fn check_pentagon(&self, tol: f64) -> ModelResult<()> {
        let all: Vec<Charge> = self.charges().collect();
        let labels = || all.iter().copied();
        for (a, b, c, d) in
            itertools::iproduct!(labels(), labels(), labels(), labels())
        {
            for (e, f, g, k, l) in itertools::iproduct!(
                labels(), labels(), labels(), labels(), labels())
            {
                let lhs = self.f_entry(f, c, d, e, g, l)
                    * self.f_entry(a, b, l, e, f, k);
                let rhs: C64 = labels()
                    .map(|h| {
                        self.f_entry(a, b, c, g, f, h)
                            * self.f_entry(a, h, d, e, g, k)
                            * self.f_entry(b, c, d, k, h, l)
                    })
                    .sum();
                if (lhs - rhs).norm() > tol {
                    return Err(ModelError::Consistency(format!(
                        "pentagon fails at a={}, b={}, c={}, d={}, e={}, \
                        f={}, g={}, k={}, l={}: |{} - {}|",
                        a, b, c, d, e, f, g, k, l, lhs, rhs)));
                }
            }
        }
        Ok(())
    }

    // R^{ac}_e [F^{acb}_d]_{e,g} R^{bc}_g
    //     = Σ_f [F^{cab}_d]_{e,f} R^{fc}_d [F^{abc}_d]_{f,g}
    // and its mirror with R ↦ R⁻¹ = R̄.
    fn check_hexagon(&self, tol: f64) -> ModelResult<()> {
        let all: Vec<Charge> = self.charges().collect();
        let labels = || all.iter().copied();
        let r = |a, b, c, conj: bool| -> C64 {
            let val = self.r_phase(a, b, c, 0);
            if conj { val.conj() } else { val }
        };
        for conj in [false, true] {
            for (a, b, c, d, e, g) in itertools::iproduct!(
                labels(), labels(), labels(), labels(), labels(), labels())
            {
                let lhs = r(a, c, e, conj)
                    * self.f_entry(a, c, b, d, e, g)
                    * r(b, c, g, conj);
                let rhs: C64 = labels()
                    .map(|f| {
                        self.f_entry(c, a, b, d, e, f)
                            * r(f, c, d, conj)
                            * self.f_entry(a, b, c, d, f, g)
                    })
                    .sum();
                if (lhs - rhs).norm() > tol {
                    return Err(ModelError::Consistency(format!(
                        "hexagon ({}) fails at a={}, b={}, c={}, d={}, \
                        e={}, g={}",
                        if conj { "R⁻¹" } else { "R" }, a, b, c, d, e, g)));
                }
            }
        }
        Ok(())
    }

    fn check_ribbon(&self, tol: f64) -> ModelResult<()> {
        for (&(a, b, c), &rab) in self.rtab.iter() {
            let rba = self.r_phase(b, a, c, 0);
            let lhs = rab * rba;
            let rhs = self.topological_spin(c)
                / (self.topological_spin(a) * self.topological_spin(b));
            if (lhs - rhs).norm() > tol {
                return Err(ModelError::Consistency(format!(
                    "ribbon identity fails at a={}, b={}, c={}", a, b, c)));
            }
        }
        Ok(())
    }
}

impl fmt::Display for AnyonModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.name)?;
        for (k, def) in self.charges.iter().enumerate() {
            write!(f, "{}", def.label)?;
            if k < self.charges.len() - 1 { write!(f, ", ")?; }
        }
        write!(f, "}}")
    }
}

/* Built-in models ************************************************************/

/// The Fibonacci model: charges {1, τ}, τ × τ = 1 + τ.
///
/// `[F^{τττ}_τ]` is the golden-ratio recoupling matrix; R^{ττ}_1 =
/// e^{-4πi/5}, R^{ττ}_τ = e^{3πi/5}.
pub fn fibonacci() -> AnyonModel {
    use std::f64::consts::PI;
    let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
    const VAC: usize = 0;
    const TAU: usize = 1;
    let tables = ModelTables {
        name: "fibonacci".into(),
        charges: vec![
            ChargeDef {
                label: "1".into(),
                qdim: 1.0,
                spin: C64::from(1.0),
            },
            ChargeDef {
                label: "tau".into(),
                qdim: phi,
                spin: C64::cis(4.0 * PI / 5.0),
            },
        ],
        fusion: vec![
            (TAU, TAU, vec![(VAC, 1), (TAU, 1)]),
        ],
        r_overrides: vec![
            (TAU, TAU, VAC, C64::cis(-4.0 * PI / 5.0)),
            (TAU, TAU, TAU, C64::cis(3.0 * PI / 5.0)),
        ],
        f_overrides: vec![
            ([TAU, TAU, TAU, TAU, VAC, VAC], C64::from(1.0 / phi)),
            ([TAU, TAU, TAU, TAU, VAC, TAU], C64::from(1.0 / phi.sqrt())),
            ([TAU, TAU, TAU, TAU, TAU, VAC], C64::from(1.0 / phi.sqrt())),
            ([TAU, TAU, TAU, TAU, TAU, TAU], C64::from(-1.0 / phi)),
        ],
    };
    AnyonModel::from_tables(tables)
        .unwrap_or_else(|_| unreachable!("fibonacci tables are well-formed"))
}

/// The Ising model: charges {1, ψ, σ}, σ × σ = 1 + ψ, σ × ψ = σ, ψ × ψ = 1.
///
/// σ carries spin e^{iπ/8} and quantum dimension √2.
pub fn ising() -> AnyonModel {
    use std::f64::consts::{ PI, FRAC_1_SQRT_2 };
    const VAC: usize = 0;
    const PSI: usize = 1;
    const SIG: usize = 2;
    let ort2 = C64::from(FRAC_1_SQRT_2);
    let tables = ModelTables {
        name: "ising".into(),
        charges: vec![
            ChargeDef {
                label: "1".into(),
                qdim: 1.0,
                spin: C64::from(1.0),
            },
            ChargeDef {
                label: "psi".into(),
                qdim: 1.0,
                spin: C64::from(-1.0),
            },
            ChargeDef {
                label: "sigma".into(),
                qdim: 2.0_f64.sqrt(),
                spin: C64::cis(PI / 8.0),
            },
        ],
        fusion: vec![
            (PSI, PSI, vec![(VAC, 1)]),
            (PSI, SIG, vec![(SIG, 1)]),
            (SIG, SIG, vec![(VAC, 1), (PSI, 1)]),
        ],
        r_overrides: vec![
            (SIG, SIG, VAC, C64::cis(-PI / 8.0)),
            (SIG, SIG, PSI, C64::cis(3.0 * PI / 8.0)),
            (SIG, PSI, SIG, -C64::i()),
            (PSI, SIG, SIG, -C64::i()),
            (PSI, PSI, VAC, C64::from(-1.0)),
        ],
        f_overrides: vec![
            ([SIG, SIG, SIG, SIG, VAC, VAC], ort2),
            ([SIG, SIG, SIG, SIG, VAC, PSI], ort2),
            ([SIG, SIG, SIG, SIG, PSI, VAC], ort2),
            ([SIG, SIG, SIG, SIG, PSI, PSI], -ort2),
            ([PSI, SIG, PSI, SIG, SIG, SIG], C64::from(-1.0)),
            ([SIG, PSI, SIG, PSI, SIG, SIG], C64::from(-1.0)),
        ],
    };
    AnyonModel::from_tables(tables)
        .unwrap_or_else(|_| unreachable!("ising tables are well-formed"))
}

#[cfg(test)]
mod test {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn unknown_model_name() {
        assert!(matches!(
            AnyonModel::named("heisenbug"),
            Err(ModelError::UnknownAnyonModel(_)),
        ));
    }

    #[test]
    fn registered_models() {
        assert_eq!(AnyonModel::registered(), vec!["fibonacci", "ising"]);
    }

    #[test]
    fn fibonacci_is_consistent() {
        let model = AnyonModel::named("fibonacci").unwrap();
        model.verify_consistency(TOL).unwrap();
    }

    #[test]
    fn ising_is_consistent() {
        let model = AnyonModel::named("ising").unwrap();
        model.verify_consistency(TOL).unwrap();
    }

    #[test]
    fn fusion_is_symmetric() {
        let model = ising();
        for a in model.charges() {
            for b in model.charges() {
                assert_eq!(model.fuse(a, b), model.fuse(b, a));
            }
        }
    }

    #[test]
    fn fibonacci_fusion_rules() {
        let model = fibonacci();
        let tau = model.charge("tau").unwrap();
        let vac = Charge::VACUUM;
        assert_eq!(model.fuse(tau, tau), &[(vac, 1), (tau, 1)]);
        assert_eq!(model.fuse(vac, tau), &[(tau, 1)]);
        assert_eq!(model.n(tau, tau, tau), 1);
        assert_eq!(model.n(tau, vac, vac), 0);
    }

    #[test]
    fn tampered_f_entry_fails_consistency() {
        let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
        let tables = ModelTables {
            name: "fibonacci-broken".into(),
            charges: vec![
                ChargeDef {
                    label: "1".into(),
                    qdim: 1.0,
                    spin: C64::from(1.0),
                },
                ChargeDef {
                    label: "tau".into(),
                    qdim: phi,
                    spin: C64::cis(4.0 * std::f64::consts::PI / 5.0),
                },
            ],
            fusion: vec![(1, 1, vec![(0, 1), (1, 1)])],
            r_overrides: vec![
                (1, 1, 0, C64::cis(-4.0 * std::f64::consts::PI / 5.0)),
                (1, 1, 1, C64::cis(3.0 * std::f64::consts::PI / 5.0)),
            ],
            // sign flipped on the (1, tau) entry
            f_overrides: vec![
                ([1, 1, 1, 1, 0, 0], C64::from(1.0 / phi)),
                ([1, 1, 1, 1, 0, 1], C64::from(-1.0 / phi.sqrt())),
                ([1, 1, 1, 1, 1, 0], C64::from(1.0 / phi.sqrt())),
                ([1, 1, 1, 1, 1, 1], C64::from(-1.0 / phi)),
            ],
        };
        let model = AnyonModel::from_tables(tables).unwrap();
        assert!(matches!(
            model.verify_consistency(1e-9),
            Err(ModelError::Consistency(_)),
        ));
    }

    #[test]
    fn invalid_tables_rejected() {
        let tables = ModelTables {
            name: "bad".into(),
            charges: vec![
                ChargeDef {
                    label: "1".into(),
                    qdim: 1.0,
                    spin: C64::from(1.0),
                },
            ],
            fusion: vec![(0, 7, vec![(0, 1)])],
            r_overrides: Vec::new(),
            f_overrides: Vec::new(),
        };
        assert!(matches!(
            AnyonModel::from_tables(tables),
            Err(ModelError::InvalidTables(_)),
        ));
    }

    #[test]
    fn f_blocks_match_entries() {
        let model = fibonacci();
        let tau = model.charge("tau").unwrap();
        let (rows, cols, mat) = model.f_block(tau, tau, tau, tau);
        assert_eq!(rows.len(), 2);
        assert_eq!(cols.len(), 2);
        for (i, &e) in rows.iter().enumerate() {
            for (j, &f) in cols.iter().enumerate() {
                assert_eq!(mat[(i, j)], model.f_entry(tau, tau, tau, tau, e, f));
            }
        }
    }
}
