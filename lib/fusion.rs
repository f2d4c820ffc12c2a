//! Fusion trees and the fusion-space basis they induce.
//!
//! A [`FusionTree`] is an ordered binary tree whose leaves carry the external
//! anyon charges in their fixed input order, whose internal vertices carry
//! fusion outcomes (plus a channel index when a fusion multiplicity exceeds
//! 1), and whose root carries the total charge. Trees are stored as an arena
//! of node records referenced by index, so recoupling moves rewire a couple
//! of slots instead of juggling ownership; equality and hashing are
//! structural and independent of slot layout.
//!
//! A [`FusionSpace`] enumerates every valid tree over a fixed leaf charge
//! sequence and total charge in the canonical left-associated ("left comb")
//! shape, ordered lexicographically by intermediate charge indices and
//! channels. That ordering is deterministic across runs and is the basis
//! ordering every amplitude vector and operator matrix in this crate is
//! keyed against.

use std::{
    hash::{ Hash, Hasher },
    sync::Arc,
};
use num_complex::Complex64 as C64;
use rustc_hash::FxHashMap;
use thiserror::Error;
use crate::model::{ AnyonModel, Charge };

#[derive(Debug, Error)]
pub enum FusionError {
    /// Returned when the requested total charge cannot be reached by fusing
    /// the given external charges.
    #[error("total charge is unreachable from the given external charges")]
    InvalidFusion,

    /// Returned for a recoupling request at a node that is not an internal
    /// vertex with an internal child.
    #[error("node {0} cannot be recoupled")]
    BadVertex(usize),
}
pub type FusionResult<T> = Result<T, FusionError>;

/* FusionTree *****************************************************************/

/// A single arena slot: either an external leaf or an internal fusion
/// vertex referencing its children by slot index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Leaf { charge: Charge },
    Vertex { left: usize, right: usize, charge: Charge, channel: usize },
}

impl Node {
    pub fn charge(&self) -> Charge {
        match *self {
            Self::Leaf { charge } => charge,
            Self::Vertex { charge, .. } => charge,
        }
    }
}

/// An arena-backed fusion tree; one basis vector of a fusion space.
///
/// Invariant: at every vertex, the two children's charges fuse to the
/// vertex's charge under the model's fusion rules. Construction sites
/// ([`FusionSpace::new`], recoupling, braiding) maintain this.
#[derive(Clone, Debug)]
pub struct FusionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: usize,
}

impl FusionTree {
    /// Build the canonical left comb: leaves in input order, vertex `k`
    /// fusing the first `k + 2` leaves with intermediate data `inner[k]`.
    /// The last intermediate is the total charge. `inner` must hold
    /// `charges.len() - 1` entries.
    pub(crate) fn left_comb(
        charges: &[Charge],
        inner: &[(Charge, usize)],
    ) -> Self {
        let n = charges.len();
        let mut nodes: Vec<Node> = charges.iter()
            .map(|&charge| Node::Leaf { charge })
            .collect();
        if n == 1 { return Self { nodes, root: 0 }; }
        let mut left = 0;
        for (k, &(charge, channel)) in inner.iter().enumerate() {
            nodes.push(Node::Vertex { left, right: k + 1, charge, channel });
            left = n + k;
        }
        Self { nodes, root: left }
    }

    pub fn node(&self, k: usize) -> &Node { &self.nodes[k] }

    pub fn root(&self) -> usize { self.root }

    /// Total charge carried at the root.
    pub fn root_charge(&self) -> Charge { self.nodes[self.root].charge() }

    /// Number of external anyons.
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// External charges in left-to-right tree order.
    pub fn leaf_charges(&self) -> Vec<Charge> {
        let mut acc: Vec<Charge> = Vec::new();
        self.visit(self.root, &mut |node| {
            if let Node::Leaf { charge } = node { acc.push(*charge); }
        });
        acc
    }

    fn visit<F>(&self, k: usize, f: &mut F)
    where F: FnMut(&Node)
    {
        match &self.nodes[k] {
            leaf @ Node::Leaf { .. } => { f(leaf); }
            vertex @ Node::Vertex { left, right, .. } => {
                let (l, r) = (*left, *right);
                self.visit(l, f);
                f(vertex);
                self.visit(r, f);
            }
        }
    }

    fn structural_eq(&self, a: usize, other: &Self, b: usize) -> bool {
        match (&self.nodes[a], &other.nodes[b]) {
            (
                Node::Leaf { charge: ca },
                Node::Leaf { charge: cb },
            ) => ca == cb,
            (
                Node::Vertex { left: la, right: ra, charge: ca, channel: ha },
                Node::Vertex { left: lb, right: rb, charge: cb, channel: hb },
            ) => {
                ca == cb && ha == hb
                    && self.structural_eq(*la, other, *lb)
                    && self.structural_eq(*ra, other, *rb)
            }
            _ => false,
        }
    }

    fn hash_node<H: Hasher>(&self, k: usize, state: &mut H) {
        match &self.nodes[k] {
            Node::Leaf { charge } => {
                0_u8.hash(state);
                charge.hash(state);
            }
            Node::Vertex { left, right, charge, channel } => {
                1_u8.hash(state);
                charge.hash(state);
                channel.hash(state);
                self.hash_node(*left, state);
                self.hash_node(*right, state);
            }
        }
    }

    /// Recouple at vertex `v`, producing the linear combination of trees
    /// obtained by applying the appropriate F-matrix there.
    ///
    /// If the left child of `v` is itself a vertex, the forward move
    /// `((a b)_e c)_d → Σ_f [F^{abc}_d]_{e,f} (a (b c)_f)_d` applies;
    /// otherwise, if the right child is a vertex, the inverse move applies.
    /// A vertex with two leaf children cannot be recoupled.
    pub fn change_association(&self, model: &AnyonModel, v: usize)
        -> FusionResult<Vec<(Self, C64)>>
    {
        let Some(Node::Vertex { left, right, .. })
            = self.nodes.get(v).copied()
            else { return Err(FusionError::BadVertex(v)); };
        if matches!(self.nodes[left], Node::Vertex { .. }) {
            self.recouple_forward(model, v)
        } else if matches!(self.nodes[right], Node::Vertex { .. }) {
            self.recouple_inverse(model, v)
        } else {
            Err(FusionError::BadVertex(v))
        }
    }

    /// Forward F-move `((a b)_e c)_d → Σ_f [F^{abc}_d]_{e,f} (a (b c)_f)_d`
    /// at vertex `v`, whose left child must be a vertex.
    pub(crate) fn recouple_forward(&self, model: &AnyonModel, v: usize)
        -> FusionResult<Vec<(Self, C64)>>
    {
        let Some(Node::Vertex { left, right, charge: d, .. })
            = self.nodes.get(v).copied()
            else { return Err(FusionError::BadVertex(v)); };
        let Node::Vertex { left: ln, right: mn, charge: e, .. }
            = self.nodes[left]
            else { return Err(FusionError::BadVertex(v)); };
        let a = self.nodes[ln].charge();
        let b = self.nodes[mn].charge();
        let c = self.nodes[right].charge();
        let mut out: Vec<(Self, C64)> = Vec::new();
        for &(f, mult) in model.fuse(b, c) {
            if model.n(a, f, d) == 0 { continue; }
            let coeff = model.f_entry(a, b, c, d, e, f);
            if coeff.norm() == 0.0 { continue; }
            for channel in 0..mult {
                let mut t = self.clone();
                t.nodes[left] = Node::Vertex {
                    left: mn, right, charge: f, channel,
                };
                t.nodes[v] = Node::Vertex {
                    left: ln, right: left, charge: d, channel: 0,
                };
                out.push((t, coeff));
            }
        }
        Ok(out)
    }

    /// Inverse F-move `(a (b c)_f)_d → Σ_e conj([F^{abc}_d]_{e,f})
    /// ((a b)_e c)_d` at vertex `v`, whose right child must be a vertex.
    pub(crate) fn recouple_inverse(&self, model: &AnyonModel, v: usize)
        -> FusionResult<Vec<(Self, C64)>>
    {
        let Some(Node::Vertex { left, right, charge: d, .. })
            = self.nodes.get(v).copied()
            else { return Err(FusionError::BadVertex(v)); };
        let Node::Vertex { left: mn, right: rn, charge: f, .. }
            = self.nodes[right]
            else { return Err(FusionError::BadVertex(v)); };
        let a = self.nodes[left].charge();
        let b = self.nodes[mn].charge();
        let c = self.nodes[rn].charge();
        let mut out: Vec<(Self, C64)> = Vec::new();
        for &(e, mult) in model.fuse(a, b) {
            if model.n(e, c, d) == 0 { continue; }
            let coeff = model.f_entry(a, b, c, d, e, f).conj();
            if coeff.norm() == 0.0 { continue; }
            for channel in 0..mult {
                let mut t = self.clone();
                t.nodes[right] = Node::Vertex {
                    left, right: mn, charge: e, channel,
                };
                t.nodes[v] = Node::Vertex {
                    left: right, right: rn, charge: d, channel: 0,
                };
                out.push((t, coeff));
            }
        }
        Ok(out)
    }

    /// Render with model labels, e.g. `((tau tau)_1 tau)_tau`.
    pub fn fmt_with(&self, model: &AnyonModel) -> String {
        fn go(tree: &FusionTree, k: usize, model: &AnyonModel, buf: &mut String) {
            match &tree.nodes[k] {
                Node::Leaf { charge } => {
                    buf.push_str(model.label(*charge));
                }
                Node::Vertex { left, right, charge, .. } => {
                    buf.push('(');
                    go(tree, *left, model, buf);
                    buf.push(' ');
                    go(tree, *right, model, buf);
                    buf.push_str(")_");
                    buf.push_str(model.label(*charge));
                }
            }
        }
        let mut buf = String::new();
        go(self, self.root, model, &mut buf);
        buf
    }
}

impl PartialEq for FusionTree {
    fn eq(&self, other: &Self) -> bool {
        self.structural_eq(self.root, other, other.root)
    }
}

impl Eq for FusionTree { }

impl Hash for FusionTree {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_node(self.root, state);
    }
}

/* FusionSpace ****************************************************************/

/// The basis of fusion trees over a fixed external charge sequence and
/// total charge.
///
/// Read-only once built; safe to share by reference across worker threads.
#[derive(Clone, Debug)]
pub struct FusionSpace {
    charges: Vec<Charge>,
    total: Charge,
    basis: Vec<FusionTree>,
    index: FxHashMap<FusionTree, usize>,
}

impl FusionSpace {
    /// Enumerate the basis for `charges` fusing to `total`.
    ///
    /// Fails with [`FusionError::InvalidFusion`] when no fusion path
    /// reaches `total`.
    pub fn new(model: &AnyonModel, charges: &[Charge], total: Charge)
        -> FusionResult<Self>
    {
        if charges.is_empty()
            || fusion_path_count(model, charges, total) == 0
        {
            return Err(FusionError::InvalidFusion);
        }
        let mut basis: Vec<FusionTree> = Vec::new();
        if charges.len() == 1 {
            basis.push(FusionTree::left_comb(charges, &[]));
        } else {
            let mut inner: Vec<(Charge, usize)> = Vec::new();
            enumerate_combs(
                model, charges, total, charges[0], &mut inner, &mut basis);
        }
        let index: FxHashMap<FusionTree, usize> = basis.iter()
            .cloned()
            .enumerate()
            .map(|(k, t)| (t, k))
            .collect();
        Ok(Self { charges: charges.to_vec(), total, basis, index })
    }

    /// Hilbert-space dimension; equals the number of basis trees.
    pub fn dimension(&self) -> usize { self.basis.len() }

    /// Basis trees in canonical order.
    pub fn basis(&self) -> &[FusionTree] { &self.basis }

    /// Canonical index of a tree, if it belongs to this basis.
    pub fn tree_index(&self, tree: &FusionTree) -> Option<usize> {
        self.index.get(tree).copied()
    }

    pub fn external_charges(&self) -> &[Charge] { &self.charges }

    pub fn total_charge(&self) -> Charge { self.total }

    pub fn n_anyons(&self) -> usize { self.charges.len() }

    /// Arena index of the comb vertex enclosing leaf positions
    /// `(position, position + 1)` in any canonical basis tree.
    pub(crate) fn comb_vertex(&self, position: usize) -> usize {
        self.charges.len() + position
    }

    /// Apply the F-matrix at `vertex` of basis tree `k`, returning the
    /// resulting linear combination of (generally non-canonical) trees.
    pub fn change_association(
        &self,
        model: &AnyonModel,
        k: usize,
        vertex: usize,
    ) -> FusionResult<Vec<(FusionTree, C64)>> {
        self.basis.get(k)
            .ok_or(FusionError::BadVertex(vertex))?
            .change_association(model, vertex)
    }
}

// Depth-first enumeration of intermediate charges along the left comb, in
// fusion-outcome order (sorted by charge, then channel); yields the
// canonical lexicographic basis ordering.
fn enumerate_combs(
    model: &AnyonModel,
    charges: &[Charge],
    total: Charge,
    acc: Charge,
    inner: &mut Vec<(Charge, usize)>,
    out: &mut Vec<FusionTree>,
) {
    let next = inner.len() + 1;
    if next == charges.len() - 1 {
        for &(c, mult) in model.fuse(acc, charges[next]) {
            if c != total { continue; }
            for channel in 0..mult {
                inner.push((c, channel));
                out.push(FusionTree::left_comb(charges, inner));
                inner.pop();
            }
        }
        return;
    }
    for &(c, mult) in model.fuse(acc, charges[next]) {
        for channel in 0..mult {
            inner.push((c, channel));
            enumerate_combs(model, charges, total, c, inner, out);
            inner.pop();
        }
    }
}

/// Count fusion paths from `charges` to `total` by direct recursion over
/// the fusion rules, independent of any tree enumeration.
///
/// [`FusionSpace::dimension`] must always equal this count.
pub fn fusion_path_count(
    model: &AnyonModel,
    charges: &[Charge],
    total: Charge,
) -> usize {
    let Some((&first, rest)) = charges.split_first()
        else { return usize::from(total.is_vacuum()); };
    let mut counts: FxHashMap<Charge, usize> = FxHashMap::default();
    counts.insert(first, 1);
    for &leaf in rest {
        let mut next: FxHashMap<Charge, usize> = FxHashMap::default();
        for (&acc, &ways) in counts.iter() {
            for &(c, mult) in model.fuse(acc, leaf) {
                *next.entry(c).or_insert(0) += ways * mult;
            }
        }
        counts = next;
    }
    counts.get(&total).copied().unwrap_or(0)
}

/* SpaceCache *****************************************************************/

/// Caller-owned memoization of fusion spaces keyed by (external charges,
/// total charge). Bases are deterministic, so cached spaces are shared via
/// [`Arc`].
#[derive(Clone, Debug, Default)]
pub struct SpaceCache {
    map: FxHashMap<(Vec<Charge>, Charge), Arc<FusionSpace>>,
}

impl SpaceCache {
    pub fn new() -> Self { Self::default() }

    /// Fetch the space for `(charges, total)`, building it on first use.
    pub fn get_or_build(
        &mut self,
        model: &AnyonModel,
        charges: &[Charge],
        total: Charge,
    ) -> FusionResult<Arc<FusionSpace>> {
        if let Some(space) = self.map.get(&(charges.to_vec(), total)) {
            return Ok(Arc::clone(space));
        }
        let space = Arc::new(FusionSpace::new(model, charges, total)?);
        self.map.insert(
            (charges.to_vec(), total), Arc::clone(&space));
        Ok(space)
    }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }
}
