//! Node index bookkeeping.
//!
//! Every node group is a list of integer offsets into the single node
//! coordinate array. The base groups (`interior`, `fixed`, `free`,
//! `free_ghosts`) are validated once at construction and held immutable;
//! the derived unions the assembler needs are recomputed from them on every
//! call, so they can never go stale.

use crate::error::{Error, Result};

/// Validated, immutable node-group partition for one solve.
///
/// `interior`, `fixed` and `free` classify the real nodes; `free_ghosts`
/// are additional nodes placed outside the free boundary, one per free
/// node, in matching order.
#[derive(Debug, Clone)]
pub struct NodeGroups {
    n: usize,
    interior: Vec<usize>,
    fixed: Vec<usize>,
    free: Vec<usize>,
    free_ghosts: Vec<usize>,
}

impl NodeGroups {
    /// Build and validate a group partition over `n` nodes.
    ///
    /// # Errors
    ///
    /// - `Config` if any index is outside `[0, n)`, naming the group;
    /// - `Config` if two groups claim the same index;
    /// - `Config` if `free` and `free_ghosts` differ in cardinality (free
    ///   nodes and their ghosts must be in strict bijection).
    pub fn new(
        n: usize,
        interior: Vec<usize>,
        fixed: Vec<usize>,
        free: Vec<usize>,
        free_ghosts: Vec<usize>,
    ) -> Result<Self> {
        let named: [(&str, &[usize]); 4] = [
            ("interior", &interior),
            ("fixed", &fixed),
            ("free", &free),
            ("free_ghosts", &free_ghosts),
        ];

        for (name, indices) in named {
            for &idx in indices {
                if idx >= n {
                    return Err(Error::Config(format!(
                        "group '{}' contains node index {} but only {} nodes exist",
                        name, idx, n
                    )));
                }
            }
        }

        // Base groups must be pairwise disjoint.
        let mut owner: Vec<Option<&str>> = vec![None; n];
        for (name, indices) in named {
            for &idx in indices {
                match owner[idx] {
                    Some(other) => {
                        return Err(Error::Config(format!(
                            "node {} appears in both '{}' and '{}'",
                            idx, other, name
                        )))
                    }
                    None => owner[idx] = Some(name),
                }
            }
        }

        if free.len() != free_ghosts.len() {
            return Err(Error::Config(format!(
                "'free' has {} nodes but 'free_ghosts' has {}; each free node \
                 needs exactly one ghost",
                free.len(),
                free_ghosts.len()
            )));
        }

        Ok(Self {
            n,
            interior,
            fixed,
            free,
            free_ghosts,
        })
    }

    /// Total node count, including ghosts.
    pub fn n_nodes(&self) -> usize {
        self.n
    }

    /// Interior node indices.
    pub fn interior(&self) -> &[usize] {
        &self.interior
    }

    /// Fixed (Dirichlet) boundary node indices.
    pub fn fixed(&self) -> &[usize] {
        &self.fixed
    }

    /// Free (traction) boundary node indices.
    pub fn free(&self) -> &[usize] {
        &self.free
    }

    /// Ghost node indices, aligned with [`NodeGroups::free`].
    pub fn free_ghosts(&self) -> &[usize] {
        &self.free_ghosts
    }

    /// Union `interior + free`: the points where the equilibrium PDE is
    /// evaluated.
    pub fn interior_free(&self) -> Vec<usize> {
        let mut union = self.interior.clone();
        union.extend_from_slice(&self.free);
        union
    }

    /// Union `interior + free_ghosts`: the rows that receive the PDE
    /// equations. Aligned term-by-term with [`NodeGroups::interior_free`],
    /// so the equation evaluated at free node `i` lands on ghost row `i`.
    pub fn interior_ghosts(&self) -> Vec<usize> {
        let mut union = self.interior.clone();
        union.extend_from_slice(&self.free_ghosts);
        union
    }

    /// Union `interior + free + fixed`: all real nodes, the order used for
    /// ghost-free presentation output.
    pub fn interior_boundary(&self) -> Vec<usize> {
        let mut union = self.interior.clone();
        union.extend_from_slice(&self.free);
        union.extend_from_slice(&self.fixed);
        union
    }
}
