//! Domain geometry and scattered node placement.
//!
//! The problem domain is a closed counter-clockwise polygon whose boundary
//! segments are partitioned into named groups (e.g. `fixed` and `free`).
//! [`place_nodes`] scatters nodes over it:
//!
//! - boundary nodes at uniform spacing along each segment, with outward
//!   unit normals;
//! - interior nodes from a Halton sequence, rejected near existing nodes
//!   so the layout stays quasi-uniform;
//! - one ghost node per node of each ghost-flagged group, offset outward
//!   along the node normal, appended after all real nodes.
//!
//! Ghosts make the returned node count exceed the requested budget, so
//! callers must re-derive the total from the returned set.

use crate::error::{Error, Result};
use crate::types::{Point2, Vec2};
use std::collections::BTreeMap;

/// A closed polygonal domain.
///
/// Vertices must wind counter-clockwise so segment normals point outward.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<Point2>,
    segments: Vec<[usize; 2]>,
}

impl Polygon {
    /// Create a polygon from vertices and boundary segments.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a segment references a missing vertex or the
    /// signed area is not positive (clockwise or degenerate boundary).
    pub fn new(vertices: Vec<Point2>, segments: Vec<[usize; 2]>) -> Result<Self> {
        for seg in &segments {
            for &v in seg {
                if v >= vertices.len() {
                    return Err(Error::Config(format!(
                        "segment references vertex {} but only {} vertices exist",
                        v,
                        vertices.len()
                    )));
                }
            }
        }
        let polygon = Self { vertices, segments };
        if polygon.area() <= 0.0 {
            return Err(Error::Config(
                "polygon boundary must wind counter-clockwise with positive area".into(),
            ));
        }
        Ok(polygon)
    }

    /// Axis-aligned rectangle with corner at the origin.
    ///
    /// Segments are ordered bottom, right, top, left.
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self {
            vertices: vec![
                Point2::new(0.0, 0.0),
                Point2::new(width, 0.0),
                Point2::new(width, height),
                Point2::new(0.0, height),
            ],
            segments: vec![[0, 1], [1, 2], [2, 3], [3, 0]],
        }
    }

    /// Number of boundary segments.
    pub fn n_segments(&self) -> usize {
        self.segments.len()
    }

    /// Signed area via the shoelace formula (positive when CCW).
    pub fn area(&self) -> f64 {
        0.5 * self
            .segments
            .iter()
            .map(|seg| {
                let a = self.vertices[seg[0]];
                let b = self.vertices[seg[1]];
                a.x * b.y - b.x * a.y
            })
            .sum::<f64>()
    }

    /// Even-odd ray-casting point-in-polygon test.
    pub fn contains(&self, p: &Point2) -> bool {
        let mut inside = false;
        for seg in &self.segments {
            let a = self.vertices[seg[0]];
            let b = self.vertices[seg[1]];
            if (a.y > p.y) != (b.y > p.y) {
                let t = (p.y - a.y) / (b.y - a.y);
                if p.x < a.x + t * (b.x - a.x) {
                    inside = !inside;
                }
            }
        }
        inside
    }

    fn segment_endpoints(&self, seg: usize) -> (Point2, Point2) {
        let [i, j] = self.segments[seg];
        (self.vertices[i], self.vertices[j])
    }

    /// Outward unit normal of a boundary segment.
    pub fn outward_normal(&self, seg: usize) -> Vec2 {
        let (a, b) = self.segment_endpoints(seg);
        let edge = b - a;
        Vec2::new(edge.y, -edge.x) / edge.norm()
    }

    fn bounding_box(&self) -> (Point2, Point2) {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &self.vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        (min, max)
    }
}

/// A named set of boundary segments.
#[derive(Debug, Clone)]
pub struct BoundaryGroup {
    /// Group name, used as the key in the resulting node set.
    pub name: String,
    /// Segment indices into the domain polygon.
    pub segments: Vec<usize>,
    /// Whether each node of this group gets a ghost node outside the domain.
    pub ghosts: bool,
}

impl BoundaryGroup {
    /// A boundary group without ghost nodes.
    pub fn new(name: &str, segments: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            segments,
            ghosts: false,
        }
    }

    /// A boundary group whose nodes each carry a ghost node.
    pub fn with_ghosts(name: &str, segments: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            segments,
            ghosts: true,
        }
    }
}

/// Scattered node layout: coordinates, named index groups, and outward
/// normals for the boundary groups.
#[derive(Debug, Clone)]
pub struct NodeSet {
    /// Node coordinates; index position is the node identity.
    pub points: Vec<Point2>,
    groups: BTreeMap<String, Vec<usize>>,
    normals: BTreeMap<String, Vec<Vec2>>,
}

impl NodeSet {
    /// Total node count, including ghosts.
    pub fn n_nodes(&self) -> usize {
        self.points.len()
    }

    /// Node indices of a named group.
    pub fn group(&self, name: &str) -> Result<&[usize]> {
        self.groups
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Config(format!("no node group named '{}'", name)))
    }

    /// Outward unit normals of a boundary group, aligned with its index
    /// order.
    pub fn normals(&self, name: &str) -> Result<&[Vec2]> {
        self.normals
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Config(format!("no normals for group '{}'", name)))
    }
}

/// Scatter approximately `node_count` nodes over the domain, then append
/// ghost nodes for the flagged boundary groups.
///
/// The result always contains an `interior` group, one group per entry in
/// `boundary_groups`, and a `<name>_ghosts` group per ghost-flagged entry
/// whose order matches the parent group node for node.
///
/// # Errors
///
/// Returns `Config` if a segment is claimed by two groups, a segment index
/// is out of range, a group uses the reserved name `interior`, or the node
/// budget is zero.
pub fn place_nodes(
    polygon: &Polygon,
    boundary_groups: &[BoundaryGroup],
    node_count: usize,
) -> Result<NodeSet> {
    if node_count == 0 {
        return Err(Error::Config("node budget must be positive".into()));
    }

    let mut claimed: Vec<Option<&str>> = vec![None; polygon.n_segments()];
    for group in boundary_groups {
        if group.name == "interior" {
            return Err(Error::Config(
                "group name 'interior' is reserved for the interior fill".into(),
            ));
        }
        for &seg in &group.segments {
            if seg >= polygon.n_segments() {
                return Err(Error::Config(format!(
                    "group '{}' references segment {} but the domain has {}",
                    group.name,
                    seg,
                    polygon.n_segments()
                )));
            }
            match claimed[seg] {
                Some(other) => {
                    return Err(Error::Config(format!(
                        "segment {} claimed by both '{}' and '{}'",
                        seg, other, group.name
                    )))
                }
                None => claimed[seg] = Some(group.name.as_str()),
            }
        }
    }

    // Nominal spacing for a quasi-uniform layout over the domain area.
    let spacing = (polygon.area() / node_count as f64).sqrt();

    let mut points: Vec<Point2> = Vec::new();
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut normals: BTreeMap<String, Vec<Vec2>> = BTreeMap::new();

    // Boundary nodes: uniform along each segment, kept off the corners so a
    // node can never fall into two groups.
    for group in boundary_groups {
        let indices = groups.entry(group.name.clone()).or_default();
        let group_normals = normals.entry(group.name.clone()).or_default();
        for &seg in &group.segments {
            let (a, b) = polygon.segment_endpoints(seg);
            let normal = polygon.outward_normal(seg);
            let length = (b - a).norm();
            let count = (length / spacing).round().max(1.0) as usize;
            for i in 0..count {
                let t = (i as f64 + 0.5) / count as f64;
                indices.push(points.len());
                group_normals.push(normal);
                points.push(a + (b - a) * t);
            }
        }
    }

    // Interior fill: Halton sequence over the bounding box, rejecting
    // points outside the domain or too close to an existing node.
    let n_boundary = points.len();
    let interior_target = node_count.saturating_sub(n_boundary);
    let (min, max) = polygon.bounding_box();
    let extent = max - min;
    let min_dist_sq = (0.5 * spacing) * (0.5 * spacing);

    let mut interior = Vec::with_capacity(interior_target);
    let mut sample = 0u32;
    let attempt_budget = 200 * node_count as u32;
    while interior.len() < interior_target && sample < attempt_budget {
        let candidate = Point2::new(
            min.x + extent.x * halton(sample, 2),
            min.y + extent.y * halton(sample, 3),
        );
        sample += 1;
        if !polygon.contains(&candidate) {
            continue;
        }
        if points
            .iter()
            .any(|p| (p - candidate).norm_squared() < min_dist_sq)
        {
            continue;
        }
        interior.push(points.len());
        points.push(candidate);
    }
    if interior.len() < interior_target {
        log::debug!(
            "interior fill stopped at {} of {} nodes after {} samples",
            interior.len(),
            interior_target,
            sample
        );
    }
    groups.insert("interior".into(), interior);

    // Ghost nodes last, offset outside the boundary along each node
    // normal, in the parent group's order. The offset is staggered around
    // one spacing: ghosts at a uniform distance would form a second line
    // parallel to their edge, and a stencil drawn from two parallel lines
    // cannot support the quadratic polynomial constraints.
    for group in boundary_groups.iter().filter(|g| g.ghosts) {
        let parent: Vec<usize> = groups[&group.name].clone();
        let parent_normals: Vec<Vec2> = normals[&group.name].clone();
        let mut ghost_indices = Vec::with_capacity(parent.len());
        for (k, (&idx, normal)) in parent.iter().zip(&parent_normals).enumerate() {
            let offset = spacing * (0.75 + 0.5 * halton(k as u32, 2));
            let ghost = points[idx] + normal * offset;
            ghost_indices.push(points.len());
            points.push(ghost);
        }
        groups.insert(format!("{}_ghosts", group.name), ghost_indices);
    }

    log::debug!(
        "placed {} nodes ({} boundary) at spacing {:.4}",
        points.len(),
        n_boundary,
        spacing
    );

    Ok(NodeSet {
        points,
        groups,
        normals,
    })
}

/// Halton low-discrepancy sequence value for `index` in the given base.
fn halton(index: u32, base: u32) -> f64 {
    let mut value = 0.0;
    let mut f = 1.0 / base as f64;
    let mut i = index + 1;
    while i > 0 {
        value += f * (i % base) as f64;
        i /= base;
        f /= base as f64;
    }
    value
}
