//! Hierarchical density clustering (HDBSCAN) over great-circle distance
//!
//! Steps:
//! 1. Core distance: haversine distance to the `min_samples`-th nearest point (itself counted)
//! 2. Minimum spanning tree over mutual reachability
//!    `MR(a, b) = max(core(a), core(b), d(a, b))`, built with Prim's algorithm in O(n) memory
//! 3. Single-linkage hierarchy from the sorted tree edges
//! 4. Condensed tree: splits that leave both sides with at least `min_cluster_size` points
//!    create clusters, smaller sides fall out as points
//! 5. Excess-of-mass selection over cluster stabilities

use std::collections::VecDeque;

use rayon::prelude::*;
use tracing::debug;

use super::geo::{haversine, GeoPoint, SphereIndex};
use super::strategy::ClusterStrategy;
use crate::error::ClusterError;
use crate::types::NOISE_LABEL;

/// Distances below this are treated as equal when converted to lambda = 1 / d
const MIN_DISTANCE: f64 = 1e-12;

/// HDBSCAN with a haversine metric.
#[derive(Debug, Clone)]
pub struct HdbscanStrategy {
    min_cluster_size: usize,
    min_samples: usize,
    /// Upper bound on input size; the spanning tree costs O(n²) distance evaluations
    max_points: usize,
}

impl HdbscanStrategy {
    /// `min_samples` doubles as the minimum cluster size
    pub fn new(min_samples: usize, max_points: usize) -> Self {
        Self {
            min_cluster_size: min_samples,
            min_samples,
            max_points,
        }
    }

    fn core_distances(&self, points: &[GeoPoint]) -> Vec<f64> {
        let index = SphereIndex::build(points);
        let k = self.min_samples.min(points.len());
        (0..points.len())
            .into_par_iter()
            .map(|i| index.kth_neighbor_distance(i, k).unwrap_or(0.0))
            .collect()
    }

    /// Prim's algorithm; ties go to the lowest point index
    fn spanning_tree(&self, points: &[GeoPoint], core: &[f64]) -> Vec<TreeEdge> {
        let n = points.len();
        let mut in_tree = vec![false; n];
        let mut best = vec![f64::INFINITY; n];
        let mut source = vec![0usize; n];
        let mut edges = Vec::with_capacity(n.saturating_sub(1));

        let mut current = 0usize;
        in_tree[0] = true;

        for _ in 1..n {
            let here = points[current];
            let here_core = core[current];

            best.par_iter_mut()
                .zip(source.par_iter_mut())
                .zip(in_tree.par_iter())
                .enumerate()
                .for_each(|(j, ((dist, from), &done))| {
                    if done {
                        return;
                    }
                    let mr = haversine(&here, &points[j]).max(here_core).max(core[j]);
                    if mr < *dist {
                        *dist = mr;
                        *from = current;
                    }
                });

            let closest = best
                .par_iter()
                .zip(in_tree.par_iter())
                .enumerate()
                .filter(|&(_, (_, &done))| !done)
                .map(|(j, (&dist, _))| (j, dist))
                .reduce_with(|a, b| {
                    if b.1 < a.1 || (b.1 == a.1 && b.0 < a.0) {
                        b
                    } else {
                        a
                    }
                });

            let Some((next, weight)) = closest else {
                break;
            };
            in_tree[next] = true;
            edges.push(TreeEdge {
                a: source[next],
                b: next,
                weight,
            });
            current = next;
        }

        edges
    }
}

impl ClusterStrategy for HdbscanStrategy {
    fn name(&self) -> &'static str {
        "hdbscan"
    }

    fn preflight(&self, n_points: usize) -> Result<(), ClusterError> {
        if self.min_cluster_size < 2 {
            return Err(ClusterError::invalid_parameter(
                "min_cluster_size",
                format!("must be at least 2, got {}", self.min_cluster_size),
            ));
        }
        if self.min_samples == 0 {
            return Err(ClusterError::invalid_parameter("min_samples", "must be at least 1"));
        }
        if n_points < self.min_cluster_size {
            return Err(ClusterError::insufficient_data(self.min_cluster_size, n_points));
        }
        if n_points > self.max_points {
            return Err(ClusterError::TooManyPoints {
                limit: self.max_points,
                actual: n_points,
            });
        }
        Ok(())
    }

    fn fit(&self, points: &[GeoPoint]) -> Result<Vec<i32>, ClusterError> {
        self.preflight(points.len())?;
        let n = points.len();

        let core = self.core_distances(points);
        let edges = self.spanning_tree(points, &core);
        let hierarchy = single_linkage(edges, n);
        let condensed = condense(&hierarchy, n, self.min_cluster_size);
        let selected = select_clusters(&condensed, n);
        let labels = label_points(&condensed, &selected, n);

        debug!(
            points = n,
            condensed_clusters = selected.len(),
            selected = selected.iter().filter(|&&s| s).count(),
            "HDBSCAN hierarchy processed"
        );

        Ok(labels)
    }
}

#[derive(Debug, Clone, Copy)]
struct TreeEdge {
    a: usize,
    b: usize,
    weight: f64,
}

/// Internal node `n + i` of the single-linkage dendrogram
#[derive(Debug, Clone, Copy)]
struct LinkageNode {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    size: usize,
}

fn single_linkage(mut edges: Vec<TreeEdge>, n: usize) -> Vec<LinkageNode> {
    edges.sort_by(|x, y| x.weight.total_cmp(&y.weight));

    let total = 2 * n - 1;
    let mut parent: Vec<usize> = (0..total).collect();
    let mut size: Vec<usize> = (0..total).map(|i| usize::from(i < n)).collect();
    let mut nodes = Vec::with_capacity(n - 1);

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for edge in edges {
        let ra = find(&mut parent, edge.a);
        let rb = find(&mut parent, edge.b);
        let id = n + nodes.len();
        let merged = size[ra] + size[rb];
        parent[ra] = id;
        parent[rb] = id;
        size[id] = merged;
        nodes.push(LinkageNode {
            left: ra,
            right: rb,
            distance: edge.weight,
            size: merged,
        });
    }

    nodes
}

/// Breadth-first walk of the dendrogram below `start`, `start` included
fn subtree(hierarchy: &[LinkageNode], n: usize, start: usize) -> Vec<usize> {
    let mut order = Vec::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        if node >= n {
            let link = &hierarchy[node - n];
            queue.push_back(link.left);
            queue.push_back(link.right);
        }
    }
    order
}

/// Condensed tree edges. Cluster ids run from `n` (root) upward; children
/// always carry larger ids than their parent.
fn condense(hierarchy: &[LinkageNode], n: usize, min_cluster_size: usize) -> Vec<CondensedEdge> {
    let root = 2 * n - 2;
    let size_of = |node: usize| if node < n { 1 } else { hierarchy[node - n].size };

    let mut relabel = vec![0usize; 2 * n - 1];
    relabel[root] = n;
    let mut next_label = n + 1;
    let mut ignore = vec![false; 2 * n - 1];
    let mut out = Vec::new();

    for node in subtree(hierarchy, n, root) {
        if node < n || ignore[node] {
            continue;
        }
        let link = hierarchy[node - n];
        let lambda = 1.0 / link.distance.max(MIN_DISTANCE);
        let parent = relabel[node];
        let left_big = size_of(link.left) >= min_cluster_size;
        let right_big = size_of(link.right) >= min_cluster_size;

        let mut spill = |child: usize, out: &mut Vec<CondensedEdge>| {
            for sub in subtree(hierarchy, n, child) {
                if sub < n {
                    out.push(CondensedEdge {
                        parent,
                        child: sub,
                        lambda,
                        size: 1,
                    });
                }
                ignore[sub] = true;
            }
        };

        match (left_big, right_big) {
            (true, true) => {
                for child in [link.left, link.right] {
                    relabel[child] = next_label;
                    out.push(CondensedEdge {
                        parent,
                        child: next_label,
                        lambda,
                        size: size_of(child),
                    });
                    next_label += 1;
                }
            }
            (false, false) => {
                spill(link.left, &mut out);
                spill(link.right, &mut out);
            }
            (true, false) => {
                spill(link.right, &mut out);
                relabel[link.left] = parent;
            }
            (false, true) => {
                spill(link.left, &mut out);
                relabel[link.right] = parent;
            }
        }
    }

    out
}

/// Excess-of-mass selection. Returns a flag per condensed cluster (index = id - n);
/// the root is never flagged.
fn select_clusters(tree: &[CondensedEdge], n: usize) -> Vec<bool> {
    let count = 1 + tree.iter().filter(|e| e.child >= n).count();

    let mut birth = vec![0.0f64; count];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for edge in tree.iter().filter(|e| e.child >= n) {
        birth[edge.child - n] = edge.lambda;
        children[edge.parent - n].push(edge.child - n);
    }

    let mut stability = vec![0.0f64; count];
    for edge in tree {
        let c = edge.parent - n;
        stability[c] += (edge.lambda - birth[c]) * edge.size as f64;
    }

    let mut selected = vec![true; count];
    selected[0] = false;

    for c in (1..count).rev() {
        let subtree_stability: f64 = children[c].iter().map(|&k| stability[k]).sum();
        if subtree_stability > stability[c] {
            selected[c] = false;
            stability[c] = subtree_stability;
        } else {
            let mut stack = children[c].clone();
            while let Some(d) = stack.pop() {
                selected[d] = false;
                stack.extend_from_slice(&children[d]);
            }
        }
    }

    selected
}

/// Label each point with its nearest selected ancestor. With nothing selected
/// the root acts as a single cluster holding the points that persist to its
/// largest lambda.
fn label_points(tree: &[CondensedEdge], selected: &[bool], n: usize) -> Vec<i32> {
    let mut cluster_parent: Vec<usize> = (0..selected.len()).collect();
    let mut point_parent = vec![0usize; n];
    let mut point_lambda = vec![0.0f64; n];
    let mut root_max_lambda = 0.0f64;

    for edge in tree {
        if edge.child >= n {
            cluster_parent[edge.child - n] = edge.parent - n;
        } else {
            point_parent[edge.child] = edge.parent - n;
            point_lambda[edge.child] = edge.lambda;
        }
        if edge.parent == n {
            root_max_lambda = root_max_lambda.max(edge.lambda);
        }
    }

    let mut label_of = vec![NOISE_LABEL; selected.len()];
    let mut next = 0i32;
    for (c, _) in selected.iter().enumerate().filter(|&(_, &s)| s) {
        label_of[c] = next;
        next += 1;
    }

    if next == 0 {
        return point_lambda
            .iter()
            .map(|&lambda| if lambda >= root_max_lambda { 0 } else { NOISE_LABEL })
            .collect();
    }

    point_parent
        .iter()
        .map(|&start| {
            let mut c = start;
            loop {
                if selected[c] {
                    return label_of[c];
                }
                if c == 0 {
                    return NOISE_LABEL;
                }
                c = cluster_parent[c];
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(coords: &[(f64, f64)]) -> Vec<GeoPoint> {
        coords
            .iter()
            .map(|&(lat, lon)| GeoPoint::from_degrees(lat, lon))
            .collect()
    }

    fn blob(lat: f64, lon: f64, count: usize) -> Vec<(f64, f64)> {
        (0..count)
            .map(|i| {
                let f = i as f64;
                (lat + (f * 0.37).sin() * 0.01, lon + (f * 0.73).cos() * 0.01)
            })
            .collect()
    }

    #[test]
    fn test_two_close_points_and_outlier() {
        let pts = points(&[(10.0, 10.0), (10.0001, 10.0001), (50.0, 50.0)]);
        let labels = HdbscanStrategy::new(2, 1_000).fit(&pts).unwrap();
        assert_eq!(labels, vec![0, 0, NOISE_LABEL]);
    }

    #[test]
    fn test_two_blobs_and_outlier() {
        // Blobs of 8 cannot split into two halves of at least 5, so each is a leaf
        let mut coords = blob(40.7, -74.0, 8);
        coords.extend(blob(42.4, -71.1, 8));
        coords.push((-33.9, 151.2));
        let labels = HdbscanStrategy::new(5, 1_000).fit(&points(&coords)).unwrap();

        assert_eq!(labels.len(), coords.len());
        assert_eq!(labels[16], NOISE_LABEL);

        let a = labels[0];
        let b = labels[8];
        assert!(a >= 0 && b >= 0);
        assert_ne!(a, b);
        assert!(labels[..8].iter().all(|&l| l == a));
        assert!(labels[8..16].iter().all(|&l| l == b));
        assert_eq!(labels.iter().copied().max(), Some(1));
    }

    #[test]
    fn test_identical_points() {
        let mut coords = vec![(5.0, 5.0); 5];
        coords.extend(vec![(-5.0, 100.0); 5]);
        let labels = HdbscanStrategy::new(3, 1_000).fit(&points(&coords)).unwrap();
        assert!(labels[..5].iter().all(|&l| l == labels[0] && l >= 0));
        assert!(labels[5..].iter().all(|&l| l == labels[5] && l >= 0));
        assert_ne!(labels[0], labels[5]);
    }

    #[test]
    fn test_labels_are_dense_from_zero() {
        let mut coords = blob(48.8, 2.3, 8);
        coords.extend(blob(35.7, 139.7, 8));
        coords.extend(blob(-23.5, -46.6, 8));
        let labels = HdbscanStrategy::new(5, 1_000).fit(&points(&coords)).unwrap();

        let mut distinct: Vec<i32> = labels.iter().copied().filter(|&l| l >= 0).collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct, (0..distinct.len() as i32).collect::<Vec<_>>());
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_preflight_faults() {
        assert!(matches!(
            HdbscanStrategy::new(1, 100).preflight(10),
            Err(ClusterError::InvalidParameter { .. })
        ));
        assert!(matches!(
            HdbscanStrategy::new(5, 100).preflight(3),
            Err(ClusterError::InsufficientData { required: 5, actual: 3 })
        ));
        assert!(matches!(
            HdbscanStrategy::new(5, 100).preflight(101),
            Err(ClusterError::TooManyPoints { limit: 100, actual: 101 })
        ));
        assert!(HdbscanStrategy::new(5, 100).preflight(100).is_ok());
    }

    #[test]
    fn test_fit_checks_preflight() {
        let pts = points(&[(0.0, 0.0)]);
        assert!(HdbscanStrategy::new(2, 100).fit(&pts).is_err());
    }

    #[test]
    fn test_deterministic() {
        let mut coords = blob(51.5, -0.1, 30);
        coords.extend(blob(52.5, 13.4, 30));
        let pts = points(&coords);
        let strategy = HdbscanStrategy::new(5, 1_000);
        assert_eq!(strategy.fit(&pts).unwrap(), strategy.fit(&pts).unwrap());
    }

    #[test]
    fn test_spanning_tree_size() {
        let pts = points(&blob(0.0, 0.0, 20));
        let strategy = HdbscanStrategy::new(3, 1_000);
        let core = strategy.core_distances(&pts);
        let edges = strategy.spanning_tree(&pts, &core);
        assert_eq!(edges.len(), 19);
        for edge in &edges {
            assert!(edge.weight >= core[edge.a] && edge.weight >= core[edge.b]);
        }
        let hierarchy = single_linkage(edges, pts.len());
        assert_eq!(hierarchy.last().map(|node| node.size), Some(20));
    }
}
