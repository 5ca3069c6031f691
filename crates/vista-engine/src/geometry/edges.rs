use std::collections::BTreeMap;

/// Extracts the boundary edges of a triangle list.
///
/// Every triangle edge is canonicalized as `(min, max)` and counted; edges
/// used by exactly one triangle are emitted as index pairs in ascending pair
/// order, ready to be drawn as a line list. Trailing indices that do not form
/// a whole triangle are ignored.
pub fn boundary_edges(indices: &[u32]) -> Vec<u32> {
    let mut counts: BTreeMap<(u32, u32), u32> = BTreeMap::new();

    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .filter(|&(_, n)| n == 1)
        .flat_map(|((a, b), _)| [a, b])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(edges: &[u32]) -> Vec<(u32, u32)> {
        edges.chunks_exact(2).map(|e| (e[0], e[1])).collect()
    }

    /// Number of triangles in `indices` that use the undirected edge `(a, b)`.
    fn adjacency(indices: &[u32], a: u32, b: u32) -> usize {
        indices
            .chunks_exact(3)
            .filter(|t| {
                let has = |v| t.contains(&v);
                has(a) && has(b)
            })
            .count()
    }

    #[test]
    fn two_triangles_share_one_edge() {
        let out = boundary_edges(&[0, 1, 2, 1, 3, 2]);
        assert_eq!(out.len(), 8);
        assert_eq!(pairs(&out), vec![(0, 1), (0, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn single_triangle_is_all_boundary() {
        assert_eq!(pairs(&boundary_edges(&[5, 2, 9])), vec![(2, 5), (2, 9), (5, 9)]);
    }

    #[test]
    fn closed_tetrahedron_has_no_boundary() {
        let tet = [0, 1, 2, 0, 3, 1, 1, 3, 2, 2, 3, 0];
        assert!(boundary_edges(&tet).is_empty());
    }

    #[test]
    fn winding_does_not_matter() {
        let a = boundary_edges(&[0, 1, 2, 2, 1, 3]);
        let b = boundary_edges(&[0, 1, 2, 1, 3, 2]);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_and_partial_input() {
        assert!(boundary_edges(&[]).is_empty());
        assert_eq!(pairs(&boundary_edges(&[0, 1, 2, 7, 8])), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn every_output_edge_has_exactly_one_triangle() {
        // A 3x3 vertex grid (2x2 quads), each quad split in two.
        let mut idx = Vec::new();
        for y in 0..2u32 {
            for x in 0..2u32 {
                let i = y * 3 + x;
                idx.extend_from_slice(&[i, i + 1, i + 4, i, i + 4, i + 3]);
            }
        }
        let out = boundary_edges(&idx);

        for (a, b) in pairs(&out) {
            assert!(a < b);
            assert_eq!(adjacency(&idx, a, b), 1, "edge ({a},{b})");
        }
        // Interior diagonals and shared sides never appear.
        assert!(!pairs(&out).contains(&(0, 4)));
        assert!(!pairs(&out).contains(&(1, 4)));
        // Outline of a 2x2 grid has 8 unit edges.
        assert_eq!(out.len() / 2, 8);
    }
}
