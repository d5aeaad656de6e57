//! Indistinguishability graph and its connected components

use crate::error::{ClusterError, Result};

/// Undirected graph over arm indices, stored as a dense symmetric matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndistinguishabilityGraph {
    size: usize,
    adjacency: Vec<bool>,
}

impl IndistinguishabilityGraph {
    /// Graph with `size` nodes and no edges
    pub fn new(size: usize) -> Self {
        Self {
            size,
            adjacency: vec![false; size * size],
        }
    }

    /// Build from an N×N 0/1 matrix; only the strictly lower triangle is read
    /// and mirrored, so the result is always symmetric
    pub fn from_rows<T: Copy + Into<f64>>(rows: &[Vec<T>]) -> Result<Self> {
        let size = rows.len();
        let mut graph = Self::new(size);

        for (i, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(ClusterError::DimensionMismatch {
                    expected: size,
                    found: row.len(),
                });
            }
            for (j, &value) in row.iter().enumerate().take(i) {
                if value.into() != 0.0 {
                    graph.connect(i, j);
                }
            }
        }

        Ok(graph)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn connect(&mut self, i: usize, j: usize) {
        self.adjacency[i * self.size + j] = true;
        self.adjacency[j * self.size + i] = true;
    }

    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        self.adjacency[i * self.size + j]
    }

    pub fn edge_count(&self) -> usize {
        (0..self.size)
            .map(|i| (0..i).filter(|&j| self.has_edge(i, j)).count())
            .sum()
    }

    fn neighbor_lists(&self) -> Vec<Vec<usize>> {
        let mut neighbors = vec![Vec::new(); self.size];
        for i in 0..self.size {
            for j in 0..i {
                if self.has_edge(i, j) {
                    neighbors[i].push(j);
                    neighbors[j].push(i);
                }
            }
        }
        neighbors
    }

    /// Partition of {0..N-1} into connected components
    ///
    /// Depth-first search with an explicit stack. Components are listed in
    /// order of their smallest member and each component is sorted.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let neighbors = self.neighbor_lists();
        let mut visited = vec![false; self.size];
        let mut components = Vec::new();
        let mut stack = Vec::new();

        for start in 0..self.size {
            if visited[start] {
                continue;
            }

            let mut component = Vec::new();
            visited[start] = true;
            stack.push(start);

            while let Some(node) = stack.pop() {
                component.push(node);
                for &next in &neighbors[node] {
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        components
    }
}

/// Connected components of a 0/1 adjacency matrix
pub fn connected_components<T: Copy + Into<f64>>(rows: &[Vec<T>]) -> Result<Vec<Vec<usize>>> {
    Ok(IndistinguishabilityGraph::from_rows(rows)?.connected_components())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph_gives_singletons() {
        let graph = IndistinguishabilityGraph::new(4);
        assert_eq!(
            graph.connected_components(),
            vec![vec![0], vec![1], vec![2], vec![3]]
        );
    }

    #[test]
    fn test_complete_graph_gives_one_component() {
        let mut graph = IndistinguishabilityGraph::new(5);
        for i in 0..5 {
            for j in 0..i {
                graph.connect(i, j);
            }
        }
        assert_eq!(graph.connected_components(), vec![vec![0, 1, 2, 3, 4]]);
        assert_eq!(graph.edge_count(), 10);
    }

    #[test]
    fn test_transitive_chain_is_one_component() {
        // 0-2, 2-4: 0 and 4 end up together without a direct edge
        let mut graph = IndistinguishabilityGraph::new(5);
        graph.connect(2, 0);
        graph.connect(4, 2);
        graph.connect(3, 1);

        assert_eq!(graph.connected_components(), vec![vec![0, 2, 4], vec![1, 3]]);
    }

    #[test]
    fn test_from_rows_with_integer_matrix() {
        let rows: Vec<Vec<u8>> = vec![
            vec![0, 1, 0, 0],
            vec![1, 0, 0, 0],
            vec![0, 0, 0, 1],
            vec![0, 0, 1, 0],
        ];
        assert_eq!(
            connected_components(&rows).unwrap(),
            vec![vec![0, 1], vec![2, 3]]
        );
    }

    #[test]
    fn test_from_rows_rejects_ragged_matrix() {
        let rows: Vec<Vec<f64>> = vec![vec![0.0, 1.0], vec![1.0]];
        assert!(matches!(
            connected_components(&rows),
            Err(ClusterError::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_empty_input() {
        let rows: Vec<Vec<f64>> = Vec::new();
        assert!(connected_components(&rows).unwrap().is_empty());
    }

    #[test]
    fn test_long_path_is_one_component() {
        let size = 2_000;
        let mut graph = IndistinguishabilityGraph::new(size);
        for i in 1..size {
            graph.connect(i, i - 1);
        }
        let components = graph.connected_components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), size);
    }

    #[test]
    fn test_bool_matrix() {
        let rows = vec![vec![false, true, false], vec![true, false, false], vec![false; 3]];
        assert_eq!(connected_components(&rows).unwrap(), vec![vec![0, 1], vec![2]]);
    }
}
