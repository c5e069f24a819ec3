use crate::common::{DomainError, DomainResult};
use crate::config::PlannerConfig;
use crate::domains::navigation::{Costmap, GridPoint, Planner};
use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};

/// Samples the straight segment between the two points and fails on the first blocked cell.
pub struct StraightLinePlanner {
    step_cells: f64,
    allow_unknown: bool,
}

impl StraightLinePlanner {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            step_cells: config.step_cells,
            allow_unknown: config.allow_unknown,
        }
    }
}

impl Planner for StraightLinePlanner {
    fn name(&self) -> &str {
        "straight_line"
    }

    fn compute_path(&self, costmap: &dyn Costmap, start: GridPoint, end: GridPoint) -> DomainResult<Vec<GridPoint>> {
        let steps = (start.distance(&end) / self.step_cells).ceil().max(1.0) as usize;
        let mut path = Vec::with_capacity(steps + 1);
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let point = GridPoint::new(start.x + (end.x - start.x) * t, start.y + (end.y - start.y) * t);
            let free = point
                .cell()
                .map(|(x, y)| costmap.is_traversable(x, y, self.allow_unknown))
                .unwrap_or(false);
            if !free {
                return Err(DomainError::NoPath {
                    reason: format!("straight line is blocked at ({:.1}, {:.1})", point.x, point.y),
                });
            }
            path.push(point);
        }
        Ok(path)
    }
}

/// A* over the 8-connected graph of traversable cells.
pub struct GridSearchPlanner {
    allow_unknown: bool,
}

impl GridSearchPlanner {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            allow_unknown: config.allow_unknown,
        }
    }

    fn build_graph(&self, costmap: &dyn Costmap) -> (UnGraph<(usize, usize), f64>, Vec<Option<NodeIndex>>) {
        let (width, height) = costmap.size_in_cells();
        let mut graph = UnGraph::new_undirected();
        let mut nodes = vec![None; width * height];

        for y in 0..height {
            for x in 0..width {
                if costmap.is_traversable(x, y, self.allow_unknown) {
                    nodes[y * width + x] = Some(graph.add_node((x, y)));
                }
            }
        }

        // Each cell links to its right, upper and both upper diagonal neighbours.
        let neighbours: [(isize, isize, f64); 4] = [
            (1, 0, 1.0),
            (0, 1, 1.0),
            (1, 1, std::f64::consts::SQRT_2),
            (-1, 1, std::f64::consts::SQRT_2),
        ];
        for y in 0..height {
            for x in 0..width {
                let Some(from) = nodes[y * width + x] else {
                    continue;
                };
                for (dx, dy, weight) in neighbours {
                    let nx = x as isize + dx;
                    let ny = y as isize + dy;
                    if nx < 0 || nx >= width as isize || ny >= height as isize {
                        continue;
                    }
                    if let Some(to) = nodes[ny as usize * width + nx as usize] {
                        graph.add_edge(from, to, weight);
                    }
                }
            }
        }

        (graph, nodes)
    }
}

impl Planner for GridSearchPlanner {
    fn name(&self) -> &str {
        "grid_search"
    }

    fn compute_path(&self, costmap: &dyn Costmap, start: GridPoint, end: GridPoint) -> DomainResult<Vec<GridPoint>> {
        let (width, height) = costmap.size_in_cells();
        let to_node = |point: GridPoint, nodes: &[Option<NodeIndex>]| {
            point
                .cell()
                .filter(|(x, y)| *x < width && *y < height)
                .and_then(|(x, y)| nodes[y * width + x])
        };

        let (graph, nodes) = self.build_graph(costmap);
        let (Some(start_node), Some(end_node)) = (to_node(start, &nodes[..]), to_node(end, &nodes[..])) else {
            return Err(DomainError::NoPath {
                reason: "start or end cell is not traversable".to_string(),
            });
        };

        let (end_x, end_y) = graph[end_node];
        let (_, cells) = astar(
            &graph,
            start_node,
            |node| node == end_node,
            |edge| *edge.weight(),
            |node| {
                let (x, y) = graph[node];
                ((x as f64 - end_x as f64).powi(2) + (y as f64 - end_y as f64).powi(2)).sqrt()
            },
        )
        .ok_or_else(|| DomainError::NoPath {
            reason: "no connected free cells between start and end".to_string(),
        })?;

        let mut path = vec![start];
        if cells.len() > 2 {
            path.extend(cells[1..cells.len() - 1].iter().map(|node| {
                let (x, y) = graph[*node];
                GridPoint::new(x as f64, y as f64)
            }));
        }
        path.push(end);
        Ok(path)
    }
}
