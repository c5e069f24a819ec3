use crate::config::CostmapConfig;
use crate::domains::navigation::{Costmap, GridPoint, FREE_SPACE, LETHAL_OBSTACLE};

/// In-memory costmap with a static layer and a clearable obstacle layer.
///
/// The cost of a cell is the maximum of both layers.
#[derive(Debug, Clone)]
pub struct StaticCostmap {
    global_frame: String,
    width: usize,
    height: usize,
    resolution: f64,
    origin: (f64, f64),
    convert_offset: f64,
    static_layer: Vec<u8>,
    obstacle_layer: Vec<u8>,
    running: bool,
}

impl StaticCostmap {
    pub fn new(global_frame: impl Into<String>, width: usize, height: usize, resolution: f64, origin: (f64, f64)) -> Self {
        Self {
            global_frame: global_frame.into(),
            width,
            height,
            resolution,
            origin,
            convert_offset: 0.5,
            static_layer: vec![FREE_SPACE; width * height],
            obstacle_layer: vec![FREE_SPACE; width * height],
            running: true,
        }
    }

    pub fn from_config(config: &CostmapConfig) -> Self {
        let mut costmap = Self::new(
            config.global_frame.clone(),
            config.width,
            config.height,
            config.resolution,
            (config.origin_x, config.origin_y),
        );
        costmap.convert_offset = config.convert_offset;
        costmap
    }

    pub fn with_convert_offset(mut self, convert_offset: f64) -> Self {
        self.convert_offset = convert_offset;
        self
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn set_static_cost(&mut self, x: usize, y: usize, cost: u8) {
        if let Some(index) = self.index(x, y) {
            self.static_layer[index] = cost;
        }
    }

    pub fn mark_obstacle(&mut self, x: usize, y: usize) {
        if let Some(index) = self.index(x, y) {
            self.obstacle_layer[index] = LETHAL_OBSTACLE;
        }
    }

    /// Marks the cell containing the world point, if it is on the map.
    pub fn mark_obstacle_at(&mut self, wx: f64, wy: f64) -> bool {
        match self.world_to_cell(wx, wy).and_then(|point| point.cell()) {
            Some((x, y)) if self.index(x, y).is_some() => {
                self.mark_obstacle(x, y);
                true
            }
            _ => false,
        }
    }

    pub fn set_global_frame(&mut self, global_frame: impl Into<String>) {
        self.global_frame = global_frame.into();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Costmap for StaticCostmap {
    fn global_frame(&self) -> &str {
        &self.global_frame
    }

    fn size_in_cells(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn cost(&self, x: usize, y: usize) -> u8 {
        match self.index(x, y) {
            Some(index) => self.static_layer[index].max(self.obstacle_layer[index]),
            None => LETHAL_OBSTACLE,
        }
    }

    fn world_to_cell(&self, wx: f64, wy: f64) -> Option<GridPoint> {
        let (origin_x, origin_y) = self.origin;
        if !wx.is_finite() || !wy.is_finite() || wx < origin_x || wy < origin_y {
            return None;
        }
        let mx = (wx - origin_x) / self.resolution - self.convert_offset;
        let my = (wy - origin_y) / self.resolution - self.convert_offset;
        if mx < self.width as f64 && my < self.height as f64 {
            Some(GridPoint::new(mx, my))
        } else {
            None
        }
    }

    fn cell_to_world(&self, point: GridPoint) -> (f64, f64) {
        let (origin_x, origin_y) = self.origin;
        (
            origin_x + (point.x + self.convert_offset) * self.resolution,
            origin_y + (point.y + self.convert_offset) * self.resolution,
        )
    }

    fn reset_layers(&mut self) {
        self.obstacle_layer.fill(FREE_SPACE);
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}
