//! Configuration space: window bounds, obstacles, and the start/goal pair
//! read from a planner input file.

mod shapes;

use std::fs;
use std::path::Path;

pub use shapes::{Circle, Obstacle, Rectangle};

use crate::error::PlannerError;
use crate::tree::Point;

/// The planner's configuration space: window bounds, start/goal points,
/// RRT* geometry parameters, and a flat list of obstacles.
///
/// Parsed line-by-line from a file whose records are:
/// `window,<h>,<w>` · `radius,<r>` · `delta,<d>` · `start,<x>,<y>` ·
/// `goal,<x>,<y>` · `rectangle,<x>,<y>,<w>,<h>` · `circle,<x>,<y>,<r>`.
/// Unknown or malformed lines are skipped rather than rejected, leaving a
/// partial configuration — matching the Go reader this was distilled from.
#[derive(Debug, Default)]
pub struct ConfigSpace {
    pub height: f32,
    pub width: f32,
    pub radius: f32,
    pub delta: f32,
    pub start: Point,
    pub goal: Point,
    obstacles: Vec<Box<dyn Obstacle>>,
}

impl ConfigSpace {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PlannerError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| PlannerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut cfg = ConfigSpace::default();
        for line in contents.lines() {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let Some((kind, rest)) = fields.split_first() else {
                continue;
            };
            match (*kind, rest) {
                ("window", [h, w]) => {
                    if let (Ok(h), Ok(w)) = (h.parse(), w.parse()) {
                        cfg.height = h;
                        cfg.width = w;
                    }
                }
                ("radius", [r]) => {
                    if let Ok(r) = r.parse() {
                        cfg.radius = r;
                    }
                }
                ("delta", [d]) => {
                    if let Ok(d) = d.parse() {
                        cfg.delta = d;
                    }
                }
                ("start", [x, y]) => {
                    if let (Ok(x), Ok(y)) = (x.parse(), y.parse()) {
                        cfg.start = Point::new(x, y);
                    }
                }
                ("goal", [x, y]) => {
                    if let (Ok(x), Ok(y)) = (x.parse(), y.parse()) {
                        cfg.goal = Point::new(x, y);
                    }
                }
                ("rectangle", [x, y, w, h]) => {
                    if let (Ok(x), Ok(y), Ok(w), Ok(h)) =
                        (x.parse(), y.parse(), w.parse(), h.parse())
                    {
                        cfg.obstacles.push(Box::new(Rectangle::new(x, y, w, h)));
                    }
                }
                ("circle", [x, y, r]) => {
                    if let (Ok(x), Ok(y), Ok(r)) = (x.parse(), y.parse(), r.parse()) {
                        cfg.obstacles.push(Box::new(Circle::new(x, y, r)));
                    }
                }
                _ => {}
            }
        }
        cfg
    }

    /// `true` if `point` lies inside the window and collides with no
    /// obstacle.
    pub fn feasible(&self, point: Point) -> bool {
        if point.x < 0.0 || point.y < 0.0 || point.x > self.width || point.y > self.height {
            return false;
        }
        !self.obstacles.iter().any(|o| o.collision(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_record_set() {
        let cfg = ConfigSpace::parse(
            "window,100,200\nradius,5\ndelta,1.5\nstart,1,1\ngoal,90,190\n\
             rectangle,10,10,20,20\ncircle,50,50,5\n",
        );
        assert_eq!(cfg.height, 100.0);
        assert_eq!(cfg.width, 200.0);
        assert_eq!(cfg.radius, 5.0);
        assert_eq!(cfg.delta, 1.5);
        assert_eq!(cfg.start, Point::new(1.0, 1.0));
        assert_eq!(cfg.goal, Point::new(90.0, 190.0));
        assert_eq!(cfg.obstacles.len(), 2);
    }

    #[test]
    fn malformed_lines_are_skipped_not_rejected() {
        let cfg = ConfigSpace::parse("window,not_a_number,200\nradius,5\ngarbage line\n");
        assert_eq!(cfg.height, 0.0);
        assert_eq!(cfg.radius, 5.0);
    }

    #[test]
    fn feasible_rejects_points_outside_window_and_inside_obstacles() {
        let cfg = ConfigSpace::parse("window,100,100\ncircle,50,50,10\n");
        assert!(!cfg.feasible(Point::new(-1.0, 50.0)));
        assert!(!cfg.feasible(Point::new(50.0, 50.0)));
        assert!(cfg.feasible(Point::new(0.0, 0.0)));
    }
}
