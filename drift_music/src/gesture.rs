// Scripted pointer trajectories.
//
// A headless session has no mouse, so the `perform` binary and the pipeline
// tests drive the engine with a `GesturePath` instead: a pure function from
// time to a normalized position. Lissajous figures sweep the whole surface;
// loops retrace a fixed polygon, which is the easiest way to provoke phrase
// memory into varying a repeated gesture.
//
// See also: `engine.rs`, which consumes the sampled positions.

use crate::tonal_field::Position;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A deterministic trajectory over the unit square.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GesturePath {
    /// `x = 0.5 + 0.5 sin(2π fx t/period + phase)`, `y = 0.5 + 0.5 sin(2π fy t/period)`.
    Lissajous {
        freq_x: f64,
        freq_y: f64,
        phase: f64,
        period_ms: f64,
    },
    /// Straight segments through `waypoints`, closing back to the first one,
    /// once per `period_ms`.
    Loop {
        waypoints: Vec<Position>,
        period_ms: f64,
    },
}

impl GesturePath {
    /// A 1:2 Lissajous figure-eight over four seconds.
    pub fn figure_eight() -> Self {
        GesturePath::Lissajous {
            freq_x: 1.0,
            freq_y: 2.0,
            phase: 0.0,
            period_ms: 4000.0,
        }
    }

    /// A square just inside the edges, traced once per two seconds.
    pub fn square_loop() -> Self {
        GesturePath::Loop {
            waypoints: vec![
                Position::new(0.2, 0.2),
                Position::new(0.8, 0.2),
                Position::new(0.8, 0.8),
                Position::new(0.2, 0.8),
            ],
            period_ms: 2000.0,
        }
    }

    /// Parse a preset name as accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "figure8" | "figure-eight" | "lissajous" => Some(Self::figure_eight()),
            "square" | "loop" => Some(Self::square_loop()),
            _ => None,
        }
    }

    /// Position at `time_ms`. Always inside the unit square.
    pub fn sample(&self, time_ms: f64) -> Position {
        match self {
            GesturePath::Lissajous {
                freq_x,
                freq_y,
                phase,
                period_ms,
            } => {
                let t = cycle_fraction(time_ms, *period_ms);
                Position::new(
                    0.5 + 0.5 * (TAU * freq_x * t + phase).sin(),
                    0.5 + 0.5 * (TAU * freq_y * t).sin(),
                )
            }
            GesturePath::Loop {
                waypoints,
                period_ms,
            } => sample_loop(waypoints, cycle_fraction(time_ms, *period_ms)),
        }
    }
}

/// Fraction of the current cycle in `[0, 1)`. A degenerate period pins the
/// path to its start.
fn cycle_fraction(time_ms: f64, period_ms: f64) -> f64 {
    if !period_ms.is_finite() || period_ms <= 0.0 || !time_ms.is_finite() {
        return 0.0;
    }
    (time_ms / period_ms).rem_euclid(1.0)
}

fn sample_loop(waypoints: &[Position], t: f64) -> Position {
    match waypoints {
        [] => Position::new(0.5, 0.5),
        [only] => *only,
        _ => {
            let n = waypoints.len();
            let scaled = t * n as f64;
            let seg = (scaled.floor() as usize).min(n - 1);
            let frac = scaled - seg as f64;
            let a = waypoints[seg];
            let b = waypoints[(seg + 1) % n];
            Position::new(a.nx + (b.nx - a.nx) * frac, a.ny + (b.ny - a.ny) * frac)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Position, b: Position) -> bool {
        (a.nx - b.nx).abs() < 1e-9 && (a.ny - b.ny).abs() < 1e-9
    }

    #[test]
    fn test_lissajous_stays_in_bounds() {
        let path = GesturePath::figure_eight();
        for i in 0..500 {
            let p = path.sample(f64::from(i) * 13.7);
            assert!((0.0..=1.0).contains(&p.nx));
            assert!((0.0..=1.0).contains(&p.ny));
        }
    }

    #[test]
    fn test_lissajous_is_periodic() {
        let path = GesturePath::figure_eight();
        assert!(close(path.sample(250.0), path.sample(4250.0)));
        assert!(close(path.sample(0.0), Position::new(0.5, 0.5)));
        // Quarter period: x at its peak, y back at centre.
        let q = path.sample(1000.0);
        assert!((q.nx - 1.0).abs() < 1e-9);
        assert!((q.ny - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_loop_hits_waypoints() {
        let path = GesturePath::square_loop();
        assert!(close(path.sample(0.0), Position::new(0.2, 0.2)));
        assert!(close(path.sample(500.0), Position::new(0.8, 0.2)));
        assert!(close(path.sample(1000.0), Position::new(0.8, 0.8)));
        assert!(close(path.sample(1500.0), Position::new(0.2, 0.8)));
        assert!(close(path.sample(2000.0), Position::new(0.2, 0.2)));
        // Halfway along the first edge.
        assert!(close(path.sample(250.0), Position::new(0.5, 0.2)));
        // Closing edge runs back to the start.
        assert!(close(path.sample(1750.0), Position::new(0.2, 0.5)));
    }

    #[test]
    fn test_degenerate_loops() {
        let empty = GesturePath::Loop {
            waypoints: vec![],
            period_ms: 1000.0,
        };
        assert!(close(empty.sample(123.0), Position::new(0.5, 0.5)));
        let single = GesturePath::Loop {
            waypoints: vec![Position::new(0.1, 0.9)],
            period_ms: 1000.0,
        };
        assert!(close(single.sample(777.0), Position::new(0.1, 0.9)));
    }

    #[test]
    fn test_zero_period_pins_to_start() {
        let path = GesturePath::Loop {
            waypoints: vec![Position::new(0.3, 0.3), Position::new(0.9, 0.9)],
            period_ms: 0.0,
        };
        assert!(close(path.sample(5000.0), Position::new(0.3, 0.3)));
    }

    #[test]
    fn test_negative_time_wraps() {
        let path = GesturePath::square_loop();
        assert!(close(path.sample(-500.0), path.sample(1500.0)));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(GesturePath::from_name("figure8"), Some(GesturePath::figure_eight()));
        assert_eq!(GesturePath::from_name("square"), Some(GesturePath::square_loop()));
        assert_eq!(GesturePath::from_name("spiral"), None);
    }

    #[test]
    fn test_json_shape() {
        let path: GesturePath = serde_json::from_str(
            r#"{"kind":"loop","waypoints":[{"nx":0.0,"ny":0.0},{"nx":1.0,"ny":1.0}],"period_ms":100.0}"#,
        )
        .unwrap();
        assert!(close(path.sample(25.0), Position::new(0.5, 0.5)));
    }
}
