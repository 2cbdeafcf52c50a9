//! Stroke smoothing shared by the live renderer and the raster layer.

use super::stroke::Point;

/// One piece of a smoothed stroke outline, in document units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathSegment {
    Line {
        from: (f64, f64),
        to: (f64, f64),
    },
    /// Quadratic Bézier through `ctrl`
    Quad {
        from: (f64, f64),
        ctrl: (f64, f64),
        to: (f64, f64),
    },
}

impl PathSegment {
    pub fn start(&self) -> (f64, f64) {
        match *self {
            PathSegment::Line { from, .. } | PathSegment::Quad { from, .. } => from,
        }
    }

    pub fn end(&self) -> (f64, f64) {
        match *self {
            PathSegment::Line { to, .. } | PathSegment::Quad { to, .. } => to,
        }
    }
}

/// A smoothed segment with the pressure of the input point that shaped it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedSegment {
    pub segment: PathSegment,
    pub pressure: f64,
}

/// Line width for a segment: `base × (0.8 + 0.4 × clamp(pressure, 0.5, 1.0))`.
pub fn pressure_width(base: f64, pressure: f64) -> f64 {
    base * (0.8 + 0.4 * pressure.clamp(0.5, 1.0))
}

/// Splits a stroke into quadratic curves through the midpoints of consecutive
/// input points.
///
/// Each input point (except the endpoints) becomes the control point of a curve
/// running from the previous midpoint to the next one, which hides the facets
/// of discrete pointer sampling. Fewer than two points yield nothing.
pub fn smoothed_segments(points: &[Point]) -> Vec<WeightedSegment> {
    if points.len() < 2 {
        return Vec::new();
    }

    let xy = |p: &Point| (p.x, p.y);

    if points.len() == 2 {
        return vec![WeightedSegment {
            segment: PathSegment::Line {
                from: xy(&points[0]),
                to: xy(&points[1]),
            },
            pressure: points[1].pressure_or_default(),
        }];
    }

    let mut segments = Vec::with_capacity(points.len());
    let mut cursor = xy(&points[0]);

    for pair in points[1..].windows(2) {
        let (ctrl, next) = (&pair[0], &pair[1]);
        let mid = ((ctrl.x + next.x) / 2.0, (ctrl.y + next.y) / 2.0);
        segments.push(WeightedSegment {
            segment: PathSegment::Quad {
                from: cursor,
                ctrl: xy(ctrl),
                to: mid,
            },
            pressure: ctrl.pressure_or_default(),
        });
        cursor = mid;
    }

    let last = &points[points.len() - 1];
    segments.push(WeightedSegment {
        segment: PathSegment::Line {
            from: cursor,
            to: xy(last),
        },
        pressure: last.pressure_or_default(),
    });

    segments
}

/// Cubic control points equivalent to a quadratic curve (Cairo only draws cubics).
pub fn quad_to_cubic(
    from: (f64, f64),
    ctrl: (f64, f64),
    to: (f64, f64),
) -> ((f64, f64), (f64, f64)) {
    let c1 = (
        from.0 + 2.0 / 3.0 * (ctrl.0 - from.0),
        from.1 + 2.0 / 3.0 * (ctrl.1 - from.1),
    );
    let c2 = (
        to.0 + 2.0 / 3.0 * (ctrl.0 - to.0),
        to.1 + 2.0 / 3.0 * (ctrl.1 - to.1),
    );
    (c1, c2)
}
