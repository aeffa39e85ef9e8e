//! Axis-aligned world rectangles and wall segments

use serde::{Deserialize, Serialize};

use crate::core::types::DVec2;

/// Axis-aligned rectangle anchored at its top-left corner (world units, y down)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Top-left corner
    pub fn origin(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Get center point
    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Right edge x
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Both dimensions strictly positive and every field finite
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Check if point is inside the rectangle (edges inclusive)
    pub fn contains_point(&self, p: DVec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Points along the perimeter, one every `step` world units along each
    /// edge. Corners are always included.
    pub fn perimeter_samples(&self, step: f64) -> Vec<DVec2> {
        let tl = self.origin();
        let tr = DVec2::new(self.right(), self.y);
        let br = DVec2::new(self.right(), self.bottom());
        let bl = DVec2::new(self.x, self.bottom());

        let mut out = Vec::new();
        for (a, b) in [(tl, tr), (tr, br), (br, bl), (bl, tl)] {
            let edge = Segment::new(a, b);
            let mut pts = edge.samples(step);
            // Each edge's end is the next edge's start
            pts.pop();
            out.extend(pts);
        }
        out
    }
}

/// A straight wall segment between two endpoints
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: DVec2,
    pub b: DVec2,
}

impl Segment {
    pub fn new(a: DVec2, b: DVec2) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    /// Points every `step` units from `a` toward `b`, both endpoints included.
    ///
    /// A non-positive or non-finite step yields only the endpoints.
    pub fn samples(&self, step: f64) -> Vec<DVec2> {
        let len = self.length();
        if !(step > 0.0 && step.is_finite()) || len <= step {
            return if len == 0.0 { vec![self.a] } else { vec![self.a, self.b] };
        }

        let count = (len / step).ceil() as usize;
        let mut out = Vec::with_capacity(count + 1);
        for i in 0..count {
            let t = (i as f64 * step / len).min(1.0);
            out.push(self.a.lerp(self.b, t));
        }
        out.push(self.b);
        out
    }
}
