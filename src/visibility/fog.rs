//! Colour matrix applied to fogged scenery

use serde::{Deserialize, Serialize};

/// Row-major 4x5 RGBA colour matrix. Each output channel is
/// `r*m0 + g*m1 + b*m2 + a*m3 + m4` for its row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorMatrix(pub [f32; 20]);

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        1.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]);

    /// Apply to a single RGBA colour with channels in [0, 1]
    pub fn apply(&self, rgba: [f32; 4]) -> [f32; 4] {
        let m = &self.0;
        let mut out = [0.0; 4];
        for (row, channel) in out.iter_mut().enumerate() {
            let r = &m[row * 5..row * 5 + 5];
            *channel = (r[0] * rgba[0] + r[1] * rgba[1] + r[2] * rgba[2] + r[3] * rgba[3] + r[4])
                .clamp(0.0, 1.0);
        }
        out
    }
}

/// Half-desaturated, darkened to 60% brightness. Alpha passes through.
pub const FOG_MATRIX: ColorMatrix = {
    // Rec. 601 luma weights, scaled by 0.5 then by the 0.6 darken factor
    const L: f32 = 0.5 * 0.6;
    const K: f32 = 0.5 * 0.6;
    ColorMatrix([
        K + L * 0.299, L * 0.587, L * 0.114, 0.0, 0.0,
        L * 0.299, K + L * 0.587, L * 0.114, 0.0, 0.0,
        L * 0.299, L * 0.587, K + L * 0.114, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0, 0.0,
    ])
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fog_darkens_and_desaturates() {
        let red = FOG_MATRIX.apply([1.0, 0.0, 0.0, 1.0]);
        assert!(red[0] < 1.0);
        assert!(red[1] > 0.0 && red[2] > 0.0);
        assert_eq!(red[3], 1.0);

        let white = FOG_MATRIX.apply([1.0, 1.0, 1.0, 0.5]);
        for c in &white[..3] {
            assert!((c - 0.6).abs() < 1e-5);
        }
        assert_eq!(white[3], 0.5);
    }

    #[test]
    fn test_identity_passes_through() {
        let c = [0.2, 0.4, 0.6, 0.8];
        assert_eq!(ColorMatrix::IDENTITY.apply(c), c);
    }
}
