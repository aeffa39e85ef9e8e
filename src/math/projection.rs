//! Isometric projection of 2D offsets.
//!
//! The projection is a fixed linear map built from a rotation, a vertical
//! squash (`ratio`) and an optional horizontal shear. Rotating 45 degrees and
//! squashing by sqrt(3) gives true isometric (30 degree ground lines); a ratio
//! of 2 gives the common 2:1 "game" dimetric.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::core::types::{DMat2, DVec2};

/// Rotation/squash/shear parameters of a projection
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionAngles {
    /// Ground rotation in degrees
    pub rotation_deg: f64,
    /// Vertical squash divisor (> 0)
    pub ratio: f64,
    /// Horizontal shear in degrees
    #[serde(default)]
    pub skew_x_deg: f64,
}

impl ProjectionAngles {
    pub fn new(rotation_deg: f64, ratio: f64, skew_x_deg: f64) -> Self {
        Self { rotation_deg, ratio, skew_x_deg }
    }

    /// Reject parameter sets that do not describe an invertible projection
    pub fn validate(&self) -> Result<()> {
        let finite = self.rotation_deg.is_finite()
            && self.ratio.is_finite()
            && self.skew_x_deg.is_finite();
        if !finite {
            return Err(Error::Projection(format!("non-finite angles {self:?}")));
        }
        if self.ratio <= 0.0 {
            return Err(Error::Projection(format!("ratio must be positive, got {}", self.ratio)));
        }
        if self.skew_x_deg.abs() >= 90.0 {
            return Err(Error::Projection(format!("skew out of range: {}", self.skew_x_deg)));
        }
        Ok(())
    }

    /// Linear map: shear * squash * rotate
    pub fn matrix(&self) -> DMat2 {
        let rotate = DMat2::from_angle(self.rotation_deg.to_radians());
        let squash = DMat2::from_diagonal(DVec2::new(1.0, 1.0 / self.ratio));
        let shear = DMat2::from_cols(
            DVec2::new(1.0, 0.0),
            DVec2::new(self.skew_x_deg.to_radians().tan(), 1.0),
        );
        shear * squash * rotate
    }
}

/// Named projection presets
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectionPreset {
    /// 45 degree rotation, sqrt(3) squash
    #[default]
    TrueIsometric,
    /// 45 degree rotation, 2:1 squash
    Dimetric,
    /// 45 degree rotation, no squash
    Planometric,
    /// Identity
    TopDown,
    Custom(ProjectionAngles),
}

impl ProjectionPreset {
    pub fn angles(&self) -> ProjectionAngles {
        match self {
            ProjectionPreset::TrueIsometric => ProjectionAngles::new(45.0, 3.0_f64.sqrt(), 0.0),
            ProjectionPreset::Dimetric => ProjectionAngles::new(45.0, 2.0, 0.0),
            ProjectionPreset::Planometric => ProjectionAngles::new(45.0, 1.0, 0.0),
            ProjectionPreset::TopDown => ProjectionAngles::new(0.0, 1.0, 0.0),
            ProjectionPreset::Custom(angles) => *angles,
        }
    }
}

/// A validated projection, ready to map offsets
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    forward: DMat2,
    inverse: DMat2,
}

impl Projection {
    /// Build a projection from a preset, validating custom angles
    pub fn from_preset(preset: ProjectionPreset) -> Result<Self> {
        let angles = preset.angles();
        angles.validate()?;

        let forward = angles.matrix();
        let det = forward.determinant();
        if det.abs() < 1e-12 || !det.is_finite() {
            return Err(Error::Projection(format!("singular projection for {preset:?}")));
        }

        Ok(Self { forward, inverse: forward.inverse() })
    }

    /// Map a ground-plane offset to its isometric screen offset
    pub fn project(&self, offset: DVec2) -> DVec2 {
        self.forward * offset
    }

    /// Map a screen offset back onto the ground plane
    pub fn unproject(&self, offset: DVec2) -> DVec2 {
        self.inverse * offset
    }

    /// Transform that cancels the camera projection, used to stand token
    /// art upright on the projected ground.
    pub fn billboard(&self) -> DMat2 {
        self.inverse
    }

    /// Forward matrix
    pub fn matrix(&self) -> DMat2 {
        self.forward
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self { forward: DMat2::IDENTITY, inverse: DMat2::IDENTITY }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle_deg(v: DVec2) -> f64 {
        v.y.atan2(v.x).to_degrees()
    }

    #[test]
    fn test_true_isometric_ground_lines_are_thirty_degrees() {
        let p = Projection::from_preset(ProjectionPreset::TrueIsometric).unwrap();
        assert!((angle_deg(p.project(DVec2::X)) - 30.0).abs() < 1e-9);
        assert!((angle_deg(p.project(DVec2::Y)) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_dimetric_two_to_one() {
        let p = Projection::from_preset(ProjectionPreset::Dimetric).unwrap();
        let v = p.project(DVec2::X);
        assert!((v.x / v.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_down_is_identity() {
        let p = Projection::from_preset(ProjectionPreset::TopDown).unwrap();
        let v = DVec2::new(12.5, -3.0);
        assert!((p.project(v) - v).length() < 1e-12);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let custom = ProjectionPreset::Custom(ProjectionAngles::new(30.0, 1.5, 10.0));
        let p = Projection::from_preset(custom).unwrap();
        let v = DVec2::new(140.0, -60.0);
        assert!((p.unproject(p.project(v)) - v).length() < 1e-9);
        assert!((p.billboard() * p.matrix()).abs_diff_eq(DMat2::IDENTITY, 1e-12));
    }

    #[test]
    fn test_invalid_custom_angles_rejected() {
        let zero_ratio = ProjectionPreset::Custom(ProjectionAngles::new(45.0, 0.0, 0.0));
        assert!(Projection::from_preset(zero_ratio).is_err());
        let nan = ProjectionPreset::Custom(ProjectionAngles::new(f64::NAN, 1.0, 0.0));
        assert!(Projection::from_preset(nan).is_err());
        let skew = ProjectionPreset::Custom(ProjectionAngles::new(0.0, 1.0, 90.0));
        assert!(Projection::from_preset(skew).is_err());
    }
}
