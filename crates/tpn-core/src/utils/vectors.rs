use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A three-vector used for both momenta (MeV) and positions (mm).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(value: [f64; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }
    /// The Euclidean norm.
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }
    /// Cosine of the polar angle, or `None` for the zero vector.
    pub fn costheta(&self) -> Option<f64> {
        let mag = self.mag();
        (mag > 0.0).then(|| self.z / mag)
    }
    /// Polar angle with respect to the beam (`z`) axis, in radians.
    pub fn theta(&self) -> Option<f64> {
        self.costheta().map(|c| c.clamp(-1.0, 1.0).acos())
    }
    /// Polar angle with respect to the beam (`z`) axis, in degrees.
    pub fn theta_degrees(&self) -> Option<f64> {
        self.theta().map(f64::to_degrees)
    }
}
