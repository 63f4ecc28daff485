//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! World-space geometry

use serde::{Deserialize, Serialize};

/// A point in world space. `y` is altitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Horizontal distance, ignoring altitude
    pub fn distance_xz(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Vec3 {
        Vec3::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Point `fraction` of the way from `self` towards `other`
    pub fn lerp(&self, other: &Vec3, fraction: f64) -> Vec3 {
        Vec3::new(
            self.x + (other.x - self.x) * fraction,
            self.y + (other.y - self.y) * fraction,
            self.z + (other.z - self.z) * fraction,
        )
    }

    /// Point on the way to `target` that stops `standoff` short of it. Already within
    /// `standoff`, that is `self`.
    pub fn approach(&self, target: &Vec3, standoff: f64) -> Vec3 {
        let distance = self.distance(target);
        if distance <= standoff {
            return *self;
        }
        self.lerp(target, (distance - standoff) / distance)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_distance_xz_ignores_altitude() {
        let a = Vec3::new(0.0, 10.0, 0.0);
        let b = Vec3::new(3.0, 90.0, 4.0);
        assert_eq!(a.distance_xz(&b), 5.0);
    }

    #[test]
    fn test_lerp() {
        let a = Vec3::new(0.0, 64.0, 0.0);
        let b = Vec3::new(100.0, 74.0, -100.0);
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid, Vec3::new(50.0, 69.0, -50.0));
    }

    #[test]
    fn test_approach_stops_short() {
        let a = Vec3::new(0.0, 64.0, 0.0);
        let b = Vec3::new(20.0, 64.0, 0.0);
        assert_eq!(a.approach(&b, 2.0), Vec3::new(18.0, 64.0, 0.0));
        let near = Vec3::new(19.0, 64.0, 0.0);
        assert_eq!(near.approach(&b, 2.0), near);
    }

    #[test]
    fn test_is_finite() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Vec3::new(f64::NAN, 2.0, 3.0).is_finite());
        assert!(!Vec3::new(1.0, f64::INFINITY, 3.0).is_finite());
    }
}
