use serde::{Deserialize, Serialize};

use super::body::{AgentBody, Obstacle};

/// Width of the feature vector fed to the value network.
pub const STATE_SIZE: usize = 5;

/// Normalization constant for vertical velocity.
const VELOCITY_SCALE: f32 = 10.0;

/// Compact observation derived from the body and the next obstacle.
///
/// Every feature is normalized by the world dimensions so the network sees
/// values of roughly unit scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    /// Top edge of the body over world height.
    pub height: f32,
    /// Vertical velocity over [`VELOCITY_SCALE`].
    pub velocity: f32,
    /// Horizontal distance to the next obstacle over world width.
    pub distance: f32,
    /// Signed clearance between the body and the gap's top edge.
    pub top_clearance: f32,
    /// Signed clearance between the gap's bottom edge and the body.
    pub bottom_clearance: f32,
}

impl StateVector {
    /// Build the features for `body` relative to `next`. When there is no
    /// obstacle the distance saturates at 1.0 and both clearances are zero.
    pub fn observe(
        body: &AgentBody,
        next: Option<&Obstacle>,
        world_width: f32,
        world_height: f32,
    ) -> Self {
        let (distance, top, bottom) = match next {
            Some(obs) => (obs.x - body.x, body.y - obs.gap_top, obs.gap_bottom - body.y),
            None => (world_width, 0.0, 0.0),
        };

        StateVector {
            height: body.y / world_height,
            velocity: body.velocity / VELOCITY_SCALE,
            distance: distance / world_width,
            top_clearance: top / world_height,
            bottom_clearance: bottom / world_height,
        }
    }

    pub fn to_array(&self) -> [f32; STATE_SIZE] {
        [
            self.height,
            self.velocity,
            self.distance,
            self.top_clearance,
            self.bottom_clearance,
        ]
    }

    pub fn from_array(values: [f32; STATE_SIZE]) -> Self {
        StateVector {
            height: values[0],
            velocity: values[1],
            distance: values[2],
            top_clearance: values[3],
            bottom_clearance: values[4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> AgentBody {
        AgentBody {
            x: 50.0,
            y: 256.0,
            velocity: -5.0,
            width: 34.0,
            height: 24.0,
        }
    }

    #[test]
    fn test_observe_with_obstacle() {
        let obs = Obstacle::new(194.0, 300.0, 100.0);
        let s = StateVector::observe(&body(), Some(&obs), 288.0, 512.0);
        assert!((s.height - 0.5).abs() < 1e-6);
        assert!((s.velocity + 0.5).abs() < 1e-6);
        assert!((s.distance - 0.5).abs() < 1e-6);
        // body.y 256 - gap_top 250
        assert!((s.top_clearance - 6.0 / 512.0).abs() < 1e-6);
        // gap_bottom 350 - body.y 256
        assert!((s.bottom_clearance - 94.0 / 512.0).abs() < 1e-6);
    }

    #[test]
    fn test_observe_sentinel_without_obstacle() {
        let s = StateVector::observe(&body(), None, 288.0, 512.0);
        assert_eq!(s.distance, 1.0);
        assert_eq!(s.top_clearance, 0.0);
        assert_eq!(s.bottom_clearance, 0.0);
    }

    #[test]
    fn test_array_roundtrip() {
        let s = StateVector::observe(&body(), None, 288.0, 512.0);
        assert_eq!(StateVector::from_array(s.to_array()), s);
    }
}
