//! [`CommandSlot`]: the latest drive target, shared between the transport's
//! handler task and the physics tick.
//!
//! Writes are last-write-wins.  Superseded commands are never queued, so
//! the physics tick always ramps toward the most recent request.

use std::sync::{Arc, Mutex, PoisonError};

use twin_types::Twist;

/// Clamped forward speed (m/s) and yaw rate (rad/s) the controller ramps
/// toward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveTarget {
    pub linear: f32,
    pub yaw_rate: f32,
}

/// Clamp `value` to `[-max, max]`.  Non-finite input becomes zero.
pub fn clamp_command(value: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-max, max)
    } else {
        0.0
    }
}

/// Guarded, clonable handle to the current [`DriveTarget`].
///
/// All clones share the same target.
#[derive(Debug, Clone)]
pub struct CommandSlot {
    max_speed: f32,
    max_yaw_rate: f32,
    target: Arc<Mutex<DriveTarget>>,
}

impl CommandSlot {
    /// Create a slot with a zero target.  Negative limits are treated as
    /// their magnitude.
    pub fn new(max_speed: f32, max_yaw_rate: f32) -> Self {
        Self {
            max_speed: max_speed.abs(),
            max_yaw_rate: max_yaw_rate.abs(),
            target: Arc::new(Mutex::new(DriveTarget::default())),
        }
    }

    /// Clamp `twist.linear.x` and `twist.angular.z` and store them as the
    /// new target, replacing any previous one.  Returns what was stored.
    pub fn submit(&self, twist: &Twist) -> DriveTarget {
        let target = DriveTarget {
            linear: clamp_command(twist.linear.x, self.max_speed),
            yaw_rate: clamp_command(twist.angular.z, self.max_yaw_rate),
        };
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = target;
        target
    }

    /// The most recently stored target.
    pub fn target(&self) -> DriveTarget {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the target to zero.
    pub fn clear(&self) {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = DriveTarget::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn over_limit_command_stores_exact_limit() {
        let slot = CommandSlot::new(2.0, 1.5);
        let stored = slot.submit(&Twist::planar(4.0, -3.0));
        assert_eq!(
            stored,
            DriveTarget {
                linear: 2.0,
                yaw_rate: -1.5
            }
        );
        assert_eq!(slot.target(), stored);
    }

    #[test]
    fn in_range_command_is_stored_unchanged() {
        let slot = CommandSlot::new(2.0, 2.0);
        slot.submit(&Twist::planar(0.75, -0.25));
        assert_eq!(
            slot.target(),
            DriveTarget {
                linear: 0.75,
                yaw_rate: -0.25
            }
        );
    }

    #[test]
    fn non_finite_components_become_zero() {
        let slot = CommandSlot::new(2.0, 2.0);
        slot.submit(&Twist::planar(f32::NAN, f32::INFINITY));
        assert_eq!(slot.target(), DriveTarget::default());
    }

    #[test]
    fn only_forward_and_yaw_components_are_used() {
        let slot = CommandSlot::new(2.0, 2.0);
        let mut twist = Twist::planar(1.0, 0.5);
        twist.linear.y = 9.0;
        twist.angular.x = 9.0;
        assert_eq!(
            slot.submit(&twist),
            DriveTarget {
                linear: 1.0,
                yaw_rate: 0.5
            }
        );
    }

    #[test]
    fn last_write_wins_across_clones() {
        let slot = CommandSlot::new(2.0, 2.0);
        let writer = slot.clone();
        thread::spawn(move || {
            writer.submit(&Twist::planar(0.5, 0.0));
            writer.submit(&Twist::planar(1.0, 0.1));
        })
        .join()
        .unwrap();
        assert_eq!(
            slot.target(),
            DriveTarget {
                linear: 1.0,
                yaw_rate: 0.1
            }
        );

        slot.clear();
        assert_eq!(slot.target(), DriveTarget::default());
    }
}
