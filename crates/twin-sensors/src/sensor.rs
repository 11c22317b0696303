//! The [`Sensor`] trait every simulated sensor implements.

use twin_hal::WorldQuery;
use twin_types::{Message, MessageSchema, SimError};

/// A scheduler-gated producer of messages from world state.
///
/// The host calls [`Sensor::tick`] once per render tick.  The sensor decides
/// through its own [`PublishScheduler`][crate::scheduler::PublishScheduler]
/// whether to sample; when it does, the returned message must be published
/// on [`Sensor::topic`].
pub trait Sensor: Send {
    /// Short component name used in logs, e.g. `"lidar"`.
    fn name(&self) -> &str;

    /// Topic the produced messages belong on.
    fn topic(&self) -> &str;

    /// Schema to register [`Sensor::topic`] with.
    fn schema(&self) -> MessageSchema;

    /// Sample the world if the sensor is due at simulation time `now`.
    ///
    /// Returns `Ok(None)` when the sensor is not due.
    ///
    /// # Errors
    ///
    /// Returns an error when the sample could not be produced (e.g. a
    /// malformed capture).  The sensor stays usable and tries again at its
    /// next scheduled tick.
    fn tick(&mut self, now: f64, world: &dyn WorldQuery) -> Result<Option<Message>, SimError>;
}

/// Shared validation for the fields every sensor config carries.
pub(crate) fn validate_common(
    component: &str,
    topic: &str,
    frame_id: &str,
) -> Result<(), SimError> {
    if topic.trim().is_empty() {
        return Err(SimError::config(component, "topic must not be empty"));
    }
    if frame_id.trim().is_empty() {
        return Err(SimError::config(component, "frame_id must not be empty"));
    }
    Ok(())
}
