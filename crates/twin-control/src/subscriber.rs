//! Wires a [`CommandSlot`] to the velocity-command topic.

use tracing::{debug, warn};
use twin_middleware::{Subscription, Transport};
use twin_types::{Message, MessageSchema, SimError};

use crate::command::CommandSlot;

/// Register `topic` as a `Twist` topic and store every command received on
/// it into `slot`.
///
/// Messages of any other type are logged and dropped.  Must be called from
/// within a Tokio runtime.
pub fn subscribe_commands(
    transport: &dyn Transport,
    topic: &str,
    slot: CommandSlot,
) -> Result<Subscription, SimError> {
    transport.register_topic(topic, MessageSchema::Twist)?;
    let name = topic.to_string();
    transport.subscribe(
        topic,
        Box::new(move |message: &Message| match message {
            Message::Twist(twist) => {
                let target = slot.submit(twist);
                debug!(
                    topic = %name,
                    linear = target.linear,
                    yaw_rate = target.yaw_rate,
                    "drive target updated"
                );
            }
            other => warn!(topic = %name, schema = %other.schema(), "ignoring non-twist command"),
        }),
    )
}
