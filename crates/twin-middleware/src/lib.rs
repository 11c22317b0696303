//! `twin-middleware` – the transport boundary.
//!
//! Routes timestamped messages between the simulated sensors, the motion
//! controller, and anything else listening, without caring about the data's
//! meaning.
//!
//! # Modules
//!
//! - [`bus`] – [`EventBus`]: headless, topic-named publish/subscribe bus built
//!   on Tokio broadcast channels, and the [`Transport`] trait the simulation
//!   core talks to.

pub mod bus;

pub use bus::{EventBus, MessageHandler, Subscription, TopicReceiver, Transport};
