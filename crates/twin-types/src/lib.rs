//! `twin-types` – shared geometry, message schemas, the event envelope and
//! the [`SimError`] type used across every twin crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod geometry;
pub mod messages;

pub use geometry::{Pose, Quaternion, Vec3};
pub use messages::{
    Header, Image, ImageEncoding, Imu, LaserScan, Message, MessageSchema, NO_RETURN, Time,
    Twist, UNKNOWN_COVARIANCE,
};

/// Unified envelope for every message routed over the topic bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    /// Wall-clock time the event entered the bus.  The simulation time of
    /// the sample lives in the message header.
    pub timestamp: DateTime<Utc>,
    /// e.g., "/scan"
    pub topic: String,
    pub payload: Message,
}

impl Event {
    pub fn new(topic: impl Into<String>, payload: Message) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            topic: topic.into(),
            payload,
        }
    }
}

/// Global error type spanning configuration faults, capture failures and
/// transport misuse.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimError {
    #[error("Configuration Error in {component}: {details}")]
    Config { component: String, details: String },

    #[error("Capture Failed on surface '{surface}': {details}")]
    Capture { surface: String, details: String },

    #[error("Unknown Topic: {0}")]
    UnknownTopic(String),

    #[error("Schema Mismatch on {topic}: expected {expected}, found {found}")]
    SchemaMismatch {
        topic: String,
        expected: MessageSchema,
        found: MessageSchema,
    },

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}

impl SimError {
    /// Shorthand for a [`SimError::Config`].
    pub fn config(component: impl Into<String>, details: impl Into<String>) -> Self {
        SimError::Config {
            component: component.into(),
            details: details.into(),
        }
    }
}
