//! # AgriSense Core
//!
//! Domain types and error definitions for the AgriSense sensor backend.
//! This crate has **zero framework dependencies** — it defines the value
//! objects that flow through the system: a sensor reading is persisted by
//! the store, conversations and messages form the chat history, and
//! `ChatMessage` is the wire shape sent to the completion provider.

pub mod error;
pub mod message;
pub mod reading;

// Re-export key types at crate root for ergonomics
pub use error::{DeviceError, Error, ProviderError, Result, StoreError};
pub use message::{ChatMessage, Conversation, Role, StoredMessage};
pub use reading::{SensorReading, METRIC_FIELDS};
