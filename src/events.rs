use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;

/// How an event is delivered by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum EventType {
    /// Delivered to subscribers in dispatch order.
    Standard,
}

/// A leaf certificate was issued and stored for a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedCertificateIssued {
    pub container_name: String,
    pub dns_names: Vec<String>,
}

impl SignedCertificateIssued {
    pub const NAME: &'static str = "signed.certificate.issued";

    pub fn new(container_name: impl Into<String>, dns_names: Vec<String>) -> Self {
        Self {
            container_name: container_name.into(),
            dns_names,
        }
    }
}

/// The certificate stored for a container was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedCertificateRemoved {
    pub container_name: String,
}

impl SignedCertificateRemoved {
    pub const NAME: &'static str = "signed.certificate.removed";

    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
        }
    }
}

/// Certificate lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SignedCertificateIssued(SignedCertificateIssued),
    SignedCertificateRemoved(SignedCertificateRemoved),
}

impl Event {
    /// Stable dotted identifier subscribers match on.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SignedCertificateIssued(_) => SignedCertificateIssued::NAME,
            Event::SignedCertificateRemoved(_) => SignedCertificateRemoved::NAME,
        }
    }

    pub fn event_type(&self) -> EventType {
        EventType::Standard
    }

    /// The payload as a JSON object keyed by camelCase field names.
    pub fn to_array(&self) -> Value {
        let payload = match self {
            Event::SignedCertificateIssued(event) => serde_json::to_value(event),
            Event::SignedCertificateRemoved(event) => serde_json::to_value(event),
        };
        // Payloads are plain strings and string lists, which always serialize.
        payload.unwrap_or(Value::Null)
    }
}

impl From<SignedCertificateIssued> for Event {
    fn from(event: SignedCertificateIssued) -> Self {
        Event::SignedCertificateIssued(event)
    }
}

impl From<SignedCertificateRemoved> for Event {
    fn from(event: SignedCertificateRemoved) -> Self {
        Event::SignedCertificateRemoved(event)
    }
}

/// Fire-and-forget event sink.
pub trait EventBus {
    fn dispatch(&self, event: Event);
}

impl<T: EventBus + ?Sized> EventBus for &T {
    fn dispatch(&self, event: Event) {
        (**self).dispatch(event)
    }
}

impl<T: EventBus + ?Sized> EventBus for Arc<T> {
    fn dispatch(&self, event: Event) {
        (**self).dispatch(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn dispatch(&self, _event: Event) {}
}

/// Keeps dispatched events in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingEventBus {
    events: Mutex<Vec<Event>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events dispatched so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventBus for RecordingEventBus {
    fn dispatch(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
