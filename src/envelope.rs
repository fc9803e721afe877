//! Courier envelope types and data structures.
//!
//! This module defines the four envelope kinds exchanged over a Courier
//! session (Message, Notification, Command, and Session) together with
//! their supporting enums. Envelopes are plain serde value types; framing
//! and transport encoding live with the transport implementation.

use serde::{Deserialize, Serialize};

/// State of a Courier session over one underlying transport connection.
///
/// Application envelopes (messages, notifications, commands) may only flow
/// while the session is [`SessionState::Established`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum SessionState {
    /// Session created, nothing negotiated yet
    New,
    /// Transport options (compression, encryption) are being negotiated
    Negotiating,
    /// Client identity is being authenticated
    Authenticating,
    /// Session is ready; application envelopes may flow
    Established,
    /// A finishing envelope has been sent and the session is draining
    Finishing,
    /// Session terminated gracefully
    Finished,
    /// Session terminated due to an error
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::New => write!(f, "new"),
            Self::Negotiating => write!(f, "negotiating"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Established => write!(f, "established"),
            Self::Finishing => write!(f, "finishing"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Event reported by a notification about a previously sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum NotificationEvent {
    /// The node accepted the message for delivery
    Accepted,
    /// The message was dispatched toward the destination
    Dispatched,
    /// The destination received the message
    Received,
    /// The destination consumed the message
    Consumed,
    /// Delivery failed; see the attached reason
    Failed,
}

/// Method of a command envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum CommandMethod {
    /// Retrieve a resource
    Get,
    /// Create or update a resource
    Set,
    /// Remove a resource
    Delete,
    /// Subscribe to resource change events
    Subscribe,
    /// Cancel a subscription
    Unsubscribe,
    /// Merge a partial representation into a resource
    Merge,
}

/// Outcome of a command response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum CommandStatus {
    /// The command was processed successfully
    Success,
    /// The command failed; see the attached reason
    Failure,
}

/// Failure reason attached to notifications, commands, and sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    /// Numeric reason code
    pub code: u32,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Reason {
    /// Create a reason with a code and description.
    pub fn new(code: u32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: Some(description.into()),
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.description {
            Some(ref description) => write!(f, "{} (code {})", description, self.code),
            None => write!(f, "code {}", self.code),
        }
    }
}

/// Message envelope carrying application content between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Envelope identifier; present when the sender wants delivery
    /// notifications back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Originator node address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destination node address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Application content
    pub content: serde_json::Value,
}

impl Message {
    /// Create a message with the given content and a fresh identifier.
    pub fn new(content: serde_json::Value) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            from: None,
            to: None,
            content,
        }
    }
}

/// Notification envelope reporting a delivery event for a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Identifier of the message the notification refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Originator node address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destination node address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Reported delivery event
    pub event: NotificationEvent,
    /// Failure detail, present when `event` is [`NotificationEvent::Failed`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
}

/// Command envelope for request/response exchanges.
///
/// A response correlates with its request through an identical `id`; the
/// `status` field distinguishes responses from requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Correlation identifier; required for request/response processing
    pub id: String,
    /// Originator node address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destination node address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Requested method
    pub method: CommandMethod,
    /// Resource the method applies to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Response status; absent on requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CommandStatus>,
    /// Failure detail, present when `status` is [`CommandStatus::Failure`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    /// Resource representation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
}

impl Command {
    /// Create a command request with a fresh identifier.
    pub fn request(method: CommandMethod, uri: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: None,
            to: None,
            method,
            uri: Some(uri.into()),
            status: None,
            reason: None,
            resource: None,
        }
    }

    /// Create a success response correlated with the given request.
    pub fn success_response(request: &Self) -> Self {
        Self {
            id: request.id.clone(),
            from: request.to.clone(),
            to: request.from.clone(),
            method: request.method,
            uri: None,
            status: Some(CommandStatus::Success),
            reason: None,
            resource: None,
        }
    }

    /// Create a failure response correlated with the given request.
    pub fn failure_response(request: &Self, reason: Reason) -> Self {
        Self {
            id: request.id.clone(),
            from: request.to.clone(),
            to: request.from.clone(),
            method: request.method,
            uri: None,
            status: Some(CommandStatus::Failure),
            reason: Some(reason),
            resource: None,
        }
    }
}

/// Session envelope controlling the lifecycle of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier assigned by the remote party
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Originator node address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destination node address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Session state announced by this envelope
    pub state: SessionState,
    /// Failure detail, present when `state` is [`SessionState::Failed`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
}

impl Session {
    /// Create a session envelope in the given state.
    pub fn with_state(state: SessionState) -> Self {
        Self {
            id: None,
            from: None,
            to: None,
            state,
            reason: None,
        }
    }
}
