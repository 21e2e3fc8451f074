//! WebSocket Session
//!
//! Protocol state machine for one connection. Socket I/O lives in
//! `handler`; this module only interprets decoded frames and drives the
//! gateway, the identity validator and the persistence store.

use std::sync::Arc;

use super::dispatcher::DeliveryError;
use super::gateway::{ConnectionGone, Gateway};
use super::messages::{
    ClientFrame, FrameError, JoinChannelPayload, LeaveChannelPayload, NewMessagePayload,
    ServerFrame,
};
use super::registry::{BindError, ConnectionId};
use crate::application::services::IdentityValidator;
use crate::domain::{ChannelRepository, Identity, MessageRepository, NewMessage};
use crate::infrastructure::metrics;

/// Error texts sent in `error` frames
pub const INVALID_TOKEN: &str = "invalid or expired token";
pub const NOT_AUTHENTICATED: &str = "not authenticated";
pub const SAVE_FAILED: &str = "failed to save message";
pub const CHANNEL_NOT_FOUND: &str = "channel not found";
pub const VOICE_CHANNEL: &str = "cannot send text messages to a voice channel";
pub const ALREADY_AUTHENTICATED: &str = "connection is already authenticated as another user";

/// Collaborators shared by every session
#[derive(Clone)]
pub struct SessionContext {
    pub gateway: Arc<Gateway>,
    pub identity: Arc<dyn IdentityValidator>,
    pub messages: Arc<dyn MessageRepository>,
    pub channels: Arc<dyn ChannelRepository>,
    /// Maximum message content length in characters
    pub max_content_length: usize,
}

/// Where a session is in the protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No identity bound yet
    Connected,
    /// Identity bound; may hold any number of subscriptions
    Authenticated(Identity),
}

/// Errors that end the session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Gone(#[from] ConnectionGone),

    #[error("failed to reply: {0}")]
    Reply(#[from] DeliveryError),
}

/// One connection's protocol handler.
///
/// Dropping the session is the `Closed` transition: it tears the connection
/// down in the gateway, whichever way the owning task exits.
pub struct Session {
    id: ConnectionId,
    ctx: SessionContext,
    state: SessionState,
}

impl Session {
    pub fn new(id: ConnectionId, ctx: SessionContext) -> Self {
        Self {
            id,
            ctx,
            state: SessionState::Connected,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle one inbound text frame.
    ///
    /// Unknown and malformed frames are logged and ignored. An `Err` means
    /// the connection is gone or cannot be written to and the session must
    /// end.
    pub async fn handle_text(&mut self, text: &str) -> Result<(), SessionError> {
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(FrameError::UnknownType(kind)) => {
                metrics::record_frame_received("unknown");
                tracing::debug!(connection_id = %self.id, frame_type = %kind, "Unknown frame type");
                return Ok(());
            }
            Err(e) => {
                metrics::record_frame_received("malformed");
                tracing::debug!(connection_id = %self.id, error = %e, "Ignoring malformed frame");
                return Ok(());
            }
        };

        metrics::record_frame_received(frame.kind());

        match frame {
            ClientFrame::JoinChannel(payload) => self.join_channel(payload).await,
            ClientFrame::NewMessage(payload) => self.new_message(payload).await,
            ClientFrame::LeaveChannel(payload) => self.leave_channel(payload),
        }
    }

    async fn join_channel(&mut self, payload: JoinChannelPayload) -> Result<(), SessionError> {
        let identity = match self.ctx.identity.validate(&payload.token).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(connection_id = %self.id, error = %e, "Token rejected");
                return self.reply(ServerFrame::error(INVALID_TOKEN));
            }
        };

        // Re-authentication policy: the same user may join more channels,
        // a different user is refused and nothing changes.
        match self.ctx.gateway.bind(self.id, identity.clone()) {
            Ok(()) => {
                tracing::info!(
                    connection_id = %self.id,
                    user_id = identity.user_id,
                    "Connection authenticated"
                );
                self.state = SessionState::Authenticated(identity);
            }
            Err(BindError::AlreadyBound { user_id }) if user_id == identity.user_id => {}
            Err(BindError::AlreadyBound { user_id }) => {
                tracing::warn!(
                    connection_id = %self.id,
                    bound_user_id = user_id,
                    presented_user_id = identity.user_id,
                    "Re-authentication as a different user refused"
                );
                return self.reply(ServerFrame::error(ALREADY_AUTHENTICATED));
            }
            Err(BindError::UnknownConnection) => return Err(ConnectionGone(self.id).into()),
        }

        self.ctx.gateway.subscribe(payload.channel_id, self.id)?;
        tracing::debug!(
            connection_id = %self.id,
            channel_id = payload.channel_id,
            "Subscribed to channel"
        );

        self.reply(ServerFrame::join_success(payload.channel_id))
    }

    async fn new_message(&mut self, payload: NewMessagePayload) -> Result<(), SessionError> {
        let Some(author) = self.ctx.gateway.identity_of(self.id) else {
            tracing::debug!(connection_id = %self.id, "Message from unauthenticated connection");
            return self.reply(ServerFrame::error(NOT_AUTHENTICATED));
        };

        let length = payload.content.chars().count();
        if payload.content.trim().is_empty() || length > self.ctx.max_content_length {
            return self.reply(ServerFrame::error(format!(
                "message content must be between 1 and {} characters",
                self.ctx.max_content_length
            )));
        }

        match self.ctx.channels.find_by_id(payload.channel_id).await {
            Ok(Some(channel)) if channel.is_text_based() => {}
            Ok(Some(_)) => return self.reply(ServerFrame::error(VOICE_CHANNEL)),
            Ok(None) => return self.reply(ServerFrame::error(CHANNEL_NOT_FOUND)),
            Err(e) => {
                tracing::error!(
                    connection_id = %self.id,
                    channel_id = payload.channel_id,
                    error = %e,
                    "Channel lookup failed"
                );
                return self.reply(ServerFrame::error(SAVE_FAILED));
            }
        }

        let new_message = NewMessage {
            channel_id: payload.channel_id,
            author_id: author.user_id,
            content: payload.content,
            parent_message_id: payload.parent_message_id,
        };

        // Nothing is broadcast unless the store accepted the message.
        let message = match self.ctx.messages.create(&new_message).await {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    connection_id = %self.id,
                    channel_id = new_message.channel_id,
                    user_id = author.user_id,
                    error = %e,
                    "Failed to save message"
                );
                return self.reply(ServerFrame::error(SAVE_FAILED));
            }
        };
        metrics::record_message_persisted();

        let report = self
            .ctx
            .gateway
            .broadcast(message.channel_id, &ServerFrame::new_message(&message, &author));

        tracing::debug!(
            connection_id = %self.id,
            channel_id = message.channel_id,
            message_id = message.id,
            recipients = report.recipients,
            delivered = report.delivered,
            failed = report.failed.len(),
            "Message broadcast"
        );
        Ok(())
    }

    fn leave_channel(&mut self, payload: LeaveChannelPayload) -> Result<(), SessionError> {
        let removed = self.ctx.gateway.leave(payload.channel_id, self.id);
        tracing::debug!(
            connection_id = %self.id,
            channel_id = payload.channel_id,
            was_subscribed = removed,
            "Left channel"
        );
        self.reply(ServerFrame::leave_success(payload.channel_id))
    }

    fn reply(&self, frame: ServerFrame) -> Result<(), SessionError> {
        self.ctx.gateway.send_to(self.id, frame)?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.ctx.gateway.disconnect(self.id);
    }
}
