//! Player count and ticket operations, all callback-awaited.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::awaitable::{AwaitedStep, Wake};
use crate::core::error::BridgeError;
use crate::core::handle::{Channel, CompletionHandle};
use crate::core::notification::{CallPayload, Notification};
use crate::core::task::TaskContext;

/// Operation name of [`PlayerCount`].
pub const GET_NUMBER_OF_PLAYERS: &str = "get_number_of_players";
/// Operation name of [`AuthSessionTicket`].
pub const GET_AUTH_SESSION_TICKET: &str = "get_auth_session_ticket";
/// Operation name of [`EncryptedAppTicket`].
pub const GET_ENCRYPTED_APP_TICKET: &str = "get_encrypted_app_ticket";

/// Capacity of the auth session ticket buffer.
pub const AUTH_TICKET_CAPACITY: usize = 2048;
/// Capacity of the encrypted app ticket buffer.
pub const APP_TICKET_CAPACITY: usize = 4096;

fn unexpected(operation: &'static str, notification: &Notification) -> BridgeError {
    warn!(operation, ?notification, "completion payload does not match the request");
    BridgeError::UnexpectedNotification { operation }
}

/// Current number of players online.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerCount;

impl AwaitedStep for PlayerCount {
    type Output = i32;

    fn channel(&self) -> Channel {
        Channel::ApiCall
    }

    fn issue(&mut self, ctx: &TaskContext) -> Result<CompletionHandle, BridgeError> {
        Ok(ctx.platform.request_current_player_count())
    }

    fn complete(self: Box<Self>, _ctx: &TaskContext, wake: Wake) -> Result<i32, BridgeError> {
        match wake.notification {
            Notification::CallCompleted { io_failure: true, .. } => Err(BridgeError::io(
                GET_NUMBER_OF_PLAYERS,
                "platform api transport failure",
            )),
            Notification::CallCompleted {
                payload: CallPayload::PlayerCount { success, players },
                ..
            } => {
                if success {
                    Ok(players)
                } else {
                    Err(BridgeError::ResultFetch {
                        operation: GET_NUMBER_OF_PLAYERS,
                        reason: "backend did not report a player count".into(),
                    })
                }
            }
            other => Err(unexpected(GET_NUMBER_OF_PLAYERS, &other)),
        }
    }
}

/// An auth session ticket and the handle it was issued with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTicket {
    /// Ticket bytes, trimmed to the reported size.
    pub ticket: Vec<u8>,
    /// Handle used to cancel the ticket later.
    pub handle: CompletionHandle,
}

/// Request an auth session ticket and wait for the backend's verdict.
///
/// The ticket bytes are captured when the request is issued; the completion
/// only says whether they are valid.
#[derive(Debug, Clone, Default)]
pub struct AuthSessionTicket {
    ticket: Vec<u8>,
}

impl AwaitedStep for AuthSessionTicket {
    type Output = AuthTicket;

    fn channel(&self) -> Channel {
        Channel::AuthTicket
    }

    fn issue(&mut self, ctx: &TaskContext) -> Result<CompletionHandle, BridgeError> {
        let mut buffer = vec![0u8; AUTH_TICKET_CAPACITY];
        let (handle, len) = ctx
            .platform
            .get_auth_session_ticket(&mut buffer)
            .ok_or_else(|| BridgeError::rejected(GET_AUTH_SESSION_TICKET, "no ticket was issued"))?;
        buffer.truncate(len.min(AUTH_TICKET_CAPACITY));
        self.ticket = buffer;
        Ok(handle)
    }

    fn complete(self: Box<Self>, _ctx: &TaskContext, wake: Wake) -> Result<AuthTicket, BridgeError> {
        match wake.notification {
            Notification::AuthSessionTicket { handle, result } if result.is_ok() => Ok(AuthTicket {
                ticket: self.ticket,
                handle,
            }),
            Notification::AuthSessionTicket { result, .. } => Err(BridgeError::PlatformResult {
                operation: GET_AUTH_SESSION_TICKET,
                code: result,
            }),
            other => Err(unexpected(GET_AUTH_SESSION_TICKET, &other)),
        }
    }
}

/// Request an encrypted app ticket embedding caller data.
#[derive(Debug, Clone)]
pub struct EncryptedAppTicket {
    user_data: Vec<u8>,
}

impl EncryptedAppTicket {
    /// Embed `user_data` in the ticket.
    pub fn new(user_data: impl Into<Vec<u8>>) -> Self {
        Self {
            user_data: user_data.into(),
        }
    }
}

impl AwaitedStep for EncryptedAppTicket {
    type Output = Vec<u8>;

    fn channel(&self) -> Channel {
        Channel::ApiCall
    }

    fn issue(&mut self, ctx: &TaskContext) -> Result<CompletionHandle, BridgeError> {
        Ok(ctx.platform.request_encrypted_app_ticket(&self.user_data))
    }

    fn complete(self: Box<Self>, ctx: &TaskContext, wake: Wake) -> Result<Vec<u8>, BridgeError> {
        match wake.notification {
            Notification::CallCompleted { io_failure: true, .. } => Err(BridgeError::io(
                GET_ENCRYPTED_APP_TICKET,
                "platform api transport failure",
            )),
            Notification::CallCompleted {
                payload: CallPayload::EncryptedAppTicket { result },
                ..
            } => {
                if !result.is_ok() {
                    return Err(BridgeError::PlatformResult {
                        operation: GET_ENCRYPTED_APP_TICKET,
                        code: result,
                    });
                }
                let mut buffer = vec![0u8; APP_TICKET_CAPACITY];
                let len = ctx
                    .platform
                    .get_encrypted_app_ticket(&mut buffer)
                    .ok_or_else(|| BridgeError::ResultFetch {
                        operation: GET_ENCRYPTED_APP_TICKET,
                        reason: "ticket could not be copied".into(),
                    })?;
                buffer.truncate(len.min(APP_TICKET_CAPACITY));
                Ok(buffer)
            }
            other => Err(unexpected(GET_ENCRYPTED_APP_TICKET, &other)),
        }
    }
}
