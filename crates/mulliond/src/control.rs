//! Cross-instance control messages.
//!
//! A second invocation of `mulliond` controls a running instance through
//! the X server itself: it opens a transient connection, addresses a
//! zero-payload client message to the root window, and marks it for
//! delivery through the substructure-redirect event class — which only the
//! running window manager subscribes to. No separate control socket is
//! needed; the tradeoff is that control only works while the server is
//! reachable and only affects whichever instance owns the redirect
//! subscription.

use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ClientMessageEvent, ConnectionExt as _, EventMask};

use crate::display::{DisplayError, target_label};

const CONTROL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::control");

/// Well-known atom name carried by restart requests.
pub const RESTART_ATOM_NAME: &str = "_MULLION_RESTART";

/// Well-known atom name carried by exit requests.
pub const EXIT_ATOM_NAME: &str = "_MULLION_EXIT";

/// The two message kinds of the control protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Ask the running instance to restart in place.
    Restart,
    /// Ask the running instance to exit.
    Exit,
}

impl ControlMessage {
    /// The well-known atom name identifying this message kind.
    pub fn atom_name(self) -> &'static str {
        match self {
            Self::Restart => RESTART_ATOM_NAME,
            Self::Exit => EXIT_ATOM_NAME,
        }
    }
}

/// The control atom pair resolved against a live server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlAtoms {
    /// Resolved `_MULLION_RESTART` atom.
    pub restart: Atom,
    /// Resolved `_MULLION_EXIT` atom.
    pub exit: Atom,
}

impl ControlAtoms {
    /// Resolves both control atoms on the given connection.
    pub fn intern(conn: &impl Connection) -> Result<Self, DisplayError> {
        let restart = conn.intern_atom(false, RESTART_ATOM_NAME.as_bytes())?;
        let exit = conn.intern_atom(false, EXIT_ATOM_NAME.as_bytes())?;
        Ok(Self {
            restart: restart.reply()?.atom,
            exit: exit.reply()?.atom,
        })
    }

    /// Maps an incoming client message to a control request, if it carries
    /// one of the well-known identifiers in 32-bit format.
    pub fn classify(&self, message: &ClientMessageEvent) -> Option<ControlMessage> {
        if message.format != 32 {
            return None;
        }
        if message.type_ == self.restart {
            Some(ControlMessage::Restart)
        } else if message.type_ == self.exit {
            Some(ControlMessage::Exit)
        } else {
            None
        }
    }
}

/// Sends a control message to whatever instance manages the root window.
///
/// Opens a transient connection distinct from any running instance's own,
/// delivers the message, and drops the connection. The send is
/// fire-and-forget: with no manager subscribed to the root window the
/// message vanishes at the server.
pub fn send(message: ControlMessage, display_name: Option<&str>) -> Result<(), DisplayError> {
    let (conn, screen) = x11rb::connect(display_name).map_err(|source| DisplayError::Connect {
        target: target_label(display_name),
        source,
    })?;
    let root = conn.setup().roots[screen].root;
    let atom = conn
        .intern_atom(false, message.atom_name().as_bytes())?
        .reply()?
        .atom;

    let event = ClientMessageEvent::new(32, root, atom, [0u32; 5]);
    conn.send_event(false, root, EventMask::SUBSTRUCTURE_REDIRECT, event)?
        .check()?;
    debug!(target: CONTROL_TARGET, kind = ?message, root, "control message sent");
    Ok(())
}
