//! The single X server connection and its derived facts.
//!
//! Exactly one [`Display`] exists per process. It is opened once before the
//! first lifecycle cycle, survives any number of in-place restarts, and is
//! consumed exactly once by [`Display::close`] — the at-most-once close
//! contract is enforced by ownership rather than a runtime check.

use std::io;

use tracing::{debug, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::shape;
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, Colormap, ConfigureWindowAux, ConnectionExt as _, EventMask,
    StackMode, Visualid, Window,
};
use x11rb::protocol::{Event, ErrorKind};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use thiserror::Error;

use crate::control::ControlAtoms;
use crate::signals;
use crate::state::RunState;

const DISPLAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::display");

/// Event classes the window manager subscribes to on the root window.
fn root_event_mask() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::PROPERTY_CHANGE
        | EventMask::COLOR_MAP_CHANGE
        | EventMask::BUTTON_PRESS
        | EventMask::BUTTON_RELEASE
}

/// Errors surfaced by the connection manager.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// The connection could not be established.
    #[error("could not open display {target}: {source}")]
    Connect {
        /// The attempted target, or "unspecified" when `$DISPLAY` was used.
        target: String,
        /// Underlying connect error.
        #[source]
        source: ConnectError,
    },
    /// The established connection failed.
    #[error("display connection failed: {0}")]
    Connection(#[from] ConnectionError),
    /// A request was rejected by the server.
    #[error("display request failed: {0}")]
    Reply(#[from] ReplyError),
    /// Allocating a resource identifier failed.
    #[error("id allocation failed: {0}")]
    IdAllocation(#[from] ReplyOrIdError),
    /// Another client already owns the root window's redirect subscription.
    #[error("another window manager already owns the root window")]
    AlreadyManaged,
    /// Installing the termination-signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Immutable facts derived from the connection at open time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenFacts {
    /// Index of the default screen.
    pub screen: usize,
    /// Root window of the default screen.
    pub root: Window,
    /// Screen width in pixels.
    pub width: u16,
    /// Screen height in pixels.
    pub height: u16,
    /// Color depth of the root window.
    pub depth: u8,
    /// Default visual of the root window.
    pub visual: Visualid,
    /// Default colormap of the screen.
    pub colormap: Colormap,
    /// Number of colormaps the screen can have installed at once.
    pub colormap_capacity: u16,
    /// Whether the server offers the SHAPE extension.
    pub have_shape: bool,
}

/// Opaque per-window data keys allocated for the client and frame
/// subsystems. Allocation happens here; the keys are used elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextKeys {
    /// Key under which client state is attached to windows.
    pub client: u32,
    /// Key under which frame state is attached to windows.
    pub frame: u32,
}

/// The surface of the live connection that the orchestrator and the event
/// loop depend on. Implemented by [`Display`] and by scripted stand-ins in
/// tests.
pub trait DisplayServer {
    /// Facts derived at open time.
    fn facts(&self) -> &ScreenFacts;
    /// Returns the next queued event, or `None` when the queue is empty.
    fn poll_event(&self) -> Result<Option<Event>, DisplayError>;
    /// Flushes buffered outgoing requests.
    fn flush(&self) -> Result<(), DisplayError>;
    /// Reasserts the current stacking order of the root window's children.
    fn restack_children(&self) -> Result<(), DisplayError>;
}

/// The process's connection to the X server.
pub struct Display {
    conn: RustConnection,
    facts: ScreenFacts,
    contexts: Option<ContextKeys>,
}

impl Display {
    /// Opens the connection and derives the screen facts.
    ///
    /// Optional protocol extensions are probed here; absence is recorded as
    /// a capability flag, not an error. Failure to connect is fatal for the
    /// caller — the server's availability is an environmental precondition.
    pub fn open(name: Option<&str>) -> Result<Self, DisplayError> {
        let (conn, screen) = x11rb::connect(name).map_err(|source| DisplayError::Connect {
            target: target_label(name),
            source,
        })?;
        let root_screen = &conn.setup().roots[screen];
        let have_shape = conn
            .extension_information(shape::X11_EXTENSION_NAME)?
            .is_some();
        let facts = ScreenFacts {
            screen,
            root: root_screen.root,
            width: root_screen.width_in_pixels,
            height: root_screen.height_in_pixels,
            depth: root_screen.root_depth,
            visual: root_screen.root_visual,
            colormap: root_screen.default_colormap,
            colormap_capacity: root_screen.max_installed_maps,
            have_shape,
        };
        debug!(
            target: DISPLAY_TARGET,
            screen,
            root = facts.root,
            width = facts.width,
            height = facts.height,
            depth = facts.depth,
            have_shape,
            "display opened"
        );
        Ok(Self {
            conn,
            facts,
            contexts: None,
        })
    }

    /// Establishes the window-management session on the open connection.
    ///
    /// Interns the control atoms, allocates the per-window context keys,
    /// subscribes the root window to the event classes window management
    /// needs, installs the termination-signal handlers, and finishes with a
    /// round trip so any setup error has surfaced before the first cycle.
    /// The initializing flag is set for the duration of the call.
    pub fn startup_session(&mut self, state: &RunState) -> Result<ControlAtoms, DisplayError> {
        state.begin_initializing();
        let result = self.establish_session(state);
        state.end_initializing();
        result
    }

    fn establish_session(&mut self, state: &RunState) -> Result<ControlAtoms, DisplayError> {
        let atoms = ControlAtoms::intern(&self.conn)?;

        self.contexts = Some(ContextKeys {
            client: self.conn.generate_id()?,
            frame: self.conn.generate_id()?,
        });

        // Checked request: a BadAccess reply here means another window
        // manager already holds the redirect subscription on this root.
        let attributes = ChangeWindowAttributesAux::new().event_mask(root_event_mask());
        self.conn
            .change_window_attributes(self.facts.root, &attributes)?
            .check()
            .map_err(|error| match error {
                ReplyError::X11Error(ref x11) if x11.error_kind == ErrorKind::Access => {
                    DisplayError::AlreadyManaged
                }
                other => DisplayError::Reply(other),
            })?;

        signals::install(&state.exit_flag()).map_err(|source| DisplayError::Signals { source })?;

        self.conn.sync()?;
        debug!(target: DISPLAY_TARGET, "window-management session established");
        Ok(atoms)
    }

    /// Per-window data keys, available once the session is established.
    pub fn contexts(&self) -> Option<ContextKeys> {
        self.contexts
    }

    /// Raw connection handle for subsystem use during startup/shutdown.
    pub fn connection(&self) -> &RustConnection {
        &self.conn
    }

    /// Flushes outgoing traffic and closes the connection.
    ///
    /// Consuming `self` makes a second close unrepresentable.
    pub fn close(self) {
        if let Err(error) = self.conn.flush() {
            warn!(target: DISPLAY_TARGET, %error, "flush on close failed");
        }
        debug!(target: DISPLAY_TARGET, "display closed");
    }
}

impl DisplayServer for Display {
    fn facts(&self) -> &ScreenFacts {
        &self.facts
    }

    fn poll_event(&self) -> Result<Option<Event>, DisplayError> {
        Ok(self.conn.poll_for_event()?)
    }

    fn flush(&self) -> Result<(), DisplayError> {
        Ok(self.conn.flush()?)
    }

    fn restack_children(&self) -> Result<(), DisplayError> {
        let children = self.conn.query_tree(self.facts.root)?.reply()?.children;
        let mut below: Option<Window> = None;
        for &window in &children {
            if let Some(sibling) = below {
                let values = ConfigureWindowAux::new()
                    .sibling(sibling)
                    .stack_mode(StackMode::ABOVE);
                self.conn.configure_window(window, &values)?;
            }
            below = Some(window);
        }
        Ok(())
    }
}

/// Renders the connection target for error reporting.
pub(crate) fn target_label(name: Option<&str>) -> String {
    name.unwrap_or("unspecified").to_owned()
}
