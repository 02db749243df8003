//! Connection controller
//!
//! Holds the page's one and only connection and applies lifecycle events to
//! the status and message surfaces. All state changes happen on the task that
//! owns the controller.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use url::Url;

use super::{ConnectionError, ConnectionResult, SocketEvent, SocketEvents, SocketFactory, SocketHandle};
use crate::page::PageLocation;
use crate::ui::{Alert, Command, Element, MessageDisplay, StatusIndicator};

/// How long to wait for the socket to report closed after a shutdown request
const CLOSE_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Errors raised when a command cannot be sent
///
/// Nothing is queued: a command clicked before the connection is open is
/// rejected and never sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("No websocket connection has been opened")]
    NoConnection,

    #[error("Cannot send '{command}': connection is {state}")]
    NotOpen {
        command: String,
        state: ConnectionState,
    },

    #[error("Websocket connection has gone away")]
    Disconnected,
}

/// Lifecycle phase of the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// The single websocket session
#[derive(Debug)]
struct Connection {
    url: Url,
    state: ConnectionState,
    handle: SocketHandle,
}

/// Wires one connection to the status and message surfaces
pub struct ConnectionController<S, M> {
    status: StatusIndicator<S>,
    messages: MessageDisplay<M>,
    connection: Option<Connection>,
}

impl<S: Element, M: Element> ConnectionController<S, M> {
    pub fn new(status: StatusIndicator<S>, messages: MessageDisplay<M>) -> Self {
        Self {
            status,
            messages,
            connection: None,
        }
    }

    /// Open the connection for a page
    ///
    /// Can only succeed once. On failure no connection exists and the caller
    /// is expected to tell the user; there is no retry.
    pub fn connect<F>(&mut self, location: &PageLocation, factory: &F) -> ConnectionResult<SocketEvents>
    where
        F: SocketFactory + ?Sized,
    {
        if self.connection.is_some() {
            return Err(ConnectionError::AlreadyConnected);
        }

        let url = location.websocket_url()?;
        info!("Opening websocket connection to {}", url);

        let (handle, events) = factory.open(&url)?;
        self.connection = Some(Connection {
            url,
            state: ConnectionState::Connecting,
            handle,
        });

        Ok(events)
    }

    /// Page-ready entry point: connect to the socket behind `page`
    ///
    /// Any `ConnectionError` is shown through `alert` and returned; the
    /// controller is then left without a connection.
    pub fn open_page<F, A>(&mut self, page: &str, factory: &F, alert: &mut A) -> ConnectionResult<SocketEvents>
    where
        F: SocketFactory + ?Sized,
        A: Alert + ?Sized,
    {
        let result = PageLocation::parse(page).and_then(|location| self.connect(&location, factory));

        if let Err(e) = &result {
            warn!("Could not open websocket connection for {}: {}", page, e);
            alert.alert(&e.to_string());
        }

        result
    }

    /// Current phase, `None` before `connect` succeeded
    pub fn state(&self) -> Option<ConnectionState> {
        self.connection.as_ref().map(|c| c.state)
    }

    /// Target of the connection
    pub fn url(&self) -> Option<&Url> {
        self.connection.as_ref().map(|c| &c.url)
    }

    #[cfg(test)]
    pub fn status(&self) -> &StatusIndicator<S> {
        &self.status
    }

    #[cfg(test)]
    pub fn messages(&self) -> &MessageDisplay<M> {
        &self.messages
    }

    /// Apply a socket lifecycle event
    pub fn handle_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Opened => self.on_open(),
            SocketEvent::Message(text) => self.on_message(&text),
            SocketEvent::Closed => self.on_close(),
        }
    }

    fn on_open(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            warn!("Open event without a connection");
            return;
        };

        match connection.state {
            ConnectionState::Connecting => {
                connection.state = ConnectionState::Open;
                info!("Connection to {} opened", connection.url);
                self.status.show_open();
            }
            ConnectionState::Open => debug!("Duplicate open event ignored"),
            ConnectionState::Closed => debug!("Open event after close ignored"),
        }
    }

    fn on_message(&mut self, text: &str) {
        if self.state() == Some(ConnectionState::Closed) {
            debug!("Message after close ignored");
            return;
        }
        self.messages.show(text);
    }

    fn on_close(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            warn!("Close event without a connection");
            return;
        };

        if connection.state != ConnectionState::Closed {
            connection.state = ConnectionState::Closed;
            info!("Connection to {} closed", connection.url);
            self.status.show_closed();
        }
    }

    /// Handle a click on the element with this id
    pub fn click(&self, element_id: &str) -> Result<Command, SendError> {
        self.send(Command::from_element_id(element_id))
    }

    /// Send a command as one text frame
    pub fn send(&self, command: Command) -> Result<Command, SendError> {
        let connection = self.connection.as_ref().ok_or(SendError::NoConnection)?;

        if connection.state != ConnectionState::Open {
            return Err(SendError::NotOpen {
                command: command.into_string(),
                state: connection.state,
            });
        }

        if !connection.handle.send(command.as_str().to_string()) {
            return Err(SendError::Disconnected);
        }

        debug!("Sent command '{}'", command);
        Ok(command)
    }

    /// Ask the socket to close
    pub fn close(&self) {
        if let Some(connection) = &self.connection {
            connection.handle.close();
        }
    }

    /// Dispatch socket events and clicks until the clicks end or shutdown fires
    ///
    /// Failed sends are logged and do not stop the loop. On shutdown the socket
    /// is closed and its final events are applied before returning.
    pub async fn run(
        mut self,
        mut events: SocketEvents,
        mut clicks: mpsc::Receiver<String>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let mut events_open = true;

        loop {
            tokio::select! {
                // Lifecycle events are applied before any pending click
                biased;

                event = events.recv(), if events_open => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            events_open = false;
                            self.on_close();
                        }
                    }
                }
                click = clicks.recv() => {
                    match click {
                        Some(element_id) => {
                            if let Err(e) = self.click(&element_id) {
                                warn!("Click on {} not sent: {}", element_id, e);
                            }
                        }
                        None => {
                            debug!("Click source closed");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutdown requested, closing connection");
                    self.close();
                    if events_open {
                        self.drain(&mut events).await;
                    }
                    break;
                }
            }
        }

        self
    }

    /// Apply remaining events until the socket reports closed
    async fn drain(&mut self, events: &mut SocketEvents) {
        let drained = tokio::time::timeout(CLOSE_GRACE_PERIOD, async {
            while let Some(event) = events.recv().await {
                let closed = event == SocketEvent::Closed;
                self.handle_event(event);
                if closed {
                    break;
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Socket did not close within {:?}", CLOSE_GRACE_PERIOD);
        }
    }
}
