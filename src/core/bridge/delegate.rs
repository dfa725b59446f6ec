use crate::core::session::Session;
use std::time::Duration;

/// Why the transport went down, as reported to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The application called `disconnect`
    Requested,
    /// The transport was lost and automatic reconnection gave up
    ReconnectExhausted { attempts: u32, error: String },
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::Requested => write!(f, "disconnect requested"),
            DisconnectReason::ReconnectExhausted { attempts, error } => {
                write!(f, "transport lost ({}), {} reconnection attempt(s) failed", error, attempts)
            }
        }
    }
}

/// DTMF tone received on a session
#[derive(Debug, Clone)]
pub struct DtmfReceived {
    pub session: Session,
    pub tone: char,
    pub duration: Duration,
}

/// Out-of-dialog message received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    /// Raw payload, passed through untouched
    pub body: String,
}

type Handler<T> = Box<dyn Fn(&T) + Send + Sync>;
type Notify = Box<dyn Fn() + Send + Sync>;

/// Application callbacks, one optional slot per event kind.
///
/// Unset slots are skipped silently.
#[derive(Default)]
pub struct ClientDelegate {
    server_connect: Option<Notify>,
    server_disconnect: Option<Handler<DisconnectReason>>,
    registered: Option<Notify>,
    unregistered: Option<Notify>,
    registration_failed: Option<Box<dyn Fn(&str) + Send + Sync>>,
    call_created: Option<Handler<Session>>,
    call_received: Option<Handler<Session>>,
    call_answered: Option<Handler<Session>>,
    call_hangup: Option<Handler<Session>>,
    call_hold: Option<Handler<Session>>,
    call_dtmf_received: Option<Handler<DtmfReceived>>,
    message_received: Option<Handler<InboundMessage>>,
}

impl ClientDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_server_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.server_connect = Some(Box::new(f));
        self
    }

    pub fn on_server_disconnect(mut self, f: impl Fn(&DisconnectReason) + Send + Sync + 'static) -> Self {
        self.server_disconnect = Some(Box::new(f));
        self
    }

    pub fn on_registered(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.registered = Some(Box::new(f));
        self
    }

    pub fn on_unregistered(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.unregistered = Some(Box::new(f));
        self
    }

    pub fn on_registration_failed(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.registration_failed = Some(Box::new(f));
        self
    }

    /// Outbound INVITE sent
    pub fn on_call_created(mut self, f: impl Fn(&Session) + Send + Sync + 'static) -> Self {
        self.call_created = Some(Box::new(f));
        self
    }

    /// Incoming invitation tracked
    pub fn on_call_received(mut self, f: impl Fn(&Session) + Send + Sync + 'static) -> Self {
        self.call_received = Some(Box::new(f));
        self
    }

    pub fn on_call_answered(mut self, f: impl Fn(&Session) + Send + Sync + 'static) -> Self {
        self.call_answered = Some(Box::new(f));
        self
    }

    /// Session terminated; the snapshot is in state `Terminated`
    pub fn on_call_hangup(mut self, f: impl Fn(&Session) + Send + Sync + 'static) -> Self {
        self.call_hangup = Some(Box::new(f));
        self
    }

    pub fn on_call_hold(mut self, f: impl Fn(&Session) + Send + Sync + 'static) -> Self {
        self.call_hold = Some(Box::new(f));
        self
    }

    pub fn on_call_dtmf_received(mut self, f: impl Fn(&DtmfReceived) + Send + Sync + 'static) -> Self {
        self.call_dtmf_received = Some(Box::new(f));
        self
    }

    pub fn on_message_received(mut self, f: impl Fn(&InboundMessage) + Send + Sync + 'static) -> Self {
        self.message_received = Some(Box::new(f));
        self
    }

    pub(crate) fn server_connect(&self) {
        if let Some(f) = &self.server_connect {
            f();
        }
    }

    pub(crate) fn server_disconnect(&self, reason: &DisconnectReason) {
        if let Some(f) = &self.server_disconnect {
            f(reason);
        }
    }

    pub(crate) fn registered(&self) {
        if let Some(f) = &self.registered {
            f();
        }
    }

    pub(crate) fn unregistered(&self) {
        if let Some(f) = &self.unregistered {
            f();
        }
    }

    pub(crate) fn registration_failed(&self, reason: &str) {
        if let Some(f) = &self.registration_failed {
            f(reason);
        }
    }

    pub(crate) fn call_created(&self, session: &Session) {
        if let Some(f) = &self.call_created {
            f(session);
        }
    }

    pub(crate) fn call_received(&self, session: &Session) {
        if let Some(f) = &self.call_received {
            f(session);
        }
    }

    pub(crate) fn call_answered(&self, session: &Session) {
        if let Some(f) = &self.call_answered {
            f(session);
        }
    }

    pub(crate) fn call_hangup(&self, session: &Session) {
        if let Some(f) = &self.call_hangup {
            f(session);
        }
    }

    pub(crate) fn call_hold(&self, session: &Session) {
        if let Some(f) = &self.call_hold {
            f(session);
        }
    }

    pub(crate) fn call_dtmf_received(&self, event: &DtmfReceived) {
        if let Some(f) = &self.call_dtmf_received {
            f(event);
        }
    }

    pub(crate) fn message_received(&self, message: &InboundMessage) {
        if let Some(f) = &self.message_received {
            f(message);
        }
    }
}

impl std::fmt::Debug for ClientDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientDelegate")
            .field("server_connect", &self.server_connect.is_some())
            .field("server_disconnect", &self.server_disconnect.is_some())
            .field("registered", &self.registered.is_some())
            .field("call_received", &self.call_received.is_some())
            .field("call_hangup", &self.call_hangup.is_some())
            .finish_non_exhaustive()
    }
}
