// Session module - Call sessions, lifecycle and registry
pub mod registry;
pub mod session;
pub mod state;

pub use registry::SessionRegistry;
pub use session::{CallDirection, HoldOutcome, RemoteIdentity, Session, SessionId};
pub use state::{CallState, ConnectionState};
