//! Routes frames between the connection and the handlers that own each code
//!
//! Handlers work in both directions: `assemble` turns a local [`Outbound`]
//! into a frame body, `process` consumes an inbound body. A handler may own
//! several codes; each code has at most one owner.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::protocol::{Frame, Outbound, ProtocolError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("a handler for {0:?} is already registered")]
    DuplicateHandler(String),
}

/// One protocol role (remote peer, move ack, timer sync, ...)
pub trait FrameHandler: Send + Sync {
    /// Produce a body for `message`, or `None` if this side does not send it.
    fn assemble(&self, _message: &Outbound) -> Option<String> {
        None
    }

    /// Consume an inbound frame for one of this handler's codes.
    fn process(&self, _code: &str, _body: &str) -> Result<(), ProtocolError> {
        Ok(())
    }
}

/// What happened to an inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Handled,
    /// No handler owns the code
    Unrouted,
    /// The owning handler rejected the body
    Rejected(ProtocolError),
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<String, Arc<dyn FrameHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `code` to `handler`. A code can only be bound once.
    pub fn register_handler(
        &self,
        code: &str,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<(), DispatchError> {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(code) {
            return Err(DispatchError::DuplicateHandler(code.to_string()));
        }
        handlers.insert(code.to_string(), handler);
        Ok(())
    }

    pub fn is_registered(&self, code: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(code)
    }

    fn handler(&self, code: &str) -> Option<Arc<dyn FrameHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned()
    }

    /// Build the frame for `message`, if its code's handler produces one on
    /// this side of the connection.
    pub fn assemble(&self, message: &Outbound) -> Option<Frame> {
        let code = message.code();
        let body = self.handler(code)?.assemble(message)?;
        match Frame::new(code, body) {
            Ok(frame) => Some(frame),
            Err(err) => {
                tracing::warn!(%err, "dropping unframeable outbound message");
                None
            }
        }
    }

    /// Route raw `<code>\n<body>` text.
    pub fn dispatch(&self, raw: &str) -> Dispatched {
        let frame = Frame::parse(raw);
        self.dispatch_frame(&frame)
    }

    pub fn dispatch_frame(&self, frame: &Frame) -> Dispatched {
        // The lock is released before the handler runs.
        let Some(handler) = self.handler(frame.code()) else {
            tracing::trace!(code = frame.code(), "no handler for inbound frame");
            return Dispatched::Unrouted;
        };
        match handler.process(frame.code(), frame.body()) {
            Ok(()) => Dispatched::Handled,
            Err(err) => {
                tracing::debug!(code = frame.code(), %err, "inbound frame rejected");
                Dispatched::Rejected(err)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut codes: Vec<&String> = handlers.keys().collect();
        codes.sort();
        f.debug_struct("Dispatcher").field("codes", &codes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_mark_body, MARK_CODE, QUIT_CODE};
    use crate::types::Coordinate;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
    }

    impl FrameHandler for Recorder {
        fn assemble(&self, message: &Outbound) -> Option<String> {
            match message {
                Outbound::Mark(_) | Outbound::Quit => Some(message.body()),
                _ => None,
            }
        }

        fn process(&self, code: &str, body: &str) -> Result<(), ProtocolError> {
            if code == MARK_CODE {
                parse_mark_body(body)?;
            }
            self.seen.lock().unwrap().push((code.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let d = Dispatcher::new();
        let r = Arc::new(Recorder::default());
        d.register_handler(MARK_CODE, r.clone()).unwrap();
        assert_eq!(
            d.register_handler(MARK_CODE, r),
            Err(DispatchError::DuplicateHandler(MARK_CODE.to_string()))
        );
    }

    #[test]
    fn test_routes_by_code() {
        let d = Dispatcher::new();
        let r = Arc::new(Recorder::default());
        d.register_handler(MARK_CODE, r.clone()).unwrap();
        d.register_handler(QUIT_CODE, r.clone()).unwrap();

        assert_eq!(d.dispatch("mark\n4,5"), Dispatched::Handled);
        assert_eq!(d.dispatch("quit\n"), Dispatched::Handled);
        assert_eq!(d.dispatch("bogus\nxyz"), Dispatched::Unrouted);
        assert!(matches!(d.dispatch("mark\nnope"), Dispatched::Rejected(_)));

        let seen = r.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("mark".to_string(), "4,5".to_string()));
        assert_eq!(seen[1], ("quit".to_string(), String::new()));
    }

    #[test]
    fn test_assemble_only_for_owned_codes() {
        let d = Dispatcher::new();
        d.register_handler(MARK_CODE, Arc::new(Recorder::default()))
            .unwrap();

        let frame = d.assemble(&Outbound::Mark(Coordinate::new(1, 2))).unwrap();
        assert_eq!(frame.to_text(), "mark\n1,2");
        assert!(d.assemble(&Outbound::Quit).is_none());
        assert!(d.assemble(&Outbound::TimePassed).is_none());
    }
}
