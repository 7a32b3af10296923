//! Frame handlers for the three sub-protocols
//!
//! Each handler plays one side of its sub-protocol: on the host it mostly
//! assembles, on the client it mostly processes. Inbound frames become
//! [`SessionCommand`]s in the owning session's mailbox; handlers never touch
//! game state directly.
//!
//! Handlers hold a weak mailbox sender. The session owns the connection,
//! which owns the dispatcher, which owns the handlers, and a strong sender
//! would keep the mailbox open forever.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::adapter::protocol::{
    format_mark_body, format_time_span, parse_mark_body, parse_time_span, MARK_CODE,
    MARK_MADE_ACK_CODE, QUIT_CODE, TIME_CODE, TIME_PASSED_CODE,
};
use crate::adapter::{DispatchError, Dispatcher, FrameHandler, MoveAck, Outbound, ProtocolError};
use crate::core::{MirroredClock, TimerEvent};
use crate::session::SessionCommand;

/// Which end of the link a handler serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Host,
    Client,
}

type Mailbox = mpsc::WeakUnboundedSender<SessionCommand>;

fn post(mailbox: &Mailbox, command: SessionCommand) {
    match mailbox.upgrade() {
        Some(tx) => {
            let _ = tx.send(command);
        }
        None => tracing::debug!(?command, "session gone, inbound command dropped"),
    }
}

/// `mark` and `quit`, symmetric on both sides
pub struct RemotePeerHandler {
    mailbox: Mailbox,
}

impl RemotePeerHandler {
    pub fn new(mailbox: Mailbox) -> Self {
        Self { mailbox }
    }
}

impl FrameHandler for RemotePeerHandler {
    fn assemble(&self, message: &Outbound) -> Option<String> {
        match message {
            Outbound::Mark(at) => Some(format_mark_body(*at)),
            Outbound::Quit => Some(String::new()),
            _ => None,
        }
    }

    fn process(&self, code: &str, body: &str) -> Result<(), ProtocolError> {
        match code {
            MARK_CODE => {
                let at = parse_mark_body(body)?;
                post(&self.mailbox, SessionCommand::RemoteMark(at));
            }
            QUIT_CODE => post(&self.mailbox, SessionCommand::PeerQuit),
            _ => {}
        }
        Ok(())
    }
}

/// `mark_made_ack`: the host sends, the client applies
pub struct MoveAckHandler {
    side: Side,
    mailbox: Mailbox,
}

impl MoveAckHandler {
    pub fn new(side: Side, mailbox: Mailbox) -> Self {
        Self { side, mailbox }
    }
}

impl FrameHandler for MoveAckHandler {
    fn assemble(&self, message: &Outbound) -> Option<String> {
        match (self.side, message) {
            (Side::Host, Outbound::MarkMadeAck(ack)) => Some(ack.to_string()),
            _ => None,
        }
    }

    fn process(&self, _code: &str, body: &str) -> Result<(), ProtocolError> {
        if self.side == Side::Host {
            tracing::debug!(body, "host ignores acknowledgments");
            return Ok(());
        }
        let ack: MoveAck = body.parse()?;
        post(&self.mailbox, SessionCommand::Ack(ack));
        Ok(())
    }
}

/// `time` and `time_passed`
///
/// On the client this owns the mirrored clock and publishes its remaining
/// time. On the host it only formats what the host timer reports.
pub struct TimerSyncHandler {
    side: Side,
    mailbox: Mailbox,
    clock: Mutex<MirroredClock>,
    time_left_tx: watch::Sender<Duration>,
}

impl TimerSyncHandler {
    pub fn new(side: Side, move_time_secs: u32, mailbox: Mailbox) -> Self {
        let clock = MirroredClock::new(move_time_secs);
        let (time_left_tx, _) = watch::channel(clock.time_left());
        Self {
            side,
            mailbox,
            clock: Mutex::new(clock),
            time_left_tx,
        }
    }

    pub fn time_left(&self) -> Duration {
        *self.time_left_tx.borrow()
    }

    /// Read-only view of the mirrored remaining time
    pub fn subscribe(&self) -> watch::Receiver<Duration> {
        self.time_left_tx.subscribe()
    }

    /// Reset the mirror to the full budget after a confirmed move.
    pub fn restart(&self) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        clock.restart();
        self.time_left_tx.send_replace(clock.time_left());
    }

    fn mirror(&self, apply: impl FnOnce(&mut MirroredClock) -> TimerEvent) {
        let event = {
            let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
            let event = apply(&mut clock);
            self.time_left_tx.send_replace(clock.time_left());
            event
        };
        post(&self.mailbox, SessionCommand::Timer { epoch: 0, event });
    }
}

impl FrameHandler for TimerSyncHandler {
    fn assemble(&self, message: &Outbound) -> Option<String> {
        match (self.side, message) {
            (Side::Host, Outbound::Time(left)) => Some(format_time_span(*left)),
            (Side::Host, Outbound::TimePassed) => Some(String::new()),
            _ => None,
        }
    }

    fn process(&self, code: &str, body: &str) -> Result<(), ProtocolError> {
        if self.side == Side::Host {
            return Ok(());
        }
        match code {
            TIME_CODE => {
                let remaining = parse_time_span(body)?;
                self.mirror(|clock| clock.apply_sync(remaining));
            }
            TIME_PASSED_CODE => self.mirror(MirroredClock::apply_time_passed),
            _ => {}
        }
        Ok(())
    }
}

/// Handlers registered for one side of a networked session
pub struct ProtocolHandlers {
    pub remote_peer: Arc<RemotePeerHandler>,
    pub move_ack: Arc<MoveAckHandler>,
    pub timer_sync: Arc<TimerSyncHandler>,
}

impl ProtocolHandlers {
    pub fn new(side: Side, move_time_secs: u32, mailbox: Mailbox) -> Self {
        Self {
            remote_peer: Arc::new(RemotePeerHandler::new(mailbox.clone())),
            move_ack: Arc::new(MoveAckHandler::new(side, mailbox.clone())),
            timer_sync: Arc::new(TimerSyncHandler::new(side, move_time_secs, mailbox)),
        }
    }

    /// Bind every code to its handler.
    pub fn register(&self, dispatcher: &Dispatcher) -> Result<(), DispatchError> {
        dispatcher.register_handler(MARK_CODE, self.remote_peer.clone())?;
        dispatcher.register_handler(QUIT_CODE, self.remote_peer.clone())?;
        dispatcher.register_handler(MARK_MADE_ACK_CODE, self.move_ack.clone())?;
        dispatcher.register_handler(TIME_CODE, self.timer_sync.clone())?;
        dispatcher.register_handler(TIME_PASSED_CODE, self.timer_sync.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Dispatched;
    use crate::types::{Coordinate, Symbol};

    type Setup = (
        Dispatcher,
        ProtocolHandlers,
        mpsc::UnboundedSender<SessionCommand>,
        mpsc::UnboundedReceiver<SessionCommand>,
    );

    fn setup(side: Side) -> Setup {
        let (tx, rx) = mpsc::unbounded_channel();
        let handlers = ProtocolHandlers::new(side, 10, tx.downgrade());
        let dispatcher = Dispatcher::new();
        handlers.register(&dispatcher).unwrap();
        (dispatcher, handlers, tx, rx)
    }

    #[test]
    fn test_mirrored_time_sync_ticks_once() {
        let (dispatcher, handlers, _tx, mut rx) = setup(Side::Client);

        assert_eq!(dispatcher.dispatch("time\n00:00:07"), Dispatched::Handled);
        assert_eq!(handlers.timer_sync.time_left(), Duration::from_secs(7));
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionCommand::Timer {
                event: TimerEvent::Tick(d),
                ..
            }) if d == Duration::from_secs(7)
        ));
        assert!(rx.try_recv().is_err(), "exactly one tick");
    }

    #[test]
    fn test_time_passed_resets_mirror() {
        let (dispatcher, handlers, _tx, mut rx) = setup(Side::Client);
        dispatcher.dispatch("time\n00:00:03");
        dispatcher.dispatch("time_passed\n");
        assert_eq!(handlers.timer_sync.time_left(), Duration::from_secs(10));
        rx.try_recv().unwrap();
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionCommand::Timer {
                event: TimerEvent::Expired,
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_time_is_dropped() {
        let (dispatcher, handlers, _tx, mut rx) = setup(Side::Client);
        assert!(matches!(dispatcher.dispatch("time\nsoon"), Dispatched::Rejected(_)));
        assert_eq!(handlers.timer_sync.time_left(), Duration::from_secs(10));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_client_applies_acks() {
        let (dispatcher, _handlers, _tx, mut rx) = setup(Side::Client);
        dispatcher.dispatch("mark_made_ack\n3 7 n");
        match rx.try_recv() {
            Ok(SessionCommand::Ack(ack)) => {
                assert_eq!(ack, MoveAck::new(Coordinate::new(3, 7), Symbol::Nought))
            }
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn test_host_assembles_but_does_not_process_sync() {
        let (dispatcher, _handlers, _tx, mut rx) = setup(Side::Host);
        let frame = dispatcher
            .assemble(&Outbound::Time(Duration::from_secs(9)))
            .unwrap();
        assert_eq!(frame.to_text(), "time\n00:00:09");
        let ack = MoveAck::new(Coordinate::new(3, 7), Symbol::Cross);
        assert_eq!(
            dispatcher.assemble(&Outbound::MarkMadeAck(ack)).unwrap().to_text(),
            "mark_made_ack\n3 7 c"
        );

        dispatcher.dispatch("time\n00:00:01");
        dispatcher.dispatch("mark_made_ack\n3 7 c");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_client_never_assembles_host_frames() {
        let (dispatcher, _handlers, _tx, _rx) = setup(Side::Client);
        assert!(dispatcher.assemble(&Outbound::TimePassed).is_none());
        let ack = MoveAck::new(Coordinate::new(1, 1), Symbol::Nought);
        assert!(dispatcher.assemble(&Outbound::MarkMadeAck(ack)).is_none());
        assert!(dispatcher.assemble(&Outbound::Mark(Coordinate::new(1, 1))).is_some());
    }

    #[test]
    fn test_remote_peer_posts_commands() {
        let (dispatcher, _handlers, _tx, mut rx) = setup(Side::Host);
        dispatcher.dispatch("mark\n5,6");
        dispatcher.dispatch("quit\n");
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionCommand::RemoteMark(c)) if c == Coordinate::new(5, 6)
        ));
        assert!(matches!(rx.try_recv(), Ok(SessionCommand::PeerQuit)));
    }

    #[test]
    fn test_dropped_session_does_not_panic() {
        let (dispatcher, _handlers, tx, rx) = setup(Side::Client);
        drop(tx);
        drop(rx);
        assert_eq!(dispatcher.dispatch("mark\n1,1"), Dispatched::Handled);
    }
}
