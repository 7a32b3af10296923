//! Game session actor
//!
//! A session owns everything that can change during a game: the arbiter,
//! the players, the turn clock and (for networked roles) the connection.
//! All of it lives on one tokio task. Everything else talks to that task
//! through its mailbox ([`SessionCommand`]) and listens to its
//! [`SessionEvent`]s, so game state is never touched from two places at once.
//!
//! # Roles
//!
//! | Role | Plays | Authoritative for moves | Clock |
//! |------|-------|-------------------------|-------|
//! | `Local` | both symbols | yes | host timer |
//! | `Host` | Cross | yes | host timer, forwarded as `time` |
//! | `Client` | Nought | no, waits for `mark_made_ack` | mirrored from `time` |

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};

use crate::adapter::{Connection, ConnectionLost, Dispatcher, LostReason, MoveAck, Outbound};
use crate::config::SessionConfig;
use crate::core::{
    Board, GameSnapshot, HostClock, MoveArbiter, MoveOutcome, Player, PlayerId, PlayerKind,
    Prompt, TimerEvent,
};
use crate::handlers::{ProtocolHandlers, Side, TimerSyncHandler};
use crate::host_timer::HostTimer;
use crate::types::{BoardSize, Coordinate, Symbol, WinResult, TIMER_PERIOD_MS};

const CROSS_ID: PlayerId = PlayerId(1);
const NOUGHT_ID: PlayerId = PlayerId(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Local,
    Host,
    Client,
}

impl Role {
    /// The symbol played on this machine, if only one is
    pub fn local_symbol(self) -> Option<Symbol> {
        match self {
            Role::Local => None,
            Role::Host => Some(Symbol::Cross),
            Role::Client => Some(Symbol::Nought),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Local => write!(f, "local"),
            Role::Host => write!(f, "host"),
            Role::Client => write!(f, "client"),
        }
    }
}

/// Mailbox entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// A local human picked a cell
    LocalMove(Coordinate),
    /// A bot decided after being prompted
    BotMove { player: PlayerId, at: Coordinate },
    /// The peer's player marked a cell
    RemoteMark(Coordinate),
    /// The host confirmed a move
    Ack(MoveAck),
    /// Clock report; `epoch` is only checked for the host timer
    Timer { epoch: u64, event: TimerEvent },
    PeerQuit,
    Quit,
}

/// What a session reports to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started {
        role: Role,
        size: BoardSize,
        move_time: Duration,
    },
    /// A local human is on turn
    AwaitingInput(Symbol),
    Marked {
        at: Coordinate,
        symbol: Symbol,
    },
    TurnChanged(Symbol),
    Won(WinResult),
    TimerTick(Duration),
    /// `Symbol` ran out of time
    TimeExpired(Symbol),
    PeerQuit,
    ConnectionLost(LostReason),
    /// Terminal; nothing follows
    Ended,
}

pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// Cloneable handle to a running session
///
/// Reads go through watch channels and may lag commands that are still
/// queued. Dropping every handle ends the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    role: Role,
    mailbox: mpsc::UnboundedSender<SessionCommand>,
    snapshot_rx: watch::Receiver<GameSnapshot>,
    time_left_rx: watch::Receiver<Duration>,
}

impl SessionHandle {
    pub fn role(&self) -> Role {
        self.role
    }

    /// Submit a move for the local human on turn. Returns `false` once the
    /// session has ended.
    pub fn submit_move(&self, at: Coordinate) -> bool {
        self.mailbox.send(SessionCommand::LocalMove(at)).is_ok()
    }

    /// Leave the session, telling the peer if there is one.
    pub fn quit(&self) -> bool {
        self.mailbox.send(SessionCommand::Quit).is_ok()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn is_marked(&self, at: Coordinate) -> bool {
        self.snapshot_rx.borrow().is_marked(at)
    }

    pub fn mark_at(&self, at: Coordinate) -> Option<Symbol> {
        self.snapshot_rx.borrow().mark_at(at)
    }

    pub fn time_left(&self) -> Duration {
        *self.time_left_rx.borrow()
    }

    pub fn is_ended(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Wait until the session task has finished.
    pub async fn ended(&self) {
        self.mailbox.closed().await
    }
}

enum Clock {
    Host(HostTimer),
    Mirror(Arc<TimerSyncHandler>),
}

impl Clock {
    fn host(
        move_time_secs: u32,
        mailbox: mpsc::WeakUnboundedSender<SessionCommand>,
    ) -> (Self, watch::Receiver<Duration>) {
        let clock = HostClock::new(move_time_secs);
        let (time_left_tx, time_left_rx) = watch::channel(clock.move_time());
        let timer = HostTimer::spawn(
            clock,
            Duration::from_millis(TIMER_PERIOD_MS),
            time_left_tx,
            move |epoch, event| match mailbox.upgrade() {
                Some(tx) => tx.send(SessionCommand::Timer { epoch, event }).is_ok(),
                None => false,
            },
        );
        (Clock::Host(timer), time_left_rx)
    }

    fn start(&mut self) {
        match self {
            Clock::Host(timer) => timer.start(),
            Clock::Mirror(sync) => sync.restart(),
        }
    }

    fn restart(&mut self) {
        match self {
            Clock::Host(timer) => timer.restart(),
            Clock::Mirror(sync) => sync.restart(),
        }
    }

    fn stop(&mut self) {
        if let Clock::Host(timer) = self {
            timer.stop();
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        match self {
            Clock::Host(timer) => timer.epoch() == epoch,
            Clock::Mirror(_) => true,
        }
    }
}

enum Origin {
    Local,
    Remote,
}

enum Wake {
    Command(Option<SessionCommand>),
    Lost(Option<ConnectionLost>),
}

pub struct Session {
    role: Role,
    arbiter: MoveArbiter,
    players: [Player; 2],
    clock: Clock,
    connection: Option<Connection>,
    lost_rx: Option<oneshot::Receiver<ConnectionLost>>,
    mailbox: mpsc::UnboundedReceiver<SessionCommand>,
    self_tx: mpsc::WeakUnboundedSender<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshot_tx: watch::Sender<GameSnapshot>,
    version: u64,
    move_time: Duration,
}

impl Session {
    /// Both players on this machine. Neither may be a remote peer.
    pub fn local(
        config: &SessionConfig,
        cross: PlayerKind,
        nought: PlayerKind,
    ) -> anyhow::Result<(SessionHandle, SessionEvents)> {
        anyhow::ensure!(
            !matches!(cross, PlayerKind::RemotePeer) && !matches!(nought, PlayerKind::RemotePeer),
            "a local session cannot have remote players"
        );
        let board = Board::new(config.board_size())?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (clock, time_left_rx) = Clock::host(config.move_time_secs, tx.downgrade());
        let players = [Player::new(CROSS_ID, cross), Player::new(NOUGHT_ID, nought)];
        Self::launch(Role::Local, board, players, clock, None, (tx, rx), time_left_rx)
    }

    /// Host a game over an accepted stream. The local player plays Cross.
    pub fn host(
        config: &SessionConfig,
        stream: TcpStream,
        local: PlayerKind,
    ) -> anyhow::Result<(SessionHandle, SessionEvents)> {
        Self::networked(Role::Host, config, stream, local)
    }

    /// Join a hosted game over a connected stream. The local player plays
    /// Nought.
    pub fn client(
        config: &SessionConfig,
        stream: TcpStream,
        local: PlayerKind,
    ) -> anyhow::Result<(SessionHandle, SessionEvents)> {
        Self::networked(Role::Client, config, stream, local)
    }

    fn networked(
        role: Role,
        config: &SessionConfig,
        stream: TcpStream,
        local: PlayerKind,
    ) -> anyhow::Result<(SessionHandle, SessionEvents)> {
        anyhow::ensure!(
            !matches!(local, PlayerKind::RemotePeer),
            "the local player cannot be a remote peer"
        );
        let board = Board::new(config.board_size())?;
        let (tx, rx) = mpsc::unbounded_channel();

        let side = if role == Role::Host { Side::Host } else { Side::Client };
        let handlers = ProtocolHandlers::new(side, config.move_time_secs, tx.downgrade());
        let dispatcher = Arc::new(Dispatcher::new());
        handlers.register(&dispatcher)?;

        let (clock, time_left_rx) = match side {
            Side::Host => Clock::host(config.move_time_secs, tx.downgrade()),
            Side::Client => {
                let time_left_rx = handlers.timer_sync.subscribe();
                (Clock::Mirror(Arc::clone(&handlers.timer_sync)), time_left_rx)
            }
        };

        let players = match side {
            Side::Host => [Player::new(CROSS_ID, local), Player::remote(NOUGHT_ID)],
            Side::Client => [Player::remote(CROSS_ID), Player::new(NOUGHT_ID, local)],
        };

        let link = Connection::spawn(stream, dispatcher)?;
        Self::launch(role, board, players, clock, Some(link), (tx, rx), time_left_rx)
    }

    fn launch(
        role: Role,
        board: Board,
        players: [Player; 2],
        clock: Clock,
        link: Option<(Connection, oneshot::Receiver<ConnectionLost>)>,
        (tx, rx): (
            mpsc::UnboundedSender<SessionCommand>,
            mpsc::UnboundedReceiver<SessionCommand>,
        ),
        time_left_rx: watch::Receiver<Duration>,
    ) -> anyhow::Result<(SessionHandle, SessionEvents)> {
        let move_time = *time_left_rx.borrow();
        let mut arbiter = MoveArbiter::new(board);
        arbiter.add_players(players[0].id(), players[1].id())?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(arbiter.snapshot());
        let (connection, lost_rx) = match link {
            Some((connection, lost_rx)) => (Some(connection), Some(lost_rx)),
            None => (None, None),
        };

        let session = Session {
            role,
            arbiter,
            players,
            clock,
            connection,
            lost_rx,
            mailbox: rx,
            self_tx: tx.downgrade(),
            events: event_tx,
            snapshot_tx,
            version: 0,
            move_time,
        };
        let handle = SessionHandle {
            role,
            mailbox: tx,
            snapshot_rx,
            time_left_rx,
        };

        tokio::spawn(session.run());
        Ok((handle, event_rx))
    }

    async fn run(mut self) {
        self.begin();
        loop {
            let wake = tokio::select! {
                // Frames dispatched before the link dropped are already queued.
                biased;
                command = self.mailbox.recv() => Wake::Command(command),
                lost = lost_signal(&mut self.lost_rx) => Wake::Lost(lost),
            };
            let running = match wake {
                Wake::Command(Some(command)) => self.handle(command).await,
                Wake::Command(None) => {
                    tracing::debug!(role = %self.role, "all session handles dropped");
                    self.finish(true).await;
                    false
                }
                Wake::Lost(Some(lost)) => {
                    self.emit(SessionEvent::ConnectionLost(lost.reason));
                    self.finish(false).await;
                    false
                }
                Wake::Lost(None) => true,
            };
            if !running {
                break;
            }
        }
    }

    fn begin(&mut self) {
        tracing::info!(role = %self.role, size = ?self.arbiter.board().size(), "session started");
        self.emit(SessionEvent::Started {
            role: self.role,
            size: self.arbiter.board().size(),
            move_time: self.move_time,
        });
        self.clock.start();
        self.publish();
        self.prompt_current();
    }

    /// Returns whether the session keeps running.
    async fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::LocalMove(at) => self.local_move(at),
            SessionCommand::BotMove { player, at } => self.bot_move(player, at),
            SessionCommand::RemoteMark(at) => self.remote_mark(at),
            SessionCommand::Ack(ack) => {
                if self.role == Role::Client {
                    let outcome = self.arbiter.apply_mark(ack.symbol, ack.at);
                    self.after_move(outcome, Origin::Remote);
                }
            }
            SessionCommand::Timer { epoch, event } => {
                if self.clock.is_current(epoch) {
                    self.on_timer(event);
                } else {
                    tracing::trace!(epoch, ?event, "stale timer event dropped");
                }
            }
            SessionCommand::PeerQuit => {
                tracing::info!(role = %self.role, "peer left");
                self.emit(SessionEvent::PeerQuit);
                self.finish(false).await;
                return false;
            }
            SessionCommand::Quit => {
                self.finish(true).await;
                return false;
            }
        }
        true
    }

    fn local_move(&mut self, at: Coordinate) {
        let current = self.arbiter.current();
        let player = &self.players[current.index()];
        if !player.is_human() {
            tracing::debug!(%at, ?current, "no local human on turn; move ignored");
            return;
        }
        let id = player.id();
        self.move_for(id, at);
    }

    fn bot_move(&mut self, player: PlayerId, at: Coordinate) {
        self.move_for(player, at);
    }

    /// A move by a player on this machine.
    fn move_for(&mut self, player: PlayerId, at: Coordinate) {
        if self.role != Role::Client {
            let outcome = self.arbiter.request_move(player, at);
            self.after_move(outcome, Origin::Local);
            return;
        }

        // The host decides; the move is applied when the ack comes back.
        let on_turn = self.arbiter.turn().current_player() == Some(player);
        let board = self.arbiter.board();
        if self.arbiter.is_over() || !on_turn || !board.is_in_bounds(at) || board.is_marked(at) {
            tracing::debug!(%at, %player, "move not sent to host");
            return;
        }
        self.send(&Outbound::Mark(at));
    }

    fn remote_mark(&mut self, at: Coordinate) {
        let remote = match self.role {
            Role::Local => {
                tracing::debug!(%at, "local session got a remote mark");
                return;
            }
            Role::Host => NOUGHT_ID,
            Role::Client => CROSS_ID,
        };
        let outcome = self.arbiter.request_move(remote, at);
        if self.role == Role::Host {
            match outcome {
                MoveOutcome::Advanced { marked, symbol, .. } => {
                    self.send(&Outbound::MarkMadeAck(MoveAck::new(marked, symbol)))
                }
                MoveOutcome::Won { marked, result } => {
                    self.send(&Outbound::MarkMadeAck(MoveAck::new(marked, result.symbol)))
                }
                MoveOutcome::Ignored => {}
            }
        }
        self.after_move(outcome, Origin::Remote);
    }

    fn after_move(&mut self, outcome: MoveOutcome, origin: Origin) {
        let forward = self.role == Role::Host && matches!(origin, Origin::Local);
        match outcome {
            MoveOutcome::Ignored => {}
            MoveOutcome::Advanced {
                marked,
                symbol,
                next,
            } => {
                if forward {
                    self.send(&Outbound::Mark(marked));
                }
                self.clock.restart();
                self.emit(SessionEvent::Marked { at: marked, symbol });
                self.emit(SessionEvent::TurnChanged(next));
                self.publish();
                self.prompt_current();
            }
            MoveOutcome::Won { marked, result } => {
                if forward {
                    self.send(&Outbound::Mark(marked));
                }
                self.clock.stop();
                tracing::info!(winner = %result.symbol, start = %result.start, "game won");
                self.emit(SessionEvent::Marked {
                    at: marked,
                    symbol: result.symbol,
                });
                self.emit(SessionEvent::Won(result));
                self.publish();
            }
        }
    }

    fn on_timer(&mut self, event: TimerEvent) {
        if self.arbiter.is_over() {
            return;
        }
        match event {
            TimerEvent::Tick(left) => {
                if self.role == Role::Host {
                    self.send(&Outbound::Time(left));
                }
                self.emit(SessionEvent::TimerTick(left));
            }
            TimerEvent::Expired => {
                let Some(next) = self.arbiter.time_expired() else {
                    return;
                };
                if self.role == Role::Host {
                    self.send(&Outbound::TimePassed);
                }
                tracing::debug!(timed_out = %next.other(), "turn time expired");
                self.emit(SessionEvent::TimeExpired(next.other()));
                self.emit(SessionEvent::TurnChanged(next));
                self.publish();
                self.prompt_current();
            }
        }
    }

    fn prompt_current(&mut self) {
        if self.arbiter.is_over() {
            return;
        }
        let symbol = self.arbiter.current();
        let player = &mut self.players[symbol.index()];
        match player.prompt(self.arbiter.board()) {
            Prompt::AwaitInput => self.emit(SessionEvent::AwaitingInput(symbol)),
            Prompt::Move(at) => {
                let command = SessionCommand::BotMove {
                    player: player.id(),
                    at,
                };
                if let Some(tx) = self.self_tx.upgrade() {
                    let _ = tx.send(command);
                }
            }
            Prompt::Remote => {}
        }
    }

    /// Stop the clock and release the connection. Terminal.
    async fn finish(&mut self, farewell: bool) {
        self.clock.stop();
        if let Some(connection) = self.connection.take() {
            if farewell {
                connection.send(&Outbound::Quit);
            }
            connection.dispose().await;
        }
        self.lost_rx = None;
        tracing::info!(role = %self.role, "session ended");
        self.emit(SessionEvent::Ended);
    }

    fn send(&self, message: &Outbound) {
        if let Some(connection) = &self.connection {
            if !connection.send(message) {
                tracing::debug!(code = message.code(), "nothing sent");
            }
        }
    }

    fn publish(&mut self) {
        self.version += 1;
        let mut snapshot = self.arbiter.snapshot();
        snapshot.version = self.version;
        self.snapshot_tx.send_replace(snapshot);
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

async fn lost_signal(rx: &mut Option<oneshot::Receiver<ConnectionLost>>) -> Option<ConnectionLost> {
    let Some(inner) = rx.as_mut() else {
        return std::future::pending().await;
    };
    let lost = inner.await.ok();
    *rx = None;
    lost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    async fn next_event(events: &mut SessionEvents) -> SessionEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timed out waiting for a session event")
                .expect("event stream closed");
            if !matches!(event, SessionEvent::TimerTick(_)) {
                return event;
            }
        }
    }

    fn local_humans() -> (SessionHandle, SessionEvents) {
        Session::local(&SessionConfig::default(), PlayerKind::Human, PlayerKind::Human).unwrap()
    }

    #[tokio::test]
    async fn test_local_session_alternates_turns() {
        let (handle, mut events) = local_humans();
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::Started {
                role: Role::Local,
                ..
            }
        ));
        assert_eq!(next_event(&mut events).await, SessionEvent::AwaitingInput(Symbol::Cross));

        handle.submit_move(Coordinate::new(10, 10));
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::Marked {
                at: Coordinate::new(10, 10),
                symbol: Symbol::Cross
            }
        );
        assert_eq!(next_event(&mut events).await, SessionEvent::TurnChanged(Symbol::Nought));
        assert_eq!(next_event(&mut events).await, SessionEvent::AwaitingInput(Symbol::Nought));
        assert_eq!(handle.mark_at(Coordinate::new(10, 10)), Some(Symbol::Cross));
        assert_eq!(handle.snapshot().current, Symbol::Nought);
    }

    #[tokio::test]
    async fn test_rejected_move_emits_nothing() {
        let (handle, mut events) = local_humans();
        next_event(&mut events).await;
        next_event(&mut events).await;

        handle.submit_move(Coordinate::new(3, 3));
        next_event(&mut events).await;
        next_event(&mut events).await;
        next_event(&mut events).await;
        let version = handle.snapshot().version;

        // Occupied and out of bounds.
        handle.submit_move(Coordinate::new(3, 3));
        handle.submit_move(Coordinate::new(-1, 3));
        handle.quit();
        assert_eq!(next_event(&mut events).await, SessionEvent::Ended);
        assert_eq!(handle.snapshot().version, version);
    }

    #[tokio::test]
    async fn test_five_in_a_row_wins() {
        let (handle, mut events) = local_humans();
        for x in 0..4 {
            handle.submit_move(Coordinate::new(x, 0));
            handle.submit_move(Coordinate::new(x, 5));
        }
        handle.submit_move(Coordinate::new(4, 0));

        let won = loop {
            if let SessionEvent::Won(result) = next_event(&mut events).await {
                break result;
            }
        };
        assert_eq!(won.symbol, Symbol::Cross);
        assert_eq!(won.start, Coordinate::new(0, 0));
        assert_eq!(won.direction, Direction::Horizontal);

        // Nothing is accepted after the win.
        handle.submit_move(Coordinate::new(20, 20));
        handle.quit();
        assert_eq!(next_event(&mut events).await, SessionEvent::Ended);
        assert!(!handle.is_marked(Coordinate::new(20, 20)));
        assert!(handle.snapshot().game_over());
    }

    #[tokio::test]
    async fn test_bots_play_to_the_end() {
        let config = SessionConfig {
            width: 50,
            height: 50,
            ..SessionConfig::default()
        };
        let (handle, mut events) = Session::local(
            &config,
            PlayerKind::Bot(crate::core::RandomWalkBot::new(3)),
            PlayerKind::Bot(crate::core::RandomWalkBot::new(4)),
        )
        .unwrap();

        let mut moves = 0;
        loop {
            match tokio::time::timeout(Duration::from_secs(20), events.recv()).await {
                Ok(Some(SessionEvent::Marked { .. })) => moves += 1,
                Ok(Some(SessionEvent::Won(_))) => break,
                Ok(Some(_)) => {}
                other => panic!("bot game did not finish: {other:?}"),
            }
        }
        assert!(moves >= 9);
        assert!(handle.snapshot().game_over());
    }

    #[tokio::test]
    async fn test_remote_players_rejected_locally() {
        let result = Session::local(
            &SessionConfig::default(),
            PlayerKind::Human,
            PlayerKind::RemotePeer,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_board_size_rejected() {
        let config = SessionConfig {
            width: 10,
            ..SessionConfig::default()
        };
        assert!(Session::local(&config, PlayerKind::Human, PlayerKind::Human).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_passes_the_turn() {
        let config = SessionConfig {
            move_time_secs: 2,
            ..SessionConfig::default()
        };
        let (handle, mut events) =
            Session::local(&config, PlayerKind::Human, PlayerKind::Human).unwrap();
        let expired = loop {
            if let Some(SessionEvent::TimeExpired(symbol)) = events.recv().await {
                break symbol;
            }
        };
        assert_eq!(expired, Symbol::Cross);
        assert_eq!(events.recv().await, Some(SessionEvent::TurnChanged(Symbol::Nought)));
        assert_eq!(events.recv().await, Some(SessionEvent::AwaitingInput(Symbol::Nought)));
        assert!(!handle.snapshot().game_over());
    }

    #[tokio::test]
    async fn test_dropping_handles_ends_session() {
        let (handle, mut events) = local_humans();
        drop(handle);
        loop {
            match next_event(&mut events).await {
                SessionEvent::Ended => break,
                _ => continue,
            }
        }
    }
}
