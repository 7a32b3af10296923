//! Line-oriented gomoku runner (default binary).
//!
//! Moves are read from stdin as `x y` or `x,y`; `quit` leaves. Session events
//! are printed to stdout, logs go to stderr.

use std::io::BufRead;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use gomoku_net::adapter::{accept_one, connect, NetConfig};
use gomoku_net::core::{PlayerKind, RandomWalkBot};
use gomoku_net::engine::{Session, SessionConfig, SessionEvent, SessionEvents, SessionHandle};
use gomoku_net::types::Coordinate;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Per-turn time budget in seconds
    #[arg(long, global = true)]
    move_time: Option<u32>,

    /// Board width in cells (50..=1000)
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Board height in cells (50..=1000)
    #[arg(long, global = true)]
    height: Option<u32>,

    /// Bot RNG seed
    #[arg(long, global = true)]
    seed: Option<u32>,

    /// Path to a JSON session config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: LevelFilter,
}

#[derive(Subcommand)]
enum Mode {
    /// Two players taking turns at this terminal
    Local,
    /// Play Cross against the bot
    Bot,
    /// Wait for one client and play Cross
    Host {
        /// Address to bind (default from GOMOKU_HOST)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (default from GOMOKU_PORT, else 11000)
        #[arg(long)]
        port: Option<u16>,
        /// Let the bot play the local side
        #[arg(long, default_value_t = false)]
        auto: bool,
    },
    /// Connect to a host and play Nought
    Join {
        /// Host address, e.g. 127.0.0.1:11000
        addr: Option<SocketAddr>,
        /// Let the bot play the local side
        #[arg(long, default_value_t = false)]
        auto: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    initialize_logging(args.log_level);

    let config = session_config(&args)?;
    let bot = || PlayerKind::Bot(RandomWalkBot::new(config.bot_seed));
    let local = |auto: bool| if auto { bot() } else { PlayerKind::Human };

    let (handle, events) = match args.mode {
        Mode::Local => Session::local(&config, PlayerKind::Human, PlayerKind::Human)?,
        Mode::Bot => Session::local(&config, PlayerKind::Human, bot())?,
        Mode::Host { bind, port, auto } => {
            let mut net = NetConfig::from_env();
            if let Some(host) = bind {
                net.host = host;
            }
            if let Some(port) = port {
                net.port = port;
            }
            println!("waiting for a player on {}:{}", net.host, net.port);
            let stream = accept_one(&net, None).await?;
            Session::host(&config, stream, local(auto))?
        }
        Mode::Join { addr, auto } => {
            let addr = match addr {
                Some(addr) => addr,
                None => NetConfig::from_env().socket_addr()?,
            };
            let stream = connect(addr).await?;
            Session::client(&config, stream, local(auto))?
        }
    };

    play(handle, events).await
}

fn session_config(args: &Args) -> anyhow::Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    }
    .with_env();

    if let Some(secs) = args.move_time {
        config.move_time_secs = secs;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(seed) = args.seed {
        config.bot_seed = seed;
    }
    anyhow::ensure!(
        config.board_size().is_valid(),
        "board must be between 50x50 and 1000x1000, got {}x{}",
        config.width,
        config.height
    );
    Ok(config)
}

async fn play(handle: SessionHandle, mut events: SessionEvents) -> anyhow::Result<()> {
    let mut lines = spawn_stdin_reader();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if !report(&handle, &event) {
                    break;
                }
            }
            line = lines.recv(), if stdin_open => {
                match line {
                    Some(Ok(line)) => on_input(&handle, line.trim()),
                    Some(Err(err)) => {
                        handle.quit();
                        return Err(err).context("read stdin");
                    }
                    None => {
                        stdin_open = false;
                        handle.quit();
                    }
                }
            }
        }
    }
    info!("bye");
    Ok(())
}

/// Stdin lines from a plain thread, so a pending read never holds up
/// runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

fn on_input(handle: &SessionHandle, line: &str) {
    if line.is_empty() {
        return;
    }
    if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("q") {
        handle.quit();
        return;
    }
    match parse_move(line) {
        Some(at) if handle.is_marked(at) => println!("{at} is taken"),
        Some(at) => {
            handle.submit_move(at);
        }
        None => println!("expected `x y` or `x,y`, or `quit`"),
    }
}

fn parse_move(line: &str) -> Option<Coordinate> {
    let mut parts = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty());
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Coordinate::new(x, y))
}

/// Print one event. Returns `false` once the session is over.
fn report(handle: &SessionHandle, event: &SessionEvent) -> bool {
    match event {
        SessionEvent::Started {
            role,
            size,
            move_time,
        } => println!(
            "{role} game on {}x{}, {}s per move",
            size.width,
            size.height,
            move_time.as_secs()
        ),
        SessionEvent::AwaitingInput(symbol) => println!("{symbol} to move"),
        SessionEvent::Marked { at, symbol } => println!("{symbol} marks {at}"),
        SessionEvent::TurnChanged(_) | SessionEvent::TimerTick(_) => {}
        SessionEvent::Won(result) => {
            let line: Vec<String> = result.cells().iter().map(|c| c.to_string()).collect();
            println!("{} wins: {}", result.symbol, line.join(" "));
            handle.quit();
        }
        SessionEvent::TimeExpired(symbol) => println!("{symbol} ran out of time"),
        SessionEvent::PeerQuit => println!("the other player left"),
        SessionEvent::ConnectionLost(reason) => println!("connection lost: {reason:?}"),
        SessionEvent::Ended => return false,
    }
    true
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_forms() {
        assert_eq!(parse_move("3 4"), Some(Coordinate::new(3, 4)));
        assert_eq!(parse_move("3,4"), Some(Coordinate::new(3, 4)));
        assert_eq!(parse_move(" 10 ,  2 "), Some(Coordinate::new(10, 2)));
        assert_eq!(parse_move("3"), None);
        assert_eq!(parse_move("3 4 5"), None);
        assert_eq!(parse_move("a b"), None);
    }
}
