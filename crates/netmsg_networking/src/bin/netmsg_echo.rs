//! # NETMSG Echo Server
//!
//! Accepts TCP links and sends every received message back to its sender.
//!
//! ```text
//! netmsg_echo [--config netmsg.toml] [--bind 127.0.0.1:13209] [--duration 30]
//! ```

use std::thread;
use std::time::{Duration, Instant};

use netmsg_core::Fixed;
use netmsg_networking::{
    EngineMessage, ListenSocket, Message, MessageSession, NetError, SessionError,
    PROTOCOL_VERSION,
};
use netmsg_shared::{Channel, NetConfig};

/// Idle sleep between polls.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

struct Peer {
    session: MessageSession,
    label: String,
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         NETMSG ECHO SERVER                                       ║");
    println!("║         Every message goes straight back                         ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    // Parse command line arguments (simple parsing, no external deps)
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut bind: Option<String> = None;
    let mut duration_secs: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => {
                config_path = Some(args[i + 1].clone());
                i += 1;
            }
            "--bind" | "-b" if i + 1 < args.len() => {
                bind = Some(args[i + 1].clone());
                i += 1;
            }
            "--duration" | "-d" if i + 1 < args.len() => {
                duration_secs = args[i + 1].parse().ok();
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: netmsg_echo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>     TOML configuration file");
                println!("  -b, --bind <ADDR>       Listen address (overrides config)");
                println!("  -d, --duration <SECS>   Stop after N seconds");
                println!("  -h, --help              Show this help");
                return;
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => match NetConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Cannot load {path}: {err}");
                std::process::exit(1);
            }
        },
        None => NetConfig::default(),
    };
    if let Some(bind) = bind {
        config.transport.bind = bind;
    }
    if let Err(err) = config.validate() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let mut listener = match ListenSocket::bind(&config) {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("Cannot listen on {}: {err}", config.transport.bind);
            std::process::exit(1);
        }
    };

    println!("Configuration:");
    println!("  Listening on:  {}", listener.local_addr());
    println!("  Max message:   {} bytes", config.session.max_message_size);
    match duration_secs {
        Some(secs) => println!("  Duration:      {secs}s"),
        None => println!("  Duration:      until killed"),
    }
    println!();

    let started = Instant::now();
    let mut peers: Vec<Peer> = Vec::new();
    let mut echoed: u64 = 0;

    loop {
        if duration_secs.is_some_and(|secs| started.elapsed() >= Duration::from_secs(secs)) {
            break;
        }

        match listener.accept() {
            Ok(Some(link)) => {
                let label = format!("{} ({})", link.addr(), link.peer());
                let player = link.peer();
                let mut session = MessageSession::with_transport(&config.session, link);
                session.set_route(player, Channel::Reliable);
                let hello = EngineMessage::Handshake {
                    version: PROTOCOL_VERSION,
                    player,
                    in_game: false,
                    game_time: Fixed::ZERO,
                };
                if let Err(err) = session.send_message(&hello) {
                    println!("  ✗ {label}: handshake failed: {err}");
                    continue;
                }
                println!("  + {label}");
                peers.push(Peer { session, label });
            }
            Ok(None) => {}
            Err(err) => eprintln!("  ✗ accept failed: {err}"),
        }

        let mut busy = false;
        peers.retain_mut(|peer| match pump(&mut peer.session) {
            Ok(count) => {
                busy |= count > 0;
                echoed += count;
                true
            }
            Err(SessionError::Transport(NetError::Disconnected)) => {
                println!("  - {}", peer.label);
                false
            }
            Err(err) => {
                println!("  ✗ {}: {err}", peer.label);
                false
            }
        });

        if !busy {
            thread::sleep(POLL_INTERVAL);
        }
    }

    println!();
    println!("Echoed {echoed} messages, {} peers still connected.", peers.len());
}

/// Echoes every waiting message. Returns how many were echoed.
fn pump(session: &mut MessageSession) -> Result<u64, SessionError> {
    let mut count = 0;
    while session.receive()? {
        let from = session.buffer().player();
        let channel = session.buffer().channel();
        let Some(message) = session.read_message::<EngineMessage>()? else {
            continue;
        };
        session.set_route(from, channel);
        session.send_message(&message)?;
        tracing::debug!("Echoed message type {} to {}", message.message_type(), from);
        count += 1;
    }
    Ok(count)
}
