//! Console chat node.
//!
//! Connects to a serial line exposed over TCP (ser2net, socat, or a
//! microcontroller bridge), runs a serimesh engine on it, and reads
//! commands from stdin:
//!
//! ```text
//! @Bear hello there     send "hello there" to Bear
//! /name Goat            rename this node
//! /peers                list nodes in range
//! /quit                 flush and exit
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serimesh::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "serial-chat", about = "Chat with other nodes on a shared serial line")]
struct Cli {
    /// Address of the serial-over-TCP bridge.
    #[arg(short, long, default_value = "127.0.0.1:7000")]
    connect: String,

    /// JSON config file. Flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node name. Random when neither this nor the config sets one.
    #[arg(short, long)]
    name: Option<String>,

    /// Seconds between announcements.
    #[arg(long)]
    interval: Option<u64>,

    /// Print events as JSON lines instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Send { recipient: &'a str, text: &'a str },
    Rename(&'a str),
    Peers,
    Quit,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix('@') {
        let (recipient, text) = rest.split_once(' ').unwrap_or((rest, ""));
        return Some(Command::Send {
            recipient,
            text: text.trim(),
        });
    }
    let cmd = match line.split_once(' ') {
        Some(("/name", name)) => Command::Rename(name.trim()),
        None if line == "/peers" => Command::Peers,
        None if line == "/quit" => Command::Quit,
        _ => Command::Unknown(line),
    };
    Some(cmd)
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            EngineConfig::from_json(&text)?
        }
        None => EngineConfig::default(),
    };
    if let Some(name) = &cli.name {
        config.node_name = Some(name.clone());
    }
    if let Some(secs) = cli.interval {
        config.announce_interval_secs = secs;
    }
    Ok(config)
}

fn print_event(event: &EngineEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "event not serializable"),
        }
        return;
    }
    match event {
        EngineEvent::PeersUpdated { .. } => {}
        EngineEvent::MessageReceived { sender, payload } => {
            println!("<From: {sender}> {payload}");
        }
        EngineEvent::MessageRelayed {
            sender,
            recipient,
            payload,
        } => println!("<From: {sender}> <To: {recipient}> {payload} (relayed)"),
        EngineEvent::MessageSent { recipient, payload } => {
            println!("<To: {recipient}> {payload}");
        }
        EngineEvent::Status { text } => println!("* {text}"),
        EngineEvent::IdentityChanged { name } => println!("* You are {name}"),
    }
}

/// Applies one console command. Returns `false` when the user wants out.
fn handle_line(engine: &Engine, line: &str) -> bool {
    let Some(command) = parse_command(line) else {
        return true;
    };
    let result = match command {
        Command::Send { recipient, text } => engine.send_text(recipient, text),
        Command::Rename(name) => engine.set_name(name),
        Command::Peers => {
            let peers = engine.peers();
            if peers.is_empty() {
                println!("* nobody in range");
            } else {
                let list: Vec<&str> = peers.iter().map(String::as_str).collect();
                println!("* in range: {}", list.join(", "));
            }
            Ok(())
        }
        Command::Quit => return false,
        Command::Unknown(other) => {
            println!("* unknown command: {other}");
            Ok(())
        }
    };
    if let Err(e) = result {
        println!("* {e}");
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let stream = tokio::net::TcpStream::connect(&cli.connect)
        .await
        .with_context(|| format!("connecting to {}", cli.connect))?;
    let (source, sink) = serimesh::transport::split(stream);
    let (engine, mut events) = Engine::start(config, source, sink)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = events.recv() => print_event(&event, cli.json),
            line = lines.next_line() => match line? {
                Some(line) if handle_line(&engine, &line) => {}
                _ => break,
            },
            _ = engine.closed() => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let result = engine.stop(StopMode::Flush).await;
    while let Ok(event) = events.try_recv() {
        print_event(&event, cli.json);
    }
    result.map_err(Into::into)
}
