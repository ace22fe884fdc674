//! Operator console on stdin.

use dwauth::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: crypto on|off|toggle|status, sessions, stop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CryptoOn,
    CryptoOff,
    CryptoToggle,
    CryptoStatus,
    Sessions,
    Stop,
    Empty,
    Unknown,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let words: Vec<String> = line.split_whitespace().map(str::to_ascii_lowercase).collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        match words.as_slice() {
            [] => Self::Empty,
            ["crypto", "on"] | ["crypto", "enable"] => Self::CryptoOn,
            ["crypto", "off"] | ["crypto", "disable"] => Self::CryptoOff,
            ["crypto", "toggle"] => Self::CryptoToggle,
            ["crypto"] | ["crypto", "status"] => Self::CryptoStatus,
            ["sessions"] => Self::Sessions,
            ["stop"] | ["quit"] | ["exit"] => Self::Stop,
            _ => Self::Unknown,
        }
    }
}

/// Reads commands until `stop`. If stdin closes, waits forever so the
/// server keeps running under a service manager.
pub async fn run<D: AccountDirectory>(server: &AuthServer<D>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "console read failed");
                break;
            }
        };
        if execute(server, Command::parse(&line)).await {
            return;
        }
    }
    std::future::pending::<()>().await;
}

/// Runs one command. Returns `true` when the server should stop.
async fn execute<D: AccountDirectory>(server: &AuthServer<D>, command: Command) -> bool {
    let switch = server.cipher();
    let result = match command {
        Command::CryptoOn => switch.enable(),
        Command::CryptoOff => switch.disable(),
        Command::CryptoToggle => switch.toggle().map(|_| ()),
        Command::CryptoStatus => Ok(()),
        Command::Sessions => {
            let connections = server.connections().await;
            println!("{} connection(s)", connections.len());
            for conn in connections {
                println!("  {}  {}", conn.id(), conn.peer_addr());
            }
            return false;
        }
        Command::Stop => return true,
        Command::Empty => return false,
        Command::Unknown => {
            println!("{HELP}");
            return false;
        }
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "cipher flag not persisted");
    }
    print_status(&switch.status());
    false
}

fn print_status(status: &CipherStatus) {
    let state = if status.enabled { "enabled" } else { "disabled" };
    match &status.flag_path {
        Some(path) => println!("encryption {state} ({})", path.display()),
        None => println!("encryption {state} (not persisted)"),
    }
}
