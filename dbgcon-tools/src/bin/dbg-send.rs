// dbg-send
//
// Sends debug messages to a running dbg-console, one datagram per message.
// Messages come from the command line, or from stdin one per line.

use clap::Parser;
use dbgcon_tools::{init_logging, ConsoleOpts};
use log::{info, warn};
use std::io::{self, BufRead};
use std::net::{SocketAddr, UdpSocket};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "dbg-send", about = "Send debug messages to dbg-console over UDP")]
struct Cli {
    #[command(flatten)]
    opts: ConsoleOpts,

    /// Pause between messages, in milliseconds
    #[arg(short = 'i', long = "interval", default_value_t = 0)]
    interval_ms: u64,

    /// Messages to send. Reads stdin when empty.
    messages: Vec<String>,
}

fn send(sock: &UdpSocket, target: SocketAddr, msg: &str, interval: Duration) -> io::Result<()> {
    sock.send_to(msg.as_bytes(), target)?;
    if !interval.is_zero() {
        std::thread::sleep(interval);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.opts.log_file.as_deref(), true) {
        eprintln!("dbg-send: cannot open log file: {}", e);
        return ExitCode::from(2);
    }
    let target = match cli.opts.resolve_config() {
        Ok(c) => c.addr(),
        Err(e) => {
            eprintln!("dbg-send: {}", e);
            return ExitCode::from(2);
        }
    };

    let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let sock = match UdpSocket::bind(local) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("dbg-send: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let interval = Duration::from_millis(cli.interval_ms);

    let mut sent = 0usize;
    let mut failed = 0usize;
    let mut push = |msg: &str| match send(&sock, target, msg, interval) {
        Ok(()) => sent += 1,
        Err(e) => {
            warn!("send to {} failed: {}", target, e);
            failed += 1;
        }
    };

    if cli.messages.is_empty() {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => push(&line),
                Err(e) => {
                    warn!("stdin: {}", e);
                    break;
                }
            }
        }
    } else {
        for msg in &cli.messages {
            push(msg);
        }
    }

    info!("sent {} message(s) to udp://{}", sent, target);
    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
