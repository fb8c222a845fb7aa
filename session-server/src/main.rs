use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::{info, warn};

use session_server::Server;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short, long, help = "Increase log verbosity (stderr only, stdout is reserved for the protocol)")]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let server = Arc::new(Server::new());
    let output = Arc::new(Mutex::new(io::stdout()));

    info!("session server ready, reading requests from stdin");

    let stdin = io::stdin();
    let mut threads = Vec::new();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(%err, "failed to read a line from stdin, stopping");
                break;
            }
        };
        if line.is_empty() {
            continue;
        }

        let server = Arc::clone(&server);
        let output = Arc::clone(&output);
        threads.push(std::thread::spawn(move || {
            let response = server.handle_line(&line);
            let serialized = serde_json::to_string(&response).unwrap_or_else(|err| {
                format!("{{\"success\":false,\"errMsg\":\"failed to serialize response: {err}\"}}")
            });

            let mut out = output.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = writeln!(out, "{serialized}");
            let _ = out.flush();
        }));
    }

    for thread in threads {
        let _ = thread.join();
    }

    info!("input stream closed, exiting");
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}
