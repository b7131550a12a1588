//! Line-based TCP chat server
//!
//! Clients connect with any line-oriented client (telnet, netcat), register
//! with `login:<name>`, and every further line is broadcast to all
//! authenticated participants.
//!
//! Usage:
//!   cargo run -- serve                      # Listen on 127.0.0.1:8888
//!   cargo run -- serve --port 9000          # Listen on a specific port

use palaver::{ChatConfig, ChatServer};
use std::env;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" => {
            run_server(&args).await?;
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!("Palaver - Line-Based TCP Chat Server");
    println!();
    println!("USAGE:");
    println!("    cargo run -- serve [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    serve               Start the chat server");
    println!("    help                Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --host <HOST>       Address to listen on (default: 127.0.0.1)");
    println!("    --port <PORT>       Port to listen on (default: 8888)");
    println!();
    println!("PROTOCOL:");
    println!("    Connect with any line-oriented client, e.g. telnet:");
    println!("    - register with:    login:<name>");
    println!("    - then every line you send is broadcast as: <name> >  <line>");
    println!();
    println!("EXAMPLES:");
    println!("    cargo run -- serve");
    println!("    cargo run -- serve --port 9000");
    println!("    RUST_LOG=debug cargo run -- serve");
}

fn parse_flag(args: &[String], name: &str) -> Option<String> {
    for i in 0..args.len() {
        if args[i] == name && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

async fn run_server(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let host = parse_flag(args, "--host").unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = match parse_flag(args, "--port") {
        Some(raw) => raw.parse()?,
        None => 8888,
    };

    let config = ChatConfig {
        bind_addr: format!("{}:{}", host, port).parse()?,
        ..Default::default()
    };

    let server = ChatServer::bind(config).await?;
    info!("Starting chat server on {}", server.local_addr());

    // Serve until interrupted; ctrl-c stops the accept loop and exits 0
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, server stopped");
        }
    }

    Ok(())
}
