//! hostcmd CLI Client
//!
//! Interactive command-line client for a hostcmd daemon.
//!
//! # Usage
//!
//! ```bash
//! # Connect to local daemon
//! hostcmd
//!
//! # Connect to remote daemon
//! hostcmd --host 192.168.1.20 --port 6390
//!
//! # Send a single line
//! hostcmd -c "LED 3 on"
//! ```

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// hostcmd Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "hostcmd")]
#[command(author, version, about = "hostcmd CLI - send command lines to a hostcmd daemon")]
struct Args {
    /// Daemon hostname
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "HOSTCMD_HOST")]
    host: String,

    /// Daemon port
    #[arg(short, long, default_value = "6390", env = "HOSTCMD_PORT")]
    port: u16,

    /// Send one command line and exit
    #[arg(short, long)]
    command: Option<String>,

    /// Quiet mode (no banner)
    #[arg(short, long)]
    quiet: bool,
}

/// One reply line from the daemon
#[derive(Debug, PartialEq, Eq)]
enum Reply<'a> {
    Ok(&'a str),
    Error { code: &'a str, message: &'a str },
    Bulk(usize),
    /// Diagnostic echoed by an interactive parser
    Diagnostic(&'a str),
}

/// Classify a reply line. An interactive prompt may precede `-ERR`.
fn classify(line: &str) -> Reply<'_> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(msg) = line.strip_prefix("+OK ") {
        return Reply::Ok(msg);
    }
    if let Some(len) = line.strip_prefix('$').and_then(|n| n.parse().ok()) {
        return Reply::Bulk(len);
    }
    if let Some(at) = line.find("-ERR ") {
        let rest = &line[at + 5..];
        let (code, message) = rest.split_once(' ').unwrap_or((rest, ""));
        return Reply::Error { code, message };
    }

    Reply::Diagnostic(line)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let addr = format!("{}:{}", args.host, args.port);

    let mut stream = connect(&addr)?;

    if !args.quiet {
        println!(
            "{}",
            format!(
                r#"
  hostcmd CLI
  Connected to {}
  Type 'help' for syntax, 'quit' to exit
"#,
                addr
            )
            .cyan()
        );
    }

    // Single command mode
    if let Some(cmd) = args.command {
        return execute_command(&mut stream, &cmd);
    }

    // Interactive mode
    let mut rl = DefaultEditor::new()?;
    let history_path = std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".hostcmd_history"))
        .unwrap_or_default();

    let _ = rl.load_history(&history_path);

    loop {
        let prompt = format!("{}> ", "hostcmd".green());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Handle local commands
                match line.to_lowercase().as_str() {
                    "quit" | "exit" => break,
                    "help" => {
                        print_help();
                        continue;
                    }
                    "clear" => {
                        print!("\x1B[2J\x1B[1;1H");
                        continue;
                    }
                    _ => {}
                }

                if let Err(e) = execute_command(&mut stream, line) {
                    eprintln!("{} {}", "Error:".red(), e);

                    // Try to reconnect
                    if let Ok(new_stream) = connect(&addr) {
                        stream = new_stream;
                        println!("{}", "Reconnected.".yellow());
                    } else {
                        eprintln!("{}", "Connection lost.".red());
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

fn connect(addr: &str) -> Result<TcpStream> {
    let stream =
        TcpStream::connect(addr).with_context(|| format!("Failed to connect to {}", addr))?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    Ok(stream)
}

fn execute_command(stream: &mut TcpStream, cmd: &str) -> Result<()> {
    // Send command
    writeln!(stream, "{}", cmd)?;
    stream.flush()?;

    let mut reader = BufReader::new(stream.try_clone()?);

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            bail!("Connection closed by daemon");
        }

        match classify(&line) {
            Reply::Ok(msg) => println!("{} {}", "OK".green(), msg),
            Reply::Error { code, message } => {
                println!("{} {}", format!("({})", code).red().bold(), message.red());
            }
            Reply::Bulk(_) => {
                let mut data = String::new();
                reader.read_line(&mut data)?;
                print_bulk(data.trim_end());
            }
            Reply::Diagnostic(text) => {
                println!("{}", text.dimmed());
                continue;
            }
        }

        return Ok(());
    }
}

fn print_bulk(data: &str) {
    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(value) => {
            let command = value["command"].as_str().unwrap_or_default();
            let args = value["args"]
                .as_array()
                .map(|args| {
                    args.iter()
                        .map(|arg| arg.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            println!("{} {}", command.cyan().bold(), args.yellow());
        }
        Err(_) => println!("{}", data),
    }
}

fn print_help() {
    println!(
        r#"
{}

{}
  NAME [PARAM ...]          Names match case-insensitively
  \<char>                   Escape the next character (e.g. '\ ' keeps a space)
  'text' or "text"          Quoted-string parameters

{}
  b   bool    ok, on, true, y, yes or a non-zero number
  c   byte    first character of the token
  d   int     decimal, stops at the first non-digit
  f   float   decimal with optional exponent
  s   string  up to the declared length
  q   quoted  string wrapped in ' or "
  ?           the remaining parameters may be omitted

{}
  help                      Show this help
  clear                     Clear screen
  quit/exit                 Exit CLI
"#,
        "hostcmd Syntax".cyan().bold(),
        "Lines".yellow().bold(),
        "Parameter Types".yellow().bold(),
        "Local".yellow().bold(),
    );
}
