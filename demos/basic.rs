//! Basic hostcmd Example
//!
//! Defines a small command set and feeds it input in chunks, the way bytes
//! trickle in from a serial line.
//!
//! Run with: cargo run --example basic

use hostcmd_core::ParamKind;
use hostcmd_protocol::{EchoBuffer, MemorySource, Parser, ParserConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("hostcmd Basic Example\n");

    let config = ParserConfig::default().interactive(Some("> "));
    let mut parser = Parser::with_echo(MemorySource::new(), EchoBuffer::new(), config);

    parser.define("LED", "d b")?;
    parser.define("MOVE", "f f ? f")?;
    parser.define("SAY", "32q")?;

    // step-by-step definition
    {
        let registry = parser.registry_mut();
        registry.define("BLINK")?;
        registry.add_int()?;
        registry.optional_from_here();
        registry.add_int()?;
    }

    println!("=== Schema ===\n");
    for (id, spec) in parser.registry().iter() {
        println!("  #{} {}", id, spec);
    }

    let chunks = [
        "LED 3 o",
        "n\nMOVE 1.5 -2",
        "\nSAY 'hello there'\n",
        "FLY 10\n",
        "move 1 2 3\nblink 5\n",
    ];

    println!("\n=== Parsing ===\n");
    for chunk in chunks {
        parser.source_mut().push(chunk);
        drain(&mut parser);

        let echo = parser.echo_mut().take();
        if !echo.is_empty() {
            println!("  echo: {:?}", String::from_utf8_lossy(&echo));
        }
    }

    Ok(())
}

/// Print every command and parameter that can be completed with the data
/// received so far
fn drain(parser: &mut Parser<MemorySource, EchoBuffer>) {
    loop {
        if parser.command_id().is_none() || parser.all_parameters_done() {
            if !parser.poll_command() {
                if parser.last_error().is_error() {
                    println!("  error: {}", parser.errstr());
                    continue;
                }
                return;
            }
            println!("  command {}", parser.command_name());
        }

        while parser.poll_parameter() {
            let Some(spec) = parser.parameter_spec() else {
                continue;
            };
            let value = match spec.kind() {
                ParamKind::Float => format!("{}", parser.as_float()),
                ParamKind::Int => format!("{}", parser.as_int()),
                ParamKind::Bool => format!("{}", parser.as_bool()),
                _ => format!("{:?}", parser.as_str().unwrap_or_default()),
            };
            println!(
                "    #{} {}{} = {}",
                parser.parameter_index().unwrap_or(0),
                spec,
                if parser.is_optional() { " (optional)" } else { "" },
                value
            );
        }

        if parser.is_invalid() {
            println!("  error: {}", parser.errstr());
        } else if !parser.all_parameters_done() {
            // waiting for more input
            return;
        }
    }
}
