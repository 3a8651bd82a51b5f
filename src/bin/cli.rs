//! RespKV CLI Client
//!
//! Command-line interface for interacting with RespKV.

use clap::{Parser, Subcommand};
use respkv::network::Client;
use respkv::Value;

/// RespKV CLI
#[derive(Parser, Debug)]
#[command(name = "respkv-cli")]
#[command(about = "CLI for the RespKV key-value server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server, optionally echoing a message
    Ping {
        message: Option<String>,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set one or more hash fields
    Hset {
        /// The hash key
        key: String,

        /// Alternating field and value arguments
        #[arg(required = true, num_args = 2..)]
        pairs: Vec<String>,
    },

    /// Get one hash field
    Hget {
        key: String,
        field: String,
    },

    /// Get every field of a hash
    Hgetall {
        key: String,
    },
}

impl Commands {
    fn into_parts(self) -> Vec<String> {
        let mut parts = Vec::new();
        match self {
            Commands::Ping { message } => {
                parts.push("PING".to_string());
                parts.extend(message);
            }
            Commands::Set { key, value } => parts.extend(["SET".to_string(), key, value]),
            Commands::Get { key } => parts.extend(["GET".to_string(), key]),
            Commands::Hset { key, pairs } => {
                parts.extend(["HSET".to_string(), key]);
                parts.extend(pairs);
            }
            Commands::Hget { key, field } => parts.extend(["HGET".to_string(), key, field]),
            Commands::Hgetall { key } => parts.extend(["HGETALL".to_string(), key]),
        }
        parts
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    match client.request(args.command.into_parts()) {
        Ok(reply) => {
            let failed = reply.is_error();
            print_reply(&reply, 0);
            if failed {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_reply(reply: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match reply {
        Value::SimpleString(text) => println!("{}{}", indent, text),
        Value::Error(message) => println!("{}(error) {}", indent, message),
        Value::Integer(n) => println!("{}(integer) {}", indent, n),
        Value::BulkString(data) => println!("{}\"{}\"", indent, String::from_utf8_lossy(data)),
        Value::Null => println!("{}(nil)", indent),
        Value::Array(items) if items.is_empty() => println!("{}(empty array)", indent),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}{})", indent, i + 1);
                print_reply(item, depth + 1);
            }
        }
    }
}
