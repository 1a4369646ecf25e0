//! # Refwire CLI Entry Point
//!
//! The main executable for the Refwire tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Sets up logging and parses command-line arguments using [`cli::Cli`].
//! 2. **Configuration**: Loads the decode options from the config file and applies flag overrides.
//! 3. **Execution**: Encodes, decodes or inspects a payload through `refwire_core`.
//! 4. **Presentation**: Formats and prints the result or the error to standard output/error.
mod cli;
mod config;
mod formatter;

use clap::Parser;
use cli::{Cli, Commands, Payload};
use config::ConfigManager;
use formatter::{DecodedReply, FieldList, FormattedString, GenericError};
use refwire_core::{DecodeOptions, ErrorResponse, wire::read_fields};
use std::io::Read;
use std::process;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    init_tracing();

    let args = Cli::parse();

    let config = match ConfigManager::new(args.decode.config.clone()).load() {
        Ok(config) => config,
        Err(err) => exit_with(GenericError("Configuration Error", format!("{err:#}"))),
    };
    let options = config.decode_options(&args.decode);

    match args.command {
        Commands::Encode { code, message } => encode(code, message),
        Commands::Decode { payload } => decode(payload, &options),
        Commands::Inspect { payload } => inspect(payload, &options),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("refwire=warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn exit_with(err: impl Into<FormattedString>) -> ! {
    eprintln!("{}", err.into());
    process::exit(1);
}

fn encode(code: i32, message: String) {
    let reply = ErrorResponse::new(code, message);
    tracing::debug!(len = reply.encoded_len(), "encoding ErrorResponse");

    println!("{}", hex::encode(reply.encode_to_vec()));
}

fn decode(payload: Payload, options: &DecodeOptions) {
    let bytes = read_payload(payload);

    match ErrorResponse::decode_with(&bytes, options) {
        Ok(reply) => println!("{}", FormattedString::from(DecodedReply(reply))),
        Err(err) => exit_with(err),
    }
}

fn inspect(payload: Payload, options: &DecodeOptions) {
    let bytes = read_payload(payload);

    match read_fields(&bytes, options) {
        Ok(fields) => println!("{}", FormattedString::from(FieldList(fields))),
        Err(err) => exit_with(err),
    }
}

fn read_payload(payload: Payload) -> Vec<u8> {
    match payload {
        Payload::Bytes(bytes) => bytes,
        Payload::Stdin => {
            let mut input = String::new();
            if let Err(err) = std::io::stdin().read_to_string(&mut input) {
                exit_with(err);
            }
            cli::decode_hex(&input)
                .unwrap_or_else(|err| exit_with(GenericError("Invalid input", err)))
        }
    }
}
