use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod formatters;

use config::{CryptogramArg, InterfaceArg, SessionArgs};
use formatters::FormatMode;

#[derive(Parser)]
#[command(name = "emv-reader")]
#[command(about = "EMV Card Reader - Discover payment applications and read card data over PC/SC")]
#[command(version)]
struct Args {
    /// Reader to use; defaults to the first reader
    #[arg(short, long, env = "EMV_READER", global = true)]
    reader: Option<String>,

    /// Output format mode
    #[arg(short, long, value_enum, default_value_t = FormatMode::Raw, global = true)]
    format: FormatMode,

    /// Log more (-v debug, -vv trace with APDUs)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List PC/SC readers
    Readers,
    /// List the payment applications on the card
    Apps {
        #[arg(long, value_enum, default_value_t = InterfaceArg::Auto)]
        interface: InterfaceArg,
    },
    /// Read cardholder data from one application
    Read {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Dump every TLV tag of the application read
    Dump {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Run GENERATE AC after reading (increments the card's ATC)
    GenerateAc {
        #[command(flatten)]
        session: SessionArgs,

        #[arg(long, value_enum, default_value_t = CryptogramArg::Arqc)]
        cryptogram: CryptogramArg,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG wins over -v
    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level))
        )
        .with_target(false)
        .init();

    let reader = args.reader.as_deref();
    let result = match &args.command {
        Command::Readers => commands::readers::cmd_readers(),
        Command::Apps { interface } => commands::apps::cmd_apps(reader, *interface),
        Command::Read { session } => commands::read::cmd_read(reader, session, args.format),
        Command::Dump { session } => commands::dump::cmd_dump(reader, session),
        Command::GenerateAc {
            session,
            cryptogram,
            yes,
        } => commands::generate_ac::cmd_generate_ac(reader, session, (*cryptogram).into(), *yes),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
