use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use log::{error, info};

use riscv_gdbserver::backend::{self, BackendError};
use riscv_gdbserver::session::RspSession;
use riscv_gdbserver::trace::TraceFlags;

#[derive(Parser, Debug)]
#[command(name = "riscv-gdbserver")]
#[command(about = "GDB RSP server for RISC-V core models")]
#[command(version)]
struct Cli {
    #[arg(short, long, value_name = "NAME", help = core_help())]
    core: String,

    /// Trace flags, decimal or 0x-prefixed hex
    #[arg(short, long, value_name = "FLAGS", default_value = "0", value_parser = parse_trace)]
    trace: u32,

    /// TCP port to listen on for the debugger
    #[arg(value_name = "RSP-PORT")]
    port: u16,
}

fn core_names() -> String {
    backend::names().collect::<Vec<_>>().join(", ")
}

fn core_help() -> String {
    format!("Core to debug: {} (case insensitive)", core_names())
}

fn parse_trace(s: &str) -> Result<u32, String> {
    let res = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    res.map_err(|e| format!("invalid trace flags {:?}: {}", s, e))
}

fn init_logging(flags: TraceFlags) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(flags.default_log_level());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let flags = TraceFlags::new(cli.trace);
    init_logging(flags);

    let target = match backend::new_target(&cli.core) {
        Ok(target) => target,
        Err(BackendError::UnknownCore(name)) => {
            eprintln!("ERROR: Unrecognized core: {}: exiting", name);
            eprintln!("Known cores: {}", core_names());
            eprintln!("{}", Cli::command().render_usage());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("ERROR: {}: {}", cli.core, e);
            return ExitCode::FAILURE;
        }
    };

    if !flags.silent() {
        info!("{} selected, trace flags: {}", target.name(), flags);
    }

    let mut session = RspSession::new(cli.port, target, flags);
    if let Err(e) = session.run() {
        error!("{}", e);
    }

    ExitCode::FAILURE
}
