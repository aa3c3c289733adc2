use std::net::TcpListener;
use std::process::Command;

use anyhow::{ensure, Result};

fn gdbserver() -> Command {
    Command::new(env!("CARGO_BIN_EXE_riscv-gdbserver"))
}

#[test]
fn unknown_core_is_rejected_before_listening() -> Result<()> {
    // hold the port: if the server got as far as binding, it would fail with
    // a different error
    let listener = TcpListener::bind("0.0.0.0:0")?;
    let port = listener.local_addr()?.port().to_string();

    let out = gdbserver().args(["--core", "Unknown", &port]).output()?;
    let stderr = String::from_utf8_lossy(&out.stderr);

    ensure!(!out.status.success(), "exited successfully");
    ensure!(
        stderr.contains("ERROR: Unrecognized core: Unknown: exiting"),
        "stderr: {}",
        stderr
    );
    ensure!(stderr.contains("PicoRV32, RI5CY"), "stderr: {}", stderr);
    Ok(())
}

#[test]
fn missing_arguments_print_usage() -> Result<()> {
    let out = gdbserver().args(["--core", "RI5CY"]).output()?;
    let stderr = String::from_utf8_lossy(&out.stderr);

    ensure!(!out.status.success(), "exited successfully");
    ensure!(stderr.contains("Usage"), "stderr: {}", stderr);
    Ok(())
}

#[test]
fn help_lists_options() -> Result<()> {
    let out = gdbserver().arg("--help").output()?;
    let stdout = String::from_utf8_lossy(&out.stdout);

    ensure!(out.status.success(), "--help failed");
    for opt in ["--core", "--trace", "RSP-PORT", "PicoRV32, RI5CY"] {
        ensure!(stdout.contains(opt), "missing {} in: {}", opt, stdout);
    }
    Ok(())
}
