//! A GDB Remote Serial Protocol server for RISC-V core models.
//!
//! `riscv_gdbserver` lets a stock GDB client debug a program running on a
//! simulated RISC-V core, exactly as it would debug a remote board:
//!
//! ```text
//! (gdb) target remote localhost:5000
//! ```
//!
//! ## Overview
//!
//! The crate is split into a few layers:
//!
//! - [`target`]: the [`Target`](target::Target) trait, the capability
//!   contract every core backend satisfies (resume, reset, registers, memory,
//!   matchpoints, monitor commands, counters).
//! - [`backend`]: adapters implementing `Target` for the supported cores
//!   (`PicoRV32`, `RI5CY`), and a registry to construct them by name.
//! - [`engine`]: the RV32I interpreter the adapters drive.
//! - [`session`]: [`RspSession`](session::RspSession), which accepts GDB
//!   clients over TCP and translates RSP packets into `Target` calls.
//! - [`conn`]: the byte-wise [`Connection`](conn::Connection) abstraction the
//!   session talks through.
//! - [`trace`]: [`TraceFlags`](trace::TraceFlags), the diagnostic switches.
//!
//! ## Getting started
//!
//! ```no_run
//! use riscv_gdbserver::backend;
//! use riscv_gdbserver::session::RspSession;
//! use riscv_gdbserver::trace::TraceFlags;
//!
//! let target = backend::new_target("RI5CY")?;
//! let mut session = RspSession::new(5000, target, TraceFlags::empty());
//! session.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//!
//! Everything is logged through the [`log`] facade. The binary installs
//! `pretty_env_logger`, with a default level picked from the `--trace` flags
//! and overridable through `RUST_LOG`.

pub mod backend;
pub mod conn;
pub mod engine;
pub mod session;
pub mod target;
pub mod trace;

mod protocol;

pub use backend::{new_target, BackendError};
pub use session::{DisconnectReason, RspSession, SessionConfig, SessionError};
pub use target::Target;
pub use trace::TraceFlags;
