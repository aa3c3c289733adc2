//! Process-wide diagnostic switches.
//!
//! [`TraceFlags`] is built once from the `--trace` bitmask and then handed
//! (by value, it is `Copy`) to whatever needs to consult it. It is never
//! mutated after construction.

use core::fmt;

bitflags::bitflags! {
    /// Diagnostic topics selected on the command line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TraceFlags: u32 {
        /// Log every RSP packet in both directions.
        const RSP = 1 << 0;
        /// Log connection lifecycle and session state transitions.
        const CONN = 1 << 1;
        /// Log matchpoint insertion and removal.
        const BREAK = 1 << 2;
        /// Log the result of every resume call.
        const EXEC = 1 << 3;
        /// Suppress informational banner messages.
        const SILENT = 1 << 4;
    }
}

impl TraceFlags {
    /// Wrap a raw bitmask. Bits without a named topic are retained (so they
    /// round-trip through `bits()`) but have no effect.
    pub fn new(mask: u32) -> TraceFlags {
        TraceFlags::from_bits_retain(mask)
    }

    #[inline(always)]
    pub fn trace_rsp(&self) -> bool {
        self.contains(TraceFlags::RSP)
    }

    #[inline(always)]
    pub fn trace_conn(&self) -> bool {
        self.contains(TraceFlags::CONN)
    }

    #[inline(always)]
    pub fn trace_break(&self) -> bool {
        self.contains(TraceFlags::BREAK)
    }

    #[inline(always)]
    pub fn trace_exec(&self) -> bool {
        self.contains(TraceFlags::EXEC)
    }

    #[inline(always)]
    pub fn silent(&self) -> bool {
        self.contains(TraceFlags::SILENT)
    }

    /// The log level the binary should default to for this set of flags.
    pub fn default_log_level(&self) -> log::LevelFilter {
        if self.trace_rsp() {
            log::LevelFilter::Trace
        } else if self.is_empty() {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Debug
        }
    }
}

impl fmt::Display for TraceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none ({:#x})", self.bits());
        }

        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{}", name.to_ascii_lowercase())?;
        }
        write!(f, " ({:#x})", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bits_are_retained() {
        let flags = TraceFlags::new(0x101);
        assert!(flags.trace_rsp());
        assert!(!flags.trace_conn());
        assert_eq!(flags.bits(), 0x101);
    }

    #[test]
    fn log_level_follows_flags() {
        assert_eq!(TraceFlags::new(0).default_log_level(), log::LevelFilter::Warn);
        assert_eq!(
            TraceFlags::new(TraceFlags::BREAK.bits()).default_log_level(),
            log::LevelFilter::Debug
        );
        assert_eq!(
            (TraceFlags::RSP | TraceFlags::CONN).default_log_level(),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn display_lists_topics() {
        let flags = TraceFlags::CONN | TraceFlags::EXEC;
        assert_eq!(flags.to_string(), "conn,exec (0xa)");
        assert_eq!(TraceFlags::default().to_string(), "none (0x0)");
    }
}
