use log::debug;

use super::prelude::*;
use crate::protocol::commands::breakpoint::BasicBreakpoint;
use crate::target::MatchType;

impl SessionImpl {
    pub(super) fn handle_insert_matchpoint(
        &mut self,
        target: &mut dyn Target,
        bp: BasicBreakpoint,
    ) -> Result<HandlerStatus, Error> {
        self.ensure_usable()?;
        let kind = match MatchType::from_rsp(bp.type_) {
            Some(kind) => kind,
            None => return Ok(HandlerStatus::Handled),
        };

        let supported = target.insert_matchpoint(bp.addr, kind);
        if self.flags.trace_break() {
            debug!("insert {} at {:#010x}: {}", kind, bp.addr, supported);
        }

        Ok(match supported {
            true => HandlerStatus::NeedsOk,
            false => HandlerStatus::Handled,
        })
    }

    pub(super) fn handle_remove_matchpoint(
        &mut self,
        target: &mut dyn Target,
        bp: BasicBreakpoint,
    ) -> Result<HandlerStatus, Error> {
        self.ensure_usable()?;
        let kind = match MatchType::from_rsp(bp.type_) {
            Some(kind) => kind,
            None => return Ok(HandlerStatus::Handled),
        };

        let removed = target.remove_matchpoint(bp.addr, kind);
        if self.flags.trace_break() {
            debug!("remove {} at {:#010x}: {}", kind, bp.addr, removed);
        }

        Ok(match removed {
            true => HandlerStatus::NeedsOk,
            false => HandlerStatus::Handled,
        })
    }
}
