//! Method table and call dispatch
//!
//! The transport does not get to decide what a valid call looks like: every
//! call is checked against [`METHODS`] here before any state is touched.

use super::ControlError;
use crate::hud::{parse_code, DaemonState, PrimaryDisplay, GRID_CELLS};

/// What the window has to do after a successful call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Map (or redraw) the window at the current position
    Present,
    /// Unmap the window
    Withdraw,
    None,
}

/// Accepted argument kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Case-insensitive hex string holding a 16-bit value
    HexCode,
}

type Handler = fn(&mut DaemonState, &dyn PrimaryDisplay, &[u16]) -> Result<Effect, ControlError>;

pub struct MethodSpec {
    pub name: &'static str,
    pub args: &'static [ArgKind],
    handler: Handler,
}

impl MethodSpec {
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Check arity and argument kinds, returning the decoded arguments
    fn validate(&self, args: &[String]) -> Result<Vec<u16>, ControlError> {
        if args.len() != self.arity() {
            return Err(ControlError::Arity {
                method: self.name,
                expected: self.arity(),
                got: args.len(),
            });
        }

        self.args
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (kind, value))| match kind {
                ArgKind::HexCode => parse_code(value).map_err(|e| ControlError::InvalidCode {
                    index,
                    value: e.value,
                }),
            })
            .collect()
    }
}

const SHOW_ARGS: [ArgKind; GRID_CELLS] = [ArgKind::HexCode; GRID_CELLS];

pub const METHODS: &[MethodSpec] = &[
    MethodSpec {
        name: "Hide",
        args: &[],
        handler: hide,
    },
    MethodSpec {
        name: "Show",
        args: &SHOW_ARGS,
        handler: show,
    },
];

/// Validate a call fully, then apply it.
///
/// A rejected call leaves `state` exactly as it was.
pub fn dispatch(
    state: &mut DaemonState,
    display: &dyn PrimaryDisplay,
    method: &str,
    args: &[String],
) -> Result<Effect, ControlError> {
    let spec = METHODS
        .iter()
        .find(|spec| spec.name == method)
        .ok_or_else(|| ControlError::UnknownMethod(method.to_string()))?;

    let values = spec.validate(args)?;
    (spec.handler)(state, display, &values)
}

fn hide(state: &mut DaemonState, _: &dyn PrimaryDisplay, _: &[u16]) -> Result<Effect, ControlError> {
    if state.hide() {
        Ok(Effect::Withdraw)
    } else {
        Ok(Effect::None)
    }
}

fn show(
    state: &mut DaemonState,
    display: &dyn PrimaryDisplay,
    codes: &[u16],
) -> Result<Effect, ControlError> {
    let codes: [u16; GRID_CELLS] = codes.try_into().map_err(|_| ControlError::Arity {
        method: "Show",
        expected: GRID_CELLS,
        got: codes.len(),
    })?;

    state.show(codes, display.primary_width());
    Ok(Effect::Present)
}
