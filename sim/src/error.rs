//! Runtime errors raised by the datapath.

use thiserror::Error;

/// Conditions a component or accessor can run into. Under
/// [`ErrorPolicy::Permissive`](crate::ErrorPolicy) the control-input variants
/// are only logged and the component falls back; under `Strict` they end the
/// current step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("invalid ALUOp {alu_op} at component {component}")]
    InvalidAluOp { component: usize, alu_op: u32 },

    #[error("invalid 3-way selector {selector} at component {component}")]
    InvalidSelector { component: usize, selector: u32 },

    #[error("opcode {opcode} has no control bundle (component {component})")]
    UnknownOpcode { component: usize, opcode: u32 },

    #[error("unknown ALU operation code {code} at component {component}")]
    UnknownAluCode { component: usize, code: u32 },

    #[error("address {address:#x} is outside {memory}")]
    AddressOutOfRange {
        memory: &'static str,
        address: u32,
    },

    #[error("no component with id {0}")]
    NoSuchComponent(usize),

    #[error("component {component} has no link in slot {slot}")]
    NoSuchLink { component: usize, slot: u8 },
}
