use thiserror::Error;

use solana_program::program_error::ProgramError;

use crate::{instruction::SwapInstructionKind, state::OrderState};

/// Malformed order account bytes.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer shorter than the record it should hold
    #[error("Truncated Account Data")]
    Truncated,
    /// Option presence tag other than 0 or 1
    #[error("Unknown Option Tag")]
    UnknownTag,
    /// State byte outside the known states
    #[error("Unknown Order State")]
    UnknownState,
}

/// Instruction parameters that can never be encoded.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Maker Amount Must Be Positive")]
    ZeroMakerAmount,
    #[error("Taker Amount Must Be Positive")]
    ZeroTakerAmount,
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SwapError {
    /// Invalid instruction
    #[error("Invalid Instruction")]
    InvalidInstruction,
    /// No off-curve bump among 256 candidates
    #[error("Address Derivation Failure")]
    AddressDerivationFailure,
    #[error("Encoding Error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Decode Error: {0}")]
    Decode(#[from] DecodeError),
    /// Order address already occupied
    #[error("Duplicate Order")]
    DuplicateOrder,
    #[error("Invalid Transition: {operation:?} from {from:?}")]
    InvalidTransition {
        from: OrderState,
        operation: SwapInstructionKind,
    },
    /// Record breaks a field invariant
    #[error("Invalid Order")]
    InvalidOrder,
    /// Destination account cannot hold the encoded order
    #[error("Account Data Too Small")]
    AccountDataTooSmall,
    /// Engine rejection that does not map to a known error, as its raw code
    #[error("Rejected By Engine: {0:#x}")]
    Rejected(u64),
}

const CUSTOM_BASE: u32 = 0x5300;

impl SwapError {
    /// Client-side code carried in `ProgramError::Custom` when a local
    /// error is surfaced through the runtime's error type.
    fn offset(&self) -> u32 {
        match self {
            SwapError::InvalidInstruction => 0,
            SwapError::AddressDerivationFailure => 1,
            SwapError::Encoding(EncodingError::ZeroMakerAmount) => 2,
            SwapError::Encoding(EncodingError::ZeroTakerAmount) => 3,
            SwapError::Decode(DecodeError::Truncated) => 4,
            SwapError::Decode(DecodeError::UnknownTag) => 5,
            SwapError::Decode(DecodeError::UnknownState) => 6,
            SwapError::DuplicateOrder => 7,
            SwapError::InvalidTransition { .. } => 8,
            SwapError::InvalidOrder => 9,
            SwapError::AccountDataTooSmall => 10,
            SwapError::Rejected(_) => 11,
        }
    }

    /// Classifies a rejection returned by the execution engine after submission.
    ///
    /// An occupied order address is reported either by the system program
    /// while creating the account (`AccountAlreadyInUse`, custom code 0) or
    /// by the swap program as `AccountAlreadyInitialized`. Everything else is
    /// opaque here and kept as its raw code.
    pub fn from_engine(err: ProgramError) -> Self {
        match err {
            ProgramError::AccountAlreadyInitialized | ProgramError::Custom(0) => {
                SwapError::DuplicateOrder
            }
            other => SwapError::Rejected(u64::from(other)),
        }
    }
}

impl From<SwapError> for ProgramError {
    fn from(e: SwapError) -> Self {
        match e {
            SwapError::Rejected(raw) => ProgramError::from(raw),
            _ => ProgramError::Custom(CUSTOM_BASE + e.offset()),
        }
    }
}
