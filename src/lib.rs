//! Client-side core of a two-party token swap escrow.
//!
//! The execution engine owns the escrow logic. This crate derives order
//! addresses, encodes instructions for the engine and decodes the order
//! accounts it writes back.

pub mod error;
pub mod instruction;
pub mod pda;
pub mod state;
pub mod token;

pub use error::{DecodeError, EncodingError, SwapError};
pub use instruction::{SwapInstruction, SwapInstructionKind};
pub use pda::{find_address, find_order_address, ORDER_SEED};
pub use state::{OrderState, SwapOrder, Transition};

// Default deployment. Every builder also takes an explicit program id.
solana_program::declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

// Flow of a swap:
// 1. maker sends InitializeOrder, the order lands at its derived address
// 2. taker sends AssignTaker
// 3. maker sends DepositMakerTokens into the escrow account
// 4. CompleteSwap exchanges both sides atomically
// CloseOrder reclaims the order account before any deposit is committed.
