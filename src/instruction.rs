use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::{
    error::SwapError::{self, InvalidInstruction},
    pda::find_order_address,
    state::check_amounts,
};

/// Leading tag byte of every instruction, shared by the encoder and decoder.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwapInstructionKind {
    InitializeOrder = 0,
    DepositMakerTokens = 1,
    AssignTaker = 2,
    CompleteSwap = 3,
    CloseOrder = 4,
}

impl TryFrom<u8> for SwapInstructionKind {
    type Error = SwapError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => Self::InitializeOrder,
            1 => Self::DepositMakerTokens,
            2 => Self::AssignTaker,
            3 => Self::CompleteSwap,
            4 => Self::CloseOrder,
            _ => return Err(InvalidInstruction),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapInstruction {
    /// Creates the order record at its derived address.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer, writable]` The maker, paying for the order account
    /// 1. `[writable]` The order account, derived from `["order", maker, maker_mint, taker_mint]`
    /// 2. `[]` The mint the maker gives
    /// 3. `[]` The mint the maker wants
    /// 4. `[]` The system program
    /// 5. `[]` The rent sysvar
    InitializeOrder {
        /// Amount of the maker mint offered
        maker_amount: u64,
        /// Amount of the taker mint expected in return
        taker_amount: u64,
    },

    /// Moves the maker's side into escrow.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer, writable]` The maker
    /// 1. `[writable]` The order account
    /// 2. `[writable]` The maker's source token account
    /// 3. `[writable]` The escrow token account
    DepositMakerTokens,

    /// Records the taker on an order that has none.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer, writable]` The taker
    /// 1. `[writable]` The order account
    /// 2. `[writable]` The taker's source token account
    AssignTaker,

    /// Exchanges both sides atomically.
    ///
    /// Accounts expected:
    ///
    /// 0. `[writable]` The maker
    /// 1. `[writable]` The taker
    /// 2. `[writable]` The order account
    /// 3. `[writable]` The maker's token account
    /// 4. `[writable]` The taker's token account
    CompleteSwap,

    /// Removes the order and returns its rent to the closer.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer, writable]` The closer, receiving the reclaimed lamports
    /// 1. `[writable]` The order account
    CloseOrder,
}

impl SwapInstruction {
    /// Wire length of `InitializeOrder`: tag plus two u64 amounts.
    pub const INITIALIZE_ORDER_LEN: usize = 1 + 8 + 8;

    pub fn kind(&self) -> SwapInstructionKind {
        match self {
            Self::InitializeOrder { .. } => SwapInstructionKind::InitializeOrder,
            Self::DepositMakerTokens => SwapInstructionKind::DepositMakerTokens,
            Self::AssignTaker => SwapInstructionKind::AssignTaker,
            Self::CompleteSwap => SwapInstructionKind::CompleteSwap,
            Self::CloseOrder => SwapInstructionKind::CloseOrder,
        }
    }

    /// Packs the instruction into its wire bytes.
    ///
    /// Amounts are checked before anything is written.
    pub fn pack(&self) -> Result<Vec<u8>, SwapError> {
        let mut buf = Vec::with_capacity(Self::INITIALIZE_ORDER_LEN);
        match *self {
            Self::InitializeOrder {
                maker_amount,
                taker_amount,
            } => {
                check_amounts(maker_amount, taker_amount)?;
                buf.push(self.kind() as u8);
                buf.extend_from_slice(&maker_amount.to_le_bytes());
                buf.extend_from_slice(&taker_amount.to_le_bytes());
            }
            Self::DepositMakerTokens | Self::AssignTaker | Self::CompleteSwap | Self::CloseOrder => {
                buf.push(self.kind() as u8)
            }
        }
        Ok(buf)
    }

    /// Unpacks a byte buffer into a [SwapInstruction](enum.SwapInstruction.html).
    pub fn unpack(input: &[u8]) -> Result<Self, SwapError> {
        let (tag, rest) = input.split_first().ok_or(InvalidInstruction)?;

        Ok(match SwapInstructionKind::try_from(*tag)? {
            SwapInstructionKind::InitializeOrder => {
                if rest.len() != 16 {
                    return Err(InvalidInstruction);
                }
                let (maker, taker) = rest.split_at(8);
                let maker_amount = Self::unpack_amount(maker)?;
                let taker_amount = Self::unpack_amount(taker)?;
                if check_amounts(maker_amount, taker_amount).is_err() {
                    return Err(InvalidInstruction);
                }
                Self::InitializeOrder {
                    maker_amount,
                    taker_amount,
                }
            }
            SwapInstructionKind::DepositMakerTokens => Self::no_payload(rest, Self::DepositMakerTokens)?,
            SwapInstructionKind::AssignTaker => Self::no_payload(rest, Self::AssignTaker)?,
            SwapInstructionKind::CompleteSwap => Self::no_payload(rest, Self::CompleteSwap)?,
            SwapInstructionKind::CloseOrder => Self::no_payload(rest, Self::CloseOrder)?,
        })
    }

    fn no_payload(rest: &[u8], instruction: Self) -> Result<Self, SwapError> {
        if rest.is_empty() {
            Ok(instruction)
        } else {
            Err(InvalidInstruction)
        }
    }

    fn unpack_amount(input: &[u8]) -> Result<u64, SwapError> {
        let amount = input
            .get(..8)
            .and_then(|slice| slice.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or(InvalidInstruction)?;
        Ok(amount)
    }
}

fn build(
    program_id: &Pubkey,
    instruction: SwapInstruction,
    accounts: Vec<AccountMeta>,
) -> Result<Instruction, SwapError> {
    let data = instruction.pack()?;
    log::debug!("{:?}: {} bytes, {} accounts", instruction.kind(), data.len(), accounts.len());
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Builds `InitializeOrder` and returns it with the derived order address and bump.
pub fn initialize_order(
    program_id: &Pubkey,
    maker: &Pubkey,
    maker_mint: &Pubkey,
    taker_mint: &Pubkey,
    maker_amount: u64,
    taker_amount: u64,
) -> Result<(Instruction, Pubkey, u8), SwapError> {
    // reject before paying for the bump search
    check_amounts(maker_amount, taker_amount)?;
    let (order, bump) = find_order_address(maker, maker_mint, taker_mint, program_id)?;
    let instruction = build(
        program_id,
        SwapInstruction::InitializeOrder {
            maker_amount,
            taker_amount,
        },
        vec![
            AccountMeta::new(*maker, true),
            AccountMeta::new(order, false),
            AccountMeta::new_readonly(*maker_mint, false),
            AccountMeta::new_readonly(*taker_mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
    )?;
    Ok((instruction, order, bump))
}

pub fn deposit_maker_tokens(
    program_id: &Pubkey,
    maker: &Pubkey,
    order: &Pubkey,
    maker_token_account: &Pubkey,
    escrow_account: &Pubkey,
) -> Result<Instruction, SwapError> {
    build(
        program_id,
        SwapInstruction::DepositMakerTokens,
        vec![
            AccountMeta::new(*maker, true),
            AccountMeta::new(*order, false),
            AccountMeta::new(*maker_token_account, false),
            AccountMeta::new(*escrow_account, false),
        ],
    )
}

pub fn assign_taker(
    program_id: &Pubkey,
    taker: &Pubkey,
    order: &Pubkey,
    taker_token_account: &Pubkey,
) -> Result<Instruction, SwapError> {
    build(
        program_id,
        SwapInstruction::AssignTaker,
        vec![
            AccountMeta::new(*taker, true),
            AccountMeta::new(*order, false),
            AccountMeta::new(*taker_token_account, false),
        ],
    )
}

pub fn complete_swap(
    program_id: &Pubkey,
    maker: &Pubkey,
    taker: &Pubkey,
    order: &Pubkey,
    maker_token_account: &Pubkey,
    taker_token_account: &Pubkey,
) -> Result<Instruction, SwapError> {
    build(
        program_id,
        SwapInstruction::CompleteSwap,
        vec![
            AccountMeta::new(*maker, false),
            AccountMeta::new(*taker, false),
            AccountMeta::new(*order, false),
            AccountMeta::new(*maker_token_account, false),
            AccountMeta::new(*taker_token_account, false),
        ],
    )
}

/// Builds `CloseOrder`.
///
/// The encoder applies no state guard. Whether the engine refuses to close
/// an order holding a maker deposit has to be confirmed against the engine.
pub fn close_order(
    program_id: &Pubkey,
    closer: &Pubkey,
    order: &Pubkey,
) -> Result<Instruction, SwapError> {
    build(
        program_id,
        SwapInstruction::CloseOrder,
        vec![
            AccountMeta::new(*closer, true),
            AccountMeta::new(*order, false),
        ],
    )
}

/// Accounts the transaction layer must collect signatures from, in account order.
pub fn required_signers(instruction: &Instruction) -> Vec<Pubkey> {
    instruction
        .accounts
        .iter()
        .filter(|meta| meta.is_signer)
        .map(|meta| meta.pubkey)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncodingError;

    #[test]
    fn initialize_order_literal() {
        let data = SwapInstruction::InitializeOrder {
            maker_amount: 1000,
            taker_amount: 2000,
        }
        .pack()
        .unwrap();

        let mut expected = vec![0x00];
        expected.extend_from_slice(&1000u64.to_le_bytes());
        expected.extend_from_slice(&2000u64.to_le_bytes());
        assert_eq!(data, expected);
        assert_eq!(data.len(), SwapInstruction::INITIALIZE_ORDER_LEN);
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = SwapInstruction::InitializeOrder {
            maker_amount: 0,
            taker_amount: 5,
        }
        .pack()
        .unwrap_err();
        assert_eq!(err, SwapError::Encoding(EncodingError::ZeroMakerAmount));
    }

    #[test]
    fn unit_operations_are_one_byte() {
        for (instruction, tag) in [
            (SwapInstruction::DepositMakerTokens, 1u8),
            (SwapInstruction::AssignTaker, 2),
            (SwapInstruction::CompleteSwap, 3),
            (SwapInstruction::CloseOrder, 4),
        ] {
            assert_eq!(instruction.pack().unwrap(), vec![tag]);
            assert_eq!(SwapInstruction::unpack(&[tag]).unwrap(), instruction);
        }
    }

    #[test]
    fn unpack_rejects_malformed_input() {
        assert_eq!(SwapInstruction::unpack(&[]), Err(InvalidInstruction));
        assert_eq!(SwapInstruction::unpack(&[5]), Err(InvalidInstruction));
        assert_eq!(SwapInstruction::unpack(&[0, 1, 2, 3]), Err(InvalidInstruction));
        assert_eq!(SwapInstruction::unpack(&[4, 0]), Err(InvalidInstruction));
    }

    #[test]
    fn unpack_rejects_zero_amount() {
        let mut data = vec![0u8];
        data.extend_from_slice(&5u64.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        assert_eq!(SwapInstruction::unpack(&data), Err(InvalidInstruction));
    }
}
