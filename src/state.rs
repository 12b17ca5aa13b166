use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::{Pubkey, PUBKEY_BYTES},
};

use crate::{
    error::{DecodeError, EncodingError, SwapError},
    instruction::SwapInstructionKind,
};

/// Rejects amounts the engine would never accept.
pub(crate) fn check_amounts(maker_amount: u64, taker_amount: u64) -> Result<(), EncodingError> {
    if maker_amount == 0 {
        return Err(EncodingError::ZeroMakerAmount);
    }
    if taker_amount == 0 {
        return Err(EncodingError::ZeroTakerAmount);
    }
    Ok(())
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderState {
    Created = 0,
    TakerAssigned = 1,
    MakerDeposited = 2,
    Completed = 3,
}

impl TryFrom<u8> for OrderState {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Created,
            1 => Self::TakerAssigned,
            2 => Self::MakerDeposited,
            3 => Self::Completed,
            _ => return Err(DecodeError::UnknownState),
        })
    }
}

/// Outcome of a legal operation on an existing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Advanced(OrderState),
    /// The order account is removed and its rent reclaimed
    Closed,
}

impl OrderState {
    /// Applies `operation` to an order in this state.
    ///
    /// This is the client-side model only. The engine is authoritative, and
    /// balance preconditions are checked on [`SwapOrder`], not here.
    /// `InitializeOrder` never applies to an existing order.
    pub fn apply(self, operation: SwapInstructionKind) -> Result<Transition, SwapError> {
        use OrderState::*;
        use SwapInstructionKind as Op;

        match (self, operation) {
            (Created, Op::AssignTaker) => Ok(Transition::Advanced(TakerAssigned)),
            (TakerAssigned, Op::DepositMakerTokens) => Ok(Transition::Advanced(MakerDeposited)),
            (MakerDeposited, Op::CompleteSwap) => Ok(Transition::Advanced(Completed)),
            (Created | TakerAssigned, Op::CloseOrder) => Ok(Transition::Closed),
            (from, operation) => Err(SwapError::InvalidTransition { from, operation }),
        }
    }

    fn advance(&mut self, operation: SwapInstructionKind) -> Result<(), SwapError> {
        match self.apply(operation)? {
            Transition::Advanced(next) => {
                *self = next;
                Ok(())
            }
            Transition::Closed => Err(SwapError::InvalidTransition {
                from: *self,
                operation,
            }),
        }
    }

    /// Whether this state requires the taker fields to be set.
    pub fn has_taker(self) -> bool {
        self != OrderState::Created
    }
}

/// One escrow order, decoded from or encoded into its account bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapOrder {
    pub initialized: bool,
    pub maker: Pubkey,
    pub taker: Option<Pubkey>,
    pub maker_mint: Pubkey,
    pub taker_mint: Pubkey,
    pub maker_amount: u64,
    pub taker_amount: u64,
    pub maker_token_account: Pubkey,
    pub taker_token_account: Option<Pubkey>,
    pub state: OrderState,
}

impl SwapOrder {
    /// Size with both options absent.
    pub const MIN_LEN: usize = 1 + PUBKEY_BYTES + 1 + PUBKEY_BYTES * 2 + 8 + 8 + PUBKEY_BYTES + 1 + 1;
    /// Size with both options present, the size the order account is allocated with.
    pub const MAX_LEN: usize = Self::MIN_LEN + PUBKEY_BYTES * 2;

    pub fn new(
        maker: Pubkey,
        maker_mint: Pubkey,
        taker_mint: Pubkey,
        maker_amount: u64,
        taker_amount: u64,
        maker_token_account: Pubkey,
    ) -> Result<Self, SwapError> {
        check_amounts(maker_amount, taker_amount)?;
        Ok(Self {
            initialized: true,
            maker,
            taker: None,
            maker_mint,
            taker_mint,
            maker_amount,
            taker_amount,
            maker_token_account,
            taker_token_account: None,
            state: OrderState::Created,
        })
    }

    /// Checks the field invariants every stored order satisfies.
    pub fn validate(&self) -> Result<(), SwapError> {
        check_amounts(self.maker_amount, self.taker_amount)?;
        let taker_fields_set = self.taker.is_some() && self.taker_token_account.is_some();
        let taker_fields_unset = self.taker.is_none() && self.taker_token_account.is_none();
        let consistent = if self.state.has_taker() {
            taker_fields_set
        } else {
            taker_fields_unset
        };
        if !consistent {
            return Err(SwapError::InvalidOrder);
        }
        Ok(())
    }

    pub fn assign_taker(
        &mut self,
        taker: Pubkey,
        taker_token_account: Pubkey,
    ) -> Result<(), SwapError> {
        let operation = SwapInstructionKind::AssignTaker;
        if self.taker.is_some() {
            return Err(SwapError::InvalidTransition {
                from: self.state,
                operation,
            });
        }
        self.state.advance(operation)?;
        self.taker = Some(taker);
        self.taker_token_account = Some(taker_token_account);
        Ok(())
    }

    /// `maker_balance` is what the maker's token account currently holds.
    pub fn deposit_maker_tokens(&mut self, maker_balance: u64) -> Result<(), SwapError> {
        let operation = SwapInstructionKind::DepositMakerTokens;
        if maker_balance < self.maker_amount {
            return Err(SwapError::InvalidTransition {
                from: self.state,
                operation,
            });
        }
        self.state.advance(operation)
    }

    /// `escrow_balance` is the deposited maker side, `taker_balance` what the
    /// taker's token account holds.
    pub fn complete_swap(&mut self, escrow_balance: u64, taker_balance: u64) -> Result<(), SwapError> {
        let operation = SwapInstructionKind::CompleteSwap;
        let funded = escrow_balance >= self.maker_amount && taker_balance >= self.taker_amount;
        if !funded || self.taker_token_account.is_none() {
            return Err(SwapError::InvalidTransition {
                from: self.state,
                operation,
            });
        }
        self.state.advance(operation)
    }

    /// Consumes the order if it may still be closed.
    ///
    /// Closing after the maker deposit is refused here. The engine may differ.
    pub fn close(self) -> Result<(), SwapError> {
        match self.state.apply(SwapInstructionKind::CloseOrder)? {
            Transition::Closed => Ok(()),
            Transition::Advanced(_) => Err(SwapError::InvalidTransition {
                from: self.state,
                operation: SwapInstructionKind::CloseOrder,
            }),
        }
    }

    pub fn packed_len(&self) -> usize {
        let optional = |value: &Option<Pubkey>| value.map_or(0, |_| PUBKEY_BYTES);
        Self::MIN_LEN + optional(&self.taker) + optional(&self.taker_token_account)
    }

    /// Encodes a valid order into exactly [`packed_len`](Self::packed_len) bytes.
    pub fn encode(&self) -> Result<Vec<u8>, SwapError> {
        self.validate()?;
        let mut buf = vec![0; self.packed_len()];
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Encodes a valid order into account data, zero-filling whatever follows the record.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<(), SwapError> {
        self.validate()?;
        if dst.len() < self.packed_len() {
            return Err(SwapError::AccountDataTooSmall);
        }
        self.write(dst)
    }

    /// Decodes an order read back from the engine.
    ///
    /// Rejects uninitialized accounts and records that break the field invariants.
    pub fn decode(src: &[u8]) -> Result<Self, SwapError> {
        let order = Self::decode_unchecked(src)?;
        if !order.initialized {
            return Err(SwapError::InvalidOrder);
        }
        order.validate()?;
        Ok(order)
    }

    /// Decodes the bytes at the start of `src` as they are.
    ///
    /// Bytes after the record are ignored. Nothing beyond the layout is
    /// checked, so a zeroed account decodes to an uninitialized order with
    /// zero amounts.
    pub fn decode_unchecked(src: &[u8]) -> Result<Self, DecodeError> {
        Self::read(src).map_err(|err| {
            log::warn!("order decode failed on {} bytes: {}", src.len(), err);
            err
        })
    }

    fn read(src: &[u8]) -> Result<Self, DecodeError> {
        if src.len() < Self::MIN_LEN {
            return Err(DecodeError::Truncated);
        }
        let layout = OrderLayout::deserialize(&mut &src[..]).map_err(|_| classify(src))?;
        Self::try_from(layout)
    }

    fn write(&self, dst: &mut [u8]) -> Result<(), SwapError> {
        let mut cursor = &mut dst[..];
        OrderLayout::from(self)
            .serialize(&mut cursor)
            .map_err(|_| SwapError::AccountDataTooSmall)?;
        let remaining = cursor.len();
        let written = dst.len() - remaining;
        dst[written..].fill(0);
        Ok(())
    }
}

impl Sealed for SwapOrder {}

impl IsInitialized for SwapOrder {
    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Pack for SwapOrder {
    const LEN: usize = SwapOrder::MAX_LEN;

    fn pack_into_slice(&self, dst: &mut [u8]) {
        // `Pack::pack` only hands over `LEN` bytes, which fits any order
        if let Err(err) = self.write(dst) {
            log::error!("order does not fit {} bytes: {}", dst.len(), err);
        }
    }

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        Self::decode_unchecked(src).map_err(|err| SwapError::from(err).into())
    }
}

/// Account bytes of an order, field for field.
///
/// Integers are little endian. An option is a tag byte (0 absent, 1 present)
/// followed by the key only when present.
#[derive(BorshSerialize, BorshDeserialize)]
struct OrderLayout {
    is_initialized: u8,
    maker: [u8; 32],
    taker: Option<[u8; 32]>,
    maker_token_mint: [u8; 32],
    taker_token_mint: [u8; 32],
    maker_amount: u64,
    taker_amount: u64,
    maker_token_account: [u8; 32],
    taker_token_account: Option<[u8; 32]>,
    state: u8,
}

impl From<&SwapOrder> for OrderLayout {
    fn from(order: &SwapOrder) -> Self {
        Self {
            is_initialized: order.initialized as u8,
            maker: order.maker.to_bytes(),
            taker: order.taker.map(|key| key.to_bytes()),
            maker_token_mint: order.maker_mint.to_bytes(),
            taker_token_mint: order.taker_mint.to_bytes(),
            maker_amount: order.maker_amount,
            taker_amount: order.taker_amount,
            maker_token_account: order.maker_token_account.to_bytes(),
            taker_token_account: order.taker_token_account.map(|key| key.to_bytes()),
            state: order.state as u8,
        }
    }
}

impl TryFrom<OrderLayout> for SwapOrder {
    type Error = DecodeError;

    fn try_from(layout: OrderLayout) -> Result<Self, Self::Error> {
        Ok(Self {
            initialized: layout.is_initialized != 0,
            maker: Pubkey::new_from_array(layout.maker),
            taker: layout.taker.map(Pubkey::new_from_array),
            maker_mint: Pubkey::new_from_array(layout.maker_token_mint),
            taker_mint: Pubkey::new_from_array(layout.taker_token_mint),
            maker_amount: layout.maker_amount,
            taker_amount: layout.taker_amount,
            maker_token_account: Pubkey::new_from_array(layout.maker_token_account),
            taker_token_account: layout.taker_token_account.map(Pubkey::new_from_array),
            state: OrderState::try_from(layout.state)?,
        })
    }
}

/// Names a layout failure that borsh reports only as invalid data.
///
/// `src` already holds `MIN_LEN` bytes, so the taker tag and, with no
/// taker, the second tag are always present.
fn classify(src: &[u8]) -> DecodeError {
    const TAKER_TAG: usize = 1 + PUBKEY_BYTES;
    // mints, amounts and the maker token account sit between the two options
    const BETWEEN_TAGS: usize = PUBKEY_BYTES * 2 + 8 + 8 + PUBKEY_BYTES;

    let taker_tag = src.get(TAKER_TAG).copied();
    let taker_len = if taker_tag == Some(1) { PUBKEY_BYTES } else { 0 };
    let second_tag = src.get(TAKER_TAG + 1 + taker_len + BETWEEN_TAGS).copied();
    let unknown = |tag: Option<u8>| tag.map_or(false, |tag| tag > 1);
    if unknown(taker_tag) || unknown(second_tag) {
        DecodeError::UnknownTag
    } else {
        DecodeError::Truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> SwapOrder {
        SwapOrder::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            1_000,
            2_000,
            Pubkey::new_unique(),
        )
        .unwrap()
    }

    #[test]
    fn layout_sizes() {
        assert_eq!(SwapOrder::MIN_LEN, 148);
        assert_eq!(SwapOrder::MAX_LEN, 212);
        assert_eq!(SwapOrder::get_packed_len(), SwapOrder::MAX_LEN);
    }

    #[test]
    fn absent_taker_is_one_tag_byte() {
        let order = created();
        let data = order.encode().unwrap();
        assert_eq!(data.len(), SwapOrder::MIN_LEN);
        assert_eq!(data[33], 0x00);
        assert_eq!(&data[34..66], order.maker_mint.as_ref());
    }

    #[test]
    fn present_taker_is_tag_and_key() {
        let mut order = created();
        let taker = Pubkey::new_unique();
        order.assign_taker(taker, Pubkey::new_unique()).unwrap();
        let data = order.encode().unwrap();
        assert_eq!(data[33], 0x01);
        assert_eq!(&data[34..66], taker.as_ref());
        assert_eq!(data.len(), SwapOrder::MAX_LEN);
    }

    #[test]
    fn short_buffer_is_truncated() {
        assert_eq!(SwapOrder::decode_unchecked(&[0u8; 5]), Err(DecodeError::Truncated));
    }

    #[test]
    fn present_option_past_end_is_truncated() {
        let mut data = created().encode().unwrap();
        data[33] = 1;
        assert_eq!(SwapOrder::decode_unchecked(&data), Err(DecodeError::Truncated));
    }

    #[test]
    fn unknown_state_byte() {
        let mut data = created().encode().unwrap();
        *data.last_mut().unwrap() = 0x07;
        assert_eq!(SwapOrder::decode_unchecked(&data), Err(DecodeError::UnknownState));
    }

    #[test]
    fn unknown_taker_tag() {
        let mut data = created().encode().unwrap();
        data[33] = 2;
        assert_eq!(SwapOrder::decode_unchecked(&data), Err(DecodeError::UnknownTag));
    }

    #[test]
    fn unknown_taker_token_account_tag() {
        let mut order = created();
        order
            .assign_taker(Pubkey::new_unique(), Pubkey::new_unique())
            .unwrap();
        let mut data = order.encode().unwrap();
        data[178] = 7;
        assert_eq!(SwapOrder::decode_unchecked(&data), Err(DecodeError::UnknownTag));

        let mut data = created().encode().unwrap();
        data[146] = 0xff;
        assert_eq!(SwapOrder::decode_unchecked(&data), Err(DecodeError::UnknownTag));
    }

    #[test]
    fn any_nonzero_initialized_byte_is_set() {
        let mut data = created().encode().unwrap();
        data[0] = 2;
        assert!(SwapOrder::decode_unchecked(&data).unwrap().initialized);
    }

    #[test]
    fn trailing_padding_is_ignored() {
        let order = created();
        let mut account = vec![0xffu8; SwapOrder::MAX_LEN];
        order.encode_into(&mut account).unwrap();
        assert!(account[SwapOrder::MIN_LEN..].iter().all(|b| *b == 0));
        assert_eq!(SwapOrder::decode_unchecked(&account).unwrap(), order);
    }

    #[test]
    fn encode_into_small_slice() {
        let mut account = vec![0u8; SwapOrder::MIN_LEN - 1];
        assert_eq!(
            created().encode_into(&mut account),
            Err(SwapError::AccountDataTooSmall)
        );
        assert!(account.iter().all(|b| *b == 0));
    }

    #[test]
    fn inconsistent_taker_fields_do_not_encode() {
        let mut order = created();
        order.taker = Some(Pubkey::new_unique());
        assert_eq!(order.encode(), Err(SwapError::InvalidOrder));
    }

    #[test]
    fn zeroed_account_decodes_only_unchecked() {
        let account = [0u8; SwapOrder::MAX_LEN];
        let raw = SwapOrder::decode_unchecked(&account).unwrap();
        assert!(!raw.initialized);
        assert_eq!(raw.maker_amount, 0);
        assert_eq!(SwapOrder::decode(&account), Err(SwapError::InvalidOrder));
    }

    #[test]
    fn pack_round_trip_through_account() {
        let mut order = created();
        order
            .assign_taker(Pubkey::new_unique(), Pubkey::new_unique())
            .unwrap();
        let mut account = [0xaau8; SwapOrder::LEN];
        SwapOrder::pack(order, &mut account).unwrap();
        assert_eq!(SwapOrder::unpack(&account).unwrap(), order);
        assert_eq!(&account[..], &order.encode().unwrap()[..]);
    }

    #[test]
    fn pack_rejects_uninitialized_account() {
        let account = [0u8; SwapOrder::LEN];
        assert_eq!(
            SwapOrder::unpack(&account),
            Err(ProgramError::UninitializedAccount)
        );
        assert!(SwapOrder::unpack_unchecked(&account).is_ok());
    }

    #[test]
    fn pack_surfaces_decode_errors() {
        let mut account = [0u8; SwapOrder::LEN];
        SwapOrder::pack(created(), &mut account).unwrap();
        account[SwapOrder::MIN_LEN - 1] = 9;
        assert_eq!(
            SwapOrder::unpack(&account),
            Err(SwapError::from(DecodeError::UnknownState).into())
        );
    }
}
