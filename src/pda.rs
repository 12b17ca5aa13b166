use solana_program::pubkey::{Pubkey, MAX_SEEDS, MAX_SEED_LEN};

use crate::error::SwapError;

/// Prefix seed of every order address.
pub const ORDER_SEED: &[u8] = b"order";

/// Finds the first off-curve address for `seeds`, searching bumps from 255 down.
///
/// Each candidate hashes `seeds ++ [bump] ++ program_id` with the
/// derived-address marker; the first one off the ed25519 curve has no
/// private key.
pub fn find_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), SwapError> {
    // one slot is reserved for the bump
    if seeds.len() >= MAX_SEEDS || seeds.iter().any(|seed| seed.len() > MAX_SEED_LEN) {
        log::warn!("rejecting {} seeds for address derivation", seeds.len());
        return Err(SwapError::AddressDerivationFailure);
    }
    Pubkey::try_find_program_address(seeds, program_id).ok_or(SwapError::AddressDerivationFailure)
}

/// Address of the order for `(maker, maker_mint, taker_mint)` under `program_id`.
pub fn find_order_address(
    maker: &Pubkey,
    maker_mint: &Pubkey,
    taker_mint: &Pubkey,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), SwapError> {
    let found = find_address(
        &[
            ORDER_SEED,
            maker.as_ref(),
            maker_mint.as_ref(),
            taker_mint.as_ref(),
        ],
        program_id,
    )?;
    log::debug!("order address {} (bump {}) for maker {}", found.0, found.1, maker);
    Ok(found)
}
