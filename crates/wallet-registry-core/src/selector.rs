//! Primary wallet selection
//!
//! Both functions are pure and total: they never panic, and the same input
//! always yields the same row.

use wallet_registry_db::WalletRecord;

/// Ethereum mainnet, preferred when no other hint applies
pub const DEFAULT_NAMESPACE: &str = "eip155:1";

/// Pick the row that carries the primary flag for an address.
///
/// Order of preference:
/// 1. a row on `preferred_namespace`, if supplied and present
/// 2. a row on [`DEFAULT_NAMESPACE`]
/// 3. the oldest row, smallest `id` breaking ties
///
/// When several rows satisfy the same rule the oldest of them wins.
pub fn select_representative<'a>(
    candidates: &'a [WalletRecord],
    preferred_namespace: Option<&str>,
) -> Option<&'a WalletRecord> {
    if let Some(preferred) = preferred_namespace {
        let hit = oldest(
            candidates
                .iter()
                .filter(|row| row.chain_namespace == preferred),
        );
        if hit.is_some() {
            return hit;
        }
    }

    select_reassignment_candidate(candidates)
}

/// Pick the successor after the primary row has been deleted.
///
/// Mainnet rows first, then the oldest row, smallest `id` breaking ties.
pub fn select_reassignment_candidate(remaining: &[WalletRecord]) -> Option<&WalletRecord> {
    oldest(
        remaining
            .iter()
            .filter(|row| row.chain_namespace == DEFAULT_NAMESPACE),
    )
    .or_else(|| oldest(remaining.iter()))
}

fn oldest<'a>(rows: impl Iterator<Item = &'a WalletRecord>) -> Option<&'a WalletRecord> {
    rows.min_by_key(|row| (row.created_at, row.id))
}
