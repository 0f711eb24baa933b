//! Format checks and normalization of caller-supplied identifiers
//!
//! These are shape checks only. The registry never asks a chain whether an
//! address exists.

use crate::{RegistryError, RegistryResult};

pub const MAX_ADDRESS_LEN: usize = 128;
pub const MAX_LABEL_LEN: usize = 64;

/// An address as supplied (trimmed) and in its comparison form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAddress {
    pub address: String,
    pub normalized: String,
}

/// Trim and lowercase an address, rejecting anything that cannot be one.
pub fn normalize_address(raw: &str) -> RegistryResult<NormalizedAddress> {
    let address = raw.trim();

    if address.is_empty() {
        return Err(RegistryError::Validation("address is required".to_string()));
    }
    if address.len() > MAX_ADDRESS_LEN {
        return Err(RegistryError::Validation(format!(
            "address exceeds {} characters",
            MAX_ADDRESS_LEN
        )));
    }
    if !address
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(RegistryError::Validation(format!(
            "address contains invalid characters: {}",
            address
        )));
    }

    Ok(NormalizedAddress {
        address: address.to_string(),
        normalized: address.to_ascii_lowercase(),
    })
}

/// Check a CAIP-2 chain id (`namespace:reference`) and return it trimmed.
pub fn normalize_namespace(raw: &str) -> RegistryResult<String> {
    let chain_namespace = raw.trim();

    let (namespace, reference) = chain_namespace.split_once(':').ok_or_else(|| {
        RegistryError::Validation(format!(
            "chain_namespace must look like namespace:reference, got {:?}",
            chain_namespace
        ))
    })?;

    let namespace_ok = (3..=8).contains(&namespace.len())
        && namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let reference_ok = (1..=32).contains(&reference.len())
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));

    if !namespace_ok || !reference_ok {
        return Err(RegistryError::Validation(format!(
            "invalid chain_namespace: {:?}",
            chain_namespace
        )));
    }

    Ok(chain_namespace.to_string())
}

/// Namespace-specific address shape. Only EVM chains are checked.
pub fn check_address_for_namespace(
    address: &NormalizedAddress,
    chain_namespace: &str,
) -> RegistryResult<()> {
    if !chain_namespace.starts_with("eip155:") {
        return Ok(());
    }

    let hex = address.normalized.strip_prefix("0x").unwrap_or_default();
    if hex.is_empty() || hex.len() > 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RegistryError::Validation(format!(
            "{} is not a hex address for {}",
            address.address, chain_namespace
        )));
    }

    Ok(())
}

/// Trim a label. Blank labels are dropped.
pub fn normalize_label(raw: Option<&str>) -> RegistryResult<Option<String>> {
    let Some(label) = raw.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };

    if label.chars().count() > MAX_LABEL_LEN {
        return Err(RegistryError::Validation(format!(
            "label exceeds {} characters",
            MAX_LABEL_LEN
        )));
    }

    Ok(Some(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        let addr = normalize_address("  0xAbCdEF  ").unwrap();
        assert_eq!(addr.address, "0xAbCdEF");
        assert_eq!(addr.normalized, "0xabcdef");

        assert!(normalize_address("").is_err());
        assert!(normalize_address("   ").is_err());
        assert!(normalize_address("0xab cd").is_err());
        assert!(normalize_address(&"a".repeat(MAX_ADDRESS_LEN + 1)).is_err());
    }

    #[test]
    fn test_normalize_namespace() {
        assert_eq!(normalize_namespace(" eip155:1 ").unwrap(), "eip155:1");
        assert!(normalize_namespace("eip155:137").is_ok());
        assert!(normalize_namespace("solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp").is_ok());

        assert!(normalize_namespace("eip155").is_err());
        assert!(normalize_namespace("EIP155:1").is_err());
        assert!(normalize_namespace("ab:1").is_err());
        assert!(normalize_namespace("eip155:").is_err());
    }

    #[test]
    fn test_evm_address_shape() {
        let ns = "eip155:1";
        assert!(check_address_for_namespace(&normalize_address("0xABC").unwrap(), ns).is_ok());
        assert!(check_address_for_namespace(
            &normalize_address("0x52908400098527886E0F7030069857D2E4169EE7").unwrap(),
            ns
        )
        .is_ok());

        assert!(check_address_for_namespace(&normalize_address("ABC").unwrap(), ns).is_err());
        assert!(check_address_for_namespace(&normalize_address("0x").unwrap(), ns).is_err());
        assert!(check_address_for_namespace(&normalize_address("0xZZZ").unwrap(), ns).is_err());

        // Non-EVM addresses are only shape-checked by normalize_address
        assert!(check_address_for_namespace(
            &normalize_address("7EcDhSYGxXyscszYEp35KHN8vvw3svAuLKTzXwCFLtV").unwrap(),
            "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp"
        )
        .is_ok());
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label(None).unwrap(), None);
        assert_eq!(normalize_label(Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_label(Some(" Main ")).unwrap(),
            Some("Main".to_string())
        );
        assert!(normalize_label(Some(&"x".repeat(MAX_LABEL_LEN + 1))).is_err());
    }
}
