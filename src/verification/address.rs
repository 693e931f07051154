use crate::models::{ChainFamily, ChainScopeError, Result};

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn is_base58(s: &str) -> bool {
    s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

fn invalid(message: impl Into<String>) -> ChainScopeError {
    ChainScopeError::InvalidAddress(message.into())
}

/// Checks that `address` is well-formed for `family`. Surrounding whitespace
/// is ignored.
pub fn validate_address(address: &str, family: ChainFamily) -> Result<()> {
    let address = address.trim();

    if address.is_empty() {
        return Err(invalid("Address cannot be empty"));
    }

    match family {
        ChainFamily::Evm => validate_evm_address(address),
        ChainFamily::Starknet => validate_starknet_address(address),
        ChainFamily::Solana => validate_solana_address(address),
        ChainFamily::Cosmos => validate_cosmos_address(address),
        ChainFamily::Substrate => validate_substrate_address(address),
    }
}

/// `0x` followed by 40 hex characters.
fn validate_evm_address(address: &str) -> Result<()> {
    let Some(body) = address.strip_prefix("0x") else {
        return Err(invalid(
            "EVM address must start with 0x. Example: 0x3ca17667BBFC93db8bf2866E167C784B33220ACA",
        ));
    };

    let length = address.chars().count();
    if length != 42 {
        return Err(invalid(format!(
            "EVM address must be 42 characters (0x + 40 hex characters). Got {} characters.",
            length
        )));
    }

    hex::decode(body).map_err(|_| {
        invalid("EVM address must contain only hexadecimal characters (0-9, a-f, A-F)")
    })?;

    Ok(())
}

/// `0x` followed by 1 to 64 hex characters (a felt252).
fn validate_starknet_address(address: &str) -> Result<()> {
    let Some(body) = address.strip_prefix("0x") else {
        return Err(invalid("Starknet address must start with 0x"));
    };

    let length = address.chars().count();
    if !(3..=66).contains(&length) {
        return Err(invalid(format!(
            "Starknet address must be between 3 and 66 characters. Got {} characters.",
            length
        )));
    }

    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(
            "Starknet address must contain only hexadecimal characters (0-9, a-f, A-F)",
        ));
    }

    Ok(())
}

fn validate_solana_address(address: &str) -> Result<()> {
    if address.starts_with("0x") {
        return Err(invalid(
            "Solana addresses do not start with 0x. They are Base58 encoded strings.",
        ));
    }

    let length_ok = (32..=44).contains(&address.chars().count());
    if !length_ok || !is_base58(address) || bs58::decode(address).into_vec().is_err() {
        return Err(invalid(
            "Invalid Solana address format. Must be 32-44 Base58 characters. Example: EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        ));
    }

    Ok(())
}

/// Bech32-shaped: lowercase prefix, separator `1`, 38 to 58 lowercase alphanumerics.
fn validate_cosmos_address(address: &str) -> Result<()> {
    let well_formed = match address.split_once('1') {
        Some((prefix, data)) => {
            !prefix.is_empty()
                && prefix.chars().all(|c| c.is_ascii_lowercase())
                && (38..=58).contains(&data.len())
                && data
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        }
        None => false,
    };

    if !well_formed {
        return Err(invalid(
            "Invalid Cosmos address format. Must be Bech32 encoded (e.g., cosmos1..., osmo1...)",
        ));
    }

    Ok(())
}

/// SS58-shaped: a leading 1-5 followed by 46 or 47 Base58 characters.
fn validate_substrate_address(address: &str) -> Result<()> {
    let mut chars = address.chars();
    let well_formed = match chars.next() {
        Some(first @ '1'..='5') => {
            let rest = &address[first.len_utf8()..];
            (46..=47).contains(&rest.len()) && is_base58(rest)
        }
        _ => false,
    };

    if !well_formed {
        return Err(invalid(
            "Invalid Substrate address format. Must be SS58 encoded.",
        ));
    }

    Ok(())
}

pub fn address_placeholder(family: ChainFamily) -> &'static str {
    match family {
        ChainFamily::Evm => "0x3ca17667BBFC93db8bf2866E167C784B33220ACA",
        ChainFamily::Starknet => {
            "0x07070d915635269ea0930fa1c538f2d026e02e5078884aeb007141c39f481eee"
        }
        ChainFamily::Solana => "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        ChainFamily::Cosmos => "cosmos1...",
        ChainFamily::Substrate => "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
    }
}

pub fn address_format_description(family: ChainFamily) -> &'static str {
    match family {
        ChainFamily::Evm => {
            "EVM addresses are 42 characters: 0x followed by 40 hexadecimal characters"
        }
        ChainFamily::Starknet => {
            "Starknet addresses are 0x followed by up to 64 hexadecimal characters"
        }
        ChainFamily::Solana => {
            "Solana addresses are 32-44 Base58 encoded characters (no 0x prefix)"
        }
        ChainFamily::Cosmos => {
            "Cosmos addresses are Bech32 encoded with chain prefix (e.g., cosmos1...)"
        }
        ChainFamily::Substrate => {
            "Substrate addresses are SS58 encoded, typically 47-48 characters"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<()>) -> String {
        match result {
            Err(ChainScopeError::InvalidAddress(msg)) => msg,
            other => panic!("expected invalid address, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_address() {
        for family in ChainFamily::all() {
            assert_eq!(message(validate_address("   ", family)), "Address cannot be empty");
        }
    }

    #[test]
    fn test_evm_addresses() {
        assert!(validate_address(
            "0x742d35Cc6634C0532925a3b844Bc9e7595f6e842",
            ChainFamily::Evm
        )
        .is_ok());
        assert!(validate_address(
            "  0x3ca17667BBFC93db8bf2866E167C784B33220ACA\n",
            ChainFamily::Evm
        )
        .is_ok());

        assert!(message(validate_address("742d35Cc", ChainFamily::Evm)).contains("start with 0x"));
        assert!(message(validate_address("0x1234", ChainFamily::Evm)).contains("Got 6 characters"));
        assert!(message(validate_address(
            "0x742d35Cc6634C0532925a3b844Bc9e7595f6e84g",
            ChainFamily::Evm
        ))
        .contains("hexadecimal"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 42 characters, 43 bytes
        let accented = format!("0x{}é", "a".repeat(39));
        assert!(message(validate_address(&accented, ChainFamily::Evm)).contains("hexadecimal"));

        let long = format!("0x{}é", "a".repeat(40));
        assert!(message(validate_address(&long, ChainFamily::Evm)).contains("Got 43 characters"));

        assert!(message(validate_address("0xé", ChainFamily::Starknet)).contains("hexadecimal"));
    }

    #[test]
    fn test_starknet_addresses() {
        let placeholder = address_placeholder(ChainFamily::Starknet);
        assert!(validate_address(placeholder, ChainFamily::Starknet).is_ok());
        assert!(validate_address("0x1", ChainFamily::Starknet).is_ok());
        assert!(validate_address("0x", ChainFamily::Starknet).is_err());
        assert!(validate_address(&format!("0x{}", "a".repeat(65)), ChainFamily::Starknet).is_err());
        assert!(validate_address("0xnothex", ChainFamily::Starknet).is_err());
    }

    #[test]
    fn test_solana_addresses() {
        assert!(validate_address(
            "7VXNe1r6nTqVw6TKyBzt1TNSSQqPqNcEYizv8TduLWpU",
            ChainFamily::Solana
        )
        .is_ok());
        assert!(message(validate_address(
            "0x742d35Cc6634C0532925a3b844Bc9e7595f6e842",
            ChainFamily::Solana
        ))
        .contains("do not start with 0x"));
        // '0', 'O', 'I' and 'l' are outside the Base58 alphabet
        assert!(validate_address(
            "0VXNe1r6nTqVw6TKyBzt1TNSSQqPqNcEYizv8TduLWpU",
            ChainFamily::Solana
        )
        .is_err());
        assert!(validate_address("shortaddr", ChainFamily::Solana).is_err());
    }

    #[test]
    fn test_cosmos_addresses() {
        assert!(validate_address(
            "cosmos1hsk6jryyqjfhp5dhc55tc9jtckygx0eph6dd02",
            ChainFamily::Cosmos
        )
        .is_ok());
        assert!(validate_address(
            "osmo1hsk6jryyqjfhp5dhc55tc9jtckygx0eph6dd02",
            ChainFamily::Cosmos
        )
        .is_ok());
        assert!(validate_address("cosmos1short", ChainFamily::Cosmos).is_err());
        assert!(validate_address(
            "Cosmos1hsk6jryyqjfhp5dhc55tc9jtckygx0eph6dd02",
            ChainFamily::Cosmos
        )
        .is_err());
    }

    #[test]
    fn test_substrate_addresses() {
        assert!(validate_address(
            address_placeholder(ChainFamily::Substrate),
            ChainFamily::Substrate
        )
        .is_ok());
        assert!(validate_address(
            "6GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
            ChainFamily::Substrate
        )
        .is_err());
    }

    #[test]
    fn test_descriptions_cover_every_family() {
        for family in ChainFamily::all() {
            assert!(!address_format_description(family).is_empty());
            assert!(!address_placeholder(family).is_empty());
        }
    }
}
