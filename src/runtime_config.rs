//! # Runtime Configuration Module
//!
//! Environment variable based configuration for contract construction.
//!
//! ## Environment Variables
//!
//! ### `OAPI3_EXTERNAL_REFS`
//!
//! Whether `$ref` pointers may load other documents through the `file:` scheme
//! while the contract is being built. Accepts `on`/`off` (also `true`/`false`,
//! `1`/`0`).
//!
//! Default: `on`
//!
//! ### `OAPI3_MAX_REF_CHAIN`
//!
//! Maximum number of `$ref` → `$ref` hops followed when resolving a single
//! structural node (path item, parameter, request body, response, schema).
//! Longer chains fail construction with [`DocumentError::RefChainTooLong`].
//!
//! Default: `32`
//!
//! ## Usage
//!
//! ```rust
//! use oapi3::runtime_config::ContractConfig;
//!
//! let config = ContractConfig::from_env();
//! println!("external refs: {}", config.external_refs);
//! ```
//!
//! [`DocumentError::RefChainTooLong`]: crate::error::DocumentError::RefChainTooLong

use std::env;

const DEFAULT_MAX_REF_CHAIN: usize = 32;

/// Construction-time configuration for a contract document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractConfig {
    /// Allow `file:` references to documents other than the root contract
    pub external_refs: bool,
    /// Maximum `$ref` hops followed for one structural node
    pub max_ref_chain: usize,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            external_refs: true,
            max_ref_chain: DEFAULT_MAX_REF_CHAIN,
        }
    }
}

impl ContractConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let external_refs = match env::var("OAPI3_EXTERNAL_REFS") {
            Ok(val) => parse_switch(&val).unwrap_or(true),
            Err(_) => true,
        };
        let max_ref_chain = match env::var("OAPI3_MAX_REF_CHAIN") {
            Ok(val) => val.trim().parse().unwrap_or(DEFAULT_MAX_REF_CHAIN),
            Err(_) => DEFAULT_MAX_REF_CHAIN,
        };
        ContractConfig {
            external_refs,
            max_ref_chain,
        }
    }
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
