//! Client order id generation
//!
//! Futures client order ids must match `^[.A-Z:/a-z0-9_-]{1,36}$`.

use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Longest client order id the exchange accepts
pub const MAX_CLIENT_ORDER_ID_LEN: usize = 36;

/// Random characters in a generated id
pub const RANDOM_ID_LEN: usize = 21;

const ID_ALPHABET: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
    'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z',
];

/// Caller-assigned order id (`newClientOrderId` / `origClientOrderId`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Generate a fresh `PB`-prefixed id
    pub fn generate() -> Self {
        Self(generate_id_with_prefix("PB"))
    }

    /// Wrap an existing id, rejecting ones the exchange would refuse
    pub fn parse(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        is_valid_client_order_id(&id).then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate an alphanumeric id of `len` characters
pub fn generate_id(len: usize) -> String {
    nanoid!(len, &ID_ALPHABET)
}

/// Generate `{prefix}{random}` with [`RANDOM_ID_LEN`] random characters,
/// fewer when the prefix leaves less room under [`MAX_CLIENT_ORDER_ID_LEN`]
pub fn generate_id_with_prefix(prefix: &str) -> String {
    let random_len = MAX_CLIENT_ORDER_ID_LEN.saturating_sub(prefix.len()).min(RANDOM_ID_LEN);
    if random_len == 0 {
        return prefix.to_string();
    }
    format!("{prefix}{}", generate_id(random_len))
}

pub fn is_valid_client_order_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_CLIENT_ORDER_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '/' | '_' | '-'))
}
