//! Staking identity generation and node id derivation.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::StakingIdentity;
use crate::protocol::error::Result;

/// Subject alternative name placed in generated staking certificates.
const STAKING_CERT_SAN: &str = "netrunner-staker";

/// Length in bytes of a node id.
pub const NODE_ID_LEN: usize = 20;

/// Node identifier derived from a staking certificate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId([u8; NODE_ID_LEN]);

impl NodeId {
    /// Derives the id from certificate bytes: the first 20 bytes of their
    /// SHA-256 digest.
    pub fn from_cert(cert: &[u8]) -> Self {
        let digest = Sha256::digest(cert);
        let mut id = [0u8; NODE_ID_LEN];
        id.copy_from_slice(&digest[..NODE_ID_LEN]);
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeID-{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Generates a fresh self-signed staking certificate and key.
///
/// Every call produces new key material; nothing is cached.
pub fn generate_staking_identity() -> Result<StakingIdentity> {
    let certified = rcgen::generate_simple_self_signed(vec![STAKING_CERT_SAN.to_string()])?;
    Ok(StakingIdentity {
        cert_pem: certified.cert.pem().into_bytes(),
        key_pem: certified.key_pair.serialize_pem().into_bytes(),
    })
}
