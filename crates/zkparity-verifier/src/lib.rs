//! zkparity Verifier
//!
//! On-ledger half of the parity vote: strict decoding of `vote` calldata into
//! BN254 points, the Groth16 pairing check against an embedded verification
//! key, and the tally contract that counts accepted proofs.

pub mod codec;
pub mod contract;
pub mod verifier;
pub mod vk_components;

#[cfg(test)]
mod test_circuit;

pub use codec::{encode_calldata, CodecError};
pub use contract::{TallyState, VerificationRejected, VoteTally};
pub use verifier::{Groth16Verifier, VerifyError};
pub use vk_components::VkComponents;

use zkparity_runtime::VoteCalldata;

/// Check a `vote` call against a verification key without touching any tally.
pub fn verify(components: &VkComponents, calldata: &VoteCalldata) -> Result<bool, VerifyError> {
    Groth16Verifier::from_components(components)?.verify_calldata(calldata)
}
