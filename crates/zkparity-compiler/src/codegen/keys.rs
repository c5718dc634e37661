//! Proving and Verification Key Management
//!
//! Runs the Groth16 trusted setup for a compiled circuit and caches the result
//! under a directory:
//!
//! - `proving.key`: the key blob (raw bytes)
//! - `proving.key.b64`: the same blob, base64 encoded for transport
//! - `verification_key.json`: [`VkComponents`] to embed in the tally contract
//! - `metadata.json`: [`KeyMetadata`] describing the circuit the keys belong to
//!
//! Key blob layout: magic `ZKPK`, format (u16 BE), circuit version (u32 BE),
//! circuit fingerprint (32 bytes), arkworks compressed `ProvingKey<Bn254>`.

use crate::circuit::CompiledCircuit;
use anyhow::{bail, Context};
use ark_bn254::Bn254;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use zkparity_runtime::{Result, VoteError};
use zkparity_verifier::VkComponents;

pub const KEY_BLOB_MAGIC: &[u8; 4] = b"ZKPK";
pub const KEY_BLOB_FORMAT: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 4 + 32;

pub const PROVING_KEY_FILE: &str = "proving.key";
pub const PROVING_KEY_B64_FILE: &str = "proving.key.b64";
pub const VERIFICATION_KEY_FILE: &str = "verification_key.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Versioned, fingerprinted container for a proving key
pub struct KeyBlob {
    circuit_version: u32,
    fingerprint: [u8; 32],
    proving_key: ProvingKey<Bn254>,
}

impl fmt::Debug for KeyBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBlob")
            .field("circuit_version", &self.circuit_version)
            .field("fingerprint", &hex::encode(self.fingerprint))
            .finish_non_exhaustive()
    }
}

impl KeyBlob {
    pub fn new(circuit: &CompiledCircuit, proving_key: ProvingKey<Bn254>) -> Self {
        Self { circuit_version: circuit.version(), fingerprint: *circuit.fingerprint(), proving_key }
    }

    pub fn circuit_version(&self) -> u32 {
        self.circuit_version
    }

    pub fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }

    pub fn proving_key(&self) -> &ProvingKey<Bn254> {
        &self.proving_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.proving_key.vk
    }

    pub fn verification_components(&self) -> VkComponents {
        VkComponents::from_verifying_key(&self.proving_key.vk)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.proving_key.compressed_size());
        out.extend_from_slice(KEY_BLOB_MAGIC);
        out.extend_from_slice(&KEY_BLOB_FORMAT.to_be_bytes());
        out.extend_from_slice(&self.circuit_version.to_be_bytes());
        out.extend_from_slice(&self.fingerprint);
        self.proving_key
            .serialize_compressed(&mut out)
            .map_err(|e| VoteError::serialization(format!("Failed to encode proving key: {}", e)))?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(VoteError::proving_key("key blob is truncated"));
        }
        if &bytes[0..4] != KEY_BLOB_MAGIC {
            return Err(VoteError::proving_key("key blob has the wrong magic"));
        }

        let format = u16::from_be_bytes([bytes[4], bytes[5]]);
        if format != KEY_BLOB_FORMAT {
            return Err(VoteError::proving_key(format!(
                "unsupported key blob format {}, expected {}",
                format, KEY_BLOB_FORMAT
            )));
        }

        let circuit_version = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let mut fingerprint = [0u8; 32];
        fingerprint.copy_from_slice(&bytes[10..HEADER_LEN]);

        let proving_key = ProvingKey::<Bn254>::deserialize_compressed(&bytes[HEADER_LEN..])
            .map_err(|e| VoteError::proving_key(format!("malformed proving key: {}", e)))?;

        Ok(Self { circuit_version, fingerprint, proving_key })
    }

    pub fn to_base64(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| VoteError::proving_key(format!("proving key is not valid base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Confirm that this key was generated for `circuit`.
    pub fn check_circuit(&self, circuit: &CompiledCircuit) -> Result<()> {
        if self.circuit_version != circuit.version() {
            return Err(VoteError::proving_key(format!(
                "key was generated for circuit version {}, circuit is version {}",
                self.circuit_version,
                circuit.version()
            )));
        }
        if &self.fingerprint != circuit.fingerprint() {
            return Err(VoteError::proving_key(format!(
                "key fingerprint {} does not match circuit {}",
                hex::encode(self.fingerprint),
                circuit.fingerprint_hex()
            )));
        }

        let inputs = self.proving_key.vk.gamma_abc_g1.len();
        if inputs != circuit.num_public() + 1 {
            return Err(VoteError::proving_key(format!(
                "key has {} input bases, circuit needs {}",
                inputs,
                circuit.num_public() + 1
            )));
        }
        let witnesses = self.proving_key.l_query.len();
        if witnesses != circuit.num_private() {
            return Err(VoteError::proving_key(format!(
                "key covers {} private wires, circuit has {}",
                witnesses,
                circuit.num_private()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub circuit_name: String,
    pub circuit_version: u32,
    pub fingerprint: String,
    pub num_wires: usize,
    pub num_constraints: usize,
    pub num_public_inputs: usize,
    pub num_private_witnesses: usize,
}

impl KeyMetadata {
    pub fn for_circuit(circuit: &CompiledCircuit) -> Self {
        Self {
            circuit_name: circuit.name().to_string(),
            circuit_version: circuit.version(),
            fingerprint: circuit.fingerprint_hex(),
            num_wires: circuit.num_wires(),
            num_constraints: circuit.num_constraints(),
            num_public_inputs: circuit.num_public(),
            num_private_witnesses: circuit.num_private(),
        }
    }
}

/// Run the Groth16 setup for `circuit`.
pub fn trusted_setup<R: RngCore + CryptoRng>(
    circuit: &CompiledCircuit,
    rng: &mut R,
) -> Result<KeyBlob> {
    let (pk, _vk) = Groth16::<Bn254>::circuit_specific_setup(circuit.synthesizer(None), rng)
        .map_err(|e| VoteError::proof_generation(format!("Trusted setup failed: {}", e)))?;
    Ok(KeyBlob::new(circuit, pk))
}

pub struct KeyManager {
    cache_dir: PathBuf,
}

impl KeyManager {
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> anyhow::Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir).context("Failed to create key cache directory")?;

        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn proving_key_path(&self) -> PathBuf {
        self.cache_dir.join(PROVING_KEY_FILE)
    }

    pub fn proving_key_b64_path(&self) -> PathBuf {
        self.cache_dir.join(PROVING_KEY_B64_FILE)
    }

    pub fn verification_key_path(&self) -> PathBuf {
        self.cache_dir.join(VERIFICATION_KEY_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.cache_dir.join(METADATA_FILE)
    }

    pub fn has_keys(&self) -> bool {
        self.proving_key_path().exists() && self.verification_key_path().exists()
    }

    /// Load cached keys for `circuit`, running the setup only when none fit.
    pub fn generate_keys<R: RngCore + CryptoRng>(
        &self,
        circuit: &CompiledCircuit,
        rng: &mut R,
    ) -> anyhow::Result<(KeyBlob, VkComponents)> {
        if self.has_keys() {
            match self.load_keys(circuit) {
                Ok(keys) => {
                    info!(dir = %self.cache_dir.display(), "Loaded cached keys");
                    return Ok(keys);
                }
                Err(e) => warn!(error = %e, "Cached keys do not fit the circuit, regenerating"),
            }
        }

        self.setup(circuit, rng)
    }

    /// Run a fresh setup and overwrite any cached keys.
    pub fn setup<R: RngCore + CryptoRng>(
        &self,
        circuit: &CompiledCircuit,
        rng: &mut R,
    ) -> anyhow::Result<(KeyBlob, VkComponents)> {
        info!(
            circuit = circuit.name(),
            fingerprint = %circuit.fingerprint_hex(),
            "Generating Groth16 keys"
        );

        let blob = trusted_setup(circuit, rng)?;
        let components = blob.verification_components();

        self.save_key_blob(&blob)?;
        self.save_verification_key(&components)?;
        self.save_metadata(&KeyMetadata::for_circuit(circuit))?;

        Ok((blob, components))
    }

    pub fn load_keys(&self, circuit: &CompiledCircuit) -> anyhow::Result<(KeyBlob, VkComponents)> {
        let blob = self.load_key_blob()?;
        blob.check_circuit(circuit)?;

        let components = self.load_verification_key()?;
        if components != blob.verification_components() {
            bail!("Cached verification key does not belong to the cached proving key");
        }
        Ok((blob, components))
    }

    fn save_key_blob(&self, blob: &KeyBlob) -> anyhow::Result<()> {
        let bytes = blob.to_bytes()?;
        fs::write(self.proving_key_path(), &bytes).context("Failed to write proving key")?;
        fs::write(self.proving_key_b64_path(), blob.to_base64()?)
            .context("Failed to write base64 proving key")?;

        info!(path = ?self.proving_key_path(), bytes = bytes.len(), "Saved proving key");
        Ok(())
    }

    pub fn load_key_blob(&self) -> anyhow::Result<KeyBlob> {
        let path = self.proving_key_path();
        let bytes =
            fs::read(&path).context(format!("Failed to read proving key at {:?}", path))?;
        Ok(KeyBlob::from_bytes(&bytes)?)
    }

    fn save_verification_key(&self, components: &VkComponents) -> anyhow::Result<()> {
        let json = components.to_json().context("Failed to serialize verification key")?;
        fs::write(self.verification_key_path(), json)
            .context("Failed to write verification key")?;
        Ok(())
    }

    pub fn load_verification_key(&self) -> anyhow::Result<VkComponents> {
        let path = self.verification_key_path();
        let json = fs::read_to_string(&path)
            .context(format!("Failed to read verification key at {:?}", path))?;
        VkComponents::from_json(&json).context("Failed to deserialize verification key")
    }

    fn save_metadata(&self, metadata: &KeyMetadata) -> anyhow::Result<()> {
        let metadata_json =
            serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
        fs::write(self.metadata_path(), metadata_json).context("Failed to write metadata file")?;
        Ok(())
    }

    pub fn load_metadata(&self) -> anyhow::Result<KeyMetadata> {
        let meta_path = self.metadata_path();
        let content = fs::read_to_string(&meta_path)
            .context(format!("Failed to read metadata file at {:?}", meta_path))?;

        serde_json::from_str(&content).context("Failed to deserialize metadata")
    }
}
