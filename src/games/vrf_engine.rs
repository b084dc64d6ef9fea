use crate::errors::{RoyaleError, RoyaleResult, StorageError};
use crate::games::types::{VRFBundle, MAX_NUMBER};
use crate::storage::OptimizedStorage;
use schnorrkel::{ExpansionMode, Keypair, MiniSecretKey, PublicKey, Signature};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const VRF_SIGNING_CONTEXT: &[u8] = b"roulette-royale";

/// Storage key of the 32-byte mini secret the keypair is expanded from
pub const VRF_SEED_KEY: &[u8] = b"vrf:mini_secret_seed";

/// Pockets on the wheel
const POCKETS: u8 = MAX_NUMBER + 1;

/// Largest multiple of 37 that fits in a byte; bytes at or above it are skipped
const UNBIASED_BYTE_LIMIT: u8 = (256 / POCKETS as u16 * POCKETS as u16) as u8;

/// VRF-based winning number generator
pub struct VRFGameEngine {
    keypair: Arc<Keypair>,
}

impl VRFGameEngine {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Random keypair (for testing and the simulator)
    pub fn new_random() -> Self {
        use rand_core::OsRng;
        let keypair = Keypair::generate_with(OsRng);
        Self::new(keypair)
    }

    /// Deterministic keypair from a 32-byte seed
    pub fn from_seed(seed: &[u8]) -> RoyaleResult<Self> {
        let mini = MiniSecretKey::from_bytes(seed).map_err(|e| {
            RoyaleError::Storage(StorageError::CorruptedData(format!("Invalid VRF seed: {:?}", e)))
        })?;
        Ok(Self::new(mini.expand_to_keypair(ExpansionMode::Ed25519)))
    }

    /// Deterministic keypair from a hex seed, as given in configuration
    pub fn from_seed_hex(seed_hex: &str) -> RoyaleResult<Self> {
        let seed = hex::decode(seed_hex.trim()).map_err(|e| {
            RoyaleError::Storage(StorageError::CorruptedData(format!("Invalid VRF seed hex: {}", e)))
        })?;
        Self::from_seed(&seed)
    }

    /// Reuse the seed stored in RocksDB, or generate and store a new one.
    ///
    /// Keeping the seed stable keeps the public key stable across restarts,
    /// so proofs issued before a restart still verify against it.
    pub fn load_or_create(storage: &OptimizedStorage) -> RoyaleResult<Self> {
        let stored = storage
            .get(VRF_SEED_KEY)
            .map_err(|e| RoyaleError::Storage(StorageError::ReadFailed(e.to_string())))?;
        if let Some(existing) = stored {
            let seed: [u8; 32] = existing.try_into().map_err(|_| {
                RoyaleError::Storage(StorageError::CorruptedData(
                    "VRF seed must be 32 bytes".to_string(),
                ))
            })?;
            return Self::from_seed(&seed);
        }

        use rand_core::OsRng;
        let mini = MiniSecretKey::generate_with(OsRng);
        storage
            .put(VRF_SEED_KEY, &mini.to_bytes())
            .map_err(|e| RoyaleError::Storage(StorageError::WriteFailed(e.to_string())))?;

        Ok(Self::new(mini.expand_to_keypair(ExpansionMode::Ed25519)))
    }

    /// Input message bound into every proof
    pub fn input_message(round_id: &str, player_id: &str, nonce: u64) -> String {
        format!("{}:{}:{}", round_id, player_id, nonce)
    }

    /// Sign the round input and derive the VRF output from the signature
    pub fn generate_outcome(&self, round_id: &str, player_id: &str, nonce: u64) -> Result<VRFBundle, String> {
        let input_message = Self::input_message(round_id, player_id, nonce);
        let (vrf_output, vrf_proof) = self.vrf_sign(input_message.as_bytes())?;

        Ok(VRFBundle {
            vrf_output: hex::encode(vrf_output),
            vrf_proof: hex::encode(vrf_proof),
            public_key: self.public_key_hex(),
            input_message,
        })
    }

    fn vrf_sign(&self, message: &[u8]) -> Result<(Vec<u8>, Vec<u8>), String> {
        use schnorrkel::context::SigningContext;

        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let signature = self.keypair.sign(ctx.bytes(message));

        let mut hasher = Sha256::new();
        hasher.update(signature.to_bytes());
        let vrf_output = hasher.finalize().to_vec();

        Ok((vrf_output, signature.to_bytes().to_vec()))
    }

    /// Map a VRF output onto 0..=36.
    ///
    /// Takes the first byte below 222 modulo 37 so every pocket is equally
    /// likely. If all 32 bytes are 222 or above, falls back to the first
    /// eight bytes as a little-endian integer.
    pub fn compute_roulette_number(vrf_output: &[u8]) -> u8 {
        if let Some(byte) = vrf_output.iter().find(|&&b| b < UNBIASED_BYTE_LIMIT) {
            return byte % POCKETS;
        }

        let mut wide = [0u8; 8];
        for (slot, byte) in wide.iter_mut().zip(vrf_output.iter()) {
            *slot = *byte;
        }
        (u64::from_le_bytes(wide) % POCKETS as u64) as u8
    }

    /// Verify a VRF proof (public verification function)
    pub fn verify_vrf_proof(vrf_bundle: &VRFBundle, expected_input: &str) -> Result<bool, String> {
        if vrf_bundle.input_message != expected_input {
            return Ok(false);
        }

        let vrf_output =
            hex::decode(&vrf_bundle.vrf_output).map_err(|e| format!("Invalid VRF output hex: {}", e))?;
        let vrf_proof =
            hex::decode(&vrf_bundle.vrf_proof).map_err(|e| format!("Invalid VRF proof hex: {}", e))?;
        let public_key_bytes =
            hex::decode(&vrf_bundle.public_key).map_err(|e| format!("Invalid public key hex: {}", e))?;

        let public_key_array: [u8; 32] = public_key_bytes
            .try_into()
            .map_err(|_| "Public key must be 32 bytes")?;
        let public_key =
            PublicKey::from_bytes(&public_key_array).map_err(|e| format!("Invalid public key: {:?}", e))?;

        let signature_array: [u8; 64] = vrf_proof.try_into().map_err(|_| "Signature must be 64 bytes")?;
        let signature =
            Signature::from_bytes(&signature_array).map_err(|e| format!("Invalid signature: {:?}", e))?;

        use schnorrkel::context::SigningContext;
        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        if public_key.verify(ctx.bytes(expected_input.as_bytes()), &signature).is_err() {
            return Ok(false);
        }

        let mut hasher = Sha256::new();
        hasher.update(signature_array);
        let computed_output = hasher.finalize();

        Ok(computed_output.as_slice() == vrf_output.as_slice())
    }

    /// Verify the bundle and recompute the winning number it commits to
    pub fn verify_roulette_spin(vrf_bundle: &VRFBundle, expected_input: &str) -> Result<Option<u8>, String> {
        if !Self::verify_vrf_proof(vrf_bundle, expected_input)? {
            return Ok(None);
        }
        let vrf_output =
            hex::decode(&vrf_bundle.vrf_output).map_err(|e| format!("Invalid VRF output hex: {}", e))?;
        Ok(Some(Self::compute_roulette_number(&vrf_output)))
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.keypair.public.to_bytes().to_vec()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_vrf_generation_and_verification() {
        let engine = VRFGameEngine::new_random();

        let bundle = engine
            .generate_outcome("round-123", "player-456", 7)
            .expect("VRF generation failed");

        let expected_input = VRFGameEngine::input_message("round-123", "player-456", 7);
        assert_eq!(bundle.input_message, "round-123:player-456:7");
        let is_valid = VRFGameEngine::verify_vrf_proof(&bundle, &expected_input).expect("Verification failed");
        assert!(is_valid, "VRF proof should be valid");

        let n = VRFGameEngine::verify_roulette_spin(&bundle, &expected_input)
            .unwrap()
            .unwrap();
        assert!(n <= MAX_NUMBER);
    }

    #[test]
    fn test_vrf_tamper_detection() {
        let engine = VRFGameEngine::new_random();
        let mut bundle = engine.generate_outcome("round-1", "player-1", 0).unwrap();

        bundle.vrf_output = hex::encode(vec![0xff; 32]);

        let is_valid = VRFGameEngine::verify_vrf_proof(&bundle, "round-1:player-1:0").unwrap();
        assert!(!is_valid, "Tampered VRF should be invalid");
        assert_eq!(
            VRFGameEngine::verify_roulette_spin(&bundle, "round-1:player-1:0").unwrap(),
            None
        );
    }

    #[test]
    fn test_wrong_input_rejected() {
        let engine = VRFGameEngine::new_random();
        let bundle = engine.generate_outcome("round-1", "player-1", 0).unwrap();
        assert!(!VRFGameEngine::verify_vrf_proof(&bundle, "round-1:player-2:0").unwrap());
    }

    #[test]
    fn test_roulette_number_mapping() {
        assert_eq!(VRFGameEngine::compute_roulette_number(&[0]), 0);
        assert_eq!(VRFGameEngine::compute_roulette_number(&[36]), 36);
        assert_eq!(VRFGameEngine::compute_roulette_number(&[37]), 0);
        assert_eq!(VRFGameEngine::compute_roulette_number(&[221]), 221 % 37);
        // Biased bytes are skipped
        assert_eq!(VRFGameEngine::compute_roulette_number(&[222, 255, 40]), 3);
        // All biased: fall back to the wide value
        let all_high = [0xffu8; 32];
        assert_eq!(
            VRFGameEngine::compute_roulette_number(&all_high),
            (u64::MAX % 37) as u8
        );
    }

    #[test]
    fn test_every_byte_maps_uniformly() {
        let mut counts = [0u32; 37];
        for b in 0..UNBIASED_BYTE_LIMIT {
            counts[VRFGameEngine::compute_roulette_number(&[b]) as usize] += 1;
        }
        assert!(counts.iter().all(|&c| c == 6));
    }

    #[test]
    fn test_seed_persists_public_key() {
        let dir = TempDir::new().unwrap();
        let storage = OptimizedStorage::new(dir.path()).unwrap();

        let first = VRFGameEngine::load_or_create(&storage).unwrap();
        let second = VRFGameEngine::load_or_create(&storage).unwrap();
        assert_eq!(first.public_key_hex(), second.public_key_hex());
    }

    #[test]
    fn test_seed_hex() {
        let seed = hex::encode([7u8; 32]);
        let a = VRFGameEngine::from_seed_hex(&seed).unwrap();
        let b = VRFGameEngine::from_seed_hex(&seed).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert!(VRFGameEngine::from_seed_hex("abcd").is_err());
    }

    #[test]
    fn test_unreadable_seed_is_an_error_not_a_new_key() {
        let dir = TempDir::new().unwrap();
        let storage = OptimizedStorage::new(dir.path()).unwrap();
        storage.put(VRF_SEED_KEY, b"short").unwrap();

        assert!(matches!(
            VRFGameEngine::load_or_create(&storage),
            Err(RoyaleError::Storage(StorageError::CorruptedData(_)))
        ));
        assert_eq!(storage.get(VRF_SEED_KEY).unwrap(), Some(b"short".to_vec()));
    }
}
