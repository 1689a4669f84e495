use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("mixvote: incompatible group parameters")]
    IncompatibleParameters,

    #[error("mixvote: invalid group parameters: {0}")]
    InvalidGroupParameters(String),

    #[error("mixvote: invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("mixvote: randomness out of range - must be in [0, q)")]
    RandomnessOutOfRange,

    #[error("mixvote: element has no modular inverse")]
    NoInverse,

    #[error("mixvote: malformed artifact: {0}")]
    MalformedArtifact(String),

    #[error("mixvote: malformed artifact, JSON error: {0}")]
    JSONDeserialization(#[from] serde_json::Error),

    #[error("mixvote: worker pool error: {0}")]
    WorkerPool(String),

    #[error("mixvote: empty input")]
    EmptyInput,

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// Verification errors
///
/// These are always fatal to the operation in progress.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("mixvote validation: proof invalid")]
    ProofInvalid,

    #[error("mixvote validation: secret key proof invalid")]
    KeyProofInvalid,

    #[error("mixvote validation: invalid challenge")]
    InvalidChallenge,

    #[error("mixvote validation: mixing verification failed at round {round} cipher {cipher} bit {bit}")]
    MixingVerificationFailed { round: usize, cipher: usize, bit: u8 },

    #[error("mixvote validation: decryption factor proof failed for cipher {cipher}")]
    DecryptionProofFailed { cipher: usize },

    #[error("mixvote validation: plaintext mismatch")]
    PlaintextMismatch,

    #[error("mixvote validation: invalid encryption - ciphertext does not match randomness and plaintext")]
    EncryptionMismatch,

    #[error("mixvote validation: plaintext {0} exceeds maximum encoding {1} - cannot decode")]
    UndecodablePlaintext(String, String),
}
