//! Sigma protocols over the ElGamal group: Chaum-Pedersen equality of discrete
//! logarithms, its disjunctive (OR) composition, and Schnorr proofs of knowledge.
//!
//! Challenges for encryption and disjunctive proofs come from a caller-supplied
//! [`ChallengeGenerator`], which only ever sees the prover's commitments. Callers bind
//! any further context (election, ballot, voter) through the generator.

use crate::arith::{mod_div, mod_sub};
use crate::*;
use digest::Digest;
use num_bigint::BigUint;
use rand::{CryptoRng, Rng};
use sha2::Sha256;

/// Maps prover commitments to a challenge integer. The result is reduced mod q by the caller.
pub trait ChallengeGenerator {
    fn challenge(&self, elements: &[&BigUint]) -> BigUint;
}

/// Fiat-Shamir challenge generator: SHA-256 over a fixed context followed by the
/// hex encoding of each element.
#[derive(Debug, Clone)]
pub struct FiatShamir {
    context: Vec<u8>,
}

impl FiatShamir {
    pub fn new<C: AsRef<[u8]>>(context: C) -> Self {
        FiatShamir {
            context: context.as_ref().to_vec(),
        }
    }
}

impl ChallengeGenerator for FiatShamir {
    fn challenge(&self, elements: &[&BigUint]) -> BigUint {
        let mut hasher = Sha256::new();
        hasher.update(&self.context);
        hasher.update(b"\0");
        for element in elements {
            hasher.update(format!("{:x}:", element).as_bytes());
        }
        BigUint::from_bytes_be(&hasher.finalize())
    }
}

/// SHA-256 over the `"{:x}:"` encoding of each number, as an integer.
///
/// Used for proofs whose statement is fixed by the protocol (key registration and
/// decryption factors).
pub fn hash_numbers(numbers: &[&BigUint]) -> BigUint {
    let mut hasher = Sha256::new();
    for number in numbers {
        hasher.update(format!("{:x}:", number).as_bytes());
    }
    BigUint::from_bytes_be(&hasher.finalize())
}

/// Prover commitment `(A, B)` of a Chaum-Pedersen proof
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    #[serde(rename = "A", with = "serde_decimal")]
    pub a: BigUint,

    #[serde(rename = "B", with = "serde_decimal")]
    pub b: BigUint,
}

/// Chaum-Pedersen proof that `log_g1(h1) == log_g2(h2)`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChaumPedersenProof {
    pub commitment: Commitment,

    #[serde(with = "serde_decimal")]
    pub challenge: BigUint,

    #[serde(with = "serde_decimal")]
    pub response: BigUint,
}

/// Proof that a ciphertext encrypts a given plaintext, or (alone) that the prover
/// knows the encryption randomness.
pub type EncryptionProof = ChaumPedersenProof;

/// Proof that a ciphertext encrypts one of a list of plaintexts, without revealing which.
///
/// One branch per candidate plaintext, in the same order as the plaintext list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct DisjunctiveProof {
    pub proofs: Vec<ChaumPedersenProof>,
}

/// Schnorr proof of knowledge of `x` such that `y = g^x`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DLogProof {
    #[serde(with = "serde_decimal")]
    pub commitment: BigUint,

    #[serde(with = "serde_decimal")]
    pub challenge: BigUint,

    #[serde(with = "serde_decimal")]
    pub response: BigUint,
}

/// A branch of a disjunctive proof under construction
pub(crate) enum Branch {
    Simulated(ChaumPedersenProof),
    PendingReal { nonce: BigUint, commitment: Commitment },
}

/// Prove `log_g1(g1^secret) == log_g2(g2^secret)`.
///
/// `challenge` receives the commitment and returns the (unreduced) challenge.
pub(crate) fn prove_ddh<R, F>(
    rng: &mut R,
    params: &GroupParameters,
    g1: &BigUint,
    g2: &BigUint,
    secret: &BigUint,
    challenge: F,
) -> ChaumPedersenProof
where
    R: Rng + CryptoRng,
    F: FnOnce(&Commitment) -> BigUint,
{
    let nonce = params.random_exponent(rng);
    let commitment = Commitment {
        a: g1.modpow(&nonce, &params.modulus),
        b: g2.modpow(&nonce, &params.modulus),
    };
    let challenge = challenge(&commitment) % &params.order;
    let response = (nonce + secret * &challenge) % &params.order;

    ChaumPedersenProof {
        commitment,
        challenge,
        response,
    }
}

/// Check both sigma equations `g1^s == A * h1^c` and `g2^s == B * h2^c`.
///
/// The challenge itself is checked by the caller.
pub(crate) fn check_ddh(
    params: &GroupParameters,
    g1: &BigUint,
    h1: &BigUint,
    g2: &BigUint,
    h2: &BigUint,
    proof: &ChaumPedersenProof,
) -> bool {
    let p = &params.modulus;
    let Commitment { a, b } = &proof.commitment;

    if !params.in_range(a) || !params.in_range(b) || proof.challenge >= params.order {
        return false;
    }

    let first = g1.modpow(&proof.response, p) == (a * h1.modpow(&proof.challenge, p)) % p;
    let second = g2.modpow(&proof.response, p) == (b * h2.modpow(&proof.challenge, p)) % p;
    first && second
}

/// Check only the first sigma equation `g1^s == A * h1^c`
pub(crate) fn check_ddh_first(
    params: &GroupParameters,
    g1: &BigUint,
    h1: &BigUint,
    proof: &ChaumPedersenProof,
) -> bool {
    let p = &params.modulus;
    let a = &proof.commitment.a;

    if !params.in_range(a) || proof.challenge >= params.order {
        return false;
    }

    g1.modpow(&proof.response, p) == (a * h1.modpow(&proof.challenge, p)) % p
}

/// Produce an accepting transcript for an arbitrary statement by picking the challenge first
pub(crate) fn simulate_ddh<R: Rng + CryptoRng>(
    rng: &mut R,
    params: &GroupParameters,
    g1: &BigUint,
    h1: &BigUint,
    g2: &BigUint,
    h2: &BigUint,
) -> Result<ChaumPedersenProof, Error> {
    let p = &params.modulus;
    let challenge = params.random_exponent(rng);
    let response = params.random_exponent(rng);

    let a = mod_div(
        &g1.modpow(&response, p),
        &h1.modpow(&challenge, p),
        p,
    )?;
    let b = mod_div(
        &g2.modpow(&response, p),
        &h2.modpow(&challenge, p),
        p,
    )?;

    Ok(ChaumPedersenProof {
        commitment: Commitment { a, b },
        challenge,
        response,
    })
}

/// Build a disjunctive proof for the statements `(g1, h1, g2, h2s[i])`, where the
/// statement at `real_index` is witnessed by `secret`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn prove_disjunctive_ddh<R, G>(
    rng: &mut R,
    params: &GroupParameters,
    g1: &BigUint,
    h1: &BigUint,
    g2: &BigUint,
    h2s: &[BigUint],
    real_index: usize,
    secret: &BigUint,
    generator: &G,
) -> Result<DisjunctiveProof, Error>
where
    R: Rng + CryptoRng,
    G: ChallengeGenerator + ?Sized,
{
    if real_index >= h2s.len() {
        return Err(Error::InvalidEncoding(format!(
            "real index {} out of range for {} plaintexts",
            real_index,
            h2s.len()
        )));
    }

    // Phase one: every commitment is fixed before the overall challenge is known
    let mut branches = Vec::with_capacity(h2s.len());
    for (i, h2) in h2s.iter().enumerate() {
        if i == real_index {
            let nonce = params.random_exponent(rng);
            let commitment = Commitment {
                a: g1.modpow(&nonce, &params.modulus),
                b: g2.modpow(&nonce, &params.modulus),
            };
            branches.push(Branch::PendingReal { nonce, commitment });
        } else {
            branches.push(Branch::Simulated(simulate_ddh(rng, params, g1, h1, g2, h2)?));
        }
    }

    let mut elements = Vec::with_capacity(branches.len() * 2);
    for branch in branches.iter() {
        let commitment = match branch {
            Branch::Simulated(proof) => &proof.commitment,
            Branch::PendingReal { commitment, .. } => commitment,
        };
        elements.push(&commitment.a);
        elements.push(&commitment.b);
    }
    let total = generator.challenge(&elements) % &params.order;

    let simulated_sum = branches
        .iter()
        .filter_map(|branch| match branch {
            Branch::Simulated(proof) => Some(&proof.challenge),
            Branch::PendingReal { .. } => None,
        })
        .fold(BigUint::from(0u32), |acc, c| (acc + c) % &params.order);

    // Phase two: complete the real branch
    let proofs = branches
        .into_iter()
        .map(|branch| match branch {
            Branch::Simulated(proof) => proof,
            Branch::PendingReal { nonce, commitment } => {
                let challenge = mod_sub(&total, &simulated_sum, &params.order);
                let response = (nonce + secret * &challenge) % &params.order;
                ChaumPedersenProof {
                    commitment,
                    challenge,
                    response,
                }
            }
        })
        .collect();

    Ok(DisjunctiveProof { proofs })
}

/// Verify a disjunctive proof built by `prove_disjunctive_ddh`
pub(crate) fn verify_disjunctive_ddh<G>(
    params: &GroupParameters,
    g1: &BigUint,
    h1: &BigUint,
    g2: &BigUint,
    h2s: &[BigUint],
    proof: &DisjunctiveProof,
    generator: &G,
) -> Result<(), ValidationError>
where
    G: ChallengeGenerator + ?Sized,
{
    if proof.proofs.len() != h2s.len() || h2s.is_empty() {
        return Err(ValidationError::ProofInvalid);
    }

    for (branch, h2) in proof.proofs.iter().zip(h2s) {
        if !check_ddh(params, g1, h1, g2, h2, branch) {
            return Err(ValidationError::ProofInvalid);
        }
    }

    let mut elements = Vec::with_capacity(proof.proofs.len() * 2);
    for branch in proof.proofs.iter() {
        elements.push(&branch.commitment.a);
        elements.push(&branch.commitment.b);
    }
    let expected = generator.challenge(&elements) % &params.order;
    let sum = proof
        .proofs
        .iter()
        .fold(BigUint::from(0u32), |acc, branch| {
            (acc + &branch.challenge) % &params.order
        });

    if sum != expected {
        return Err(ValidationError::InvalidChallenge);
    }

    Ok(())
}

/// Schnorr proof of knowledge of `secret`, where `public = g^secret`
pub fn prove_dlog<R: Rng + CryptoRng>(
    rng: &mut R,
    params: &GroupParameters,
    secret: &BigUint,
    public: &BigUint,
) -> DLogProof {
    let nonce = params.random_exponent(rng);
    let commitment = params.pow_g(&nonce);
    let challenge = dlog_challenge(params, public, &commitment);
    let response = (nonce + secret * &challenge) % &params.order;

    DLogProof {
        commitment,
        challenge,
        response,
    }
}

/// Verify a Schnorr proof of knowledge of `log_g(public)`
pub fn verify_dlog(params: &GroupParameters, public: &BigUint, proof: &DLogProof) -> bool {
    let p = &params.modulus;
    if !params.in_range(&proof.commitment) {
        return false;
    }
    if proof.challenge != dlog_challenge(params, public, &proof.commitment) {
        return false;
    }

    params.pow_g(&proof.response) == (&proof.commitment * public.modpow(&proof.challenge, p)) % p
}

fn dlog_challenge(params: &GroupParameters, public: &BigUint, commitment: &BigUint) -> BigUint {
    hash_numbers(&[
        &params.modulus,
        &params.generator,
        &params.order,
        public,
        commitment,
    ]) % &params.order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::test_groups::group_256;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_ddh_proof() {
        let mut rng = ChaCha20Rng::seed_from_u64(20);
        let params = group_256();
        let p = &params.modulus;

        let secret = params.random_exponent(&mut rng);
        let g2 = params.pow_g(&BigUint::from(12345u32));
        let h1 = params.pow_g(&secret);
        let h2 = g2.modpow(&secret, p);

        let context = FiatShamir::new("ddh");
        let proof = prove_ddh(&mut rng, &params, &params.generator, &g2, &secret, |c| {
            context.challenge(&[&c.a, &c.b])
        });
        assert!(check_ddh(&params, &params.generator, &h1, &g2, &h2, &proof));

        // Wrong statement
        let wrong = (&h2 * &params.generator) % p;
        assert!(!check_ddh(&params, &params.generator, &h1, &g2, &wrong, &proof));

        // Simulated transcripts satisfy the equations for any statement
        let fake = simulate_ddh(&mut rng, &params, &params.generator, &h1, &g2, &wrong).unwrap();
        assert!(check_ddh(&params, &params.generator, &h1, &g2, &wrong, &fake));
    }

    #[test]
    fn test_dlog_proof() {
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let params = group_256();

        let secret = params.random_exponent(&mut rng);
        let public = params.pow_g(&secret);
        let proof = prove_dlog(&mut rng, &params, &secret, &public);
        assert!(verify_dlog(&params, &public, &proof));

        let other = params.pow_g(&(secret + 1u32));
        assert!(!verify_dlog(&params, &other, &proof));

        let mut tampered = proof.clone();
        tampered.response += 1u32;
        assert!(!verify_dlog(&params, &public, &tampered));
    }

    #[test]
    fn test_disjunctive_proof() {
        let mut rng = ChaCha20Rng::seed_from_u64(22);
        let params = group_256();
        let p = &params.modulus;

        let secret = params.random_exponent(&mut rng);
        let g2 = params.pow_g(&BigUint::from(777u32));
        let h1 = params.pow_g(&secret);
        let real = g2.modpow(&secret, p);
        let h2s = vec![
            params.pow_g(&BigUint::from(5u32)),
            real.clone(),
            (&real * &params.generator) % p,
        ];

        let context = FiatShamir::new("disjunctive");
        let proof = prove_disjunctive_ddh(
            &mut rng, &params, &params.generator, &h1, &g2, &h2s, 1, &secret, &context,
        )
        .unwrap();
        verify_disjunctive_ddh(&params, &params.generator, &h1, &g2, &h2s, &proof, &context)
            .unwrap();

        // Bound to the challenge context and the full statement list
        let other = FiatShamir::new("other");
        assert!(
            verify_disjunctive_ddh(&params, &params.generator, &h1, &g2, &h2s, &proof, &other)
                .is_err()
        );
        assert!(verify_disjunctive_ddh(
            &params, &params.generator, &h1, &g2, &h2s[..2], &proof, &context
        )
        .is_err());

        let out_of_range = prove_disjunctive_ddh(
            &mut rng, &params, &params.generator, &h1, &g2, &h2s, 3, &secret, &context,
        );
        assert!(matches!(out_of_range, Err(Error::InvalidEncoding(_))));
    }

    #[test]
    fn test_fiat_shamir_context() {
        let one = BigUint::from(1u32);
        let a = FiatShamir::new("election-a").challenge(&[&one]);
        let b = FiatShamir::new("election-b").challenge(&[&one]);
        assert_ne!(a, b);
        assert_eq!(a, FiatShamir::new("election-a").challenge(&[&one]));
    }

    #[test]
    fn test_proof_serialization() {
        let proof = ChaumPedersenProof {
            commitment: Commitment {
                a: BigUint::from(2u32),
                b: BigUint::from(3u32),
            },
            challenge: BigUint::from(5u32),
            response: BigUint::from(7u32),
        };
        let json = serde_json::to_string(&proof).unwrap();
        assert_eq!(
            json,
            r#"{"commitment":{"A":"2","B":"3"},"challenge":"5","response":"7"}"#
        );
    }
}
