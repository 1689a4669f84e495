use crate::arith::mod_div;
use crate::proof::{check_ddh, hash_numbers, prove_ddh};
use crate::workers::parallel_map;
use crate::*;
use num_bigint::BigUint;
use num_traits::One;
use rand::{CryptoRng, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// A trustee's partial decryption of one ciphertext, `alpha^x`, with a proof that
/// the same `x` is behind the trustee's public key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DecryptionFactor {
    #[serde(with = "serde_decimal")]
    pub factor: BigUint,

    pub proof: ChaumPedersenProof,
}

/// The trustee upload format: factors and proofs as parallel lists, one list per poll
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FactorsAndProofs {
    #[serde(with = "serde_decimal::nested")]
    pub decryption_factors: Vec<Vec<BigUint>>,

    pub decryption_proofs: Vec<Vec<ChaumPedersenProof>>,
}

impl FactorsAndProofs {
    pub fn from_factors(polls: Vec<Vec<DecryptionFactor>>) -> Self {
        let mut decryption_factors = Vec::with_capacity(polls.len());
        let mut decryption_proofs = Vec::with_capacity(polls.len());

        for poll in polls {
            let (factors, proofs): (Vec<BigUint>, Vec<ChaumPedersenProof>) = poll
                .into_iter().map(|f| (f.factor, f.proof)).unzip();
            decryption_factors.push(factors);
            decryption_proofs.push(proofs);
        }

        FactorsAndProofs {
            decryption_factors,
            decryption_proofs,
        }
    }

    /// Split back into per-poll factor lists
    pub fn into_factors(self) -> Result<Vec<Vec<DecryptionFactor>>, Error> {
        if self.decryption_factors.len() != self.decryption_proofs.len() {
            return Err(Error::MalformedArtifact(
                "factor and proof lists differ in length".to_owned(),
            ));
        }

        self.decryption_factors
            .into_iter()
            .zip(self.decryption_proofs)
            .map(|(factors, proofs)| {
                if factors.len() != proofs.len() {
                    return Err(Error::MalformedArtifact(
                        "factor and proof lists differ in length".to_owned(),
                    ));
                }
                Ok(factors
                    .into_iter()
                    .zip(proofs)
                    .map(|(factor, proof)| DecryptionFactor { factor, proof })
                    .collect())
            })
            .collect()
    }
}

fn factor_challenge(
    public_key: &PublicKey,
    alpha: &BigUint,
    factor: &BigUint,
    commitment: &Commitment,
) -> BigUint {
    let params = &public_key.params;
    hash_numbers(&[
        &params.modulus,
        &params.generator,
        &params.order,
        alpha,
        &public_key.y,
        factor,
        &commitment.a,
        &commitment.b,
    ])
}

/// Compute this trustee's decryption factor for every ciphertext, with proofs.
///
/// Ciphertexts are processed on `nr_parallel` workers, each with its own RNG seeded from `rng`.
pub fn compute_decryption_factors<R: Rng + CryptoRng>(
    rng: &mut R,
    secret_key: &SecretKey,
    ciphers: &[Ciphertext],
    nr_parallel: usize,
    teller: &dyn Teller,
) -> Result<Vec<DecryptionFactor>, Error> {
    let public_key = &secret_key.public_key;
    let params = &public_key.params;
    for cipher in ciphers {
        cipher.validate(params)?;
    }

    let seeds: Vec<[u8; 32]> = (0..ciphers.len()).map(|_| rng.gen()).collect();

    teller.task("Computing decryption factors", ciphers.len());
    let factors = parallel_map(nr_parallel, ciphers.len(), |i| {
        let mut cipher_rng = ChaCha20Rng::from_seed(seeds[i]);
        let alpha = &ciphers[i].alpha;
        let factor = alpha.modpow(&secret_key.x, &params.modulus);
        let proof = prove_ddh(
            &mut cipher_rng,
            params,
            &params.generator,
            alpha,
            &secret_key.x,
            |commitment| factor_challenge(public_key, alpha, &factor, commitment),
        );
        teller.advance(1);
        DecryptionFactor { factor, proof }
    })?;
    teller.finish();

    Ok(factors)
}

/// Check every factor's proof against the trustee's public key
pub fn verify_decryption_factors(
    public_key: &PublicKey,
    ciphers: &[Ciphertext],
    factors: &[DecryptionFactor],
) -> Result<(), Error> {
    if ciphers.len() != factors.len() {
        return Err(Error::MalformedArtifact(format!(
            "{} decryption factors for {} ciphers",
            factors.len(),
            ciphers.len()
        )));
    }

    let params = &public_key.params;
    for (cipher_index, (cipher, factor)) in ciphers.iter().zip(factors).enumerate() {
        let failed = ValidationError::DecryptionProofFailed {
            cipher: cipher_index,
        };
        let proof = &factor.proof;

        if !params.in_range(&factor.factor)
            || proof.challenge
                != factor_challenge(public_key, &cipher.alpha, &factor.factor, &proof.commitment)
                    % &params.order
            || !check_ddh(
                params,
                &params.generator,
                &public_key.y,
                &cipher.alpha,
                &factor.factor,
                proof,
            )
        {
            return Err(failed.into());
        }
    }

    Ok(())
}

/// Multiply the trustees' factor lists index-wise into one combined factor per ciphertext
pub fn combine_decryption_factors(
    params: &GroupParameters,
    factor_sets: &[Vec<BigUint>],
) -> Result<Vec<BigUint>, Error> {
    let first = factor_sets.first().ok_or(Error::EmptyInput)?;
    if factor_sets.iter().any(|set| set.len() != first.len()) {
        return Err(Error::MalformedArtifact(
            "decryption factor sets differ in length".to_owned(),
        ));
    }

    let combined = (0..first.len())
        .map(|i| {
            factor_sets.iter().fold(BigUint::one(), |acc, set| {
                (acc * &set[i]) % &params.modulus
            })
        })
        .collect();

    Ok(combined)
}

/// Strip the combined decryption factor from `beta` and decode the plaintext
pub fn decrypt_with_decryptor(
    params: &GroupParameters,
    beta: &BigUint,
    decryptor: &BigUint,
) -> Result<BigUint, Error> {
    let element = mod_div(beta, decryptor, &params.modulus)?;
    params.decode_element(&element)
}

/// Decrypt every ciphertext given all trustees' factor lists (n-of-n)
pub fn decrypt_ciphers(
    params: &GroupParameters,
    ciphers: &[Ciphertext],
    factor_sets: &[Vec<BigUint>],
) -> Result<Vec<BigUint>, Error> {
    let combined = combine_decryption_factors(params, factor_sets)?;
    if combined.len() != ciphers.len() {
        return Err(Error::MalformedArtifact(format!(
            "{} decryption factors for {} ciphers",
            combined.len(),
            ciphers.len()
        )));
    }

    ciphers
        .iter()
        .zip(combined.iter())
        .map(|(cipher, decryptor)| decrypt_with_decryptor(params, &cipher.beta, decryptor))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::test_groups::group_256;

    #[test]
    fn test_factor_proofs() {
        let mut rng = ChaCha20Rng::seed_from_u64(60);
        let params = group_256();
        let (sk, pk) = generate_keypair(&mut rng, &params);
        let (_, other) = generate_keypair(&mut rng, &params);

        let ciphers: Vec<Ciphertext> = (0u32..3)
            .map(|m| {
                Ciphertext::encrypt_plaintext(&mut rng, &pk, &BigUint::from(m))
                    .unwrap()
                    .0
            })
            .collect();

        let factors = compute_decryption_factors(&mut rng, &sk, &ciphers, 2, &SilentTeller).unwrap();
        verify_decryption_factors(&pk, &ciphers, &factors).unwrap();

        assert!(matches!(
            verify_decryption_factors(&other, &ciphers, &factors),
            Err(Error::Validation(ValidationError::DecryptionProofFailed { cipher: 0 }))
        ));

        let mut tampered = factors.clone();
        tampered[1].factor = (&tampered[1].factor * &params.generator) % &params.modulus;
        assert!(matches!(
            verify_decryption_factors(&pk, &ciphers, &tampered),
            Err(Error::Validation(ValidationError::DecryptionProofFailed { cipher: 1 }))
        ));

        let factor_set: Vec<BigUint> = factors.iter().map(|f| f.factor.clone()).collect();
        let plaintexts = decrypt_ciphers(&params, &ciphers, &[factor_set]).unwrap();
        assert_eq!(
            plaintexts,
            vec![BigUint::from(0u32), BigUint::from(1u32), BigUint::from(2u32)]
        );
    }

    #[test]
    fn test_factors_and_proofs_format() {
        let mut rng = ChaCha20Rng::seed_from_u64(61);
        let params = group_256();
        let (sk, pk) = generate_keypair(&mut rng, &params);
        let (cipher, _) = Ciphertext::encrypt_plaintext(&mut rng, &pk, &BigUint::from(4u32)).unwrap();

        let factors = compute_decryption_factors(&mut rng, &sk, &[cipher], 0, &SilentTeller).unwrap();
        let upload = FactorsAndProofs::from_factors(vec![factors.clone()]);

        let json = serde_json::to_value(&upload).unwrap();
        assert!(json["decryption_factors"][0][0].is_string());
        assert!(json["decryption_proofs"][0][0]["commitment"]["A"].is_string());

        let parsed: FactorsAndProofs = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.into_factors().unwrap(), vec![factors]);

        let uneven = FactorsAndProofs {
            decryption_factors: vec![vec![BigUint::one()]],
            decryption_proofs: vec![vec![]],
        };
        assert!(uneven.into_factors().is_err());
    }

    #[test]
    fn test_combine_errors() {
        let params = group_256();
        assert!(matches!(
            combine_decryption_factors(&params, &[]),
            Err(Error::EmptyInput)
        ));
        assert!(combine_decryption_factors(
            &params,
            &[vec![BigUint::one()], vec![BigUint::one(), BigUint::one()]]
        )
        .is_err());
    }
}
