use crate::arith::mod_div;
use crate::proof::{
    check_ddh, check_ddh_first, prove_ddh, prove_disjunctive_ddh, verify_disjunctive_ddh,
};
use crate::*;
use num_bigint::BigUint;
use rand::{CryptoRng, Rng};

/// An ElGamal ciphertext `(alpha, beta) = (g^r, m * y^r)`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ciphertext {
    #[serde(with = "serde_decimal")]
    pub alpha: BigUint,

    #[serde(with = "serde_decimal")]
    pub beta: BigUint,
}

impl Ciphertext {
    /// Encrypt an already subgroup-encoded element with the given randomness
    pub fn encrypt_with_randomness(
        public_key: &PublicKey,
        element: &BigUint,
        randomness: &BigUint,
    ) -> Result<Self, Error> {
        let params = &public_key.params;
        if randomness >= &params.order {
            return Err(Error::RandomnessOutOfRange);
        }
        if !params.in_range(element) {
            return Err(Error::InvalidEncoding(
                "element out of range".to_owned(),
            ));
        }

        let p = &params.modulus;
        Ok(Ciphertext {
            alpha: params.pow_g(randomness),
            beta: (element * public_key.y.modpow(randomness, p)) % p,
        })
    }

    /// Encrypt an already subgroup-encoded element with fresh randomness, which is returned
    pub fn encrypt<R: Rng + CryptoRng>(
        rng: &mut R,
        public_key: &PublicKey,
        element: &BigUint,
    ) -> Result<(Self, BigUint), Error> {
        let randomness = public_key.params.random_exponent(rng);
        let ciphertext = Self::encrypt_with_randomness(public_key, element, &randomness)?;
        Ok((ciphertext, randomness))
    }

    /// Encode an integer plaintext into the subgroup and encrypt it
    pub fn encrypt_plaintext<R: Rng + CryptoRng>(
        rng: &mut R,
        public_key: &PublicKey,
        plaintext: &BigUint,
    ) -> Result<(Self, BigUint), Error> {
        let element = public_key.params.encode_element(plaintext)?;
        Self::encrypt(rng, public_key, &element)
    }

    /// Re-randomize by multiplying with an encryption of 1
    pub fn reencrypt_with_randomness(
        &self,
        public_key: &PublicKey,
        randomness: &BigUint,
    ) -> Result<Self, Error> {
        let one = BigUint::from(1u32);
        let mask = Self::encrypt_with_randomness(public_key, &one, randomness)?;
        Ok(self.combine(&mask, public_key))
    }

    pub fn reencrypt<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
        public_key: &PublicKey,
    ) -> Result<(Self, BigUint), Error> {
        let randomness = public_key.params.random_exponent(rng);
        let ciphertext = self.reencrypt_with_randomness(public_key, &randomness)?;
        Ok((ciphertext, randomness))
    }

    /// Homomorphic multiplication: the result encrypts the product of both plaintext elements
    pub fn combine(&self, other: &Ciphertext, public_key: &PublicKey) -> Ciphertext {
        let p = &public_key.params.modulus;
        Ciphertext {
            alpha: (&self.alpha * &other.alpha) % p,
            beta: (&self.beta * &other.beta) % p,
        }
    }

    /// Check both components lie in `[1, p)`
    pub fn validate(&self, params: &GroupParameters) -> Result<(), Error> {
        if !params.in_range(&self.alpha) || !params.in_range(&self.beta) {
            return Err(Error::MalformedArtifact(
                "ciphertext component out of range".to_owned(),
            ));
        }
        Ok(())
    }

    /// Prove that this ciphertext was produced with `randomness`.
    ///
    /// Together with the plaintext element this also proves what the ciphertext encrypts.
    pub fn prove_encryption<R, G>(
        &self,
        rng: &mut R,
        public_key: &PublicKey,
        randomness: &BigUint,
        generator: &G,
    ) -> Result<EncryptionProof, Error>
    where
        R: Rng + CryptoRng,
        G: ChallengeGenerator + ?Sized,
    {
        let params = &public_key.params;
        if randomness >= &params.order {
            return Err(Error::RandomnessOutOfRange);
        }

        Ok(prove_ddh(
            rng,
            params,
            &params.generator,
            &public_key.y,
            randomness,
            |commitment| generator.challenge(&[&commitment.a, &commitment.b]),
        ))
    }

    /// Verify that this ciphertext encrypts `element`
    pub fn verify_encryption<G>(
        &self,
        public_key: &PublicKey,
        element: &BigUint,
        proof: &EncryptionProof,
        generator: &G,
    ) -> Result<(), ValidationError>
    where
        G: ChallengeGenerator + ?Sized,
    {
        let params = &public_key.params;
        check_challenge(params, proof, generator)?;

        let masked = mod_div(&self.beta, element, &params.modulus)
            .map_err(|_| ValidationError::ProofInvalid)?;
        if !check_ddh(
            params,
            &params.generator,
            &self.alpha,
            &public_key.y,
            &masked,
            proof,
        ) {
            return Err(ValidationError::ProofInvalid);
        }
        Ok(())
    }

    /// Verify that the prover knew the encryption randomness, without knowing the plaintext
    pub fn verify_randomness_knowledge<G>(
        &self,
        public_key: &PublicKey,
        proof: &EncryptionProof,
        generator: &G,
    ) -> Result<(), ValidationError>
    where
        G: ChallengeGenerator + ?Sized,
    {
        let params = &public_key.params;
        check_challenge(params, proof, generator)?;

        if !check_ddh_first(params, &params.generator, &self.alpha, proof) {
            return Err(ValidationError::ProofInvalid);
        }
        Ok(())
    }

    /// Prove that this ciphertext encrypts one of `elements` (the one at `real_index`)
    pub fn prove_disjunctive<R, G>(
        &self,
        rng: &mut R,
        public_key: &PublicKey,
        randomness: &BigUint,
        real_index: usize,
        elements: &[BigUint],
        generator: &G,
    ) -> Result<DisjunctiveProof, Error>
    where
        R: Rng + CryptoRng,
        G: ChallengeGenerator + ?Sized,
    {
        let params = &public_key.params;
        if randomness >= &params.order {
            return Err(Error::RandomnessOutOfRange);
        }
        let masked = self.masked_candidates(params, elements)?;

        prove_disjunctive_ddh(
            rng,
            params,
            &params.generator,
            &self.alpha,
            &public_key.y,
            &masked,
            real_index,
            randomness,
            generator,
        )
    }

    /// Verify that this ciphertext encrypts one of `elements`
    pub fn verify_disjunctive<G>(
        &self,
        public_key: &PublicKey,
        elements: &[BigUint],
        proof: &DisjunctiveProof,
        generator: &G,
    ) -> Result<(), ValidationError>
    where
        G: ChallengeGenerator + ?Sized,
    {
        let params = &public_key.params;
        let masked = self
            .masked_candidates(params, elements)
            .map_err(|_| ValidationError::ProofInvalid)?;

        verify_disjunctive_ddh(
            params,
            &params.generator,
            &self.alpha,
            &public_key.y,
            &masked,
            proof,
            generator,
        )
    }

    /// Recover the decoded plaintext from the encryption randomness
    pub fn decrypt_with_randomness(
        &self,
        public_key: &PublicKey,
        randomness: &BigUint,
    ) -> Result<BigUint, Error> {
        let params = &public_key.params;
        if randomness >= &params.order {
            return Err(Error::RandomnessOutOfRange);
        }
        let mask = public_key.y.modpow(randomness, &params.modulus);
        decrypt_with_decryptor(params, &self.beta, &mask)
    }

    // beta / m for every candidate element m
    fn masked_candidates(
        &self,
        params: &GroupParameters,
        elements: &[BigUint],
    ) -> Result<Vec<BigUint>, Error> {
        elements
            .iter()
            .map(|element| mod_div(&self.beta, element, &params.modulus))
            .collect()
    }
}

fn check_challenge<G>(
    params: &GroupParameters,
    proof: &EncryptionProof,
    generator: &G,
) -> Result<(), ValidationError>
where
    G: ChallengeGenerator + ?Sized,
{
    let expected =
        generator.challenge(&[&proof.commitment.a, &proof.commitment.b]) % &params.order;
    if expected != proof.challenge {
        return Err(ValidationError::InvalidChallenge);
    }
    Ok(())
}
