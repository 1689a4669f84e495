use crate::proof::{prove_dlog, verify_dlog};
use crate::*;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};
use std::fmt;

/// An ElGamal public key `y = g^x`, together with its group
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    #[serde(flatten)]
    pub params: GroupParameters,

    #[serde(with = "serde_decimal")]
    pub y: BigUint,
}

impl PublicKey {
    /// Combine trustee public keys into the joint election key `y = Π y_i mod p`.
    ///
    /// Every key must share the same group parameters.
    pub fn combine(keys: &[PublicKey]) -> Result<PublicKey, Error> {
        let first = keys.first().ok_or(Error::EmptyInput)?;

        let mut y = BigUint::one();
        for key in keys {
            first.params.check_compatible(&key.params)?;
            y = (y * &key.y) % &first.params.modulus;
        }

        Ok(PublicKey {
            params: first.params.clone(),
            y,
        })
    }

    /// Check the group and that `y` lies in the order-q subgroup
    pub fn validate(&self) -> Result<(), Error> {
        self.params.validate()?;

        if !self.params.in_range(&self.y)
            || !self.y.modpow(&self.params.order, &self.params.modulus).is_one()
        {
            return Err(Error::InvalidGroupParameters(
                "public key is not in the order-q subgroup".to_owned(),
            ));
        }
        Ok(())
    }

    /// Verify a trustee's proof of knowledge of the secret key behind this public key
    pub fn verify_knowledge(&self, proof: &DLogProof) -> Result<(), ValidationError> {
        if verify_dlog(&self.params, &self.y, proof) {
            Ok(())
        } else {
            Err(ValidationError::KeyProofInvalid)
        }
    }
}

/// An ElGamal secret key. Serializes as the trustee key file `{"x": .., "public_key": {..}}`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SecretKey {
    #[serde(with = "serde_decimal")]
    pub x: BigUint,

    pub public_key: PublicKey,
}

impl SecretKey {
    /// Build a secret key from its exponent, which must lie in `[1, q)`
    pub fn from_exponent(params: &GroupParameters, x: BigUint) -> Result<Self, Error> {
        if x.is_zero() || x >= params.order {
            return Err(Error::InvalidGroupParameters(
                "secret exponent out of range".to_owned(),
            ));
        }

        let y = params.pow_g(&x);
        Ok(SecretKey {
            x,
            public_key: PublicKey {
                params: params.clone(),
                y,
            },
        })
    }

    /// Check that the stored public key matches the secret exponent
    pub fn validate(&self) -> Result<(), Error> {
        self.public_key.validate()?;

        let params = &self.public_key.params;
        if self.x.is_zero() || self.x >= params.order || params.pow_g(&self.x) != self.public_key.y
        {
            return Err(Error::MalformedArtifact(
                "secret key does not match its public key".to_owned(),
            ));
        }
        Ok(())
    }

    /// Schnorr proof of knowledge of `x`, published once when registering the key
    pub fn prove_knowledge<R: Rng + CryptoRng>(&self, rng: &mut R) -> DLogProof {
        prove_dlog(rng, &self.public_key.params, &self.x, &self.public_key.y)
    }

    /// Single-key decryption of a ciphertext, returning the decoded plaintext
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<BigUint, Error> {
        let params = &self.public_key.params;
        let factor = ciphertext.alpha.modpow(&self.x, &params.modulus);
        decrypt_with_decryptor(params, &ciphertext.beta, &factor)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("x", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Generate an ElGamal keypair with `x` uniform in `[1, q)`
pub fn generate_keypair<R: Rng + CryptoRng>(
    rng: &mut R,
    params: &GroupParameters,
) -> (SecretKey, PublicKey) {
    let x = arith::random_in_range(rng, &BigUint::one(), &params.order);
    let y = params.pow_g(&x);
    let public = PublicKey {
        params: params.clone(),
        y,
    };
    let secret = SecretKey {
        x,
        public_key: public.clone(),
    };

    (secret, public)
}

/// A trustee's public key together with its proof of knowledge, as published for registration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisteredKey {
    pub public_key: PublicKey,
    pub proof: DLogProof,
}

impl RegisteredKey {
    pub fn verify(&self) -> Result<(), Error> {
        self.public_key.validate()?;
        self.public_key.verify_knowledge(&self.proof)?;
        Ok(())
    }
}

/// The trustee key file: the secret key and, once generated, its registration proof
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrusteeKeyFile {
    #[serde(flatten)]
    pub secret_key: SecretKey,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<DLogProof>,
}

impl TrusteeKeyFile {
    /// Parse and validate a trustee key file
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let file: TrusteeKeyFile = serde_json::from_str(json)?;
        file.secret_key.validate()?;
        if let Some(proof) = &file.proof {
            file.secret_key.public_key.verify_knowledge(proof)?;
        }
        Ok(file)
    }

    pub fn registered_key(&self) -> Option<RegisteredKey> {
        self.proof.as_ref().map(|proof| RegisteredKey {
            public_key: self.secret_key.public_key.clone(),
            proof: proof.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::test_groups::group_256;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_combine() {
        let mut rng = ChaCha20Rng::seed_from_u64(30);
        let params = group_256();

        let (sk1, pk1) = generate_keypair(&mut rng, &params);
        let (sk2, pk2) = generate_keypair(&mut rng, &params);

        let joint = PublicKey::combine(&[pk1, pk2]).unwrap();
        let x = (&sk1.x + &sk2.x) % &params.order;
        assert_eq!(joint.y, params.pow_g(&x));

        assert!(matches!(PublicKey::combine(&[]), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_combine_incompatible() {
        let mut rng = ChaCha20Rng::seed_from_u64(31);
        let (_, pk1) = generate_keypair(&mut rng, &group_256());
        let (_, pk2) = generate_keypair(&mut rng, &GroupParameters::rfc3526_2048());

        assert!(matches!(
            PublicKey::combine(&[pk1, pk2]),
            Err(Error::IncompatibleParameters)
        ));
    }

    #[test]
    fn test_key_proof() {
        let mut rng = ChaCha20Rng::seed_from_u64(32);
        let params = group_256();
        let (sk, pk) = generate_keypair(&mut rng, &params);
        let (_, other) = generate_keypair(&mut rng, &params);

        let proof = sk.prove_knowledge(&mut rng);
        pk.verify_knowledge(&proof).unwrap();
        assert_eq!(
            other.verify_knowledge(&proof),
            Err(ValidationError::KeyProofInvalid)
        );
    }

    #[test]
    fn test_key_file() {
        let mut rng = ChaCha20Rng::seed_from_u64(33);
        let params = group_256();
        let (sk, _) = generate_keypair(&mut rng, &params);
        let proof = sk.prove_knowledge(&mut rng);

        let file = TrusteeKeyFile {
            secret_key: sk.clone(),
            proof: Some(proof),
        };
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.starts_with(r#"{"x":""#));

        let parsed = TrusteeKeyFile::from_json(&json).unwrap();
        assert_eq!(parsed.secret_key, sk);
        parsed.registered_key().unwrap().verify().unwrap();

        // A key file without a proof is still usable
        let bare = serde_json::to_string(&sk).unwrap();
        let parsed = TrusteeKeyFile::from_json(&bare).unwrap();
        assert!(parsed.proof.is_none());

        // Debug output never shows the secret
        assert!(!format!("{:?}", sk).contains(&sk.x.to_string()));
    }

    #[test]
    fn test_from_exponent() {
        let params = group_256();
        assert!(SecretKey::from_exponent(&params, BigUint::zero()).is_err());
        assert!(SecretKey::from_exponent(&params, params.order.clone()).is_err());

        let sk = SecretKey::from_exponent(&params, BigUint::from(13u32)).unwrap();
        sk.validate().unwrap();
    }
}
