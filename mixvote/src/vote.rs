use crate::*;
use num_bigint::BigUint;
use rand::{CryptoRng, Rng};

/// A single encrypted vote, with everything needed to audit it later
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    #[serde(with = "serde_decimal")]
    pub modulus: BigUint,

    #[serde(with = "serde_decimal")]
    pub generator: BigUint,

    #[serde(with = "serde_decimal")]
    pub order: BigUint,

    #[serde(with = "serde_decimal")]
    pub public: BigUint,

    #[serde(with = "serde_decimal")]
    pub alpha: BigUint,

    #[serde(with = "serde_decimal")]
    pub beta: BigUint,

    pub encryption_proof: EncryptionProof,

    /// Fiat-Shamir context the proof is bound to, usually the election and voter identifiers
    pub context: String,

    pub nr_candidates: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<String>>,
}

/// What could be learned while verifying a vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReport {
    /// The encoded selection, when the randomness was supplied
    pub plaintext: Option<BigUint>,

    pub max_encoding: BigUint,

    /// Chosen option indices, in order of preference
    pub selection: Option<Vec<usize>>,
}

impl VoteRecord {
    /// Encode `selection`, encrypt it and prove the encryption.
    ///
    /// Returns the record and the encryption randomness, which the voter keeps to audit the vote.
    pub fn cast<R: Rng + CryptoRng>(
        rng: &mut R,
        public_key: &PublicKey,
        selection: &[usize],
        nr_candidates: usize,
        context: &str,
    ) -> Result<(Self, BigUint), Error> {
        check_encoding_fits(&public_key.params, nr_candidates)?;
        let encoded = encoding::encode(selection, nr_candidates)?;
        let (ciphertext, randomness) = Ciphertext::encrypt_plaintext(rng, public_key, &encoded)?;
        let encryption_proof = ciphertext.prove_encryption(
            rng,
            public_key,
            &randomness,
            &FiatShamir::new(context),
        )?;

        let params = &public_key.params;
        let record = VoteRecord {
            modulus: params.modulus.clone(),
            generator: params.generator.clone(),
            order: params.order.clone(),
            public: public_key.y.clone(),
            alpha: ciphertext.alpha,
            beta: ciphertext.beta,
            encryption_proof,
            context: context.to_owned(),
            nr_candidates,
            candidates: None,
        };

        Ok((record, randomness))
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn public_key(&self) -> Result<PublicKey, Error> {
        let params =
            GroupParameters::new(self.modulus.clone(), self.order.clone(), self.generator.clone())?;
        let public_key = PublicKey {
            params,
            y: self.public.clone(),
        };
        public_key.validate()?;
        Ok(public_key)
    }

    pub fn ciphertext(&self) -> Ciphertext {
        Ciphertext {
            alpha: self.alpha.clone(),
            beta: self.beta.clone(),
        }
    }

    /// Audit the vote.
    ///
    /// The proof of randomness knowledge is always checked. With the randomness the
    /// plaintext is recovered, decoded and the full encryption proof checked; a claimed
    /// plaintext must match the recovered one and re-encrypt to this exact ciphertext.
    pub fn verify(
        &self,
        randomness: Option<&BigUint>,
        plaintext: Option<&BigUint>,
    ) -> Result<VoteReport, Error> {
        let public_key = self.public_key()?;
        let max_encoding = check_encoding_fits(&public_key.params, self.nr_candidates)?;
        let ciphertext = self.ciphertext();
        ciphertext.validate(&public_key.params)?;

        let generator = FiatShamir::new(&self.context);
        ciphertext.verify_randomness_knowledge(&public_key, &self.encryption_proof, &generator)?;

        let randomness = match randomness {
            Some(randomness) => randomness,
            None => {
                return Ok(VoteReport {
                    plaintext: None,
                    max_encoding,
                    selection: None,
                })
            }
        };

        let recovered = ciphertext.decrypt_with_randomness(&public_key, randomness)?;

        if let Some(plaintext) = plaintext {
            if plaintext != &recovered {
                return Err(ValidationError::PlaintextMismatch.into());
            }
            let element = public_key.params.encode_element(plaintext)?;
            let expected = Ciphertext::encrypt_with_randomness(&public_key, &element, randomness)?;
            if expected != ciphertext {
                return Err(ValidationError::EncryptionMismatch.into());
            }
        }

        if recovered > max_encoding {
            return Err(ValidationError::UndecodablePlaintext(
                recovered.to_string(),
                max_encoding.to_string(),
            )
            .into());
        }

        let element = public_key.params.encode_element(&recovered)?;
        ciphertext.verify_encryption(&public_key, &element, &self.encryption_proof, &generator)?;

        let selection = encoding::decode(&recovered, self.nr_candidates)?;

        Ok(VoteReport {
            plaintext: Some(recovered),
            max_encoding,
            selection: Some(selection),
        })
    }
}

/// The largest encoding for `nr_candidates`, which must lie below the group order
fn check_encoding_fits(params: &GroupParameters, nr_candidates: usize) -> Result<BigUint, Error> {
    let max_encoding = encoding::max_encoding(nr_candidates)?;
    if max_encoding >= params.order {
        return Err(Error::InvalidEncoding(format!(
            "selections out of {} candidates do not fit in the group order",
            nr_candidates
        )));
    }
    Ok(max_encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::test_groups::group_256;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_cast_and_verify() {
        let mut rng = ChaCha20Rng::seed_from_u64(70);
        let (_, pk) = generate_keypair(&mut rng, &group_256());

        let (record, randomness) =
            VoteRecord::cast(&mut rng, &pk, &[2, 0], 4, "election-1/voter-7").unwrap();

        let report = record.verify(None, None).unwrap();
        assert_eq!(report.plaintext, None);
        assert_eq!(report.max_encoding, encoding::max_encoding(4).unwrap());

        let report = record.verify(Some(&randomness), None).unwrap();
        let encoded = encoding::encode(&[2, 0], 4).unwrap();
        assert_eq!(report.plaintext, Some(encoded.clone()));
        assert_eq!(report.selection, Some(vec![2, 0]));

        record.verify(Some(&randomness), Some(&encoded)).unwrap();

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(VoteRecord::from_json(&json).unwrap(), record);
    }

    #[test]
    fn test_verify_failures() {
        let mut rng = ChaCha20Rng::seed_from_u64(71);
        let (_, pk) = generate_keypair(&mut rng, &group_256());
        let (record, randomness) = VoteRecord::cast(&mut rng, &pk, &[1], 3, "ctx").unwrap();

        let wrong = BigUint::from(1u32);
        assert!(matches!(
            record.verify(Some(&randomness), Some(&wrong)),
            Err(Error::Validation(ValidationError::PlaintextMismatch))
        ));

        // Wrong randomness recovers garbage, which the encryption proof rejects
        let other_randomness = (&randomness + 1u32) % &pk.params.order;
        assert!(record.verify(Some(&other_randomness), None).is_err());

        let mut tampered = record.clone();
        tampered.context = "other".to_owned();
        assert!(matches!(
            tampered.verify(None, None),
            Err(Error::Validation(ValidationError::InvalidChallenge))
        ));
    }

    #[test]
    fn test_undecodable_vote() {
        let mut rng = ChaCha20Rng::seed_from_u64(72);
        let (_, pk) = generate_keypair(&mut rng, &group_256());
        let context = "ctx";

        // Encrypt a plaintext beyond the largest encoding for 3 candidates
        let (ct, randomness) =
            Ciphertext::encrypt_plaintext(&mut rng, &pk, &BigUint::from(16u32)).unwrap();
        let proof = ct
            .prove_encryption(&mut rng, &pk, &randomness, &FiatShamir::new(context))
            .unwrap();

        let record = VoteRecord {
            modulus: pk.params.modulus.clone(),
            generator: pk.params.generator.clone(),
            order: pk.params.order.clone(),
            public: pk.y.clone(),
            alpha: ct.alpha,
            beta: ct.beta,
            encryption_proof: proof,
            context: context.to_owned(),
            nr_candidates: 3,
            candidates: None,
        };

        assert_eq!(
            record.verify(Some(&randomness), None).unwrap_err().to_string(),
            ValidationError::UndecodablePlaintext("16".to_owned(), "15".to_owned()).to_string()
        );
    }

    #[test]
    fn test_oversized_candidate_count() {
        let mut rng = ChaCha20Rng::seed_from_u64(73);
        let (_, pk) = generate_keypair(&mut rng, &group_256());
        let (record, randomness) = VoteRecord::cast(&mut rng, &pk, &[0], 3, "ctx").unwrap();

        // A record claiming absurd candidate counts is rejected, not crashed on
        for nr_candidates in [usize::MAX, 1_000_000_000, encoding::MAX_CANDIDATES + 1].iter() {
            let mut json: serde_json::Value = serde_json::to_value(&record).unwrap();
            json["nr_candidates"] = serde_json::json!(*nr_candidates as u64);
            let tampered = VoteRecord::from_json(&json.to_string()).unwrap();

            assert!(matches!(
                tampered.verify(None, None),
                Err(Error::InvalidEncoding(_))
            ));
            assert!(matches!(
                tampered.verify(Some(&randomness), None),
                Err(Error::InvalidEncoding(_))
            ));
        }

        // 60 candidates encode beyond the order of the 256-bit group
        let mut too_many = record.clone();
        too_many.nr_candidates = 60;
        assert!(matches!(
            too_many.verify(None, None),
            Err(Error::InvalidEncoding(_))
        ));
        assert!(matches!(
            VoteRecord::cast(&mut rng, &pk, &[0], 60, "ctx"),
            Err(Error::InvalidEncoding(_))
        ));
    }
}
