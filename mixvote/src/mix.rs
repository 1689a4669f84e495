//! Cut-and-choose verifiable shuffle.
//!
//! A mixer re-encrypts and permutes a list of ciphertexts, then proves it did so
//! honestly by producing `rounds` independent shadow shuffles of the same input.
//! A hash of everything published selects, per round, whether the mixer reveals
//! the shadow's own permutation (bit 0) or the link from the shadow to the final
//! mix (bit 1). Revealing both for any round would expose the real permutation,
//! so a cheating mixer is caught with probability `1 - 2^-rounds`.

use crate::arith::{bits_le, mod_sub};
use crate::workers::parallel_map;
use crate::*;
use digest::Digest;
use num_bigint::BigUint;
use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// Default number of proof rounds
pub const MIN_MIX_ROUNDS: usize = 128;

/// Number of challenge bits taken from each SHA-256 block
const CHALLENGE_BLOCK_BITS: usize = 256;

/// Ciphertexts ready for mixing: a ballot box, or the output of a previous mix.
///
/// Any `CipherMix` document also parses as a `MixInput`, whose ciphers are its `mixed_ciphers`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MixInput {
    #[serde(with = "serde_decimal")]
    pub modulus: BigUint,

    #[serde(with = "serde_decimal")]
    pub generator: BigUint,

    #[serde(with = "serde_decimal")]
    pub order: BigUint,

    #[serde(with = "serde_decimal")]
    pub public: BigUint,

    pub mixed_ciphers: Vec<Ciphertext>,
}

impl MixInput {
    pub fn new(public_key: &PublicKey, ciphers: Vec<Ciphertext>) -> Self {
        MixInput {
            modulus: public_key.params.modulus.clone(),
            generator: public_key.params.generator.clone(),
            order: public_key.params.order.clone(),
            public: public_key.y.clone(),
            mixed_ciphers: ciphers,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let input: MixInput = serde_json::from_str(json)?;
        input.public_key()?;
        Ok(input)
    }

    /// The validated election public key, after checking every cipher is in range
    pub fn public_key(&self) -> Result<PublicKey, Error> {
        let public_key = election_key(&self.modulus, &self.order, &self.generator, &self.public)?;
        for cipher in self.mixed_ciphers.iter() {
            cipher.validate(&public_key.params)?;
        }
        Ok(public_key)
    }
}

/// A published mix together with its cut-and-choose proof
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CipherMix {
    #[serde(with = "serde_decimal")]
    pub modulus: BigUint,

    #[serde(with = "serde_decimal")]
    pub generator: BigUint,

    #[serde(with = "serde_decimal")]
    pub order: BigUint,

    #[serde(with = "serde_decimal")]
    pub public: BigUint,

    pub original_ciphers: Vec<Ciphertext>,

    pub mixed_ciphers: Vec<Ciphertext>,

    /// One shadow shuffle of `original_ciphers` per round
    pub cipher_collections: Vec<Vec<Ciphertext>>,

    /// Per round, the revealed permutation (into the shadow for bit 0, into `mixed_ciphers` for bit 1)
    #[serde(with = "serde_decimal::offsets")]
    pub offset_collections: Vec<Vec<usize>>,

    /// Per round, the revealed re-encryption randomness
    #[serde(with = "serde_decimal::nested")]
    pub random_collections: Vec<Vec<BigUint>>,

    /// Lowercase hex SHA-256 digest, see `compute_mix_challenge`
    pub challenge: String,
}

impl CipherMix {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn public_key(&self) -> Result<PublicKey, Error> {
        election_key(&self.modulus, &self.order, &self.generator, &self.public)
    }

    /// The input for the next mix in the chain
    pub fn next_input(&self) -> MixInput {
        MixInput {
            modulus: self.modulus.clone(),
            generator: self.generator.clone(),
            order: self.order.clone(),
            public: self.public.clone(),
            mixed_ciphers: self.mixed_ciphers.clone(),
        }
    }

    /// Mix this mix's output again
    pub fn remix<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
        rounds: usize,
        nr_parallel: usize,
        teller: &dyn Teller,
    ) -> Result<CipherMix, Error> {
        mix_ciphers(rng, &self.next_input(), rounds, nr_parallel, teller)
    }

    /// Verify the mix proof. See `verify_cipher_mix`.
    pub fn verify(&self, nr_parallel: usize, teller: &dyn Teller) -> Result<(), Error> {
        verify_cipher_mix(self, nr_parallel, teller)
    }
}

fn election_key(
    modulus: &BigUint,
    order: &BigUint,
    generator: &BigUint,
    public: &BigUint,
) -> Result<PublicKey, Error> {
    let params = GroupParameters::new(modulus.clone(), order.clone(), generator.clone())?;
    let public_key = PublicKey {
        params,
        y: public.clone(),
    };
    public_key.validate()?;
    Ok(public_key)
}

/// A re-encrypted permutation of some ciphertexts, with the secrets to open it
#[derive(Debug, Clone)]
pub struct Shuffle {
    pub ciphers: Vec<Ciphertext>,
    pub offsets: Vec<usize>,
    pub randoms: Vec<BigUint>,
}

/// Re-encrypt every cipher with fresh randomness and move cipher `i` to position `offsets[i]`
pub fn shuffle_ciphers<R: Rng + CryptoRng>(
    rng: &mut R,
    public_key: &PublicKey,
    ciphers: &[Ciphertext],
) -> Result<Shuffle, Error> {
    let mut offsets: Vec<usize> = (0..ciphers.len()).collect();
    offsets.shuffle(rng);

    let mut mixed: Vec<Option<Ciphertext>> = vec![None; ciphers.len()];
    let mut randoms = Vec::with_capacity(ciphers.len());

    for (cipher, offset) in ciphers.iter().zip(offsets.iter()) {
        let (reencrypted, random) = cipher.reencrypt(rng, public_key)?;
        mixed[*offset] = Some(reencrypted);
        randoms.push(random);
    }

    Ok(Shuffle {
        ciphers: mixed.into_iter().flatten().collect(),
        offsets,
        randoms,
    })
}

/// Mix `input.mixed_ciphers` and prove it with `rounds` cut-and-choose rounds.
///
/// Each round draws from its own ChaCha20 stream seeded from `rng`, so the result
/// depends only on `rng` and not on `nr_parallel`.
pub fn mix_ciphers<R: Rng + CryptoRng>(
    rng: &mut R,
    input: &MixInput,
    rounds: usize,
    nr_parallel: usize,
    teller: &dyn Teller,
) -> Result<CipherMix, Error> {
    let public_key = input.public_key()?;
    let original = &input.mixed_ciphers;
    let nr_ciphers = original.len();

    if nr_ciphers == 0 {
        return Err(Error::EmptyInput);
    }
    if rounds == 0 {
        return Err(Error::MalformedArtifact(
            "a mix needs at least one round".to_owned(),
        ));
    }

    teller.task("Producing final mixed ciphers", nr_ciphers);
    let mixed = shuffle_ciphers(rng, &public_key, original)?;
    teller.advance(nr_ciphers);
    teller.finish();

    let seeds: Vec<[u8; 32]> = (0..rounds).map(|_| rng.gen()).collect();

    teller.task("Producing ciphers for proof", nr_ciphers * rounds);
    let shadows = parallel_map(nr_parallel, rounds, |round| {
        let mut round_rng = ChaCha20Rng::from_seed(seeds[round]);
        let shuffle = shuffle_ciphers(&mut round_rng, &public_key, original);
        teller.advance(nr_ciphers);
        shuffle
    })?
    .into_iter()
    .collect::<Result<Vec<Shuffle>, Error>>()?;
    teller.finish();

    let mut cipher_mix = CipherMix {
        modulus: input.modulus.clone(),
        generator: input.generator.clone(),
        order: input.order.clone(),
        public: input.public.clone(),
        original_ciphers: original.clone(),
        mixed_ciphers: mixed.ciphers,
        cipher_collections: Vec::with_capacity(rounds),
        offset_collections: Vec::with_capacity(rounds),
        random_collections: Vec::with_capacity(rounds),
        challenge: String::new(),
    };
    let mut secrets = Vec::with_capacity(rounds);
    for shadow in shadows {
        cipher_mix.cipher_collections.push(shadow.ciphers);
        secrets.push((shadow.offsets, shadow.randoms));
    }

    cipher_mix.challenge = compute_mix_challenge(&cipher_mix);
    let bits = challenge_bits(&cipher_mix.challenge, rounds)?;

    teller.task("Answering according to challenge", rounds);
    let order = &public_key.params.order;
    for ((offsets, randoms), bit) in secrets.into_iter().zip(bits) {
        if bit == 0 {
            cipher_mix.offset_collections.push(offsets);
            cipher_mix.random_collections.push(randoms);
        } else {
            // Link the shadow to the final mix instead
            let mut new_offsets = vec![0; nr_ciphers];
            let mut new_randoms = vec![BigUint::from(0u32); nr_ciphers];
            for j in 0..nr_ciphers {
                new_offsets[offsets[j]] = mixed.offsets[j];
                new_randoms[offsets[j]] = mod_sub(&mixed.randoms[j], &randoms[j], order);
            }
            cipher_mix.offset_collections.push(new_offsets);
            cipher_mix.random_collections.push(new_randoms);
        }
        teller.advance(1);
    }
    teller.finish();

    Ok(cipher_mix)
}

/// SHA-256 over the lowercase hex of the group, the key, and every cipher of the
/// original list, the mixed list and each collection, in that order.
pub fn compute_mix_challenge(cipher_mix: &CipherMix) -> String {
    let mut hasher = Sha256::new();
    let mut update = |value: &BigUint| hasher.update(format!("{:x}", value).as_bytes());

    update(&cipher_mix.modulus);
    update(&cipher_mix.generator);
    update(&cipher_mix.order);
    update(&cipher_mix.public);

    let collections = cipher_mix.cipher_collections.iter().flatten();
    for cipher in cipher_mix
        .original_ciphers
        .iter()
        .chain(cipher_mix.mixed_ciphers.iter())
        .chain(collections)
    {
        update(&cipher.alpha);
        update(&cipher.beta);
    }

    hex::encode(hasher.finalize())
}

/// The first `rounds` challenge bits, least significant first.
///
/// The digest supplies the first 256 bits; further bits come from
/// `SHA256(challenge || counter)` blocks.
pub fn challenge_bits(challenge: &str, rounds: usize) -> Result<Vec<u8>, Error> {
    let value = BigUint::parse_bytes(challenge.as_bytes(), 16)
        .ok_or_else(|| Error::MalformedArtifact("challenge is not hexadecimal".to_owned()))?;

    let mut bits = padded_bits(&value);
    let mut counter = 0u64;
    while bits.len() < rounds {
        let mut hasher = Sha256::new();
        hasher.update(challenge.as_bytes());
        hasher.update(counter.to_string().as_bytes());
        bits.extend(padded_bits(&BigUint::from_bytes_be(&hasher.finalize())));
        counter += 1;
    }

    bits.truncate(rounds);
    Ok(bits)
}

fn padded_bits(value: &BigUint) -> Vec<u8> {
    let mut bits = bits_le(value);
    bits.resize(CHALLENGE_BLOCK_BITS.max(bits.len()), 0);
    bits
}

/// Verify a cipher mix: recompute the challenge, check every collection's shape,
/// then replay each round's revealed re-encryptions.
pub fn verify_cipher_mix(
    cipher_mix: &CipherMix,
    nr_parallel: usize,
    teller: &dyn Teller,
) -> Result<(), Error> {
    let public_key = cipher_mix.public_key()?;
    let params = &public_key.params;

    let original = &cipher_mix.original_ciphers;
    let mixed = &cipher_mix.mixed_ciphers;
    let nr_ciphers = original.len();
    let rounds = cipher_mix.cipher_collections.len();

    if compute_mix_challenge(cipher_mix) != cipher_mix.challenge {
        return Err(ValidationError::InvalidChallenge.into());
    }

    if rounds == 0
        || mixed.len() != nr_ciphers
        || cipher_mix.offset_collections.len() != rounds
        || cipher_mix.random_collections.len() != rounds
    {
        return Err(Error::MalformedArtifact(
            "cipher mix collections are not of the same size".to_owned(),
        ));
    }
    for round in 0..rounds {
        if cipher_mix.cipher_collections[round].len() != nr_ciphers
            || cipher_mix.random_collections[round].len() != nr_ciphers
            || !is_permutation(&cipher_mix.offset_collections[round], nr_ciphers)
        {
            return Err(Error::MalformedArtifact(format!(
                "round {} is not a permutation of {} ciphers",
                round, nr_ciphers
            )));
        }
    }
    for cipher in original
        .iter()
        .chain(mixed.iter())
        .chain(cipher_mix.cipher_collections.iter().flatten())
    {
        cipher.validate(params)?;
    }

    let bits = challenge_bits(&cipher_mix.challenge, rounds)?;

    teller.task("Verifying ciphers", nr_ciphers * rounds);
    let outcomes = parallel_map(nr_parallel, rounds, |round| {
        let outcome = verify_mix_round(
            &public_key,
            round,
            bits[round],
            original,
            mixed,
            &cipher_mix.cipher_collections[round],
            &cipher_mix.offset_collections[round],
            &cipher_mix.random_collections[round],
        );
        teller.advance(nr_ciphers);
        outcome
    })?;
    teller.finish();

    // Report the first failing round
    outcomes.into_iter().collect::<Result<Vec<()>, ValidationError>>()?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn verify_mix_round(
    public_key: &PublicKey,
    round: usize,
    bit: u8,
    original: &[Ciphertext],
    mixed: &[Ciphertext],
    ciphers: &[Ciphertext],
    offsets: &[usize],
    randoms: &[BigUint],
) -> Result<(), ValidationError> {
    let failure = |cipher: usize| ValidationError::MixingVerificationFailed { round, cipher, bit };

    for j in 0..original.len() {
        let (source, target) = if bit == 0 {
            (&original[j], &ciphers[offsets[j]])
        } else {
            (&ciphers[j], &mixed[offsets[j]])
        };

        let reencrypted = source
            .reencrypt_with_randomness(public_key, &randoms[j])
            .map_err(|_| failure(j))?;
        if &reencrypted != target {
            return Err(failure(j));
        }
    }

    Ok(())
}

fn is_permutation(offsets: &[usize], len: usize) -> bool {
    if offsets.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for offset in offsets {
        match seen.get_mut(*offset) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::test_groups::group_256;

    fn ballot_box(rng: &mut ChaCha20Rng, count: u32) -> (SecretKey, MixInput) {
        let (sk, pk) = generate_keypair(rng, &group_256());
        let ciphers = (0..count)
            .map(|m| {
                Ciphertext::encrypt_plaintext(rng, &pk, &BigUint::from(m))
                    .unwrap()
                    .0
            })
            .collect();
        (sk, MixInput::new(&pk, ciphers))
    }

    fn plaintexts(sk: &SecretKey, ciphers: &[Ciphertext]) -> Vec<BigUint> {
        let mut plaintexts: Vec<BigUint> = ciphers.iter().map(|c| sk.decrypt(c).unwrap()).collect();
        plaintexts.sort();
        plaintexts
    }

    #[test]
    fn test_shuffle() {
        let mut rng = ChaCha20Rng::seed_from_u64(50);
        let (sk, input) = ballot_box(&mut rng, 6);
        let pk = input.public_key().unwrap();

        let shuffle = shuffle_ciphers(&mut rng, &pk, &input.mixed_ciphers).unwrap();
        assert!(is_permutation(&shuffle.offsets, 6));
        for (i, cipher) in input.mixed_ciphers.iter().enumerate() {
            let expected = cipher
                .reencrypt_with_randomness(&pk, &shuffle.randoms[i])
                .unwrap();
            assert_eq!(shuffle.ciphers[shuffle.offsets[i]], expected);
        }
        assert_eq!(
            plaintexts(&sk, &shuffle.ciphers),
            plaintexts(&sk, &input.mixed_ciphers)
        );
    }

    #[test]
    fn test_mix_and_verify() {
        let mut rng = ChaCha20Rng::seed_from_u64(51);
        let (sk, input) = ballot_box(&mut rng, 5);

        let mix = mix_ciphers(&mut rng, &input, 16, 2, &SilentTeller).unwrap();
        verify_cipher_mix(&mix, 0, &SilentTeller).unwrap();
        verify_cipher_mix(&mix, 3, &SilentTeller).unwrap();

        assert_eq!(mix.original_ciphers, input.mixed_ciphers);
        assert_eq!(
            plaintexts(&sk, &mix.mixed_ciphers),
            plaintexts(&sk, &input.mixed_ciphers)
        );

        // Survives serialization
        let json = serde_json::to_string(&mix).unwrap();
        let parsed = CipherMix::from_json(&json).unwrap();
        parsed.verify(1, &SilentTeller).unwrap();

        // A mix document is a valid input to the next mix
        let next = MixInput::from_json(&json).unwrap();
        assert_eq!(next.mixed_ciphers, mix.mixed_ciphers);
    }

    #[test]
    fn test_parallelism_does_not_change_result() {
        let mut rng = ChaCha20Rng::seed_from_u64(52);
        let (_, input) = ballot_box(&mut rng, 4);

        let a = mix_ciphers(&mut ChaCha20Rng::seed_from_u64(7), &input, 8, 0, &SilentTeller).unwrap();
        let b = mix_ciphers(&mut ChaCha20Rng::seed_from_u64(7), &input, 8, 4, &SilentTeller).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_remix() {
        let mut rng = ChaCha20Rng::seed_from_u64(53);
        let (sk, input) = ballot_box(&mut rng, 4);

        let first = mix_ciphers(&mut rng, &input, 8, 0, &SilentTeller).unwrap();
        let second = first.remix(&mut rng, 8, 0, &SilentTeller).unwrap();
        second.verify(0, &SilentTeller).unwrap();

        assert_eq!(second.original_ciphers, first.mixed_ciphers);
        assert_eq!(
            plaintexts(&sk, &second.mixed_ciphers),
            plaintexts(&sk, &input.mixed_ciphers)
        );
    }

    #[test]
    fn test_tampering_detected() {
        let mut rng = ChaCha20Rng::seed_from_u64(54);
        let (_, input) = ballot_box(&mut rng, 4);
        let mix = mix_ciphers(&mut rng, &input, 12, 0, &SilentTeller).unwrap();

        // Any change to published ciphers breaks the challenge
        let mut tampered = mix.clone();
        tampered.mixed_ciphers.swap(0, 1);
        assert!(matches!(
            verify_cipher_mix(&tampered, 0, &SilentTeller),
            Err(Error::Validation(ValidationError::InvalidChallenge))
        ));

        // Changing a revealed random is caught by the round replay
        let mut tampered = mix.clone();
        tampered.random_collections[3][2] =
            (&tampered.random_collections[3][2] + 1u32) % &tampered.order;
        let bit = challenge_bits(&mix.challenge, 12).unwrap()[3];
        match verify_cipher_mix(&tampered, 0, &SilentTeller) {
            Err(Error::Validation(ValidationError::MixingVerificationFailed {
                round,
                cipher,
                bit: failed_bit,
            })) => {
                assert_eq!(round, 3);
                assert_eq!(cipher, 2);
                assert_eq!(failed_bit, bit);
            }
            other => panic!("unexpected result {:?}", other),
        }

        // Offsets must be a permutation
        let mut tampered = mix.clone();
        tampered.offset_collections[0][0] = tampered.offset_collections[0][1];
        assert!(matches!(
            verify_cipher_mix(&tampered, 0, &SilentTeller),
            Err(Error::MalformedArtifact(_))
        ));

        // Missing round
        let mut tampered = mix;
        tampered.random_collections.pop();
        assert!(matches!(
            verify_cipher_mix(&tampered, 0, &SilentTeller),
            Err(Error::MalformedArtifact(_))
        ));
    }

    #[test]
    fn test_mix_inputs_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(55);
        let (_, mut input) = ballot_box(&mut rng, 2);
        assert!(mix_ciphers(&mut rng, &input, 0, 0, &SilentTeller).is_err());

        input.mixed_ciphers.clear();
        assert!(matches!(
            mix_ciphers(&mut rng, &input, 4, 0, &SilentTeller),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_challenge_bits() {
        let challenge = "05";
        assert_eq!(challenge_bits(challenge, 4).unwrap(), vec![1, 0, 1, 0]);

        let long = challenge_bits(challenge, 600).unwrap();
        assert_eq!(long.len(), 600);
        assert!(long[..256].iter().skip(3).all(|bit| *bit == 0));
        assert!(long[256..].iter().any(|bit| *bit == 1));

        assert!(challenge_bits("xyz", 4).is_err());
    }
}
