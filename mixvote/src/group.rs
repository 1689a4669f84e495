use crate::arith::{is_probable_prime, random_below, random_in_range, random_safe_prime};
use crate::*;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

const RFC3526_2048_MODULUS: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
    29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
    EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
    E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
    C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
    83655D23DCA3AD961C62F356208552BB9ED529077096966D\
    670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
    E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
    DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
    15728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// ElGamal group parameters: a safe prime `p = 2q + 1` and a generator `g` of the
/// order-`q` subgroup of quadratic residues.
///
/// Immutable once generated and shared by every key and ciphertext of an election.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupParameters {
    #[serde(rename = "p", with = "serde_decimal")]
    pub modulus: BigUint,

    #[serde(rename = "q", with = "serde_decimal")]
    pub order: BigUint,

    #[serde(rename = "g", with = "serde_decimal")]
    pub generator: BigUint,
}

impl GroupParameters {
    /// Create group parameters, checking `p = 2q + 1`, `1 < g < p` and `g^q = 1 mod p`
    pub fn new(modulus: BigUint, order: BigUint, generator: BigUint) -> Result<Self, Error> {
        let params = GroupParameters {
            modulus,
            order,
            generator,
        };
        params.validate()?;
        Ok(params)
    }

    /// Generate fresh group parameters with a `bits`-bit safe prime modulus
    pub fn generate<R: Rng + CryptoRng>(rng: &mut R, bits: u64) -> Result<Self, Error> {
        let (modulus, order) = random_safe_prime(rng, bits)?;

        let two = BigUint::from(2u32);
        let generator = loop {
            let candidate = random_in_range(rng, &two, &modulus);
            if candidate.modpow(&order, &modulus).is_one() {
                break candidate;
            }
        };

        Ok(GroupParameters {
            modulus,
            order,
            generator,
        })
    }

    /// The 2048-bit MODP group of RFC 3526 (group 14), with generator 2.
    ///
    /// The modulus is congruent to 7 mod 8, so 2 is a quadratic residue and generates
    /// the order-q subgroup.
    pub fn rfc3526_2048() -> Self {
        let modulus = BigUint::parse_bytes(RFC3526_2048_MODULUS.as_bytes(), 16)
            .expect("RFC 3526 modulus is valid hexadecimal");
        let order = (&modulus - 1u32) >> 1usize;

        GroupParameters {
            modulus,
            order,
            generator: BigUint::from(2u32),
        }
    }

    /// Check the algebraic invariants of the group
    pub fn validate(&self) -> Result<(), Error> {
        let one = BigUint::one();

        if self.order.is_zero() || self.modulus != (&self.order << 1usize) + &one {
            return Err(Error::InvalidGroupParameters(
                "modulus is not 2 * order + 1".to_owned(),
            ));
        }
        if self.generator <= one || self.generator >= self.modulus {
            return Err(Error::InvalidGroupParameters(
                "generator out of range".to_owned(),
            ));
        }
        if !self.generator.modpow(&self.order, &self.modulus).is_one() {
            return Err(Error::InvalidGroupParameters(
                "generator does not generate the order-q subgroup".to_owned(),
            ));
        }

        Ok(())
    }

    /// Check that both `p` and `q` are (probable) primes. This is expensive for large groups.
    pub fn verify_primality<R: Rng + CryptoRng>(&self, rng: &mut R) -> Result<(), Error> {
        self.validate()?;

        if !is_probable_prime(rng, &self.order, arith::MILLER_RABIN_ROUNDS)
            || !is_probable_prime(rng, &self.modulus, arith::MILLER_RABIN_ROUNDS)
        {
            return Err(Error::InvalidGroupParameters(
                "modulus is not a safe prime".to_owned(),
            ));
        }

        Ok(())
    }

    /// Fail with `IncompatibleParameters` unless both operands share the same group
    pub fn check_compatible(&self, other: &GroupParameters) -> Result<(), Error> {
        if self != other {
            return Err(Error::IncompatibleParameters);
        }
        Ok(())
    }

    /// Uniformly random exponent in `[0, q)`
    pub fn random_exponent<R: Rng + CryptoRng>(&self, rng: &mut R) -> BigUint {
        random_below(rng, &self.order)
    }

    /// `g^exponent mod p`
    pub fn pow_g(&self, exponent: &BigUint) -> BigUint {
        self.generator.modpow(exponent, &self.modulus)
    }

    /// True if `element` is in `[1, p)`
    pub fn in_range(&self, element: &BigUint) -> bool {
        !element.is_zero() && element < &self.modulus
    }

    /// Map an integer plaintext into the order-q subgroup.
    ///
    /// `m + 1` is used when it is a quadratic residue, `p - (m + 1)` otherwise.
    /// Plaintexts must satisfy `m < q`.
    pub fn encode_element(&self, plaintext: &BigUint) -> Result<BigUint, Error> {
        if plaintext >= &self.order {
            return Err(Error::InvalidEncoding(format!(
                "plaintext {} does not fit in the group order",
                plaintext
            )));
        }

        let candidate = plaintext + 1u32;
        if candidate.modpow(&self.order, &self.modulus).is_one() {
            Ok(candidate)
        } else {
            Ok(&self.modulus - candidate)
        }
    }

    /// Inverse of `encode_element`
    pub fn decode_element(&self, element: &BigUint) -> Result<BigUint, Error> {
        if !self.in_range(element) {
            return Err(Error::InvalidEncoding(
                "group element out of range".to_owned(),
            ));
        }

        let candidate = if element <= &self.order {
            element.clone()
        } else {
            &self.modulus - element
        };

        Ok(candidate - 1u32)
    }
}

/// Small fixed groups for tests
#[cfg(test)]
pub(crate) mod test_groups {
    use super::*;

    /// A 256-bit safe prime group with generator 4
    pub fn group_256() -> GroupParameters {
        let modulus = BigUint::parse_bytes(
            b"98278737327211045549346363465370177641271201616682026024993926254733183311327",
            10,
        )
        .unwrap();
        let order = (&modulus - 1u32) >> 1usize;
        GroupParameters::new(modulus, order, BigUint::from(4u32)).unwrap()
    }
}
