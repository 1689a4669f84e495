//! Arbitrary-precision modular arithmetic, primality testing and prime generation.

use crate::Error;
use num_bigint::{BigInt, BigUint, RandBigInt, ToBigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

/// Number of Miller-Rabin rounds used when generating primes
pub const MILLER_RABIN_ROUNDS: usize = 40;

const SMALL_PRIMES: [u32; 46] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199,
];

/// Modular inverse of `a` modulo `modulus`, using the extended Euclidean algorithm.
pub fn mod_inverse(a: &BigUint, modulus: &BigUint) -> Result<BigUint, Error> {
    if modulus.is_zero() {
        return Err(Error::NoInverse);
    }
    let a = BigInt::from(a % modulus);
    let m = BigInt::from(modulus.clone());

    let egcd = a.extended_gcd(&m);
    if !egcd.gcd.is_one() {
        return Err(Error::NoInverse);
    }

    ToBigUint::to_biguint(&egcd.x.mod_floor(&m)).ok_or(Error::NoInverse)
}

/// Computes `numerator / denominator mod modulus`
pub fn mod_div(
    numerator: &BigUint,
    denominator: &BigUint,
    modulus: &BigUint,
) -> Result<BigUint, Error> {
    Ok((numerator * mod_inverse(denominator, modulus)?) % modulus)
}

/// `(a - b) mod modulus`, without underflowing
pub fn mod_sub(a: &BigUint, b: &BigUint, modulus: &BigUint) -> BigUint {
    let a = a % modulus;
    let b = b % modulus;
    if a >= b {
        a - b
    } else {
        modulus - b + a
    }
}

/// Uniformly random integer in `[0, bound)`
pub fn random_below<R: Rng + CryptoRng>(rng: &mut R, bound: &BigUint) -> BigUint {
    rng.gen_biguint_below(bound)
}

/// Uniformly random integer in `[low, high)`
pub fn random_in_range<R: Rng + CryptoRng>(rng: &mut R, low: &BigUint, high: &BigUint) -> BigUint {
    rng.gen_biguint_range(low, high)
}

/// Miller-Rabin probabilistic primality test, preceded by trial division with small primes.
pub fn is_probable_prime<R: Rng + CryptoRng>(rng: &mut R, n: &BigUint, rounds: usize) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);

    if n < &two {
        return false;
    }

    for small in SMALL_PRIMES.iter() {
        let small = BigUint::from(*small);
        if n == &small {
            return true;
        }
        if (n % &small).is_zero() {
            return false;
        }
    }

    // n - 1 = d * 2^s with d odd
    let n_minus_one = n - &one;
    let mut d = n_minus_one.clone();
    let mut s = 0usize;
    while d.is_even() {
        d >>= 1usize;
        s += 1;
    }

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
            if x == one {
                return false;
            }
        }
        return false;
    }

    true
}

/// Random prime of exactly `bits` bits
pub fn random_prime<R: Rng + CryptoRng>(rng: &mut R, bits: u64) -> Result<BigUint, Error> {
    if bits < 2 {
        return Err(Error::InvalidGroupParameters(format!(
            "cannot generate a {} bit prime",
            bits
        )));
    }

    let top = BigUint::one() << (bits as usize - 1);
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate |= &top;
        if bits > 2 {
            candidate |= BigUint::one();
        }
        if is_probable_prime(rng, &candidate, MILLER_RABIN_ROUNDS) {
            return Ok(candidate);
        }
    }
}

/// Random safe prime `p` of exactly `bits` bits, returned together with `q = (p - 1) / 2`
pub fn random_safe_prime<R: Rng + CryptoRng>(
    rng: &mut R,
    bits: u64,
) -> Result<(BigUint, BigUint), Error> {
    if bits < 16 {
        return Err(Error::InvalidGroupParameters(format!(
            "refusing to generate a {} bit safe prime",
            bits
        )));
    }

    let top = BigUint::one() << (bits as usize - 2);
    'candidate: loop {
        let mut q = rng.gen_biguint(bits - 1);
        q |= &top;
        q |= BigUint::one();
        let p: BigUint = (&q << 1usize) + 1u32;

        // Sieve both q and p with the small primes before running Miller-Rabin
        for small in SMALL_PRIMES.iter().skip(1) {
            let small = BigUint::from(*small);
            if (&q % &small).is_zero() || (&p % &small).is_zero() {
                continue 'candidate;
            }
        }

        if !is_probable_prime(rng, &q, 1) || !is_probable_prime(rng, &p, 1) {
            continue;
        }
        if is_probable_prime(rng, &q, MILLER_RABIN_ROUNDS)
            && is_probable_prime(rng, &p, MILLER_RABIN_ROUNDS)
        {
            return Ok((p, q));
        }
    }
}

/// Little-endian bits of `value`
pub fn bits_le(value: &BigUint) -> Vec<u8> {
    value.to_radix_le(2)
}
