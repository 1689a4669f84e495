//! Gamma encoding: a bijection between ordered selections of distinct options and
//! integers in `[0, max_encoding(n)]`.
//!
//! A selection of `k` options out of `n` is first rewritten as relative answers
//! (each choice indexed among the options not yet chosen), then read as a mixed-radix
//! number and shifted by the count of all shorter selections. The empty selection
//! encodes to 0 and shorter selections always encode below longer ones.

use crate::*;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

/// Largest number of options the encoder accepts
pub const MAX_CANDIDATES: usize = 1024;

/// Fail with `InvalidEncoding` unless `nr_candidates <= MAX_CANDIDATES`
pub fn check_nr_candidates(nr_candidates: usize) -> Result<(), Error> {
    if nr_candidates > MAX_CANDIDATES {
        return Err(Error::InvalidEncoding(format!(
            "{} candidates exceeds the limit of {}",
            nr_candidates, MAX_CANDIDATES
        )));
    }
    Ok(())
}

/// `offsets[k]` is the number of selections of length at most `k`, for `k` in `0..=n`
pub fn gamma_offsets(nr_candidates: usize) -> Result<Vec<BigUint>, Error> {
    check_nr_candidates(nr_candidates)?;

    let mut offsets = Vec::with_capacity(nr_candidates + 1);
    let mut permutations = BigUint::one();
    let mut sum = BigUint::zero();

    for k in 0..=nr_candidates {
        if k > 0 {
            permutations *= nr_candidates - k + 1;
        }
        sum += &permutations;
        offsets.push(sum.clone());
    }
    Ok(offsets)
}

// Product of (base + t) for t in 1..index
fn factor(base: usize, index: usize) -> BigUint {
    (1..index).fold(BigUint::one(), |acc, t| acc * (base + t))
}

/// Largest valid encoding for `nr_candidates` options
pub fn max_encoding(nr_candidates: usize) -> Result<BigUint, Error> {
    Ok(gamma_offsets(nr_candidates)?[nr_candidates].clone() - 1u32)
}

/// Largest valid encoding for selections of at most `max_choices` options
pub fn max_encoding_for(nr_candidates: usize, max_choices: usize) -> Result<BigUint, Error> {
    if max_choices > nr_candidates {
        return Err(Error::InvalidEncoding(format!(
            "max choices {} exceeds {} candidates",
            max_choices, nr_candidates
        )));
    }
    Ok(gamma_offsets(nr_candidates)?[max_choices].clone() - 1u32)
}

/// Rewrite absolute option indices as indices among the options still available
pub fn to_relative_answers(selection: &[usize], nr_candidates: usize) -> Result<Vec<usize>, Error> {
    check_nr_candidates(nr_candidates)?;
    let mut available: Vec<usize> = (0..nr_candidates).collect();
    let mut relative = Vec::with_capacity(selection.len());

    for choice in selection {
        let index = available
            .iter()
            .position(|candidate| candidate == choice)
            .ok_or_else(|| {
                Error::InvalidEncoding(format!(
                    "choice {} is out of range or selected twice",
                    choice
                ))
            })?;
        available.remove(index);
        relative.push(index);
    }

    Ok(relative)
}

/// Inverse of `to_relative_answers`
pub fn to_absolute_answers(relative: &[usize], nr_candidates: usize) -> Result<Vec<usize>, Error> {
    check_nr_candidates(nr_candidates)?;
    let mut available: Vec<usize> = (0..nr_candidates).collect();
    let mut selection = Vec::with_capacity(relative.len());

    for index in relative {
        if *index >= available.len() {
            return Err(Error::InvalidEncoding(format!(
                "relative answer {} out of range",
                index
            )));
        }
        selection.push(available.remove(*index));
    }

    Ok(selection)
}

/// Encode relative answers
pub fn encode_relative(relative: &[usize], nr_candidates: usize) -> Result<BigUint, Error> {
    check_nr_candidates(nr_candidates)?;
    let nr_choices = relative.len();
    if nr_choices > nr_candidates {
        return Err(Error::InvalidEncoding(format!(
            "{} choices for {} candidates",
            nr_choices, nr_candidates
        )));
    }
    if nr_choices == 0 {
        return Ok(BigUint::zero());
    }
    for (i, answer) in relative.iter().enumerate() {
        if *answer >= nr_candidates - i {
            return Err(Error::InvalidEncoding(format!(
                "relative answer {} out of range at position {}",
                answer, i
            )));
        }
    }

    let offsets = gamma_offsets(nr_candidates)?;
    let base = nr_candidates - nr_choices;

    let mut value = offsets[nr_choices - 1].clone();
    for i in 1..=nr_choices {
        value += factor(base, i) * relative[nr_choices - i];
    }
    Ok(value)
}

/// Decode to relative answers
pub fn decode_relative(value: &BigUint, nr_candidates: usize) -> Result<Vec<usize>, Error> {
    check_nr_candidates(nr_candidates)?;
    if value.is_zero() {
        return Ok(Vec::new());
    }

    let offsets = gamma_offsets(nr_candidates)?;
    if value >= &offsets[nr_candidates] {
        return Err(Error::InvalidEncoding(format!(
            "{} exceeds the maximum encoding for {} candidates",
            value, nr_candidates
        )));
    }

    // Number of offsets not greater than value
    let nr_choices = offsets.iter().take_while(|offset| *offset <= value).count();
    let base = nr_candidates - nr_choices;

    let mut remainder = value - &offsets[nr_choices - 1];
    let mut relative = Vec::with_capacity(nr_choices);
    for i in (1..=nr_choices).rev() {
        let (choice, rest) = remainder.div_rem(&factor(base, i));
        let choice = choice
            .to_usize()
            .ok_or_else(|| Error::InvalidEncoding("relative answer overflow".to_owned()))?;
        relative.push(choice);
        remainder = rest;
    }

    Ok(relative)
}

/// Encode an ordered selection of distinct option indices, each below `nr_candidates`
pub fn encode(selection: &[usize], nr_candidates: usize) -> Result<BigUint, Error> {
    let relative = to_relative_answers(selection, nr_candidates)?;
    encode_relative(&relative, nr_candidates)
}

/// Decode an integer back to the ordered selection it encodes
pub fn decode(value: &BigUint, nr_candidates: usize) -> Result<Vec<usize>, Error> {
    let relative = decode_relative(value, nr_candidates)?;
    to_absolute_answers(&relative, nr_candidates)
}

/// A question with its declared selection constraints
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub nr_candidates: usize,
    pub min_choices: usize,
    pub max_choices: usize,
}

impl Question {
    pub fn new(nr_candidates: usize, min_choices: usize, max_choices: usize) -> Result<Self, Error> {
        let question = Question {
            nr_candidates,
            min_choices,
            max_choices,
        };
        question.validate()?;
        Ok(question)
    }

    pub fn validate(&self) -> Result<(), Error> {
        check_nr_candidates(self.nr_candidates)?;
        if self.min_choices > self.max_choices || self.max_choices > self.nr_candidates {
            return Err(Error::InvalidEncoding(format!(
                "invalid choice bounds {}..={} for {} candidates",
                self.min_choices, self.max_choices, self.nr_candidates
            )));
        }
        Ok(())
    }

    pub fn max_encoding(&self) -> Result<BigUint, Error> {
        max_encoding_for(self.nr_candidates, self.max_choices)
    }

    pub fn encode(&self, selection: &[usize]) -> Result<BigUint, Error> {
        self.check_length(selection.len())?;
        encode(selection, self.nr_candidates)
    }

    pub fn decode(&self, value: &BigUint) -> Result<Vec<usize>, Error> {
        let selection = decode(value, self.nr_candidates)?;
        self.check_length(selection.len())?;
        Ok(selection)
    }

    fn check_length(&self, nr_choices: usize) -> Result<(), Error> {
        if nr_choices < self.min_choices || nr_choices > self.max_choices {
            return Err(Error::InvalidEncoding(format!(
                "{} choices outside of {}..={}",
                nr_choices, self.min_choices, self.max_choices
            )));
        }
        Ok(())
    }
}
