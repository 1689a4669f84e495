//! Canonical serialization of integers as decimal strings.
//!
//! Every integer in a published artifact is written as a decimal string so that
//! independent implementations produce byte-identical files. Reading also accepts
//! plain JSON unsigned integers.
//!
//! Use with `#[serde(with = "serde_decimal")]` on `BigUint` fields, or one of the
//! submodules for collections.

use num_bigint::BigUint;
use num_traits::Num;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrUint {
    String(String),
    Uint(u64),
}

/// A `BigUint` that (de)serializes as a decimal string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal(pub BigUint);

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize(deserializer).map(Decimal)
    }
}

pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    value.to_str_radix(10).serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    let su: StringOrUint = Deserialize::deserialize(deserializer)?;
    match su {
        StringOrUint::String(s) => BigUint::from_str_radix(&s, 10).map_err(de::Error::custom),
        StringOrUint::Uint(u) => Ok(BigUint::from(u)),
    }
}

/// `Vec<BigUint>` as a list of decimal strings
pub mod vec {
    use super::*;

    pub fn serialize<S>(values: &[BigUint], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(values.iter().map(|v| v.to_str_radix(10)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<BigUint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values: Vec<Decimal> = Deserialize::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.0).collect())
    }
}

/// `Vec<Vec<BigUint>>` as nested lists of decimal strings
pub mod nested {
    use super::*;

    pub fn serialize<S>(values: &[Vec<BigUint>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(
            values
                .iter()
                .map(|row| row.iter().map(|v| v.to_str_radix(10)).collect::<Vec<_>>()),
        )
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<BigUint>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values: Vec<Vec<Decimal>> = Deserialize::deserialize(deserializer)?;
        Ok(values
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.0).collect())
            .collect())
    }
}

/// `Vec<Vec<usize>>` (permutation offsets) as nested lists of decimal strings
pub mod offsets {
    use super::*;

    pub fn serialize<S>(values: &[Vec<usize>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(
            values
                .iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect::<Vec<_>>()),
        )
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<usize>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values: Vec<Vec<StringOrUint>> = Deserialize::deserialize(deserializer)?;
        values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| match v {
                        StringOrUint::String(s) => s
                            .parse::<usize>()
                            .map_err(<D::Error as de::Error>::custom),
                        StringOrUint::Uint(u) => Ok(u as usize),
                    })
                    .collect::<Result<Vec<usize>, D::Error>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Sample {
        #[serde(with = "crate::serde_decimal")]
        single: BigUint,
        #[serde(with = "crate::serde_decimal::vec")]
        list: Vec<BigUint>,
        #[serde(with = "crate::serde_decimal::offsets")]
        offsets: Vec<Vec<usize>>,
    }

    #[test]
    fn test_decimal_strings() {
        let sample = Sample {
            single: BigUint::from(12345678901234567890u64) * 1000u32,
            list: vec![BigUint::from(1u32), BigUint::from(2u32)],
            offsets: vec![vec![1, 0]],
        };

        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(
            json,
            r#"{"single":"12345678901234567890000","list":["1","2"],"offsets":[["1","0"]]}"#
        );

        let parsed: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample);
    }

    #[test]
    fn test_accepts_plain_integers() {
        let parsed: Sample =
            serde_json::from_str(r#"{"single":7,"list":[3,"4"],"offsets":[[0]]}"#).unwrap();
        assert_eq!(parsed.single, BigUint::from(7u32));
        assert_eq!(parsed.list, vec![BigUint::from(3u32), BigUint::from(4u32)]);
    }

    #[test]
    fn test_rejects_garbage() {
        let parsed: Result<Sample, _> =
            serde_json::from_str(r#"{"single":"12x","list":[],"offsets":[]}"#);
        assert!(parsed.is_err());

        let parsed: Result<Sample, _> = serde_json::from_str(r#"{"single":1.5,"list":[],"offsets":[]}"#);
        assert!(parsed.is_err());
    }
}
