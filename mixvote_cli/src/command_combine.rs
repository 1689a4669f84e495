use super::command_decrypt::parse_ciphers;
use super::{expand, fail, parse_arg, read_file};
use mixvote::{
    decrypt_ciphers, encoding, verify_decryption_factors, Ciphertext, DecryptionFactor,
    FactorsAndProofs, GroupParameters, PublicKey, RegisteredKey,
};
use serde::Deserialize;

const COMMAND: &str = "combine";

/// Group parameters of a factors-bearing cipher document
#[derive(Deserialize)]
struct GroupDocument {
    #[serde(with = "mixvote::serde_decimal")]
    modulus: num_bigint::BigUint,
    #[serde(with = "mixvote::serde_decimal")]
    generator: num_bigint::BigUint,
    #[serde(with = "mixvote::serde_decimal")]
    order: num_bigint::BigUint,
}

/// A trustee key, as registered (with its proof) or bare
#[derive(Deserialize)]
#[serde(untagged)]
enum KeyDocument {
    Registered(RegisteredKey),
    Public(PublicKey),
}

/// Parse a trustee key file, checking the registration proof when there is one
pub fn parse_trustee_key(json: &str) -> Result<PublicKey, String> {
    let document: KeyDocument = serde_json::from_str(json)
        .map_err(|_| "expected a public key or a key registration".to_owned())?;

    let public_key = match document {
        KeyDocument::Registered(registration) => {
            registration.verify().map_err(|e| e.to_string())?;
            registration.public_key
        }
        KeyDocument::Public(public_key) => public_key,
    };
    public_key.validate().map_err(|e| e.to_string())?;
    Ok(public_key)
}

/// Check each trustee's factors against that trustee's key, in the same order
pub fn verify_trustee_factors(
    params: &GroupParameters,
    ciphers: &[Ciphertext],
    keys: &[PublicKey],
    factors: &[Vec<DecryptionFactor>],
) -> Result<(), String> {
    if keys.len() != factors.len() {
        return Err(format!(
            "{} trustee keys for {} factors files",
            keys.len(),
            factors.len()
        ));
    }

    for (trustee, (key, trustee_factors)) in keys.iter().zip(factors).enumerate() {
        params
            .check_compatible(&key.params)
            .and_then(|_| verify_decryption_factors(key, ciphers, trustee_factors))
            .map_err(|e| format!("trustee {}: {}", trustee, e))?;
    }

    Ok(())
}

pub fn command_combine(matches: &clap::ArgMatches) {
    // Unwraps are OK, both these args are required
    let ciphers_file = expand(matches.value_of("CIPHERS").unwrap());
    let factor_files: Vec<String> = matches.values_of("FACTORS").unwrap().map(expand).collect();
    let key_files: Option<Vec<String>> = matches.values_of("keys").map(|v| v.map(expand).collect());
    let nr_candidates: Option<usize> = matches
        .value_of("candidates")
        .map(|value| parse_arg(COMMAND, "candidates", value));

    let contents = read_file(COMMAND, &ciphers_file);
    let ciphers = parse_ciphers(&contents)
        .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", ciphers_file, e)))
        .ciphers;

    let group: GroupDocument = serde_json::from_str(&contents).unwrap_or_else(|_| {
        fail(
            COMMAND,
            format!("{}: group parameters are required, use a mix file", ciphers_file),
        )
    });
    let params = GroupParameters::new(group.modulus, group.order, group.generator)
        .unwrap_or_else(|e| fail(COMMAND, e));

    let mut all_factors = Vec::with_capacity(factor_files.len());
    for path in factor_files.iter() {
        let upload: FactorsAndProofs = serde_json::from_str(&read_file(COMMAND, path))
            .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)));
        let mut polls = upload
            .into_factors()
            .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)));
        if polls.len() != 1 {
            fail(COMMAND, format!("{}: expected factors for a single poll", path));
        }
        all_factors.push(polls.remove(0));
    }

    if let Some(key_files) = key_files {
        let keys: Vec<PublicKey> = key_files
            .iter()
            .map(|path| {
                parse_trustee_key(&read_file(COMMAND, path))
                    .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)))
            })
            .collect();
        verify_trustee_factors(&params, &ciphers, &keys, &all_factors)
            .unwrap_or_else(|e| fail(COMMAND, format!("FAILED: {}", e)));
    }

    let factor_sets: Vec<Vec<_>> = all_factors
        .into_iter()
        .map(|factors| factors.into_iter().map(|f| f.factor).collect())
        .collect();

    let plaintexts =
        decrypt_ciphers(&params, &ciphers, &factor_sets).unwrap_or_else(|e| fail(COMMAND, e));

    for plaintext in plaintexts {
        match nr_candidates {
            Some(n) => match encoding::decode(&plaintext, n) {
                Ok(selection) => println!("{} {:?}", plaintext, selection),
                Err(_) => println!("{} INVALID", plaintext),
            },
            None => println!("{}", plaintext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixvote::{compute_decryption_factors, generate_keypair, SilentTeller};
    use num_bigint::BigUint;
    use rand::rngs::OsRng;

    fn small_group() -> GroupParameters {
        let modulus: BigUint = "340282366920938463463374607431768223907".parse().unwrap();
        let order: BigUint = "170141183460469231731687303715884111953".parse().unwrap();
        GroupParameters::new(modulus, order, BigUint::from(4u32)).unwrap()
    }

    #[test]
    fn test_verify_trustee_factors() {
        let params = small_group();
        let (sk1, pk1) = generate_keypair(&mut OsRng, &params);
        let (sk2, pk2) = generate_keypair(&mut OsRng, &params);
        let joint = PublicKey::combine(&[pk1.clone(), pk2.clone()]).unwrap();

        let ciphers: Vec<Ciphertext> = (0u32..3)
            .map(|m| {
                Ciphertext::encrypt_plaintext(&mut OsRng, &joint, &BigUint::from(m))
                    .unwrap()
                    .0
            })
            .collect();
        let factors = vec![
            compute_decryption_factors(&mut OsRng, &sk1, &ciphers, 0, &SilentTeller).unwrap(),
            compute_decryption_factors(&mut OsRng, &sk2, &ciphers, 0, &SilentTeller).unwrap(),
        ];

        let keys = vec![pk1.clone(), pk2.clone()];
        verify_trustee_factors(&params, &ciphers, &keys, &factors).unwrap();

        // Keys in the wrong order name the first trustee
        let swapped = vec![pk2, pk1.clone()];
        let error = verify_trustee_factors(&params, &ciphers, &swapped, &factors).unwrap_err();
        assert!(error.starts_with("trustee 0:"));

        // A bad factor names its trustee and cipher
        let mut tampered = factors.clone();
        tampered[1][2].factor = (&tampered[1][2].factor * &params.generator) % &params.modulus;
        let error = verify_trustee_factors(&params, &ciphers, &keys, &tampered).unwrap_err();
        assert!(error.starts_with("trustee 1:"));
        assert!(error.contains("cipher 2"));

        assert!(verify_trustee_factors(&params, &ciphers, &keys[..1], &factors).is_err());
    }

    #[test]
    fn test_parse_trustee_key() {
        let params = small_group();
        let (sk, pk) = generate_keypair(&mut OsRng, &params);
        let registration = RegisteredKey {
            public_key: pk.clone(),
            proof: sk.prove_knowledge(&mut OsRng),
        };

        let json = serde_json::to_string(&registration).unwrap();
        assert_eq!(parse_trustee_key(&json).unwrap(), pk);

        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(parse_trustee_key(&json).unwrap(), pk);

        // A registration whose proof belongs to another key
        let (_, other) = generate_keypair(&mut OsRng, &params);
        let forged = RegisteredKey {
            public_key: other,
            proof: registration.proof,
        };
        assert!(parse_trustee_key(&serde_json::to_string(&forged).unwrap()).is_err());
    }
}
