use super::{expand, fail, output_for, parse_arg, poll_files, read_file, write_new_file, Verbosity};
use crate::teller::ConsoleTeller;
use mixvote::{
    compute_decryption_factors, Ciphertext, Error, FactorsAndProofs, MixInput, PublicKey, SecretKey,
    TrusteeKeyFile,
};
use rand::rngs::OsRng;
use serde::Deserialize;
use std::path::Path;

const COMMAND: &str = "decrypt";

#[derive(Deserialize)]
struct TallyInner {
    tally: Vec<Vec<Ciphertext>>,
}

#[derive(Deserialize)]
struct TallyDocument {
    tally: TallyInner,
}

/// The cipher documents a trustee may be asked to decrypt
#[derive(Deserialize)]
#[serde(untagged)]
enum CipherDocument {
    Tally(TallyDocument),
    Mix(MixInput),
    List(Vec<Ciphertext>),
}

/// A poll's ciphers, with the election key when the document names one
pub struct CipherSet {
    pub ciphers: Vec<Ciphertext>,
    pub public_key: Option<PublicKey>,
}

impl CipherSet {
    /// Fail with `IncompatibleParameters` if the ciphers belong to another group than `secret_key`
    pub fn check_trustee_key(&self, secret_key: &SecretKey) -> Result<(), Error> {
        match &self.public_key {
            Some(public_key) => secret_key
                .public_key
                .params
                .check_compatible(&public_key.params),
            None => Ok(()),
        }
    }
}

/// Parse a poll's ciphers from a tally document, a mix, or a plain list of ciphers
pub fn parse_ciphers(json: &str) -> Result<CipherSet, String> {
    let document: CipherDocument = serde_json::from_str(json)
        .map_err(|_| "expected a tally, a mix or a list of ciphers".to_owned())?;

    match document {
        CipherDocument::Tally(mut document) => {
            if document.tally.tally.is_empty() {
                return Err("tally holds no ciphers".to_owned());
            }
            Ok(CipherSet {
                ciphers: document.tally.tally.remove(0),
                public_key: None,
            })
        }
        CipherDocument::Mix(mix) => {
            let public_key = mix.public_key().map_err(|e| e.to_string())?;
            Ok(CipherSet {
                ciphers: mix.mixed_ciphers,
                public_key: Some(public_key),
            })
        }
        CipherDocument::List(ciphers) => Ok(CipherSet {
            ciphers,
            public_key: None,
        }),
    }
}

pub fn command_decrypt(matches: &clap::ArgMatches, verbosity: Verbosity) {
    // Unwraps are OK, all these args are required
    let ciphers_file = expand(matches.value_of("CIPHERS").unwrap());
    let factors_out = expand(matches.value_of("FACTORS-OUT").unwrap());
    let keyfile = expand(matches.value_of("KEYFILE").unwrap());
    let parallel: usize = parse_arg(COMMAND, "parallel", matches.value_of("PARALLEL").unwrap());

    let key = TrusteeKeyFile::from_json(&read_file(COMMAND, &keyfile))
        .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", keyfile, e)));
    let secret_key = key.secret_key;

    let files = poll_files(&ciphers_file);
    if files.is_empty() {
        fail(COMMAND, format!("no ciphers found at {}", ciphers_file));
    }

    let teller = ConsoleTeller::new(verbosity);
    for (index, path) in files {
        let out_path = output_for(&factors_out, index);
        if Path::new(&out_path).exists() {
            eprintln!("file '{}' already exists, will not overwrite", out_path);
            continue;
        }

        let cipher_set = parse_ciphers(&read_file(COMMAND, &path))
            .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)));
        cipher_set
            .check_trustee_key(&secret_key)
            .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)));
        let ciphers = cipher_set.ciphers;

        let factors =
            compute_decryption_factors(&mut OsRng, &secret_key, &ciphers, parallel, &teller)
                .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)));

        let upload = FactorsAndProofs::from_factors(vec![factors]);
        let contents = serde_json::to_string(&upload).unwrap_or_else(|e| fail(COMMAND, e));
        write_new_file(COMMAND, &out_path, &contents);

        if verbosity >= Verbosity::Warn {
            println!("{}: {} decryption factors", out_path, ciphers.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixvote::GroupParameters;
    use num_bigint::BigUint;

    #[test]
    fn test_parse_ciphers() {
        let tally = r#"{"tally": {"tally": [[{"alpha": "2", "beta": "3"}]]}}"#;
        let list = r#"[{"alpha": "2", "beta": "3"}]"#;
        let mix = r#"{"modulus": "23", "generator": "4", "order": "11", "public": "2",
                      "mixed_ciphers": [{"alpha": "2", "beta": "3"}], "challenge": "ab"}"#;

        for document in [tally, list, mix].iter() {
            let cipher_set = parse_ciphers(document).unwrap();
            assert_eq!(cipher_set.ciphers.len(), 1);
            assert_eq!(cipher_set.ciphers[0].alpha, BigUint::from(2u32));
        }
        assert!(parse_ciphers(mix).unwrap().public_key.is_some());
        assert!(parse_ciphers(list).unwrap().public_key.is_none());

        assert!(parse_ciphers(r#"{"tally": {"tally": []}}"#).is_err());
        assert!(parse_ciphers(r#"{"ciphers": 1}"#).is_err());
    }

    fn trustee_key(modulus: u32, order: u32) -> SecretKey {
        let params = GroupParameters::new(
            BigUint::from(modulus),
            BigUint::from(order),
            BigUint::from(4u32),
        )
        .unwrap();
        SecretKey::from_exponent(&params, BigUint::from(3u32)).unwrap()
    }

    #[test]
    fn test_mix_from_another_group_is_rejected() {
        let mix = r#"{"modulus": "23", "generator": "4", "order": "11", "public": "2",
                      "mixed_ciphers": [{"alpha": "2", "beta": "3"}]}"#;
        let cipher_set = parse_ciphers(mix).unwrap();

        cipher_set.check_trustee_key(&trustee_key(23, 11)).unwrap();
        assert!(matches!(
            cipher_set.check_trustee_key(&trustee_key(47, 23)),
            Err(Error::IncompatibleParameters)
        ));

        // Plain lists carry no group to compare against
        let list = parse_ciphers(r#"[{"alpha": "2", "beta": "3"}]"#).unwrap();
        list.check_trustee_key(&trustee_key(47, 23)).unwrap();
    }
}
