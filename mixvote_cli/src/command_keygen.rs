use super::{expand, fail, parse_arg, read_file, write_new_file};
use crate::config::Config;
use mixvote::{generate_keypair, GroupParameters, PublicKey, TrusteeKeyFile};
use rand::rngs::OsRng;
use serde::Deserialize;

const COMMAND: &str = "keygen";

/// Group parameters, on their own or as part of a public key
#[derive(Deserialize)]
#[serde(untagged)]
enum ParamsDocument {
    PublicKey(PublicKey),
    Params(GroupParameters),
}

pub fn command_keygen(matches: &clap::ArgMatches, config: &Config) {
    // Unwrap is OK, KEYFILE is required
    let keyfile = expand(matches.value_of("KEYFILE").unwrap());
    let mut rng = OsRng;

    let params = if let Some(path) = matches.value_of("params") {
        let path = expand(path);
        let document: ParamsDocument = serde_json::from_str(&read_file(COMMAND, &path))
            .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)));
        let params = match document {
            ParamsDocument::PublicKey(key) => key.params,
            ParamsDocument::Params(params) => params,
        };
        params
            .validate()
            .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)));
        params
    } else {
        let bits = match matches.value_of("BITS") {
            Some(value) => Some(parse_arg::<u64>(COMMAND, "bits", value)),
            None => config.key_bits,
        };
        match bits {
            Some(bits) => {
                GroupParameters::generate(&mut rng, bits).unwrap_or_else(|e| fail(COMMAND, e))
            }
            None => GroupParameters::rfc3526_2048(),
        }
    };

    let (secret_key, _) = generate_keypair(&mut rng, &params);
    let proof = secret_key.prove_knowledge(&mut rng);
    let key_file = TrusteeKeyFile {
        secret_key,
        proof: Some(proof),
    };

    let contents = serde_json::to_string_pretty(&key_file).unwrap_or_else(|e| fail(COMMAND, e));
    write_new_file(COMMAND, &keyfile, &contents);

    // Unwrap is OK, the proof was just set
    let registration = key_file.registered_key().unwrap();
    let registration =
        serde_json::to_string_pretty(&registration).unwrap_or_else(|e| fail(COMMAND, e));

    println!("{}", registration);
}
