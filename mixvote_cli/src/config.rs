use std::env::var;

pub struct Config {
    /// Base for relative URLs given to `download` and `upload`
    pub uri: String,

    /// Default worker count when a command is not given one
    pub parallel: usize,

    /// Key size for `keygen`. None means the fixed 2048-bit group.
    pub key_bits: Option<u64>,
}

impl Config {
    pub fn from_env() -> Self {
        let uri = match var("MIXVOTE_URI") {
            Ok(val) => val,
            Err(_e) => "http://localhost:8000".to_owned(),
        };

        let parallel = match var("MIXVOTE_PARALLEL") {
            Ok(val) => val.parse().unwrap_or_else(|_| {
                eprintln!("mixvote: MIXVOTE_PARALLEL must be a number");
                std::process::exit(1);
            }),
            Err(_e) => 0,
        };

        let key_bits = match var("MIXVOTE_KEY_BITS") {
            Ok(val) => Some(val.parse().unwrap_or_else(|_| {
                eprintln!("mixvote: MIXVOTE_KEY_BITS must be a number");
                std::process::exit(1);
            })),
            Err(_e) => None,
        };

        Config {
            uri,
            parallel,
            key_bits,
        }
    }
}
