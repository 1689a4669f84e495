use super::{expand, fail, output_for, parse_arg, poll_files, read_file, write_new_file, Verbosity};
use crate::config::Config;
use crate::teller::ConsoleTeller;
use mixvote::{mix_ciphers, CipherMix, MixInput, MIN_MIX_ROUNDS};
use rand::rngs::OsRng;
use std::path::Path;

pub fn command_mix(matches: &clap::ArgMatches, verbosity: Verbosity) {
    const COMMAND: &str = "mix";

    // Unwraps are OK, all these args are required
    let input = expand(matches.value_of("INPUT").unwrap());
    let output = expand(matches.value_of("OUTPUT").unwrap());
    let rounds: usize = parse_arg(COMMAND, "rounds", matches.value_of("ROUNDS").unwrap());
    let parallel: usize = parse_arg(COMMAND, "parallel", matches.value_of("PARALLEL").unwrap());

    if rounds < MIN_MIX_ROUNDS && verbosity >= Verbosity::Warn {
        eprintln!(
            "mixvote mix: warning: {} rounds is below the recommended {}",
            rounds, MIN_MIX_ROUNDS
        );
    }

    if Path::new(&output).exists() {
        fail(
            COMMAND,
            format!("file '{}' already exists, will not overwrite", output),
        );
    }

    let files = poll_files(&input);
    if files.is_empty() {
        fail(COMMAND, format!("no input found at {}", input));
    }

    let teller = ConsoleTeller::new(verbosity);
    for (index, path) in files {
        let out_path = output_for(&output, index);
        if Path::new(&out_path).exists() {
            fail(
                COMMAND,
                format!("file '{}' already exists, will not overwrite", out_path),
            );
        }

        let mix_input = MixInput::from_json(&read_file(COMMAND, &path))
            .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)));

        let mix = mix_ciphers(&mut OsRng, &mix_input, rounds, parallel, &teller)
            .unwrap_or_else(|e| fail(COMMAND, e));

        let contents = serde_json::to_string(&mix).unwrap_or_else(|e| fail(COMMAND, e));
        write_new_file(COMMAND, &out_path, &contents);

        if verbosity >= Verbosity::Warn {
            println!(
                "{}: mixed {} ciphers with {} rounds",
                out_path,
                mix.mixed_ciphers.len(),
                rounds
            );
        }
    }
}

pub fn command_verify_mix(matches: &clap::ArgMatches, config: &Config, verbosity: Verbosity) {
    const COMMAND: &str = "verify-mix";

    // Unwrap is OK, FILE is required
    let file = expand(matches.value_of("FILE").unwrap());
    let parallel: usize = match matches.value_of("PARALLEL") {
        Some(value) => parse_arg(COMMAND, "parallel", value),
        None => config.parallel,
    };

    let files = poll_files(&file);
    if files.is_empty() {
        fail(COMMAND, format!("no mix found at {}", file));
    }

    let teller = ConsoleTeller::new(verbosity);
    for (_, path) in files {
        let mix = CipherMix::from_json(&read_file(COMMAND, &path))
            .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", path, e)));

        if let Err(e) = mix.verify(parallel, &teller) {
            fail(COMMAND, format!("{}: FAILED: {}", path, e));
        }

        println!(
            "{}: VERIFIED: {} ciphers, {} rounds",
            path,
            mix.mixed_ciphers.len(),
            mix.cipher_collections.len()
        );
    }
}
