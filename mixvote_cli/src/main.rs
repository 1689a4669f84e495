use clap::{App, AppSettings, Arg, SubCommand};
use num_enum::TryFromPrimitive;
use std::path::Path;

mod command_combine;
mod command_decrypt;
mod command_download;
mod command_keygen;
mod command_mix;
mod command_upload;
mod command_verify;
mod command_vote;
mod config;
mod rest;
mod teller;

use config::Config;

#[derive(TryFromPrimitive, PartialEq, PartialOrd, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Verbosity {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
}

fn main() {
    let matches = App::new("mixvote")
        .version("0.1")
        .about("Trustee and auditor tool for verifiable ElGamal elections")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .help("Only print errors"),
        )
        .subcommand(
            SubCommand::with_name("download")
                .about("Download ciphers or a mix for one or more polls")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("ciphers")
                        .about("Download the ballot ciphers to decrypt")
                        .arg(Arg::with_name("URL").index(1).required(true))
                        .arg(Arg::with_name("FILE").index(2).required(true)),
                )
                .subcommand(
                    SubCommand::with_name("mix")
                        .about("Download the latest mix (or ballot box) to mix")
                        .arg(Arg::with_name("URL").index(1).required(true))
                        .arg(Arg::with_name("FILE").index(2).required(true)),
                ),
        )
        .subcommand(
            SubCommand::with_name("upload")
                .about("Upload a mix or decryption factors")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("mix")
                        .about("Upload a mix")
                        .arg(Arg::with_name("FILE").index(1).required(true))
                        .arg(Arg::with_name("URL").index(2).required(true)),
                )
                .subcommand(
                    SubCommand::with_name("factors")
                        .about("Upload decryption factors for every poll")
                        .arg(Arg::with_name("FILE").index(1).required(true))
                        .arg(Arg::with_name("URL").index(2).required(true)),
                ),
        )
        .subcommand(
            SubCommand::with_name("mix")
                .about("Re-encrypt and shuffle ciphers, with a proof of correct mixing")
                .arg(Arg::with_name("INPUT").index(1).required(true))
                .arg(Arg::with_name("OUTPUT").index(2).required(true))
                .arg(
                    Arg::with_name("ROUNDS")
                        .index(3)
                        .required(true)
                        .help("Number of proof rounds, 128 or more recommended"),
                )
                .arg(Arg::with_name("PARALLEL").index(4).required(true)),
        )
        .subcommand(
            SubCommand::with_name("verify-mix")
                .about("Verify a mix and its proof")
                .arg(Arg::with_name("FILE").index(1).required(true))
                .arg(Arg::with_name("PARALLEL").index(2).required(false)),
        )
        .subcommand(
            SubCommand::with_name("decrypt")
                .about("Compute this trustee's decryption factors, with proofs")
                .arg(Arg::with_name("CIPHERS").index(1).required(true))
                .arg(Arg::with_name("FACTORS-OUT").index(2).required(true))
                .arg(Arg::with_name("KEYFILE").index(3).required(true))
                .arg(Arg::with_name("PARALLEL").index(4).required(true)),
        )
        .subcommand(
            SubCommand::with_name("combine")
                .about("Combine every trustee's decryption factors and print the plaintexts")
                .arg(Arg::with_name("CIPHERS").index(1).required(true))
                .arg(
                    Arg::with_name("FACTORS")
                        .index(2)
                        .required(true)
                        .multiple(true),
                )
                .arg(
                    Arg::with_name("candidates")
                        .long("candidates")
                        .takes_value(true)
                        .help("Decode plaintexts as selections out of this many candidates"),
                )
                .arg(
                    Arg::with_name("keys")
                        .long("keys")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .help("Trustee public key or registration file, once per factors file in the same order. Factor proofs are checked against it"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Verify a vote record, optionally revealing it with its randomness")
                .arg(Arg::with_name("FILE").index(1).required(true))
                .arg(Arg::with_name("RANDOMNESS").index(2).required(false))
                .arg(Arg::with_name("PLAINTEXT").index(3).required(false)),
        )
        .subcommand(
            SubCommand::with_name("keygen")
                .about("Generate a trustee key file with a proof of key knowledge")
                .arg(Arg::with_name("KEYFILE").index(1).required(true))
                .arg(
                    Arg::with_name("BITS")
                        .index(2)
                        .required(false)
                        .help("Generate a fresh group of this size instead of the fixed 2048-bit group"),
                )
                .arg(
                    Arg::with_name("params")
                        .long("params")
                        .takes_value(true)
                        .conflicts_with("BITS")
                        .help("Use the group of an existing parameters or public key file"),
                ),
        )
        .subcommand(
            SubCommand::with_name("vote")
                .about("Encrypt a selection into a vote record")
                .arg(Arg::with_name("PUBLIC-KEY").index(1).required(true))
                .arg(
                    Arg::with_name("CHOICES")
                        .index(2)
                        .required(true)
                        .help("Comma separated option indices, in order of preference"),
                )
                .arg(Arg::with_name("CANDIDATES").index(3).required(true))
                .arg(Arg::with_name("OUTPUT").index(4).required(true))
                .arg(
                    Arg::with_name("context")
                        .long("context")
                        .takes_value(true)
                        .help("Context the encryption proof is bound to"),
                ),
        )
        .get_matches();

    let verbosity = if matches.is_present("quiet") {
        Verbosity::Error
    } else {
        let level = (Verbosity::Warn as u8 + matches.occurrences_of("v") as u8).min(3);
        Verbosity::try_from_primitive(level).unwrap_or(Verbosity::Info)
    };

    let config = Config::from_env();
    if verbosity >= Verbosity::Info {
        eprintln!("URI: {}", config.uri);
    }

    // Subcommands
    match matches.subcommand() {
        ("download", Some(matches)) => command_download::command_download(matches, &config),
        ("upload", Some(matches)) => command_upload::command_upload(matches, &config),
        ("mix", Some(matches)) => command_mix::command_mix(matches, verbosity),
        ("verify-mix", Some(matches)) => {
            command_mix::command_verify_mix(matches, &config, verbosity)
        }
        ("decrypt", Some(matches)) => command_decrypt::command_decrypt(matches, verbosity),
        ("combine", Some(matches)) => command_combine::command_combine(matches),
        ("verify", Some(matches)) => command_verify::command_verify(matches),
        ("keygen", Some(matches)) => command_keygen::command_keygen(matches, &config),
        ("vote", Some(matches)) => command_vote::command_vote(matches),
        _ => unreachable!(),
    }
}

/// Print an error for `command` and exit non-zero
pub fn fail(command: &str, message: impl std::fmt::Display) -> ! {
    eprintln!("mixvote {}: {}", command, message);
    std::process::exit(1);
}

pub fn expand(input: &str) -> String {
    shellexpand::full(input)
        .unwrap_or_else(|e| fail("", format!("cannot expand {}: {}", input, e)))
        .into_owned()
}

pub fn parse_arg<T: std::str::FromStr>(command: &str, name: &str, value: &str) -> T {
    value
        .parse()
        .unwrap_or_else(|_| fail(command, format!("invalid {}: {}", name, value)))
}

pub fn read_file(command: &str, path: &str) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(command, format!("unable to read {}: {}", path, e)))
}

/// Write `contents` to a new file, refusing to overwrite an existing one
pub fn write_new_file(command: &str, path: &str, contents: &str) {
    if Path::new(path).exists() {
        fail(
            command,
            format!("file '{}' already exists, will not overwrite", path),
        );
    }
    std::fs::write(path, contents)
        .unwrap_or_else(|e| fail(command, format!("unable to write {}: {}", path, e)));
}

/// `path.index`, the file for one poll of a multi-poll election
pub fn poll_path(path: &str, index: usize) -> String {
    format!("{}.{}", path, index)
}

/// The poll files behind `path`: the file itself if it exists, otherwise
/// `path.0`, `path.1`, ... for as long as they exist.
pub fn poll_files(path: &str) -> Vec<(Option<usize>, String)> {
    if Path::new(path).is_file() {
        return vec![(None, path.to_owned())];
    }

    (0..)
        .map(|i| (Some(i), poll_path(path, i)))
        .take_while(|(_, file)| Path::new(file).is_file())
        .collect()
}

/// The output file matching an input returned by `poll_files`
pub fn output_for(path: &str, index: Option<usize>) -> String {
    match index {
        Some(i) => poll_path(path, i),
        None => path.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_files() {
        let dir = std::env::temp_dir().join(format!("mixvote-polls-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let base = dir.join("ciphers").to_string_lossy().into_owned();

        assert!(poll_files(&base).is_empty());

        std::fs::write(poll_path(&base, 0), "{}").unwrap();
        std::fs::write(poll_path(&base, 1), "{}").unwrap();
        std::fs::write(poll_path(&base, 3), "{}").unwrap();
        let files = poll_files(&base);
        assert_eq!(
            files,
            vec![
                (Some(0), poll_path(&base, 0)),
                (Some(1), poll_path(&base, 1))
            ]
        );
        assert_eq!(output_for("out", Some(1)), "out.1");

        std::fs::write(&base, "{}").unwrap();
        assert_eq!(poll_files(&base), vec![(None, base.clone())]);
        assert_eq!(output_for("out", None), "out");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
