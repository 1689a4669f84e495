use super::{expand, fail, parse_arg, read_file, write_new_file};
use mixvote::{PublicKey, VoteRecord};
use rand::rngs::OsRng;

const COMMAND: &str = "vote";

pub fn command_vote(matches: &clap::ArgMatches) {
    // Unwraps are OK, all these args are required
    let key_file = expand(matches.value_of("PUBLIC-KEY").unwrap());
    let choices = matches.value_of("CHOICES").unwrap();
    let nr_candidates: usize =
        parse_arg(COMMAND, "candidates", matches.value_of("CANDIDATES").unwrap());
    let output = expand(matches.value_of("OUTPUT").unwrap());
    let context = matches.value_of("context").unwrap_or("");

    let selection: Vec<usize> = choices
        .split(',')
        .map(str::trim)
        .filter(|choice| !choice.is_empty())
        .map(|choice| parse_arg(COMMAND, "choice", choice))
        .collect();

    let public_key: PublicKey = serde_json::from_str(&read_file(COMMAND, &key_file))
        .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", key_file, e)));
    public_key
        .validate()
        .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", key_file, e)));

    let (record, randomness) =
        VoteRecord::cast(&mut OsRng, &public_key, &selection, nr_candidates, context)
            .unwrap_or_else(|e| fail(COMMAND, e));

    let contents = serde_json::to_string_pretty(&record).unwrap_or_else(|e| fail(COMMAND, e));
    write_new_file(COMMAND, &output, &contents);

    // Unwrap is OK, cast succeeded so the selection encodes
    let encoded = mixvote::encoding::encode(&selection, nr_candidates).unwrap();
    println!("encoded selection: {}", encoded);
    println!("encryption randomness: {}", randomness);
}
