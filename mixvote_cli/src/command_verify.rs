use super::{expand, fail, parse_arg, read_file};
use mixvote::{Error, VoteRecord};
use num_bigint::BigUint;

const COMMAND: &str = "verify";

pub fn command_verify(matches: &clap::ArgMatches) {
    // Unwrap is OK, FILE is required
    let file = expand(matches.value_of("FILE").unwrap());
    let randomness = matches
        .value_of("RANDOMNESS")
        .map(|value| parse_arg::<BigUint>(COMMAND, "randomness", value));
    let plaintext = matches
        .value_of("PLAINTEXT")
        .map(|value| parse_arg::<BigUint>(COMMAND, "plaintext", value));

    let record = VoteRecord::from_json(&read_file(COMMAND, &file))
        .unwrap_or_else(|e| fail(COMMAND, format!("{}: {}", file, e)));

    let report = match record.verify(randomness.as_ref(), plaintext.as_ref()) {
        Ok(report) => report,
        Err(Error::Validation(e)) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
        Err(e) => fail(COMMAND, e),
    };

    println!("VERIFIED: Proof of encryption");

    let encoded = match report.plaintext {
        Some(encoded) => encoded,
        None => return,
    };
    println!("plaintext:       {}", encoded);
    println!("max plaintext:   {}", report.max_encoding);

    if let Some(selection) = report.selection {
        println!();
        for (i, option) in selection.iter().enumerate() {
            let name = record
                .candidates
                .as_ref()
                .and_then(|candidates| candidates.get(*option))
                .map(|name| name.as_str())
                .unwrap_or("");
            println!("{}: [{}] {}", i, option, name);
        }
        println!();
    }
}
