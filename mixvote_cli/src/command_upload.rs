use super::{expand, fail, poll_files, read_file, rest};
use crate::config::Config;

const COMMAND: &str = "upload";

pub fn command_upload(matches: &clap::ArgMatches, config: &Config) {
    match matches.subcommand() {
        ("mix", Some(matches)) => {
            // Unwraps are OK, both these args are required
            let file = expand(matches.value_of("FILE").unwrap());
            let url = rest::resolve(&config.uri, matches.value_of("URL").unwrap());
            upload_mix(&config.uri, &file, &url);
        }
        ("factors", Some(matches)) => {
            let file = expand(matches.value_of("FILE").unwrap());
            let url = rest::resolve(&config.uri, matches.value_of("URL").unwrap());
            upload_factors(&config.uri, &file, &url);
        }
        _ => unreachable!(),
    }
}

/// Upload a mix. A URL that is not a poll URL lists the poll URLs of the election,
/// and `file.N` is uploaded to the N-th poll.
fn upload_mix(base_uri: &str, file: &str, url: &str) {
    if !url.contains("polls") {
        let listing = rest::get_json(url).unwrap_or_else(|e| fail(COMMAND, e));
        let polls = rest::url_list(&listing)
            .unwrap_or_else(|| fail(COMMAND, format!("{} did not return a list of polls", url)));
        for (i, poll_url) in polls.iter().enumerate() {
            upload_mix(
                base_uri,
                &super::poll_path(file, i),
                &rest::resolve(base_uri, poll_url),
            );
        }
        return;
    }

    let contents = read_file(COMMAND, file);

    // Refuse to upload anything that is not a cipher mix
    if let Err(e) = mixvote::CipherMix::from_json(&contents) {
        fail(COMMAND, format!("{} is not a cipher mix: {}", file, e));
    }

    let (status, body) = rest::post_body(url, contents).unwrap_or_else(|e| fail(COMMAND, e));
    println!("{} {}", status, body);
}

/// Upload `file.0`, `file.1`, ... (or `file` itself) to the decryption URL of each
/// poll listed by the election document at `url`.
fn upload_factors(base_uri: &str, file: &str, url: &str) {
    // Without an election document the URL is the upload target itself
    let polls = rest::get_json(url)
        .ok()
        .and_then(|info| rest::poll_urls(&info, "post_decryption_url"));

    let files = poll_files(file);
    if files.is_empty() {
        fail(COMMAND, format!("no factors found at {}", file));
    }

    for (index, path) in files {
        let contents = read_file(COMMAND, &path);
        if let Err(e) = serde_json::from_str::<mixvote::FactorsAndProofs>(&contents) {
            fail(COMMAND, format!("{} is not a factors file: {}", path, e));
        }

        let target = match (&polls, index) {
            (Some(polls), Some(i)) => match polls.get(i) {
                Some(poll_url) => rest::resolve(base_uri, poll_url),
                None => fail(COMMAND, format!("election has no poll {}", i)),
            },
            (Some(polls), None) if polls.len() == 1 => rest::resolve(base_uri, &polls[0]),
            (Some(_), None) => fail(
                COMMAND,
                "election has several polls, expected numbered factors files",
            ),
            (None, _) => url.to_owned(),
        };

        let (status, body) = rest::post_form(&target, "factors_and_proofs", &contents)
            .unwrap_or_else(|e| fail(COMMAND, e));
        println!("{} {}", status, body);
    }
}
