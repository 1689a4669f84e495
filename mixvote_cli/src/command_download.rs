use super::{expand, fail, poll_path, rest, write_new_file};
use crate::config::Config;
use std::path::Path;

const COMMAND: &str = "download";

pub fn command_download(matches: &clap::ArgMatches, config: &Config) {
    match matches.subcommand() {
        ("ciphers", Some(matches)) => {
            // Unwraps are OK, both these args are required
            let url = rest::resolve(&config.uri, matches.value_of("URL").unwrap());
            let file = expand(matches.value_of("FILE").unwrap());
            download_ciphers(&url, &file);
        }
        ("mix", Some(matches)) => {
            let url = rest::resolve(&config.uri, matches.value_of("URL").unwrap());
            let file = expand(matches.value_of("FILE").unwrap());
            download_mix(&config.uri, &url, &file);
        }
        _ => unreachable!(),
    }
}

/// Download the ciphers of every poll listed by the election document at `url`
/// into `file.0`, `file.1`, ...; existing files are skipped.
fn download_ciphers(url: &str, file: &str) {
    let info = rest::get_json(url).unwrap_or_else(|e| fail(COMMAND, e));

    let polls = match rest::poll_urls(&info, "ciphers_url") {
        Some(polls) => polls,
        None => {
            // A single poll's ciphers
            let contents = serde_json::to_string(&info).unwrap_or_else(|e| fail(COMMAND, e));
            write_new_file(COMMAND, file, &contents);
            return;
        }
    };

    for (i, poll_url) in polls.iter().enumerate() {
        let poll_file = poll_path(file, i);
        if Path::new(&poll_file).exists() {
            println!("file '{}' already exists, will not overwrite", poll_file);
            continue;
        }

        let poll_url = rest::resolve(url, poll_url);
        let contents = rest::get_text(&poll_url).unwrap_or_else(|e| fail(COMMAND, e));
        write_new_file(COMMAND, &poll_file, &contents);
    }
}

/// Download the mix at `url`. A URL that is not a poll URL lists the poll URLs
/// of the election; each poll's mix is saved to `file.N`.
fn download_mix(base_uri: &str, url: &str, file: &str) {
    if Path::new(file).exists() {
        fail(
            COMMAND,
            format!("file '{}' already exists, will not overwrite", file),
        );
    }

    let contents = rest::get_text(url).unwrap_or_else(|e| fail(COMMAND, e));

    if !url.contains("polls") {
        let listing: serde_json::Value = serde_json::from_str(&contents).unwrap_or_else(|e| fail(COMMAND, e));
        let polls = rest::url_list(&listing)
            .unwrap_or_else(|| fail(COMMAND, format!("{} did not return a list of polls", url)));
        for (i, poll_url) in polls.iter().enumerate() {
            download_mix(base_uri, &rest::resolve(base_uri, poll_url), &poll_path(file, i));
        }
        return;
    }

    write_new_file(COMMAND, file, &contents);
}
