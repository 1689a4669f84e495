use serde_json::Value;

/// Resolve `url` against the configured base URI unless it is already absolute
pub fn resolve(base_uri: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_owned()
    } else {
        format!(
            "{}/{}",
            base_uri.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

pub fn get_text(url: &str) -> Result<String, reqwest::Error> {
    let client = reqwest::blocking::Client::new();
    let res = client.get(url).send()?.error_for_status()?;
    res.text()
}

pub fn get_json(url: &str) -> Result<Value, reqwest::Error> {
    let client = reqwest::blocking::Client::new();
    let res: Value = client.get(url).send()?.error_for_status()?.json()?;
    Ok(res)
}

/// POST a JSON document as the request body, returning the response status and body
pub fn post_body(url: &str, body: String) -> Result<(u16, String), reqwest::Error> {
    let client = reqwest::blocking::Client::new();
    let res = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()?;
    let status = res.status().as_u16();
    Ok((status, res.text()?))
}

/// POST a single url-encoded form field
pub fn post_form(url: &str, field: &str, value: &str) -> Result<(u16, String), reqwest::Error> {
    let client = reqwest::blocking::Client::new();
    let res = client.post(url).form(&[(field, value)]).send()?;
    let status = res.status().as_u16();
    Ok((status, res.text()?))
}

/// Poll URLs listed in an election document `{"election": {"polls": [{<key>: url}, ..]}}`
pub fn poll_urls(info: &Value, key: &str) -> Option<Vec<String>> {
    let polls = info.get("election")?.get("polls")?.as_array()?;
    polls
        .iter()
        .map(|poll| poll.get(key)?.as_str().map(|s| s.to_owned()))
        .collect()
}

/// A plain JSON list of URLs
pub fn url_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|url| url.as_str().map(|s| s.to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        assert_eq!(
            resolve("http://election.local/", "/polls/1"),
            "http://election.local/polls/1"
        );
        assert_eq!(
            resolve("http://election.local", "https://other/mix"),
            "https://other/mix"
        );
    }

    #[test]
    fn test_poll_urls() {
        let info = serde_json::json!({
            "election": {"polls": [{"ciphers_url": "/a"}, {"ciphers_url": "/b"}]}
        });
        assert_eq!(
            poll_urls(&info, "ciphers_url"),
            Some(vec!["/a".to_owned(), "/b".to_owned()])
        );
        assert_eq!(poll_urls(&info, "post_decryption_url"), None);
        assert_eq!(
            url_list(&serde_json::json!(["/x", "/y"])),
            Some(vec!["/x".to_owned(), "/y".to_owned()])
        );
    }
}
