//! Text parsers that need no document structure

use regex::Regex;

/// Returns every maximal run of alphanumeric characters in `text`
pub fn words_parser(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds a parser returning every match of `expr`
///
/// When the expression has a capture group, the first group is the match;
/// otherwise the whole match is used. Empty matches are dropped.
pub fn regex_parser(expr: &str) -> Result<impl Fn(&str) -> Vec<String>, regex::Error> {
    let re = Regex::new(expr)?;
    Ok(move |text: &str| capture_all(&re, text))
}

/// Builds a parser returning e-mail addresses
pub fn email_parser() -> impl Fn(&str) -> Vec<String> {
    let re = Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}").ok();
    move |text: &str| match &re {
        Some(re) => capture_all(re, text),
        None => Vec::new(),
    }
}

fn capture_all(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
