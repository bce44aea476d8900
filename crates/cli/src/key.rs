//! `stockmatch key`: show how text normalizes into match keys.

use std::io::Write;

use serde::Serialize;
use stockmatch_recon::normalize::filename_stem;
use stockmatch_recon::{normalize, tokenize, NormalizedKey, TokenRules};

use crate::exit_codes::EXIT_ERROR;
use crate::CliError;

#[derive(Debug, Serialize)]
struct KeyLine<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stem: Option<&'a str>,
    key: NormalizedKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    tokens: Option<Vec<String>>,
}

fn key_line<'a>(text: &'a str, tokens: bool, filename: bool, rules: &TokenRules) -> KeyLine<'a> {
    let stem = filename.then(|| filename_stem(text));
    let basis = stem.unwrap_or(text);
    KeyLine {
        input: text,
        stem,
        key: normalize(basis),
        tokens: tokens.then(|| tokenize(basis, rules).iter().map(String::from).collect()),
    }
}

pub fn cmd_key(texts: Vec<String>, tokens: bool, filename: bool, json: bool) -> Result<(), CliError> {
    let rules = TokenRules::default();
    let lines: Vec<KeyLine> = texts
        .iter()
        .map(|t| key_line(t, tokens, filename, &rules))
        .collect();

    let out_err = |e: std::io::Error| CliError {
        code: EXIT_ERROR,
        message: format!("cannot write to stdout: {e}"),
        hint: None,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if json {
        let json_str = serde_json::to_string_pretty(&lines).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        writeln!(out, "{json_str}").map_err(out_err)?;
        return Ok(());
    }

    for line in &lines {
        match line.tokens {
            Some(ref toks) => writeln!(out, "{}\t{}", line.key, toks.join(" ")),
            None => writeln!(out, "{}", line.key),
        }
        .map_err(out_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_mode_strips_size_suffix() {
        let line = key_line("uploads/2023/coco-bulk-600x600.jpg", false, true, &TokenRules::default());
        assert_eq!(line.stem, Some("coco-bulk"));
        assert_eq!(line.key.as_str(), "cocobulk");
        assert!(line.tokens.is_none());
    }

    #[test]
    fn tokens_drop_stopwords_and_short_words() {
        let line = key_line("Big Bud Bloom Booster (1 Liter)", true, false, &TokenRules::default());
        assert_eq!(line.key.as_str(), "bigbudbloombooster1liter");
        let tokens = line.tokens.unwrap();
        assert!(tokens.contains(&"bloom".to_string()));
        assert!(!tokens.contains(&"1".to_string()));
    }
}
