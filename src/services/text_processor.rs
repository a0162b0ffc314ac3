// Text Processing Service
// Input normalization and word tokenization shared by segmentation and lexical cues

/// Normalize typographic punctuation and whitespace in review text
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;

    for ch in text.chars() {
        let mapped = match ch {
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{2014}' | '\u{2013}' => '-',
            '\u{3000}' | '\u{00A0}' | '\t' | '\x0B' | '\x0C' => ' ',
            '\r' => '\n',
            other => other,
        };

        // Collapse horizontal whitespace runs
        if mapped == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        out.push(mapped);
    }

    out.lines()
        .map(|ln| ln.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordToken {
    pub text: String,
    /// Position among word tokens (0-based).
    pub index: usize,
}

/// Lowercased runs of alphanumerics/underscore, in order.
///
/// Apostrophes split words ("it's" -> "it", "s"), matching `\w+` tokenization.
pub fn word_tokens(text: &str) -> Vec<WordToken> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, tokens: &mut Vec<WordToken>| {
        if !current.is_empty() {
            let index = tokens.len();
            tokens.push(WordToken {
                text: std::mem::take(current),
                index,
            });
        }
    };

    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            current.extend(ch.to_lowercase());
        } else {
            flush(&mut current, &mut tokens);
        }
    }
    flush(&mut current, &mut tokens);

    tokens
}
