// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises raw question and equation strings so that the
// whitespace tokenizer in data::vocab sees one token per word
// or symbol.
//
// Cleaning steps (applied in order):
//   1. Map tabs, NBSP, zero-width spaces and control chars to ' '
//   2. Detach symbols from words
//        questions:  ? , ! ; :  and a sentence-final '.'
//        equations:  ( ) + - * / ^   ("**" becomes "^")
//   3. Collapse runs of spaces and trim
//
// Example:
//   "How many apples?"       → "How many apples ?"
//   "(number0+number1)/2"    → "( number0 + number1 ) / 2"

pub struct Preprocessor;

const QUESTION_SYMBOLS: [char; 5] = ['?', ',', '!', ';', ':'];
const EQUATION_SYMBOLS: [char; 7] = ['(', ')', '+', '-', '*', '/', '^'];

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise whitespace only.
    pub fn clean(&self, text: &str) -> String {
        let mapped: String = text
            .chars()
            .map(|c| match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();
        collapse_spaces(&mapped)
    }

    /// Clean a question and detach punctuation from words.
    pub fn question(&self, text: &str) -> String {
        let cleaned = self.clean(text);
        let spaced: Vec<String> = cleaned
            .split(' ')
            .map(|word| {
                let mut out = String::with_capacity(word.len() + 4);
                for c in word.chars() {
                    if QUESTION_SYMBOLS.contains(&c) {
                        out.push(' ');
                        out.push(c);
                        out.push(' ');
                    } else {
                        out.push(c);
                    }
                }
                // "apples." → "apples ." but "3.5" stays intact
                if out.len() > 1 && out.ends_with('.') {
                    out.pop();
                    out.push_str(" .");
                }
                out
            })
            .collect();
        collapse_spaces(&spaced.join(" "))
    }

    /// Clean an equation and put every operator and paren in its own token.
    pub fn equation(&self, text: &str) -> String {
        let cleaned = self.clean(text).replace("**", "^");
        let mut out = String::with_capacity(cleaned.len() * 2);
        for c in cleaned.chars() {
            if EQUATION_SYMBOLS.contains(&c) {
                out.push(' ');
                out.push(c);
                out.push(' ');
            } else {
                out.push(c);
            }
        }
        collapse_spaces(&out)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
