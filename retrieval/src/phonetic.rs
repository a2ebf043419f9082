//! Phonetic coding of normalized terms.

/// Phonetic coder capability. Codes are stored alongside normalized terms but
/// ranking never reads them.
pub trait PhoneticCoder: Send + Sync {
    fn code(&self, word: &str) -> String;
}

/// American Soundex: first letter followed by three digits.
#[derive(Debug, Default, Clone, Copy)]
pub struct Soundex;

fn digit(c: char) -> u8 {
    match c {
        'B' | 'F' | 'P' | 'V' => b'1',
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => b'2',
        'D' | 'T' => b'3',
        'L' => b'4',
        'M' | 'N' => b'5',
        'R' => b'6',
        _ => b'0',
    }
}

impl PhoneticCoder for Soundex {
    fn code(&self, word: &str) -> String {
        let mut letters = word.chars().filter(|c| c.is_ascii_alphabetic()).map(|c| c.to_ascii_uppercase());
        let first = match letters.next() {
            Some(c) => c,
            None => return String::new(),
        };
        let mut out = String::with_capacity(4);
        out.push(first);
        let mut last = digit(first);
        for c in letters {
            if out.len() == 4 { break; }
            // H and W do not separate letters with the same code.
            if c == 'H' || c == 'W' { continue; }
            let d = digit(c);
            if d == b'0' {
                last = d;
                continue;
            }
            if d != last {
                out.push(d as char);
            }
            last = d;
        }
        while out.len() < 4 {
            out.push('0');
        }
        out
    }
}
