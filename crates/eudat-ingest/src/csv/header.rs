//! CSV header parsing and delimiter sniffing.

/// Delimiters tried when a file does not declare one.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Header row of a CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvHeader {
    /// Trimmed column names, in file order.
    pub columns: Vec<String>,
    pub delimiter: u8,
}

impl CsvHeader {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Picks the candidate delimiter occurring most often outside quotes.
///
/// Ties go to the earlier candidate, so `,` wins over `;`.
pub fn detect_delimiter(line: &str) -> u8 {
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(idx) = CANDIDATE_DELIMITERS.iter().position(|d| *d == byte) {
            counts[idx] += 1;
        }
    }
    let best = (1..counts.len()).fold(0, |best, idx| if counts[idx] > counts[best] { idx } else { best });
    CANDIDATE_DELIMITERS[best]
}

/// Splits one CSV line on `delimiter`, honouring quotes.
pub fn parse_csv_line(line: &str, delimiter: u8) -> Vec<String> {
    let delimiter = char::from(delimiter);
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quotes => in_quotes = true,
            '"' => {
                // "" inside quotes is a literal quote
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            c if c == delimiter && !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_line_simple() {
        assert_eq!(parse_csv_line("a,b,c", b','), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_csv_line_quoted() {
        assert_eq!(
            parse_csv_line("\"Rue de la Paix; 2\";b", b';'),
            vec!["Rue de la Paix; 2", "b"]
        );
    }

    #[test]
    fn test_parse_csv_line_escaped_quotes() {
        assert_eq!(
            parse_csv_line("\"he said \"\"hallo\"\"\",b", b','),
            vec!["he said \"hallo\"", "b"]
        );
    }

    #[test]
    fn test_parse_csv_line_trimmed() {
        assert_eq!(parse_csv_line("  a  \t  b  ", b'\t'), vec!["a", "b"]);
    }

    #[test]
    fn delimiter_is_sniffed_outside_quotes() {
        assert_eq!(detect_delimiter("nom;adresse;\"code,postal\""), b';');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
        assert_eq!(detect_delimiter("single"), b',');
    }
}
