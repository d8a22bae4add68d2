//! Token-level scan of a content stream.
//!
//! lopdf's content parser stops at the first inline image and drops the
//! rest of the stream. The scan splits a stream into operator runs and
//! inline images so that only the runs are handed to the parser, and counts
//! the operators in each run so a short parse can be detected.

pub(crate) enum Segment<'a> {
    Operators { bytes: &'a [u8], operators: usize },
    /// `BI ... ID <data> EI`, kept byte for byte.
    InlineImage(&'a [u8]),
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

enum Token<'a> {
    Keyword(&'a [u8]),
    Operand,
}

struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn skip_blank(&mut self) {
        while let Some(b) = self.peek(0) {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek(0) {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn skip_literal_string(&mut self) {
        let mut depth = 0usize;
        while let Some(b) = self.peek(0) {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'(' => depth += 1,
                b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Next token and the offset it starts at.
    fn next_token(&mut self) -> Option<(usize, Token<'a>)> {
        self.skip_blank();
        let start = self.pos;
        let first = self.peek(0)?;
        match first {
            b'(' => self.skip_literal_string(),
            b'<' if self.peek(1) == Some(b'<') => self.pos += 2,
            b'<' => {
                while let Some(b) = self.peek(0) {
                    self.pos += 1;
                    if b == b'>' {
                        break;
                    }
                }
            }
            b'>' if self.peek(1) == Some(b'>') => self.pos += 2,
            b'/' => {
                self.pos += 1;
                while self.peek(0).map_or(false, is_regular) {
                    self.pos += 1;
                }
            }
            b if is_delimiter(b) => self.pos += 1,
            _ => {
                while self.peek(0).map_or(false, is_regular) {
                    self.pos += 1;
                }
                let word = &self.data[start..self.pos];
                let numeric = matches!(first, b'0'..=b'9' | b'+' | b'-' | b'.');
                if !numeric && !matches!(word, b"true" | b"false" | b"null") {
                    return Some((start, Token::Keyword(word)));
                }
            }
        }
        Some((start, Token::Operand))
    }
}

/// End offset of the `EI` closing inline image data that starts at `from`.
fn inline_image_end(data: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 1 < data.len() {
        if &data[i..i + 2] == b"EI"
            && i > 0
            && is_whitespace(data[i - 1])
            && data.get(i + 2).map_or(true, |b| !is_regular(*b))
        {
            return Some(i + 2);
        }
        i += 1;
    }
    None
}

pub(crate) fn split_content(data: &[u8]) -> Result<Vec<Segment<'_>>, String> {
    let mut segments = Vec::new();
    let mut lexer = Lexer::new(data);
    let mut run_start = 0;
    let mut operators = 0;

    while let Some((start, token)) = lexer.next_token() {
        let word = match token {
            Token::Keyword(word) => word,
            Token::Operand => continue,
        };
        if word != b"BI" {
            operators += 1;
            continue;
        }

        segments.push(Segment::Operators {
            bytes: &data[run_start..start],
            operators,
        });
        operators = 0;

        loop {
            match lexer.next_token() {
                Some((_, Token::Keyword(word))) if word == b"ID" => break,
                Some(_) => {}
                None => return Err(format!("inline image at offset {start} has no ID")),
            }
        }
        // a single whitespace byte separates ID from the image data
        let end = inline_image_end(data, lexer.pos + 1)
            .ok_or_else(|| format!("inline image at offset {start} has no EI"))?;
        segments.push(Segment::InlineImage(&data[start..end]));
        lexer.pos = end;
        run_start = end;
    }

    segments.push(Segment::Operators {
        bytes: &data[run_start..],
        operators,
    });
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator_counts(segments: &[Segment]) -> Vec<usize> {
        segments
            .iter()
            .filter_map(|s| match s {
                Segment::Operators { operators, .. } => Some(*operators),
                Segment::InlineImage(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_counts_operators_not_operands() {
        let data = b"q 1 0 0 1 0 700 cm BT /F1 10 Tf (a (nested) T*) Tj [(x) -250 (y)] TJ ET Q";
        let segments = split_content(data).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(operator_counts(&segments), vec![8]);
    }

    #[test]
    fn test_keywords_inside_strings_and_comments_are_ignored() {
        let data = b"BT (BI ID EI) Tj <4249> Tj % BI in a comment\nET";
        let segments = split_content(data).unwrap();
        assert_eq!(operator_counts(&segments), vec![4]);
    }

    #[test]
    fn test_inline_image_is_split_out_verbatim() {
        let mut data = b"q 10 0 0 10 100 400 cm BI /W 2 /H 2 /CS /G /BPC 8 ID ".to_vec();
        data.extend_from_slice(&[0x00, 0xFF, b'E', 0x49]);
        data.extend_from_slice(b"\nEI Q BT (Body) Tj ET");
        let segments = split_content(&data).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(operator_counts(&segments), vec![2, 4]);
        match &segments[1] {
            Segment::InlineImage(bytes) => {
                assert!(bytes.starts_with(b"BI"));
                assert!(bytes.ends_with(b"EI"));
                assert!(bytes.windows(2).any(|w| w == [0x00, 0xFF]));
            }
            Segment::Operators { .. } => panic!("expected the inline image"),
        }
        let total: usize = segments
            .iter()
            .map(|s| match s {
                Segment::Operators { bytes, .. } | Segment::InlineImage(bytes) => bytes.len(),
            })
            .sum();
        assert_eq!(total, data.len());
    }

    #[test]
    fn test_unterminated_inline_image_is_an_error() {
        assert!(split_content(b"BI /W 1 /H 1 ID \x01\x02").is_err());
        assert!(split_content(b"BI /W 1 /H 1").is_err());
    }
}
