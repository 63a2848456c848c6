use thiserror::Error;

use crate::token::Token;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Indent of {width} spaces at position {position} is not a multiple of two")]
    OddIndent { width: usize, position: usize },
    #[error("Indent at position {position} grows by more than one level")]
    TooDeepIndent { position: usize },
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("Expected '=' after '!' at position {position}")]
    IncompleteNotEq { position: usize },
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },
    #[error("Integer literal '{literal}' at position {position} is out of range")]
    IntegerOutOfRange { literal: String, position: usize },
}

pub type LexResult<T> = Result<T, LexError>;

/// Fully tokenised source with the cursor the parser consumes.
///
/// Tokenisation is eager: the first malformed input aborts construction.
/// The token sequence always ends with `Eof`, and `next_token` stays there
/// once it is reached.
pub struct Lexer {
    tokens: Vec<Token>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> LexResult<Self> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    pub fn current_token(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Advances the cursor and returns the new current token.
    pub fn next_token(&mut self) -> &Token {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        &self.tokens[self.pos]
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    Tokenizer::new(input).run()
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    current_indent: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            current_indent: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> LexResult<Vec<Token>> {
        loop {
            if self.at_line_start {
                if self.peek_char().is_none() {
                    break;
                }
                self.handle_line_start()?;
                continue;
            }
            let Some(ch) = self.peek_char() else {
                break;
            };
            match ch {
                '\n' => {
                    self.consume_char();
                    self.tokens.push(Token::Newline);
                    self.at_line_start = true;
                }
                ' ' => {
                    self.consume_char();
                }
                '#' => self.skip_comment(),
                '\'' | '"' => self.read_string()?,
                c if c.is_ascii_digit() => self.read_number()?,
                c if c.is_alphabetic() || c == '_' => self.read_identifier(),
                _ => self.read_symbol(ch)?,
            }
        }

        // Close still-open blocks, terminate the last line if it has no
        // layout token of its own, then mark the end of input.
        for _ in 0..self.current_indent {
            self.tokens.push(Token::Dedent);
        }
        if !self.tokens.is_empty()
            && !matches!(self.tokens.last(), Some(Token::Newline | Token::Dedent))
        {
            self.tokens.push(Token::Newline);
        }
        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    // Indentation is measured only at the start of a logical line, in
    // units of two spaces. Lines holding nothing but spaces or a comment
    // produce no tokens and leave the indent level untouched.
    fn handle_line_start(&mut self) -> LexResult<()> {
        let start = self.pos;
        let width = self.consume_while(|c| c == ' ');
        match self.peek_char() {
            None => return Ok(()),
            Some('\n') => {
                self.consume_char();
                return Ok(());
            }
            Some('#') => {
                self.skip_comment();
                if self.peek_char() == Some('\n') {
                    self.consume_char();
                }
                return Ok(());
            }
            Some(_) => {}
        }

        if width % 2 != 0 {
            return Err(LexError::OddIndent {
                width,
                position: start,
            });
        }
        let level = width / 2;
        if level > self.current_indent {
            if level - self.current_indent > 1 {
                return Err(LexError::TooDeepIndent { position: start });
            }
            self.tokens.push(Token::Indent);
        } else {
            for _ in level..self.current_indent {
                self.tokens.push(Token::Dedent);
            }
        }
        self.current_indent = level;
        self.at_line_start = false;
        Ok(())
    }

    // Discards up to, but not including, the terminating newline.
    fn skip_comment(&mut self) {
        self.consume_while(|c| c != '\n');
    }

    fn read_number(&mut self) -> LexResult<()> {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_digit());
        let literal = &self.input[start..self.pos];
        let value = literal
            .parse::<i32>()
            .map_err(|_| LexError::IntegerOutOfRange {
                literal: literal.to_string(),
                position: start,
            })?;
        self.tokens.push(Token::Number(value));
        Ok(())
    }

    fn read_identifier(&mut self) {
        let start = self.pos;
        self.consume_while(|c| c.is_alphanumeric() || c == '_');
        let word = &self.input[start..self.pos];
        let token = match word {
            "class" => Token::Class,
            "return" => Token::Return,
            "if" => Token::If,
            "else" => Token::Else,
            "def" => Token::Def,
            "print" => Token::Print,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "None" => Token::None,
            "True" => Token::True,
            "False" => Token::False,
            _ => Token::Id(word.to_string()),
        };
        self.tokens.push(token);
    }

    fn read_string(&mut self) -> LexResult<()> {
        let start = self.pos;
        let quote = match self.consume_char() {
            Some(ch) => ch,
            None => return Err(LexError::UnterminatedString { position: start }),
        };
        let mut value = String::new();
        loop {
            match self.consume_char() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString { position: start });
                }
                Some(ch) if ch == quote => break,
                Some('\\') => {
                    let escaped = self
                        .consume_char()
                        .ok_or(LexError::UnterminatedString { position: start })?;
                    // An unrecognised escape keeps the escaped character.
                    let decoded = match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    };
                    value.push(decoded);
                }
                Some(ch) => value.push(ch),
            }
        }
        self.tokens.push(Token::String(value));
        Ok(())
    }

    fn read_symbol(&mut self, ch: char) -> LexResult<()> {
        const SINGLE_CHARS: &[char] = &[
            '+', '-', '=', '*', '/', '<', '>', ':', ',', '.', '(', ')',
        ];
        let start = self.pos;
        self.consume_char();
        if matches!(ch, '=' | '!' | '<' | '>') && self.peek_char() == Some('=') {
            self.consume_char();
            let token = match ch {
                '=' => Token::Eq,
                '!' => Token::NotEq,
                '<' => Token::LessOrEq,
                _ => Token::GreaterOrEq,
            };
            self.tokens.push(token);
            return Ok(());
        }
        if ch == '!' {
            return Err(LexError::IncompleteNotEq { position: start });
        }
        if SINGLE_CHARS.contains(&ch) {
            self.tokens.push(Token::Char(ch));
            return Ok(());
        }
        Err(LexError::UnexpectedCharacter {
            character: ch,
            position: start,
        })
    }

    fn consume_while<P>(&mut self, keep: P) -> usize
    where
        P: Fn(char) -> bool,
    {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if !keep(ch) {
                break;
            }
            self.consume_char();
        }
        self.pos - start
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn tokenizes_a_simple_class_program() {
        let input = indoc! {"
            class Dog:
              def bark(self):
                print 'woof'
            d = Dog()
            d.bark()
        "};
        let tokens = tokenize(input).expect("tokenize should succeed");
        let expected = vec![
            Token::Class,
            Token::Id("Dog".to_string()),
            Token::Char(':'),
            Token::Newline,
            Token::Indent,
            Token::Def,
            Token::Id("bark".to_string()),
            Token::Char('('),
            Token::Id("self".to_string()),
            Token::Char(')'),
            Token::Char(':'),
            Token::Newline,
            Token::Indent,
            Token::Print,
            Token::String("woof".to_string()),
            Token::Newline,
            Token::Dedent,
            Token::Dedent,
            Token::Id("d".to_string()),
            Token::Char('='),
            Token::Id("Dog".to_string()),
            Token::Char('('),
            Token::Char(')'),
            Token::Newline,
            Token::Id("d".to_string()),
            Token::Char('.'),
            Token::Id("bark".to_string()),
            Token::Char('('),
            Token::Char(')'),
            Token::Newline,
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn recognises_composite_and_single_char_operators() {
        let tokens = tokenize("a == b != c <= d >= e < f > g = h\n").expect("tokenize");
        let operators = tokens
            .into_iter()
            .filter(|token| !matches!(token, Token::Id(_) | Token::Newline | Token::Eof))
            .collect::<Vec<_>>();
        assert_eq!(
            operators,
            vec![
                Token::Eq,
                Token::NotEq,
                Token::LessOrEq,
                Token::GreaterOrEq,
                Token::Char('<'),
                Token::Char('>'),
                Token::Char('='),
            ]
        );
    }

    #[test]
    fn reclassifies_keywords_but_not_prefixed_identifiers() {
        let tokens = tokenize("if iffy and android None None_x\n").expect("tokenize");
        assert_eq!(
            tokens,
            vec![
                Token::If,
                Token::Id("iffy".to_string()),
                Token::And,
                Token::Id("android".to_string()),
                Token::None,
                Token::Id("None_x".to_string()),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn decodes_string_escapes() {
        let tokens = tokenize("x = 'a\\n\\t\\r\\\"\\'\\\\b'\n").expect("tokenize");
        assert_eq!(tokens[2], Token::String("a\n\t\r\"'\\b".to_string()));
    }

    #[test]
    fn accepts_both_quote_styles() {
        let tokens = tokenize("a = \"double 'single' inside\"\n").expect("tokenize");
        assert_eq!(
            tokens[2],
            Token::String("double 'single' inside".to_string())
        );
    }

    #[test]
    fn discards_comments_but_keeps_the_newline() {
        let tokens = tokenize("x = 1 # trailing words + symbols\ny = 2\n").expect("tokenize");
        assert_eq!(
            tokens,
            vec![
                Token::Id("x".to_string()),
                Token::Char('='),
                Token::Number(1),
                Token::Newline,
                Token::Id("y".to_string()),
                Token::Char('='),
                Token::Number(2),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn blank_and_comment_only_lines_produce_nothing() {
        let input = indoc! {"
            if True:
              x = 1

               # an oddly indented note, skipped before indent checks
              y = 2
        "};
        let tokens = tokenize(input).expect("tokenize");
        let expected = vec![
            Token::If,
            Token::True,
            Token::Char(':'),
            Token::Newline,
            Token::Indent,
            Token::Id("x".to_string()),
            Token::Char('='),
            Token::Number(1),
            Token::Newline,
            Token::Id("y".to_string()),
            Token::Char('='),
            Token::Number(2),
            Token::Newline,
            Token::Dedent,
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn emits_one_dedent_per_closed_level() {
        let input = indoc! {"
            if a:
              if b:
                x = 1
            y = 2
        "};
        let tokens = tokenize(input).expect("tokenize");
        let dedents = tokens
            .iter()
            .filter(|token| **token == Token::Dedent)
            .count();
        let indents = tokens
            .iter()
            .filter(|token| **token == Token::Indent)
            .count();
        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
        let y_at = tokens
            .iter()
            .position(|token| *token == Token::Id("y".to_string()))
            .expect("y token");
        assert_eq!(&tokens[y_at - 2..y_at], &[Token::Dedent, Token::Dedent]);
    }

    #[test]
    fn flushes_dedents_at_end_of_input() {
        let tokens = tokenize("if True:\n  x = 1").expect("tokenize");
        assert_eq!(
            &tokens[tokens.len() - 3..],
            &[Token::Number(1), Token::Dedent, Token::Eof]
        );
    }

    #[test]
    fn synthesizes_a_final_newline_when_missing() {
        let tokens = tokenize("x = 1").expect("tokenize");
        assert_eq!(
            tokens,
            vec![
                Token::Id("x".to_string()),
                Token::Char('='),
                Token::Number(1),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(tokenize("").expect("tokenize"), vec![Token::Eof]);
        assert_eq!(tokenize("\n\n  \n").expect("tokenize"), vec![Token::Eof]);
    }

    #[test]
    fn errors_on_odd_indent_width() {
        let err = tokenize("if True:\n   x = 1\n").expect_err("expected odd indent");
        assert_eq!(err, LexError::OddIndent { width: 3, position: 9 });
    }

    #[test]
    fn errors_on_indent_growing_two_levels() {
        let err = tokenize("if True:\n    x = 1\n").expect_err("expected too deep indent");
        assert_eq!(err, LexError::TooDeepIndent { position: 9 });
    }

    #[test]
    fn errors_on_bare_exclamation_mark() {
        let err = tokenize("x = !y\n").expect_err("expected bare '!' failure");
        assert_eq!(err, LexError::IncompleteNotEq { position: 4 });
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("x = 'abc\n").expect_err("expected unterminated string");
        assert_eq!(err, LexError::UnterminatedString { position: 4 });
        let err = tokenize("x = 'abc").expect_err("expected unterminated string at eof");
        assert_eq!(err, LexError::UnterminatedString { position: 4 });
    }

    #[test]
    fn errors_on_unexpected_character() {
        let err = tokenize("x = 1 @ 2\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '@',
                position: 6
            }
        );
    }

    #[test]
    fn errors_on_integer_out_of_range() {
        let err = tokenize("n = 99999999999\n").expect_err("expected overflow");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn cursor_stays_on_eof() {
        let mut lexer = Lexer::new("x\n").expect("lexer");
        assert_eq!(*lexer.current_token(), Token::Id("x".to_string()));
        assert_eq!(*lexer.next_token(), Token::Newline);
        assert_eq!(*lexer.next_token(), Token::Eof);
        assert_eq!(*lexer.next_token(), Token::Eof);
        assert_eq!(*lexer.current_token(), Token::Eof);
    }

    #[test]
    fn printed_token_stream_is_deterministic() {
        let input = "x = 1 < 2\n";
        let render = |tokens: Vec<Token>| {
            tokens
                .iter()
                .map(Token::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        };
        let first = render(tokenize(input).expect("tokenize"));
        let second = render(tokenize(input).expect("tokenize"));
        assert_eq!(first, second);
        assert_eq!(first, "Id{x} Char{=} Number{1} Char{<} Number{2} Newline Eof");
    }
}
