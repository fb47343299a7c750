//! Tokenizer (`spec.md` §4.3).

use {
    crate::ast::{Quoting, Word, WordPart},
    std::{iter::Peekable, str::Chars},
    thiserror::Error,
};

/// A lexical error (`spec.md` §4.3 edge cases).
#[derive(Debug, Error, Eq, PartialEq)]
pub enum LexError
{
    #[error("unterminated single-quoted string")]
    UnterminatedSingleQuote,
    #[error("unterminated double-quoted string")]
    UnterminatedDoubleQuote,
    #[error("unterminated command substitution")]
    UnterminatedSubstitution,
}

/// A lexical token (`spec.md` §4.3).
#[derive(Clone, Debug, PartialEq)]
pub enum Token
{
    Word(Word),
    Pipe,
    AndIf,
    OrIf,
    Semi,
    DSemi,
    Amp,
    Newline,
    RedirectOut,
    RedirectAppend,
    RedirectIn,
    RedirectErr,
    RedirectErrAppend,
    RedirectAll,
    LParen,
    RParen,
    Eof,
}

/// Scans shell source text into a flat token stream. Quote and
/// backslash handling happens here; expansion does not (`spec.md`
/// §4.3 vs §4.5).
pub struct Lexer<'a>
{
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a>
{
    pub fn new(source: &'a str) -> Self
    {
        Self { chars: source.chars().peekable() }
    }

    /// Lex the entire source into tokens, ending with [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError>
    {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token == Token::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&mut self) -> Option<char>
    {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char>
    {
        self.chars.next()
    }

    fn skip_blanks_and_comments(&mut self)
    {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') => {
                    self.bump();
                },
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                },
                Some('\\') => {
                    // A backslash-newline outside a word is a line
                    // continuation: swallow both characters.
                    let mut clone = self.chars.clone();
                    clone.next();
                    if clone.peek() == Some(&'\n') {
                        self.bump();
                        self.bump();
                    } else {
                        break;
                    }
                },
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError>
    {
        self.skip_blanks_and_comments();
        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };
        match c {
            '\n' => {
                self.bump();
                Ok(Token::Newline)
            },
            '|' => {
                self.bump();
                if self.peek() == Some('|') {
                    self.bump();
                    Ok(Token::OrIf)
                } else {
                    Ok(Token::Pipe)
                }
            },
            '&' => {
                self.bump();
                if self.peek() == Some('&') {
                    self.bump();
                    Ok(Token::AndIf)
                } else if self.peek() == Some('>') {
                    self.bump();
                    Ok(Token::RedirectAll)
                } else {
                    Ok(Token::Amp)
                }
            },
            ';' => {
                self.bump();
                if self.peek() == Some(';') {
                    self.bump();
                    Ok(Token::DSemi)
                } else {
                    Ok(Token::Semi)
                }
            },
            '(' => {
                self.bump();
                Ok(Token::LParen)
            },
            ')' => {
                self.bump();
                Ok(Token::RParen)
            },
            '>' => {
                self.bump();
                if self.peek() == Some('>') {
                    self.bump();
                    Ok(Token::RedirectAppend)
                } else {
                    Ok(Token::RedirectOut)
                }
            },
            '<' => {
                self.bump();
                Ok(Token::RedirectIn)
            },
            '2' => {
                // Only a redirection-fd prefix when immediately followed
                // by '>' with no intervening blank.
                let mut clone = self.chars.clone();
                clone.next();
                if clone.peek() == Some(&'>') {
                    self.bump();
                    self.bump();
                    if self.peek() == Some('>') {
                        self.bump();
                        Ok(Token::RedirectErrAppend)
                    } else {
                        Ok(Token::RedirectErr)
                    }
                } else {
                    self.lex_word()
                }
            },
            _ => self.lex_word(),
        }
    }

    fn lex_word(&mut self) -> Result<Token, LexError>
    {
        let mut parts: Vec<WordPart> = Vec::new();
        let mut current = String::new();
        let mut current_quoting = Quoting::None;

        macro_rules! flush {
            () => {
                if !current.is_empty() {
                    parts.push(WordPart { text: std::mem::take(&mut current), quoting: current_quoting });
                }
            };
        }

        loop {
            match self.peek() {
                None => break,
                Some(c) if is_word_boundary(c) => break,
                Some('\'') => {
                    flush!();
                    self.bump();
                    current_quoting = Quoting::Single;
                    loop {
                        match self.bump() {
                            Some('\'') => break,
                            Some(ch) => current.push(ch),
                            None => return Err(LexError::UnterminatedSingleQuote),
                        }
                    }
                    flush!();
                    current_quoting = Quoting::None;
                },
                Some('"') => {
                    flush!();
                    self.bump();
                    current_quoting = Quoting::Double;
                    loop {
                        match self.peek() {
                            Some('"') => {
                                self.bump();
                                break;
                            },
                            Some('\\') => {
                                self.bump();
                                match self.bump() {
                                    Some(ch @ ('"' | '\\' | '$' | '`')) => current.push(ch),
                                    Some(ch) => {
                                        current.push('\\');
                                        current.push(ch);
                                    },
                                    None => return Err(LexError::UnterminatedDoubleQuote),
                                }
                            },
                            Some('$') if self.starts_command_substitution() => {
                                current.push_str(&self.read_command_substitution()?);
                            },
                            Some(ch) => {
                                current.push(ch);
                                self.bump();
                            },
                            None => return Err(LexError::UnterminatedDoubleQuote),
                        }
                    }
                    flush!();
                    current_quoting = Quoting::None;
                },
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('\n') => {}, // line continuation inside a word
                        Some(ch) => current.push(ch),
                        None => current.push('\\'),
                    }
                },
                Some('$') if self.starts_command_substitution() => {
                    current.push_str(&self.read_command_substitution()?);
                },
                Some(ch) => {
                    current.push(ch);
                    self.bump();
                },
            }
        }
        flush!();
        Ok(Token::Word(Word(parts)))
    }

    /// Whether the `$` under the cursor opens `$(`, `$((`, or `${`; a
    /// bare `$NAME` is left for the expander to find in the raw text.
    fn starts_command_substitution(&self) -> bool
    {
        let mut clone = self.chars.clone();
        clone.next();
        matches!(clone.peek(), Some('(') | Some('{'))
    }

    /// Consume a `$(...)`, `$((...))`, or `${...}` span with balanced
    /// delimiters, returning it verbatim (including the `$` and
    /// delimiters) for the expander to interpret later.
    fn read_command_substitution(&mut self) -> Result<String, LexError>
    {
        let mut text = String::new();
        text.push(self.bump().unwrap()); // '$'
        let (open, close) = match self.peek() {
            Some('(') => ('(', ')'),
            Some('{') => ('{', '}'),
            _ => unreachable!("caller only invokes this after starts_command_substitution"),
        };
        let mut depth = 0usize;
        loop {
            match self.bump() {
                Some(c) if c == open => {
                    depth += 1;
                    text.push(c);
                },
                Some(c) if c == close => {
                    depth -= 1;
                    text.push(c);
                    if depth == 0 {
                        break;
                    }
                },
                Some(c) => text.push(c),
                None => return Err(LexError::UnterminatedSubstitution),
            }
        }
        Ok(text)
    }
}

fn is_word_boundary(c: char) -> bool
{
    matches!(c, ' ' | '\t' | '\n' | '|' | '&' | ';' | '(' | ')' | '<' | '>' | '#')
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn words(tokens: &[Token]) -> Vec<String>
    {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Word(w) => Some(w.0.iter().map(|p| p.text.as_str()).collect::<String>()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn splits_on_whitespace()
    {
        let tokens = Lexer::new("echo  hello   world").tokenize().unwrap();
        assert_eq!(words(&tokens), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn recognizes_operators()
    {
        let tokens = Lexer::new("a && b || c | d ; e &").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word(Word::literal("a")),
                Token::AndIf,
                Token::Word(Word::literal("b")),
                Token::OrIf,
                Token::Word(Word::literal("c")),
                Token::Pipe,
                Token::Word(Word::literal("d")),
                Token::Semi,
                Token::Word(Word::literal("e")),
                Token::Amp,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn single_quotes_are_fully_literal()
    {
        let tokens = Lexer::new(r#"echo 'a $b "c" \d'"#).tokenize().unwrap();
        let Token::Word(w) = &tokens[1] else { panic!("expected word") };
        assert_eq!(w.0[0].quoting, Quoting::Single);
        assert_eq!(w.0[0].text, r#"a $b "c" \d"#);
    }

    #[test]
    fn double_quotes_allow_escapes()
    {
        let tokens = Lexer::new(r#"echo "a \"b\" c""#).tokenize().unwrap();
        let Token::Word(w) = &tokens[1] else { panic!("expected word") };
        assert_eq!(w.0[0].text, r#"a "b" c"#);
    }

    #[test]
    fn unterminated_single_quote_is_an_error()
    {
        assert_eq!(Lexer::new("echo 'oops").tokenize(), Err(LexError::UnterminatedSingleQuote));
    }

    #[test]
    fn redirection_operators_are_distinguished()
    {
        let tokens = Lexer::new("a > b >> c < d 2> e 2>> f &> g").tokenize().unwrap();
        let ops: Vec<&Token> = tokens
            .iter()
            .filter(|t| {
                matches!(
                    t,
                    Token::RedirectOut
                        | Token::RedirectAppend
                        | Token::RedirectIn
                        | Token::RedirectErr
                        | Token::RedirectErrAppend
                        | Token::RedirectAll
                )
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                &Token::RedirectOut,
                &Token::RedirectAppend,
                &Token::RedirectIn,
                &Token::RedirectErr,
                &Token::RedirectErrAppend,
                &Token::RedirectAll,
            ]
        );
    }

    #[test]
    fn command_substitution_is_kept_balanced_in_a_single_word_part()
    {
        let tokens = Lexer::new("echo $(echo $(echo a))").tokenize().unwrap();
        let Token::Word(w) = &tokens[1] else { panic!("expected word") };
        assert_eq!(w.0[0].text, "$(echo $(echo a))");
    }

    #[test]
    fn comment_runs_to_end_of_line()
    {
        let tokens = Lexer::new("echo a # this is a comment\necho b").tokenize().unwrap();
        assert_eq!(words(&tokens), vec!["echo", "a", "echo", "b"]);
    }
}
