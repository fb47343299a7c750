//! Recursive-descent parser (`spec.md` §4.4).
//!
//! Keywords (`if`, `for`, `do`, ...) are only recognized where the
//! grammar expects a command to start; everywhere else the same text
//! is an ordinary word. This mirrors POSIX shell's "reserved words are
//! recognized in command position only" rule.

use {
    crate::{
        ast::*,
        lexer::{LexError, Lexer, Token},
    },
    thiserror::Error,
};

/// A parse error (`spec.md` §4.4 edge cases).
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseError
{
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(&'static str),
    #[error("unexpected token, expected {expected}, found {found:?}")]
    Unexpected { expected: &'static str, found: Token },
    #[error("empty pipeline stage")]
    EmptyCommand,
}

const KEYWORDS: &[&str] =
    &["if", "then", "elif", "else", "fi", "for", "while", "until", "do", "done", "case", "in", "esac", "{", "}", "!"];

/// Parse a full script (`spec.md` §4.4).
pub fn parse(source: &str) -> Result<Script, ParseError>
{
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let list = parser.parse_compound_list(&[])?;
    parser.expect_eof()?;
    Ok(Script(list))
}

struct Parser
{
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser
{
    fn peek(&self) -> &Token
    {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn bump(&mut self) -> Token
    {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_eof(&self) -> Result<(), ParseError>
    {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(ParseError::Unexpected { expected: "end of input", found: other.clone() }),
        }
    }

    fn skip_separators(&mut self)
    {
        while matches!(self.peek(), Token::Newline | Token::Semi) {
            self.bump();
        }
    }

    fn skip_newlines(&mut self)
    {
        while matches!(self.peek(), Token::Newline) {
            self.bump();
        }
    }

    /// Word text if the current token is a word whose fragments are all
    /// unquoted (so it is eligible to be read as a keyword).
    fn peek_keyword(&self) -> Option<&str>
    {
        match self.peek() {
            Token::Word(w) if w.is_fully_unquoted() && w.0.len() == 1 => {
                let text = w.0[0].text.as_str();
                KEYWORDS.contains(&text).then_some(text)
            },
            _ => None,
        }
    }

    fn at_keyword(&self, kw: &str) -> bool
    {
        self.peek_keyword() == Some(kw)
    }

    fn expect_keyword(&mut self, kw: &'static str) -> Result<(), ParseError>
    {
        if self.at_keyword(kw) {
            self.bump();
            Ok(())
        } else {
            Err(ParseError::Unexpected { expected: kw, found: self.peek().clone() })
        }
    }

    /// Parse a `compound-list`: a sequence of [`List`]s, stopping at
    /// end of input or at one of `terminators` (read as keywords).
    fn parse_compound_list(&mut self, terminators: &[&str]) -> Result<CompoundList, ParseError>
    {
        let mut lists = Vec::new();
        self.skip_separators();
        loop {
            if matches!(self.peek(), Token::Eof) {
                break;
            }
            if let Some(kw) = self.peek_keyword() {
                if terminators.contains(&kw) {
                    break;
                }
            }
            lists.push(self.parse_list()?);
            self.skip_separators();
        }
        Ok(CompoundList(lists))
    }

    /// `pipeline (('&&'|'||') newline* pipeline)* ('&'|';')?`
    fn parse_list(&mut self) -> Result<List, ParseError>
    {
        let first = self.parse_pipeline()?;
        let mut rest = Vec::new();
        loop {
            let connector = match self.peek() {
                Token::AndIf => Connector::And,
                Token::OrIf => Connector::Or,
                _ => break,
            };
            self.bump();
            self.skip_newlines();
            rest.push((connector, self.parse_pipeline()?));
        }
        let background = matches!(self.peek(), Token::Amp);
        if background {
            self.bump();
        } else if matches!(self.peek(), Token::Semi) {
            self.bump();
        }
        Ok(List { first, rest, background })
    }

    /// `'!'? command ('|' newline* command)*`
    fn parse_pipeline(&mut self) -> Result<Pipeline, ParseError>
    {
        let negated = if self.at_keyword("!") {
            self.bump();
            true
        } else {
            false
        };
        let mut commands = vec![self.parse_command()?];
        while matches!(self.peek(), Token::Pipe) {
            self.bump();
            self.skip_newlines();
            commands.push(self.parse_command()?);
        }
        Ok(Pipeline { commands, negated })
    }

    fn parse_command(&mut self) -> Result<Command, ParseError>
    {
        if let Some(kw) = self.peek_keyword() {
            match kw {
                "if" => return self.parse_if(),
                "for" => return self.parse_for(),
                "while" => return self.parse_while_until(false),
                "until" => return self.parse_while_until(true),
                "case" => return self.parse_case(),
                "{" => return self.parse_group(),
                _ => {},
            }
        }
        if self.is_function_def_ahead() {
            return self.parse_function_def();
        }
        self.parse_simple().map(Command::Simple)
    }

    fn is_function_def_ahead(&self) -> bool
    {
        matches!(
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1), self.tokens.get(self.pos + 2)),
            (Some(Token::Word(w)), Some(Token::LParen), Some(Token::RParen))
                if w.is_fully_unquoted() && w.0.len() == 1
        )
    }

    fn parse_function_def(&mut self) -> Result<Command, ParseError>
    {
        let Token::Word(w) = self.bump() else { unreachable!() };
        let name = w.0[0].text.clone();
        self.bump(); // (
        self.bump(); // )
        self.skip_newlines();
        let body = self.parse_command()?;
        Ok(Command::FunctionDef { name, body: Box::new(body) })
    }

    fn parse_group(&mut self) -> Result<Command, ParseError>
    {
        self.expect_keyword("{")?;
        let body = self.parse_compound_list(&["}"])?;
        self.expect_keyword("}")?;
        Ok(Command::Group(body))
    }

    fn parse_if(&mut self) -> Result<Command, ParseError>
    {
        self.expect_keyword("if")?;
        let mut branches = vec![self.parse_if_branch()?];
        while self.at_keyword("elif") {
            self.bump();
            branches.push(self.parse_if_branch()?);
        }
        let else_branch = if self.at_keyword("else") {
            self.bump();
            Some(self.parse_compound_list(&["fi"])?)
        } else {
            None
        };
        self.expect_keyword("fi")?;
        Ok(Command::If { branches, else_branch })
    }

    fn parse_if_branch(&mut self) -> Result<IfBranch, ParseError>
    {
        let condition = self.parse_compound_list(&["then"])?;
        self.expect_keyword("then")?;
        let body = self.parse_compound_list(&["elif", "else", "fi"])?;
        Ok(IfBranch { condition, body })
    }

    fn parse_for(&mut self) -> Result<Command, ParseError>
    {
        self.expect_keyword("for")?;
        let variable = match self.bump() {
            Token::Word(w) if w.0.len() == 1 => w.0[0].text.clone(),
            other => return Err(ParseError::Unexpected { expected: "loop variable name", found: other }),
        };
        self.skip_newlines();
        let words = if self.at_keyword("in") {
            self.bump();
            let mut words = Vec::new();
            while let Token::Word(_) = self.peek() {
                let Token::Word(w) = self.bump() else { unreachable!() };
                words.push(w);
            }
            Some(words)
        } else {
            None
        };
        self.skip_separators();
        self.expect_keyword("do")?;
        let body = self.parse_compound_list(&["done"])?;
        self.expect_keyword("done")?;
        Ok(Command::For { variable, words, body })
    }

    fn parse_while_until(&mut self, until: bool) -> Result<Command, ParseError>
    {
        self.expect_keyword(if until { "until" } else { "while" })?;
        let condition = self.parse_compound_list(&["do"])?;
        self.expect_keyword("do")?;
        let body = self.parse_compound_list(&["done"])?;
        self.expect_keyword("done")?;
        Ok(if until { Command::Until { condition, body } } else { Command::While { condition, body } })
    }

    fn parse_case(&mut self) -> Result<Command, ParseError>
    {
        self.expect_keyword("case")?;
        let word = match self.bump() {
            Token::Word(w) => w,
            other => return Err(ParseError::Unexpected { expected: "case word", found: other }),
        };
        self.skip_newlines();
        self.expect_keyword("in")?;
        self.skip_newlines();
        let mut arms = Vec::new();
        while !self.at_keyword("esac") {
            if matches!(self.peek(), Token::LParen) {
                self.bump();
            }
            let mut patterns = vec![self.expect_word("case pattern")?];
            while matches!(self.peek(), Token::Pipe) {
                self.bump();
                patterns.push(self.expect_word("case pattern")?);
            }
            match self.bump() {
                Token::RParen => {},
                other => return Err(ParseError::Unexpected { expected: ")", found: other }),
            }
            self.skip_newlines();
            let body = self.parse_compound_list(&["esac"])?;
            arms.push(CaseArm { patterns, body });
            if matches!(self.peek(), Token::DSemi) {
                self.bump();
            }
            self.skip_newlines();
        }
        self.expect_keyword("esac")?;
        Ok(Command::Case { word, arms })
    }

    fn expect_word(&mut self, what: &'static str) -> Result<Word, ParseError>
    {
        match self.bump() {
            Token::Word(w) => Ok(w),
            other => Err(ParseError::Unexpected { expected: what, found: other }),
        }
    }

    /// `(assignment|word|redirection)+`, grammar-disambiguated by
    /// position: assignments only precede the first non-assignment
    /// word.
    fn parse_simple(&mut self) -> Result<Simple, ParseError>
    {
        let mut simple = Simple::default();
        let mut seen_word = false;
        loop {
            match self.peek().clone() {
                Token::Word(w) => {
                    if !seen_word {
                        if let Some((name, value)) = as_assignment(&w) {
                            self.bump();
                            simple.assignments.push((name, value));
                            continue;
                        }
                    }
                    self.bump();
                    seen_word = true;
                    simple.words.push(w);
                },
                Token::RedirectOut
                | Token::RedirectAppend
                | Token::RedirectIn
                | Token::RedirectErr
                | Token::RedirectErrAppend
                | Token::RedirectAll => {
                    let op = match self.bump() {
                        Token::RedirectOut => RedirOp::Write,
                        Token::RedirectAppend => RedirOp::Append,
                        Token::RedirectIn => RedirOp::Read,
                        Token::RedirectErr => RedirOp::ErrWrite,
                        Token::RedirectErrAppend => RedirOp::ErrAppend,
                        Token::RedirectAll => RedirOp::Both,
                        _ => unreachable!(),
                    };
                    let target = self.expect_word("redirection target")?;
                    simple.redirections.push(Redirection { op, target });
                },
                _ => break,
            }
        }
        if simple.words.is_empty() && simple.assignments.is_empty() && simple.redirections.is_empty() {
            return Err(ParseError::EmptyCommand);
        }
        Ok(simple)
    }
}

/// If `word` has the shape `NAME=value` with no quoting on the `NAME=`
/// part and `NAME` a valid identifier, split it into an assignment.
fn as_assignment(word: &Word) -> Option<(String, Word)>
{
    let first = word.0.first()?;
    if first.quoting != Quoting::None {
        return None;
    }
    let eq = first.text.find('=')?;
    let name = &first.text[..eq];
    if name.is_empty() || !name.chars().next().unwrap().is_ascii_alphabetic() && name.chars().next().unwrap() != '_' {
        return None;
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let mut parts = Vec::new();
    let rest = &first.text[eq + 1..];
    if !rest.is_empty() || word.0.len() > 1 {
        parts.push(WordPart { text: rest.to_string(), quoting: Quoting::None });
    }
    parts.extend(word.0[1..].iter().cloned());
    Some((name.to_string(), Word(parts)))
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn parse_ok(src: &str) -> Script
    {
        parse(src).unwrap_or_else(|e| panic!("parse failed for {src:?}: {e}"))
    }

    #[test]
    fn parses_simple_command()
    {
        let script = parse_ok("echo hello world");
        assert_eq!(script.0 .0.len(), 1);
    }

    #[test]
    fn parses_assignment_prefix()
    {
        let script = parse_ok("FOO=bar echo $FOO");
        let Command::Simple(s) = &script.0 .0[0].first.commands[0] else { panic!() };
        assert_eq!(s.assignments[0].0, "FOO");
        assert_eq!(s.words.len(), 2);
    }

    #[test]
    fn parses_pipeline_and_connectors()
    {
        let script = parse_ok("a | b && c || d");
        let list = &script.0 .0[0];
        assert_eq!(list.first.commands.len(), 2);
        assert_eq!(list.rest.len(), 2);
        assert_eq!(list.rest[0].0, Connector::And);
        assert_eq!(list.rest[1].0, Connector::Or);
    }

    #[test]
    fn parses_background_list()
    {
        let script = parse_ok("sleep 1 &");
        assert!(script.0 .0[0].background);
    }

    #[test]
    fn parses_if_elif_else()
    {
        let script = parse_ok("if a; then b; elif c; then d; else e; fi");
        let Command::If { branches, else_branch } = &script.0 .0[0].first.commands[0] else { panic!() };
        assert_eq!(branches.len(), 2);
        assert!(else_branch.is_some());
    }

    #[test]
    fn parses_for_loop_with_in_list()
    {
        let script = parse_ok("for x in a b c; do echo $x; done");
        let Command::For { variable, words, .. } = &script.0 .0[0].first.commands[0] else { panic!() };
        assert_eq!(variable, "x");
        assert_eq!(words.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn parses_for_loop_without_in()
    {
        let script = parse_ok("for x; do echo $x; done");
        let Command::For { words, .. } = &script.0 .0[0].first.commands[0] else { panic!() };
        assert!(words.is_none());
    }

    #[test]
    fn parses_while_and_until()
    {
        parse_ok("while true; do echo a; done");
        parse_ok("until false; do echo a; done");
    }

    #[test]
    fn parses_case_with_multiple_patterns_and_arms()
    {
        let script = parse_ok("case $x in a|b) echo ab ;; *) echo other ;; esac");
        let Command::Case { arms, .. } = &script.0 .0[0].first.commands[0] else { panic!() };
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0].patterns.len(), 2);
    }

    #[test]
    fn parses_function_definition()
    {
        let script = parse_ok("greet() { echo hi; }");
        let Command::FunctionDef { name, .. } = &script.0 .0[0].first.commands[0] else { panic!() };
        assert_eq!(name, "greet");
    }

    #[test]
    fn parses_negated_pipeline()
    {
        let script = parse_ok("! false");
        assert!(script.0 .0[0].first.negated);
    }

    #[test]
    fn parses_redirections()
    {
        let script = parse_ok("cmd > out.txt 2>> err.txt < in.txt");
        let Command::Simple(s) = &script.0 .0[0].first.commands[0] else { panic!() };
        assert_eq!(s.redirections.len(), 3);
    }

    #[test]
    fn keyword_text_is_an_ordinary_word_outside_command_position()
    {
        let script = parse_ok("echo if then done");
        let Command::Simple(s) = &script.0 .0[0].first.commands[0] else { panic!() };
        assert_eq!(s.words.len(), 4);
    }

    #[test]
    fn empty_command_is_an_error()
    {
        assert_eq!(parse("| foo"), Err(ParseError::EmptyCommand));
    }
}
