use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::{Error, Result};
use crate::stream::SourceStack;
use crate::value::{Cell, Kind};

lazy_static! {
    /// Reserved words, case-sensitive. Single-character operators never get
    /// here; they are matched before a name is read.
    static ref KEYWORDS: HashMap<&'static str, Kind> = {
        let mut m = HashMap::new();
        m.insert("define", Kind::Define);
        m.insert("lambda", Kind::Lambda);
        m.insert("cond", Kind::Cond);
        m.insert("else", Kind::Else);
        m.insert("cons", Kind::Cons);
        m.insert("car", Kind::Car);
        m.insert("cdr", Kind::Cdr);
        m.insert("list", Kind::List);
        m.insert("empty?", Kind::Empty);
        m.insert("and", Kind::And);
        m.insert("or", Kind::Or);
        m.insert("not", Kind::Not);
        m.insert("cat", Kind::Cat);
        m.insert("include", Kind::Include);
        m.insert("begin", Kind::Begin);
        m.insert("let", Kind::Let);
        m
    };
}

/// Lazy token stream over the source stack. `get` is the only advancing
/// operation; the last token produced stays available as `current`.
///
/// When the top source runs dry the stream pops it and delivers `End`, so
/// after an included file is consumed the next token is drawn from the
/// previous source at the character right after the include form.
pub struct TokenStream {
    sources: SourceStack,
    current: Cell,
}

impl TokenStream {
    pub fn new() -> Self {
        TokenStream {
            sources: SourceStack::new(),
            current: Cell::tag(Kind::End),
        }
    }

    /// Stack an in-memory source.
    pub fn push_text(&mut self, text: &str) {
        self.sources.push_text(text);
    }

    /// Stack a file source (how `include` switches streams).
    pub fn push_file(&mut self, path: &str) -> Result<()> {
        self.sources.push_file(path)
    }

    pub fn pop_source(&mut self) {
        self.sources.pop();
    }

    /// True once every source has been exhausted and popped.
    pub fn is_done(&self) -> bool {
        self.sources.is_done()
    }

    pub fn depth(&self) -> usize {
        self.sources.depth()
    }

    /// The most recently produced token.
    pub fn current(&self) -> &Cell {
        &self.current
    }

    /// Discard characters through the next newline (line comments).
    pub fn ignore_line(&mut self) {
        while let Some(c) = self.sources.getc() {
            if c == b'\n' {
                break;
            }
        }
    }

    /// Produce the next token and remember it as current.
    pub fn get(&mut self) -> Result<Cell> {
        // skip all whitespace including newlines
        let c = loop {
            match self.sources.getc() {
                None => {
                    // top source exhausted: pop back to the enclosing one
                    // and let the caller see the boundary as End
                    self.sources.pop();
                    self.current = Cell::tag(Kind::End);
                    return Ok(self.current.clone());
                }
                Some(c) if c.is_ascii_whitespace() => continue,
                Some(c) => break c,
            }
        };

        let token = match c {
            b'!' => Cell::tag(Kind::Not),
            b'&' => Cell::tag(Kind::And),
            b'\'' => Cell::tag(Kind::Quote),
            b'(' => Cell::tag(Kind::Lp),
            b')' => Cell::tag(Kind::Rp),
            b'*' => Cell::tag(Kind::Mul),
            b'+' => Cell::tag(Kind::Add),
            b'-' => Cell::tag(Kind::Sub),
            b';' => Cell::tag(Kind::Comment),
            b'/' => Cell::tag(Kind::Div),
            b'<' => Cell::tag(Kind::Less),
            b'=' => Cell::tag(Kind::Equal),
            b'>' => Cell::tag(Kind::Greater),
            b'|' => Cell::tag(Kind::Or),
            b'0'..=b'9' => {
                self.sources.putback(c);
                self.lex_number()?
            }
            _ => {
                self.sources.putback(c);
                self.lex_name()
            }
        };

        self.current = token.clone();
        Ok(token)
    }

    /// Floating-point literal: digits, optional fraction, optional
    /// exponent. Anything beyond the literal is put back.
    fn lex_number(&mut self) -> Result<Cell> {
        let mut text = String::new();
        self.take_digits(&mut text);

        if self.take_if(b'.') {
            text.push('.');
            self.take_digits(&mut text);
        }

        // exponent only counts if at least one digit follows it
        if let Some(e) = self.sources.getc() {
            if e == b'e' || e == b'E' {
                let mut exp = String::new();
                exp.push(e as char);
                if let Some(s) = self.sources.getc() {
                    if s == b'+' || s == b'-' {
                        exp.push(s as char);
                    } else {
                        self.sources.putback(s);
                    }
                }
                let before = exp.len();
                self.take_digits(&mut exp);
                if exp.len() > before {
                    text.push_str(&exp);
                } else {
                    for c in exp.bytes().rev() {
                        self.sources.putback(c);
                    }
                }
            } else {
                self.sources.putback(e);
            }
        }

        let n: f64 = text
            .parse()
            .map_err(|_| Error::TypeMismatch(format!("bad number literal '{}'", text)))?;
        Ok(Cell::Number(n))
    }

    fn take_digits(&mut self, out: &mut String) {
        while let Some(c) = self.sources.getc() {
            if c.is_ascii_digit() {
                out.push(c as char);
            } else {
                self.sources.putback(c);
                break;
            }
        }
    }

    fn take_if(&mut self, expected: u8) -> bool {
        match self.sources.getc() {
            Some(c) if c == expected => true,
            Some(c) => {
                self.sources.putback(c);
                false
            }
            None => false,
        }
    }

    /// Name token: a maximal run of non-whitespace characters, with any
    /// trailing `)` run stripped and put back so `foo))` lexes as the name
    /// followed by the parens. The lexeme is then checked against the
    /// keyword table.
    fn lex_name(&mut self) -> Cell {
        let mut text = String::new();
        while let Some(c) = self.sources.getc() {
            if c.is_ascii_whitespace() {
                self.sources.putback(c);
                break;
            }
            text.push(c as char);
        }
        while text.ends_with(')') {
            text.pop();
            self.sources.putback(b')');
        }
        match KEYWORDS.get(text.as_str()) {
            Some(&kind) => Cell::tag(kind),
            None => Cell::Name(text),
        }
    }
}

impl Default for TokenStream {
    fn default() -> Self {
        TokenStream::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(src: &str) -> Vec<Cell> {
        let mut ts = TokenStream::new();
        ts.push_text(src);
        let mut out = Vec::new();
        loop {
            let tok = ts.get().unwrap();
            if tok.kind() == Kind::End {
                break;
            }
            out.push(tok);
        }
        out
    }

    #[test]
    fn single_characters_lex_to_their_kinds() {
        let toks = tokens_of("(+ * / < = > & | ! ')");
        let kinds: Vec<Kind> = toks.iter().map(Cell::kind).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::Lp,
                Kind::Add,
                Kind::Mul,
                Kind::Div,
                Kind::Less,
                Kind::Equal,
                Kind::Greater,
                Kind::And,
                Kind::Or,
                Kind::Not,
                Kind::Quote,
                Kind::Rp,
            ]
        );
    }

    #[test]
    fn keywords_map_to_their_kinds() {
        let toks = tokens_of("define lambda cond else let begin include cat cons car cdr list empty? and or not");
        let kinds: Vec<Kind> = toks.iter().map(Cell::kind).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::Define,
                Kind::Lambda,
                Kind::Cond,
                Kind::Else,
                Kind::Let,
                Kind::Begin,
                Kind::Include,
                Kind::Cat,
                Kind::Cons,
                Kind::Car,
                Kind::Cdr,
                Kind::List,
                Kind::Empty,
                Kind::And,
                Kind::Or,
                Kind::Not,
            ]
        );
    }

    #[test]
    fn not_is_not_or() {
        // regression guard: `not` must produce Not, never Or
        assert_eq!(tokens_of("not")[0], Cell::tag(Kind::Not));
        assert_eq!(tokens_of("or")[0], Cell::tag(Kind::Or));
    }

    #[test]
    fn numbers_parse_as_doubles() {
        assert_eq!(tokens_of("42")[0], Cell::Number(42.0));
        assert_eq!(tokens_of("3.5")[0], Cell::Number(3.5));
        assert_eq!(tokens_of("1e3")[0], Cell::Number(1000.0));
        assert_eq!(tokens_of("2.5e-2")[0], Cell::Number(0.025));
    }

    #[test]
    fn number_stops_at_delimiter() {
        let toks = tokens_of("12)");
        assert_eq!(toks[0], Cell::Number(12.0));
        assert_eq!(toks[1].kind(), Kind::Rp);
    }

    #[test]
    fn names_strip_trailing_parens() {
        let toks = tokens_of("(foo))");
        assert_eq!(toks[0].kind(), Kind::Lp);
        assert_eq!(toks[1], Cell::Name("foo".into()));
        assert_eq!(toks[2].kind(), Kind::Rp);
        assert_eq!(toks[3].kind(), Kind::Rp);
    }

    #[test]
    fn names_run_to_whitespace() {
        // only whitespace delimits a name read
        let toks = tokens_of("a+b c");
        assert_eq!(toks[0], Cell::Name("a+b".into()));
        assert_eq!(toks[1], Cell::Name("c".into()));
    }

    #[test]
    fn comment_token_and_ignore_line() {
        let mut ts = TokenStream::new();
        ts.push_text("; skip me\n7");
        let tok = ts.get().unwrap();
        assert_eq!(tok.kind(), Kind::Comment);
        ts.ignore_line();
        assert_eq!(ts.get().unwrap(), Cell::Number(7.0));
    }

    #[test]
    fn exhausted_source_pops_to_the_outer_one() {
        let mut ts = TokenStream::new();
        ts.push_text("outer");
        ts.push_text("inner");
        assert_eq!(ts.get().unwrap(), Cell::Name("inner".into()));
        // boundary shows up as End, then the outer source resumes
        assert_eq!(ts.get().unwrap().kind(), Kind::End);
        assert_eq!(ts.get().unwrap(), Cell::Name("outer".into()));
        assert_eq!(ts.get().unwrap().kind(), Kind::End);
        assert!(ts.is_done());
    }

    #[test]
    fn current_tracks_last_token() {
        let mut ts = TokenStream::new();
        ts.push_text("(a");
        ts.get().unwrap();
        assert_eq!(ts.current().kind(), Kind::Lp);
        ts.get().unwrap();
        assert_eq!(ts.current(), &Cell::Name("a".into()));
    }
}
