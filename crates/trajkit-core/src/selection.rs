//! Keyword atom selections.
//!
//! ```text
//! expr    := and ("or" and)*
//! and     := unary ("and" unary)*
//! unary   := "not" unary | primary
//! primary := "(" expr ")" | "all"
//!          | ("name" | "resname" | "chain" | "segid") word[,word...]
//!          | ("resid" | "index" | "id") range[,range...]
//! range   := int | int-int
//! ```
//!
//! Word matches are case-insensitive. `index` is the 0-based frame slot,
//! `id` the 1-based atom identifier.

use crate::error::{TrajError, TrajResult};
use crate::system::Atom;

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    All,
    Name(Vec<String>),
    Resname(Vec<String>),
    Chain(Vec<String>),
    Segid(Vec<String>),
    Resid(Vec<(i64, i64)>),
    Index(Vec<(i64, i64)>),
    Id(Vec<(i64, i64)>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub expr: String,
    root: Expr,
}

impl Selection {
    pub fn parse(expr: &str) -> TrajResult<Self> {
        let tokens = tokenize(expr);
        if tokens.is_empty() {
            return Err(TrajError::InvalidSelection("empty selection".into()));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or()?;
        if let Some(tok) = parser.peek() {
            return Err(TrajError::InvalidSelection(format!(
                "unexpected token '{tok}' in '{expr}'"
            )));
        }
        Ok(Self {
            expr: expr.to_string(),
            root,
        })
    }

    pub fn matches(&self, atom: &Atom) -> bool {
        eval(&self.root, atom)
    }
}

fn eval(expr: &Expr, atom: &Atom) -> bool {
    match expr {
        Expr::All => true,
        Expr::Name(words) => words.iter().any(|w| w.eq_ignore_ascii_case(atom.name.trim())),
        Expr::Resname(words) => words
            .iter()
            .any(|w| w.eq_ignore_ascii_case(atom.resname.trim())),
        Expr::Chain(words) => words.iter().any(|w| w.eq_ignore_ascii_case(atom.chain.trim())),
        Expr::Segid(words) => words.iter().any(|w| w.eq_ignore_ascii_case(atom.segid.trim())),
        Expr::Resid(ranges) => in_ranges(ranges, atom.resid as i64),
        Expr::Index(ranges) => in_ranges(ranges, atom.index as i64),
        Expr::Id(ranges) => in_ranges(ranges, atom.id as i64),
        Expr::Not(inner) => !eval(inner, atom),
        Expr::And(a, b) => eval(a, atom) && eval(b, atom),
        Expr::Or(a, b) => eval(a, atom) || eval(b, atom),
    }
}

fn in_ranges(ranges: &[(i64, i64)], value: i64) -> bool {
    ranges.iter().any(|&(lo, hi)| value >= lo && value <= hi)
}

fn tokenize(expr: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in expr.chars() {
        if ch == '(' || ch == ')' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(ch.to_string());
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|s| s.as_str())
    }

    fn next(&mut self) -> TrajResult<String> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| TrajError::InvalidSelection("unexpected end of selection".into()))?;
        self.pos += 1;
        Ok(tok)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek()
            .map(|t| t.eq_ignore_ascii_case(keyword))
            .unwrap_or(false)
    }

    fn parse_or(&mut self) -> TrajResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> TrajResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> TrajResult<Expr> {
        if self.peek_keyword("not") {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> TrajResult<Expr> {
        let tok = self.next()?;
        if tok == "(" {
            let inner = self.parse_or()?;
            let close = self.next()?;
            if close != ")" {
                return Err(TrajError::InvalidSelection(format!(
                    "expected ')' but found '{close}'"
                )));
            }
            return Ok(inner);
        }
        match tok.to_ascii_lowercase().as_str() {
            "all" => Ok(Expr::All),
            "name" => Ok(Expr::Name(self.words()?)),
            "resname" => Ok(Expr::Resname(self.words()?)),
            "chain" => Ok(Expr::Chain(self.words()?)),
            "segid" => Ok(Expr::Segid(self.words()?)),
            "resid" => Ok(Expr::Resid(self.ranges()?)),
            "index" => Ok(Expr::Index(self.ranges()?)),
            "id" => Ok(Expr::Id(self.ranges()?)),
            other => Err(TrajError::InvalidSelection(format!(
                "unknown selection keyword '{other}'"
            ))),
        }
    }

    fn words(&mut self) -> TrajResult<Vec<String>> {
        let tok = self.next()?;
        let words: Vec<String> = tok
            .split(',')
            .filter(|w| !w.is_empty())
            .map(|w| w.trim_matches(|c| c == '"' || c == '\'').to_string())
            .collect();
        if words.is_empty() {
            return Err(TrajError::InvalidSelection(format!("empty word list '{tok}'")));
        }
        Ok(words)
    }

    fn ranges(&mut self) -> TrajResult<Vec<(i64, i64)>> {
        let tok = self.next()?;
        let mut out = Vec::new();
        for part in tok.split(',').filter(|p| !p.is_empty()) {
            let (lo, hi) = match part.split_once('-') {
                Some((lo, hi)) => (parse_int(lo, part)?, parse_int(hi, part)?),
                None => {
                    let v = parse_int(part, part)?;
                    (v, v)
                }
            };
            if hi < lo {
                return Err(TrajError::InvalidSelection(format!(
                    "descending range '{part}'"
                )));
            }
            out.push((lo, hi));
        }
        if out.is_empty() {
            return Err(TrajError::InvalidSelection(format!("empty range list '{tok}'")));
        }
        Ok(out)
    }
}

fn parse_int(token: &str, context: &str) -> TrajResult<i64> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|_| TrajError::InvalidSelection(format!("invalid integer in '{context}'")))
}
