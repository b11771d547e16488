use crate::errors::*;
use crate::input::Input;
use crate::{Res, Sym};
use std::fmt::{Debug, Display, Error, Formatter};
use std::sync::Arc;

use itertools::Itertools;

pub type SAtom = Sym;

#[derive(Clone)]
pub struct SList {
    list: Vec<SExpr>,
    span: Span,
}

impl SList {
    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            elems: self.list.as_slice(),
            span: self.span.clone(),
        }
    }

    pub fn elems(&self) -> &[SExpr] {
        &self.list
    }

    pub fn loc(&self) -> Span {
        self.span.clone()
    }
}

#[derive(Clone)]
pub enum SExpr {
    Atom(SAtom),
    List(SList),
}

impl SExpr {
    pub fn loc(&self) -> Span {
        match self {
            SExpr::Atom(atom) => atom.loc(),
            SExpr::List(list) => list.loc(),
        }
    }

    pub fn is_atom(&self, expected_atom: &str) -> bool {
        self.as_atom().is_some_and(|a| a.canonical_str() == expected_atom)
    }

    pub fn as_atom(&self) -> Option<&SAtom> {
        match self {
            SExpr::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&SList> {
        match self {
            SExpr::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_iter(&self) -> Option<ListIter<'_>> {
        self.as_list().map(|l| l.iter())
    }

    /// If this s-expression is the application of the function `fun`, returns the arguments of the application.
    /// e.g. `(and a b)` is an application of `and` with arguments `[a, b]`.
    pub fn as_application(&self, fun: &str) -> Option<&[SExpr]> {
        match self {
            SExpr::List(l) => match l.list.first() {
                Some(SExpr::Atom(head)) if head.canonical_str() == fun => Some(&l.list[1..]),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Spanned for SExpr {
    fn span(&self) -> Option<&Span> {
        match self {
            SExpr::Atom(a) => a.span.as_ref(),
            SExpr::List(l) => Some(&l.span),
        }
    }
}

impl Display for SExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SExpr::Atom(a) => write!(f, "{a}"),
            SExpr::List(l) => {
                write!(f, "({})", l.list.iter().format(" "))
            }
        }
    }
}

impl Debug for SExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{self}")
    }
}

/// A cursor over the elements of a list, that reports located errors when the expected
/// elements are missing.
#[derive(Clone)]
pub struct ListIter<'a> {
    elems: &'a [SExpr],
    span: Span,
}

impl<'a> ListIter<'a> {
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn loc(&self) -> Span {
        self.span.clone()
    }

    pub fn peek(&self) -> Option<&'a SExpr> {
        self.elems.first()
    }

    pub fn pop(&mut self) -> Res<&'a SExpr> {
        match self.elems.split_first() {
            Some((head, tail)) => {
                self.elems = tail;
                Ok(head)
            }
            None => Err(self.span.last_char().invalid("Unexpected end of list")),
        }
    }

    pub fn pop_atom(&mut self) -> Res<&'a SAtom> {
        match self.elems.split_first() {
            Some((SExpr::Atom(head), tail)) => {
                self.elems = tail;
                Ok(head)
            }
            Some((head, _)) => Err(head.invalid("Expected an atom")),
            None => Err(self.span.last_char().invalid("Expected an atom but got end of list")),
        }
    }

    pub fn pop_known_atom(&mut self, expected: &str) -> Res<()> {
        match self.elems.split_first() {
            Some((SExpr::Atom(head), tail)) if head.canonical_str() == expected => {
                self.elems = tail;
                Ok(())
            }
            Some((head, _)) => Err(head.invalid(format!("Expected the atom `{expected}`"))),
            None => Err(self
                .span
                .last_char()
                .invalid(format!("Expected the atom `{expected}` but got end of list"))),
        }
    }

    pub fn pop_list(&mut self) -> Res<&'a SList> {
        match self.elems.split_first() {
            Some((SExpr::List(head), tail)) => {
                self.elems = tail;
                Ok(head)
            }
            Some((head, _)) => Err(head.invalid("Expected a list")),
            None => Err(self.span.last_char().invalid("Expected a list but got end of list")),
        }
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a SExpr;

    fn next(&mut self) -> Option<Self::Item> {
        let (head, tail) = self.elems.split_first()?;
        self.elems = tail;
        Some(head)
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Sym { start: usize, end: usize },
    LParen(usize),
    RParen(usize),
}

/// Parses a single s-expression from the input. Any trailing content is an error.
pub fn parse(input: Arc<Input>) -> Res<SExpr> {
    let mut exprs = parse_many(input.clone())?;
    match exprs.len() {
        1 => Ok(exprs.remove(0)),
        0 => Err(Message::error("Empty input").note(input.source().unwrap_or("<string>"))),
        _ => Err(exprs[1].invalid("Unexpected content after the end of the first expression")),
    }
}

/// Parses a sequence of s-expressions.
pub fn parse_many(input: Arc<Input>) -> Res<Vec<SExpr>> {
    let tokens = tokenize(input.text());
    let mut tokens = tokens.iter().peekable();
    let mut exprs = Vec::new();
    while tokens.peek().is_some() {
        exprs.push(read(&mut tokens, &input)?);
    }
    Ok(exprs)
}

fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = s.char_indices().peekable();
    let mut start: Option<usize> = None;
    while let Some((i, n)) = chars.next() {
        if n == ';' || n.is_whitespace() || n == '(' || n == ')' {
            if let Some(first) = start.take() {
                tokens.push(Token::Sym { start: first, end: i });
            }
            match n {
                ';' => {
                    // drop all chars until a new line is found
                    while chars.next_if(|&(_, c)| c != '\n').is_some() {}
                }
                '(' => tokens.push(Token::LParen(i)),
                ')' => tokens.push(Token::RParen(i)),
                _ => {}
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(first) = start {
        tokens.push(Token::Sym { start: first, end: s.len() });
    }
    tokens
}

fn read(tokens: &mut std::iter::Peekable<core::slice::Iter<Token>>, src: &Arc<Input>) -> Res<SExpr> {
    match tokens.next() {
        Some(Token::Sym { start, end }) => {
            // PDDL is case insensitive, all symbols are normalized to lower case
            let symbol = src.text()[*start..*end].to_ascii_lowercase();
            let span = Span::new(src.clone(), *start, end - 1);
            Ok(SExpr::Atom(Sym::with_source(symbol, span)))
        }
        Some(Token::LParen(start)) => {
            let mut es = Vec::new();
            loop {
                match tokens.peek() {
                    Some(Token::RParen(end)) => {
                        let span = Span::new(src.clone(), *start, *end);
                        tokens.next();
                        return Ok(SExpr::List(SList { list: es, span }));
                    }
                    Some(_) => es.push(read(tokens, src)?),
                    None => {
                        return Err(Span::new(src.clone(), *start, *start).invalid("Unclosed parenthesis"));
                    }
                }
            }
        }
        Some(Token::RParen(pos)) => Err(Span::new(src.clone(), *pos, *pos).invalid("Unexpected closing parenthesis")),
        None => Err(Message::error("Unexpected end of input")),
    }
}
