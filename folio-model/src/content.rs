//! Content grammar.
//!
//! A node type's `content` is a small regular expression over child node type
//! names and group names:
//!
//! ```text
//! paragraph block*          a paragraph followed by any number of blocks
//! (text | hard_break)*      inline choice
//! list_item+                one or more list items
//! heading{1,2} paragraph?   bounded repetition and optional element
//! ```
//!
//! Expressions are parsed once when the schema is built. Every name must
//! resolve to a node type or a group; an unresolved name is a schema error.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Star(Box<Expr>),
    Plus(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        expr: Box<Expr>,
        min: usize,
        max: Option<usize>,
    },
    /// One node type name, or a group expanded to its member types.
    Name(Vec<Arc<str>>),
}

/// A parsed, resolved content expression.
#[derive(Clone, PartialEq)]
pub struct ContentExpr {
    source: String,
    expr: Option<Expr>,
}

impl fmt::Debug for ContentExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentExpr({:?})", self.source)
    }
}

impl ContentExpr {
    /// The expression of a leaf node: no children at all.
    pub fn empty() -> Self {
        Self {
            source: String::new(),
            expr: None,
        }
    }

    /// Parses `source`, resolving each name through `resolve`.
    ///
    /// `resolve` returns the node type names a token stands for (a single
    /// type, or every member of a group), or `None` for an unknown name.
    /// Errors carry a short description of what went wrong; the schema wraps
    /// them with the owning node's name.
    pub fn parse<F>(source: &str, resolve: F) -> Result<Self, ContentParseError>
    where
        F: Fn(&str) -> Option<Vec<Arc<str>>>,
    {
        let tokens = tokenize(source);
        if tokens.is_empty() {
            return Ok(Self::empty());
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            resolve: &resolve,
        };
        let expr = parser.parse_choice()?;
        if let Some(tok) = parser.peek() {
            return Err(ContentParseError::Syntax(format!("unexpected trailing token '{tok}'")));
        }
        Ok(Self {
            source: source.to_string(),
            expr: Some(expr),
        })
    }

    /// The expression as written in the node spec.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True for leaf types, which cannot hold any content.
    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    /// Every node type name the expression can accept.
    pub fn names(&self) -> BTreeSet<Arc<str>> {
        let mut out = BTreeSet::new();
        if let Some(expr) = &self.expr {
            collect_names(expr, &mut out);
        }
        out
    }

    /// Node type names that may appear as the first child.
    pub fn first_names(&self) -> BTreeSet<Arc<str>> {
        let mut out = BTreeSet::new();
        if let Some(expr) = &self.expr {
            collect_first(expr, &mut out);
        }
        out
    }

    /// Whether the expression accepts this exact sequence of child types.
    pub fn matches<S: AsRef<str>>(&self, children: &[S]) -> bool {
        let names: Vec<&str> = children.iter().map(AsRef::as_ref).collect();
        match &self.expr {
            None => names.is_empty(),
            Some(expr) => {
                let start = BTreeSet::from([0]);
                advance(expr, &names, &start).contains(&names.len())
            }
        }
    }

    /// Whether an empty child list is valid.
    pub fn matches_empty(&self) -> bool {
        self.matches::<&str>(&[])
    }
}

/// Failure while parsing a content expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentParseError {
    Syntax(String),
    UnknownName(String),
}

fn collect_names(expr: &Expr, out: &mut BTreeSet<Arc<str>>) {
    match expr {
        Expr::Choice(items) | Expr::Seq(items) => items.iter().for_each(|e| collect_names(e, out)),
        Expr::Star(e) | Expr::Plus(e) | Expr::Opt(e) => collect_names(e, out),
        Expr::Range { expr, .. } => collect_names(expr, out),
        Expr::Name(names) => out.extend(names.iter().cloned()),
    }
}

fn nullable(expr: &Expr) -> bool {
    match expr {
        Expr::Name(_) => false,
        Expr::Seq(items) => items.iter().all(nullable),
        Expr::Choice(items) => items.iter().any(nullable),
        Expr::Star(_) | Expr::Opt(_) => true,
        Expr::Plus(inner) => nullable(inner),
        Expr::Range { expr, min, .. } => *min == 0 || nullable(expr),
    }
}

/// Collects the names that can start a match of `expr`.
fn collect_first(expr: &Expr, out: &mut BTreeSet<Arc<str>>) {
    match expr {
        Expr::Name(names) => out.extend(names.iter().cloned()),
        Expr::Seq(items) => {
            for item in items {
                collect_first(item, out);
                if !nullable(item) {
                    break;
                }
            }
        }
        Expr::Choice(items) => items.iter().for_each(|e| collect_first(e, out)),
        Expr::Star(e) | Expr::Plus(e) | Expr::Opt(e) => collect_first(e, out),
        Expr::Range { expr, .. } => collect_first(expr, out),
    }
}

/// Returns every index reachable after matching `expr` from any of `starts`.
fn advance(expr: &Expr, names: &[&str], starts: &BTreeSet<usize>) -> BTreeSet<usize> {
    match expr {
        Expr::Name(accepted) => starts
            .iter()
            .filter(|&&i| i < names.len() && accepted.iter().any(|a| a.as_ref() == names[i]))
            .map(|i| i + 1)
            .collect(),
        Expr::Seq(items) => items
            .iter()
            .fold(starts.clone(), |acc, item| advance(item, names, &acc)),
        Expr::Choice(items) => items
            .iter()
            .flat_map(|item| advance(item, names, starts))
            .collect(),
        Expr::Opt(inner) => {
            let mut out = starts.clone();
            out.extend(advance(inner, names, starts));
            out
        }
        Expr::Star(inner) => closure(inner, names, starts.clone()),
        Expr::Plus(inner) => {
            let once = advance(inner, names, starts);
            closure(inner, names, once)
        }
        Expr::Range { expr, min, max } => {
            let mut current = starts.clone();
            for _ in 0..*min {
                current = advance(expr, names, &current);
                if current.is_empty() {
                    return current;
                }
            }
            match max {
                None => closure(expr, names, current),
                Some(max) => {
                    let mut out = current.clone();
                    for _ in *min..*max {
                        current = advance(expr, names, &current);
                        if current.is_empty() {
                            break;
                        }
                        out.extend(current.iter().copied());
                    }
                    out
                }
            }
        }
    }
}

/// Zero or more repetitions: grows the reachable set until it stops changing.
fn closure(inner: &Expr, names: &[&str], mut reached: BTreeSet<usize>) -> BTreeSet<usize> {
    let mut frontier = reached.clone();
    while !frontier.is_empty() {
        let next = advance(inner, names, &frontier);
        frontier = next.difference(&reached).copied().collect();
        reached.extend(frontier.iter().copied());
    }
    reached
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphanumeric() || c == '_' {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    word.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(word);
        } else {
            tokens.push(c.to_string());
            chars.next();
        }
    }
    tokens
}

struct Parser<'r, F> {
    tokens: Vec<String>,
    pos: usize,
    resolve: &'r F,
}

impl<F> Parser<'_, F>
where
    F: Fn(&str) -> Option<Vec<Arc<str>>>,
{
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, tok: &str) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &str) -> Result<(), ContentParseError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(ContentParseError::Syntax(format!(
                "expected '{tok}', found {}",
                self.peek().map_or("end of input".to_string(), |t| format!("'{t}'"))
            )))
        }
    }

    fn parse_choice(&mut self) -> Result<Expr, ContentParseError> {
        let mut options = vec![self.parse_seq()?];
        while self.eat("|") {
            options.push(self.parse_seq()?);
        }
        Ok(if options.len() == 1 {
            options.remove(0)
        } else {
            Expr::Choice(options)
        })
    }

    fn parse_seq(&mut self) -> Result<Expr, ContentParseError> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_subscript()?);
            match self.peek() {
                None | Some(")") | Some("|") => break,
                _ => {}
            }
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Seq(items)
        })
    }

    fn parse_subscript(&mut self) -> Result<Expr, ContentParseError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat("+") {
                expr = Expr::Plus(Box::new(expr));
            } else if self.eat("*") {
                expr = Expr::Star(Box::new(expr));
            } else if self.eat("?") {
                expr = Expr::Opt(Box::new(expr));
            } else if self.eat("{") {
                expr = self.parse_range(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_number(&mut self) -> Result<usize, ContentParseError> {
        let tok = self.peek().unwrap_or_default().to_string();
        let n = tok
            .parse::<usize>()
            .map_err(|_| ContentParseError::Syntax(format!("expected number, got '{tok}'")))?;
        self.pos += 1;
        Ok(n)
    }

    fn parse_range(&mut self, expr: Expr) -> Result<Expr, ContentParseError> {
        let min = self.parse_number()?;
        let mut max = Some(min);
        if self.eat(",") {
            max = if self.peek() == Some("}") {
                None
            } else {
                Some(self.parse_number()?)
            };
        }
        self.expect("}")?;
        if let Some(max) = max {
            if max < min {
                return Err(ContentParseError::Syntax(format!("range {{{min},{max}}} is empty")));
            }
        }
        Ok(Expr::Range {
            expr: Box::new(expr),
            min,
            max,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, ContentParseError> {
        if self.eat("(") {
            let expr = self.parse_choice()?;
            self.expect(")")?;
            return Ok(expr);
        }
        let tok = match self.peek() {
            Some(tok) => tok.to_string(),
            None => return Err(ContentParseError::Syntax("unexpected end of expression".into())),
        };
        if !tok.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(ContentParseError::Syntax(format!("unexpected token '{tok}'")));
        }
        self.pos += 1;
        (self.resolve)(&tok)
            .filter(|types| !types.is_empty())
            .map(Expr::Name)
            .ok_or(ContentParseError::UnknownName(tok))
    }
}
