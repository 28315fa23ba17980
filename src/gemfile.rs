use std::fs;
use std::path::Path;

use tracing::debug;
use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, delimited, eof, preceded, repeat, separated, terminated};
use winnow::prelude::*;
use winnow::token::{rest, take_till, take_while};

use crate::error::{Error, Result};
use crate::requirement::DepSet;

/// Groups whose gems count as development dependencies.
const DEVELOPMENT_GROUPS: &[&str] = &["development", "test"];

/// Block statements that carry no group information.
const NEUTRAL_BLOCKS: &[&str] = &[
    "platforms",
    "platform",
    "install_if",
    "source",
    "git",
    "path",
    "env",
];

/// One `gem` declaration from a Gemfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Gem name.
    pub name: String,
    /// Version constraints joined with `, `, e.g. `~> 1.0, >= 1.0.2`.
    pub constraint: Option<String>,
    /// Groups from enclosing `group` blocks and `group:` options.
    pub groups: Vec<String>,
}

impl Declaration {
    /// Whether the gem is only needed for development or tests.
    pub fn is_development(&self) -> bool {
        self.groups
            .iter()
            .any(|g| DEVELOPMENT_GROUPS.contains(&g.as_str()))
    }
}

/// Receiver of the declarations found while evaluating a Gemfile.
pub trait DeclarationContext {
    /// Record one `gem` declaration.
    fn declare(&mut self, declaration: Declaration);
}

impl DeclarationContext for Vec<Declaration> {
    fn declare(&mut self, declaration: Declaration) {
        self.push(declaration);
    }
}

/// Evaluate Gemfile content, reporting each `gem` to `context`.
///
/// Supports the declarative subset of the Gemfile DSL: `gem` with version
/// constraints and options, `group ... do`/`end` blocks, neutral blocks such
/// as `platforms ... do`, and the `source`, `gemspec`, `ruby`, `git_source`
/// and `plugin` statements, which are ignored. Anything else fails with
/// [`Error::GemfileSyntax`].
///
/// # Examples
///
/// ```
/// use rpmspec_sync::{evaluate, Declaration};
///
/// let mut declared: Vec<Declaration> = Vec::new();
/// evaluate("source 'https://rubygems.org'\ngem 'rack', '~> 1.5'\n", &mut declared).unwrap();
/// assert_eq!(declared[0].name, "rack");
/// assert_eq!(declared[0].constraint.as_deref(), Some("~> 1.5"));
/// ```
pub fn evaluate(content: &str, context: &mut impl DeclarationContext) -> Result<()> {
    let mut blocks: Vec<Vec<String>> = Vec::new();
    let mut last_line = 0;

    for (index, line) in content.lines().enumerate() {
        let number = index + 1;
        last_line = number;

        let statement = parse_statement(line).ok_or_else(|| {
            syntax_error(number, format!("unsupported statement `{}`", line.trim()))
        })?;
        match statement {
            Statement::Ignored => {}
            Statement::Gem { name, args } => {
                let mut groups: Vec<String> = blocks.iter().flatten().cloned().collect();
                let mut constraints = Vec::new();
                for arg in &args {
                    match arg {
                        Arg::Positional(Value::Str(c)) => constraints.push(*c),
                        Arg::Option(key, value) if matches!(*key, "group" | "groups") => {
                            groups.extend(value.names().into_iter().map(str::to_string))
                        }
                        _ => {}
                    }
                }
                context.declare(Declaration {
                    name: name.to_string(),
                    constraint: (!constraints.is_empty()).then(|| constraints.join(", ")),
                    groups,
                });
            }
            Statement::Group(names) => blocks.push(names.into_iter().map(str::to_string).collect()),
            Statement::Block => blocks.push(Vec::new()),
            Statement::End => {
                if blocks.pop().is_none() {
                    return Err(syntax_error(number, "unexpected `end`".to_string()));
                }
            }
        }
    }

    if !blocks.is_empty() {
        return Err(syntax_error(last_line, "unclosed block".to_string()));
    }
    Ok(())
}

fn syntax_error(line: usize, message: String) -> Error {
    Error::GemfileSyntax { line, message }
}

/// Dependencies declared by a Gemfile.
///
/// # Examples
///
/// ```
/// use rpmspec_sync::Gemfile;
///
/// let gemfile = Gemfile::parse("\
/// source 'https://rubygems.org'
/// gem 'rails', '3.2.13'
/// group :development, :test do
///   gem 'rspec-rails'
/// end
/// ").unwrap();
/// assert_eq!(gemfile.deps().iter().collect::<Vec<_>>(), vec!["rails"]);
/// assert_eq!(gemfile.dev_deps().iter().collect::<Vec<_>>(), vec!["rspec-rails"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gemfile {
    declarations: Vec<Declaration>,
}

impl Gemfile {
    /// Evaluate Gemfile content.
    pub fn parse(content: &str) -> Result<Gemfile> {
        let mut declarations = Vec::new();
        evaluate(content, &mut declarations)?;
        debug!(gems = declarations.len(), "evaluated gemfile");
        Ok(Gemfile { declarations })
    }

    /// Read and evaluate the Gemfile at `path`.
    ///
    /// Fails with [`Error::GemfileNotFound`] if the file cannot be read and
    /// [`Error::InvalidGemfile`] if its content cannot be evaluated.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Gemfile> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|_| Error::GemfileNotFound(path.display().to_string()))?;
        Self::parse(&content).map_err(|e| Error::InvalidGemfile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// All declarations in file order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Names of gems outside the development and test groups.
    pub fn deps(&self) -> DepSet {
        self.declarations
            .iter()
            .filter(|d| !d.is_development())
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Names of gems in the development or test groups.
    pub fn dev_deps(&self) -> DepSet {
        self.declarations
            .iter()
            .filter(|d| d.is_development())
            .map(|d| d.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value<'s> {
    Str(&'s str),
    Symbol(&'s str),
    List(Vec<Value<'s>>),
    Bare(&'s str),
}

impl<'s> Value<'s> {
    /// String and symbol names, flattening lists.
    fn names(&self) -> Vec<&'s str> {
        match self {
            Value::Str(name) | Value::Symbol(name) => vec![*name],
            Value::List(values) => values.iter().flat_map(Value::names).collect(),
            Value::Bare(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg<'s> {
    Positional(Value<'s>),
    Option(&'s str, Value<'s>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement<'s> {
    Gem { name: &'s str, args: Vec<Arg<'s>> },
    Group(Vec<&'s str>),
    Block,
    End,
    Ignored,
}

fn parse_statement(line: &str) -> Option<Statement<'_>> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return Some(Statement::Ignored);
    }
    statement.parse(line).ok()
}

/// Cut a trailing `#` comment that is not inside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '#') => return &line[..i],
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), c) if c == open => quote = None,
            _ => {}
        }
    }
    line
}

// Winnow parsers

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_bare_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | '[' | ']')
}

fn comma(input: &mut &str) -> ModalResult<()> {
    (space0, ',', space0).void().parse_next(input)
}

fn quoted<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    alt((
        delimited('\'', take_till(0.., '\''), '\''),
        delimited('"', take_till(0.., '"'), '"'),
    ))
    .parse_next(input)
}

fn symbol<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    preceded(':', take_while(1.., is_ident_char)).parse_next(input)
}

fn list<'s>(input: &mut &'s str) -> ModalResult<Vec<Value<'s>>> {
    delimited(('[', space0), separated(0.., value, comma), (space0, ']')).parse_next(input)
}

fn value<'s>(input: &mut &'s str) -> ModalResult<Value<'s>> {
    alt((
        quoted.map(Value::Str),
        symbol.map(Value::Symbol),
        list.map(Value::List),
        take_while(1.., is_bare_char).map(Value::Bare),
    ))
    .parse_next(input)
}

/// `key: `, `:key => ` or `'key' => `.
fn option_key<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    alt((
        terminated(take_while(1.., is_ident_char), (':', space1)),
        terminated(symbol, (space0, "=>", space0)),
        terminated(quoted, (space0, "=>", space0)),
    ))
    .parse_next(input)
}

fn argument<'s>(input: &mut &'s str) -> ModalResult<Arg<'s>> {
    alt((
        (option_key, value).map(|(key, value)| Arg::Option(key, value)),
        value.map(Arg::Positional),
    ))
    .parse_next(input)
}

fn gem_statement<'s>(input: &mut &'s str) -> ModalResult<Statement<'s>> {
    preceded(
        ("gem", space1),
        (quoted, repeat(0.., preceded(comma, argument))),
    )
    .map(|(name, args)| Statement::Gem { name, args })
    .parse_next(input)
}

fn group_arg<'s>(input: &mut &'s str) -> ModalResult<Option<&'s str>> {
    alt((
        (option_key, value).map(|_| None),
        symbol.map(Some),
        quoted.map(Some),
    ))
    .parse_next(input)
}

fn group_block<'s>(input: &mut &'s str) -> ModalResult<Statement<'s>> {
    delimited(
        ("group", space1),
        separated(1.., group_arg, comma),
        (space1, "do", eof),
    )
    .map(|groups: Vec<Option<&'s str>>| Statement::Group(groups.into_iter().flatten().collect()))
    .parse_next(input)
}

fn neutral_block<'s>(input: &mut &'s str) -> ModalResult<Statement<'s>> {
    (take_while(1.., is_ident_char), rest)
        .verify(|(keyword, tail): &(&str, &str)| {
            NEUTRAL_BLOCKS.contains(keyword)
                && tail.starts_with(char::is_whitespace)
                && tail.ends_with(" do")
        })
        .value(Statement::Block)
        .parse_next(input)
}

fn ignored_statement<'s>(input: &mut &'s str) -> ModalResult<Statement<'s>> {
    (
        alt(("source", "gemspec", "ruby", "git_source", "plugin")),
        alt((space1.void(), eof.void(), '('.void())),
        rest,
    )
        .value(Statement::Ignored)
        .parse_next(input)
}

fn statement<'s>(input: &mut &'s str) -> ModalResult<Statement<'s>> {
    alt((
        gem_statement,
        group_block,
        ("end", eof).value(Statement::End),
        neutral_block,
        ignored_statement,
    ))
    .parse_next(input)
}
