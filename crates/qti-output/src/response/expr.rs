//! Expression and condition trees of response processing.
//!
//! Builders assemble these values; they are turned into markup once, by the
//! item assembler, so every element is closed and every value escaped.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::Result;

/// Base types used by item variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Identifier,
    String,
    Float,
    Boolean,
}

impl BaseType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::String => "string",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }
}

/// Value and boolean expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Variable(String),
    BaseValue { base_type: BaseType, value: String },
    MapResponse(String),
    IsNull(Box<Expr>),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Sum(Vec<Expr>),
    Match(Box<Expr>, Box<Expr>),
    Member(Box<Expr>, Box<Expr>),
    Gte(Box<Expr>, Box<Expr>),
    Lte(Box<Expr>, Box<Expr>),
    /// Exact text comparison ignoring spaces.
    StringMatch {
        case_sensitive: bool,
        expected: Box<Expr>,
        response: Box<Expr>,
    },
}

impl Expr {
    pub fn variable(identifier: impl Into<String>) -> Self {
        Self::Variable(identifier.into())
    }

    pub fn value(base_type: BaseType, value: impl Into<String>) -> Self {
        Self::BaseValue {
            base_type,
            value: value.into(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::BaseValue {
            base_type: BaseType::Boolean,
            value: value.to_string(),
        }
    }

    pub fn is_null(inner: Self) -> Self {
        Self::IsNull(Box::new(inner))
    }

    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Conjunction; an empty list is trivially true.
    pub fn all(mut items: Vec<Self>) -> Self {
        match items.len() {
            0 => Self::boolean(true),
            1 => items.remove(0),
            _ => Self::And(items),
        }
    }

    /// Disjunction; an empty list is trivially false.
    pub fn any(mut items: Vec<Self>) -> Self {
        match items.len() {
            0 => Self::boolean(false),
            1 => items.remove(0),
            _ => Self::Or(items),
        }
    }

    pub fn sum(items: Vec<Self>) -> Self {
        Self::Sum(items)
    }

    pub fn matches(left: Self, right: Self) -> Self {
        Self::Match(Box::new(left), Box::new(right))
    }

    pub fn member(value: Self, container: Self) -> Self {
        Self::Member(Box::new(value), Box::new(container))
    }

    pub fn gte(left: Self, right: Self) -> Self {
        Self::Gte(Box::new(left), Box::new(right))
    }

    pub fn lte(left: Self, right: Self) -> Self {
        Self::Lte(Box::new(left), Box::new(right))
    }

    pub fn string_match(case_sensitive: bool, expected: Self, response: Self) -> Self {
        Self::StringMatch {
            case_sensitive,
            expected: Box::new(expected),
            response: Box::new(response),
        }
    }
}

/// `setOutcomeValue`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOutcome {
    pub identifier: String,
    pub value: Expr,
}

impl SetOutcome {
    pub fn new(identifier: impl Into<String>, value: Expr) -> Self {
        Self {
            identifier: identifier.into(),
            value,
        }
    }

    /// `identifier := identifier + amount`.
    pub fn add(identifier: &str, amount: Expr) -> Self {
        Self::new(
            identifier,
            Expr::sum(vec![Expr::variable(identifier), amount]),
        )
    }
}

/// One `responseIf` / `responseElseIf` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub test: Expr,
    pub actions: Vec<SetOutcome>,
}

/// `responseCondition`: arms tried in order, then the optional else arm.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCondition {
    pub branches: Vec<Branch>,
    pub otherwise: Vec<SetOutcome>,
    /// Value of the vendor `inspera:type` attribute.
    pub vendor_type: Option<&'static str>,
}

impl ResponseCondition {
    pub fn when(test: Expr, actions: Vec<SetOutcome>) -> Self {
        Self {
            branches: vec![Branch { test, actions }],
            otherwise: Vec::new(),
            vendor_type: None,
        }
    }

    #[must_use]
    pub fn or_when(mut self, test: Expr, actions: Vec<SetOutcome>) -> Self {
        self.branches.push(Branch { test, actions });
        self
    }

    #[must_use]
    pub fn otherwise(mut self, actions: Vec<SetOutcome>) -> Self {
        self.otherwise = actions;
        self
    }

    #[must_use]
    pub fn with_vendor_type(mut self, vendor_type: &'static str) -> Self {
        self.vendor_type = Some(vendor_type);
        self
    }
}

pub(crate) fn write_condition<W: Write>(
    writer: &mut Writer<W>,
    condition: &ResponseCondition,
) -> Result<()> {
    let mut start = BytesStart::new("responseCondition");
    if let Some(vendor_type) = condition.vendor_type {
        start.push_attribute(("inspera:type", vendor_type));
    }
    writer.write_event(Event::Start(start))?;
    for (index, branch) in condition.branches.iter().enumerate() {
        let name = if index == 0 {
            "responseIf"
        } else {
            "responseElseIf"
        };
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        write_expr(writer, &branch.test)?;
        for action in &branch.actions {
            write_set_outcome(writer, action)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    }
    if !condition.otherwise.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("responseElse")))?;
        for action in &condition.otherwise {
            write_set_outcome(writer, action)?;
        }
        writer.write_event(Event::End(BytesEnd::new("responseElse")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("responseCondition")))?;
    Ok(())
}

fn write_set_outcome<W: Write>(writer: &mut Writer<W>, action: &SetOutcome) -> Result<()> {
    let mut start = BytesStart::new("setOutcomeValue");
    start.push_attribute(("identifier", action.identifier.as_str()));
    writer.write_event(Event::Start(start))?;
    write_expr(writer, &action.value)?;
    writer.write_event(Event::End(BytesEnd::new("setOutcomeValue")))?;
    Ok(())
}

pub(crate) fn write_expr<W: Write>(writer: &mut Writer<W>, expr: &Expr) -> Result<()> {
    match expr {
        Expr::Variable(identifier) => {
            let mut element = BytesStart::new("variable");
            element.push_attribute(("identifier", identifier.as_str()));
            writer.write_event(Event::Empty(element))?;
        }
        Expr::MapResponse(identifier) => {
            let mut element = BytesStart::new("mapResponse");
            element.push_attribute(("identifier", identifier.as_str()));
            writer.write_event(Event::Empty(element))?;
        }
        Expr::BaseValue { base_type, value } => {
            let mut element = BytesStart::new("baseValue");
            element.push_attribute(("baseType", base_type.as_str()));
            writer.write_event(Event::Start(element))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("baseValue")))?;
        }
        Expr::IsNull(inner) => write_operator(writer, BytesStart::new("isNull"), [&**inner])?,
        Expr::Not(inner) => write_operator(writer, BytesStart::new("not"), [&**inner])?,
        Expr::And(items) => write_operator(writer, BytesStart::new("and"), items)?,
        Expr::Or(items) => write_operator(writer, BytesStart::new("or"), items)?,
        Expr::Sum(items) => write_operator(writer, BytesStart::new("sum"), items)?,
        Expr::Match(left, right) => {
            write_operator(writer, BytesStart::new("match"), [&**left, &**right])?;
        }
        Expr::Member(left, right) => {
            write_operator(writer, BytesStart::new("member"), [&**left, &**right])?;
        }
        Expr::Gte(left, right) => {
            write_operator(writer, BytesStart::new("gte"), [&**left, &**right])?;
        }
        Expr::Lte(left, right) => {
            write_operator(writer, BytesStart::new("lte"), [&**left, &**right])?;
        }
        Expr::StringMatch {
            case_sensitive,
            expected,
            response,
        } => {
            let mut element = BytesStart::new("stringMatch");
            element.push_attribute(("caseSensitive", if *case_sensitive { "true" } else { "false" }));
            element.push_attribute(("inspera:ignoredCharacters", " "));
            write_operator(writer, element, [&**expected, &**response])?;
        }
    }
    Ok(())
}

fn write_operator<'e, W: Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    operands: impl IntoIterator<Item = &'e Expr>,
) -> Result<()> {
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    for operand in operands {
        write_expr(writer, operand)?;
    }
    writer.write_event(Event::End(end))?;
    Ok(())
}
