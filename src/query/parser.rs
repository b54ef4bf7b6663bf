use super::ast::{DateRangeFilter, FilterRule, Operator, SortDirection, SortRule};
use crate::value::{parse_date, Value};
use chrono::NaiveDate;
use thiserror::Error;

pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

#[derive(Debug, Error)]
#[error("Parse error at position {pos}: {message}")]
pub struct ParseError {
    pub message: String,
    pub pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn parse(mut self) -> Result<Vec<FilterRule>, ParseError> {
        let rules = self.parse_and()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error("Unexpected input after rule"));
        }
        Ok(rules)
    }

    fn parse_and(&mut self) -> Result<Vec<FilterRule>, ParseError> {
        let mut rules = vec![self.parse_rule()?];
        loop {
            self.skip_whitespace();
            if !self.match_keyword("AND") {
                break;
            }
            rules.push(self.parse_rule()?);
        }
        Ok(rules)
    }

    fn parse_rule(&mut self) -> Result<FilterRule, ParseError> {
        let column = self.parse_column()?;
        self.skip_whitespace();

        if self.match_keyword("between") {
            let min = self.parse_value()?;
            self.skip_whitespace();
            if !self.match_keyword("and") {
                return Err(self.error("Expected 'and' between bounds"));
            }
            let max = self.parse_value()?;
            return Ok(FilterRule::between(column, min, max));
        }

        let operator = self.parse_operator()?;
        let value = self.parse_value()?;
        Ok(FilterRule::new(column, operator, value))
    }

    fn parse_column(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let start = self.pos;

        while self.pos < self.input.len() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }

        if self.pos == start {
            return Err(self.error("Expected column name"));
        }

        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_operator(&mut self) -> Result<Operator, ParseError> {
        self.skip_whitespace();

        if self.match_str("==") || self.match_char('=') {
            return Ok(Operator::Equals);
        }
        if self.match_char('>') {
            return Ok(Operator::GreaterThan);
        }
        if self.match_char('<') {
            return Ok(Operator::LessThan);
        }
        if self.match_keyword("equals") {
            return Ok(Operator::Equals);
        }
        if self.match_keyword("contains") {
            return Ok(Operator::Contains);
        }
        if self.match_keyword("startswith") {
            return Ok(Operator::StartsWith);
        }
        if self.match_keyword("endswith") {
            return Ok(Operator::EndsWith);
        }
        if self.match_keyword("in") {
            return Ok(Operator::In);
        }
        if self.match_keyword("not") {
            self.skip_whitespace();
            if self.match_keyword("in") {
                return Ok(Operator::NotIn);
            }
            return Err(self.error("Expected 'in' after 'not'"));
        }

        Err(self.error(
            "Expected operator (=, >, <, contains, startsWith, endsWith, between, in, not in)",
        ))
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_whitespace();

        if self.match_char('"') {
            return self.parse_string();
        }

        let start = self.pos;
        while self.pos < self.input.len() && !self.current_char().is_whitespace() {
            self.pos += self.current_char().len_utf8();
        }
        if self.pos == start {
            return Err(self.error("Expected value"));
        }

        let text = &self.input[start..self.pos];
        if text.eq_ignore_ascii_case("true") {
            return Ok(Value::Bool(true));
        }
        if text.eq_ignore_ascii_case("false") {
            return Ok(Value::Bool(false));
        }
        // Numbers and dates stay as written; numeric operators parse them.
        Ok(Value::String(text.to_string()))
    }

    fn parse_string(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        while self.pos < self.input.len() && self.current_char() != '"' {
            self.pos += self.current_char().len_utf8();
        }
        let s = self.input[start..self.pos].to_string();
        if !self.match_char('"') {
            return Err(self.error("Unterminated string"));
        }
        Ok(Value::String(s))
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.current_char().is_whitespace() {
            self.pos += self.current_char().len_utf8();
        }
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn match_char(&mut self, c: char) -> bool {
        if self.pos < self.input.len() && self.current_char() == c {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn match_str(&mut self, s: &str) -> bool {
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, kw: &str) -> bool {
        let remaining = &self.input[self.pos..];
        if remaining.len() < kw.len() || !remaining.is_char_boundary(kw.len()) {
            return false;
        }
        if !remaining[..kw.len()].eq_ignore_ascii_case(kw) {
            return false;
        }
        let after = remaining[kw.len()..].chars().next();
        if after.map_or(true, |c| !c.is_alphanumeric() && c != '_') {
            self.pos += kw.len();
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            pos: self.pos,
        }
    }
}

/// Parses `status = "active" AND cost > 100` into AND-ed filter rules.
pub fn parse(input: &str) -> Result<Vec<FilterRule>, ParseError> {
    Parser::new(input).parse()
}

/// Parses `column[:asc|desc]` specs. Priority follows argument order.
pub fn parse_sort(specs: &[String]) -> Result<Vec<SortRule>, ParseError> {
    specs
        .iter()
        .enumerate()
        .map(|(idx, spec)| {
            let (column, direction) = match spec.rsplit_once(':') {
                Some((column, dir)) => {
                    let direction = match dir.trim().to_ascii_lowercase().as_str() {
                        "asc" => SortDirection::Asc,
                        "desc" => SortDirection::Desc,
                        _ => {
                            return Err(ParseError {
                                message: format!("Unknown sort direction '{}'", dir),
                                pos: column.len() + 1,
                            })
                        }
                    };
                    (column.trim(), direction)
                }
                None => (spec.trim(), SortDirection::Asc),
            };
            if column.is_empty() {
                return Err(ParseError {
                    message: "Expected column name".to_string(),
                    pos: 0,
                });
            }
            Ok(SortRule::new(column, direction, idx as i32 + 1))
        })
        .collect()
}

/// Parses `column:START..END`; either bound may be left empty.
pub fn parse_date_range(spec: &str) -> Result<DateRangeFilter, ParseError> {
    let Some((column, range)) = spec.split_once(':') else {
        return Err(ParseError {
            message: "Expected column:START..END".to_string(),
            pos: 0,
        });
    };
    let Some((start, end)) = range.split_once("..") else {
        return Err(ParseError {
            message: "Expected '..' between dates".to_string(),
            pos: column.len() + 1,
        });
    };

    let bound = |text: &str, pos: usize| -> Result<Option<NaiveDate>, ParseError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        parse_date(text).map(Some).ok_or_else(|| ParseError {
            message: format!("Invalid date '{}'", text.trim()),
            pos,
        })
    };

    let start_date = bound(start, column.len() + 1)?;
    let end_date = bound(end, column.len() + 1 + start.len() + 2)?;

    Ok(DateRangeFilter {
        enabled: true,
        column: column.trim().to_string(),
        start_date,
        end_date,
    })
}
