//! Structured JSON output.
//!
//! [`JsonWriter`] is the live sink every writer stage writes to. [`TokenBuffer`] captures the
//! same calls as [`Token`]s so they can be replayed later at another position in the output.

pub use token::{Token, TokenBuffer};
pub use writer::JsonWriter;

mod token;
mod writer;

use std::borrow::Cow;

use crate::error::Result;

/// The primitive operations of a structured JSON writer.
///
/// Only [`write_token`][JsonSink::write_token] is required; the other methods build the token
/// without allocating.
pub trait JsonSink {
    fn write_token(&mut self, token: Token<'_>) -> Result<()>;

    fn start_object(&mut self) -> Result<()> {
        self.write_token(Token::StartObject)
    }

    fn end_object(&mut self) -> Result<()> {
        self.write_token(Token::EndObject)
    }

    fn start_array(&mut self) -> Result<()> {
        self.write_token(Token::StartArray)
    }

    fn end_array(&mut self) -> Result<()> {
        self.write_token(Token::EndArray)
    }

    fn field_name(&mut self, name: &str) -> Result<()> {
        self.write_token(Token::FieldName(Cow::Borrowed(name)))
    }

    fn string_value(&mut self, value: &str) -> Result<()> {
        self.write_token(Token::String(Cow::Borrowed(value)))
    }

    /// Writes `value` verbatim. The caller guarantees it is a valid JSON value.
    fn raw_value(&mut self, value: &str) -> Result<()> {
        self.write_token(Token::Raw(Cow::Borrowed(value)))
    }

    fn bool_value(&mut self, value: bool) -> Result<()> {
        self.write_token(Token::Bool(value))
    }

    fn null_value(&mut self) -> Result<()> {
        self.write_token(Token::Null)
    }

    fn string_field(&mut self, name: &str, value: &str) -> Result<()> {
        self.field_name(name)?;
        self.string_value(value)
    }

    fn raw_field(&mut self, name: &str, value: &str) -> Result<()> {
        self.field_name(name)?;
        self.raw_value(value)
    }

    fn null_field(&mut self, name: &str) -> Result<()> {
        self.field_name(name)?;
        self.null_value()
    }
}
