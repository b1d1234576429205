use std::io::{self, Write};

use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use tracing::warn;

use crate::error::{GeoJsonEncoderError, Result};
use crate::json::{JsonSink, Token, TokenBuffer};

enum JsonFormatter {
    Compact(CompactFormatter),
    Pretty(PrettyFormatter<'static>),
}

macro_rules! delegate_formatter {
    ($($name:ident($($arg:ident: $ty:ty),*);)*) => {
        $(
            fn $name<W: ?Sized + Write>(&mut self, writer: &mut W $(, $arg: $ty)*) -> io::Result<()> {
                match self {
                    JsonFormatter::Compact(f) => f.$name(writer $(, $arg)*),
                    JsonFormatter::Pretty(f) => f.$name(writer $(, $arg)*),
                }
            }
        )*
    };
}

impl JsonFormatter {
    delegate_formatter! {
        begin_object();
        end_object();
        begin_object_key(first: bool);
        end_object_key();
        begin_object_value();
        end_object_value();
        begin_array();
        end_array();
        begin_array_value(first: bool);
        end_array_value();
        write_raw_fragment(fragment: &str);
        write_bool(value: bool);
        write_null();
    }
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Object { first: bool, expecting_value: bool },
    Array { first: bool },
}

/// A streaming JSON writer with a deferred-output capture mode.
///
/// Separators and indentation are produced by [`serde_json`]'s formatters. Structural errors
/// (a value without a field name, unbalanced containers) are reported instead of producing
/// invalid JSON.
///
/// While [buffering](JsonWriter::start_buffering) is active, every token is recorded instead of
/// written. [`flush_buffer`](JsonWriter::flush_buffer) replays the recorded tokens at the
/// current position of the live output.
pub struct JsonWriter<W: Write> {
    out: W,
    formatter: JsonFormatter,
    frames: Vec<Frame>,
    root_written: bool,
    buffer: Option<TokenBuffer>,
    buffering: bool,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self::with_formatter(out, JsonFormatter::Compact(CompactFormatter))
    }

    pub fn pretty(out: W) -> Self {
        Self::with_formatter(out, JsonFormatter::Pretty(PrettyFormatter::new()))
    }

    fn with_formatter(out: W, formatter: JsonFormatter) -> Self {
        Self {
            out,
            formatter,
            frames: Vec::new(),
            root_written: false,
            buffer: None,
            buffering: false,
        }
    }

    /// Number of currently open containers in the live output.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// `true` once a complete root value has been written to the live output.
    pub fn is_complete(&self) -> bool {
        self.root_written && self.frames.is_empty()
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    /// `true` if a buffer exists, whether or not it is still capturing.
    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    /// Redirects all following output into a new in-memory buffer.
    ///
    /// Only one buffer can exist at a time. Starting a second one is a programming error: it
    /// panics in debug builds and is ignored otherwise.
    pub fn start_buffering(&mut self) {
        if self.buffer.is_some() {
            misuse("start_buffering called while a buffer already exists");
            return;
        }
        self.buffer = Some(TokenBuffer::new());
        self.buffering = true;
    }

    /// Restores writing to the live output. The buffer keeps its content until flushed.
    pub fn stop_buffering(&mut self) {
        if !self.buffering {
            misuse("stop_buffering called without active buffering");
            return;
        }
        self.buffering = false;
    }

    /// Writes the buffered tokens at the current live position and discards the buffer.
    ///
    /// Stops buffering first if it is still active.
    pub fn flush_buffer(&mut self) -> Result<()> {
        let Some(mut buffer) = self.buffer.take() else {
            misuse("flush_buffer called without a buffer");
            return Ok(());
        };
        self.buffering = false;
        buffer.replay_into(self)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn begin_value(&mut self) -> Result<()> {
        match self.frames.last_mut() {
            Some(Frame::Array { first }) => {
                let is_first = *first;
                *first = false;
                self.formatter.begin_array_value(&mut self.out, is_first)?;
            }
            Some(Frame::Object {
                expecting_value, ..
            }) => {
                if !*expecting_value {
                    return Err(GeoJsonEncoderError::InvalidStructure(
                        "object value without field name",
                    ));
                }
            }
            None => {
                if self.root_written {
                    return Err(GeoJsonEncoderError::InvalidStructure(
                        "more than one root value",
                    ));
                }
            }
        }
        Ok(())
    }

    fn end_value(&mut self) -> Result<()> {
        match self.frames.last_mut() {
            Some(Frame::Array { .. }) => self.formatter.end_array_value(&mut self.out)?,
            Some(Frame::Object {
                expecting_value, ..
            }) => {
                *expecting_value = false;
                self.formatter.end_object_value(&mut self.out)?;
            }
            None => self.root_written = true,
        }
        Ok(())
    }

    fn write_live(&mut self, token: &Token<'_>) -> Result<()> {
        match token {
            Token::StartObject => {
                self.begin_value()?;
                self.formatter.begin_object(&mut self.out)?;
                self.frames.push(Frame::Object {
                    first: true,
                    expecting_value: false,
                });
            }
            Token::EndObject => {
                match self.frames.pop() {
                    Some(Frame::Object {
                        expecting_value: false,
                        ..
                    }) => {}
                    Some(Frame::Object { .. }) => {
                        return Err(GeoJsonEncoderError::InvalidStructure(
                            "object closed after a field name",
                        ))
                    }
                    _ => {
                        return Err(GeoJsonEncoderError::InvalidStructure(
                            "end of object without matching start",
                        ))
                    }
                }
                self.formatter.end_object(&mut self.out)?;
                self.end_value()?;
            }
            Token::StartArray => {
                self.begin_value()?;
                self.formatter.begin_array(&mut self.out)?;
                self.frames.push(Frame::Array { first: true });
            }
            Token::EndArray => {
                if !matches!(self.frames.pop(), Some(Frame::Array { .. })) {
                    return Err(GeoJsonEncoderError::InvalidStructure(
                        "end of array without matching start",
                    ));
                }
                self.formatter.end_array(&mut self.out)?;
                self.end_value()?;
            }
            Token::FieldName(name) => {
                match self.frames.last_mut() {
                    Some(Frame::Object {
                        first,
                        expecting_value,
                    }) if !*expecting_value => {
                        let is_first = *first;
                        *first = false;
                        *expecting_value = true;
                        self.formatter.begin_object_key(&mut self.out, is_first)?;
                    }
                    _ => {
                        return Err(GeoJsonEncoderError::InvalidStructure(
                            "field name outside of an object",
                        ))
                    }
                }
                serde_json::to_writer(&mut self.out, name.as_ref())?;
                self.formatter.end_object_key(&mut self.out)?;
                self.formatter.begin_object_value(&mut self.out)?;
            }
            Token::String(value) => {
                self.begin_value()?;
                serde_json::to_writer(&mut self.out, value.as_ref())?;
                self.end_value()?;
            }
            Token::Raw(value) => {
                self.begin_value()?;
                self.formatter.write_raw_fragment(&mut self.out, value)?;
                self.end_value()?;
            }
            Token::Bool(value) => {
                self.begin_value()?;
                self.formatter.write_bool(&mut self.out, *value)?;
                self.end_value()?;
            }
            Token::Null => {
                self.begin_value()?;
                self.formatter.write_null(&mut self.out)?;
                self.end_value()?;
            }
        }
        Ok(())
    }
}

impl<W: Write> JsonSink for JsonWriter<W> {
    fn write_token(&mut self, token: Token<'_>) -> Result<()> {
        if self.buffering {
            if let Some(buffer) = self.buffer.as_mut() {
                return buffer.write_token(token);
            }
        }
        self.write_live(&token)
    }
}

fn misuse(message: &'static str) {
    debug_assert!(false, "{message}");
    warn!(reason = message, "ignoring misuse of deferred output");
}
