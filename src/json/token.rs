use std::borrow::Cow;
use std::ops::Range;

use crate::error::Result;
use crate::json::JsonSink;

/// A single structural JSON element.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    FieldName(Cow<'a, str>),
    String(Cow<'a, str>),
    /// A pre-encoded JSON value such as a number literal.
    Raw(Cow<'a, str>),
    Bool(bool),
    Null,
}

impl Token<'_> {
    pub fn into_owned(self) -> Token<'static> {
        match self {
            Token::StartObject => Token::StartObject,
            Token::EndObject => Token::EndObject,
            Token::StartArray => Token::StartArray,
            Token::EndArray => Token::EndArray,
            Token::FieldName(name) => Token::FieldName(Cow::Owned(name.into_owned())),
            Token::String(value) => Token::String(Cow::Owned(value.into_owned())),
            Token::Raw(value) => Token::Raw(Cow::Owned(value.into_owned())),
            Token::Bool(value) => Token::Bool(value),
            Token::Null => Token::Null,
        }
    }
}

/// A recorded token. Text is kept as a range into the buffer's shared text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Recorded {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    FieldName(Range<usize>),
    String(Range<usize>),
    Raw(Range<usize>),
    Bool(bool),
    Null,
}

/// An in-memory sequence of tokens that can be replayed into another [`JsonSink`].
///
/// Tokens are recorded without separators or indentation; those are produced by the sink the
/// buffer is replayed into, so the result is identical to writing the tokens directly at the
/// replay position. The text of all names and values is appended to one growing string, so
/// recording a number does not allocate on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBuffer {
    tokens: Vec<Recorded>,
    text: String,
}

impl TokenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Bytes of name and value text held by the buffer.
    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    /// The recorded tokens, borrowing their text from the buffer.
    pub fn tokens(&self) -> impl Iterator<Item = Token<'_>> + '_ {
        self.tokens.iter().map(|token| self.token(token))
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.text.clear();
    }

    /// Writes all recorded tokens into `sink`, leaving this buffer empty.
    pub fn replay_into<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let result = self
            .tokens
            .iter()
            .try_for_each(|token| sink.write_token(self.token(token)));
        self.clear();
        result
    }

    fn push_text(&mut self, text: &str) -> Range<usize> {
        let start = self.text.len();
        self.text.push_str(text);
        start..self.text.len()
    }

    fn text(&self, range: &Range<usize>) -> Cow<'_, str> {
        Cow::Borrowed(&self.text[range.clone()])
    }

    fn token(&self, token: &Recorded) -> Token<'_> {
        match token {
            Recorded::StartObject => Token::StartObject,
            Recorded::EndObject => Token::EndObject,
            Recorded::StartArray => Token::StartArray,
            Recorded::EndArray => Token::EndArray,
            Recorded::FieldName(range) => Token::FieldName(self.text(range)),
            Recorded::String(range) => Token::String(self.text(range)),
            Recorded::Raw(range) => Token::Raw(self.text(range)),
            Recorded::Bool(value) => Token::Bool(*value),
            Recorded::Null => Token::Null,
        }
    }
}

impl JsonSink for TokenBuffer {
    fn write_token(&mut self, token: Token<'_>) -> Result<()> {
        let recorded = match token {
            Token::StartObject => Recorded::StartObject,
            Token::EndObject => Recorded::EndObject,
            Token::StartArray => Recorded::StartArray,
            Token::EndArray => Recorded::EndArray,
            Token::FieldName(name) => Recorded::FieldName(self.push_text(&name)),
            Token::String(value) => Recorded::String(self.push_text(&value)),
            Token::Raw(value) => Recorded::Raw(self.push_text(&value)),
            Token::Bool(value) => Recorded::Bool(value),
            Token::Null => Recorded::Null,
        };
        self.tokens.push(recorded);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_owned_tokens() {
        let mut buffer = TokenBuffer::new();
        {
            let name = String::from("name");
            buffer.start_object().unwrap();
            buffer.string_field(&name, "value").unwrap();
            buffer.end_object().unwrap();
        }
        assert_eq!(
            buffer.tokens().collect::<Vec<_>>(),
            vec![
                Token::StartObject,
                Token::FieldName("name".into()),
                Token::String("value".into()),
                Token::EndObject,
            ]
        );
    }

    #[test]
    fn values_share_one_text_buffer() {
        let mut buffer = TokenBuffer::new();
        buffer.start_array().unwrap();
        for value in ["7.0", "50.0", "8.25", "51.0"] {
            buffer.raw_value(value).unwrap();
        }
        buffer.end_array().unwrap();
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.text_len(), "7.050.08.2551.0".len());

        let mut target = TokenBuffer::new();
        buffer.replay_into(&mut target).unwrap();
        assert_eq!(buffer.text_len(), 0);
        assert_eq!(
            target.tokens().nth(3),
            Some(Token::Raw(Cow::Borrowed("8.25")))
        );
    }

    #[test]
    fn replay_drains() {
        let mut source = TokenBuffer::new();
        source.start_array().unwrap();
        source.raw_value("1.5").unwrap();
        source.end_array().unwrap();

        let mut target = TokenBuffer::new();
        source.replay_into(&mut target).unwrap();
        assert!(source.is_empty());
        assert_eq!(target.len(), 3);
    }
}
