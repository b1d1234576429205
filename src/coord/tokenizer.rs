use crate::error::{GeoJsonEncoderError, Result};

/// The axis a coordinate value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// One complete value produced by the [`CoordinateTokenizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateValue<'a> {
    pub axis: Axis,
    pub text: &'a str,
    /// `true` if this value completes a tuple.
    pub ends_tuple: bool,
}

#[inline]
fn is_separator(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b',')
}

/// Splits whitespace or comma separated coordinate text into values.
///
/// Text may arrive in arbitrary chunks. A value is only complete once a separator follows it, so
/// the tail of a chunk is carried over and completed by the next chunk, or by
/// [`finish`](CoordinateTokenizer::finish) at the end of the block.
#[derive(Debug, Clone)]
pub struct CoordinateTokenizer {
    dimension: usize,
    /// Position of the next value within its tuple.
    position: usize,
    carry: String,
    values: u64,
}

impl CoordinateTokenizer {
    /// Creates a tokenizer for tuples of `dimension` values. Only 2 and 3 are meaningful; other
    /// values are clamped.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.clamp(2, 3),
            position: 0,
            carry: String::new(),
            values: 0,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of complete values produced so far.
    pub fn values(&self) -> u64 {
        self.values
    }

    /// `true` if a value is pending across a chunk boundary.
    pub fn has_carry(&self) -> bool {
        !self.carry.is_empty()
    }

    /// Feeds one chunk, calling `on_value` for every value completed by it.
    pub fn tokenize<F>(&mut self, chunk: &str, mut on_value: F) -> Result<()>
    where
        F: FnMut(CoordinateValue<'_>) -> Result<()>,
    {
        let mut start: Option<usize> = None;
        for (idx, byte) in chunk.bytes().enumerate() {
            if is_separator(byte) {
                if let Some(value_start) = start.take() {
                    if self.carry.is_empty() {
                        self.emit(&chunk[value_start..idx], &mut on_value)?;
                    } else {
                        self.carry.push_str(&chunk[value_start..idx]);
                        self.emit_carry(&mut on_value)?;
                    }
                } else if !self.carry.is_empty() {
                    self.emit_carry(&mut on_value)?;
                }
            } else if start.is_none() {
                start = Some(idx);
            }
        }

        if let Some(value_start) = start {
            self.carry.push_str(&chunk[value_start..]);
        }
        Ok(())
    }

    /// Completes a trailing value without separator and checks that the last tuple is complete.
    ///
    /// The tokenizer is ready for the next block afterwards.
    pub fn finish<F>(&mut self, mut on_value: F) -> Result<()>
    where
        F: FnMut(CoordinateValue<'_>) -> Result<()>,
    {
        if !self.carry.is_empty() {
            self.emit_carry(&mut on_value)?;
        }
        if self.position != 0 {
            self.position = 0;
            return Err(GeoJsonEncoderError::MalformedCoordinate {
                token: format!("incomplete tuple of dimension {}", self.dimension),
            });
        }
        Ok(())
    }

    fn emit<F>(&mut self, text: &str, on_value: &mut F) -> Result<()>
    where
        F: FnMut(CoordinateValue<'_>) -> Result<()>,
    {
        let axis = match self.position {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        };
        self.position += 1;
        let ends_tuple = self.position == self.dimension;
        if ends_tuple {
            self.position = 0;
        }
        self.values += 1;
        on_value(CoordinateValue {
            axis,
            text,
            ends_tuple,
        })
    }

    fn emit_carry<F>(&mut self, on_value: &mut F) -> Result<()>
    where
        F: FnMut(CoordinateValue<'_>) -> Result<()>,
    {
        let mut carry = std::mem::take(&mut self.carry);
        let result = self.emit(&carry, on_value);
        carry.clear();
        self.carry = carry;
        result
    }
}
