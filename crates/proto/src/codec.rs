use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::{LogRecord, MalformedMessage};

/// Largest frame accepted from a peer unless configured otherwise.
pub const DEFAULT_MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// Length-prefixed JSON framing for [`LogRecord`]s.
///
/// Decoding yields `Err(MalformedMessage)` as an item rather than a stream error so a bad payload
/// never tears down the connection. Only framing problems (eg. an oversized length) are `io::Error`s.
#[derive(Debug)]
pub struct LogRecordCodec {
	inner: LengthDelimitedCodec,
}

impl LogRecordCodec {
	pub fn new(max_frame_len: usize) -> Self {
		Self {
			inner: LengthDelimitedCodec::builder()
				.length_field_length(4)
				.little_endian()
				.max_frame_length(max_frame_len)
				.new_codec(),
		}
	}
}

impl Default for LogRecordCodec {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_FRAME_LEN)
	}
}

impl Decoder for LogRecordCodec {
	type Item = Result<LogRecord, MalformedMessage>;
	type Error = io::Error;

	fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
		Ok(self
			.inner
			.decode(src)?
			.map(|frame| LogRecord::from_json(&frame)))
	}
}

impl Encoder<LogRecord> for LogRecordCodec {
	type Error = io::Error;

	fn encode(&mut self, record: LogRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
		let payload = record.to_json().map_err(io::Error::other)?;
		self.inner.encode(Bytes::from(payload), dst)
	}
}
