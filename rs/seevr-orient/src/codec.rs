use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Error, Result};

const F64_SIZE: usize = std::mem::size_of::<f64>();

/// The size of an orientation message on the wire: `[yaw, pitch, roll]` as little-endian doubles.
pub const SAMPLE_SIZE: usize = 3 * F64_SIZE;

/// Decode a buffer as consecutive little-endian doubles, in arrival order.
///
/// The buffer boundary is the message boundary, so the length must be a multiple of 8.
pub fn decode_f64s(mut buf: &[u8]) -> Result<Vec<f64>> {
	let trailing = buf.len() % F64_SIZE;
	if trailing != 0 {
		return Err(Error::Decode(trailing));
	}

	let mut values = Vec::with_capacity(buf.len() / F64_SIZE);
	while buf.has_remaining() {
		values.push(buf.get_f64_le());
	}

	Ok(values)
}

/// A head orientation in degrees.
///
/// The values are signed and unbounded; nothing wraps or clamps them.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Orientation {
	pub yaw: f64,
	pub pitch: f64,
	pub roll: f64,
}

impl Orientation {
	pub const fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
		Self { yaw, pitch, roll }
	}

	/// Encode as a single orientation message.
	pub fn encode(&self) -> Bytes {
		let mut buf = BytesMut::with_capacity(SAMPLE_SIZE);
		buf.put_f64_le(self.yaw);
		buf.put_f64_le(self.pitch);
		buf.put_f64_le(self.roll);
		buf.freeze()
	}

	/// Negate every axis, for trackers mounted the other way around.
	pub fn inverted(self) -> Self {
		Self::new(-self.yaw, -self.pitch, -self.roll)
	}
}

impl From<[f64; 3]> for Orientation {
	fn from([yaw, pitch, roll]: [f64; 3]) -> Self {
		Self::new(yaw, pitch, roll)
	}
}

/// The validated bytes of one orientation message.
///
/// Samples are compared by these bytes, not by the decoded values, so `-0.0` and `0.0` differ
/// and a NaN equals itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawSample([u8; SAMPLE_SIZE]);

impl RawSample {
	pub fn decode(&self) -> Orientation {
		let mut buf = &self.0[..];
		let yaw = buf.get_f64_le();
		let pitch = buf.get_f64_le();
		let roll = buf.get_f64_le();
		Orientation { yaw, pitch, roll }
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl TryFrom<&[u8]> for RawSample {
	type Error = Error;

	fn try_from(buf: &[u8]) -> Result<Self> {
		let bytes = <[u8; SAMPLE_SIZE]>::try_from(buf).map_err(|_| Error::WrongSize(buf.len()))?;
		Ok(Self(bytes))
	}
}

impl From<Orientation> for RawSample {
	fn from(orientation: Orientation) -> Self {
		let mut bytes = [0u8; SAMPLE_SIZE];
		let mut buf = &mut bytes[..];
		buf.put_f64_le(orientation.yaw);
		buf.put_f64_le(orientation.pitch);
		buf.put_f64_le(orientation.roll);
		Self(bytes)
	}
}
