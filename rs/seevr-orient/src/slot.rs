use crate::RawSample;

/// Holds the newest sample and the last one handed out.
///
/// There is no queue: a later arrival overwrites an unread one, and change is detected by comparing bytes.
#[derive(Debug, Default, Clone)]
pub struct SampleSlot {
	current: Option<RawSample>,
	consumed: Option<RawSample>,
}

impl SampleSlot {
	pub fn store(&mut self, raw: RawSample) {
		self.current = Some(raw);
	}

	/// Return the current sample unless it equals the last one returned.
	pub fn take_new(&mut self) -> Option<RawSample> {
		let current = self.current?;
		if self.consumed == Some(current) {
			return None;
		}

		self.consumed = Some(current);
		Some(current)
	}

	pub fn is_fresh(&self) -> bool {
		self.current.is_some() && self.current != self.consumed
	}
}
