use seevr_native::seevr_orient::{VideoSink, Viewpoint};

/// A stand-in for a video player that logs every viewpoint it is given.
pub struct LogSink {
	frame_rate: Option<f64>,
	updates: u64,
}

impl LogSink {
	pub fn new(frame_rate: Option<f64>) -> Self {
		Self { frame_rate, updates: 0 }
	}
}

impl VideoSink for LogSink {
	fn media_size(&self) -> Option<(u32, u32)> {
		None
	}

	fn frame_rate(&self) -> Option<f64> {
		self.frame_rate
	}

	fn update_viewpoint(&mut self, viewpoint: &Viewpoint, absolute: bool) -> i32 {
		self.updates += 1;
		tracing::info!(
			yaw = viewpoint.yaw,
			pitch = viewpoint.pitch,
			roll = viewpoint.roll,
			fov = viewpoint.field_of_view,
			absolute,
			update = self.updates,
			"viewpoint"
		);
		0
	}
}
