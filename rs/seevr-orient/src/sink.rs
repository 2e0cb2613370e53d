use crate::Orientation;

/// A viewpoint as understood by the video renderer, in degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Viewpoint {
	pub yaw: f64,
	pub pitch: f64,
	pub roll: f64,
	pub field_of_view: f64,
}

impl Viewpoint {
	pub fn new(orientation: Orientation, field_of_view: f64) -> Self {
		Self {
			yaw: orientation.yaw,
			pitch: orientation.pitch,
			roll: orientation.roll,
			field_of_view,
		}
	}
}

/// The video player that renders the 360° surface.
///
/// The driver owns its sink; wrap it in a shared handle if the host needs it too.
pub trait VideoSink {
	/// The size of the current media in pixels, if known.
	fn media_size(&self) -> Option<(u32, u32)>;

	/// The frame rate of the current media, if known.
	fn frame_rate(&self) -> Option<f64> {
		None
	}

	/// Apply a viewpoint, returning zero on success or the renderer's error code.
	///
	/// When `absolute` is false the viewpoint is relative to the current one.
	fn update_viewpoint(&mut self, viewpoint: &Viewpoint, absolute: bool) -> i32;
}

impl<S: VideoSink + ?Sized> VideoSink for &mut S {
	fn media_size(&self) -> Option<(u32, u32)> {
		(**self).media_size()
	}

	fn frame_rate(&self) -> Option<f64> {
		(**self).frame_rate()
	}

	fn update_viewpoint(&mut self, viewpoint: &Viewpoint, absolute: bool) -> i32 {
		(**self).update_viewpoint(viewpoint, absolute)
	}
}

impl<S: VideoSink + ?Sized> VideoSink for Box<S> {
	fn media_size(&self) -> Option<(u32, u32)> {
		(**self).media_size()
	}

	fn frame_rate(&self) -> Option<f64> {
		(**self).frame_rate()
	}

	fn update_viewpoint(&mut self, viewpoint: &Viewpoint, absolute: bool) -> i32 {
		(**self).update_viewpoint(viewpoint, absolute)
	}
}
