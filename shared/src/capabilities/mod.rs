pub mod camera;
pub mod flow;
pub mod http;
pub mod store;
pub mod timer;

pub use self::camera::{
    Camera, CameraError, CameraOperation, CameraOutput, CameraResult, MediaConstraints, RawFrame,
    StreamHandle, StreamId, TrackId,
};
pub use self::flow::{Flow, FlowError, FlowOperation, FlowReply, FlowRequest, FlowResult};
pub use self::http::{Http, HttpResult, UrlError, ValidatedUrl};
pub use self::store::{Store, StoreError, StoreOperation, StoreResult};
pub use self::timer::{Timer, TimerId, TimerOperation, TimerOutput};

// Crux's built-in Render covers view refreshes.
pub use crux_core::render::Render;

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
#[effect(app = "crate::app::App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub store: Store<Event>,
    pub camera: Camera<Event>,
    pub flow: Flow<Event>,
    pub http: Http<Event>,
    pub timer: Timer<Event>,
}
