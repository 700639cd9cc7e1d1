pub mod surface;
pub mod surfaces;
pub mod oplog;
pub mod render;

pub use oplog::{OpCode, OpLogError, OpRow, RecordSurface, ReplayStats, play_file, replay, replay_with_delay};
pub use render::render_elements;
pub use surface::{DrawCall, DrawSurface, SurfaceError};
pub use surfaces::{CallLog, ConsoleSurface, NullSurface, SimSurface};
