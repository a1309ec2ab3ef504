pub mod codec;
pub mod config;
pub mod conn;
pub mod id_types;
pub mod logging;
pub mod remote_track;
pub mod store;
pub mod track;
pub mod transport;
pub mod types;

pub use config::TransportConfig;
pub use conn::FrameConn;
pub use id_types::{ClientId, TrackId};
pub use remote_track::RemoteTrack;
pub use track::{SimpleTrack, Track, TrackEvent, TrackEventKind, TrackInfo, TrackKind};
pub use transport::{LifecycleState, MetadataTransport, TransportError};
