//! Default using `WsConnection` for native environment.
//! Also provide a `DummyConnection` for testing.

#[cfg(any(test, feature = "dummy"))]
mod dummy;
#[cfg(feature = "native-ws")]
mod native_ws;

#[cfg(any(test, feature = "dummy"))]
pub use crate::connections::dummy::DummyConnection;
#[cfg(any(test, feature = "dummy"))]
pub use crate::connections::dummy::DummyConnector;
#[cfg(any(test, feature = "dummy"))]
pub use crate::connections::dummy::DummyDelivery;
#[cfg(feature = "native-ws")]
pub use crate::connections::native_ws::WsConnection;
#[cfg(feature = "native-ws")]
pub use crate::connections::native_ws::WsConnector;
