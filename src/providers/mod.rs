//! External service providers: the vendor REST API and the panel WebSocket

pub mod vendor;
pub mod websocket;

pub use vendor::{LoginClient, VendorApi};
pub use websocket::{PanelEvent, PanelWsClient};
