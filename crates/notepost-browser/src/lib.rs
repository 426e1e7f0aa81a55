//! Chrome DevTools Protocol collaborator for the notepost core.
//!
//! Implements [`notepost_core::Page`] and [`notepost_core::Element`] on top
//! of a raw CDP WebSocket, so the compose pipeline can drive a real browser
//! tab.
//!
//! # Architecture
//!
//! - **`cdp`**: WebSocket client with command/response correlation.
//!   Events are logged and dropped.
//! - **`page`**: [`CdpPage`] and [`CdpElement`]. Elements are remote object
//!   handles; scripts run through `Runtime.callFunctionOn`, keys through
//!   `Input.dispatchKeyEvent`, files through `DOM.setFileInputFiles`.
//! - **`discovery`**: picks a page target from the `/json/list` endpoint.
//!
//! # Chrome Setup
//!
//! Chrome must be running with a debugging port, logged in to the target
//! site and showing its publish form:
//!
//! ```sh
//! google-chrome --remote-debugging-port=9222
//! ```

pub mod cdp;
pub mod discovery;
pub mod error;
pub mod page;

pub use cdp::{CdpClient, CdpEvent};
pub use discovery::{discover_page_ws_url, select_page_target, TargetInfo};
pub use error::BrowserError;
pub use page::{CdpElement, CdpPage};
