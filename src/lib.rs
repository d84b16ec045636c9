pub mod config;
pub mod discovery;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod session;

pub use config::{Credentials, PortalConfig, PortalConfigBuilder};
pub use discovery::Problem;
pub use downloader::{run, RunReport};
pub use error::{Error, Result};
pub use session::{Namespace, Session};
