mod error;
mod pin;
mod reader;
mod writer;

pub use error::{ManifestError, Result};
pub use pin::{PinGuard, PinLedger, pin_document, with_pin};
pub use reader::{has_inherited_version, read_document, read_version, read_workspace_version};
pub use writer::{verify_version, write_version};
