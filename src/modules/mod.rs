pub mod backup;
pub mod cleaner;
pub mod common;
pub mod lister;
pub mod registry;
pub mod scanner;
pub mod snapshot;
pub mod uninstaller;
