pub mod commands;
pub mod modules;

pub use modules::common::config::AppConfig;
pub use modules::common::error::UninstallerError;
pub use modules::common::utils;
pub use modules::backup;
pub use modules::cleaner;
pub use modules::lister;
pub use modules::registry;
pub use modules::scanner;
pub use modules::snapshot;
pub use modules::uninstaller;
