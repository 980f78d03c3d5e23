//! Installation components driven by the deploy engine.
//!
//! - `enumerate` - lists descriptor files in a source directory
//! - `writer` - backup-aware copy into a target directory
//! - `autostart` - duplicates an installed descriptor into the autostart dir
//! - `assets` - deploys the static launcher bundle
//! - `prereq` - PATH lookup of the required browser binary
//! - `refresh` - best-effort desktop database refresh

pub mod assets;
pub mod autostart;
pub mod enumerate;
pub mod prereq;
pub mod refresh;
pub mod writer;

pub use assets::{deploy_assets, AssetDeployment};
pub use autostart::{register_autostart, AutostartRegistration};
pub use enumerate::{enumerate_descriptors, DescriptorFile};
pub use prereq::PrerequisiteStatus;
pub use refresh::{refresh_with, RefreshOutcome};
pub use writer::{
    install_file, install_file_with, install_file_with_mode, install_to, list_backups,
    InstallOutcome,
};
