pub mod entry;
pub mod section;
pub mod writer;

pub use entry::{synthesize, ConfigEntry, SynthesisOptions};
pub use section::{AccountBlock, MergedSection, SECTION_END, SECTION_START};
pub use writer::{apply, backup_path, ApplyReport};
