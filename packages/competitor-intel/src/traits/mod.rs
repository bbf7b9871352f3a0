//! Trait boundaries to the external pipeline services.

pub mod crawler;
pub mod directory;
pub mod extractor;
pub mod fingerprinter;
pub mod scorer;

pub use crawler::CrawlService;
pub use directory::CompanyDirectory;
pub use extractor::{EventStream, ExtractionService};
pub use fingerprinter::Fingerprinter;
pub use scorer::PageScorer;
