//! Module references, resolver capabilities and source-file grouping.

mod grouping;
mod reference;
mod resolver;

pub use grouping::{Cancelled, ModuleEdge, SourceFileGrouping};
pub use reference::{
    ArtifactVersion, ModuleReference, ReferenceFailure, ResolutionError, ResolutionStatus,
};
pub use resolver::{
    CachingResolver, FileSystemResolver, InMemoryWorkspace, ModuleResolver, ResolvedFile,
    SourceTextProvider,
};
