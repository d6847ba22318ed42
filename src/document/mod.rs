//! Generated-document handling: section extraction and artifact routing.

pub mod parser;
pub mod router;

pub use parser::{
    BlockGrammar, DIAGRAM_GRAMMAR, DiagramKind, INFRA_GRAMMAR, ParsedSections, SectionMap, parse,
};
pub use router::{InfraLayout, OutputRouter, WriteFailure, WriteGroup, WriteReport};
