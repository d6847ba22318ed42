//! Extraction of narrative, diagram and infrastructure sections from a
//! generated solution document.
//!
//! The document is plain Markdown written by the generative service. Three
//! independent scans run over it:
//!
//! - the narrative: everything before the first block marker, with the
//!   decorative wrapping the model tends to add removed
//! - diagram blocks: `#### Diagrama PlantUML: <kind>` + a ```` ```plantuml ```` fence
//! - infrastructure blocks: `#### Arquivo Terraform: <name>.tf` + a ```` ```terraform ```` fence
//!
//! Parsing never fails. Anything that does not match a grammar exactly is
//! left in the narrative (if it precedes the first marker) or ignored.

use regex::Regex;
use std::sync::LazyLock;

/// How a fenced block is introduced in the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrammar {
    /// Heading that opens the block, at the start of a line.
    pub marker: &'static str,
    /// Info string of the fence that carries the block content.
    pub fence_tag: &'static str,
}

impl BlockGrammar {
    /// Heading line for one block, as the prompts ask the model to write it.
    pub fn heading(&self, name: &str) -> String {
        format!("{} {}", self.marker, name)
    }

    /// Full block template: heading, opening fence, body, closing fence.
    pub fn template(&self, name: &str, body: &str) -> String {
        format!(
            "{}\n```{}\n{}\n```\n",
            self.heading(name),
            self.fence_tag,
            body.trim()
        )
    }
}

pub const DIAGRAM_GRAMMAR: BlockGrammar = BlockGrammar {
    marker: "#### Diagrama PlantUML:",
    fence_tag: "plantuml",
};

pub const INFRA_GRAMMAR: BlockGrammar = BlockGrammar {
    marker: "#### Arquivo Terraform:",
    fence_tag: "terraform",
};

/// Infra file names the parser accepts: one word plus `.tf`.
const INFRA_NAME_PATTERN: &str = r"\w+\.tf";

/// Leading heading the model puts above the proposal.
const PROPOSAL_HEADING: &str = "### Proposta de Solução Técnica";

/// The closed set of diagrams a solution may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    Context,
    Container,
    Component,
    Sequence,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 4] = [
        DiagramKind::Context,
        DiagramKind::Container,
        DiagramKind::Component,
        DiagramKind::Sequence,
    ];

    /// Name as it appears after the diagram marker.
    pub fn heading_name(self) -> &'static str {
        match self {
            DiagramKind::Context => "C1 Contexto",
            DiagramKind::Container => "C2 Contêineres",
            DiagramKind::Component => "C3 Componentes",
            DiagramKind::Sequence => "Sequência",
        }
    }

    /// File-name-safe tag.
    pub fn tag(self) -> String {
        normalize_kind_name(self.heading_name())
    }

    pub fn from_heading_name(name: &str) -> Option<DiagramKind> {
        DiagramKind::ALL
            .into_iter()
            .find(|kind| kind.heading_name() == name)
    }
}

/// Turn a diagram heading name into a file-name-safe tag.
///
/// `"C2 Contêineres"` becomes `"C2-Container"`; decorative suffixes such as
/// `" do Sistema"` and `"(Microsserviços)"` are dropped.
pub fn normalize_kind_name(raw: &str) -> String {
    raw.replace(" do Sistema", "")
        .replace("(Microsserviços)", "")
        .trim()
        .replace(' ', "-")
        .replace("Contêineres", "Container")
        .replace("Componentes", "Component")
        .trim_matches('-')
        .to_string()
}

/// Ordered map that keeps first-seen order and lets later values win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMap<K> {
    entries: Vec<(K, String)>,
}

impl<K> Default for SectionMap<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq> SectionMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced entry keeps its original position.
    pub fn insert(&mut self, key: K, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &K) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }
}

/// Everything extracted from one generated solution document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSections {
    pub narrative: String,
    pub diagrams: SectionMap<DiagramKind>,
    /// Keyed by literal file name, e.g. `main.tf`.
    pub infra_files: SectionMap<String>,
}

// Both patterns are built from constants in this module.
#[allow(clippy::expect_used)]
static DIAGRAM_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    let kinds = DiagramKind::ALL
        .iter()
        .map(|k| regex::escape(k.heading_name()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&block_pattern(&DIAGRAM_GRAMMAR, &kinds)).expect("diagram block regex is valid")
});

#[allow(clippy::expect_used)]
static INFRA_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&block_pattern(&INFRA_GRAMMAR, INFRA_NAME_PATTERN))
        .expect("infra block regex is valid")
});

/// Marker, name capture, opening fence line, lazy body capture, first bare
/// closing fence line.
///
/// The body may be empty. A bare fence nested inside the body closes the
/// block early; that is accepted.
fn block_pattern(grammar: &BlockGrammar, name_pattern: &str) -> String {
    format!(
        r"(?ms){} ({})\s*\n```{}[ \t\r]*\n(.*?)^```[ \t\r]*$",
        regex::escape(grammar.marker),
        name_pattern,
        regex::escape(grammar.fence_tag)
    )
}

/// Split a generated solution document into its sections.
pub fn parse(document: &str) -> ParsedSections {
    ParsedSections {
        narrative: extract_narrative(document),
        diagrams: extract_diagrams(document),
        infra_files: extract_infra_files(document),
    }
}

fn extract_diagrams(document: &str) -> SectionMap<DiagramKind> {
    let mut diagrams = SectionMap::new();
    for caps in DIAGRAM_BLOCK.captures_iter(document) {
        let (Some(name), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if let Some(kind) = DiagramKind::from_heading_name(name.as_str()) {
            diagrams.insert(kind, body.as_str().trim().to_string());
        }
    }
    diagrams
}

fn extract_infra_files(document: &str) -> SectionMap<String> {
    let mut files = SectionMap::new();
    for caps in INFRA_BLOCK.captures_iter(document) {
        let (Some(name), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        files.insert(name.as_str().to_string(), body.as_str().trim().to_string());
    }
    files
}

/// Byte offset of the first block marker that starts a line, if any.
fn first_marker_offset(document: &str) -> Option<usize> {
    [DIAGRAM_GRAMMAR.marker, INFRA_GRAMMAR.marker]
        .iter()
        .filter_map(|marker| {
            document
                .match_indices(marker)
                .map(|(idx, _)| idx)
                .find(|&idx| idx == 0 || document[..idx].ends_with('\n'))
        })
        .min()
}

fn extract_narrative(document: &str) -> String {
    let end = first_marker_offset(document).unwrap_or(document.len());
    let mut narrative = document[..end].trim();

    // Heading, then rule, then fence; each at most once and only at the start.
    if let Some(rest) = strip_heading(narrative) {
        narrative = rest;
    }
    if let Some(rest) = strip_rule(narrative) {
        narrative = rest;
    }
    if let Some(rest) = strip_fence(narrative) {
        narrative = rest;
    }
    narrative.to_string()
}

/// Drop a leading proposal heading line.
fn strip_heading(text: &str) -> Option<&str> {
    if !text.starts_with(PROPOSAL_HEADING) {
        return None;
    }
    Some(match text.find('\n') {
        Some(newline) => text[newline + 1..].trim(),
        None => "",
    })
}

/// Drop a leading horizontal rule (`---` or longer).
fn strip_rule(text: &str) -> Option<&str> {
    let (first_line, rest) = text.split_once('\n').unwrap_or((text, ""));
    let first_line = first_line.trim_end();
    if first_line.len() >= 3 && first_line.chars().all(|c| c == '-') {
        Some(rest.trim())
    } else {
        None
    }
}

/// Drop a fence that wraps the whole text: an opening ```` ```tag ```` line
/// and a closing ```` ``` ````. Both must be present.
fn strip_fence(text: &str) -> Option<&str> {
    let (first_line, rest) = text.split_once('\n')?;
    let tag = first_line.trim_end().strip_prefix("```")?;
    if !tag.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return None;
    }
    let body = rest.trim_end().strip_suffix("```")?;
    Some(body.trim())
}
