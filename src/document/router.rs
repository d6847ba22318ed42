//! Writes parsed solution sections to disk under the run's naming context.

use crate::document::parser::ParsedSections;
use crate::error::{Result, VoxarchError};
use crate::persist;
use crate::request::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where infrastructure files go relative to the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfraLayout {
    /// `Terraform (<platform>) <base>/<file>.tf`
    #[default]
    Platform,
    /// `<file>.tf` directly in the output directory.
    Flat,
}

pub fn analysis_file_name(base: &str) -> String {
    format!("GEM - Analise {base}.txt")
}

pub fn solution_file_name(platform: Option<Platform>, base: &str) -> String {
    match platform {
        Some(platform) => format!("GEM - Solucao Tecnica ({platform}) {base}.txt"),
        None => format!("GEM - Solucao Tecnica {base}.txt"),
    }
}

pub fn diagram_file_name(tag: &str, base: &str) -> String {
    format!("PlantUML - {tag} ({base}).puml")
}

pub fn infra_dir_name(platform: Option<Platform>, base: &str) -> String {
    match platform {
        Some(platform) => format!("Terraform ({platform}) {base}"),
        None => format!("Terraform {base}"),
    }
}

/// Independent write groups. A failure stops the rest of its own group only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGroup {
    Narrative,
    Diagrams,
    Infra,
}

impl fmt::Display for WriteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteGroup::Narrative => f.write_str("narrative"),
            WriteGroup::Diagrams => f.write_str("diagrams"),
            WriteGroup::Infra => f.write_str("infrastructure"),
        }
    }
}

#[derive(Debug)]
pub struct WriteFailure {
    pub group: WriteGroup,
    pub path: PathBuf,
    pub error: VoxarchError,
}

/// Outcome of routing one document.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Written paths, or the first failure's error.
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure.error),
            None => Ok(self.written),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputRouter {
    layout: InfraLayout,
}

impl OutputRouter {
    pub fn new(layout: InfraLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> InfraLayout {
        self.layout
    }

    /// Directory that receives infrastructure files.
    pub fn infra_dir(&self, output_dir: &Path, base: &str, platform: Option<Platform>) -> PathBuf {
        match self.layout {
            InfraLayout::Platform => output_dir.join(infra_dir_name(platform, base)),
            InfraLayout::Flat => output_dir.to_path_buf(),
        }
    }

    /// Write narrative, then diagrams, then infra files, each group in
    /// discovery order. Files already written stay on disk.
    pub fn write(
        &self,
        sections: &ParsedSections,
        output_dir: &Path,
        base: &str,
        platform: Option<Platform>,
    ) -> WriteReport {
        let mut report = WriteReport::default();

        let narrative_path = output_dir.join(solution_file_name(platform, base));
        write_group(
            &mut report,
            WriteGroup::Narrative,
            [(narrative_path, sections.narrative.as_str())],
        );

        write_group(
            &mut report,
            WriteGroup::Diagrams,
            sections.diagrams.iter().map(|(kind, source)| {
                (output_dir.join(diagram_file_name(&kind.tag(), base)), source)
            }),
        );

        let infra_dir = self.infra_dir(output_dir, base, platform);
        write_group(
            &mut report,
            WriteGroup::Infra,
            sections
                .infra_files
                .iter()
                .map(|(name, content)| (infra_dir.join(name), content)),
        );

        report
    }
}

fn write_group<'a>(
    report: &mut WriteReport,
    group: WriteGroup,
    files: impl IntoIterator<Item = (PathBuf, &'a str)>,
) {
    for (path, content) in files {
        match persist::write_text(&path, content) {
            Ok(()) => {
                tracing::info!(group = %group, path = %path.display(), "saved");
                report.written.push(path);
            }
            Err(error) => {
                tracing::error!(group = %group, path = %path.display(), "{error}");
                report.failures.push(WriteFailure { group, path, error });
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parser::{DiagramKind, parse};
    use std::fs;
    use tempfile::TempDir;

    fn sections() -> ParsedSections {
        let mut sections = ParsedSections {
            narrative: "Proposta\n  com espaços  \n".to_string(),
            ..Default::default()
        };
        sections
            .diagrams
            .insert(DiagramKind::Context, "@startuml\nA\n@enduml".to_string());
        sections
            .diagrams
            .insert(DiagramKind::Container, "@startuml\nB\n@enduml".to_string());
        sections
            .infra_files
            .insert("main.tf".to_string(), "resource \"x\" \"y\" {}".to_string());
        sections
    }

    #[test]
    fn test_file_names() {
        assert_eq!(analysis_file_name("reuniao"), "GEM - Analise reuniao.txt");
        assert_eq!(
            solution_file_name(Some(Platform::Aws), "reuniao"),
            "GEM - Solucao Tecnica (AWS) reuniao.txt"
        );
        assert_eq!(
            diagram_file_name("C2-Container", "reuniao"),
            "PlantUML - C2-Container (reuniao).puml"
        );
        assert_eq!(
            infra_dir_name(Some(Platform::Gcp), "reuniao"),
            "Terraform (GCP) reuniao"
        );
    }

    #[test]
    fn test_write_round_trips_content_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let sections = sections();
        let router = OutputRouter::default();

        let report = router.write(&sections, dir.path(), "call", Some(Platform::Gcp));
        assert!(report.is_complete());
        assert_eq!(report.written.len(), 4);

        let narrative = fs::read(dir.path().join("GEM - Solucao Tecnica (GCP) call.txt")).unwrap();
        assert_eq!(narrative, sections.narrative.as_bytes());

        let context = fs::read_to_string(dir.path().join("PlantUML - C1-Contexto (call).puml")).unwrap();
        assert_eq!(context, "@startuml\nA\n@enduml");

        let main_tf = fs::read_to_string(
            dir.path().join("Terraform (GCP) call").join("main.tf"),
        )
        .unwrap();
        assert_eq!(main_tf, "resource \"x\" \"y\" {}");
    }

    #[test]
    fn test_write_order_is_narrative_diagrams_infra() {
        let dir = TempDir::new().unwrap();
        let report = OutputRouter::default().write(&sections(), dir.path(), "b", Some(Platform::Azure));

        let names: Vec<String> = report
            .written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "GEM - Solucao Tecnica (Azure) b.txt",
                "PlantUML - C1-Contexto (b).puml",
                "PlantUML - C2-Container (b).puml",
                "main.tf",
            ]
        );
    }

    #[test]
    fn test_flat_layout_puts_infra_in_output_dir() {
        let dir = TempDir::new().unwrap();
        let router = OutputRouter::new(InfraLayout::Flat);
        let report = router.write(&sections(), dir.path(), "b", Some(Platform::Aws));

        assert!(report.is_complete());
        assert!(dir.path().join("main.tf").exists());
    }

    #[test]
    fn test_creates_missing_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("new").join("dir");
        let report = OutputRouter::default().write(&sections(), &nested, "b", Some(Platform::Aws));
        assert!(report.is_complete());
        assert!(nested.join("GEM - Solucao Tecnica (AWS) b.txt").exists());
    }

    #[test]
    fn test_empty_maps_write_only_narrative() {
        let dir = TempDir::new().unwrap();
        let report = OutputRouter::default().write(&parse("only prose"), dir.path(), "b", Some(Platform::Gcp));
        assert_eq!(report.written.len(), 1);
        assert!(!dir.path().join("Terraform (GCP) b").exists());
    }

    #[test]
    fn test_infra_failure_does_not_stop_other_groups() {
        let dir = TempDir::new().unwrap();
        // A file squatting on the infra directory name makes that group fail
        fs::write(dir.path().join("Terraform (AWS) b"), "blocker").unwrap();

        let report = OutputRouter::default().write(&sections(), dir.path(), "b", Some(Platform::Aws));

        assert_eq!(report.written.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].group, WriteGroup::Infra);
        assert!(dir.path().join("PlantUML - C2-Container (b).puml").exists());

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, VoxarchError::WriteFailed { .. }));
    }

    #[test]
    fn test_failure_aborts_rest_of_its_group() {
        let dir = TempDir::new().unwrap();
        // Directory squatting on the first diagram's file name
        fs::create_dir(dir.path().join("PlantUML - C1-Contexto (b).puml")).unwrap();

        let report = OutputRouter::default().write(&sections(), dir.path(), "b", Some(Platform::Aws));

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].group, WriteGroup::Diagrams);
        assert!(!dir.path().join("PlantUML - C2-Container (b).puml").exists());
        assert!(dir.path().join("Terraform (AWS) b").join("main.tf").exists());
    }
}
