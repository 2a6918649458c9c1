//! Report writer: markdown artifacts for analysis results.
//!
//! Each agent's result becomes `<agent_name>.md` in the project's results
//! directory, with one `##` subsection per section in definition order.
//! Headings inside an answer are pushed two levels down so they nest under
//! their section. Reports can be converted to a sibling `<agent_name>.docx`.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use docx_rs::{
    AbstractNumbering, BreakType, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat,
    Numbering, NumberingId, Paragraph, Run, Start, Style, StyleType,
};
use markdown::mdast::Node;
use tracing::{debug, info};

use super::agent::AnalysisResult;
use crate::error::{PersistenceError, PersistenceResult};

/// Extension of written reports.
pub const REPORT_EXTENSION: &str = "md";

/// Extension of converted reports.
pub const CONVERTED_EXTENSION: &str = "docx";

/// Added in front of every heading line of a section answer.
const NESTED_HEADING_PREFIX: &str = "##";

/// Heading font sizes in half-points, for `Heading1` through `Heading6`.
const HEADING_SIZES: [usize; 6] = [40, 32, 28, 26, 24, 22];

const BULLET_NUMBERING: usize = 1;

/// A report read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReport {
    pub title: String,
    pub sections: Vec<(String, String)>,
}

/// Turn a section key into a header: underscores become spaces and each
/// word is capitalized (`"exec_summary"` -> `"Exec Summary"`).
pub fn humanize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;

    for c in name.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}

/// Fence character of a code fence line (three or more backticks or tildes).
fn fence_marker(line: &str) -> Option<char> {
    let trimmed = line.trim_start();
    ['`', '~']
        .into_iter()
        .find(|&c| trimmed.starts_with(&c.to_string().repeat(3)))
}

/// Tracks whether a line sits inside a fenced code block.
#[derive(Default)]
struct FenceState {
    open: Option<char>,
}

impl FenceState {
    /// Feed one line; returns true if the line is code (fence lines included).
    fn is_code(&mut self, line: &str) -> bool {
        match (self.open, fence_marker(line)) {
            (None, Some(marker)) => {
                self.open = Some(marker);
                true
            }
            (Some(open), Some(marker)) if open == marker => {
                self.open = None;
                true
            }
            (open, _) => open.is_some(),
        }
    }
}

/// Push every heading line of an answer two levels down.
///
/// Lines inside fenced code are left alone. An unterminated fence is closed
/// so it cannot swallow the following sections.
fn nest_headings(answer: &str) -> String {
    let mut fence = FenceState::default();
    let mut lines: Vec<String> = Vec::new();

    for line in answer.lines() {
        if !fence.is_code(line) && line.starts_with('#') {
            lines.push(format!("{}{}", NESTED_HEADING_PREFIX, line));
        } else {
            lines.push(line.to_string());
        }
    }
    if let Some(marker) = fence.open {
        lines.push(marker.to_string().repeat(3));
    }

    lines.join("\n")
}

/// Render an agent's result as markdown.
pub fn render_markdown(agent_name: &str, result: &AnalysisResult) -> String {
    let mut doc = format!("# {} Analysis\n\n", agent_name);
    for (section, answer) in result.iter() {
        doc.push_str(&format!("## {}\n\n", humanize(section)));
        doc.push_str(&nest_headings(answer));
        doc.push_str("\n\n");
    }
    doc
}

/// Path of an agent's report inside `output_dir`.
pub fn report_path(agent_name: &str, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}.{}", agent_name, REPORT_EXTENSION))
}

/// Write an agent's report, creating `output_dir` if needed and replacing
/// any existing report of the same name.
pub async fn write_report(
    agent_name: &str,
    result: &AnalysisResult,
    output_dir: &Path,
) -> PersistenceResult<PathBuf> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| PersistenceError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let path = report_path(agent_name, output_dir);
    tokio::fs::write(&path, render_markdown(agent_name, result))
        .await
        .map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;

    info!(agent = %agent_name, path = %path.display(), "Report written");
    Ok(path)
}

/// Block-level content carried into a Word document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReportBlock {
    Heading { level: u8, text: String },
    Paragraph(String),
    /// `list` numbers the lists of a document so each ordered list restarts at 1.
    ListItem {
        ordered: bool,
        list: usize,
        text: String,
    },
}

fn report_blocks(text: &str, path: &Path) -> PersistenceResult<Vec<ReportBlock>> {
    let tree = markdown::to_mdast(text, &markdown::ParseOptions::default()).map_err(|e| {
        PersistenceError::Conversion {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let mut blocks = Vec::new();
    let mut lists = 0;
    collect_blocks(&tree, &mut blocks, &mut lists);
    Ok(blocks)
}

fn collect_blocks(node: &Node, blocks: &mut Vec<ReportBlock>, lists: &mut usize) {
    match node {
        Node::Heading(heading) => blocks.push(ReportBlock::Heading {
            level: heading.depth,
            text: node.to_string(),
        }),
        Node::List(list) => {
            *lists += 1;
            let id = *lists;
            for item in &list.children {
                let Node::ListItem(item) = item else {
                    continue;
                };
                let text = item
                    .children
                    .iter()
                    .filter(|child| !matches!(child, Node::List(_)))
                    .map(Node::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                blocks.push(ReportBlock::ListItem {
                    ordered: list.ordered,
                    list: id,
                    text,
                });
                for nested in item.children.iter().filter(|c| matches!(c, Node::List(_))) {
                    collect_blocks(nested, blocks, lists);
                }
            }
        }
        Node::Table(table) => {
            for row in &table.children {
                let cells = row
                    .children()
                    .map(|cells| cells.iter().map(Node::to_string).collect::<Vec<_>>())
                    .unwrap_or_default();
                blocks.push(ReportBlock::Paragraph(cells.join(" | ")));
            }
        }
        Node::Root(_) | Node::Blockquote(_) => {
            for child in node.children().into_iter().flatten() {
                collect_blocks(child, blocks, lists);
            }
        }
        other => {
            let text = other.to_string();
            if !text.trim().is_empty() {
                blocks.push(ReportBlock::Paragraph(text));
            }
        }
    }
}

fn text_run(text: &str) -> Run {
    let mut run = Run::new();
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    run
}

fn build_docx(blocks: &[ReportBlock]) -> Docx {
    let mut docx = Docx::new();
    for (i, size) in HEADING_SIZES.iter().enumerate() {
        docx = docx.add_style(
            Style::new(format!("Heading{}", i + 1), StyleType::Paragraph)
                .name(format!("Heading {}", i + 1))
                .size(*size)
                .bold(),
        );
    }
    docx = docx
        .add_abstract_numbering(AbstractNumbering::new(BULLET_NUMBERING).add_level(Level::new(
            0,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("\u{2022}"),
            LevelJc::new("left"),
        )))
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING));

    let mut numbered: HashSet<usize> = HashSet::new();
    for block in blocks {
        let paragraph = match block {
            ReportBlock::Heading { level, text } => {
                let level = (*level).clamp(1, HEADING_SIZES.len() as u8);
                Paragraph::new()
                    .add_run(text_run(text))
                    .style(&format!("Heading{}", level))
            }
            ReportBlock::Paragraph(text) => Paragraph::new().add_run(text_run(text)),
            ReportBlock::ListItem {
                ordered: false,
                text,
                ..
            } => Paragraph::new()
                .add_run(text_run(text))
                .numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0)),
            ReportBlock::ListItem {
                ordered: true,
                list,
                text,
            } => {
                // one numbering definition per ordered list
                let id = BULLET_NUMBERING + list;
                if numbered.insert(id) {
                    docx = docx
                        .add_abstract_numbering(AbstractNumbering::new(id).add_level(Level::new(
                            0,
                            Start::new(1),
                            NumberFormat::new("decimal"),
                            LevelText::new("%1."),
                            LevelJc::new("left"),
                        )))
                        .add_numbering(Numbering::new(id, id));
                }
                Paragraph::new()
                    .add_run(text_run(text))
                    .numbering(NumberingId::new(id), IndentLevel::new(0))
            }
        };
        docx = docx.add_paragraph(paragraph);
    }

    docx
}

/// Convert a markdown report to a Word document next to it.
///
/// Headings keep their level; paragraphs, bullet lists and numbered lists
/// become the matching Word paragraphs.
pub async fn convert_report(markdown_path: &Path) -> PersistenceResult<PathBuf> {
    let content = tokio::fs::read_to_string(markdown_path)
        .await
        .map_err(|source| PersistenceError::Io {
            path: markdown_path.to_path_buf(),
            source,
        })?;

    let blocks = report_blocks(&content, markdown_path)?;
    if blocks.is_empty() {
        return Err(PersistenceError::Conversion {
            path: markdown_path.to_path_buf(),
            message: "report has no content".to_string(),
        });
    }

    let mut buffer = Cursor::new(Vec::new());
    build_docx(&blocks)
        .build()
        .pack(&mut buffer)
        .map_err(|e| PersistenceError::Conversion {
            path: markdown_path.to_path_buf(),
            message: e.to_string(),
        })?;

    let target = markdown_path.with_extension(CONVERTED_EXTENSION);
    tokio::fs::write(&target, buffer.into_inner())
        .await
        .map_err(|source| PersistenceError::Io {
            path: target.clone(),
            source,
        })?;

    debug!(
        source = %markdown_path.display(),
        target = %target.display(),
        blocks = blocks.len(),
        "Report converted"
    );
    Ok(target)
}

/// Read a rendered report back into its title and sections.
///
/// Headers come back humanized and bodies are trimmed. Nested headings are
/// lifted back to the level they had in the answer.
pub fn parse_report(text: &str) -> ParsedReport {
    let mut title = String::new();
    let mut sections: Vec<(String, String)> = Vec::new();
    let mut body: Vec<&str> = Vec::new();
    let mut fence = FenceState::default();

    for line in text.lines() {
        if sections.is_empty() {
            if let Some(heading) = line.strip_prefix("## ") {
                sections.push((heading.trim().to_string(), String::new()));
            } else if let Some(heading) = line.strip_prefix("# ") {
                title = heading.trim().to_string();
            }
            continue;
        }

        if fence.is_code(line) {
            body.push(line);
        } else if let Some(heading) = line.strip_prefix("## ") {
            if let Some(last) = sections.last_mut() {
                last.1 = body.join("\n").trim().to_string();
            }
            body.clear();
            sections.push((heading.trim().to_string(), String::new()));
        } else if line.starts_with("###") {
            body.push(&line[NESTED_HEADING_PREFIX.len()..]);
        } else {
            body.push(line);
        }
    }
    if let Some(last) = sections.last_mut() {
        last.1 = body.join("\n").trim().to_string();
    }

    ParsedReport { title, sections }
}

/// Remove every regular file in a results directory.
///
/// A missing directory is not an error. Returns the number of files removed.
pub async fn clear_results(dir: &Path) -> PersistenceResult<usize> {
    let io_error = |source| PersistenceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(io_error(e)),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let file_type = entry.file_type().await.map_err(io_error)?;
        if file_type.is_file() {
            let path = entry.path();
            tokio::fs::remove_file(&path)
                .await
                .map_err(|source| PersistenceError::Io { path, source })?;
            removed += 1;
        }
    }

    debug!(dir = %dir.display(), removed, "Results cleared");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> AnalysisResult {
        let mut result = AnalysisResult::new();
        result.push("exec_summary", "Company X sells solar panels.");
        result.push("market_potential", "Large and growing.\n\n- 8/10");
        result
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("exec_summary"), "Exec Summary");
        assert_eq!(humanize("tech_overview"), "Tech Overview");
        assert_eq!(humanize("TEAM_background"), "Team Background");
        assert_eq!(humanize("3d_models"), "3D Models");
    }

    #[test]
    fn test_render_markdown_layout() {
        let expected = "# Screening Analysis\n\n\
                        ## Exec Summary\n\nCompany X sells solar panels.\n\n\
                        ## Market Potential\n\nLarge and growing.\n\n- 8/10\n\n";
        assert_eq!(render_markdown("Screening", &sample()), expected);
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(
            render_markdown("Screening", &sample()),
            render_markdown("Screening", &sample())
        );
    }

    #[test]
    fn test_answer_headings_nest_under_section() {
        let mut result = AnalysisResult::new();
        result.push("financial_summary", "Overview.\n\n## Key Metrics\n\n- ARR $3M");
        result.push("revenue_model", "Subscription.");

        let text = render_markdown("Financial Review", &result);
        assert!(text.contains("\n#### Key Metrics\n"));

        let parsed = parse_report(&text);
        assert_eq!(
            parsed.sections,
            vec![
                (
                    "Financial Summary".to_string(),
                    "Overview.\n\n## Key Metrics\n\n- ARR $3M".to_string()
                ),
                ("Revenue Model".to_string(), "Subscription.".to_string()),
            ]
        );
    }

    #[test]
    fn test_fenced_code_is_left_alone() {
        let answer = "Config:\n\n```\n## not a heading\n# comment\n```";
        let mut result = AnalysisResult::new();
        result.push("tech_overview", answer);
        result.push("risks", "# Big one\n\nDilution.");

        let text = render_markdown("Tech", &result);
        assert!(text.contains("\n## not a heading\n"));
        assert!(text.contains("\n### Big one\n"));

        let parsed = parse_report(&text);
        assert_eq!(parsed.sections.len(), 2);
        assert_eq!(parsed.sections[0].1, answer);
        assert_eq!(parsed.sections[1].1, "# Big one\n\nDilution.");
    }

    #[test]
    fn test_unterminated_fence_is_closed() {
        let mut result = AnalysisResult::new();
        result.push("tech_overview", "```rust\nfn main() {}");
        result.push("risks", "None.");

        let parsed = parse_report(&render_markdown("Tech", &result));
        assert_eq!(parsed.sections.len(), 2);
        assert_eq!(parsed.sections[0].1, "```rust\nfn main() {}\n```");
        assert_eq!(parsed.sections[1].1, "None.");
    }

    #[test]
    fn test_parse_report_round_trip() {
        let parsed = parse_report(&render_markdown("Screening", &sample()));
        assert_eq!(parsed.title, "Screening Analysis");
        assert_eq!(
            parsed.sections,
            vec![
                (
                    "Exec Summary".to_string(),
                    "Company X sells solar panels.".to_string()
                ),
                (
                    "Market Potential".to_string(),
                    "Large and growing.\n\n- 8/10".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_write_creates_dir_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results");

        let path = write_report("Screening", &sample(), &output).await.unwrap();
        assert_eq!(path, output.join("Screening.md"));

        let mut updated = AnalysisResult::new();
        updated.push("exec_summary", "Rewritten.");
        write_report("Screening", &updated, &output).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Rewritten."));
        assert!(!content.contains("solar panels"));
    }

    #[test]
    fn test_report_blocks_follow_markdown_structure() {
        let mut result = sample();
        result.push("next_steps", "1. Call references\n2. Review cap table");
        let text = render_markdown("Screening", &result);

        let blocks = report_blocks(&text, Path::new("Screening.md")).unwrap();
        let expected = vec![
            ReportBlock::Heading {
                level: 1,
                text: "Screening Analysis".to_string(),
            },
            ReportBlock::Heading {
                level: 2,
                text: "Exec Summary".to_string(),
            },
            ReportBlock::Paragraph("Company X sells solar panels.".to_string()),
            ReportBlock::Heading {
                level: 2,
                text: "Market Potential".to_string(),
            },
            ReportBlock::Paragraph("Large and growing.".to_string()),
            ReportBlock::ListItem {
                ordered: false,
                list: 1,
                text: "8/10".to_string(),
            },
            ReportBlock::Heading {
                level: 2,
                text: "Next Steps".to_string(),
            },
            ReportBlock::ListItem {
                ordered: true,
                list: 2,
                text: "Call references".to_string(),
            },
            ReportBlock::ListItem {
                ordered: true,
                list: 2,
                text: "Review cap table".to_string(),
            },
        ];
        assert_eq!(blocks, expected);
    }

    #[tokio::test]
    async fn test_convert_writes_docx_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report("Screening", &sample(), dir.path()).await.unwrap();

        let docx_path = convert_report(&path).await.unwrap();
        assert_eq!(docx_path, dir.path().join("Screening.docx"));

        // .docx is a zip package
        let bytes = std::fs::read(docx_path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_convert_empty_report_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Empty.md");
        std::fs::write(&path, "   \n").unwrap();

        let err = convert_report(&path).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Conversion { .. }));
        assert!(!dir.path().join("Empty.docx").exists());
    }

    #[tokio::test]
    async fn test_convert_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_report(&dir.path().join("missing.md")).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }

    #[tokio::test]
    async fn test_clear_results() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join("a.docx"), "a").unwrap();
        std::fs::create_dir(dir.path().join("keep")).unwrap();

        assert_eq!(clear_results(dir.path()).await.unwrap(), 2);
        assert!(dir.path().join("keep").exists());
        assert_eq!(clear_results(&dir.path().join("absent")).await.unwrap(), 0);
    }
}
