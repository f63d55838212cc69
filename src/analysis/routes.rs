use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::AppError;

static PATH_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^['"]?(/[^'":\s]*)['"]?:\s*$"#).expect("path regex"));
static METHOD_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(get|post|put|delete|patch):\s*$").expect("method regex"));
static KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+):\s*(.*)$").expect("key regex"));
static ROUTE_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"router\.(get|post|put|delete|patch)\(\s*['"`]([^'"`]+)['"`]"#)
        .expect("route regex")
});
static EXPRESS_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("param regex"));
static BRACED_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}/]+\}").expect("braced param regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentedEndpoint {
    pub method: String,
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub secured: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagDefinition {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDeclaration {
    pub method: String,
    pub path: String,
    pub line: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteFile {
    pub file: PathBuf,
    pub documented: Vec<DocumentedEndpoint>,
    pub declarations: Vec<RouteDeclaration>,
    pub tags: Vec<TagDefinition>,
}

impl RouteFile {
    /// Declarations with no `@swagger` block for the same method and path.
    pub fn undocumented(&self) -> Vec<&RouteDeclaration> {
        self.declarations
            .iter()
            .filter(|d| {
                !self
                    .documented
                    .iter()
                    .any(|e| e.method == d.method && documents(&e.path, &d.path))
            })
            .collect()
    }
}

/// Express `:id` and OpenAPI `{id}` both become `{param}`, as do numeric
/// segments. Query strings are dropped.
pub fn normalize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    let path = EXPRESS_PARAM.replace_all(path, "{param}");
    let path = BRACED_PARAM.replace_all(&path, "{param}");

    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.chars().all(|c| c.is_ascii_digit()) {
                "{param}"
            } else {
                s
            }
        })
        .collect();

    format!("/{}", segments.join("/"))
}

/// A router declaration is relative to its mount point, so a documented
/// path covers it when it ends with the same segments.
fn documents(documented: &str, declared: &str) -> bool {
    let documented = normalize_path(documented);
    let declared = normalize_path(declared);

    if declared == "/" {
        return !documented.ends_with("{param}");
    }
    documented == declared || documented.ends_with(&declared)
}

pub fn scan_routes_dir(dir: &Path) -> Result<Vec<RouteFile>, AppError> {
    if !dir.is_dir() {
        return Err(AppError::NotFound(format!(
            "Routes directory {} does not exist",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let is_source = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e, "ts" | "js"));
        if !entry.file_type().is_file() || !is_source {
            continue;
        }

        let content = fs::read_to_string(path)?;
        let scanned = scan_route_source(path, &content);
        debug!(
            file = %path.display(),
            documented = scanned.documented.len(),
            declared = scanned.declarations.len(),
            "Scanned route file"
        );
        files.push(scanned);
    }

    Ok(files)
}

pub fn scan_route_source(file: &Path, content: &str) -> RouteFile {
    let mut route_file = RouteFile {
        file: file.to_path_buf(),
        ..Default::default()
    };

    let mut block: Option<Vec<(usize, String)>> = None;
    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim_start();

        if let Some(caps) = ROUTE_DECLARATION.captures(raw) {
            route_file.declarations.push(RouteDeclaration {
                method: caps[1].to_uppercase(),
                path: caps[2].to_string(),
                line: line_no,
            });
        }

        if trimmed.starts_with("/**") {
            block = Some(Vec::new());
        }

        if let Some(lines) = block.as_mut() {
            let ends = trimmed.contains("*/");
            lines.push((line_no, comment_body(trimmed)));
            if ends {
                if let Some(lines) = block.take() {
                    if lines.iter().any(|(_, l)| l.contains("@swagger")) {
                        parse_swagger_block(&lines, &mut route_file);
                    }
                }
            }
        }
    }

    route_file
}

/// Strips the comment markers but keeps the indentation after `*`.
fn comment_body(line: &str) -> String {
    let line = line.strip_prefix("/**").unwrap_or(line);
    let line = match line.find("*/") {
        Some(end) => &line[..end],
        None => line,
    };
    let line = line.strip_prefix('*').unwrap_or(line);
    line.trim_end().to_string()
}

#[derive(PartialEq)]
enum Section {
    Idle,
    TagDefinition,
    Operation,
    OperationTags,
    Nested,
}

fn parse_swagger_block(lines: &[(usize, String)], route_file: &mut RouteFile) {
    let mut current_path: Option<String> = None;
    let mut operation: Option<(usize, DocumentedEndpoint)> = None;
    // Indent of the keys directly under the current method.
    let mut key_indent: Option<usize> = None;
    let mut section = Section::Idle;

    for (line_no, line) in lines {
        let indent = line.len() - line.trim_start().len();
        let text = line.trim();
        if text.is_empty() || text.starts_with("@swagger") {
            continue;
        }

        if let Some(caps) = PATH_LINE.captures(text) {
            flush(&mut operation, route_file);
            current_path = Some(caps[1].to_string());
            section = Section::Idle;
            continue;
        }

        if let (Some(path), Some(caps)) = (&current_path, METHOD_LINE.captures(text)) {
            flush(&mut operation, route_file);
            operation = Some((
                indent,
                DocumentedEndpoint {
                    method: caps[1].to_uppercase(),
                    path: path.clone(),
                    summary: None,
                    description: None,
                    tags: Vec::new(),
                    secured: false,
                    line: *line_no,
                },
            ));
            key_indent = None;
            section = Section::Operation;
            continue;
        }

        if current_path.is_none() {
            parse_tag_definition(text, &mut section, route_file);
            continue;
        }

        let Some((method_indent, endpoint)) = operation.as_mut() else {
            continue;
        };

        if section == Section::OperationTags {
            if let Some(tag) = text.strip_prefix("- ") {
                endpoint.tags.push(unquote(tag));
                continue;
            }
            section = Section::Operation;
        }

        if text.contains("bearerAuth") {
            endpoint.secured = true;
        }

        let Some(caps) = KEY_VALUE.captures(text) else {
            continue;
        };
        let (key, value) = (&caps[1], caps[2].trim());

        if indent <= *method_indent {
            continue;
        }
        // Only keys directly under the method belong to the operation.
        if indent <= *key_indent.get_or_insert(indent) {
            section = Section::Operation;
        }
        if section == Section::Nested {
            continue;
        }

        match key {
            "summary" if endpoint.summary.is_none() => endpoint.summary = Some(unquote(value)),
            "description" if endpoint.description.is_none() => {
                endpoint.description = Some(unquote(value))
            }
            "tags" if value.is_empty() => section = Section::OperationTags,
            "tags" => endpoint.tags.extend(parse_inline_list(value)),
            "security" => endpoint.secured = true,
            "parameters" | "requestBody" | "responses" => section = Section::Nested,
            _ => {}
        }
    }

    flush(&mut operation, route_file);
}

fn flush(operation: &mut Option<(usize, DocumentedEndpoint)>, route_file: &mut RouteFile) {
    if let Some((_, endpoint)) = operation.take() {
        route_file.documented.push(endpoint);
    }
}

fn parse_tag_definition(text: &str, section: &mut Section, route_file: &mut RouteFile) {
    if text == "tags:" {
        *section = Section::TagDefinition;
        return;
    }
    if *section != Section::TagDefinition {
        return;
    }

    let text = text.strip_prefix("- ").unwrap_or(text);
    if let Some(caps) = KEY_VALUE.captures(text) {
        match &caps[1] {
            "name" => route_file.tags.push(TagDefinition {
                name: unquote(caps[2].trim()),
                description: None,
            }),
            "description" => {
                if let Some(tag) = route_file.tags.last_mut() {
                    tag.description = Some(unquote(caps[2].trim()));
                }
            }
            _ => {}
        }
    }
}

fn parse_inline_list(value: &str) -> Vec<String> {
    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(unquote)
        .filter(|s| !s.is_empty())
        .collect()
}

fn unquote(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}
