//! Rich error diagnostics with source snippets, colors, and suggestions.

use crate::compiler::error_codes;
use crate::{BuildError, UnresolvedRef};
use std::collections::HashMap;
use yangc_core::StatementSourceRef;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A rendered diagnostic with source context
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub col: Option<usize>,
    pub source_line: Option<String>,
    pub underline: Option<String>,
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Render with ANSI colors for terminal
    pub fn render_ansi(&self) -> String {
        let mut out = String::new();

        let severity_label = match self.severity {
            Severity::Error => red("error"),
            Severity::Warning => yellow("warning"),
            Severity::Note => cyan("note"),
        };

        if let Some(ref code) = self.code {
            out.push_str(&format!("{}[{}]: ", severity_label, bold(code)));
        } else {
            out.push_str(&format!("{}: ", severity_label));
        }
        out.push_str(&bold(&self.message));
        out.push('\n');

        if let (Some(ref file), Some(line), Some(col)) = (&self.file, self.line, self.col) {
            out.push_str(&format!("  {} {}:{}:{}\n", cyan("-->"), file, line, col));
        } else if let (Some(ref file), Some(line)) = (&self.file, self.line) {
            out.push_str(&format!("  {} {}:{}\n", cyan("-->"), file, line));
        }

        if let (Some(line_num), Some(ref line_text), Some(ref underline)) =
            (self.line, &self.source_line, &self.underline)
        {
            out.push_str(&format!("   {}\n", cyan("|")));
            out.push_str(&format!(
                "{:>3} {} {}\n",
                cyan(&line_num.to_string()),
                cyan("|"),
                line_text
            ));
            out.push_str(&format!("   {} {}\n", cyan("|"), red(underline)));
        }

        if !self.suggestions.is_empty() {
            out.push_str(&format!("   {}\n", cyan("|")));
            for suggestion in &self.suggestions {
                out.push_str(&format!("   {} {}: {}\n", cyan("="), cyan("help"), suggestion));
            }
        }

        out
    }

    /// Render without colors (for logs, tests)
    pub fn render_plain(&self) -> String {
        let mut out = String::new();

        let severity_label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };

        if let Some(ref code) = self.code {
            out.push_str(&format!("{}[{}]: ", severity_label, code));
        } else {
            out.push_str(&format!("{}: ", severity_label));
        }
        out.push_str(&self.message);
        out.push('\n');

        if let (Some(ref file), Some(line), Some(col)) = (&self.file, self.line, self.col) {
            out.push_str(&format!("  --> {}:{}:{}\n", file, line, col));
        } else if let (Some(ref file), Some(line)) = (&self.file, self.line) {
            out.push_str(&format!("  --> {}:{}\n", file, line));
        }

        if let (Some(line_num), Some(ref line_text), Some(ref underline)) =
            (self.line, &self.source_line, &self.underline)
        {
            out.push_str("   |\n");
            out.push_str(&format!("{:>3} | {}\n", line_num, line_text));
            out.push_str(&format!("   | {}\n", underline));
        }

        if !self.suggestions.is_empty() {
            out.push_str("   |\n");
            for suggestion in &self.suggestions {
                out.push_str(&format!("   = help: {}\n", suggestion));
            }
        }

        out
    }
}

// ANSI color helpers
fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

fn yellow(s: &str) -> String {
    format!("\x1b[33m{}\x1b[0m", s)
}

fn cyan(s: &str) -> String {
    format!("\x1b[36m{}\x1b[0m", s)
}

fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}

// Source line extraction
fn get_source_line(source: &str, line: usize) -> Option<String> {
    source
        .lines()
        .nth(line.saturating_sub(1))
        .map(|s| s.to_string())
}

fn make_underline(col: usize, len: usize) -> String {
    format!(
        "{}{}",
        " ".repeat(col.saturating_sub(1)),
        "^".repeat(len.max(1))
    )
}

// Edit distance for suggestions
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0; b_len + 1]; a_len + 1];

    #[allow(clippy::needless_range_loop)]
    for i in 0..=a_len {
        matrix[i][0] = i;
    }
    #[allow(clippy::needless_range_loop)]
    for j in 0..=b_len {
        matrix[0][j] = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}

fn suggest_similar(name: &str, candidates: &[String], max_distance: usize) -> Vec<String> {
    let mut matches: Vec<(usize, String)> = candidates
        .iter()
        .filter_map(|c| {
            let d = edit_distance(name, c);
            if d <= max_distance {
                Some((d, c.clone()))
            } else {
                None
            }
        })
        .collect();

    matches.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    matches.into_iter().map(|(_, s)| s).take(3).collect()
}

/// Convert a `BuildError` into a list of diagnostics.
///
/// `sources` maps source names to their full text; entries are optional and
/// only enrich the output with snippet lines.
pub fn format_build_error(
    error: &BuildError,
    sources: &HashMap<String, String>,
) -> Vec<Diagnostic> {
    match error {
        BuildError::Unresolved(refs) => refs
            .iter()
            .map(|r| format_unresolved_ref(r, sources))
            .collect(),
        BuildError::Multiple(errors) => errors
            .iter()
            .flat_map(|e| format_build_error(e, sources))
            .collect(),
        BuildError::Syntax { message, sref } | BuildError::Cardinality { message, sref } => {
            vec![located(error, message.clone(), sref, sources, vec![])]
        }
        BuildError::Collision { name, first, second } => {
            vec![located(
                error,
                format!("'{}' is defined more than once", name),
                second,
                sources,
                vec![format!("first definition is at {}", first)],
            )]
        }
        BuildError::DuplicateNamespace { namespace, first, second } => {
            vec![located(
                error,
                format!("namespace '{}' is declared by more than one module", namespace),
                second,
                sources,
                vec![format!("also declared at {}", first)],
            )]
        }
        BuildError::Circular { what, cycle, sref } => {
            vec![located(
                error,
                format!("{} forms a dependency cycle", what),
                sref,
                sources,
                vec![format!("cycle involves: {}", cycle.join(", "))],
            )]
        }
    }
}

fn format_unresolved_ref(r: &UnresolvedRef, sources: &HashMap<String, String>) -> Diagnostic {
    let mut suggestions = Vec::new();
    for similar in suggest_similar(&r.target, &r.candidates, 2) {
        suggestions.push(format!("did you mean '{}'?", similar));
    }

    let (source_line, underline) = snippet(&r.sref, sources, r.target.len());
    Diagnostic {
        severity: Severity::Error,
        code: Some("E0030".to_string()),
        message: format!(
            "'{} {}' could not be resolved during {}",
            r.keyword, r.target, r.phase
        ),
        file: Some(r.sref.source.to_string()),
        line: Some(r.sref.line),
        col: Some(r.sref.col),
        source_line,
        underline,
        suggestions,
    }
}

fn located(
    error: &BuildError,
    message: String,
    sref: &StatementSourceRef,
    sources: &HashMap<String, String>,
    suggestions: Vec<String>,
) -> Diagnostic {
    let (source_line, underline) = snippet(sref, sources, 1);
    Diagnostic {
        severity: Severity::Error,
        code: Some(error_codes::error_code(error).to_string()),
        message,
        file: Some(sref.source.to_string()),
        line: Some(sref.line),
        col: Some(sref.col),
        source_line,
        underline,
        suggestions,
    }
}

fn snippet(
    sref: &StatementSourceRef,
    sources: &HashMap<String, String>,
    len: usize,
) -> (Option<String>, Option<String>) {
    let source_line = sources
        .get(sref.source.name.as_ref())
        .and_then(|text| get_source_line(text, sref.line));
    let underline = source_line.as_ref().map(|_| make_underline(sref.col, len));
    (source_line, underline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelProcessingPhase;
    use yangc_core::SourceIdentifier;

    fn sref(name: &str, line: usize, col: usize) -> StatementSourceRef {
        StatementSourceRef::new(SourceIdentifier::new(name), line, col)
    }

    #[test]
    fn test_get_source_line() {
        let source = "line 1\nline 2\nline 3\n";
        assert_eq!(get_source_line(source, 1), Some("line 1".to_string()));
        assert_eq!(get_source_line(source, 3), Some("line 3".to_string()));
        assert_eq!(get_source_line(source, 4), None);
    }

    #[test]
    fn test_make_underline() {
        assert_eq!(make_underline(1, 3), "^^^");
        assert_eq!(make_underline(5, 2), "    ^^");
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("abc", "abd"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_suggest_similar() {
        let candidates = vec![
            "target-nodes".to_string(),
            "endpoints".to_string(),
            "addresses".to_string(),
        ];
        let suggestions = suggest_similar("target-node", &candidates, 2);
        assert_eq!(suggestions, vec!["target-nodes".to_string()]);

        assert!(suggest_similar("zzz", &candidates, 1).is_empty());
    }

    #[test]
    fn test_format_unresolved_with_did_you_mean() {
        let error = BuildError::Unresolved(vec![UnresolvedRef {
            phase: ModelProcessingPhase::FullDeclaration,
            keyword: "uses".into(),
            target: "endpont".into(),
            sref: sref("net", 7, 5),
            candidates: vec!["endpoint".to_string(), "address".to_string()],
        }]);
        let mut sources = HashMap::new();
        sources.insert("net".to_string(), "module net {\n".repeat(8));

        let diags = format_build_error(&error, &sources);
        assert_eq!(diags.len(), 1);
        let rendered = diags[0].render_plain();
        assert!(rendered.contains("error[E0030]"));
        assert!(rendered.contains("net:7:5"));
        assert!(rendered.contains("did you mean 'endpoint'?"));
    }

    #[test]
    fn test_render_plain_and_ansi() {
        let diag = Diagnostic {
            severity: Severity::Error,
            code: Some("E0030".to_string()),
            message: "'uses grp' could not be resolved".to_string(),
            file: Some("foo".to_string()),
            line: Some(10),
            col: Some(5),
            source_line: Some("    uses grp;".to_string()),
            underline: Some("    ^^^".to_string()),
            suggestions: vec!["did you mean 'grp2'?".to_string()],
        };

        let plain = diag.render_plain();
        assert!(plain.contains("error[E0030]"));
        assert!(plain.contains("foo:10:5"));
        assert!(plain.contains("^^^"));
        assert!(plain.contains("did you mean 'grp2'?"));

        let ansi = diag.render_ansi();
        assert!(ansi.contains("\x1b["));
        assert!(ansi.contains("E0030"));
    }

    #[test]
    fn test_multiple_flattens_into_diagnostics() {
        let error = BuildError::Multiple(vec![
            BuildError::Syntax { message: "bad".into(), sref: sref("a", 1, 1) },
            BuildError::Circular {
                what: "grouping 'g'".into(),
                cycle: vec!["g".into(), "h".into()],
                sref: sref("b", 2, 3),
            },
        ]);
        let diags = format_build_error(&error, &HashMap::new());
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].code.as_deref(), Some("E0001"));
        assert_eq!(diags[1].code.as_deref(), Some("E0040"));
        assert!(diags[1].suggestions[0].contains("g, h"));
    }
}
