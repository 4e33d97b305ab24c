use miette::{LabeledSpan, MietteDiagnostic, Report, Severity};

use atlas_core::Error;

/// Render an error chain for the terminal. Engine errors get a severity
/// and, for statement failures, a span pointing into the statement text.
pub fn render(error: &anyhow::Error) -> String {
    match error.downcast_ref::<Error>() {
        Some(Error::Statement {
            file,
            index,
            stmt,
            message,
        }) => {
            let diagnostic = MietteDiagnostic::new(message.clone())
                .with_severity(Severity::Error)
                .with_label(LabeledSpan::at(
                    0..stmt.len().min(80),
                    format!("statement {index} of {file}"),
                ));
            format!("{:?}", Report::new(diagnostic).with_source_code(stmt.clone()))
        }
        Some(engine_error) => {
            let diagnostic =
                MietteDiagnostic::new(engine_error.to_string()).with_severity(Severity::Error);
            format!("{:?}", Report::new(diagnostic))
        }
        None => format!("{error:#}"),
    }
}
