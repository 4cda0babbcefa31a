use serde_json::Value;

use crate::cli::OutputFormat;
use crate::commands::Envelope;
use crate::error::CliError;

pub fn render(envelope: &Envelope, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => print!("{}", render_table(envelope)?),
    }

    Ok(())
}

fn render_table(envelope: &Envelope) -> Result<String, CliError> {
    let mut out = String::new();
    let meta = &envelope.meta;
    push_line(&mut out, format!("request_id  : {}", meta.request_id));
    push_line(&mut out, format!("generated_at: {}", meta.generated_at));
    push_line(
        &mut out,
        format!(
            "sources     : {}",
            meta.sources
                .iter()
                .map(|source| source.as_str())
                .collect::<Vec<_>>()
                .join(",")
        ),
    );
    push_line(&mut out, format!("latency_ms  : {}", meta.latency_ms));

    if !meta.warnings.is_empty() {
        push_line(&mut out, "warnings:");
        for warning in &meta.warnings {
            push_line(&mut out, format!("  - {warning}"));
        }
    }

    if let Some(leads) = envelope.data.get("leads").and_then(Value::as_array) {
        push_line(&mut out, lead_summary(&envelope.data, leads.len()));
        for lead in leads {
            push_line(&mut out, lead_row(lead));
        }
    } else {
        push_line(&mut out, "data:");
        for line in serde_json::to_string_pretty(&envelope.data)?.lines() {
            push_line(&mut out, format!("  {line}"));
        }
    }

    if !envelope.errors.is_empty() {
        push_line(&mut out, "errors:");
        for error in &envelope.errors {
            push_line(&mut out, format!("  - {}: {}", error.code, error.message));
        }
    }

    Ok(out)
}

fn lead_summary(data: &Value, lead_count: usize) -> String {
    let outcome = data["outcome"].as_str().unwrap_or("unknown");
    let candidates = data["stats"]["candidates"].as_u64().unwrap_or(0);
    format!("leads       : {lead_count} of {candidates} candidates ({outcome})")
}

fn lead_row(lead: &Value) -> String {
    format!(
        "  [{}] {:>3}  {}  {}  {}",
        lead["grade"].as_str().unwrap_or("-"),
        lead["validation"]["confidence_score"].as_u64().unwrap_or(0),
        lead["record"]["name"].as_str().unwrap_or("-"),
        lead["record"]["phone"].as_str().unwrap_or("-"),
        lead["record"]["email"].as_str().unwrap_or("-"),
    )
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push('\n');
}
