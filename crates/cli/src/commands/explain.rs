use std::process;

use isl_core::DiagnosticCode;

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_explain(query: &str, output: OutputFormat, quiet: bool) {
    let codes = DiagnosticCode::lookup(query);
    if codes.is_empty() {
        let msg = format!(
            "unknown diagnostic code '{}'. Codes are in the ranges E0340-E0346, E0350-E0353 and E0360-E0363",
            query
        );
        report_error(&msg, output, quiet);
        process::exit(1);
    }
    if quiet {
        return;
    }

    match output {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = codes
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "code": c.code(),
                        "name": c.name(),
                        "severity": c.severity(),
                        "explanation": c.explanation(),
                    })
                })
                .collect();
            let json = serde_json::to_string_pretty(&entries)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            for (i, code) in codes.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{} {} ({})", code.code(), code.name(), code.severity());
                println!();
                println!("{}", code.explanation());
            }
        }
    }
}
