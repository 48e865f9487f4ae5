use isl_analyze::{AnalyzerOptions, PassRegistry};

use crate::OutputFormat;

pub(crate) fn cmd_passes(output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    let infos = PassRegistry::with_defaults(&AnalyzerOptions::default()).infos();

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&infos)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("Analysis Passes");
            println!("===============");
            println!();
            for info in &infos {
                let default = if info.enabled_by_default { "" } else { " (opt-in)" };
                println!("  {:<22} [{:>2}] {}{}", info.id, info.priority, info.name, default);
                println!("  {:<22}      {}", "", info.description);
                if !info.dependencies.is_empty() {
                    println!("  {:<22}      after: {}", "", info.dependencies.join(", "));
                }
            }
        }
    }
}
