use std::path::Path;
use std::process;

use isl_analyze::{AnalysisReport, AnalyzerOptions};
use isl_core::FileSystemProvider;

use crate::config::load_config;
use crate::{report_error, OutputFormat, EXIT_LOAD_FAILURE};

pub(crate) struct CheckOptions<'a> {
    pub file: &'a Path,
    pub passes: Option<&'a str>,
    pub config: Option<&'a Path>,
    pub deny_warnings: bool,
    /// `None` when `--output` was not given; the config file may then decide.
    pub output: Option<OutputFormat>,
    pub quiet: bool,
}

pub(crate) fn cmd_check(opts: CheckOptions<'_>) {
    let quiet = opts.quiet;

    // Step 1: Load configuration
    let config = match load_config(opts.config) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), opts.output.unwrap_or(OutputFormat::Text), quiet);
            process::exit(EXIT_LOAD_FAILURE);
        }
    };
    let output = opts
        .output
        .or(config.output.format)
        .unwrap_or(OutputFormat::Text);

    // Step 2: Load the domain AST
    let domain = match isl_core::load_domain(&FileSystemProvider, opts.file) {
        Ok(d) => d,
        Err(e) => {
            match output {
                OutputFormat::Json => {
                    let err_json = serde_json::to_string_pretty(&e.to_json_value())
                        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", e));
                    eprintln!("{}", err_json);
                }
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("load error: {}", e);
                    }
                }
            }
            process::exit(EXIT_LOAD_FAILURE);
        }
    };

    // Step 3: Resolve pass selection; --passes overrides the config file
    let mut options: AnalyzerOptions = config.analyzer_options();
    if let Some(passes) = opts.passes {
        let selected: Vec<String> = passes
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        options.only = Some(selected);
    }

    // Step 4: Run analysis
    let file_label = opts.file.display().to_string();
    let report = match isl_analyze::analyze_with(&domain, &file_label, &options) {
        Ok(r) => r,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(EXIT_LOAD_FAILURE);
        }
    };

    // Step 5: Format output
    if !quiet {
        match output {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&report)
                    .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
                println!("{}", json);
            }
            OutputFormat::Text => print_text(&report),
        }
    }

    if report.has_errors() || (opts.deny_warnings && report.has_warnings()) {
        process::exit(1);
    }
}

fn print_text(report: &AnalysisReport) {
    if report.diagnostics.is_empty() {
        println!("No issues found in {}", report.file);
        return;
    }

    for diagnostic in &report.diagnostics {
        println!("{}", diagnostic.render_text());
        println!();
    }

    let summary = &report.summary;
    println!(
        "{}: {} error(s), {} warning(s), {} hint(s)",
        report.file, summary.errors, summary.warnings, summary.hints
    );
}
