//! pdfsection CLI - PDF text extraction and section slicing tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfsection::{
    process, reformat, CancelToken, ExtractOptions, LopdfSource, MatchSpec, PdftoppmRasterizer,
    PipelineOptions, ProcessOutput, Progress, ReformatConfig, TesseractEngine,
};

#[derive(Parser)]
#[command(name = "pdfsection")]
#[command(version)]
#[command(about = "Extract PDF text with OCR fallback and cut out a section", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the full text and an optional section, writing every artifact
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Also write a per-page JSON report
        #[arg(long)]
        report: bool,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        section: SectionArgs,

        #[command(flatten)]
        reformat: ReformatArgs,
    },

    /// Print the full text of a PDF
    Text {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Reformat the text before printing
        #[arg(long)]
        fix: bool,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        reformat: ReformatArgs,
    },

    /// Print the section between two markers
    Section {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Start marker
        #[arg(short, long)]
        start: String,

        /// End marker (section runs to the end of the document if omitted)
        #[arg(short, long)]
        end: Option<String>,

        /// Treat markers as literal text instead of regular expressions
        #[arg(long)]
        literal: bool,

        /// Print the reformatted section instead of the raw text
        #[arg(long)]
        fixed: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        reformat: ReformatArgs,
    },

    /// Reformat a plain text file
    Fix {
        /// Input text file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        reformat: ReformatArgs,
    },

    /// Show how each page's text was obtained
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct ExtractArgs {
    /// OCR language (tesseract codes)
    #[arg(long, env = "PDFSECTION_OCR_LANG", default_value = "jpn+eng")]
    lang: String,

    /// Render resolution for OCR (150-600)
    #[arg(long, env = "PDFSECTION_DPI", default_value = "300")]
    dpi: u32,

    /// Pages with fewer embedded characters than this are OCR'd
    #[arg(long, default_value = "10")]
    min_chars: usize,

    /// Order text by layout blocks (multi-column pages)
    #[arg(long)]
    keep_layout: bool,

    /// Extract pages in parallel
    #[arg(long)]
    parallel: bool,

    /// Keep going when a page cannot be recognized
    #[arg(long)]
    lenient: bool,

    /// Seconds allowed for each rasterize/OCR call (0 disables the limit)
    #[arg(long, default_value = "120")]
    ocr_timeout: u64,
}

impl ExtractArgs {
    fn options(&self) -> ExtractOptions {
        let timeout = (self.ocr_timeout > 0).then(|| Duration::from_secs(self.ocr_timeout));
        let options = ExtractOptions::new()
            .with_ocr_lang(self.lang.as_str())
            .with_dpi(self.dpi)
            .with_min_chars(self.min_chars)
            .with_layout(self.keep_layout)
            .with_parallel(self.parallel)
            .with_ocr_timeout(timeout);
        if self.lenient {
            options.lenient()
        } else {
            options
        }
    }
}

#[derive(Args)]
struct SectionArgs {
    /// Start marker of the section to cut out
    #[arg(short, long)]
    start: Option<String>,

    /// End marker (section runs to the end of the document if omitted)
    #[arg(short, long, requires = "start")]
    end: Option<String>,

    /// Treat markers as literal text instead of regular expressions
    #[arg(long)]
    literal: bool,
}

impl SectionArgs {
    fn apply(&self, options: PipelineOptions) -> PipelineOptions {
        let is_regex = !self.literal;
        let mut options = options;
        if let Some(start) = &self.start {
            options = options.with_start(MatchSpec::new(start.as_str(), is_regex));
        }
        if let Some(end) = &self.end {
            options = options.with_end(MatchSpec::new(end.as_str(), is_regex));
        }
        options
    }
}

#[derive(Args)]
struct ReformatArgs {
    /// Do not reformat at all
    #[arg(long)]
    no_reformat: bool,

    /// Keep soft hyphens (U+00AD)
    #[arg(long)]
    keep_soft_hyphens: bool,

    /// Do not join words hyphenated across lines
    #[arg(long)]
    no_hyphen_join: bool,

    /// Do not join lines broken mid-sentence
    #[arg(long)]
    no_line_join: bool,

    /// Do not collapse runs of blank lines
    #[arg(long)]
    no_blank_collapse: bool,

    /// Do not collapse runs of ASCII spaces
    #[arg(long)]
    no_space_normalize: bool,

    /// Trim whitespace at both ends of every line
    #[arg(long)]
    trim_lines: bool,
}

impl ReformatArgs {
    fn config(&self) -> Option<ReformatConfig> {
        if self.no_reformat {
            return None;
        }
        Some(
            ReformatConfig::default()
                .with_remove_soft_hyphen(!self.keep_soft_hyphens)
                .with_join_hyphenated_words(!self.no_hyphen_join)
                .with_join_wrapped_lines(!self.no_line_join)
                .with_collapse_blank_lines(!self.no_blank_collapse)
                .with_normalize_latin_spacing(!self.no_space_normalize)
                .with_trim_line_edges(self.trim_lines),
        )
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            report,
            extract,
            section,
            reformat,
        } => cmd_extract(&input, output.as_deref(), report, &extract, &section, &reformat),
        Commands::Text {
            input,
            output,
            fix,
            extract,
            reformat,
        } => cmd_text(&input, output.as_deref(), fix, &extract, &reformat),
        Commands::Section {
            input,
            start,
            end,
            literal,
            fixed,
            output,
            extract,
            reformat,
        } => {
            let section = SectionArgs {
                start: Some(start),
                end,
                literal,
            };
            cmd_section(&input, output.as_deref(), fixed, &extract, &section, &reformat)
        }
        Commands::Fix {
            input,
            output,
            reformat,
        } => cmd_fix(&input, output.as_deref(), &reformat),
        Commands::Info { input, extract } => cmd_info(&input, &extract),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Load the PDF and run the pipeline with a progress bar on stderr.
fn run(input: &Path, options: &PipelineOptions) -> Result<ProcessOutput, pdfsection::Error> {
    let extract = &options.extract;
    let source = LopdfSource::open(input)?
        .with_rasterizer(PdftoppmRasterizer::new().with_timeout(extract.ocr_timeout));
    let engine = TesseractEngine::new().with_timeout(extract.ocr_timeout);
    if !engine.is_available() {
        log::warn!("tesseract not found on PATH; pages without a text layer will fail OCR");
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message("Extracting...");

    let result = process(&source, &engine, options, &CancelToken::new(), |p: Progress| {
        pb.set_length(u64::from(p.total_pages));
        pb.set_position(u64::from(p.pages_done));
    });

    match &result {
        Ok(_) => pb.finish_with_message("Done!"),
        Err(_) => pb.abandon(),
    }
    result
}

fn print_warnings(output: &ProcessOutput) {
    for warning in &output.warnings {
        eprintln!("{}: {}", "Warning".yellow().bold(), warning);
    }
}

fn write_or_print(output: Option<&Path>, text: &str) -> CliResult {
    if let Some(path) = output {
        fs::write(path, text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    report: bool,
    extract: &ExtractArgs,
    section: &SectionArgs,
    reformat: &ReformatArgs,
) -> CliResult {
    let mut options = PipelineOptions::new().with_extract(extract.options());
    options = section.apply(options);
    options.reformat = reformat.config();

    let result = run(input, &options)?;
    print_warnings(&result);

    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();

    let mut written = vec![format!("{}.txt", stem)];
    fs::write(output_dir.join(&written[0]), &result.full_text)?;

    let mut artifacts: Vec<(String, &str)> = Vec::new();
    if let Some(text) = &result.full_reformatted {
        artifacts.push((format!("{}_fixed.txt", stem), text));
    }
    if let Some(text) = &result.section_raw {
        artifacts.push((format!("{}_section_raw.txt", stem), text));
    }
    if let Some(text) = &result.section_reformatted {
        artifacts.push((format!("{}_section_fixed.txt", stem), text));
    }
    for (name, text) in artifacts {
        fs::write(output_dir.join(&name), text)?;
        written.push(name);
    }

    if report {
        let json = result.report_json()?;
        let name = format!("{}_pages.json", stem);
        fs::write(output_dir.join(&name), json)?;
        written.push(name);
    }

    println!("\n{}", "Output files:".green().bold());
    for (i, name) in written.iter().enumerate() {
        let branch = if i + 1 == written.len() { "└─" } else { "├─" };
        println!("  {} {}", branch.dimmed(), name);
    }

    Ok(())
}

fn cmd_text(
    input: &Path,
    output: Option<&Path>,
    fix: bool,
    extract: &ExtractArgs,
    reformat: &ReformatArgs,
) -> CliResult {
    let mut options = PipelineOptions::new().with_extract(extract.options());
    options.reformat = if fix { reformat.config() } else { None };

    let result = run(input, &options)?;
    print_warnings(&result);

    let text = result.full_reformatted.as_deref().unwrap_or(&result.full_text);
    write_or_print(output, text)
}

fn cmd_section(
    input: &Path,
    output: Option<&Path>,
    fixed: bool,
    extract: &ExtractArgs,
    section: &SectionArgs,
    reformat: &ReformatArgs,
) -> CliResult {
    let mut options = section.apply(PipelineOptions::new().with_extract(extract.options()));
    options.reformat = if fixed { reformat.config() } else { None };

    let result = run(input, &options)?;
    print_warnings(&result);

    match section_text(&result, fixed) {
        Some(text) => write_or_print(output, text),
        None => Err("section not found".into()),
    }
}

/// The raw slice unless the reformatted section was asked for.
fn section_text(result: &ProcessOutput, fixed: bool) -> Option<&str> {
    if fixed {
        result.section()
    } else {
        result.section_raw.as_deref()
    }
}

fn cmd_fix(input: &Path, output: Option<&Path>, args: &ReformatArgs) -> CliResult {
    let text = fs::read_to_string(input)?;
    let fixed = match args.config() {
        Some(config) => reformat(&text, &config),
        None => text,
    };
    write_or_print(output, &fixed)
}

fn cmd_info(input: &Path, extract: &ExtractArgs) -> CliResult {
    let header = pdfsection::sniff_path(input)?;
    let options = PipelineOptions::new()
        .with_extract(extract.options())
        .without_reformat();
    let result = run(input, &options)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), header);
    println!("{}: {}", "Pages".bold(), result.pages.len());
    println!("{}: {}", "Characters".bold(), result.full_text.chars().count());

    println!();
    println!("{}", "Pages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for page in &result.pages {
        let method = match page.method {
            pdfsection::ExtractionMethod::Direct => page.method.to_string().green(),
            pdfsection::ExtractionMethod::Recognized => page.method.to_string().yellow(),
        };
        let dpi = page
            .ocr_dpi
            .map(|d| format!(" @ {} dpi", d))
            .unwrap_or_default();
        print!("{:>5}  {:<10} {:>7} chars{}", page.page, method, page.char_count, dpi);
        if let Some(failure) = &page.failure {
            print!("  {}", failure.red());
        }
        println!();
    }

    print_warnings(&result);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfsection".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF text extraction with OCR fallback and section slicing");
    println!();
    println!(
        "OCR tools: pdftoppm {}, tesseract {}",
        availability(PdftoppmRasterizer::new().is_available()),
        availability(TesseractEngine::new().is_available())
    );
    println!("License: MIT");
}

fn availability(found: bool) -> colored::ColoredString {
    if found {
        "found".green()
    } else {
        "missing".red()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_with_section() -> ProcessOutput {
        ProcessOutput {
            section_raw: Some("Chapter 2\nwrapped\nline\n".to_string()),
            section_reformatted: Some("Chapter 2 wrapped line\n".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_section_prints_raw_by_default() {
        let output = output_with_section();
        assert_eq!(section_text(&output, false), Some("Chapter 2\nwrapped\nline\n"));
        assert_eq!(section_text(&output, true), Some("Chapter 2 wrapped line\n"));
    }

    #[test]
    fn test_section_fixed_flag_parses() {
        let cli = Cli::try_parse_from(["pdfsection", "section", "doc.pdf", "-s", "^Chapter 2"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Section { fixed: false, .. }));

        let cli = Cli::try_parse_from([
            "pdfsection",
            "section",
            "doc.pdf",
            "-s",
            "^Chapter 2",
            "--fixed",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Section { fixed: true, .. }));
    }
}
