use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ngannotate",
    version,
    about = "Add, remove and rebuild AngularJS dependency injection annotations",
    after_help = r#"Examples:
  ngannotate -a app.js
  ngannotate -a -r app.js
  ngannotate -a -o app.out.js --sourcemap app.js
  ngannotate -r --single-quotes app.js
  ngannotate -a --regexp "^myMod" app.js
  ngannotate -a --enable angular-dashboard-framework app.js
  cat app.js | ngannotate -a -
"#
)]
pub struct Args {
    /// Add annotations where they are missing.
    #[arg(short = 'a', long)]
    pub add: bool,

    /// Remove existing annotations.
    #[arg(short = 'r', long)]
    pub remove: bool,

    /// Write output to FILE instead of stdout.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write FILE.map and append a sourceMappingURL comment (requires -o).
    #[arg(long)]
    pub sourcemap: bool,

    /// Use single quotes in generated annotation arrays.
    #[arg(long)]
    pub single_quotes: bool,

    /// Regular expression matching additional module receiver names.
    #[arg(long, value_name = "PATTERN")]
    pub regexp: Option<String>,

    /// Rename a provider, FROM TO. May be given multiple times.
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    pub rename: Vec<String>,

    /// Enable an optional matcher by name. May be given multiple times.
    #[arg(long, value_name = "NAME")]
    pub enable: Vec<String>,

    /// List available optional matcher names and exit.
    #[arg(long)]
    pub list: bool,

    /// Print run statistics as JSON to stderr.
    #[arg(long)]
    pub stats: bool,

    /// Input file, or - for stdin.
    #[arg(default_value = "-", value_name = "FILE")]
    pub file: String,
}
