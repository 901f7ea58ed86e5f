use clap::Parser as _;
use ngannotate::cli::Args;
use ngannotate::util;

#[test]
fn rename_pairs_and_file_are_parsed() {
    let args = Args::parse_from([
        "ngannotate", "-a", "--rename", "$a", "$b", "--rename", "$c", "$d", "app.js",
    ]);
    assert!(args.add);
    assert!(!args.remove);
    assert_eq!(args.rename, ["$a", "$b", "$c", "$d"]);
    assert_eq!(args.file, "app.js");
}

#[test]
fn file_defaults_to_stdin_marker() {
    let args = Args::parse_from(["ngannotate", "-r"]);
    assert!(args.remove);
    assert_eq!(args.file, "-");
    assert!(args.output.is_none());
}

#[test]
fn short_flags_combine_with_output_and_sourcemap() {
    let args = Args::parse_from([
        "ngannotate",
        "-a",
        "-r",
        "-o",
        "out.js",
        "--sourcemap",
        "app.js",
    ]);
    assert!(args.add && args.remove);
    assert!(args.sourcemap);
    assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out.js")));
}

#[test]
fn enable_collects_repeated_names() {
    let args = Args::parse_from([
        "ngannotate",
        "-a",
        "--enable",
        "angular-dashboard-framework",
        "--enable",
        "other",
        "app.js",
    ]);
    assert_eq!(args.enable, ["angular-dashboard-framework", "other"]);
}

#[test]
fn list_parses_without_a_mode() {
    let args = Args::parse_from(["ngannotate", "--list"]);
    assert!(args.list);
    assert!(!args.add && !args.remove);
}

#[test]
fn rename_rejects_a_lone_argument() {
    let result = Args::try_parse_from(["ngannotate", "-a", "--rename", "$a"]);
    assert!(result.is_err());
}

#[test]
fn read_to_string_reports_the_path_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.js");
    let err = util::read_to_string(&missing).unwrap_err();
    assert!(err.to_string().contains("missing.js"));
}
