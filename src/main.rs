use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use ngannotate::{Options, Rename, annotate, cli, plugins, util};

fn map_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}

fn main() -> Result<()> {
    let args = cli::Args::parse();

    if args.list {
        for name in plugins::OPTIONAL_NAMES {
            println!("{name}");
        }
        return Ok(());
    }
    if !args.add && !args.remove {
        bail!("no mode specified (use -a and/or -r)");
    }
    if args.sourcemap && args.output.is_none() {
        bail!("--sourcemap requires -o");
    }

    let src = if args.file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        util::read_to_string(Path::new(&args.file))?
    };

    let rename = args
        .rename
        .chunks_exact(2)
        .map(|pair| Rename {
            from: pair[0].clone(),
            to: pair[1].clone(),
        })
        .collect();

    let options = Options {
        add: args.add,
        remove: args.remove,
        single_quotes: args.single_quotes,
        regexp: args.regexp,
        rename,
        enable: args.enable,
        plugins: Vec::new(),
        sourcemap: args.sourcemap,
        source_name: (args.file != "-").then(|| args.file.clone()),
    };

    let result = annotate(&src, options)?;

    if args.stats {
        eprintln!("{}", serde_json::to_string_pretty(&result.stats)?);
    }

    match args.output {
        Some(path) => {
            let mut out = result.src;
            if let Some(map) = result.map {
                let map_path = map_path_for(&path);
                fs::write(&map_path, map)
                    .with_context(|| format!("failed to write {}", map_path.display()))?;
                let map_name = map_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&format!("//# sourceMappingURL={map_name}\n"));
            }
            fs::write(&path, out).with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => print!("{}", result.src),
    }
    Ok(())
}
