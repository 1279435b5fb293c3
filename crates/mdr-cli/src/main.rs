mod app;
mod logging;
mod ui;
mod watcher;

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use mdr_core::{ImageStyle, PADDING, RenderOptions, render};

use crate::app::{App, AppOptions};
use crate::ui::theme::ThemeChoice;

#[derive(Debug, Parser)]
#[command(name = "mdr", version, about = "Terminal markdown pager")]
struct Cli {
    /// Markdown file to show; standard input is read when omitted
    #[arg(value_name = "FILE.md")]
    paths: Vec<PathBuf>,

    /// Reload the document when the file changes on disk
    #[arg(long, default_value_t = false)]
    watch: bool,

    /// How images are drawn
    #[arg(long, value_enum, default_value_t = CliImages::Blocks)]
    images: CliImages,

    /// Color theme
    #[arg(long, value_enum, default_value_t = CliTheme::Auto)]
    theme: CliTheme,

    /// Disable ANSI color
    #[arg(long, default_value_t = false)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum CliImages {
    Blocks,
    Text,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum CliTheme {
    Auto,
    Default,
    HighContrast,
}

struct Document {
    text: String,
    path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = parse_cli();
    if is_version_request(&cli.paths) {
        println!("mdr {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let _log_guard = logging::init_from_env()?;
    let render_options = RenderOptions {
        images: match cli.images {
            CliImages::Blocks => ImageStyle::Blocks,
            CliImages::Text => ImageStyle::Text,
        },
    };

    let document = load_document(&cli.paths)?;
    let source = document
        .path
        .as_deref()
        .map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
    tracing::info!(%source, bytes = document.text.len(), "document loaded");

    let force_tui = env::var("MDR_FORCE_TUI").ok().as_deref() == Some("1");
    if !io::stdout().is_terminal() && !force_tui {
        print_preview(&document.text, &render_options)?;
        return Ok(());
    }

    let watch = match (cli.watch, document.path) {
        (true, Some(path)) => Some(path),
        (true, None) => bail!("--watch needs a file argument"),
        (false, _) => None,
    };

    let mut app = App::new(
        document.text,
        AppOptions {
            render: render_options,
            theme: match cli.theme {
                CliTheme::Auto => ThemeChoice::Auto,
                CliTheme::Default => ThemeChoice::Default,
                CliTheme::HighContrast => ThemeChoice::HighContrast,
            },
            no_color: cli.no_color,
            watch,
        },
    )
    .context("error starting the interactive UI")?;
    app.run()
}

/// Help and version displays exit 0; every other parse error exits 1.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    }
}

fn is_version_request(paths: &[PathBuf]) -> bool {
    matches!(paths, [first, ..] if first.as_os_str() == "version")
}

fn load_document(paths: &[PathBuf]) -> Result<Document> {
    match paths {
        [] => {
            if io::stdin().is_terminal() {
                bail!("usage: mdr <file.md>");
            }
            let text = read_source(io::stdin().lock()).context("error while reading STDIN")?;
            Ok(Document { text, path: None })
        }
        [path] => {
            let text = read_source(fs::File::open(path).context("error while reading file")?)
                .context("error while reading file")?;
            let path = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            if let Some(dir) = parent_dir(&path) {
                env::set_current_dir(dir)
                    .with_context(|| format!("error changing directory to {}", dir.display()))?;
            }
            Ok(Document {
                text,
                path: Some(path),
            })
        }
        _ => bail!("only one file is supported"),
    }
}

/// Reads everything, replacing invalid UTF-8 instead of failing.
fn read_source<R: Read>(mut reader: R) -> io::Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|dir| !dir.as_os_str().is_empty())
}

fn print_preview(text: &str, options: &RenderOptions) -> io::Result<()> {
    let width = preview_width_from_env();
    let stdout = io::stdout();
    let lock = stdout.lock();
    print_preview_to(text, width, options, io::BufWriter::new(lock))
}

fn preview_width_from_env() -> u16 {
    env::var("COLUMNS")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .filter(|width| *width > 0)
        .unwrap_or(80)
}

fn print_preview_to<W: Write>(
    text: &str,
    width: u16,
    options: &RenderOptions,
    mut out: W,
) -> io::Result<()> {
    let text_width = usize::from(width).saturating_sub(PADDING).max(1);
    out.write_all(render(text, text_width, PADDING, options).as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    use clap::Parser;
    use mdr_core::RenderOptions;

    use super::{
        Cli, CliImages, is_version_request, load_document, parent_dir, preview_width_from_env,
        print_preview_to, read_source,
    };

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("mdr-main-test-{name}-{nanos}.md"))
    }

    #[test]
    fn preview_width_from_env_handles_valid_invalid_and_missing() {
        let _guard = ENV_LOCK.lock().expect("env lock");

        unsafe { std::env::remove_var("COLUMNS") };
        assert_eq!(preview_width_from_env(), 80);

        unsafe { std::env::set_var("COLUMNS", "120") };
        assert_eq!(preview_width_from_env(), 120);

        unsafe { std::env::set_var("COLUMNS", "oops") };
        assert_eq!(preview_width_from_env(), 80);

        unsafe { std::env::set_var("COLUMNS", "0") };
        assert_eq!(preview_width_from_env(), 80);

        unsafe { std::env::remove_var("COLUMNS") };
    }

    #[test]
    fn parses_flags_and_paths() {
        let cli = Cli::try_parse_from(["mdr", "--images", "text", "--watch", "doc.md"])
            .expect("parse");
        assert_eq!(cli.paths, vec![PathBuf::from("doc.md")]);
        assert_eq!(cli.images, CliImages::Text);
        assert!(cli.watch);

        let cli = Cli::try_parse_from(["mdr"]).expect("parse empty");
        assert!(cli.paths.is_empty());
        assert_eq!(cli.images, CliImages::Blocks);
    }

    #[test]
    fn version_word_is_recognised() {
        assert!(is_version_request(&[PathBuf::from("version")]));
        assert!(!is_version_request(&[PathBuf::from("version.md")]));
        assert!(!is_version_request(&[]));
    }

    #[test]
    fn load_document_rejects_extra_paths_and_missing_files() {
        let err = load_document(&[PathBuf::from("a.md"), PathBuf::from("b.md")])
            .err()
            .expect("two paths");
        assert_eq!(err.to_string(), "only one file is supported");

        let err = load_document(&[temp_path("missing")])
            .err()
            .expect("missing file");
        assert_eq!(err.to_string(), "error while reading file");
    }

    #[test]
    fn load_document_moves_into_the_file_directory() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        let previous = std::env::current_dir().expect("cwd");

        let dir = temp_path("chdir").with_extension("");
        std::fs::create_dir_all(&dir).expect("create dir");
        let file = dir.join("doc.md");
        std::fs::write(&file, "# here\n").expect("write doc");

        let loaded = load_document(std::slice::from_ref(&file));
        let now = std::env::current_dir().expect("cwd after load");
        std::env::set_current_dir(&previous).expect("restore cwd");

        let document = loaded.expect("load");
        let canonical_dir = std::fs::canonicalize(&dir).expect("canonical dir");
        assert_eq!(now, canonical_dir);
        assert_eq!(document.text, "# here\n");
        assert_eq!(document.path, Some(canonical_dir.join("doc.md")));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_source_replaces_invalid_utf8() {
        let text = read_source(&b"ok \xff done"[..]).expect("read");
        assert_eq!(text, "ok \u{fffd} done");
    }

    #[test]
    fn parent_dir_skips_bare_file_names() {
        assert_eq!(parent_dir(Path::new("doc.md")), None);
        assert_eq!(parent_dir(Path::new("docs/doc.md")), Some(Path::new("docs")));
    }

    #[test]
    fn print_preview_to_writes_padded_lines() {
        let mut out = Vec::new();
        print_preview_to("# a\n\nb\n", 80, &RenderOptions::default(), &mut out).expect("print");
        let s = String::from_utf8(out).expect("utf8");
        assert_eq!(s, "    # a\n\n    b\n");

        let mut out2 = Vec::new();
        print_preview_to("", 80, &RenderOptions::default(), &mut out2).expect("print2");
        assert_eq!(String::from_utf8(out2).expect("utf8"), "");
    }

    #[test]
    fn print_preview_to_propagates_write_errors() {
        struct FailWriter;
        impl io::Write for FailWriter {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("write fail"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = print_preview_to("x", 80, &RenderOptions::default(), FailWriter)
            .expect_err("expected write err");
        assert!(err.to_string().contains("write fail"));
    }
}
