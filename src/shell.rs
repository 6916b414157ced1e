use anyhow::Result;
use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use uuid::Uuid;

use crate::error::MockupResult;
use crate::product::{ProductType, PRODUCTS};
use crate::studio::{GenerateReport, Studio};

const HELP: &str = "\
commands:
  products                 list products
  logo <file>              upload a logo image
  toggle <product>         select / unselect a product
  clear                    clear the selection
  generate [instruction]   generate one mockup per selected product
  list                     show the gallery, newest first
  open <n>                 edit gallery image n
  edit <instruction>       apply an edit to the open image
  undo                     step back one edit
  save                     save the edited image as a new gallery entry
  download [n]             write the open image (or gallery image n) to disk
  close                    close the editor without saving
  status                   show logo, selection and editor state
  quit                     leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Products,
    Logo(PathBuf),
    Toggle(ProductType),
    Clear,
    Generate(Option<String>),
    List,
    Open(usize),
    Edit(String),
    Undo,
    Save,
    Download(Option<usize>),
    Close,
    Status,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn parse_index(arg: &str) -> Result<usize, String> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("expected a gallery number (1, 2, ...), got '{}'", arg.trim())),
    }
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let cmd = match word.to_ascii_lowercase().as_str() {
        "help" | "?" => ShellCommand::Help,
        "products" => ShellCommand::Products,
        "logo" if !rest.is_empty() => ShellCommand::Logo(PathBuf::from(rest)),
        "logo" => return Err("usage: logo <file>".into()),
        "toggle" => ShellCommand::Toggle(rest.parse()?),
        "clear" => ShellCommand::Clear,
        "generate" | "gen" => {
            ShellCommand::Generate((!rest.is_empty()).then(|| rest.to_string()))
        }
        "list" | "ls" => ShellCommand::List,
        "open" => ShellCommand::Open(parse_index(rest)?),
        "edit" if !rest.is_empty() => ShellCommand::Edit(rest.to_string()),
        "edit" => return Err("usage: edit <instruction>".into()),
        "undo" => ShellCommand::Undo,
        "save" => ShellCommand::Save,
        "download" | "dl" if rest.is_empty() => ShellCommand::Download(None),
        "download" | "dl" => ShellCommand::Download(Some(parse_index(rest)?)),
        "close" => ShellCommand::Close,
        "status" => ShellCommand::Status,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(cmd))
}

pub fn products_table() -> String {
    let mut out = String::new();
    for p in PRODUCTS.iter() {
        let _ = writeln!(out, "  {} {:<10} {}", p.icon, p.slug, p.label);
    }
    out
}

pub fn format_report(report: &GenerateReport) -> String {
    let mut out = format!("generated {}/{} mockups", report.added.len(), report.requested);
    for f in &report.failures {
        let _ = write!(out, "\n  failed: {} ({})", f.product_type, f.reason);
    }
    if report.has_shortfall() {
        out.push_str("\nwarning: some mockups failed; run generate again to retry");
    }
    out
}

fn gallery_id(studio: &Studio, n: usize) -> Option<Uuid> {
    studio.gallery().at(n - 1).map(|i| i.id)
}

fn status(studio: &Studio) -> String {
    let selected: Vec<&str> = studio.selection().iter().map(|p| p.label()).collect();
    let editor = match studio.editor() {
        Some(s) => format!(
            "{} ({:?}, {} edit(s))",
            s.origin().product_type,
            s.phase(),
            s.versions().len()
        ),
        None => "closed".to_string(),
    };
    format!(
        "logo: {}\nselection: [{}]\ngallery: {} image(s)\neditor: {}",
        if studio.logo().is_some() { "set" } else { "none" },
        selected.join(", "),
        studio.gallery().len(),
        editor
    )
}

fn gallery_listing(studio: &Studio) -> String {
    if studio.gallery().is_empty() {
        return "gallery is empty".to_string();
    }
    let lines: Vec<String> = studio
        .gallery()
        .iter()
        .enumerate()
        .map(|(idx, image)| {
            format!(
                "  {:>2}. {} {:<12} {}  \"{}\"",
                idx + 1,
                image.product_type.icon(),
                image.product_type.label(),
                image.created_at_iso(),
                image.source_prompt
            )
        })
        .collect();
    lines.join("\n")
}

/// Runs one command against the studio and returns the text to show.
async fn dispatch(studio: &mut Studio, cmd: ShellCommand, out_dir: &Path) -> MockupResult<String> {
    let reply = match cmd {
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::Products => products_table(),
        ShellCommand::Logo(path) => {
            studio.upload_logo_file(&path).await?;
            format!("logo set from {}", path.display())
        }
        ShellCommand::Toggle(product) => {
            let on = studio.toggle_product(product);
            format!("{} {}", product, if on { "selected" } else { "unselected" })
        }
        ShellCommand::Clear => {
            studio.clear_selection();
            "selection cleared".to_string()
        }
        ShellCommand::Generate(instruction) => {
            format_report(&studio.generate(instruction.as_deref()).await?)
        }
        ShellCommand::List => gallery_listing(studio),
        ShellCommand::Open(n) => match gallery_id(studio, n) {
            Some(id) => {
                let session = studio.open_editor(id)?;
                format!("editing #{n} ({})", session.origin().product_type)
            }
            None => format!("no gallery image #{n}"),
        },
        ShellCommand::Edit(instruction) => {
            studio.apply_edit(&instruction).await?;
            "edit applied".to_string()
        }
        ShellCommand::Undo => {
            studio.undo_edit()?;
            "reverted one edit".to_string()
        }
        ShellCommand::Save => {
            studio.save_copy()?;
            "saved as #1 in the gallery".to_string()
        }
        ShellCommand::Download(None) => {
            let path = studio.download_current(out_dir).await?;
            format!("wrote {}", path.display())
        }
        ShellCommand::Download(Some(n)) => match gallery_id(studio, n) {
            Some(id) => {
                let path = studio.download_image(id, out_dir).await?;
                format!("wrote {}", path.display())
            }
            None => format!("no gallery image #{n}"),
        },
        ShellCommand::Close => {
            studio.close_editor()?;
            "editor closed, changes discarded".to_string()
        }
        ShellCommand::Status => status(studio),
        ShellCommand::Quit => String::new(),
    };
    Ok(reply)
}

/// Runs one line. Domain errors are reported on `w` and the session goes on.
pub async fn execute_line<W: io::Write>(
    studio: &mut Studio,
    line: &str,
    out_dir: &Path,
    w: &mut W,
) -> Result<Flow> {
    let cmd = match parse_line(line) {
        Ok(Some(cmd)) => cmd,
        Ok(None) => return Ok(Flow::Continue),
        Err(msg) => {
            writeln!(w, "error: {msg}")?;
            return Ok(Flow::Continue);
        }
    };
    debug!(?cmd, "shell command");
    if cmd == ShellCommand::Quit {
        return Ok(Flow::Quit);
    }
    match dispatch(studio, cmd, out_dir).await {
        Ok(reply) => writeln!(w, "{reply}")?,
        Err(e) if e.is_retryable() => writeln!(w, "error: {e} (you can try again)")?,
        Err(e) => writeln!(w, "error: {e}")?,
    }
    Ok(Flow::Continue)
}

pub async fn run_session(studio: &mut Studio, out_dir: &Path) -> Result<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "merch-studio session, type 'help' for commands")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if execute_line(studio, &line, out_dir, &mut stdout).await? == Flow::Quit {
            break;
        }
    }
    Ok(())
}
