//! Amnesia Anchor CLI
//!
//! Creates annotations from text offsets in an XHTML document, stores them
//! in a JSON file, and renders them back as highlights.
//!
//! ```text
//! amnesia-anchor text    <file.xhtml>
//! amnesia-anchor create  <file.xhtml> <start> <end> [--note TEXT] [--color CSS]
//! amnesia-anchor render  <file.xhtml> [--out FILE]
//! amnesia-anchor resolve <file.xhtml>
//! amnesia-anchor delete  <id>
//! ```
//!
//! The store file defaults to `annotations.json` and can be set with
//! `--store FILE` or `ANCHOR_STORE`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amnesia_anchor::annotations::{AnnotationQuery, JsonFileStore};
use amnesia_anchor::{Annotation, AnnotationStore, AnchorConfig, Document, Highlighter, NodeId};

const USAGE: &str = "usage: amnesia-anchor <text|create|render|resolve|delete> [args] [--store FILE]";

/// Parsed command line
struct Args {
    command: String,
    positional: Vec<String>,
    store: PathBuf,
    note: Option<String>,
    color: Option<String>,
    out: Option<PathBuf>,
}

impl Args {
    fn parse(raw: impl Iterator<Item = String>) -> Result<Self> {
        let mut raw = raw.skip(1);
        let command = raw.next().ok_or_else(|| anyhow!(USAGE))?;

        let mut args = Args {
            command,
            positional: Vec::new(),
            store: env::var("ANCHOR_STORE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("annotations.json")),
            note: None,
            color: None,
            out: None,
        };

        while let Some(arg) = raw.next() {
            let mut value = |flag: &str| raw.next().ok_or_else(|| anyhow!("{} needs a value", flag));
            match arg.as_str() {
                "--store" => args.store = PathBuf::from(value("--store")?),
                "--note" => args.note = Some(value("--note")?),
                "--color" => args.color = Some(value("--color")?),
                "--out" => args.out = Some(PathBuf::from(value("--out")?)),
                flag if flag.starts_with("--") => bail!("unknown option {}", flag),
                _ => args.positional.push(arg.clone()),
            }
        }
        Ok(args)
    }

    fn positional(&self, index: usize, name: &str) -> Result<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing <{}>\n{}", name, USAGE))
    }
}

/// Load a document and pick its content root (`<body>` when present)
fn load_document(path: &Path) -> Result<(Document, NodeId, String)> {
    let markup = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let doc = Document::parse(&markup).with_context(|| format!("parsing {}", path.display()))?;
    let root = doc.first_element_by_tag("body").unwrap_or_else(|| doc.root());
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((doc, root, source))
}

fn text(args: &Args) -> Result<()> {
    let (doc, root, _) = load_document(Path::new(args.positional(0, "file")?))?;
    let snapshot = amnesia_anchor::DocumentSnapshot::build(&doc, root);
    for segment in snapshot.segments() {
        let run = snapshot.slice(segment.start, segment.end).unwrap_or_default();
        println!("{:>6}..{:<6} {:?}", segment.start, segment.end, run);
    }
    Ok(())
}

fn create(args: &Args, config: AnchorConfig) -> Result<()> {
    let (doc, root, source) = load_document(Path::new(args.positional(0, "file")?))?;
    let start: usize = args.positional(1, "start")?.parse().context("start must be a number")?;
    let end: usize = args.positional(2, "end")?.parse().context("end must be a number")?;

    let mut highlighter = Highlighter::new(config);
    let target = highlighter.create_target_from_offsets(&doc, root, start, end, &source)?;

    let mut annotation = match &args.note {
        Some(note) => Annotation::new_note(target, note),
        None => Annotation::new_highlight(target),
    };
    if let Some(color) = &args.color {
        annotation = annotation.with_color(color);
    }

    let mut store = JsonFileStore::open(&args.store)?;
    let id = store.save(annotation.clone())?;
    tracing::info!("Created annotation {} in {}", id, store.path().display());
    println!("{}", serde_json::to_string_pretty(&annotation)?);
    Ok(())
}

fn render(args: &Args, config: AnchorConfig, print_markup: bool) -> Result<()> {
    let (mut doc, root, source) = load_document(Path::new(args.positional(0, "file")?))?;
    let store = JsonFileStore::open(&args.store)?;
    let annotations = store.load(&AnnotationQuery::for_source(&source))?;

    let mut highlighter = Highlighter::new(config);
    let report = highlighter.apply(&mut doc, root, &annotations)?;
    tracing::info!("{}: {}", source, report.summary());

    if !print_markup {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    match &args.out {
        Some(out) => fs::write(out, doc.to_markup()).with_context(|| format!("writing {}", out.display()))?,
        None => println!("{}", doc.to_markup()),
    }
    Ok(())
}

fn delete(args: &Args) -> Result<()> {
    let id = args.positional(0, "id")?;
    let mut store = JsonFileStore::open(&args.store)?;
    if !store.delete(id)? {
        bail!("no annotation with id {}", id);
    }
    tracing::info!("Deleted annotation {}", id);
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amnesia_anchor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AnchorConfig::from_env().context("loading configuration")?;

    let args = Args::parse(env::args())?;
    match args.command.as_str() {
        "text" => text(&args),
        "create" => create(&args, config),
        "render" => render(&args, config, true),
        "resolve" => render(&args, config, false),
        "delete" => delete(&args),
        other => bail!("unknown command {}\n{}", other, USAGE),
    }
}
