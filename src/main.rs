use clap::Parser;
use log::info;
use quote_anchor::config::RcLoader;
use quote_anchor::controller::{Dispatcher, HighlightController, Request};
use quote_anchor::document_model::{DocumentTree, NodeTree, PinId};
use quote_anchor::view::{RenderParams, View};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "quote-anchor",
    version,
    about = "Re-locate a captured quote in a document and highlight it"
)]
struct Cli {
    /// Plain text document; blank lines separate paragraphs
    #[arg(required_unless_present = "sample_rc")]
    document: Option<PathBuf>,

    /// Quote to locate and highlight
    #[arg(short, long, conflicts_with = "clipboard")]
    quote: Option<String>,

    /// Read the quote from the system clipboard
    #[arg(long)]
    clipboard: bool,

    /// Pin the quote under this id instead of flashing it
    #[arg(long)]
    pin: Option<String>,

    /// Highlight category
    #[arg(short, long)]
    category: Option<String>,

    /// JSON lines file of requests to replay after the quote
    #[arg(short, long)]
    requests: Option<PathBuf>,

    /// Settings file (defaults to ./.anchorrc, then ~/.anchorrc)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bracket highlights instead of colouring them
    #[arg(long)]
    plain: bool,

    /// Wrap width used to position revealed highlights
    #[arg(long)]
    width: Option<usize>,

    /// Print a sample .anchorrc and exit
    #[arg(long)]
    sample_rc: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.sample_rc {
        print!("{}", RcLoader::generate_sample_rc());
        return Ok(());
    }
    let Some(document) = cli.document else {
        return Err("no document given".into());
    };

    let config = match &cli.config {
        Some(path) => RcLoader::load_from_path(path)?,
        None => RcLoader::load_config(),
    };

    let content = fs::read_to_string(&document)?;
    let tree = NodeTree::from_text(&content);
    info!("loaded {} with {} leaves", document.display(), tree.leaves().len());
    let mut dispatcher = Dispatcher::new(
        HighlightController::with_config(tree, &config),
        config.emphasis,
    );

    let quote = if cli.clipboard {
        Some(arboard::Clipboard::new()?.get_text()?)
    } else {
        cli.quote
    };

    if let Some(text) = quote {
        let request = match cli.pin {
            Some(pin_id) => Request::PinHighlight {
                text,
                category: cli.category,
                pin_id: PinId::new(pin_id),
            },
            None => Request::HighlightAndScroll {
                text,
                category: cli.category,
                flash: None,
            },
        };
        let response = dispatcher.handle(request);
        if let Some(error) = &response.error {
            eprintln!("Highlight failed: {error}");
        } else if response.found != Some(true) {
            eprintln!("Quote not found");
        }
    }

    if let Some(path) = &cli.requests {
        for line in fs::read_to_string(path)?.lines() {
            if line.trim().is_empty() {
                continue;
            }
            println!("{}", dispatcher.handle_json(line));
        }
    }

    let mut view = View::from_config(&config);
    let width = match cli.width {
        Some(width) => width,
        None => crossterm::terminal::size().map_or(80, |(columns, _)| usize::from(columns)),
    };
    view.set_width(width);

    let reveal = dispatcher.take_reveal();
    let controller = dispatcher.controller();
    if let Some(reveal) = &reveal {
        if let Some(row) = view.reveal_line(controller.tree(), reveal.marker) {
            eprintln!("Match at row {}", row + 1);
        }
    }

    let params = RenderParams {
        reveal: reveal.as_ref(),
        plain: cli.plain,
    };
    view.print(&view.render(controller.tree(), &params))?;

    Ok(())
}
