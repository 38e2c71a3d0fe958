use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use screenflow::{
    Config, DocumentSource, FileDocumentSource, FlowSession, HttpDocumentSource, HttpImageLoader,
    ImagePreloader, LinkHint, Navigation, ScreenFlowRuntime, ScreenRoute, SourceLocation,
    Subscription,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to read configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("screenflow=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match config.source.clone() {
        SourceLocation::Http(base) => explore(HttpDocumentSource::new(base), &config).await,
        SourceLocation::Directory(dir) => explore(FileDocumentSource::new(dir), &config).await,
    }
}

async fn explore<S: DocumentSource>(source: S, config: &Config) -> Result<()> {
    let preloader = ImagePreloader::with_settings(HttpImageLoader::default(), config.preload);
    let session = FlowSession::new(ScreenFlowRuntime::new(source), preloader);
    let runtime = session.runtime();
    let _watchers = watch_selection(runtime);

    println!("--- Screen Flow Explorer ---");
    load(runtime, config.version).await;
    println!("Commands: select <id>, toggle <id>, route <path>, unselect, zoom in|out, hints, unreachable, reload [version], quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            ["select", id] => match id.parse() {
                Ok(id) if runtime.select_screen_id(id) => {}
                Ok(id) => println!("[Runtime] Screen {} is not reachable in this flow.", id),
                Err(_) => println!("[Runtime] Not a screen id: {}", id),
            },
            ["toggle", id] => {
                let node = id
                    .parse()
                    .ok()
                    .and_then(|id| runtime.snapshot().find_node(id).cloned());
                match node {
                    Some(node) => navigate(runtime, runtime.toggle_tree_node(&node)),
                    None => println!("[Runtime] No such screen: {}", id),
                }
            }
            ["route", path] => {
                let navigation = runtime.apply_route(&ScreenRoute::parse(path));
                navigate(runtime, navigation);
            }
            ["unselect"] => runtime.unselect_tree_node(),
            ["zoom", "in"] => runtime.zoom_in(),
            ["zoom", "out"] => runtime.zoom_out(),
            ["hints"] => print_hints(runtime),
            ["unreachable"] => print_unreachable(runtime),
            ["reload"] => load(runtime, config.version).await,
            ["reload", version] => match version.parse() {
                Ok(version) => load(runtime, version).await,
                Err(_) => println!("[Runtime] Not a version: {}", version),
            },
            _ => println!("Unknown command: {}", line.trim()),
        }
    }

    println!(
        "[Preloader] {} images warmed this session.",
        session.preloader().loader().cached_count()
    );
    Ok(())
}

async fn load<S: DocumentSource>(runtime: &ScreenFlowRuntime<S>, version: u32) {
    println!("[Runtime] Loading flow version {}...", version);
    if let Err(e) = runtime.load(version).await {
        println!("[Runtime] Failed: {}", e);
        return;
    }

    let state = runtime.snapshot();
    if let (Some(project), Some(orientation)) = (&state.project, state.project_orientation) {
        println!("[Runtime] Project: {} (#{}, {})", project.name, project.id, orientation);
    }
    println!(
        "[Runtime] {} reachable screens, {} unreachable screens.",
        state.reachable_screen_count, state.unreachable_screen_count
    );
}

/// Follows a navigation request the way a router would: by applying the route.
fn navigate<S: DocumentSource>(runtime: &ScreenFlowRuntime<S>, navigation: Navigation) {
    if let Some(route) = navigation.route() {
        println!("[Router] -> {}", route.path());
        if runtime.apply_route(&route) == Navigation::ToFlow {
            println!("[Router] -> {}", ScreenRoute::flow().path());
        }
    }
}

fn watch_selection<S: DocumentSource>(runtime: &ScreenFlowRuntime<S>) -> Vec<Subscription> {
    vec![
        runtime.watch_selected_node(|node| match node {
            Some(node) => println!(
                "[Runtime] Selected screen {} \"{}\" ({}x{}, {} hotspots)",
                node.id,
                node.screen.name,
                node.screen.width,
                node.screen.height,
                node.hotspots().len()
            ),
            None => println!("[Runtime] No screen selected."),
        }),
        runtime.watch_related_image_urls(|urls| {
            for url in urls.iter() {
                println!("[Preloader] Linked image: {}", url);
            }
        }),
        runtime.watch_screen_size(|size| println!("[Runtime] Screen size: {}", size)),
    ]
}

fn print_hints<S: DocumentSource>(runtime: &ScreenFlowRuntime<S>) {
    let state = runtime.snapshot();
    let Some(node) = &state.selected_node else {
        println!("[Runtime] Select a screen first.");
        return;
    };

    let mut hints: Vec<_> = node.link_hints().into_iter().collect();
    hints.sort_by_key(|(id, _)| *id);
    for (id, hint) in hints {
        let kind = match hint {
            LinkHint::Hard => "hard",
            LinkHint::Soft => "soft",
        };
        println!("  {} -> {} ({})", node.id, id, kind);
    }
}

fn print_unreachable<S: DocumentSource>(runtime: &ScreenFlowRuntime<S>) {
    let state = runtime.snapshot();
    let Some(tree) = &state.tree else {
        println!("[Runtime] No flow loaded.");
        return;
    };

    for node in &tree.unreachable {
        println!("  #{} {}", node.id, node.screen.name);
    }
}
