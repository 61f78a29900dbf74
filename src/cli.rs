use crate::blueprint::{Blueprint, parse_blueprint};
use crate::config::load_config;
use crate::engine::TalentTree;
use crate::layout::compute_layout;
use crate::layout_dump::{LayoutDump, write_layout_dump};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ttp", version, about = "Talent tree planner: layout and allocation replay")]
pub struct Args {
    /// Blueprint file (JSON or JSON5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the JSON dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file (layout and engine settings)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Override the blueprint's PK budget
    #[arg(long = "total-pk")]
    pub total_pk: Option<u32>,

    /// Node to allocate, in order; repeatable
    #[arg(short = 'a', long = "allocate")]
    pub allocate: Vec<String>,

    /// Node to deallocate after all allocations; repeatable
    #[arg(short = 'd', long = "deallocate")]
    pub deallocate: Vec<String>,

    /// Report the shortest unlock path to this node
    #[arg(short = 'p', long = "path-to")]
    pub path_to: Option<String>,

    /// Only validate the blueprint
    #[arg(long = "check")]
    pub check: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    run_with(args)
}

pub fn run_with(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.total_pk.is_some() {
        config.engine.total_pk = args.total_pk;
    }

    let input = read_input(args.input.as_deref())?;
    let blueprint = parse_blueprint(&input).context("invalid blueprint")?;
    info!(
        paths = blueprint.paths.len(),
        nodes = blueprint.nodes().count(),
        "blueprint loaded"
    );
    if args.check {
        eprintln!("ok: {}", summarize(&blueprint));
        return Ok(());
    }

    let layout = compute_layout(&blueprint, &config.layout)?;
    let mut tree = TalentTree::from_blueprint_with(&blueprint, &config.engine)?;
    tree.apply_layout(&layout);

    for id in &args.allocate {
        if let Err(err) = tree.allocate(id) {
            eprintln!("rejected: {err}");
        }
    }
    for id in &args.deallocate {
        match tree.deallocate(id) {
            Ok(removed) if removed.len() > 1 => {
                eprintln!("removed: {}", removed.join(", "));
            }
            Ok(_) => {}
            Err(err) => eprintln!("rejected: {err}"),
        }
    }

    let mut dump = LayoutDump::from_layout(&layout, &tree);
    if let Some(target) = args.path_to.as_deref() {
        dump = dump.with_unlock_path(&tree, target);
    }
    write_layout_dump(args.output.as_deref(), &dump)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading blueprint {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn summarize(blueprint: &Blueprint) -> String {
    let nodes = blueprint.nodes().count();
    format!(
        "{} path(s), {} node(s), {} PK",
        blueprint.paths.len(),
        nodes,
        blueprint.total_pk
    )
}
