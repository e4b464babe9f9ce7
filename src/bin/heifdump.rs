use clap::{ArgAction, Parser};
use heifbox::{
    BoxId, BoxTree, Resource, default_registry, known_boxes::full_name, util::hex_range,
};
use std::fs::File;

#[derive(Parser, Debug)]
#[command(version, about = "ISOBMFF/HEIF box tree explorer")]
struct Args {
    /// MP4/HEIF file path
    path: String,

    /// Print the fully qualified box index instead of the tree
    #[arg(long, action = ArgAction::SetTrue)]
    index: bool,

    /// Hex-dump the payload of the box indexed at PATH[#SEQ] (e.g. meta.iloc or moov.trak#1)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Bytes to dump with --raw (0 means entire payload)
    #[arg(long, default_value_t = 0)]
    bytes: u64,

    /// Limit recursion depth of the tree
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Emit JSON instead of a human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut f = File::open(&args.path)?;
    let len = f.metadata()?.len();
    let registry = default_registry()?;
    let resource = Resource::open(&mut f, len, &registry)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resource.to_json())?);
        return Ok(());
    }

    if let Some(sel) = &args.raw {
        let (path, seq) = parse_selector(sel)?;
        let id = resource
            .index()
            .get(path, seq)
            .ok_or_else(|| anyhow::anyhow!("nothing indexed at {path}#{seq}"))?;
        let hdr = resource.tree().header(id);
        let want = if args.bytes == 0 {
            hdr.payload_len()
        } else {
            args.bytes.min(hdr.payload_len())
        };
        let dump = hex_range(&mut f, len, hdr.payload_offset(), want)?;
        println!(
            "== {path}#{seq} payload: offset={:#x}, len={} ==",
            dump.offset, dump.length
        );
        print!("{}", dump.hex);
        return Ok(());
    }

    if args.index {
        print!("{}", resource.dump_index());
        return Ok(());
    }

    for id in resource.top_level_children().iter() {
        print_box(resource.tree(), id, 0, args.max_depth);
    }
    Ok(())
}

fn print_box(tree: &BoxTree, id: BoxId, depth: usize, max_depth: usize) {
    let indent = "  ".repeat(depth);
    let node = tree.node(id);
    let hdr = &node.hdr;
    let typ = match hdr.uuid {
        Some(u) => format!("uuid:{}", hex::encode(u)),
        None => hdr.typ.to_string(),
    };
    let summary = match node.inline_string() {
        Some(s) if !s.is_empty() => format!(" -> {s}"),
        Some(_) => String::new(),
        None => " (skipped)".to_string(),
    };
    println!(
        "{indent}{:>8} {:>10} {} [{}]{}",
        format!("{:#x}", hdr.start),
        hdr.size,
        typ,
        full_name(hdr.typ),
        summary
    );

    if depth < max_depth {
        if let Some(children) = tree.children(id) {
            for c in children.iter() {
                print_box(tree, c, depth + 1, max_depth);
            }
        }
    }
}

/// `meta.iloc` or `moov.trak#1`.
fn parse_selector(sel: &str) -> anyhow::Result<(&str, usize)> {
    match sel.split_once('#') {
        Some((path, seq)) => Ok((path, seq.parse()?)),
        None => Ok((sel, 0)),
    }
}
