use clap::{ArgAction, Parser};
use heifbox::{Resource, default_registry};
use std::fs::{self, File};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Export HEIF item payloads to files")]
struct Args {
    /// HEIF file path
    path: String,

    /// Output directory (created if missing)
    #[arg(long, short, default_value = ".")]
    out: PathBuf,

    /// Only export this item id
    #[arg(long, conflicts_with = "primary")]
    item: Option<u32>,

    /// Only export the primary item
    #[arg(long, action = ArgAction::SetTrue)]
    primary: bool,

    /// Write each extent to its own file instead of concatenating
    #[arg(long, action = ArgAction::SetTrue)]
    extents: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut f = File::open(&args.path)?;
    let len = f.metadata()?.len();
    let registry = default_registry()?;
    let resource = Resource::open(&mut f, len, &registry)?;
    let extractor = resource.extractor()?;

    fs::create_dir_all(&args.out)?;

    let selected = if args.primary {
        Some(resource.primary_item_id()?)
    } else {
        args.item
    };

    let written = match selected {
        Some(id) if args.extents => extractor.write_extents(&mut f, id, &args.out)?,
        Some(id) => {
            let path = args.out.join(extractor.file_name(id, None)?);
            let mut out = File::create(&path)?;
            extractor.write_item(&mut f, id, &mut out)?;
            vec![path]
        }
        None if args.extents => {
            let mut all = Vec::new();
            for item in extractor.iloc().items() {
                all.extend(extractor.write_extents(&mut f, item.item_id, &args.out)?);
            }
            all
        }
        None => extractor.write(&mut f, &args.out)?,
    };

    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
