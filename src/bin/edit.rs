//! `bencode-edit`, selector-driven inspection and mutation of a
//! decoded bencoded tree.
use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use bencode_tools::bencode::{self, Value};
use bencode_tools::emit;
use bencode_tools::select::{self, Selector};
use bencode_tools::write;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect or mutate a decoded bencoded tree")]
struct Args {
    /// The bencoded file to read (and, if a mutator is given, rewrite).
    file: PathBuf,

    /// Selector expression. Empty (the default) selects the root.
    #[arg(long)]
    select: Option<String>,

    /// Set the selected location to an integer value.
    #[arg(long)]
    set_integer: Option<i64>,

    /// Display (not store) --set-integer's value, or the selected
    /// integer in atom mode, as an ISO-8601 UTC timestamp.
    #[arg(long)]
    timestamp: bool,

    /// Set the selected location to a string value.
    #[arg(long)]
    set_string: Option<String>,

    /// Set the selected location to an empty dictionary.
    #[arg(long)]
    create_dict: bool,

    /// Set the selected location to an empty list.
    #[arg(long)]
    create_list: bool,

    /// Remove the selected location.
    #[arg(long)]
    remove: bool,

    /// Where to write the mutated tree. Defaults to overwriting `file`.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the selected value as JSON instead of the pretty form.
    #[arg(long)]
    json: bool,

    /// Print the selected value as a raw atom instead of the pretty form.
    #[arg(long)]
    atom: bool,
}

enum Mutator {
    SetInteger(i64),
    SetString(String),
    CreateDict,
    CreateList,
    Remove,
}

fn mutator_from_args(args: &Args) -> Result<Option<Mutator>> {
    let candidates = [
        args.set_integer.is_some(),
        args.set_string.is_some(),
        args.create_dict,
        args.create_list,
        args.remove,
    ];
    if candidates.iter().filter(|&&present| present).count() > 1 {
        bail!("--set-integer, --set-string, --create-dict, --create-list, and --remove are mutually exclusive");
    }
    if (args.json || args.atom) && candidates.iter().any(|&present| present) {
        bail!("mutators are mutually exclusive with --json/--atom");
    }

    if let Some(n) = args.set_integer {
        Ok(Some(Mutator::SetInteger(n)))
    } else if let Some(s) = &args.set_string {
        Ok(Some(Mutator::SetString(s.clone())))
    } else if args.create_dict {
        Ok(Some(Mutator::CreateDict))
    } else if args.create_list {
        Ok(Some(Mutator::CreateList))
    } else if args.remove {
        Ok(Some(Mutator::Remove))
    } else {
        Ok(None)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let selector = Selector::parse(args.select.as_deref().unwrap_or(""));
    let mutator = mutator_from_args(&args)?;

    let bytes =
        std::fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let mut tree = bencode::decode(&bytes).context("decoding bencoded tree")?;

    match mutator {
        Some(Mutator::Remove) if selector.is_null() => {
            write::unlink(&args.file).context("removing source file")?;
        }
        Some(mutator) => {
            apply_mutation(&mut tree, &selector, mutator)?;
            let output = args.output.clone().unwrap_or_else(|| args.file.clone());
            write::write_atomic(&output, &tree)
                .with_context(|| format!("writing {}", output.display()))?;
        }
        None => {
            let selected = select::select(&tree, &selector).context("resolving selector")?;
            print_selected(selected, &args)?;
        }
    }

    Ok(())
}

/// Applies `mutator` at `selector` within `tree`. The null-selector
/// remove case is handled by the caller (it unlinks the source file
/// instead of producing a new tree) and never reaches here.
fn apply_mutation(tree: &mut Value, selector: &Selector, mutator: Mutator) -> Result<()> {
    if selector.is_null() {
        match mutator {
            Mutator::Remove => unreachable!("caller handles null-selector remove"),
            Mutator::SetInteger(n) => *tree = Value::Integer(n),
            Mutator::SetString(s) => *tree = Value::Bytes(s.into_bytes()),
            Mutator::CreateDict => *tree = Value::Dict(BTreeMap::new()),
            Mutator::CreateList => *tree = Value::List(Vec::new()),
        }
        return Ok(());
    }

    match mutator {
        Mutator::Remove => select::delete(tree, selector).context("deleting selected value")?,
        Mutator::SetInteger(n) => {
            select::set(tree, selector, Value::Integer(n)).context("setting selected value")?
        }
        Mutator::SetString(s) => select::set(tree, selector, Value::Bytes(s.into_bytes()))
            .context("setting selected value")?,
        Mutator::CreateDict => select::set(tree, selector, Value::Dict(BTreeMap::new()))
            .context("setting selected value")?,
        Mutator::CreateList => select::set(tree, selector, Value::List(Vec::new()))
            .context("setting selected value")?,
    }
    Ok(())
}

fn print_selected(value: &Value, args: &Args) -> Result<()> {
    if args.json {
        let json = emit::to_json(value).map_err(anyhow::Error::from)?;
        println!("{json}");
    } else if args.atom {
        let bytes = emit::emit_atom(value, args.timestamp).map_err(anyhow::Error::from)?;
        use std::io::Write;
        std::io::stdout().write_all(&bytes)?;
    } else {
        println!("{}", emit::pretty_print(value));
    }
    Ok(())
}
