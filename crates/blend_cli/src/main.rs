use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use blend_core::{
    format_mass, round_mass, BasisMode, BlendSession, ComponentSet, ExportFormat, MassLine,
    RatioEdit, SessionCommand, SessionEvent, CSV_FILE_NAME,
};
use blend_recipe::{load_recipe, save_recipe, starter_recipe};
use clap::{Args, Parser, Subcommand};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "blend_cli", about = "Blend ratio calculator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute per-component masses for a blend.
    Calc(CalcArgs),
    /// Write a starter recipe file.
    Init {
        #[arg(long, default_value = "recipe.json")]
        output: PathBuf,
        #[arg(long, default_value = "blend")]
        name: String,
    },
}

#[derive(Args)]
struct CalcArgs {
    /// Load components, basis, and target mass from a recipe JSON file.
    #[arg(long, conflicts_with = "components")]
    recipe: Option<PathBuf>,
    /// Component as NAME=RATIO. Repeat in blend order.
    #[arg(long = "component", value_parser = parse_component_arg)]
    components: Vec<(String, String)>,
    /// Match the target mass against the blend total.
    #[arg(long, conflicts_with = "basis")]
    total: bool,
    /// Match the target mass against the component at this index.
    #[arg(long)]
    basis: Option<usize>,
    /// Target mass in grams.
    #[arg(long)]
    mass: Option<String>,
    /// Print results as JSON.
    #[arg(long)]
    json: bool,
    /// Write results as CSV (default file name: blend.csv).
    #[arg(long, num_args = 0..=1, default_missing_value = CSV_FILE_NAME)]
    export: Option<PathBuf>,
    /// Quote names containing delimiters in the CSV export.
    #[arg(long, requires = "export")]
    escape: bool,
}

fn parse_component_arg(arg: &str) -> Result<(String, String), String> {
    let (name, ratio) = arg
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=RATIO, got '{arg}'"))?;
    Ok((name.to_string(), ratio.to_string()))
}

// ---------------------------------------------------------------------------
// Session setup
// ---------------------------------------------------------------------------

fn build_session(recipe: Option<&Path>, components: &[(String, String)]) -> Result<BlendSession> {
    if let Some(path) = recipe {
        return Ok(load_recipe(path)?.into_session());
    }
    if components.is_empty() {
        return Ok(BlendSession::new());
    }
    let mut session = BlendSession::with_components(ComponentSet::new());
    for (name, ratio) in components {
        let SessionEvent::ComponentAdded { index, .. } = session.apply(SessionCommand::AddComponent)
        else {
            bail!("could not add component '{name}'");
        };
        session.apply(SessionCommand::RenameComponent {
            index,
            name: name.clone(),
        });
        let event = session.apply(SessionCommand::SetRatio {
            index,
            value: ratio.clone(),
        });
        if let SessionEvent::RatioChanged {
            edit: RatioEdit::CoercedToZero { reason },
            ..
        } = event
        {
            eprintln!("warning: component '{name}' ratio '{ratio}' treated as 0 ({reason})");
        }
    }
    Ok(session)
}

fn apply_overrides(
    session: &mut BlendSession,
    total: bool,
    basis: Option<usize>,
    mass: Option<String>,
) -> Result<()> {
    if total {
        session.apply(SessionCommand::SelectBasisMode {
            mode: BasisMode::Total,
        });
    }
    if let Some(index) = basis {
        session.apply(SessionCommand::SelectBasisMode {
            mode: BasisMode::Component,
        });
        if let SessionEvent::CommandIgnored { error } =
            session.apply(SessionCommand::SelectBasisComponent { index })
        {
            bail!("--basis {index}: {error}");
        }
    }
    if let Some(value) = mass {
        session.apply(SessionCommand::SetTargetMass { value });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Calc
// ---------------------------------------------------------------------------

fn calculate(session: &mut BlendSession) -> Result<Vec<MassLine>> {
    match session.apply(SessionCommand::Calculate) {
        SessionEvent::Calculated { results } => Ok(results),
        SessionEvent::CalculationSkipped { reason } => bail!("nothing to calculate: {reason}"),
        other => bail!("unexpected calculation outcome: {other:?}"),
    }
}

fn print_results(session: &BlendSession, results: &[MassLine]) {
    let basis = match session.basis_mode() {
        BasisMode::Component => {
            let name = session
                .components()
                .get(session.selected_index())
                .map_or("?", |c| c.name.as_str());
            format!("component '{name}'")
        }
        BasisMode::Total => "total".to_string(),
    };
    println!(
        "Blend: components={} total_ratio={} basis={basis} target={}g",
        session.components().len(),
        session.components().total_ratio(),
        session.target_mass().trim(),
    );
    println!("{}", "-".repeat(40));

    let width = results
        .iter()
        .map(|line| line.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Component".len());
    println!("{:<width$}  {:>10}", "Component", "Mass (g)");
    for line in results {
        println!("{:<width$}  {:>10}", line.name, format_mass(line.mass));
    }

    let sum: f64 = results.iter().map(|line| line.mass).sum();
    println!("{}", "-".repeat(40));
    println!("{:<width$}  {:>10}", "Sum", format_mass(round_mass(sum)));
}

fn write_export(session: &BlendSession, path: &Path, escape: bool) -> Result<()> {
    let format = if escape {
        ExportFormat::Escaped
    } else {
        ExportFormat::Plain
    };
    let Some(export) = session.export(format).context("rendering CSV")? else {
        bail!("no results to export");
    };
    if export.is_corrupted() {
        eprintln!(
            "warning: rows {:?} have names containing delimiters; rerun with --escape to quote them",
            export.ambiguous_rows
        );
    }
    std::fs::write(path, &export.body)
        .with_context(|| format!("writing export: {}", path.display()))?;
    println!("Exported {} rows to {}", session.results().len(), path.display());
    Ok(())
}

fn calc(args: CalcArgs) -> Result<()> {
    let mut session = build_session(args.recipe.as_deref(), &args.components)?;
    apply_overrides(&mut session, args.total, args.basis, args.mass)?;
    let results = calculate(&mut session)?;

    if args.json {
        let out = serde_json::to_string_pretty(&results).context("serializing results")?;
        println!("{out}");
    } else {
        print_results(&session, &results);
    }

    if let Some(path) = args.export {
        write_export(&session, &path, args.escape)?;
    }
    Ok(())
}

fn init(output: &Path, name: String) -> Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    let mut recipe = starter_recipe();
    recipe.name = name;
    save_recipe(output, &recipe)?;
    println!("Wrote starter recipe to {}", output.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Calc(args) => calc(args),
        Commands::Init { output, name } => init(&output, name),
    }
}
