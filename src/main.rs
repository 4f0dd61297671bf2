use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stormworks_mesh::ParseOptions;
use stormworks_mesh::config::ExportConfig;
use stormworks_mesh::convert;
use stormworks_mesh::obj::NameMode;

#[derive(Parser)]
#[command(name = "swmesh", author, version, about = "Convert Stormworks mesh, physics and animation files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of a .mesh, .phys or .anim file
    Inspect {
        input: PathBuf,
        /// Skip magic, reserved-field and count checks
        #[arg(long)]
        lenient: bool,
    },
    /// Convert a .mesh, .phys or .anim file to OBJ
    ToObj {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        lenient: bool,
    },
    /// Pack an OBJ file into a .mesh file
    ObjToMesh {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, value_enum)]
        name_mode: Option<NameMode>,
        /// JSON export settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Pack an OBJ file into a .phys file
    ObjToPhys {
        input: PathBuf,
        output: PathBuf,
        /// Keep all triangles in one sub mesh instead of splitting by grid cell
        #[arg(long)]
        no_grid: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn parse_options(lenient: bool) -> ParseOptions {
    if lenient { ParseOptions::lenient() } else { ParseOptions::strict() }
}

fn load_config(path: Option<&PathBuf>) -> stormworks_mesh::Result<ExportConfig> {
    match path {
        Some(path) => ExportConfig::load(path),
        None => Ok(ExportConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let start = Utc::now();
    match cli.command {
        Commands::Inspect { input, lenient } => {
            let asset = convert::inspect_file(&input, parse_options(lenient))?;
            print!("{}", asset);
        }
        Commands::ToObj { input, output, lenient } => {
            tracing::info!("converting {:?} -> {:?}", input, output);
            let asset = convert::file_to_obj(&input, &output, parse_options(lenient))?;
            tracing::info!("wrote {} as obj", asset.kind().extension());
        }
        Commands::ObjToMesh { input, output, name_mode, config } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(mode) = name_mode {
                config.name_mode = mode;
            }
            tracing::info!("converting {:?} -> {:?}", input, output);
            convert::obj_file_to_mesh(&input, &output, &config)?;
        }
        Commands::ObjToPhys { input, output, no_grid, config } => {
            let mut config = load_config(config.as_ref())?;
            if no_grid {
                config.divide_grid = false;
            }
            tracing::info!("converting {:?} -> {:?}", input, output);
            convert::obj_file_to_physics(&input, &output, &config)?;
        }
    }
    let elapsed = Utc::now().signed_duration_since(start);
    tracing::info!("done in {} ms", elapsed.num_milliseconds());
    Ok(())
}
