//! `neonaop` - select NEON survey plots and fetch the AOP tiles covering them.

use clap::{Parser, Subcommand};
use neonaop_api::{AopRequest, Downloader, ProductRequest};
use neonaop_runner::commands::{available_dates, fetch_product, fetch_tiles, load_plot_table, select_sites, tile_groups};
use neonaop_runner::{init_tracing, RunnerConfig, RunnerError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "neonaop")]
#[command(author, version, about = "Select NEON plots and fetch AOP tiles and tabular products")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `neonaop_api=trace` (default: RUST_LOG, then info)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Data portal API root
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the tile grouping of each site's plots as JSON
    Plots {
        /// Site codes, e.g. BART TEAK
        #[arg(long, num_args = 1.., required = true)]
        sites: Vec<String>,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// List the months in which a product has data at a site
    Dates {
        /// Product ID, e.g. DP3.30006.001
        #[arg(long)]
        product: String,
        /// Site code
        #[arg(long)]
        site: String,
    },
    /// Download the AOP tiles covering each site's plots and write a tile list
    Aop {
        /// Site codes
        #[arg(long, num_args = 1.., required = true)]
        sites: Vec<String>,
        /// AOP product IDs
        #[arg(long, num_args = 1.., required = true)]
        products: Vec<String>,
        /// YYYY-MM months bounding the fetch (default: most recent)
        #[arg(long, num_args = 1..)]
        dates: Option<Vec<String>>,
        /// Download directory
        #[arg(long)]
        save_dir: Option<PathBuf>,
        /// Tile list directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Copy to the iRODS data store as this user instead of saving locally
        #[arg(long)]
        irods_user: Option<String>,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Download and extract every package of a tabular product
    Product {
        /// Product ID, e.g. DP1.10098.001
        #[arg(long)]
        product: String,
        /// Site codes, or `all`
        #[arg(long, num_args = 1.., default_value = "all")]
        sites: Vec<String>,
        /// First month, YYYY-MM
        #[arg(long)]
        start: Option<String>,
        /// Last month, YYYY-MM
        #[arg(long)]
        end: Option<String>,
        /// basic or expanded
        #[arg(long, default_value = "basic")]
        package: String,
        /// Download and extraction directory
        #[arg(long)]
        save_dir: Option<PathBuf>,
        /// Load CSV tables and print a summary
        #[arg(long)]
        load_tables: bool,
    },
}

#[derive(clap::Args, Debug)]
struct SelectionArgs {
    /// Local plot table (.dbf or .csv) instead of the published archive
    #[arg(long)]
    plots_file: Option<PathBuf>,
    /// Keep plots near tile edges
    #[arg(long)]
    keep_boundary: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RunnerError> {
    let mut config = RunnerConfig::load_or_default(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    match cli.command {
        Commands::Plots { sites, selection } => {
            if selection.keep_boundary {
                config.cull_boundary_plots = false;
            }
            let table = load_plot_table(&config, selection.plots_file.as_deref())?;
            let groups = tile_groups(select_sites(&config, &table, &sites));
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
        Commands::Dates { product, site } => {
            let catalog = config.catalog()?;
            for window in available_dates(&catalog, &product, &site)? {
                println!("{}", window);
            }
        }
        Commands::Aop {
            sites,
            products,
            dates,
            save_dir,
            output_dir,
            irods_user,
            selection,
        } => {
            if selection.keep_boundary {
                config.cull_boundary_plots = false;
            }
            if let Some(dir) = save_dir {
                config.save_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }

            let table = load_plot_table(&config, selection.plots_file.as_deref())?;
            let groups = tile_groups(select_sites(&config, &table, &sites));
            let catalog = config.catalog()?;
            let downloader: Box<dyn Downloader> = if irods_user.is_some() {
                Box::new(config.irods_downloader()?)
            } else {
                Box::new(config.local_downloader()?)
            };
            let request = AopRequest {
                sites,
                products,
                dates,
                save_dir: config.save_dir.clone(),
                credentials: irods_user,
            };
            let (listing, path) = fetch_tiles(&config, &catalog, downloader.as_ref(), &groups, &request)?;
            println!("{} files listed in {}", listing.len(), path.display());
        }
        Commands::Product {
            product,
            sites,
            start,
            end,
            package,
            save_dir,
            load_tables,
        } => {
            if let Some(dir) = save_dir {
                config.save_dir = dir;
            }
            let catalog = config.catalog()?;
            let downloader = config.local_downloader()?;
            let request = ProductRequest {
                product,
                sites,
                start,
                end,
                package,
                save_dir: config.save_dir.clone(),
                load_tables,
            };
            let download = fetch_product(&catalog, &downloader, &request)?;
            println!(
                "{} files downloaded, {} packages extracted",
                download.files.len(),
                download.extractions.len()
            );
            for (name, table) in &download.tables {
                println!("{}\t{} rows\t{} columns", name, table.len(), table.headers().len());
            }
        }
    }
    Ok(())
}
