use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use search_deploy::{AppError, Dependencies, Settings};
use search_deploy_pipeline::Orchestrator;

#[derive(Parser)]
#[command(name = "search-deploy")]
#[command(about = "Rebuild and deploy search indices behind an alias", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List indices, marking the deployed one
    Indices,
    /// Delete and rebuild the deployed index from the dataset files
    Recreate,
    /// Create a new dated index with the schema
    CreateIndex {
        /// Also create a river of the same name feeding the new index
        #[arg(long)]
        with_river: bool,
    },
    /// Import the dataset files into an index
    Import {
        /// Index to import into
        index: String,
    },
    /// Point the alias at an index
    Deploy {
        /// Index to deploy
        index: String,
    },
    /// Delete an index that is not deployed
    DeleteIndex {
        /// Index to delete
        index: String,
    },
    /// Apply the schema to the deployed index
    UpdateSchema,
    /// Print the mapping of the deployed index
    Schema,
    /// Print the search service status
    Status,
    /// Print the number of documents behind the alias
    Count,
    /// Delete and recreate the default river
    RecreateRiver,
}

impl Commands {
    fn needs_schema(&self) -> bool {
        matches!(
            self,
            Commands::Recreate | Commands::CreateIndex { .. } | Commands::UpdateSchema
        )
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    let deps = Dependencies::new(&settings, command.needs_schema())?;
    let orchestrator = deps.orchestrator;

    match command {
        Commands::Indices => {
            for index in orchestrator.list_indices().await? {
                let marker = if index.deployed { "*" } else { " " };
                println!("{} {}", marker, index.name);
            }
        }
        Commands::Recreate => {
            let report = orchestrator.recreate_environment().await?;
            for summary in &report.imports {
                println!("{}:", summary.file.display());
                println!("{}", summary);
            }
            match report.document_count {
                Ok(count) => println!("Search docs: {}", count),
                Err(e) => println!("Search docs: {}", e),
            }
        }
        Commands::CreateIndex { with_river } => {
            let name = if with_river {
                orchestrator.create_index_with_river().await?
            } else {
                orchestrator.create_index().await?
            };
            println!("Created index '{}'", name);
        }
        Commands::Import { index } => {
            for summary in orchestrator.import_into(&index).await? {
                println!("{}:", summary.file.display());
                println!("{}", summary);
            }
        }
        Commands::Deploy { index } => deploy(&orchestrator, &index).await?,
        Commands::DeleteIndex { index } => {
            orchestrator.delete_index(&index).await?;
            println!("Deleted index '{}'", index);
        }
        Commands::UpdateSchema => {
            for outcome in orchestrator.update_schema().await? {
                match outcome.result {
                    Ok(()) => println!("Updating schema for '{}': OK", outcome.resource_type),
                    Err(e) => println!("Updating schema for '{}': {}", outcome.resource_type, e),
                }
            }
        }
        Commands::Schema => match orchestrator.search_schema().await {
            Ok(mapping) => println!("{}", mapping),
            Err(e) => println!("{}", e),
        },
        Commands::Status => match orchestrator.service_status().await {
            Ok(status) => println!("{}", status),
            Err(e) => println!("{}", e),
        },
        Commands::Count => match orchestrator.document_count().await {
            Ok(count) => println!("{}", count),
            Err(e) => println!("{}", e),
        },
        Commands::RecreateRiver => {
            if orchestrator.recreate_river().await? {
                println!("Recreated river '{}'", orchestrator.config().alias);
            } else {
                println!("No river configured");
            }
        }
    }

    Ok(())
}

async fn deploy(orchestrator: &Orchestrator, index: &str) -> Result<(), AppError> {
    let report = orchestrator.deploy_index(index).await?;
    info!(index = %report.index, previous = ?report.previous_index, "Deploy complete");

    println!(
        "Alias '{}' now points at '{}'",
        orchestrator.config().alias,
        report.index
    );
    if let Some(orphan) = report.orphaned {
        println!(
            "Index '{}' is no longer deployed; delete it with `search-deploy delete-index {}`",
            orphan, orphan
        );
    }
    Ok(())
}
