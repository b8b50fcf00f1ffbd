use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    forms::{
        bind_location_picker, submit_delivery, submit_package, DeliveryForm, LocationField,
        PackageForm, PackageOptions, SubmitError,
    },
    location::{
        run_lookup, CoordinatePicker, FixedGeolocation, GeolocationProvider, NoGeolocation,
    },
    pagination::{CollectionSource, PaginatedList, PaginationError},
    AdminClient, RemoteCollection,
};
use shared::domain::{Coordinate, Delivery, Package};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::Mutex,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, parse_coordinate, Settings};

#[derive(Parser, Debug)]
#[command(about = "Package and delivery admin client")]
struct Args {
    /// Overrides `api_url` from settings.
    #[arg(long)]
    api_url: Option<String>,
    /// Page size for list views.
    #[arg(long)]
    limit: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ListKind {
    Packages,
    Deliveries,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of packages.
    Packages {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Print one page of deliveries.
    Deliveries {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Page through a list interactively (n/p/r/q).
    Browse {
        #[arg(value_enum)]
        kind: ListKind,
    },
    CreatePackage(CreatePackageArgs),
    CreateDelivery {
        /// Omit to print the selectable packages.
        #[arg(long)]
        package_id: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct CreatePackageArgs {
    #[arg(long)]
    description: String,
    /// Grams.
    #[arg(long)]
    weight: f64,
    /// Centimetres.
    #[arg(long)]
    width: f64,
    #[arg(long)]
    height: f64,
    #[arg(long)]
    depth: f64,
    #[arg(long)]
    from_name: String,
    #[arg(long)]
    from_address: String,
    /// Map pick as "lat,lng".
    #[arg(long, value_parser = coordinate_arg)]
    from: Option<Coordinate>,
    #[arg(long)]
    to_name: String,
    #[arg(long)]
    to_address: String,
    #[arg(long, value_parser = coordinate_arg)]
    to: Option<Coordinate>,
}

fn coordinate_arg(raw: &str) -> std::result::Result<Coordinate, String> {
    parse_coordinate(raw).ok_or_else(|| format!("expected \"lat,lng\", got {raw:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings();
    if let Some(api_url) = args.api_url.clone() {
        settings.api_url = api_url;
    }
    if let Some(limit) = args.limit.filter(|limit| *limit > 0) {
        settings.page_limit = limit;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = Arc::new(
        AdminClient::new(&settings.api_url)
            .with_context(|| format!("invalid api url '{}'", settings.api_url))?,
    );
    info!(api_url = %client.api_url(), "admin client ready");

    match args.command {
        Command::Packages { page } => {
            let list = PaginatedList::new(
                Arc::new(RemoteCollection::packages(Arc::clone(&client))),
                settings.page_limit,
            );
            print_page(&list, page, "Package list", render::package_row).await
        }
        Command::Deliveries { page } => {
            let list = PaginatedList::new(
                Arc::new(RemoteCollection::deliveries(Arc::clone(&client))),
                settings.page_limit,
            );
            print_page(&list, page, "Delivery list", render::delivery_row).await
        }
        Command::Browse { kind } => match kind {
            ListKind::Packages => {
                let list = PaginatedList::new(
                    Arc::new(RemoteCollection::<Package>::packages(Arc::clone(&client))),
                    settings.page_limit,
                );
                browse(&list, "Package list", render::package_row).await
            }
            ListKind::Deliveries => {
                let list = PaginatedList::new(
                    Arc::new(RemoteCollection::<Delivery>::deliveries(Arc::clone(&client))),
                    settings.page_limit,
                );
                browse(&list, "Delivery list", render::delivery_row).await
            }
        },
        Command::CreatePackage(package) => create_package(&client, &settings, package).await,
        Command::CreateDelivery { package_id } => create_delivery(&client, package_id).await,
    }
}

async fn print_page<T, S>(
    list: &PaginatedList<T, S>,
    page: u32,
    title: &str,
    row: fn(&T) -> String,
) -> Result<()>
where
    T: Send + 'static,
    S: CollectionSource<T> + 'static,
{
    list.set_page(page).await?;
    if let Some(task) = list.mount().await {
        task.await.context("list fetch task failed")?;
    }
    let out = list
        .with_view(|controller| render::list_card(title, &controller.presentation(), row))
        .await;
    print!("{out}");
    Ok(())
}

async fn browse<T, S>(list: &PaginatedList<T, S>, title: &str, row: fn(&T) -> String) -> Result<()>
where
    T: Send + 'static,
    S: CollectionSource<T> + 'static,
{
    let mut task = list.mount().await;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if let Some(pending) = task.take() {
            pending.await.context("list fetch task failed")?;
        }
        let out = list
            .with_view(|controller| render::list_card(title, &controller.presentation(), row))
            .await;
        print!("{out}");
        println!("> n: next  p: previous  r: refresh  q: quit");

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let step = match line.trim() {
            "n" => list.next_page().await,
            "p" => list.previous_page().await,
            "r" => Ok(list.refetch().await),
            "q" => return Ok(()),
            other => {
                println!("unknown command {other:?}");
                Ok(None)
            }
        };
        match step {
            Ok(next) => task = next,
            Err(err @ (PaginationError::NoNextPage | PaginationError::NoPreviousPage)) => {
                println!("{err}");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn geolocation(settings: &Settings) -> Arc<dyn GeolocationProvider> {
    match settings.device_location {
        Some(estimate) => Arc::new(FixedGeolocation(estimate)),
        None => Arc::new(NoGeolocation),
    }
}

/// Drives one picker the way a user would: open the map, let the device
/// lookup recenter it, click the requested point, close.
async fn pick_location(
    picker: CoordinatePicker,
    provider: &dyn GeolocationProvider,
    pick: Option<Coordinate>,
) {
    let picker = Mutex::new(picker.with_geolocation(provider.is_available()));
    let ticket = {
        let mut guard = picker.lock().await;
        guard.mount();
        guard.open()
    };
    if let Some(ticket) = ticket {
        run_lookup(&picker, provider, ticket).await;
    }

    let mut guard = picker.lock().await;
    if let Some(modal) = guard.modal() {
        info!(field = guard.name(), center = %modal.center(), "map picker centered");
    }
    if let Some(point) = pick {
        guard.place_marker(point);
    }
    guard.close();
    println!("{}", render::picker_fields(&guard));
}

async fn create_package(
    client: &AdminClient,
    settings: &Settings,
    args: CreatePackageArgs,
) -> Result<()> {
    let form = Arc::new(StdMutex::new(PackageForm::new()));
    {
        let mut draft = form.lock().map_err(|_| anyhow!("package form lock poisoned"))?;
        draft.description = args.description;
        draft.weight = args.weight;
        draft.width = args.width;
        draft.height = args.height;
        draft.depth = args.depth;
        draft.from_name = args.from_name;
        draft.from_address = args.from_address;
        draft.to_name = args.to_name;
        draft.to_address = args.to_address;
    }

    let provider = geolocation(settings);
    for (field, pick) in [(LocationField::From, args.from), (LocationField::To, args.to)] {
        pick_location(bind_location_picker(&form, field), provider.as_ref(), pick).await;
    }

    let mut draft = form
        .lock()
        .map_err(|_| anyhow!("package form lock poisoned"))?
        .clone();
    report_submission(submit_package(client, &mut draft).await)
}

async fn create_delivery(client: &AdminClient, package_id: Option<String>) -> Result<()> {
    let mut form = DeliveryForm::new();
    println!("package: {}", form.placeholder());
    form.load_packages(client).await;

    match form.options() {
        PackageOptions::Loaded(options) if package_id.is_none() => {
            println!("{}", form.placeholder());
            for option in options {
                println!("  {}  {}", option.value, option.label);
            }
        }
        PackageOptions::Failed(reason) => warn!("package options unavailable: {reason}"),
        _ => {}
    }

    form.package_id = package_id.unwrap_or_default();
    report_submission(submit_delivery(client, &mut form).await)
}

fn report_submission(outcome: std::result::Result<&'static str, SubmitError>) -> Result<()> {
    match outcome {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(SubmitError::Invalid(errors)) => {
            for (field, message) in errors.iter() {
                eprintln!("{field}: {message}");
            }
            Err(anyhow!("form is invalid"))
        }
        Err(err @ SubmitError::Client(_)) => {
            let alert = err.alert_message().unwrap_or_default();
            Err(anyhow::Error::new(err).context(alert))
        }
    }
}
