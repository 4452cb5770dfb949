use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use my_closet::vocab::category_label;
use my_closet::{
    Catalog, CatalogConfig, GarmentFields, GarmentPatch, GarmentRecord, ImageFile, PhotoSource,
};

mod cli;
use cli::{optional_patch, AddArgs, Cli, CoordAddArgs, Commands, EditArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output on stdout stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "my_closet=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config =
        CatalogConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let catalog = Catalog::from_config(&config);
    catalog.open().await.with_context(|| {
        format!(
            "Failed to open catalog at {}. Check permissions and disk space.",
            config.database_path.display()
        )
    })?;

    run(&catalog, cli.command).await?;

    catalog.close().await?;
    Ok(())
}

async fn run(catalog: &Catalog, command: Commands) -> Result<()> {
    match command {
        Commands::Add(args) => add(catalog, args).await,
        Commands::List { category, recent } => {
            let mut garments = match (category, recent) {
                (Some(category), _) => catalog.list_by_category(&category).await?,
                (None, Some(limit)) => catalog.list_recent(limit).await?,
                (None, None) => catalog.list_garments().await?,
            };
            if recent.is_none() {
                garments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }

            if garments.is_empty() {
                println!("No garments yet.");
            }
            for garment in &garments {
                print_summary(garment);
            }
            Ok(())
        }
        Commands::Show { id } => {
            let garment = catalog
                .get_garment(&id)
                .await?
                .with_context(|| format!("No garment with id {id}"))?;
            print_details(&garment);
            Ok(())
        }
        Commands::Edit(args) => edit(catalog, args).await,
        Commands::Delete { id, yes } => {
            if !yes {
                bail!("Refusing to delete {id} without --yes");
            }
            catalog.delete_garment(&id).await?;
            println!("Deleted {id}");
            Ok(())
        }
        Commands::CoordAdd(args) => add_coordinate(catalog, args).await,
        Commands::CoordRm {
            garment_id,
            entry_id,
        } => {
            catalog.remove_coordinate_photo(&garment_id, &entry_id).await?;
            println!("Removed coordinate {entry_id}");
            Ok(())
        }
        Commands::Export { output } => {
            let json = catalog.export_json().await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported catalog to {}", path.display());
                }
                None => println!("{json}"),
            }
            Ok(())
        }
        Commands::Import { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let count = catalog.import_json(&json).await?;
            println!("Imported {count} garments");
            Ok(())
        }
        Commands::Categories => {
            for category in my_closet::vocab::CATEGORIES {
                println!("{:<12} {}", category.value, category.label);
            }
            Ok(())
        }
    }
}

async fn add(catalog: &Catalog, args: AddArgs) -> Result<()> {
    let image = ImageFile::open(&args.image).await?;
    let fields = GarmentFields {
        category: args.category,
        size: args.size,
        color: args.color,
        buy_date: args.buy_date,
        shop: args.shop,
        material: args.material,
        washing: args.washing,
    };

    let id = catalog.add_garment(fields, image).await?;
    println!("{id}");
    Ok(())
}

async fn edit(catalog: &Catalog, args: EditArgs) -> Result<()> {
    let patch = GarmentPatch {
        category: args.category,
        size: args.size,
        color: args.color,
        buy_date: args.buy_date,
        shop: optional_patch(args.shop, args.clear_shop),
        material: optional_patch(args.material, args.clear_material),
        washing: optional_patch(args.washing, args.clear_washing),
        ..GarmentPatch::default()
    };

    if patch.is_empty() && args.image.is_none() {
        bail!("Nothing to change");
    }

    if !patch.is_empty() {
        catalog.update_garment(&args.id, patch).await?;
    }
    if let Some(path) = args.image {
        let image = ImageFile::open(&path).await?;
        catalog.replace_garment_image(&args.id, image).await?;
    }

    println!("Updated {}", args.id);
    Ok(())
}

async fn add_coordinate(catalog: &Catalog, args: CoordAddArgs) -> Result<()> {
    let photo = match (args.photo, args.url) {
        (Some(path), _) => PhotoSource::File(ImageFile::open(&path).await?),
        (None, Some(url)) => PhotoSource::Url(url),
        (None, None) => bail!("Either --photo or --url is required"),
    };
    let date = args.date.unwrap_or_else(|| Utc::now().to_rfc3339());

    let entry = catalog
        .add_coordinate_photo(&args.garment_id, photo, date, args.description)
        .await?;
    println!("{}", entry.id);
    Ok(())
}

fn print_summary(garment: &GarmentRecord) {
    let fields = &garment.fields;
    println!(
        "{}  {:<8} {:<4} {:<6} {}  ({} coordinates)",
        garment.id,
        category_label(&fields.category).unwrap_or(fields.category.as_str()),
        fields.size,
        fields.color,
        fields.buy_date,
        garment.coordinates.len()
    );
}

fn print_details(garment: &GarmentRecord) {
    let fields = &garment.fields;
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("id:        {}", garment.id);
    println!(
        "category:  {} ({})",
        fields.category,
        category_label(&fields.category).unwrap_or("?")
    );
    println!("size:      {}", fields.size);
    println!("color:     {}", fields.color);
    println!("bought:    {}", fields.buy_date);
    println!("shop:      {}", optional(&fields.shop));
    println!("material:  {}", optional(&fields.material));
    println!("washing:   {}", optional(&fields.washing));
    println!("photo:     {} bytes embedded", garment.image_url.len());
    println!("created:   {}", garment.created_at.to_rfc3339());
    println!("updated:   {}", garment.updated_at.to_rfc3339());

    println!("coordinates ({}):", garment.coordinates.len());
    for entry in &garment.coordinates {
        println!(
            "  {}  {}  {}",
            entry.id,
            entry.date,
            entry.description.as_deref().unwrap_or("")
        );
    }
}
