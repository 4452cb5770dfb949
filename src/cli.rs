use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use my_closet::vocab;

#[derive(Parser, Debug)]
#[command(name = "my-closet")]
#[command(version, about = "Catalog your clothes and the outfits you wear them in")]
pub struct Cli {
    /// Config file (TOML). Defaults to $MY_CLOSET_CONFIG if set.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a garment with its photo
    Add(AddArgs),
    /// List garments
    List {
        /// Only garments in this category
        #[arg(long, value_parser = category_parser())]
        category: Option<String>,
        /// Only the N most recently added garments
        #[arg(long, conflicts_with = "category")]
        recent: Option<usize>,
    },
    /// Show one garment and its coordinates
    Show {
        id: String,
    },
    /// Change fields of a garment
    Edit(EditArgs),
    /// Delete a garment
    Delete {
        id: String,
        /// Confirm the delete
        #[arg(long)]
        yes: bool,
    },
    /// Attach an outfit photo to a garment
    CoordAdd(CoordAddArgs),
    /// Remove an outfit photo from a garment
    CoordRm {
        garment_id: String,
        entry_id: String,
    },
    /// Write the whole catalog as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load garments from a JSON export
    Import {
        file: PathBuf,
    },
    /// List known categories
    Categories,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Photo of the garment (JPEG, PNG or WebP)
    #[arg(short, long)]
    pub image: PathBuf,
    #[arg(long, value_parser = category_parser())]
    pub category: String,
    #[arg(long, value_parser = PossibleValuesParser::new(vocab::SIZES.iter().copied()))]
    pub size: String,
    #[arg(long, value_parser = PossibleValuesParser::new(vocab::COLORS.iter().copied()))]
    pub color: String,
    /// Purchase date, e.g. 2024-01-01
    #[arg(long)]
    pub buy_date: String,
    #[arg(long)]
    pub shop: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(vocab::MATERIALS.iter().copied()))]
    pub material: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(vocab::WASHING_METHODS.iter().copied()))]
    pub washing: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,
    /// New photo
    #[arg(short, long)]
    pub image: Option<PathBuf>,
    #[arg(long, value_parser = category_parser())]
    pub category: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(vocab::SIZES.iter().copied()))]
    pub size: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(vocab::COLORS.iter().copied()))]
    pub color: Option<String>,
    #[arg(long)]
    pub buy_date: Option<String>,
    #[arg(long, conflicts_with = "clear_shop")]
    pub shop: Option<String>,
    #[arg(
        long,
        value_parser = PossibleValuesParser::new(vocab::MATERIALS.iter().copied()),
        conflicts_with = "clear_material"
    )]
    pub material: Option<String>,
    #[arg(
        long,
        value_parser = PossibleValuesParser::new(vocab::WASHING_METHODS.iter().copied()),
        conflicts_with = "clear_washing"
    )]
    pub washing: Option<String>,
    #[arg(long)]
    pub clear_shop: bool,
    #[arg(long)]
    pub clear_material: bool,
    #[arg(long)]
    pub clear_washing: bool,
}

#[derive(Args, Debug)]
pub struct CoordAddArgs {
    pub garment_id: String,
    /// Outfit photo file
    #[arg(long, conflicts_with = "url", required_unless_present = "url")]
    pub photo: Option<PathBuf>,
    /// Outfit photo URL, stored as-is
    #[arg(long)]
    pub url: Option<String>,
    /// When the outfit was worn (defaults to now)
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

fn category_parser() -> PossibleValuesParser {
    PossibleValuesParser::new(vocab::CATEGORIES.iter().map(|c| c.value))
}

/// Turn a `--x` / `--clear-x` pair into a patch field
pub fn optional_patch(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_rejects_unknown_category() {
        let result = Cli::try_parse_from([
            "my-closet", "add", "--image", "a.jpg", "--category", "capes", "--size", "M",
            "--color", "블랙", "--buy-date", "2024-01-01",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_coord_add_needs_photo_or_url() {
        assert!(Cli::try_parse_from(["my-closet", "coord-add", "g1"]).is_err());
        let parsed = Cli::try_parse_from(["my-closet", "coord-add", "g1", "--url", "https://x/y.jpg"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_optional_patch() {
        assert_eq!(optional_patch(None, false), None);
        assert_eq!(optional_patch(Some("A".into()), false), Some(Some("A".into())));
        assert_eq!(optional_patch(None, true), Some(None));
    }
}
