use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::product::ProductType;

/// Put a logo on products with an image model, then refine the mockups.
#[derive(Parser, Debug)]
#[command(name = "merch-studio", version, about = "Logo-to-product mockup generator")]
pub struct CliArgs {
    /// Overrides the configured model id.
    #[arg(long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Per-request timeout; by default requests wait for the service.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available products.
    Products,

    /// Generate one mockup per product and write them to disk.
    Generate {
        #[arg(short, long, value_name = "FILE")]
        logo: PathBuf,

        /// Repeat for several products (slug or label, e.g. `mug`, `"Tote Bag"`).
        #[arg(short, long = "product", required = true, num_args = 1..)]
        products: Vec<ProductType>,

        /// Extra instruction appended to every prompt.
        #[arg(short, long)]
        instruction: Option<String>,

        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Apply edits to an existing mockup, in order, and write the result.
    Edit {
        #[arg(long, value_name = "FILE")]
        image: PathBuf,

        /// Product the image shows; used for the output name.
        #[arg(short, long)]
        product: ProductType,

        #[arg(short, long = "instruction", required = true, num_args = 1..)]
        instructions: Vec<String>,

        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Save defaults to settings.json; `--model` and `--timeout` are saved too.
    Config {
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,

        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Interactive session over stdin (type `help`).
    Session {
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn generate_accepts_repeated_products() {
        let args = CliArgs::try_parse_from([
            "merch-studio",
            "generate",
            "--logo",
            "logo.png",
            "-p",
            "mug",
            "-p",
            "Tote Bag",
            "--timeout",
            "30",
        ])
        .unwrap();
        assert_eq!(args.timeout, Some(30));
        match args.command {
            Command::Generate { products, logo, .. } => {
                assert_eq!(products, vec![ProductType::Mug, ProductType::ToteBag]);
                assert_eq!(logo, PathBuf::from("logo.png"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_picks_up_global_flags() {
        let args = CliArgs::try_parse_from([
            "merch-studio",
            "config",
            "--api-key",
            "abc",
            "--model",
            "other-model",
        ])
        .unwrap();
        assert_eq!(args.model.as_deref(), Some("other-model"));
        assert!(matches!(args.command, Command::Config { api_key: Some(ref k), .. } if k == "abc"));
    }

    #[test]
    fn unknown_product_is_a_parse_error() {
        let res = CliArgs::try_parse_from(["merch-studio", "generate", "--logo", "l.png", "-p", "sock"]);
        assert!(res.is_err());
    }
}
