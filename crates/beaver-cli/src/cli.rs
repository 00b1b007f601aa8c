use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "beaver",
    about = "Beaver: resolve and synthesize missing operations from declarative rulebooks",
    version
)]
pub struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging (repeat for more detail)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors (wins over --verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Call operations on one fresh instance, resolving missing ones through rules
    Call {
        /// Path to a `.toml` or `.json` rulebook
        rulebook: String,

        /// Class to instantiate
        class: String,

        /// Operations to call in order: `name` or `name:<json array of args>`
        #[arg(required = true)]
        operations: Vec<String>,
    },

    /// Ask whether an instance would answer each operation, without installing anything
    Probe {
        /// Path to a `.toml` or `.json` rulebook
        rulebook: String,

        /// Class to instantiate
        class: String,

        /// Operation names to probe
        #[arg(required = true)]
        operations: Vec<String>,
    },

    /// List the classes a rulebook declares with their rules and native operations
    Inspect {
        /// Path to a `.toml` or `.json` rulebook
        rulebook: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "beaver", "call", "book.toml", "Record", "get_x", "set_x:[1]", "--json", "-vv",
        ])
        .expect("arguments should parse");
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Call {
                rulebook,
                class,
                operations,
            } => {
                assert_eq!(rulebook, "book.toml");
                assert_eq!(class, "Record");
                assert_eq!(operations, vec!["get_x", "set_x:[1]"]);
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn call_requires_an_operation() {
        assert!(Cli::try_parse_from(["beaver", "call", "book.toml", "Record"]).is_err());
    }
}
