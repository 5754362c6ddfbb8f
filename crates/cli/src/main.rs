use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fhir::Patient;
use phedit_core::{
    age_from_date, date_from_age, derive_document, format_date, precision_for, Clock,
    EditorConfig, FormSnapshot, FormState, SystemClock,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "phedit")]
#[command(about = "Patient record editor CLI")]
struct Cli {
    /// Editor configuration file (YAML); falls back to PHEDIT_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the built-in sample patient
    Sample,
    /// Narrate the age implied by a birth date (YYYY, YYYY-MM or YYYY-MM-DD)
    Age {
        birth_date: String,
        /// Date to measure from (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Birth date implied by an age, at the precision of the units given
    BirthDate {
        #[arg(long, default_value_t = 0)]
        years: u32,
        #[arg(long, default_value_t = 0)]
        months: u32,
        #[arg(long, default_value_t = 0)]
        days: u32,
        /// Date to measure from (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Print the form fields a patient JSON file renders as (YAML)
    Form {
        /// Patient JSON file
        patient: PathBuf,
    },
    /// Derive a patient document from a form snapshot (YAML; quote numeric inputs)
    Derive {
        /// Form snapshot file
        snapshot: PathBuf,
        /// Prior patient JSON whose id and extensions carry over; defaults to the sample
        #[arg(long)]
        prior: Option<PathBuf>,
        /// Date to measure from (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let today = || SystemClock.today();

    match cli.command {
        Some(Commands::Sample) => {
            println!("{}", Patient::render(&Patient::sample())?);
        }
        Some(Commands::Age { birth_date, as_of }) => {
            let narrative = age_from_date(&birth_date, as_of.unwrap_or_else(today)).narrative();
            if narrative.is_empty() {
                eprintln!("Not a date: {}", birth_date);
            } else {
                println!("{}", narrative);
            }
        }
        Some(Commands::BirthDate {
            years,
            months,
            days,
            as_of,
        }) => match date_from_age(years, months, days, as_of.unwrap_or_else(today)) {
            Some(date) => println!("{}", format_date(date, precision_for(years, months, days))),
            None => eprintln!("Age is outside the supported calendar range"),
        },
        Some(Commands::Form { patient }) => {
            let cfg = load_config(cli.config.as_deref())?;
            let resource = Patient::parse(&std::fs::read_to_string(&patient)?)?;
            let form = FormState::from_document(&resource, &cfg);
            print!("{}", serde_yaml::to_string(&form.to_snapshot())?);
        }
        Some(Commands::Derive {
            snapshot,
            prior,
            as_of,
        }) => {
            let cfg = load_config(cli.config.as_deref())?;
            let snapshot_text = std::fs::read_to_string(&snapshot)?;
            let snapshot: FormSnapshot = serde_yaml::from_str(&snapshot_text)?;
            let prior = match prior {
                Some(path) => Patient::parse(&std::fs::read_to_string(path)?)?,
                None => Patient::sample(),
            };

            match FormState::from_snapshot(&snapshot) {
                Ok(form) => {
                    let derived =
                        derive_document(&form, &prior, &cfg, as_of.unwrap_or_else(today));
                    println!("{}", Patient::render(&derived.document)?);
                }
                Err(e) => eprintln!("Error reading form snapshot: {}", e),
            }
        }
        None => {
            println!("Use 'phedit --help' for commands");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig, Box<dyn std::error::Error>> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::var_os("PHEDIT_CONFIG").map(PathBuf::from),
    };
    match path {
        Some(path) => Ok(EditorConfig::from_yaml_str(&std::fs::read_to_string(path)?)?),
        None => Ok(EditorConfig::default()),
    }
}
