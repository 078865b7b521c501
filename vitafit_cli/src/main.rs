use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use vitafit_core::normalizer::{height_to_cm, weight_to_kg};
use vitafit_core::*;

#[derive(Parser)]
#[command(name = "vitafit")]
#[command(about = "Exercise and diet plan predictions from user biometrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override models directory
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(clap::Args)]
struct BodyArgs {
    /// Height value
    #[arg(long)]
    height: f64,

    /// Height unit (cm, inches, feet)
    #[arg(long, default_value = "cm")]
    height_unit: String,

    /// Weight value
    #[arg(long)]
    weight: f64,

    /// Weight unit (kg, lbs)
    #[arg(long, default_value = "kg")]
    weight_unit: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict an exercise (and diet) plan for one person
    Predict {
        #[arg(long)]
        age: u32,

        /// male or female
        #[arg(long)]
        gender: String,

        #[command(flatten)]
        body: BodyArgs,

        /// Daily calorie intake
        #[arg(long)]
        calories: u32,
    },

    /// Predict plans for every row of a CSV file
    Batch {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Compute canonical height, weight and BMI without running the models
    Bmi {
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Write the built-in reference models to a directory
    DemoModels {
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => return report_error(&e, cli.json),
    };
    // keep stderr parseable when errors are reported as JSON
    let level = if cli.json { "warn" } else { config.logging.level.as_str() };
    vitafit_core::logging::init_with_level(level);

    let models_dir = cli
        .models_dir
        .clone()
        .unwrap_or_else(|| config.models.dir.clone());

    tracing::debug!("Config: {:?}", config);

    let result = match cli.command {
        Commands::Predict {
            age,
            gender,
            body,
            calories,
        } => {
            let input = UserInput {
                age,
                gender,
                height_value: body.height,
                height_unit: body.height_unit.parse().unwrap_or(HeightUnit::Unrecognized),
                weight_value: body.weight,
                weight_unit: body.weight_unit.parse().unwrap_or(WeightUnit::Unrecognized),
                calories_intake: calories,
            };
            cmd_predict(models_dir, config.models.lazy_reload, input, cli.json)
        }
        Commands::Batch { input, output } => cmd_batch(models_dir, input, output),
        Commands::Bmi { body } => cmd_bmi(body, cli.json),
        Commands::DemoModels { out } => cmd_demo_models(out),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e, cli.json),
    }
}

fn report_error(err: &Error, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string(&err.report()) {
            Ok(line) => eprintln!("{}", line),
            Err(_) => eprintln!("{}: {}", err.kind(), err),
        }
    } else {
        eprintln!("{}: {}", err.kind(), err);
    }

    if err.is_client_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn start_service(models_dir: PathBuf, lazy_reload: bool) -> Result<PredictionService<DirectorySource>> {
    tracing::debug!("Using models directory {:?}", models_dir);
    let service =
        PredictionService::new(DirectorySource::new(models_dir)).with_lazy_reload(lazy_reload);
    service.start()?;
    Ok(service)
}

fn cmd_predict(models_dir: PathBuf, lazy_reload: bool, input: UserInput, json: bool) -> Result<()> {
    let service = start_service(models_dir, lazy_reload)?;
    let record = service.predict_record(&input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    display_record(&record);
    Ok(())
}

fn cmd_batch(models_dir: PathBuf, input: PathBuf, output: PathBuf) -> Result<()> {
    let service = start_service(models_dir, false)?;
    let summary = vitafit_core::batch::run_batch_files(service.registry()?, &input, &output)?;

    println!(
        "✓ Predicted {} rows ({} failed)",
        summary.rows - summary.failed,
        summary.failed
    );
    println!("  Output: {}", output.display());
    Ok(())
}

fn cmd_bmi(body: BodyArgs, json: bool) -> Result<()> {
    let height_unit: HeightUnit = body.height_unit.parse().unwrap_or(HeightUnit::Unrecognized);
    let weight_unit: WeightUnit = body.weight_unit.parse().unwrap_or(WeightUnit::Unrecognized);

    if !(body.height > 0.0 && body.weight > 0.0) {
        return Err(Error::InvalidInput(
            "height and weight must be positive".into(),
        ));
    }

    let height_cm = height_to_cm(body.height, height_unit);
    let weight_kg = weight_to_kg(body.weight, weight_unit);
    let bmi = vitafit_core::normalizer::compute_bmi(height_cm, weight_kg);

    if json {
        let value = serde_json::json!({
            "height_cm": height_cm,
            "weight_kg": weight_kg,
            "bmi": bmi,
        });
        println!("{}", value);
        return Ok(());
    }

    println!("  Height: {:.2} cm", height_cm);
    println!("  Weight: {:.2} kg", weight_kg);
    match bmi {
        Some(bmi) => println!("  BMI:    {:.2}", bmi),
        None => println!("  BMI:    (unrecognized unit)"),
    }
    Ok(())
}

fn cmd_demo_models(out: PathBuf) -> Result<()> {
    tracing::info!("Writing demo models to {:?}", out);
    vitafit_core::demo::demo_artifacts().save_dir(&out)?;
    println!("✓ Wrote demo models to {}", out.display());
    Ok(())
}

fn display_record(record: &PredictionRecord) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  FITNESS PLAN");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Session: {}", record.session_id);
    if let Some(bmi) = record.processed_features.bmi {
        println!("  BMI: {:.2}", bmi);
    }
    println!();

    for (label, value) in record.summary_rows() {
        println!("  {:<24} {}", format!("{}:", label), value);
    }

    println!();
}
