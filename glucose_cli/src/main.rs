use clap::{Parser, Subcommand, ValueEnum};
use glucose_core::*;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bgsim")]
#[command(about = "What-if blood glucose simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate BG over time for a set of doses and meals
    Simulate {
        /// Starting BG (mg/dL); defaults to the config value
        #[arg(long)]
        bg: Option<f64>,

        /// Insulin bolus as UNITS[@MINUTE], repeatable
        #[arg(long, value_parser = parse_timed)]
        insulin: Vec<(f64, f64)>,

        /// Carbohydrate as GRAMS[@MINUTE], repeatable
        #[arg(long, value_parser = parse_timed)]
        carbs: Vec<(f64, f64)>,

        /// Add a random meal from this category at minute 0
        #[arg(long, value_parser = parse_category)]
        meal: Option<MealCategory>,

        /// Number of foods in the random meal
        #[arg(long, default_value_t = 1)]
        meal_count: usize,

        /// Seed for reproducible meal selection
        #[arg(long)]
        seed: Option<u64>,

        /// Minutes to simulate; defaults to the config value
        #[arg(long)]
        horizon: Option<f64>,

        /// Minutes per step; defaults to the config value
        #[arg(long)]
        step: Option<f64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Summary)]
        format: Format,

        /// Write CSV or JSON output to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Recommend a correction bolus
    Correct {
        /// Current BG (mg/dL)
        #[arg(long)]
        bg: f64,

        /// Target BG (mg/dL); defaults to the patient profile
        #[arg(long)]
        target: Option<f64>,

        /// Correction factor (mg/dL per unit); defaults to the insulin sensitivity
        #[arg(long)]
        cf: Option<f64>,

        /// Insulin on board (U)
        #[arg(long, default_value_t = 0.0)]
        iob: f64,
    },

    /// List random foods for a meal
    Meals {
        #[arg(long, value_parser = parse_category)]
        category: MealCategory,

        #[arg(long, default_value_t = scenario::DEFAULT_MEAL_COUNT)]
        count: usize,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Summary,
    Json,
    Csv,
}

fn parse_timed(s: &str) -> std::result::Result<(f64, f64), String> {
    let (amount, minute) = match s.split_once('@') {
        Some((a, m)) => (a, m),
        None => (s, "0"),
    };
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount: {}", amount))?;
    let minute: f64 = minute
        .trim()
        .parse()
        .map_err(|_| format!("invalid minute: {}", minute))?;
    Ok((amount, minute))
}

fn parse_category(s: &str) -> std::result::Result<MealCategory, String> {
    s.parse()
}

fn main() -> Result<()> {
    glucose_core::logging::init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Simulate {
            bg,
            insulin,
            carbs,
            meal,
            meal_count,
            seed,
            horizon,
            step,
            format,
            output,
        } => {
            let mut events = Vec::new();
            for (units, minute) in insulin {
                events.push(DoseEvent::insulin(units, minute, config.insulin)?);
            }
            let shape = CurveShape::from(config.simulation.carb_curve);
            for (grams, minute) in carbs {
                let segment =
                    AbsorptionSegment::new(grams, 0.0, CarbSpeed::Medium.duration(), shape)?;
                events.push(DoseEvent::carbs(minute, vec![segment])?);
            }
            if let Some(category) = meal {
                for food in pick_foods(category, meal_count, seed) {
                    announce_meal(food, format);
                    events.extend(food.events(0.0, shape)?);
                }
            }

            tracing::debug!("Simulating {} dose events", events.len());

            let params = SimulationParams::from_config(&config)
                .with_step_size(step.unwrap_or(config.simulation.step_minutes));
            let horizon = horizon.unwrap_or(config.simulation.horizon_minutes);
            // A report needs at least one simulated step after the initial state
            if horizon.is_nan() || horizon < params.step_size {
                return Err(Error::InvalidInput(format!(
                    "horizon ({} min) must cover at least one step of {} min",
                    horizon, params.step_size
                )));
            }
            let trajectory = simulate(
                bg.unwrap_or(config.simulation.initial_bg),
                &events,
                horizon,
                &params,
            )?;
            cmd_report(&trajectory, &config, format, output)
        }
        Commands::Correct {
            bg,
            target,
            cf,
            iob,
        } => {
            let units = recommend_correction(
                bg,
                target.unwrap_or(config.patient.target_bg),
                cf.unwrap_or(config.patient.insulin_sensitivity),
                iob,
            )?;
            println!("Recommended correction: {:.2} U", units);
            Ok(())
        }
        Commands::Meals {
            category,
            count,
            seed,
        } => {
            for food in pick_foods(category, count, seed) {
                display_food(food);
            }
            Ok(())
        }
    }
}

fn pick_foods(category: MealCategory, count: usize, seed: Option<u64>) -> Vec<&'static Food> {
    match seed {
        Some(seed) => ScenarioGenerator::seeded(seed).random_foods(category, count),
        None => ScenarioGenerator::from_entropy().random_foods(category, count),
    }
}

/// Meal picks are only echoed for human-readable output
fn announce_meal(food: &Food, format: Format) {
    if let Format::Summary = format {
        println!("Meal: {} {} ({} g carbs)", food.emoji, food.name, food.absorbed_carbs());
    }
}

fn display_food(food: &Food) {
    let calories = food.calories();
    println!("{} {} [{}]", food.emoji, food.name, food.id);
    println!(
        "    {} g carbs, {} g protein, {} g fat, {:.0} kcal",
        food.nutrition.carbs, food.nutrition.protein, food.nutrition.fat, calories.sum
    );
}

#[derive(serde::Serialize)]
struct Report<'a> {
    summary: &'a Summary,
    recommended_correction: f64,
    trajectory: &'a Trajectory,
}

fn cmd_report(
    trajectory: &Trajectory,
    config: &Config,
    format: Format,
    output: Option<PathBuf>,
) -> Result<()> {
    let summary = summarize(trajectory)?;
    let last = trajectory
        .last()
        .ok_or_else(|| Error::InsufficientData("empty trajectory".into()))?;
    let correction = recommend_correction(
        last.bg,
        config.patient.target_bg,
        config.patient.insulin_sensitivity,
        last.insulin_on_board,
    )?;

    match format {
        Format::Summary => {
            display_summary(&summary, last);
            println!("  Correction now: {:.2} U", correction);
        }
        Format::Json => {
            let report = Report {
                summary: &summary,
                recommended_correction: correction,
                trajectory,
            };
            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    serde_json::to_writer_pretty(file, &report)?;
                }
                None => {
                    serde_json::to_writer_pretty(io::stdout().lock(), &report)?;
                    println!();
                }
            }
        }
        Format::Csv => match output {
            Some(path) => CsvSink::create(&path)?.write(trajectory)?,
            None => CsvSink::new(io::stdout().lock()).write(trajectory)?,
        },
    }

    Ok(())
}

fn display_summary(summary: &Summary, last: &SimulationState) {
    let tir = &summary.time_in_range;
    println!();
    println!("  Final BG:   {:.0} mg/dL at {} min", last.bg, last.time);
    println!("  Mean BG:    {} mg/dL (sd {})", summary.mean, summary.std_dev);
    println!("  Range:      {} - {} mg/dL", summary.min, summary.max);
    println!("  IOB / COB:  {:.2} U / {:.0} g", last.insulin_on_board, last.carbs_on_board);
    println!();
    println!("  Time in range");
    println!("    very high  {:>5}%", tir.very_high);
    println!("    high       {:>5}%", tir.high);
    println!("    in range   {:>5}%", tir.in_range);
    println!("    low        {:>5}%", tir.low);
    println!("    very low   {:>5}%", tir.very_low);
}
