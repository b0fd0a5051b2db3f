//! End-to-end run: load, encode, train, evaluate, plot.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;

use crate::config::FoodConfig;
use crate::data::{load_dataset, shuffle_split, OneHotEncoder};
use crate::error::{Error, Result};
use crate::evaluation::{self, argmax_rows, ConfusionMatrix, Evaluation};
use crate::logging;
use crate::neural::GruClassifier;
use crate::plot;
use crate::report::format_significant;
use crate::training::{
    fit, ConsoleProgress, FitReport, Granularity, JsonProgress, TrainingCallback, TrainingHistory,
};

pub const HISTORY_PLOT: &str = "training_epoch.svg";
pub const CONFUSION_PLOT: &str = "confusion_matrix.svg";

/// Everything a run produced besides the files it wrote.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub fit: FitReport,
    pub test: Evaluation,
    pub confusion: ConfusionMatrix,
    #[serde(skip)]
    pub history: TrainingHistory,
}

/// Runs the whole pipeline for `config`.
///
/// Any failure aborts the run; log write failures only print a warning.
pub fn run(config: &FoodConfig) -> Result<RunReport> {
    config.validate()?;

    println!("\nCreating dataset...");
    let dataset = load_dataset(&config.data.train_files, &config.data.test_files)?;
    let class_count = config.class_count();

    // The encoder learns its categories from training labels only.
    let encoder = OneHotEncoder::fit(&dataset.train.labels)?;
    if encoder.category_count() != class_count {
        return Err(Error::data(format!(
            "training labels cover {} classes but {class_count} are configured",
            encoder.category_count()
        )));
    }
    let input_shape = dataset.train.example_shape();
    let train = encoder.encode_split(dataset.train)?;
    let test = encoder.encode_split(dataset.test)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let train = shuffle_split(&train, &mut rng);

    println!("Build RNN Model:");
    let mut model = GruClassifier::build(&config.model, input_shape, class_count, &mut rng)?;
    println!("{}", model.summary());
    logging::record(
        "model_built",
        &json!({
            "input_shape": [input_shape.0, input_shape.1],
            "classes": class_count,
            "parameters": model.parameter_count(),
            "model": &config.model,
            "training": &config.training,
        }),
    );

    let mut history = TrainingHistory::new();
    let mut console = ConsoleProgress::new();
    let mut json_progress = JsonProgress;
    let mut callbacks: [&mut dyn TrainingCallback; 3] =
        [&mut history, &mut console, &mut json_progress];
    let fit_report = fit(
        &mut model,
        &train.features,
        &train.one_hot,
        &config.training,
        &mut callbacks,
        &mut rng,
    )?;

    println!("Test:");
    let test_result = evaluation::evaluate(
        &model,
        &test.features,
        &test.one_hot,
        config.training.batch_size,
    )?;
    println!(
        "Test Score:{}",
        format_significant(f64::from(test_result.loss), 3)
    );
    println!(
        "Test accuracy:{}",
        format_significant(f64::from(test_result.accuracy), 3)
    );
    logging::record("evaluation", &test_result);

    let plot_dir = &config.output.plot_dir;
    plot::plot_history(&history, Granularity::Epoch, plot_dir.join(HISTORY_PLOT))?;

    let probabilities = evaluation::predict(&model, &test.features, config.training.batch_size)?;
    let predicted = argmax_rows(&probabilities);
    let truth = argmax_rows(&test.one_hot);
    let confusion = ConfusionMatrix::from_predictions(&truth, &predicted, class_count)?;

    let normalize = config.output.normalize_confusion;
    if normalize {
        println!("Normalized confusion matrix");
        println!("{}", confusion.display_normalized());
    } else {
        println!("Confusion matrix, without normalization");
        println!("{confusion}");
    }
    plot::plot_confusion_matrix(
        &confusion,
        &config.data.class_names,
        normalize,
        "Confusion Matrix",
        plot_dir.join(CONFUSION_PLOT),
    )?;

    Ok(RunReport {
        fit: fit_report,
        test: test_result,
        confusion,
        history,
    })
}
