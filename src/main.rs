//! Rep motion classification CLI
//!
//! Trains small dense classifiers on scalar rep metrics and exports them
//! in a quantized format for on-device inference.

use clap::{Parser, Subcommand};
use repnet::tasks::Task;
use repnet::{Config, Result};

#[derive(Parser)]
#[command(name = "repnet")]
#[command(about = "Exercise motion classification from rep metrics", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a classifier and export the quantized model
    Train {
        /// Task to train (rotation or vertical)
        task: Task,
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override batch size
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Classify a rep metric value with the exported model
    Predict {
        /// Task whose model to use
        task: Task,
        /// Rep metric value to classify
        #[arg(allow_negative_numbers = true)]
        value: f32,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show exported model information
    Info {
        /// Task whose model to inspect
        task: Task,
    },
    /// Validate the exported model on the held-out test split
    Validate {
        /// Task whose model to validate
        task: Task,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Train {
            task,
            epochs,
            batch_size,
        } => commands::train(&config, task, epochs, batch_size),
        Commands::Predict {
            task,
            value,
            format,
        } => commands::predict(&config, task, value, format),
        Commands::Model { action } => match action {
            ModelCommands::Info { task } => commands::model_info(&config, task),
            ModelCommands::Validate { task } => commands::model_validate(&config, task),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.data_dir)?;
        std::fs::create_dir_all(&config.data.model_dir)?;
        println!(
            "Created {}/ and {}/ directories",
            config.data.data_dir, config.data.model_dir
        );

        let csv_names: Vec<&str> = Task::ALL.iter().map(|t| t.spec().csv_filename).collect();
        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!(
            "  2. Place {} in {}/",
            csv_names.join(" and "),
            config.data.data_dir
        );
        println!("  3. Run 'repnet train rotation' to train and export a model");
        println!("  4. Run 'repnet predict rotation 12.5' to classify a value");

        Ok(())
    }

    pub fn train(
        config: &Config,
        task: Task,
        epochs: Option<usize>,
        batch_size: Option<usize>,
    ) -> Result<()> {
        use burn::backend::{Autodiff, NdArray};
        use burn::data::dataloader::batcher::Batcher;
        use burn::module::Module;
        use burn::tensor::activation::softmax;
        use burn::tensor::ElementConversion;
        use repnet::data::dataset::{RepBatcher, RepDataset};
        use repnet::data::load_records;
        use repnet::features::LabelEncoder;
        use repnet::model::{RepNet, RepNetConfig};
        use repnet::training::evaluation::argmax_classes;
        use repnet::training::trainer::categorical_cross_entropy;
        use repnet::training::{ClassificationReport, ConfusionMatrix, Trainer};

        type MyBackend = NdArray<f32>;
        type MyAutodiffBackend = Autodiff<MyBackend>;

        let mut training_config = config.clone();
        if let Some(e) = epochs {
            training_config.training.epochs = e;
        }
        if let Some(b) = batch_size {
            training_config.training.batch_size = b;
        }

        let spec = task.spec();
        let csv_path = spec.csv_path(&config.data);

        println!("Initializing {} training...", task);

        let records = load_records(&csv_path, spec.feature_column, spec.label_column)?;
        println!("Loaded {} records from {}", records.len(), csv_path.display());

        println!("\nFirst rows:");
        println!("  {:>12}  {}", spec.feature_column, spec.label_column);
        for record in records.iter().take(5) {
            println!("  {:>12.3}  {}", record.value, record.label);
        }

        let encoder = LabelEncoder::fit(records.iter().map(|r| r.label.as_str()));
        println!(
            "\nClasses ({}): {}",
            encoder.num_classes(),
            encoder.classes().join(", ")
        );

        if encoder.num_classes() < 2 {
            return Err(repnet::RepError::Config(
                "Need at least two distinct labels to train a classifier.".to_string(),
            ));
        }

        // Fixed-seed split so training and validation always see the same partition
        let dataset = RepDataset::from_records(&records, &encoder)?;
        let (train_dataset, test_dataset) = dataset.split_train_test(
            training_config.training.test_split,
            training_config.training.seed,
        );
        let (fit_dataset, val_dataset) =
            train_dataset.split_validation(training_config.training.validation_split);

        println!(
            "\nSplit: {} train / {} validation / {} test",
            fit_dataset.len(),
            val_dataset.len(),
            test_dataset.len()
        );

        if fit_dataset.is_empty() || val_dataset.is_empty() || test_dataset.is_empty() {
            return Err(repnet::RepError::Config(
                "Not enough data for training. Each split needs at least one sample.".to_string(),
            ));
        }

        let device = Default::default();
        let model_config = RepNetConfig::from_model_config(&config.model, encoder.num_classes());
        let model = RepNet::<MyAutodiffBackend>::new(&device, model_config);

        println!(
            "\nModel: 1 -> {} -> {} -> {} ({} parameters)",
            config.model.hidden_dim,
            config.model.hidden_dim,
            encoder.num_classes(),
            model.num_params()
        );

        let trainer = Trainer::new(model, training_config.training.clone(), device.clone());

        println!("\nStarting training...\n");
        let (trained_model, history) = trainer.train(fit_dataset, val_dataset)?;

        println!("\nTraining complete!");
        println!("  Best epoch:     {}", history.best_epoch + 1);
        println!("  Best val loss:  {:.4}", history.best_val_loss);
        println!(
            "  Final accuracy: {:.1}%",
            history.val_accuracies.last().unwrap_or(&0.0) * 100.0
        );

        // Evaluate on the held-out test split
        println!("\nEvaluating on test split...");
        let y_true: Vec<usize> = test_dataset
            .samples()
            .iter()
            .map(|s| s.class_index)
            .collect();

        let test_batcher =
            RepBatcher::<MyAutodiffBackend>::new(device.clone(), encoder.num_classes());
        let test_batch = test_batcher.batch(test_dataset.samples().to_vec(), &device);

        let logits = trained_model.forward(test_batch.values.clone());
        let probs = softmax(logits, 1);
        let test_loss: f32 = categorical_cross_entropy(probs.clone(), test_batch.targets.clone())
            .into_scalar()
            .elem();

        let probs_data = probs.into_data();
        let probs_slice: &[f32] = probs_data.as_slice().unwrap();
        let y_pred = argmax_classes(probs_slice, encoder.num_classes());

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| t == p)
            .count();
        println!("  Test loss:     {:.4}", test_loss);
        println!(
            "  Test accuracy: {:.2}%",
            correct as f64 / y_true.len() as f64 * 100.0
        );

        let matrix = ConfusionMatrix::from_predictions(encoder.classes(), &y_true, &y_pred);
        let report = ClassificationReport::from_matrix(&matrix);
        println!("\n{}", report);
        println!("{}", matrix);

        // Write artifacts
        std::fs::create_dir_all(&config.data.model_dir)?;

        let history_path = spec.history_path(&config.data);
        history.write_csv(&history_path)?;
        println!("Training history written to {}", history_path.display());

        let checkpoint = spec.checkpoint_stem(&config.data);
        trained_model.save(&checkpoint)?;
        println!("Checkpoint saved to {}.mpk", checkpoint.display());

        let quantized = trained_model.quantize();
        let quantized_path = spec.quantized_path(&config.data);
        quantized.save(&quantized_path)?;
        println!(
            "Quantized model saved to {} ({} bytes)",
            quantized_path.display(),
            std::fs::metadata(&quantized_path)?.len()
        );

        let encoder_path = spec.encoder_path(&config.data);
        encoder.save(&encoder_path)?;
        println!("Label encoder saved to {}", encoder_path.display());

        Ok(())
    }

    pub fn predict(config: &Config, task: Task, value: f32, format: OutputFormat) -> Result<()> {
        use repnet::predict::{format_prediction, Predictor};

        let predictor = Predictor::load(task.spec(), &config.data)?;
        let prediction = predictor.predict(value)?;

        match format {
            OutputFormat::Table => {
                print!(
                    "{}",
                    format_prediction(&prediction, value, predictor.encoder().classes())
                );
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "task": task.to_string(),
                    "value": value,
                    "label": prediction.label,
                    "confidence": prediction.confidence,
                    "probabilities": prediction.probabilities,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }

        Ok(())
    }

    pub fn model_info(config: &Config, task: Task) -> Result<()> {
        use repnet::features::LabelEncoder;
        use repnet::model::QuantizedRepNet;

        let spec = task.spec();
        let quantized_path = spec.quantized_path(&config.data);
        if !quantized_path.is_file() {
            return Err(repnet::RepError::NoModel);
        }

        let model = QuantizedRepNet::load(&quantized_path)?;
        let size = std::fs::metadata(&quantized_path)?.len();

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Task:        {}", task);
        println!("  Path:        {}", quantized_path.display());
        println!("  Size:        {} bytes", size);
        println!("  Input dim:   {}", model.input_dim());
        println!("  Classes:     {}", model.num_classes());
        println!("  Trained at:  {}", model.trained_at());
        println!("  Layers:");
        for (i, layer) in model.layers().iter().enumerate() {
            println!(
                "    {}: {} -> {} (scale {:.6})",
                i, layer.in_features, layer.out_features, layer.scale
            );
        }

        let encoder_path = spec.encoder_path(&config.data);
        if encoder_path.is_file() {
            let encoder = LabelEncoder::load(&encoder_path)?;
            println!("  Labels:      {}", encoder.classes().join(", "));
        }

        Ok(())
    }

    pub fn model_validate(config: &Config, task: Task) -> Result<()> {
        use repnet::data::dataset::RepDataset;
        use repnet::data::load_records;
        use repnet::predict::Predictor;
        use repnet::training::{ClassificationReport, ConfusionMatrix};

        let spec = task.spec();
        let predictor = Predictor::load(spec, &config.data)?;

        let csv_path = spec.csv_path(&config.data);
        let records = load_records(&csv_path, spec.feature_column, spec.label_column)?;

        // Same seed as training, so this is the split the model never saw
        let dataset = RepDataset::from_records(&records, predictor.encoder())?;
        let (_train_dataset, test_dataset) =
            dataset.split_train_test(config.training.test_split, config.training.seed);

        if test_dataset.is_empty() {
            return Err(repnet::RepError::Config(
                "Test split is empty. Check the dataset and test_split setting.".to_string(),
            ));
        }

        println!(
            "Validating {} model on {} held-out samples...",
            task,
            test_dataset.len()
        );

        let mut y_true = Vec::with_capacity(test_dataset.len());
        let mut y_pred = Vec::with_capacity(test_dataset.len());
        for sample in test_dataset.samples() {
            let prediction = predictor.predict(sample.value)?;
            y_true.push(sample.class_index);
            y_pred.push(prediction.class_index);
        }

        let matrix =
            ConfusionMatrix::from_predictions(predictor.encoder().classes(), &y_true, &y_pred);
        let report = ClassificationReport::from_matrix(&matrix);

        println!("\n{}", report);
        println!("{}", matrix);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_accepts_negative_values() {
        let cli = Cli::try_parse_from(["repnet", "predict", "vertical", "-0.3"]).unwrap();
        match cli.command {
            Commands::Predict { task, value, .. } => {
                assert_eq!(task, Task::Vertical);
                assert_eq!(value, -0.3);
            }
            _ => panic!("expected the predict command"),
        }
    }
}
