use std::path::PathBuf;

use clap::Parser;

use vocab_audio::{
    audio::WavEditor,
    config::{PipelineConfig, PipelineConfigBuilder},
    engines::espeak::EspeakSynthesizer,
    pipeline::Pipeline,
};

/// Pause used when neither the command line nor a config file sets one.
const CLI_DEFAULT_DELAY_SECS: u64 = 2;

/// Turn a word/translation list into one narrated audio file.
#[derive(Parser, Debug)]
#[command(name = "vocab-audio", version, about)]
struct Cli {
    /// Translation file, one `word<delimiter>translation` per line
    #[arg(default_value = "translations.txt")]
    input: PathBuf,

    /// JSON config file; command line options override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Separator between word and translation, and between language codes
    #[arg(short, long)]
    delimiter: Option<String>,

    /// Source and target language codes, e.g. `en:ru`
    #[arg(short, long)]
    languages: Option<String>,

    /// Pause between pairs, in seconds
    #[arg(long)]
    delay: Option<u64>,

    /// Directory for per-pair clips
    #[arg(long)]
    tmp_dir: Option<PathBuf>,

    /// Combined output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Delete clips from earlier runs before starting
    #[arg(long)]
    purge: bool,

    /// Remove the clip directory when done
    #[arg(long)]
    cleanup: bool,

    /// espeak-ng binary to use instead of the one on PATH
    #[arg(long)]
    espeak_bin: Option<PathBuf>,

    /// espeak-ng data directory
    #[arg(long)]
    espeak_data: Option<PathBuf>,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfigBuilder::default()
                .delay_secs(CLI_DEFAULT_DELAY_SECS)
                .build()?,
        };

        if let Some(delimiter) = &self.delimiter {
            config.delimiter = delimiter.clone();
        }
        if let Some(languages) = &self.languages {
            config.languages = languages.clone();
        }
        if let Some(delay) = self.delay {
            config.delay_secs = delay;
        }
        if let Some(tmp_dir) = &self.tmp_dir {
            config.tmp_dir = tmp_dir.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        config.purge_stale_clips |= self.purge;
        config.cleanup |= self.cleanup;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let cli = Cli::parse();
    let config = cli.pipeline_config()?;

    let content = std::fs::read_to_string(&cli.input)
        .map_err(|e| format!("Failed to read {}: {e}", cli.input.display()))?;

    let synthesizer =
        EspeakSynthesizer::with_espeak(cli.espeak_bin.clone(), cli.espeak_data.clone());
    let editor = WavEditor::new();
    let mut pipeline = Pipeline::new(config, synthesizer, editor)?;

    let report = pipeline.run(content.lines());

    println!("Processing finished.");
    println!("{report}");
    Ok(())
}
