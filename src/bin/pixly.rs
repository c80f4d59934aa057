//! CLI for Pixly - product-photo content generation.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pixly::controller::GENERATION_FAILED_MESSAGE;
use pixly::{
    AspectRatio, Attempt, Configuration, Controller, FieldEdit, GeminiClient, Gender,
    GenerationClient, IgnoreReason, ImageField, Resolution, Settings, Style, SubjectType,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pixly")]
#[command(about = "Generate product photos for affiliate content via Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a product photo
    Generate(GenerateArgs),

    /// Print the prompt that would be sent, without calling the provider
    Prompt(ConfigArgs),

    /// Check that the provider is reachable and the API key works
    Check,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output file or directory (defaults to Pixly-Result-<timestamp>.png)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    /// Product photo (required for generation)
    #[arg(short, long)]
    product: Option<PathBuf>,

    /// Background reference image
    #[arg(short, long)]
    background: Option<PathBuf>,

    /// Start from a saved configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subject type
    #[arg(long, value_enum)]
    subject: Option<SubjectArg>,

    /// Model gender
    #[arg(long, value_enum, conflicts_with = "no_model")]
    gender: Option<GenderArg>,

    /// Do not show a human model
    #[arg(long)]
    no_model: bool,

    /// Additional prompt text
    #[arg(long)]
    prompt: Option<String>,

    /// Visual style
    #[arg(long, value_enum)]
    style: Option<StyleArg>,

    /// Number of variations requested (1-10)
    #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..=10))]
    quantity: Option<i64>,

    /// Aspect ratio
    #[arg(long, value_enum)]
    ratio: Option<AspectRatioArg>,

    /// Output resolution
    #[arg(long, value_enum)]
    resolution: Option<ResolutionArg>,

    /// Brand text to place in the photo
    #[arg(long)]
    branding: Option<String>,

    /// Raw field edit, e.g. `--set style=Retro` (applied last)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    edits: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SubjectArg {
    ProductOnly,
    Handheld,
    FullModel,
    Pov,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GenderArg {
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StyleArg {
    Retro,
    SoftAesthetic,
    Fancy,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolutionArg {
    Hd,
    Standard,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
}

impl From<SubjectArg> for SubjectType {
    fn from(arg: SubjectArg) -> Self {
        match arg {
            SubjectArg::ProductOnly => SubjectType::ProductOnly,
            SubjectArg::Handheld => SubjectType::Handheld,
            SubjectArg::FullModel => SubjectType::FullModel,
            SubjectArg::Pov => SubjectType::Pov,
        }
    }
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Female => Gender::Female,
            GenderArg::Male => Gender::Male,
        }
    }
}

impl From<StyleArg> for Style {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Retro => Style::Retro,
            StyleArg::SoftAesthetic => Style::SoftAesthetic,
            StyleArg::Fancy => Style::Fancy,
        }
    }
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::Hd => Resolution::Hd,
            ResolutionArg::Standard => Resolution::Standard,
        }
    }
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "pixly=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    let client = GeminiClient::from_settings(&settings);

    match cli.command {
        Commands::Generate(args) => generate(client, args, cli.json).await?,
        Commands::Prompt(args) => print_prompt(client, args, cli.json).await?,
        Commands::Check => check(client, cli.json).await?,
    }

    Ok(())
}

impl ConfigArgs {
    fn flag_edits(&self) -> Vec<FieldEdit> {
        let mut edits = Vec::new();
        if let Some(subject) = self.subject {
            edits.push(FieldEdit::SubjectType(subject.into()));
        }
        if let Some(gender) = self.gender {
            edits.push(FieldEdit::Gender(Some(gender.into())));
        }
        if self.no_model {
            edits.push(FieldEdit::NoModel(true));
        }
        if let Some(ref text) = self.prompt {
            edits.push(FieldEdit::AdditionalPrompt(text.clone()));
        }
        if let Some(style) = self.style {
            edits.push(FieldEdit::Style(style.into()));
        }
        if let Some(quantity) = self.quantity {
            edits.push(FieldEdit::Quantity(quantity));
        }
        if let Some(ratio) = self.ratio {
            edits.push(FieldEdit::Ratio(ratio.into()));
        }
        if let Some(resolution) = self.resolution {
            edits.push(FieldEdit::Resolution(resolution.into()));
        }
        if let Some(ref text) = self.branding {
            edits.push(FieldEdit::Branding(text.clone()));
        }
        edits
    }
}

/// Builds a controller and applies every configuration source in order:
/// saved JSON, flags, raw `--set` edits, then image files.
async fn prepare<C: GenerationClient>(
    client: C,
    args: &ConfigArgs,
) -> anyhow::Result<Controller<C>> {
    let base = match args.config {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<Configuration>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => Configuration::default(),
    };

    let controller = Controller::with_config(client, base);
    for edit in args.flag_edits() {
        controller.set_field(edit);
    }
    for raw in &args.edits {
        let (name, value) = raw
            .split_once('=')
            .with_context(|| format!("--set expects FIELD=VALUE, got '{raw}'"))?;
        controller.set_field_str(name, value)?;
    }

    let (product, background) = tokio::join!(
        load_optional(&controller, ImageField::Product, args.product.as_deref()),
        load_optional(&controller, ImageField::Background, args.background.as_deref()),
    );
    product?;
    background?;

    Ok(controller)
}

async fn load_optional<C: GenerationClient>(
    controller: &Controller<C>,
    field: ImageField,
    path: Option<&Path>,
) -> pixly::Result<()> {
    match path {
        Some(path) => controller.load_image(field, path).await,
        None => Ok(()),
    }
}

async fn generate(
    client: GeminiClient,
    args: GenerateArgs,
    json_output: bool,
) -> anyhow::Result<()> {
    let controller = prepare(client, &args.config).await?;

    match controller.generate().await {
        Attempt::Completed => {}
        Attempt::Failed => {
            anyhow::bail!("{GENERATION_FAILED_MESSAGE} (set RUST_LOG=pixly=debug for details)")
        }
        Attempt::Refused => {
            controller
                .check_credential()
                .with_context(|| format!("set one of: {}", pixly::API_KEY_ENV_VARS.join(", ")))?;
            anyhow::bail!("generation refused")
        }
        Attempt::Ignored(IgnoreReason::MissingProductImage) => {
            anyhow::bail!("A product image is required (--product <PATH>)")
        }
        Attempt::Ignored(IgnoreReason::AlreadyProcessing) => {
            anyhow::bail!("A generation is already in progress")
        }
    }

    let image = controller
        .result()
        .context("generation completed without a result")?;

    let filename = pixly::download_filename();
    let output = match args.output {
        Some(path) if path.is_dir() => path.join(&filename),
        Some(path) => path,
        None => PathBuf::from(&filename),
    };
    image
        .save(&output)
        .with_context(|| format!("saving {}", output.display()))?;

    let config = controller.config();
    if json_output {
        let result = serde_json::json!({
            "type": "image",
            "success": true,
            "output": output.display().to_string(),
            "size_bytes": image.size(),
            "format": image.format().extension(),
            "provider": controller.client().name(),
            "model": controller.client().model().as_str(),
            "subject_type": config.subject_type(),
            "style": config.style(),
            "ratio": config.ratio(),
            "resolution": config.resolution(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated image: {} ({} bytes) via {}",
            output.display(),
            image.size(),
            controller.client().name()
        );
    }

    Ok(())
}

async fn print_prompt(
    client: GeminiClient,
    args: ConfigArgs,
    json_output: bool,
) -> anyhow::Result<()> {
    let controller = prepare(client, &args).await?;
    let config = controller.config();
    let prompt = pixly::build_prompt(&config);

    if json_output {
        let result = serde_json::json!({
            "prompt": prompt,
            "has_product_image": config.product_image().is_some(),
            "has_background_image": config.background_image().is_some(),
            "ratio": config.ratio(),
            "resolution": config.resolution(),
            "quantity": config.quantity(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{prompt}");
    }

    Ok(())
}

async fn check(client: GeminiClient, json_output: bool) -> anyhow::Result<()> {
    let controller = Controller::new(client);
    controller
        .check_credential()
        .with_context(|| format!("set one of: {}", pixly::API_KEY_ENV_VARS.join(", ")))?;

    let client = controller.client();
    client.health_check().await?;

    if json_output {
        let result = serde_json::json!({
            "provider": client.name(),
            "model": client.model().as_str(),
            "healthy": true,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("✓ {} ({}) is reachable", client.name(), client.model().as_str());
    }

    Ok(())
}
