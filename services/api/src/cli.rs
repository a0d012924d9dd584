use crate::infra::{load_applicant, load_upload, parse_certificate_arg, CertificateArg};
use crate::server;
use clap::{Args, Parser, Subcommand};
use job_intake::config::AppConfig;
use job_intake::error::AppError;
use job_intake::telemetry;
use job_intake::workflows::recruitment::{
    ApplicationForm, ApplicationPipeline, ApplicationValidator, SubmissionSession,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Job Intake",
    about = "Serve, validate and submit job applications from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Validate an applicant JSON file and print the error map
    Validate(ValidateArgs),
    /// Validate, ingest and deliver an application with the configured gateway
    Submit(SubmitArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Applicant JSON document
    pub(crate) applicant: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// Applicant JSON document
    pub(crate) applicant: PathBuf,
    /// Passport photo to attach
    #[arg(long)]
    pub(crate) photo: Option<PathBuf>,
    /// Education memo as TIER=PATH, e.g. 10th=./memo.pdf (repeatable)
    #[arg(long = "certificate", value_parser = parse_certificate_arg)]
    pub(crate) certificates: Vec<CertificateArg>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Validate(args) => run_validate(args),
        Command::Submit(args) => run_submit(args).await,
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let validator =
        ApplicationValidator::new(config.intake.rules, config.intake.positions.clone());
    let mut form = ApplicationForm::from_applicant(load_applicant(&args.applicant)?);

    let valid = form.validate(&validator);
    println!("{}", to_pretty_json(form.errors())?);
    if valid {
        Ok(())
    } else {
        Err(AppError::Input(format!(
            "{} has {} invalid field(s)",
            args.applicant.display(),
            form.errors().len()
        )))
    }
}

async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let pipeline = ApplicationPipeline::from_config(&config)?;

    let mut form = ApplicationForm::from_applicant(load_applicant(&args.applicant)?);
    if let Some(path) = &args.photo {
        form.attach_photo(pipeline.policy(), load_upload(path)?)
            .map_err(|rejection| AppError::Input(format!("{}: {rejection}", path.display())))?;
    }
    for certificate in args.certificates {
        form.attach_certificate(
            pipeline.policy(),
            certificate.tier,
            load_upload(&certificate.path)?,
        )
        .map_err(|rejection| {
            AppError::Input(format!("{}: {rejection}", certificate.path.display()))
        })?;
    }

    let session = SubmissionSession::new();
    match pipeline.submit(&session, &mut form).await {
        Ok(receipt) => {
            println!("{}", to_pretty_json(&receipt)?);
            Ok(())
        }
        Err(err) => {
            if !form.errors().is_empty() {
                eprintln!("{}", to_pretty_json(form.errors())?);
            }
            Err(err.into())
        }
    }
}

fn to_pretty_json(value: &impl serde::Serialize) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|err| AppError::Input(err.to_string()))
}
